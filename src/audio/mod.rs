pub mod decode;
pub mod loudness;
pub mod reference;
pub mod resample;
pub mod signal;
pub mod spectral;
