//! Genre profile extraction and mastering-target suggestion.
//!
//! The write path decodes a reference track, measures it and stores a
//! [`profile::GenreProfile`] next to a re-encoded copy of the audio. The read
//! path turns a stored profile into a feature vector and runs the pretrained
//! regressor over it.

pub mod audio;
pub mod config;
pub mod encode;
pub mod profile;
pub mod suggest;
