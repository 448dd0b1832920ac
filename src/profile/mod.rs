pub mod builder;
pub mod document;
pub mod extract;
pub mod store;

use std::path::PathBuf;

use crate::encode::EncodeError;
use document::InvalidProfile;
use extract::ExtractError;
use store::StoreError;

pub use builder::{GeneratedProfile, ProfileBuilder};
pub use document::GenreProfile;
pub use store::ProfileStore;

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to decode {path}")]
    Decode {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to extract features for '{genre}'")]
    Extraction {
        genre: String,
        #[source]
        source: ExtractError,
    },
    #[error("extracted descriptors for '{genre}' are unusable")]
    Invalid {
        genre: String,
        #[source]
        source: InvalidProfile,
    },
    #[error("profile saved to {profile_path} but its audio asset could not be encoded")]
    Encode {
        profile_path: PathBuf,
        #[source]
        source: EncodeError,
    },
}
