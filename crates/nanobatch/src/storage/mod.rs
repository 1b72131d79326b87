pub mod archive;
pub mod filesystem;

pub use archive::pack;
pub use filesystem::{ArtifactStore, ARTIFACT_EXTENSION};
