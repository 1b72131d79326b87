use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NanobatchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Spec error: {0}")]
    Spec(#[from] SpecError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Job error: {0}")]
    Job(#[from] JobError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read settings file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write settings file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Could not determine the home directory for the settings file")]
    NoHomeDirectory,
}

/// Rejections raised while turning submitted rows into specs.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SpecError {
    #[error("prompt column is required. Found columns: {found}")]
    MissingPromptColumn { found: String },

    #[error("No rows submitted")]
    NoRows,

    #[error("No rows with a non-empty prompt")]
    NoPrompts,
}

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("{provider} error {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} request failed: {message}")]
    Transport {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} returned an unreadable response: {message}")]
    Decode {
        provider: &'static str,
        message: String,
    },

    #[error("No images returned from {provider}")]
    Empty { provider: &'static str },

    #[error("{secondary} (after primary failure: {primary})")]
    AllProvidersFailed {
        primary: Box<GenerationError>,
        secondary: Box<GenerationError>,
    },

    #[error("Missing API key")]
    MissingApiKey,

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build archive: {0}")]
    Archive(String),
}

#[derive(Error, Debug)]
pub enum JobError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Artifact not found: {job_id}/{filename}")]
    ArtifactNotFound { job_id: String, filename: String },

    #[error("Invalid artifact name: {0}")]
    InvalidArtifactName(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, NanobatchError>;
