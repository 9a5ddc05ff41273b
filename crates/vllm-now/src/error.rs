use thiserror::Error;

use crate::params::ValueKind;

/// Errors raised while turning launch parameters and devices into artifacts.
///
/// Every variant is detected before anything is written to disk.
#[derive(Debug, Error, PartialEq)]
pub enum GeneratorError {
    #[error("`--{name}` is required")]
    MissingRequiredParameter { name: String },

    #[error("invalid type for `{name}`: expected {expected}, got {found}")]
    InvalidParameterType {
        name: String,
        expected: &'static str,
        found: ValueKind,
    },

    #[error("group size must be at least 1, got {value}")]
    InvalidGroupSize { value: i64 },

    #[error("failed to parse device list `{input}`: {reason}")]
    DeviceOverrideParseError { input: String, reason: String },

    #[error("unexpected argument `{token}`, launch parameters must look like `--name[=value]`")]
    UnexpectedArgument { token: String },

    #[error("`--{name}` is an option of this generator, pass it before the vLLM parameters")]
    MisplacedOption { name: String },

    #[error("failed to load parameters file {path}: {reason}")]
    ParamsFile { path: String, reason: String },

    #[error("device discovery failed: {message}")]
    DeviceDiscovery { message: String },
}

pub type Result<T> = std::result::Result<T, GeneratorError>;

/// Errors raised while persisting the rendered artifacts.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to prepare output directory")]
    PrepareDirectory,
    #[error("failed to write {file_name}")]
    WriteArtifact { file_name: &'static str },
}
