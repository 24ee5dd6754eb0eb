//! Config extraction errors.

/// The message shown when the config could not be extracted from the figment.
pub const FAILED_TO_EXTRACT_CONFIG_MSG: &str = "failed to extract wallet-miner config:";

/// Represents a failed attempt to extract [`Config`](crate::Config) from a `Figment`.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("{FAILED_TO_EXTRACT_CONFIG_MSG}\n{error}")]
pub struct ExtractConfigError {
    #[source]
    pub(crate) error: figment::Error,
}

impl ExtractConfigError {
    /// Wraps the figment error
    pub fn new(error: figment::Error) -> Self {
        Self { error }
    }
}

/// Raised when a section is missing a value the requested command cannot run without.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("`{0}` must be set in wallet-miner.toml, the environment or on the command line")]
pub struct MissingValue(pub &'static str);
