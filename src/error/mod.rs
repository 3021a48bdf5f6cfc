use thiserror::Error;

use crate::model::DataFormat;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad or inconsistent configuration.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Error from the converter.
    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    /// Error from the validator.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Error from the capability provider.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from the orchestrator.
    #[error("Orchestration error: {0}")]
    Orchestration(#[from] OrchestrationError),

    /// Unexpected internal failure.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Errors raised by the cross-modal converter.
///
/// All variants are fatal to the single conversion call that produced them;
/// the orchestrator decides whether a failed step aborts the whole workflow.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// Payload violates its format's structural invariants.
    #[error("Malformed {format} payload: {message}")]
    MalformedPayload { format: DataFormat, message: String },

    /// Payload variant disagrees with the declared source format.
    #[error("Payload does not match declared format {declared} (actual: {actual})")]
    FormatMismatch {
        declared: DataFormat,
        actual: DataFormat,
    },

    /// Empty table or vector payload; empty graphs are accepted.
    #[error("Empty {format} payload: nothing to convert")]
    EmptyPayload { format: DataFormat },

    /// A conversion option required by this pair was not supplied.
    #[error("Missing conversion option '{option}' for {source_format} -> {target_format}")]
    MissingOption {
        option: String,
        source_format: DataFormat,
        target_format: DataFormat,
    },

    /// Preservation fell below the configured hard floor.
    #[error(
        "Semantic preservation {score:.3} fell below integrity floor {floor:.3} for {source_format} -> {target_format}"
    )]
    IntegrityFloor {
        score: f64,
        floor: f64,
        source_format: DataFormat,
        target_format: DataFormat,
    },
}

/// Errors internal to validator check construction.
///
/// These never cross the validator's call boundary: a check that errors is
/// recorded as a failed test inside the report instead.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A check could not be constructed or executed.
    #[error("Check '{check}' could not run: {message}")]
    CheckFailed { check: String, message: String },

    /// The requested round-trip sequence is not executable.
    #[error("Round-trip sequence invalid: {message}")]
    BadSequence { message: String },
}

/// Capability provider (embedding/LLM) errors
#[derive(Debug, Error)]
pub enum ProviderError {
    /// All attempts failed; carries the last failure.
    #[error("Provider unavailable: {message} (retries: {retries})")]
    Unavailable { message: String, retries: u32 },

    /// Non-success HTTP status from the provider API.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response body did not match the expected shape.
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    /// Request exceeded the configured timeout.
    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Embedding rows disagree on width or count.
    #[error("Embedding width mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Orchestrator-level errors.
///
/// Raised synchronously for programmer errors caught during input
/// validation. Failures during workflow execution are never errors at this
/// level; they degrade the `AnalysisResult` instead.
#[derive(Debug, Error)]
pub enum OrchestrationError {
    /// The request failed synchronous input validation.
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for conversion operations
pub type ConvertResult<T> = Result<T, ConversionError>;

/// Result type alias for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Result type alias for orchestration operations
pub type OrchestrationResult<T> = Result<T, OrchestrationError>;
