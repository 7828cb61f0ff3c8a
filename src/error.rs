// error.rs
use std::io;
use thiserror::Error;

/// Error types for glob operations
///
/// Only misconfiguration and malformed patterns are surfaced to the caller;
/// filesystem errors hit during a walk are recovered locally (the offending
/// directory reads as empty) and never appear here.
#[derive(Error, Debug)]
pub enum GlobError {
    /// I/O error from filesystem operations
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Regex compilation error
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// Regex compilation error in a look-around segment
    #[error("Regex error: {0}")]
    FancyRegex(#[from] fancy_regex::Error),

    /// Invalid pattern syntax
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// Conflicting or malformed configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A path that is not valid UTF-8 was supplied as cwd or root
    #[error("Path is not valid UTF-8: {0}")]
    NonUtf8Path(String),

    /// Brace expansion exceeded maximum depth
    #[error("Brace expansion exceeded maximum depth")]
    BraceExpansionDepth,

    /// Brace expansion exceeded maximum number of expansions
    #[error("Brace expansion exceeded maximum expansions")]
    BraceExpansionCount,

    /// Regex pattern too complex or too long
    #[error("Regex pattern too complex or long")]
    RegexTooComplex,
}
