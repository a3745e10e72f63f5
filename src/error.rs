//! Error types for the keyword pipeline.
//!
//! Cleaning is total and never fails. Everything else that can go wrong
//! (reading stopword lists or fonts, compiling a cleaning rule, a segmentation
//! backend misbehaving, rendering nothing) is reported through [`Error`].

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// The main error type for pipeline operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors not tied to a specific resource.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A stopword list could not be read or parsed.
    #[error("Stopword list {}: {source}", path.display())]
    Stopwords {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A cleaning rule pattern failed to compile.
    #[error("Invalid cleaning rule '{name}': {source}")]
    InvalidRule {
        name: String,
        #[source]
        source: regex::Error,
    },

    /// The segmentation or tagging backend failed.
    #[error("Backend error: {0}")]
    Backend(String),

    /// A tagger returned a tag sequence that does not line up with its tokens.
    #[error("Tagger returned {tags} tags for {tokens} tokens")]
    TagMismatch { tokens: usize, tags: usize },

    /// The font used for glyph embedding could not be read.
    #[error("Font {}: {source}", path.display())]
    Font {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Rendering was asked for with no positive frequencies.
    #[error("Cannot render a word cloud from an empty frequency map")]
    EmptyFrequencies,

    /// Not even the most frequent word fits on the canvas at the minimum
    /// font size.
    #[error("No room on a {width}x{height} canvas for '{word}'")]
    CanvasTooSmall {
        word: String,
        width: u32,
        height: u32,
    },

    /// Invalid configuration values.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new backend error.
    pub fn backend<S: Into<String>>(msg: S) -> Self {
        Error::Backend(msg.into())
    }

    /// Create a new configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    pub(crate) fn stopwords<P, E>(path: P, source: E) -> Self
    where
        P: Into<PathBuf>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error::Stopwords {
            path: path.into(),
            source: source.into(),
        }
    }
}
