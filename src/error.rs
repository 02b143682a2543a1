//! Error types for the retune crate.

use std::fmt;

/// Errors that can occur in the analysis, editing, and playback pipeline.
///
/// Every variant is recoverable: the failed operation is a no-op with respect
/// to committed state, and the system remains usable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetuneError {
    /// The audio bytes could not be decoded.
    DecodeFailed(String),
    /// Pitch analysis failed; no partial track is produced.
    AnalysisFailed(String),
    /// Spectrogram computation failed; visualization degrades.
    SpectrogramFailed(String),
    /// Playback could not start or the output device went away.
    PlaybackFailed(String),
    /// A project file was malformed or carries an unsupported version.
    InvalidProjectFile(String),
    /// A CSV document was malformed.
    InvalidCsv { line: usize, reason: String },
}

impl fmt::Display for RetuneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetuneError::DecodeFailed(msg) => write!(f, "decode failed: {}", msg),
            RetuneError::AnalysisFailed(msg) => write!(f, "pitch analysis failed: {}", msg),
            RetuneError::SpectrogramFailed(msg) => write!(f, "spectrogram failed: {}", msg),
            RetuneError::PlaybackFailed(msg) => write!(f, "playback failed: {}", msg),
            RetuneError::InvalidProjectFile(msg) => write!(f, "invalid project file: {}", msg),
            RetuneError::InvalidCsv { line, reason } => {
                write!(f, "invalid CSV at line {}: {}", line, reason)
            }
        }
    }
}

impl std::error::Error for RetuneError {}

impl From<std::io::Error> for RetuneError {
    fn from(err: std::io::Error) -> Self {
        RetuneError::InvalidProjectFile(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let e = RetuneError::DecodeFailed("bad header".to_string());
        assert_eq!(e.to_string(), "decode failed: bad header");

        let e = RetuneError::InvalidCsv {
            line: 3,
            reason: "expected 3 fields".to_string(),
        };
        assert_eq!(e.to_string(), "invalid CSV at line 3: expected 3 fields");
    }
}
