//! Error types for redjvu library.

use std::io;
use thiserror::Error;

use crate::reconcile::ReconcileError;

/// Result type alias for redjvu operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while loading, editing or saving a document.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files or pipes.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed s-expression text.
    #[error("S-expression syntax error at byte {offset}: {message}")]
    Syntax { offset: usize, message: String },

    /// A `maparea` record does not follow the map-area grammar.
    #[error("Map-area syntax error: {0}")]
    MapAreaSyntax(String),

    /// An annotation record is not a non-empty list starting with a symbol.
    #[error("Annotation syntax error: {0}")]
    AnnotationSyntax(String),

    /// A hidden text zone record is malformed.
    #[error("Text zone syntax error: {0}")]
    ZoneSyntax(String),

    /// An outline record is malformed.
    #[error("Outline syntax error: {0}")]
    OutlineSyntax(String),

    /// A color is not of the `#RRGGBB` form.
    #[error("{0:?} is not a valid color")]
    InvalidColor(String),

    /// A value is outside the range allowed for the field.
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: &'static str, message: String },

    /// Shadow borders were assigned to a shape that cannot have them.
    #[error("{shape} map-areas cannot have shadow borders")]
    ShadowBorderNotAllowed { shape: &'static str },

    /// The djvused executable failed the startup self-check.
    #[error("{path:?} does not seem to be usable")]
    ToolUnusable { path: String },

    /// djvused exited with a non-zero status.
    #[error("djvused: {0}")]
    Djvused(String),

    /// Externally edited text could not be mapped back onto the zones.
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    /// The page carries no hidden text.
    #[error("No text layer to edit")]
    NoTextLayer,

    /// A zone id does not refer to a live zone.
    #[error("No such zone: {0}")]
    NoSuchZone(usize),

    /// A map-area id does not refer to a map-area of this page.
    #[error("No such map-area: {0}")]
    NoSuchMapArea(u64),

    /// A bookmark id does not refer to a live bookmark.
    #[error("No such bookmark: {0}")]
    NoSuchBookmark(usize),

    /// Page number is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(usize, usize),

    /// Configuration file problem.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The external text editor could not be run.
    #[error("External editor failed: {0}")]
    Editor(String),

    /// A worker thread went away without reporting a result.
    #[error("Worker thread terminated without a result")]
    WorkerLost,
}

impl Error {
    /// Build an [`Error::InvalidValue`].
    pub(crate) fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Error::InvalidValue {
            field,
            message: message.into(),
        }
    }

    /// Check whether this error is an expected, user-actionable
    /// reconciliation outcome rather than a failure.
    pub fn is_reconcile(&self) -> bool {
        matches!(self, Error::Reconcile(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NoTextLayer;
        assert_eq!(err.to_string(), "No text layer to edit");

        let err = Error::PageOutOfRange(10, 5);
        assert_eq!(
            err.to_string(),
            "Page 10 is out of range (document has 5 pages)"
        );

        let err = Error::InvalidColor("#12345".to_string());
        assert_eq!(err.to_string(), "\"#12345\" is not a valid color");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_reconcile_error_is_transparent() {
        let err: Error = ReconcileError::LengthChanged {
            expected: 3,
            found: 4,
        }
        .into();
        assert!(err.is_reconcile());
        assert_eq!(
            err.to_string(),
            "Number of lines changed (expected 3, found 4)"
        );
    }
}
