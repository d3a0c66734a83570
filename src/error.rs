//! Error types for Guardar

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Path template {template:?} references unknown placeholder {placeholder:?}")]
    PathResolution {
        template: String,
        placeholder: String,
    },

    #[error("Failed to persist checkpoint to {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Wrap a lower-level failure as a persistence error for `path`
    pub(crate) fn persistence(path: impl Into<PathBuf>, source: Error) -> Self {
        Error::Persistence {
            path: path.into(),
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_resolution_display() {
        let err = Error::PathResolution {
            template: "ckpt/{epoch}_{val_acc}".to_string(),
            placeholder: "val_acc".to_string(),
        };
        assert_eq!(
            err.to_string(),
            r#"Path template "ckpt/{epoch}_{val_acc}" references unknown placeholder "val_acc""#
        );
    }

    #[test]
    fn test_persistence_wraps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = Error::persistence("/ckpt/model.json", Error::Io(io));

        assert!(err.to_string().contains("/ckpt/model.json"));
        assert!(err.to_string().contains("denied"));
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().starts_with("I/O error"));
    }
}
