use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InterleaveError {
    #[error("G-code file not found at {}", path.display())]
    NotFound { path: PathBuf },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl InterleaveError {
    pub(crate) fn from_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            InterleaveError::NotFound { path }
        } else {
            InterleaveError::Io { path, source }
        }
    }
}

/// Fatal configuration errors.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{0} path not specified in the arguments")]
    MissingKey(String),

    #[error("{key} must be a numeric value, got '{value}'")]
    InvalidOffset { key: String, value: String },
}

/// A configuration value that was replaced by its default.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigWarning {
    #[error("{key} must be a numeric value, got '{value}'; defaulting to {default}")]
    NotNumeric {
        key: &'static str,
        value: String,
        default: String,
    },

    #[error("{key} cannot be {value}; defaulting to {default}")]
    OutOfRange {
        key: &'static str,
        value: String,
        default: String,
    },

    #[error("invalid {key} '{value}', expected <x>_<y>; ignoring {key}")]
    InvalidPosition { key: &'static str, value: String },
}

impl ConfigWarning {
    /// The configuration key the warning is about.
    pub fn key(&self) -> &'static str {
        match self {
            ConfigWarning::NotNumeric { key, .. }
            | ConfigWarning::OutOfRange { key, .. }
            | ConfigWarning::InvalidPosition { key, .. } => key,
        }
    }
}

pub type Result<T> = std::result::Result<T, InterleaveError>;

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_from_io() {
        let err = InterleaveError::from_io(
            "/tmp/missing.gcode",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, InterleaveError::NotFound { .. }));
        assert_eq!(err.to_string(), "G-code file not found at /tmp/missing.gcode");

        let err = InterleaveError::from_io(
            "/tmp/locked.gcode",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, InterleaveError::Io { .. }));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingKey("G-code1".to_string());
        assert_eq!(err.to_string(), "G-code1 path not specified in the arguments");

        let err = ConfigError::InvalidOffset {
            key: "X_offset".to_string(),
            value: "left".to_string(),
        };
        assert_eq!(err.to_string(), "X_offset must be a numeric value, got 'left'");

        let err: InterleaveError = err.into();
        assert!(matches!(err, InterleaveError::Config(_)));
    }

    #[test]
    fn test_warning_key() {
        let warning = ConfigWarning::InvalidPosition {
            key: "rest2_position",
            value: "10".to_string(),
        };
        assert_eq!(warning.key(), "rest2_position");
        assert_eq!(
            warning.to_string(),
            "invalid rest2_position '10', expected <x>_<y>; ignoring rest2_position"
        );
    }
}
