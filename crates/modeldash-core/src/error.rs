use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum DashError {
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("missing field: {0}")]
    MissingField(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("{0}")]
    Unknown(String),
}

impl DashError {
    /// Map an I/O error on `path`, keeping "not found" distinct from the rest.
    pub fn io(path: &std::path::Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound(path.to_path_buf())
        } else {
            Self::Unknown(format!("{}: {err}", path.display()))
        }
    }
}

impl From<serde_yaml::Error> for DashError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::MalformedInput(format!("YAML: {e}"))
    }
}

impl From<serde_json::Error> for DashError {
    fn from(e: serde_json::Error) -> Self {
        Self::MalformedInput(format!("JSON: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, DashError>;

/// Success flag plus a human-readable message, for callers that present
/// failures instead of propagating them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub success: bool,
    pub message: String,
}

impl Outcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into() }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into() }
    }
}

impl From<DashError> for Outcome {
    fn from(e: DashError) -> Self {
        Self::failed(format!("error: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_io_error_maps_to_file_not_found() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let e = DashError::io(std::path::Path::new("a.yaml"), err);
        assert!(matches!(e, DashError::FileNotFound(_)));
        assert_eq!(e.to_string(), "file not found: a.yaml");
    }

    #[test]
    fn other_io_error_maps_to_unknown() {
        let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let e = DashError::io(std::path::Path::new("a.yaml"), err);
        assert!(matches!(e, DashError::Unknown(_)));
        assert!(e.to_string().contains("denied"));
    }

    #[test]
    fn outcome_from_error_is_failure() {
        let o: Outcome = DashError::Timeout(Duration::from_secs(30)).into();
        assert!(!o.success);
        assert_eq!(o.message, "error: timed out after 30s");
    }
}
