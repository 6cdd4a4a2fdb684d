use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    /// Connection failures, timeouts and interrupted transfers. Safe to retry.
    #[error("Transient failure: {0}")]
    Transient(String),

    /// The remote answered with a non-2xx status.
    #[error("Remote returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Whether a retry of the same request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            BridgeError::Transient(_) => true,
            BridgeError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, BridgeError::Status { status: 404, .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            BridgeError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(BridgeError::Transient("timeout".into()).is_transient());
        assert!(BridgeError::Io(std::io::Error::from(std::io::ErrorKind::TimedOut)).is_transient());
        assert!(!BridgeError::Io(std::io::Error::from(std::io::ErrorKind::PermissionDenied))
            .is_transient());

        let not_found = BridgeError::Status {
            status: 404,
            message: "missing".into(),
        };
        assert!(!not_found.is_transient());
        assert!(not_found.is_not_found());
        assert_eq!(not_found.status(), Some(404));
    }
}
