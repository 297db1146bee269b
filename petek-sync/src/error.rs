use std::fmt;
use std::sync::Arc;

/// Typed errors for future operations.
#[derive(Debug, Clone)]
pub enum FutureError {
    /// `complete` or `complete_exceptionally` lost the race for the
    /// completion token; the future's state is unchanged.
    AlreadyCompleted,
    /// `get` was called from a cooperative worker thread, which must not
    /// block.
    BlockingNotPermitted,
    /// `get` reached its deadline before the future completed.
    Timeout,
    /// `cancel` is not supported; `close` is the lifecycle reset.
    Unsupported,
    /// The future completed exceptionally.
    Failed {
        /// The failure message supplied at completion.
        message: String,
        /// The failure cause supplied at completion, if any.
        cause: Option<Arc<dyn std::error::Error + Send + Sync>>,
    },
}

impl fmt::Display for FutureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FutureError::AlreadyCompleted => {
                write!(f, "cannot complete future, the future is already completed")
            }
            FutureError::BlockingNotPermitted => {
                write!(
                    f,
                    "get() called on an incomplete future from a cooperative worker thread; workers must be non-blocking"
                )
            }
            FutureError::Timeout => write!(f, "future did not complete within the deadline"),
            FutureError::Unsupported => write!(f, "futures cannot be cancelled"),
            FutureError::Failed { message, .. } => {
                write!(f, "future completed exceptionally: {}", message)
            }
        }
    }
}

impl std::error::Error for FutureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FutureError::Failed {
                cause: Some(cause), ..
            } => Some(cause.as_ref() as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}
