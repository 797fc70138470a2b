//! RPC-facing call contract for process → application guessing.
//!
//! The transport is someone else's concern; this module only turns a
//! possibly-invalid pidfd into a reply using the two error shapes an
//! RPC layer exposes: "invalid arguments" and "failed with message".

use std::os::fd::BorrowedFd;

use crate::resolver::{ApplicationResolver, ResolveError};

/// Error reply for an RPC caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("invalid arguments")]
    InvalidArgs,

    #[error("{0}")]
    Failed(String),
}

impl From<ResolveError> for ServiceError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::InvalidArgument(_) => Self::InvalidArgs,
            ResolveError::ProcessGone { .. } => Self::Failed("Pid is invalid.".into()),
            ResolveError::AmbiguousMatch { .. } => {
                Self::Failed("Multiple binary have been detected.".into())
            }
            ResolveError::NotFound { .. } => Self::Failed("Couldn't find application.".into()),
        }
    }
}

/// Exposes [`ApplicationResolver`] through the process-guesser call.
pub struct ProcessGuesser {
    resolver: ApplicationResolver,
}

impl ProcessGuesser {
    pub fn new(resolver: ApplicationResolver) -> Self {
        Self { resolver }
    }

    /// Guess the application id owning the process behind `pidfd`.
    ///
    /// `None` models a handle the transport could not decode.
    pub fn guess_application_id(&self, pidfd: Option<BorrowedFd<'_>>) -> Result<String, ServiceError> {
        let Some(pidfd) = pidfd else {
            return Err(ServiceError::InvalidArgs);
        };

        self.resolver.resolve_pidfd(pidfd).map_err(|e| {
            tracing::info!(error = %e, "guess application id failed");
            ServiceError::from(e)
        })
    }

    pub fn resolver(&self) -> &ApplicationResolver {
        &self.resolver
    }
}
