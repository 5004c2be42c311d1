use thiserror::Error;

/// Boxed error returned by external collaborators (signers, chain readers).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure reported by a [`Signer`](crate::signer::Signer) implementation.
#[derive(Debug, Error)]
#[error("signer failed: {0}")]
pub struct SignerError(#[source] pub BoxError);

impl SignerError {
    pub fn new(err: impl Into<BoxError>) -> Self {
        Self(err.into())
    }
}

/// Failure reported by a [`ChainReader`](crate::chain::ChainReader) implementation.
#[derive(Debug, Error)]
#[error("chain read failed: {0}")]
pub struct ChainReadError(#[source] pub BoxError);

impl ChainReadError {
    pub fn new(err: impl Into<BoxError>) -> Self {
        Self(err.into())
    }
}

/// Errors raised while building permissions and signing UserOperations.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed ABI input or out-of-range field at permission-construction time.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Restrictions are active and no permission authorizes the call.
    #[error("No matching permission found for the userOp")]
    NoMatchingPermission,

    /// The API was used in a state it does not support.
    #[error("precondition violated: {0}")]
    Precondition(&'static str),

    #[error(transparent)]
    Signer(#[from] SignerError),

    #[error(transparent)]
    ChainRead(#[from] ChainReadError),

    /// Session export could not be decoded.
    #[error("invalid session export: {0}")]
    Export(String),
}

impl Error {
    /// Whether the session key is simply not allowed to perform the call.
    ///
    /// Applications surface this differently from transport failures: it is fixed by adjusting
    /// permissions, not by retrying.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Error::NoMatchingPermission)
    }
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
