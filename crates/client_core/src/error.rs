use thiserror::Error;

/// Error taxonomy for everything the controller layer can fail with. Remote
/// errors are normalized into this shape at the data-source boundary and
/// never reach presentation code as raw transport exceptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network or HTTP failure while loading a list or a single entity.
    Fetch,
    /// The backend answered, but the payload did not decode into the shape
    /// the contract promises.
    Decode,
    /// A second mutation was begun on an id that already has one pending.
    MutationConflict,
    /// The backend rejected an approve/reject/block/delete/broadcast action.
    Mutation,
    /// Local, synchronous form validation failure.
    Validation,
}

impl ErrorKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Decode => "decode",
            Self::MutationConflict => "mutation_conflict",
            Self::Mutation => "mutation",
            Self::Validation => "validation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}: {message}", self.kind.label())]
pub struct ViewError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ViewError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn fetch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Fetch, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Decode, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MutationConflict, message)
    }

    pub fn mutation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Mutation, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }
}
