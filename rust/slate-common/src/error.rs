use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn overflow(context: impl Into<String>) -> Error {
        Error(
            ErrorKind::Overflow {
                context: context.into(),
            }
            .into(),
        )
    }

    pub fn allocation_failed(size: usize) -> Error {
        Error(ErrorKind::AllocationFailed { size }.into())
    }

    pub fn settled(required: usize, capacity: usize) -> Error {
        Error(ErrorKind::Settled { required, capacity }.into())
    }

    /// Returns `true` for precondition violations (bad index, bad size, empty buffer).
    pub fn is_invalid_arg(&self) -> bool {
        matches!(self.kind(), ErrorKind::InvalidArgument { .. })
    }

    pub fn is_overflow(&self) -> bool {
        matches!(self.kind(), ErrorKind::Overflow { .. })
    }

    pub fn is_allocation_failure(&self) -> bool {
        matches!(self.kind(), ErrorKind::AllocationFailed { .. })
    }

    pub fn is_settled(&self) -> bool {
        matches!(self.kind(), ErrorKind::Settled { .. })
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("size arithmetic overflow: {context}")]
    Overflow { context: String },

    #[error("allocator could not provide {size} bytes")]
    AllocationFailed { size: usize },

    #[error("buffer is settled: {required} bytes required, capacity is {capacity}")]
    Settled { required: usize, capacity: usize },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::invalid_arg("pos", "pos <= len");
        assert_eq!(e.to_string(), "invalid argument pos: pos <= len");
        assert!(e.is_invalid_arg());

        let e = Error::settled(256, 128);
        assert_eq!(
            e.to_string(),
            "buffer is settled: 256 bytes required, capacity is 128"
        );
        assert!(e.is_settled());
        assert!(!e.is_overflow());
    }

    #[test]
    fn test_into_kind() {
        let e = Error::allocation_failed(64);
        assert!(e.is_allocation_failure());
        match e.into_kind() {
            ErrorKind::AllocationFailed { size } => assert_eq!(size, 64),
            other => panic!("unexpected kind {other:?}"),
        }
    }
}
