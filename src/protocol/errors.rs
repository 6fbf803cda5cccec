//! Error codes and error handling for XInput2 requests

use std::fmt;
use std::io;

/// Core X11 error codes that client-side request failures map onto
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorCode {
    Value = 2,
    Alloc = 11,
    Length = 16,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Value => "Value: integer parameter out of range",
            ErrorCode::Alloc => "Alloc: insufficient resources",
            ErrorCode::Length => "Length: request length incorrect",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Failure of a client-side XInput2 request
#[derive(Debug)]
pub enum Error {
    /// A change record or parameter cannot be encoded
    InvalidArgument(String),
    /// The request buffer could not be allocated
    OutOfMemory,
    /// The named extension is not present on this connection
    ExtensionUnavailable(&'static str),
    /// The request does not fit in a 16-bit length field
    RequestTooLarge { words: usize },
    /// The underlying connection failed
    Transmission(io::Error),
}

impl Error {
    /// Core protocol error code equivalent, if there is one
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Error::InvalidArgument(_) => Some(ErrorCode::Value),
            Error::OutOfMemory => Some(ErrorCode::Alloc),
            Error::RequestTooLarge { .. } => Some(ErrorCode::Length),
            Error::ExtensionUnavailable(_) | Error::Transmission(_) => None,
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArgument(message) => write!(f, "invalid argument: {}", message),
            Error::OutOfMemory => write!(f, "out of memory allocating request buffer"),
            Error::ExtensionUnavailable(name) => {
                write!(f, "extension {} is not available on this connection", name)
            }
            Error::RequestTooLarge { words } => {
                write!(f, "request of {} words exceeds the maximum request length", words)
            }
            Error::Transmission(err) => write!(f, "transmission error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Transmission(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Transmission(err)
    }
}

/// Result type for XInput2 request operations
pub type XiResult<T> = Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::invalid_argument("x").code(), Some(ErrorCode::Value));
        assert_eq!(Error::OutOfMemory.code(), Some(ErrorCode::Alloc));
        assert_eq!(
            Error::RequestTooLarge { words: 70000 }.code(),
            Some(ErrorCode::Length)
        );
        assert_eq!(Error::ExtensionUnavailable("XInputExtension").code(), None);
    }

    #[test]
    fn test_io_error_source() {
        let err: Error = io::Error::new(io::ErrorKind::BrokenPipe, "gone").into();
        assert!(matches!(err, Error::Transmission(_)));
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("gone"));
    }
}
