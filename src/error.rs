/// Error types for the mmdbkit library
use std::fmt;

/// Result type alias for database operations
pub type Result<T> = std::result::Result<T, MmdbError>;

/// Main error type for loading, querying and building databases
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MmdbError {
    /// A section separator is missing or the regions are inconsistent
    MalformedEnvelope(String),

    /// A child reference or leaf offset points outside its region
    TraversalOutOfRange(String),

    /// A control byte names a data kind this decoder does not know
    UnknownFieldKind(u8),

    /// A pointer encoding runs past the end of the buffer
    PointerOverflow {
        /// Position of the pointer's control byte
        position: usize,
        /// Length of the buffer being decoded
        len: usize,
    },

    /// Typed-value decoding errors
    Decode(String),

    /// Metadata is missing a field or holds an unusable value
    InvalidMetadata(String),

    /// Address could not be parsed or does not fit the tree
    InvalidIpAddress(String),

    /// Errors while constructing a database
    Build(String),

    /// I/O errors
    Io(String),
}

impl fmt::Display for MmdbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MmdbError::MalformedEnvelope(msg) => write!(f, "Malformed envelope: {}", msg),
            MmdbError::TraversalOutOfRange(msg) => write!(f, "Traversal out of range: {}", msg),
            MmdbError::UnknownFieldKind(kind) => write!(f, "Unknown field kind: {}", kind),
            MmdbError::PointerOverflow { position, len } => write!(
                f,
                "Pointer at offset {} runs past end of buffer ({} bytes)",
                position, len
            ),
            MmdbError::Decode(msg) => write!(f, "Data decode error: {}", msg),
            MmdbError::InvalidMetadata(msg) => write!(f, "Invalid metadata: {}", msg),
            MmdbError::InvalidIpAddress(msg) => write!(f, "Invalid IP address: {}", msg),
            MmdbError::Build(msg) => write!(f, "Build error: {}", msg),
            MmdbError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for MmdbError {}

impl From<std::io::Error> for MmdbError {
    fn from(err: std::io::Error) -> Self {
        MmdbError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_pointer_overflow() {
        let err = MmdbError::PointerOverflow { position: 10, len: 12 };
        assert_eq!(
            err.to_string(),
            "Pointer at offset 10 runs past end of buffer (12 bytes)"
        );
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: MmdbError = io.into();
        assert!(matches!(err, MmdbError::Io(ref msg) if msg.contains("missing")));
    }
}
