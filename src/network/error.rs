//! Common error types for network operations

/// A common error type for network operations.
///
/// This enum defines the errors a connection task can observe. It is designed
/// to be simple and portable for `no_std` environments; every variant is
/// `Copy` so it can be handed to a suspended task as its resume value.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// An operation was attempted on a connection that is not open.
    NotOpen,
    /// An error occurred during a write operation.
    WriteError,
    /// An error occurred during a read operation.
    ReadError,
    /// The peer closed the connection.
    ConnectionClosed,
    /// The transport failed and has already been released by the stack.
    ConnectionReset,
    /// The connection was idle for too long.
    Timeout,
    /// A protocol-specific error occurred.
    ProtocolError,
    /// A fixed-capacity buffer could not hold the data.
    BufferFull,
    /// A configuration value is out of range.
    InvalidConfig,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::NotOpen => defmt::write!(f, "NotOpen"),
            Error::WriteError => defmt::write!(f, "WriteError"),
            Error::ReadError => defmt::write!(f, "ReadError"),
            Error::ConnectionClosed => defmt::write!(f, "ConnectionClosed"),
            Error::ConnectionReset => defmt::write!(f, "ConnectionReset"),
            Error::Timeout => defmt::write!(f, "Timeout"),
            Error::ProtocolError => defmt::write!(f, "ProtocolError"),
            Error::BufferFull => defmt::write!(f, "BufferFull"),
            Error::InvalidConfig => defmt::write!(f, "InvalidConfig"),
        }
    }
}
