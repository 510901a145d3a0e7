//! Error taxonomy for packrpc.
//!
//! Every failure in the framework is classified into one of the
//! [`ErrorKind`] variants below. The kind travels on the wire as a stable
//! numeric code (the `except_type` field), so both sides of a connection
//! agree on what went wrong regardless of which serialization adapter is in
//! use.

use std::fmt;
use thiserror::Error;

/// Classification of an RPC failure.
///
/// The discriminants double as the stable wire codes written into the
/// `except_type` field; they must never be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No error recorded
    None,
    /// Server has no handler bound for the requested name
    FuncNotFound,
    /// The bound callback failed while executing
    RemoteExec,
    /// Encoding a value failed
    Serialization,
    /// Decoding a value failed structurally
    Deserialization,
    /// An argument or result did not match the declared signature
    SignatureMismatch,
    /// Transport send failed on the client
    ClientSend,
    /// Transport receive failed on the client
    ClientReceive,
    /// Transport send failed on the server
    ServerSend,
    /// Transport receive failed on the server (e.g. malformed input)
    ServerReceive,
}

impl ErrorKind {
    /// The numeric wire code for this kind.
    pub fn code(self) -> u8 {
        match self {
            ErrorKind::None => 0,
            ErrorKind::FuncNotFound => 1,
            ErrorKind::RemoteExec => 2,
            ErrorKind::Serialization => 3,
            ErrorKind::Deserialization => 4,
            ErrorKind::SignatureMismatch => 5,
            ErrorKind::ClientSend => 6,
            ErrorKind::ClientReceive => 7,
            ErrorKind::ServerSend => 8,
            ErrorKind::ServerReceive => 9,
        }
    }

    /// Maps a wire code back to its kind. Unknown codes return `None`.
    pub fn from_code(code: u64) -> Option<ErrorKind> {
        Some(match code {
            0 => ErrorKind::None,
            1 => ErrorKind::FuncNotFound,
            2 => ErrorKind::RemoteExec,
            3 => ErrorKind::Serialization,
            4 => ErrorKind::Deserialization,
            5 => ErrorKind::SignatureMismatch,
            6 => ErrorKind::ClientSend,
            7 => ErrorKind::ClientReceive,
            8 => ErrorKind::ServerSend,
            9 => ErrorKind::ServerReceive,
            _ => return None,
        })
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::None => "none",
            ErrorKind::FuncNotFound => "func_not_found",
            ErrorKind::RemoteExec => "remote_exec",
            ErrorKind::Serialization => "serialization",
            ErrorKind::Deserialization => "deserialization",
            ErrorKind::SignatureMismatch => "signature_mismatch",
            ErrorKind::ClientSend => "client_send",
            ErrorKind::ClientReceive => "client_receive",
            ErrorKind::ServerSend => "server_send",
            ErrorKind::ServerReceive => "server_receive",
        };
        f.write_str(name)
    }
}

/// A structured RPC failure: a taxonomy kind plus a human-readable message.
///
/// Errors raised remotely are carried in the response's `except_type` /
/// `err_mesg` fields and re-surface locally with the same kind and message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct RpcError {
    kind: ErrorKind,
    message: String,
}

impl RpcError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Server has no handler bound for the requested name.
    pub fn func_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::FuncNotFound, message)
    }

    /// The bound callback failed while executing.
    pub fn remote_exec(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RemoteExec, message)
    }

    /// Encoding a value failed.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Serialization, message)
    }

    /// Decoding a value failed structurally.
    pub fn deserialization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Deserialization, message)
    }

    /// An argument or result did not match the declared signature.
    pub fn signature_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SignatureMismatch, message)
    }

    /// Transport send failed on the client.
    pub fn client_send(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ClientSend, message)
    }

    /// Transport receive failed on the client.
    pub fn client_receive(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ClientReceive, message)
    }

    /// Transport send failed on the server.
    pub fn server_send(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServerSend, message)
    }

    /// Transport receive failed on the server.
    pub fn server_receive(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServerReceive, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub type Result<T> = std::result::Result<T, RpcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip() {
        for code in 0..=9u64 {
            let kind = ErrorKind::from_code(code).unwrap();
            assert_eq!(u64::from(kind.code()), code);
        }
    }

    #[test]
    fn test_unknown_code_rejected() {
        assert_eq!(ErrorKind::from_code(10), None);
        assert_eq!(ErrorKind::from_code(u64::MAX), None);
    }

    #[test]
    fn test_display_includes_kind_and_message() {
        let err = RpcError::func_not_found("called function \"nope\" is not bound");
        assert_eq!(
            err.to_string(),
            "func_not_found: called function \"nope\" is not bound"
        );
    }

    #[test]
    fn test_constructors_set_kind() {
        assert_eq!(RpcError::remote_exec("x").kind(), ErrorKind::RemoteExec);
        assert_eq!(RpcError::serialization("x").kind(), ErrorKind::Serialization);
        assert_eq!(
            RpcError::deserialization("x").kind(),
            ErrorKind::Deserialization
        );
        assert_eq!(
            RpcError::signature_mismatch("x").kind(),
            ErrorKind::SignatureMismatch
        );
        assert_eq!(RpcError::client_send("x").kind(), ErrorKind::ClientSend);
        assert_eq!(RpcError::client_receive("x").kind(), ErrorKind::ClientReceive);
        assert_eq!(RpcError::server_send("x").kind(), ErrorKind::ServerSend);
        assert_eq!(RpcError::server_receive("x").kind(), ErrorKind::ServerReceive);
    }

    #[test]
    fn test_message_preserved() {
        let err = RpcError::remote_exec("boom");
        assert_eq!(err.message(), "boom");
    }
}
