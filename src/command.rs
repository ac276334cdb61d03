//! Typed Command and Reply Envelopes
//!
//! This module defines the request and response shapes the engine executes.
//! A [`Command`] is a closed set of operations, one variant per command, each
//! carrying already-typed fields. Dispatch is an exhaustive `match`, so a
//! malformed invocation (wrong arity, wrong argument kind) is unrepresentable
//! at the call boundary.
//!
//! A [`Reply`] carries one of the three return shapes the engine produces:
//!
//! - boolean (`set`)
//! - bytes (`get`, `hget`)
//! - integer counts and flags (`del`, `expire`, `hset`, `hdel`, `sadd`,
//!   `sismember`)
//!
//! Each command is executed exactly once and yields exactly one reply. The
//! typed extractors ([`Reply::into_bool`] and friends) enforce at extraction
//! time that the handler populated the shape the command declares, failing
//! with [`Error::ReplyMismatch`] otherwise. That check guards against engine
//! bugs, not user input.

use bytes::Bytes;

use crate::{Error, Result};

/// A single engine operation with its already-validated, typed arguments.
///
/// Variadic operations carry possibly-empty collections; an empty `del` or
/// `hdel` simply counts zero removals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Bind `key` as a string and overwrite its value unconditionally.
    Set { key: String, value: Bytes },
    /// Read a string key's bytes; empty if the key is unbound.
    Get { key: String },
    /// Remove each key, whatever its type, counting the ones actually bound.
    Del { keys: Vec<String> },
    /// Set an absolute expiration `seconds` from now on an existing key.
    Expire { key: String, seconds: i64 },
    /// Write one field of a hash, binding the key as a hash if new.
    HSet {
        key: String,
        field: String,
        value: Bytes,
    },
    /// Read one field of a hash; empty if the key or field is absent.
    HGet { key: String, field: String },
    /// Remove fields from a hash, counting the ones that were present.
    HDel { key: String, fields: Vec<String> },
    /// Insert members into a set, binding the key as a set if new.
    SAdd { key: String, members: Vec<String> },
    /// Test set membership: 1 if present, 0 otherwise.
    SIsMember { key: String, member: String },
}

impl Command {
    /// The lower-case command word, for logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Set { .. } => "set",
            Command::Get { .. } => "get",
            Command::Del { .. } => "del",
            Command::Expire { .. } => "expire",
            Command::HSet { .. } => "hset",
            Command::HGet { .. } => "hget",
            Command::HDel { .. } => "hdel",
            Command::SAdd { .. } => "sadd",
            Command::SIsMember { .. } => "sismember",
        }
    }
}

/// The typed outcome of a successfully executed [`Command`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Boolean acknowledgement
    Bool(bool),
    /// Opaque byte value, empty when the key or field is absent
    Bytes(Bytes),
    /// Count or 0/1 flag
    Int(i64),
}

impl Reply {
    /// The reply's shape name, used in mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Reply::Bool(_) => "bool",
            Reply::Bytes(_) => "bytes",
            Reply::Int(_) => "int",
        }
    }

    /// Extracts the boolean shape.
    pub fn into_bool(self) -> Result<bool> {
        match self {
            Reply::Bool(value) => Ok(value),
            other => Err(Error::ReplyMismatch {
                expected: "bool",
                actual: other.kind(),
            }),
        }
    }

    /// Extracts the bytes shape.
    pub fn into_bytes(self) -> Result<Bytes> {
        match self {
            Reply::Bytes(value) => Ok(value),
            other => Err(Error::ReplyMismatch {
                expected: "bytes",
                actual: other.kind(),
            }),
        }
    }

    /// Extracts the integer shape.
    pub fn into_int(self) -> Result<i64> {
        match self {
            Reply::Int(value) => Ok(value),
            other => Err(Error::ReplyMismatch {
                expected: "int",
                actual: other.kind(),
            }),
        }
    }
}
