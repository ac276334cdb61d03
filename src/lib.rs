//! # EmberKV - An Embeddable In-Memory Key-Value Engine
//!
//! EmberKV is a single-process, in-memory key-value engine with a small
//! multi-type data model: opaque byte strings, string-keyed hash maps, and
//! string sets. Keys can carry an optional expiration, and the total number
//! of live keys is bounded by a configured capacity.
//!
//! It is meant to be linked into a host process (for example a protocol
//! server) that translates an external wire protocol into calls against this
//! engine and serializes the typed results back out. EmberKV itself has no
//! network front-end and no persistence; all state is volatile.
//!
//! ## Features
//!
//! - **Multi-Type Keys**: one flat namespace holding strings, hashes, and sets
//! - **Type Consistency**: a key keeps its type until it is fully removed
//! - **Bounded Capacity**: new keys are rejected once the configured maximum
//!   distinct-key count is reached; overwrites always succeed
//! - **TTL Support**: per-key expiration with lazy checks on access plus an
//!   active background eviction cycle
//! - **Serialized Execution**: one exclusive lock orders every command and
//!   every expiration pass, giving linearizable semantics under concurrency
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                           Engine                             │
//! │                                                              │
//! │   typed API ──> Command ──> Mutex<Db> ──> Reply              │
//! │                               │                              │
//! │          ┌────────────────────┼───────────────────┐          │
//! │          ▼                    ▼                   ▼          │
//! │   ┌─────────────┐     ┌──────────────┐     ┌───────────┐    │
//! │   │     Key     │     │ Typed Stores │     │ TTL table │    │
//! │   │  Directory  │     │ str/hash/set │     │           │    │
//! │   └─────────────┘     └──────────────┘     └───────────┘    │
//! │                               ▲                              │
//! │                               │                              │
//! │                     ┌─────────┴─────────┐                    │
//! │                     │    ExpiryCycle    │                    │
//! │                     │ (background task) │                    │
//! │                     └───────────────────┘                    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use emberkv::{Config, Engine};
//!
//! #[tokio::main]
//! async fn main() -> emberkv::Result<()> {
//!     // Capacity of 1024 distinct keys, default 100ms expiration cycle.
//!     let engine = Engine::new(Config::new(1024));
//!
//!     engine.set("greeting", "hello")?;
//!     assert_eq!(engine.get("greeting")?, "hello");
//!
//!     engine.hset("user:1", "name", "ember")?;
//!     assert_eq!(engine.hget("user:1", "name")?, "ember");
//!
//!     engine.sadd("tags", ["a", "b"])?;
//!     assert_eq!(engine.sismember("tags", "a")?, 1);
//!
//!     engine.expire("greeting", 60)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Supported Operations
//!
//! ### String Operations
//! - `set key value` / `get key`
//!
//! ### Key Operations
//! - `del key [key ...]`
//! - `expire key seconds`
//!
//! ### Hash Operations
//! - `hset key field value` / `hget key field` / `hdel key [field ...]`
//!
//! ### Set Operations
//! - `sadd key [member ...]` / `sismember key member`
//!
//! ## Module Overview
//!
//! - [`command`]: typed command and reply envelopes
//! - [`config`]: engine construction options
//! - [`engine`]: the public engine handle and its typed API
//! - `storage` (internal): key directory, typed stores, and the expiration cycle
//!
//! ## Design Highlights
//!
//! ### Lazy + Active Expiry
//!
//! Keys with a TTL are removed in two ways:
//! 1. **Lazy**: the pre-execution validation step deletes an elapsed key the
//!    next time any command touches it
//! 2. **Active**: a background task periodically samples TTL-bearing keys and
//!    evicts the elapsed ones, draining bursts without waiting for access
//!
//! ### One Transaction Gate
//!
//! Commands and expiration passes share a single mutual-exclusion domain.
//! No two handlers, and no handler and an expiration pass, ever overlap.

pub mod command;
pub mod config;
pub mod engine;

mod storage;

// Re-export commonly used types for convenience
pub use command::{Command, Reply};
pub use config::Config;
pub use engine::Engine;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for engine operations.
///
/// Every public call returns `Result<T, Error>`. On error the value slot is
/// absent; a successful empty read (for example `get` on a missing key)
/// returns the shape's empty default with no error, so callers must check
/// the error rather than infer failure from an empty-looking value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A new key would be created while the directory already holds the
    /// configured maximum number of distinct keys.
    #[error("keys count limit: {limit}")]
    CapacityExceeded { limit: usize },

    /// The operation requires a type that conflicts with the key's current
    /// binding.
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,

    /// A malformed argument, such as a non-positive expiration duration.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A handler populated a reply slot with the wrong shape. This guards
    /// against engine bugs, not user input.
    #[error("reply kind mismatch: expected {expected}, got {actual}")]
    ReplyMismatch {
        expected: &'static str,
        actual: &'static str,
    },
}

/// Version of EmberKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
