//! Public Engine Handle
//!
//! [`Engine`] owns the locked database and the background expiration cycle.
//! Every public call builds a typed [`Command`], runs it through the
//! transaction gate, and extracts the shape the command declares from the
//! [`Reply`].
//!
//! ## Concurrency Model
//!
//! Calls are synchronous and block the calling context until the gate is
//! acquired. Validation, handler execution, and reply production happen in
//! one critical section, so the engine behaves as a single, strictly-ordered
//! sequence of transactions across all callers and all expiration passes.
//!
//! # Example
//!
//! ```no_run
//! use emberkv::{Config, Engine};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> emberkv::Result<()> {
//!     let engine = Arc::new(Engine::new(Config::new(4096)));
//!
//!     engine.set("session:9", "token")?;
//!     engine.expire("session:9", 60)?;
//!     assert_eq!(engine.get("session:9")?, "token");
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tracing::trace;

use crate::command::{Command, Reply};
use crate::config::Config;
use crate::storage::{Db, ExpiryCycle};
use crate::Result;

/// An embeddable, in-memory, multi-type key-value engine.
///
/// Thread-safe: wrap it in an [`Arc`] and share it across callers. All
/// state is volatile and lost when the engine is dropped.
pub struct Engine {
    /// The transaction gate and the state it protects
    db: Arc<Mutex<Db>>,
    /// Background eviction task, stopped when the engine is dropped
    cycle: ExpiryCycle,
}

impl Engine {
    /// Creates an engine and starts its active expiration cycle.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime context; the engine
    /// spawns its expiration task onto the current runtime.
    pub fn new(config: Config) -> Self {
        let db = Arc::new(Mutex::new(Db::new(config.max_keys)));
        let cycle = ExpiryCycle::start(Arc::clone(&db), config.cycle_interval);
        Self { db, cycle }
    }

    /// Executes one typed command and returns its reply.
    ///
    /// This is the seam a protocol host maps requests onto; the methods
    /// below are convenience wrappers that also extract the declared reply
    /// shape.
    pub fn execute(&self, command: Command) -> Result<Reply> {
        trace!(command = command.name(), "executing");
        let mut db = self.db.lock().unwrap();
        db.execute(command)
    }

    /// Stops the active expiration cycle.
    ///
    /// Lazy expiry keeps working; only the background eviction stops. Also
    /// performed when the engine is dropped.
    pub fn shutdown(&self) {
        self.cycle.stop();
    }

    /// Count of live bound keys.
    pub fn len(&self) -> usize {
        self.db.lock().unwrap().len()
    }

    /// Returns true if no key is bound.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ========================================================================
    // STRING API
    // ========================================================================

    /// Binds `key` as a string and overwrites its value.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Bytes>) -> Result<bool> {
        self.execute(Command::Set {
            key: key.into(),
            value: value.into(),
        })?
        .into_bool()
    }

    /// Reads a string key. A missing key reads as empty bytes with no
    /// error.
    pub fn get(&self, key: impl Into<String>) -> Result<Bytes> {
        self.execute(Command::Get { key: key.into() })?.into_bytes()
    }

    // ========================================================================
    // KEY API
    // ========================================================================

    /// Removes keys of any type. Returns how many were actually bound.
    pub fn del<I>(&self, keys: I) -> Result<i64>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.execute(Command::Del {
            keys: keys.into_iter().map(Into::into).collect(),
        })?
        .into_int()
    }

    /// Sets an expiration `seconds` from now. Returns 1 if the key exists,
    /// 0 otherwise. `seconds` must be positive.
    pub fn expire(&self, key: impl Into<String>, seconds: i64) -> Result<i64> {
        self.execute(Command::Expire {
            key: key.into(),
            seconds,
        })?
        .into_int()
    }

    // ========================================================================
    // HASH API
    // ========================================================================

    /// Writes one field of a hash. Returns 1 for a fresh field, 0 for an
    /// overwrite.
    pub fn hset(
        &self,
        key: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<Bytes>,
    ) -> Result<i64> {
        self.execute(Command::HSet {
            key: key.into(),
            field: field.into(),
            value: value.into(),
        })?
        .into_int()
    }

    /// Reads one field of a hash. A missing key or field reads as empty
    /// bytes with no error.
    pub fn hget(&self, key: impl Into<String>, field: impl Into<String>) -> Result<Bytes> {
        self.execute(Command::HGet {
            key: key.into(),
            field: field.into(),
        })?
        .into_bytes()
    }

    /// Removes hash fields. Returns how many were present.
    pub fn hdel<I>(&self, key: impl Into<String>, fields: I) -> Result<i64>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.execute(Command::HDel {
            key: key.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        })?
        .into_int()
    }

    // ========================================================================
    // SET API
    // ========================================================================

    /// Inserts set members. Returns how many were newly added.
    pub fn sadd<I>(&self, key: impl Into<String>, members: I) -> Result<i64>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.execute(Command::SAdd {
            key: key.into(),
            members: members.into_iter().map(Into::into).collect(),
        })?
        .into_int()
    }

    /// Membership test: 1 if present, 0 if the key or member is absent.
    pub fn sismember(&self, key: impl Into<String>, member: impl Into<String>) -> Result<i64> {
        self.execute(Command::SIsMember {
            key: key.into(),
            member: member.into(),
        })?
        .into_int()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine").field("keys", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::time::Duration;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }

    fn engine(max_keys: usize) -> Engine {
        Engine::new(Config::new(max_keys))
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let engine = engine(10);
        assert!(engine.set("k", "v").unwrap());
        assert_eq!(engine.get("k").unwrap(), "v");
    }

    #[tokio::test]
    async fn test_get_missing_is_empty_not_error() {
        let engine = engine(10);
        assert_eq!(engine.get("missing").unwrap(), Bytes::new());
    }

    #[tokio::test]
    async fn test_capacity_invariant() {
        let engine = engine(3);
        for i in 0..3 {
            engine.set(format!("k{i}"), "v").unwrap();
        }
        assert_eq!(engine.len(), 3);

        // The fourth distinct key is rejected.
        assert_eq!(
            engine.set("k3", "v"),
            Err(Error::CapacityExceeded { limit: 3 })
        );
        assert_eq!(engine.len(), 3);

        // Overwriting at the limit always succeeds.
        assert!(engine.set("k0", "v2").unwrap());
        assert_eq!(engine.get("k0").unwrap(), "v2");

        // Deleting frees the slot.
        assert_eq!(engine.del(["k1"]).unwrap(), 1);
        assert!(engine.set("k3", "v").unwrap());
    }

    #[tokio::test]
    async fn test_type_invariant() {
        let engine = engine(10);
        engine.sadd("s", ["a"]).unwrap();

        assert_eq!(engine.set("s", "v"), Err(Error::WrongType));
        assert_eq!(engine.get("s"), Err(Error::WrongType));
        assert_eq!(engine.hget("s", "f"), Err(Error::WrongType));

        // A full deletion releases the binding.
        assert_eq!(engine.del(["s"]).unwrap(), 1);
        assert!(engine.set("s", "v").unwrap());
    }

    #[tokio::test]
    async fn test_idempotent_deletion() {
        let engine = engine(10);
        engine.set("k", "v").unwrap();
        assert_eq!(engine.del(["k"]).unwrap(), 1);
        assert_eq!(engine.del(["k"]).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_multi_key_delete() {
        let engine = engine(10);
        engine.hset("h1", "f", "v").unwrap();
        engine.sadd("s1", ["a"]).unwrap();

        assert_eq!(engine.del(["h1", "s1", "missing"]).unwrap(), 2);
        assert_eq!(engine.hget("h1", "f").unwrap(), Bytes::new());
        assert_eq!(engine.sismember("s1", "a").unwrap(), 0);
    }

    #[tokio::test]
    async fn test_expiration_end_to_end() {
        init_tracing();
        let engine = engine(10);
        engine.set("k", "v").unwrap();

        assert_eq!(engine.expire("k", 1).unwrap(), 1);
        assert_eq!(engine.expire("missing", 1).unwrap(), 0);

        // Still present before the deadline.
        assert_eq!(engine.get("k").unwrap(), "v");

        tokio::time::sleep(Duration::from_millis(1300)).await;
        assert_eq!(engine.get("k").unwrap(), Bytes::new());
        assert_eq!(engine.len(), 0);
    }

    #[tokio::test]
    async fn test_expire_rejects_non_positive_seconds() {
        let engine = engine(10);
        engine.set("k", "v").unwrap();
        assert!(matches!(
            engine.expire("k", 0),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_active_cycle_drains_untouched_keys() {
        let engine = Engine::new(
            Config::new(100).with_cycle_interval(Duration::from_millis(20)),
        );
        for i in 0..10 {
            let key = format!("k{i}");
            engine.set(key.clone(), "v").unwrap();
            engine.expire(key, 1).unwrap();
        }
        engine.set("keeper", "v").unwrap();

        // No command touches the expiring keys; the cycle alone evicts them.
        tokio::time::sleep(Duration::from_millis(1300)).await;
        assert_eq!(engine.len(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_stops_active_eviction() {
        let engine = Engine::new(
            Config::new(100).with_cycle_interval(Duration::from_millis(10)),
        );
        engine.shutdown();
        tokio::time::sleep(Duration::from_millis(30)).await;

        engine.set("k", "v").unwrap();
        engine.expire("k", 1).unwrap();
        tokio::time::sleep(Duration::from_millis(1300)).await;

        // Only lazy expiry is left, so the key stays bound until touched.
        assert_eq!(engine.len(), 1);
        assert_eq!(engine.get("k").unwrap(), Bytes::new());
        assert_eq!(engine.len(), 0);
    }

    #[tokio::test]
    async fn test_hash_roundtrip() {
        let engine = engine(10);
        assert_eq!(engine.hset("h", "f", "v").unwrap(), 1);
        assert_eq!(engine.hset("h", "f", "v2").unwrap(), 0);
        assert_eq!(engine.hget("h", "f").unwrap(), "v2");

        assert_eq!(engine.hdel("h", ["f", "absent"]).unwrap(), 1);
        // The emptied hash is still bound.
        assert_eq!(engine.len(), 1);
    }

    #[tokio::test]
    async fn test_set_semantics() {
        let engine = engine(10);
        assert_eq!(engine.sadd("s", ["a", "b"]).unwrap(), 2);
        assert_eq!(engine.sadd("s", ["a", "b", "c"]).unwrap(), 1);

        assert_eq!(engine.sismember("s", "a").unwrap(), 1);
        assert_eq!(engine.sismember("s", "z").unwrap(), 0);

        engine.del(["s"]).unwrap();
        assert_eq!(engine.sismember("s", "a").unwrap(), 0);
    }

    #[tokio::test]
    async fn test_execute_with_typed_command() {
        let engine = engine(10);
        let reply = engine
            .execute(Command::Set {
                key: "k".to_string(),
                value: Bytes::from("v"),
            })
            .unwrap();
        assert_eq!(reply, Reply::Bool(true));

        let reply = engine.execute(Command::Del { keys: Vec::new() }).unwrap();
        assert_eq!(reply, Reply::Int(0));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_set_get_pairs() {
        use std::thread;

        let engine = Arc::new(engine(10_000));
        let mut handles = vec![];

        for t in 0..8 {
            let engine = Arc::clone(&engine);
            handles.push(thread::spawn(move || {
                for i in 0..100 {
                    let key = format!("key:{t}:{i}");
                    let value = format!("value:{t}:{i}");
                    engine.set(key.clone(), value.clone()).unwrap();
                    // The write is visible to its own follow-up read.
                    assert_eq!(engine.get(key).unwrap(), value.as_str());
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(engine.len(), 800);
    }
}
