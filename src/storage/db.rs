//! Engine Database: Key Directory, Typed Stores, and Command Handlers
//!
//! This module implements the interior of the engine, the state protected by
//! the transaction gate. It holds:
//!
//! - the key directory, mapping each live key to the kind of value it is
//!   bound to,
//! - the TTL table of absolute expiration instants,
//! - three independent typed stores (strings, hashes, sets),
//! - the handlers for every command, reached through one exhaustive
//!   dispatch.
//!
//! ## Invariants
//!
//! - A key is bound to at most one kind at a time; the kind is fixed until
//!   the key is fully removed.
//! - A directory entry exists if and only if the matching typed store holds
//!   an entry for that key.
//! - The directory never holds more than `max_keys` entries; the bound gates
//!   creation only, never overwrites of an already-bound key.
//! - A TTL entry exists only for a bound key.
//!
//! ## Pre-Execution Validation
//!
//! Every handler except `expire` runs [`Db::validate`] before touching any
//! store. The check order is a contract:
//!
//! 1. capacity, evaluated against the directory as it is, before any expiry
//! 2. required-kind check against the key's current binding
//! 3. lazy expiry: an elapsed key is fully unbound before the handler runs
//!
//! Because capacity and kind are checked first, a key whose TTL has elapsed
//! but has not been purged yet still answers those checks with its stale
//! binding on the very call that expires it.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use bytes::Bytes;

use crate::command::{Command, Reply};
use crate::{Error, Result};

/// Upper bound on TTL entries considered per sampling pass of
/// [`Db::purge_expired`].
const SAMPLE_LIMIT: usize = 100;

/// Eviction rate above which a purge keeps drawing fresh samples.
const PURGE_CONTINUE_RATE: f64 = 0.25;

/// The kind of value a key is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ValueKind {
    String,
    Hash,
    Set,
}

/// The engine's shared state. All access goes through the transaction gate;
/// `&mut self` on every mutating method makes that explicit.
#[derive(Debug)]
pub(crate) struct Db {
    /// Key directory: current binding of every live key
    kinds: HashMap<String, ValueKind>,
    /// Absolute expiration instants, keyed like the directory
    ttl: HashMap<String, Instant>,
    /// String store
    strings: HashMap<String, Bytes>,
    /// Hash store: field to bytes, fields unique within a hash
    hashes: HashMap<String, HashMap<String, Bytes>>,
    /// Set store: unique members, membership only
    sets: HashMap<String, HashSet<String>>,
    /// Maximum count of distinct bound keys
    max_keys: usize,
}

impl Db {
    pub(crate) fn new(max_keys: usize) -> Self {
        Self {
            kinds: HashMap::new(),
            ttl: HashMap::new(),
            strings: HashMap::new(),
            hashes: HashMap::new(),
            sets: HashMap::new(),
            max_keys,
        }
    }

    /// Count of live bound keys.
    pub(crate) fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Executes one command against the database.
    ///
    /// Dispatch is exhaustive over the command set; adding a command variant
    /// fails to compile until it is handled here.
    pub(crate) fn execute(&mut self, command: Command) -> Result<Reply> {
        match command {
            Command::Set { key, value } => self.set(key, value),
            Command::Get { key } => self.get(&key),
            Command::Del { keys } => self.del(&keys),
            Command::Expire { key, seconds } => self.expire(&key, seconds),
            Command::HSet { key, field, value } => self.hset(key, field, value),
            Command::HGet { key, field } => self.hget(&key, &field),
            Command::HDel { key, fields } => self.hdel(&key, &fields),
            Command::SAdd { key, members } => self.sadd(key, members),
            Command::SIsMember { key, member } => self.sismember(&key, &member),
        }
    }

    // ========================================================================
    // KEY DIRECTORY & VALIDATION
    // ========================================================================

    /// Pre-execution validation. `required` of `None` means the command
    /// accepts a key of any kind (deletion paths).
    ///
    /// The order of the three checks is load-bearing; see the module docs.
    fn validate(&mut self, key: &str, required: Option<ValueKind>) -> Result<()> {
        // 1. Capacity gates creation of new keys only.
        if self.kinds.len() >= self.max_keys && !self.kinds.contains_key(key) {
            return Err(Error::CapacityExceeded {
                limit: self.max_keys,
            });
        }

        // 2. Kind check against the current (pre-expiry) binding.
        if let (Some(required), Some(&bound)) = (required, self.kinds.get(key)) {
            if bound != required {
                return Err(Error::WrongType);
            }
        }

        // 3. Lazy expiry: an elapsed deadline unbinds the key right now.
        if let Some(&deadline) = self.ttl.get(key) {
            if Instant::now() > deadline {
                self.unbind(key);
            }
        }

        Ok(())
    }

    /// Records `key` as bound to `kind`. Only the unbound-to-bound
    /// transition inserts; callers must have passed the kind check, so an
    /// existing binding is already `kind`.
    fn bind(&mut self, key: &str, kind: ValueKind) {
        debug_assert!(self.kinds.get(key).map_or(true, |&bound| bound == kind));
        if !self.kinds.contains_key(key) {
            self.kinds.insert(key.to_string(), kind);
        }
    }

    /// Fully removes a key: directory entry, TTL entry, and the typed store
    /// entry. Reports whether the key was bound.
    fn unbind(&mut self, key: &str) -> bool {
        self.ttl.remove(key);
        match self.kinds.remove(key) {
            Some(ValueKind::String) => {
                self.strings.remove(key);
            }
            Some(ValueKind::Hash) => {
                self.hashes.remove(key);
            }
            Some(ValueKind::Set) => {
                self.sets.remove(key);
            }
            None => return false,
        }
        true
    }

    // ========================================================================
    // STRING OPERATIONS
    // ========================================================================

    /// Binds the key as a string and overwrites its value unconditionally.
    fn set(&mut self, key: String, value: Bytes) -> Result<Reply> {
        self.validate(&key, Some(ValueKind::String))?;
        self.bind(&key, ValueKind::String);
        self.strings.insert(key, value);
        Ok(Reply::Bool(true))
    }

    /// Reads a string key. An unbound key reads as empty bytes.
    fn get(&mut self, key: &str) -> Result<Reply> {
        self.validate(key, Some(ValueKind::String))?;
        let value = self.strings.get(key).cloned().unwrap_or_default();
        Ok(Reply::Bytes(value))
    }

    // ========================================================================
    // KEY OPERATIONS
    // ========================================================================

    /// Removes keys of any kind, counting the ones that were bound.
    ///
    /// All keys are validated (with lazy expiry applied) before the first
    /// removal, so a validation failure mutates nothing beyond the expiry
    /// step itself. A key expired during validation counts as not bound.
    fn del(&mut self, keys: &[String]) -> Result<Reply> {
        for key in keys {
            self.validate(key, None)?;
        }

        let mut removed = 0;
        for key in keys {
            if self.unbind(key) {
                removed += 1;
            }
        }
        Ok(Reply::Int(removed))
    }

    /// Sets an expiration `seconds` from now on an existing key.
    ///
    /// Runs no pre-execution validation: the non-positive duration is
    /// rejected before any mutation, an unbound key yields 0, and a bound
    /// key gets its deadline overwritten (even one already elapsed but not
    /// yet purged).
    fn expire(&mut self, key: &str, seconds: i64) -> Result<Reply> {
        if seconds <= 0 {
            return Err(Error::InvalidArgument(format!(
                "expire seconds must be a positive integer, got {seconds}"
            )));
        }
        if !self.kinds.contains_key(key) {
            return Ok(Reply::Int(0));
        }
        self.ttl.insert(
            key.to_string(),
            Instant::now() + Duration::from_secs(seconds as u64),
        );
        Ok(Reply::Int(1))
    }

    // ========================================================================
    // HASH OPERATIONS
    // ========================================================================

    /// Writes one field of a hash. Returns 1 for a fresh field, 0 for an
    /// overwrite.
    fn hset(&mut self, key: String, field: String, value: Bytes) -> Result<Reply> {
        self.validate(&key, Some(ValueKind::Hash))?;
        self.bind(&key, ValueKind::Hash);
        let entries = self.hashes.entry(key).or_default();
        let fresh = !entries.contains_key(&field);
        entries.insert(field, value);
        Ok(Reply::Int(i64::from(fresh)))
    }

    /// Reads one field of a hash. An unbound key or absent field reads as
    /// empty bytes.
    fn hget(&mut self, key: &str, field: &str) -> Result<Reply> {
        self.validate(key, Some(ValueKind::Hash))?;
        let value = self
            .hashes
            .get(key)
            .and_then(|entries| entries.get(field))
            .cloned()
            .unwrap_or_default();
        Ok(Reply::Bytes(value))
    }

    /// Removes fields from a hash, counting the ones that were present.
    ///
    /// A hash emptied of its last field stays bound and keeps its capacity
    /// slot; only `del` or expiry releases the key.
    fn hdel(&mut self, key: &str, fields: &[String]) -> Result<Reply> {
        self.validate(key, Some(ValueKind::Hash))?;
        let Some(entries) = self.hashes.get_mut(key) else {
            return Ok(Reply::Int(0));
        };
        let mut removed = 0;
        for field in fields {
            if entries.remove(field).is_some() {
                removed += 1;
            }
        }
        Ok(Reply::Int(removed))
    }

    // ========================================================================
    // SET OPERATIONS
    // ========================================================================

    /// Inserts members into a set, counting the ones not already present.
    /// Binds the key as a set even when `members` is empty.
    fn sadd(&mut self, key: String, members: Vec<String>) -> Result<Reply> {
        self.validate(&key, Some(ValueKind::Set))?;
        self.bind(&key, ValueKind::Set);
        let set = self.sets.entry(key).or_default();
        let mut added = 0;
        for member in members {
            if set.insert(member) {
                added += 1;
            }
        }
        Ok(Reply::Int(added))
    }

    /// Membership test: 1 if the member is present, 0 if the key is unbound
    /// or the member absent.
    fn sismember(&mut self, key: &str, member: &str) -> Result<Reply> {
        self.validate(key, Some(ValueKind::Set))?;
        let present = self.sets.get(key).is_some_and(|set| set.contains(member));
        Ok(Reply::Int(i64::from(present)))
    }

    // ========================================================================
    // ACTIVE EXPIRATION
    // ========================================================================

    /// One adaptive eviction pass over the TTL table, run by the background
    /// cycle while it holds the transaction gate.
    ///
    /// Repeatedly samples up to [`SAMPLE_LIMIT`] TTL entries (map iteration
    /// order, unspecified) and fully unbinds the ones whose deadline lies
    /// before the pass start time. Sampling continues while more than a
    /// quarter of a sample turned out expired, which drains bursts of
    /// simultaneous expirations while bounding the work of a quiet tick.
    ///
    /// Returns the number of keys evicted.
    pub(crate) fn purge_expired(&mut self) -> usize {
        let pass_start = Instant::now();
        let mut evicted = 0;
        let mut rate = 1.0;

        while rate > PURGE_CONTINUE_RATE {
            let mut expired: Vec<String> = Vec::new();
            // The denominator starts at one so a lone expired entry does not
            // read as a 100% hit and force another sample.
            let mut sampled = 1;
            for (key, deadline) in &self.ttl {
                if sampled >= SAMPLE_LIMIT {
                    break;
                }
                sampled += 1;
                if pass_start > *deadline {
                    expired.push(key.clone());
                }
            }

            rate = expired.len() as f64 / sampled as f64;
            for key in &expired {
                self.unbind(key);
            }
            evicted += expired.len();
        }

        evicted
    }
}
