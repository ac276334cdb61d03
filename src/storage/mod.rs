//! Storage Module
//!
//! The engine's interior: the locked database ([`db::Db`]) holding the key
//! directory, TTL table, and the three typed stores, plus the background
//! expiration cycle ([`expiry::ExpiryCycle`]) that sweeps elapsed keys.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                     Mutex<Db>                       │
//! │  ┌───────────┐ ┌───────────┐ ┌───────┐ ┌────────┐  │
//! │  │ directory │ │ TTL table │ │ typed │ │dispatch│  │
//! │  │  (kinds)  │ │(deadlines)│ │stores │ │        │  │
//! │  └───────────┘ └───────────┘ └───────┘ └────────┘  │
//! └─────────────────────────────────────────────────────┘
//!                          ▲
//!                          │
//!              ┌───────────┴────────────┐
//!              │       ExpiryCycle      │
//!              │ (background tokio task)│
//!              └────────────────────────┘
//! ```
//!
//! Everything in here is crate-internal; hosts go through
//! [`Engine`](crate::Engine).

pub(crate) mod db;
pub(crate) mod expiry;

pub(crate) use db::Db;
pub(crate) use expiry::ExpiryCycle;
