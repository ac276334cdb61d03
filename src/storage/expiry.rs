//! Active Expiration Cycle
//!
//! Lazy expiry only removes a key when something touches it. A key that
//! expires and is never accessed again would otherwise stay in memory for
//! the lifetime of the process, so a background task periodically sweeps
//! the TTL table and evicts elapsed keys.
//!
//! The cycle runs as a tokio task:
//! 1. sleep for the configured period (default: 100ms)
//! 2. take the transaction gate
//! 3. run one adaptive sampling pass ([`Db::purge_expired`])
//! 4. release the gate and go back to sleep
//!
//! Because the pass holds the same lock as command execution, it never
//! overlaps a handler; a tick is just another serialized transaction.
//!
//! The task is tied to the engine's lifetime through [`ExpiryCycle`]: the
//! handle carries the stop signal, and dropping it terminates the loop.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::config::DEFAULT_CYCLE_INTERVAL;
use crate::storage::db::Db;

/// A handle to the running expiration cycle.
///
/// The cycle stops when [`ExpiryCycle::stop`] is called or the handle is
/// dropped.
#[derive(Debug)]
pub(crate) struct ExpiryCycle {
    /// Sender to signal shutdown
    shutdown_tx: watch::Sender<bool>,
}

impl ExpiryCycle {
    /// Starts the expiration cycle as a background task.
    ///
    /// A zero `interval` falls back to [`DEFAULT_CYCLE_INTERVAL`].
    ///
    /// Must be called from within a tokio runtime context.
    pub(crate) fn start(db: Arc<Mutex<Db>>, interval: Duration) -> Self {
        let interval = if interval.is_zero() {
            DEFAULT_CYCLE_INTERVAL
        } else {
            interval
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(cycle_loop(db, interval, shutdown_rx));

        info!(period_ms = interval.as_millis() as u64, "active expiration cycle started");

        Self { shutdown_tx }
    }

    /// Stops the expiration cycle.
    ///
    /// Called automatically when the handle is dropped.
    pub(crate) fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

impl Drop for ExpiryCycle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The main cycle loop.
async fn cycle_loop(db: Arc<Mutex<Db>>, interval: Duration, mut shutdown_rx: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    info!("active expiration cycle stopped");
                    return;
                }
            }
        }

        let (evicted, remaining) = {
            let mut db = db.lock().unwrap();
            (db.purge_expired(), db.len())
        };

        if evicted > 0 {
            debug!(evicted, remaining, "expired keys evicted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Command, Reply};
    use bytes::Bytes;

    fn populate(db: &Arc<Mutex<Db>>, count: usize, ttl_seconds: Option<i64>) {
        let mut db = db.lock().unwrap();
        for i in 0..count {
            let key = format!("key:{i}");
            db.execute(Command::Set {
                key: key.clone(),
                value: Bytes::from("value"),
            })
            .unwrap();
            if let Some(seconds) = ttl_seconds {
                assert_eq!(
                    db.execute(Command::Expire { key, seconds }),
                    Ok(Reply::Int(1))
                );
            }
        }
    }

    #[tokio::test]
    async fn test_cycle_evicts_without_access() {
        let db = Arc::new(Mutex::new(Db::new(100)));
        populate(&db, 10, Some(1));
        populate(&db, 1, None);
        assert_eq!(db.lock().unwrap().len(), 11);

        let _cycle = ExpiryCycle::start(Arc::clone(&db), Duration::from_millis(20));

        // Past the one-second deadline plus a few ticks, only the
        // persistent key remains, with no command having touched the rest.
        tokio::time::sleep(Duration::from_millis(1300)).await;
        assert_eq!(db.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cycle_stops_on_drop() {
        let db = Arc::new(Mutex::new(Db::new(100)));

        {
            let _cycle = ExpiryCycle::start(Arc::clone(&db), Duration::from_millis(10));
            tokio::time::sleep(Duration::from_millis(30)).await;
            // Cycle handle dropped here.
        }
        tokio::time::sleep(Duration::from_millis(30)).await;

        populate(&db, 5, Some(1));
        tokio::time::sleep(Duration::from_millis(1200)).await;

        // Nothing swept the elapsed keys; they are still bound until a
        // command lazily expires them.
        assert_eq!(db.lock().unwrap().len(), 5);
        let reply = db.lock().unwrap().execute(Command::Get {
            key: "key:0".to_string(),
        });
        assert_eq!(reply, Ok(Reply::Bytes(Bytes::new())));
        assert_eq!(db.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_zero_interval_uses_default() {
        let db = Arc::new(Mutex::new(Db::new(100)));
        populate(&db, 3, Some(1));

        let _cycle = ExpiryCycle::start(Arc::clone(&db), Duration::ZERO);

        // The default 100ms period still drains the keys once elapsed.
        tokio::time::sleep(Duration::from_millis(1400)).await;
        assert_eq!(db.lock().unwrap().len(), 0);
    }
}
