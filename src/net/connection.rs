//! Connection admission and lifecycle tracking.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Admit connections against the configured in-flight ceiling
//! - Release the admission slot on every exit path of a worker

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Counts in-flight connections and rejects new ones over a ceiling.
///
/// The check and the increment happen in one compare-and-swap, so two
/// concurrent admissions can never push the count past `max_connections`.
#[derive(Debug)]
pub struct AdmissionGate {
    in_flight: AtomicUsize,
    max_connections: usize,
}

impl AdmissionGate {
    /// Create a gate admitting at most `max_connections` at once.
    pub fn new(max_connections: usize) -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            max_connections,
        }
    }

    /// Try to take a slot. Returns `None` when the ceiling has been reached;
    /// the count is left untouched in that case.
    pub fn try_admit(self: &Arc<Self>) -> Option<ConnectionGuard> {
        let mut current = self.in_flight.load(Ordering::Acquire);
        loop {
            if current >= self.max_connections {
                return None;
            }
            match self.in_flight.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
        Some(ConnectionGuard {
            gate: Arc::clone(self),
            id: ConnectionId::new(),
        })
    }

    /// Current number of admitted, not yet finished connections.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Configured ceiling.
    pub fn max_connections(&self) -> usize {
        self.max_connections
    }
}

/// Guard that holds one admission slot.
/// Decrements the in-flight count when dropped, including during unwinding.
#[derive(Debug)]
pub struct ConnectionGuard {
    gate: Arc<AdmissionGate>,
    id: ConnectionId,
}

impl ConnectionGuard {
    /// Get this connection's ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.gate.in_flight.fetch_sub(1, Ordering::AcqRel);
        tracing::trace!(connection_id = %self.id, "Connection released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_id_unique() {
        let id1 = ConnectionId::new();
        let id2 = ConnectionId::new();
        assert_ne!(id1, id2);
        assert!(id2 > id1);
    }

    #[test]
    fn gate_counts_and_releases() {
        let gate = Arc::new(AdmissionGate::new(2));
        assert_eq!(gate.in_flight(), 0);

        let guard1 = gate.try_admit().unwrap();
        assert_eq!(gate.in_flight(), 1);

        let guard2 = gate.try_admit().unwrap();
        assert_eq!(gate.in_flight(), 2);

        drop(guard1);
        assert_eq!(gate.in_flight(), 1);

        drop(guard2);
        assert_eq!(gate.in_flight(), 0);
    }

    #[test]
    fn rejection_leaves_count_unchanged() {
        let gate = Arc::new(AdmissionGate::new(1));
        let _held = gate.try_admit().unwrap();

        assert!(gate.try_admit().is_none());
        assert!(gate.try_admit().is_none());
        assert_eq!(gate.in_flight(), 1);
    }

    #[test]
    fn concurrent_admissions_never_exceed_ceiling() {
        let gate = Arc::new(AdmissionGate::new(8));
        let handles: Vec<_> = (0..32)
            .map(|_| {
                let gate = Arc::clone(&gate);
                std::thread::spawn(move || gate.try_admit())
            })
            .collect();

        let guards: Vec<_> = handles
            .into_iter()
            .filter_map(|h| h.join().unwrap())
            .collect();

        assert_eq!(guards.len(), 8);
        assert_eq!(gate.in_flight(), 8);
        drop(guards);
        assert_eq!(gate.in_flight(), 0);
    }
}
