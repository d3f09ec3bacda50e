//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (single sequential accept loop)
//!     → connection.rs (admission gate, slot guard, connection id)
//!     → pool.rs (bounded queue, fixed number of workers)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - Over-limit connections are refused with a 503, never queued
//! - The admission slot is released by a drop guard on every exit path
//! - Workers share nothing mutable except the admission counter

pub mod connection;
pub mod listener;
pub mod pool;

pub use connection::{AdmissionGate, ConnectionGuard, ConnectionId};
pub use listener::{Listener, ListenerError};
pub use pool::WorkerPool;
