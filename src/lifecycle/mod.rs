//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Init logging/metrics → Bind listener → Run
//!
//! Shutdown (shutdown.rs):
//!     stop() → Stop accepting → Close listener → Drain workers → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → stop()
//! ```
//!
//! # Design Decisions
//! - In-flight connections are never interrupted
//! - There is no per-request timeout, so draining waits for slow clients

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownSignal};
pub use signals::terminate_signal;
