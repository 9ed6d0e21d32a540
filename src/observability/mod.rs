//! Observability: structured JSON logging
//!
//! # Principles
//!
//! 1. Logging is read-only: it never changes the outcome of an operation
//! 2. Synchronous, no background threads
//! 3. Deterministic output
//!
//! # Usage
//!
//! ```ignore
//! use xmlstore::observability::{Logger, ObservationScope, Phase};
//!
//! Logger::info("CAPACITY_EXCEEDED", &[("what", "element names")]);
//!
//! let scope = ObservationScope::new(Phase::Build);
//! // ... do work ...
//! scope.complete();
//! ```

mod events;
mod logger;
mod scope;

pub use events::{Event, Phase};
pub use logger::{Logger, Severity};
pub use scope::ObservationScope;
