//! Core types shared across the dashkit crates
//!
//! - **Correlation types**: CorrelationId, EnvelopeId
//! - **Sensitive data**: Sensitive<T> marker for automatic redaction
//! - **Schema constants**: canonical log field keys, log event names and
//!   the command/event type namespaces

pub mod correlation;
pub mod schema;
pub mod sensitive;

pub use correlation::{CorrelationId, EnvelopeId};
pub use sensitive::Sensitive;
