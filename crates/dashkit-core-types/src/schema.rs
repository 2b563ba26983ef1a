//! Canonical schema constants for structured logging and the wire surface
//!
//! These constants keep log fields and command/event type names consistent
//! across the model, the runtime and the CLI.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_CORRELATION_ID: &str = "correlation_id";
pub const FIELD_ENVELOPE_ID: &str = "envelope_id";

// Command/event identification
pub const FIELD_COMMAND_TYPE: &str = "command_type";
pub const FIELD_EVENT_TYPE: &str = "event_type";

// Error fields
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";

// Canonical log event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";

// Wire namespaces
pub const COMMAND_TYPE_PREFIX: &str = "GDC.DASH/CMD.";
pub const EVENT_TYPE_PREFIX: &str = "GDC.DASH/EVT.";

/// Placeholder used in log lines for commands without a correlation id
pub const NO_CORRELATION_ID: &str = "(no correlationId provided)";
