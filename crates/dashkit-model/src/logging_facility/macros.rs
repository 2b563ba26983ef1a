//! Operation logging macros
//!
//! Every command processed by the runtime is logged as one operation: a
//! `start` event, then either `end` or `end_error`. The operation name is
//! the command type. Extra `key = value` fields pass through to `tracing`.

/// Shared body of the operation macros; not part of the public surface
#[doc(hidden)]
#[macro_export]
macro_rules! __dashkit_op_event {
    ($level:ident, $op:expr, $event:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = module_path!(),
            op = $op,
            event = $event,
            $($($field)*)?
        )
    };
}

/// Log that processing of an operation began
///
/// # Example
///
/// ```
/// # use dashkit_model::log_op_start;
/// log_op_start!("GDC.DASH/CMD.RENAME");
/// log_op_start!("GDC.DASH/CMD.RENAME", correlation_id = "c1");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr $(, $($field:tt)*)?) => {
        $crate::__dashkit_op_event!(info, $op, $crate::schema::EVENT_START $(, $($field)*)?)
    };
}

/// Log that an operation settled successfully after `duration_ms`
///
/// # Example
///
/// ```
/// # use dashkit_model::log_op_end;
/// log_op_end!("GDC.DASH/CMD.RENAME", duration_ms = 3);
/// log_op_end!("GDC.DASH/CMD.RENAME", duration_ms = 3, event_type = "GDC.DASH/EVT.RENAMED");
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {
        $crate::__dashkit_op_event!(
            info,
            $op,
            $crate::schema::EVENT_END,
            duration_ms = $duration
            $(, $($field)*)?
        )
    };
}

/// Log that an operation settled with an error
///
/// The error is converted into `ExError` so the line carries the stable
/// `err.code` and `err.kind` fields.
///
/// # Example
///
/// ```
/// # use dashkit_model::{log_op_error, errors::DashboardError};
/// log_op_error!("GDC.DASH/CMD.FLUID_LAYOUT.UNDO", DashboardError::NothingToUndo, duration_ms = 1);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {{
        let ex: $crate::errors::ExError = $err.into();
        $crate::__dashkit_op_event!(
            error,
            $op,
            $crate::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err.kind = ?ex.kind(),
            err.code = ex.code(),
            message = ex.message()
            $(, $($field)*)?
        )
    }};
}
