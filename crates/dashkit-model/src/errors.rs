use dashkit_core_types::CorrelationId;
use thiserror::Error;

/// Result type alias using DashboardError
pub type Result<T> = std::result::Result<T, DashboardError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code used in log lines, in the CLI
/// output and in test assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Validation
    InvalidInput,
    InvalidTitle,
    InvalidIndex,
    NotFound,
    AlreadyExists,
    LimitExceeded,
    CycleDetected,
    NothingToUndo,
    FeatureDisabled,

    // Wire surface
    InvalidPayload,
    UnknownCommand,

    // State
    InvariantViolation,
    Serialization,

    // Integration
    Backend,
    Timeout,
    Unauthorised,
    Config,

    // Runtime
    Callback,
    RuntimeGone,

    // Internal
    Internal,
}

impl ExErrorKind {
    pub const ALL: [ExErrorKind; 20] = [
        ExErrorKind::InvalidInput,
        ExErrorKind::InvalidTitle,
        ExErrorKind::InvalidIndex,
        ExErrorKind::NotFound,
        ExErrorKind::AlreadyExists,
        ExErrorKind::LimitExceeded,
        ExErrorKind::CycleDetected,
        ExErrorKind::NothingToUndo,
        ExErrorKind::FeatureDisabled,
        ExErrorKind::InvalidPayload,
        ExErrorKind::UnknownCommand,
        ExErrorKind::InvariantViolation,
        ExErrorKind::Serialization,
        ExErrorKind::Backend,
        ExErrorKind::Timeout,
        ExErrorKind::Unauthorised,
        ExErrorKind::Config,
        ExErrorKind::Callback,
        ExErrorKind::RuntimeGone,
        ExErrorKind::Internal,
    ];

    /// Kind carrying the given stable code, e.g. from a published failure
    pub fn from_code(code: &str) -> Option<ExErrorKind> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }

    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::InvalidTitle => "ERR_INVALID_TITLE",
            ExErrorKind::InvalidIndex => "ERR_INVALID_INDEX",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::AlreadyExists => "ERR_ALREADY_EXISTS",
            ExErrorKind::LimitExceeded => "ERR_LIMIT_EXCEEDED",
            ExErrorKind::CycleDetected => "ERR_CYCLE_DETECTED",
            ExErrorKind::NothingToUndo => "ERR_NOTHING_TO_UNDO",
            ExErrorKind::FeatureDisabled => "ERR_FEATURE_DISABLED",
            ExErrorKind::InvalidPayload => "ERR_INVALID_PAYLOAD",
            ExErrorKind::UnknownCommand => "ERR_UNKNOWN_COMMAND",
            ExErrorKind::InvariantViolation => "ERR_INVARIANT_VIOLATION",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Backend => "ERR_BACKEND",
            ExErrorKind::Timeout => "ERR_TIMEOUT",
            ExErrorKind::Unauthorised => "ERR_UNAUTHORISED",
            ExErrorKind::Config => "ERR_CONFIG",
            ExErrorKind::Callback => "ERR_CALLBACK",
            ExErrorKind::RuntimeGone => "ERR_RUNTIME_GONE",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries the classification used by the logging macros together with
/// the command context the error was raised in.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    correlation_id: Option<CorrelationId>,
    command_type: Option<String>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            correlation_id: None,
            command_type: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity ID context (filter local id, display form, stash id, ...)
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add the correlation id of the command being processed
    pub fn with_correlation_id(mut self, correlation_id: CorrelationId) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    /// Add the wire type of the command being processed
    pub fn with_command_type(mut self, command_type: impl Into<String>) -> Self {
        self.command_type = Some(command_type.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    pub fn correlation_id(&self) -> Option<&CorrelationId> {
        self.correlation_id.as_ref()
    }

    pub fn command_type(&self) -> Option<&str> {
        self.command_type.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        if let Some(command_type) = &self.command_type {
            write!(f, " (command: {})", command_type)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|s| s as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Errors raised while validating and applying dashboard commands
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DashboardError {
    // ===== Filter context =====
    #[error("Display form {display_form} is already used by an attribute filter")]
    DisplayFormAlreadyFiltered { display_form: String },

    #[error("Display form not found: {display_form}")]
    DisplayFormNotFound { display_form: String },

    #[error("Attribute filter not found: {local_id}")]
    AttributeFilterNotFound { local_id: String },

    #[error("Cannot add attribute filter: the dashboard already has {limit} attribute filters")]
    AttributeFilterLimitReached { limit: usize },

    #[error("Invalid attribute filter index {index} (attribute filters: {len})")]
    InvalidFilterIndex { index: i64, len: usize },

    #[error("Invalid parent {parent_id} for attribute filter {local_id}: {reason}")]
    InvalidParentFilter {
        local_id: String,
        parent_id: String,
        reason: String,
    },

    #[error("Setting parents of attribute filter {local_id} would create a cycle")]
    FilterParentCycle { local_id: String },

    // ===== Layout =====
    #[error("Invalid section index {index} (sections: {len})")]
    InvalidSectionIndex { index: i64, len: usize },

    #[error("Invalid item index {index} in section {section_index} (items: {len})")]
    InvalidItemIndex {
        section_index: usize,
        index: i64,
        len: usize,
    },

    #[error("Stash not found: {stash}")]
    StashNotFound { stash: String },

    #[error("Stash identifier already in use: {stash}")]
    StashAlreadyExists { stash: String },

    #[error("There are no layout changes to undo")]
    NothingToUndo,

    #[error("Layout undo is disabled for this dashboard")]
    LayoutUndoDisabled,

    // ===== Widgets =====
    #[error("Widget not found in the layout: {widget}")]
    WidgetNotFound { widget: String },

    #[error("Widget {widget} is not a {expected} widget")]
    WidgetTypeMismatch { widget: String, expected: String },

    // ===== Dashboard =====
    #[error("Invalid title: {reason}")]
    InvalidTitle { reason: String },

    #[error("Dashboard not found: {dashboard}")]
    DashboardNotFound { dashboard: String },

    #[error("Initialize requires either a dashboard reference or an inline definition")]
    MissingDashboardSource,

    #[error("Dashboard has not been loaded or saved yet")]
    DashboardNotPersisted,

    // ===== Wire surface =====
    #[error("Invalid payload for {command_type}: {reason}")]
    InvalidCommandPayload {
        command_type: String,
        reason: String,
    },

    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    // ===== Internal =====
    #[error("State invariant violated: {message}")]
    InvariantViolation { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DashboardError {
    /// Whether the error stems from a command that does not fit the current
    /// state, as opposed to a defect in the runtime
    pub fn is_user_error(&self) -> bool {
        !matches!(
            self,
            DashboardError::InvariantViolation { .. }
                | DashboardError::Serialization { .. }
                | DashboardError::Internal { .. }
        )
    }
}

impl From<DashboardError> for ExError {
    fn from(err: DashboardError) -> Self {
        match err {
            DashboardError::DisplayFormAlreadyFiltered { display_form } => {
                ExError::new(ExErrorKind::AlreadyExists)
                    .with_entity_id(display_form)
                    .with_message("Display form is already filtered")
            }

            DashboardError::DisplayFormNotFound { display_form } => {
                ExError::new(ExErrorKind::NotFound)
                    .with_entity_id(display_form)
                    .with_message("Display form not found")
            }

            DashboardError::AttributeFilterNotFound { local_id } => {
                ExError::new(ExErrorKind::NotFound)
                    .with_entity_id(local_id)
                    .with_message("Attribute filter not found")
            }

            DashboardError::AttributeFilterLimitReached { limit } => {
                ExError::new(ExErrorKind::LimitExceeded)
                    .with_message(format!("Attribute filter limit of {} reached", limit))
            }

            DashboardError::InvalidFilterIndex { index, len } => {
                ExError::new(ExErrorKind::InvalidIndex).with_message(format!(
                    "Attribute filter index {} out of range (len {})",
                    index, len
                ))
            }

            DashboardError::InvalidParentFilter {
                local_id,
                parent_id,
                reason,
            } => ExError::new(ExErrorKind::InvalidInput)
                .with_entity_id(local_id)
                .with_message(format!("Invalid parent {}: {}", parent_id, reason)),

            DashboardError::FilterParentCycle { local_id } => {
                ExError::new(ExErrorKind::CycleDetected)
                    .with_entity_id(local_id)
                    .with_message("Parent filters would form a cycle")
            }

            DashboardError::InvalidSectionIndex { index, len } => {
                ExError::new(ExErrorKind::InvalidIndex)
                    .with_message(format!("Section index {} out of range (len {})", index, len))
            }

            DashboardError::InvalidItemIndex {
                section_index,
                index,
                len,
            } => ExError::new(ExErrorKind::InvalidIndex).with_message(format!(
                "Item index {} out of range in section {} (len {})",
                index, section_index, len
            )),

            DashboardError::StashNotFound { stash } => ExError::new(ExErrorKind::NotFound)
                .with_entity_id(stash)
                .with_message("Stash not found"),

            DashboardError::StashAlreadyExists { stash } => {
                ExError::new(ExErrorKind::AlreadyExists)
                    .with_entity_id(stash)
                    .with_message("Stash already exists")
            }

            DashboardError::NothingToUndo => ExError::new(ExErrorKind::NothingToUndo)
                .with_message("No layout changes to undo"),

            DashboardError::LayoutUndoDisabled => ExError::new(ExErrorKind::FeatureDisabled)
                .with_message("Layout undo history is disabled in the settings"),

            DashboardError::WidgetNotFound { widget } => ExError::new(ExErrorKind::NotFound)
                .with_entity_id(widget)
                .with_message("Widget not found"),

            DashboardError::WidgetTypeMismatch { widget, expected } => {
                ExError::new(ExErrorKind::InvalidInput)
                    .with_entity_id(widget)
                    .with_message(format!("Widget is not a {} widget", expected))
            }

            DashboardError::InvalidTitle { reason } => ExError::new(ExErrorKind::InvalidTitle)
                .with_message(format!("Invalid title: {}", reason)),

            DashboardError::DashboardNotFound { dashboard } => {
                ExError::new(ExErrorKind::NotFound)
                    .with_entity_id(dashboard)
                    .with_message("Dashboard not found")
            }

            DashboardError::MissingDashboardSource => ExError::new(ExErrorKind::InvalidInput)
                .with_message("Neither dashboard reference nor definition given"),

            DashboardError::DashboardNotPersisted => ExError::new(ExErrorKind::InvalidInput)
                .with_message("Dashboard has no persisted definition"),

            DashboardError::InvalidCommandPayload {
                command_type,
                reason,
            } => ExError::new(ExErrorKind::InvalidPayload)
                .with_command_type(command_type)
                .with_message(reason),

            DashboardError::InvalidInput { reason } => {
                ExError::new(ExErrorKind::InvalidInput).with_message(reason)
            }

            DashboardError::InvariantViolation { message } => {
                ExError::new(ExErrorKind::InvariantViolation).with_message(message)
            }

            DashboardError::Serialization { message } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }

            DashboardError::Internal { message } => {
                ExError::new(ExErrorKind::Internal).with_message(message)
            }
        }
    }
}

/// Conversion from serde_json::Error to DashboardError
impl From<serde_json::Error> for DashboardError {
    fn from(err: serde_json::Error) -> Self {
        DashboardError::Serialization {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_lookup_by_code() {
        for kind in ExErrorKind::ALL {
            assert_eq!(ExErrorKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(ExErrorKind::from_code("ERR_NOPE"), None);
    }

    #[test]
    fn test_error_kind_codes() {
        let cases = [
            (ExErrorKind::InvalidIndex, "ERR_INVALID_INDEX"),
            (ExErrorKind::AlreadyExists, "ERR_ALREADY_EXISTS"),
            (ExErrorKind::UnknownCommand, "ERR_UNKNOWN_COMMAND"),
            (ExErrorKind::RuntimeGone, "ERR_RUNTIME_GONE"),
            (ExErrorKind::Callback, "ERR_CALLBACK"),
            (ExErrorKind::FeatureDisabled, "ERR_FEATURE_DISABLED"),
        ];
        for (kind, expected_code) in cases {
            assert_eq!(kind.code(), expected_code, "Wrong code for {:?}", kind);
        }
    }

    #[test]
    fn test_internal_errors_are_not_user_errors() {
        assert!(!DashboardError::InvariantViolation {
            message: "x".into()
        }
        .is_user_error());
        assert!(DashboardError::NothingToUndo.is_user_error());
        assert!(DashboardError::AttributeFilterNotFound {
            local_id: "f1".into()
        }
        .is_user_error());
    }

    #[test]
    fn test_ex_error_carries_command_context() {
        let cid = CorrelationId::from("c-1");
        let err = ExError::from(DashboardError::StashNotFound {
            stash: "s1".into(),
        })
        .with_correlation_id(cid.clone())
        .with_command_type("GDC.DASH/CMD.FLUID_LAYOUT.ADD_ITEMS");

        assert_eq!(err.kind(), ExErrorKind::NotFound);
        assert_eq!(err.entity_id(), Some("s1"));
        assert_eq!(err.correlation_id(), Some(&cid));
        assert!(err.to_string().contains("ERR_NOT_FOUND"));
    }
}
