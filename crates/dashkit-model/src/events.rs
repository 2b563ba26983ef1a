//! Dashboard domain events
//!
//! Every processed command produces exactly one terminal event (see
//! [`EventPayload::is_terminal`]) preceded by `CommandStarted` and any number
//! of intermediate events describing individual changes.

use chrono::{DateTime, Utc};
use dashkit_core_types::CorrelationId;
use serde::{Deserialize, Serialize};

use crate::commands::DashboardCommand;
use crate::errors::{DashboardError, ExError};
use crate::model::{
    DashboardAttributeFilter, DashboardDefinition, DashboardLayout, DateFilterSelection,
    FilterContextDefinition, LayoutItem, LayoutSection, ObjRef, SectionHeader, WidgetHeader,
};

/// Wire type names of all events
pub mod event_types {
    pub const COMMAND_STARTED: &str = "GDC.DASH/EVT.COMMAND.STARTED";
    pub const COMMAND_FAILED: &str = "GDC.DASH/EVT.COMMAND.FAILED";
    pub const COMMAND_REJECTED: &str = "GDC.DASH/EVT.COMMAND.REJECTED";
    pub const INTERNAL_ERROR: &str = "GDC.DASH/EVT.INTERNAL.ERROR";

    pub const DASHBOARD_INITIALIZED: &str = "GDC.DASH/EVT.INITIALIZED";
    pub const DASHBOARD_SAVED: &str = "GDC.DASH/EVT.SAVED";
    pub const DASHBOARD_COPY_SAVED: &str = "GDC.DASH/EVT.COPY_SAVED";
    pub const DASHBOARD_DELETED: &str = "GDC.DASH/EVT.DELETED";
    pub const DASHBOARD_RENAMED: &str = "GDC.DASH/EVT.RENAMED";
    pub const DASHBOARD_WAS_RESET: &str = "GDC.DASH/EVT.RESET";

    pub const DATE_FILTER_SELECTION_CHANGED: &str =
        "GDC.DASH/EVT.FILTER_CONTEXT.DATE_FILTER.SELECTION_CHANGED";
    pub const ATTRIBUTE_FILTER_ADDED: &str = "GDC.DASH/EVT.FILTER_CONTEXT.ATTRIBUTE_FILTER.ADDED";
    pub const ATTRIBUTE_FILTER_REMOVED: &str =
        "GDC.DASH/EVT.FILTER_CONTEXT.ATTRIBUTE_FILTER.REMOVED";
    pub const ATTRIBUTE_FILTER_MOVED: &str = "GDC.DASH/EVT.FILTER_CONTEXT.ATTRIBUTE_FILTER.MOVED";
    pub const ATTRIBUTE_FILTER_SELECTION_CHANGED: &str =
        "GDC.DASH/EVT.FILTER_CONTEXT.ATTRIBUTE_FILTER.SELECTION_CHANGED";
    pub const ATTRIBUTE_FILTER_PARENT_CHANGED: &str =
        "GDC.DASH/EVT.FILTER_CONTEXT.ATTRIBUTE_FILTER.PARENT_CHANGED";
    pub const FILTER_CONTEXT_CHANGED: &str = "GDC.DASH/EVT.FILTER_CONTEXT.CHANGED";

    pub const LAYOUT_SECTION_ADDED: &str = "GDC.DASH/EVT.FLUID_LAYOUT.SECTION_ADDED";
    pub const LAYOUT_SECTION_MOVED: &str = "GDC.DASH/EVT.FLUID_LAYOUT.SECTION_MOVED";
    pub const LAYOUT_SECTION_REMOVED: &str = "GDC.DASH/EVT.FLUID_LAYOUT.SECTION_REMOVED";
    pub const LAYOUT_SECTION_HEADER_CHANGED: &str =
        "GDC.DASH/EVT.FLUID_LAYOUT.SECTION_HEADER_CHANGED";
    pub const LAYOUT_SECTION_ITEMS_ADDED: &str = "GDC.DASH/EVT.FLUID_LAYOUT.ITEMS_ADDED";
    pub const LAYOUT_SECTION_ITEM_MOVED: &str = "GDC.DASH/EVT.FLUID_LAYOUT.ITEM_MOVED";
    pub const LAYOUT_SECTION_ITEM_REMOVED: &str = "GDC.DASH/EVT.FLUID_LAYOUT.ITEM_REMOVED";
    pub const LAYOUT_SECTION_ITEM_REPLACED: &str = "GDC.DASH/EVT.FLUID_LAYOUT.ITEM_REPLACED";
    pub const LAYOUT_CHANGES_UNDONE: &str = "GDC.DASH/EVT.FLUID_LAYOUT.CHANGES_UNDONE";
    pub const LAYOUT_CHANGED: &str = "GDC.DASH/EVT.FLUID_LAYOUT.LAYOUT_CHANGED";

    pub const KPI_WIDGET_HEADER_CHANGED: &str = "GDC.DASH/EVT.KPI_WIDGET.HEADER_CHANGED";
    pub const INSIGHT_WIDGET_HEADER_CHANGED: &str = "GDC.DASH/EVT.INSIGHT_WIDGET.HEADER_CHANGED";
}

/// Dashboard the event was emitted for
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventContext {
    pub workspace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboard_ref: Option<ObjRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReason {
    UserError,
    InternalError,
}

/// Recognized failure of a command handler
///
/// Handlers return this for commands that do not fit the current state; the
/// runtime publishes it unchanged as `CommandFailed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandFailure {
    pub command_type: String,
    pub reason: FailureReason,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl CommandFailure {
    /// Failure derived from a domain error; user errors keep `USER_ERROR`
    pub fn from_error(command_type: impl Into<String>, err: &DashboardError) -> Self {
        let ex: ExError = err.clone().into();
        Self {
            command_type: command_type.into(),
            reason: if err.is_user_error() {
                FailureReason::UserError
            } else {
                FailureReason::InternalError
            },
            message: err.to_string(),
            error_code: Some(ex.code().to_string()),
        }
    }

    pub fn is_user_error(&self) -> bool {
        self.reason == FailureReason::UserError
    }
}

impl std::fmt::Display for CommandFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failed: {}", self.command_type, self.message)
    }
}

impl std::error::Error for CommandFailure {}

/// Event payload, tagged on the wire by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum EventPayload {
    // ===== Lifecycle =====
    #[serde(rename = "GDC.DASH/EVT.COMMAND.STARTED")]
    CommandStarted { command: DashboardCommand },

    #[serde(rename = "GDC.DASH/EVT.COMMAND.FAILED")]
    CommandFailed(CommandFailure),

    #[serde(rename = "GDC.DASH/EVT.COMMAND.REJECTED", rename_all = "camelCase")]
    CommandRejected { command_type: String },

    #[serde(rename = "GDC.DASH/EVT.INTERNAL.ERROR", rename_all = "camelCase")]
    InternalError {
        command_type: String,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_code: Option<String>,
    },

    // ===== Dashboard =====
    #[serde(rename = "GDC.DASH/EVT.INITIALIZED")]
    DashboardInitialized { dashboard: DashboardDefinition },

    #[serde(rename = "GDC.DASH/EVT.SAVED", rename_all = "camelCase")]
    DashboardSaved {
        dashboard: DashboardDefinition,
        new_dashboard: bool,
    },

    #[serde(rename = "GDC.DASH/EVT.COPY_SAVED", rename_all = "camelCase")]
    DashboardCopySaved {
        dashboard: DashboardDefinition,
        switched_to_copy: bool,
    },

    #[serde(rename = "GDC.DASH/EVT.DELETED")]
    DashboardDeleted { dashboard: DashboardDefinition },

    #[serde(rename = "GDC.DASH/EVT.RENAMED", rename_all = "camelCase")]
    DashboardRenamed { new_title: String },

    #[serde(rename = "GDC.DASH/EVT.RESET")]
    DashboardWasReset { dashboard: DashboardDefinition },

    // ===== Filter context =====
    #[serde(
        rename = "GDC.DASH/EVT.FILTER_CONTEXT.DATE_FILTER.SELECTION_CHANGED",
        rename_all = "camelCase"
    )]
    DateFilterSelectionChanged {
        date_filter: Option<DateFilterSelection>,
    },

    #[serde(rename = "GDC.DASH/EVT.FILTER_CONTEXT.ATTRIBUTE_FILTER.ADDED")]
    AttributeFilterAdded {
        added: DashboardAttributeFilter,
        index: usize,
    },

    #[serde(rename = "GDC.DASH/EVT.FILTER_CONTEXT.ATTRIBUTE_FILTER.REMOVED")]
    AttributeFilterRemoved {
        removed: DashboardAttributeFilter,
        children: Vec<DashboardAttributeFilter>,
    },

    #[serde(
        rename = "GDC.DASH/EVT.FILTER_CONTEXT.ATTRIBUTE_FILTER.MOVED",
        rename_all = "camelCase"
    )]
    AttributeFilterMoved {
        moved: DashboardAttributeFilter,
        from_index: usize,
        to_index: usize,
    },

    #[serde(rename = "GDC.DASH/EVT.FILTER_CONTEXT.ATTRIBUTE_FILTER.SELECTION_CHANGED")]
    AttributeFilterSelectionChanged { filter: DashboardAttributeFilter },

    #[serde(rename = "GDC.DASH/EVT.FILTER_CONTEXT.ATTRIBUTE_FILTER.PARENT_CHANGED")]
    AttributeFilterParentChanged { filter: DashboardAttributeFilter },

    #[serde(
        rename = "GDC.DASH/EVT.FILTER_CONTEXT.CHANGED",
        rename_all = "camelCase"
    )]
    FilterContextChanged {
        filter_context: FilterContextDefinition,
    },

    // ===== Layout =====
    #[serde(rename = "GDC.DASH/EVT.FLUID_LAYOUT.SECTION_ADDED")]
    LayoutSectionAdded { section: LayoutSection, index: usize },

    #[serde(
        rename = "GDC.DASH/EVT.FLUID_LAYOUT.SECTION_MOVED",
        rename_all = "camelCase"
    )]
    LayoutSectionMoved {
        section: LayoutSection,
        from_index: usize,
        to_index: usize,
    },

    #[serde(
        rename = "GDC.DASH/EVT.FLUID_LAYOUT.SECTION_REMOVED",
        rename_all = "camelCase"
    )]
    LayoutSectionRemoved {
        section: LayoutSection,
        index: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stash_identifier: Option<String>,
    },

    #[serde(rename = "GDC.DASH/EVT.FLUID_LAYOUT.SECTION_HEADER_CHANGED")]
    LayoutSectionHeaderChanged {
        header: SectionHeader,
        index: usize,
    },

    #[serde(
        rename = "GDC.DASH/EVT.FLUID_LAYOUT.ITEMS_ADDED",
        rename_all = "camelCase"
    )]
    LayoutSectionItemsAdded {
        section_index: usize,
        start_index: usize,
        items_added: Vec<LayoutItem>,
        stashes_used: Vec<String>,
    },

    #[serde(
        rename = "GDC.DASH/EVT.FLUID_LAYOUT.ITEM_MOVED",
        rename_all = "camelCase"
    )]
    LayoutSectionItemMoved {
        item: LayoutItem,
        from_section_index: usize,
        to_section_index: usize,
        from_index: usize,
        to_index: usize,
    },

    #[serde(
        rename = "GDC.DASH/EVT.FLUID_LAYOUT.ITEM_REMOVED",
        rename_all = "camelCase"
    )]
    LayoutSectionItemRemoved {
        item: LayoutItem,
        section_index: usize,
        item_index: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stash_identifier: Option<String>,
        section_removed: bool,
    },

    #[serde(
        rename = "GDC.DASH/EVT.FLUID_LAYOUT.ITEM_REPLACED",
        rename_all = "camelCase"
    )]
    LayoutSectionItemReplaced {
        section_index: usize,
        item_index: usize,
        items: Vec<LayoutItem>,
        previous_item: LayoutItem,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stash_identifier: Option<String>,
        stashes_used: Vec<String>,
    },

    #[serde(rename = "GDC.DASH/EVT.FLUID_LAYOUT.CHANGES_UNDONE")]
    LayoutChangesUndone { steps: u32 },

    #[serde(rename = "GDC.DASH/EVT.FLUID_LAYOUT.LAYOUT_CHANGED")]
    LayoutChanged { layout: DashboardLayout },

    // ===== Widgets =====
    #[serde(rename = "GDC.DASH/EVT.KPI_WIDGET.HEADER_CHANGED")]
    KpiWidgetHeaderChanged {
        #[serde(rename = "ref")]
        widget_ref: ObjRef,
        header: WidgetHeader,
    },

    #[serde(rename = "GDC.DASH/EVT.INSIGHT_WIDGET.HEADER_CHANGED")]
    InsightWidgetHeaderChanged {
        #[serde(rename = "ref")]
        widget_ref: ObjRef,
        header: WidgetHeader,
    },
}

impl EventPayload {
    /// Wire type name of the event
    pub fn event_type(&self) -> &'static str {
        use crate::events::event_types as t;
        match self {
            EventPayload::CommandStarted { .. } => t::COMMAND_STARTED,
            EventPayload::CommandFailed(_) => t::COMMAND_FAILED,
            EventPayload::CommandRejected { .. } => t::COMMAND_REJECTED,
            EventPayload::InternalError { .. } => t::INTERNAL_ERROR,
            EventPayload::DashboardInitialized { .. } => t::DASHBOARD_INITIALIZED,
            EventPayload::DashboardSaved { .. } => t::DASHBOARD_SAVED,
            EventPayload::DashboardCopySaved { .. } => t::DASHBOARD_COPY_SAVED,
            EventPayload::DashboardDeleted { .. } => t::DASHBOARD_DELETED,
            EventPayload::DashboardRenamed { .. } => t::DASHBOARD_RENAMED,
            EventPayload::DashboardWasReset { .. } => t::DASHBOARD_WAS_RESET,
            EventPayload::DateFilterSelectionChanged { .. } => t::DATE_FILTER_SELECTION_CHANGED,
            EventPayload::AttributeFilterAdded { .. } => t::ATTRIBUTE_FILTER_ADDED,
            EventPayload::AttributeFilterRemoved { .. } => t::ATTRIBUTE_FILTER_REMOVED,
            EventPayload::AttributeFilterMoved { .. } => t::ATTRIBUTE_FILTER_MOVED,
            EventPayload::AttributeFilterSelectionChanged { .. } => {
                t::ATTRIBUTE_FILTER_SELECTION_CHANGED
            }
            EventPayload::AttributeFilterParentChanged { .. } => t::ATTRIBUTE_FILTER_PARENT_CHANGED,
            EventPayload::FilterContextChanged { .. } => t::FILTER_CONTEXT_CHANGED,
            EventPayload::LayoutSectionAdded { .. } => t::LAYOUT_SECTION_ADDED,
            EventPayload::LayoutSectionMoved { .. } => t::LAYOUT_SECTION_MOVED,
            EventPayload::LayoutSectionRemoved { .. } => t::LAYOUT_SECTION_REMOVED,
            EventPayload::LayoutSectionHeaderChanged { .. } => t::LAYOUT_SECTION_HEADER_CHANGED,
            EventPayload::LayoutSectionItemsAdded { .. } => t::LAYOUT_SECTION_ITEMS_ADDED,
            EventPayload::LayoutSectionItemMoved { .. } => t::LAYOUT_SECTION_ITEM_MOVED,
            EventPayload::LayoutSectionItemRemoved { .. } => t::LAYOUT_SECTION_ITEM_REMOVED,
            EventPayload::LayoutSectionItemReplaced { .. } => t::LAYOUT_SECTION_ITEM_REPLACED,
            EventPayload::LayoutChangesUndone { .. } => t::LAYOUT_CHANGES_UNDONE,
            EventPayload::LayoutChanged { .. } => t::LAYOUT_CHANGED,
            EventPayload::KpiWidgetHeaderChanged { .. } => t::KPI_WIDGET_HEADER_CHANGED,
            EventPayload::InsightWidgetHeaderChanged { .. } => t::INSIGHT_WIDGET_HEADER_CHANGED,
        }
    }

    /// Whether this is the single outcome event of a command
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EventPayload::CommandFailed(_)
                | EventPayload::CommandRejected { .. }
                | EventPayload::InternalError { .. }
                | EventPayload::DashboardInitialized { .. }
                | EventPayload::DashboardSaved { .. }
                | EventPayload::DashboardCopySaved { .. }
                | EventPayload::DashboardDeleted { .. }
                | EventPayload::DashboardRenamed { .. }
                | EventPayload::DashboardWasReset { .. }
                | EventPayload::FilterContextChanged { .. }
                | EventPayload::LayoutChanged { .. }
                | EventPayload::KpiWidgetHeaderChanged { .. }
                | EventPayload::InsightWidgetHeaderChanged { .. }
        )
    }

    /// Whether the event reports that the command did not succeed
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            EventPayload::CommandFailed(_)
                | EventPayload::CommandRejected { .. }
                | EventPayload::InternalError { .. }
        )
    }
}

/// A published notification about the processing of a command
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<CorrelationId>,
    pub ctx: EventContext,
    pub emitted_at: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl DashboardEvent {
    pub fn new(
        ctx: EventContext,
        correlation_id: Option<CorrelationId>,
        payload: EventPayload,
    ) -> Self {
        Self {
            correlation_id,
            ctx,
            emitted_at: Utc::now(),
            payload,
        }
    }

    pub fn event_type(&self) -> &'static str {
        self.payload.event_type()
    }

    pub fn is_terminal(&self) -> bool {
        self.payload.is_terminal()
    }
}
