//! Dashboard commands
//!
//! A command is a request to change the dashboard. On the wire it is a
//! plain JSON object `{ "type", "correlationId", "payload" }`; in Rust the
//! payload is a closed enum so that handler resolution is an exhaustive
//! match. Wire types this build does not know decode to
//! [`CommandPayload::Unrecognized`] and are rejected by the runtime.

use dashkit_core_types::CorrelationId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::DashboardError;
use crate::model::{
    AttributeElements, AttributeFilterParent, AttributeFilterSelectionType, DashboardDefinition,
    DashboardFilter, DateFilterSelection, ItemDefinition, ObjRef, SectionHeader, WidgetHeader,
    END_INDEX,
};

/// Wire type names of all commands known to this build
pub mod command_types {
    pub const INITIALIZE: &str = "GDC.DASH/CMD.INITIALIZE";
    pub const SAVE: &str = "GDC.DASH/CMD.SAVE";
    pub const SAVE_AS: &str = "GDC.DASH/CMD.SAVEAS";
    pub const RENAME: &str = "GDC.DASH/CMD.RENAME";
    pub const RESET: &str = "GDC.DASH/CMD.RESET";
    pub const DELETE: &str = "GDC.DASH/CMD.DELETE";

    pub const CHANGE_FILTER_CONTEXT_SELECTION: &str = "GDC.DASH/CMD.FILTER_CONTEXT.CHANGE_SELECTION";

    pub const CHANGE_DATE_FILTER_SELECTION: &str =
        "GDC.DASH/CMD.FILTER_CONTEXT.DATE_FILTER.CHANGE_SELECTION";
    pub const ADD_ATTRIBUTE_FILTER: &str = "GDC.DASH/CMD.FILTER_CONTEXT.ATTRIBUTE_FILTER.ADD";
    pub const REMOVE_ATTRIBUTE_FILTERS: &str =
        "GDC.DASH/CMD.FILTER_CONTEXT.ATTRIBUTE_FILTER.REMOVE";
    pub const MOVE_ATTRIBUTE_FILTER: &str = "GDC.DASH/CMD.FILTER_CONTEXT.ATTRIBUTE_FILTER.MOVE";
    pub const CHANGE_ATTRIBUTE_FILTER_SELECTION: &str =
        "GDC.DASH/CMD.FILTER_CONTEXT.ATTRIBUTE_FILTER.CHANGE_SELECTION";
    pub const SET_ATTRIBUTE_FILTER_PARENTS: &str =
        "GDC.DASH/CMD.FILTER_CONTEXT.ATTRIBUTE_FILTER.SET_PARENT";

    pub const ADD_LAYOUT_SECTION: &str = "GDC.DASH/CMD.FLUID_LAYOUT.ADD_SECTION";
    pub const MOVE_LAYOUT_SECTION: &str = "GDC.DASH/CMD.FLUID_LAYOUT.MOVE_SECTION";
    pub const REMOVE_LAYOUT_SECTION: &str = "GDC.DASH/CMD.FLUID_LAYOUT.REMOVE_SECTION";
    pub const CHANGE_LAYOUT_SECTION_HEADER: &str =
        "GDC.DASH/CMD.FLUID_LAYOUT.CHANGE_SECTION_HEADER";
    pub const ADD_SECTION_ITEMS: &str = "GDC.DASH/CMD.FLUID_LAYOUT.ADD_ITEMS";
    pub const MOVE_SECTION_ITEM: &str = "GDC.DASH/CMD.FLUID_LAYOUT.MOVE_ITEM";
    pub const REMOVE_SECTION_ITEM: &str = "GDC.DASH/CMD.FLUID_LAYOUT.REMOVE_ITEM";
    pub const REPLACE_SECTION_ITEM: &str = "GDC.DASH/CMD.FLUID_LAYOUT.REPLACE_ITEM";
    pub const UNDO_LAYOUT_CHANGES: &str = "GDC.DASH/CMD.FLUID_LAYOUT.UNDO";

    pub const CHANGE_KPI_WIDGET_HEADER: &str = "GDC.DASH/CMD.KPI_WIDGET.CHANGE_HEADER";
    pub const CHANGE_INSIGHT_WIDGET_HEADER: &str = "GDC.DASH/CMD.INSIGHT_WIDGET.CHANGE_HEADER";
    pub const REFRESH_KPI_WIDGET: &str = "GDC.DASH/CMD.KPI_WIDGET.REFRESH";
    pub const REFRESH_INSIGHT_WIDGET: &str = "GDC.DASH/CMD.INSIGHT_WIDGET.REFRESH";
    pub const CHANGE_INSIGHT_WIDGET_INSIGHT: &str = "GDC.DASH/CMD.INSIGHT_WIDGET.CHANGE_INSIGHT";

    /// Every known command type, in registry order
    pub const ALL: &[&str] = &[
        INITIALIZE,
        SAVE,
        SAVE_AS,
        RENAME,
        RESET,
        DELETE,
        CHANGE_FILTER_CONTEXT_SELECTION,
        CHANGE_DATE_FILTER_SELECTION,
        ADD_ATTRIBUTE_FILTER,
        REMOVE_ATTRIBUTE_FILTERS,
        MOVE_ATTRIBUTE_FILTER,
        CHANGE_ATTRIBUTE_FILTER_SELECTION,
        SET_ATTRIBUTE_FILTER_PARENTS,
        ADD_LAYOUT_SECTION,
        MOVE_LAYOUT_SECTION,
        REMOVE_LAYOUT_SECTION,
        CHANGE_LAYOUT_SECTION_HEADER,
        ADD_SECTION_ITEMS,
        MOVE_SECTION_ITEM,
        REMOVE_SECTION_ITEM,
        REPLACE_SECTION_ITEM,
        UNDO_LAYOUT_CHANGES,
        CHANGE_KPI_WIDGET_HEADER,
        CHANGE_INSIGHT_WIDGET_HEADER,
        REFRESH_KPI_WIDGET,
        REFRESH_INSIGHT_WIDGET,
        CHANGE_INSIGHT_WIDGET_INSIGHT,
    ];
}

// ===== Payloads =====

/// Load a dashboard by reference, or start from an inline definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboard: Option<ObjRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<DashboardDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePayload {}

/// Store the current dashboard as a new one
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveAsPayload {
    /// Title of the copy; the current title when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Continue working on the copy instead of the original
    #[serde(default)]
    pub switch_to_copy: bool,
    /// Store the filter context as last persisted instead of the current one
    #[serde(default)]
    pub use_original_filter_context: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePayload {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenamePayload {
    pub new_title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPayload {}

/// Apply a set of filters to the filter context in one change
///
/// Attribute filters are matched to the filter context by display form;
/// filters without a match are ignored, as are repeated ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeFilterContextSelectionPayload {
    pub filters: Vec<DashboardFilter>,
    /// Select all elements in filters the payload does not mention
    #[serde(default)]
    pub reset_others: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddAttributeFilterPayload {
    pub display_form: ObjRef,
    /// Position among attribute filters; `-1` appends
    pub index: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parent_filters: Vec<AttributeFilterParent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_selection: Option<AttributeElements>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_is_negative_selection: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveAttributeFiltersPayload {
    pub filter_local_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveAttributeFilterPayload {
    pub filter_local_id: String,
    pub index: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeAttributeFilterSelectionPayload {
    pub filter_local_id: String,
    pub elements: AttributeElements,
    pub selection_type: AttributeFilterSelectionType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetAttributeFilterParentsPayload {
    pub filter_local_id: String,
    pub parent_filters: Vec<AttributeFilterParent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddLayoutSectionPayload {
    pub index: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_header: Option<SectionHeader>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub initial_items: Vec<ItemDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveLayoutSectionPayload {
    pub section_index: i64,
    pub to_index: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveLayoutSectionPayload {
    pub index: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stash_identifier: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeLayoutSectionHeaderPayload {
    pub index: i64,
    pub header: SectionHeader,
    /// Merge with the current header instead of replacing it
    #[serde(default)]
    pub merge: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddSectionItemsPayload {
    pub section_index: i64,
    pub item_index: i64,
    pub items: Vec<ItemDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveSectionItemPayload {
    pub section_index: i64,
    pub item_index: i64,
    pub to_section_index: i64,
    pub to_item_index: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveSectionItemPayload {
    pub section_index: i64,
    pub item_index: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stash_identifier: Option<String>,
    /// Also remove the section when it becomes empty
    #[serde(default)]
    pub eager: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceSectionItemPayload {
    pub section_index: i64,
    pub item_index: i64,
    pub item: ItemDefinition,
    /// Keep the replaced item in this stash
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stash_identifier: Option<String>,
}

fn default_undo_steps() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoLayoutChangesPayload {
    #[serde(default = "default_undo_steps")]
    pub steps: u32,
}

impl Default for UndoLayoutChangesPayload {
    fn default() -> Self {
        Self {
            steps: default_undo_steps(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeWidgetHeaderPayload {
    #[serde(rename = "ref")]
    pub widget_ref: ObjRef,
    pub header: WidgetHeader,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshWidgetPayload {
    #[serde(rename = "ref")]
    pub widget_ref: ObjRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeInsightWidgetInsightPayload {
    #[serde(rename = "ref")]
    pub widget_ref: ObjRef,
    pub insight_ref: ObjRef,
}

/// Payload of a dashboard command, one variant per command type
#[derive(Debug, Clone, PartialEq)]
pub enum CommandPayload {
    Initialize(InitializePayload),
    Save(SavePayload),
    SaveAs(SaveAsPayload),
    Rename(RenamePayload),
    Reset(ResetPayload),
    Delete(DeletePayload),

    ChangeFilterContextSelection(ChangeFilterContextSelectionPayload),
    ChangeDateFilterSelection(DateFilterSelection),
    AddAttributeFilter(AddAttributeFilterPayload),
    RemoveAttributeFilters(RemoveAttributeFiltersPayload),
    MoveAttributeFilter(MoveAttributeFilterPayload),
    ChangeAttributeFilterSelection(ChangeAttributeFilterSelectionPayload),
    SetAttributeFilterParents(SetAttributeFilterParentsPayload),

    AddLayoutSection(AddLayoutSectionPayload),
    MoveLayoutSection(MoveLayoutSectionPayload),
    RemoveLayoutSection(RemoveLayoutSectionPayload),
    ChangeLayoutSectionHeader(ChangeLayoutSectionHeaderPayload),
    AddSectionItems(AddSectionItemsPayload),
    MoveSectionItem(MoveSectionItemPayload),
    RemoveSectionItem(RemoveSectionItemPayload),
    ReplaceSectionItem(ReplaceSectionItemPayload),
    UndoLayoutChanges(UndoLayoutChangesPayload),

    ChangeKpiWidgetHeader(ChangeWidgetHeaderPayload),
    ChangeInsightWidgetHeader(ChangeWidgetHeaderPayload),
    RefreshKpiWidget(RefreshWidgetPayload),
    RefreshInsightWidget(RefreshWidgetPayload),
    ChangeInsightWidgetInsight(ChangeInsightWidgetInsightPayload),

    /// Command whose wire type this build does not know
    Unrecognized { command_type: String, payload: Value },
}

impl CommandPayload {
    /// Wire type name of the command
    pub fn command_type(&self) -> &str {
        use crate::commands::command_types as t;
        match self {
            CommandPayload::Initialize(_) => t::INITIALIZE,
            CommandPayload::Save(_) => t::SAVE,
            CommandPayload::SaveAs(_) => t::SAVE_AS,
            CommandPayload::Rename(_) => t::RENAME,
            CommandPayload::Reset(_) => t::RESET,
            CommandPayload::Delete(_) => t::DELETE,
            CommandPayload::ChangeFilterContextSelection(_) => t::CHANGE_FILTER_CONTEXT_SELECTION,
            CommandPayload::ChangeDateFilterSelection(_) => t::CHANGE_DATE_FILTER_SELECTION,
            CommandPayload::AddAttributeFilter(_) => t::ADD_ATTRIBUTE_FILTER,
            CommandPayload::RemoveAttributeFilters(_) => t::REMOVE_ATTRIBUTE_FILTERS,
            CommandPayload::MoveAttributeFilter(_) => t::MOVE_ATTRIBUTE_FILTER,
            CommandPayload::ChangeAttributeFilterSelection(_) => {
                t::CHANGE_ATTRIBUTE_FILTER_SELECTION
            }
            CommandPayload::SetAttributeFilterParents(_) => t::SET_ATTRIBUTE_FILTER_PARENTS,
            CommandPayload::AddLayoutSection(_) => t::ADD_LAYOUT_SECTION,
            CommandPayload::MoveLayoutSection(_) => t::MOVE_LAYOUT_SECTION,
            CommandPayload::RemoveLayoutSection(_) => t::REMOVE_LAYOUT_SECTION,
            CommandPayload::ChangeLayoutSectionHeader(_) => t::CHANGE_LAYOUT_SECTION_HEADER,
            CommandPayload::AddSectionItems(_) => t::ADD_SECTION_ITEMS,
            CommandPayload::MoveSectionItem(_) => t::MOVE_SECTION_ITEM,
            CommandPayload::RemoveSectionItem(_) => t::REMOVE_SECTION_ITEM,
            CommandPayload::ReplaceSectionItem(_) => t::REPLACE_SECTION_ITEM,
            CommandPayload::UndoLayoutChanges(_) => t::UNDO_LAYOUT_CHANGES,
            CommandPayload::ChangeKpiWidgetHeader(_) => t::CHANGE_KPI_WIDGET_HEADER,
            CommandPayload::ChangeInsightWidgetHeader(_) => t::CHANGE_INSIGHT_WIDGET_HEADER,
            CommandPayload::RefreshKpiWidget(_) => t::REFRESH_KPI_WIDGET,
            CommandPayload::RefreshInsightWidget(_) => t::REFRESH_INSIGHT_WIDGET,
            CommandPayload::ChangeInsightWidgetInsight(_) => t::CHANGE_INSIGHT_WIDGET_INSIGHT,
            CommandPayload::Unrecognized { command_type, .. } => command_type,
        }
    }

    /// Encode the payload as its wire JSON value
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        match self {
            CommandPayload::Initialize(p) => serde_json::to_value(p),
            CommandPayload::Save(p) => serde_json::to_value(p),
            CommandPayload::SaveAs(p) => serde_json::to_value(p),
            CommandPayload::Rename(p) => serde_json::to_value(p),
            CommandPayload::Reset(p) => serde_json::to_value(p),
            CommandPayload::Delete(p) => serde_json::to_value(p),
            CommandPayload::ChangeFilterContextSelection(p) => serde_json::to_value(p),
            CommandPayload::ChangeDateFilterSelection(p) => serde_json::to_value(p),
            CommandPayload::AddAttributeFilter(p) => serde_json::to_value(p),
            CommandPayload::RemoveAttributeFilters(p) => serde_json::to_value(p),
            CommandPayload::MoveAttributeFilter(p) => serde_json::to_value(p),
            CommandPayload::ChangeAttributeFilterSelection(p) => serde_json::to_value(p),
            CommandPayload::SetAttributeFilterParents(p) => serde_json::to_value(p),
            CommandPayload::AddLayoutSection(p) => serde_json::to_value(p),
            CommandPayload::MoveLayoutSection(p) => serde_json::to_value(p),
            CommandPayload::RemoveLayoutSection(p) => serde_json::to_value(p),
            CommandPayload::ChangeLayoutSectionHeader(p) => serde_json::to_value(p),
            CommandPayload::AddSectionItems(p) => serde_json::to_value(p),
            CommandPayload::MoveSectionItem(p) => serde_json::to_value(p),
            CommandPayload::RemoveSectionItem(p) => serde_json::to_value(p),
            CommandPayload::ReplaceSectionItem(p) => serde_json::to_value(p),
            CommandPayload::UndoLayoutChanges(p) => serde_json::to_value(p),
            CommandPayload::ChangeKpiWidgetHeader(p) => serde_json::to_value(p),
            CommandPayload::ChangeInsightWidgetHeader(p) => serde_json::to_value(p),
            CommandPayload::RefreshKpiWidget(p) => serde_json::to_value(p),
            CommandPayload::RefreshInsightWidget(p) => serde_json::to_value(p),
            CommandPayload::ChangeInsightWidgetInsight(p) => serde_json::to_value(p),
            CommandPayload::Unrecognized { payload, .. } => Ok(payload.clone()),
        }
    }

    /// Decode a payload for the given wire type
    ///
    /// Unknown types yield [`CommandPayload::Unrecognized`]; a payload that
    /// does not fit a known type is an [`DashboardError::InvalidCommandPayload`].
    pub fn from_wire(command_type: &str, payload: Value) -> Result<Self, DashboardError> {
        use crate::commands::command_types as t;

        // Commands without arguments may omit the payload entirely
        let payload = match payload {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };

        fn decode<T: serde::de::DeserializeOwned>(
            command_type: &str,
            payload: Value,
        ) -> Result<T, DashboardError> {
            serde_json::from_value(payload).map_err(|e| DashboardError::InvalidCommandPayload {
                command_type: command_type.to_string(),
                reason: e.to_string(),
            })
        }

        let decoded = match command_type {
            t::INITIALIZE => CommandPayload::Initialize(decode(command_type, payload)?),
            t::SAVE => CommandPayload::Save(decode(command_type, payload)?),
            t::SAVE_AS => CommandPayload::SaveAs(decode(command_type, payload)?),
            t::RENAME => CommandPayload::Rename(decode(command_type, payload)?),
            t::RESET => CommandPayload::Reset(decode(command_type, payload)?),
            t::DELETE => CommandPayload::Delete(decode(command_type, payload)?),
            t::CHANGE_FILTER_CONTEXT_SELECTION => {
                CommandPayload::ChangeFilterContextSelection(decode(command_type, payload)?)
            }
            t::CHANGE_DATE_FILTER_SELECTION => {
                CommandPayload::ChangeDateFilterSelection(decode(command_type, payload)?)
            }
            t::ADD_ATTRIBUTE_FILTER => {
                CommandPayload::AddAttributeFilter(decode(command_type, payload)?)
            }
            t::REMOVE_ATTRIBUTE_FILTERS => {
                CommandPayload::RemoveAttributeFilters(decode(command_type, payload)?)
            }
            t::MOVE_ATTRIBUTE_FILTER => {
                CommandPayload::MoveAttributeFilter(decode(command_type, payload)?)
            }
            t::CHANGE_ATTRIBUTE_FILTER_SELECTION => {
                CommandPayload::ChangeAttributeFilterSelection(decode(command_type, payload)?)
            }
            t::SET_ATTRIBUTE_FILTER_PARENTS => {
                CommandPayload::SetAttributeFilterParents(decode(command_type, payload)?)
            }
            t::ADD_LAYOUT_SECTION => {
                CommandPayload::AddLayoutSection(decode(command_type, payload)?)
            }
            t::MOVE_LAYOUT_SECTION => {
                CommandPayload::MoveLayoutSection(decode(command_type, payload)?)
            }
            t::REMOVE_LAYOUT_SECTION => {
                CommandPayload::RemoveLayoutSection(decode(command_type, payload)?)
            }
            t::CHANGE_LAYOUT_SECTION_HEADER => {
                CommandPayload::ChangeLayoutSectionHeader(decode(command_type, payload)?)
            }
            t::ADD_SECTION_ITEMS => CommandPayload::AddSectionItems(decode(command_type, payload)?),
            t::MOVE_SECTION_ITEM => CommandPayload::MoveSectionItem(decode(command_type, payload)?),
            t::REMOVE_SECTION_ITEM => {
                CommandPayload::RemoveSectionItem(decode(command_type, payload)?)
            }
            t::REPLACE_SECTION_ITEM => {
                CommandPayload::ReplaceSectionItem(decode(command_type, payload)?)
            }
            t::UNDO_LAYOUT_CHANGES => {
                CommandPayload::UndoLayoutChanges(decode(command_type, payload)?)
            }
            t::CHANGE_KPI_WIDGET_HEADER => {
                CommandPayload::ChangeKpiWidgetHeader(decode(command_type, payload)?)
            }
            t::CHANGE_INSIGHT_WIDGET_HEADER => {
                CommandPayload::ChangeInsightWidgetHeader(decode(command_type, payload)?)
            }
            t::REFRESH_KPI_WIDGET => {
                CommandPayload::RefreshKpiWidget(decode(command_type, payload)?)
            }
            t::REFRESH_INSIGHT_WIDGET => {
                CommandPayload::RefreshInsightWidget(decode(command_type, payload)?)
            }
            t::CHANGE_INSIGHT_WIDGET_INSIGHT => {
                CommandPayload::ChangeInsightWidgetInsight(decode(command_type, payload)?)
            }
            other => CommandPayload::Unrecognized {
                command_type: other.to_string(),
                payload,
            },
        };
        Ok(decoded)
    }
}

/// A request to change the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCommand", into = "RawCommand")]
pub struct DashboardCommand {
    pub correlation_id: Option<CorrelationId>,
    pub payload: CommandPayload,
}

impl DashboardCommand {
    pub fn new(payload: CommandPayload) -> Self {
        Self {
            correlation_id: None,
            payload,
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<CorrelationId>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn command_type(&self) -> &str {
        self.payload.command_type()
    }

    /// Correlation id for log lines, with a placeholder when none was given
    pub fn correlation_label(&self) -> &str {
        self.correlation_id
            .as_ref()
            .map(CorrelationId::as_str)
            .unwrap_or(dashkit_core_types::schema::NO_CORRELATION_ID)
    }
}

/// Wire shape of a command
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCommand {
    #[serde(rename = "type")]
    pub command_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<CorrelationId>,
    #[serde(default)]
    pub payload: Value,
}

impl TryFrom<RawCommand> for DashboardCommand {
    type Error = DashboardError;

    fn try_from(raw: RawCommand) -> Result<Self, Self::Error> {
        Ok(DashboardCommand {
            correlation_id: raw.correlation_id,
            payload: CommandPayload::from_wire(&raw.command_type, raw.payload)?,
        })
    }
}

impl From<DashboardCommand> for RawCommand {
    fn from(cmd: DashboardCommand) -> Self {
        // Payload structs hold only plain data; encoding them cannot fail
        let payload = cmd.payload.to_value().unwrap_or(Value::Null);
        RawCommand {
            command_type: cmd.payload.command_type().to_string(),
            correlation_id: cmd.correlation_id,
            payload,
        }
    }
}

// ===== Factories =====

pub fn initialize(dashboard: ObjRef) -> DashboardCommand {
    DashboardCommand::new(CommandPayload::Initialize(InitializePayload {
        dashboard: Some(dashboard),
        definition: None,
    }))
}

pub fn initialize_with_definition(definition: DashboardDefinition) -> DashboardCommand {
    DashboardCommand::new(CommandPayload::Initialize(InitializePayload {
        dashboard: None,
        definition: Some(definition),
    }))
}

pub fn save_dashboard() -> DashboardCommand {
    DashboardCommand::new(CommandPayload::Save(SavePayload {}))
}

/// Store the current dashboard as a new one, optionally under another title
pub fn save_dashboard_as(title: Option<String>, switch_to_copy: bool) -> DashboardCommand {
    DashboardCommand::new(CommandPayload::SaveAs(SaveAsPayload {
        title,
        switch_to_copy,
        use_original_filter_context: false,
    }))
}

pub fn delete_dashboard() -> DashboardCommand {
    DashboardCommand::new(CommandPayload::Delete(DeletePayload {}))
}

pub fn rename_dashboard(new_title: impl Into<String>) -> DashboardCommand {
    DashboardCommand::new(CommandPayload::Rename(RenamePayload {
        new_title: new_title.into(),
    }))
}

pub fn reset_dashboard() -> DashboardCommand {
    DashboardCommand::new(CommandPayload::Reset(ResetPayload {}))
}

pub fn change_filter_context_selection(
    filters: Vec<DashboardFilter>,
    reset_others: bool,
) -> DashboardCommand {
    DashboardCommand::new(CommandPayload::ChangeFilterContextSelection(
        ChangeFilterContextSelectionPayload {
            filters,
            reset_others,
        },
    ))
}

pub fn change_date_filter_selection(selection: DateFilterSelection) -> DashboardCommand {
    DashboardCommand::new(CommandPayload::ChangeDateFilterSelection(selection))
}

/// Clear the date filter, showing data for all time
pub fn clear_date_filter_selection() -> DashboardCommand {
    change_date_filter_selection(DateFilterSelection::all_time())
}

pub fn add_attribute_filter(display_form: ObjRef, index: i64) -> DashboardCommand {
    DashboardCommand::new(CommandPayload::AddAttributeFilter(
        AddAttributeFilterPayload {
            display_form,
            index,
            parent_filters: Vec::new(),
            initial_selection: None,
            initial_is_negative_selection: None,
        },
    ))
}

pub fn remove_attribute_filters(filter_local_ids: Vec<String>) -> DashboardCommand {
    DashboardCommand::new(CommandPayload::RemoveAttributeFilters(
        RemoveAttributeFiltersPayload { filter_local_ids },
    ))
}

pub fn move_attribute_filter(filter_local_id: impl Into<String>, index: i64) -> DashboardCommand {
    DashboardCommand::new(CommandPayload::MoveAttributeFilter(
        MoveAttributeFilterPayload {
            filter_local_id: filter_local_id.into(),
            index,
        },
    ))
}

pub fn change_attribute_filter_selection(
    filter_local_id: impl Into<String>,
    elements: AttributeElements,
    selection_type: AttributeFilterSelectionType,
) -> DashboardCommand {
    DashboardCommand::new(CommandPayload::ChangeAttributeFilterSelection(
        ChangeAttributeFilterSelectionPayload {
            filter_local_id: filter_local_id.into(),
            elements,
            selection_type,
        },
    ))
}

/// Select all elements of the filter
pub fn reset_attribute_filter_selection(filter_local_id: impl Into<String>) -> DashboardCommand {
    change_attribute_filter_selection(
        filter_local_id,
        AttributeElements::default(),
        AttributeFilterSelectionType::NotIn,
    )
}

pub fn set_attribute_filter_parents(
    filter_local_id: impl Into<String>,
    parent_filters: Vec<AttributeFilterParent>,
) -> DashboardCommand {
    DashboardCommand::new(CommandPayload::SetAttributeFilterParents(
        SetAttributeFilterParentsPayload {
            filter_local_id: filter_local_id.into(),
            parent_filters,
        },
    ))
}

pub fn add_layout_section(
    index: i64,
    initial_header: Option<SectionHeader>,
    initial_items: Vec<ItemDefinition>,
) -> DashboardCommand {
    DashboardCommand::new(CommandPayload::AddLayoutSection(AddLayoutSectionPayload {
        index,
        initial_header,
        initial_items,
    }))
}

pub fn move_layout_section(section_index: i64, to_index: i64) -> DashboardCommand {
    DashboardCommand::new(CommandPayload::MoveLayoutSection(
        MoveLayoutSectionPayload {
            section_index,
            to_index,
        },
    ))
}

pub fn remove_layout_section(index: i64, stash_identifier: Option<String>) -> DashboardCommand {
    DashboardCommand::new(CommandPayload::RemoveLayoutSection(
        RemoveLayoutSectionPayload {
            index,
            stash_identifier,
        },
    ))
}

pub fn change_layout_section_header(
    index: i64,
    header: SectionHeader,
    merge: bool,
) -> DashboardCommand {
    DashboardCommand::new(CommandPayload::ChangeLayoutSectionHeader(
        ChangeLayoutSectionHeaderPayload {
            index,
            header,
            merge,
        },
    ))
}

pub fn add_section_items(
    section_index: i64,
    item_index: i64,
    items: Vec<ItemDefinition>,
) -> DashboardCommand {
    DashboardCommand::new(CommandPayload::AddSectionItems(AddSectionItemsPayload {
        section_index,
        item_index,
        items,
    }))
}

pub fn move_section_item(
    section_index: i64,
    item_index: i64,
    to_section_index: i64,
    to_item_index: i64,
) -> DashboardCommand {
    DashboardCommand::new(CommandPayload::MoveSectionItem(MoveSectionItemPayload {
        section_index,
        item_index,
        to_section_index,
        to_item_index,
    }))
}

pub fn remove_section_item(
    section_index: i64,
    item_index: i64,
    stash_identifier: Option<String>,
) -> DashboardCommand {
    DashboardCommand::new(CommandPayload::RemoveSectionItem(
        RemoveSectionItemPayload {
            section_index,
            item_index,
            stash_identifier,
            eager: false,
        },
    ))
}

/// Remove an item and the section holding it when nothing else remains
pub fn eager_remove_section_item(section_index: i64, item_index: i64) -> DashboardCommand {
    DashboardCommand::new(CommandPayload::RemoveSectionItem(
        RemoveSectionItemPayload {
            section_index,
            item_index,
            stash_identifier: None,
            eager: true,
        },
    ))
}

pub fn replace_section_item(
    section_index: i64,
    item_index: i64,
    item: ItemDefinition,
    stash_identifier: Option<String>,
) -> DashboardCommand {
    DashboardCommand::new(CommandPayload::ReplaceSectionItem(
        ReplaceSectionItemPayload {
            section_index,
            item_index,
            item,
            stash_identifier,
        },
    ))
}

pub fn undo_layout_changes(steps: u32) -> DashboardCommand {
    DashboardCommand::new(CommandPayload::UndoLayoutChanges(
        UndoLayoutChangesPayload { steps },
    ))
}

pub fn change_kpi_widget_header(widget_ref: ObjRef, header: WidgetHeader) -> DashboardCommand {
    DashboardCommand::new(CommandPayload::ChangeKpiWidgetHeader(
        ChangeWidgetHeaderPayload { widget_ref, header },
    ))
}

pub fn change_insight_widget_header(widget_ref: ObjRef, header: WidgetHeader) -> DashboardCommand {
    DashboardCommand::new(CommandPayload::ChangeInsightWidgetHeader(
        ChangeWidgetHeaderPayload { widget_ref, header },
    ))
}

pub fn refresh_kpi_widget(widget_ref: ObjRef) -> DashboardCommand {
    DashboardCommand::new(CommandPayload::RefreshKpiWidget(RefreshWidgetPayload {
        widget_ref,
    }))
}

pub fn refresh_insight_widget(widget_ref: ObjRef) -> DashboardCommand {
    DashboardCommand::new(CommandPayload::RefreshInsightWidget(RefreshWidgetPayload {
        widget_ref,
    }))
}

pub fn change_insight_widget_insight(widget_ref: ObjRef, insight_ref: ObjRef) -> DashboardCommand {
    DashboardCommand::new(CommandPayload::ChangeInsightWidgetInsight(
        ChangeInsightWidgetInsightPayload {
            widget_ref,
            insight_ref,
        },
    ))
}

/// Append an attribute filter at the end of the filter bar
pub fn append_attribute_filter(display_form: ObjRef) -> DashboardCommand {
    add_attribute_filter(display_form, END_INDEX)
}
