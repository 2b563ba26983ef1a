//! Read-only queries over the dashboard state

use crate::model::{
    DashboardAttributeFilter, DashboardDefinition, DashboardLayout, DateFilterSelection,
    FilterContextDefinition, LayoutItem, LayoutSection, ObjRef,
};
use crate::state::DashboardState;

pub fn select_filter_context_definition(state: &DashboardState) -> &FilterContextDefinition {
    &state.filter_context.definition
}

/// Attribute filters in filter bar order
pub fn select_filter_context_attribute_filters(
    state: &DashboardState,
) -> Vec<&DashboardAttributeFilter> {
    state.filter_context.definition.attribute_filters().collect()
}

pub fn select_filter_context_date_filter(state: &DashboardState) -> Option<&DateFilterSelection> {
    state.filter_context.definition.date_filter()
}

pub fn select_attribute_filter_by_local_id<'a>(
    state: &'a DashboardState,
    local_id: &str,
) -> Option<&'a DashboardAttributeFilter> {
    state.filter_context.definition.attribute_filter(local_id)
}

pub fn select_attribute_filter_by_display_form<'a>(
    state: &'a DashboardState,
    display_form: &ObjRef,
) -> Option<&'a DashboardAttributeFilter> {
    state
        .filter_context
        .definition
        .attribute_filter_by_display_form(display_form)
}

pub fn select_layout(state: &DashboardState) -> &DashboardLayout {
    &state.layout.layout
}

pub fn select_layout_section(state: &DashboardState, index: usize) -> Option<&LayoutSection> {
    state.layout.layout.sections.get(index)
}

pub fn select_stash<'a>(state: &'a DashboardState, stash: &str) -> Option<&'a [LayoutItem]> {
    state.layout.stash.get(stash).map(Vec::as_slice)
}

pub fn select_undoable_layout_changes(state: &DashboardState) -> usize {
    state.layout.undo.len()
}

pub fn select_dashboard_title(state: &DashboardState) -> &str {
    &state.meta.title
}

pub fn select_dashboard_ref(state: &DashboardState) -> Option<&ObjRef> {
    state.meta.dashboard_ref.as_ref()
}

pub fn select_persisted_dashboard(state: &DashboardState) -> Option<&DashboardDefinition> {
    state.meta.persisted.as_ref()
}

/// Definition reflecting the current, possibly unsaved, state
pub fn select_dashboard_definition(state: &DashboardState) -> DashboardDefinition {
    DashboardDefinition {
        dashboard_ref: state.meta.dashboard_ref.clone(),
        title: state.meta.title.clone(),
        filter_context: state.filter_context.definition.clone(),
        layout: state.layout.layout.clone(),
        updated_at: state.meta.persisted.as_ref().and_then(|p| p.updated_at),
    }
}

/// Whether the current state differs from the persisted definition
pub fn select_is_dirty(state: &DashboardState) -> bool {
    match &state.meta.persisted {
        None => true,
        Some(persisted) => {
            persisted.title != state.meta.title
                || persisted.filter_context != state.filter_context.definition
                || persisted.layout != state.layout.layout
        }
    }
}
