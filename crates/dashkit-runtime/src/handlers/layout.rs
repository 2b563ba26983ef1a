//! Fluid layout handlers
//!
//! Every layout-changing command records an undo point in the same batch
//! as its change, unless layout undo is disabled in the settings. Widget
//! header changes edit a widget in place and are not undoable.

use std::collections::HashSet;

use dashkit_model::commands::{
    AddLayoutSectionPayload, AddSectionItemsPayload, ChangeLayoutSectionHeaderPayload,
    ChangeWidgetHeaderPayload, MoveLayoutSectionPayload, MoveSectionItemPayload,
    RemoveLayoutSectionPayload, RemoveSectionItemPayload, ReplaceSectionItemPayload,
    UndoLayoutChangesPayload,
};
use dashkit_model::errors::DashboardError;
use dashkit_model::events::{DashboardEvent, EventPayload};
use dashkit_model::model::{
    resolve_existing_index, resolve_insert_index, ItemDefinition, LayoutItem, LayoutSection,
};
use dashkit_model::selectors::{
    select_layout, select_layout_section, select_stash, select_undoable_layout_changes,
};
use dashkit_model::state::{DashboardAction, LayoutAction};

use super::HandlerScope;
use crate::errors::HandlerError;

fn layout_changed(scope: &HandlerScope<'_>) -> DashboardEvent {
    scope.event(EventPayload::LayoutChanged {
        layout: select_layout(scope.state()).clone(),
    })
}

/// Apply `actions` preceded by an undo point
fn apply_undoable(
    scope: &mut HandlerScope<'_>,
    actions: Vec<LayoutAction>,
) -> Result<(), HandlerError> {
    let mut batch: Vec<DashboardAction> = Vec::with_capacity(actions.len() + 1);
    if scope.ctx().settings.layout_undo {
        batch.push(
            LayoutAction::RecordUndo {
                command_type: scope.command_type().to_string(),
            }
            .into(),
        );
    }
    batch.extend(actions.into_iter().map(DashboardAction::from));
    scope.dispatch_batch(batch)
}

fn existing_section(scope: &HandlerScope<'_>, index: i64) -> Result<usize, HandlerError> {
    let len = select_layout(scope.state()).sections.len();
    resolve_existing_index(index, len)
        .ok_or_else(|| scope.fail(DashboardError::InvalidSectionIndex { index, len }))
}

fn section(scope: &HandlerScope<'_>, index: usize) -> Result<LayoutSection, HandlerError> {
    select_layout_section(scope.state(), index)
        .cloned()
        .ok_or_else(|| {
            HandlerError::Internal(format!("section {} vanished during validation", index))
        })
}

fn existing_item(
    scope: &HandlerScope<'_>,
    section_index: usize,
    index: i64,
) -> Result<usize, HandlerError> {
    let len = section(scope, section_index)?.items.len();
    resolve_existing_index(index, len).ok_or_else(|| {
        scope.fail(DashboardError::InvalidItemIndex {
            section_index,
            index,
            len,
        })
    })
}

fn ensure_stash_free(scope: &HandlerScope<'_>, stash: Option<&String>) -> Result<(), HandlerError> {
    match stash {
        Some(id) if select_stash(scope.state(), id).is_some() => {
            Err(scope.fail(DashboardError::StashAlreadyExists { stash: id.clone() }))
        }
        _ => Ok(()),
    }
}

/// Expand item definitions, taking stashed items; returns the items and the stashes used
fn resolve_items(
    scope: &HandlerScope<'_>,
    definitions: &[ItemDefinition],
) -> Result<(Vec<LayoutItem>, Vec<String>), HandlerError> {
    let mut items = Vec::new();
    let mut used = Vec::new();
    let mut seen = HashSet::new();
    for definition in definitions {
        match definition {
            ItemDefinition::Item(item) => items.push(item.clone()),
            ItemDefinition::Stash(id) => {
                let Some(stashed) = select_stash(scope.state(), id) else {
                    return Err(scope.fail(DashboardError::StashNotFound { stash: id.clone() }));
                };
                if !seen.insert(id.as_str()) {
                    return Err(scope.fail(DashboardError::InvalidInput {
                        reason: format!("stash {} used more than once", id),
                    }));
                }
                items.extend(stashed.iter().cloned());
                used.push(id.clone());
            }
        }
    }
    Ok((items, used))
}

pub(super) fn add_layout_section(
    scope: &mut HandlerScope<'_>,
    payload: &AddLayoutSectionPayload,
) -> Result<DashboardEvent, HandlerError> {
    let len = select_layout(scope.state()).sections.len();
    let Some(index) = resolve_insert_index(payload.index, len) else {
        return Err(scope.fail(DashboardError::InvalidSectionIndex {
            index: payload.index,
            len,
        }));
    };
    let (items, used_stashes) = resolve_items(scope, &payload.initial_items)?;
    let section = LayoutSection {
        header: payload.initial_header.clone(),
        items,
    };

    apply_undoable(
        scope,
        vec![LayoutAction::AddSection {
            section: section.clone(),
            index,
            used_stashes,
        }],
    )?;
    scope.emit(EventPayload::LayoutSectionAdded { section, index });

    Ok(layout_changed(scope))
}

pub(super) fn move_layout_section(
    scope: &mut HandlerScope<'_>,
    payload: &MoveLayoutSectionPayload,
) -> Result<DashboardEvent, HandlerError> {
    let from = existing_section(scope, payload.section_index)?;
    let to = existing_section(scope, payload.to_index)?;
    if from == to {
        return Err(scope.fail(DashboardError::InvalidInput {
            reason: format!("section {} is already at index {}", from, to),
        }));
    }
    let moved = section(scope, from)?;

    apply_undoable(scope, vec![LayoutAction::MoveSection { from, to }])?;
    scope.emit(EventPayload::LayoutSectionMoved {
        section: moved,
        from_index: from,
        to_index: to,
    });

    Ok(layout_changed(scope))
}

pub(super) fn remove_layout_section(
    scope: &mut HandlerScope<'_>,
    payload: &RemoveLayoutSectionPayload,
) -> Result<DashboardEvent, HandlerError> {
    let index = existing_section(scope, payload.index)?;
    ensure_stash_free(scope, payload.stash_identifier.as_ref())?;
    let removed = section(scope, index)?;

    apply_undoable(
        scope,
        vec![LayoutAction::RemoveSection {
            index,
            stash_identifier: payload.stash_identifier.clone(),
        }],
    )?;
    scope.emit(EventPayload::LayoutSectionRemoved {
        section: removed,
        index,
        stash_identifier: payload.stash_identifier.clone(),
    });

    Ok(layout_changed(scope))
}

pub(super) fn change_layout_section_header(
    scope: &mut HandlerScope<'_>,
    payload: &ChangeLayoutSectionHeaderPayload,
) -> Result<DashboardEvent, HandlerError> {
    let index = existing_section(scope, payload.index)?;
    let header = if payload.merge {
        section(scope, index)?
            .header
            .unwrap_or_default()
            .merged_with(&payload.header)
    } else {
        payload.header.clone()
    };

    apply_undoable(
        scope,
        vec![LayoutAction::ChangeSectionHeader {
            index,
            header: header.clone(),
        }],
    )?;
    scope.emit(EventPayload::LayoutSectionHeaderChanged { header, index });

    Ok(layout_changed(scope))
}

pub(super) fn add_section_items(
    scope: &mut HandlerScope<'_>,
    payload: &AddSectionItemsPayload,
) -> Result<DashboardEvent, HandlerError> {
    let section_index = existing_section(scope, payload.section_index)?;
    let len = section(scope, section_index)?.items.len();
    let Some(start_index) = resolve_insert_index(payload.item_index, len) else {
        return Err(scope.fail(DashboardError::InvalidItemIndex {
            section_index,
            index: payload.item_index,
            len,
        }));
    };
    let (items, used_stashes) = resolve_items(scope, &payload.items)?;
    if items.is_empty() {
        return Err(scope.fail(DashboardError::InvalidInput {
            reason: "no items to add".to_string(),
        }));
    }

    apply_undoable(
        scope,
        vec![LayoutAction::AddSectionItems {
            section_index,
            item_index: start_index,
            items: items.clone(),
            used_stashes: used_stashes.clone(),
        }],
    )?;
    scope.emit(EventPayload::LayoutSectionItemsAdded {
        section_index,
        start_index,
        items_added: items,
        stashes_used: used_stashes,
    });

    Ok(layout_changed(scope))
}

pub(super) fn move_section_item(
    scope: &mut HandlerScope<'_>,
    payload: &MoveSectionItemPayload,
) -> Result<DashboardEvent, HandlerError> {
    let from_section = existing_section(scope, payload.section_index)?;
    let from_index = existing_item(scope, from_section, payload.item_index)?;
    let to_section = existing_section(scope, payload.to_section_index)?;

    // Target positions address the target section with the item already taken out
    let target_len = section(scope, to_section)?.items.len();
    let resolved = if to_section == from_section {
        resolve_existing_index(payload.to_item_index, target_len)
    } else {
        resolve_insert_index(payload.to_item_index, target_len)
    };
    let Some(to_index) = resolved else {
        return Err(scope.fail(DashboardError::InvalidItemIndex {
            section_index: to_section,
            index: payload.to_item_index,
            len: target_len,
        }));
    };
    if to_section == from_section && to_index == from_index {
        return Err(scope.fail(DashboardError::InvalidInput {
            reason: "item is already at the target position".to_string(),
        }));
    }
    let item = section(scope, from_section)?.items[from_index].clone();

    apply_undoable(
        scope,
        vec![LayoutAction::MoveSectionItem {
            section_index: from_section,
            item_index: from_index,
            to_section_index: to_section,
            to_item_index: to_index,
        }],
    )?;
    scope.emit(EventPayload::LayoutSectionItemMoved {
        item,
        from_section_index: from_section,
        to_section_index: to_section,
        from_index,
        to_index,
    });

    Ok(layout_changed(scope))
}

pub(super) fn remove_section_item(
    scope: &mut HandlerScope<'_>,
    payload: &RemoveSectionItemPayload,
) -> Result<DashboardEvent, HandlerError> {
    let section_index = existing_section(scope, payload.section_index)?;
    let item_index = existing_item(scope, section_index, payload.item_index)?;
    ensure_stash_free(scope, payload.stash_identifier.as_ref())?;

    let current = section(scope, section_index)?;
    let item = current.items[item_index].clone();
    let section_removed = payload.eager && current.items.len() == 1;

    let mut actions = vec![LayoutAction::RemoveSectionItem {
        section_index,
        item_index,
        stash_identifier: payload.stash_identifier.clone(),
    }];
    if section_removed {
        actions.push(LayoutAction::RemoveSection {
            index: section_index,
            stash_identifier: None,
        });
    }
    apply_undoable(scope, actions)?;

    scope.emit(EventPayload::LayoutSectionItemRemoved {
        item,
        section_index,
        item_index,
        stash_identifier: payload.stash_identifier.clone(),
        section_removed,
    });

    Ok(layout_changed(scope))
}

pub(super) fn replace_section_item(
    scope: &mut HandlerScope<'_>,
    payload: &ReplaceSectionItemPayload,
) -> Result<DashboardEvent, HandlerError> {
    let section_index = existing_section(scope, payload.section_index)?;
    let item_index = existing_item(scope, section_index, payload.item_index)?;
    ensure_stash_free(scope, payload.stash_identifier.as_ref())?;
    let (items, used_stashes) = resolve_items(scope, std::slice::from_ref(&payload.item))?;
    if items.is_empty() {
        return Err(scope.fail(DashboardError::InvalidInput {
            reason: "replacement has no items".to_string(),
        }));
    }
    let previous_item = section(scope, section_index)?.items[item_index].clone();

    apply_undoable(
        scope,
        vec![LayoutAction::ReplaceSectionItem {
            section_index,
            item_index,
            items: items.clone(),
            stash_identifier: payload.stash_identifier.clone(),
            used_stashes: used_stashes.clone(),
        }],
    )?;
    scope.emit(EventPayload::LayoutSectionItemReplaced {
        section_index,
        item_index,
        items,
        previous_item,
        stash_identifier: payload.stash_identifier.clone(),
        stashes_used: used_stashes,
    });

    Ok(layout_changed(scope))
}

/// Widget kind a header command is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum WidgetTarget {
    Kpi,
    Insight,
}

impl WidgetTarget {
    fn label(self) -> &'static str {
        match self {
            WidgetTarget::Kpi => "KPI",
            WidgetTarget::Insight => "insight",
        }
    }
}

pub(super) fn change_widget_header(
    scope: &mut HandlerScope<'_>,
    payload: &ChangeWidgetHeaderPayload,
    target: WidgetTarget,
) -> Result<DashboardEvent, HandlerError> {
    let layout = select_layout(scope.state());
    let Some((section_index, item_index)) = layout.widget_position(&payload.widget_ref) else {
        return Err(scope.fail(DashboardError::WidgetNotFound {
            widget: payload.widget_ref.to_string(),
        }));
    };
    let widget = &layout.sections[section_index].items[item_index].widget;
    let matches_target = match target {
        WidgetTarget::Kpi => widget.is_kpi(),
        WidgetTarget::Insight => widget.is_insight(),
    };
    if !matches_target {
        return Err(scope.fail(DashboardError::WidgetTypeMismatch {
            widget: payload.widget_ref.to_string(),
            expected: target.label().to_string(),
        }));
    }
    let widget_ref = widget.widget_ref.clone();

    scope.dispatch(LayoutAction::ChangeWidgetTitle {
        section_index,
        item_index,
        title: payload.header.title.clone(),
    })?;

    let header = payload.header.clone();
    Ok(scope.event(match target {
        WidgetTarget::Kpi => EventPayload::KpiWidgetHeaderChanged { widget_ref, header },
        WidgetTarget::Insight => EventPayload::InsightWidgetHeaderChanged { widget_ref, header },
    }))
}

/// Fails with [`DashboardError::LayoutUndoDisabled`] when layout undo is off
/// in the settings.
pub(super) fn undo_layout_changes(
    scope: &mut HandlerScope<'_>,
    payload: &UndoLayoutChangesPayload,
) -> Result<DashboardEvent, HandlerError> {
    if !scope.ctx().settings.layout_undo {
        return Err(scope.fail(DashboardError::LayoutUndoDisabled));
    }
    let available = select_undoable_layout_changes(scope.state());
    if available == 0 {
        return Err(scope.fail(DashboardError::NothingToUndo));
    }
    let steps = payload.steps as usize;
    if steps == 0 || steps > available {
        return Err(scope.fail(DashboardError::InvalidInput {
            reason: format!("cannot undo {} steps, {} available", steps, available),
        }));
    }

    scope.dispatch(LayoutAction::Undo { steps })?;
    scope.emit(EventPayload::LayoutChangesUndone {
        steps: payload.steps,
    });

    Ok(layout_changed(scope))
}
