use std::collections::{HashMap, HashSet};

use dashkit_model::commands::{
    AddAttributeFilterPayload, ChangeAttributeFilterSelectionPayload,
    ChangeFilterContextSelectionPayload, MoveAttributeFilterPayload,
    RemoveAttributeFiltersPayload, SetAttributeFilterParentsPayload,
};
use dashkit_model::errors::DashboardError;
use dashkit_model::events::{DashboardEvent, EventPayload};
use dashkit_model::model::{
    generate_filter_local_identifier, resolve_existing_index, resolve_insert_index,
    AttributeElements, AttributeFilterParent, DashboardAttributeFilter, DashboardFilter,
    DateBound, DateFilterSelection, DateFilterType,
};
use dashkit_model::selectors::{
    select_attribute_filter_by_display_form, select_attribute_filter_by_local_id,
    select_filter_context_attribute_filters, select_filter_context_date_filter,
    select_filter_context_definition,
};
use dashkit_model::state::{DashboardAction, FilterContextAction};

use super::HandlerScope;
use crate::errors::HandlerError;

fn filter_context_changed(scope: &HandlerScope<'_>) -> DashboardEvent {
    scope.event(EventPayload::FilterContextChanged {
        filter_context: select_filter_context_definition(scope.state()).clone(),
    })
}

fn existing_filter(
    scope: &HandlerScope<'_>,
    local_id: &str,
) -> Result<DashboardAttributeFilter, HandlerError> {
    select_attribute_filter_by_local_id(scope.state(), local_id)
        .cloned()
        .ok_or_else(|| {
            scope.fail(DashboardError::AttributeFilterNotFound {
                local_id: local_id.to_string(),
            })
        })
}

fn validate_date_selection(selection: &DateFilterSelection) -> Result<(), String> {
    match selection.filter_type {
        DateFilterType::Absolute => match (&selection.from, &selection.to) {
            (Some(DateBound::Date(from)), Some(DateBound::Date(to))) => {
                if from > to {
                    return Err(format!("absolute range starts after it ends ({} > {})", from, to));
                }
                Ok(())
            }
            _ => Err("absolute date filter needs both bounds as dates".to_string()),
        },
        DateFilterType::Relative => match (&selection.from, &selection.to) {
            (None, None) => Ok(()),
            (Some(DateBound::Offset(from)), Some(DateBound::Offset(to))) => {
                if from > to {
                    return Err(format!("relative range starts after it ends ({} > {})", from, to));
                }
                Ok(())
            }
            _ => Err("relative date filter needs both bounds as offsets".to_string()),
        },
    }
}

pub(super) fn change_date_filter_selection(
    scope: &mut HandlerScope<'_>,
    selection: &DateFilterSelection,
) -> Result<DashboardEvent, HandlerError> {
    validate_date_selection(selection)
        .map_err(|reason| scope.fail(DashboardError::InvalidInput { reason }))?;

    if selection.is_all_time() {
        scope.dispatch(FilterContextAction::RemoveDateFilter)?;
        scope.emit(EventPayload::DateFilterSelectionChanged { date_filter: None });
    } else {
        scope.dispatch(FilterContextAction::UpsertDateFilter(selection.clone()))?;
        scope.emit(EventPayload::DateFilterSelectionChanged {
            date_filter: Some(selection.clone()),
        });
    }

    Ok(filter_context_changed(scope))
}

/// Apply several filter selections in one step
///
/// Attribute selections are matched to context filters by display form;
/// unmatched and repeated ones are skipped. With `reset_others`, filters the
/// payload leaves out select all elements and a missing date filter clears
/// the date selection.
pub(super) fn change_filter_context_selection(
    scope: &mut HandlerScope<'_>,
    payload: &ChangeFilterContextSelectionPayload,
) -> Result<DashboardEvent, HandlerError> {
    let date = payload.filters.iter().find_map(|f| match f {
        DashboardFilter::DateFilter(selection) => Some(selection),
        DashboardFilter::AttributeFilter(_) => None,
    });
    if let Some(selection) = date {
        validate_date_selection(selection)
            .map_err(|reason| scope.fail(DashboardError::InvalidInput { reason }))?;
    }

    let mut updates: Vec<(String, AttributeElements, bool)> = Vec::new();
    for selection in payload.filters.iter().filter_map(|f| match f {
        DashboardFilter::AttributeFilter(selection) => Some(selection),
        DashboardFilter::DateFilter(_) => None,
    }) {
        let Some(target) =
            select_attribute_filter_by_display_form(scope.state(), &selection.display_form)
        else {
            tracing::debug!(
                display_form = %selection.display_form,
                "No attribute filter for display form, selection skipped"
            );
            continue;
        };
        if updates.iter().any(|(id, _, _)| *id == target.local_identifier) {
            tracing::debug!(
                local_id = target.local_identifier.as_str(),
                "Attribute filter selected more than once, keeping the first"
            );
            continue;
        }
        updates.push((
            target.local_identifier.clone(),
            selection.elements.clone(),
            selection.selection_type.is_negative(),
        ));
    }
    if payload.reset_others {
        let untouched: Vec<String> = select_filter_context_attribute_filters(scope.state())
            .into_iter()
            .filter(|f| !updates.iter().any(|(id, _, _)| *id == f.local_identifier))
            .map(|f| f.local_identifier.clone())
            .collect();
        updates.extend(
            untouched
                .into_iter()
                .map(|id| (id, AttributeElements::default(), true)),
        );
    }

    let previous_date = select_filter_context_date_filter(scope.state()).cloned();
    let mut actions: Vec<DashboardAction> = Vec::new();
    match date {
        Some(selection) if selection.is_all_time() => {
            actions.push(FilterContextAction::RemoveDateFilter.into());
        }
        Some(selection) => {
            actions.push(FilterContextAction::UpsertDateFilter(selection.clone()).into());
        }
        None if payload.reset_others => {
            actions.push(FilterContextAction::RemoveDateFilter.into());
        }
        None => {}
    }
    let before: Vec<DashboardAttributeFilter> = updates
        .iter()
        .filter_map(|(id, _, _)| select_attribute_filter_by_local_id(scope.state(), id).cloned())
        .collect();
    actions.extend(updates.iter().map(|(id, elements, negative)| {
        DashboardAction::from(FilterContextAction::UpdateAttributeFilterSelection {
            local_id: id.clone(),
            elements: elements.clone(),
            negative_selection: *negative,
        })
    }));
    scope.dispatch_batch(actions)?;

    let current_date = select_filter_context_date_filter(scope.state()).cloned();
    if current_date != previous_date {
        scope.emit(EventPayload::DateFilterSelectionChanged {
            date_filter: current_date,
        });
    }
    for previous in before {
        let updated = existing_filter(scope, &previous.local_identifier)?;
        if updated != previous {
            scope.emit(EventPayload::AttributeFilterSelectionChanged { filter: updated });
        }
    }

    Ok(filter_context_changed(scope))
}

fn validate_parents(
    scope: &HandlerScope<'_>,
    local_id: &str,
    parents: &[AttributeFilterParent],
) -> Result<(), HandlerError> {
    let mut seen = HashSet::new();
    for parent in parents {
        let parent_id = parent.filter_local_identifier.as_str();
        let reason = if parent_id == local_id {
            Some("a filter cannot be its own parent")
        } else if select_attribute_filter_by_local_id(scope.state(), parent_id).is_none() {
            Some("parent filter does not exist")
        } else if !seen.insert(parent_id) {
            Some("parent filter listed more than once")
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(scope.fail(DashboardError::InvalidParentFilter {
                local_id: local_id.to_string(),
                parent_id: parent_id.to_string(),
                reason: reason.to_string(),
            }));
        }
    }
    Ok(())
}

/// Whether giving `local_id` the listed parents closes a loop in the parent graph
fn creates_cycle(
    filters: &[&DashboardAttributeFilter],
    local_id: &str,
    parents: &[AttributeFilterParent],
) -> bool {
    let graph: HashMap<&str, Vec<&str>> = filters
        .iter()
        .map(|f| {
            let edges = if f.local_identifier == local_id {
                parents
                    .iter()
                    .map(|p| p.filter_local_identifier.as_str())
                    .collect()
            } else {
                f.filter_elements_by
                    .iter()
                    .map(|p| p.filter_local_identifier.as_str())
                    .collect()
            };
            (f.local_identifier.as_str(), edges)
        })
        .collect();

    let mut stack: Vec<&str> = parents
        .iter()
        .map(|p| p.filter_local_identifier.as_str())
        .collect();
    let mut visited = HashSet::new();
    while let Some(current) = stack.pop() {
        if current == local_id {
            return true;
        }
        if visited.insert(current) {
            if let Some(next) = graph.get(current) {
                stack.extend(next.iter().copied());
            }
        }
    }
    false
}

pub(super) async fn add_attribute_filter(
    scope: &mut HandlerScope<'_>,
    payload: &AddAttributeFilterPayload,
) -> Result<DashboardEvent, HandlerError> {
    let ctx = scope.ctx();
    let count = select_filter_context_attribute_filters(scope.state()).len();
    let limit = ctx.settings.max_attribute_filters;
    if count >= limit {
        return Err(scope.fail(DashboardError::AttributeFilterLimitReached { limit }));
    }

    let Some(index) = resolve_insert_index(payload.index, count) else {
        return Err(scope.fail(DashboardError::InvalidFilterIndex {
            index: payload.index,
            len: count,
        }));
    };

    if select_attribute_filter_by_display_form(scope.state(), &payload.display_form).is_some() {
        return Err(scope.fail(DashboardError::DisplayFormAlreadyFiltered {
            display_form: payload.display_form.to_string(),
        }));
    }

    let Some(metadata) = ctx
        .backend
        .resolve_display_form(&payload.display_form)
        .await?
    else {
        return Err(scope.fail(DashboardError::DisplayFormNotFound {
            display_form: payload.display_form.to_string(),
        }));
    };

    let local_identifier = generate_filter_local_identifier(&metadata.display_form, index);
    validate_parents(scope, &local_identifier, &payload.parent_filters)?;

    let filter = DashboardAttributeFilter {
        local_identifier,
        display_form: payload.display_form.clone(),
        title: Some(metadata.title),
        attribute_elements: payload.initial_selection.clone().unwrap_or_default(),
        negative_selection: payload.initial_is_negative_selection.unwrap_or(true),
        filter_elements_by: payload.parent_filters.clone(),
    };

    scope.dispatch(FilterContextAction::AddAttributeFilter {
        filter: filter.clone(),
        index,
    })?;
    scope.emit(EventPayload::AttributeFilterAdded {
        added: filter,
        index,
    });

    Ok(filter_context_changed(scope))
}

pub(super) fn remove_attribute_filters(
    scope: &mut HandlerScope<'_>,
    payload: &RemoveAttributeFiltersPayload,
) -> Result<DashboardEvent, HandlerError> {
    if payload.filter_local_ids.is_empty() {
        return Err(scope.fail(DashboardError::InvalidInput {
            reason: "no attribute filters to remove".to_string(),
        }));
    }

    let mut removed = Vec::new();
    let mut seen = HashSet::new();
    for local_id in &payload.filter_local_ids {
        if seen.insert(local_id.as_str()) {
            removed.push(existing_filter(scope, local_id)?);
        }
    }

    let removed_events: Vec<EventPayload> = removed
        .iter()
        .map(|filter| {
            let children = select_filter_context_attribute_filters(scope.state())
                .into_iter()
                .filter(|f| f.has_parent(&filter.local_identifier))
                .cloned()
                .collect();
            EventPayload::AttributeFilterRemoved {
                removed: filter.clone(),
                children,
            }
        })
        .collect();

    let actions: Vec<DashboardAction> = removed
        .iter()
        .flat_map(|filter| {
            [
                DashboardAction::from(FilterContextAction::RemoveAttributeFilter {
                    local_id: filter.local_identifier.clone(),
                }),
                DashboardAction::from(FilterContextAction::RemoveParentReferences {
                    parent_local_id: filter.local_identifier.clone(),
                }),
            ]
        })
        .collect();
    scope.dispatch_batch(actions)?;

    for event in removed_events {
        scope.emit(event);
    }
    Ok(filter_context_changed(scope))
}

pub(super) fn move_attribute_filter(
    scope: &mut HandlerScope<'_>,
    payload: &MoveAttributeFilterPayload,
) -> Result<DashboardEvent, HandlerError> {
    let filter = existing_filter(scope, &payload.filter_local_id)?;
    let filters = select_filter_context_attribute_filters(scope.state());
    let count = filters.len();
    let from_index = filters
        .iter()
        .position(|f| f.local_identifier == filter.local_identifier)
        .unwrap_or_default();

    let Some(to_index) = resolve_existing_index(payload.index, count) else {
        return Err(scope.fail(DashboardError::InvalidFilterIndex {
            index: payload.index,
            len: count,
        }));
    };

    scope.dispatch(FilterContextAction::MoveAttributeFilter {
        local_id: filter.local_identifier.clone(),
        index: to_index,
    })?;
    scope.emit(EventPayload::AttributeFilterMoved {
        moved: filter,
        from_index,
        to_index,
    });

    Ok(filter_context_changed(scope))
}

pub(super) fn change_attribute_filter_selection(
    scope: &mut HandlerScope<'_>,
    payload: &ChangeAttributeFilterSelectionPayload,
) -> Result<DashboardEvent, HandlerError> {
    existing_filter(scope, &payload.filter_local_id)?;

    scope.dispatch(FilterContextAction::UpdateAttributeFilterSelection {
        local_id: payload.filter_local_id.clone(),
        elements: payload.elements.clone(),
        negative_selection: payload.selection_type.is_negative(),
    })?;
    let updated = existing_filter(scope, &payload.filter_local_id)?;
    scope.emit(EventPayload::AttributeFilterSelectionChanged { filter: updated });

    Ok(filter_context_changed(scope))
}

pub(super) fn set_attribute_filter_parents(
    scope: &mut HandlerScope<'_>,
    payload: &SetAttributeFilterParentsPayload,
) -> Result<DashboardEvent, HandlerError> {
    let local_id = payload.filter_local_id.as_str();
    existing_filter(scope, local_id)?;
    validate_parents(scope, local_id, &payload.parent_filters)?;

    let filters = select_filter_context_attribute_filters(scope.state());
    if creates_cycle(&filters, local_id, &payload.parent_filters) {
        return Err(scope.fail(DashboardError::FilterParentCycle {
            local_id: local_id.to_string(),
        }));
    }

    scope.dispatch(FilterContextAction::SetAttributeFilterParents {
        local_id: local_id.to_string(),
        parents: payload.parent_filters.clone(),
    })?;
    let updated = existing_filter(scope, local_id)?;
    scope.emit(EventPayload::AttributeFilterParentChanged { filter: updated });

    Ok(filter_context_changed(scope))
}
