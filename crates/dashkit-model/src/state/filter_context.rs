//! Filter context slice
//!
//! Attribute filter positions in actions count attribute filters only; the
//! reducer accounts for the date filter, which is always kept first.

use crate::errors::{DashboardError, Result};
use crate::model::{
    AttributeElements, AttributeFilterParent, DashboardAttributeFilter, DateFilterSelection,
    FilterContextDefinition, FilterContextItem,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterContextState {
    pub definition: FilterContextDefinition,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterContextAction {
    SetFilterContext(FilterContextDefinition),
    UpsertDateFilter(DateFilterSelection),
    RemoveDateFilter,
    AddAttributeFilter {
        filter: DashboardAttributeFilter,
        index: usize,
    },
    RemoveAttributeFilter {
        local_id: String,
    },
    MoveAttributeFilter {
        local_id: String,
        index: usize,
    },
    UpdateAttributeFilterSelection {
        local_id: String,
        elements: AttributeElements,
        negative_selection: bool,
    },
    SetAttributeFilterParents {
        local_id: String,
        parents: Vec<AttributeFilterParent>,
    },
    /// Drop every parent reference to the given filter
    RemoveParentReferences {
        parent_local_id: String,
    },
}

fn date_offset(definition: &FilterContextDefinition) -> usize {
    usize::from(definition.has_date_filter())
}

fn position_of(definition: &FilterContextDefinition, local_id: &str) -> Result<usize> {
    definition
        .filters
        .iter()
        .position(|item| {
            item.as_attribute_filter()
                .is_some_and(|f| f.local_identifier == local_id)
        })
        .ok_or_else(|| DashboardError::InvariantViolation {
            message: format!("attribute filter {} is not in the filter context", local_id),
        })
}

fn attribute_filter_mut<'a>(
    definition: &'a mut FilterContextDefinition,
    local_id: &str,
) -> Result<&'a mut DashboardAttributeFilter> {
    definition
        .filters
        .iter_mut()
        .find_map(|item| match item {
            FilterContextItem::AttributeFilter(f) if f.local_identifier == local_id => Some(f),
            _ => None,
        })
        .ok_or_else(|| DashboardError::InvariantViolation {
            message: format!("attribute filter {} is not in the filter context", local_id),
        })
}

pub fn reduce(state: &mut FilterContextState, action: FilterContextAction) -> Result<()> {
    let definition = &mut state.definition;
    match action {
        FilterContextAction::SetFilterContext(new_definition) => {
            // Normalize: the date filter goes first
            let (mut items, rest): (Vec<_>, Vec<_>) = new_definition
                .filters
                .into_iter()
                .partition(FilterContextItem::is_date_filter);
            items.truncate(1);
            items.extend(rest);
            definition.filters = items;
        }

        FilterContextAction::UpsertDateFilter(selection) => {
            match definition.filters.first_mut() {
                Some(FilterContextItem::DateFilter(current)) => *current = selection,
                _ => definition
                    .filters
                    .insert(0, FilterContextItem::DateFilter(selection)),
            }
        }

        FilterContextAction::RemoveDateFilter => {
            definition.filters.retain(|item| !item.is_date_filter());
        }

        FilterContextAction::AddAttributeFilter { filter, index } => {
            let count = definition.attribute_filter_count();
            if index > count {
                return Err(DashboardError::InvariantViolation {
                    message: format!("attribute filter index {} beyond {}", index, count),
                });
            }
            let at = index + date_offset(definition);
            definition
                .filters
                .insert(at, FilterContextItem::AttributeFilter(filter));
        }

        FilterContextAction::RemoveAttributeFilter { local_id } => {
            let at = position_of(definition, &local_id)?;
            definition.filters.remove(at);
        }

        FilterContextAction::MoveAttributeFilter { local_id, index } => {
            let from = position_of(definition, &local_id)?;
            let item = definition.filters.remove(from);
            let count = definition.attribute_filter_count();
            if index > count {
                return Err(DashboardError::InvariantViolation {
                    message: format!("attribute filter index {} beyond {}", index, count),
                });
            }
            let at = index + date_offset(definition);
            definition.filters.insert(at, item);
        }

        FilterContextAction::UpdateAttributeFilterSelection {
            local_id,
            elements,
            negative_selection,
        } => {
            let filter = attribute_filter_mut(definition, &local_id)?;
            filter.attribute_elements = elements;
            filter.negative_selection = negative_selection;
        }

        FilterContextAction::SetAttributeFilterParents { local_id, parents } => {
            attribute_filter_mut(definition, &local_id)?.filter_elements_by = parents;
        }

        FilterContextAction::RemoveParentReferences { parent_local_id } => {
            for item in definition.filters.iter_mut() {
                if let FilterContextItem::AttributeFilter(f) = item {
                    f.filter_elements_by
                        .retain(|p| p.filter_local_identifier != parent_local_id);
                }
            }
        }
    }
    Ok(())
}
