use dashkit_model::model::{
    AttributeElements, DashboardAttributeFilter, DashboardLayout, DateFilterSelection,
    FilterContextDefinition, FilterContextItem, ItemSize, LayoutItem, LayoutSection, ObjRef,
    Widget, WidgetKind,
};
use dashkit_model::state::{DashboardState, StateStore};

/// Attribute filter selecting all elements of `display_form`
#[allow(dead_code)]
pub fn attribute_filter(local_id: &str, display_form: &str) -> DashboardAttributeFilter {
    DashboardAttributeFilter {
        local_identifier: local_id.to_string(),
        display_form: ObjRef::id(display_form),
        title: None,
        attribute_elements: AttributeElements::default(),
        negative_selection: true,
        filter_elements_by: Vec::new(),
    }
}

/// Filter context with an all-time date filter followed by the given attribute filters
#[allow(dead_code)]
pub fn filter_context_with_date(filters: Vec<DashboardAttributeFilter>) -> FilterContextDefinition {
    let mut items = vec![FilterContextItem::DateFilter(DateFilterSelection::all_time())];
    items.extend(filters.into_iter().map(FilterContextItem::AttributeFilter));
    FilterContextDefinition { filters: items }
}

#[allow(dead_code)]
pub fn insight_item(id: &str) -> LayoutItem {
    LayoutItem {
        size: ItemSize { grid_width: 6 },
        widget: Widget {
            widget_ref: ObjRef::id(id),
            title: id.to_string(),
            kind: WidgetKind::Insight {
                insight: ObjRef::id(format!("insight.{}", id)),
            },
        },
    }
}

#[allow(dead_code)]
pub fn layout_of(sections: &[&[&str]]) -> DashboardLayout {
    DashboardLayout {
        sections: sections
            .iter()
            .map(|ids| LayoutSection {
                header: None,
                items: ids.iter().map(|id| insight_item(id)).collect(),
            })
            .collect(),
    }
}

/// Store whose filter context holds the given definition
#[allow(dead_code)]
pub fn store_with_filter_context(definition: FilterContextDefinition) -> StateStore {
    let mut state = DashboardState::default();
    state.filter_context.definition = definition;
    StateStore::new(state)
}

/// Local identifiers of attribute filters in order
#[allow(dead_code)]
pub fn attribute_filter_ids(state: &DashboardState) -> Vec<String> {
    dashkit_model::selectors::select_filter_context_attribute_filters(state)
        .into_iter()
        .map(|f| f.local_identifier.clone())
        .collect()
}
