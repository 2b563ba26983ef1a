use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::obj_ref::ObjRef;

/// Attribute elements selected by a filter, either by URI or by value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttributeElements {
    Uris(Vec<String>),
    Values(Vec<String>),
}

impl AttributeElements {
    pub fn is_empty(&self) -> bool {
        match self {
            AttributeElements::Uris(items) | AttributeElements::Values(items) => items.is_empty(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            AttributeElements::Uris(items) | AttributeElements::Values(items) => items.len(),
        }
    }
}

impl Default for AttributeElements {
    fn default() -> Self {
        AttributeElements::Uris(Vec::new())
    }
}

/// Selection type of an attribute filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeFilterSelectionType {
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "NOT_IN")]
    NotIn,
}

impl AttributeFilterSelectionType {
    pub fn is_negative(&self) -> bool {
        matches!(self, AttributeFilterSelectionType::NotIn)
    }
}

/// Parent relationship of an attribute filter
///
/// Elements available in the child filter are narrowed by the selection in
/// the parent, connected over the listed attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeFilterParent {
    pub filter_local_identifier: String,
    #[serde(default)]
    pub over: Vec<ObjRef>,
}

/// Attribute filter placed on the dashboard filter bar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardAttributeFilter {
    pub local_identifier: String,
    pub display_form: ObjRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub attribute_elements: AttributeElements,
    pub negative_selection: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filter_elements_by: Vec<AttributeFilterParent>,
}

impl DashboardAttributeFilter {
    /// A filter with no elements excluded filters nothing
    pub fn is_all_selected(&self) -> bool {
        self.negative_selection && self.attribute_elements.is_empty()
    }

    pub fn has_parent(&self, parent_local_id: &str) -> bool {
        self.filter_elements_by
            .iter()
            .any(|p| p.filter_local_identifier == parent_local_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateFilterType {
    Absolute,
    Relative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateFilterGranularity {
    #[serde(rename = "GDC.time.date")]
    Date,
    #[serde(rename = "GDC.time.week_us")]
    Week,
    #[serde(rename = "GDC.time.month")]
    Month,
    #[serde(rename = "GDC.time.quarter")]
    Quarter,
    #[serde(rename = "GDC.time.year")]
    Year,
}

/// Date bound: a formatted date for absolute filters, an offset for relative ones
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateBound {
    Offset(i64),
    Date(String),
}

/// Date filter selection, as stored in the filter context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateFilterSelection {
    #[serde(rename = "type")]
    pub filter_type: DateFilterType,
    pub granularity: DateFilterGranularity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<DateBound>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<DateBound>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_filter_option_local_id: Option<String>,
}

impl DateFilterSelection {
    /// Unbounded relative selection, showing data for all time
    pub fn all_time() -> Self {
        Self {
            filter_type: DateFilterType::Relative,
            granularity: DateFilterGranularity::Date,
            from: None,
            to: None,
            date_filter_option_local_id: None,
        }
    }

    pub fn is_all_time(&self) -> bool {
        self.filter_type == DateFilterType::Relative && self.from.is_none() && self.to.is_none()
    }
}

/// One entry of the filter context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterContextItem {
    DateFilter(DateFilterSelection),
    AttributeFilter(DashboardAttributeFilter),
}

impl FilterContextItem {
    pub fn as_attribute_filter(&self) -> Option<&DashboardAttributeFilter> {
        match self {
            FilterContextItem::AttributeFilter(f) => Some(f),
            FilterContextItem::DateFilter(_) => None,
        }
    }

    pub fn is_date_filter(&self) -> bool {
        matches!(self, FilterContextItem::DateFilter(_))
    }
}

/// Attribute filter selection addressed by display form rather than local id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeFilterSelection {
    pub display_form: ObjRef,
    #[serde(default)]
    pub elements: AttributeElements,
    pub selection_type: AttributeFilterSelectionType,
}

/// Filter applied from outside the filter bar, e.g. by an embedding application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DashboardFilter {
    DateFilter(DateFilterSelection),
    AttributeFilter(AttributeFilterSelection),
}

/// Filters applied to the whole dashboard
///
/// When a date filter is present it is always the first item; attribute
/// filter indexes used by commands count attribute filters only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterContextDefinition {
    #[serde(default)]
    pub filters: Vec<FilterContextItem>,
}

impl FilterContextDefinition {
    pub fn attribute_filters(&self) -> impl Iterator<Item = &DashboardAttributeFilter> {
        self.filters.iter().filter_map(FilterContextItem::as_attribute_filter)
    }

    pub fn attribute_filter_count(&self) -> usize {
        self.attribute_filters().count()
    }

    pub fn date_filter(&self) -> Option<&DateFilterSelection> {
        self.filters.iter().find_map(|item| match item {
            FilterContextItem::DateFilter(d) => Some(d),
            FilterContextItem::AttributeFilter(_) => None,
        })
    }

    pub fn has_date_filter(&self) -> bool {
        self.filters.iter().any(FilterContextItem::is_date_filter)
    }

    /// Index of the attribute filter among attribute filters only
    pub fn attribute_filter_index(&self, local_id: &str) -> Option<usize> {
        self.attribute_filters()
            .position(|f| f.local_identifier == local_id)
    }

    pub fn attribute_filter(&self, local_id: &str) -> Option<&DashboardAttributeFilter> {
        self.attribute_filters()
            .find(|f| f.local_identifier == local_id)
    }

    pub fn attribute_filter_by_display_form(
        &self,
        display_form: &ObjRef,
    ) -> Option<&DashboardAttributeFilter> {
        self.attribute_filters()
            .find(|f| f.display_form.same_object(display_form))
    }
}

/// Generate the local identifier of a newly added attribute filter
///
/// Deterministic for a display form and position; a display form can be
/// filtered at most once, so identifiers never collide within a context.
pub fn generate_filter_local_identifier(display_form: &ObjRef, index: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(display_form.key().as_bytes());
    hasher.update(b"|");
    hasher.update(index.to_string().as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..32].to_string()
}
