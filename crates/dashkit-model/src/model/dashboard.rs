use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::filter::FilterContextDefinition;
use super::layout::DashboardLayout;
use super::obj_ref::ObjRef;

/// Dashboard as persisted on the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardDefinition {
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub dashboard_ref: Option<ObjRef>,
    pub title: String,
    #[serde(default)]
    pub filter_context: FilterContextDefinition,
    #[serde(default)]
    pub layout: DashboardLayout,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Listing entry returned by paged dashboard queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    #[serde(rename = "ref")]
    pub dashboard_ref: ObjRef,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Catalog entry for an attribute display form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayFormMetadata {
    #[serde(rename = "ref")]
    pub display_form: ObjRef,
    pub attribute: ObjRef,
    pub title: String,
}
