//! Analytical backend collaborator
//!
//! The runtime never talks to a concrete backend; handlers go through the
//! [`DashboardBackend`] trait held by the dashboard context. The backend
//! owns timeouts and retries, the command loop has none.

mod memory;

pub use memory::{BackendOp, InMemoryBackend};

use async_trait::async_trait;
use dashkit_model::errors::{ExError, ExErrorKind};
use dashkit_model::model::{DashboardDefinition, DashboardSummary, DisplayFormMetadata, ObjRef};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    #[error("object not found: {object}")]
    NotFound { object: String },

    #[error("not authorised to access the workspace")]
    Unauthorised,

    #[error("backend call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("backend unavailable: {message}")]
    Unavailable { message: String },

    #[error("backend returned malformed data: {message}")]
    Serialization { message: String },
}

impl From<BackendError> for ExError {
    fn from(err: BackendError) -> Self {
        let kind = match &err {
            BackendError::NotFound { .. } => ExErrorKind::NotFound,
            BackendError::Unauthorised => ExErrorKind::Unauthorised,
            BackendError::Timeout { .. } => ExErrorKind::Timeout,
            BackendError::Unavailable { .. } => ExErrorKind::Backend,
            BackendError::Serialization { .. } => ExErrorKind::Serialization,
        };
        let entity = match &err {
            BackendError::NotFound { object } => Some(object.clone()),
            _ => None,
        };
        let ex = ExError::new(kind).with_message(err.to_string());
        match entity {
            Some(id) => ex.with_entity_id(id),
            None => ex,
        }
    }
}

/// Page request for listing queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedQuery {
    pub page: usize,
    pub size: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// Sort keys in `field,direction` form, e.g. `title,asc`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sorting: Vec<String>,
}

impl Default for PagedQuery {
    fn default() -> Self {
        Self {
            page: 0,
            size: 50,
            filter: None,
            sorting: Vec::new(),
        }
    }
}

impl PagedQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size.max(1);
        self
    }

    pub fn with_page(mut self, page: usize) -> Self {
        self.page = page;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_sorting(mut self, sort: impl Into<String>) -> Self {
        self.sorting.push(sort.into());
        self
    }

    pub fn offset(&self) -> usize {
        self.page * self.size
    }
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub total_count: usize,
    pub offset: usize,
    pub limit: usize,
}

impl<T> PagedResult<T> {
    pub fn has_next_page(&self) -> bool {
        self.offset + self.items.len() < self.total_count
    }
}

#[async_trait]
pub trait DashboardBackend: Send + Sync {
    async fn load_dashboard(&self, dashboard: &ObjRef) -> Result<DashboardDefinition, BackendError>;

    /// Persist the definition; a definition without a ref creates a new
    /// dashboard. Returns the stored definition carrying its ref.
    async fn save_dashboard(
        &self,
        definition: &DashboardDefinition,
    ) -> Result<DashboardDefinition, BackendError>;

    /// Remove a persisted dashboard; [`BackendError::NotFound`] when it is unknown
    async fn delete_dashboard(&self, dashboard: &ObjRef) -> Result<(), BackendError>;

    /// Look up a display form; `Ok(None)` when it does not exist
    async fn resolve_display_form(
        &self,
        display_form: &ObjRef,
    ) -> Result<Option<DisplayFormMetadata>, BackendError>;

    async fn list_dashboards(
        &self,
        query: &PagedQuery,
    ) -> Result<PagedResult<DashboardSummary>, BackendError>;
}
