//! In-process backend used by the CLI and the tests

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashkit_model::model::{
    DashboardDefinition, DashboardSummary, DisplayFormMetadata, ObjRef, ObjectType,
};
use serde::Deserialize;

use super::{BackendError, DashboardBackend, PagedQuery, PagedResult};

/// Backend operation, used to target injected failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOp {
    LoadDashboard,
    SaveDashboard,
    DeleteDashboard,
    ResolveDisplayForm,
    ListDashboards,
}

/// Fixture file content accepted by [`InMemoryBackend::from_fixture_json`]
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Fixture {
    #[serde(default)]
    dashboards: Vec<DashboardDefinition>,
    #[serde(default)]
    display_forms: Vec<DisplayFormMetadata>,
}

#[derive(Debug, Default)]
struct Inner {
    dashboards: Vec<DashboardDefinition>,
    display_forms: Vec<DisplayFormMetadata>,
    failures: HashMap<BackendOp, VecDeque<BackendError>>,
    next_id: u64,
}

/// Backend keeping dashboards and the display form catalog in memory
///
/// Locks are never held across an `.await`; the optional latency is slept
/// before the state is touched.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    inner: Mutex<Inner>,
    latency: Option<Duration>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load dashboards and display forms from a JSON fixture
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Serialization`] when the fixture is malformed.
    pub fn from_fixture_json(json: &str) -> Result<Self, BackendError> {
        let fixture: Fixture =
            serde_json::from_str(json).map_err(|e| BackendError::Serialization {
                message: e.to_string(),
            })?;
        let backend = Self::new();
        {
            let mut inner = backend.lock();
            inner.dashboards = fixture.dashboards;
            inner.display_forms = fixture.display_forms;
        }
        Ok(backend)
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn with_dashboard(self, definition: DashboardDefinition) -> Self {
        self.insert_dashboard(definition);
        self
    }

    pub fn with_display_form(self, metadata: DisplayFormMetadata) -> Self {
        self.lock().display_forms.push(metadata);
        self
    }

    pub fn insert_dashboard(&self, definition: DashboardDefinition) {
        let mut inner = self.lock();
        match &definition.dashboard_ref {
            Some(r) => {
                if let Some(existing) = inner
                    .dashboards
                    .iter_mut()
                    .find(|d| d.dashboard_ref.as_ref().is_some_and(|e| e.same_object(r)))
                {
                    *existing = definition;
                    return;
                }
                inner.dashboards.push(definition);
            }
            None => inner.dashboards.push(definition),
        }
    }

    /// Make the next call of `op` fail with `err`; queued failures are used in order
    pub fn fail_next(&self, op: BackendOp, err: BackendError) {
        self.lock().failures.entry(op).or_default().push_back(err);
    }

    pub fn dashboard_count(&self) -> usize {
        self.lock().dashboards.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn enter(&self, op: BackendOp) -> Result<(), BackendError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        match self.lock().failures.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn sort_summaries(items: &mut [DashboardSummary], sorting: &[String]) {
    for key in sorting.iter().rev() {
        let (field, direction) = key.split_once(',').unwrap_or((key.as_str(), "asc"));
        let descending = direction.eq_ignore_ascii_case("desc");
        match field {
            "title" => items.sort_by(|a, b| {
                let ord = a.title.to_lowercase().cmp(&b.title.to_lowercase());
                if descending {
                    ord.reverse()
                } else {
                    ord
                }
            }),
            "updatedAt" => items.sort_by(|a, b| {
                let ord = a.updated_at.cmp(&b.updated_at);
                if descending {
                    ord.reverse()
                } else {
                    ord
                }
            }),
            other => tracing::debug!(sort_key = other, "Ignoring unsupported sort key"),
        }
    }
}

#[async_trait]
impl DashboardBackend for InMemoryBackend {
    async fn load_dashboard(&self, dashboard: &ObjRef) -> Result<DashboardDefinition, BackendError> {
        self.enter(BackendOp::LoadDashboard).await?;
        self.lock()
            .dashboards
            .iter()
            .find(|d| {
                d.dashboard_ref
                    .as_ref()
                    .is_some_and(|r| r.same_object(dashboard))
            })
            .cloned()
            .ok_or_else(|| BackendError::NotFound {
                object: dashboard.to_string(),
            })
    }

    async fn save_dashboard(
        &self,
        definition: &DashboardDefinition,
    ) -> Result<DashboardDefinition, BackendError> {
        self.enter(BackendOp::SaveDashboard).await?;
        let mut saved = definition.clone();
        saved.updated_at = Some(Utc::now());
        if saved.dashboard_ref.is_none() {
            let mut inner = self.lock();
            inner.next_id += 1;
            saved.dashboard_ref = Some(ObjRef::typed(
                ObjectType::Dashboard,
                format!("dashboard-{}", inner.next_id),
            ));
        }
        self.insert_dashboard(saved.clone());
        Ok(saved)
    }

    async fn delete_dashboard(&self, dashboard: &ObjRef) -> Result<(), BackendError> {
        self.enter(BackendOp::DeleteDashboard).await?;
        let mut inner = self.lock();
        let before = inner.dashboards.len();
        inner.dashboards.retain(|d| {
            !d.dashboard_ref
                .as_ref()
                .is_some_and(|r| r.same_object(dashboard))
        });
        if inner.dashboards.len() == before {
            return Err(BackendError::NotFound {
                object: dashboard.to_string(),
            });
        }
        Ok(())
    }

    async fn resolve_display_form(
        &self,
        display_form: &ObjRef,
    ) -> Result<Option<DisplayFormMetadata>, BackendError> {
        self.enter(BackendOp::ResolveDisplayForm).await?;
        Ok(self
            .lock()
            .display_forms
            .iter()
            .find(|m| m.display_form.same_object(display_form))
            .cloned())
    }

    async fn list_dashboards(
        &self,
        query: &PagedQuery,
    ) -> Result<PagedResult<DashboardSummary>, BackendError> {
        self.enter(BackendOp::ListDashboards).await?;
        let needle = query.filter.as_ref().map(|f| f.to_lowercase());
        let mut matching: Vec<DashboardSummary> = self
            .lock()
            .dashboards
            .iter()
            .filter(|d| {
                needle
                    .as_ref()
                    .map_or(true, |n| d.title.to_lowercase().contains(n.as_str()))
            })
            .filter_map(|d| {
                d.dashboard_ref.clone().map(|dashboard_ref| DashboardSummary {
                    dashboard_ref,
                    title: d.title.clone(),
                    updated_at: d.updated_at,
                })
            })
            .collect();
        sort_summaries(&mut matching, &query.sorting);

        let total_count = matching.len();
        let offset = query.offset();
        let items = matching
            .into_iter()
            .skip(offset)
            .take(query.size)
            .collect();
        Ok(PagedResult {
            items,
            total_count,
            offset,
            limit: query.size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dashboard(id: &str, title: &str) -> DashboardDefinition {
        DashboardDefinition {
            dashboard_ref: Some(ObjRef::id(id)),
            title: title.to_string(),
            ..DashboardDefinition::default()
        }
    }

    #[tokio::test]
    async fn test_load_matches_untyped_ref() {
        let backend = InMemoryBackend::new().with_dashboard(DashboardDefinition {
            dashboard_ref: Some(ObjRef::typed(ObjectType::Dashboard, "d1")),
            title: "Sales".to_string(),
            ..DashboardDefinition::default()
        });

        let loaded = backend.load_dashboard(&ObjRef::id("d1")).await.unwrap();
        assert_eq!(loaded.title, "Sales");

        let missing = backend.load_dashboard(&ObjRef::id("nope")).await;
        assert!(matches!(missing, Err(BackendError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_save_assigns_ref_to_new_dashboard() {
        let backend = InMemoryBackend::new();
        let saved = backend
            .save_dashboard(&DashboardDefinition {
                title: "New".to_string(),
                ..DashboardDefinition::default()
            })
            .await
            .unwrap();

        assert!(saved.dashboard_ref.is_some());
        assert!(saved.updated_at.is_some());
        assert_eq!(backend.dashboard_count(), 1);

        // Saving again updates in place
        backend.save_dashboard(&saved).await.unwrap();
        assert_eq!(backend.dashboard_count(), 1);
    }

    #[tokio::test]
    async fn test_delete_removes_dashboard_once() {
        let backend = InMemoryBackend::new()
            .with_dashboard(dashboard("d1", "Sales"))
            .with_dashboard(dashboard("d2", "Marketing"));

        backend.delete_dashboard(&ObjRef::id("d1")).await.unwrap();
        assert_eq!(backend.dashboard_count(), 1);

        let again = backend.delete_dashboard(&ObjRef::id("d1")).await;
        assert!(matches!(again, Err(BackendError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed_in_order() {
        let backend = InMemoryBackend::new().with_dashboard(dashboard("d1", "Sales"));
        backend.fail_next(BackendOp::LoadDashboard, BackendError::Unauthorised);

        let first = backend.load_dashboard(&ObjRef::id("d1")).await;
        assert_eq!(first, Err(BackendError::Unauthorised));

        let second = backend.load_dashboard(&ObjRef::id("d1")).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_list_filters_sorts_and_pages() {
        let backend = InMemoryBackend::new()
            .with_dashboard(dashboard("d1", "Sales EMEA"))
            .with_dashboard(dashboard("d2", "Marketing"))
            .with_dashboard(dashboard("d3", "Sales APAC"));

        let page = backend
            .list_dashboards(
                &PagedQuery::new()
                    .with_filter("sales")
                    .with_sorting("title,asc")
                    .with_size(1),
            )
            .await
            .unwrap();

        assert_eq!(page.total_count, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].title, "Sales APAC");
        assert!(page.has_next_page());
    }

    #[test]
    fn test_fixture_parsing() {
        let backend = InMemoryBackend::from_fixture_json(
            r#"{
                "dashboards": [{"ref": {"identifier": "d1"}, "title": "Sales"}],
                "displayForms": [{
                    "ref": {"identifier": "label.region"},
                    "attribute": {"identifier": "attr.region"},
                    "title": "Region"
                }]
            }"#,
        )
        .unwrap();
        assert_eq!(backend.dashboard_count(), 1);

        let bad = InMemoryBackend::from_fixture_json("{not json");
        assert!(matches!(bad, Err(BackendError::Serialization { .. })));
    }
}
