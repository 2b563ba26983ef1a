use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dashkit_model::events::{DashboardEvent, EventPayload};
use dashkit_model::model::{
    DashboardDefinition, DashboardLayout, DashboardSummary, DisplayFormMetadata, ItemSize,
    LayoutItem, LayoutSection, ObjRef, Widget, WidgetKind,
};
use dashkit_runtime::{
    BackendError, Dashboard, DashboardBackend, DashboardContext, InMemoryBackend, PagedQuery,
    PagedResult,
};

pub const WORKSPACE: &str = "test-workspace";
pub const SALES_DASHBOARD: &str = "dashboard.sales";

/// Events seen by a dispatcher subscriber, in dispatch order
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<DashboardEvent>>>,
}

#[allow(dead_code)]
impl EventLog {
    pub fn attach(dashboard: &Dashboard) -> Self {
        let log = Self::default();
        let sink = Arc::clone(&log.events);
        dashboard.subscribe(move |event| sink.lock().unwrap().push(event.clone()));
        log
    }

    pub fn events(&self) -> Vec<DashboardEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn types(&self) -> Vec<&'static str> {
        self.events().iter().map(DashboardEvent::event_type).collect()
    }

    pub fn for_correlation(&self, correlation_id: &str) -> Vec<DashboardEvent> {
        self.events()
            .into_iter()
            .filter(|e| {
                e.correlation_id
                    .as_ref()
                    .is_some_and(|c| c.as_str() == correlation_id)
            })
            .collect()
    }

    pub fn terminal_events(&self) -> Vec<DashboardEvent> {
        self.events().into_iter().filter(|e| e.is_terminal()).collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

#[allow(dead_code)]
pub fn display_form(id: &str, title: &str) -> DisplayFormMetadata {
    DisplayFormMetadata {
        display_form: ObjRef::id(id),
        attribute: ObjRef::id(format!("attr.{}", id)),
        title: title.to_string(),
    }
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

/// Widget identifiers per section
#[allow(dead_code)]
pub fn widget_ids(layout: &DashboardLayout) -> Vec<Vec<String>> {
    layout
        .sections
        .iter()
        .map(|s| s.items.iter().map(|i| i.widget.widget_ref.to_string()).collect())
        .collect()
}

#[allow(dead_code)]
pub fn sales_dashboard() -> DashboardDefinition {
    DashboardDefinition {
        dashboard_ref: Some(ObjRef::id(SALES_DASHBOARD)),
        title: "Sales".to_string(),
        filter_context: Default::default(),
        layout: layout_of(&[&["w1", "w2"], &["w3"]]),
        updated_at: None,
    }
}

/// Backend with the sales dashboard and a small display form catalog
#[allow(dead_code)]
pub fn catalog_backend() -> InMemoryBackend {
    InMemoryBackend::new()
        .with_dashboard(sales_dashboard())
        .with_display_form(display_form("label.region", "Region"))
        .with_display_form(display_form("label.product", "Product"))
        .with_display_form(display_form("label.country", "Country"))
}

#[allow(dead_code)]
pub fn start(backend: impl DashboardBackend + 'static) -> (Dashboard, EventLog) {
    start_with_context(DashboardContext::new(Arc::new(backend), WORKSPACE))
}

#[allow(dead_code)]
pub fn start_with_context(ctx: DashboardContext) -> (Dashboard, EventLog) {
    let dashboard = Dashboard::start(ctx);
    let log = EventLog::attach(&dashboard);
    (dashboard, log)
}

/// Dashboard initialized from the sales dashboard, with the log cleared
#[allow(dead_code)]
pub async fn start_initialized() -> (Dashboard, EventLog) {
    let (dashboard, log) = start(catalog_backend());
    dashboard
        .dispatch_and_wait(dashkit_model::commands::initialize(ObjRef::id(
            SALES_DASHBOARD,
        )))
        .await
        .expect("Should initialize the sales dashboard");
    log.clear();
    (dashboard, log)
}

#[allow(dead_code)]
pub fn is_user_failure(event: &DashboardEvent) -> bool {
    matches!(&event.payload, EventPayload::CommandFailed(f) if f.is_user_error())
}

/// Backend whose display form lookup panics; everything else is empty
#[allow(dead_code)]
pub struct PanickingBackend;

#[async_trait]
impl DashboardBackend for PanickingBackend {
    async fn load_dashboard(&self, dashboard: &ObjRef) -> Result<DashboardDefinition, BackendError> {
        Err(BackendError::NotFound {
            object: dashboard.to_string(),
        })
    }

    async fn save_dashboard(
        &self,
        definition: &DashboardDefinition,
    ) -> Result<DashboardDefinition, BackendError> {
        Ok(definition.clone())
    }

    async fn delete_dashboard(&self, _dashboard: &ObjRef) -> Result<(), BackendError> {
        Ok(())
    }

    async fn resolve_display_form(
        &self,
        _display_form: &ObjRef,
    ) -> Result<Option<DisplayFormMetadata>, BackendError> {
        panic!("display form catalog is corrupted");
    }

    async fn list_dashboards(
        &self,
        query: &PagedQuery,
    ) -> Result<PagedResult<DashboardSummary>, BackendError> {
        Ok(PagedResult {
            items: Vec::new(),
            total_count: 0,
            offset: query.offset(),
            limit: query.size,
        })
    }
}
