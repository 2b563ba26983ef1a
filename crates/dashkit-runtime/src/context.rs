//! Dashboard context passed to every command handler

use std::fmt;
use std::sync::Arc;

use dashkit_core_types::Sensitive;
use dashkit_model::events::EventContext;
use dashkit_model::model::ObjRef;

use crate::backend::DashboardBackend;
use crate::config::{DashboardSettings, RuntimeConfig};

/// Immutable environment of one dashboard runtime
#[derive(Clone)]
pub struct DashboardContext {
    pub backend: Arc<dyn DashboardBackend>,
    pub workspace: String,
    /// Dashboard to load when INITIALIZE names none
    pub dashboard_ref: Option<ObjRef>,
    pub settings: DashboardSettings,
    pub api_token: Option<Sensitive<String>>,
}

impl DashboardContext {
    pub fn new(backend: Arc<dyn DashboardBackend>, workspace: impl Into<String>) -> Self {
        Self {
            backend,
            workspace: workspace.into(),
            dashboard_ref: None,
            settings: DashboardSettings::default(),
            api_token: None,
        }
    }

    pub fn from_config(backend: Arc<dyn DashboardBackend>, config: RuntimeConfig) -> Self {
        let dashboard_ref = config.dashboard_ref();
        Self {
            backend,
            workspace: config.workspace,
            dashboard_ref,
            settings: config.settings,
            api_token: config.api_token,
        }
    }

    pub fn with_dashboard_ref(mut self, dashboard_ref: ObjRef) -> Self {
        self.dashboard_ref = Some(dashboard_ref);
        self
    }

    pub fn with_settings(mut self, settings: DashboardSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(Sensitive::new(token.into()));
        self
    }

    /// Event context for the dashboard currently held in state
    pub fn event_context(&self, loaded_ref: Option<&ObjRef>) -> EventContext {
        EventContext {
            workspace: self.workspace.clone(),
            dashboard_ref: loaded_ref.cloned().or_else(|| self.dashboard_ref.clone()),
        }
    }
}

impl fmt::Debug for DashboardContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DashboardContext")
            .field("workspace", &self.workspace)
            .field("dashboard_ref", &self.dashboard_ref)
            .field("settings", &self.settings)
            .field("api_token", &self.api_token)
            .finish_non_exhaustive()
    }
}
