//! Dashboard metadata slice

use crate::model::{DashboardDefinition, ObjRef};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetaState {
    pub dashboard_ref: Option<ObjRef>,
    pub title: String,
    /// Last definition loaded from or saved to the backend
    pub persisted: Option<DashboardDefinition>,
}

impl MetaState {
    pub fn is_persisted(&self) -> bool {
        self.persisted.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetaAction {
    /// Replace the whole slice from a loaded definition
    SetMeta {
        dashboard_ref: Option<ObjRef>,
        title: String,
        persisted: Option<DashboardDefinition>,
    },
    SetTitle(String),
    SetPersisted(DashboardDefinition),
}

pub fn reduce(state: &mut MetaState, action: MetaAction) {
    match action {
        MetaAction::SetMeta {
            dashboard_ref,
            title,
            persisted,
        } => {
            state.dashboard_ref = dashboard_ref;
            state.title = title;
            state.persisted = persisted;
        }
        MetaAction::SetTitle(title) => state.title = title,
        MetaAction::SetPersisted(definition) => {
            if definition.dashboard_ref.is_some() {
                state.dashboard_ref = definition.dashboard_ref.clone();
            }
            state.persisted = Some(definition);
        }
    }
}
