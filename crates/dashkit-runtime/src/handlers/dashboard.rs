use dashkit_model::commands::{InitializePayload, RenamePayload, SaveAsPayload};
use dashkit_model::errors::DashboardError;
use dashkit_model::events::{DashboardEvent, EventPayload};
use dashkit_model::selectors::{select_dashboard_definition, select_persisted_dashboard};
use dashkit_model::state::{FilterContextAction, LayoutAction, MetaAction};

use super::HandlerScope;
use crate::backend::BackendError;
use crate::errors::HandlerError;

pub(super) async fn initialize(
    scope: &mut HandlerScope<'_>,
    payload: &InitializePayload,
) -> Result<DashboardEvent, HandlerError> {
    let ctx = scope.ctx();
    let (definition, persisted) = match (&payload.definition, &payload.dashboard) {
        (Some(definition), _) => {
            // An inline definition carrying a ref mirrors a stored dashboard
            let persisted = definition
                .dashboard_ref
                .as_ref()
                .map(|_| definition.clone());
            (definition.clone(), persisted)
        }
        (None, requested) => {
            let Some(dashboard_ref) = requested.clone().or_else(|| ctx.dashboard_ref.clone())
            else {
                return Err(scope.fail(DashboardError::MissingDashboardSource));
            };
            let loaded = match ctx.backend.load_dashboard(&dashboard_ref).await {
                Ok(loaded) => loaded,
                Err(BackendError::NotFound { .. }) => {
                    return Err(scope.fail(DashboardError::DashboardNotFound {
                        dashboard: dashboard_ref.to_string(),
                    }))
                }
                Err(e) => return Err(e.into()),
            };
            let mut definition = loaded;
            if definition.dashboard_ref.is_none() {
                definition.dashboard_ref = Some(dashboard_ref);
            }
            (definition.clone(), Some(definition))
        }
    };

    scope.dispatch_batch(vec![
        MetaAction::SetMeta {
            dashboard_ref: definition.dashboard_ref.clone(),
            title: definition.title.clone(),
            persisted,
        }
        .into(),
        FilterContextAction::SetFilterContext(definition.filter_context.clone()).into(),
        LayoutAction::SetLayout(definition.layout.clone()).into(),
        LayoutAction::ClearUndo.into(),
    ])?;

    tracing::debug!(
        title = definition.title.as_str(),
        filters = definition.filter_context.filters.len(),
        sections = definition.layout.sections.len(),
        "Dashboard initialized"
    );

    Ok(scope.event(EventPayload::DashboardInitialized {
        dashboard: select_dashboard_definition(scope.state()),
    }))
}

pub(super) async fn save(scope: &mut HandlerScope<'_>) -> Result<DashboardEvent, HandlerError> {
    let ctx = scope.ctx();
    let definition = select_dashboard_definition(scope.state());
    let new_dashboard = definition.dashboard_ref.is_none();

    let saved = ctx.backend.save_dashboard(&definition).await?;
    scope.dispatch(MetaAction::SetPersisted(saved.clone()))?;

    Ok(scope.event(EventPayload::DashboardSaved {
        dashboard: saved,
        new_dashboard,
    }))
}

/// Store the current state as a new dashboard
///
/// The working state keeps pointing at the original unless the payload asks
/// to switch to the copy.
pub(super) async fn save_as(
    scope: &mut HandlerScope<'_>,
    payload: &SaveAsPayload,
) -> Result<DashboardEvent, HandlerError> {
    let ctx = scope.ctx();
    let mut definition = select_dashboard_definition(scope.state());
    if let Some(title) = &payload.title {
        let title = title.trim();
        if title.is_empty() {
            return Err(scope.fail(DashboardError::InvalidTitle {
                reason: "title must not be empty".to_string(),
            }));
        }
        definition.title = title.to_string();
    }
    if payload.use_original_filter_context {
        if let Some(persisted) = select_persisted_dashboard(scope.state()) {
            definition.filter_context = persisted.filter_context.clone();
        }
    }
    definition.dashboard_ref = None;
    definition.updated_at = None;

    let saved = ctx.backend.save_dashboard(&definition).await?;
    if payload.switch_to_copy {
        scope.dispatch_batch(vec![
            MetaAction::SetMeta {
                dashboard_ref: saved.dashboard_ref.clone(),
                title: saved.title.clone(),
                persisted: Some(saved.clone()),
            }
            .into(),
            FilterContextAction::SetFilterContext(saved.filter_context.clone()).into(),
            LayoutAction::ClearUndo.into(),
        ])?;
    }

    Ok(scope.event(EventPayload::DashboardCopySaved {
        dashboard: saved,
        switched_to_copy: payload.switch_to_copy,
    }))
}

/// Remove the persisted dashboard and leave an empty one behind
pub(super) async fn delete(scope: &mut HandlerScope<'_>) -> Result<DashboardEvent, HandlerError> {
    let ctx = scope.ctx();
    let Some(persisted) = select_persisted_dashboard(scope.state()).cloned() else {
        return Err(scope.fail(DashboardError::DashboardNotPersisted));
    };
    let Some(dashboard_ref) = persisted.dashboard_ref.clone() else {
        return Err(scope.fail(DashboardError::DashboardNotPersisted));
    };

    match ctx.backend.delete_dashboard(&dashboard_ref).await {
        Ok(()) => {}
        Err(BackendError::NotFound { .. }) => {
            return Err(scope.fail(DashboardError::DashboardNotFound {
                dashboard: dashboard_ref.to_string(),
            }))
        }
        Err(e) => return Err(e.into()),
    }

    scope.dispatch_batch(vec![
        MetaAction::SetMeta {
            dashboard_ref: None,
            title: String::new(),
            persisted: None,
        }
        .into(),
        FilterContextAction::SetFilterContext(Default::default()).into(),
        LayoutAction::SetLayout(Default::default()).into(),
        LayoutAction::ClearUndo.into(),
    ])?;

    Ok(scope.event(EventPayload::DashboardDeleted {
        dashboard: persisted,
    }))
}

pub(super) fn rename(
    scope: &mut HandlerScope<'_>,
    payload: &RenamePayload,
) -> Result<DashboardEvent, HandlerError> {
    let title = payload.new_title.trim();
    if title.is_empty() {
        return Err(scope.fail(DashboardError::InvalidTitle {
            reason: "title must not be empty".to_string(),
        }));
    }

    scope.dispatch(MetaAction::SetTitle(title.to_string()))?;
    Ok(scope.event(EventPayload::DashboardRenamed {
        new_title: title.to_string(),
    }))
}

pub(super) fn reset(scope: &mut HandlerScope<'_>) -> Result<DashboardEvent, HandlerError> {
    let Some(persisted) = select_persisted_dashboard(scope.state()).cloned() else {
        return Err(scope.fail(DashboardError::DashboardNotPersisted));
    };

    scope.dispatch_batch(vec![
        MetaAction::SetTitle(persisted.title.clone()).into(),
        FilterContextAction::SetFilterContext(persisted.filter_context.clone()).into(),
        LayoutAction::SetLayout(persisted.layout.clone()).into(),
        LayoutAction::ClearUndo.into(),
    ])?;

    Ok(scope.event(EventPayload::DashboardWasReset {
        dashboard: persisted,
    }))
}
