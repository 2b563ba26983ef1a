#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{catalog_backend, sales_dashboard, start, start_initialized, SALES_DASHBOARD, WORKSPACE};
use dashkit_model::commands::{self, CommandPayload, DashboardCommand, InitializePayload};
use dashkit_model::errors::DashboardError;
use dashkit_model::events::{event_types, EventPayload};
use dashkit_model::model::{DashboardDefinition, ObjRef};
use dashkit_model::selectors::{
    select_dashboard_ref, select_is_dirty, select_undoable_layout_changes,
};
use dashkit_runtime::{
    BackendError, BackendOp, CommandError, Dashboard, DashboardContext, InMemoryBackend,
    LoopPhase, PreloadOutcome,
};

#[tokio::test]
async fn test_initialize_loads_from_backend() {
    let (dashboard, log) = start(catalog_backend());

    let event = dashboard
        .dispatch_and_wait(commands::initialize(ObjRef::id(SALES_DASHBOARD)))
        .await
        .expect("Should initialize");

    let EventPayload::DashboardInitialized { dashboard: loaded } = event.payload else {
        panic!("Expected DashboardInitialized");
    };
    assert_eq!(loaded.title, "Sales");
    let state = dashboard.state();
    assert_eq!(select_dashboard_ref(&state), Some(&ObjRef::id(SALES_DASHBOARD)));
    assert!(!select_is_dirty(&state));
    assert_eq!(
        log.types(),
        vec![event_types::COMMAND_STARTED, event_types::DASHBOARD_INITIALIZED]
    );
}

#[tokio::test]
async fn test_initialize_falls_back_to_context_dashboard() {
    let ctx = DashboardContext::new(Arc::new(catalog_backend()), WORKSPACE)
        .with_dashboard_ref(ObjRef::id(SALES_DASHBOARD));
    let dashboard = Dashboard::start(ctx);

    dashboard
        .dispatch_and_wait(commands::initialize_with_definition(DashboardDefinition::default()))
        .await
        .expect("Should initialize from the inline definition");
    assert_eq!(dashboard.state().meta.title, "");

    let from_context = DashboardCommand::new(CommandPayload::Initialize(InitializePayload::default()));
    dashboard
        .dispatch_and_wait(from_context)
        .await
        .expect("Should initialize from the context dashboard");
    assert_eq!(dashboard.state().meta.title, "Sales");
}

#[tokio::test]
async fn test_initialize_missing_dashboard_is_user_error() {
    let (dashboard, _log) = start(InMemoryBackend::new());

    let err = dashboard
        .dispatch_and_wait(commands::initialize(ObjRef::id("dashboard.gone")))
        .await
        .unwrap_err();

    assert!(err.is_user_error());
}

#[tokio::test]
async fn test_inline_definition_with_ref_is_persisted() {
    let (dashboard, _log) = start(InMemoryBackend::new());

    dashboard
        .dispatch_and_wait(commands::initialize_with_definition(sales_dashboard()))
        .await
        .unwrap();

    assert!(dashboard.state().meta.is_persisted());
    dashboard
        .dispatch_and_wait(commands::reset_dashboard())
        .await
        .expect("Persisted dashboards can be reset");
}

#[tokio::test]
async fn test_rename_then_reset_restores_persisted_title() {
    // GIVEN a renamed dashboard with a layout change
    let (dashboard, log) = start_initialized().await;
    dashboard
        .dispatch_and_wait(commands::rename_dashboard("  Draft  "))
        .await
        .unwrap();
    dashboard
        .dispatch_and_wait(commands::move_layout_section(0, 1))
        .await
        .unwrap();
    assert_eq!(dashboard.state().meta.title, "Draft");
    assert!(select_is_dirty(&dashboard.state()));

    // WHEN it is reset
    let event = dashboard
        .dispatch_and_wait(commands::reset_dashboard())
        .await
        .expect("Should reset");

    // THEN title and layout come back and undo history is gone
    assert_eq!(event.event_type(), event_types::DASHBOARD_WAS_RESET);
    let state = dashboard.state();
    assert_eq!(state.meta.title, "Sales");
    assert!(!select_is_dirty(&state));
    assert_eq!(select_undoable_layout_changes(&state), 0);
    assert_eq!(log.terminal_events().len(), 3);
}

#[tokio::test]
async fn test_reset_of_unsaved_dashboard_fails() {
    let (dashboard, _log) = start(InMemoryBackend::new());

    let err = dashboard
        .dispatch_and_wait(commands::reset_dashboard())
        .await
        .unwrap_err();

    let CommandError::Failed(failure) = err else {
        panic!("Expected a failure");
    };
    assert!(failure.is_user_error());
    assert_eq!(
        failure.message,
        DashboardError::DashboardNotPersisted.to_string()
    );
}

#[tokio::test]
async fn test_save_new_dashboard_assigns_ref() {
    // GIVEN a dashboard that was never saved
    let backend = Arc::new(InMemoryBackend::new());
    let ctx = DashboardContext::new(backend.clone(), WORKSPACE);
    let dashboard = Dashboard::start(ctx);
    dashboard
        .dispatch_and_wait(commands::rename_dashboard("Pipeline"))
        .await
        .unwrap();

    // WHEN it is saved
    let event = dashboard
        .dispatch_and_wait(commands::save_dashboard())
        .await
        .expect("Should save");

    // THEN the backend assigns a ref the state adopts
    let EventPayload::DashboardSaved {
        dashboard: saved,
        new_dashboard,
    } = event.payload
    else {
        panic!("Expected DashboardSaved");
    };
    assert!(new_dashboard);
    assert!(saved.dashboard_ref.is_some());
    assert!(saved.updated_at.is_some());
    assert_eq!(dashboard.state().meta.dashboard_ref, saved.dashboard_ref);
    assert_eq!(backend.dashboard_count(), 1);

    // AND saving again updates the same dashboard
    let event = dashboard.dispatch_and_wait(commands::save_dashboard()).await.unwrap();
    assert!(matches!(
        event.payload,
        EventPayload::DashboardSaved {
            new_dashboard: false,
            ..
        }
    ));
    assert_eq!(backend.dashboard_count(), 1);
}

#[tokio::test]
async fn test_save_failure_is_internal_error_and_state_unchanged() {
    let backend = Arc::new(catalog_backend());
    let dashboard = Dashboard::start(DashboardContext::new(backend.clone(), WORKSPACE));
    dashboard
        .dispatch_and_wait(commands::initialize(ObjRef::id(SALES_DASHBOARD)))
        .await
        .unwrap();
    dashboard
        .dispatch_and_wait(commands::rename_dashboard("Unsaved"))
        .await
        .unwrap();
    backend.fail_next(BackendOp::SaveDashboard, BackendError::Unauthorised);

    let err = dashboard
        .dispatch_and_wait(commands::save_dashboard())
        .await
        .unwrap_err();

    assert!(matches!(err, CommandError::Internal { .. }));
    assert!(select_is_dirty(&dashboard.state()));
    assert_eq!(dashboard.phase(), LoopPhase::Idle);
}

#[tokio::test]
async fn test_preload_initializes_dashboard() {
    let (dashboard, _log) = start(catalog_backend());
    let mut changes = dashboard.state_changes();

    let outcome = dashboard
        .preload(ObjRef::id(SALES_DASHBOARD))
        .await
        .expect("Preload task should not panic");

    assert!(matches!(outcome, PreloadOutcome::Dispatched(_)));
    changes.changed().await.expect("Should publish state");
    assert_eq!(changes.borrow().meta.title, "Sales");
}

#[tokio::test]
async fn test_newer_preload_supersedes_older_one() {
    // GIVEN a slow backend with two dashboards
    let mut other = sales_dashboard();
    other.dashboard_ref = Some(ObjRef::id("dashboard.ops"));
    other.title = "Ops".to_string();
    let backend = catalog_backend()
        .with_dashboard(other)
        .with_latency(Duration::from_millis(20));
    let (dashboard, _log) = start(backend);

    // WHEN a second preload starts before the first finishes
    let first = dashboard.preload(ObjRef::id(SALES_DASHBOARD));
    let second = dashboard.preload(ObjRef::id("dashboard.ops"));

    // THEN only the second result is used
    assert_eq!(first.await.unwrap(), PreloadOutcome::Abandoned);
    assert!(matches!(second.await.unwrap(), PreloadOutcome::Dispatched(_)));
    dashboard
        .dispatch_and_wait(commands::rename_dashboard("Ops 2"))
        .await
        .unwrap();
    assert_eq!(
        dashboard.state().meta.dashboard_ref,
        Some(ObjRef::id("dashboard.ops"))
    );
}

#[tokio::test]
async fn test_abandoned_preload_never_initializes() {
    let backend = catalog_backend().with_latency(Duration::from_millis(20));
    let (dashboard, log) = start(backend);

    let handle = dashboard.preload(ObjRef::id(SALES_DASHBOARD));
    assert!(dashboard.abandon_preload());

    assert_eq!(handle.await.unwrap(), PreloadOutcome::Abandoned);
    assert!(log.events().is_empty());
    assert!(!dashboard.abandon_preload());
}

#[tokio::test]
async fn test_preload_failure_is_reported() {
    let (dashboard, log) = start(InMemoryBackend::new());

    let outcome = dashboard
        .preload(ObjRef::id("dashboard.gone"))
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        PreloadOutcome::Failed(BackendError::NotFound { .. })
    ));
    assert!(log.events().is_empty());
}

#[tokio::test]
async fn test_event_stream_receives_events() {
    let (dashboard, _log) = start_initialized().await;
    let mut stream = dashboard.event_stream();

    dashboard
        .dispatch_and_wait(commands::rename_dashboard("Streamed"))
        .await
        .unwrap();

    let started = stream.recv().await.expect("Should receive CommandStarted");
    let renamed = stream.recv().await.expect("Should receive DashboardRenamed");
    assert_eq!(started.event_type(), event_types::COMMAND_STARTED);
    assert_eq!(renamed.event_type(), event_types::DASHBOARD_RENAMED);
}

#[tokio::test]
async fn test_unsubscribed_handler_stops_receiving() {
    let (dashboard, log) = start_initialized().await;
    let id = dashboard.subscribe(|_| {});
    assert!(dashboard.unsubscribe(id));
    assert!(!dashboard.unsubscribe(id));

    dashboard
        .dispatch_and_wait(commands::rename_dashboard("Still logged"))
        .await
        .unwrap();
    assert_eq!(log.events().len(), 2);
}

#[tokio::test]
async fn test_shutdown_settles_queued_commands() {
    let (dashboard, log) = start_initialized().await;

    dashboard.dispatch(commands::rename_dashboard("One")).unwrap();
    dashboard.dispatch(commands::rename_dashboard("Two")).unwrap();
    dashboard.shutdown().await;

    assert_eq!(log.terminal_events().len(), 2);
}

async fn start_sales_on(backend: Arc<InMemoryBackend>) -> Dashboard {
    let dashboard = Dashboard::start(DashboardContext::new(backend, WORKSPACE));
    dashboard
        .dispatch_and_wait(commands::initialize(ObjRef::id(SALES_DASHBOARD)))
        .await
        .expect("Should initialize the sales dashboard");
    dashboard
}

#[tokio::test]
async fn test_save_as_keeps_working_on_original() {
    // GIVEN the sales dashboard with an unsaved rename
    let backend = Arc::new(catalog_backend());
    let dashboard = start_sales_on(backend.clone()).await;
    dashboard
        .dispatch_and_wait(commands::rename_dashboard("Draft"))
        .await
        .unwrap();

    // WHEN a copy is saved without switching to it
    let event = dashboard
        .dispatch_and_wait(commands::save_dashboard_as(Some("Sales copy".to_string()), false))
        .await
        .expect("Should save a copy");

    // THEN the backend holds a new dashboard and the state still points at the original
    let EventPayload::DashboardCopySaved {
        dashboard: copy,
        switched_to_copy,
    } = event.payload
    else {
        panic!("Expected DashboardCopySaved");
    };
    assert!(!switched_to_copy);
    assert_eq!(copy.title, "Sales copy");
    assert_ne!(copy.dashboard_ref, Some(ObjRef::id(SALES_DASHBOARD)));
    assert_eq!(backend.dashboard_count(), 2);
    let state = dashboard.state();
    assert_eq!(select_dashboard_ref(&state), Some(&ObjRef::id(SALES_DASHBOARD)));
    assert_eq!(state.meta.title, "Draft");
    assert!(select_is_dirty(&state));
}

#[tokio::test]
async fn test_save_as_switches_to_copy() {
    let backend = Arc::new(catalog_backend());
    let dashboard = start_sales_on(backend.clone()).await;
    dashboard
        .dispatch_and_wait(commands::move_layout_section(0, 1))
        .await
        .unwrap();

    let event = dashboard
        .dispatch_and_wait(commands::save_dashboard_as(None, true))
        .await
        .expect("Should save a copy");

    let EventPayload::DashboardCopySaved { dashboard: copy, .. } = event.payload else {
        panic!("Expected DashboardCopySaved");
    };
    assert_eq!(copy.title, "Sales");
    let state = dashboard.state();
    assert_eq!(state.meta.dashboard_ref, copy.dashboard_ref);
    assert!(!select_is_dirty(&state));
    assert_eq!(select_undoable_layout_changes(&state), 0);
}

#[tokio::test]
async fn test_save_as_with_blank_title_fails() {
    let (dashboard, _log) = start_initialized().await;

    let err = dashboard
        .dispatch_and_wait(commands::save_dashboard_as(Some("   ".to_string()), false))
        .await
        .unwrap_err();

    let CommandError::Failed(failure) = err else {
        panic!("Expected a failure");
    };
    assert_eq!(failure.error_code.as_deref(), Some("ERR_INVALID_TITLE"));
}

#[tokio::test]
async fn test_delete_removes_dashboard_and_clears_state() {
    // GIVEN the persisted sales dashboard
    let backend = Arc::new(catalog_backend());
    let dashboard = start_sales_on(backend.clone()).await;

    // WHEN it is deleted
    let event = dashboard
        .dispatch_and_wait(commands::delete_dashboard())
        .await
        .expect("Should delete");

    // THEN the backend forgets it and the state is empty
    let EventPayload::DashboardDeleted { dashboard: deleted } = event.payload else {
        panic!("Expected DashboardDeleted");
    };
    assert_eq!(deleted.dashboard_ref, Some(ObjRef::id(SALES_DASHBOARD)));
    assert_eq!(backend.dashboard_count(), 0);
    let state = dashboard.state();
    assert_eq!(select_dashboard_ref(&state), None);
    assert!(!state.meta.is_persisted());
    assert!(state.layout.layout.sections.is_empty());
}

#[tokio::test]
async fn test_delete_of_unsaved_dashboard_fails() {
    let (dashboard, _log) = start(InMemoryBackend::new());

    let err = dashboard
        .dispatch_and_wait(commands::delete_dashboard())
        .await
        .unwrap_err();

    assert!(err.is_user_error());
}

#[tokio::test]
async fn test_delete_of_dashboard_gone_from_backend_is_user_error() {
    // GIVEN a dashboard someone else already removed
    let backend = Arc::new(catalog_backend());
    let dashboard = start_sales_on(backend.clone()).await;
    backend.fail_next(
        BackendOp::DeleteDashboard,
        BackendError::NotFound {
            object: SALES_DASHBOARD.to_string(),
        },
    );

    // WHEN it is deleted
    let err = dashboard
        .dispatch_and_wait(commands::delete_dashboard())
        .await
        .unwrap_err();

    // THEN the failure is the user's and the state is kept
    let CommandError::Failed(failure) = err else {
        panic!("Expected a failure");
    };
    assert_eq!(failure.error_code.as_deref(), Some("ERR_NOT_FOUND"));
    assert_eq!(
        select_dashboard_ref(&dashboard.state()),
        Some(&ObjRef::id(SALES_DASHBOARD))
    );
}
