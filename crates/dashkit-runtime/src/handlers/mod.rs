//! Command handlers
//!
//! Each handler validates its command against the current state, mutates
//! the state only through the scope, may emit intermediate events and
//! returns the terminal event. Handlers never call each other.

mod dashboard;
mod filter_context;
mod layout;

use dashkit_core_types::CorrelationId;
use dashkit_model::commands::{command_types, CommandPayload, DashboardCommand};
use dashkit_model::errors::DashboardError;
use dashkit_model::events::{CommandFailure, DashboardEvent, EventPayload};
use dashkit_model::state::{DashboardAction, DashboardState, StateStore};

use crate::context::DashboardContext;
use crate::dispatcher::EventDispatcher;
use crate::errors::HandlerError;

/// What a handler may touch while processing one command
pub struct HandlerScope<'a> {
    ctx: &'a DashboardContext,
    store: &'a mut StateStore,
    dispatcher: &'a EventDispatcher,
    correlation_id: Option<CorrelationId>,
    command_type: String,
}

impl<'a> HandlerScope<'a> {
    pub(crate) fn new(
        ctx: &'a DashboardContext,
        store: &'a mut StateStore,
        dispatcher: &'a EventDispatcher,
        command: &DashboardCommand,
    ) -> Self {
        Self {
            ctx,
            store,
            dispatcher,
            correlation_id: command.correlation_id.clone(),
            command_type: command.command_type().to_string(),
        }
    }

    /// Environment of the dashboard; outlives the scope's borrows
    pub fn ctx(&self) -> &'a DashboardContext {
        self.ctx
    }

    pub fn state(&self) -> &DashboardState {
        self.store.state()
    }

    pub fn command_type(&self) -> &str {
        &self.command_type
    }

    /// # Errors
    ///
    /// Returns [`HandlerError::State`] when the reducer refuses the action.
    pub fn dispatch(&mut self, action: impl Into<DashboardAction>) -> Result<(), HandlerError> {
        self.store.dispatch(action)?;
        Ok(())
    }

    /// Apply all actions or none
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::State`] when any reducer refuses its action.
    pub fn dispatch_batch(&mut self, actions: Vec<DashboardAction>) -> Result<(), HandlerError> {
        self.store.dispatch_batch(actions)?;
        Ok(())
    }

    /// Publish an intermediate event right away
    pub fn emit(&self, payload: EventPayload) {
        self.dispatcher.dispatch(&self.event(payload));
    }

    /// Build an event for this command; handlers return the terminal one
    pub fn event(&self, payload: EventPayload) -> DashboardEvent {
        DashboardEvent::new(
            self.ctx
                .event_context(self.store.state().meta.dashboard_ref.as_ref()),
            self.correlation_id.clone(),
            payload,
        )
    }

    /// Recognized failure of this command
    pub fn fail(&self, err: DashboardError) -> HandlerError {
        HandlerError::Failed(CommandFailure::from_error(&self.command_type, &err))
    }
}

/// Whether this build processes the command type, or rejects it
pub fn is_handled(command_type: &str) -> bool {
    !matches!(
        command_type,
        command_types::REFRESH_KPI_WIDGET
            | command_types::REFRESH_INSIGHT_WIDGET
            | command_types::CHANGE_INSIGHT_WIDGET_INSIGHT
    ) && command_types::ALL.contains(&command_type)
}

/// Route a command to its handler
///
/// # Errors
///
/// Returns the handler's [`HandlerError`]; commands without a handler
/// yield [`HandlerError::Rejected`].
pub async fn handle_command(
    scope: &mut HandlerScope<'_>,
    command: &DashboardCommand,
) -> Result<DashboardEvent, HandlerError> {
    match &command.payload {
        CommandPayload::Initialize(p) => dashboard::initialize(scope, p).await,
        CommandPayload::Save(_) => dashboard::save(scope).await,
        CommandPayload::SaveAs(p) => dashboard::save_as(scope, p).await,
        CommandPayload::Delete(_) => dashboard::delete(scope).await,
        CommandPayload::Rename(p) => dashboard::rename(scope, p),
        CommandPayload::Reset(_) => dashboard::reset(scope),

        CommandPayload::ChangeDateFilterSelection(p) => {
            filter_context::change_date_filter_selection(scope, p)
        }
        CommandPayload::AddAttributeFilter(p) => {
            filter_context::add_attribute_filter(scope, p).await
        }
        CommandPayload::RemoveAttributeFilters(p) => {
            filter_context::remove_attribute_filters(scope, p)
        }
        CommandPayload::MoveAttributeFilter(p) => filter_context::move_attribute_filter(scope, p),
        CommandPayload::ChangeAttributeFilterSelection(p) => {
            filter_context::change_attribute_filter_selection(scope, p)
        }
        CommandPayload::SetAttributeFilterParents(p) => {
            filter_context::set_attribute_filter_parents(scope, p)
        }
        CommandPayload::ChangeFilterContextSelection(p) => {
            filter_context::change_filter_context_selection(scope, p)
        }

        CommandPayload::AddLayoutSection(p) => layout::add_layout_section(scope, p),
        CommandPayload::MoveLayoutSection(p) => layout::move_layout_section(scope, p),
        CommandPayload::RemoveLayoutSection(p) => layout::remove_layout_section(scope, p),
        CommandPayload::ChangeLayoutSectionHeader(p) => {
            layout::change_layout_section_header(scope, p)
        }
        CommandPayload::AddSectionItems(p) => layout::add_section_items(scope, p),
        CommandPayload::MoveSectionItem(p) => layout::move_section_item(scope, p),
        CommandPayload::RemoveSectionItem(p) => layout::remove_section_item(scope, p),
        CommandPayload::ReplaceSectionItem(p) => layout::replace_section_item(scope, p),
        CommandPayload::UndoLayoutChanges(p) => layout::undo_layout_changes(scope, p),

        CommandPayload::ChangeKpiWidgetHeader(p) => {
            layout::change_widget_header(scope, p, layout::WidgetTarget::Kpi)
        }
        CommandPayload::ChangeInsightWidgetHeader(p) => {
            layout::change_widget_header(scope, p, layout::WidgetTarget::Insight)
        }

        CommandPayload::RefreshKpiWidget(_)
        | CommandPayload::RefreshInsightWidget(_)
        | CommandPayload::ChangeInsightWidgetInsight(_)
        | CommandPayload::Unrecognized { .. } => unhandled_command(command),
    }
}

fn unhandled_command(command: &DashboardCommand) -> Result<DashboardEvent, HandlerError> {
    tracing::debug!(
        command_type = command.command_type(),
        "No handler registered for command"
    );
    Err(HandlerError::Rejected)
}
