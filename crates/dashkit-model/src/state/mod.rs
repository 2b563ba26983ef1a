//! Dashboard state store
//!
//! The state is a tree of slices, each owned by its reducer. Handlers never
//! touch slices directly; they dispatch [`DashboardAction`]s to the
//! [`StateStore`].
//!
//! ## Atomicity Contract
//!
//! `dispatch` and `dispatch_batch` are all-or-nothing: the actions are
//! applied to a working copy which replaces the current state only when
//! every reducer succeeded. A batch therefore never leaves slices changed
//! relative to each other in an inconsistent way.

pub mod filter_context;
pub mod layout;
pub mod meta;

use std::sync::Arc;

use crate::errors::Result;

pub use filter_context::{FilterContextAction, FilterContextState};
pub use layout::{LayoutAction, LayoutState, UndoEntry};
pub use meta::{MetaAction, MetaState};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardState {
    pub meta: MetaState,
    pub filter_context: FilterContextState,
    pub layout: LayoutState,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DashboardAction {
    Meta(MetaAction),
    FilterContext(FilterContextAction),
    Layout(LayoutAction),
}

impl From<MetaAction> for DashboardAction {
    fn from(action: MetaAction) -> Self {
        DashboardAction::Meta(action)
    }
}

impl From<FilterContextAction> for DashboardAction {
    fn from(action: FilterContextAction) -> Self {
        DashboardAction::FilterContext(action)
    }
}

impl From<LayoutAction> for DashboardAction {
    fn from(action: LayoutAction) -> Self {
        DashboardAction::Layout(action)
    }
}

/// Route an action to the reducer of its slice
pub fn reduce(state: &mut DashboardState, action: DashboardAction) -> Result<()> {
    match action {
        DashboardAction::Meta(a) => {
            meta::reduce(&mut state.meta, a);
            Ok(())
        }
        DashboardAction::FilterContext(a) => filter_context::reduce(&mut state.filter_context, a),
        DashboardAction::Layout(a) => layout::reduce(&mut state.layout, a),
    }
}

/// Exclusively owned dashboard state
#[derive(Debug, Default)]
pub struct StateStore {
    state: DashboardState,
    version: u64,
}

impl StateStore {
    pub fn new(state: DashboardState) -> Self {
        Self { state, version: 0 }
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    /// Number of committed dispatches so far
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Apply one action atomically
    ///
    /// # Errors
    ///
    /// Returns the reducer's error; the state is left unchanged.
    pub fn dispatch(&mut self, action: impl Into<DashboardAction>) -> Result<()> {
        self.dispatch_batch(vec![action.into()])
    }

    /// Apply several actions as one atomic change
    ///
    /// # Errors
    ///
    /// Returns the first reducer error; none of the actions take effect.
    pub fn dispatch_batch(&mut self, actions: Vec<DashboardAction>) -> Result<()> {
        let mut working = self.state.clone();
        for action in actions {
            reduce(&mut working, action)?;
        }
        self.state = working;
        self.version += 1;
        Ok(())
    }

    /// Immutable copy of the current state for readers outside the loop
    pub fn snapshot(&self) -> Arc<DashboardState> {
        Arc::new(self.state.clone())
    }
}
