//! Fluid layout slice with stash and undo history
//!
//! Items removed with a stash identifier are kept aside so that later
//! commands can place them again. Undo entries capture the layout and the
//! stash as they were before a layout-changing command.

use std::collections::BTreeMap;

use crate::errors::{DashboardError, Result};
use crate::model::{DashboardLayout, LayoutItem, LayoutSection, SectionHeader};

#[derive(Debug, Clone, PartialEq)]
pub struct UndoEntry {
    pub command_type: String,
    pub layout: DashboardLayout,
    pub stash: BTreeMap<String, Vec<LayoutItem>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutState {
    pub layout: DashboardLayout,
    pub stash: BTreeMap<String, Vec<LayoutItem>>,
    pub undo: Vec<UndoEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayoutAction {
    SetLayout(DashboardLayout),
    ClearUndo,
    /// Snapshot the current layout before a change made by `command_type`
    RecordUndo {
        command_type: String,
    },
    /// Restore the layout as it was `steps` recorded changes ago
    Undo {
        steps: usize,
    },
    AddSection {
        section: LayoutSection,
        index: usize,
        used_stashes: Vec<String>,
    },
    RemoveSection {
        index: usize,
        stash_identifier: Option<String>,
    },
    MoveSection {
        from: usize,
        to: usize,
    },
    ChangeSectionHeader {
        index: usize,
        header: SectionHeader,
    },
    AddSectionItems {
        section_index: usize,
        item_index: usize,
        items: Vec<LayoutItem>,
        used_stashes: Vec<String>,
    },
    /// `to_item_index` addresses the target section after the item was taken out
    MoveSectionItem {
        section_index: usize,
        item_index: usize,
        to_section_index: usize,
        to_item_index: usize,
    },
    RemoveSectionItem {
        section_index: usize,
        item_index: usize,
        stash_identifier: Option<String>,
    },
    /// Swap one item for `items`; the replaced item goes to the stash when named
    ReplaceSectionItem {
        section_index: usize,
        item_index: usize,
        items: Vec<LayoutItem>,
        stash_identifier: Option<String>,
        used_stashes: Vec<String>,
    },
    ChangeWidgetTitle {
        section_index: usize,
        item_index: usize,
        title: String,
    },
}

fn violation(message: String) -> DashboardError {
    DashboardError::InvariantViolation { message }
}

fn section_mut(layout: &mut DashboardLayout, index: usize) -> Result<&mut LayoutSection> {
    let len = layout.sections.len();
    layout
        .sections
        .get_mut(index)
        .ok_or_else(|| violation(format!("section {} out of {}", index, len)))
}

fn take_stashes(stash: &mut BTreeMap<String, Vec<LayoutItem>>, used: &[String]) -> Result<()> {
    for id in used {
        if stash.remove(id).is_none() {
            return Err(violation(format!("stash {} does not exist", id)));
        }
    }
    Ok(())
}

pub fn reduce(state: &mut LayoutState, action: LayoutAction) -> Result<()> {
    match action {
        LayoutAction::SetLayout(layout) => {
            state.layout = layout;
            state.stash.clear();
        }

        LayoutAction::ClearUndo => state.undo.clear(),

        LayoutAction::RecordUndo { command_type } => state.undo.push(UndoEntry {
            command_type,
            layout: state.layout.clone(),
            stash: state.stash.clone(),
        }),

        LayoutAction::Undo { steps } => {
            if steps == 0 || steps > state.undo.len() {
                return Err(violation(format!(
                    "cannot undo {} steps with {} recorded",
                    steps,
                    state.undo.len()
                )));
            }
            let keep = state.undo.len() - steps;
            let mut undone = state.undo.split_off(keep);
            // The oldest undone entry holds the layout before all undone changes
            let restored = undone.swap_remove(0);
            state.layout = restored.layout;
            state.stash = restored.stash;
        }

        LayoutAction::AddSection {
            section,
            index,
            used_stashes,
        } => {
            if index > state.layout.sections.len() {
                return Err(violation(format!("section index {} out of range", index)));
            }
            take_stashes(&mut state.stash, &used_stashes)?;
            state.layout.sections.insert(index, section);
        }

        LayoutAction::RemoveSection {
            index,
            stash_identifier,
        } => {
            if index >= state.layout.sections.len() {
                return Err(violation(format!("section index {} out of range", index)));
            }
            let removed = state.layout.sections.remove(index);
            if let Some(id) = stash_identifier {
                state.stash.insert(id, removed.items);
            }
        }

        LayoutAction::MoveSection { from, to } => {
            let len = state.layout.sections.len();
            if from >= len || to >= len {
                return Err(violation(format!(
                    "cannot move section {} to {} (sections: {})",
                    from, to, len
                )));
            }
            let section = state.layout.sections.remove(from);
            state.layout.sections.insert(to, section);
        }

        LayoutAction::ChangeSectionHeader { index, header } => {
            section_mut(&mut state.layout, index)?.header = Some(header);
        }

        LayoutAction::AddSectionItems {
            section_index,
            item_index,
            items,
            used_stashes,
        } => {
            take_stashes(&mut state.stash, &used_stashes)?;
            let section = section_mut(&mut state.layout, section_index)?;
            if item_index > section.items.len() {
                return Err(violation(format!("item index {} out of range", item_index)));
            }
            section.items.splice(item_index..item_index, items);
        }

        LayoutAction::MoveSectionItem {
            section_index,
            item_index,
            to_section_index,
            to_item_index,
        } => {
            let source = section_mut(&mut state.layout, section_index)?;
            if item_index >= source.items.len() {
                return Err(violation(format!("item index {} out of range", item_index)));
            }
            let item = source.items.remove(item_index);
            let target = section_mut(&mut state.layout, to_section_index)?;
            if to_item_index > target.items.len() {
                return Err(violation(format!(
                    "target item index {} out of range",
                    to_item_index
                )));
            }
            target.items.insert(to_item_index, item);
        }

        LayoutAction::RemoveSectionItem {
            section_index,
            item_index,
            stash_identifier,
        } => {
            let section = section_mut(&mut state.layout, section_index)?;
            if item_index >= section.items.len() {
                return Err(violation(format!("item index {} out of range", item_index)));
            }
            let removed = section.items.remove(item_index);
            if let Some(id) = stash_identifier {
                state.stash.insert(id, vec![removed]);
            }
        }

        LayoutAction::ReplaceSectionItem {
            section_index,
            item_index,
            items,
            stash_identifier,
            used_stashes,
        } => {
            let section = section_mut(&mut state.layout, section_index)?;
            if item_index >= section.items.len() {
                return Err(violation(format!("item index {} out of range", item_index)));
            }
            take_stashes(&mut state.stash, &used_stashes)?;
            let section = section_mut(&mut state.layout, section_index)?;
            let removed: Vec<LayoutItem> =
                section.items.splice(item_index..=item_index, items).collect();
            if let Some(id) = stash_identifier {
                state.stash.insert(id, removed);
            }
        }

        LayoutAction::ChangeWidgetTitle {
            section_index,
            item_index,
            title,
        } => {
            let section = section_mut(&mut state.layout, section_index)?;
            let item = section
                .items
                .get_mut(item_index)
                .ok_or_else(|| violation(format!("item index {} out of range", item_index)))?;
            item.widget.title = title;
        }
    }
    Ok(())
}
