#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{attribute_filter, attribute_filter_ids, filter_context_with_date, layout_of};
use dashkit_model::model::{AttributeFilterParent, SectionHeader};
use dashkit_model::selectors;
use dashkit_model::state::{
    DashboardAction, DashboardState, FilterContextAction, LayoutAction, MetaAction, StateStore,
};
use proptest::prelude::*;

#[test]
fn test_add_attribute_filter_after_date_filter() {
    // GIVEN a filter context with a date filter and one attribute filter
    let mut store = common::store_with_filter_context(filter_context_with_date(vec![
        attribute_filter("a", "df.a"),
    ]));

    // WHEN a filter is inserted at attribute index 0
    store
        .dispatch(FilterContextAction::AddAttributeFilter {
            filter: attribute_filter("b", "df.b"),
            index: 0,
        })
        .expect("Should add filter");

    // THEN the date filter stays first and the new filter precedes "a"
    let definition = selectors::select_filter_context_definition(store.state());
    assert!(definition.filters[0].is_date_filter());
    assert_eq!(attribute_filter_ids(store.state()), vec!["b", "a"]);
}

#[test]
fn test_remove_parent_references() {
    // GIVEN "b" filtered by "a"
    let mut child = attribute_filter("b", "df.b");
    child.filter_elements_by = vec![AttributeFilterParent {
        filter_local_identifier: "a".to_string(),
        over: Vec::new(),
    }];
    let mut store = common::store_with_filter_context(filter_context_with_date(vec![
        attribute_filter("a", "df.a"),
        child,
    ]));

    // WHEN "a" is removed together with the references to it
    store
        .dispatch_batch(vec![
            FilterContextAction::RemoveAttributeFilter {
                local_id: "a".to_string(),
            }
            .into(),
            FilterContextAction::RemoveParentReferences {
                parent_local_id: "a".to_string(),
            }
            .into(),
        ])
        .expect("Should remove");

    // THEN "b" no longer has a parent
    let b = selectors::select_attribute_filter_by_local_id(store.state(), "b").unwrap();
    assert!(b.filter_elements_by.is_empty());
    assert_eq!(attribute_filter_ids(store.state()), vec!["b"]);
}

#[test]
fn test_failed_batch_leaves_every_slice_untouched() {
    // GIVEN a titled dashboard with one section
    let mut store = StateStore::default();
    store
        .dispatch_batch(vec![
            MetaAction::SetTitle("Sales".to_string()).into(),
            LayoutAction::SetLayout(layout_of(&[&["w1"]])).into(),
        ])
        .unwrap();
    let before = store.snapshot();

    // WHEN a batch renames and then addresses a missing section
    let result = store.dispatch_batch(vec![
        MetaAction::SetTitle("Revenue".to_string()).into(),
        LayoutAction::ChangeSectionHeader {
            index: 5,
            header: SectionHeader::default(),
        }
        .into(),
    ]);

    // THEN nothing changed, including the title set by the first action
    let err = result.expect_err("Should fail");
    assert!(!err.is_user_error());
    assert_eq!(*store.snapshot(), *before);
}

#[test]
fn test_snapshot_is_detached_from_store() {
    let mut store = StateStore::default();
    let snapshot = store.snapshot();

    store
        .dispatch(DashboardAction::Meta(MetaAction::SetTitle("New".to_string())))
        .unwrap();

    assert_eq!(snapshot.meta.title, "");
    assert_eq!(store.state().meta.title, "New");
}

#[test]
fn test_undo_after_remove_item_restores_stash_and_layout() {
    let mut state = DashboardState::default();
    state.layout.layout = layout_of(&[&["w1", "w2"]]);
    let mut store = StateStore::new(state);

    store
        .dispatch_batch(vec![
            LayoutAction::RecordUndo {
                command_type: "remove".to_string(),
            }
            .into(),
            LayoutAction::RemoveSectionItem {
                section_index: 0,
                item_index: 1,
                stash_identifier: Some("s".to_string()),
            }
            .into(),
        ])
        .unwrap();
    assert!(selectors::select_stash(store.state(), "s").is_some());

    store.dispatch(LayoutAction::Undo { steps: 1 }).unwrap();

    assert!(selectors::select_stash(store.state(), "s").is_none());
    assert_eq!(store.state().layout.layout, layout_of(&[&["w1", "w2"]]));
    assert_eq!(selectors::select_undoable_layout_changes(store.state()), 0);
}

proptest! {
    // Any sequence of valid moves keeps the date filter first and the set of
    // attribute filters unchanged
    #[test]
    fn prop_moves_preserve_filters(moves in prop::collection::vec((0usize..4, 0usize..4), 0..20)) {
        let ids = ["a", "b", "c", "d"];
        let mut store = common::store_with_filter_context(filter_context_with_date(
            ids.iter().map(|id| attribute_filter(id, &format!("df.{}", id))).collect(),
        ));

        for (from, to) in moves {
            let local_id = attribute_filter_ids(store.state())[from].clone();
            store
                .dispatch(FilterContextAction::MoveAttributeFilter { local_id: local_id.clone(), index: to })
                .unwrap();
            prop_assert_eq!(&attribute_filter_ids(store.state())[to], &local_id);
        }

        let definition = selectors::select_filter_context_definition(store.state());
        prop_assert!(definition.filters[0].is_date_filter());
        let mut after = attribute_filter_ids(store.state());
        after.sort();
        prop_assert_eq!(after, vec!["a", "b", "c", "d"]);
    }
}
