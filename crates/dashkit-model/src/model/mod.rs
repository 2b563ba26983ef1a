//! Backend-agnostic dashboard data model

pub mod dashboard;
pub mod filter;
pub mod index;
pub mod layout;
pub mod obj_ref;

pub use dashboard::{DashboardDefinition, DashboardSummary, DisplayFormMetadata};
pub use filter::{
    generate_filter_local_identifier, AttributeElements, AttributeFilterParent,
    AttributeFilterSelection, AttributeFilterSelectionType, DashboardAttributeFilter,
    DashboardFilter, DateBound, DateFilterGranularity, DateFilterSelection, DateFilterType,
    FilterContextDefinition, FilterContextItem,
};
pub use index::{resolve_existing_index, resolve_insert_index, END_INDEX};
pub use layout::{
    DashboardLayout, ItemDefinition, ItemSize, LayoutItem, LayoutSection, SectionHeader, Widget,
    WidgetHeader, WidgetKind,
};
pub use obj_ref::{ObjRef, ObjectType};
