use serde::{Deserialize, Serialize};

use super::obj_ref::ObjRef;

/// Title and description shown above a layout section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionHeader {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SectionHeader {
    /// Overlay the fields set in `update` on top of this header
    pub fn merged_with(&self, update: &SectionHeader) -> SectionHeader {
        SectionHeader {
            title: update.title.clone().or_else(|| self.title.clone()),
            description: update
                .description
                .clone()
                .or_else(|| self.description.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WidgetKind {
    Insight { insight: ObjRef },
    Kpi { measure: ObjRef },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Widget {
    #[serde(rename = "ref")]
    pub widget_ref: ObjRef,
    pub title: String,
    #[serde(flatten)]
    pub kind: WidgetKind,
}

impl Widget {
    pub fn is_kpi(&self) -> bool {
        matches!(self.kind, WidgetKind::Kpi { .. })
    }

    pub fn is_insight(&self) -> bool {
        matches!(self.kind, WidgetKind::Insight { .. })
    }
}

/// Header shown above a single widget
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetHeader {
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSize {
    pub grid_width: u32,
}

impl Default for ItemSize {
    fn default() -> Self {
        Self { grid_width: 12 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutItem {
    #[serde(default)]
    pub size: ItemSize,
    pub widget: Widget,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<SectionHeader>,
    #[serde(default)]
    pub items: Vec<LayoutItem>,
}

/// Fluid dashboard layout: rows (sections) of widget items
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardLayout {
    #[serde(default)]
    pub sections: Vec<LayoutSection>,
}

impl DashboardLayout {
    pub fn item_count(&self) -> usize {
        self.sections.iter().map(|s| s.items.len()).sum()
    }

    /// Section and item index of the widget with the given ref
    pub fn widget_position(&self, widget_ref: &ObjRef) -> Option<(usize, usize)> {
        self.sections
            .iter()
            .enumerate()
            .find_map(|(section_index, section)| {
                section
                    .items
                    .iter()
                    .position(|item| item.widget.widget_ref.same_object(widget_ref))
                    .map(|item_index| (section_index, item_index))
            })
    }
}

/// Item to place into the layout: a new item or the items held by a stash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemDefinition {
    Item(LayoutItem),
    Stash(String),
}
