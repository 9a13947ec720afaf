//! Saved-query definition model.
//!
//! A [`QueryDefinition`] is an ordered list of [`Panel`]s plus a set of
//! [`PanelFilter`]s. Panels nest sub-panels, and sub-panels hold
//! [`PanelItem`]s. An item refers either to a concept or to another saved
//! query; the latter is what creates dependency edges between saved queries.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::id::{QueryId, UniversalId};

/// What a panel item points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemRef {
    /// A concept from the concept tree.
    Concept {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        universal_id: Option<String>,
    },
    /// Another saved query embedded as a sub-query.
    Query { universal_id: UniversalId, name: String },
}

/// A single criterion inside a sub-panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelItem {
    pub index: u32,
    #[serde(flatten)]
    pub reference: ItemRef,
}

impl PanelItem {
    pub fn concept(index: u32, id: impl Into<String>) -> Self {
        PanelItem {
            index,
            reference: ItemRef::Concept {
                id: id.into(),
                universal_id: None,
            },
        }
    }

    pub fn query(index: u32, universal_id: UniversalId, name: impl Into<String>) -> Self {
        PanelItem {
            index,
            reference: ItemRef::Query {
                universal_id,
                name: name.into(),
            },
        }
    }

    /// Universal id of the embedded saved query, if this item is one.
    pub fn embedded_query(&self) -> Option<&UniversalId> {
        match &self.reference {
            ItemRef::Query { universal_id, .. } => Some(universal_id),
            ItemRef::Concept { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubPanel {
    pub index: u32,
    #[serde(default = "default_true")]
    pub include_sub_panel: bool,
    #[serde(default)]
    pub panel_items: Vec<PanelItem>,
}

/// A unit of filter logic. Panels are combined in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Panel {
    pub index: u32,
    #[serde(default = "default_true")]
    pub include_panel: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default)]
    pub sub_panels: Vec<SubPanel>,
}

impl Panel {
    /// Creates an included panel with a single sub-panel holding `items`.
    pub fn with_items(index: u32, items: Vec<PanelItem>) -> Self {
        Panel {
            index,
            include_panel: true,
            domain: None,
            sub_panels: vec![SubPanel {
                index: 0,
                include_sub_panel: true,
                panel_items: items,
            }],
        }
    }

    /// Iterates the universal ids of every saved query embedded in this panel.
    pub fn embedded_queries(&self) -> impl Iterator<Item = &UniversalId> {
        self.sub_panels
            .iter()
            .flat_map(|sp| sp.panel_items.iter())
            .filter_map(PanelItem::embedded_query)
    }
}

/// A global filter toggled on or off by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelFilter {
    pub id: i64,
    pub concept_id: String,
    #[serde(default = "default_true")]
    pub include: bool,
    #[serde(default)]
    pub is_active: bool,
}

/// A saved query as held by a node or by a client session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDefinition {
    /// Node-local identity. Present only once persisted on the home node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<QueryId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub universal_id: Option<UniversalId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ver: Option<u32>,
    pub name: String,
    #[serde(default)]
    pub category: String,
    /// Server-assigned owner name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default)]
    pub panels: Vec<Panel>,
    #[serde(default)]
    pub panel_filters: Vec<PanelFilter>,
}

impl QueryDefinition {
    /// Creates an unsaved definition with no panels.
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        QueryDefinition {
            id: None,
            universal_id: None,
            ver: None,
            name: name.into(),
            category: category.into(),
            owner: None,
            panels: Vec::new(),
            panel_filters: Vec::new(),
        }
    }

    /// The set of saved queries this definition embeds, deduplicated and sorted.
    pub fn embedded_queries(&self) -> BTreeSet<UniversalId> {
        self.panels
            .iter()
            .flat_map(Panel::embedded_queries)
            .cloned()
            .collect()
    }

    /// Display name, falling back to the universal id for unnamed queries.
    pub fn display_name(&self) -> String {
        match (&self.name, &self.universal_id) {
            (name, _) if !name.is_empty() => name.clone(),
            (_, Some(uid)) => uid.to_string(),
            _ => String::new(),
        }
    }
}

/// A saved query that depends on another one, as reported by a node that
/// refuses a non-forced delete.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryDependent {
    pub universal_id: UniversalId,
    pub name: String,
    pub owner: String,
}

impl QueryDependent {
    /// Ownership is a prefix match of the owner against the caller's name.
    pub fn is_owned_by(&self, user: &str) -> bool {
        self.owner.starts_with(user)
    }
}

fn default_true() -> bool {
    true
}
