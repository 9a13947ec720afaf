//! Concept index: saved queries presented as concepts in the tree.
//!
//! The index is regenerated after every successful save or delete. The
//! [`ConceptIndexer`] trait is the collaborator seam; [`LocalConceptIndexer`]
//! builds the tree in-process by grouping queries into category folders.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use leaf_core::{QueryDefinition, UniversalId};

use crate::error::TransportError;

/// Id of the root folder holding every saved query.
pub const SAVED_QUERIES_ROOT: &str = "saved-queries";

/// One entry of the concept tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptNode {
    pub id: String,
    pub text: String,
    /// Set for entries that stand for a saved query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub universal_id: Option<UniversalId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ConceptNode>,
}

impl ConceptNode {
    fn folder(id: String, text: String, children: Vec<ConceptNode>) -> Self {
        ConceptNode {
            id,
            text,
            universal_id: None,
            children,
        }
    }

    fn query(uid: &UniversalId, name: &str) -> Self {
        ConceptNode {
            id: format!("query:{uid}"),
            text: name.to_string(),
            universal_id: Some(uid.clone()),
            children: Vec::new(),
        }
    }
}

/// The saved-query extension of the concept tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptIndex {
    pub roots: Vec<ConceptNode>,
}

impl ConceptIndex {
    /// Universal ids of every saved query in the index, depth first.
    pub fn query_ids(&self) -> Vec<UniversalId> {
        fn walk(node: &ConceptNode, out: &mut Vec<UniversalId>) {
            if let Some(uid) = &node.universal_id {
                out.push(uid.clone());
            }
            for child in &node.children {
                walk(child, out);
            }
        }
        let mut out = Vec::new();
        for root in &self.roots {
            walk(root, &mut out);
        }
        out
    }
}

/// Regenerates the concept index from the full set of saved queries.
#[async_trait]
pub trait ConceptIndexer: Send + Sync {
    async fn rebuild(&self, saved: &[QueryDefinition]) -> Result<ConceptIndex, TransportError>;
}

/// Builds the index without calling out to any node.
#[derive(Debug, Clone, Default)]
pub struct LocalConceptIndexer;

#[async_trait]
impl ConceptIndexer for LocalConceptIndexer {
    async fn rebuild(&self, saved: &[QueryDefinition]) -> Result<ConceptIndex, TransportError> {
        Ok(build_index(saved))
    }
}

/// Groups saved queries by category (folders first, sorted), with
/// uncategorized queries directly under the root. Unsaved definitions are
/// ignored.
pub fn build_index(saved: &[QueryDefinition]) -> ConceptIndex {
    if saved.is_empty() {
        return ConceptIndex::default();
    }

    let mut folders: BTreeMap<&str, Vec<(&str, &UniversalId)>> = BTreeMap::new();
    let mut loose: Vec<(&str, &UniversalId)> = Vec::new();
    for query in saved {
        let Some(uid) = &query.universal_id else {
            continue;
        };
        let category = query.category.trim();
        if category.is_empty() {
            loose.push((query.name.as_str(), uid));
        } else {
            folders.entry(category).or_default().push((query.name.as_str(), uid));
        }
    }

    let mut children: Vec<ConceptNode> = folders
        .into_iter()
        .map(|(category, mut queries)| {
            queries.sort();
            ConceptNode::folder(
                format!("{SAVED_QUERIES_ROOT}:{category}"),
                category.to_string(),
                queries
                    .into_iter()
                    .map(|(name, uid)| ConceptNode::query(uid, name))
                    .collect(),
            )
        })
        .collect();
    loose.sort();
    children.extend(loose.into_iter().map(|(name, uid)| ConceptNode::query(uid, name)));

    ConceptIndex {
        roots: vec![ConceptNode::folder(
            SAVED_QUERIES_ROOT.to_string(),
            "Saved Queries".to_string(),
            children,
        )],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn saved(uid: &str, name: &str, category: &str) -> QueryDefinition {
        let mut def = QueryDefinition::new(name, category);
        def.universal_id = Some(uid.into());
        def
    }

    #[test]
    fn empty_collection_yields_empty_index() {
        assert!(build_index(&[]).roots.is_empty());
    }

    #[test]
    fn queries_are_grouped_by_category() {
        let index = build_index(&[
            saved("u1", "Zeta", ""),
            saved("u2", "Beta", "Diabetes"),
            saved("u3", "Alpha", "Diabetes"),
            saved("u4", "Gamma", "Asthma"),
        ]);
        let root = &index.roots[0];
        let texts: Vec<&str> = root.children.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["Asthma", "Diabetes", "Zeta"]);

        let diabetes: Vec<&str> = root.children[1]
            .children
            .iter()
            .map(|c| c.text.as_str())
            .collect();
        assert_eq!(diabetes, vec!["Alpha", "Beta"]);
        assert_eq!(index.query_ids().len(), 4);
    }

    #[test]
    fn unsaved_definitions_are_ignored() {
        let index = build_index(&[QueryDefinition::new("draft", "")]);
        assert!(index.query_ids().is_empty());
    }
}
