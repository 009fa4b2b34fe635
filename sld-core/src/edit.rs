//! Structured edits - the vocabulary spoken to the external edit sink.
//!
//! Every mutation of the document tree is described as an ordered list of
//! [`Edit`] values. The core never mutates the tree while computing them;
//! the sink (here, [`Document::apply`](crate::Document::apply)) applies a
//! whole list as one logical unit.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::document::NodeId;

/// A single structured edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Edit {
    /// Remove a node (and its subtree) from the tree.
    Remove {
        /// The node to remove.
        node: NodeId,
    },

    /// Insert a node under `parent`, before `reference` (`None` appends).
    ///
    /// The node may be detached (newly created or removed) or already in
    /// the tree, in which case this is a move.
    Insert {
        /// The new parent.
        parent: NodeId,
        /// The node to insert or move.
        node: NodeId,
        /// The sibling to insert before, or `None` to append.
        reference: Option<NodeId>,
    },

    /// Set or clear attributes on an element (`None` clears).
    SetAttributes {
        /// The element whose attributes change.
        element: NodeId,
        /// Attribute name to new value; `None` removes the attribute.
        values: BTreeMap<String, Option<String>>,
    },
}

impl Edit {
    /// Remove edit for `node`.
    #[must_use]
    pub fn remove(node: NodeId) -> Self {
        Self::Remove { node }
    }

    /// Insert (or move) edit placing `node` under `parent` before `reference`.
    #[must_use]
    pub fn insert(parent: NodeId, node: NodeId, reference: Option<NodeId>) -> Self {
        Self::Insert {
            parent,
            node,
            reference,
        }
    }

    /// Attribute-set edit from `(name, value)` pairs.
    #[must_use]
    pub fn set_attributes<N, V>(element: NodeId, values: V) -> Self
    where
        N: Into<String>,
        V: IntoIterator<Item = (N, Option<String>)>,
    {
        Self::SetAttributes {
            element,
            values: values
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        }
    }
}

/// Format a grid coordinate for attribute storage.
///
/// Integral values print without a fraction (`"3"`, not `"3.0"`); half-grid
/// values keep it (`"2.5"`).
#[must_use]
pub fn fmt_coord(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coords_format_without_trailing_zeroes() {
        assert_eq!(fmt_coord(3.0), "3");
        assert_eq!(fmt_coord(2.5), "2.5");
        assert_eq!(fmt_coord(0.0), "0");
    }

    #[test]
    fn set_attributes_collects_pairs() {
        let id = NodeId::new();
        let edit = Edit::set_attributes(id, [("x", Some("3".to_string())), ("flip", None)]);
        let Edit::SetAttributes { values, .. } = &edit else {
            panic!("expected SetAttributes");
        };
        assert_eq!(values.get("x"), Some(&Some("3".to_string())));
        assert_eq!(values.get("flip"), Some(&None));
    }
}
