//! Document tree for substation diagrams.
//!
//! Replaces live DOM traversal with an explicit arena: nodes are stored in
//! an id-indexed map, with parent/child links and string attributes. The
//! editing core only reads this tree and emits [`Edit`] lists; the tree
//! changes shape solely through [`Document::apply`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::edit::Edit;
use crate::error::{SldError, SldResult};

/// Unique identifier for a document node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Create a new unique node ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Element vocabulary of the diagram document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tag {
    /// Top-level substation container.
    Substation,
    /// Voltage level within a substation.
    VoltageLevel,
    /// Bay within a voltage level (regular or busbar).
    Bay,
    /// Switchgear or other conducting equipment.
    ConductingEquipment,
    /// Power transformer.
    PowerTransformer,
    /// Winding of a power transformer.
    TransformerWinding,
    /// Tap changer on a winding.
    TapChanger,
    /// Connection point on equipment or a winding.
    Terminal,
    /// Neutral connection point on a winding.
    NeutralPoint,
    /// Electrical junction identified by a hierarchical path name.
    ConnectivityNode,
    /// Schema extension container holding diagram geometry.
    Private,
    /// Polyline of vertices within a `Private` extension.
    Section,
    /// Grid-aligned point of a section.
    Vertex,
}

impl Tag {
    /// Tag name as it appears in the document schema.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Substation => "Substation",
            Self::VoltageLevel => "VoltageLevel",
            Self::Bay => "Bay",
            Self::ConductingEquipment => "ConductingEquipment",
            Self::PowerTransformer => "PowerTransformer",
            Self::TransformerWinding => "TransformerWinding",
            Self::TapChanger => "TapChanger",
            Self::Terminal => "Terminal",
            Self::NeutralPoint => "NeutralPoint",
            Self::ConnectivityNode => "ConnectivityNode",
            Self::Private => "Private",
            Self::Section => "Section",
            Self::Vertex => "Vertex",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name of a typed connection point.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[allow(missing_docs)]
pub enum TerminalName {
    T1,
    T2,
    N1,
    N2,
}

impl TerminalName {
    /// The `name` attribute value.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::T1 => "T1",
            Self::T2 => "T2",
            Self::N1 => "N1",
            Self::N2 => "N2",
        }
    }

    /// Whether this names a neutral point rather than a terminal.
    #[must_use]
    pub fn is_neutral(self) -> bool {
        matches!(self, Self::N1 | Self::N2)
    }

    /// The element tag a connection point of this name is stored under.
    #[must_use]
    pub fn tag(self) -> Tag {
        if self.is_neutral() {
            Tag::NeutralPoint
        } else {
            Tag::Terminal
        }
    }
}

impl fmt::Display for TerminalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `type` attribute of the `Private` extension holding section geometry.
pub const VERTICES_PRIV_TYPE: &str = "SLD-Vertices";

/// Known conducting equipment type codes.
pub const EQ_TYPES: [&str; 14] = [
    "CAB", "CAP", "CBR", "CTR", "DIS", "GEN", "IFL", "LIN", "MOT", "REA", "RES", "SAR", "SMC",
    "VTR",
];

const SINGLE_TERMINAL: [&str; 11] = [
    "BAT", "EFN", "FAN", "GEN", "IFL", "MOT", "PMP", "RRC", "SAR", "SMC", "VTR",
];

const RINGED: [&str; 3] = ["GEN", "MOT", "SMC"];

/// Whether equipment of this type connects through a single terminal only.
#[must_use]
pub fn is_single_terminal(eq_type: &str) -> bool {
    SINGLE_TERMINAL.contains(&eq_type)
}

/// Whether equipment of this type is drawn with a surrounding ring.
#[must_use]
pub fn is_ringed(eq_type: &str) -> bool {
    RINGED.contains(&eq_type)
}

/// Parse a schema boolean attribute (`"true"` or `"1"`).
#[must_use]
pub fn xml_boolean(value: Option<&str>) -> bool {
    matches!(value.map(str::trim), Some("true" | "1"))
}

/// A single node of the document tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Element tag.
    pub tag: Tag,
    attributes: BTreeMap<String, String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(tag: Tag) -> Self {
        Self {
            tag,
            attributes: BTreeMap::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    /// Get an attribute value.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// The `name` attribute.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.attribute("name")
    }

    /// Parent node, if attached below one.
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Ordered child ids.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Iterate over all attributes.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Schema child ordering used by [`Document::get_reference`].
fn child_order(parent: Tag) -> &'static [Tag] {
    match parent {
        Tag::Substation => &[Tag::Private, Tag::PowerTransformer, Tag::VoltageLevel],
        Tag::VoltageLevel => &[Tag::Private, Tag::PowerTransformer, Tag::Bay],
        Tag::Bay => &[
            Tag::Private,
            Tag::PowerTransformer,
            Tag::ConductingEquipment,
            Tag::ConnectivityNode,
        ],
        Tag::ConductingEquipment => &[Tag::Private, Tag::Terminal],
        Tag::PowerTransformer => &[Tag::Private, Tag::TransformerWinding],
        Tag::TransformerWinding => &[
            Tag::Private,
            Tag::Terminal,
            Tag::NeutralPoint,
            Tag::TapChanger,
        ],
        Tag::ConnectivityNode => &[Tag::Private],
        _ => &[],
    }
}

/// The diagram document: an arena of nodes plus the attached root list.
///
/// Nodes can exist detached (created but not yet inserted, or removed);
/// detached subtrees stay in the arena so a later [`Edit::Insert`] can
/// re-attach them, mirroring how removed tree nodes outlive their removal
/// in the host document model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    nodes: HashMap<NodeId, Node>,
    roots: Vec<NodeId>,
}

impl Document {
    /// Create an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new detached element.
    pub fn create_element(&mut self, tag: Tag) -> NodeId {
        let id = NodeId::new();
        self.nodes.insert(id, Node::new(tag));
        id
    }

    /// Create a new detached element with initial attributes.
    pub fn create_with_attributes<'a, I>(&mut self, tag: Tag, attributes: I) -> NodeId
    where
        I: IntoIterator<Item = (&'a str, String)>,
    {
        let id = self.create_element(tag);
        for (name, value) in attributes {
            self.set_attribute(id, name, Some(&value));
        }
        id
    }

    /// Attach a detached node as a document root.
    pub fn add_root(&mut self, id: NodeId) {
        if self.nodes.contains_key(&id) && !self.roots.contains(&id) {
            self.roots.push(id);
        }
    }

    /// Attached root nodes, in document order.
    #[must_use]
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Get a node by id.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    fn node(&self, id: NodeId) -> SldResult<&Node> {
        self.nodes
            .get(&id)
            .ok_or_else(|| SldError::NodeNotFound(id.to_string()))
    }

    fn node_mut(&mut self, id: NodeId) -> SldResult<&mut Node> {
        self.nodes
            .get_mut(&id)
            .ok_or_else(|| SldError::NodeNotFound(id.to_string()))
    }

    /// Get an attribute of a node.
    #[must_use]
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.get(id).and_then(|node| node.attribute(name))
    }

    /// The `name` attribute of a node.
    #[must_use]
    pub fn name_of(&self, id: NodeId) -> Option<&str> {
        self.attr(id, "name")
    }

    /// Parent of a node.
    #[must_use]
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(Node::parent)
    }

    /// Ordered children of a node.
    #[must_use]
    pub fn children_of(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map_or(&[], Node::children)
    }

    /// Set or clear an attribute directly.
    ///
    /// Intended for document construction and loading; interactive editing
    /// goes through [`Document::apply`].
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: Option<&str>) {
        if let Some(node) = self.nodes.get_mut(&id) {
            match value {
                Some(value) => {
                    node.attributes.insert(name.to_string(), value.to_string());
                }
                None => {
                    node.attributes.remove(name);
                }
            }
        }
    }

    /// Nearest ancestor-or-self with the given tag.
    #[must_use]
    pub fn closest(&self, id: NodeId, tag: Tag) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(cursor) = current {
            let node = self.get(cursor)?;
            if node.tag == tag {
                return Some(cursor);
            }
            current = node.parent();
        }
        None
    }

    /// Whether `id` lies within the subtree rooted at `ancestor` (self counts).
    #[must_use]
    pub fn is_within(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(cursor) = current {
            if cursor == ancestor {
                return true;
            }
            current = self.parent_of(cursor);
        }
        false
    }

    /// Descendants of a node in tree order, excluding the node itself.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children_of(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children_of(next).iter().rev().copied());
        }
        out
    }

    /// Descendants of a node with the given tag, in tree order.
    #[must_use]
    pub fn descendants_with_tag(&self, id: NodeId, tag: Tag) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&d| self.get(d).is_some_and(|n| n.tag == tag))
            .collect()
    }

    /// All attached nodes with the given tag, in document order.
    #[must_use]
    pub fn all_with_tag(&self, tag: Tag) -> Vec<NodeId> {
        let mut out = Vec::new();
        for &root in &self.roots {
            if self.get(root).is_some_and(|n| n.tag == tag) {
                out.push(root);
            }
            out.extend(self.descendants_with_tag(root, tag));
        }
        out
    }

    /// Direct children with the given tag.
    #[must_use]
    pub fn children_with_tag(&self, id: NodeId, tag: Tag) -> Vec<NodeId> {
        self.children_of(id)
            .iter()
            .copied()
            .filter(|&c| self.get(c).is_some_and(|n| n.tag == tag))
            .collect()
    }

    /// Whether a Bay is a busbar (its geometry holds a `bus` section).
    #[must_use]
    pub fn is_bus_bar(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|n| n.tag == Tag::Bay)
            && self
                .descendants_with_tag(id, Tag::Section)
                .iter()
                .find(|&&s| self.attr(s, "bus").is_some())
                .is_some_and(|&s| xml_boolean(self.attr(s, "bus")))
    }

    /// Whether a Bay is a regular (non-busbar) bay.
    #[must_use]
    pub fn is_bay(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|n| n.tag == Tag::Bay) && !self.is_bus_bar(id)
    }

    /// The geometry `Private` extension of a connectivity node, if any.
    #[must_use]
    pub fn vertices_private(&self, cnode: NodeId) -> Option<NodeId> {
        self.children_with_tag(cnode, Tag::Private)
            .into_iter()
            .find(|&p| self.attr(p, "type") == Some(VERTICES_PRIV_TYPE))
    }

    /// Hierarchical path name: the `name` attributes of the ancestor chain
    /// (outermost first) followed by `rest`, joined with `/`.
    #[must_use]
    pub fn element_path(&self, id: NodeId, rest: &[&str]) -> String {
        let mut pedigree = Vec::new();
        let mut current = Some(id);
        while let Some(cursor) = current {
            let Some(name) = self.name_of(cursor) else {
                break;
            };
            pedigree.push(name.to_string());
            current = self.parent_of(cursor);
        }
        pedigree.reverse();
        pedigree.extend(rest.iter().map(ToString::to_string));
        pedigree.join("/")
    }

    /// The child of `parent` before which a new element with `tag` belongs,
    /// per the schema's child ordering. `None` appends at the end.
    #[must_use]
    pub fn get_reference(&self, parent: NodeId, tag: Tag) -> Option<NodeId> {
        let order = child_order(self.get(parent)?.tag);
        let slot = order.iter().position(|&t| t == tag)?;
        self.children_of(parent).iter().copied().find(|&child| {
            self.get(child).is_some_and(|node| {
                order
                    .iter()
                    .position(|&t| t == node.tag)
                    .is_none_or(|pos| pos > slot)
            })
        })
    }

    fn detach(&mut self, id: NodeId) {
        self.roots.retain(|&r| r != id);
        if let Some(parent) = self.parent_of(id) {
            if let Some(node) = self.nodes.get_mut(&parent) {
                node.children.retain(|&c| c != id);
            }
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = None;
        }
    }

    /// Apply an ordered edit list as one logical unit.
    ///
    /// # Errors
    ///
    /// Returns an error when an edit references an unknown node or would
    /// create a cycle. The document may be partially updated in that case;
    /// edit lists produced by this crate never fail.
    pub fn apply(&mut self, edits: &[Edit]) -> SldResult<()> {
        for edit in edits {
            match edit {
                Edit::Remove { node } => {
                    self.node(*node)?;
                    self.detach(*node);
                }
                Edit::Insert {
                    parent,
                    node,
                    reference,
                } => {
                    self.node(*node)?;
                    self.node(*parent)?;
                    if self.is_within(*parent, *node) {
                        return Err(SldError::InvalidEdit(format!(
                            "inserting {node} under its own descendant {parent}"
                        )));
                    }
                    self.detach(*node);
                    let position = reference.and_then(|reference| {
                        self.children_of(*parent).iter().position(|&c| c == reference)
                    });
                    {
                        let parent_node = self.node_mut(*parent)?;
                        match position {
                            Some(index) => parent_node.children.insert(index, *node),
                            None => parent_node.children.push(*node),
                        }
                    }
                    self.node_mut(*node)?.parent = Some(*parent);
                }
                Edit::SetAttributes { element, values } => {
                    self.node(*element)?;
                    for (name, value) in values {
                        self.set_attribute(*element, name, value.as_deref());
                    }
                }
            }
        }
        Ok(())
    }

    /// Deep-clone a subtree into a new detached node.
    ///
    /// Returns the clone's root and the original-to-clone id mapping.
    pub fn clone_subtree(&mut self, id: NodeId) -> (NodeId, HashMap<NodeId, NodeId>) {
        let mut mapping = HashMap::new();
        let mut order = vec![id];
        order.extend(self.descendants(id));
        for &original in &order {
            let clone = NodeId::new();
            if let Some(node) = self.nodes.get(&original) {
                let mut copy = node.clone();
                copy.parent = None;
                copy.children.clear();
                self.nodes.insert(clone, copy);
            }
            mapping.insert(original, clone);
        }
        for &original in &order {
            let clone = mapping[&original];
            let children: Vec<NodeId> = self
                .children_of(original)
                .iter()
                .map(|child| mapping[child])
                .collect();
            for &child in &children {
                if let Some(node) = self.nodes.get_mut(&child) {
                    node.parent = Some(clone);
                }
            }
            if let Some(node) = self.nodes.get_mut(&clone) {
                node.children = children;
            }
        }
        (mapping[&id], mapping)
    }

    /// Append `child` as the last child of a detached `parent`.
    ///
    /// Structural staging for synthesized subtrees; attached elements move
    /// through [`Edit::Insert`] instead.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        if !self.nodes.contains_key(&parent) || !self.nodes.contains_key(&child) {
            return;
        }
        if self.is_within(parent, child) {
            return;
        }
        self.detach(child);
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(child);
        }
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
    }

    /// Drop a (typically staged) subtree from the arena entirely.
    ///
    /// Unlike [`Edit::Remove`], the nodes cannot be re-inserted afterwards.
    pub fn discard(&mut self, id: NodeId) {
        let subtree = self.descendants(id);
        self.detach(id);
        self.nodes.remove(&id);
        for node in subtree {
            self.nodes.remove(&node);
        }
    }

    /// Serialize the document to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> SldResult<String> {
        serde_json::to_string(self).map_err(SldError::Serialization)
    }

    /// Deserialize a document from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn from_json(json: &str) -> SldResult<Self> {
        serde_json::from_str(json).map_err(SldError::Serialization)
    }
}

/// Explicit connectivity lookup index, rebuilt on demand from the tree.
///
/// Maps path names to connectivity nodes and to the terminals and neutral
/// points occupying them, replacing document-wide attribute scans.
#[derive(Debug, Default)]
pub struct ConnectivityIndex {
    by_path: HashMap<String, NodeId>,
    occupants: HashMap<String, Vec<NodeId>>,
}

impl ConnectivityIndex {
    /// Build the index from the current document state.
    #[must_use]
    pub fn new(doc: &Document) -> Self {
        let mut index = Self::default();
        for cnode in doc.all_with_tag(Tag::ConnectivityNode) {
            if let Some(path) = doc.attr(cnode, "pathName") {
                index.by_path.insert(path.to_string(), cnode);
            }
        }
        for tag in [Tag::Terminal, Tag::NeutralPoint] {
            for terminal in doc.all_with_tag(tag) {
                if let Some(path) = doc.attr(terminal, "connectivityNode") {
                    index
                        .occupants
                        .entry(path.to_string())
                        .or_default()
                        .push(terminal);
                }
            }
        }
        index
    }

    /// The connectivity node with the given path name.
    #[must_use]
    pub fn node_by_path(&self, path: &str) -> Option<NodeId> {
        self.by_path.get(path).copied()
    }

    /// Terminals and neutral points referencing the given path name.
    #[must_use]
    pub fn occupants_of(&self, path: &str) -> &[NodeId] {
        self.occupants.get(path).map_or(&[], Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closest_walks_ancestors() {
        let mut doc = Document::new();
        let sub = doc.create_with_attributes(Tag::Substation, [("name", "S1".to_string())]);
        doc.add_root(sub);
        let vl = doc.create_with_attributes(Tag::VoltageLevel, [("name", "V1".to_string())]);
        let bay = doc.create_with_attributes(Tag::Bay, [("name", "B1".to_string())]);
        doc.apply(&[Edit::insert(sub, vl, None), Edit::insert(vl, bay, None)])
            .expect("apply");

        assert_eq!(doc.closest(bay, Tag::Substation), Some(sub));
        assert_eq!(doc.closest(bay, Tag::Bay), Some(bay));
        assert_eq!(doc.closest(sub, Tag::Bay), None);
    }

    #[test]
    fn element_path_joins_named_ancestors() {
        let mut doc = Document::new();
        let sub = doc.create_with_attributes(Tag::Substation, [("name", "S1".to_string())]);
        doc.add_root(sub);
        let vl = doc.create_with_attributes(Tag::VoltageLevel, [("name", "V1".to_string())]);
        let bay = doc.create_with_attributes(Tag::Bay, [("name", "B1".to_string())]);
        doc.apply(&[Edit::insert(sub, vl, None), Edit::insert(vl, bay, None)])
            .expect("apply");

        assert_eq!(doc.element_path(bay, &["grounded"]), "S1/V1/B1/grounded");
    }

    #[test]
    fn get_reference_respects_child_order() {
        let mut doc = Document::new();
        let bay = doc.create_element(Tag::Bay);
        doc.add_root(bay);
        let eq = doc.create_element(Tag::ConductingEquipment);
        let cnode = doc.create_element(Tag::ConnectivityNode);
        doc.apply(&[Edit::insert(bay, eq, None), Edit::insert(bay, cnode, None)])
            .expect("apply");

        // New equipment goes before the connectivity node.
        assert_eq!(doc.get_reference(bay, Tag::ConductingEquipment), Some(cnode));
        assert_eq!(doc.get_reference(bay, Tag::ConnectivityNode), None);
        // Geometry extensions go before everything else.
        assert_eq!(doc.get_reference(bay, Tag::Private), Some(eq));
    }

    #[test]
    fn removed_nodes_can_be_reinserted() {
        let mut doc = Document::new();
        let section = doc.create_element(Tag::Section);
        doc.add_root(section);
        let v1 = doc.create_element(Tag::Vertex);
        let v2 = doc.create_element(Tag::Vertex);
        doc.apply(&[
            Edit::insert(section, v1, None),
            Edit::insert(section, v2, None),
        ])
        .expect("apply");

        doc.apply(&[Edit::remove(v1), Edit::insert(section, v1, None)])
            .expect("apply");
        assert_eq!(doc.children_of(section), &[v2, v1]);
    }

    #[test]
    fn bus_bar_requires_bus_section() {
        let mut doc = Document::new();
        let bay = doc.create_element(Tag::Bay);
        doc.add_root(bay);
        let cnode = doc.create_element(Tag::ConnectivityNode);
        let private =
            doc.create_with_attributes(Tag::Private, [("type", VERTICES_PRIV_TYPE.to_string())]);
        let section = doc.create_element(Tag::Section);
        doc.apply(&[
            Edit::insert(bay, cnode, None),
            Edit::insert(cnode, private, None),
            Edit::insert(private, section, None),
        ])
        .expect("apply");

        assert!(!doc.is_bus_bar(bay));
        doc.set_attribute(section, "bus", Some("true"));
        assert!(doc.is_bus_bar(bay));
        assert!(!doc.is_bay(bay));
    }

    #[test]
    fn connectivity_index_resolves_paths_and_occupants() {
        let mut doc = Document::new();
        let sub = doc.create_with_attributes(Tag::Substation, [("name", "S1".to_string())]);
        doc.add_root(sub);
        let cnode = doc.create_with_attributes(
            Tag::ConnectivityNode,
            [("name", "L1".to_string()), ("pathName", "S1/V1/B1/L1".to_string())],
        );
        let terminal = doc.create_with_attributes(
            Tag::Terminal,
            [("name", "T1".to_string()), ("connectivityNode", "S1/V1/B1/L1".to_string())],
        );
        doc.apply(&[Edit::insert(sub, cnode, None), Edit::insert(sub, terminal, None)])
            .expect("apply");

        let index = ConnectivityIndex::new(&doc);
        assert_eq!(index.node_by_path("S1/V1/B1/L1"), Some(cnode));
        assert_eq!(index.occupants_of("S1/V1/B1/L1"), &[terminal]);
        assert!(index.occupants_of("S1/V1/B1/other").is_empty());
    }
}
