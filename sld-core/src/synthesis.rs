//! Edit synthesis.
//!
//! Turns committed interactions and menu actions into ordered [`Edit`]
//! lists. Synthesized elements (connectivity nodes, wiring, terminals,
//! tap changers) are staged as detached arena subtrees and attached with
//! a single `Insert` each, so the host can apply or reject a whole list
//! as one unit.

use tracing::debug;
use uuid::Uuid;

use crate::connectivity::{remove_node, remove_terminal, reparent_element, unique_name};
use crate::document::{
    ConnectivityIndex, Document, NodeId, Tag, TerminalName, VERTICES_PRIV_TYPE,
};
use crate::edit::{fmt_coord, Edit};
use crate::geometry::{attributes_of, TransformerKind};
use crate::interaction::{ConnectTarget, Connection, InteractionRequest};

/// Synthesize the edits for a committed interaction.
pub fn synthesize(doc: &mut Document, request: &InteractionRequest) -> Vec<Edit> {
    match request {
        InteractionRequest::Place {
            element,
            parent,
            x,
            y,
        } => place(doc, *element, *parent, *x, *y),
        InteractionRequest::Resize { element, w, h } => resize(*element, *w, *h),
        InteractionRequest::PlaceLabel { element, x, y } => place_label(*element, *x, *y),
        InteractionRequest::Rotate { element } => rotate(doc, *element),
        InteractionRequest::Connect(connection) => connect(doc, connection),
    }
}

/// Edits placing `element` under `parent` at the given grid position.
///
/// Reparents (with rename and connectivity retargeting) when the parent
/// changes, then translates the element, its label and every positioned
/// descendant, wiring vertices included, by the same delta.
#[must_use]
pub fn place(doc: &Document, element: NodeId, parent: NodeId, x: f64, y: f64) -> Vec<Edit> {
    let Some(node) = doc.get(element) else {
        return Vec::new();
    };
    let mut edits = Vec::new();
    if doc.parent_of(element) != Some(parent) {
        edits.extend(reparent_element(doc, element, parent));
    }

    let attrs = attributes_of(node);
    let (dx, dy) = (x - attrs.pos.x, y - attrs.pos.y);
    edits.push(Edit::set_attributes(
        element,
        [("x", Some(fmt_coord(x))), ("y", Some(fmt_coord(y)))],
    ));
    if dx == 0.0 && dy == 0.0 {
        return edits;
    }

    if node.attribute("lx").is_some() || node.attribute("ly").is_some() {
        edits.push(Edit::set_attributes(
            element,
            [
                ("lx", Some(fmt_coord(attrs.label.x + dx))),
                ("ly", Some(fmt_coord(attrs.label.y + dy))),
            ],
        ));
    }
    for descendant in doc.descendants(element) {
        let Some(child) = doc.get(descendant) else {
            continue;
        };
        let child_attrs = attributes_of(child);
        let mut values: Vec<(&str, Option<String>)> = Vec::new();
        if child.attribute("x").is_some() || child.attribute("y").is_some() {
            values.push(("x", Some(fmt_coord(child_attrs.pos.x + dx))));
            values.push(("y", Some(fmt_coord(child_attrs.pos.y + dy))));
        }
        if child.attribute("lx").is_some() || child.attribute("ly").is_some() {
            values.push(("lx", Some(fmt_coord(child_attrs.label.x + dx))));
            values.push(("ly", Some(fmt_coord(child_attrs.label.y + dy))));
        }
        if !values.is_empty() {
            edits.push(Edit::set_attributes(descendant, values));
        }
    }
    edits
}

/// Edits resizing `element`.
#[must_use]
pub fn resize(element: NodeId, w: f64, h: f64) -> Vec<Edit> {
    vec![Edit::set_attributes(
        element,
        [("w", Some(fmt_coord(w))), ("h", Some(fmt_coord(h)))],
    )]
}

/// Edits moving `element`'s label.
#[must_use]
pub fn place_label(element: NodeId, x: f64, y: f64) -> Vec<Edit> {
    vec![Edit::set_attributes(
        element,
        [("lx", Some(fmt_coord(x))), ("ly", Some(fmt_coord(y)))],
    )]
}

/// Edits turning `element` one quarter turn clockwise.
#[must_use]
pub fn rotate(doc: &Document, element: NodeId) -> Vec<Edit> {
    let Some(node) = doc.get(element) else {
        return Vec::new();
    };
    let rot = attributes_of(node).rot.turned();
    vec![Edit::set_attributes(
        element,
        [("rot", Some(rot.index().to_string()))],
    )]
}

/// Edits mirroring `element`; clears the marker when already mirrored.
#[must_use]
pub fn flip(doc: &Document, element: NodeId) -> Vec<Edit> {
    let flipped = doc.get(element).map(attributes_of).is_some_and(|a| a.flip);
    let value = if flipped {
        None
    } else {
        Some("true".to_string())
    };
    vec![Edit::set_attributes(element, [("flip", value)])]
}

/// Whether `transformer` offers mirroring: autotransformers always,
/// earthing transformers only with two windings.
#[must_use]
pub fn can_flip(doc: &Document, transformer: NodeId) -> bool {
    let kind = TransformerKind::from_attr(doc.attr(transformer, "kind"));
    match kind {
        TransformerKind::Auto => true,
        TransformerKind::Earthing => {
            doc.children_with_tag(transformer, Tag::TransformerWinding)
                .len()
                == 2
        }
        TransformerKind::Default => false,
    }
}

fn staged_terminal(
    doc: &mut Document,
    equipment: NodeId,
    name: TerminalName,
    path: &str,
    uuid: &str,
) -> Edit {
    let mut attrs = vec![("name", name.as_str().to_string())];
    let parts: Vec<&str> = path.split('/').collect();
    if let Some(&cnode_name) = parts.last() {
        attrs.push(("cNodeName", cnode_name.to_string()));
    }
    if parts.len() == 4 {
        attrs.push(("substationName", parts[0].to_string()));
        attrs.push(("voltageLevelName", parts[1].to_string()));
        attrs.push(("bayName", parts[2].to_string()));
    }
    attrs.push(("connectivityNode", path.to_string()));
    attrs.push(("uuid", uuid.to_string()));
    let terminal = doc.create_with_attributes(name.tag(), attrs);
    Edit::insert(equipment, terminal, doc.get_reference(equipment, name.tag()))
}

/// Edits completing a drawn connection.
///
/// A connection to an open terminal creates a connectivity node with the
/// wiring geometry in the source's bay and a bound terminal on each end.
/// A connection to an existing node adds a wiring section to it and binds
/// only the source.
pub fn connect(doc: &mut Document, connection: &Connection) -> Vec<Edit> {
    match connection.to {
        ConnectTarget::Terminal {
            equipment,
            terminal,
        } => connect_terminals(doc, connection, equipment, terminal),
        ConnectTarget::Node(cnode) => connect_to_node(doc, connection, cnode),
    }
}

fn connect_terminals(
    doc: &mut Document,
    connection: &Connection,
    target: NodeId,
    to_terminal: TerminalName,
) -> Vec<Edit> {
    let bay = doc
        .closest(connection.from, Tag::Bay)
        .or_else(|| doc.closest(target, Tag::Bay));
    let Some(bay) = bay else {
        return Vec::new();
    };

    let from_uuid = Uuid::new_v4().to_string();
    let to_uuid = Uuid::new_v4().to_string();

    let cnode = doc.create_element(Tag::ConnectivityNode);
    let name = unique_name(doc, cnode, bay);
    doc.set_attribute(cnode, "name", Some(&name));
    let path = doc.element_path(bay, &[&name]);
    doc.set_attribute(cnode, "pathName", Some(&path));

    let private =
        doc.create_with_attributes(Tag::Private, [("type", VERTICES_PRIV_TYPE.to_string())]);
    let section = wiring_section(doc, connection, &from_uuid, Some(&to_uuid));
    doc.append(cnode, private);
    doc.append(private, section);

    debug!(%cnode, path = %path, "connecting terminals");
    vec![
        Edit::insert(bay, cnode, doc.get_reference(bay, Tag::ConnectivityNode)),
        staged_terminal(doc, connection.from, connection.from_terminal, &path, &from_uuid),
        staged_terminal(doc, target, to_terminal, &path, &to_uuid),
    ]
}

fn connect_to_node(doc: &mut Document, connection: &Connection, cnode: NodeId) -> Vec<Edit> {
    let Some(path) = doc.attr(cnode, "pathName").map(str::to_string) else {
        return Vec::new();
    };
    let from_uuid = Uuid::new_v4().to_string();
    let section = wiring_section(doc, connection, &from_uuid, None);

    let mut edits = Vec::new();
    match doc.vertices_private(cnode) {
        Some(private) => edits.push(Edit::insert(private, section, None)),
        None => {
            let private = doc
                .create_with_attributes(Tag::Private, [("type", VERTICES_PRIV_TYPE.to_string())]);
            doc.append(private, section);
            edits.push(Edit::insert(
                cnode,
                private,
                doc.get_reference(cnode, Tag::Private),
            ));
        }
    }
    edits.push(staged_terminal(
        doc,
        connection.from,
        connection.from_terminal,
        &path,
        &from_uuid,
    ));
    debug!(%cnode, path = %path, "connecting to node");
    edits
}

fn wiring_section(
    doc: &mut Document,
    connection: &Connection,
    from_uuid: &str,
    to_uuid: Option<&str>,
) -> NodeId {
    let section = doc.create_element(Tag::Section);
    let last = connection.path.len().saturating_sub(1);
    for (i, point) in connection.path.iter().enumerate() {
        let vertex = doc.create_with_attributes(
            Tag::Vertex,
            [("x", fmt_coord(point.x)), ("y", fmt_coord(point.y))],
        );
        if i == 0 {
            doc.set_attribute(vertex, "uuid", Some(from_uuid));
        } else if i == last {
            if let Some(uuid) = to_uuid {
                doc.set_attribute(vertex, "uuid", Some(uuid));
            }
        }
        doc.append(section, vertex);
    }
    section
}

/// Edits deleting a piece of equipment with all its connections.
#[must_use]
pub fn remove_equipment(doc: &Document, equipment: NodeId) -> Vec<Edit> {
    let mut edits = Vec::new();
    for terminal in doc.descendants_with_tag(equipment, Tag::Terminal) {
        edits.extend(remove_terminal(doc, terminal));
    }
    edits.push(Edit::remove(equipment));
    edits
}

/// Edits deleting a power transformer with all its connections.
#[must_use]
pub fn remove_power_transformer(doc: &Document, transformer: NodeId) -> Vec<Edit> {
    let mut edits = Vec::new();
    let mut terminals = doc.descendants_with_tag(transformer, Tag::Terminal);
    terminals.extend(doc.descendants_with_tag(transformer, Tag::NeutralPoint));
    for terminal in terminals {
        edits.extend(remove_terminal(doc, terminal));
    }
    edits.push(Edit::remove(transformer));
    edits
}

/// Edits deleting a busbar together with its connectivity node.
#[must_use]
pub fn remove_bus_bar(doc: &Document, busbar: NodeId) -> Vec<Edit> {
    let mut edits = Vec::new();
    if let Some(cnode) = doc
        .descendants_with_tag(busbar, Tag::ConnectivityNode)
        .first()
        .copied()
    {
        edits.extend(remove_node(doc, cnode));
    }
    edits.push(Edit::remove(busbar));
    edits
}

/// Edits deleting a bay or voltage level.
///
/// Connectivity nodes shared with equipment outside the container are
/// torn down first, both the contained ones with outside occupants and
/// the outside ones contained terminals are bound to.
#[must_use]
pub fn remove_container(doc: &Document, container: NodeId) -> Vec<Edit> {
    let Some(tag) = doc.get(container).map(|node| node.tag) else {
        return Vec::new();
    };
    let index = ConnectivityIndex::new(doc);
    let mut edits = Vec::new();

    for cnode in doc.descendants_with_tag(container, Tag::ConnectivityNode) {
        let Some(path) = doc.attr(cnode, "pathName") else {
            continue;
        };
        let outside = index
            .occupants_of(path)
            .iter()
            .any(|&t| doc.closest(t, tag) != Some(container));
        if outside {
            edits.extend(remove_node(doc, cnode));
        }
    }

    let mut terminals = doc.descendants_with_tag(container, Tag::Terminal);
    terminals.extend(doc.descendants_with_tag(container, Tag::NeutralPoint));
    for terminal in terminals {
        let cnode = doc
            .attr(terminal, "connectivityNode")
            .and_then(|path| index.node_by_path(path));
        let Some(cnode) = cnode else {
            continue;
        };
        if doc.closest(cnode, tag) != Some(container) {
            edits.extend(remove_node(doc, cnode));
        }
    }

    edits.push(Edit::remove(container));
    edits
}

/// Edits detaching every terminal of `element` from its node.
#[must_use]
pub fn detach_terminals(doc: &Document, element: NodeId) -> Vec<Edit> {
    doc.descendants_with_tag(element, Tag::Terminal)
        .into_iter()
        .flat_map(|terminal| remove_terminal(doc, terminal))
        .collect()
}

/// Edits detaching every neutral point of `element` from its node.
#[must_use]
pub fn detach_neutral_points(doc: &Document, element: NodeId) -> Vec<Edit> {
    doc.descendants_with_tag(element, Tag::NeutralPoint)
        .into_iter()
        .flat_map(|terminal| remove_terminal(doc, terminal))
        .collect()
}

/// Edits adding a tap changer to a winding; empty when one exists.
pub fn add_tap_changer(doc: &mut Document, winding: NodeId) -> Vec<Edit> {
    if !doc
        .descendants_with_tag(winding, Tag::TapChanger)
        .is_empty()
    {
        return Vec::new();
    }
    let tap = doc.create_with_attributes(Tag::TapChanger, [("name", "LTC".to_string())]);
    let name = unique_name(doc, tap, winding);
    doc.set_attribute(tap, "name", Some(&name));
    vec![Edit::insert(
        winding,
        tap,
        doc.get_reference(winding, Tag::TapChanger),
    )]
}

/// Edits removing a winding's tap changers.
#[must_use]
pub fn remove_tap_changer(doc: &Document, winding: NodeId) -> Vec<Edit> {
    doc.descendants_with_tag(winding, Tag::TapChanger)
        .into_iter()
        .map(Edit::remove)
        .collect()
}
