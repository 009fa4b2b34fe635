//! Connectivity graph engine.
//!
//! Operations on the electrical topology: removing junctions, splicing
//! section geometry after a cut, moving elements between containers with
//! name and path fixups, duplicating subtrees and grounding terminals.
//! All operations describe their effect as an [`Edit`] list; none of them
//! mutate the attached tree (staging operations create detached nodes
//! only).

use std::collections::HashSet;

use tracing::debug;
use uuid::Uuid;

use crate::document::{
    xml_boolean, ConnectivityIndex, Document, NodeId, Tag, TerminalName,
};
use crate::edit::Edit;
use crate::geometry::{attributes_of, Point};
use crate::path::collinear;

fn vertex_point(doc: &Document, vertex: NodeId) -> Point {
    doc.get(vertex)
        .map_or(Point::new(0.0, 0.0), |node| attributes_of(node).pos)
}

/// Edits removing a connectivity node and everything that refers to it.
///
/// A busbar's node is not deleted but collapsed instead: its first bus
/// section keeps its first and the overall last vertex, all other bus
/// geometry goes. Terminals and neutral points occupying the node's path
/// are removed in both cases.
#[must_use]
pub fn remove_node(doc: &Document, node: NodeId) -> Vec<Edit> {
    let mut edits = Vec::new();

    let sections = doc.descendants_with_tag(node, Tag::Section);
    let marked: Vec<NodeId> = sections
        .iter()
        .copied()
        .filter(|&s| doc.attr(s, "bus").is_some())
        .collect();

    if marked
        .first()
        .is_some_and(|&s| xml_boolean(doc.attr(s, "bus")))
    {
        for &section in &sections {
            if doc.attr(section, "bus").is_none() {
                edits.push(Edit::remove(section));
            }
        }
        let bus_section = marked[0];
        for &vertex in doc.children_of(bus_section).iter().skip(1) {
            edits.push(Edit::remove(vertex));
        }
        let last_vertex = marked
            .last()
            .and_then(|&section| doc.children_of(section).last().copied());
        if let Some(last_vertex) = last_vertex {
            edits.push(Edit::insert(bus_section, last_vertex, None));
        }
        for &section in &marked[1..] {
            edits.push(Edit::remove(section));
        }
    } else {
        edits.push(Edit::remove(node));
    }

    if let Some(path) = doc.attr(node, "pathName") {
        let index = ConnectivityIndex::new(doc);
        for &terminal in index.occupants_of(path) {
            edits.push(Edit::remove(terminal));
        }
    }

    edits
}

fn reverse_section(doc: &Document, section: NodeId) -> Vec<Edit> {
    doc.children_of(section)
        .iter()
        .rev()
        .map(|&vertex| Edit::insert(section, vertex, None))
        .collect()
}

/// Edits healing the cut left at `cut` after its section goes away.
///
/// Exactly two surviving sections ending at the cut point are spliced into
/// one; the shared vertex is dropped when the joint is straight. One
/// survivor means the whole junction is obsolete and its node is removed.
/// More than two survivors, or a bus/non-bus mismatch, leaves the geometry
/// untouched.
#[must_use]
pub fn heal_section_cut(doc: &Document, cut: NodeId) -> Vec<Edit> {
    let cut_point = vertex_point(doc, cut);
    let is_cut = |vertex: NodeId| vertex != cut && vertex_point(doc, vertex) == cut_point;

    let Some(private) = doc.closest(cut, Tag::Private) else {
        return Vec::new();
    };
    let cut_vertices: Vec<NodeId> = doc
        .descendants_with_tag(private, Tag::Section)
        .into_iter()
        .flat_map(|section| {
            doc.children_of(section)
                .iter()
                .copied()
                .filter(|&v| is_cut(v))
                .collect::<Vec<_>>()
        })
        .collect();
    let cut_sections: Vec<NodeId> = cut_vertices
        .iter()
        .filter_map(|&vertex| doc.parent_of(vertex))
        .collect();

    if cut_sections.len() > 2 {
        return Vec::new();
    }
    if cut_sections.len() < 2 {
        return match doc.closest(cut, Tag::ConnectivityNode) {
            Some(cnode) => remove_node(doc, cnode),
            None => Vec::new(),
        };
    }
    let (section_a, section_b) = (cut_sections[0], cut_sections[1]);
    if xml_boolean(doc.attr(section_a, "bus")) != xml_boolean(doc.attr(section_b, "bus")) {
        return Vec::new();
    }

    let mut edits = Vec::new();
    let a_children: Vec<NodeId> = doc.children_of(section_a).to_vec();
    let a_starts_at_cut = a_children.first().copied().is_some_and(|v| is_cut(v));
    if a_starts_at_cut {
        edits.extend(reverse_section(doc, section_a));
    }
    let mut b_children: Vec<NodeId> = doc.children_of(section_b).to_vec();
    if b_children.last().copied().is_some_and(|v| is_cut(v)) {
        b_children.reverse();
    }
    for &vertex in b_children.iter().skip(1) {
        edits.push(Edit::insert(section_a, vertex, None));
    }

    let cut_a = a_children.iter().copied().find(|&v| is_cut(v));
    let neighbour_a = if a_starts_at_cut {
        a_children.get(1).copied()
    } else {
        a_children
            .len()
            .checked_sub(2)
            .and_then(|i| a_children.get(i).copied())
    };
    let neighbour_b = b_children.get(1).copied();
    if let (Some(na), Some(ca), Some(nb)) = (neighbour_a, cut_a, neighbour_b) {
        if collinear(
            vertex_point(doc, na),
            vertex_point(doc, ca),
            vertex_point(doc, nb),
        ) {
            edits.push(Edit::remove(ca));
        }
    }
    edits.push(Edit::remove(section_b));

    edits
}

fn update_terminals(
    doc: &Document,
    cnode: NodeId,
    substation_name: &str,
    voltage_level_name: &str,
    bay_name: &str,
    cnode_name: &str,
    connectivity_node: &str,
) -> Vec<Edit> {
    let Some(old_path) = doc.attr(cnode, "pathName") else {
        return Vec::new();
    };
    let mut parts = old_path.split('/');
    let old_names = (parts.next(), parts.next(), parts.next(), parts.next());

    let mut updates = Vec::new();
    for tag in [Tag::Terminal, Tag::NeutralPoint] {
        for terminal in doc.all_with_tag(tag) {
            let by_path = doc.attr(terminal, "connectivityNode") == Some(old_path);
            let by_names = match old_names {
                (Some(sub), Some(vl), Some(bay), Some(cn)) => {
                    doc.attr(terminal, "substationName") == Some(sub)
                        && doc.attr(terminal, "voltageLevelName") == Some(vl)
                        && doc.attr(terminal, "bayName") == Some(bay)
                        && doc.attr(terminal, "cNodeName") == Some(cn)
                }
                _ => false,
            };
            if by_path || by_names {
                updates.push(Edit::set_attributes(
                    terminal,
                    [
                        ("substationName", Some(substation_name.to_string())),
                        ("voltageLevelName", Some(voltage_level_name.to_string())),
                        ("bayName", Some(bay_name.to_string())),
                        ("connectivityNode", Some(connectivity_node.to_string())),
                        ("cNodeName", Some(cnode_name.to_string())),
                    ],
                ));
            }
        }
    }
    updates
}

fn update_connectivity_nodes(
    doc: &Document,
    element: NodeId,
    parent: NodeId,
    name: &str,
) -> Vec<Edit> {
    let element_tag = doc.get(element).map(|node| node.tag);

    let mut cnodes = doc.descendants_with_tag(element, Tag::ConnectivityNode);
    if element_tag == Some(Tag::ConnectivityNode) {
        cnodes.push(element);
    }
    let substation_name = doc
        .closest(parent, Tag::Substation)
        .and_then(|s| doc.name_of(s))
        .unwrap_or_default();
    let mut voltage_level_name = doc
        .closest(parent, Tag::VoltageLevel)
        .and_then(|v| doc.name_of(v))
        .unwrap_or_default();
    if element_tag == Some(Tag::VoltageLevel) {
        voltage_level_name = name;
    }

    let mut updates = Vec::new();
    for cnode in cnodes {
        let mut cnode_name = doc.name_of(cnode).unwrap_or_default();
        if cnode == element {
            cnode_name = name;
        }
        let mut bay_name = doc
            .parent_of(cnode)
            .and_then(|p| doc.name_of(p))
            .unwrap_or_default();
        if element_tag == Some(Tag::Bay) {
            bay_name = name;
        }
        if doc.get(parent).is_some_and(|node| node.tag == Tag::Bay) {
            if let Some(parent_name) = doc.name_of(parent) {
                bay_name = parent_name;
            }
        }

        if cnode_name.is_empty() || bay_name.is_empty() {
            continue;
        }
        let path = format!("{substation_name}/{voltage_level_name}/{bay_name}/{cnode_name}");
        updates.push(Edit::set_attributes(
            cnode,
            [("pathName", Some(path.clone()))],
        ));
        if !substation_name.is_empty() && !voltage_level_name.is_empty() {
            updates.extend(update_terminals(
                doc,
                cnode,
                substation_name,
                voltage_level_name,
                bay_name,
                cnode_name,
                &path,
            ));
        }
    }
    updates
}

/// A name for `element` that is unique among `parent`'s children.
///
/// The element's current name wins if it is free. Otherwise the base is
/// the current name with trailing digits stripped, falling back to the
/// `type` attribute and then to the tag's initial, suffixed with the
/// smallest free index.
#[must_use]
pub fn unique_name(doc: &Document, element: NodeId, parent: NodeId) -> String {
    let children = doc.children_of(parent);
    let taken = |candidate: &str| {
        children
            .iter()
            .any(|&child| doc.name_of(child) == Some(candidate))
    };

    if let Some(old) = doc.name_of(element) {
        if !taken(old) {
            return old.to_string();
        }
    }

    let base = match doc.name_of(element) {
        Some(name) => name
            .trim_end_matches(|c: char| c.is_ascii_digit())
            .to_string(),
        None => doc.attr(element, "type").map_or_else(
            || {
                doc.get(element)
                    .map_or_else(String::new, |node| node.tag.as_str()[..1].to_string())
            },
            ToString::to_string,
        ),
    };
    let mut index = 1_u32;
    while taken(&format!("{base}{index}")) {
        index += 1;
    }
    format!("{base}{index}")
}

/// Edits moving `element` under `parent`: the move itself, a rename when
/// the current name collides, and path-name updates on every contained
/// connectivity node plus retargeting of all terminals bound to them.
#[must_use]
pub fn reparent_element(doc: &Document, element: NodeId, parent: NodeId) -> Vec<Edit> {
    let Some(tag) = doc.get(element).map(|node| node.tag) else {
        return Vec::new();
    };
    let mut edits = vec![Edit::insert(
        parent,
        element,
        doc.get_reference(parent, tag),
    )];
    let new_name = unique_name(doc, element, parent);
    if doc.name_of(element) != Some(new_name.as_str()) {
        edits.push(Edit::set_attributes(
            element,
            [("name", Some(new_name.clone()))],
        ));
    }
    edits.extend(update_connectivity_nodes(doc, element, parent, &new_name));
    debug!(%element, %parent, name = %new_name, "reparenting element");
    edits
}

/// Edits detaching a terminal from its connectivity node.
///
/// The node is re-homed to another occupant's bay when it would otherwise
/// be left in a bay with no local occupants; it is removed outright when
/// at most one occupant survives. The terminal's wiring section goes away
/// and the cut left at its far end is healed.
#[must_use]
pub fn remove_terminal(doc: &Document, terminal: NodeId) -> Vec<Edit> {
    let mut edits = vec![Edit::remove(terminal)];

    let Some(path) = doc.attr(terminal, "connectivityNode") else {
        return edits;
    };
    let index = ConnectivityIndex::new(doc);
    let cnode = index.node_by_path(path);
    let other_terminals: Vec<NodeId> = index
        .occupants_of(path)
        .iter()
        .copied()
        .filter(|&t| t != terminal)
        .collect();

    if let Some(cnode) = cnode {
        let cnode_bay = doc.closest(cnode, Tag::Bay);
        if other_terminals.len() > 1
            && other_terminals
                .iter()
                .any(|&t| doc.closest(t, Tag::Bay).is_some())
            && other_terminals
                .iter()
                .all(|&t| doc.closest(t, Tag::Bay) != cnode_bay)
            && cnode_bay.is_some_and(|bay| !doc.is_bus_bar(bay))
        {
            let new_parent = other_terminals
                .iter()
                .find_map(|&t| doc.closest(t, Tag::Bay));
            if let Some(new_parent) = new_parent {
                edits.extend(reparent_element(doc, cnode, new_parent));
            }
        }
        if other_terminals.len() <= 1 {
            edits.extend(remove_node(doc, cnode));
            return edits;
        }
    }

    let uuid = doc.attr(terminal, "uuid");
    let vertex = cnode
        .and_then(|c| doc.vertices_private(c))
        .and_then(|private| {
            doc.descendants_with_tag(private, Tag::Vertex)
                .into_iter()
                .find(|&v| uuid.is_some() && doc.attr(v, "uuid") == uuid)
        });
    let Some(section) = vertex.and_then(|v| doc.parent_of(v)) else {
        return edits;
    };
    edits.push(Edit::remove(section));

    let section_children = doc.children_of(section);
    let cut = if vertex == section_children.last().copied() {
        section_children.first().copied()
    } else {
        section_children.last().copied()
    };
    if let Some(cut) = cut {
        edits.extend(heal_section_cut(doc, cut));
    }

    edits
}

/// Duplicate `element` as a detached subtree ready for placement.
///
/// Connectivity to nodes outside the copied subtree is severed: terminals
/// bound to such nodes are dropped from the copy, contained nodes with
/// outside occupants are excised (a busbar's whole bay goes with it). All
/// surviving terminal correlation ids are regenerated together with their
/// wiring vertices.
pub fn copy_element(doc: &mut Document, element: NodeId) -> NodeId {
    let index = ConnectivityIndex::new(doc);
    let element_tag = doc.get(element).map(|node| node.tag);
    let (clone, mapping) = doc.clone_subtree(element);
    let Some(element_tag) = element_tag else {
        return clone;
    };
    debug!(%element, %clone, "copying element");

    let mut terminals = doc.descendants_with_tag(element, Tag::Terminal);
    terminals.extend(doc.descendants_with_tag(element, Tag::NeutralPoint));
    let terminal_set: HashSet<NodeId> = terminals.iter().copied().collect();

    let mut cnodes = doc.descendants_with_tag(element, Tag::ConnectivityNode);
    for &terminal in &terminals {
        if let Some(cnode) = doc
            .attr(terminal, "connectivityNode")
            .and_then(|path| index.node_by_path(path))
        {
            if !cnodes.contains(&cnode) {
                cnodes.push(cnode);
            }
        }
    }

    for cnode in cnodes {
        let path = doc.attr(cnode, "pathName").map(str::to_string);
        let has_foreign_terminal = path.as_deref().is_some_and(|p| {
            index
                .occupants_of(p)
                .iter()
                .any(|t| !terminal_set.contains(t))
        });
        let bay_is_bus = doc
            .closest(cnode, Tag::Bay)
            .is_some_and(|bay| doc.is_bus_bar(bay));
        let inside = doc.closest(cnode, element_tag) == Some(element);
        if !(has_foreign_terminal || (bay_is_bus && !inside)) {
            continue;
        }

        if inside {
            if bay_is_bus {
                let cloned_bay = doc
                    .closest(cnode, Tag::Bay)
                    .and_then(|bay| mapping.get(&bay).copied());
                if let Some(cloned_bay) = cloned_bay {
                    if cloned_bay != clone {
                        doc.discard(cloned_bay);
                    }
                }
            } else if let Some(&cloned_cnode) = mapping.get(&cnode) {
                if cloned_cnode != clone {
                    doc.discard(cloned_cnode);
                }
            }
        }
        for &terminal in &terminals {
            if doc.attr(terminal, "connectivityNode") == path.as_deref() {
                if let Some(&cloned_terminal) = mapping.get(&terminal) {
                    doc.discard(cloned_terminal);
                }
            }
        }
    }

    let mut cloned_terminals = doc.descendants_with_tag(clone, Tag::Terminal);
    cloned_terminals.extend(doc.descendants_with_tag(clone, Tag::NeutralPoint));
    for terminal in cloned_terminals {
        let Some(old_uuid) = doc.attr(terminal, "uuid").map(str::to_string) else {
            continue;
        };
        let fresh = Uuid::new_v4().to_string();
        for vertex in doc.descendants_with_tag(clone, Tag::Vertex) {
            if doc.attr(vertex, "uuid") == Some(old_uuid.as_str()) {
                doc.set_attribute(vertex, "uuid", Some(&fresh));
            }
        }
        doc.set_attribute(terminal, "uuid", Some(&fresh));
    }

    clone
}

/// Edits grounding a connection point of `equipment`.
///
/// A `grounded` connectivity node in the nearest suitable bay is reused
/// when it exists, created otherwise; the new terminal or neutral point
/// binds to it without any wiring geometry.
pub fn ground_terminal(doc: &mut Document, equipment: NodeId, name: TerminalName) -> Vec<Edit> {
    let bay = doc.closest(equipment, Tag::Bay).or_else(|| {
        let container = doc
            .closest(equipment, Tag::VoltageLevel)
            .or_else(|| doc.closest(equipment, Tag::Substation))?;
        doc.descendants_with_tag(container, Tag::Bay)
            .into_iter()
            .find(|&bay| !doc.is_bus_bar(bay))
    });
    let Some(bay) = bay else {
        return Vec::new();
    };

    let mut edits = Vec::new();
    let existing = doc
        .children_with_tag(bay, Tag::ConnectivityNode)
        .into_iter()
        .find(|&cnode| doc.name_of(cnode) == Some("grounded"));
    let path = match existing.and_then(|g| doc.attr(g, "pathName")).map(str::to_string) {
        Some(path) => path,
        None => {
            let path = doc.element_path(bay, &["grounded"]);
            let grounded = doc.create_with_attributes(
                Tag::ConnectivityNode,
                [
                    ("name", "grounded".to_string()),
                    ("pathName", path.clone()),
                ],
            );
            edits.push(Edit::insert(
                bay,
                grounded,
                doc.get_reference(bay, Tag::ConnectivityNode),
            ));
            path
        }
    };

    let mut attrs = vec![
        ("name", name.as_str().to_string()),
        ("cNodeName", "grounded".to_string()),
    ];
    if let Some(sub) = doc
        .closest(bay, Tag::Substation)
        .and_then(|s| doc.name_of(s))
    {
        attrs.push(("substationName", sub.to_string()));
    }
    if let Some(vl) = doc
        .closest(bay, Tag::VoltageLevel)
        .and_then(|v| doc.name_of(v))
    {
        attrs.push(("voltageLevelName", vl.to_string()));
    }
    if let Some(bay_name) = doc.name_of(bay) {
        attrs.push(("bayName", bay_name.to_string()));
    }
    attrs.push(("connectivityNode", path));

    let terminal = doc.create_with_attributes(name.tag(), attrs);
    edits.push(Edit::insert(
        equipment,
        terminal,
        doc.get_reference(equipment, name.tag()),
    ));
    debug!(%equipment, name = %name, "grounding terminal");
    edits
}
