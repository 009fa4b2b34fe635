//! Editor Integration Tests
//!
//! Tests the complete editing flow including:
//! - Placing palette equipment into a bay
//! - Drawing and committing connections
//! - Resize validation
//! - Copying connected equipment
//! - Cascading removal of containers

use sld_core::connectivity::copy_element;
use sld_core::geometry::connection_start_points;
use sld_core::synthesis::{remove_container, synthesize};
use sld_core::{
    attributes_of, ConnectivityIndex, Document, Edit, Editor, NodeId, Tag, TerminalName,
};

struct Diagram {
    doc: Document,
    substation: NodeId,
    voltage_level: NodeId,
    bay: NodeId,
}

/// Substation S1 with voltage level V1 and bay B1.
fn diagram() -> Diagram {
    let mut doc = Document::new();
    let substation = doc.create_with_attributes(
        Tag::Substation,
        [
            ("name", "S1".to_string()),
            ("w", "24".to_string()),
            ("h", "24".to_string()),
        ],
    );
    doc.add_root(substation);
    let voltage_level = doc.create_with_attributes(
        Tag::VoltageLevel,
        [
            ("name", "V1".to_string()),
            ("x", "1".to_string()),
            ("y", "1".to_string()),
            ("w", "14".to_string()),
            ("h", "14".to_string()),
        ],
    );
    let bay = doc.create_with_attributes(
        Tag::Bay,
        [
            ("name", "B1".to_string()),
            ("x", "2".to_string()),
            ("y", "2".to_string()),
            ("w", "10".to_string()),
            ("h", "10".to_string()),
        ],
    );
    doc.apply(&[
        Edit::insert(substation, voltage_level, None),
        Edit::insert(voltage_level, bay, None),
    ])
    .expect("build diagram");
    Diagram {
        doc,
        substation,
        voltage_level,
        bay,
    }
}

/// A detached disconnector, as a palette would stage it.
fn disconnector(doc: &mut Document, name: &str) -> NodeId {
    doc.create_with_attributes(
        Tag::ConductingEquipment,
        [("name", name.to_string()), ("type", "DIS".to_string())],
    )
}

/// Place `element` at the given cell through the full interaction flow.
fn place_at(diagram: &mut Diagram, element: NodeId, x: f64, y: f64) {
    let mut editor = Editor::new();
    editor.start_place(element);
    editor.pointer_moved(x + 0.4, y + 0.4);
    let request = editor
        .commit_place(&diagram.doc, diagram.substation)
        .expect("place commit");
    let edits = synthesize(&mut diagram.doc, &request);
    diagram.doc.apply(&edits).expect("apply place");
}

/// Draw a connection from `from`'s bottom terminal to `to`'s cell.
fn wire(diagram: &mut Diagram, from: NodeId, to: NodeId) {
    let anchors = connection_start_points(&attributes_of(
        diagram.doc.get(from).expect("source"),
    ));
    let mut editor = Editor::new();
    editor.start_connect(from, TerminalName::T2, [anchors[1].close, anchors[1].far]);
    let target = attributes_of(diagram.doc.get(to).expect("target")).pos;
    editor.pointer_moved(target.x + 0.2, target.y + 0.1);
    let request = editor
        .click_connect(&diagram.doc, diagram.substation)
        .expect("connect commit");
    let edits = synthesize(&mut diagram.doc, &request);
    diagram.doc.apply(&edits).expect("apply connect");
}

// ============================================================================
// Placement
// ============================================================================

#[test]
fn test_palette_equipment_lands_in_the_bay() {
    let mut diagram = diagram();
    let equipment = disconnector(&mut diagram.doc, "DIS1");

    place_at(&mut diagram, equipment, 3.0, 2.0);

    assert_eq!(diagram.doc.parent_of(equipment), Some(diagram.bay));
    assert_eq!(diagram.doc.attr(equipment, "x"), Some("3"));
    assert_eq!(diagram.doc.attr(equipment, "y"), Some("2"));
}

#[test]
fn test_placement_outside_every_bay_is_refused() {
    let mut diagram = diagram();
    let equipment = disconnector(&mut diagram.doc, "DIS1");

    let mut editor = Editor::new();
    editor.start_place(equipment);
    editor.pointer_moved(20.0, 20.0);
    assert!(editor.commit_place(&diagram.doc, diagram.substation).is_none());
    // The interaction survives a refused commit.
    assert!(!editor.is_idle());
    editor.cancel();
    assert!(editor.is_idle());
    assert_eq!(diagram.doc.parent_of(equipment), None);
}

// ============================================================================
// Connections
// ============================================================================

#[test]
fn test_drawn_connection_produces_shared_topology() {
    let mut diagram = diagram();
    let a = disconnector(&mut diagram.doc, "DIS1");
    let b = disconnector(&mut diagram.doc, "DIS2");
    place_at(&mut diagram, a, 3.0, 2.0);
    place_at(&mut diagram, b, 3.0, 6.0);

    wire(&mut diagram, a, b);

    let index = ConnectivityIndex::new(&diagram.doc);
    let cnode = index.node_by_path("S1/V1/B1/C1").expect("node");
    assert_eq!(diagram.doc.parent_of(cnode), Some(diagram.bay));
    assert_eq!(index.occupants_of("S1/V1/B1/C1").len(), 2);

    // Both ends carry the full location attributes.
    let terminal = diagram
        .doc
        .children_with_tag(b, Tag::Terminal)
        .first()
        .copied()
        .expect("target terminal");
    assert_eq!(diagram.doc.name_of(terminal), Some("T1"));
    assert_eq!(diagram.doc.attr(terminal, "bayName"), Some("B1"));
    assert_eq!(
        diagram.doc.attr(terminal, "connectivityNode"),
        Some("S1/V1/B1/C1")
    );

    // The wire runs straight down between the two symbols.
    let private = diagram.doc.vertices_private(cnode).expect("private");
    let section = diagram
        .doc
        .children_of(private)
        .first()
        .copied()
        .expect("section");
    for &vertex in diagram.doc.children_of(section) {
        assert_eq!(diagram.doc.attr(vertex, "x"), Some("3.5"));
    }
}

// ============================================================================
// Resizing
// ============================================================================

#[test]
fn test_resize_is_validated_end_to_end() {
    let mut diagram = diagram();
    let mut editor = Editor::new();

    // Shrinking within the voltage level commits.
    editor.start_resize(diagram.bay);
    editor.pointer_moved(9.0, 9.0);
    let request = editor
        .commit_resize(&diagram.doc, diagram.substation)
        .expect("resize commit");
    let edits = synthesize(&mut diagram.doc, &request);
    diagram.doc.apply(&edits).expect("apply resize");
    assert_eq!(diagram.doc.attr(diagram.bay, "w"), Some("8"));
    assert_eq!(diagram.doc.attr(diagram.bay, "h"), Some("8"));

    // Growing past the voltage level does not.
    editor.start_resize(diagram.bay);
    editor.pointer_moved(18.0, 9.0);
    assert!(editor.commit_resize(&diagram.doc, diagram.substation).is_none());
}

// ============================================================================
// Copying
// ============================================================================

#[test]
fn test_copy_of_connected_equipment_starts_clean() {
    let mut diagram = diagram();
    let a = disconnector(&mut diagram.doc, "DIS1");
    let b = disconnector(&mut diagram.doc, "DIS2");
    place_at(&mut diagram, a, 3.0, 2.0);
    place_at(&mut diagram, b, 3.0, 6.0);
    wire(&mut diagram, a, b);

    let copy = copy_element(&mut diagram.doc, a);
    place_at(&mut diagram, copy, 6.0, 2.0);

    // Renamed against its siblings, connectivity severed.
    assert_eq!(diagram.doc.name_of(copy), Some("DIS3"));
    assert!(diagram.doc.children_with_tag(copy, Tag::Terminal).is_empty());
    // The original connection is untouched.
    let index = ConnectivityIndex::new(&diagram.doc);
    assert_eq!(index.occupants_of("S1/V1/B1/C1").len(), 2);
}

// ============================================================================
// Removal
// ============================================================================

#[test]
fn test_deleting_a_bay_tears_down_shared_wiring() {
    let mut diagram = diagram();
    let second = diagram.doc.create_with_attributes(
        Tag::Bay,
        [
            ("name", "B2".to_string()),
            ("x", "2".to_string()),
            ("y", "2".to_string()),
            ("w", "10".to_string()),
            ("h", "10".to_string()),
        ],
    );
    diagram
        .doc
        .apply(&[Edit::insert(diagram.voltage_level, second, None)])
        .expect("add bay");

    let a = disconnector(&mut diagram.doc, "DIS1");
    let b = disconnector(&mut diagram.doc, "DIS2");
    place_at(&mut diagram, a, 3.0, 2.0);
    place_at(&mut diagram, b, 3.0, 6.0);
    wire(&mut diagram, a, b);
    // Move the peer out so the node is shared across bays.
    let edits = sld_core::synthesis::place(&diagram.doc, b, second, 3.0, 6.0);
    diagram.doc.apply(&edits).expect("apply move");

    let edits = remove_container(&diagram.doc, diagram.bay);
    diagram.doc.apply(&edits).expect("apply removal");

    assert_eq!(diagram.doc.parent_of(diagram.bay), None);
    // The shared node and the surviving peer's terminal are gone too.
    let index = ConnectivityIndex::new(&diagram.doc);
    assert!(index.node_by_path("S1/V1/B1/C1").is_none());
    assert!(diagram.doc.children_with_tag(b, Tag::Terminal).is_empty());
}
