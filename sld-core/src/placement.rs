//! Placement and resize validation.
//!
//! Pure predicates over the document geometry: an element may sit at a
//! rectangle when some suitable parent contains it fully and no sibling of
//! the same kind overlaps it. Busbars are exempt from overlap both ways.

use crate::document::{Document, NodeId, Tag};
use crate::geometry::{attributes_of, Point, Rect};

/// Containers an element of the given kind may be placed into.
#[must_use]
pub fn parent_tags(tag: Tag) -> Option<&'static [Tag]> {
    match tag {
        Tag::ConductingEquipment => Some(&[Tag::Bay]),
        Tag::Bay => Some(&[Tag::VoltageLevel]),
        Tag::VoltageLevel => Some(&[Tag::Substation]),
        Tag::PowerTransformer => Some(&[Tag::Bay, Tag::VoltageLevel, Tag::Substation]),
        _ => None,
    }
}

fn element_rect(doc: &Document, id: NodeId) -> Option<Rect> {
    doc.get(id).map(|node| attributes_of(node).rect())
}

/// Whether `element` may occupy `rect` within `substation`.
///
/// Substations place anywhere. Everything else needs a non-busbar parent
/// of a suitable kind fully containing the rectangle, and must not overlap
/// any like-tagged sibling or power transformer (busbars excepted on both
/// sides of that check).
#[must_use]
pub fn can_place_at(doc: &Document, substation: NodeId, element: NodeId, rect: Rect) -> bool {
    let Some(tag) = doc.get(element).map(|node| node.tag) else {
        return false;
    };
    if tag == Tag::Substation {
        return true;
    }

    let mut siblings = doc.descendants_with_tag(substation, tag);
    if tag != Tag::PowerTransformer {
        siblings.extend(doc.descendants_with_tag(substation, Tag::PowerTransformer));
    }
    let overlapping = siblings.iter().any(|&sibling| {
        doc.closest(sibling, tag) != Some(element)
            && element_rect(doc, sibling).is_some_and(|r| r.overlaps(rect))
            && !doc.is_bus_bar(sibling)
    });
    if overlapping && !doc.is_bus_bar(element) {
        return false;
    }

    if tag == Tag::VoltageLevel {
        return element_rect(doc, substation).is_some_and(|r| r.contains(rect));
    }
    let Some(parents) = parent_tags(tag) else {
        return false;
    };
    parents.iter().any(|&parent_tag| {
        let mut candidates = doc.descendants_with_tag(substation, parent_tag);
        if parent_tag == Tag::Substation {
            candidates.push(substation);
        }
        candidates.into_iter().any(|parent| {
            !doc.is_bus_bar(parent) && element_rect(doc, parent).is_some_and(|r| r.contains(rect))
        })
    })
}

/// Whether `element` may be resized to `w` by `h` in place.
///
/// A size that was already unplaceable may stay unplaceable; only the
/// regression from a valid to an invalid footprint is rejected. Children
/// that would fall outside the new footprint also veto the resize.
#[must_use]
pub fn can_resize_to(doc: &Document, substation: NodeId, element: NodeId, w: f64, h: f64) -> bool {
    let Some(node) = doc.get(element) else {
        return false;
    };
    let tag = node.tag;
    let attrs = attributes_of(node);
    let Point { x, y } = attrs.pos;
    let (old_w, old_h) = attrs.dim;

    if !can_place_at(doc, substation, element, Rect::new(x, y, w, h))
        && can_place_at(doc, substation, element, Rect::new(x, y, old_w, old_h))
    {
        return false;
    }

    let new_rect = Rect::new(x, y, w, h);
    let lost_child = doc.children_of(element).iter().any(|&child| {
        let Some(child_node) = doc.get(child) else {
            return false;
        };
        let Some(parents) = parent_tags(child_node.tag) else {
            return false;
        };
        parents.contains(&tag) && !new_rect.contains(attributes_of(child_node).rect())
    });
    !lost_child
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::VERTICES_PRIV_TYPE;
    use crate::edit::Edit;

    struct Fixture {
        doc: Document,
        substation: NodeId,
        voltage_level: NodeId,
        bay: NodeId,
    }

    fn fixture() -> Fixture {
        let mut doc = Document::new();
        let substation = doc.create_with_attributes(
            Tag::Substation,
            [
                ("name", "S1".to_string()),
                ("w", "20".to_string()),
                ("h", "20".to_string()),
            ],
        );
        doc.add_root(substation);
        let voltage_level = doc.create_with_attributes(
            Tag::VoltageLevel,
            [
                ("name", "V1".to_string()),
                ("x", "1".to_string()),
                ("y", "1".to_string()),
                ("w", "10".to_string()),
                ("h", "10".to_string()),
            ],
        );
        let bay = doc.create_with_attributes(
            Tag::Bay,
            [
                ("name", "B1".to_string()),
                ("x", "2".to_string()),
                ("y", "2".to_string()),
                ("w", "6".to_string()),
                ("h", "6".to_string()),
            ],
        );
        doc.apply(&[
            Edit::insert(substation, voltage_level, None),
            Edit::insert(voltage_level, bay, None),
        ])
        .expect("apply");
        Fixture {
            doc,
            substation,
            voltage_level,
            bay,
        }
    }

    fn add_equipment(doc: &mut Document, bay: NodeId, name: &str, x: f64, y: f64) -> NodeId {
        let equipment = doc.create_with_attributes(
            Tag::ConductingEquipment,
            [
                ("name", name.to_string()),
                ("x", x.to_string()),
                ("y", y.to_string()),
            ],
        );
        doc.apply(&[Edit::insert(bay, equipment, None)]).expect("apply");
        equipment
    }

    #[test]
    fn equipment_needs_a_containing_bay() {
        let Fixture {
            mut doc,
            substation,
            bay,
            ..
        } = fixture();
        let equipment = add_equipment(&mut doc, bay, "DIS1", 2.0, 2.0);

        assert!(can_place_at(
            &doc,
            substation,
            equipment,
            Rect::new(3.0, 3.0, 1.0, 1.0)
        ));
        // Outside every bay.
        assert!(!can_place_at(
            &doc,
            substation,
            equipment,
            Rect::new(15.0, 15.0, 1.0, 1.0)
        ));
        // Substations place anywhere.
        assert!(can_place_at(
            &doc,
            substation,
            substation,
            Rect::new(50.0, 50.0, 5.0, 5.0)
        ));
    }

    #[test]
    fn overlapping_siblings_block_placement() {
        let Fixture {
            mut doc,
            substation,
            bay,
            ..
        } = fixture();
        let first = add_equipment(&mut doc, bay, "DIS1", 3.0, 3.0);
        let second = add_equipment(&mut doc, bay, "DIS2", 5.0, 5.0);

        assert!(!can_place_at(
            &doc,
            substation,
            second,
            Rect::new(3.0, 3.0, 1.0, 1.0)
        ));
        // Edge-touching placement is fine.
        assert!(can_place_at(
            &doc,
            substation,
            second,
            Rect::new(4.0, 3.0, 1.0, 1.0)
        ));
        // The element never collides with itself.
        assert!(can_place_at(
            &doc,
            substation,
            first,
            Rect::new(3.0, 3.0, 1.0, 1.0)
        ));
    }

    #[test]
    fn busbars_are_exempt_from_overlap() {
        let Fixture {
            mut doc,
            substation,
            voltage_level,
            bay,
        } = fixture();
        let busbar = doc.create_with_attributes(
            Tag::Bay,
            [
                ("name", "BB1".to_string()),
                ("x", "2".to_string()),
                ("y", "9".to_string()),
                ("w", "6".to_string()),
            ],
        );
        let cnode = doc.create_element(Tag::ConnectivityNode);
        let private =
            doc.create_with_attributes(Tag::Private, [("type", VERTICES_PRIV_TYPE.to_string())]);
        let section = doc.create_with_attributes(Tag::Section, [("bus", "true".to_string())]);
        doc.apply(&[
            Edit::insert(voltage_level, busbar, None),
            Edit::insert(busbar, cnode, None),
            Edit::insert(cnode, private, None),
            Edit::insert(private, section, None),
        ])
        .expect("apply");

        // A busbar may cross the regular bay.
        assert!(can_place_at(
            &doc,
            substation,
            busbar,
            Rect::new(2.0, 4.0, 6.0, 1.0)
        ));
        // And the busbar does not block the regular bay either.
        assert!(can_place_at(
            &doc,
            substation,
            bay,
            Rect::new(2.0, 4.0, 6.0, 6.0)
        ));
    }

    #[test]
    fn resize_keeps_children_inside() {
        let Fixture {
            mut doc,
            substation,
            bay,
            ..
        } = fixture();
        add_equipment(&mut doc, bay, "DIS1", 6.0, 6.0);

        assert!(can_resize_to(&doc, substation, bay, 5.0, 5.0));
        // Shrinking past the child loses it.
        assert!(!can_resize_to(&doc, substation, bay, 3.0, 3.0));
    }

    #[test]
    fn resize_from_invalid_footprint_is_not_a_regression() {
        let Fixture {
            mut doc,
            substation,
            bay,
            ..
        } = fixture();
        // Already sticking out of the voltage level.
        doc.set_attribute(bay, "w", Some("12"));
        assert!(!can_place_at(
            &doc,
            substation,
            bay,
            Rect::new(2.0, 2.0, 12.0, 6.0)
        ));

        assert!(can_resize_to(&doc, substation, bay, 11.0, 6.0));
        // Valid to invalid is rejected.
        doc.set_attribute(bay, "w", Some("6"));
        assert!(!can_resize_to(&doc, substation, bay, 12.0, 6.0));
    }
}
