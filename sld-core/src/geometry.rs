//! Geometry model: the attribute convention on diagram elements and the
//! rectangle arithmetic behind containment and overlap checks.
//!
//! All reads go through [`attributes_of`], which decodes the stored string
//! attributes into a typed [`Attrs`] record exactly once per use. Decoding
//! never fails: absent or malformed values fall back to documented defaults
//! and are clamped into their valid ranges.

use serde::{Deserialize, Serialize};

use crate::document::{xml_boolean, Node};

/// A 2D point on the diagram grid. Half-grid values are exact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate in grid units.
    pub x: f64,
    /// Y coordinate in grid units.
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle in grid units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub w: f64,
    /// Height.
    pub h: f64,
}

impl Rect {
    /// Create a new rectangle.
    #[must_use]
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Whether `inner` lies fully inside this rectangle (edges included).
    #[must_use]
    pub fn contains(&self, inner: Rect) -> bool {
        self.x <= inner.x
            && self.y <= inner.y
            && self.x + self.w >= inner.x + inner.w
            && self.y + self.h >= inner.y + inner.h
    }

    /// Whether the two rectangles intersect with nonzero area.
    /// Edge-touching rectangles do not overlap.
    #[must_use]
    pub fn overlaps(&self, other: Rect) -> bool {
        if self.x >= other.x + other.w || other.x >= self.x + self.w {
            return false;
        }
        if self.y >= other.y + other.h || other.y >= self.y + self.h {
            return false;
        }
        true
    }
}

/// Orientation in quarter turns, always normalized into `[0, 3]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum Rot {
    #[default]
    R0,
    R1,
    R2,
    R3,
}

impl Rot {
    /// Normalize a raw quarter-turn count; negative values wrap around
    /// (`-1` becomes [`Rot::R3`], `5` becomes [`Rot::R1`]).
    #[must_use]
    pub fn from_raw(raw: i64) -> Self {
        match raw.rem_euclid(4) {
            0 => Self::R0,
            1 => Self::R1,
            2 => Self::R2,
            _ => Self::R3,
        }
    }

    /// Quarter-turn count in `0..=3`.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::R0 => 0,
            Self::R1 => 1,
            Self::R2 => 2,
            Self::R3 => 3,
        }
    }

    /// Rotation angle in degrees.
    #[must_use]
    pub fn degrees(self) -> f64 {
        match self {
            Self::R0 => 0.0,
            Self::R1 => 90.0,
            Self::R2 => 180.0,
            Self::R3 => 270.0,
        }
    }

    /// One further quarter turn clockwise.
    #[must_use]
    pub fn turned(self) -> Self {
        match self {
            Self::R0 => Self::R1,
            Self::R1 => Self::R2,
            Self::R2 => Self::R3,
            Self::R3 => Self::R0,
        }
    }
}

/// Electrical configuration of a power transformer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformerKind {
    /// Regular transformer.
    #[default]
    Default,
    /// Autotransformer.
    Auto,
    /// Grounding (earthing) transformer.
    Earthing,
}

impl TransformerKind {
    /// Decode the `kind` attribute; unknown values fall back to `Default`.
    #[must_use]
    pub fn from_attr(value: Option<&str>) -> Self {
        match value {
            Some("auto") => Self::Auto,
            Some("earthing") => Self::Earthing,
            _ => Self::Default,
        }
    }

    /// The attribute value this kind is stored as.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Auto => "auto",
            Self::Earthing => "earthing",
        }
    }
}

/// Decoded geometry attributes of a diagram element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Attrs {
    /// Position in grid units, clamped to be non-negative.
    pub pos: Point,
    /// Dimension in grid units, clamped to at least 1x1.
    pub dim: (f64, f64),
    /// Label offset in half-grid units, clamped to be non-negative.
    pub label: Point,
    /// Mirrored rendering.
    pub flip: bool,
    /// Orientation in quarter turns.
    pub rot: Rot,
    /// Whether this element carries a `bus` marker (sections only).
    pub bus: bool,
    /// Transformer kind.
    pub kind: TransformerKind,
}

impl Attrs {
    /// The element's bounding rectangle.
    #[must_use]
    pub fn rect(&self) -> Rect {
        Rect::new(self.pos.x, self.pos.y, self.dim.0, self.dim.1)
    }
}

fn numeric(node: &Node, name: &str) -> f64 {
    node.attribute(name)
        .and_then(|v| v.trim().parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Decode the geometry attributes of an element.
///
/// Never fails: missing or malformed attributes yield the defaults
/// (position, rotation and label `0`, dimension `1`, kind `default`).
#[must_use]
pub fn attributes_of(node: &Node) -> Attrs {
    let pos = Point::new(numeric(node, "x").max(0.0), numeric(node, "y").max(0.0));
    let dim = (numeric(node, "w").max(1.0), numeric(node, "h").max(1.0));
    let label = Point::new(numeric(node, "lx").max(0.0), numeric(node, "ly").max(0.0));

    #[allow(clippy::cast_possible_truncation)]
    let rot = Rot::from_raw(numeric(node, "rot") as i64);

    Attrs {
        pos,
        dim,
        label,
        flip: xml_boolean(node.attribute("flip")),
        rot,
        bus: xml_boolean(node.attribute("bus")),
        kind: TransformerKind::from_attr(node.attribute("kind")),
    }
}

/// The two anchor points of a connection leaving a terminal: the point on
/// the equipment symbol and the point one half step out on the grid edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectionAnchor {
    /// Point on the symbol where the wire attaches.
    pub close: Point,
    /// Point on the cell edge where routing starts.
    pub far: Point,
}

/// Connection anchors for both terminals of a piece of equipment, derived
/// from its position and rotation.
#[must_use]
pub fn connection_start_points(attrs: &Attrs) -> [ConnectionAnchor; 2] {
    let Point { x, y } = attrs.pos;
    let rot = attrs.rot.index();

    let t1_close = [
        Point::new(x + 0.5, y + 0.16),
        Point::new(x + 0.84, y + 0.5),
        Point::new(x + 0.5, y + 0.84),
        Point::new(x + 0.16, y + 0.5),
    ][rot];
    let t1_far = [
        Point::new(x + 0.5, y),
        Point::new(x + 1.0, y + 0.5),
        Point::new(x + 0.5, y + 1.0),
        Point::new(x, y + 0.5),
    ][rot];
    let t2_close = [
        Point::new(x + 0.5, y + 0.84),
        Point::new(x + 0.16, y + 0.5),
        Point::new(x + 0.5, y + 0.16),
        Point::new(x + 0.84, y + 0.5),
    ][rot];
    let t2_far = [
        Point::new(x + 0.5, y + 1.0),
        Point::new(x, y + 0.5),
        Point::new(x + 0.5, y),
        Point::new(x + 1.0, y + 0.5),
    ][rot];

    [
        ConnectionAnchor {
            close: t1_close,
            far: t1_far,
        },
        ConnectionAnchor {
            close: t2_close,
            far: t2_far,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, Tag};

    #[test]
    fn rot_normalizes_out_of_range_values() {
        assert_eq!(Rot::from_raw(-1), Rot::R3);
        assert_eq!(Rot::from_raw(5), Rot::R1);
        assert_eq!(Rot::from_raw(0), Rot::R0);
        assert_eq!(Rot::from_raw(-4), Rot::R0);
    }

    #[test]
    fn turning_wraps_and_degrees_scale() {
        assert_eq!(Rot::R0.turned(), Rot::R1);
        assert_eq!(Rot::R3.turned(), Rot::R0);
        assert_eq!(Rot::R0.degrees(), 0.0);
        assert_eq!(Rot::R1.degrees(), 90.0);
        assert_eq!(Rot::R3.degrees(), 270.0);
    }

    #[test]
    fn contains_and_overlaps_are_exact() {
        assert!(Rect::new(0.0, 0.0, 4.0, 4.0).contains(Rect::new(1.0, 1.0, 2.0, 2.0)));
        assert!(!Rect::new(0.0, 0.0, 4.0, 4.0).contains(Rect::new(3.0, 3.0, 2.0, 2.0)));
        // Edge-touching is not overlap.
        assert!(!Rect::new(0.0, 0.0, 2.0, 2.0).overlaps(Rect::new(2.0, 2.0, 2.0, 2.0)));
        assert!(Rect::new(0.0, 0.0, 2.0, 2.0).overlaps(Rect::new(1.0, 1.0, 2.0, 2.0)));
    }

    #[test]
    fn attributes_default_and_clamp() {
        let mut doc = Document::new();
        let id = doc.create_element(Tag::ConductingEquipment);
        let attrs = attributes_of(doc.get(id).expect("node"));
        assert_eq!(attrs.pos, Point::new(0.0, 0.0));
        assert_eq!(attrs.dim, (1.0, 1.0));
        assert_eq!(attrs.rot, Rot::R0);
        assert_eq!(attrs.kind, TransformerKind::Default);
        assert!(!attrs.flip);

        doc.set_attribute(id, "x", Some("-3"));
        doc.set_attribute(id, "w", Some("0"));
        doc.set_attribute(id, "rot", Some("-1"));
        doc.set_attribute(id, "kind", Some("bogus"));
        let attrs = attributes_of(doc.get(id).expect("node"));
        assert_eq!(attrs.pos.x, 0.0);
        assert_eq!(attrs.dim.0, 1.0);
        assert_eq!(attrs.rot, Rot::R3);
        assert_eq!(attrs.kind, TransformerKind::Default);
    }

    #[test]
    fn connection_anchors_follow_rotation() {
        let mut doc = Document::new();
        let id = doc.create_with_attributes(
            Tag::ConductingEquipment,
            [("x", "2".to_string()), ("y", "3".to_string())],
        );
        let attrs = attributes_of(doc.get(id).expect("node"));
        let [t1, t2] = connection_start_points(&attrs);
        assert_eq!(t1.far, Point::new(2.5, 3.0));
        assert_eq!(t2.far, Point::new(2.5, 4.0));

        doc.set_attribute(id, "rot", Some("1"));
        let attrs = attributes_of(doc.get(id).expect("node"));
        let [t1, t2] = connection_start_points(&attrs);
        assert_eq!(t1.far, Point::new(3.0, 3.5));
        assert_eq!(t2.far, Point::new(2.0, 3.5));
    }
}
