//! Power transformer winding layout.
//!
//! Derives, per winding, the symbol center, the open connection ports,
//! grounded-neutral stubs and the auto/earthing arc from the transformer's
//! stored position, rotation and kind. Everything is recomputed on demand;
//! nothing here is persisted.

use std::collections::BTreeMap;

use crate::document::{Document, NodeId, Tag, TerminalName};
use crate::geometry::{attributes_of, Point, TransformerKind};

/// Winding symbol radius in grid units.
pub const WINDING_SIZE: f64 = 0.7;

/// Cubic arc decorating auto and regular winding symbols.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arc {
    /// Arc start point.
    pub from: Point,
    /// Control point for the start.
    pub from_ctl: Point,
    /// Arc end point.
    pub to: Point,
    /// Control point for the end.
    pub to_ctl: Point,
}

/// Derived geometry of one transformer winding.
#[derive(Debug, Clone, PartialEq)]
pub struct WindingLayout {
    /// Center of the winding circle.
    pub center: Point,
    /// Circle radius.
    pub size: f64,
    /// Open ports by name: connection points not yet occupied.
    pub terminals: BTreeMap<TerminalName, Point>,
    /// Grounded neutral stubs: marker tip and attachment point.
    pub grounded: BTreeMap<TerminalName, (Point, Point)>,
    /// Decorating arc, when the configuration calls for one.
    pub arc: Option<Arc>,
    /// Whether the winding carries a tap changer.
    pub tap_changer: bool,
}

/// Layout for `winding`, with the transformer drawn at `transformer_pos`
/// (its rendered top-left corner, which during a drag differs from the
/// stored one).
///
/// Returns `None` when `winding` is not a winding of a transformer with
/// one to three windings.
#[must_use]
pub fn winding_layout(
    doc: &Document,
    winding: NodeId,
    transformer_pos: Point,
) -> Option<WindingLayout> {
    let transformer = doc.parent_of(winding)?;
    let transformer_node = doc.get(transformer)?;
    if transformer_node.tag != Tag::PowerTransformer
        || doc.get(winding)?.tag != Tag::TransformerWinding
    {
        return None;
    }

    let mut windings = doc.children_with_tag(transformer, Tag::TransformerWinding);
    windings.sort_by(|&a, &b| {
        doc.name_of(a)
            .unwrap_or_default()
            .cmp(doc.name_of(b).unwrap_or_default())
    });
    let winding_index = windings.iter().position(|&w| w == winding)?;
    if windings.is_empty() || windings.len() > 3 {
        return None;
    }

    let attrs = attributes_of(transformer_node);
    let rot = attrs.rot.index();
    let kind = attrs.kind;
    let size = WINDING_SIZE;

    let shift = |point: Point, coord: u8, amount: f64| -> Point {
        let mut p = [point.x, point.y];
        if coord == 0 {
            p[rot % 2] += if rot < 2 { amount } else { -amount };
        } else {
            p[(rot + 1) % 2] += if rot > 0 && rot < 3 { -amount } else { amount };
        }
        Point::new(p[0], p[1])
    };

    let mut center = Point::new(transformer_pos.x + 0.5, transformer_pos.y + 0.5);
    let mut terminals = BTreeMap::new();
    let mut grounded = BTreeMap::new();
    let mut arc = None;

    let winding_terminals = doc.children_with_tag(winding, Tag::Terminal);
    let terminal1 = winding_terminals
        .iter()
        .copied()
        .find(|&t| doc.name_of(t) == Some("T1"));
    let terminal2 = winding_terminals
        .iter()
        .copied()
        .find(|&t| doc.name_of(t) != Some("T1"));
    let neutral = doc
        .children_with_tag(winding, Tag::NeutralPoint)
        .first()
        .copied();
    let neutral_grounded =
        |n: NodeId| doc.attr(n, "cNodeName") == Some("grounded");

    // Grounded stub for a single neutral hanging off `n1`, shifted by
    // `(coord, amount)` towards the marker.
    let single_neutral = |terminals: &mut BTreeMap<TerminalName, Point>,
                              grounded: &mut BTreeMap<TerminalName, (Point, Point)>,
                              n1: Point,
                              coord: u8,
                              amount: f64| {
        match neutral {
            None => {
                terminals.insert(TerminalName::N1, n1);
            }
            Some(n) if neutral_grounded(n) => {
                grounded.insert(TerminalName::N1, (shift(n1, coord, amount), n1));
            }
            Some(_) => {}
        }
    };
    // Two neutral slots on opposite sides; a present grounded neutral
    // claims the slot matching its own name.
    let double_neutral = |terminals: &mut BTreeMap<TerminalName, Point>,
                              grounded: &mut BTreeMap<TerminalName, (Point, Point)>,
                              n1: Point,
                              n2: Point| {
        match neutral {
            None => {
                terminals.insert(TerminalName::N1, n1);
                terminals.insert(TerminalName::N2, n2);
            }
            Some(n) if neutral_grounded(n) => {
                if doc.name_of(n) == Some("N1") {
                    grounded.insert(TerminalName::N1, (shift(n1, 0, -0.2), n1));
                } else {
                    grounded.insert(TerminalName::N2, (shift(n2, 0, 0.2), n2));
                }
            }
            Some(_) => {}
        }
    };

    match windings.len() {
        1 => {
            if kind == TransformerKind::Earthing {
                let n1 = shift(center, 1, size);
                single_neutral(&mut terminals, &mut grounded, n1, 1, 0.2);
                if terminal1.is_none() && terminal2.is_none() {
                    terminals.insert(TerminalName::T1, shift(center, 1, -size));
                }
            } else {
                let n1 = shift(center, 0, -size);
                let n2 = shift(center, 0, size);
                let t1 = shift(center, 1, -size - 0.5);
                let t2 = shift(center, 1, size);
                double_neutral(&mut terminals, &mut grounded, n1, n2);
                arc = Some(Arc {
                    from: n2,
                    from_ctl: shift(n2, 1, -1.0),
                    to: t1,
                    to_ctl: shift(shift(t1, 0, 0.2), 1, 0.1),
                });
                if terminal1.is_none() {
                    terminals.insert(TerminalName::T1, t1);
                }
                if terminal2.is_none() {
                    terminals.insert(TerminalName::T2, t2);
                }
            }
        }
        2 => {
            if winding_index == 1 {
                center = shift(center, 1, 1.0);
            }
            match kind {
                TransformerKind::Auto => {
                    if winding_index == 1 {
                        let n1 = shift(center, 0, -size);
                        let n2 = shift(center, 0, size);
                        double_neutral(&mut terminals, &mut grounded, n1, n2);
                        if terminal1.is_none() && terminal2.is_none() {
                            terminals.insert(TerminalName::T1, shift(center, 1, size));
                        }
                    } else {
                        let t1 = shift(center, 0, size);
                        let t2 = shift(center, 0, -size - 0.5);
                        let n1 = shift(center, 1, -size);
                        arc = Some(Arc {
                            from: n1,
                            from_ctl: shift(n1, 0, -1.0),
                            to: t2,
                            to_ctl: shift(shift(t2, 1, -0.2), 0, 0.1),
                        });
                        if terminal1.is_none() {
                            terminals.insert(TerminalName::T1, t1);
                        }
                        if terminal2.is_none() {
                            terminals.insert(TerminalName::T2, t2);
                        }
                        single_neutral(&mut terminals, &mut grounded, n1, 1, -0.2);
                    }
                }
                TransformerKind::Earthing => {
                    if winding_index == 1 {
                        if terminal1.is_none() && terminal2.is_none() {
                            terminals.insert(TerminalName::T1, shift(center, 1, size));
                        }
                    } else {
                        if terminal1.is_none() && terminal2.is_none() {
                            terminals.insert(TerminalName::T1, shift(center, 0, -size));
                        }
                        let n1 = shift(center, 0, size);
                        single_neutral(&mut terminals, &mut grounded, n1, 0, 0.2);
                    }
                }
                TransformerKind::Default => {
                    let n1 = shift(center, 0, -size);
                    let n2 = shift(center, 0, size);
                    double_neutral(&mut terminals, &mut grounded, n1, n2);
                    if terminal1.is_none() && terminal2.is_none() {
                        let amount = if winding_index == 1 { size } else { -size };
                        terminals.insert(TerminalName::T1, shift(center, 1, amount));
                    }
                }
            }
        }
        3 => match winding_index {
            0 => {
                if terminal1.is_none() && terminal2.is_none() {
                    terminals.insert(TerminalName::T1, shift(center, 1, -size));
                }
                let n1 = shift(center, 0, -size);
                let n2 = shift(center, 0, size);
                double_neutral(&mut terminals, &mut grounded, n1, n2);
            }
            1 | 2 => {
                let sideways = if winding_index == 1 { 0.5 } else { -0.5 };
                center = shift(shift(center, 0, sideways), 1, 1.0);
                if terminal1.is_none() && terminal2.is_none() {
                    let amount = if winding_index == 1 { size } else { -size };
                    terminals.insert(TerminalName::T1, shift(center, 0, amount));
                }
                let n1 = shift(center, 1, size);
                single_neutral(&mut terminals, &mut grounded, n1, 1, 0.2);
            }
            _ => unreachable!(),
        },
        _ => return None,
    }

    Some(WindingLayout {
        center,
        size,
        terminals,
        grounded,
        arc,
        tap_changer: !doc.descendants_with_tag(winding, Tag::TapChanger).is_empty(),
    })
}
