//! Interaction state machine.
//!
//! [`Editor`] tracks exactly one active interaction at a time plus the
//! pointer state it is driven by. Commits never mutate the document: a
//! successful commit returns an [`InteractionRequest`] command value for
//! the host to route into the edit synthesizer and apply through its sink.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::{is_single_terminal, xml_boolean, Document, NodeId, Tag, TerminalName};
use crate::geometry::{attributes_of, connection_start_points, Point, Rect};
use crate::path::{clean_path, find_intersection};
use crate::placement::{can_place_at, can_resize_to};

/// The mutually exclusive interaction states.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Interaction {
    /// No interaction in progress.
    #[default]
    Idle,
    /// Placing (moving or inserting) an element; the pointer drives the
    /// candidate position.
    Placing(NodeId),
    /// Resizing an element; the pointer drives the candidate dimension.
    Resizing(NodeId),
    /// Moving an element's label on the half-grid.
    PlacingLabel(NodeId),
    /// Drawing a connection from a terminal along a rectilinear path.
    Connecting {
        /// Source equipment or winding.
        from: NodeId,
        /// Name of the source connection point.
        from_terminal: TerminalName,
        /// Path drawn so far, terminal point first.
        path: Vec<Point>,
    },
}

/// A committed interaction, for the host to synthesize edits from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InteractionRequest {
    /// Place `element` under `parent` at the given grid position.
    Place {
        /// Element being placed.
        element: NodeId,
        /// Resolved target container.
        parent: NodeId,
        /// Target x in grid units.
        x: f64,
        /// Target y in grid units.
        y: f64,
    },
    /// Resize `element` to the given dimension.
    Resize {
        /// Element being resized.
        element: NodeId,
        /// New width.
        w: f64,
        /// New height.
        h: f64,
    },
    /// Move `element`'s label to the given half-grid offset.
    PlaceLabel {
        /// Element whose label moves.
        element: NodeId,
        /// New label x.
        x: f64,
        /// New label y.
        y: f64,
    },
    /// Turn `element` one quarter turn clockwise.
    Rotate {
        /// Element to rotate.
        element: NodeId,
    },
    /// Complete a drawn connection.
    Connect(Connection),
}

/// A completed connection: source, full rectilinear path and target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    /// Source equipment or winding.
    pub from: NodeId,
    /// Source connection point name.
    pub from_terminal: TerminalName,
    /// Full path from source terminal to target.
    pub path: Vec<Point>,
    /// Connection target.
    pub to: ConnectTarget,
}

/// What a connection ends on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ConnectTarget {
    /// An open terminal slot of another piece of equipment.
    Terminal {
        /// Target equipment.
        equipment: NodeId,
        /// Terminal slot to create.
        terminal: TerminalName,
    },
    /// An existing connectivity node (busbar or junction).
    Node(NodeId),
}

/// Candidate geometry derived from the pointer for the active interaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// Proposed rectangle.
    pub rect: Rect,
    /// Whether committing it would pass validation.
    pub valid: bool,
}

/// Pending last legs of a connection under the pointer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingConnection {
    /// Corner completing the rectilinear last leg.
    pub elbow: Point,
    /// Point the connection would snap to.
    pub snap: Point,
    /// Attachment point on the target symbol (equals `snap` without one).
    pub close: Point,
    /// Open terminal the pointer is over, if any.
    pub target: Option<(NodeId, TerminalName)>,
}

/// Proposed busbar extension while resizing a busbar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BusBarResize {
    /// Bus section whose end vertex moves.
    pub section: NodeId,
    /// The end vertex.
    pub vertex: NodeId,
    /// Proposed vertex position.
    pub pos: Point,
}

/// Pointer and interaction state of one diagram editor.
#[derive(Debug, Clone, Default)]
pub struct Editor {
    interaction: Interaction,
    /// Pointer cell on the integer grid (floored).
    mouse: Point,
    /// Pointer on the half-grid (rounded).
    mouse2: Point,
    menu_open: bool,
}

impl Editor {
    /// Create an idle editor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current interaction.
    #[must_use]
    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    /// Whether no interaction is in progress.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.interaction == Interaction::Idle
    }

    /// Pointer cell on the integer grid.
    #[must_use]
    pub fn mouse(&self) -> Point {
        self.mouse
    }

    /// Pointer position on the half-grid.
    #[must_use]
    pub fn mouse_half(&self) -> Point {
        self.mouse2
    }

    /// Update the pointer from raw diagram coordinates.
    pub fn pointer_moved(&mut self, x: f64, y: f64) {
        let (x, y) = (x.max(0.0), y.max(0.0));
        self.mouse = Point::new(x.floor(), y.floor());
        self.mouse2 = Point::new((x * 2.0).round() / 2.0, (y * 2.0).round() / 2.0);
    }

    /// Request a context menu. Swallowed (returns `false`) while any
    /// interaction is active or another menu is open.
    pub fn open_menu(&mut self) -> bool {
        if self.is_idle() && !self.menu_open {
            self.menu_open = true;
            true
        } else {
            false
        }
    }

    /// Close the context menu.
    pub fn close_menu(&mut self) {
        self.menu_open = false;
    }

    /// Whether a menu is open.
    #[must_use]
    pub fn menu_open(&self) -> bool {
        self.menu_open
    }

    /// Begin placing `element` (an attached element or a staged copy).
    pub fn start_place(&mut self, element: NodeId) {
        debug!(%element, "start placing");
        self.menu_open = false;
        self.interaction = Interaction::Placing(element);
    }

    /// Begin resizing `element`.
    pub fn start_resize(&mut self, element: NodeId) {
        debug!(%element, "start resizing");
        self.menu_open = false;
        self.interaction = Interaction::Resizing(element);
    }

    /// Begin moving `element`'s label.
    pub fn start_place_label(&mut self, element: NodeId) {
        debug!(%element, "start placing label");
        self.menu_open = false;
        self.interaction = Interaction::PlacingLabel(element);
    }

    /// Begin drawing a connection from a terminal; `start` holds the
    /// attachment point and the grid-edge point it leaves through.
    pub fn start_connect(&mut self, from: NodeId, from_terminal: TerminalName, start: [Point; 2]) {
        debug!(%from, terminal = %from_terminal, "start connecting");
        self.menu_open = false;
        self.interaction = Interaction::Connecting {
            from,
            from_terminal,
            path: start.to_vec(),
        };
    }

    /// Cancel the active interaction without emitting anything.
    pub fn cancel(&mut self) {
        if !self.is_idle() {
            debug!("interaction cancelled");
        }
        self.interaction = Interaction::Idle;
    }

    /// Candidate placement rectangle for the element being placed.
    #[must_use]
    pub fn place_candidate(&self, doc: &Document, substation: NodeId) -> Option<Candidate> {
        let Interaction::Placing(element) = self.interaction else {
            return None;
        };
        let (w, h) = attributes_of(doc.get(element)?).dim;
        let rect = Rect::new(self.mouse.x, self.mouse.y, w, h);
        Some(Candidate {
            rect,
            valid: can_place_at(doc, substation, element, rect),
        })
    }

    /// Candidate dimension for the element being resized (not busbars,
    /// which resize through [`Editor::busbar_resize_candidate`]).
    #[must_use]
    pub fn resize_candidate(&self, doc: &Document, substation: NodeId) -> Option<Candidate> {
        let Interaction::Resizing(element) = self.interaction else {
            return None;
        };
        if doc.is_bus_bar(element) {
            return None;
        }
        let Point { x, y } = attributes_of(doc.get(element)?).pos;
        let w = (self.mouse.x - x + 1.0).max(1.0);
        let h = (self.mouse.y - y + 1.0).max(1.0);
        Some(Candidate {
            rect: Rect::new(x, y, w, h),
            valid: can_resize_to(doc, substation, element, w, h),
        })
    }

    /// Proposed end-vertex move for a busbar being resized: the axis with
    /// the larger pointer delta wins, clamped to the parent voltage level;
    /// a degenerate (zero-length) proposal is bumped one cell.
    #[must_use]
    pub fn busbar_resize_candidate(&self, doc: &Document, busbar: NodeId) -> Option<BusBarResize> {
        let Interaction::Resizing(resizing) = self.interaction else {
            return None;
        };
        if resizing != busbar || !doc.is_bus_bar(busbar) {
            return None;
        }
        let cnode = doc
            .descendants_with_tag(busbar, Tag::ConnectivityNode)
            .first()
            .copied()?;
        let private = doc.vertices_private(cnode)?;
        let section = doc
            .descendants_with_tag(private, Tag::Section)
            .into_iter()
            .find(|&s| xml_boolean(doc.attr(s, "bus")))?;
        let vertices = doc.children_of(section);
        let first = vertices.first().copied()?;
        let vertex = vertices.last().copied()?;
        let origin = attributes_of(doc.get(first)?).pos;

        let voltage_level = doc.parent_of(busbar)?;
        let vl = attributes_of(doc.get(voltage_level)?);
        let max_x = vl.pos.x + vl.dim.0 - 0.5;
        let max_y = vl.pos.y + vl.dim.1 - 0.5;

        let dx = (self.mouse.x - origin.x).max(0.0);
        let dy = (self.mouse.y - origin.y).max(0.0);
        let mut pos = if dx > dy {
            Point::new(origin.x.max((self.mouse.x + 0.5).min(max_x)), origin.y)
        } else {
            Point::new(origin.x, origin.y.max((self.mouse.y + 0.5).min(max_y)))
        };
        if pos == origin {
            if pos.x >= max_x {
                pos.y += 1.0;
            } else {
                pos.x += 1.0;
            }
        }
        Some(BusBarResize {
            section,
            vertex,
            pos,
        })
    }

    /// Commit the active placement at the pointer cell.
    ///
    /// Resolves the target container by element kind; returns `None` (and
    /// stays placing) when no suitable container exists or validation
    /// fails.
    pub fn commit_place(&mut self, doc: &Document, substation: NodeId) -> Option<InteractionRequest> {
        let Interaction::Placing(element) = self.interaction else {
            return None;
        };
        let node = doc.get(element)?;
        let tag = node.tag;
        let attrs = attributes_of(node);
        let (x, y) = (self.mouse.x, self.mouse.y);
        let rect = Rect::new(x, y, attrs.dim.0, attrs.dim.1);
        let cell = Rect::new(x, y, 1.0, 1.0);

        let contains = |id: NodeId, r: Rect| {
            doc.get(id)
                .is_some_and(|n| attributes_of(n).rect().contains(r))
        };
        let parent = match tag {
            Tag::VoltageLevel => Some(substation),
            Tag::Bay => doc
                .children_with_tag(substation, Tag::VoltageLevel)
                .into_iter()
                .find(|&vl| contains(vl, rect)),
            Tag::ConductingEquipment => doc
                .descendants_with_tag(substation, Tag::Bay)
                .into_iter()
                .find(|&bay| !doc.is_bus_bar(bay) && contains(bay, cell)),
            Tag::PowerTransformer => {
                let voltage_levels = doc.children_with_tag(substation, Tag::VoltageLevel);
                voltage_levels
                    .iter()
                    .flat_map(|&vl| doc.children_with_tag(vl, Tag::Bay))
                    .find(|&bay| contains(bay, cell))
                    .or_else(|| {
                        voltage_levels
                            .iter()
                            .copied()
                            .find(|&vl| contains(vl, cell))
                    })
                    .or(Some(substation))
            }
            _ => None,
        }?;

        let validated = match tag {
            Tag::PowerTransformer => true,
            Tag::Bay if doc.is_bus_bar(element) => true,
            _ => can_place_at(doc, substation, element, rect),
        };
        if !validated {
            return None;
        }
        debug!(%element, %parent, x, y, "place committed");
        self.interaction = Interaction::Idle;
        Some(InteractionRequest::Place {
            element,
            parent,
            x,
            y,
        })
    }

    /// Commit the active resize at the pointer.
    ///
    /// Regular elements commit a `Resize`; a busbar commits the move of
    /// its end vertex as a `Place` into its bus section.
    pub fn commit_resize(
        &mut self,
        doc: &Document,
        substation: NodeId,
    ) -> Option<InteractionRequest> {
        let Interaction::Resizing(element) = self.interaction else {
            return None;
        };
        if doc.is_bus_bar(element) {
            let candidate = self.busbar_resize_candidate(doc, element)?;
            debug!(%element, "busbar resize committed");
            self.interaction = Interaction::Idle;
            return Some(InteractionRequest::Place {
                element: candidate.vertex,
                parent: candidate.section,
                x: candidate.pos.x,
                y: candidate.pos.y,
            });
        }
        let candidate = self.resize_candidate(doc, substation)?;
        if !candidate.valid {
            return None;
        }
        debug!(%element, w = candidate.rect.w, h = candidate.rect.h, "resize committed");
        self.interaction = Interaction::Idle;
        Some(InteractionRequest::Resize {
            element,
            w: candidate.rect.w,
            h: candidate.rect.h,
        })
    }

    /// Commit the active label placement at the pointer.
    pub fn commit_place_label(&mut self) -> Option<InteractionRequest> {
        let Interaction::PlacingLabel(element) = self.interaction else {
            return None;
        };
        self.interaction = Interaction::Idle;
        Some(InteractionRequest::PlaceLabel {
            element,
            x: self.mouse2.x - 0.5,
            y: self.mouse2.y + 0.5,
        })
    }

    /// Which terminal of `equipment` a new connection should bind to:
    /// `None` when both slots (or the only slot) are taken, the free slot
    /// when one is, else the slot on the rotated side nearer the pointer.
    #[must_use]
    pub fn nearest_open_terminal(
        &self,
        doc: &Document,
        equipment: Option<NodeId>,
    ) -> Option<TerminalName> {
        let equipment = equipment?;
        let terminals = doc.descendants_with_tag(equipment, Tag::Terminal);
        let top = terminals
            .iter()
            .any(|&t| doc.name_of(t) == Some("T1"));
        let bottom = terminals
            .iter()
            .any(|&t| doc.name_of(t) != Some("T1"));
        let one_sided = doc
            .attr(equipment, "type")
            .is_some_and(is_single_terminal);
        if top && bottom {
            return None;
        }
        if one_sided && (top || bottom) {
            return None;
        }
        if one_sided {
            return Some(TerminalName::T1);
        }
        if top {
            return Some(TerminalName::T2);
        }
        if bottom {
            return Some(TerminalName::T1);
        }

        let Point { x: mx, y: my } = self.mouse2;
        let attrs = attributes_of(doc.get(equipment)?);
        let Point { x, y } = attrs.pos;
        let t2 = match attrs.rot.index() {
            0 => my >= y + 0.5,
            1 => mx <= x + 0.5,
            2 => my <= y + 0.5,
            _ => mx >= x + 0.5,
        };
        Some(if t2 { TerminalName::T2 } else { TerminalName::T1 })
    }

    /// The pending last legs of the connection being drawn: the
    /// rectilinear elbow, the snap point (an open terminal of equipment
    /// under the pointer, or the half-grid pointer itself) and the symbol
    /// attachment point.
    #[must_use]
    pub fn pending_connection(
        &self,
        doc: &Document,
        substation: NodeId,
    ) -> Option<PendingConnection> {
        let Interaction::Connecting { from, path, .. } = &self.interaction else {
            return None;
        };
        let (&last, rest) = path.split_last()?;
        let &prev = rest.last()?;
        let vertical = prev.x == last.x;

        let mut snap = self.mouse2;
        let mut close = snap;
        let target_eq = doc
            .descendants_with_tag(substation, Tag::ConductingEquipment)
            .into_iter()
            .filter(|&eq| eq != *from)
            .find(|&eq| {
                doc.get(eq)
                    .is_some_and(|n| attributes_of(n).pos == self.mouse)
            });
        let to_terminal = self.nearest_open_terminal(doc, target_eq);
        let mut target = None;
        if let (Some(equipment), Some(terminal)) = (target_eq, to_terminal) {
            let anchors = connection_start_points(&attributes_of(doc.get(equipment)?));
            let anchor = anchors[usize::from(terminal == TerminalName::T2)];
            snap = anchor.far;
            close = anchor.close;
            target = Some((equipment, terminal));
        }

        let elbow = if vertical {
            Point::new(last.x, snap.y)
        } else {
            Point::new(snap.x, last.y)
        };
        Some(PendingConnection {
            elbow,
            snap,
            close,
            target,
        })
    }

    /// Click on the open grid while connecting: extends the path; commits
    /// a `Connect` when the pointer is over an open terminal.
    pub fn click_connect(
        &mut self,
        doc: &Document,
        substation: NodeId,
    ) -> Option<InteractionRequest> {
        let pending = self.pending_connection(doc, substation)?;
        let Interaction::Connecting {
            from,
            from_terminal,
            path,
        } = &mut self.interaction
        else {
            return None;
        };
        *path.last_mut()? = pending.elbow;
        path.push(pending.snap);
        path.push(pending.close);
        clean_path(path);
        let (equipment, terminal) = pending.target?;
        let request = InteractionRequest::Connect(Connection {
            from: *from,
            from_terminal: *from_terminal,
            path: path.clone(),
            to: ConnectTarget::Terminal {
                equipment,
                terminal,
            },
        });
        debug!(%equipment, terminal = %terminal, "connection committed");
        self.interaction = Interaction::Idle;
        Some(request)
    }

    /// Click on a drawn segment of a connectivity node while connecting:
    /// snaps onto the segment and commits a `Connect` to the node.
    ///
    /// A no-op when the source already occupies that node.
    pub fn click_connect_node(
        &mut self,
        doc: &Document,
        cnode: NodeId,
        segment: (Point, Point),
    ) -> Option<InteractionRequest> {
        let Interaction::Connecting { from, .. } = &self.interaction else {
            return None;
        };
        let source = doc
            .closest(*from, Tag::ConductingEquipment)
            .or_else(|| doc.closest(*from, Tag::PowerTransformer))?;
        let path_name = doc.attr(cnode, "pathName")?.to_string();
        let already_connected = [Tag::Terminal, Tag::NeutralPoint].iter().any(|&tag| {
            doc.descendants_with_tag(source, tag)
                .iter()
                .any(|&t| doc.attr(t, "connectivityNode") == Some(path_name.as_str()))
        });
        if already_connected {
            return None;
        }

        let mouse2 = self.mouse2;
        let Interaction::Connecting {
            from,
            from_terminal,
            path,
        } = &mut self.interaction
        else {
            return None;
        };
        let (&last, rest) = path.split_last()?;
        let &prev = rest.last()?;
        let vertical = prev.x == last.x;

        let mut snap = mouse2;
        let elbow = if vertical {
            Point::new(last.x, snap.y)
        } else {
            Point::new(snap.x, last.y)
        };
        let start = if elbow == snap { prev } else { elbow };
        snap = find_intersection(start, snap, segment.0, segment.1);
        let elbow = if vertical {
            Point::new(last.x, snap.y)
        } else {
            Point::new(snap.x, last.y)
        };

        *path.last_mut()? = elbow;
        path.push(snap);
        clean_path(path);
        let request = InteractionRequest::Connect(Connection {
            from: *from,
            from_terminal: *from_terminal,
            path: path.clone(),
            to: ConnectTarget::Node(cnode),
        });
        debug!(%cnode, "connection to node committed");
        self.interaction = Interaction::Idle;
        Some(request)
    }
}
