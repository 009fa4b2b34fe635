//! # SLD Core
//!
//! Core engine for an interactive single-line-diagram editor of
//! electrical substations. Hosts render the diagram and feed pointer
//! input; this crate owns the model and answers with edit lists.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                  sld-core                   │
//! ├─────────────────────────────────────────────┤
//! │  Document        │  Interaction             │
//! │  - Arena tree    │  - State machine         │
//! │  - Edit apply    │  - Pointer snapping      │
//! │  - Connectivity  │  - Commit requests       │
//! ├─────────────────────────────────────────────┤
//! │  Validation      │  Synthesis               │
//! │  - Placement     │  - Wiring and terminals  │
//! │  - Resize        │  - Cascading removal     │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
// Grid coordinates are exact half-grid values; equality is intentional.
#![allow(clippy::float_cmp)]
#![allow(clippy::many_single_char_names)]

pub mod connectivity;
pub mod document;
pub mod edit;
pub mod error;
pub mod geometry;
pub mod interaction;
pub mod path;
pub mod placement;
pub mod synthesis;
pub mod transformer;

pub use document::{ConnectivityIndex, Document, Node, NodeId, Tag, TerminalName};
pub use edit::Edit;
pub use error::{SldError, SldResult};
pub use geometry::{attributes_of, Attrs, Point, Rect, Rot, TransformerKind};
pub use interaction::{
    Candidate, ConnectTarget, Connection, Editor, Interaction, InteractionRequest,
};
pub use placement::{can_place_at, can_resize_to};
pub use synthesis::synthesize;
pub use transformer::{winding_layout, WindingLayout};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
