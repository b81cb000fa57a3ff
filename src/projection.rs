//! Renderer-agnostic projection of engine state.
//!
//! `project` maps an immutable graph snapshot, the latest metric samples,
//! and elapsed time to a flat list of draw descriptors. It performs no
//! mutation and may be called at any frequency; the host's rendering
//! backend (2D/3D canvas, terminal, anything) consumes the descriptors.
//! All presentation choices (position, color, emphasis) live here, never in
//! the graph store.

use serde::{Deserialize, Serialize};

use crate::clock::SimTime;
use crate::graph::{Edge, EdgeId, EdgeKind, GraphSnapshot, Node, NodeId, NodeKind};
use crate::metrics::ChannelSample;
use crate::scenario::LayoutRule;

/// RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Create a new color.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque color.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    // Entity palette.
    pub const TARGET: Self = Self::rgb(100, 149, 237);
    pub const ALIAS: Self = Self::rgb(72, 209, 204);
    pub const RESOURCE: Self = Self::rgb(255, 204, 0);
    pub const POINTER: Self = Self::rgb(169, 169, 169);
    pub const REFERENCE: Self = Self::rgb(0, 200, 83);
    pub const OWNER: Self = Self::rgb(255, 165, 0);
    pub const WEAK: Self = Self::rgb(186, 104, 200);
    pub const DANGLING: Self = Self::rgb(229, 57, 53);
    pub const DEAD: Self = Self::rgb(97, 97, 97);
    pub const GAUGE: Self = Self::rgb(224, 224, 224);
}

/// What the renderer should draw for an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    /// A node box.
    Box,
    /// A node that represents a resource.
    Cylinder,
    /// A directed edge arrow.
    Arrow,
    /// A metric gauge.
    Gauge,
}

/// Visual emphasis, derived from validity/liveness and safety context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emphasis {
    /// Routine display.
    Normal,
    /// Draw attention (active step target).
    Highlight,
    /// Danger styling (dangling edge, dead node).
    Warning,
}

/// Which engine entity a descriptor stands for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityRef {
    /// A graph node.
    Node(NodeId),
    /// A graph edge.
    Edge(EdgeId),
    /// A metric channel gauge.
    Channel(String),
}

/// 3D position; z is a depth hint for 3D backends, zero elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    /// Create a position on the z = 0 plane.
    #[must_use]
    pub const fn flat(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0 }
    }
}

/// One renderer-agnostic draw instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawDescriptor {
    /// The entity this stands for.
    pub entity: EntityRef,
    /// Shape to draw.
    pub shape: ShapeKind,
    /// Layout position.
    pub position: Position,
    /// Fill color.
    pub color: Color,
    /// Text label.
    pub label: String,
    /// Visual emphasis.
    pub emphasis: Emphasis,
}

/// Project engine state to draw descriptors. Pure; no side effects.
///
/// Nodes and edges are placed by the scenario's layout rule; metric samples
/// become gauges in a band of their own. Warning entities breathe: their
/// descriptors keep deterministic positions, with a small pulse derived
/// from `t` folded into the z hint so backends can animate depth.
#[must_use]
pub fn project(
    snapshot: &GraphSnapshot,
    samples: &[ChannelSample],
    t: SimTime,
    layout: LayoutRule,
) -> Vec<DrawDescriptor> {
    let mut out = Vec::with_capacity(snapshot.nodes.len() + snapshot.edges.len() + samples.len());
    let pulse = 0.5 + 0.5 * (2.0 * t.as_secs_f64()).sin();

    for (i, node) in snapshot.nodes.iter().enumerate() {
        let position = place(layout, i, snapshot.nodes.len(), NODE_BAND, pulse, !node.live);
        out.push(DrawDescriptor {
            entity: EntityRef::Node(node.id),
            shape: node_shape(node.kind),
            position,
            color: node_color(node),
            label: node_label(node),
            emphasis: if node.live {
                Emphasis::Normal
            } else {
                Emphasis::Warning
            },
        });
    }

    for (i, edge) in snapshot.edges.iter().enumerate() {
        let position = place(layout, i, snapshot.edges.len(), EDGE_BAND, pulse, !edge.valid);
        out.push(DrawDescriptor {
            entity: EntityRef::Edge(edge.id),
            shape: ShapeKind::Arrow,
            position,
            color: edge_color(edge),
            label: edge_label(edge, snapshot),
            emphasis: if edge.valid {
                Emphasis::Normal
            } else {
                Emphasis::Warning
            },
        });
    }

    for (i, sample) in samples.iter().enumerate() {
        out.push(DrawDescriptor {
            entity: EntityRef::Channel(sample.name.clone()),
            shape: ShapeKind::Gauge,
            position: Position::flat(i as f64 * SPACING, GAUGE_BAND),
            color: Color::GAUGE,
            label: format!("{}: {:.1}", sample.name, sample.value),
            emphasis: Emphasis::Normal,
        });
    }

    out
}

const SPACING: f64 = 2.0;
const NODE_BAND: f64 = 0.0;
const EDGE_BAND: f64 = -2.0;
const GAUGE_BAND: f64 = -4.0;
const RADIUS: f64 = 3.0;
const GRID_COLS: usize = 4;

fn place(
    layout: LayoutRule,
    index: usize,
    count: usize,
    band: f64,
    pulse: f64,
    warn: bool,
) -> Position {
    let z = if warn { 0.2 * pulse } else { 0.0 };
    match layout {
        LayoutRule::Hierarchical => Position {
            x: index as f64 * SPACING,
            y: band,
            z,
        },
        LayoutRule::Radial => {
            let angle = std::f64::consts::TAU * index as f64 / count.max(1) as f64;
            Position {
                x: RADIUS * angle.cos(),
                y: band + RADIUS * angle.sin(),
                z,
            }
        }
        LayoutRule::Grid => Position {
            x: (index % GRID_COLS) as f64 * SPACING,
            y: band - (index / GRID_COLS) as f64 * SPACING,
            z,
        },
    }
}

const fn node_shape(kind: NodeKind) -> ShapeKind {
    match kind {
        NodeKind::Target | NodeKind::Alias => ShapeKind::Box,
        NodeKind::Resource => ShapeKind::Cylinder,
    }
}

fn node_color(node: &Node) -> Color {
    if !node.live {
        return Color::DEAD;
    }
    match node.kind {
        NodeKind::Target => Color::TARGET,
        NodeKind::Alias => Color::ALIAS,
        NodeKind::Resource => Color::RESOURCE,
    }
}

fn node_label(node: &Node) -> String {
    if node.live {
        format!("{} = {}", node.label, node.payload)
    } else {
        format!("{} (freed)", node.label)
    }
}

fn edge_color(edge: &Edge) -> Color {
    if !edge.valid {
        return Color::DANGLING;
    }
    match edge.kind {
        EdgeKind::RawPointer | EdgeKind::NullableHandle | EdgeKind::NotNullPointer => {
            Color::POINTER
        }
        EdgeKind::Reference => Color::REFERENCE,
        EdgeKind::OwningUnique | EdgeKind::OwningShared => Color::OWNER,
        EdgeKind::WeakObserver => Color::WEAK,
    }
}

fn edge_label(edge: &Edge, snapshot: &GraphSnapshot) -> String {
    match edge.target {
        None => format!("{} → ∅", edge.label),
        Some(id) => {
            let target = snapshot
                .node(id)
                .map_or_else(|| id.to_string(), |n| n.label.clone());
            if edge.valid {
                format!("{} → {target}", edge.label)
            } else {
                format!("{} ⇸ {target}", edge.label)
            }
        }
    }
}
