//! # Triangle Adjacency Construction
//!
//! Rebuilds, for every edge of every triangle, the opposite vertex of the
//! neighbouring triangle that shares that edge. The result is laid out in
//! the conventional "triangles with adjacency" order so the vertex stage can
//! see each triangle's neighbours and detect silhouette edges.
//!
//! ## Layout
//!
//! For an input triangle `(v0, v1, v2)` six indices are emitted:
//!
//! ```text
//! v0, adj01, v1, adj12, v2, adj20
//! ```
//!
//! where `adjXY` is the third vertex of the triangle on the other side of
//! edge `XY`. Boundary edges have no such triangle; the edge's own first
//! endpoint is emitted instead, producing a zero-area neighbour.
//!
//! ## Usage
//!
//! ```rust
//! use contour::gfx::geometry::adjacency::build_adjacency;
//!
//! // Two triangles sharing the edge (1, 2)
//! let adjacency = build_adjacency(&[0, 1, 2, 2, 1, 3]);
//! assert_eq!(adjacency.len(), 12);
//! assert_eq!(adjacency[3], 3); // opposite of edge (1, 2) seen from the first triangle
//! ```

use std::collections::HashMap;

/// An undirected edge between two vertex indices.
///
/// Stored pre-sorted as `(min, max)` so `(a, b)` and `(b, a)` compare and
/// hash identically through the derived impls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeKey {
    lo: u32,
    hi: u32,
}

impl EdgeKey {
    /// Creates the key for the edge between `a` and `b`, in either order
    pub fn new(a: u32, b: u32) -> Self {
        Self {
            lo: a.min(b),
            hi: a.max(b),
        }
    }

    /// Endpoints in canonical `(min, max)` order
    pub fn endpoints(&self) -> (u32, u32) {
        (self.lo, self.hi)
    }

    /// True if both endpoints are the same vertex
    pub fn is_degenerate(&self) -> bool {
        self.lo == self.hi
    }
}

/// Result of recording an opposite vertex against an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// The vertex was stored in a free slot
    Recorded,
    /// Both slots were already taken (non-manifold edge); nothing changed
    Dropped,
}

/// The opposite vertices recorded for one edge, at most two.
///
/// Slots fill in order. A third contributor is dropped, which keeps a
/// non-manifold edge resolvable between its first two triangles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OppositeVertices {
    slots: [Option<u32>; 2],
}

impl OppositeVertices {
    /// Stores `vertex` in the first empty slot
    pub fn try_insert(&mut self, vertex: u32) -> Insertion {
        match self.slots.iter_mut().find(|slot| slot.is_none()) {
            Some(slot) => {
                *slot = Some(vertex);
                Insertion::Recorded
            }
            None => Insertion::Dropped,
        }
    }

    pub fn first(&self) -> Option<u32> {
        self.slots[0]
    }

    pub fn second(&self) -> Option<u32> {
        self.slots[1]
    }

    /// Number of filled slots (0, 1 or 2)
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots[0].is_none()
    }

    /// Returns the recorded opposite that is not `excluded`.
    ///
    /// If the first slot holds `excluded` the second slot is returned,
    /// otherwise the first.
    pub fn other_than(&self, excluded: u32) -> Option<u32> {
        if self.slots[0] == Some(excluded) {
            self.slots[1]
        } else {
            self.slots[0]
        }
    }
}

/// Edge → opposite-vertex lookup used while building adjacency.
///
/// Transient: one map per mesh, dropped once the adjacency buffer exists.
#[derive(Debug, Default)]
pub struct EdgeOppositeMap {
    records: HashMap<EdgeKey, OppositeVertices>,
}

impl EdgeOppositeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-sizes the map for a mesh with `triangle_count` triangles
    pub fn with_triangle_capacity(triangle_count: usize) -> Self {
        // A closed mesh has 3T/2 edges, an open soup up to 3T
        Self {
            records: HashMap::with_capacity(triangle_count * 3 / 2 + 1),
        }
    }

    /// Records `opposite` against `edge`, creating the record on first use
    pub fn record_opposite(&mut self, edge: EdgeKey, opposite: u32) -> Insertion {
        self.records.entry(edge).or_default().try_insert(opposite)
    }

    /// The opposite recorded for `edge` that is not `excluded`.
    ///
    /// `None` when the edge is unknown or only `excluded` was recorded
    /// (a boundary edge).
    pub fn lookup_opposite(&self, edge: EdgeKey, excluded: u32) -> Option<u32> {
        self.records
            .get(&edge)
            .and_then(|record| record.other_than(excluded))
    }

    /// The stored record for `edge`, in either direction
    pub fn record(&self, edge: EdgeKey) -> Option<&OppositeVertices> {
        self.records.get(&edge)
    }

    /// Number of distinct undirected edges
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Pass 1: records every triangle's third vertex against each of its edges.
    ///
    /// Returns the number of contributions dropped because an edge already
    /// had two triangles.
    pub fn populate(&mut self, indices: &[u32]) -> usize {
        let mut dropped = 0;
        for tri in indices.chunks_exact(3) {
            let (i0, i1, i2) = (tri[0], tri[1], tri[2]);
            for (a, b, opposite) in [(i0, i1, i2), (i1, i2, i0), (i2, i0, i1)] {
                if self.record_opposite(EdgeKey::new(a, b), opposite) == Insertion::Dropped {
                    dropped += 1;
                }
            }
        }
        dropped
    }

    /// Summary of the populated map's edge structure
    pub fn stats(&self, triangles: usize, dropped_contributions: usize) -> AdjacencyStats {
        let boundary_edges = self.records.values().filter(|r| r.len() == 1).count();
        AdjacencyStats {
            triangles,
            edges: self.records.len(),
            boundary_edges,
            dropped_contributions,
        }
    }
}

/// Edge-structure summary of a triangle list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdjacencyStats {
    pub triangles: usize,
    /// Distinct undirected edges
    pub edges: usize,
    /// Edges used by exactly one triangle
    pub boundary_edges: usize,
    /// Triangle-edge contributions beyond the second on a shared edge
    pub dropped_contributions: usize,
}

impl AdjacencyStats {
    /// Closed and manifold: every edge shared by exactly two triangles
    pub fn is_closed_manifold(&self) -> bool {
        self.boundary_edges == 0 && self.dropped_contributions == 0
    }
}

/// Pass 2: emits the six-index adjacency layout from a populated map
fn emit_adjacency(indices: &[u32], map: &EdgeOppositeMap) -> Vec<u32> {
    let mut adjacency = Vec::with_capacity(indices.len() / 3 * 6);

    for tri in indices.chunks_exact(3) {
        let (i0, i1, i2) = (tri[0], tri[1], tri[2]);
        for (first, second, own_opposite) in [(i0, i1, i2), (i1, i2, i0), (i2, i0, i1)] {
            let neighbour = map
                .lookup_opposite(EdgeKey::new(first, second), own_opposite)
                .unwrap_or(first);
            adjacency.push(first);
            adjacency.push(neighbour);
        }
    }

    adjacency
}

/// Builds the triangles-with-adjacency index buffer for a triangle list.
///
/// The output has exactly twice as many entries as the full triangles in
/// `indices`; a trailing partial triangle is ignored. Original vertices keep
/// their positions and winding at the even slots. Runs in O(T) time with
/// O(E) auxiliary space.
///
/// Expects a well-formed triangle list. Edges shared by more than two
/// triangles keep only the first two contributors; boundary edges fall back
/// to the edge's first endpoint.
pub fn build_adjacency(indices: &[u32]) -> Vec<u32> {
    build_adjacency_with_stats(indices).0
}

/// Same as [`build_adjacency`], also returning the edge-structure summary
pub fn build_adjacency_with_stats(indices: &[u32]) -> (Vec<u32>, AdjacencyStats) {
    let triangles = indices.len() / 3;
    let mut map = EdgeOppositeMap::with_triangle_capacity(triangles);

    let dropped = map.populate(indices);
    let adjacency = emit_adjacency(indices, &map);

    (adjacency, map.stats(triangles, dropped))
}
