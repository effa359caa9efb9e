//! # Barnes–Hut Octree
//!
//! Approximates gravitational acceleration in an `N`-body system by treating
//! distant groups of bodies as a single pseudo-body at their center of mass,
//! replacing the `O(N²)` all-pairs sum with an approximate `O(N log N)` one.
//!
//! - Space is recursively subdivided into 8 octants.
//! - Nodes live in an index arena (`BarnesHutTree::nodes`); children are
//!   indices into that arena, never pointers.
//! - A leaf holds a chain of bodies threaded through `BarnesHutTree::next`.
//!   Normally the chain has one body; bodies at the same position, or bodies
//!   that reach `MAX_DEPTH`, share one leaf instead of subdividing forever.
//! - Each node stores total mass, center of mass (COM) and its bounding box.
//!
//! The arena and chain buffers are cleared, not freed, between rebuilds, so
//! after the first evaluation a rebuild does not allocate.

#![allow(non_snake_case)]

use crate::simulation::forces::pair_coefficient;
use crate::simulation::math::{softened_distance2, NVec3};
use crate::simulation::states::Body;

/// Deepest level a node may be subdivided to
pub const MAX_DEPTH: u32 = 48;

/// A single octree node.
///
/// Each node represents a cubic region of space that is either
/// - a leaf holding zero or more bodies (`body` is the head of its chain), or
/// - an internal node with at least one child.
#[derive(Debug, Clone)]
pub struct BarnesHutNode {
    pub mass: f64,
    pub com: NVec3,
    pub bbox_min: NVec3,
    pub bbox_max: NVec3,
    pub children: [Option<usize>; 8], // indices into BarnesHutTree::nodes
    pub body: Option<usize>, // head of the leaf's body chain
    pub depth: u32,
}

impl BarnesHutNode {
    fn empty(bbox_min: NVec3, bbox_max: NVec3, depth: u32) -> Self {
        Self {
            mass: 0.0,
            com: NVec3::zeros(),
            bbox_min,
            bbox_max,
            children: [None; 8],
            body: None,
            depth,
        }
    }

    fn is_leaf(&self) -> bool {
        self.children.iter().all(|c| c.is_none())
    }

    fn contains(&self, p: &NVec3) -> bool {
        p.x >= self.bbox_min.x && p.x <= self.bbox_max.x
            && p.y >= self.bbox_min.y && p.y <= self.bbox_max.y
            && p.z >= self.bbox_min.z && p.z <= self.bbox_max.z
    }
}

/// Per-query constants threaded through the traversal
struct Probe {
    body: usize,
    pos: NVec3,
    G: f64,
    eps2: f64,
    theta: f64,
}

/// A 3D Barnes–Hut octree over a body slice.
#[derive(Debug, Clone, Default)]
pub struct BarnesHutTree {
    pub nodes: Vec<BarnesHutNode>,
    pub root: usize,
    next: Vec<Option<usize>>, // next[i] = next body in i's leaf chain
}

impl BarnesHutTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a fresh tree over `bodies`
    pub fn build(bodies: &[Body]) -> Self {
        let mut tree = Self::new();
        tree.rebuild(bodies);
        tree
    }

    /// Rebuild the tree in place over `bodies`, reusing the arena.
    ///
    /// 1. Computes a cubic bounding box enclosing all bodies.
    /// 2. Inserts each body, subdividing nodes as needed.
    /// 3. Computes total mass and center of mass for every node.
    pub fn rebuild(&mut self, bodies: &[Body]) {
        self.nodes.clear();
        self.next.clear();
        self.next.resize(bodies.len(), None);
        self.root = 0;

        let (bbox_min, bbox_max) = compute_global_bbox(bodies);
        self.nodes.push(BarnesHutNode::empty(bbox_min, bbox_max, 0));

        for i in 0..bodies.len() {
            self.insert_body(self.root, i, bodies);
        }

        if !bodies.is_empty() {
            self.compute_mass_and_com(bodies, self.root);
        }
    }

    /// Net gravitational acceleration on body `i`.
    ///
    /// Nodes far enough away (size / distance < `theta`, and not containing
    /// body `i`) contribute as a single mass at their COM; others are opened
    /// down to exact pairwise interactions at the leaves.
    pub fn force_on_body(&self, i: usize, bodies: &[Body], G: f64, eps2: f64, theta: f64) -> NVec3 {
        let mut acc = NVec3::zeros();
        if self.nodes.is_empty() {
            return acc;
        }
        let probe = Probe {
            body: i,
            pos: bodies[i].x,
            G,
            eps2,
            theta,
        };
        self.traverse_node(self.root, &probe, bodies, &mut acc);
        acc
    }

    /// Bodies stored in the leaf chain starting at `head`
    pub fn leaf_bodies(&self, head: Option<usize>) -> LeafBodies<'_> {
        LeafBodies {
            next: &self.next,
            cursor: head,
        }
    }

    // helpers ==============================================================================

    /// Insert body `body_idx` into the subtree rooted at `node_idx`.
    ///
    /// - Empty leaf: the body becomes the leaf's chain.
    /// - Leaf at `MAX_DEPTH`, or whose bodies sit exactly at the same position:
    ///   the body is prepended to the chain.
    /// - Any other occupied leaf: its chain is pushed down into children, and
    ///   the new body follows.
    /// - Internal node: the body is forwarded to the matching child.
    fn insert_body(&mut self, node_idx: usize, body_idx: usize, bodies: &[Body]) {
        let node = &self.nodes[node_idx];
        let (is_leaf, chain, depth) = (node.is_leaf(), node.body, node.depth);

        if is_leaf {
            match chain {
                None => {
                    self.nodes[node_idx].body = Some(body_idx);
                    return;
                }
                Some(head) => {
                    if depth >= MAX_DEPTH || bodies[head].x == bodies[body_idx].x {
                        self.next[body_idx] = Some(head);
                        self.nodes[node_idx].body = Some(body_idx);
                        return;
                    }

                    // Split: move the existing chain down one level
                    self.nodes[node_idx].body = None;
                    let mut cursor = Some(head);
                    while let Some(b) = cursor {
                        cursor = self.next[b].take();
                        self.insert_into_child(node_idx, b, bodies);
                    }
                }
            }
        }

        self.insert_into_child(node_idx, body_idx, bodies);
    }

    /// Forward a body into the child octant containing it, creating the child lazily
    fn insert_into_child(&mut self, node_idx: usize, body_idx: usize, bodies: &[Body]) {
        let bbox_min = self.nodes[node_idx].bbox_min;
        let bbox_max = self.nodes[node_idx].bbox_max;
        let depth = self.nodes[node_idx].depth;
        let octant = child_index_for_point(&bodies[body_idx].x, &bbox_min, &bbox_max);

        let child = match self.nodes[node_idx].children[octant] {
            Some(idx) => idx,
            None => {
                let (cmin, cmax) = child_bbox(&bbox_min, &bbox_max, octant);
                let new_idx = self.nodes.len();
                self.nodes.push(BarnesHutNode::empty(cmin, cmax, depth + 1));
                self.nodes[node_idx].children[octant] = Some(new_idx);
                new_idx
            }
        };

        self.insert_body(child, body_idx, bodies);
    }

    /// Bottom-up pass writing total `mass` and mass-weighted `com` into every node
    fn compute_mass_and_com(&mut self, bodies: &[Body], node_idx: usize) {
        let mut mass = 0.0;
        let mut com = NVec3::zeros();

        let head = self.nodes[node_idx].body;
        let children = self.nodes[node_idx].children;

        for b in self.leaf_bodies(head) {
            mass += bodies[b].m;
            com += bodies[b].x * bodies[b].m;
        }

        for child_idx in children.iter().flatten().copied() {
            self.compute_mass_and_com(bodies, child_idx);
            let cn = &self.nodes[child_idx];
            if cn.mass > 0.0 {
                mass += cn.mass;
                com += cn.com * cn.mass;
            }
        }

        if mass > 0.0 {
            com /= mass;
        }

        let node = &mut self.nodes[node_idx];
        node.mass = mass;
        node.com = com;
    }

    /// Accumulate the acceleration on `probe.body` from the subtree at `node_idx`
    fn traverse_node(&self, node_idx: usize, probe: &Probe, bodies: &[Body], acc: &mut NVec3) {
        let node = &self.nodes[node_idx];

        if node.mass == 0.0 {
            return;
        }

        // Leaf: exact interaction with every body in the chain except the probe itself
        if node.is_leaf() {
            for b in self.leaf_bodies(node.body) {
                if b == probe.body {
                    continue;
                }
                let other = &bodies[b];
                let r = other.x - probe.pos;
                let coef = pair_coefficient(probe.G, softened_distance2(&r, probe.eps2));
                *acc += coef * other.m * r;
            }
            return;
        }

        let size_vec = node.bbox_max - node.bbox_min;
        let size = size_vec.x.max(size_vec.y).max(size_vec.z);

        let r = node.com - probe.pos;
        let dist = r.norm();

        // Far enough away and not enclosing the probe: approximate this node at its COM
        if dist > 0.0 && size < probe.theta * dist && !node.contains(&probe.pos) {
            let coef = pair_coefficient(probe.G, softened_distance2(&r, probe.eps2));
            *acc += coef * node.mass * r;
        } else {
            for child_idx in node.children.iter().flatten().copied() {
                self.traverse_node(child_idx, probe, bodies, acc);
            }
        }
    }
}

/// Iterator over one leaf's body chain
pub struct LeafBodies<'a> {
    next: &'a [Option<usize>],
    cursor: Option<usize>,
}

impl Iterator for LeafBodies<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let current = self.cursor?;
        self.cursor = self.next[current];
        Some(current)
    }
}

// helpers ===========================================================================

/// Cubic bounding box enclosing all bodies.
///
/// The axis-aligned box is expanded into a cube around its center so that
/// node "size" in the opening criterion is well defined.
fn compute_global_bbox(bodies: &[Body]) -> (NVec3, NVec3) {
    if bodies.is_empty() {
        return (NVec3::zeros(), NVec3::zeros());
    }

    let mut min = NVec3::repeat(f64::INFINITY);
    let mut max = NVec3::repeat(f64::NEG_INFINITY);

    for b in bodies {
        min = min.inf(&b.x);
        max = max.sup(&b.x);
    }

    let center = (min + max) * 0.5;
    let half = (max - min) * 0.5;
    let max_half = half.x.max(half.y).max(half.z);
    let half = NVec3::repeat(max_half);

    (center - half, center + half)
}

/// Octant index of `p` within a node's box.
///
/// - Bit 0 (value 1): x >= center.x
/// - Bit 1 (value 2): y >= center.y
/// - Bit 2 (value 4): z >= center.z
fn child_index_for_point(p: &NVec3, bbox_min: &NVec3, bbox_max: &NVec3) -> usize {
    let center = (bbox_min + bbox_max) * 0.5;
    let mut idx = 0;

    if p.x >= center.x { idx |= 1; }
    if p.y >= center.y { idx |= 2; }
    if p.z >= center.z { idx |= 4; }

    idx
}

/// Bounding box of child octant `child_idx`, using the same bit encoding as
/// [`child_index_for_point`].
fn child_bbox(parent_min: &NVec3, parent_max: &NVec3, child_idx: usize) -> (NVec3, NVec3) {
    let center = (parent_min + parent_max) * 0.5;

    let mut min = *parent_min;
    let mut max = *parent_max;

    for axis in 0..3 {
        if (child_idx >> axis) & 1 == 0 {
            max[axis] = center[axis];
        } else {
            min[axis] = center[axis];
        }
    }

    (min, max)
}
