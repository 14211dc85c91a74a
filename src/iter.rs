//! Set-voxel iteration.
//!
//! Iteration order is always: octants in numeric order, branches in linear
//! bitfield order within a node, voxels in linear order within a cell.  A
//! fill node or fill root stores no per-voxel data, so it is iterated as a
//! bounded region yielding the fill value at every coordinate inside it;
//! logically complete, but potentially an enormous sequence.

use crate::bounds::IndexBounds;
use crate::bitops::{quadrant_offsets,apply_quadrant_signs};
use crate::cell::Cell;
use crate::node::{Branch,Node};
use crate::tree::Tree;
use crate::types::{Idx,IndexVec,SignedIndexVec,NUM_QUADRANTS};
use crate::value::Value;

/// every coordinate of a box at one value, x fastest then y then z
pub struct FilledRegionIter<T: Value> {
    bounds: IndexBounds,
    value: T,
    cursor: IndexVec,
    done: bool
}

impl<T: Value> FilledRegionIter<T> {
    pub fn new(bounds: IndexBounds,value: T) -> Self {
        let done = bounds.min().x >= bounds.max().x
            || bounds.min().y >= bounds.max().y
            || bounds.min().z >= bounds.max().z;
        Self { bounds, value, cursor: bounds.min(), done }
    }
}

impl<T: Value> Iterator for FilledRegionIter<T> {
    type Item = (IndexVec,T);
    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = (self.cursor,self.value);
        self.cursor.x += 1;
        if self.cursor.x == self.bounds.max().x {
            self.cursor.x = self.bounds.min().x;
            self.cursor.y += 1;
            if self.cursor.y == self.bounds.max().y {
                self.cursor.y = self.bounds.min().y;
                self.cursor.z += 1;
                if self.cursor.z == self.bounds.max().z {
                    self.done = true;
                }
            }
        }
        Some(item)
    }
}

/// set voxels of one cell, offset by the cell's origin in node space
struct CellSetIter<'a,T: Value> {
    cell: &'a Cell<T>,
    origin: IndexVec,
    pos: Idx,
    /// rank cursor into a compressed payload
    slot: usize
}

impl<'a,T: Value> CellSetIter<'a,T> {
    fn new(cell: &'a Cell<T>,origin: IndexVec) -> Self {
        Self { cell, origin, pos: 0, slot: 0 }
    }
}

impl<'a,T: Value> Iterator for CellSetIter<'a,T> {
    type Item = (IndexVec,T);
    fn next(&mut self) -> Option<Self::Item> {
        let field = self.cell.bitfield();
        while self.pos < field.bits() {
            let i = self.pos;
            self.pos += 1;
            if !field.is_set(i) {
                continue;
            }
            let value = if self.cell.is_filled() {
                self.cell.fill_value()
            } else if self.cell.is_compressed() {
                let v = self.cell.data()[self.slot];
                self.slot += 1;
                v
            } else {
                self.cell.data()[i as usize]
            };
            return Some((self.origin + field.coordinates(i),value));
        }
        None
    }
}

enum LeafIter<'a,T: Value> {
    Cell(CellSetIter<'a,T>),
    Region(FilledRegionIter<T>)
}

impl<'a,T: Value> LeafIter<'a,T> {
    fn next(&mut self) -> Option<(IndexVec,T)> {
        match self {
            LeafIter::Cell(it) => it.next(),
            LeafIter::Region(it) => it.next()
        }
    }
}

struct Frame<'a,T: Value> {
    node: &'a Node<T>,
    slot: Idx,
    origin: IndexVec
}

/// depth-first traversal of every set voxel under a branching node
pub struct NodeSetIter<'a,T: Value> {
    frames: Vec<Frame<'a,T>>,
    leaf: Option<LeafIter<'a,T>>
}

impl<'a,T: Value> NodeSetIter<'a,T> {
    pub fn new(node: &'a Node<T>) -> Self {
        debug_assert!(node.is_branching());
        Self {
            frames: vec![Frame { node, slot: 0, origin: IndexVec::new(0,0,0) }],
            leaf: None
        }
    }
}

impl<'a,T: Value> Iterator for NodeSetIter<'a,T> {
    type Item = (IndexVec,T);
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(leaf) = self.leaf.as_mut() {
                if let Some(item) = leaf.next() {
                    return Some(item);
                }
                self.leaf = None;
            }
            let (node,origin,branch) = {
                let frame = self.frames.last_mut()?;
                let slots = frame.node.bitfield().bits();
                while frame.slot < slots && !frame.node.bitfield().is_set(frame.slot) {
                    frame.slot += 1;
                }
                if frame.slot >= slots {
                    self.frames.pop();
                    continue;
                }
                let branch = frame.slot;
                frame.slot += 1;
                (frame.node,frame.origin,branch)
            };
            let child_origin = origin
                + node.bitfield().coordinates(branch) * node.child_dim();
            match node.branch(branch) {
                Some(Branch::Cell(cell)) => {
                    if !cell.is_empty() {
                        self.leaf = Some(LeafIter::Cell(CellSetIter::new(cell,child_origin)));
                    }
                },
                Some(Branch::Node(child)) => {
                    if child.is_fill() {
                        let bounds = IndexBounds::new(child_origin,
                            child_origin + IndexVec::splat(child.max_dim()));
                        self.leaf = Some(LeafIter::Region(
                            FilledRegionIter::new(bounds,child.fill_value())));
                    } else if !child.is_empty() {
                        self.frames.push(Frame { node: child, slot: 0, origin: child_origin });
                    }
                },
                None => {}
            }
        }
    }
}

enum OctantIter<'a,T: Value> {
    Region(FilledRegionIter<T>),
    Set(NodeSetIter<'a,T>)
}

impl<'a,T: Value> OctantIter<'a,T> {
    fn next(&mut self) -> Option<(IndexVec,T)> {
        match self {
            OctantIter::Region(it) => it.next(),
            OctantIter::Set(it) => it.next()
        }
    }
}

/// all set voxels of a tree in signed coordinates, octants 0 through 7
pub struct TreeSetIter<'a,T: Value> {
    tree: &'a Tree<T>,
    quadrant: u8,
    inner: Option<OctantIter<'a,T>>
}

impl<'a,T: Value> TreeSetIter<'a,T> {
    pub fn new(tree: &'a Tree<T>) -> Self {
        Self { tree, quadrant: 0, inner: None }
    }
}

impl<'a,T: Value> Iterator for TreeSetIter<'a,T> {
    type Item = (SignedIndexVec,T);
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(inner) = self.inner.as_mut() {
                match inner.next() {
                    Some((coords,value)) => {
                        let q = self.quadrant;
                        let signed = apply_quadrant_signs(
                            (coords + quadrant_offsets(q)).as_signed(),q);
                        return Some((signed,value));
                    },
                    None => {
                        self.inner = None;
                        self.quadrant += 1;
                    }
                }
                continue;
            }
            while (self.quadrant as usize) < NUM_QUADRANTS {
                let root = self.tree.root(self.quadrant);
                if root.is_empty() {
                    self.quadrant += 1;
                    continue;
                }
                self.inner = Some(match root.is_fill() {
                    true => OctantIter::Region(
                        FilledRegionIter::new(root.compute_set_bounds(),root.fill_value())),
                    false => OctantIter::Set(NodeSetIter::new(root))
                });
                break;
            }
            self.inner.as_ref()?;
        }
    }
}

// *************** TESTS *****************

#[test]
fn empty_node_yields_nothing() {
    let n: Node<f32> = Node::new(1,2,2,0.0,false);
    assert_eq!(NodeSetIter::new(&n).count(),0);
}

#[test]
fn direct_cell_parent_in_order() {
    let mut n: Node<i32> = Node::new(1,2,2,1,false);
    let coords = [(0,0,0),(1,2,3),(3,3,3)];
    for (v,(i,j,k)) in coords.iter().enumerate() {
        n.set(*i,*j,*k,v as i32 + 10).unwrap();
    }
    let visited: Vec<(IndexVec,i32)> = NodeSetIter::new(&n).collect();
    assert_eq!(visited.len(),3);
    for (slot,(c,v)) in visited.iter().enumerate() {
        let (i,j,k) = coords[slot];
        assert_eq!(*c,IndexVec::new(i,j,k));
        assert_eq!(*v,slot as i32 + 10);
    }
}

#[test]
fn multiple_cells_and_levels_in_order() {
    let mut n: Node<i32> = Node::new(2,2,2,0,false);
    // same branch, two cells, then a second branch
    let coords = [(0,0,0),(3,3,3),(5,6,7),(15,15,15),(16,17,18)];
    for (v,(i,j,k)) in coords.iter().enumerate() {
        n.set(*i,*j,*k,v as i32 + 1).unwrap();
    }
    let visited: Vec<(IndexVec,i32)> = NodeSetIter::new(&n).collect();
    assert_eq!(visited.len(),coords.len());
    for (slot,(c,v)) in visited.iter().enumerate() {
        let (i,j,k) = coords[slot];
        assert_eq!(*c,IndexVec::new(i,j,k));
        assert_eq!(*v,slot as i32 + 1);
    }
}

#[test]
fn filled_region_counts() {
    let it = FilledRegionIter::new(IndexBounds::from_scalars(0,4),9i32);
    let all: Vec<(IndexVec,i32)> = it.collect();
    assert_eq!(all.len(),64);
    assert_eq!(all[0].0,IndexVec::new(0,0,0));
    assert_eq!(all[1].0,IndexVec::new(1,0,0));
    assert_eq!(all[4].0,IndexVec::new(0,1,0));
    assert_eq!(all[16].0,IndexVec::new(0,0,1));
    assert!(all.iter().all(|(_,v)| *v == 9));
    // degenerate region
    let empty = FilledRegionIter::new(IndexBounds::from_scalars(4,4),9i32);
    assert_eq!(empty.count(),0);
}

#[test]
fn fill_children_iterate_as_regions() {
    // materialized fill node: one expanded corner cell, everything else fill
    let mut n: Node<i32> = Node::new(2,2,2,5,true);
    for i in 0..4 {
        for j in 0..4 {
            for k in 0..4 {
                n.set(i,j,k,2).unwrap();
            }
        }
    }
    let mut iter = NodeSetIter::new(&n);
    // the first 64 values come from the rewritten cell
    for _ in 0..64 {
        let (_,v) = iter.next().expect("exhausted early");
        assert_eq!(v,2);
    }
    // the next cell starts the old fill
    let (c,v) = iter.next().expect("exhausted early");
    assert_eq!(c,IndexVec::new(4,0,0));
    assert_eq!(v,5);
    // the rest of the first branch is filled cells
    let mut count = 65;
    while count < 4096 {
        let (_,v) = iter.next().expect("exhausted early");
        assert_eq!(v,5);
        count += 1;
    }
    // the second branch is a fill child iterated as a region
    let (c,v) = iter.next().expect("exhausted early");
    assert_eq!(c,IndexVec::new(16,0,0));
    assert_eq!(v,5);
    // everything under the node is visited
    assert_eq!(iter.count() as u32 + 4097,64 * 64 * 64);
}

#[test]
fn tree_iteration_crosses_octants_in_order() {
    let mut tree: Tree<i32> = Tree::new(2,2,0);
    tree.set(-1,-1,-1,7).unwrap();
    tree.set(1,0,0,5).unwrap();
    tree.set(2,-3,4,6).unwrap();
    tree.set(3,0,0,5).unwrap();
    let visited: Vec<(SignedIndexVec,i32)> = tree.set_voxels().collect();
    assert_eq!(visited,vec![
        (SignedIndexVec::new(1,0,0),5),
        (SignedIndexVec::new(3,0,0),5),
        (SignedIndexVec::new(2,-3,4),6),
        (SignedIndexVec::new(-1,-1,-1),7)]);
}

#[test]
fn tree_iteration_matches_point_reads() {
    let mut tree: Tree<i32> = Tree::new(2,2,0);
    let points = [(-9,3,14),(0,0,0),(-1,-2,-3),(100,-50,25),(7,7,7)];
    for (n,(i,j,k)) in points.iter().enumerate() {
        tree.set(*i,*j,*k,n as i32 + 1).unwrap();
    }
    let mut seen = 0;
    for (c,v) in tree.set_voxels() {
        assert_eq!(tree.get(c.x,c.y,c.z),v);
        seen += 1;
    }
    assert_eq!(seen,points.len());
}
