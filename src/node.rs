//! Interior node of the hive tree.
//!
//! A node at `level` spans `2^(lg_cell_dim + level*lg_branching)` voxels per
//! axis and is one of two things:
//!
//! * **Branching**: a dense array of `2^(3*lg_branching)` child slots guarded
//!   by a bitfield.  Slot `b` holds a child exactly when bit `b` is set; at
//!   level 1 the children are cells, above that they are nodes one level
//!   down.  `value` is the default read from unset branches.
//! * **Fill**: no slots at all, a full bitfield, and `value` covering the
//!   whole subtree.  Costs O(1) storage regardless of span.
//!
//! A fill node materializes into branching form the first time anything
//! other than its own fill value is written into it; every materialized
//! child starts out as a fill covering its own subtree.  Nodes never
//! collapse back to fill form once they diverge.

use std::io::{Read,Write};
use num_traits::FromPrimitive;
use crate::bitfield::BitField3D;
use crate::bitops::{num_bits_3d,linear_index,modulo_lg};
use crate::bounds::{IndexBounds,SignedIndexBounds};
use crate::cell::Cell;
use crate::stamp::StampSource;
use crate::store::{Group,LeafType,leaf_group_name,
    LEAF_TYPE_ATTR,FILL_LEVEL_ATTR,FILL_VALUE_ATTR,INDEX_OFFSET_ATTR,QUADRANT_ATTR};
use crate::types::{Idx,IndexVec,SignedIndexVec};
use crate::value::Value;
use crate::{Error,Result};

/// a child slot: cells at level 1, nodes above
#[derive(Clone,Debug,PartialEq)]
pub enum Branch<T: Value> {
    Cell(Box<Cell<T>>),
    Node(Box<Node<T>>)
}

#[derive(Clone,Debug)]
pub struct Node<T: Value> {
    /// level 1 parents cells, so this is never 0
    level: u32,
    lg_branching: u8,
    lg_cell_dim: u8,
    /// log2 of voxels spanned per branch along one axis
    lg_child_divisions: u32,
    /// default value when branching, fill value when collapsed
    value: T,
    bitfield: BitField3D,
    /// empty exactly when this is a fill node
    branches: Vec<Option<Branch<T>>>
}

impl<T: Value> Node<T> {
    pub fn new(level: u32,lg_branching: u8,lg_cell_dim: u8,value: T,as_fill: bool) -> Self {
        assert!(level > 0,"nodes start at level 1");
        let mut bitfield = BitField3D::new(lg_branching);
        let branches = match as_fill {
            true => {
                bitfield.fill_bits();
                Vec::new()
            },
            false => {
                let mut slots = Vec::new();
                slots.resize_with(num_bits_3d(lg_branching) as usize,|| None);
                slots
            }
        };
        Self {
            level,
            lg_branching,
            lg_cell_dim,
            lg_child_divisions: (level - 1) * lg_branching as u32 + lg_cell_dim as u32,
            value,
            bitfield,
            branches
        }
    }
    pub fn level(&self) -> u32 {
        self.level
    }
    pub fn lg_branching(&self) -> u8 {
        self.lg_branching
    }
    pub fn lg_cell_dim(&self) -> u8 {
        self.lg_cell_dim
    }
    pub fn is_branching(&self) -> bool {
        !self.branches.is_empty()
    }
    pub fn is_fill(&self) -> bool {
        !self.is_branching()
    }
    /// fill nodes are never empty
    pub fn is_empty(&self) -> bool {
        self.bitfield.is_empty()
    }
    /// side of the whole subtree in voxels
    pub fn max_dim(&self) -> Idx {
        1 << (self.lg_cell_dim as u32 + self.lg_branching as u32 * self.level)
    }
    /// side of one child subtree in voxels
    pub fn child_dim(&self) -> Idx {
        1 << self.lg_child_divisions
    }
    fn is_cell_parent(&self) -> bool {
        self.level == 1
    }
    pub(crate) fn fill_value(&self) -> T {
        debug_assert!(self.is_fill());
        self.value
    }
    pub(crate) fn default_value(&self) -> T {
        debug_assert!(self.is_branching());
        self.value
    }
    pub(crate) fn bitfield(&self) -> &BitField3D {
        &self.bitfield
    }
    pub(crate) fn branch(&self,b: Idx) -> Option<&Branch<T>> {
        self.branches[b as usize].as_ref()
    }

    fn branch_index(&self,i: Idx,j: Idx,k: Idx) -> Idx {
        let d = self.lg_child_divisions;
        linear_index(i >> d,j >> d,k >> d,self.lg_branching)
    }
    fn child_coords(&self,i: Idx,j: Idx,k: Idx) -> (Idx,Idx,Idx) {
        let d = self.lg_child_divisions as u8;
        (modulo_lg(i,d),modulo_lg(j,d),modulo_lg(k,d))
    }
    /// bounds of the child at branch coordinates, in this node's voxel space
    fn child_bounds(&self,bi: Idx,bj: Idx,bk: Idx) -> IndexBounds {
        let dim = self.child_dim();
        let min = IndexVec::new(bi,bj,bk) * dim;
        IndexBounds::new(min,min + IndexVec::splat(dim))
    }
    /// branch coordinates of every child the voxel box touches
    fn branch_intersection(&self,voxel_bounds: &IndexBounds) -> IndexBounds {
        let d = self.lg_child_divisions;
        // drop the half-open edge before converting the max corner
        let lo = voxel_bounds.min();
        let hi = voxel_bounds.max() - IndexVec::splat(1);
        let bmin = IndexVec::new(lo.x >> d,lo.y >> d,lo.z >> d);
        let bmax = IndexVec::new(hi.x >> d,hi.y >> d,hi.z >> d) + IndexVec::splat(1);
        IndexBounds::new(bmin,bmax)
    }

    /// allocate the slot's child with this node's default if it is missing
    fn ensure_branch(&mut self,branch: Idx) {
        debug_assert!(self.is_branching());
        if self.branches[branch as usize].is_some() {
            return;
        }
        let value = self.value;
        let child = match self.is_cell_parent() {
            true => Branch::Cell(Box::new(Cell::new(self.lg_cell_dim,value))),
            false => Branch::Node(Box::new(
                Node::new(self.level - 1,self.lg_branching,self.lg_cell_dim,value,false)))
        };
        self.branches[branch as usize] = Some(child);
    }
    /// Materialize a fill node: every slot becomes a child preloaded as a
    /// fill of the old fill value, with `default` underneath it.
    fn create_fill_branches(&mut self,default: T) {
        debug_assert!(self.is_fill());
        let fill = self.value;
        let count = num_bits_3d(self.lg_branching) as usize;
        let mut slots = Vec::with_capacity(count);
        for _ in 0..count {
            let child = match self.is_cell_parent() {
                true => Branch::Cell(Box::new(Cell::new_filled(self.lg_cell_dim,default,fill))),
                false => Branch::Node(Box::new(
                    Node::new(self.level - 1,self.lg_branching,self.lg_cell_dim,fill,true)))
            };
            slots.push(Some(child));
        }
        self.branches = slots;
    }

    pub fn get(&self,i: Idx,j: Idx,k: Idx) -> T {
        if self.is_fill() {
            return self.value;
        }
        let branch = self.branch_index(i,j,k);
        if !self.bitfield.is_set(branch) {
            return self.value;
        }
        let (ic,jc,kc) = self.child_coords(i,j,k);
        match self.branches[branch as usize].as_ref() {
            Some(Branch::Cell(cell)) => cell.get(ic,jc,kc),
            Some(Branch::Node(node)) => node.get(ic,jc,kc),
            None => self.value
        }
    }

    pub fn set(&mut self,i: Idx,j: Idx,k: Idx,value: T) -> Result<()> {
        if self.is_fill() {
            // writing the fill value into a fill node changes nothing
            if self.value == value {
                return Ok(());
            }
            self.create_fill_branches(self.value);
        }
        let branch = self.branch_index(i,j,k);
        self.bitfield.set_bit(branch);
        self.ensure_branch(branch);
        let (ic,jc,kc) = self.child_coords(i,j,k);
        match self.branches[branch as usize].as_mut() {
            Some(Branch::Cell(cell)) => cell.set(ic,jc,kc,value),
            Some(Branch::Node(node)) => node.set(ic,jc,kc,value),
            None => Ok(())
        }
    }

    pub fn update<Op: Fn(T,T) -> T + Copy>(&mut self,i: Idx,j: Idx,k: Idx,value: T,op: Op) -> Result<()> {
        if self.is_fill() {
            let new_val = op(self.value,value);
            return self.set(i,j,k,new_val);
        }
        let branch = self.branch_index(i,j,k);
        self.bitfield.set_bit(branch);
        self.ensure_branch(branch);
        let (ic,jc,kc) = self.child_coords(i,j,k);
        match self.branches[branch as usize].as_mut() {
            Some(Branch::Cell(cell)) => cell.update(ic,jc,kc,value,op),
            Some(Branch::Node(node)) => node.update(ic,jc,kc,value,op),
            None => Ok(())
        }
    }

    /// Unset a voxel, installing `default` as the subtree default.  Children
    /// left empty by the unset are deallocated on the way back up.
    pub fn unset(&mut self,i: Idx,j: Idx,k: Idx,default: T) -> Result<()> {
        if self.is_fill() {
            self.create_fill_branches(default);
        }
        self.value = default;
        let branch = self.branch_index(i,j,k);
        if !self.bitfield.is_set(branch) {
            return Ok(());
        }
        let (ic,jc,kc) = self.child_coords(i,j,k);
        let now_empty = match self.branches[branch as usize].as_mut() {
            Some(Branch::Cell(cell)) => {
                cell.unset(ic,jc,kc)?;
                cell.is_empty()
            },
            Some(Branch::Node(node)) => {
                node.unset(ic,jc,kc,default)?;
                node.is_empty()
            },
            None => false
        };
        if now_empty {
            self.branches[branch as usize] = None;
            self.bitfield.unset_bit(branch);
        }
        Ok(())
    }

    /// Push a stamp down the tree.  `stamp_bounds` tracks the region in
    /// reflected stamp space corresponding to `node_bounds` in this node's
    /// voxel space; the reflection is resolved at the cells.
    pub fn stamp<S: StampSource>(&mut self,src: &S,stamp_bounds: SignedIndexBounds,
            node_bounds: IndexBounds,transform: SignedIndexVec) -> Result<()>
            where S::Elem: Into<T> {
        if self.is_fill() {
            self.create_fill_branches(self.value);
        }
        let branch_bounds = self.branch_intersection(&node_bounds);
        let stamp_offset = stamp_bounds.min() - node_bounds.min().as_signed();
        for bk in branch_bounds.min().z..branch_bounds.max().z {
            for bj in branch_bounds.min().y..branch_bounds.max().y {
                for bi in branch_bounds.min().x..branch_bounds.max().x {
                    let child_bounds = self.child_bounds(bi,bj,bk);
                    let intersection = node_bounds.intersection(&child_bounds);
                    let child_intersection = IndexBounds::new(
                        intersection.min() - child_bounds.min(),
                        intersection.max() - child_bounds.min());
                    let branch = linear_index(bi,bj,bk,self.lg_branching);
                    self.bitfield.set_bit(branch);
                    self.ensure_branch(branch);
                    let stamp_intersection = SignedIndexBounds::new(
                        stamp_offset + intersection.min().as_signed(),
                        stamp_offset + intersection.max().as_signed());
                    match self.branches[branch as usize].as_mut() {
                        Some(Branch::Cell(cell)) => {
                            // resolve the reflection into real source coordinates
                            let signed = SignedIndexBounds::extrema_of(
                                stamp_intersection.min() * transform,
                                stamp_intersection.max() * transform);
                            cell.stamp(src,signed,&child_intersection,transform)?;
                        },
                        Some(Branch::Node(node)) => {
                            node.stamp(src,stamp_intersection,child_intersection,transform)?;
                        },
                        None => {}
                    }
                }
            }
        }
        Ok(())
    }

    /// half-open box around set voxels, relative to this node
    pub fn compute_set_bounds(&self) -> IndexBounds {
        let dim = self.max_dim();
        debug_assert!(!self.is_empty());
        if self.is_fill() {
            return IndexBounds::from_scalars(0,dim);
        }
        let mut bounds = IndexBounds::from_scalars(dim,0);
        for (b,coords) in self.bitfield.set_bits() {
            let offset = coords * self.child_dim();
            let mut child = match self.branches[b as usize].as_ref() {
                Some(Branch::Cell(cell)) => cell.compute_set_bounds(),
                Some(Branch::Node(node)) => node.compute_set_bounds(),
                None => continue
            };
            child.translate(offset);
            bounds.update_extrema_bounds(&child);
        }
        bounds
    }

    /// Install a subtree as branch 0 of this node.  Used by tree growth: the
    /// old root becomes the origin child of the new, taller root.
    pub fn set_subtree(&mut self,subtree: Node<T>) {
        assert!(!subtree.is_empty());
        assert!(self.is_branching());
        assert!(self.branches[0].is_none());
        self.branches[0] = Some(Branch::Node(Box::new(subtree)));
        self.bitfield.set_bit(0);
    }

    // IO

    pub fn write<W: Write>(&self,w: &mut W) -> Result<()> {
        self.level.write_to(w)?;
        w.write_all(&[self.lg_branching,self.lg_cell_dim])?;
        self.lg_child_divisions.write_to(w)?;
        self.bitfield.write(w)?;
        w.write_all(&[self.is_branching() as u8])?;
        self.value.write_to(w)?;
        if self.is_branching() {
            for (b,_) in self.bitfield.set_bits() {
                match self.branches[b as usize].as_ref() {
                    Some(Branch::Cell(cell)) => cell.write(w)?,
                    Some(Branch::Node(node)) => node.write(w)?,
                    None => {}
                }
            }
        }
        Ok(())
    }
    pub fn read<R: Read>(r: &mut R) -> Result<Self> {
        let level = u32::read_from(r)?;
        let mut lg = [0u8;2];
        r.read_exact(&mut lg)?;
        let lg_child_divisions = u32::read_from(r)?;
        let bitfield = BitField3D::read(r)?;
        let mut branching = [0u8;1];
        r.read_exact(&mut branching)?;
        let value = T::read_from(r)?;
        let mut node = Self {
            level,
            lg_branching: lg[0],
            lg_cell_dim: lg[1],
            lg_child_divisions,
            value,
            bitfield,
            branches: Vec::new()
        };
        if branching[0] != 0 {
            node.branches.resize_with(num_bits_3d(node.lg_branching) as usize,|| None);
            let set: Vec<Idx> = node.bitfield.set_bits().map(|(b,_)| b).collect();
            for b in set {
                let child = match node.is_cell_parent() {
                    true => Branch::Cell(Box::new(Cell::read(r)?)),
                    false => Branch::Node(Box::new(Node::read(r)?))
                };
                node.branches[b as usize] = Some(child);
            }
        }
        Ok(node)
    }
    /// container form: branching nodes recurse, accumulating the index
    /// offset; cells and fill nodes land as leaf groups
    pub fn write_leaves(&self,volume_group: &mut Group,quadrant: u8,offset: IndexVec) {
        if self.is_branching() {
            let child_dim = self.child_dim();
            for (b,coords) in self.bitfield.set_bits() {
                let accum = offset + coords * child_dim;
                match self.branches[b as usize].as_ref() {
                    Some(Branch::Cell(cell)) => cell.write_group(volume_group,quadrant,accum),
                    Some(Branch::Node(node)) => node.write_leaves(volume_group,quadrant,accum),
                    None => {}
                }
            }
        } else {
            let name = leaf_group_name(LeafType::FillNode,quadrant,offset);
            let leaf = volume_group.create_group(&name);
            leaf.write_scalar(FILL_LEVEL_ATTR,&self.level);
            leaf.write_scalar(FILL_VALUE_ATTR,&self.value);
            leaf.write_index_vec(INDEX_OFFSET_ATTR,offset);
            leaf.write_scalar(QUADRANT_ATTR,&quadrant);
            leaf.write_scalar(LEAF_TYPE_ATTR,&(LeafType::FillNode as u8));
        }
    }
    /// descend along `offset` and install one leaf read from a group
    pub fn read_leaf(&mut self,leaf: &Group,offset: IndexVec) -> Result<()> {
        let tag: u8 = leaf.read_scalar(LEAF_TYPE_ATTR)?;
        let leaf_type = match LeafType::from_u8(tag) {
            Some(t) => t,
            None => return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,format!("unknown leaf type {}",tag))))
        };
        if leaf_type == LeafType::FillNode {
            let level: u32 = leaf.read_scalar(FILL_LEVEL_ATTR)?;
            if level == self.level {
                self.value = leaf.read_scalar::<T>(FILL_VALUE_ATTR)?;
                self.branches.clear();
                self.bitfield.fill_bits();
                return Ok(());
            }
        }
        let branch = self.branch_index(offset.x,offset.y,offset.z);
        self.bitfield.set_bit(branch);
        if self.is_cell_parent() {
            if leaf_type != LeafType::Cell {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,"fill node leaf below cell level")));
            }
            self.branches[branch as usize] = Some(Branch::Cell(Box::new(Cell::read_group(leaf)?)));
            return Ok(());
        }
        let (ic,jc,kc) = self.child_coords(offset.x,offset.y,offset.z);
        self.ensure_branch(branch);
        match self.branches[branch as usize].as_mut() {
            Some(Branch::Node(node)) => node.read_leaf(leaf,IndexVec::new(ic,jc,kc)),
            _ => Ok(())
        }
    }
}

impl<T: Value> PartialEq for Node<T> {
    fn eq(&self,that: &Self) -> bool {
        let simple = self.level == that.level
            && self.lg_branching == that.lg_branching
            && self.lg_cell_dim == that.lg_cell_dim
            && self.lg_child_divisions == that.lg_child_divisions
            && self.branches.len() == that.branches.len()
            && self.is_fill() == that.is_fill();
        if !simple {
            return false;
        }
        if self.value != that.value {
            return false;
        }
        if self.bitfield != that.bitfield {
            return false;
        }
        self.branches == that.branches
    }
}

// *************** TESTS *****************

#[test]
fn get_and_set_through_one_level() {
    let mut n: Node<f32> = Node::new(1,2,2,1.0,false);
    assert_eq!(n.max_dim(),16);
    assert_eq!(n.child_dim(),4);
    assert_eq!(n.get(5,5,5),1.0);
    n.set(5,5,5,2.0).unwrap();
    n.set(15,0,3,3.0).unwrap();
    assert_eq!(n.get(5,5,5),2.0);
    assert_eq!(n.get(15,0,3),3.0);
    assert_eq!(n.get(5,5,4),1.0);
    assert!(!n.is_empty());
}

#[test]
fn get_and_set_through_two_levels() {
    let mut n: Node<i32> = Node::new(2,2,2,0,false);
    assert_eq!(n.max_dim(),64);
    assert_eq!(n.child_dim(),16);
    n.set(0,0,0,1).unwrap();
    n.set(63,63,63,2).unwrap();
    n.set(17,33,50,3).unwrap();
    assert_eq!(n.get(0,0,0),1);
    assert_eq!(n.get(63,63,63),2);
    assert_eq!(n.get(17,33,50),3);
    assert_eq!(n.get(1,0,0),0);
}

#[test]
fn fill_node_reads_fill_everywhere() {
    let n: Node<i32> = Node::new(2,2,2,5,true);
    assert!(n.is_fill());
    assert!(!n.is_empty());
    assert_eq!(n.get(0,0,0),5);
    assert_eq!(n.get(1,2,3),5);
    assert_eq!(n.get(63,63,63),5);
    let bounds = n.compute_set_bounds();
    assert_eq!(bounds.min(),IndexVec::new(0,0,0));
    assert_eq!(bounds.max(),IndexVec::new(64,64,64));
}

#[test]
fn setting_the_fill_value_into_a_fill_node_is_free() {
    let mut n: Node<i32> = Node::new(2,2,2,5,true);
    n.set(10,20,30,5).unwrap();
    assert!(n.is_fill());
}

#[test]
fn diverging_write_materializes_fill_branches() {
    let mut n: Node<i32> = Node::new(2,2,2,5,true);
    n.set(0,0,0,9).unwrap();
    assert!(!n.is_fill());
    assert_eq!(n.get(0,0,0),9);
    // the rest of the subtree still reads the old fill, which also became
    // the branching default
    assert_eq!(n.get(0,0,1),5);
    assert_eq!(n.get(63,63,63),5);
    assert_eq!(n.default_value(),5);
    // every slot was preloaded as a fill child
    for b in 0..64 {
        match n.branch(b) {
            Some(Branch::Node(child)) => assert!(b == 0 || child.is_fill()),
            _ => panic!("expected a node child at slot {}",b)
        }
    }
}

#[test]
fn fill_node_growth_then_unset() {
    let mut n: Node<i32> = Node::new(2,2,2,5,true);
    assert_eq!(n.get(1,2,3),5);
    n.unset(0,0,0,1).unwrap();
    assert!(!n.is_fill());
    assert_eq!(n.get(0,0,0),1);
    assert_eq!(n.get(1,2,3),5);
    assert_eq!(n.get(40,40,40),5);
}

#[test]
fn update_applies_through_fill() {
    let mut n: Node<i32> = Node::new(1,2,2,10,true);
    n.update(3,3,3,4,|a,b| a + b).unwrap();
    assert_eq!(n.get(3,3,3),14);
    assert_eq!(n.get(0,0,0),10);
    // update on a branching node reaches the cell op
    let mut b: Node<i32> = Node::new(1,2,2,0,false);
    b.update(1,1,1,3,|a,v| a + v).unwrap();
    b.update(1,1,1,3,|a,v| a + v).unwrap();
    assert_eq!(b.get(1,1,1),6);
}

#[test]
fn unset_reclaims_empty_children() {
    let mut n: Node<i32> = Node::new(2,2,2,0,false);
    n.set(0,0,0,7).unwrap();
    n.set(20,20,20,8).unwrap();
    n.unset(0,0,0,0).unwrap();
    assert!(n.branch(0).is_none());
    assert!(!n.bitfield().is_set(0));
    assert!(!n.is_empty());
    n.unset(20,20,20,0).unwrap();
    assert!(n.is_empty());
    assert_eq!(n.get(20,20,20),0);
}

#[test]
fn set_bounds_across_branches() {
    let mut n: Node<i32> = Node::new(2,2,2,0,false);
    n.set(3,3,3,1).unwrap();
    n.set(40,41,42,1).unwrap();
    let bounds = n.compute_set_bounds();
    assert_eq!(bounds.min(),IndexVec::new(3,3,3));
    assert_eq!(bounds.max(),IndexVec::new(41,42,43));
}

#[test]
fn subtree_installation() {
    let mut old: Node<i32> = Node::new(1,2,2,0,false);
    old.set(1,1,1,5).unwrap();
    let mut root: Node<i32> = Node::new(2,2,2,0,false);
    root.set_subtree(old);
    assert!(root.bitfield().is_set(0));
    assert_eq!(root.get(1,1,1),5);
    assert_eq!(root.get(16,0,0),0);
}

#[test]
fn stream_round_trip() {
    let mut n: Node<i32> = Node::new(2,2,2,-1,false);
    n.set(0,0,0,1).unwrap();
    n.set(17,33,50,3).unwrap();
    n.set(63,0,5,4).unwrap();
    let mut buf: Vec<u8> = Vec::new();
    n.write(&mut buf).expect("write failed");
    let back = Node::<i32>::read(&mut std::io::Cursor::new(buf)).expect("read failed");
    assert_eq!(n,back);
    // a fill node round-trips with no children in the stream
    let fill: Node<i32> = Node::new(3,2,2,9,true);
    let mut buf: Vec<u8> = Vec::new();
    fill.write(&mut buf).expect("write failed");
    let back = Node::<i32>::read(&mut std::io::Cursor::new(buf)).expect("read failed");
    assert_eq!(fill,back);
}

#[test]
fn leaf_groups_round_trip() {
    let mut n: Node<i32> = Node::new(2,2,2,0,false);
    n.set(2,2,2,1).unwrap();
    n.set(20,0,0,2).unwrap();
    let mut vol = Group::new("vol");
    n.write_leaves(&mut vol,0,IndexVec::new(0,0,0));
    let mut back: Node<i32> = Node::new(2,2,2,0,false);
    for leaf in vol.groups() {
        let offset = leaf.read_index_vec(INDEX_OFFSET_ATTR).unwrap();
        back.read_leaf(leaf,offset).expect("leaf read failed");
    }
    assert_eq!(back.get(2,2,2),1);
    assert_eq!(back.get(20,0,0),2);
    assert_eq!(back.get(0,0,0),0);
    assert_eq!(n,back);
}

#[test]
fn fill_leaf_groups_round_trip() {
    // materialized fill children land as fill-node leaves
    let mut n: Node<i32> = Node::new(2,2,2,5,true);
    n.set(0,0,0,9).unwrap();
    let mut vol = Group::new("vol");
    n.write_leaves(&mut vol,0,IndexVec::new(0,0,0));
    // 63 fill children at level 1 plus the cells of the diverged branch
    let fills = vol.groups().filter(|g| g.name().starts_with("fill")).count();
    assert_eq!(fills,63);
    let mut back: Node<i32> = Node::new(2,2,2,0,false);
    for leaf in vol.groups() {
        let offset = leaf.read_index_vec(INDEX_OFFSET_ATTR).unwrap();
        back.read_leaf(leaf,offset).expect("leaf read failed");
    }
    assert_eq!(back.get(0,0,0),9);
    assert_eq!(back.get(0,0,1),5);
    assert_eq!(back.get(63,63,63),5);
}
