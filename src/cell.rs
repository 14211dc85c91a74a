//! Leaf voxel block.
//!
//! A `Cell` holds a cube of `2^lg_dim` voxels per axis behind one bitfield
//! of set voxels, a default value for unset voxels, and one of three payload
//! representations:
//!
//! * **Filled**: no payload at all, every set voxel reads the fill value.
//!   A fresh cell starts here, and stays here as long as it holds at most
//!   one distinct value.
//! * **Expanded**: one payload slot per voxel.  Entered the first time a
//!   second distinct value is written.
//! * **Compressed**: one payload slot per *set* voxel, located by rank
//!   queries on the bitfield.  Explicitly entered via `compress` and left
//!   via `uncompress`; all mutators fail while compressed.
//!
//! The disk form is always compressed; reading restores whichever state the
//! cell was written in.

use std::io::{Read,Write};
use crate::bitfield::BitField3D;
use crate::bitops::num_bits_3d;
use crate::bounds::IndexBounds;
use crate::stamp::StampSource;
use crate::store::{Group,Dataset,LeafType,leaf_group_name,
    CELL_FLAGS_ATTR,INDEX_OFFSET_ATTR,QUADRANT_ATTR,LEAF_TYPE_ATTR,
    DEFAULT_VALUE_ATTR,FILL_VALUE_ATTR,VOXEL_DATA_SET};
use crate::bounds::SignedIndexBounds;
use crate::types::{Idx,IndexVec,SignedIndexVec};
use crate::value::Value;
use crate::{Error,Result};

pub const CELL_FLAG_COMPRESSED: u8 = 0x01;
pub const CELL_FLAG_FILLED: u8 = 0x02;

#[derive(Clone,Debug)]
pub struct Cell<T: Value> {
    /// payload, empty while filled
    data: Vec<T>,
    default_value: T,
    fill_value: T,
    bitfield: BitField3D,
    flags: u8
}

impl<T: Value> Cell<T> {
    /// empty filled cell, nothing set, no payload
    pub fn new(lg_dim: u8,default_value: T) -> Self {
        Self {
            data: Vec::new(),
            default_value,
            fill_value: default_value,
            bitfield: BitField3D::new(lg_dim),
            flags: CELL_FLAG_FILLED
        }
    }
    /// filled cell with every voxel set to `fill_value`
    pub fn new_filled(lg_dim: u8,default_value: T,fill_value: T) -> Self {
        let mut bitfield = BitField3D::new(lg_dim);
        bitfield.fill_bits();
        Self {
            data: Vec::new(),
            default_value,
            fill_value,
            bitfield,
            flags: CELL_FLAG_FILLED
        }
    }
    /// side of the cell cube
    pub fn dim(&self) -> Idx {
        self.bitfield.dim()
    }
    pub fn lg_dim(&self) -> u8 {
        self.bitfield.lg_size()
    }
    /// payload slots currently allocated
    pub fn data_size(&self) -> usize {
        self.data.len()
    }
    pub fn default_value(&self) -> T {
        self.default_value
    }
    pub fn fill_value(&self) -> T {
        self.fill_value
    }
    pub fn is_empty(&self) -> bool {
        self.bitfield.is_empty()
    }
    pub fn is_filled(&self) -> bool {
        self.flags & CELL_FLAG_FILLED != 0
    }
    pub fn is_compressed(&self) -> bool {
        self.flags & CELL_FLAG_COMPRESSED != 0
    }
    pub fn is_set(&self,i: Idx,j: Idx,k: Idx) -> bool {
        self.bitfield.is_set_3d(i,j,k)
    }
    pub(crate) fn bitfield(&self) -> &BitField3D {
        &self.bitfield
    }
    pub(crate) fn data(&self) -> &[T] {
        &self.data
    }

    pub fn get(&self,i: Idx,j: Idx,k: Idx) -> T {
        self.get_index(self.bitfield.index(i,j,k))
    }
    pub fn get_index(&self,index: Idx) -> T {
        if !self.bitfield.is_set(index) {
            self.default_value
        } else if self.is_filled() {
            self.fill_value
        } else if self.is_compressed() {
            self.data[(self.bitfield.count_range(index + 1) - 1) as usize]
        } else {
            self.data[index as usize]
        }
    }

    pub fn set(&mut self,i: Idx,j: Idx,k: Idx,value: T) -> Result<()> {
        self.set_index(self.bitfield.index(i,j,k),value)
    }
    pub fn set_index(&mut self,index: Idx,value: T) -> Result<()> {
        if self.is_compressed() {
            return Err(Error::ModifyCompressed);
        }
        // the first set turns an empty cell into a one-value filled cell
        if self.bitfield.is_empty() {
            self.data = Vec::new();
            self.flags |= CELL_FLAG_FILLED;
            self.bitfield.set_bit(index);
            self.fill_value = value;
            return Ok(());
        }
        if self.is_filled() {
            if self.fill_value == value {
                self.bitfield.set_bit(index);
                return Ok(());
            }
            // rewriting the only set voxel just moves the fill value
            if self.bitfield.is_single_bit_set(index) {
                self.fill_value = value;
                return Ok(());
            }
            // a second distinct value forces dense storage
            let fill = self.fill_value;
            self.flags &= !CELL_FLAG_FILLED;
            self.initialize_set(fill);
        }
        self.bitfield.set_bit(index);
        self.data[index as usize] = value;
        Ok(())
    }

    pub fn update<Op: Fn(T,T) -> T>(&mut self,i: Idx,j: Idx,k: Idx,value: T,op: Op) -> Result<()> {
        self.update_index(self.bitfield.index(i,j,k),value,op)
    }
    pub fn update_index<Op: Fn(T,T) -> T>(&mut self,index: Idx,value: T,op: Op) -> Result<()> {
        let val = op(self.get_index(index),value);
        self.set_index(index,val)
    }

    pub fn unset(&mut self,i: Idx,j: Idx,k: Idx) -> Result<()> {
        self.unset_index(self.bitfield.index(i,j,k))
    }
    pub fn unset_index(&mut self,index: Idx) -> Result<()> {
        if self.is_compressed() {
            return Err(Error::ModifyCompressed);
        }
        self.bitfield.unset_bit(index);
        if !self.is_filled() {
            self.data[index as usize] = self.default_value;
        }
        Ok(())
    }

    /// every voxel set to `value`, payload dropped
    pub fn fill(&mut self,value: T) -> Result<()> {
        if self.is_compressed() {
            return Err(Error::ModifyCompressed);
        }
        self.data = Vec::new();
        self.flags |= CELL_FLAG_FILLED;
        self.fill_value = value;
        self.bitfield.fill_bits();
        Ok(())
    }
    /// every voxel unset, payload dropped, default preserved
    pub fn clear(&mut self) -> Result<()> {
        if self.is_compressed() {
            return Err(Error::ModifyCompressed);
        }
        self.data = Vec::new();
        self.flags |= CELL_FLAG_FILLED;
        self.bitfield.clear_bits();
        Ok(())
    }

    /// pack the payload down to one slot per set voxel; filled cells only
    /// gain the flag
    pub fn compress(&mut self) {
        if !self.is_compressed() && !self.is_filled() {
            let packed: Vec<T> = self.bitfield
                .set_iter(self.data.iter().copied())
                .map(|(_,_,v)| v)
                .collect();
            self.data = packed;
        }
        self.flags |= CELL_FLAG_COMPRESSED;
    }
    /// restore dense storage, seeding unset voxels with the default
    pub fn uncompress(&mut self) {
        if self.is_compressed() && !self.is_filled() {
            let mut expanded = vec![self.default_value;num_bits_3d(self.lg_dim()) as usize];
            for (slot,(index,_)) in self.bitfield.set_bits().enumerate() {
                expanded[index as usize] = self.data[slot];
            }
            self.data = expanded;
        }
        self.flags &= !CELL_FLAG_COMPRESSED;
    }

    /// set a cubic window of side `window` anchored at `min` to `value`
    pub fn set_block(&mut self,min: IndexVec,window: Idx,value: T) -> Result<()> {
        let min_index = self.bitfield.index(min.x,min.y,min.z);
        if min_index == 0 && window == self.dim() {
            return self.fill(value);
        }
        for index in self.bitfield.window_iter(min_index,window) {
            self.set_index(index,value)?;
        }
        Ok(())
    }
    /// unset every set voxel of a cubic window
    pub fn unset_block(&mut self,min: IndexVec,window: Idx) -> Result<()> {
        let min_index = self.bitfield.index(min.x,min.y,min.z);
        for index in self.bitfield.window_iter(min_index,window) {
            if self.bitfield.is_set(index) {
                self.unset_index(index)?;
            }
        }
        Ok(())
    }

    /// Write a stamp region into the cell.  `transform` reflects the source
    /// across the octant diagonal; reflected axes walk the source backwards
    /// starting one below the old exclusive max.
    pub fn stamp<S: StampSource>(&mut self,src: &S,mut stamp_bounds: SignedIndexBounds,
            cell_bounds: &IndexBounds,transform: SignedIndexVec) -> Result<()>
            where S::Elem: Into<T> {
        if transform.x < 0 {
            let (lo,hi) = (stamp_bounds.min().x - 1,stamp_bounds.max().x - 1);
            stamp_bounds.min_mut().x = hi;
            stamp_bounds.max_mut().x = lo;
        }
        if transform.y < 0 {
            let (lo,hi) = (stamp_bounds.min().y - 1,stamp_bounds.max().y - 1);
            stamp_bounds.min_mut().y = hi;
            stamp_bounds.max_mut().y = lo;
        }
        if transform.z < 0 {
            let (lo,hi) = (stamp_bounds.min().z - 1,stamp_bounds.max().z - 1);
            stamp_bounds.min_mut().z = hi;
            stamp_bounds.max_mut().z = lo;
        }
        // outer k keeps the cell queries cache coherent
        let mut sk = stamp_bounds.min().z;
        for ck in cell_bounds.min().z..cell_bounds.max().z {
            let mut sj = stamp_bounds.min().y;
            for cj in cell_bounds.min().y..cell_bounds.max().y {
                let mut si = stamp_bounds.min().x;
                for ci in cell_bounds.min().x..cell_bounds.max().x {
                    let value = src.get(si,sj,sk);
                    self.set(ci,cj,ck,value.into())?;
                    si += transform.x;
                }
                sj += transform.y;
            }
            sk += transform.z;
        }
        Ok(())
    }

    /// half-open box around the set voxels
    pub fn compute_set_bounds(&self) -> IndexBounds {
        debug_assert!(!self.is_empty());
        if self.bitfield.is_full() {
            return IndexBounds::from_scalars(0,self.dim());
        }
        let mut bounds = IndexBounds::from_scalars(self.dim(),0);
        for (_,c) in self.bitfield.set_bits() {
            bounds.update_extrema(c.x,c.y,c.z);
        }
        bounds.translate_max(IndexVec::splat(1));
        bounds
    }

    /// Every voxel value in linear order, constant time per step in all
    /// three representations.
    pub fn values(&self) -> CellValues<'_,T> {
        CellValues { cell: self, index: 0, slot: 0 }
    }
    /// mutable payload traversal; expanded cells only
    pub fn values_mut(&mut self) -> std::slice::IterMut<'_,T> {
        debug_assert!(!self.is_filled() && !self.is_compressed());
        self.data.iter_mut()
    }

    /// seed a dense payload: default everywhere, `v` at set positions
    fn initialize_set(&mut self,v: T) {
        let mut data = vec![self.default_value;num_bits_3d(self.lg_dim()) as usize];
        for (index,_) in self.bitfield.set_bits() {
            data[index as usize] = v;
        }
        self.data = data;
    }

    // IO

    /// stream form: flags, then the compressed rendition of the payload
    pub fn write<W: Write>(&self,w: &mut W) -> Result<()> {
        w.write_all(&[self.flags])?;
        let mut copy = self.clone();
        copy.compress();
        copy.write_internal(w)
    }
    fn write_internal(&self,w: &mut impl Write) -> Result<()> {
        self.bitfield.write(w)?;
        self.default_value.write_to(w)?;
        self.fill_value.write_to(w)?;
        (self.data.len() as u64).write_to(w)?;
        if !self.is_filled() {
            for v in self.data.iter() {
                v.write_to(w)?;
            }
        }
        Ok(())
    }
    pub fn read<R: Read>(r: &mut R) -> Result<Self> {
        let mut flags = [0u8;1];
        r.read_exact(&mut flags)?;
        let bitfield = BitField3D::read(r)?;
        let default_value = T::read_from(r)?;
        let fill_value = T::read_from(r)?;
        let data_size = u64::read_from(r)? as usize;
        let mut data = Vec::new();
        if flags[0] & CELL_FLAG_FILLED == 0 {
            data.reserve(data_size);
            for _ in 0..data_size {
                data.push(T::read_from(r)?);
            }
        }
        let mut cell = Self { data, default_value, fill_value, bitfield, flags: flags[0] };
        // the disk form is always compressed, restore the written state
        if cell.flags & CELL_FLAG_COMPRESSED == 0 {
            cell.flags |= CELL_FLAG_COMPRESSED;
            cell.uncompress();
        }
        Ok(cell)
    }
    /// container form: one leaf group keyed by quadrant and offset
    pub fn write_group(&self,volume_group: &mut Group,quadrant: u8,offset: IndexVec) {
        let name = leaf_group_name(LeafType::Cell,quadrant,offset);
        let leaf = volume_group.create_group(&name);
        leaf.write_scalar(CELL_FLAGS_ATTR,&self.flags);
        leaf.write_index_vec(INDEX_OFFSET_ATTR,offset);
        leaf.write_scalar(QUADRANT_ATTR,&quadrant);
        leaf.write_scalar(LEAF_TYPE_ATTR,&(LeafType::Cell as u8));
        let mut copy = self.clone();
        copy.compress();
        copy.write_internal_group(leaf);
    }
    fn write_internal_group(&self,leaf: &mut Group) {
        self.bitfield.write_group(leaf);
        leaf.write_scalar(DEFAULT_VALUE_ATTR,&self.default_value);
        leaf.write_scalar(FILL_VALUE_ATTR,&self.fill_value);
        if !self.is_filled() {
            let mut bytes = Vec::with_capacity(self.data.len() * T::SIZE);
            for v in self.data.iter() {
                bytes.extend_from_slice(&v.to_le_vec());
            }
            leaf.set_dataset(VOXEL_DATA_SET,
                Dataset::new(vec![self.data.len() as u64],T::TYPE_TAG,bytes));
        }
    }
    pub fn read_group(leaf: &Group) -> Result<Self> {
        let flags: u8 = leaf.read_scalar(CELL_FLAGS_ATTR)?;
        let bitfield = BitField3D::read_group(leaf)?;
        let default_value = leaf.read_scalar::<T>(DEFAULT_VALUE_ATTR)?;
        let fill_value = leaf.read_scalar::<T>(FILL_VALUE_ATTR)?;
        let data = match flags & CELL_FLAG_FILLED {
            0 => leaf.dataset(VOXEL_DATA_SET)?.read_values::<T>()?,
            _ => Vec::new()
        };
        let mut cell = Self { data, default_value, fill_value, bitfield, flags };
        if cell.flags & CELL_FLAG_COMPRESSED == 0 {
            cell.flags |= CELL_FLAG_COMPRESSED;
            cell.uncompress();
        }
        Ok(cell)
    }
}

impl<T: Value> PartialEq for Cell<T> {
    fn eq(&self,that: &Self) -> bool {
        self.flags == that.flags
            && self.data.len() == that.data.len()
            && self.default_value == that.default_value
            && self.bitfield == that.bitfield
            && (!self.is_filled() || self.fill_value == that.fill_value)
            && self.data == that.data
    }
}

/// const value iterator over every voxel in linear order
pub struct CellValues<'a,T: Value> {
    cell: &'a Cell<T>,
    index: Idx,
    /// running cursor into a compressed payload
    slot: usize
}

impl<'a,T: Value> Iterator for CellValues<'a,T> {
    type Item = T;
    fn next(&mut self) -> Option<T> {
        if self.index >= self.cell.bitfield.bits() {
            return None;
        }
        let i = self.index;
        self.index += 1;
        if !self.cell.bitfield.is_set(i) {
            Some(self.cell.default_value)
        } else if self.cell.is_filled() {
            Some(self.cell.fill_value)
        } else if self.cell.is_compressed() {
            let v = self.cell.data[self.slot];
            self.slot += 1;
            Some(v)
        } else {
            Some(self.cell.data[i as usize])
        }
    }
}

// *************** TESTS *****************

#[test]
fn single_set_stays_filled() {
    // side 2 cell, one set voxel costs no payload
    let mut cell: Cell<i32> = Cell::new(1,0);
    cell.set(0,0,0,1).unwrap();
    assert_eq!(cell.data_size(),0);
    assert!(cell.is_filled());
    assert_eq!(cell.fill_value(),1);
    assert_eq!(cell.get(0,0,0),1);
    assert_eq!(cell.get(1,0,0),0);
    assert!(cell.bitfield().is_single_bit_set(0));
}

#[test]
fn second_value_promotes_to_expanded() {
    let mut cell: Cell<i32> = Cell::new(1,0);
    cell.set(0,0,0,1).unwrap();
    cell.set(1,0,0,2).unwrap();
    assert_eq!(cell.data_size(),8);
    assert!(!cell.is_filled());
    assert_eq!(cell.get(0,0,0),1);
    assert_eq!(cell.get(1,0,0),2);
    assert_eq!(cell.get(1,1,1),0);
}

#[test]
fn same_value_only_sets_bits() {
    let mut cell: Cell<i32> = Cell::new(2,0);
    cell.set(0,0,0,5).unwrap();
    cell.set(3,3,3,5).unwrap();
    cell.set(1,2,0,5).unwrap();
    assert!(cell.is_filled());
    assert_eq!(cell.data_size(),0);
    assert_eq!(cell.get(3,3,3),5);
    assert_eq!(cell.get(2,2,2),0);
}

#[test]
fn rewriting_the_only_voxel_moves_the_fill() {
    let mut cell: Cell<i32> = Cell::new(1,0);
    cell.set(1,1,1,4).unwrap();
    cell.set(1,1,1,9).unwrap();
    assert!(cell.is_filled());
    assert_eq!(cell.data_size(),0);
    assert_eq!(cell.fill_value(),9);
    assert_eq!(cell.get(1,1,1),9);
}

#[test]
fn compressed_rejects_writes() {
    let mut cell: Cell<i32> = Cell::new(1,0);
    cell.set(0,0,0,1).unwrap();
    cell.set(1,0,0,2).unwrap();
    cell.compress();
    assert!(matches!(cell.set(1,1,1,3),Err(crate::Error::ModifyCompressed)));
    assert!(matches!(cell.unset(0,0,0),Err(crate::Error::ModifyCompressed)));
    assert!(matches!(cell.fill(7),Err(crate::Error::ModifyCompressed)));
    assert!(matches!(cell.clear(),Err(crate::Error::ModifyCompressed)));
    cell.uncompress();
    cell.set(1,1,1,3).unwrap();
    assert_eq!(cell.get(1,1,1),3);
}

#[test]
fn compress_uncompress_preserves_values() {
    let mut cell: Cell<i32> = Cell::new(2,-1);
    cell.set(0,0,0,10).unwrap();
    cell.set(3,1,2,20).unwrap();
    cell.set(2,2,2,30).unwrap();
    let before: Vec<i32> = cell.values().collect();
    cell.compress();
    assert_eq!(cell.data_size(),3);
    assert_eq!(cell.get(0,0,0),10);
    assert_eq!(cell.get(3,1,2),20);
    assert_eq!(cell.get(2,2,2),30);
    assert_eq!(cell.get(1,1,1),-1);
    let during: Vec<i32> = cell.values().collect();
    cell.uncompress();
    let after: Vec<i32> = cell.values().collect();
    assert_eq!(before,during);
    assert_eq!(before,after);
}

#[test]
fn compressing_a_filled_cell_keeps_no_payload() {
    let mut cell: Cell<i32> = Cell::new(1,0);
    cell.set(0,1,0,6).unwrap();
    cell.compress();
    assert!(cell.is_compressed());
    assert!(cell.is_filled());
    assert_eq!(cell.data_size(),0);
    assert_eq!(cell.get(0,1,0),6);
    cell.uncompress();
    assert!(!cell.is_compressed());
    assert!(cell.is_filled());
    assert_eq!(cell.get(0,1,0),6);
}

#[test]
fn unset_restores_default() {
    let mut cell: Cell<i32> = Cell::new(1,0);
    cell.set(0,0,0,1).unwrap();
    cell.set(1,0,0,2).unwrap();
    cell.unset(1,0,0).unwrap();
    assert_eq!(cell.get(1,0,0),0);
    assert!(!cell.is_set(1,0,0));
    assert_eq!(cell.get(0,0,0),1);
    // unset on a filled cell only clears the bit
    let mut filled: Cell<i32> = Cell::new(1,0);
    filled.set(0,0,0,9).unwrap();
    filled.unset(0,0,0).unwrap();
    assert!(filled.is_empty());
    assert_eq!(filled.get(0,0,0),0);
}

#[test]
fn update_applies_operator() {
    let mut cell: Cell<i32> = Cell::new(1,10);
    cell.update(0,0,0,5,|a,b| a + b).unwrap();
    // unset voxel reads the default before the op
    assert_eq!(cell.get(0,0,0),15);
    cell.update(0,0,0,2,|a,b| a * b).unwrap();
    assert_eq!(cell.get(0,0,0),30);
}

#[test]
fn fill_and_clear() {
    let mut cell: Cell<i32> = Cell::new(1,0);
    cell.set(0,0,0,1).unwrap();
    cell.set(1,0,0,2).unwrap();
    cell.fill(7).unwrap();
    assert!(cell.is_filled());
    assert_eq!(cell.data_size(),0);
    for v in cell.values() {
        assert_eq!(v,7);
    }
    cell.clear().unwrap();
    assert!(cell.is_empty());
    assert!(cell.is_filled());
    assert_eq!(cell.get(1,1,1),0);
}

#[test]
fn filled_constructor_sets_everything() {
    let cell: Cell<f32> = Cell::new_filled(2,0.0,2.5);
    assert!(cell.bitfield().is_full());
    assert_eq!(cell.get(0,0,0),2.5);
    assert_eq!(cell.get(3,3,3),2.5);
    assert_eq!(cell.default_value(),0.0);
}

#[test]
fn block_operations() {
    let mut cell: Cell<i32> = Cell::new(2,0);
    cell.set_block(IndexVec::new(1,1,1),2,5).unwrap();
    assert_eq!(cell.bitfield().count(),8);
    assert_eq!(cell.get(1,1,1),5);
    assert_eq!(cell.get(2,2,2),5);
    assert_eq!(cell.get(0,0,0),0);
    // a whole-cell block delegates to fill
    cell.set_block(IndexVec::new(0,0,0),4,9).unwrap();
    assert!(cell.is_filled());
    assert_eq!(cell.fill_value(),9);
    // carve a window back out
    cell.unset_block(IndexVec::new(0,0,0),2).unwrap();
    assert!(!cell.is_set(0,0,0));
    assert!(!cell.is_set(1,1,1));
    assert!(cell.is_set(2,2,2));
}

#[test]
fn set_bounds() {
    let mut cell: Cell<i32> = Cell::new(2,0);
    cell.set(1,2,3,1).unwrap();
    cell.set(2,1,0,1).unwrap();
    let bounds = cell.compute_set_bounds();
    assert_eq!(bounds.min(),IndexVec::new(1,1,0));
    assert_eq!(bounds.max(),IndexVec::new(3,3,4));
    cell.fill(4).unwrap();
    let bounds = cell.compute_set_bounds();
    assert_eq!(bounds.min(),IndexVec::new(0,0,0));
    assert_eq!(bounds.max(),IndexVec::new(4,4,4));
}

#[test]
fn value_iteration_matches_get() {
    let mut cell: Cell<i32> = Cell::new(1,-5);
    cell.set(0,0,0,1).unwrap();
    cell.set(1,1,0,2).unwrap();
    cell.set(0,0,1,3).unwrap();
    let by_get: Vec<i32> = (0..8).map(|i| cell.get_index(i)).collect();
    let by_iter: Vec<i32> = cell.values().collect();
    assert_eq!(by_get,by_iter);
    cell.compress();
    let compressed: Vec<i32> = cell.values().collect();
    assert_eq!(by_get,compressed);
}

#[test]
fn values_mut_edits_payload() {
    let mut cell: Cell<i32> = Cell::new(1,0);
    cell.set(0,0,0,1).unwrap();
    cell.set(1,0,0,2).unwrap();
    for v in cell.values_mut() {
        *v *= 10;
    }
    assert_eq!(cell.get(0,0,0),10);
    assert_eq!(cell.get(1,0,0),20);
}

#[test]
fn stamp_identity_transform() {
    use crate::stamp::FnSource;
    use crate::types::Vec3;
    let src = FnSource::new(
        SignedIndexBounds::new(Vec3::new(0,0,0),Vec3::new(4,4,4)),
        |i,j,k| i * 100 + j * 10 + k);
    let mut cell: Cell<i32> = Cell::new(2,0);
    let cell_bounds = IndexBounds::from_scalars(0,4);
    let stamp_bounds = SignedIndexBounds::from_scalars(0,4);
    cell.stamp(&src,stamp_bounds,&cell_bounds,SignedIndexVec::new(1,1,1)).unwrap();
    for k in 0..4 {
        for j in 0..4 {
            for i in 0..4 {
                assert_eq!(cell.get(i,j,k),i as i32 * 100 + j as i32 * 10 + k as i32);
            }
        }
    }
}

#[test]
fn stamp_reflected_axis_walks_backwards() {
    use crate::stamp::FnSource;
    use crate::types::Vec3;
    // source valid over [-4,0); transform reflects x
    let src = FnSource::new(
        SignedIndexBounds::new(Vec3::new(-4,0,0),Vec3::new(0,4,4)),
        |i,j,k| i * 100 + j * 10 + k);
    let mut cell: Cell<i32> = Cell::new(2,0);
    let cell_bounds = IndexBounds::from_scalars(0,4);
    // reflected stamp space [0,4) maps to source [-4,0)
    let mut stamp_bounds = SignedIndexBounds::default();
    stamp_bounds.set_extrema(Vec3::new(0,0,0),Vec3::new(-4,4,4));
    cell.stamp(&src,stamp_bounds,&cell_bounds,SignedIndexVec::new(-1,1,1)).unwrap();
    // cell x=0 holds the sample at source x=-1, x=3 the sample at x=-4
    assert_eq!(cell.get(0,0,0),-100);
    assert_eq!(cell.get(3,0,0),-400);
    assert_eq!(cell.get(2,1,3),-300 + 10 + 3);
}

#[test]
fn stream_round_trip_all_states() {
    // expanded
    let mut expanded: Cell<i32> = Cell::new(2,0);
    expanded.set(0,0,0,1).unwrap();
    expanded.set(3,3,3,2).unwrap();
    // filled
    let filled: Cell<i32> = Cell::new_filled(2,0,5);
    // compressed
    let mut compressed = expanded.clone();
    compressed.compress();
    for cell in [&expanded,&filled,&compressed] {
        let mut buf: Vec<u8> = Vec::new();
        cell.write(&mut buf).expect("write failed");
        let back = Cell::<i32>::read(&mut std::io::Cursor::new(buf)).expect("read failed");
        assert_eq!(*cell,back);
    }
}

#[test]
fn group_round_trip() {
    let mut cell: Cell<f32> = Cell::new(2,1.0);
    cell.set(1,0,3,4.5).unwrap();
    cell.set(2,2,2,-1.0).unwrap();
    let mut vol = Group::new("vol");
    cell.write_group(&mut vol,3,IndexVec::new(16,0,4));
    let leaf = vol.require_group("cell_q3_16_0_4").expect("leaf missing");
    assert_eq!(leaf.read_scalar::<u8>(QUADRANT_ATTR).unwrap(),3);
    assert_eq!(leaf.read_index_vec(INDEX_OFFSET_ATTR).unwrap(),IndexVec::new(16,0,4));
    let back = Cell::<f32>::read_group(leaf).expect("read failed");
    assert_eq!(cell,back);
    // the wrong element type is refused
    assert!(matches!(Cell::<f64>::read_group(leaf),Err(crate::Error::Type(_))));
}
