//! Packed 3D bitfield.
//!
//! A `BitField3D` stores one bit per voxel of a cube of side `2^lg_size`,
//! addressed either by linear index or by (i,j,k).  Bit `i` lives in word
//! `i / 64` at position `i % 64`; the semantic order is always the linear
//! index.  Besides plain bit access it provides the rank queries the cell
//! representations depend on (`count_range`, `nth_set_index`,
//! `is_single_bit_set`) and three families of iterators:
//!
//! * a linear iterator over every bit,
//! * set/unset iterators, optionally coupled with a foreign iterator that is
//!   advanced in lock-step so payload data can be walked next to the bits,
//! * a window iterator enumerating the linear indices of a cubic sub-region,
//!   carrying row and page shifts so that incrementing never leaves the
//!   window.
//!
//! Out-of-range indices are precondition violations, not recoverable errors.

use std::io::{Read,Write};
use crate::bitops::{num_bits_3d,linear_index,coordinates,round_pow2};
use crate::types::{Idx,IndexVec};
use crate::value::Value;
use crate::store::{Group,Dataset,BITFIELD_DATA_SET,BITFIELD_SIZE_ATTR};
use crate::{Error,Result};

pub const WORD_BITS: Idx = u64::BITS;

#[derive(Clone,Debug)]
pub struct BitField3D {
    /// backing words, may hold more capacity than the current size needs
    words: Vec<u64>,
    /// log2 of the cube side
    lg_size: u8
}

impl BitField3D {
    pub fn new(lg_size: u8) -> Self {
        let bits = num_bits_3d(lg_size);
        let words = round_pow2(bits,WORD_BITS) / WORD_BITS;
        Self {
            words: vec![0;words as usize],
            lg_size
        }
    }
    /// log2 of the cube side
    pub fn lg_size(&self) -> u8 {
        self.lg_size
    }
    /// cube side
    pub fn dim(&self) -> Idx {
        1 << self.lg_size
    }
    /// total number of bits
    pub fn bits(&self) -> Idx {
        num_bits_3d(self.lg_size)
    }
    /// number of bits the backing store can hold without reallocating
    pub fn capacity(&self) -> Idx {
        self.words.len() as Idx * WORD_BITS
    }
    /// linear index of (i,j,k) in this cube
    pub fn index(&self,i: Idx,j: Idx,k: Idx) -> Idx {
        linear_index(i,j,k,self.lg_size)
    }
    /// (i,j,k) of a linear index in this cube
    pub fn coordinates(&self,index: Idx) -> IndexVec {
        coordinates(index,self.lg_size)
    }
    pub fn is_set(&self,index: Idx) -> bool {
        debug_assert!(index < self.bits());
        self.words[(index / WORD_BITS) as usize] & (1 << (index % WORD_BITS)) != 0
    }
    pub fn is_set_3d(&self,i: Idx,j: Idx,k: Idx) -> bool {
        self.is_set(self.index(i,j,k))
    }
    pub fn set_bit(&mut self,index: Idx) {
        debug_assert!(index < self.bits());
        self.words[(index / WORD_BITS) as usize] |= 1 << (index % WORD_BITS);
    }
    pub fn set_bit_3d(&mut self,i: Idx,j: Idx,k: Idx) {
        self.set_bit(self.index(i,j,k));
    }
    pub fn unset_bit(&mut self,index: Idx) {
        debug_assert!(index < self.bits());
        self.words[(index / WORD_BITS) as usize] &= !(1 << (index % WORD_BITS));
    }
    pub fn unset_bit_3d(&mut self,i: Idx,j: Idx,k: Idx) {
        self.unset_bit(self.index(i,j,k));
    }
    /// number of whole words in use, plus a partial word flag
    fn used(&self) -> (usize,Idx) {
        let bits = self.bits();
        ((bits / WORD_BITS) as usize,bits % WORD_BITS)
    }
    /// number of words touched by the current size
    fn used_words(&self) -> usize {
        let (whole,part) = self.used();
        whole + (part != 0) as usize
    }
    /// number of bytes the current size occupies on disk
    pub fn used_bytes(&self) -> usize {
        (self.bits() as usize + 7) / 8
    }
    pub fn fill_bits(&mut self) {
        let (whole,part) = self.used();
        for w in self.words[..whole].iter_mut() {
            *w = u64::MAX;
        }
        if part != 0 {
            self.words[whole] = (1u64 << part) - 1;
        }
    }
    pub fn clear_bits(&mut self) {
        for w in self.words.iter_mut() {
            *w = 0;
        }
    }
    pub fn invert_bits(&mut self) {
        let (whole,part) = self.used();
        for w in self.words[..whole].iter_mut() {
            *w = !*w;
        }
        if part != 0 {
            self.words[whole] = !self.words[whole] & ((1u64 << part) - 1);
        }
    }
    pub fn is_full(&self) -> bool {
        let (whole,part) = self.used();
        if self.words[..whole].iter().any(|w| *w != u64::MAX) {
            return false;
        }
        part == 0 || self.words[whole] == (1u64 << part) - 1
    }
    pub fn is_empty(&self) -> bool {
        self.words[..self.used_words()].iter().all(|w| *w == 0)
    }
    /// true iff exactly one bit is set and it is at `index`
    pub fn is_single_bit_set(&self,index: Idx) -> bool {
        let block = (index / WORD_BITS) as usize;
        if self.words[block] != 1 << (index % WORD_BITS) {
            return false;
        }
        self.words.iter().enumerate().all(|(i,w)| i == block || *w == 0)
    }
    /// total number of set bits
    pub fn count(&self) -> Idx {
        self.count_range(self.bits())
    }
    /// number of set bits strictly below linear index `n`
    pub fn count_range(&self,n: Idx) -> Idx {
        debug_assert!(n <= self.bits());
        let whole = (n / WORD_BITS) as usize;
        let part = n % WORD_BITS;
        let mut count: Idx = self.words[..whole].iter().map(|w| w.count_ones()).sum();
        if part != 0 {
            count += (self.words[whole] & ((1u64 << part) - 1)).count_ones();
        }
        count
    }
    /// linear index of the (n+1)-th set bit
    pub fn nth_set_index(&self,n: Idx) -> Idx {
        let mut remaining = n + 1;
        for (wi,w) in self.words[..self.used_words()].iter().enumerate() {
            let ones = w.count_ones();
            if remaining > ones {
                remaining -= ones;
                continue;
            }
            let mut word = *w;
            loop {
                let bit = word.trailing_zeros();
                remaining -= 1;
                if remaining == 0 {
                    return wi as Idx * WORD_BITS + bit;
                }
                word &= word - 1;
            }
        }
        debug_assert!(false,"fewer than n+1 bits set");
        self.bits()
    }
    /// Resize the cube, preserving every set voxel by 3D coordinate.  Uses
    /// the existing backing store when it is large enough, otherwise
    /// reallocates.  Voxels outside the new cube are dropped.
    pub fn resize(&mut self,new_lg: u8) {
        let new_bits = num_bits_3d(new_lg);
        if self.capacity() < new_bits {
            let mut that = BitField3D::new(new_lg);
            for (_,coords) in self.set_bits() {
                that.set_bit_3d(coords.x,coords.y,coords.z);
            }
            std::mem::swap(self,&mut that);
            return;
        }
        if self.lg_size < new_lg {
            // relabel in place, walking down so moved bits never collide
            let mut bit = self.bits();
            while bit > 0 {
                bit -= 1;
                let c = self.coordinates(bit);
                let was_set = self.is_set(bit);
                self.unset_bit(bit);
                if was_set {
                    let index = linear_index(c.x,c.y,c.z,new_lg);
                    self.words[(index / WORD_BITS) as usize] |= 1 << (index % WORD_BITS);
                }
            }
        } else if self.lg_size > new_lg {
            for index in 0..new_bits {
                let c = coordinates(index,new_lg);
                if self.is_set_3d(c.x,c.y,c.z) {
                    self.words[(index / WORD_BITS) as usize] |= 1 << (index % WORD_BITS);
                } else {
                    self.words[(index / WORD_BITS) as usize] &= !(1 << (index % WORD_BITS));
                }
            }
            // clear everything past the new range
            let whole = (new_bits / WORD_BITS) as usize;
            let part = new_bits % WORD_BITS;
            let mut block = whole;
            if part != 0 {
                self.words[whole] &= (1u64 << part) - 1;
                block += 1;
            }
            for w in self.words[block..].iter_mut() {
                *w = 0;
            }
        }
        self.lg_size = new_lg;
    }
    /// linear iterator over all bits
    pub fn iter(&self) -> Bits<'_> {
        Bits { field: self, front: 0, back: self.bits() }
    }
    /// iterator over set bits, yielding (linear index, coordinates)
    pub fn set_bits(&self) -> StatusBits<'_,true> {
        StatusBits { field: self, cursor: 0 }
    }
    /// iterator over unset bits, yielding (linear index, coordinates)
    pub fn unset_bits(&self) -> StatusBits<'_,false> {
        StatusBits { field: self, cursor: 0 }
    }
    /// Iterator over set bits coupled with a foreign iterator of the same
    /// notional length.  The foreign iterator is advanced once per bitfield
    /// position examined, so its item always corresponds to the current bit.
    pub fn set_iter<I: Iterator>(&self,iter: I) -> Coupled<'_,I,true> {
        Coupled { field: self, cursor: 0, iter }
    }
    /// unset-polarity variant of `set_iter`
    pub fn unset_iter<I: Iterator>(&self,iter: I) -> Coupled<'_,I,false> {
        Coupled { field: self, cursor: 0, iter }
    }
    /// Iterator over the linear indices of a cubic window of side `ws`
    /// anchored at linear index `begin`.  Does not borrow the bitfield, so
    /// the indices can be consumed while mutating it.
    pub fn window_iter(&self,begin: Idx,ws: Idx) -> WindowIter {
        let size = self.dim();
        let row_shift = size - ws;
        WindowIter {
            index: begin,
            wnd_index: 0,
            wnd_size: ws,
            wnd_size_sqrd: ws * ws,
            row_shift,
            page_shift: row_shift * size
        }
    }
    /// stream form: lg_size byte followed by the used byte range
    pub fn write<W: Write>(&self,w: &mut W) -> Result<()> {
        w.write_all(&[self.lg_size])?;
        w.write_all(&self.to_bytes())?;
        Ok(())
    }
    pub fn read<R: Read>(r: &mut R) -> Result<Self> {
        let mut lg = [0u8;1];
        r.read_exact(&mut lg)?;
        let mut field = BitField3D::new(lg[0]);
        let mut bytes = vec![0u8;field.used_bytes()];
        r.read_exact(&mut bytes)?;
        field.load_bytes(&bytes);
        Ok(field)
    }
    /// container form: a byte dataset carrying the size as an attribute
    pub fn write_group(&self,group: &mut Group) {
        let bytes = self.to_bytes();
        let mut ds = Dataset::new(vec![bytes.len() as u64],u8::TYPE_TAG,bytes);
        ds.write_scalar_attr(BITFIELD_SIZE_ATTR,&self.lg_size);
        group.set_dataset(BITFIELD_DATA_SET,ds);
    }
    pub fn read_group(group: &Group) -> Result<Self> {
        let ds = group.dataset(BITFIELD_DATA_SET)?;
        let lg: u8 = ds.read_scalar_attr(BITFIELD_SIZE_ATTR)?;
        let mut field = BitField3D::new(lg);
        if ds.bytes().len() < field.used_bytes() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,"bitfield dataset too short")));
        }
        field.load_bytes(ds.bytes());
        Ok(field)
    }
    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes: Vec<u8> = Vec::with_capacity(self.used_words() * 8);
        for w in self.words[..self.used_words()].iter() {
            bytes.extend_from_slice(&w.to_le_bytes());
        }
        bytes.truncate(self.used_bytes());
        bytes
    }
    fn load_bytes(&mut self,bytes: &[u8]) {
        for (wi,chunk) in bytes[..self.used_bytes()].chunks(8).enumerate() {
            let mut word = [0u8;8];
            word[..chunk.len()].copy_from_slice(chunk);
            self.words[wi] = u64::from_le_bytes(word);
        }
    }
}

impl PartialEq for BitField3D {
    fn eq(&self,that: &Self) -> bool {
        self.lg_size == that.lg_size &&
            self.words[..self.used_words()] == that.words[..that.used_words()]
    }
}

/// linear bidirectional iterator, yields (linear index, is set)
pub struct Bits<'a> {
    field: &'a BitField3D,
    front: Idx,
    back: Idx
}

impl<'a> Iterator for Bits<'a> {
    type Item = (Idx,bool);
    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let i = self.front;
        self.front += 1;
        Some((i,self.field.is_set(i)))
    }
}

impl<'a> DoubleEndedIterator for Bits<'a> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        Some((self.back,self.field.is_set(self.back)))
    }
}

/// iterator over bits of one polarity, yields (linear index, coordinates)
pub struct StatusBits<'a,const S: bool> {
    field: &'a BitField3D,
    cursor: Idx
}

impl<'a,const S: bool> Iterator for StatusBits<'a,S> {
    type Item = (Idx,IndexVec);
    fn next(&mut self) -> Option<Self::Item> {
        let total = self.field.bits();
        while self.cursor < total {
            let i = self.cursor;
            self.cursor += 1;
            if self.field.is_set(i) == S {
                return Some((i,self.field.coordinates(i)));
            }
        }
        None
    }
}

/// one-polarity iterator advancing a foreign iterator in lock-step
pub struct Coupled<'a,I: Iterator,const S: bool> {
    field: &'a BitField3D,
    cursor: Idx,
    iter: I
}

impl<'a,I: Iterator,const S: bool> Iterator for Coupled<'a,I,S> {
    type Item = (Idx,IndexVec,I::Item);
    fn next(&mut self) -> Option<Self::Item> {
        let total = self.field.bits();
        while self.cursor < total {
            let i = self.cursor;
            self.cursor += 1;
            let item = self.iter.next()?;
            if self.field.is_set(i) == S {
                return Some((i,self.field.coordinates(i),item));
            }
        }
        None
    }
}

/// enumerates the linear indices of a cubic sub-window
pub struct WindowIter {
    index: Idx,
    wnd_index: Idx,
    wnd_size: Idx,
    wnd_size_sqrd: Idx,
    row_shift: Idx,
    page_shift: Idx
}

impl Iterator for WindowIter {
    type Item = Idx;
    fn next(&mut self) -> Option<Idx> {
        if self.wnd_index >= self.wnd_size * self.wnd_size_sqrd {
            return None;
        }
        let current = self.index;
        self.index += 1;
        self.wnd_index += 1;
        // jump over the row and page boundaries of the enclosing cube
        if self.wnd_index % self.wnd_size == 0 {
            self.index += self.row_shift;
        }
        if self.wnd_index % self.wnd_size_sqrd == 0 {
            self.index += self.page_shift;
        }
        Some(current)
    }
}

// *************** TESTS *****************

#[test]
fn bit_access() {
    let mut b = BitField3D::new(2);
    assert_eq!(b.bits(),64);
    assert!(b.is_empty());
    b.set_bit_3d(1,2,3);
    assert!(b.is_set(b.index(1,2,3)));
    assert!(b.is_set_3d(1,2,3));
    assert!(!b.is_set_3d(3,2,1));
    assert_eq!(b.count(),1);
    assert!(b.is_single_bit_set(b.index(1,2,3)));
    b.set_bit(0);
    assert!(!b.is_single_bit_set(b.index(1,2,3)));
    b.unset_bit_3d(1,2,3);
    b.unset_bit(0);
    assert!(b.is_empty());
}

#[test]
fn fill_clear_invert() {
    let mut b = BitField3D::new(1);
    assert_eq!(b.bits(),8);
    b.fill_bits();
    assert!(b.is_full());
    assert_eq!(b.count(),8);
    b.invert_bits();
    assert!(b.is_empty());
    b.set_bit(3);
    b.invert_bits();
    assert_eq!(b.count(),7);
    assert!(!b.is_set(3));
    b.clear_bits();
    assert!(b.is_empty());
    // partial word handling on a 3-lg cube (512 bits)
    let mut big = BitField3D::new(3);
    big.fill_bits();
    assert!(big.is_full());
    assert_eq!(big.count(),512);
}

#[test]
fn rank_queries() {
    let mut b = BitField3D::new(2);
    for i in [3u32,17,22,63] {
        b.set_bit(i);
    }
    assert_eq!(b.count(),4);
    assert_eq!(b.count_range(0),0);
    assert_eq!(b.count_range(4),1);
    assert_eq!(b.count_range(18),2);
    assert_eq!(b.count_range(64),4);
    assert_eq!(b.nth_set_index(0),3);
    assert_eq!(b.nth_set_index(1),17);
    assert_eq!(b.nth_set_index(2),22);
    assert_eq!(b.nth_set_index(3),63);
}

#[test]
fn rank_queries_across_words() {
    let mut b = BitField3D::new(3);
    for i in [1u32,70,200,400,511] {
        b.set_bit(i);
    }
    assert_eq!(b.count_range(70),1);
    assert_eq!(b.count_range(71),2);
    assert_eq!(b.count_range(511),4);
    assert_eq!(b.nth_set_index(2),200);
    assert_eq!(b.nth_set_index(4),511);
}

#[test]
fn status_iterators() {
    let mut b = BitField3D::new(1);
    b.set_bit_3d(1,0,0);
    b.set_bit_3d(0,1,1);
    let set: Vec<(u32,IndexVec)> = b.set_bits().collect();
    assert_eq!(set,vec![(1,IndexVec::new(1,0,0)),(6,IndexVec::new(0,1,1))]);
    assert_eq!(b.unset_bits().count(),6);
    // coupled with a payload iterator
    let data: Vec<char> = "abcdefgh".chars().collect();
    let coupled: Vec<char> = b.set_iter(data.iter().copied()).map(|(_,_,c)| c).collect();
    assert_eq!(coupled,vec!['b','g']);
    let uncoupled: Vec<char> = b.unset_iter(data.iter().copied()).map(|(_,_,c)| c).collect();
    assert_eq!(uncoupled,vec!['a','c','d','e','f','h']);
}

#[test]
fn linear_iterator_runs_both_ways() {
    let mut b = BitField3D::new(1);
    b.set_bit(0);
    b.set_bit(7);
    let forward: Vec<bool> = b.iter().map(|(_,s)| s).collect();
    assert_eq!(forward.len(),8);
    assert!(forward[0] && forward[7]);
    let backward: Vec<u32> = b.iter().rev().filter(|(_,s)| *s).map(|(i,_)| i).collect();
    assert_eq!(backward,vec![7,0]);
}

#[test]
fn window_indices() {
    // 4x4x4 cube, 2x2x2 window anchored at (1,1,1) = index 21
    let b = BitField3D::new(2);
    let anchor = b.index(1,1,1);
    let indices: Vec<u32> = b.window_iter(anchor,2).collect();
    let expected: Vec<u32> = vec![
        b.index(1,1,1),b.index(2,1,1),
        b.index(1,2,1),b.index(2,2,1),
        b.index(1,1,2),b.index(2,1,2),
        b.index(1,2,2),b.index(2,2,2)];
    assert_eq!(indices,expected);
}

#[test]
fn window_covers_whole_cube() {
    let b = BitField3D::new(1);
    let indices: Vec<u32> = b.window_iter(0,2).collect();
    assert_eq!(indices,(0..8).collect::<Vec<u32>>());
}

#[test]
fn resize_preserves_coordinates() {
    // growing reallocates
    let mut b = BitField3D::new(1);
    b.set_bit_3d(1,0,1);
    b.set_bit_3d(0,1,0);
    b.resize(3);
    assert_eq!(b.lg_size(),3);
    assert_eq!(b.count(),2);
    assert!(b.is_set_3d(1,0,1));
    assert!(b.is_set_3d(0,1,0));
    // shrinking relabels in place and drops outside voxels
    b.set_bit_3d(7,7,7);
    b.resize(1);
    assert_eq!(b.count(),2);
    assert!(b.is_set_3d(1,0,1));
    assert!(b.is_set_3d(0,1,0));
    assert!(!b.is_set_3d(1,1,1));
}

#[test]
fn resize_in_place_growth() {
    // lg 1 allocates a whole word, so growing to lg 2 stays in place
    let mut b = BitField3D::new(1);
    b.set_bit_3d(1,1,0);
    b.set_bit_3d(0,0,1);
    assert!(b.capacity() >= 64);
    b.resize(2);
    assert_eq!(b.count(),2);
    assert!(b.is_set_3d(1,1,0));
    assert!(b.is_set_3d(0,0,1));
}

#[test]
fn stream_round_trip() {
    let mut b = BitField3D::new(2);
    b.set_bit_3d(3,1,2);
    b.set_bit(0);
    let mut buf: Vec<u8> = Vec::new();
    b.write(&mut buf).expect("write failed");
    assert_eq!(buf.len(),1 + 8);
    let back = BitField3D::read(&mut std::io::Cursor::new(buf)).expect("read failed");
    assert_eq!(b,back);
}

#[test]
fn equality_ignores_spare_capacity() {
    let mut a = BitField3D::new(1);
    let mut b = BitField3D::new(3);
    b.resize(1);
    a.set_bit(5);
    b.set_bit(5);
    assert_eq!(a,b);
    b.set_bit(6);
    assert_ne!(a,b);
}
