//! Stamp sources
//!
//! A stamp is a bounded producer of typed values that gets written into the
//! tree at an offset.  The tree only ever reads from a source; splitting the
//! write across octants, reflecting coordinates and growing storage is all
//! handled on the tree side.

use crate::bounds::SignedIndexBounds;
use crate::types::{SignedIdx,SignedIndexVec};

/// a bounded source of typed values over signed voxel coordinates
pub trait StampSource {
    type Elem;
    /// the region over which `get` is valid
    fn bounds(&self) -> SignedIndexBounds;
    /// sample at a signed voxel coordinate
    fn get(&self,i: SignedIdx,j: SignedIdx,k: SignedIdx) -> Self::Elem;
}

/// dense array of values over a signed box
#[derive(Clone,Debug)]
pub struct BoxSource<T> {
    bounds: SignedIndexBounds,
    data: Vec<T>
}

impl<T: Copy> BoxSource<T> {
    pub fn filled(bounds: SignedIndexBounds,v: T) -> Self {
        let size = Self::volume(&bounds);
        Self { bounds, data: vec![v;size] }
    }
    pub fn from_fn<F: Fn(SignedIdx,SignedIdx,SignedIdx) -> T>(bounds: SignedIndexBounds,f: F) -> Self {
        let mut data = Vec::with_capacity(Self::volume(&bounds));
        for k in bounds.min().z..bounds.max().z {
            for j in bounds.min().y..bounds.max().y {
                for i in bounds.min().x..bounds.max().x {
                    data.push(f(i,j,k));
                }
            }
        }
        Self { bounds, data }
    }
    pub fn set(&mut self,i: SignedIdx,j: SignedIdx,k: SignedIdx,v: T) {
        let index = self.index(i,j,k);
        self.data[index] = v;
    }
    fn volume(bounds: &SignedIndexBounds) -> usize {
        let d = bounds.max() - bounds.min();
        d.x as usize * d.y as usize * d.z as usize
    }
    fn index(&self,i: SignedIdx,j: SignedIdx,k: SignedIdx) -> usize {
        debug_assert!(self.bounds.in_range(SignedIndexVec::new(i,j,k)));
        let d = self.bounds.max() - self.bounds.min();
        let l = SignedIndexVec::new(i,j,k) - self.bounds.min();
        l.x as usize + l.y as usize * d.x as usize + l.z as usize * (d.x as usize * d.y as usize)
    }
}

impl<T: Copy> StampSource for BoxSource<T> {
    type Elem = T;
    fn bounds(&self) -> SignedIndexBounds {
        self.bounds
    }
    fn get(&self,i: SignedIdx,j: SignedIdx,k: SignedIdx) -> T {
        self.data[self.index(i,j,k)]
    }
}

/// source computing each sample from its coordinates
pub struct FnSource<T,F: Fn(SignedIdx,SignedIdx,SignedIdx) -> T> {
    bounds: SignedIndexBounds,
    f: F
}

impl<T,F: Fn(SignedIdx,SignedIdx,SignedIdx) -> T> FnSource<T,F> {
    pub fn new(bounds: SignedIndexBounds,f: F) -> Self {
        Self { bounds, f }
    }
}

impl<T,F: Fn(SignedIdx,SignedIdx,SignedIdx) -> T> StampSource for FnSource<T,F> {
    type Elem = T;
    fn bounds(&self) -> SignedIndexBounds {
        self.bounds
    }
    fn get(&self,i: SignedIdx,j: SignedIdx,k: SignedIdx) -> T {
        (self.f)(i,j,k)
    }
}

// *************** TESTS *****************

#[cfg(test)]
use crate::types::Vec3;

#[test]
fn box_source_indexing() {
    let bounds = SignedIndexBounds::new(Vec3::new(-2,-2,-2),Vec3::new(2,2,2));
    let mut src = BoxSource::filled(bounds,0i32);
    src.set(-2,-2,-2,5);
    src.set(1,1,1,7);
    src.set(0,-1,1,9);
    assert_eq!(src.get(-2,-2,-2),5);
    assert_eq!(src.get(1,1,1),7);
    assert_eq!(src.get(0,-1,1),9);
    assert_eq!(src.get(0,0,0),0);
}

#[test]
fn fn_source_samples_coordinates() {
    let bounds = SignedIndexBounds::new(Vec3::new(-4,-4,-4),Vec3::new(4,4,4));
    let src = FnSource::new(bounds,|i,j,k| i * 100 + j * 10 + k);
    assert_eq!(src.get(-1,2,-3),-100 + 20 - 3);
    assert_eq!(src.bounds().min(),Vec3::new(-4,-4,-4));
}
