//! Half-open axis-aligned boxes with the 8-corner access table.
//!
//! Corners are numbered with the same bit convention as octant codes: bit 2
//! selects the min side of the x axis, bit 1 the y axis, bit 0 the z axis.
//! Corner 0 is therefore the exclusive max corner and corner 7 the min
//! corner.  The per-corner clamp table is what lets the tree split a box
//! cleanly across octants: clamping corner `c` moves exactly the three faces
//! that meet at `c`.

use crate::types::{Vec3,Idx,SignedIdx};

pub const CORNERS: u8 = 8;

pub type IndexBounds = Bounds3D<Idx>;
pub type SignedIndexBounds = Bounds3D<SignedIdx>;

fn min_c<T: PartialOrd>(a: T,b: T) -> T {
    if b < a { b } else { a }
}

fn max_c<T: PartialOrd>(a: T,b: T) -> T {
    if b > a { b } else { a }
}

/// `[min, max)` box over any scalar coordinate
#[derive(Copy,Clone,Debug,Default,PartialEq,Eq)]
pub struct Bounds3D<T> {
    min: Vec3<T>,
    max: Vec3<T>
}

impl<T: Copy + PartialOrd> Bounds3D<T> {
    pub fn new(min: Vec3<T>,max: Vec3<T>) -> Self {
        Self { min, max }
    }
    pub fn from_scalars(min: T,max: T) -> Self {
        Self { min: Vec3::splat(min), max: Vec3::splat(max) }
    }
    pub fn min(&self) -> Vec3<T> {
        self.min
    }
    pub fn max(&self) -> Vec3<T> {
        self.max
    }
    pub fn min_mut(&mut self) -> &mut Vec3<T> {
        &mut self.min
    }
    pub fn max_mut(&mut self) -> &mut Vec3<T> {
        &mut self.max
    }
    /// fetch a corner by code, corner 7 is `min`, corner 0 is `max`
    pub fn corner(&self,c: u8) -> Vec3<T> {
        assert!(c < CORNERS);
        Vec3::new(
            if c & 4 != 0 { self.min.x } else { self.max.x },
            if c & 2 != 0 { self.min.y } else { self.max.y },
            if c & 1 != 0 { self.min.z } else { self.max.z })
    }
    /// overwrite the three faces meeting at corner `c`
    pub fn set_corner(&mut self,v: Vec3<T>,c: u8) {
        assert!(c < CORNERS);
        if c & 4 != 0 { self.min.x = v.x } else { self.max.x = v.x }
        if c & 2 != 0 { self.min.y = v.y } else { self.max.y = v.y }
        if c & 1 != 0 { self.min.z = v.z } else { self.max.z = v.z }
    }
    /// shrink the three faces meeting at corner `c` toward `v`
    pub fn clamp_corner(&mut self,v: Vec3<T>,c: u8) {
        assert!(c < CORNERS);
        if c & 4 != 0 {
            self.min.x = max_c(self.min.x,v.x);
        } else {
            self.max.x = min_c(self.max.x,v.x);
        }
        if c & 2 != 0 {
            self.min.y = max_c(self.min.y,v.y);
        } else {
            self.max.y = min_c(self.max.y,v.y);
        }
        if c & 1 != 0 {
            self.min.z = max_c(self.min.z,v.z);
        } else {
            self.max.z = min_c(self.max.z,v.z);
        }
    }
    /// set min/max from two unordered corners
    pub fn set_extrema(&mut self,a: Vec3<T>,b: Vec3<T>) {
        self.min = Vec3::new(min_c(a.x,b.x),min_c(a.y,b.y),min_c(a.z,b.z));
        self.max = Vec3::new(max_c(a.x,b.x),max_c(a.y,b.y),max_c(a.z,b.z));
    }
    pub fn extrema_of(a: Vec3<T>,b: Vec3<T>) -> Self {
        let mut bounds = Self::new(a,b);
        bounds.set_extrema(a,b);
        bounds
    }
    /// widen to include the point
    pub fn update_extrema(&mut self,i: T,j: T,k: T) {
        if i < self.min.x { self.min.x = i }
        if j < self.min.y { self.min.y = j }
        if k < self.min.z { self.min.z = k }
        if i > self.max.x { self.max.x = i }
        if j > self.max.y { self.max.y = j }
        if k > self.max.z { self.max.z = k }
    }
    pub fn update_extrema_vec(&mut self,v: Vec3<T>) {
        self.update_extrema(v.x,v.y,v.z);
    }
    /// widen to include another box
    pub fn update_extrema_bounds(&mut self,that: &Bounds3D<T>) {
        if that.min.x < self.min.x { self.min.x = that.min.x }
        if that.min.y < self.min.y { self.min.y = that.min.y }
        if that.min.z < self.min.z { self.min.z = that.min.z }
        if that.max.x > self.max.x { self.max.x = that.max.x }
        if that.max.y > self.max.y { self.max.y = that.max.y }
        if that.max.z > self.max.z { self.max.z = that.max.z }
    }
    pub fn intersects(&self,that: &Bounds3D<T>) -> bool {
        self.min.x < that.max.x && that.min.x < self.max.x &&
        self.min.y < that.max.y && that.min.y < self.max.y &&
        self.min.z < that.max.z && that.min.z < self.max.z
    }
    pub fn contains(&self,that: &Bounds3D<T>) -> bool {
        self.min.x <= that.min.x && that.max.x <= self.max.x &&
        self.min.y <= that.min.y && that.max.y <= self.max.y &&
        self.min.z <= that.min.z && that.max.z <= self.max.z
    }
    /// half-open membership test
    pub fn in_range(&self,v: Vec3<T>) -> bool {
        self.min.x <= v.x && v.x < self.max.x &&
        self.min.y <= v.y && v.y < self.max.y &&
        self.min.z <= v.z && v.z < self.max.z
    }
}

impl<T: Copy + PartialOrd + Default> Bounds3D<T> {
    /// overlap of two boxes, the zero box when they are disjoint
    pub fn intersection(&self,that: &Bounds3D<T>) -> Bounds3D<T> {
        let min = Vec3::new(
            max_c(self.min.x,that.min.x),
            max_c(self.min.y,that.min.y),
            max_c(self.min.z,that.min.z));
        let max = Vec3::new(
            min_c(self.max.x,that.max.x),
            min_c(self.max.y,that.max.y),
            min_c(self.max.z,that.max.z));
        if max.x <= min.x || max.y <= min.y || max.z <= min.z {
            return Bounds3D::default();
        }
        Bounds3D::new(min,max)
    }
}

impl<T: Copy + PartialOrd + std::ops::Add<Output=T>> Bounds3D<T> {
    pub fn translate(&mut self,offset: Vec3<T>) {
        self.translate_min(offset);
        self.translate_max(offset);
    }
    pub fn translate_min(&mut self,offset: Vec3<T>) {
        self.min = self.min + offset;
    }
    pub fn translate_max(&mut self,offset: Vec3<T>) {
        self.max = self.max + offset;
    }
}

// *************** TESTS *****************

#[test]
fn corner_table() {
    let b: Bounds3D<i32> = Bounds3D::new(Vec3::new(-1,-2,-3),Vec3::new(4,5,6));
    assert_eq!(b.corner(7),Vec3::new(-1,-2,-3));
    assert_eq!(b.corner(0),Vec3::new(4,5,6));
    assert_eq!(b.corner(1),Vec3::new(4,5,-3));
    assert_eq!(b.corner(2),Vec3::new(4,-2,6));
    assert_eq!(b.corner(4),Vec3::new(-1,5,6));
    assert_eq!(b.corner(6),Vec3::new(-1,-2,6));
}

#[test]
fn set_corner_moves_three_faces() {
    let mut b: Bounds3D<i32> = Bounds3D::from_scalars(0,10);
    b.set_corner(Vec3::new(1,2,3),7);
    assert_eq!(b.min(),Vec3::new(1,2,3));
    assert_eq!(b.max(),Vec3::new(10,10,10));
    b.set_corner(Vec3::new(8,9,4),1);
    assert_eq!(b.max(),Vec3::new(8,9,10));
    assert_eq!(b.min(),Vec3::new(1,2,4));
}

#[test]
fn clamp_corner_only_shrinks() {
    let mut b: Bounds3D<i32> = Bounds3D::from_scalars(0,10);
    b.clamp_corner(Vec3::new(-5,3,-5),7);
    assert_eq!(b.min(),Vec3::new(0,3,0));
    b.clamp_corner(Vec3::new(20,8,20),0);
    assert_eq!(b.max(),Vec3::new(10,8,10));
}

#[test]
fn extrema() {
    let mut b: Bounds3D<i32> = Bounds3D::default();
    b.set_extrema(Vec3::new(5,-1,2),Vec3::new(-5,1,0));
    assert_eq!(b.min(),Vec3::new(-5,-1,0));
    assert_eq!(b.max(),Vec3::new(5,1,2));
    b.update_extrema(6,0,-2);
    assert_eq!(b.min(),Vec3::new(-5,-1,-2));
    assert_eq!(b.max(),Vec3::new(6,1,2));
}

#[test]
fn intersection_and_containment() {
    let a: Bounds3D<u32> = Bounds3D::new(Vec3::new(0,0,0),Vec3::new(8,8,8));
    let b: Bounds3D<u32> = Bounds3D::new(Vec3::new(4,4,4),Vec3::new(12,12,12));
    assert!(a.intersects(&b));
    let i = a.intersection(&b);
    assert_eq!(i.min(),Vec3::new(4,4,4));
    assert_eq!(i.max(),Vec3::new(8,8,8));
    assert!(a.contains(&i));
    let c: Bounds3D<u32> = Bounds3D::new(Vec3::new(8,8,8),Vec3::new(9,9,9));
    assert!(!a.intersects(&c));
    assert_eq!(a.intersection(&c),Bounds3D::default());
    assert!(a.in_range(Vec3::new(7,7,7)));
    assert!(!a.in_range(Vec3::new(8,0,0)));
}

#[test]
fn translation() {
    let mut b: Bounds3D<i32> = Bounds3D::from_scalars(0,4);
    b.translate(Vec3::splat(-2));
    assert_eq!(b.min(),Vec3::splat(-2));
    assert_eq!(b.max(),Vec3::splat(2));
    b.translate_max(Vec3::splat(-1));
    assert_eq!(b.max(),Vec3::splat(1));
}
