//! Bit-fiddling primitives shared by the bitfield and the tree.
//!
//! The linear packing of a cube of side `2^lg` is `i + j*2^lg + k*4^lg`,
//! i.e. x fastest, then y, then z.  Quadrant codes put the sign bit of `i`
//! in bit 2, `j` in bit 1 and `k` in bit 0, so quadrant 0 is the all
//! non-negative octant and quadrant 7 the all negative one.

use crate::types::{Idx,SignedIdx,IndexVec,SignedIndexVec};

/// total number of voxels in a cube of side `2^lg_size`
pub fn num_bits_3d(lg_size: u8) -> Idx {
    1 << (3 * lg_size as u32)
}

/// linear index of (i,j,k) in a cube of side `2^lg_size`
pub fn linear_index(i: Idx,j: Idx,k: Idx,lg_size: u8) -> Idx {
    i + (j << lg_size) + (k << (2 * lg_size))
}

/// inverse of `linear_index`
pub fn coordinates(index: Idx,lg_size: u8) -> IndexVec {
    let mask = (1 << lg_size) - 1;
    IndexVec::new(index & mask,(index >> lg_size) & mask,index >> (2 * lg_size))
}

/// `v mod 2^lg`
pub fn modulo_lg(v: Idx,lg: u8) -> Idx {
    v & ((1 << lg) - 1)
}

/// round `v` up to the nearest multiple of `pow2`
pub fn round_pow2(v: Idx,pow2: Idx) -> Idx {
    (v + pow2 - 1) / pow2 * pow2
}

/// index of the lowest set bit, 0 if none are set
pub fn first_set_bit_index(v: u8) -> u8 {
    match v {
        0 => 0,
        _ => v.trailing_zeros() as u8
    }
}

/// index of the highest set bit, 0 if none are set
pub fn last_set_bit_index(v: u8) -> u8 {
    match v {
        0 => 0,
        _ => (7 - v.leading_zeros()) as u8
    }
}

/// 3 bit octant code from coordinate signs
pub fn quadrant(i: SignedIdx,j: SignedIdx,k: SignedIdx) -> u8 {
    (((i < 0) as u8) << 2) | (((j < 0) as u8) << 1) | ((k < 0) as u8)
}

/// per axis offset between |coordinate| and octant-local coordinate.
/// The negative half of an axis starts at -1, so negated axes subtract 1.
pub fn quadrant_offsets(q: u8) -> IndexVec {
    IndexVec::new(((q >> 2) & 1) as Idx,((q >> 1) & 1) as Idx,(q & 1) as Idx)
}

/// sign vector of an octant, e.g. quadrant 7 is (-1,-1,-1)
pub fn quadrant_signs(q: u8) -> SignedIndexVec {
    let s = |bit: u8| if q & bit != 0 { -1 } else { 1 };
    SignedIndexVec::new(s(4),s(2),s(1))
}

/// flip signs of a coordinate triple into the given octant
pub fn apply_quadrant_signs(v: SignedIndexVec,q: u8) -> SignedIndexVec {
    v * quadrant_signs(q)
}

/// absolute value of each component as unsigned
pub fn abs_vec(v: SignedIndexVec) -> IndexVec {
    IndexVec::new(v.x.unsigned_abs(),v.y.unsigned_abs(),v.z.unsigned_abs())
}

// *************** TESTS *****************

#[test]
fn cube_sizes() {
    assert_eq!(num_bits_3d(1),8);
    assert_eq!(num_bits_3d(2),64);
    assert_eq!(num_bits_3d(3),512);
}

#[test]
fn linear_indexing() {
    assert_eq!(linear_index(0,0,0,1),0);
    assert_eq!(linear_index(0,0,1,2),16);
    assert_eq!(linear_index(3,3,3,2),63);
    assert_eq!(linear_index(2,1,0,2),6);
    assert_eq!(linear_index(2,1,3,2),54);
    for idx in 0..64 {
        let c = coordinates(idx,2);
        assert_eq!(linear_index(c.x,c.y,c.z,2),idx);
    }
}

#[test]
fn modulo() {
    assert_eq!(modulo_lg(1,1),1);
    assert_eq!(modulo_lg(2,1),0);
    for i in 0..64 {
        assert_eq!(modulo_lg(i,6),i);
    }
    assert_eq!(modulo_lg(64,6),0);
    assert_eq!(modulo_lg(130,6),2);
}

#[test]
fn pow2_rounding() {
    assert_eq!(round_pow2(3,4),4);
    assert_eq!(round_pow2(7,8),8);
    assert_eq!(round_pow2(8,32),32);
    assert_eq!(round_pow2(33,32),64);
    assert_eq!(round_pow2(100,64),128);
    assert_eq!(round_pow2(128,64),128);
}

#[test]
fn quadrant_codes() {
    assert_eq!(quadrant(1,2,3),0);
    assert_eq!(quadrant(1,2,-3),1);
    assert_eq!(quadrant(1,-2,3),2);
    assert_eq!(quadrant(1,-2,-3),3);
    assert_eq!(quadrant(-1,2,3),4);
    assert_eq!(quadrant(-1,2,-3),5);
    assert_eq!(quadrant(-1,-2,3),6);
    assert_eq!(quadrant(-1,-2,-3),7);
}

#[test]
fn quadrant_offsets_match_negated_axes() {
    assert_eq!(quadrant_offsets(0),IndexVec::new(0,0,0));
    assert_eq!(quadrant_offsets(1),IndexVec::new(0,0,1));
    assert_eq!(quadrant_offsets(2),IndexVec::new(0,1,0));
    assert_eq!(quadrant_offsets(5),IndexVec::new(1,0,1));
    assert_eq!(quadrant_offsets(7),IndexVec::new(1,1,1));
}

#[test]
fn quadrant_sign_vectors() {
    assert_eq!(quadrant_signs(0),SignedIndexVec::new(1,1,1));
    assert_eq!(quadrant_signs(3),SignedIndexVec::new(1,-1,-1));
    assert_eq!(quadrant_signs(7),SignedIndexVec::new(-1,-1,-1));
    let v = SignedIndexVec::new(1,2,3);
    assert_eq!(apply_quadrant_signs(v,6),SignedIndexVec::new(-1,-2,3));
}

#[test]
fn first_and_last_set_bits() {
    assert_eq!(first_set_bit_index(0b0001),0);
    assert_eq!(first_set_bit_index(0b0010),1);
    assert_eq!(first_set_bit_index(0b1100),2);
    assert_eq!(last_set_bit_index(0b0001),0);
    assert_eq!(last_set_bit_index(0b1100),3);
    assert_eq!(last_set_bit_index(0b10000000),7);
}
