//! Interpolation kernels.
//!
//! Pure read clients of a volume: sample a scalar field at a continuous
//! voxel-space position.  The kernel offset is resolved the same way as
//! `voxel_to_index`, so a sample sits at `index + kernel_offset` and the
//! kernels are exact on the lattice.

use num_traits::ToPrimitive;
use crate::types::{SignedIdx,Vec3d};
use crate::value::Value;
use crate::volume::Volume;

fn sample<T: Value + ToPrimitive>(vol: &Volume<T>,i: SignedIdx,j: SignedIdx,k: SignedIdx) -> f64 {
    vol.get(i,j,k).to_f64().unwrap_or(f64::NAN)
}

fn split(t: f64) -> (SignedIdx,f64) {
    let base = t.floor();
    (base as SignedIdx,t - base)
}

/// trilinear sample at a continuous voxel-space position
pub fn trilinear<T: Value + ToPrimitive>(vol: &Volume<T>,v: Vec3d) -> f64 {
    let t = v - vol.kernel_offset();
    let (i0,fx) = split(t.x);
    let (j0,fy) = split(t.y);
    let (k0,fz) = split(t.z);
    let mut acc = 0.0;
    for dk in 0..2 {
        let wz = if dk == 0 { 1.0 - fz } else { fz };
        for dj in 0..2 {
            let wy = if dj == 0 { 1.0 - fy } else { fy };
            for di in 0..2 {
                let wx = if di == 0 { 1.0 - fx } else { fx };
                acc += wx * wy * wz * sample(vol,i0 + di,j0 + dj,k0 + dk);
            }
        }
    }
    acc
}

/// Catmull-Rom weights for the four taps around a fraction
fn cubic_weights(f: f64) -> [f64;4] {
    let f2 = f * f;
    let f3 = f2 * f;
    [
        0.5 * (-f3 + 2.0 * f2 - f),
        0.5 * (3.0 * f3 - 5.0 * f2 + 2.0),
        0.5 * (-3.0 * f3 + 4.0 * f2 + f),
        0.5 * (f3 - f2)
    ]
}

/// tricubic (Catmull-Rom) sample at a continuous voxel-space position
pub fn tricubic<T: Value + ToPrimitive>(vol: &Volume<T>,v: Vec3d) -> f64 {
    let t = v - vol.kernel_offset();
    let (i0,fx) = split(t.x);
    let (j0,fy) = split(t.y);
    let (k0,fz) = split(t.z);
    let wx = cubic_weights(fx);
    let wy = cubic_weights(fy);
    let wz = cubic_weights(fz);
    let mut acc = 0.0;
    for (dk,wk) in wz.iter().enumerate() {
        for (dj,wj) in wy.iter().enumerate() {
            for (di,wi) in wx.iter().enumerate() {
                acc += wi * wj * wk
                    * sample(vol,i0 + di as SignedIdx - 1,j0 + dj as SignedIdx - 1,k0 + dk as SignedIdx - 1);
            }
        }
    }
    acc
}

/// trilinear sample at a local-space position
pub fn trilinear_local<T: Value + ToPrimitive>(vol: &Volume<T>,l: Vec3d) -> f64 {
    trilinear(vol,vol.local_to_voxel(l))
}

/// tricubic sample at a local-space position
pub fn tricubic_local<T: Value + ToPrimitive>(vol: &Volume<T>,l: Vec3d) -> f64 {
    tricubic(vol,vol.local_to_voxel(l))
}

// *************** TESTS *****************

#[cfg(test)]
fn ramp_volume(kernel_offset: f64) -> Volume<f32> {
    let mut v: Volume<f32> = Volume::with_transform(2,2,0.0,
        Vec3d::splat(1.0),Vec3d::splat(kernel_offset));
    for k in -4..8 {
        for j in -4..8 {
            for i in -4..8 {
                v.set(i,j,k,(i + 2 * j + 4 * k) as f32).unwrap();
            }
        }
    }
    v
}

#[test]
fn exact_on_the_lattice() {
    let v = ramp_volume(0.5);
    // voxel position of index (1,2,3) is (1.5,2.5,3.5)
    let p = Vec3d::new(1.5,2.5,3.5);
    let expected = (1 + 2 * 2 + 4 * 3) as f64;
    assert!((trilinear(&v,p) - expected).abs() < 1e-9);
    assert!((tricubic(&v,p) - expected).abs() < 1e-9);
}

#[test]
fn linear_fields_are_reproduced() {
    let v = ramp_volume(0.0);
    // both kernels are exact on linear data away from the field edge
    for p in [Vec3d::new(0.5,0.5,0.5),Vec3d::new(1.25,-0.75,2.5),Vec3d::new(-1.5,3.75,0.25)] {
        let expected = p.x + 2.0 * p.y + 4.0 * p.z;
        assert!((trilinear(&v,p) - expected).abs() < 1e-9,"trilinear at {:?}",p);
        assert!((tricubic(&v,p) - expected).abs() < 1e-9,"tricubic at {:?}",p);
    }
}

#[test]
fn midpoint_averages_neighbors() {
    let mut v: Volume<f32> = Volume::new(2,2,0.0);
    v.set(0,0,0,2.0).unwrap();
    v.set(1,0,0,4.0).unwrap();
    let s = trilinear(&v,Vec3d::new(0.5,0.0,0.0));
    assert!((s - 3.0).abs() < 1e-9);
}

#[test]
fn local_space_sampling() {
    let mut v: Volume<f32> = Volume::with_transform(2,2,0.0,
        Vec3d::splat(2.0),Vec3d::splat(0.0));
    v.set(1,0,0,6.0).unwrap();
    // local (2,0,0) is voxel (1,0,0)
    assert!((trilinear_local(&v,Vec3d::new(2.0,0.0,0.0)) - 6.0).abs() < 1e-9);
}
