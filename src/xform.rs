//! Local affine transform between voxel space and local space.
//!
//! Only a per-axis scale: local = voxel * res.  The kernel offset between
//! integer indices and sample positions lives on the volume, not here.

use std::io::{Read,Write};
use crate::store::{Group,LOCAL_XFORM_ATTR};
use crate::types::Vec3d;
use crate::value::Value;
use crate::Result;

#[derive(Copy,Clone,Debug,PartialEq)]
pub struct LocalXform {
    res: Vec3d
}

impl Default for LocalXform {
    fn default() -> Self {
        Self { res: Vec3d::splat(1.0) }
    }
}

impl LocalXform {
    pub fn new(res: Vec3d) -> Self {
        Self { res }
    }
    pub fn res(&self) -> Vec3d {
        self.res
    }
    pub fn voxel_to_local(&self,v: Vec3d) -> Vec3d {
        v * self.res
    }
    pub fn local_to_voxel(&self,l: Vec3d) -> Vec3d {
        l / self.res
    }
    pub fn write<W: Write>(&self,w: &mut W) -> Result<()> {
        self.res.x.write_to(w)?;
        self.res.y.write_to(w)?;
        self.res.z.write_to(w)?;
        Ok(())
    }
    pub fn read<R: Read>(r: &mut R) -> Result<Self> {
        let x = f64::read_from(r)?;
        let y = f64::read_from(r)?;
        let z = f64::read_from(r)?;
        Ok(Self { res: Vec3d::new(x,y,z) })
    }
    pub fn write_group(&self,group: &mut Group) {
        group.write_vector::<f64>(LOCAL_XFORM_ATTR,&[self.res.x,self.res.y,self.res.z]);
    }
    pub fn read_group(group: &Group) -> Result<Self> {
        let vals = group.read_vector::<f64>(LOCAL_XFORM_ATTR)?;
        if vals.len() != 3 {
            return Err(crate::Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,"local transform is not a 3-vector")));
        }
        Ok(Self { res: Vec3d::new(vals[0],vals[1],vals[2]) })
    }
}

// *************** TESTS *****************

#[test]
fn scaling_round_trip() {
    let xf = LocalXform::new(Vec3d::new(0.5,2.0,1.0));
    let l = xf.voxel_to_local(Vec3d::new(4.0,4.0,4.0));
    assert_eq!(l,Vec3d::new(2.0,8.0,4.0));
    assert_eq!(xf.local_to_voxel(l),Vec3d::new(4.0,4.0,4.0));
}

#[test]
fn io_round_trips() {
    let xf = LocalXform::new(Vec3d::new(0.25,1.5,3.0));
    let mut buf: Vec<u8> = Vec::new();
    xf.write(&mut buf).expect("write failed");
    assert_eq!(LocalXform::read(&mut std::io::Cursor::new(buf)).unwrap(),xf);
    let mut g = Group::new("vol");
    xf.write_group(&mut g);
    assert_eq!(LocalXform::read_group(&g).unwrap(),xf);
}
