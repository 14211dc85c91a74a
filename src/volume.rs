//! Volume façade.
//!
//! A volume owns one eight-octant tree, a local transform, a kernel offset
//! (the continuous displacement between an integer index and its sample
//! position, typically 0.5 for cell-centered data), and an attribute
//! collection carrying at least `name` and `description`.  All voxel access
//! goes through the signed-index API; the space conversion helpers move
//! between index, voxel and local coordinates.

use std::io::{Read,Write};
use crate::attrs::AttributeCollection;
use crate::bounds::{Bounds3D,SignedIndexBounds};
use crate::iter::TreeSetIter;
use crate::stamp::StampSource;
use crate::store::{Group,HiveFile,write_string,read_string,
    VOLUME_NAME_ATTR,VOLUME_DESC_ATTR};
use crate::tree::Tree;
use crate::types::{SignedIdx,SignedIndexVec,Vec3d};
use crate::value::Value;
use crate::xform::LocalXform;
use crate::{Error,Result};

#[derive(Clone,Debug)]
pub struct Volume<T: Value> {
    tree: Tree<T>,
    xform: LocalXform,
    kernel_offset: Vec3d,
    attrs: AttributeCollection
}

impl<T: Value> Volume<T> {
    /// unit resolution, zero kernel offset
    pub fn new(lg_branching: u8,lg_cell_dim: u8,default_value: T) -> Self {
        Self::with_transform(lg_branching,lg_cell_dim,default_value,
            Vec3d::splat(1.0),Vec3d::splat(0.0))
    }
    pub fn with_transform(lg_branching: u8,lg_cell_dim: u8,default_value: T,
            res: Vec3d,kernel_offset: Vec3d) -> Self {
        let mut attrs = AttributeCollection::new();
        // mandatory attributes every volume carries
        attrs.insert(VOLUME_NAME_ATTR,"unknown").ok();
        attrs.insert(VOLUME_DESC_ATTR,"").ok();
        Self {
            tree: Tree::new(lg_branching,lg_cell_dim,default_value),
            xform: LocalXform::new(res),
            kernel_offset,
            attrs
        }
    }

    pub fn default_value(&self) -> T {
        self.tree.default_value()
    }
    pub fn kernel_offset(&self) -> Vec3d {
        self.kernel_offset
    }
    pub fn res(&self) -> Vec3d {
        self.xform.res()
    }
    pub fn set_local_xform(&mut self,res: Vec3d) {
        self.xform = LocalXform::new(res);
    }
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    // voxel access

    pub fn get(&self,i: SignedIdx,j: SignedIdx,k: SignedIdx) -> T {
        self.tree.get(i,j,k)
    }
    pub fn set(&mut self,i: SignedIdx,j: SignedIdx,k: SignedIdx,val: T) -> Result<()> {
        self.tree.set(i,j,k,val)
    }
    pub fn unset(&mut self,i: SignedIdx,j: SignedIdx,k: SignedIdx) -> Result<()> {
        self.tree.unset(i,j,k)
    }
    pub fn update<Op: Fn(T,T) -> T + Copy>(&mut self,i: SignedIdx,j: SignedIdx,k: SignedIdx,
            val: T,op: Op) -> Result<()> {
        self.tree.update(i,j,k,val,op)
    }
    pub fn stamp<S: StampSource>(&mut self,src: &S,position: SignedIndexVec) -> Result<()>
            where S::Elem: Into<T> {
        self.tree.stamp(src,position)
    }
    pub fn set_voxels(&self) -> TreeSetIter<'_,T> {
        self.tree.set_voxels()
    }
    pub fn compute_set_bounds(&self) -> Option<SignedIndexBounds> {
        self.tree.compute_set_bounds()
    }
    /// set bounds mapped through the kernel offset and local transform
    pub fn compute_set_bounds_local(&self) -> Option<Bounds3D<f64>> {
        let index_bounds = self.tree.compute_set_bounds()?;
        let min = self.voxel_to_local(self.index_to_voxel(index_bounds.min()));
        let max = self.voxel_to_local(self.index_to_voxel(index_bounds.max()));
        Some(Bounds3D::new(min,max))
    }

    // space conversions

    pub fn voxel_to_index(&self,v: Vec3d) -> SignedIndexVec {
        (v - self.kernel_offset).floor().map(|c| c as SignedIdx)
    }
    pub fn index_to_voxel(&self,i: SignedIndexVec) -> Vec3d {
        i.as_f64() + self.kernel_offset
    }
    pub fn voxel_to_local(&self,v: Vec3d) -> Vec3d {
        self.xform.voxel_to_local(v)
    }
    pub fn local_to_voxel(&self,l: Vec3d) -> Vec3d {
        self.xform.local_to_voxel(l)
    }
    pub fn local_to_index(&self,l: Vec3d) -> SignedIndexVec {
        self.voxel_to_index(self.local_to_voxel(l))
    }
    pub fn index_to_local(&self,i: SignedIndexVec) -> Vec3d {
        self.voxel_to_local(self.index_to_voxel(i))
    }

    // attributes

    pub fn attributes(&self) -> &AttributeCollection {
        &self.attrs
    }
    pub fn attributes_mut(&mut self) -> &mut AttributeCollection {
        &mut self.attrs
    }
    pub fn name(&self) -> &str {
        self.attrs.string(VOLUME_NAME_ATTR).unwrap_or("unknown")
    }
    pub fn set_name(&mut self,name: &str) -> Result<()> {
        self.attrs.insert(VOLUME_NAME_ATTR,name)
    }
    pub fn description(&self) -> &str {
        self.attrs.string(VOLUME_DESC_ATTR).unwrap_or("")
    }
    pub fn set_description(&mut self,description: &str) -> Result<()> {
        self.attrs.insert(VOLUME_DESC_ATTR,description)
    }

    // IO

    /// stream form: type tag, attributes, local transform, tree
    pub fn write<W: Write>(&self,w: &mut W) -> Result<()> {
        write_string(w,T::TYPE_TAG)?;
        self.attrs.write(w)?;
        self.xform.write(w)?;
        self.tree.write(w)
    }
    pub fn read<R: Read>(r: &mut R) -> Result<Self> {
        let tag = read_string(r)?;
        if tag != T::TYPE_TAG {
            return Err(Error::Type(format!(
                "volume holds {} values, wanted {}",tag,T::TYPE_TAG)));
        }
        let attrs = AttributeCollection::read(r)?;
        let xform = LocalXform::read(r)?;
        let tree = Tree::read(r)?;
        Ok(Self { tree, xform, kernel_offset: Vec3d::splat(0.0), attrs })
    }
    /// Write under the container's volume root as a group named by the
    /// volume's name attribute; an existing group of that name is replaced.
    pub fn write_file(&self,file: &mut HiveFile) -> Result<()> {
        let name = self.name().to_string();
        log::debug!("writing volume {} to container",name);
        let root = file.volume_root_mut();
        root.remove_group(&name);
        let volume_group = root.create_group(&name);
        self.write_volume_group(volume_group);
        Ok(())
    }
    fn write_volume_group(&self,volume_group: &mut Group) {
        self.attrs.write_group(volume_group);
        self.xform.write_group(volume_group);
        self.tree.write_group(volume_group);
    }
    pub fn read_file(file: &HiveFile,volume_name: &str) -> Result<Self> {
        let volume_group = file.volume_root()?.require_group(volume_name)?;
        Self::read_volume_group(volume_group)
    }
    pub fn read_file_index(file: &HiveFile,index: usize) -> Result<Self> {
        let names = file.volume_names();
        match names.get(index) {
            Some(name) => Self::read_file(file,name),
            None => Err(Error::Arg(format!("no volume at index {}",index)))
        }
    }
    pub fn read_volume_group(volume_group: &Group) -> Result<Self> {
        let xform = LocalXform::read_group(volume_group)?;
        let attrs = AttributeCollection::read_group(volume_group)?;
        let tree = Tree::read_group(volume_group)?;
        Ok(Self { tree, xform, kernel_offset: Vec3d::splat(0.0), attrs })
    }
}

impl<T: Value> PartialEq for Volume<T> {
    fn eq(&self,that: &Self) -> bool {
        self.xform == that.xform
            && self.attrs == that.attrs
            && self.tree == that.tree
    }
}

// *************** TESTS *****************

#[test]
fn default_and_point_round_trip() {
    let mut v: Volume<f32> = Volume::new(2,2,1.5);
    assert_eq!(v.get(123,-456,789),1.5);
    v.set(123,-456,789,2.0).unwrap();
    assert_eq!(v.get(123,-456,789),2.0);
    assert_eq!(v.get(123,-456,788),1.5);
    v.unset(123,-456,789).unwrap();
    assert_eq!(v.get(123,-456,789),1.5);
    assert!(v.is_empty());
}

#[test]
fn mandatory_attributes_exist() {
    let v: Volume<i32> = Volume::new(2,2,0);
    assert_eq!(v.name(),"unknown");
    assert_eq!(v.description(),"");
    let mut v = v;
    v.set_name("fog").unwrap();
    v.set_description("a fog field").unwrap();
    assert_eq!(v.name(),"fog");
    assert_eq!(v.description(),"a fog field");
}

#[test]
fn space_conversions() {
    let v: Volume<f32> = Volume::with_transform(2,2,0.0,
        Vec3d::new(0.5,0.5,2.0),Vec3d::splat(0.5));
    // a sample sits half a voxel past its index
    assert_eq!(v.index_to_voxel(SignedIndexVec::new(2,-3,0)),Vec3d::new(2.5,-2.5,0.5));
    assert_eq!(v.voxel_to_index(Vec3d::new(2.5,-2.5,0.5)),SignedIndexVec::new(2,-3,0));
    // flooring maps the whole cell back to its index
    assert_eq!(v.voxel_to_index(Vec3d::new(2.9,-2.1,1.49)),SignedIndexVec::new(2,-3,0));
    assert_eq!(v.voxel_to_local(Vec3d::new(4.0,4.0,4.0)),Vec3d::new(2.0,2.0,8.0));
    assert_eq!(v.local_to_voxel(Vec3d::new(2.0,2.0,8.0)),Vec3d::new(4.0,4.0,4.0));
    assert_eq!(v.local_to_index(Vec3d::new(1.25,-1.25,1.0)),SignedIndexVec::new(2,-3,0));
}

#[test]
fn local_set_bounds() {
    let mut v: Volume<i32> = Volume::with_transform(2,2,0,
        Vec3d::splat(2.0),Vec3d::splat(0.0));
    v.set(0,0,0,1).unwrap();
    v.set(3,3,3,1).unwrap();
    let local = v.compute_set_bounds_local().expect("bounds missing");
    assert_eq!(local.min(),Vec3d::new(0.0,0.0,0.0));
    assert_eq!(local.max(),Vec3d::new(8.0,8.0,8.0));
}

#[test]
fn update_through_facade() {
    let mut v: Volume<i32> = Volume::new(2,2,100);
    v.update(-7,8,-9,11,|a,b| a + b).unwrap();
    assert_eq!(v.get(-7,8,-9),111);
}

#[test]
fn stamp_through_facade() {
    use crate::stamp::BoxSource;
    let src = BoxSource::filled(SignedIndexBounds::from_scalars(-2,2),9i32);
    let mut v: Volume<i32> = Volume::new(2,2,0);
    v.stamp(&src,SignedIndexVec::new(10,10,10)).unwrap();
    assert_eq!(v.get(8,8,8),9);
    assert_eq!(v.get(11,11,11),9);
    assert_eq!(v.get(12,12,12),0);
    let count = v.set_voxels().count();
    assert_eq!(count,64);
}

#[test]
fn stream_round_trip() {
    let mut v: Volume<f64> = Volume::with_transform(2,2,0.25,
        Vec3d::new(1.0,2.0,4.0),Vec3d::splat(0.0));
    v.set_name("density").unwrap();
    v.set_description("stream test").unwrap();
    v.set(5,-5,5,3.5).unwrap();
    v.set(-100,3,7,4.5).unwrap();
    let mut buf: Vec<u8> = Vec::new();
    v.write(&mut buf).expect("write failed");
    let back = Volume::<f64>::read(&mut std::io::Cursor::new(buf)).expect("read failed");
    assert_eq!(v,back);
    assert_eq!(back.name(),"density");
    assert_eq!(back.res(),Vec3d::new(1.0,2.0,4.0));
}

#[test]
fn stream_type_tag_is_checked() {
    let v: Volume<f32> = Volume::new(2,2,0.0);
    let mut buf: Vec<u8> = Vec::new();
    v.write(&mut buf).expect("write failed");
    assert!(matches!(Volume::<i32>::read(&mut std::io::Cursor::new(buf)),
        Err(crate::Error::Type(_))));
}

#[test]
fn container_round_trip() {
    let mut fog: Volume<f32> = Volume::new(2,2,0.0);
    fog.set_name("fog").unwrap();
    fog.set(1,2,3,0.5).unwrap();
    fog.set(-4,-5,-6,0.75).unwrap();
    let mut heat: Volume<f32> = Volume::new(2,3,20.0);
    heat.set_name("heat").unwrap();
    heat.set(0,0,0,90.0).unwrap();
    let mut file = HiveFile::new();
    fog.write_file(&mut file).expect("write failed");
    heat.write_file(&mut file).expect("write failed");
    assert_eq!(file.volume_names(),vec!["fog".to_string(),"heat".to_string()]);
    let fog_back = Volume::<f32>::read_file(&file,"fog").expect("read failed");
    let heat_back = Volume::<f32>::read_file_index(&file,1).expect("read failed");
    assert_eq!(fog,fog_back);
    assert_eq!(heat,heat_back);
    assert!(Volume::<f32>::read_file(&file,"missing").is_err());
    assert!(Volume::<f32>::read_file_index(&file,5).is_err());
}

#[test]
fn container_overwrite_replaces_the_old_group() {
    let mut v: Volume<i32> = Volume::new(2,2,0);
    v.set_name("field").unwrap();
    v.set(0,0,0,1).unwrap();
    let mut file = HiveFile::new();
    v.write_file(&mut file).expect("write failed");
    // rewrite with different content under the same name
    let mut v2: Volume<i32> = Volume::new(2,2,0);
    v2.set_name("field").unwrap();
    v2.set(5,5,5,2).unwrap();
    v2.write_file(&mut file).expect("write failed");
    assert_eq!(file.volume_names(),vec!["field".to_string()]);
    let back = Volume::<i32>::read_file(&file,"field").expect("read failed");
    assert_eq!(back.get(5,5,5),2);
    assert_eq!(back.get(0,0,0),0);
    assert_eq!(v2,back);
}

#[test]
fn file_on_disk_round_trip() {
    let dir = tempfile::tempdir().expect("no temp dir");
    let path = dir.path().join("test.hive");
    let mut v: Volume<f32> = Volume::new(2,2,0.0);
    v.set_name("disk").unwrap();
    v.set(9,9,9,1.25).unwrap();
    let mut file = HiveFile::new();
    v.write_file(&mut file).expect("write failed");
    file.save(&path).expect("save failed");
    let loaded = HiveFile::open(&path).expect("open failed");
    let back = Volume::<f32>::read_file(&loaded,"disk").expect("read failed");
    assert_eq!(v,back);
}
