//! Hierarchical typed-group container
//!
//! Hive files are a small self-describing container: a tree of named groups,
//! each holding scalar attributes, vector attributes, simple N-D datasets and
//! sub-groups, all kept in creation order.  Every attribute and dataset
//! carries a type tag, and the typed accessors refuse to decode a payload
//! whose tag does not match the requested type.
//!
//! This module also owns the names that make up the volume group layout
//! (`DefaultValue`, `BranchingFactor`, leaf group naming, ...) so the tree,
//! cell and volume writers all agree on them.

use std::io::{Read,Write,ErrorKind};
use std::path::Path;
use num_derive::FromPrimitive;
use crate::types::{Idx,IndexVec};
use crate::value::Value;
use crate::{Error,Result};

const FORMAT_MAGIC: [u8;4] = *b"HIVE";
const FORMAT_VERSION: u8 = 1;

pub const VOLUME_ROOT_GROUP: &str = "HiveVolumeRoot";
pub const USER_ATTR_GROUP: &str = "UserAttributes";
pub const VOLUME_NAME_ATTR: &str = "name";
pub const VOLUME_DESC_ATTR: &str = "description";
pub const LOCAL_XFORM_ATTR: &str = "LocalXform";
pub const DEFAULT_VALUE_ATTR: &str = "DefaultValue";
pub const BRANCHING_FACTOR_ATTR: &str = "BranchingFactor";
pub const CELL_DIM_ATTR: &str = "CellDimensions";
pub const INDEX_OFFSET_ATTR: &str = "IndexOffset";
pub const QUADRANT_ATTR: &str = "Quadrant";
pub const LEAF_TYPE_ATTR: &str = "LeafType";
pub const FILL_VALUE_ATTR: &str = "FillValue";
pub const FILL_LEVEL_ATTR: &str = "Level";
pub const CELL_FLAGS_ATTR: &str = "Flags";
pub const VOXEL_DATA_SET: &str = "VoxelData";
pub const BITFIELD_DATA_SET: &str = "BitField";
pub const BITFIELD_SIZE_ATTR: &str = "BitFieldSize";

/// kind tag stored on every leaf group
#[derive(FromPrimitive,Copy,Clone,Debug,PartialEq,Eq)]
pub enum LeafType {
    Cell = 0,
    FillNode = 1
}

/// deterministic unique name for a leaf group
pub fn leaf_group_name(leaf_type: LeafType,quadrant: u8,offset: IndexVec) -> String {
    let tag = match leaf_type {
        LeafType::Cell => "cell",
        LeafType::FillNode => "fill"
    };
    format!("{}_q{}_{}_{}_{}",tag,quadrant,offset.x,offset.y,offset.z)
}

fn missing(what: &str,name: &str) -> Error {
    Error::Io(std::io::Error::new(ErrorKind::NotFound,format!("no {} named {}",what,name)))
}

fn tag_mismatch(name: &str,found: &str,wanted: &str) -> Error {
    Error::Type(format!("{} is tagged {}, wanted {}",name,found,wanted))
}

pub(crate) fn write_string<W: Write>(w: &mut W,s: &str) -> Result<()> {
    (s.len() as u32).write_to(w)?;
    w.write_all(s.as_bytes())?;
    Ok(())
}

pub(crate) fn read_string<R: Read>(r: &mut R) -> Result<String> {
    let len = u32::read_from(r)? as usize;
    let mut bytes = vec![0u8;len];
    r.read_exact(&mut bytes)?;
    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(_) => Err(Error::Io(std::io::Error::new(ErrorKind::InvalidData,"bad string encoding")))
    }
}

fn write_bytes<W: Write>(w: &mut W,bytes: &[u8]) -> Result<()> {
    (bytes.len() as u64).write_to(w)?;
    w.write_all(bytes)?;
    Ok(())
}

fn read_bytes<R: Read>(r: &mut R) -> Result<Vec<u8>> {
    let len = u64::read_from(r)? as usize;
    let mut bytes = vec![0u8;len];
    r.read_exact(&mut bytes)?;
    Ok(bytes)
}

/// opaque type tag + value bytes
#[derive(Clone,Debug,PartialEq)]
pub struct ScalarAttr {
    pub type_tag: String,
    pub bytes: Vec<u8>
}

/// opaque component tag + component count + value bytes
#[derive(Clone,Debug,PartialEq)]
pub struct VectorAttr {
    pub type_tag: String,
    pub count: u32,
    pub bytes: Vec<u8>
}

/// simple N-D dataset with its own scalar attributes
#[derive(Clone,Debug,PartialEq)]
pub struct Dataset {
    dims: Vec<u64>,
    type_tag: String,
    bytes: Vec<u8>,
    attrs: Vec<(String,ScalarAttr)>
}

impl Dataset {
    pub fn new(dims: Vec<u64>,type_tag: &str,bytes: Vec<u8>) -> Self {
        Self { dims, type_tag: type_tag.to_string(), bytes, attrs: Vec::new() }
    }
    pub fn dims(&self) -> &[u64] {
        &self.dims
    }
    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
    pub fn write_scalar_attr<T: Value>(&mut self,name: &str,v: &T) {
        let attr = ScalarAttr { type_tag: T::TYPE_TAG.to_string(), bytes: v.to_le_vec() };
        match self.attrs.iter_mut().find(|(n,_)| n == name) {
            Some((_,a)) => *a = attr,
            None => self.attrs.push((name.to_string(),attr))
        }
    }
    pub fn read_scalar_attr<T: Value>(&self,name: &str) -> Result<T> {
        match self.attrs.iter().find(|(n,_)| n == name) {
            Some((_,a)) => decode_scalar(name,a),
            None => Err(missing("dataset attribute",name))
        }
    }
    /// decode the payload as a sequence of `T`
    pub fn read_values<T: Value>(&self) -> Result<Vec<T>> {
        if self.type_tag != T::TYPE_TAG {
            return Err(tag_mismatch("dataset",&self.type_tag,T::TYPE_TAG));
        }
        decode_values(&self.bytes)
    }
}

fn decode_scalar<T: Value>(name: &str,attr: &ScalarAttr) -> Result<T> {
    if attr.type_tag != T::TYPE_TAG {
        return Err(tag_mismatch(name,&attr.type_tag,T::TYPE_TAG));
    }
    match T::from_le_slice(&attr.bytes) {
        Some(v) => Ok(v),
        None => Err(Error::Type(format!("{} has a malformed {} payload",name,T::TYPE_TAG)))
    }
}

fn decode_values<T: Value>(bytes: &[u8]) -> Result<Vec<T>> {
    if bytes.len() % T::SIZE != 0 {
        return Err(Error::Type(format!("payload is not a whole number of {}",T::TYPE_TAG)));
    }
    let mut vals = Vec::with_capacity(bytes.len() / T::SIZE);
    for chunk in bytes.chunks(T::SIZE) {
        match T::from_le_slice(chunk) {
            Some(v) => vals.push(v),
            None => return Err(Error::Type(format!("malformed {} payload",T::TYPE_TAG)))
        }
    }
    Ok(vals)
}

/// named group: attributes, datasets and sub-groups in creation order
#[derive(Clone,Debug,PartialEq)]
pub struct Group {
    name: String,
    scalars: Vec<(String,ScalarAttr)>,
    vectors: Vec<(String,VectorAttr)>,
    datasets: Vec<(String,Dataset)>,
    children: Vec<Group>
}

impl Group {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            scalars: Vec::new(),
            vectors: Vec::new(),
            datasets: Vec::new(),
            children: Vec::new()
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }

    // groups

    /// open the named sub-group, creating it if absent
    pub fn create_group(&mut self,name: &str) -> &mut Group {
        if let Some(i) = self.children.iter().position(|g| g.name == name) {
            return &mut self.children[i];
        }
        self.children.push(Group::new(name));
        let last = self.children.len() - 1;
        &mut self.children[last]
    }
    pub fn group(&self,name: &str) -> Option<&Group> {
        self.children.iter().find(|g| g.name == name)
    }
    pub fn group_mut(&mut self,name: &str) -> Option<&mut Group> {
        self.children.iter_mut().find(|g| g.name == name)
    }
    pub fn require_group(&self,name: &str) -> Result<&Group> {
        match self.group(name) {
            Some(g) => Ok(g),
            None => Err(missing("group",name))
        }
    }
    /// delete a sub-group and everything under it
    pub fn remove_group(&mut self,name: &str) -> bool {
        match self.children.iter().position(|g| g.name == name) {
            Some(i) => {
                self.children.remove(i);
                true
            },
            None => false
        }
    }
    /// sub-groups in creation order
    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.children.iter()
    }

    // scalar attributes

    pub fn set_scalar(&mut self,name: &str,attr: ScalarAttr) {
        match self.scalars.iter_mut().find(|(n,_)| n == name) {
            Some((_,a)) => *a = attr,
            None => self.scalars.push((name.to_string(),attr))
        }
    }
    pub fn scalar(&self,name: &str) -> Result<&ScalarAttr> {
        match self.scalars.iter().find(|(n,_)| n == name) {
            Some((_,a)) => Ok(a),
            None => Err(missing("attribute",name))
        }
    }
    pub fn scalars(&self) -> impl Iterator<Item = (&str,&ScalarAttr)> {
        self.scalars.iter().map(|(n,a)| (n.as_str(),a))
    }
    pub fn write_scalar<T: Value>(&mut self,name: &str,v: &T) {
        self.set_scalar(name,ScalarAttr { type_tag: T::TYPE_TAG.to_string(), bytes: v.to_le_vec() });
    }
    pub fn read_scalar<T: Value>(&self,name: &str) -> Result<T> {
        decode_scalar(name,self.scalar(name)?)
    }
    pub fn write_string_attr(&mut self,name: &str,s: &str) {
        self.set_scalar(name,ScalarAttr { type_tag: "string".to_string(), bytes: s.as_bytes().to_vec() });
    }
    pub fn read_string_attr(&self,name: &str) -> Result<String> {
        let attr = self.scalar(name)?;
        if attr.type_tag != "string" {
            return Err(tag_mismatch(name,&attr.type_tag,"string"));
        }
        match String::from_utf8(attr.bytes.clone()) {
            Ok(s) => Ok(s),
            Err(_) => Err(Error::Type(format!("{} is not valid utf8",name)))
        }
    }

    // vector attributes

    pub fn set_vector(&mut self,name: &str,attr: VectorAttr) {
        match self.vectors.iter_mut().find(|(n,_)| n == name) {
            Some((_,a)) => *a = attr,
            None => self.vectors.push((name.to_string(),attr))
        }
    }
    pub fn vector(&self,name: &str) -> Result<&VectorAttr> {
        match self.vectors.iter().find(|(n,_)| n == name) {
            Some((_,a)) => Ok(a),
            None => Err(missing("vector attribute",name))
        }
    }
    pub fn write_vector<T: Value>(&mut self,name: &str,vals: &[T]) {
        let mut bytes = Vec::with_capacity(vals.len() * T::SIZE);
        for v in vals {
            bytes.extend_from_slice(&v.to_le_vec());
        }
        self.set_vector(name,VectorAttr {
            type_tag: T::TYPE_TAG.to_string(),
            count: vals.len() as u32,
            bytes
        });
    }
    pub fn read_vector<T: Value>(&self,name: &str) -> Result<Vec<T>> {
        let attr = self.vector(name)?;
        if attr.type_tag != T::TYPE_TAG {
            return Err(tag_mismatch(name,&attr.type_tag,T::TYPE_TAG));
        }
        let vals = decode_values(&attr.bytes)?;
        if vals.len() != attr.count as usize {
            return Err(Error::Io(std::io::Error::new(
                ErrorKind::InvalidData,format!("{} count does not match payload",name))));
        }
        Ok(vals)
    }
    pub fn write_index_vec(&mut self,name: &str,v: IndexVec) {
        self.write_vector::<Idx>(name,&[v.x,v.y,v.z]);
    }
    pub fn read_index_vec(&self,name: &str) -> Result<IndexVec> {
        let vals = self.read_vector::<Idx>(name)?;
        if vals.len() != 3 {
            return Err(Error::Io(std::io::Error::new(
                ErrorKind::InvalidData,format!("{} is not a 3-vector",name))));
        }
        Ok(IndexVec::new(vals[0],vals[1],vals[2]))
    }

    // datasets

    pub fn set_dataset(&mut self,name: &str,ds: Dataset) {
        match self.datasets.iter_mut().find(|(n,_)| n == name) {
            Some((_,d)) => *d = ds,
            None => self.datasets.push((name.to_string(),ds))
        }
    }
    pub fn dataset(&self,name: &str) -> Result<&Dataset> {
        match self.datasets.iter().find(|(n,_)| n == name) {
            Some((_,d)) => Ok(d),
            None => Err(missing("dataset",name))
        }
    }
    pub fn has_dataset(&self,name: &str) -> bool {
        self.datasets.iter().any(|(n,_)| n == name)
    }

    // serialization

    pub fn write<W: Write>(&self,w: &mut W) -> Result<()> {
        write_string(w,&self.name)?;
        (self.scalars.len() as u32).write_to(w)?;
        for (name,a) in self.scalars.iter() {
            write_string(w,name)?;
            write_string(w,&a.type_tag)?;
            write_bytes(w,&a.bytes)?;
        }
        (self.vectors.len() as u32).write_to(w)?;
        for (name,a) in self.vectors.iter() {
            write_string(w,name)?;
            write_string(w,&a.type_tag)?;
            a.count.write_to(w)?;
            write_bytes(w,&a.bytes)?;
        }
        (self.datasets.len() as u32).write_to(w)?;
        for (name,d) in self.datasets.iter() {
            write_string(w,name)?;
            write_string(w,&d.type_tag)?;
            (d.dims.len() as u32).write_to(w)?;
            for dim in d.dims.iter() {
                dim.write_to(w)?;
            }
            write_bytes(w,&d.bytes)?;
            (d.attrs.len() as u32).write_to(w)?;
            for (aname,a) in d.attrs.iter() {
                write_string(w,aname)?;
                write_string(w,&a.type_tag)?;
                write_bytes(w,&a.bytes)?;
            }
        }
        (self.children.len() as u32).write_to(w)?;
        for child in self.children.iter() {
            child.write(w)?;
        }
        Ok(())
    }
    pub fn read<R: Read>(r: &mut R) -> Result<Group> {
        let mut group = Group::new(&read_string(r)?);
        let nscalar = u32::read_from(r)?;
        for _ in 0..nscalar {
            let name = read_string(r)?;
            let type_tag = read_string(r)?;
            let bytes = read_bytes(r)?;
            group.scalars.push((name,ScalarAttr { type_tag, bytes }));
        }
        let nvector = u32::read_from(r)?;
        for _ in 0..nvector {
            let name = read_string(r)?;
            let type_tag = read_string(r)?;
            let count = u32::read_from(r)?;
            let bytes = read_bytes(r)?;
            group.vectors.push((name,VectorAttr { type_tag, count, bytes }));
        }
        let ndataset = u32::read_from(r)?;
        for _ in 0..ndataset {
            let name = read_string(r)?;
            let type_tag = read_string(r)?;
            let rank = u32::read_from(r)?;
            let mut dims = Vec::with_capacity(rank as usize);
            for _ in 0..rank {
                dims.push(u64::read_from(r)?);
            }
            let bytes = read_bytes(r)?;
            let nattr = u32::read_from(r)?;
            let mut attrs = Vec::with_capacity(nattr as usize);
            for _ in 0..nattr {
                let aname = read_string(r)?;
                let type_tag = read_string(r)?;
                let bytes = read_bytes(r)?;
                attrs.push((aname,ScalarAttr { type_tag, bytes }));
            }
            group.datasets.push((name,Dataset { dims, type_tag, bytes, attrs }));
        }
        let nchildren = u32::read_from(r)?;
        for _ in 0..nchildren {
            group.children.push(Group::read(r)?);
        }
        Ok(group)
    }
}

/// a container file: one root group behind a magic header
#[derive(Clone,Debug,PartialEq)]
pub struct HiveFile {
    root: Group
}

impl Default for HiveFile {
    fn default() -> Self {
        Self::new()
    }
}

impl HiveFile {
    pub fn new() -> Self {
        Self { root: Group::new("/") }
    }
    pub fn root(&self) -> &Group {
        &self.root
    }
    pub fn root_mut(&mut self) -> &mut Group {
        &mut self.root
    }
    /// the group all volumes live under
    pub fn volume_root(&self) -> Result<&Group> {
        self.root.require_group(VOLUME_ROOT_GROUP)
    }
    pub fn volume_root_mut(&mut self) -> &mut Group {
        self.root.create_group(VOLUME_ROOT_GROUP)
    }
    /// volume names in creation order
    pub fn volume_names(&self) -> Vec<String> {
        match self.volume_root() {
            Ok(root) => root.groups().map(|g| g.name().to_string()).collect(),
            Err(_) => Vec::new()
        }
    }
    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let mut magic = [0u8;4];
        r.read_exact(&mut magic)?;
        if magic != FORMAT_MAGIC {
            return Err(Error::Io(std::io::Error::new(ErrorKind::InvalidData,"not a hive file")));
        }
        let mut version = [0u8;1];
        r.read_exact(&mut version)?;
        if version[0] != FORMAT_VERSION {
            return Err(Error::Io(std::io::Error::new(
                ErrorKind::InvalidData,format!("unsupported hive format version {}",version[0]))));
        }
        Ok(Self { root: Group::read(r)? })
    }
    pub fn write_to<W: Write>(&self,w: &mut W) -> Result<()> {
        w.write_all(&FORMAT_MAGIC)?;
        w.write_all(&[FORMAT_VERSION])?;
        self.root.write(w)
    }
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        log::debug!("opening hive file {}",path.as_ref().display());
        let mut file = std::fs::File::open(path)?;
        Self::read_from(&mut file)
    }
    pub fn save<P: AsRef<Path>>(&self,path: P) -> Result<()> {
        log::debug!("saving hive file {}",path.as_ref().display());
        let mut file = std::fs::File::create(path)?;
        self.write_to(&mut file)
    }
}

// *************** TESTS *****************

#[test]
fn typed_attributes() {
    let mut g = Group::new("g");
    g.write_scalar("answer",&42u32);
    g.write_string_attr("label","hello");
    assert_eq!(g.read_scalar::<u32>("answer").unwrap(),42);
    assert_eq!(g.read_string_attr("label").unwrap(),"hello");
    // tag mismatch surfaces a type error
    assert!(matches!(g.read_scalar::<f32>("answer"),Err(crate::Error::Type(_))));
    // missing attribute surfaces an io error
    assert!(matches!(g.read_scalar::<u32>("nope"),Err(crate::Error::Io(_))));
}

#[test]
fn vector_attributes() {
    let mut g = Group::new("g");
    g.write_index_vec("offset",IndexVec::new(4,8,12));
    assert_eq!(g.read_index_vec("offset").unwrap(),IndexVec::new(4,8,12));
    g.write_vector::<f64>("res",&[0.5,1.0,2.0]);
    assert_eq!(g.read_vector::<f64>("res").unwrap(),vec![0.5,1.0,2.0]);
    assert!(matches!(g.read_vector::<f32>("res"),Err(crate::Error::Type(_))));
}

#[test]
fn groups_keep_creation_order() {
    let mut g = Group::new("/");
    g.create_group("b");
    g.create_group("a");
    g.create_group("c");
    // get-or-create does not duplicate
    g.create_group("a");
    let names: Vec<&str> = g.groups().map(|c| c.name()).collect();
    assert_eq!(names,vec!["b","a","c"]);
    assert!(g.remove_group("a"));
    assert!(!g.remove_group("a"));
    let names: Vec<&str> = g.groups().map(|c| c.name()).collect();
    assert_eq!(names,vec!["b","c"]);
}

#[test]
fn container_round_trip() {
    let mut file = HiveFile::new();
    let root = file.volume_root_mut();
    let vol = root.create_group("density");
    vol.write_scalar(DEFAULT_VALUE_ATTR,&0.25f32);
    vol.write_scalar(BRANCHING_FACTOR_ATTR,&2u8);
    let mut ds = Dataset::new(vec![4],u8::TYPE_TAG,vec![1,2,3,4]);
    ds.write_scalar_attr("extra",&7u8);
    vol.set_dataset("blob",ds);
    let mut buf: Vec<u8> = Vec::new();
    file.write_to(&mut buf).expect("write failed");
    let back = HiveFile::read_from(&mut std::io::Cursor::new(buf)).expect("read failed");
    assert_eq!(file,back);
    assert_eq!(back.volume_names(),vec!["density".to_string()]);
    let vol = back.volume_root().unwrap().require_group("density").unwrap();
    assert_eq!(vol.read_scalar::<f32>(DEFAULT_VALUE_ATTR).unwrap(),0.25);
    assert_eq!(vol.dataset("blob").unwrap().read_scalar_attr::<u8>("extra").unwrap(),7);
}

#[test]
fn rejects_foreign_bytes() {
    let junk = b"JUNKxxxxxxxx".to_vec();
    assert!(HiveFile::read_from(&mut std::io::Cursor::new(junk)).is_err());
}

#[test]
fn leaf_names_are_deterministic() {
    let name = leaf_group_name(LeafType::Cell,3,IndexVec::new(0,4,64));
    assert_eq!(name,"cell_q3_0_4_64");
    let name = leaf_group_name(LeafType::FillNode,7,IndexVec::new(16,0,0));
    assert_eq!(name,"fill_q7_16_0_0");
}
