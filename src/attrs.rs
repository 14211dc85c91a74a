//! Volume attributes.
//!
//! An attribute collection is an opaque side-bag of named, typed values on a
//! volume.  The value types form a closed set of tagged variants; the tag
//! travels with the value in streams and containers, and an unrecognized tag
//! on disk is a type error rather than a silently skipped entry.  Once a
//! name holds a value of one tag it cannot be reassigned to another tag.

use std::collections::BTreeMap;
use std::io::{Read,Write};
use crate::store::{Group,ScalarAttr,USER_ATTR_GROUP};
use crate::store::{write_string,read_string};
use crate::value::Value;
use crate::{Error,Result};

/// one typed attribute value
#[derive(Clone,Debug,PartialEq)]
pub enum AttrValue {
    Str(String),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64)
}

impl AttrValue {
    pub fn type_tag(&self) -> &'static str {
        match self {
            AttrValue::Str(_) => "string",
            AttrValue::I32(_) => "i32",
            AttrValue::I64(_) => "i64",
            AttrValue::U32(_) => "u32",
            AttrValue::U64(_) => "u64",
            AttrValue::F32(_) => "f32",
            AttrValue::F64(_) => "f64"
        }
    }
    fn payload(&self) -> Vec<u8> {
        match self {
            AttrValue::Str(s) => s.as_bytes().to_vec(),
            AttrValue::I32(v) => v.to_le_vec(),
            AttrValue::I64(v) => v.to_le_vec(),
            AttrValue::U32(v) => v.to_le_vec(),
            AttrValue::U64(v) => v.to_le_vec(),
            AttrValue::F32(v) => v.to_le_vec(),
            AttrValue::F64(v) => v.to_le_vec()
        }
    }
    fn decode(tag: &str,bytes: &[u8]) -> Result<Self> {
        let bad = || Error::Type(format!("malformed {} attribute payload",tag));
        match tag {
            "string" => match String::from_utf8(bytes.to_vec()) {
                Ok(s) => Ok(AttrValue::Str(s)),
                Err(_) => Err(bad())
            },
            "i32" => i32::from_le_slice(bytes).map(AttrValue::I32).ok_or_else(bad),
            "i64" => i64::from_le_slice(bytes).map(AttrValue::I64).ok_or_else(bad),
            "u32" => u32::from_le_slice(bytes).map(AttrValue::U32).ok_or_else(bad),
            "u64" => u64::from_le_slice(bytes).map(AttrValue::U64).ok_or_else(bad),
            "f32" => f32::from_le_slice(bytes).map(AttrValue::F32).ok_or_else(bad),
            "f64" => f64::from_le_slice(bytes).map(AttrValue::F64).ok_or_else(bad),
            _ => Err(Error::Type(format!("unregistered attribute type {}",tag)))
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Str(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Str(s)
    }
}

impl From<i32> for AttrValue {
    fn from(v: i32) -> Self {
        AttrValue::I32(v)
    }
}

impl From<f32> for AttrValue {
    fn from(v: f32) -> Self {
        AttrValue::F32(v)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::F64(v)
    }
}

/// named typed values keyed by name
#[derive(Clone,Debug,Default,PartialEq)]
pub struct AttributeCollection {
    map: BTreeMap<String,AttrValue>
}

impl AttributeCollection {
    pub fn new() -> Self {
        Self::default()
    }
    /// Insert or overwrite.  The name cannot be empty, and an existing
    /// attribute keeps its type for life.
    pub fn insert<V: Into<AttrValue>>(&mut self,name: &str,value: V) -> Result<()> {
        if name.is_empty() {
            return Err(Error::Arg("attribute cannot have an empty name".to_string()));
        }
        let value = value.into();
        if let Some(existing) = self.map.get(name) {
            if existing.type_tag() != value.type_tag() {
                return Err(Error::Type(format!(
                    "cannot assign a {} value to attribute {} of type {}",
                    value.type_tag(),name,existing.type_tag())));
            }
        }
        self.map.insert(name.to_string(),value);
        Ok(())
    }
    pub fn value(&self,name: &str) -> Result<&AttrValue> {
        match self.map.get(name) {
            Some(v) => Ok(v),
            None => Err(Error::Arg(format!("cannot find attribute {}",name)))
        }
    }
    pub fn string(&self,name: &str) -> Result<&str> {
        match self.value(name)? {
            AttrValue::Str(s) => Ok(s),
            other => Err(Error::Type(format!(
                "attribute {} is {} not string",name,other.type_tag())))
        }
    }
    pub fn remove(&mut self,name: &str) {
        self.map.remove(name);
    }
    pub fn count(&self) -> usize {
        self.map.len()
    }
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str,&AttrValue)> {
        self.map.iter().map(|(n,v)| (n.as_str(),v))
    }
    pub fn clear(&mut self) {
        self.map.clear();
    }

    pub fn write<W: Write>(&self,w: &mut W) -> Result<()> {
        (self.map.len() as u64).write_to(w)?;
        for (name,value) in self.map.iter() {
            write_string(w,name)?;
            write_string(w,value.type_tag())?;
            let payload = value.payload();
            (payload.len() as u64).write_to(w)?;
            w.write_all(&payload)?;
        }
        Ok(())
    }
    pub fn read<R: Read>(r: &mut R) -> Result<Self> {
        let mut attrs = Self::new();
        let count = u64::read_from(r)?;
        for _ in 0..count {
            let name = read_string(r)?;
            let tag = read_string(r)?;
            let len = u64::read_from(r)? as usize;
            let mut payload = vec![0u8;len];
            r.read_exact(&mut payload)?;
            attrs.insert(&name,AttrValue::decode(&tag,&payload)?)?;
        }
        Ok(attrs)
    }
    /// container form: one tagged scalar attribute per entry under the
    /// user-attributes sub-group
    pub fn write_group(&self,volume_group: &mut Group) {
        let user = volume_group.create_group(USER_ATTR_GROUP);
        for (name,value) in self.map.iter() {
            user.set_scalar(name,ScalarAttr {
                type_tag: value.type_tag().to_string(),
                bytes: value.payload()
            });
        }
    }
    pub fn read_group(volume_group: &Group) -> Result<Self> {
        let user = volume_group.require_group(USER_ATTR_GROUP)?;
        let mut attrs = Self::new();
        for (name,scalar) in user.scalars() {
            attrs.insert(name,AttrValue::decode(&scalar.type_tag,&scalar.bytes)?)?;
        }
        Ok(attrs)
    }
}

// *************** TESTS *****************

#[test]
fn insert_and_lookup() {
    let mut attrs = AttributeCollection::new();
    attrs.insert("name","fog").unwrap();
    attrs.insert("frame",42i32).unwrap();
    attrs.insert("scale",0.5f64).unwrap();
    assert_eq!(attrs.count(),3);
    assert_eq!(attrs.string("name").unwrap(),"fog");
    assert_eq!(attrs.value("frame").unwrap(),&AttrValue::I32(42));
    // overwrite with the same type is fine
    attrs.insert("frame",43i32).unwrap();
    assert_eq!(attrs.value("frame").unwrap(),&AttrValue::I32(43));
}

#[test]
fn error_cases() {
    let mut attrs = AttributeCollection::new();
    assert!(matches!(attrs.insert("",1i32),Err(crate::Error::Arg(_))));
    attrs.insert("frame",42i32).unwrap();
    // retyping an existing attribute is refused
    assert!(matches!(attrs.insert("frame",1.0f32),Err(crate::Error::Type(_))));
    assert!(matches!(attrs.value("missing"),Err(crate::Error::Arg(_))));
    assert!(matches!(attrs.string("frame"),Err(crate::Error::Type(_))));
}

#[test]
fn removal() {
    let mut attrs = AttributeCollection::new();
    attrs.insert("a",1i32).unwrap();
    attrs.insert("b",2i32).unwrap();
    attrs.remove("a");
    assert_eq!(attrs.count(),1);
    assert!(attrs.value("a").is_err());
    // removing frees the name for a different type
    attrs.insert("a","text").unwrap();
    assert_eq!(attrs.string("a").unwrap(),"text");
}

#[test]
fn stream_round_trip() {
    let mut attrs = AttributeCollection::new();
    attrs.insert("name","smoke").unwrap();
    attrs.insert("frame",7i32).unwrap();
    attrs.insert("fps",24.0f64).unwrap();
    let mut buf: Vec<u8> = Vec::new();
    attrs.write(&mut buf).expect("write failed");
    let back = AttributeCollection::read(&mut std::io::Cursor::new(buf)).expect("read failed");
    assert_eq!(attrs,back);
}

#[test]
fn group_round_trip() {
    let mut attrs = AttributeCollection::new();
    attrs.insert("name","smoke").unwrap();
    attrs.insert("description","a test volume").unwrap();
    attrs.insert("gain",1.5f32).unwrap();
    let mut vol = Group::new("vol");
    attrs.write_group(&mut vol);
    let back = AttributeCollection::read_group(&vol).expect("read failed");
    assert_eq!(attrs,back);
    // a volume group without the user attribute group is an io error
    let bare = Group::new("vol");
    assert!(matches!(AttributeCollection::read_group(&bare),Err(crate::Error::Io(_))));
}

#[test]
fn unknown_tag_is_a_type_error() {
    let mut vol = Group::new("vol");
    let user = vol.create_group(USER_ATTR_GROUP);
    user.set_scalar("weird",ScalarAttr { type_tag: "matrix4".to_string(), bytes: vec![0;64] });
    assert!(matches!(AttributeCollection::read_group(&vol),Err(crate::Error::Type(_))));
}
