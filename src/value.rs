//! Scalar voxel values
//!
//! The storage engine is generic over the stored scalar.  Anything that can
//! round-trip exactly through a little endian byte stream qualifies: the
//! fixed width integers and the IEEE floats.  The type tag travels with the
//! value in streams and container attributes so that readers can refuse a
//! mismatched payload instead of misinterpreting it.

use std::io::{Read,Write,ErrorKind};

/// The scalar stored in a volume.  Compared by equality only.
pub trait Value: Copy + PartialEq + Default + std::fmt::Debug + 'static {
    /// stable tag identifying the type in streams and containers
    const TYPE_TAG: &'static str;
    /// encoded size in bytes
    const SIZE: usize;
    /// little endian encoding
    fn to_le_vec(&self) -> Vec<u8>;
    /// decode from a little endian slice, None if the length is wrong
    fn from_le_slice(bytes: &[u8]) -> Option<Self>;
    /// write the little endian encoding to a stream
    fn write_to<W: Write>(&self,w: &mut W) -> std::io::Result<()> {
        w.write_all(&self.to_le_vec())
    }
    /// read a value from a stream
    fn read_from<R: Read>(r: &mut R) -> std::io::Result<Self> {
        let mut buf = vec![0u8;Self::SIZE];
        r.read_exact(&mut buf)?;
        match Self::from_le_slice(&buf) {
            Some(v) => Ok(v),
            None => Err(std::io::Error::new(ErrorKind::InvalidData,"bad scalar encoding"))
        }
    }
}

macro_rules! value_impl {
    ($t:ty,$tag:literal) => {
        impl Value for $t {
            const TYPE_TAG: &'static str = $tag;
            const SIZE: usize = std::mem::size_of::<$t>();
            fn to_le_vec(&self) -> Vec<u8> {
                <$t>::to_le_bytes(*self).to_vec()
            }
            fn from_le_slice(bytes: &[u8]) -> Option<Self> {
                match bytes.try_into() {
                    Ok(arr) => Some(<$t>::from_le_bytes(arr)),
                    Err(_) => None
                }
            }
        }
    };
}

value_impl!(u8,"u8");
value_impl!(i8,"i8");
value_impl!(u16,"u16");
value_impl!(i16,"i16");
value_impl!(u32,"u32");
value_impl!(i32,"i32");
value_impl!(u64,"u64");
value_impl!(i64,"i64");
value_impl!(f32,"f32");
value_impl!(f64,"f64");

// *************** TESTS *****************

#[test]
fn round_trip() {
    let mut buf: Vec<u8> = Vec::new();
    3.25f32.write_to(&mut buf).expect("write failed");
    (-77i32).write_to(&mut buf).expect("write failed");
    0x0123456789abcdefu64.write_to(&mut buf).expect("write failed");
    let mut curs = std::io::Cursor::new(buf);
    assert_eq!(f32::read_from(&mut curs).unwrap(),3.25);
    assert_eq!(i32::read_from(&mut curs).unwrap(),-77);
    assert_eq!(u64::read_from(&mut curs).unwrap(),0x0123456789abcdef);
}

#[test]
fn encoding_is_little_endian() {
    assert_eq!(hex::encode(0x11223344u32.to_le_vec()),"44332211");
    assert_eq!(u32::from_le_slice(&[0x44,0x33,0x22,0x11]),Some(0x11223344));
    assert_eq!(u32::from_le_slice(&[0x44,0x33]),None);
}
