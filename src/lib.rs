//! # Voxhive Library
//!
//! Sparse, adaptive, hierarchical voxel storage ("the hive").
//! * `volume` is the user-facing façade: signed-index get/set/unset/update,
//!   stamping, iteration, and IO
//! * `tree` glues eight octant trees into one signed-coordinate container
//! * `node` and `cell` are the interior and leaf blocks of the tree
//! * `bitfield`, `bounds` and `bitops` are the underlying index machinery
//! * `store` is a small hierarchical typed-group container backing hive files
//!
//! Only regions that deviate from a per-volume default value are stored.
//! Interior subtrees and leaf cells can collapse to a single fill value, so
//! a solid region of any size costs O(1) memory.
//!
//! ## Example
//!
//! ```rs
//! use voxhive::volume::Volume;
//! let mut v: Volume<f32> = Volume::new(2,2,0.0);
//! v.set(-10,4,1000000,3.5).expect("set failed");
//! assert_eq!(v.get(-10,4,1000000),3.5);
//! assert_eq!(v.get(0,0,0),0.0);
//! ```

pub mod value;
pub mod types;
pub mod bitops;
pub mod bounds;
pub mod bitfield;
pub mod cell;
pub mod node;
pub mod tree;
pub mod iter;
pub mod volume;
pub mod xform;
pub mod attrs;
pub mod stamp;
pub mod store;
pub mod kernel;

/// Hive Errors
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("cannot modify a compressed cell")]
    ModifyCompressed,
    #[error("type mismatch: {0}")]
    Type(String),
    #[error("bad argument: {0}")]
    Arg(String),
    #[error("i/o failure")]
    Io(#[from] std::io::Error)
}

pub type Result<T> = std::result::Result<T,Error>;
