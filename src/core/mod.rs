//! Core codec: schema tables, row materialization, XML rendering and
//! flattening.
//!
//! Everything here works on the in-memory [`Sheet`] grid and plain
//! strings; `.xlsx` decoding lives in the `workbook` module.

mod cell;
mod codec;
mod error;
mod flatten;
mod materialize;
mod options;
mod schema_id;
mod serialize;
mod tables;
mod tree;
mod values;

pub use cell::*;
pub use codec::*;
pub use error::*;
pub use flatten::flatten;
pub use materialize::*;
pub use options::*;
pub use schema_id::*;
pub use serialize::*;
pub use tables::*;
pub use tree::*;
pub use values::*;
