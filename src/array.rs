//! The dense array family: primitive, coded, packed-string, zoned, and
//! object variants behind one contract.

mod builder;
mod coded;
mod object;
mod packed;
mod primitive;
mod zoned;

pub use builder::ArrayBuilder;
pub use coded::{
    CodedIntArray, CodedLongArray, DateArray, DateTimeArray, EnumArray, TimeArray,
};
pub use object::ObjectArray;
pub use packed::{PackedTextArray, PackedUtf16Array, PackedUtf8Array, TextUnit};
pub use primitive::{BooleanArray, DoubleArray, IntArray, LongArray, PrimitiveArray};
pub use zoned::ZonedArray;

use crate::datatypes::DataType;
use crate::value::Value;
use std::io;
use thiserror::Error;

/// The read-only contract every dense array variant satisfies.
///
/// Mutation entry points stay on the concrete types (their signatures are
/// type-specific); the [`Column`](crate::Column) facade exposes the uniform
/// mutable surface.
pub trait Array {
    fn data_type(&self) -> DataType;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the entry at `index` occupies the type's null channel.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    fn is_null(&self, index: usize) -> bool;

    /// Boxed view of the entry at `index`; `None` for null entries.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    fn value(&self, index: usize) -> Option<Value>;
}

/// Returned when a dynamically-typed access does not match the array's
/// element type.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[error("column type does not match the requested type")]
pub struct TypeError;

/// Serialization failure; never leaves a partially-initialized array behind.
#[derive(Debug, Error)]
pub enum ArrayIoError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("unknown type tag: {0}")]
    UnknownTag(u8),
    #[error("unknown coding tag: {0}")]
    UnknownCoding(u8),
    #[error("corrupt stream: {0}")]
    Corrupt(String),
}

pub(crate) fn check_index(index: usize, len: usize) {
    assert!(index < len, "index out of bounds: {index} >= {len}");
}

pub(crate) fn check_range(start: usize, end: usize, len: usize) {
    assert!(
        start <= end && end <= len,
        "index out of bounds: [{start}, {end}) on length {len}"
    );
}

pub(crate) fn check_update_indexes(from_indexes: &[usize], to_indexes: &[usize]) {
    assert!(
        from_indexes.len() == to_indexes.len(),
        "index out of bounds: from/to index arrays differ in length ({} != {})",
        from_indexes.len(),
        to_indexes.len()
    );
}

pub(crate) fn read_len<R: io::Read>(reader: &mut R) -> Result<usize, ArrayIoError> {
    let mut buf = [0_u8; 8];
    reader.read_exact(&mut buf)?;
    usize::try_from(u64::from_le_bytes(buf))
        .map_err(|_| ArrayIoError::Corrupt("length overflows usize".to_string()))
}

pub(crate) fn write_len<W: io::Write>(writer: &mut W, len: usize) -> Result<(), ArrayIoError> {
    writer.write_all(&(len as u64).to_le_bytes())?;
    Ok(())
}
