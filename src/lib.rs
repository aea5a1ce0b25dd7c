//! In-memory, typed, columnar data containers: dense primitive, coded,
//! packed-string, and zoned array variants behind one contract, with a
//! work-stealing parallel engine for bulk apply/reduce over two-dimensional
//! frames.

pub mod array;
pub mod coding;
mod column;
pub mod datatypes;
mod frame;
mod pool;
pub mod range;
pub mod sort;
mod value;

pub use array::{Array, ArrayBuilder, ArrayIoError, TypeError};
pub use column::Column;
pub use frame::{Frame, FrameCursor, FrameKey, FrameValue};
pub use pool::POOL;
pub use value::Value;
