use super::{check_index, check_range, check_update_indexes, read_len, write_len};
use super::{Array, ArrayIoError};
use crate::datatypes::{BooleanType, DoubleType, IntType, LongType, NativeType, PrimitiveType};
use crate::sort::{self, SliceTarget};
use crate::value::Value;
use ahash::AHashSet;
use std::fmt;
use std::io::{Read, Write};
use std::ops::Index;
use std::slice;

/// A dense, fixed-length (but expandable) array of a primitive type.
pub struct PrimitiveArray<T: PrimitiveType> {
    values: Vec<T::Native>,
    default: T::Native,
    parallel: bool,
}

pub type BooleanArray = PrimitiveArray<BooleanType>;
pub type IntArray = PrimitiveArray<IntType>;
pub type LongArray = PrimitiveArray<LongType>;
pub type DoubleArray = PrimitiveArray<DoubleType>;

impl<T: PrimitiveType> PrimitiveArray<T> {
    /// Creates an array of `len` elements, every slot holding the type's
    /// default value.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self::with_default(len, T::default_value())
    }

    /// Creates an array of `len` elements with a declared default value.
    #[must_use]
    pub fn with_default(len: usize, default: T::Native) -> Self {
        Self {
            values: vec![default; len],
            default,
            parallel: false,
        }
    }

    #[must_use]
    pub fn from_vec(values: Vec<T::Native>) -> Self {
        Self {
            values,
            default: T::default_value(),
            parallel: false,
        }
    }

    #[must_use]
    pub fn default_value(&self) -> T::Native {
        self.default
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Switches bulk operations on this array to the multi-threaded strategy.
    #[must_use]
    pub fn parallel(mut self) -> Self {
        self.parallel = true;
        self
    }

    /// Switches bulk operations on this array to the synchronous strategy.
    #[must_use]
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    #[must_use]
    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    pub fn set_parallel(&mut self, parallel: bool) {
        self.parallel = parallel;
    }

    /// Direct primitive access, no boxing.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[must_use]
    pub fn get(&self, index: usize) -> T::Native {
        check_index(index, self.values.len());
        self.values[index]
    }

    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn set(&mut self, index: usize, value: T::Native) {
        check_index(index, self.values.len());
        self.values[index] = value;
    }

    /// Boxed write; `None` stores the default value.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn set_option(&mut self, index: usize, value: Option<T::Native>) {
        self.set(index, value.unwrap_or(self.default));
    }

    #[must_use]
    pub fn values(&self) -> &[T::Native] {
        &self.values
    }

    pub(crate) fn values_mut(&mut self) -> &mut [T::Native] {
        &mut self.values
    }

    pub fn iter(&self) -> slice::Iter<'_, T::Native> {
        self.values.iter()
    }

    /// Overwrites `[start, end)`; `None` writes the default value.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    pub fn fill(&mut self, value: Option<T::Native>, start: usize, end: usize) {
        check_range(start, end, self.values.len());
        let v = value.unwrap_or(self.default);
        for slot in &mut self.values[start..end] {
            *slot = v;
        }
    }

    /// Grows to exactly `new_len` elements, filling new slots with the
    /// default value. Never shrinks.
    pub fn expand(&mut self, new_len: usize) {
        if new_len > self.values.len() {
            self.values.resize(new_len, self.default);
        }
    }

    /// Deep clone, backing buffer included.
    #[must_use]
    pub fn copy(&self) -> Self {
        Self {
            values: self.values.clone(),
            default: self.default,
            parallel: self.parallel,
        }
    }

    /// Slices `[start, end)` into a new array with the same default value.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    #[must_use]
    pub fn copy_range(&self, start: usize, end: usize) -> Self {
        check_range(start, end, self.values.len());
        Self {
            values: self.values[start..end].to_vec(),
            default: self.default,
            parallel: self.parallel,
        }
    }

    /// Gathers the given ordinals into a new array with the same default
    /// value.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of bounds.
    #[must_use]
    pub fn copy_indexes(&self, indexes: &[usize]) -> Self {
        let values = indexes.iter().map(|&i| self.get(i)).collect();
        Self {
            values,
            default: self.default,
            parallel: self.parallel,
        }
    }

    /// Copies `length` elements of `from` starting at `from_index` into this
    /// array starting at `to_index`, expanding the receiver if necessary.
    ///
    /// # Panics
    ///
    /// Panics if the source range is out of bounds.
    pub fn update_range(&mut self, to_index: usize, from: &Self, from_index: usize, length: usize) {
        check_range(from_index, from_index + length, from.len());
        self.expand(to_index + length);
        self.values[to_index..to_index + length]
            .copy_from_slice(&from.values[from_index..from_index + length]);
    }

    /// Copies `from[from_indexes[k]]` into `self[to_indexes[k]]` for every
    /// `k`, expanding the receiver if necessary.
    ///
    /// # Panics
    ///
    /// Panics if the index arrays differ in length or a source index is out
    /// of bounds.
    pub fn update(&mut self, from: &Self, from_indexes: &[usize], to_indexes: &[usize]) {
        check_update_indexes(from_indexes, to_indexes);
        if let Some(max_to) = to_indexes.iter().max() {
            self.expand(max_to + 1);
        }
        for (&fi, &ti) in from_indexes.iter().zip(to_indexes) {
            self.values[ti] = from.get(fi);
        }
    }

    /// Sorts `[start, end)` in place; `multiplier` `+1` ascends, `-1`
    /// descends. Uses the parallel engine when this array is in parallel
    /// mode.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    pub fn sort(&mut self, start: usize, end: usize, multiplier: i32) {
        check_range(start, end, self.values.len());
        let parallel = self.parallel;
        let target = SliceTarget::new(&mut self.values, multiplier);
        sort::sort(&target, start, end, parallel);
    }

    /// Collects distinct values in first-seen order, stopping once `limit`
    /// values have been found.
    #[must_use]
    pub fn distinct(&self, limit: usize) -> Vec<T::Native> {
        let mut seen = AHashSet::new();
        let mut out = Vec::new();
        for &v in &self.values {
            if seen.insert(v.to_key()) {
                out.push(v);
                if out.len() >= limit {
                    break;
                }
            }
        }
        out
    }

    /// Writes element count, default value, then a flat dump in ordinal
    /// order.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `writer` fails.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), ArrayIoError> {
        write_len(writer, self.values.len())?;
        self.default.write_le(writer)?;
        for &v in &self.values {
            v.write_le(writer)?;
        }
        Ok(())
    }

    /// Writes an arbitrary ordinal subset in the same format, so it reads
    /// back as a smaller array.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `writer` fails.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of bounds.
    pub fn write_indexes<W: Write>(
        &self,
        writer: &mut W,
        indexes: &[usize],
    ) -> Result<(), ArrayIoError> {
        write_len(writer, indexes.len())?;
        self.default.write_le(writer)?;
        for &i in indexes {
            self.get(i).write_le(writer)?;
        }
        Ok(())
    }

    /// Reads back an array written by [`write`](Self::write).
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is truncated.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, ArrayIoError> {
        let len = read_len(reader)?;
        let default = T::Native::read_le(reader)?;
        let mut values = Vec::with_capacity(len);
        for _ in 0..len {
            values.push(T::Native::read_le(reader)?);
        }
        Ok(Self {
            values,
            default,
            parallel: false,
        })
    }
}

impl IntArray {
    /// Running sum over the full array, returned as a new array.
    #[must_use]
    pub fn cum_sum(&self) -> Self {
        let mut out = Vec::with_capacity(self.values.len());
        let mut acc = 0_i32;
        for &v in &self.values {
            acc += v;
            out.push(acc);
        }
        Self::from_vec(out)
    }
}

impl DoubleArray {
    /// Running sum treating NaN operands as "skip": the last non-NaN
    /// cumulative value carries forward instead of NaN propagating.
    #[must_use]
    pub fn cum_sum(&self) -> Self {
        let mut out = Vec::with_capacity(self.values.len());
        let mut acc = f64::NAN;
        for &v in &self.values {
            if !v.is_nan() {
                acc = if acc.is_nan() { v } else { acc + v };
            }
            out.push(acc);
        }
        Self::from_vec(out)
    }
}

impl<T: PrimitiveType> Array for PrimitiveArray<T>
where
    T::Native: Into<Value>,
{
    fn data_type(&self) -> crate::datatypes::DataType {
        T::data_type()
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn is_null(&self, index: usize) -> bool {
        self.get(index).is_null_value()
    }

    fn value(&self, index: usize) -> Option<Value> {
        let v = self.get(index);
        if v.is_null_value() {
            None
        } else {
            Some(v.into())
        }
    }
}

impl<T: PrimitiveType> Clone for PrimitiveArray<T> {
    fn clone(&self) -> Self {
        self.copy()
    }
}

/// Elementwise equality; floats compare by bit pattern, so null (NaN)
/// entries are equal to each other.
impl<T: PrimitiveType> PartialEq for PrimitiveArray<T> {
    fn eq(&self, other: &Self) -> bool {
        self.values.len() == other.values.len()
            && self
                .values
                .iter()
                .zip(&other.values)
                .all(|(a, b)| a.to_key() == b.to_key())
    }
}

impl<T: PrimitiveType> Index<usize> for PrimitiveArray<T> {
    type Output = T::Native;

    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    fn index(&self, index: usize) -> &Self::Output {
        check_index(index, self.values.len());
        &self.values[index]
    }
}

impl<T: PrimitiveType> fmt::Debug for PrimitiveArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrimitiveArray<{:?}>", T::data_type())?;
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PrimitiveType> From<&[T::Native]> for PrimitiveArray<T> {
    fn from(slice: &[T::Native]) -> Self {
        Self::from_vec(slice.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_array_holds_defaults() {
        let array = IntArray::new(4);
        assert!(array.iter().all(|&v| v == 0));
        let array = DoubleArray::new(4);
        for i in 0..array.len() {
            assert!(array.is_null(i));
            assert!(array.get(i).is_nan());
        }
    }

    #[test]
    fn boolean_fill_copy_and_round_trip() {
        let mut array = BooleanArray::new(4);
        array.fill(Some(true), 1, 3);
        assert_eq!(array.values(), &[false, true, true, false]);
        // Booleans carry no null channel.
        assert!((0..array.len()).all(|i| !array.is_null(i)));

        let mut buf = Vec::new();
        array.write(&mut buf).unwrap();
        let restored = BooleanArray::read(&mut buf.as_slice()).unwrap();
        assert_eq!(array.copy(), restored);
    }

    #[test]
    fn copy_is_deep() {
        let mut array = LongArray::from_vec(vec![1, 2, 3]);
        let copy = array.copy();
        array.set(0, 9);
        assert_eq!(copy.get(0), 1);
        assert_eq!(copy, LongArray::from_vec(vec![1, 2, 3]));
    }

    #[test]
    fn copy_round_trip_including_nulls() {
        let mut array = DoubleArray::new(3);
        array.set(1, 2.5);
        let copy = array.copy();
        assert_eq!(array, copy);
        assert!(copy.is_null(0));
        assert_eq!(copy.get(1), 2.5);
    }

    #[test]
    fn fill_and_expand() {
        let mut array = IntArray::with_default(3, 7);
        array.fill(Some(1), 0, 2);
        assert_eq!(array.values(), &[1, 1, 7]);
        array.expand(5);
        assert_eq!(array.values(), &[1, 1, 7, 7, 7]);
        array.expand(2); // never shrinks
        assert_eq!(array.len(), 5);
    }

    #[test]
    fn update_gathers_and_expands() {
        let mut target = IntArray::new(2);
        let source = IntArray::from_vec(vec![10, 20, 30]);
        target.update(&source, &[2, 0], &[0, 4]);
        assert_eq!(target.values(), &[30, 0, 0, 0, 10]);

        let mut target = IntArray::new(1);
        target.update_range(2, &source, 1, 2);
        assert_eq!(target.values(), &[0, 0, 20, 30]);
    }

    #[test]
    fn sort_directions_are_reversals() {
        let values = vec![3_i64, 1, 4, 1, 5, 9, 2, 6];
        let mut asc = LongArray::from_vec(values.clone());
        asc.sort(0, 8, 1);
        let mut desc = LongArray::from_vec(values);
        desc.sort(0, 8, -1);
        let mut reversed = asc.values().to_vec();
        reversed.reverse();
        assert_eq!(desc.values(), reversed.as_slice());
    }

    #[test]
    fn distinct_preserves_first_seen_order() {
        let array = IntArray::from_vec(vec![3, 1, 3, 2, 1, 4]);
        assert_eq!(array.distinct(10), vec![3, 1, 2, 4]);
        assert_eq!(array.distinct(2), vec![3, 1]);
    }

    #[test]
    fn int_cum_sum() {
        let array = IntArray::from_vec(vec![1, 2, 3]);
        assert_eq!(array.cum_sum().values(), &[1, 3, 6]);
    }

    #[test]
    fn double_cum_sum_carries_past_nan() {
        let array = DoubleArray::from_vec(vec![1.0, f64::NAN, 2.0]);
        assert_eq!(array.cum_sum().values(), &[1.0, 1.0, 3.0]);
    }

    #[test]
    fn write_read_round_trip() {
        let mut array = DoubleArray::new(3);
        array.set(2, 1.25);
        let mut buf = Vec::new();
        array.write(&mut buf).unwrap();
        let restored = DoubleArray::read(&mut buf.as_slice()).unwrap();
        assert_eq!(array, restored);
        assert!(restored.is_null(0));
    }

    #[test]
    fn write_indexes_subset() {
        let array = IntArray::from_vec(vec![10, 20, 30, 40]);
        let mut buf = Vec::new();
        array.write_indexes(&mut buf, &[3, 1]).unwrap();
        let restored = IntArray::read(&mut buf.as_slice()).unwrap();
        assert_eq!(restored.values(), &[40, 20]);
    }

    #[test]
    #[should_panic(expected = "index out of bounds")]
    fn out_of_range_get_panics() {
        let array = IntArray::new(2);
        array.get(2);
    }

    #[test]
    #[should_panic(expected = "index out of bounds")]
    fn mismatched_update_indexes_panic() {
        let mut target = IntArray::new(2);
        let source = IntArray::new(2);
        target.update(&source, &[0, 1], &[0]);
    }
}
