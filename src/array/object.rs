use super::{check_index, check_range, check_update_indexes, read_len, write_len};
use super::{Array, ArrayIoError};
use crate::datatypes::{DataType, NativeType};
use crate::sort::{self, SharedPtr, SortTarget};
use crate::value::Value;
use chrono::{NaiveDate, NaiveTime, TimeZone, Timelike};
use std::cmp::{self, Ordering};
use std::fmt;
use std::io::{Read, Write};
use std::marker::PhantomData;
use std::str::FromStr;

/// Boxed fallback storage for element types without a dense representation.
///
/// Unlike the primitive variants this array grows geometrically (1.5x) so
/// repeated expansion through a builder stays amortized.
#[derive(Clone)]
pub struct ObjectArray<T> {
    values: Vec<Option<T>>,
    default: Option<T>,
    parallel: bool,
}

impl<T: Clone> ObjectArray<T> {
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self::with_default(len, None)
    }

    #[must_use]
    pub fn with_default(len: usize, default: Option<T>) -> Self {
        Self {
            values: vec![default.clone(); len],
            default,
            parallel: false,
        }
    }

    #[must_use]
    pub fn from_values<I: IntoIterator<Item = Option<T>>>(values: I) -> Self {
        Self {
            values: values.into_iter().collect(),
            default: None,
            parallel: false,
        }
    }

    #[must_use]
    pub fn default_value(&self) -> Option<&T> {
        self.default.as_ref()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn parallel(mut self) -> Self {
        self.parallel = true;
        self
    }

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

    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        check_index(index, self.values.len());
        self.values[index].as_ref()
    }

    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn set(&mut self, index: usize, value: Option<T>) {
        check_index(index, self.values.len());
        self.values[index] = match value {
            Some(v) => Some(v),
            None => self.default.clone(),
        };
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Option<T>> {
        self.values.iter()
    }

    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    pub fn fill(&mut self, value: Option<&T>, start: usize, end: usize) {
        check_range(start, end, self.values.len());
        let v = match value {
            Some(v) => Some(v.clone()),
            None => self.default.clone(),
        };
        for slot in &mut self.values[start..end] {
            *slot = v.clone();
        }
    }

    /// Grows to at least `new_len`, reserving capacity at 1.5x the current
    /// length so repeated expansion stays amortized. Never shrinks.
    pub fn expand(&mut self, new_len: usize) {
        if new_len > self.values.len() {
            let reserve = cmp::max(new_len, self.values.len() + self.values.len() / 2);
            self.values.reserve(reserve - self.values.len());
            let default = self.default.clone();
            self.values.resize_with(new_len, || default.clone());
        }
    }

    #[must_use]
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    #[must_use]
    pub fn copy_range(&self, start: usize, end: usize) -> Self {
        check_range(start, end, self.values.len());
        Self {
            values: self.values[start..end].to_vec(),
            default: self.default.clone(),
            parallel: self.parallel,
        }
    }

    /// # Panics
    ///
    /// Panics if any index is out of bounds.
    #[must_use]
    pub fn copy_indexes(&self, indexes: &[usize]) -> Self {
        let values = indexes
            .iter()
            .map(|&i| {
                check_index(i, self.values.len());
                self.values[i].clone()
            })
            .collect();
        Self {
            values,
            default: self.default.clone(),
            parallel: self.parallel,
        }
    }

    /// # Panics
    ///
    /// Panics if the source range is out of bounds.
    pub fn update_range(&mut self, to_index: usize, from: &Self, from_index: usize, length: usize) {
        check_range(from_index, from_index + length, from.values.len());
        self.expand(to_index + length);
        for offset in 0..length {
            self.values[to_index + offset] = from.values[from_index + offset].clone();
        }
    }

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
            check_index(fi, from.values.len());
            self.values[ti] = from.values[fi].clone();
        }
    }

    /// Distinct values in first-seen order, stopping at `limit`.
    #[must_use]
    pub fn distinct(&self, limit: usize) -> Vec<T>
    where
        T: PartialEq,
    {
        let mut out: Vec<T> = Vec::new();
        for v in self.values.iter().flatten() {
            if !out.contains(v) {
                out.push(v.clone());
                if out.len() >= limit {
                    break;
                }
            }
        }
        out
    }
}

impl<T> ObjectArray<T>
where
    T: Clone + PartialOrd + Send + Sync,
{
    /// Sorts `[start, end)` in place; nulls order after every value.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    pub fn sort(&mut self, start: usize, end: usize, multiplier: i32) {
        check_range(start, end, self.values.len());
        let parallel = self.parallel;
        let target = ObjectTarget {
            ptr: SharedPtr::new(self.values.as_mut_ptr()),
            len: self.values.len(),
            multiplier,
            _marker: PhantomData,
        };
        sort::sort(&target, start, end, parallel);
    }
}

struct ObjectTarget<'a, T> {
    ptr: SharedPtr<Option<T>>,
    len: usize,
    multiplier: i32,
    _marker: PhantomData<&'a mut [Option<T>]>,
}

impl<T: PartialOrd + Send + Sync> SortTarget for ObjectTarget<'_, T> {
    fn compare(&self, a: usize, b: usize) -> Ordering {
        check_index(a, self.len);
        check_index(b, self.len);
        // Safety: bounds checked above; the backing vec outlives the target.
        let (left, right) = unsafe { (&*self.ptr.get().add(a), &*self.ptr.get().add(b)) };
        let ordering = match (left, right) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(x), Some(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        };
        if self.multiplier < 0 {
            ordering.reverse()
        } else {
            ordering
        }
    }

    fn swap(&self, a: usize, b: usize) {
        check_index(a, self.len);
        check_index(b, self.len);
        if a == b {
            return;
        }
        // Safety: bounds checked, `a != b`, and concurrent callers stay on
        // disjoint index ranges.
        unsafe { std::ptr::swap(self.ptr.get().add(a), self.ptr.get().add(b)) }
    }
}

impl<T: Clone + PartialEq> PartialEq for ObjectArray<T> {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl<T: fmt::Debug> fmt::Debug for ObjectArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectArray")?;
        f.debug_list().entries(self.values.iter()).finish()
    }
}

impl Array for ObjectArray<Value> {
    fn data_type(&self) -> DataType {
        DataType::Object
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn is_null(&self, index: usize) -> bool {
        self.get(index).is_none()
    }

    fn value(&self, index: usize) -> Option<Value> {
        self.get(index).cloned()
    }
}

const VALUE_NULL: u8 = 0;
const VALUE_BOOL: u8 = 1;
const VALUE_INT: u8 = 2;
const VALUE_LONG: u8 = 3;
const VALUE_DOUBLE: u8 = 4;
const VALUE_TEXT: u8 = 5;
const VALUE_DATE: u8 = 6;
const VALUE_DATE_TIME: u8 = 7;
const VALUE_TIME: u8 = 8;
const VALUE_ZONED: u8 = 9;

fn write_value<W: Write>(writer: &mut W, value: Option<&Value>) -> Result<(), ArrayIoError> {
    match value {
        None => writer.write_all(&[VALUE_NULL])?,
        Some(Value::Bool(v)) => {
            writer.write_all(&[VALUE_BOOL])?;
            v.write_le(writer)?;
        }
        Some(Value::Int(v)) => {
            writer.write_all(&[VALUE_INT])?;
            v.write_le(writer)?;
        }
        Some(Value::Long(v)) => {
            writer.write_all(&[VALUE_LONG])?;
            v.write_le(writer)?;
        }
        Some(Value::Double(v)) => {
            writer.write_all(&[VALUE_DOUBLE])?;
            v.write_le(writer)?;
        }
        Some(Value::Text(v)) => {
            writer.write_all(&[VALUE_TEXT])?;
            write_len(writer, v.len())?;
            writer.write_all(v.as_bytes())?;
        }
        Some(Value::Date(v)) => {
            writer.write_all(&[VALUE_DATE])?;
            let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid date");
            v.signed_duration_since(epoch).num_days().write_le(writer)?;
        }
        Some(Value::DateTime(v)) => {
            writer.write_all(&[VALUE_DATE_TIME])?;
            v.and_utc().timestamp_millis().write_le(writer)?;
        }
        Some(Value::Time(v)) => {
            writer.write_all(&[VALUE_TIME])?;
            let nanos =
                i64::from(v.num_seconds_from_midnight()) * 1_000_000_000 + i64::from(v.nanosecond());
            nanos.write_le(writer)?;
        }
        Some(Value::Zoned(v)) => {
            writer.write_all(&[VALUE_ZONED])?;
            v.timestamp_millis().write_le(writer)?;
            let name = v.timezone().name();
            write_len(writer, name.len())?;
            writer.write_all(name.as_bytes())?;
        }
    }
    Ok(())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn read_value<R: Read>(reader: &mut R) -> Result<Option<Value>, ArrayIoError> {
    let mut tag = [0_u8; 1];
    reader.read_exact(&mut tag)?;
    let value = match tag[0] {
        VALUE_NULL => return Ok(None),
        VALUE_BOOL => Value::Bool(bool::read_le(reader)?),
        VALUE_INT => Value::Int(i32::read_le(reader)?),
        VALUE_LONG => Value::Long(i64::read_le(reader)?),
        VALUE_DOUBLE => Value::Double(f64::read_le(reader)?),
        VALUE_TEXT => {
            let len = read_len(reader)?;
            let mut buf = vec![0_u8; len];
            reader.read_exact(&mut buf)?;
            Value::Text(
                String::from_utf8(buf)
                    .map_err(|e| ArrayIoError::Corrupt(e.to_string()))?,
            )
        }
        VALUE_DATE => {
            let days = i64::read_le(reader)?;
            let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid date");
            Value::Date(
                epoch
                    .checked_add_signed(chrono::Duration::days(days))
                    .ok_or_else(|| ArrayIoError::Corrupt(format!("epoch day {days} out of range")))?,
            )
        }
        VALUE_DATE_TIME => {
            let millis = i64::read_le(reader)?;
            Value::DateTime(
                chrono::DateTime::from_timestamp_millis(millis)
                    .ok_or_else(|| {
                        ArrayIoError::Corrupt(format!("epoch milli {millis} out of range"))
                    })?
                    .naive_utc(),
            )
        }
        VALUE_TIME => {
            let nanos = i64::read_le(reader)?;
            Value::Time(
                NaiveTime::from_num_seconds_from_midnight_opt(
                    (nanos / 1_000_000_000) as u32,
                    (nanos % 1_000_000_000) as u32,
                )
                .ok_or_else(|| ArrayIoError::Corrupt(format!("nanos {nanos} out of range")))?,
            )
        }
        VALUE_ZONED => {
            let millis = i64::read_le(reader)?;
            let len = read_len(reader)?;
            let mut buf = vec![0_u8; len];
            reader.read_exact(&mut buf)?;
            let name = String::from_utf8(buf)
                .map_err(|e| ArrayIoError::Corrupt(e.to_string()))?;
            let tz = chrono_tz::Tz::from_str(&name)
                .map_err(|_| ArrayIoError::Corrupt(format!("unknown zone id {name}")))?;
            let utc = chrono::DateTime::from_timestamp_millis(millis).ok_or_else(|| {
                ArrayIoError::Corrupt(format!("epoch milli {millis} out of range"))
            })?;
            Value::Zoned(tz.from_utc_datetime(&utc.naive_utc()))
        }
        other => return Err(ArrayIoError::UnknownTag(other)),
    };
    Ok(Some(value))
}

impl ObjectArray<Value> {
    /// Writes element count, the default entry, then every entry in ordinal
    /// order, each tagged by variant.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `writer` fails.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), ArrayIoError> {
        write_len(writer, self.values.len())?;
        write_value(writer, self.default.as_ref())?;
        for v in &self.values {
            write_value(writer, v.as_ref())?;
        }
        Ok(())
    }

    /// Writes an arbitrary ordinal subset in the same format.
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
        write_value(writer, self.default.as_ref())?;
        for &i in indexes {
            check_index(i, self.values.len());
            write_value(writer, self.values[i].as_ref())?;
        }
        Ok(())
    }

    /// Reads back an array written by [`write`](Self::write).
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is truncated or holds an unknown tag.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, ArrayIoError> {
        let len = read_len(reader)?;
        let default = read_value(reader)?;
        let mut values = Vec::with_capacity(len);
        for _ in 0..len {
            values.push(read_value(reader)?);
        }
        Ok(Self {
            values,
            default,
            parallel: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_set_stores_the_default() {
        let mut array = ObjectArray::with_default(3, Some("n/a".to_string()));
        array.set(0, Some("x".to_string()));
        array.set(1, None);
        assert_eq!(array.get(0).map(String::as_str), Some("x"));
        assert_eq!(array.get(1).map(String::as_str), Some("n/a"));
    }

    #[test]
    fn expand_fills_with_default() {
        let mut array: ObjectArray<i32> = ObjectArray::with_default(1, Some(9));
        array.expand(4);
        assert_eq!(array.len(), 4);
        assert_eq!(array.get(3), Some(&9));
    }

    #[test]
    fn sort_places_nulls_last() {
        let mut array =
            ObjectArray::from_values(vec![Some(2), None, Some(1), Some(3), None]);
        let len = array.len();
        array.sort(0, len, 1);
        let collected: Vec<Option<i32>> = array.iter().cloned().collect();
        assert_eq!(collected, vec![Some(1), Some(2), Some(3), None, None]);
    }

    #[test]
    fn value_round_trip() {
        let array = ObjectArray::from_values(vec![
            Some(Value::Long(5)),
            None,
            Some(Value::Text("abc".to_string())),
            Some(Value::Double(2.5)),
        ]);
        let mut buf = Vec::new();
        array.write(&mut buf).unwrap();
        let restored = ObjectArray::<Value>::read(&mut buf.as_slice()).unwrap();
        assert_eq!(array, restored);
    }

    #[test]
    fn distinct_by_first_seen() {
        let array = ObjectArray::from_values(vec![
            Some("b".to_string()),
            Some("a".to_string()),
            Some("b".to_string()),
            None,
        ]);
        assert_eq!(array.distinct(10), vec!["b".to_string(), "a".to_string()]);
    }
}
