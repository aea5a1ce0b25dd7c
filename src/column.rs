use crate::array::{
    Array, ArrayIoError, BooleanArray, DateArray, DateTimeArray, DoubleArray, EnumArray, IntArray,
    LongArray, ObjectArray, PackedUtf16Array, PackedUtf8Array, TimeArray, TypeError, ZonedArray,
};
use crate::coding::{DateCoding, DateTimeCoding, TableCoding, TimeCoding};
use crate::datatypes::DataType;
use crate::value::Value;
use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

/// A single typed column: the closed set of dense array variants behind one
/// uniform contract.
#[derive(Clone, PartialEq)]
pub enum Column {
    Boolean(BooleanArray),
    Int(IntArray),
    Long(LongArray),
    Double(DoubleArray),
    Utf8(PackedUtf8Array),
    Utf16(PackedUtf16Array),
    Enum(EnumArray),
    Date(DateArray),
    DateTime(DateTimeArray),
    Time(TimeArray),
    Zoned(ZonedArray),
    Object(ObjectArray<Value>),
}

/// Delegates an expression to the concrete array held by a column.
macro_rules! for_each_variant {
    ($self:expr, $array:ident => $body:expr) => {
        match $self {
            Column::Boolean($array) => $body,
            Column::Int($array) => $body,
            Column::Long($array) => $body,
            Column::Double($array) => $body,
            Column::Utf8($array) => $body,
            Column::Utf16($array) => $body,
            Column::Enum($array) => $body,
            Column::Date($array) => $body,
            Column::DateTime($array) => $body,
            Column::Time($array) => $body,
            Column::Zoned($array) => $body,
            Column::Object($array) => $body,
        }
    };
}

/// Delegates an expression and wraps the result back into the same variant.
macro_rules! map_variant {
    ($self:expr, $array:ident => $body:expr) => {
        match $self {
            Column::Boolean($array) => Column::Boolean($body),
            Column::Int($array) => Column::Int($body),
            Column::Long($array) => Column::Long($body),
            Column::Double($array) => Column::Double($body),
            Column::Utf8($array) => Column::Utf8($body),
            Column::Utf16($array) => Column::Utf16($body),
            Column::Enum($array) => Column::Enum($body),
            Column::Date($array) => Column::Date($body),
            Column::DateTime($array) => Column::DateTime($body),
            Column::Time($array) => Column::Time($body),
            Column::Zoned($array) => Column::Zoned($body),
            Column::Object($array) => Column::Object($body),
        }
    };
}

impl Column {
    /// Creates a column of `len` default-valued elements for the given type.
    ///
    /// Packed text columns start with an eight-unit stride; enum columns
    /// need a coding and are built through [`coded_enum`](Self::coded_enum)
    /// or [`ArrayBuilder`](crate::ArrayBuilder).
    ///
    /// # Panics
    ///
    /// Panics for `DataType::Enum`.
    #[must_use]
    pub fn of(data_type: DataType, len: usize) -> Self {
        match data_type {
            DataType::Boolean => Self::Boolean(BooleanArray::new(len)),
            DataType::Int => Self::Int(IntArray::new(len)),
            DataType::Long => Self::Long(LongArray::new(len)),
            DataType::Double => Self::Double(DoubleArray::new(len)),
            DataType::Utf8 => Self::Utf8(PackedUtf8Array::new(len, 8)),
            DataType::Utf16 => Self::Utf16(PackedUtf16Array::new(len, 8)),
            DataType::Enum => {
                panic!("unsupported operation: enum columns require a coding")
            }
            DataType::Date => Self::Date(DateArray::new(len, Arc::new(DateCoding))),
            DataType::DateTime => {
                Self::DateTime(DateTimeArray::new(len, Arc::new(DateTimeCoding)))
            }
            DataType::Time => Self::Time(TimeArray::new(len, Arc::new(TimeCoding))),
            DataType::Zoned => Self::Zoned(ZonedArray::new(len)),
            DataType::Object => Self::Object(ObjectArray::new(len)),
        }
    }

    /// Creates a label column coded against the given lookup table.
    #[must_use]
    pub fn coded_enum(len: usize, coding: Arc<TableCoding<String>>) -> Self {
        Self::Enum(EnumArray::new(len, coding))
    }

    #[must_use]
    pub fn data_type(&self) -> DataType {
        for_each_variant!(self, array => array.data_type())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        for_each_variant!(self, array => array.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[must_use]
    pub fn is_null(&self, index: usize) -> bool {
        for_each_variant!(self, array => array.is_null(index))
    }

    /// Boxed view of the entry at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[must_use]
    pub fn value(&self, index: usize) -> Option<Value> {
        for_each_variant!(self, array => array.value(index))
    }

    /// Stores a boxed value; `None` stores the column's default.
    ///
    /// # Errors
    ///
    /// Returns an error if the value's variant does not match the column
    /// type.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn set_value(&mut self, index: usize, value: Option<Value>) -> Result<(), TypeError> {
        match (self, value) {
            (Self::Boolean(array), Some(Value::Bool(v))) => array.set(index, v),
            (Self::Boolean(array), None) => array.set_option(index, None),
            (Self::Int(array), Some(Value::Int(v))) => array.set(index, v),
            (Self::Int(array), None) => array.set_option(index, None),
            (Self::Long(array), Some(Value::Long(v))) => array.set(index, v),
            (Self::Long(array), None) => array.set_option(index, None),
            (Self::Double(array), Some(Value::Double(v))) => array.set(index, v),
            (Self::Double(array), None) => array.set_option(index, None),
            (Self::Utf8(array), Some(Value::Text(v))) => array.set(index, Some(v.as_str())),
            (Self::Utf8(array), None) => array.set(index, None),
            (Self::Utf16(array), Some(Value::Text(v))) => array.set(index, Some(v.as_str())),
            (Self::Utf16(array), None) => array.set(index, None),
            (Self::Enum(array), Some(Value::Text(v))) => array.set(index, Some(v)),
            (Self::Enum(array), None) => array.set(index, None),
            (Self::Date(array), Some(Value::Date(v))) => array.set(index, Some(v)),
            (Self::Date(array), None) => array.set(index, None),
            (Self::DateTime(array), Some(Value::DateTime(v))) => array.set(index, Some(v)),
            (Self::DateTime(array), None) => array.set(index, None),
            (Self::Time(array), Some(Value::Time(v))) => array.set(index, Some(v)),
            (Self::Time(array), None) => array.set(index, None),
            (Self::Zoned(array), Some(Value::Zoned(v))) => array.set(index, Some(v)),
            (Self::Zoned(array), None) => array.set(index, None),
            (Self::Object(array), value) => array.set(index, value),
            _ => return Err(TypeError),
        }
        Ok(())
    }

    /// Bulk overwrite of `[start, end)`; `None` writes the column's default.
    ///
    /// # Errors
    ///
    /// Returns an error if the value's variant does not match the column
    /// type.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    pub fn fill(
        &mut self,
        value: Option<&Value>,
        start: usize,
        end: usize,
    ) -> Result<(), TypeError> {
        match (self, value) {
            (Self::Boolean(array), Some(Value::Bool(v))) => array.fill(Some(*v), start, end),
            (Self::Boolean(array), None) => array.fill(None, start, end),
            (Self::Int(array), Some(Value::Int(v))) => array.fill(Some(*v), start, end),
            (Self::Int(array), None) => array.fill(None, start, end),
            (Self::Long(array), Some(Value::Long(v))) => array.fill(Some(*v), start, end),
            (Self::Long(array), None) => array.fill(None, start, end),
            (Self::Double(array), Some(Value::Double(v))) => array.fill(Some(*v), start, end),
            (Self::Double(array), None) => array.fill(None, start, end),
            (Self::Utf8(array), Some(Value::Text(v))) => array.fill(Some(v.as_str()), start, end),
            (Self::Utf8(array), None) => array.fill(None, start, end),
            (Self::Utf16(array), Some(Value::Text(v))) => {
                array.fill(Some(v.as_str()), start, end);
            }
            (Self::Utf16(array), None) => array.fill(None, start, end),
            (Self::Enum(array), Some(Value::Text(v))) => array.fill(Some(v), start, end),
            (Self::Enum(array), None) => array.fill(None, start, end),
            (Self::Date(array), Some(Value::Date(v))) => array.fill(Some(v), start, end),
            (Self::Date(array), None) => array.fill(None, start, end),
            (Self::DateTime(array), Some(Value::DateTime(v))) => array.fill(Some(v), start, end),
            (Self::DateTime(array), None) => array.fill(None, start, end),
            (Self::Time(array), Some(Value::Time(v))) => array.fill(Some(v), start, end),
            (Self::Time(array), None) => array.fill(None, start, end),
            (Self::Zoned(array), Some(Value::Zoned(v))) => array.fill(Some(*v), start, end),
            (Self::Zoned(array), None) => array.fill(None, start, end),
            (Self::Object(array), value) => array.fill(value, start, end),
            _ => return Err(TypeError),
        }
        Ok(())
    }

    /// Grows to `new_len` elements; never shrinks.
    pub fn expand(&mut self, new_len: usize) {
        for_each_variant!(self, array => array.expand(new_len));
    }

    /// Deep clone, backing buffers included.
    #[must_use]
    pub fn copy(&self) -> Self {
        map_variant!(self, array => array.copy())
    }

    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    #[must_use]
    pub fn copy_range(&self, start: usize, end: usize) -> Self {
        map_variant!(self, array => array.copy_range(start, end))
    }

    /// # Panics
    ///
    /// Panics if any index is out of bounds.
    #[must_use]
    pub fn copy_indexes(&self, indexes: &[usize]) -> Self {
        map_variant!(self, array => array.copy_indexes(indexes))
    }

    /// Copies entries of `from` into this column over explicit index
    /// mappings, expanding the receiver if necessary. When both columns are
    /// the same variant the copy moves raw codes/units/values without a
    /// decode round trip; otherwise each entry goes through the boxed path.
    ///
    /// # Errors
    ///
    /// Returns an error if a boxed entry cannot be stored in this column.
    ///
    /// # Panics
    ///
    /// Panics if the index arrays differ in length or a source index is out
    /// of bounds.
    pub fn update(
        &mut self,
        from: &Self,
        from_indexes: &[usize],
        to_indexes: &[usize],
    ) -> Result<(), TypeError> {
        match (&mut *self, from) {
            (Self::Boolean(to), Self::Boolean(src)) => to.update(src, from_indexes, to_indexes),
            (Self::Int(to), Self::Int(src)) => to.update(src, from_indexes, to_indexes),
            (Self::Long(to), Self::Long(src)) => to.update(src, from_indexes, to_indexes),
            (Self::Double(to), Self::Double(src)) => to.update(src, from_indexes, to_indexes),
            (Self::Utf8(to), Self::Utf8(src)) => to.update(src, from_indexes, to_indexes),
            (Self::Utf16(to), Self::Utf16(src)) => to.update(src, from_indexes, to_indexes),
            (Self::Enum(to), Self::Enum(src)) => to.update(src, from_indexes, to_indexes),
            (Self::Date(to), Self::Date(src)) => to.update(src, from_indexes, to_indexes),
            (Self::DateTime(to), Self::DateTime(src)) => to.update(src, from_indexes, to_indexes),
            (Self::Time(to), Self::Time(src)) => to.update(src, from_indexes, to_indexes),
            (Self::Zoned(to), Self::Zoned(src)) => to.update(src, from_indexes, to_indexes),
            (Self::Object(to), Self::Object(src)) => to.update(src, from_indexes, to_indexes),
            (to, src) => {
                crate::array::check_update_indexes(from_indexes, to_indexes);
                if let Some(max_to) = to_indexes.iter().max() {
                    to.expand(max_to + 1);
                }
                for (&fi, &ti) in from_indexes.iter().zip(to_indexes) {
                    to.set_value(ti, src.value(fi))?;
                }
            }
        }
        Ok(())
    }

    /// Sorts `[start, end)` in place; `multiplier` `+1` ascends, `-1`
    /// descends.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    pub fn sort(&mut self, start: usize, end: usize, multiplier: i32) {
        for_each_variant!(self, array => array.sort(start, end, multiplier));
    }

    #[must_use]
    pub fn is_parallel(&self) -> bool {
        for_each_variant!(self, array => array.is_parallel())
    }

    pub fn set_parallel(&mut self, parallel: bool) {
        for_each_variant!(self, array => array.set_parallel(parallel));
    }

    /// The boxed default value new and null-set entries read back as.
    #[must_use]
    pub fn default_value(&self) -> Option<Value> {
        match self {
            Self::Boolean(array) => Some(Value::Bool(array.default_value())),
            Self::Int(array) => Some(Value::Int(array.default_value())),
            Self::Long(array) => Some(Value::Long(array.default_value())),
            Self::Double(array) => {
                let v = array.default_value();
                if v.is_nan() {
                    None
                } else {
                    Some(Value::Double(v))
                }
            }
            Self::Utf8(array) => array.default_value().map(Value::from),
            Self::Utf16(array) => array.default_value().map(Value::from),
            Self::Enum(array) => array.default_value().cloned().map(Value::Text),
            Self::Date(array) => array.default_value().copied().map(Value::Date),
            Self::DateTime(array) => array.default_value().copied().map(Value::DateTime),
            Self::Time(array) => array.default_value().copied().map(Value::Time),
            Self::Zoned(array) => array.default_value().map(Value::Zoned),
            Self::Object(array) => array.default_value().cloned(),
        }
    }

    /// Copies the entries satisfying `predicate` into a new column,
    /// preserving ordinal order.
    #[must_use]
    pub fn filter<P: Fn(Option<&Value>) -> bool>(&self, predicate: P) -> Self {
        let indexes: Vec<usize> = (0..self.len())
            .filter(|&i| predicate(self.value(i).as_ref()))
            .collect();
        self.copy_indexes(&indexes)
    }

    /// Distinct boxed values in first-seen order, stopping at `limit`.
    #[must_use]
    pub fn distinct(&self, limit: usize) -> Vec<Value> {
        match self {
            Self::Boolean(array) => array.distinct(limit).into_iter().map(Value::Bool).collect(),
            Self::Int(array) => array.distinct(limit).into_iter().map(Value::Int).collect(),
            Self::Long(array) => array.distinct(limit).into_iter().map(Value::Long).collect(),
            Self::Double(array) => {
                array.distinct(limit).into_iter().map(Value::Double).collect()
            }
            Self::Utf8(array) => array.distinct(limit).into_iter().map(Value::Text).collect(),
            Self::Utf16(array) => array.distinct(limit).into_iter().map(Value::Text).collect(),
            Self::Enum(array) => array.distinct(limit).into_iter().map(Value::Text).collect(),
            Self::Date(array) => array.distinct(limit).into_iter().map(Value::Date).collect(),
            Self::DateTime(array) => {
                array.distinct(limit).into_iter().map(Value::DateTime).collect()
            }
            Self::Time(array) => array.distinct(limit).into_iter().map(Value::Time).collect(),
            Self::Zoned(array) => array.distinct(limit).into_iter().map(Value::Zoned).collect(),
            Self::Object(array) => array.distinct(limit),
        }
    }

    /// Running sum for numeric columns.
    ///
    /// # Panics
    ///
    /// Panics with an "unsupported operation" message for non-numeric
    /// columns.
    #[must_use]
    pub fn cum_sum(&self) -> Self {
        match self {
            Self::Int(array) => Self::Int(array.cum_sum()),
            Self::Double(array) => Self::Double(array.cum_sum()),
            other => panic!(
                "unsupported operation: cum_sum on {:?} column",
                other.data_type()
            ),
        }
    }

    /// Typed views used by the elementwise apply fast paths.
    #[must_use]
    pub fn as_boolean_mut(&mut self) -> Option<&mut BooleanArray> {
        match self {
            Self::Boolean(array) => Some(array),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int_mut(&mut self) -> Option<&mut IntArray> {
        match self {
            Self::Int(array) => Some(array),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_long_mut(&mut self) -> Option<&mut LongArray> {
        match self {
            Self::Long(array) => Some(array),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_double_mut(&mut self) -> Option<&mut DoubleArray> {
        match self {
            Self::Double(array) => Some(array),
            _ => None,
        }
    }

    /// # Errors
    ///
    /// Returns an error if this is not a `Double` column.
    pub fn get_double(&self, index: usize) -> Result<f64, TypeError> {
        match self {
            Self::Double(array) => Ok(array.get(index)),
            _ => Err(TypeError),
        }
    }

    /// # Errors
    ///
    /// Returns an error if this is not an `Int` column.
    pub fn get_int(&self, index: usize) -> Result<i32, TypeError> {
        match self {
            Self::Int(array) => Ok(array.get(index)),
            _ => Err(TypeError),
        }
    }

    /// # Errors
    ///
    /// Returns an error if this is not a `Long` column.
    pub fn get_long(&self, index: usize) -> Result<i64, TypeError> {
        match self {
            Self::Long(array) => Ok(array.get(index)),
            _ => Err(TypeError),
        }
    }

    /// # Errors
    ///
    /// Returns an error if this is not a `Utf8` column.
    pub fn get_str(&self, index: usize) -> Result<Option<&str>, TypeError> {
        match self {
            Self::Utf8(array) => Ok(array.get_str(index)),
            _ => Err(TypeError),
        }
    }

    fn type_tag(&self) -> u8 {
        match self {
            Self::Boolean(_) => 0,
            Self::Int(_) => 1,
            Self::Long(_) => 2,
            Self::Double(_) => 3,
            Self::Utf8(_) => 4,
            Self::Utf16(_) => 5,
            Self::Enum(_) => 6,
            Self::Date(_) => 7,
            Self::DateTime(_) => 8,
            Self::Time(_) => 9,
            Self::Zoned(_) => 10,
            Self::Object(_) => 11,
        }
    }

    /// Writes a type tag, then the concrete array's own header and flat
    /// element dump.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `writer` fails.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), ArrayIoError> {
        writer.write_all(&[self.type_tag()])?;
        for_each_variant!(self, array => array.write(writer))
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
        writer.write_all(&[self.type_tag()])?;
        for_each_variant!(self, array => array.write_indexes(writer, indexes))
    }

    /// Reads back a column written by [`write`](Self::write), dispatching on
    /// the leading type tag.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is truncated or carries an unknown
    /// tag.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, ArrayIoError> {
        let mut tag = [0_u8; 1];
        reader.read_exact(&mut tag)?;
        Ok(match tag[0] {
            0 => Self::Boolean(BooleanArray::read(reader)?),
            1 => Self::Int(IntArray::read(reader)?),
            2 => Self::Long(LongArray::read(reader)?),
            3 => Self::Double(DoubleArray::read(reader)?),
            4 => Self::Utf8(PackedUtf8Array::read(reader)?),
            5 => Self::Utf16(PackedUtf16Array::read(reader)?),
            6 => Self::Enum(EnumArray::read(reader)?),
            7 => Self::Date(DateArray::read(reader)?),
            8 => Self::DateTime(DateTimeArray::read(reader)?),
            9 => Self::Time(TimeArray::read(reader)?),
            10 => Self::Zoned(ZonedArray::read(reader)?),
            11 => Self::Object(ObjectArray::read(reader)?),
            other => return Err(ArrayIoError::UnknownTag(other)),
        })
    }
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for_each_variant!(self, array => fmt::Debug::fmt(array, f))
    }
}

impl From<Vec<bool>> for Column {
    fn from(values: Vec<bool>) -> Self {
        Self::Boolean(BooleanArray::from_vec(values))
    }
}

impl From<Vec<i32>> for Column {
    fn from(values: Vec<i32>) -> Self {
        Self::Int(IntArray::from_vec(values))
    }
}

impl From<Vec<i64>> for Column {
    fn from(values: Vec<i64>) -> Self {
        Self::Long(LongArray::from_vec(values))
    }
}

impl From<Vec<f64>> for Column {
    fn from(values: Vec<f64>) -> Self {
        Self::Double(DoubleArray::from_vec(values))
    }
}

impl From<Vec<&str>> for Column {
    fn from(values: Vec<&str>) -> Self {
        let mut array = PackedUtf8Array::new(values.len(), 8);
        for (i, v) in values.iter().enumerate() {
            array.set(i, Some(v));
        }
        Self::Utf8(array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_dispatches_by_type() {
        for (data_type, len) in [
            (DataType::Boolean, 3),
            (DataType::Int, 3),
            (DataType::Long, 0),
            (DataType::Double, 2),
            (DataType::Utf8, 4),
            (DataType::Utf16, 4),
            (DataType::Date, 1),
            (DataType::DateTime, 1),
            (DataType::Time, 1),
            (DataType::Zoned, 2),
            (DataType::Object, 2),
        ] {
            let column = Column::of(data_type, len);
            assert_eq!(column.data_type(), data_type);
            assert_eq!(column.len(), len);
        }
    }

    #[test]
    #[should_panic(expected = "unsupported operation")]
    fn enum_factory_needs_a_coding() {
        let _ = Column::of(DataType::Enum, 1);
    }

    #[test]
    fn boxed_round_trip() {
        let mut column = Column::of(DataType::Long, 2);
        column.set_value(0, Some(Value::Long(42))).unwrap();
        assert_eq!(column.value(0), Some(Value::Long(42)));
        assert_eq!(column.value(1), Some(Value::Long(0)));
        assert_eq!(
            column.set_value(1, Some(Value::Text("no".into()))),
            Err(TypeError)
        );
    }

    #[test]
    fn cross_type_update_goes_through_values() {
        let source = Column::Object(ObjectArray::from_values(vec![
            Some(Value::Long(7)),
            Some(Value::Long(8)),
        ]));
        let mut target = Column::of(DataType::Long, 1);
        target.update(&source, &[1, 0], &[0, 1]).unwrap();
        assert_eq!(target.value(0), Some(Value::Long(8)));
        assert_eq!(target.value(1), Some(Value::Long(7)));
    }

    #[test]
    fn same_type_update_is_equivalent_to_boxed_path() {
        let source = Column::from(vec![3_i64, 1, 4]);
        let mut fast = Column::of(DataType::Long, 3);
        fast.update(&source, &[0, 1, 2], &[2, 1, 0]).unwrap();

        let mut slow = Column::of(DataType::Long, 3);
        for (fi, ti) in [(0_usize, 2_usize), (1, 1), (2, 0)] {
            slow.set_value(ti, source.value(fi)).unwrap();
        }
        assert_eq!(fast, slow);
    }

    #[test]
    #[should_panic(expected = "unsupported operation")]
    fn cum_sum_rejects_text() {
        let column = Column::from(vec!["a", "b"]);
        let _ = column.cum_sum();
    }

    #[test]
    fn column_serialization_round_trip() {
        let mut column = Column::of(DataType::Utf8, 3);
        column.set_value(0, Some(Value::Text("alpha".into()))).unwrap();
        let mut buf = Vec::new();
        column.write(&mut buf).unwrap();
        let restored = Column::read(&mut buf.as_slice()).unwrap();
        assert_eq!(column, restored);
    }

    #[test]
    fn distinct_boxes_values() {
        let column = Column::from(vec![2_i32, 2, 5]);
        assert_eq!(column.distinct(10), vec![Value::Int(2), Value::Int(5)]);
    }

    #[test]
    fn filter_keeps_ordinal_order() {
        let column = Column::from(vec![5_i64, 2, 9, 4]);
        let filtered = column.filter(|v| matches!(v, Some(Value::Long(x)) if *x > 3));
        assert_eq!(filtered.len(), 3);
        assert_eq!(filtered.value(0), Some(Value::Long(5)));
        assert_eq!(filtered.value(1), Some(Value::Long(9)));
        assert_eq!(filtered.value(2), Some(Value::Long(4)));
    }
}
