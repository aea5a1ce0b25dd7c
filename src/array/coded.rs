use super::{check_index, check_range, check_update_indexes, read_len, write_len};
use super::{Array, ArrayIoError};
use crate::coding::{
    CodingTag, DateCoding, DateTimeCoding, IntCoding, LongCoding, TableCoding, TimeCoding,
};
use crate::datatypes::{DataType, NativeType};
use crate::sort::{self, SliceTarget};
use crate::value::Value;
use ahash::AHashSet;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

/// Generates the two coded dense array flavors, which differ only in their
/// code width and coding trait.
macro_rules! coded_array {
    ($(#[$doc:meta])* $name:ident, $code:ty, $coding:ident) => {
        $(#[$doc])*
        pub struct $name<T, C: $coding<T>> {
            codes: Vec<$code>,
            coding: Arc<C>,
            default: Option<T>,
            default_code: $code,
            parallel: bool,
        }

        impl<T, C> $name<T, C>
        where
            T: Clone,
            C: $coding<T>,
        {
            /// Creates an array of `len` elements with a null default.
            #[must_use]
            pub fn new(len: usize, coding: Arc<C>) -> Self {
                Self::with_default(len, coding, None)
            }

            /// Creates an array of `len` elements with a declared default
            /// value, every slot holding the default's code.
            #[must_use]
            pub fn with_default(len: usize, coding: Arc<C>, default: Option<T>) -> Self {
                let default_code = coding.encode(default.as_ref());
                Self {
                    codes: vec![default_code; len],
                    coding,
                    default,
                    default_code,
                    parallel: false,
                }
            }

            #[must_use]
            pub fn coding(&self) -> &Arc<C> {
                &self.coding
            }

            #[must_use]
            pub fn default_value(&self) -> Option<&T> {
                self.default.as_ref()
            }

            #[must_use]
            pub fn len(&self) -> usize {
                self.codes.len()
            }

            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.codes.is_empty()
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

            /// The raw code at `index`, without decoding.
            ///
            /// # Panics
            ///
            /// Panics if `index` is out of bounds.
            #[must_use]
            pub fn code(&self, index: usize) -> $code {
                check_index(index, self.codes.len());
                self.codes[index]
            }

            /// Stores a raw code without an encode round trip. The caller
            /// owns the invariant that the code is valid for this coding.
            ///
            /// # Panics
            ///
            /// Panics if `index` is out of bounds.
            pub fn set_code(&mut self, index: usize, code: $code) {
                check_index(index, self.codes.len());
                self.codes[index] = code;
            }

            #[must_use]
            pub fn codes(&self) -> &[$code] {
                &self.codes
            }

            /// Decoded view of the entry at `index`.
            ///
            /// # Panics
            ///
            /// Panics if `index` is out of bounds or the stored code is
            /// outside the coding's domain.
            #[must_use]
            pub fn get(&self, index: usize) -> Option<T> {
                check_index(index, self.codes.len());
                self.coding.decode(self.codes[index])
            }

            /// Encodes and stores `value`; `None` stores the default's code.
            ///
            /// # Panics
            ///
            /// Panics if `index` is out of bounds or the value is outside
            /// the coding's domain.
            pub fn set(&mut self, index: usize, value: Option<T>) {
                check_index(index, self.codes.len());
                self.codes[index] = match value {
                    Some(v) => self.coding.encode(Some(&v)),
                    None => self.default_code,
                };
            }

            /// # Panics
            ///
            /// Panics if the range is out of bounds.
            pub fn fill(&mut self, value: Option<&T>, start: usize, end: usize) {
                check_range(start, end, self.codes.len());
                let code = match value {
                    Some(v) => self.coding.encode(Some(v)),
                    None => self.default_code,
                };
                for slot in &mut self.codes[start..end] {
                    *slot = code;
                }
            }

            /// Grows to exactly `new_len`, filling new slots with the
            /// default's code. Never shrinks.
            pub fn expand(&mut self, new_len: usize) {
                if new_len > self.codes.len() {
                    self.codes.resize(new_len, self.default_code);
                }
            }

            /// Deep clone; the coding itself is immutable and shared.
            #[must_use]
            pub fn copy(&self) -> Self {
                Self {
                    codes: self.codes.clone(),
                    coding: Arc::clone(&self.coding),
                    default: self.default.clone(),
                    default_code: self.default_code,
                    parallel: self.parallel,
                }
            }

            /// # Panics
            ///
            /// Panics if the range is out of bounds.
            #[must_use]
            pub fn copy_range(&self, start: usize, end: usize) -> Self {
                check_range(start, end, self.codes.len());
                Self {
                    codes: self.codes[start..end].to_vec(),
                    coding: Arc::clone(&self.coding),
                    default: self.default.clone(),
                    default_code: self.default_code,
                    parallel: self.parallel,
                }
            }

            /// # Panics
            ///
            /// Panics if any index is out of bounds.
            #[must_use]
            pub fn copy_indexes(&self, indexes: &[usize]) -> Self {
                let codes = indexes.iter().map(|&i| self.code(i)).collect();
                Self {
                    codes,
                    coding: Arc::clone(&self.coding),
                    default: self.default.clone(),
                    default_code: self.default_code,
                    parallel: self.parallel,
                }
            }

            /// Same-type bulk copy: codes move raw, with no decode/encode
            /// round trip. Expands the receiver if necessary.
            ///
            /// # Panics
            ///
            /// Panics if the source range is out of bounds.
            pub fn update_range(
                &mut self,
                to_index: usize,
                from: &Self,
                from_index: usize,
                length: usize,
            ) {
                check_range(from_index, from_index + length, from.codes.len());
                self.expand(to_index + length);
                self.codes[to_index..to_index + length]
                    .copy_from_slice(&from.codes[from_index..from_index + length]);
            }

            /// Same-type gather copy over explicit index mappings; codes move
            /// raw.
            ///
            /// # Panics
            ///
            /// Panics if the index arrays differ in length or a source index
            /// is out of bounds.
            pub fn update(&mut self, from: &Self, from_indexes: &[usize], to_indexes: &[usize]) {
                check_update_indexes(from_indexes, to_indexes);
                if let Some(max_to) = to_indexes.iter().max() {
                    self.expand(max_to + 1);
                }
                for (&fi, &ti) in from_indexes.iter().zip(to_indexes) {
                    self.codes[ti] = from.code(fi);
                }
            }

            /// Raw ingestion of a pre-coded buffer, e.g. a column that was
            /// persisted as bare codes.
            pub fn update_code_range(&mut self, to_index: usize, codes: &[$code]) {
                self.expand(to_index + codes.len());
                self.codes[to_index..to_index + codes.len()].copy_from_slice(codes);
            }

            /// Sorts `[start, end)` by code order, which matches natural
            /// value order for every built-in coding.
            ///
            /// # Panics
            ///
            /// Panics if the range is out of bounds.
            pub fn sort(&mut self, start: usize, end: usize, multiplier: i32) {
                check_range(start, end, self.codes.len());
                let parallel = self.parallel;
                let target = SliceTarget::new(&mut self.codes, multiplier);
                sort::sort(&target, start, end, parallel);
            }

            /// Distinct decoded values in first-seen order, stopping at
            /// `limit`.
            #[must_use]
            pub fn distinct(&self, limit: usize) -> Vec<T> {
                let mut seen = AHashSet::new();
                let mut out = Vec::new();
                for &code in &self.codes {
                    if code == self.coding.null_code() {
                        continue;
                    }
                    if seen.insert(code.to_key()) {
                        out.push(self.coding.decode(code).expect("invariant: stored codes decode"));
                        if out.len() >= limit {
                            break;
                        }
                    }
                }
                out
            }

            fn write_codes<W: Write>(&self, writer: &mut W) -> Result<(), ArrayIoError> {
                write_len(writer, self.codes.len())?;
                self.default_code.write_le(writer)?;
                for &code in &self.codes {
                    code.write_le(writer)?;
                }
                Ok(())
            }

            fn write_codes_at<W: Write>(
                &self,
                writer: &mut W,
                indexes: &[usize],
            ) -> Result<(), ArrayIoError> {
                write_len(writer, indexes.len())?;
                self.default_code.write_le(writer)?;
                for &i in indexes {
                    self.code(i).write_le(writer)?;
                }
                Ok(())
            }

            fn read_codes<R: Read>(
                reader: &mut R,
                coding: Arc<C>,
            ) -> Result<Self, ArrayIoError> {
                let len = read_len(reader)?;
                let default_code = <$code>::read_le(reader)?;
                let mut codes = Vec::with_capacity(len);
                for _ in 0..len {
                    codes.push(<$code>::read_le(reader)?);
                }
                let default = coding.decode(default_code);
                Ok(Self {
                    codes,
                    coding,
                    default,
                    default_code,
                    parallel: false,
                })
            }
        }

        impl<T, C> Array for $name<T, C>
        where
            T: Clone + Into<Value>,
            C: $coding<T>,
        {
            fn data_type(&self) -> DataType {
                self.coding.data_type()
            }

            fn len(&self) -> usize {
                self.codes.len()
            }

            fn is_null(&self, index: usize) -> bool {
                self.code(index) == self.coding.null_code()
            }

            fn value(&self, index: usize) -> Option<Value> {
                self.get(index).map(Into::into)
            }
        }

        impl<T, C> Clone for $name<T, C>
        where
            T: Clone,
            C: $coding<T>,
        {
            fn clone(&self) -> Self {
                self.copy()
            }
        }

        impl<T, C> PartialEq for $name<T, C>
        where
            C: $coding<T>,
        {
            fn eq(&self, other: &Self) -> bool {
                self.codes == other.codes
            }
        }

        impl<T, C> fmt::Debug for $name<T, C>
        where
            T: Clone + fmt::Debug,
            C: $coding<T>,
        {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "<{:?}>"), self.coding.data_type())?;
                f.debug_list()
                    .entries(self.codes.iter().map(|&c| self.coding.decode(c)))
                    .finish()
            }
        }
    };
}

coded_array!(
    /// A dense array storing `i32` codes for a bounded value domain.
    CodedIntArray,
    i32,
    IntCoding
);

coded_array!(
    /// A dense array storing `i64` codes for a bounded value domain.
    CodedLongArray,
    i64,
    LongCoding
);

/// Label-coded array backed by a sorted lookup table (enum constants,
/// currencies, zone ids).
pub type EnumArray = CodedIntArray<String, TableCoding<String>>;

/// Calendar dates stored as epoch-day codes.
pub type DateArray = CodedLongArray<NaiveDate, DateCoding>;

/// Date-times stored as epoch-millisecond codes.
pub type DateTimeArray = CodedLongArray<NaiveDateTime, DateTimeCoding>;

/// Times of day stored as nanosecond-of-day codes.
pub type TimeArray = CodedLongArray<NaiveTime, TimeCoding>;

impl EnumArray {
    /// Persists the coding (so the stream is self-describing) followed by
    /// the raw code buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `writer` fails.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), ArrayIoError> {
        writer.write_all(&[self.coding.tag().to_byte()])?;
        self.coding.write_table(writer)?;
        self.write_codes(writer)
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
        writer.write_all(&[self.coding.tag().to_byte()])?;
        self.coding.write_table(writer)?;
        self.write_codes_at(writer, indexes)
    }

    /// Reads back an array written by [`write`](Self::write).
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is truncated or carries an unexpected
    /// coding tag.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, ArrayIoError> {
        let mut tag = [0_u8; 1];
        reader.read_exact(&mut tag)?;
        if CodingTag::from_byte(tag[0]) != Some(CodingTag::Table) {
            return Err(ArrayIoError::UnknownCoding(tag[0]));
        }
        let coding = TableCoding::read_table(reader)?;
        Self::read_codes(reader, Arc::new(coding))
    }
}

/// Serialization for the stateless temporal codings: tag byte, then the raw
/// code dump.
macro_rules! stateless_coded_io {
    ($alias:ident, $coding:ident, $tag:path) => {
        impl $alias {
            /// # Errors
            ///
            /// Returns an error if writing to `writer` fails.
            pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), ArrayIoError> {
                writer.write_all(&[self.coding.tag().to_byte()])?;
                self.write_codes(writer)
            }

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
                writer.write_all(&[self.coding.tag().to_byte()])?;
                self.write_codes_at(writer, indexes)
            }

            /// # Errors
            ///
            /// Returns an error if the stream is truncated or carries an
            /// unexpected coding tag.
            pub fn read<R: Read>(reader: &mut R) -> Result<Self, ArrayIoError> {
                let mut tag = [0_u8; 1];
                reader.read_exact(&mut tag)?;
                if CodingTag::from_byte(tag[0]) != Some($tag) {
                    return Err(ArrayIoError::UnknownCoding(tag[0]));
                }
                Self::read_codes(reader, Arc::new($coding))
            }
        }
    };
}

stateless_coded_io!(DateArray, DateCoding, CodingTag::Date);
stateless_coded_io!(DateTimeArray, DateTimeCoding, CodingTag::DateTime);
stateless_coded_io!(TimeArray, TimeCoding, CodingTag::Time);

#[cfg(test)]
mod tests {
    use super::*;

    fn currency_coding() -> Arc<TableCoding<String>> {
        Arc::new(TableCoding::of(
            ["USD", "EUR", "GBP", "JPY"].iter().map(ToString::to_string),
        ))
    }

    #[test]
    fn codes_track_values() {
        let mut array = EnumArray::new(3, currency_coding());
        array.set(0, Some("USD".to_string()));
        array.set(1, Some("EUR".to_string()));
        assert_eq!(array.get(0), Some("USD".to_string()));
        assert_eq!(array.code(0), array.coding().encode(Some(&"USD".to_string())));
        assert!(array.is_null(2));
        assert_eq!(array.get(2), None);
    }

    #[test]
    fn default_value_fills_new_slots() {
        let mut array = EnumArray::with_default(2, currency_coding(), Some("JPY".to_string()));
        assert_eq!(array.get(0), Some("JPY".to_string()));
        // Null set maps to the default, so the entry is not null.
        array.set(0, None);
        assert_eq!(array.get(0), Some("JPY".to_string()));
        assert!(!array.is_null(0));
        array.expand(4);
        assert_eq!(array.get(3), Some("JPY".to_string()));
    }

    #[test]
    fn fast_and_slow_update_paths_agree() {
        let coding = currency_coding();
        let mut source = EnumArray::new(4, Arc::clone(&coding));
        for (i, label) in ["GBP", "USD", "JPY", "EUR"].iter().enumerate() {
            source.set(i, Some((*label).to_string()));
        }

        // Fast path: same concrete type, raw code copy.
        let mut fast = EnumArray::new(4, Arc::clone(&coding));
        fast.update(&source, &[0, 1, 2, 3], &[3, 2, 1, 0]);

        // Slow path: re-encode each decoded value.
        let mut slow = EnumArray::new(4, coding);
        for (fi, ti) in [(0_usize, 3_usize), (1, 2), (2, 1), (3, 0)] {
            slow.set(ti, source.get(fi));
        }

        assert_eq!(fast, slow);
    }

    #[test]
    fn sort_by_code_is_natural_order() {
        let mut array = EnumArray::new(3, currency_coding());
        array.set(0, Some("USD".to_string()));
        array.set(1, Some("EUR".to_string()));
        array.set(2, Some("GBP".to_string()));
        array.sort(0, 3, 1);
        assert_eq!(array.get(0), Some("EUR".to_string()));
        assert_eq!(array.get(1), Some("GBP".to_string()));
        assert_eq!(array.get(2), Some("USD".to_string()));
    }

    #[test]
    fn enum_round_trip_is_self_describing() {
        let mut array = EnumArray::new(3, currency_coding());
        array.set(1, Some("GBP".to_string()));
        let mut buf = Vec::new();
        array.write(&mut buf).unwrap();
        let restored = EnumArray::read(&mut buf.as_slice()).unwrap();
        assert_eq!(array, restored);
        assert_eq!(restored.get(1), Some("GBP".to_string()));
        assert!(restored.is_null(0));
    }

    #[test]
    fn date_array_round_trip() {
        let mut array = DateArray::new(2, Arc::new(DateCoding));
        array.set(0, NaiveDate::from_ymd_opt(2024, 2, 29));
        let mut buf = Vec::new();
        array.write(&mut buf).unwrap();
        let restored = DateArray::read(&mut buf.as_slice()).unwrap();
        assert_eq!(restored.get(0), NaiveDate::from_ymd_opt(2024, 2, 29));
        assert!(restored.is_null(1));
    }

    #[test]
    fn distinct_decodes_each_code_once() {
        let mut array = EnumArray::new(5, currency_coding());
        for (i, label) in ["EUR", "USD", "EUR", "JPY", "USD"].iter().enumerate() {
            array.set(i, Some((*label).to_string()));
        }
        assert_eq!(
            array.distinct(10),
            vec!["EUR".to_string(), "USD".to_string(), "JPY".to_string()]
        );
    }
}
