//! Bidirectional mappings between bounded-cardinality value domains and
//! compact integer codes.

use crate::datatypes::DataType;
use ahash::AHashMap;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use itertools::Itertools;
use std::fmt::Debug;
use std::hash::Hash;
use std::io::{self, Read, Write};
use strum::IntoEnumIterator;

/// Registry tag persisted ahead of a coded array's code buffer, so a
/// deserialized array is self-describing within this closed set.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CodingTag {
    Table,
    Date,
    DateTime,
    Time,
}

impl CodingTag {
    #[must_use]
    pub fn to_byte(self) -> u8 {
        match self {
            Self::Table => 0,
            Self::Date => 1,
            Self::DateTime => 2,
            Self::Time => 3,
        }
    }

    #[must_use]
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Table),
            1 => Some(Self::Date),
            2 => Some(Self::DateTime),
            3 => Some(Self::Time),
            _ => None,
        }
    }
}

/// A stateless bidirectional map between a value domain and `i32` codes.
///
/// `encode(None)` must return the coding's null sentinel and
/// `decode(null_code())` must return `None`; both directions are total over
/// the declared domain and panic on values/codes outside it.
pub trait IntCoding<T>: Send + Sync + 'static {
    fn encode(&self, value: Option<&T>) -> i32;

    fn decode(&self, code: i32) -> Option<T>;

    fn null_code(&self) -> i32;

    fn tag(&self) -> CodingTag;

    /// The element type a dense array coded by this strategy reports.
    fn data_type(&self) -> DataType;
}

/// A stateless bidirectional map between a value domain and `i64` codes.
pub trait LongCoding<T>: Send + Sync + 'static {
    fn encode(&self, value: Option<&T>) -> i64;

    fn decode(&self, code: i64) -> Option<T>;

    fn null_code(&self) -> i64;

    fn tag(&self) -> CodingTag;

    /// The element type a dense array coded by this strategy reports.
    fn data_type(&self) -> DataType;
}

/// Index-into-sorted-lookup-table coding for enumerable domains such as enum
/// constants, currency codes, and time-zone ids. Codes are assigned by sorted
/// natural order, starting at zero; null encodes to `-1`.
#[derive(Clone, Debug)]
pub struct TableCoding<T> {
    values: Vec<T>,
    codes: AHashMap<T, i32>,
}

impl<T> TableCoding<T>
where
    T: Clone + Debug + Eq + Hash + Ord + Send + Sync + 'static,
{
    /// Builds a coding over the given domain, deduplicated and sorted by
    /// natural order.
    ///
    /// # Panics
    ///
    /// Panics if the domain holds more than `i32::MAX` distinct values.
    pub fn of<I: IntoIterator<Item = T>>(domain: I) -> Self {
        let values: Vec<T> = domain.into_iter().sorted().dedup().collect();
        assert!(
            i32::try_from(values.len()).is_ok(),
            "invalid coding: domain exceeds i32 code space"
        );
        let codes = values
            .iter()
            .enumerate()
            .map(|(i, v)| (v.clone(), i32::try_from(i).expect("bounded above")))
            .collect();
        Self { values, codes }
    }

    /// Builds a coding over all variants of an enumerable type, ordered by
    /// the type's natural (declaration) order.
    pub fn of_enum() -> Self
    where
        T: IntoEnumIterator,
    {
        Self::of(T::iter())
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
    pub fn values(&self) -> &[T] {
        &self.values
    }
}

impl TableCoding<String> {
    /// A coding over every time-zone id known to the embedded tz database.
    #[must_use]
    pub fn of_zone_ids() -> Self {
        Self::of(chrono_tz::TZ_VARIANTS.iter().map(|tz| tz.name().to_string()))
    }

    /// Persists the lookup table; the sorted order is the table order, so
    /// codes survive a round trip unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `writer` fails.
    pub fn write_table<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&(self.values.len() as u64).to_le_bytes())?;
        for value in &self.values {
            writer.write_all(&(value.len() as u64).to_le_bytes())?;
            writer.write_all(value.as_bytes())?;
        }
        Ok(())
    }

    /// Reads back a table written by [`write_table`](Self::write_table).
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is truncated or holds invalid UTF-8.
    pub fn read_table<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut len = [0_u8; 8];
        reader.read_exact(&mut len)?;
        let count = usize::try_from(u64::from_le_bytes(len))
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "table length overflow"))?;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            reader.read_exact(&mut len)?;
            let n = usize::try_from(u64::from_le_bytes(len))
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "entry length overflow"))?;
            let mut buf = vec![0_u8; n];
            reader.read_exact(&mut buf)?;
            let value = String::from_utf8(buf)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            values.push(value);
        }
        Ok(Self::of(values))
    }
}

impl<T> IntCoding<T> for TableCoding<T>
where
    T: Clone + Debug + Eq + Hash + Ord + Send + Sync + 'static,
{
    fn encode(&self, value: Option<&T>) -> i32 {
        match value {
            None => -1,
            Some(v) => *self
                .codes
                .get(v)
                .unwrap_or_else(|| panic!("invalid coding: {v:?} is not in the lookup table")),
        }
    }

    fn decode(&self, code: i32) -> Option<T> {
        if code == -1 {
            return None;
        }
        let index = usize::try_from(code)
            .unwrap_or_else(|_| panic!("invalid coding: code {code} out of range"));
        Some(
            self.values
                .get(index)
                .unwrap_or_else(|| panic!("invalid coding: code {code} out of range"))
                .clone(),
        )
    }

    fn null_code(&self) -> i32 {
        -1
    }

    fn tag(&self) -> CodingTag {
        CodingTag::Table
    }

    fn data_type(&self) -> DataType {
        DataType::Enum
    }
}

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid date")
}

/// Epoch-day coding for calendar dates.
#[derive(Clone, Copy, Debug, Default)]
pub struct DateCoding;

impl LongCoding<NaiveDate> for DateCoding {
    fn encode(&self, value: Option<&NaiveDate>) -> i64 {
        match value {
            None => i64::MIN,
            Some(date) => date.signed_duration_since(epoch()).num_days(),
        }
    }

    fn decode(&self, code: i64) -> Option<NaiveDate> {
        if code == i64::MIN {
            return None;
        }
        Some(
            epoch()
                .checked_add_signed(Duration::days(code))
                .unwrap_or_else(|| panic!("invalid coding: epoch day {code} out of range")),
        )
    }

    fn null_code(&self) -> i64 {
        i64::MIN
    }

    fn tag(&self) -> CodingTag {
        CodingTag::Date
    }

    fn data_type(&self) -> DataType {
        DataType::Date
    }
}

/// Epoch-millisecond coding for date-times.
#[derive(Clone, Copy, Debug, Default)]
pub struct DateTimeCoding;

impl LongCoding<NaiveDateTime> for DateTimeCoding {
    fn encode(&self, value: Option<&NaiveDateTime>) -> i64 {
        match value {
            None => i64::MIN,
            Some(dt) => dt.and_utc().timestamp_millis(),
        }
    }

    fn decode(&self, code: i64) -> Option<NaiveDateTime> {
        if code == i64::MIN {
            return None;
        }
        Some(
            DateTime::from_timestamp_millis(code)
                .unwrap_or_else(|| panic!("invalid coding: epoch milli {code} out of range"))
                .naive_utc(),
        )
    }

    fn null_code(&self) -> i64 {
        i64::MIN
    }

    fn tag(&self) -> CodingTag {
        CodingTag::DateTime
    }

    fn data_type(&self) -> DataType {
        DataType::DateTime
    }
}

/// Nanosecond-of-day coding for times.
#[derive(Clone, Copy, Debug, Default)]
pub struct TimeCoding;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

impl LongCoding<NaiveTime> for TimeCoding {
    fn encode(&self, value: Option<&NaiveTime>) -> i64 {
        match value {
            None => -1,
            Some(time) => {
                i64::from(time.num_seconds_from_midnight()) * NANOS_PER_SECOND
                    + i64::from(time.nanosecond())
            }
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn decode(&self, code: i64) -> Option<NaiveTime> {
        if code == -1 {
            return None;
        }
        let seconds = (code / NANOS_PER_SECOND) as u32;
        let nanos = (code % NANOS_PER_SECOND) as u32;
        Some(
            NaiveTime::from_num_seconds_from_midnight_opt(seconds, nanos)
                .unwrap_or_else(|| panic!("invalid coding: nanos of day {code} out of range")),
        )
    }

    fn null_code(&self) -> i64 {
        -1
    }

    fn tag(&self) -> CodingTag {
        CodingTag::Time
    }

    fn data_type(&self) -> DataType {
        DataType::Time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum_macros::EnumIter;

    #[derive(Clone, Copy, Debug, EnumIter, Eq, Hash, Ord, PartialEq, PartialOrd)]
    enum Color {
        Red,
        Green,
        Blue,
    }

    #[test]
    fn enum_coding_by_natural_order() {
        let coding = TableCoding::<Color>::of_enum();
        assert_eq!(coding.encode(Some(&Color::Red)), 0);
        assert_eq!(coding.encode(Some(&Color::Green)), 1);
        assert_eq!(coding.encode(Some(&Color::Blue)), 2);
        let green = coding.encode(Some(&Color::Green));
        assert_eq!(coding.decode(green), Some(Color::Green));
        assert_eq!(coding.encode(None), -1);
        assert_eq!(coding.decode(-1), None);
    }

    #[test]
    fn table_coding_bijection() {
        let coding = TableCoding::of(vec!["USD".to_string(), "EUR".to_string(), "GBP".to_string()]);
        for value in coding.values().to_vec() {
            assert_eq!(coding.decode(coding.encode(Some(&value))), Some(value));
        }
        assert_eq!(coding.decode(coding.encode(None)), None);
    }

    #[test]
    #[should_panic(expected = "invalid coding")]
    fn unknown_value_fails_loudly() {
        let coding = TableCoding::of(vec!["USD".to_string()]);
        coding.encode(Some(&"JPY".to_string()));
    }

    #[test]
    #[should_panic(expected = "invalid coding")]
    fn invalid_code_fails_loudly() {
        let coding = TableCoding::of(vec!["USD".to_string()]);
        coding.decode(7);
    }

    #[test]
    fn date_coding_epoch_days() {
        let coding = DateCoding;
        let date = NaiveDate::from_ymd_opt(1970, 1, 11).unwrap();
        assert_eq!(coding.encode(Some(&date)), 10);
        assert_eq!(coding.decode(10), Some(date));
        assert_eq!(coding.decode(coding.null_code()), None);
    }

    #[test]
    fn time_coding_nanos_of_day() {
        let coding = TimeCoding;
        let time = NaiveTime::from_hms_nano_opt(0, 0, 1, 500).unwrap();
        assert_eq!(coding.encode(Some(&time)), NANOS_PER_SECOND + 500);
        assert_eq!(coding.decode(NANOS_PER_SECOND + 500), Some(time));
    }

    #[test]
    fn zone_id_table_round_trip() {
        let coding = TableCoding::of_zone_ids();
        let code = coding.encode(Some(&"Asia/Seoul".to_string()));
        assert_eq!(coding.decode(code), Some("Asia/Seoul".to_string()));

        let mut buf = Vec::new();
        coding.write_table(&mut buf).unwrap();
        let restored = TableCoding::read_table(&mut buf.as_slice()).unwrap();
        assert_eq!(restored.len(), coding.len());
        assert_eq!(restored.encode(Some(&"Asia/Seoul".to_string())), code);
    }
}
