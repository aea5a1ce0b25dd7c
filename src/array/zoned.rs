use super::{check_index, check_range, check_update_indexes, read_len, write_len};
use super::{Array, ArrayIoError};
use crate::datatypes::{DataType, NativeType};
use crate::sort::{self, SharedPtr, SortTarget};
use crate::value::Value;
use ahash::{AHashMap, AHashSet};
use chrono::{DateTime, TimeZone};
use chrono_tz::Tz;
use std::cmp::Ordering;
use std::fmt;
use std::io::{Read, Write};
use std::sync::LazyLock;

/// Millis sentinel for an absent entry.
const NULL_MILLIS: i64 = i64::MIN;

/// Zone-id intern table, built once over every zone the embedded tz database
/// knows, sorted by name so codes are deterministic.
struct ZoneTable {
    zones: Vec<Tz>,
    codes: AHashMap<&'static str, u16>,
}

static ZONE_TABLE: LazyLock<ZoneTable> = LazyLock::new(|| {
    let mut zones: Vec<Tz> = chrono_tz::TZ_VARIANTS.to_vec();
    zones.sort_by_key(|tz| tz.name());
    let codes = zones
        .iter()
        .enumerate()
        .map(|(i, tz)| (tz.name(), u16::try_from(i).expect("tz database fits u16")))
        .collect();
    ZoneTable { zones, codes }
});

fn zone_code(tz: Tz) -> u16 {
    *ZONE_TABLE
        .codes
        .get(tz.name())
        .unwrap_or_else(|| panic!("invalid coding: unknown zone id {}", tz.name()))
}

fn zone_of(code: u16) -> Tz {
    *ZONE_TABLE
        .zones
        .get(usize::from(code))
        .unwrap_or_else(|| panic!("invalid coding: zone code {code} out of range"))
}

/// Dense zoned date-times: a `Vec<i64>` of epoch-millis plus a parallel
/// `Vec<u16>` of interned zone codes, so no per-element heap allocation while
/// zone-specific semantics survive. Two entries are equal only when both
/// their instant and their zone code match.
pub struct ZonedArray {
    millis: Vec<i64>,
    zones: Vec<u16>,
    default: Option<DateTime<Tz>>,
    default_millis: i64,
    default_zone: u16,
    parallel: bool,
}

impl ZonedArray {
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self::with_default(len, None)
    }

    #[must_use]
    pub fn with_default(len: usize, default: Option<DateTime<Tz>>) -> Self {
        let (default_millis, default_zone) = match &default {
            Some(dt) => (dt.timestamp_millis(), zone_code(dt.timezone())),
            None => (NULL_MILLIS, 0),
        };
        Self {
            millis: vec![default_millis; len],
            zones: vec![default_zone; len],
            default,
            default_millis,
            default_zone,
            parallel: false,
        }
    }

    #[must_use]
    pub fn default_value(&self) -> Option<DateTime<Tz>> {
        self.default
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.millis.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.millis.is_empty()
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

    /// Raw epoch-millis at `index`; the null sentinel is `i64::MIN`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[must_use]
    pub fn millis(&self, index: usize) -> i64 {
        check_index(index, self.millis.len());
        self.millis[index]
    }

    /// Raw interned zone code at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[must_use]
    pub fn zone(&self, index: usize) -> u16 {
        check_index(index, self.zones.len());
        self.zones[index]
    }

    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<DateTime<Tz>> {
        check_index(index, self.millis.len());
        let millis = self.millis[index];
        if millis == NULL_MILLIS {
            return None;
        }
        let zone = zone_of(self.zones[index]);
        let utc = DateTime::from_timestamp_millis(millis)
            .unwrap_or_else(|| panic!("invalid coding: epoch milli {millis} out of range"));
        Some(zone.from_utc_datetime(&utc.naive_utc()))
    }

    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn set(&mut self, index: usize, value: Option<DateTime<Tz>>) {
        check_index(index, self.millis.len());
        match value {
            Some(dt) => {
                self.millis[index] = dt.timestamp_millis();
                self.zones[index] = zone_code(dt.timezone());
            }
            None => {
                self.millis[index] = self.default_millis;
                self.zones[index] = self.default_zone;
            }
        }
    }

    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    pub fn fill(&mut self, value: Option<DateTime<Tz>>, start: usize, end: usize) {
        check_range(start, end, self.millis.len());
        let (millis, zone) = match value {
            Some(dt) => (dt.timestamp_millis(), zone_code(dt.timezone())),
            None => (self.default_millis, self.default_zone),
        };
        self.millis[start..end].iter_mut().for_each(|m| *m = millis);
        self.zones[start..end].iter_mut().for_each(|z| *z = zone);
    }

    /// Grows to exactly `new_len`, new slots holding the default. Never
    /// shrinks.
    pub fn expand(&mut self, new_len: usize) {
        if new_len > self.millis.len() {
            self.millis.resize(new_len, self.default_millis);
            self.zones.resize(new_len, self.default_zone);
        }
    }

    #[must_use]
    pub fn copy(&self) -> Self {
        Self {
            millis: self.millis.clone(),
            zones: self.zones.clone(),
            default: self.default,
            default_millis: self.default_millis,
            default_zone: self.default_zone,
            parallel: self.parallel,
        }
    }

    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    #[must_use]
    pub fn copy_range(&self, start: usize, end: usize) -> Self {
        check_range(start, end, self.millis.len());
        Self {
            millis: self.millis[start..end].to_vec(),
            zones: self.zones[start..end].to_vec(),
            default: self.default,
            default_millis: self.default_millis,
            default_zone: self.default_zone,
            parallel: self.parallel,
        }
    }

    /// # Panics
    ///
    /// Panics if any index is out of bounds.
    #[must_use]
    pub fn copy_indexes(&self, indexes: &[usize]) -> Self {
        let millis = indexes.iter().map(|&i| self.millis(i)).collect();
        let zones = indexes.iter().map(|&i| self.zones[i]).collect();
        Self {
            millis,
            zones,
            default: self.default,
            default_millis: self.default_millis,
            default_zone: self.default_zone,
            parallel: self.parallel,
        }
    }

    /// Same-type bulk copy; millis and zone codes move raw.
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
            check_index(fi, from.millis.len());
            self.millis[ti] = from.millis[fi];
            self.zones[ti] = from.zones[fi];
        }
    }

    /// # Panics
    ///
    /// Panics if the source range is out of bounds.
    pub fn update_range(&mut self, to_index: usize, from: &Self, from_index: usize, length: usize) {
        check_range(from_index, from_index + length, from.millis.len());
        self.expand(to_index + length);
        self.millis[to_index..to_index + length]
            .copy_from_slice(&from.millis[from_index..from_index + length]);
        self.zones[to_index..to_index + length]
            .copy_from_slice(&from.zones[from_index..from_index + length]);
    }

    /// Sorts `[start, end)` by instant; zone codes travel with their millis.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    pub fn sort(&mut self, start: usize, end: usize, multiplier: i32) {
        check_range(start, end, self.millis.len());
        let parallel = self.parallel;
        let target = ZonedTarget {
            millis: SharedPtr::new(self.millis.as_mut_ptr()),
            zones: SharedPtr::new(self.zones.as_mut_ptr()),
            len: self.millis.len(),
            multiplier,
        };
        sort::sort(&target, start, end, parallel);
    }

    /// Distinct (instant, zone) pairs in first-seen order, stopping at
    /// `limit`. Absent entries are skipped.
    #[must_use]
    pub fn distinct(&self, limit: usize) -> Vec<DateTime<Tz>> {
        let mut seen = AHashSet::new();
        let mut out = Vec::new();
        for index in 0..self.millis.len() {
            if self.millis[index] == NULL_MILLIS {
                continue;
            }
            if seen.insert((self.millis[index], self.zones[index])) {
                out.push(self.get(index).expect("non-null entry"));
                if out.len() >= limit {
                    break;
                }
            }
        }
        out
    }

    /// Writes element count, default, then the millis dump followed by the
    /// zone-code dump. Zone codes are positions in the deterministic
    /// sorted-by-name table, so round trips stay faithful within this
    /// implementation.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `writer` fails.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), ArrayIoError> {
        write_len(writer, self.millis.len())?;
        self.default_millis.write_le(writer)?;
        writer.write_all(&self.default_zone.to_le_bytes())?;
        for &m in &self.millis {
            m.write_le(writer)?;
        }
        for &z in &self.zones {
            writer.write_all(&z.to_le_bytes())?;
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
        self.default_millis.write_le(writer)?;
        writer.write_all(&self.default_zone.to_le_bytes())?;
        for &i in indexes {
            self.millis(i).write_le(writer)?;
        }
        for &i in indexes {
            writer.write_all(&self.zone(i).to_le_bytes())?;
        }
        Ok(())
    }

    /// Reads back an array written by [`write`](Self::write).
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is truncated or a zone code is outside
    /// the table.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, ArrayIoError> {
        let len = read_len(reader)?;
        let default_millis = i64::read_le(reader)?;
        let default_zone = read_zone_code(reader)?;
        let mut millis = Vec::with_capacity(len);
        for _ in 0..len {
            millis.push(i64::read_le(reader)?);
        }
        let mut zones = Vec::with_capacity(len);
        for _ in 0..len {
            zones.push(read_zone_code(reader)?);
        }
        let default = if default_millis == NULL_MILLIS {
            None
        } else {
            let utc = DateTime::from_timestamp_millis(default_millis).ok_or_else(|| {
                ArrayIoError::Corrupt(format!("epoch milli {default_millis} out of range"))
            })?;
            Some(zone_of(default_zone).from_utc_datetime(&utc.naive_utc()))
        };
        Ok(Self {
            millis,
            zones,
            default,
            default_millis,
            default_zone,
            parallel: false,
        })
    }
}

fn read_zone_code<R: Read>(reader: &mut R) -> Result<u16, ArrayIoError> {
    let mut buf = [0_u8; 2];
    reader.read_exact(&mut buf)?;
    let code = u16::from_le_bytes(buf);
    if usize::from(code) >= ZONE_TABLE.zones.len() {
        return Err(ArrayIoError::Corrupt(format!("zone code {code} out of range")));
    }
    Ok(code)
}

struct ZonedTarget {
    millis: SharedPtr<i64>,
    zones: SharedPtr<u16>,
    len: usize,
    multiplier: i32,
}

impl SortTarget for ZonedTarget {
    fn compare(&self, a: usize, b: usize) -> Ordering {
        check_index(a, self.len);
        check_index(b, self.len);
        // Safety: bounds checked above; the vecs outlive the target.
        let (x, y) = unsafe { (*self.millis.get().add(a), *self.millis.get().add(b)) };
        let ordering = x.cmp(&y);
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
        // Safety: bounds checked, `a != b`, disjoint ranges across callers.
        unsafe {
            std::ptr::swap(self.millis.get().add(a), self.millis.get().add(b));
            std::ptr::swap(self.zones.get().add(a), self.zones.get().add(b));
        }
    }
}

impl Array for ZonedArray {
    fn data_type(&self) -> DataType {
        DataType::Zoned
    }

    fn len(&self) -> usize {
        self.millis.len()
    }

    fn is_null(&self, index: usize) -> bool {
        self.millis(index) == NULL_MILLIS
    }

    fn value(&self, index: usize) -> Option<Value> {
        self.get(index).map(Value::Zoned)
    }
}

impl Clone for ZonedArray {
    fn clone(&self) -> Self {
        self.copy()
    }
}

impl PartialEq for ZonedArray {
    fn eq(&self, other: &Self) -> bool {
        self.millis == other.millis && self.zones == other.zones
    }
}

impl fmt::Debug for ZonedArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ZonedArray")?;
        f.debug_list()
            .entries((0..self.millis.len()).map(|i| self.get(i)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn seoul_noon() -> DateTime<Tz> {
        chrono_tz::Asia::Seoul
            .with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
            .unwrap()
    }

    #[test]
    fn round_trip_preserves_zone() {
        let mut array = ZonedArray::new(2);
        array.set(0, Some(seoul_noon()));
        assert_eq!(array.get(0), Some(seoul_noon()));
        assert!(array.is_null(1));

        let mut buf = Vec::new();
        array.write(&mut buf).unwrap();
        let restored = ZonedArray::read(&mut buf.as_slice()).unwrap();
        assert_eq!(array, restored);
        assert_eq!(restored.get(0).map(|dt| dt.timezone()), Some(chrono_tz::Asia::Seoul));
    }

    #[test]
    fn equality_requires_matching_zone_code() {
        let mut in_seoul = ZonedArray::new(1);
        in_seoul.set(0, Some(seoul_noon()));
        let mut in_utc = ZonedArray::new(1);
        in_utc.set(0, Some(seoul_noon().with_timezone(&chrono_tz::UTC)));
        assert_eq!(in_seoul.millis(0), in_utc.millis(0));
        assert_ne!(in_seoul, in_utc);
    }

    #[test]
    fn sort_orders_by_instant() {
        let mut array = ZonedArray::new(3);
        array.set(0, Some(seoul_noon()));
        array.set(1, Some(seoul_noon() - chrono::Duration::hours(1)));
        array.set(2, Some(seoul_noon() - chrono::Duration::hours(2)));
        array.sort(0, 3, 1);
        assert!(array.millis(0) < array.millis(1));
        assert!(array.millis(1) < array.millis(2));
    }

    #[test]
    fn update_moves_raw_pairs() {
        let mut source = ZonedArray::new(2);
        source.set(1, Some(seoul_noon()));
        let mut target = ZonedArray::new(1);
        target.update(&source, &[1], &[3]);
        assert_eq!(target.len(), 4);
        assert_eq!(target.get(3), Some(seoul_noon()));
        assert!(target.is_null(0));
    }
}
