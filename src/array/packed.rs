use super::{check_index, check_range, check_update_indexes, read_len, write_len};
use super::{Array, ArrayIoError};
use crate::datatypes::DataType;
use crate::sort::{self, SharedPtr, SortTarget};
use crate::value::Value;
use ahash::AHashSet;
use std::cmp::{self, Ordering};
use std::fmt;
use std::io::{Read, Write};
use std::marker::PhantomData;

/// Base per-segment capacity in code units, before rounding down to a stride
/// multiple so no element ever straddles two segments.
const BASE_SEGMENT_UNITS: usize = 1 << 30;

/// Width marker for an absent entry; `0` (the empty string) is a distinct
/// state.
const NULL_WIDTH: i32 = -1;

/// A code unit of one of the two physical text encodings.
pub trait TextUnit: Copy + Default + Ord + Send + Sync + fmt::Debug + 'static {
    const DATA_TYPE: DataType;

    fn encode(text: &str) -> Vec<Self>;

    /// Decodes units produced by [`encode`](Self::encode).
    ///
    /// # Panics
    ///
    /// Panics if the units are not a valid encoding; stored data always is.
    fn decode(units: &[Self]) -> String;

    fn write_le<W: Write>(self, writer: &mut W) -> std::io::Result<()>;

    fn read_le<R: Read>(reader: &mut R) -> std::io::Result<Self>;
}

impl TextUnit for u8 {
    const DATA_TYPE: DataType = DataType::Utf8;

    fn encode(text: &str) -> Vec<Self> {
        text.as_bytes().to_vec()
    }

    fn decode(units: &[Self]) -> String {
        std::str::from_utf8(units)
            .expect("invariant: stored bytes are valid UTF-8")
            .to_string()
    }

    fn write_le<W: Write>(self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&[self])
    }

    fn read_le<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let mut buf = [0_u8; 1];
        reader.read_exact(&mut buf)?;
        Ok(buf[0])
    }
}

impl TextUnit for u16 {
    const DATA_TYPE: DataType = DataType::Utf16;

    fn encode(text: &str) -> Vec<Self> {
        text.encode_utf16().collect()
    }

    fn decode(units: &[Self]) -> String {
        String::from_utf16(units).expect("invariant: stored units are valid UTF-16")
    }

    fn write_le<W: Write>(self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&self.to_le_bytes())
    }

    fn read_le<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let mut buf = [0_u8; 2];
        reader.read_exact(&mut buf)?;
        Ok(Self::from_le_bytes(buf))
    }
}

/// Dense variable-width text storage: one fixed-stride slot per element
/// inside large same-stride segment buffers, addressed by 64-bit offset
/// arithmetic instead of one heap object per string.
pub struct PackedTextArray<U: TextUnit> {
    /// Per-element unit count; `-1` marks an absent entry.
    widths: Vec<i32>,
    segments: Vec<Vec<U>>,
    /// Current per-element stride capacity in code units.
    max_width: usize,
    default: Option<String>,
    parallel: bool,
}

/// UTF-8 encoded packed text.
pub type PackedUtf8Array = PackedTextArray<u8>;

/// UTF-16 encoded packed text.
pub type PackedUtf16Array = PackedTextArray<u16>;

fn segment_capacity(stride: usize) -> usize {
    cmp::max(1, BASE_SEGMENT_UNITS / stride) * stride
}

fn segment_sizes(len: usize, stride: usize) -> Vec<usize> {
    let total = len as u64 * stride as u64;
    let cap = segment_capacity(stride) as u64;
    let mut sizes = Vec::new();
    let mut remaining = total;
    while remaining > 0 {
        let take = cmp::min(cap, remaining);
        sizes.push(usize::try_from(take).expect("segment capacity fits usize"));
        remaining -= take;
    }
    sizes
}

impl<U: TextUnit> PackedTextArray<U> {
    /// Creates an array of `len` null entries with an initial per-element
    /// stride of `width` code units (at least one).
    #[must_use]
    pub fn new(len: usize, width: usize) -> Self {
        Self::with_default(len, width, None)
    }

    /// Creates an array whose absent entries read back as `default`.
    #[must_use]
    pub fn with_default(len: usize, width: usize, default: Option<String>) -> Self {
        let max_width = cmp::max(1, width);
        let segments = segment_sizes(len, max_width)
            .into_iter()
            .map(|size| vec![U::default(); size])
            .collect();
        Self {
            widths: vec![NULL_WIDTH; len],
            segments,
            max_width,
            default,
            parallel: false,
        }
    }

    #[must_use]
    pub fn default_value(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// Current per-element stride capacity in code units.
    #[must_use]
    pub fn max_width(&self) -> usize {
        self.max_width
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.widths.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.widths.is_empty()
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

    fn locate(&self, index: usize) -> (usize, usize) {
        let offset = index as u64 * self.max_width as u64;
        let cap = segment_capacity(self.max_width) as u64;
        (
            usize::try_from(offset / cap).expect("segment ordinal fits usize"),
            usize::try_from(offset % cap).expect("segment offset fits usize"),
        )
    }

    fn units(&self, index: usize) -> Option<&[U]> {
        let width = self.widths[index];
        if width == NULL_WIDTH {
            return None;
        }
        let width = usize::try_from(width).expect("non-negative width");
        let (segment, start) = self.locate(index);
        Some(&self.segments[segment][start..start + width])
    }

    /// Decoded view of the entry at `index`; absent entries read back as the
    /// default value.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<String> {
        check_index(index, self.widths.len());
        match self.units(index) {
            Some(units) => Some(U::decode(units)),
            None => self.default.clone(),
        }
    }

    /// Encodes and stores `value`; `None` restores the absent marker. A
    /// value wider than the current stride triggers a full re-stride of
    /// every segment, the single most expensive mutation path here:
    /// repeated appends of growing strings degrade quadratically unless the
    /// array is pre-sized.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn set(&mut self, index: usize, value: Option<&str>) {
        check_index(index, self.widths.len());
        let Some(value) = value else {
            self.widths[index] = NULL_WIDTH;
            return;
        };
        let units = U::encode(value);
        assert!(
            i32::try_from(units.len()).is_ok(),
            "unsupported operation: element wider than i32::MAX units"
        );
        if units.len() > self.max_width {
            self.resize(units.len());
        }
        let (segment, start) = self.locate(index);
        self.segments[segment][start..start + units.len()].copy_from_slice(&units);
        self.widths[index] = i32::try_from(units.len()).expect("checked above");
    }

    /// Re-strides every segment to `new_width` units per element and copies
    /// each live element to its new offset. O(n * stride).
    fn resize(&mut self, new_width: usize) {
        assert!(
            new_width >= self.max_width,
            "unsupported operation: cannot shrink stride from {} to {new_width}",
            self.max_width
        );
        if new_width == self.max_width {
            return;
        }
        let mut next = Self::with_default(self.widths.len(), new_width, self.default.clone());
        for index in 0..self.widths.len() {
            if let Some(units) = self.units(index) {
                let (segment, start) = next.locate(index);
                next.segments[segment][start..start + units.len()].copy_from_slice(units);
                next.widths[index] = self.widths[index];
            }
        }
        self.segments = next.segments;
        self.max_width = new_width;
    }

    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    pub fn fill(&mut self, value: Option<&str>, start: usize, end: usize) {
        check_range(start, end, self.widths.len());
        for index in start..end {
            self.set(index, value);
        }
    }

    /// Grows to exactly `new_len` elements, new slots absent. Never shrinks.
    pub fn expand(&mut self, new_len: usize) {
        if new_len <= self.widths.len() {
            return;
        }
        self.widths.resize(new_len, NULL_WIDTH);
        let sizes = segment_sizes(new_len, self.max_width);
        for (k, size) in sizes.iter().enumerate() {
            if k == self.segments.len() {
                self.segments.push(Vec::new());
            }
            if self.segments[k].len() < *size {
                self.segments[k].resize(*size, U::default());
            }
        }
    }

    /// Deep clone, segments included.
    #[must_use]
    pub fn copy(&self) -> Self {
        Self {
            widths: self.widths.clone(),
            segments: self.segments.clone(),
            max_width: self.max_width,
            default: self.default.clone(),
            parallel: self.parallel,
        }
    }

    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    #[must_use]
    pub fn copy_range(&self, start: usize, end: usize) -> Self {
        check_range(start, end, self.widths.len());
        let mut out = Self::with_default(end - start, self.max_width, self.default.clone());
        for (to, from) in (start..end).enumerate() {
            if let Some(units) = self.units(from) {
                let (segment, offset) = out.locate(to);
                out.segments[segment][offset..offset + units.len()].copy_from_slice(units);
                out.widths[to] = self.widths[from];
            }
        }
        out
    }

    /// # Panics
    ///
    /// Panics if any index is out of bounds.
    #[must_use]
    pub fn copy_indexes(&self, indexes: &[usize]) -> Self {
        let mut out = Self::with_default(indexes.len(), self.max_width, self.default.clone());
        for (to, &from) in indexes.iter().enumerate() {
            check_index(from, self.widths.len());
            if let Some(units) = self.units(from) {
                let (segment, offset) = out.locate(to);
                out.segments[segment][offset..offset + units.len()].copy_from_slice(units);
                out.widths[to] = self.widths[from];
            }
        }
        out
    }

    /// Same-type bulk copy; raw unit spans move without a `String` round
    /// trip. Expands the receiver if necessary.
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
        if from.max_width > self.max_width {
            self.resize(from.max_width);
        }
        for (&fi, &ti) in from_indexes.iter().zip(to_indexes) {
            check_index(fi, from.widths.len());
            match from.units(fi) {
                Some(units) => {
                    let (segment, start) = self.locate(ti);
                    self.segments[segment][start..start + units.len()].copy_from_slice(units);
                    self.widths[ti] = from.widths[fi];
                }
                // An absent source entry reads as the source's default.
                None => self.set(ti, from.default.as_deref()),
            }
        }
    }

    /// Copies `length` elements of `from` starting at `from_index` into this
    /// array starting at `to_index`.
    ///
    /// # Panics
    ///
    /// Panics if the source range is out of bounds.
    pub fn update_range(&mut self, to_index: usize, from: &Self, from_index: usize, length: usize) {
        check_range(from_index, from_index + length, from.widths.len());
        let from_indexes: Vec<usize> = (from_index..from_index + length).collect();
        let to_indexes: Vec<usize> = (to_index..to_index + length).collect();
        self.update(from, &from_indexes, &to_indexes);
    }

    /// Swaps two elements in place: their stride-sized unit blocks and their
    /// width markers. Both elements already fit the stride, so no resize can
    /// occur.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of bounds.
    pub fn swap(&mut self, a: usize, b: usize) {
        check_index(a, self.widths.len());
        check_index(b, self.widths.len());
        if a == b {
            return;
        }
        self.widths.swap(a, b);
        let (seg_a, off_a) = self.locate(a);
        let (seg_b, off_b) = self.locate(b);
        for k in 0..self.max_width {
            let tmp = self.segments[seg_a][off_a + k];
            self.segments[seg_a][off_a + k] = self.segments[seg_b][off_b + k];
            self.segments[seg_b][off_b + k] = tmp;
        }
    }

    /// Lexicographic comparison directly over the backing units; absent
    /// entries compare as the default value, nulls after everything.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of bounds.
    #[must_use]
    pub fn compare(&self, a: usize, b: usize) -> Ordering {
        check_index(a, self.widths.len());
        check_index(b, self.widths.len());
        let default_units = self.default.as_deref().map(|s| U::encode(s));
        compare_units(
            self.units(a).or(default_units.as_deref()),
            self.units(b).or(default_units.as_deref()),
        )
    }

    /// Sorts `[start, end)` in place without materializing strings.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    pub fn sort(&mut self, start: usize, end: usize, multiplier: i32) {
        check_range(start, end, self.widths.len());
        let parallel = self.parallel;
        let default_units = self.default.as_deref().map(|s| U::encode(s));
        let stride = self.max_width;
        let cap = segment_capacity(stride) as u64;
        let segments: Vec<SharedPtr<U>> = self
            .segments
            .iter_mut()
            .map(|s| SharedPtr::new(s.as_mut_ptr()))
            .collect();
        let target = PackedTarget {
            widths: SharedPtr::new(self.widths.as_mut_ptr()),
            len: self.widths.len(),
            segments,
            stride,
            segment_capacity: cap,
            default_units,
            multiplier,
            _marker: PhantomData,
        };
        sort::sort(&target, start, end, parallel);
    }

    /// Distinct values in first-seen order, stopping at `limit`. Absent
    /// entries are skipped.
    #[must_use]
    pub fn distinct(&self, limit: usize) -> Vec<String> {
        let mut seen = AHashSet::new();
        let mut out = Vec::new();
        for index in 0..self.widths.len() {
            if let Some(units) = self.units(index) {
                let text = U::decode(units);
                if seen.insert(text.clone()) {
                    out.push(text);
                    if out.len() >= limit {
                        break;
                    }
                }
            }
        }
        out
    }

    /// Writes stride, element count, default, widths, then every live
    /// element's units in ordinal order.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `writer` fails.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), ArrayIoError> {
        self.write_selected(writer, None)
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
        self.write_selected(writer, Some(indexes))
    }

    fn write_selected<W: Write>(
        &self,
        writer: &mut W,
        indexes: Option<&[usize]>,
    ) -> Result<(), ArrayIoError> {
        let count = indexes.map_or(self.widths.len(), <[usize]>::len);
        write_len(writer, self.max_width)?;
        write_len(writer, count)?;
        match &self.default {
            None => writer.write_all(&[0])?,
            Some(s) => {
                writer.write_all(&[1])?;
                write_len(writer, s.len())?;
                writer.write_all(s.as_bytes())?;
            }
        }
        for k in 0..count {
            let index = indexes.map_or(k, |idx| idx[k]);
            check_index(index, self.widths.len());
            writer.write_all(&self.widths[index].to_le_bytes())?;
            if let Some(units) = self.units(index) {
                for &unit in units {
                    unit.write_le(writer)?;
                }
            }
        }
        Ok(())
    }

    /// Reads back an array written by [`write`](Self::write).
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is truncated or structurally invalid.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, ArrayIoError> {
        let max_width = read_len(reader)?;
        let len = read_len(reader)?;
        let mut flag = [0_u8; 1];
        reader.read_exact(&mut flag)?;
        let default = if flag[0] == 0 {
            None
        } else {
            let n = read_len(reader)?;
            let mut buf = vec![0_u8; n];
            reader.read_exact(&mut buf)?;
            Some(String::from_utf8(buf).map_err(|e| ArrayIoError::Corrupt(e.to_string()))?)
        };
        let mut out = Self::with_default(len, max_width, default);
        for index in 0..len {
            let mut width_buf = [0_u8; 4];
            reader.read_exact(&mut width_buf)?;
            let width = i32::from_le_bytes(width_buf);
            if width == NULL_WIDTH {
                continue;
            }
            let width = usize::try_from(width)
                .map_err(|_| ArrayIoError::Corrupt(format!("invalid width {width}")))?;
            if width > out.max_width {
                return Err(ArrayIoError::Corrupt(format!(
                    "width {width} exceeds stride {}",
                    out.max_width
                )));
            }
            let mut units = Vec::with_capacity(width);
            for _ in 0..width {
                units.push(U::read_le(reader)?);
            }
            let (segment, start) = out.locate(index);
            out.segments[segment][start..start + units.len()].copy_from_slice(&units);
            out.widths[index] = i32::try_from(width).expect("bounded by stride");
        }
        Ok(out)
    }
}

impl PackedUtf8Array {
    /// Borrowed view of the entry at `index`; `None` for absent entries with
    /// a null default.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[must_use]
    pub fn get_str(&self, index: usize) -> Option<&str> {
        check_index(index, self.widths.len());
        match self.units(index) {
            Some(units) => Some(
                std::str::from_utf8(units).expect("invariant: stored bytes are valid UTF-8"),
            ),
            None => self.default.as_deref(),
        }
    }
}

fn compare_units<U: Ord>(a: Option<&[U]>, b: Option<&[U]>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => {
            let prefix = cmp::min(x.len(), y.len());
            for i in 0..prefix {
                match x[i].cmp(&y[i]) {
                    Ordering::Equal => {}
                    other => return other,
                }
            }
            x.len().cmp(&y.len())
        }
    }
}

struct PackedTarget<'a, U: TextUnit> {
    widths: SharedPtr<i32>,
    len: usize,
    segments: Vec<SharedPtr<U>>,
    stride: usize,
    segment_capacity: u64,
    default_units: Option<Vec<U>>,
    multiplier: i32,
    _marker: PhantomData<&'a mut [U]>,
}

impl<U: TextUnit> PackedTarget<'_, U> {
    fn slot(&self, index: usize) -> *mut U {
        let offset = index as u64 * self.stride as u64;
        let segment = usize::try_from(offset / self.segment_capacity).expect("fits usize");
        let start = usize::try_from(offset % self.segment_capacity).expect("fits usize");
        // Safety: start + stride never exceeds the segment length because the
        // segment capacity is a stride multiple.
        unsafe { self.segments[segment].get().add(start) }
    }

    fn element(&self, index: usize) -> Option<&[U]> {
        check_index(index, self.len);
        // Safety: bounds checked above; widths outlives the target.
        let width = unsafe { *self.widths.get().add(index) };
        if width == NULL_WIDTH {
            return self.default_units.as_deref();
        }
        let width = usize::try_from(width).expect("non-negative width");
        // Safety: the slot holds at least `width` initialized units.
        Some(unsafe { std::slice::from_raw_parts(self.slot(index), width) })
    }
}

impl<U: TextUnit> SortTarget for PackedTarget<'_, U> {
    fn compare(&self, a: usize, b: usize) -> Ordering {
        let ordering = compare_units(self.element(a), self.element(b));
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
        // Safety: distinct in-bounds slots never overlap (stride-sized), and
        // concurrent callers stay on disjoint index ranges.
        unsafe {
            std::ptr::swap_nonoverlapping(self.slot(a), self.slot(b), self.stride);
            std::ptr::swap(self.widths.get().add(a), self.widths.get().add(b));
        }
    }
}

impl<U: TextUnit> Array for PackedTextArray<U> {
    fn data_type(&self) -> DataType {
        U::DATA_TYPE
    }

    fn len(&self) -> usize {
        self.widths.len()
    }

    fn is_null(&self, index: usize) -> bool {
        check_index(index, self.widths.len());
        self.widths[index] == NULL_WIDTH && self.default.is_none()
    }

    fn value(&self, index: usize) -> Option<Value> {
        self.get(index).map(Value::Text)
    }
}

impl<U: TextUnit> Clone for PackedTextArray<U> {
    fn clone(&self) -> Self {
        self.copy()
    }
}

impl<U: TextUnit> PartialEq for PackedTextArray<U> {
    fn eq(&self, other: &Self) -> bool {
        self.widths.len() == other.widths.len()
            && (0..self.widths.len()).all(|i| self.get(i) == other.get(i))
    }
}

impl<U: TextUnit> fmt::Debug for PackedTextArray<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PackedTextArray<{:?}>", U::DATA_TYPE)?;
        f.debug_list()
            .entries((0..self.widths.len()).map(|i| self.get(i)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_and_empty_are_distinct() {
        let mut array = PackedUtf8Array::new(2, 8);
        array.set(0, Some(""));
        assert_eq!(array.get(0), Some(String::new()));
        assert!(!array.is_null(0));
        assert_eq!(array.get(1), None);
        assert!(array.is_null(1));
    }

    #[test]
    fn resize_preserves_every_other_element() {
        let mut array = PackedUtf8Array::new(4, 10);
        array.set(0, Some("short"));
        array.set(2, Some("ten chars!"));
        assert_eq!(array.max_width(), 10);

        array.set(0, Some("a string longer than ten chars"));
        assert!(array.max_width() >= 30);
        assert_eq!(
            array.get(0),
            Some("a string longer than ten chars".to_string())
        );
        assert_eq!(array.get(1), None);
        assert_eq!(array.get(2), Some("ten chars!".to_string()));
        assert_eq!(array.get(3), None);
    }

    #[test]
    fn utf16_stores_non_bmp_text() {
        let mut array = PackedUtf16Array::new(2, 4);
        array.set(0, Some("a😀b"));
        assert_eq!(array.get(0), Some("a😀b".to_string()));
        assert_eq!(array.max_width(), 4);
    }

    #[test]
    fn default_reads_back_for_absent_entries() {
        let array = PackedUtf8Array::with_default(2, 4, Some("n/a".to_string()));
        assert_eq!(array.get(0), Some("n/a".to_string()));
        assert!(!array.is_null(0));
    }

    #[test]
    fn sort_compares_raw_units() {
        let mut array = PackedUtf8Array::new(4, 8);
        array.set(0, Some("pear"));
        array.set(1, Some("apple"));
        array.set(2, Some("fig"));
        array.set(3, Some("app"));
        array.sort(0, 4, 1);
        let collected: Vec<Option<String>> = (0..4).map(|i| array.get(i)).collect();
        assert_eq!(
            collected,
            vec![
                Some("app".to_string()),
                Some("apple".to_string()),
                Some("fig".to_string()),
                Some("pear".to_string())
            ]
        );

        array.sort(0, 4, -1);
        assert_eq!(array.get(0), Some("pear".to_string()));
        assert_eq!(array.get(3), Some("app".to_string()));
    }

    #[test]
    fn nulls_sort_after_values() {
        let mut array = PackedUtf8Array::new(3, 4);
        array.set(1, Some("b"));
        array.sort(0, 3, 1);
        assert_eq!(array.get(0), Some("b".to_string()));
        assert!(array.is_null(1));
        assert!(array.is_null(2));
    }

    #[test]
    fn update_copies_raw_spans() {
        let mut source = PackedUtf8Array::new(3, 16);
        source.set(0, Some("alpha"));
        source.set(1, Some("beta"));
        let mut target = PackedUtf8Array::new(1, 4);
        target.update(&source, &[1, 0], &[0, 2]);
        assert_eq!(target.get(0), Some("beta".to_string()));
        assert_eq!(target.get(1), None);
        assert_eq!(target.get(2), Some("alpha".to_string()));
        assert_eq!(target.max_width(), 16);
    }

    #[test]
    fn write_read_round_trip() {
        let mut array = PackedUtf8Array::with_default(4, 6, Some("-".to_string()));
        array.set(0, Some("abc"));
        array.set(2, Some(""));
        let mut buf = Vec::new();
        array.write(&mut buf).unwrap();
        let restored = PackedUtf8Array::read(&mut buf.as_slice()).unwrap();
        assert_eq!(array, restored);
        assert_eq!(restored.get(1), Some("-".to_string()));
        assert_eq!(restored.get(2), Some(String::new()));
    }

    #[test]
    fn write_indexes_subset() {
        let mut array = PackedUtf16Array::new(3, 8);
        array.set(0, Some("zero"));
        array.set(2, Some("two"));
        let mut buf = Vec::new();
        array.write_indexes(&mut buf, &[2, 0]).unwrap();
        let restored = PackedUtf16Array::read(&mut buf.as_slice()).unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.get(0), Some("two".to_string()));
        assert_eq!(restored.get(1), Some("zero".to_string()));
    }

    #[test]
    fn compare_and_swap_work_on_raw_units() {
        let mut array = PackedUtf8Array::new(3, 6);
        array.set(0, Some("beta"));
        array.set(1, Some("alpha"));
        assert_eq!(array.compare(0, 1), Ordering::Greater);
        assert_eq!(array.compare(1, 1), Ordering::Equal);
        array.swap(0, 1);
        assert_eq!(array.get(0), Some("alpha".to_string()));
        assert_eq!(array.get(1), Some("beta".to_string()));
        assert!(array.is_null(2));
    }

    #[test]
    fn distinct_skips_absent_entries() {
        let mut array = PackedUtf8Array::new(5, 4);
        array.set(0, Some("b"));
        array.set(2, Some("a"));
        array.set(3, Some("b"));
        assert_eq!(array.distinct(10), vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    #[should_panic(expected = "index out of bounds")]
    fn out_of_range_set_panics() {
        let mut array = PackedUtf8Array::new(1, 4);
        array.set(1, Some("x"));
    }
}
