//! Lazy, splittable numeric and temporal sequences used to bulk-populate
//! arrays, sequentially or by recursive splitting across the pool.

use crate::array::{DateArray, DateTimeArray, DoubleArray, IntArray, LongArray};
use crate::coding::{DateCoding, DateTimeCoding};
use crate::pool;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use rayon::prelude::*;
use std::cmp::{self, Ordering};
use std::fmt;
use std::sync::Arc;

/// Tolerance applied at floating-range boundaries so cumulative step error
/// cannot produce an off-by-one element.
const FLOAT_EPSILON: f64 = 1e-12;

/// An element type a `Range` can generate, together with its step type and
/// the dense array its `to_array` produces.
pub trait RangeValue: Copy + PartialOrd + Send + Sync + fmt::Debug + 'static {
    type Step: Copy + Send + Sync;
    type Array;

    fn advance(self, step: Self::Step) -> Self;

    /// Position after `count` whole steps, computed from the origin rather
    /// than by accumulation.
    fn advance_by(self, step: Self::Step, count: usize) -> Self;

    /// Upper bound on the number of elements between `start` (inclusive)
    /// and `end` (exclusive).
    fn steps_between(start: Self, end: Self, step: Self::Step) -> usize;

    fn ascending_step(step: Self::Step) -> bool;

    fn in_bounds(self, end: Self, ascending: bool) -> bool;

    fn collect_array(values: Vec<Self>) -> Self::Array;
}

impl RangeValue for i32 {
    type Step = i32;
    type Array = IntArray;

    fn advance(self, step: i32) -> Self {
        self + step
    }

    fn advance_by(self, step: i32, count: usize) -> Self {
        let offset = i64::from(step) * count as i64;
        i32::try_from(i64::from(self) + offset).expect("range stays within i32")
    }

    fn steps_between(start: Self, end: Self, step: i32) -> usize {
        span_steps(i64::from(end) - i64::from(start), i64::from(step))
    }

    fn ascending_step(step: i32) -> bool {
        step > 0
    }

    fn in_bounds(self, end: Self, ascending: bool) -> bool {
        if ascending {
            self < end
        } else {
            self > end
        }
    }

    fn collect_array(values: Vec<Self>) -> IntArray {
        IntArray::from_vec(values)
    }
}

impl RangeValue for i64 {
    type Step = i64;
    type Array = LongArray;

    fn advance(self, step: i64) -> Self {
        self + step
    }

    fn advance_by(self, step: i64, count: usize) -> Self {
        self + step * count as i64
    }

    fn steps_between(start: Self, end: Self, step: i64) -> usize {
        span_steps(end - start, step)
    }

    fn ascending_step(step: i64) -> bool {
        step > 0
    }

    fn in_bounds(self, end: Self, ascending: bool) -> bool {
        if ascending {
            self < end
        } else {
            self > end
        }
    }

    fn collect_array(values: Vec<Self>) -> LongArray {
        LongArray::from_vec(values)
    }
}

impl RangeValue for f64 {
    type Step = f64;
    type Array = DoubleArray;

    fn advance(self, step: f64) -> Self {
        self + step
    }

    #[allow(clippy::cast_precision_loss)]
    fn advance_by(self, step: f64, count: usize) -> Self {
        self + step * count as f64
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn steps_between(start: Self, end: Self, step: f64) -> usize {
        let span = (end - start) / step;
        if span <= 0.0 {
            0
        } else {
            span.ceil() as usize
        }
    }

    fn ascending_step(step: f64) -> bool {
        step > 0.0
    }

    fn in_bounds(self, end: Self, ascending: bool) -> bool {
        if ascending {
            end - self > FLOAT_EPSILON
        } else {
            self - end > FLOAT_EPSILON
        }
    }

    fn collect_array(values: Vec<Self>) -> DoubleArray {
        DoubleArray::from_vec(values)
    }
}

impl RangeValue for NaiveDate {
    /// Step in whole days.
    type Step = i64;
    type Array = DateArray;

    fn advance(self, step: i64) -> Self {
        self.checked_add_signed(Duration::days(step))
            .expect("date range stays in the supported era")
    }

    fn advance_by(self, step: i64, count: usize) -> Self {
        self.advance(step * count as i64)
    }

    fn steps_between(start: Self, end: Self, step: i64) -> usize {
        span_steps(end.signed_duration_since(start).num_days(), step)
    }

    fn ascending_step(step: i64) -> bool {
        step > 0
    }

    fn in_bounds(self, end: Self, ascending: bool) -> bool {
        if ascending {
            self < end
        } else {
            self > end
        }
    }

    fn collect_array(values: Vec<Self>) -> DateArray {
        let mut array = DateArray::new(values.len(), Arc::new(DateCoding));
        for (i, v) in values.into_iter().enumerate() {
            array.set(i, Some(v));
        }
        array
    }
}

impl RangeValue for NaiveDateTime {
    type Step = Duration;
    type Array = DateTimeArray;

    fn advance(self, step: Duration) -> Self {
        self.checked_add_signed(step)
            .expect("date-time range stays in the supported era")
    }

    fn advance_by(self, step: Duration, count: usize) -> Self {
        let millis = step.num_milliseconds() * count as i64;
        self.advance(Duration::milliseconds(millis))
    }

    fn steps_between(start: Self, end: Self, step: Duration) -> usize {
        span_steps(
            end.signed_duration_since(start).num_milliseconds(),
            step.num_milliseconds(),
        )
    }

    fn ascending_step(step: Duration) -> bool {
        step > Duration::zero()
    }

    fn in_bounds(self, end: Self, ascending: bool) -> bool {
        if ascending {
            self < end
        } else {
            self > end
        }
    }

    fn collect_array(values: Vec<Self>) -> DateTimeArray {
        let mut array = DateTimeArray::new(values.len(), Arc::new(DateTimeCoding));
        for (i, v) in values.into_iter().enumerate() {
            array.set(i, Some(v));
        }
        array
    }
}

#[allow(clippy::cast_sign_loss)]
fn span_steps(span: i64, step: i64) -> usize {
    assert!(step != 0, "unsupported operation: zero range step");
    if span == 0 || (span > 0) != (step > 0) {
        return 0;
    }
    let (span, step) = (span.unsigned_abs(), step.unsigned_abs());
    usize::try_from(span.div_ceil(step)).expect("step count fits usize")
}

type ExcludePredicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// A lazy sequence from `start` (inclusive) to `end` (exclusive) in `step`
/// increments, optionally skipping excluded values.
#[derive(Clone)]
pub struct Range<T: RangeValue> {
    start: T,
    end: T,
    step: T::Step,
    excludes: Option<ExcludePredicate<T>>,
}

impl<T: RangeValue> Range<T> {
    #[must_use]
    pub fn of(start: T, end: T, step: T::Step) -> Self {
        Self {
            start,
            end,
            step,
            excludes: None,
        }
    }

    #[must_use]
    pub fn with_excludes<P>(start: T, end: T, step: T::Step, excludes: P) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self {
            start,
            end,
            step,
            excludes: Some(Arc::new(excludes)),
        }
    }

    #[must_use]
    pub fn start(&self) -> T {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> T {
        self.end
    }

    #[must_use]
    pub fn step(&self) -> T::Step {
        self.step
    }

    #[must_use]
    pub fn is_ascending(&self) -> bool {
        T::ascending_step(self.step)
    }

    /// Upper bound on the element count (excluded values still count here).
    #[must_use]
    pub fn estimate_size(&self) -> usize {
        T::steps_between(self.start, self.end, self.step)
    }

    pub fn iter(&self) -> RangeIter<'_, T> {
        RangeIter {
            current: self.start,
            end: self.end,
            step: self.step,
            ascending: self.is_ascending(),
            excludes: self.excludes.as_deref(),
        }
    }

    /// Partitions into at most pool-width contiguous sub-ranges of roughly
    /// equal step count. Ranges at or below `threshold` steps stay whole:
    /// below that size the split overhead outweighs the parallelism.
    #[must_use]
    pub fn split(&self, threshold: usize) -> Vec<Self> {
        let count = self.estimate_size();
        if count <= cmp::max(1, threshold) {
            return vec![self.clone()];
        }
        let segments = cmp::min(pool::width(), count.div_ceil(cmp::max(1, threshold)));
        let per = count / segments;
        let extra = count % segments;
        let mut out = Vec::with_capacity(segments);
        let mut offset = 0;
        for k in 0..segments {
            let n = per + usize::from(k < extra);
            let sub_start = self.start.advance_by(self.step, offset);
            let sub_end = if k == segments - 1 {
                self.end
            } else {
                self.start.advance_by(self.step, offset + n)
            };
            out.push(Self {
                start: sub_start,
                end: sub_end,
                step: self.step,
                excludes: self.excludes.clone(),
            });
            offset += n;
        }
        out
    }

    /// Materializes the sequence into its dense array. In parallel mode the
    /// range splits across the pool, each segment builds independently, and
    /// the segments reassemble in range order: completed segments are
    /// re-sorted by their first element under the direction-aware
    /// multiplier, so out-of-order task completion cannot reorder the
    /// output.
    #[must_use]
    pub fn to_array(&self, parallel: bool) -> T::Array {
        if !parallel {
            return T::collect_array(self.iter().collect());
        }
        let ranges = self.split(pool::split_threshold(self.estimate_size()));
        let mut segments: Vec<(T, Vec<T>)> = pool::POOL.install(|| {
            ranges
                .par_iter()
                .map(|r| (r.start, r.iter().collect()))
                .collect()
        });
        let multiplier = if self.is_ascending() { 1 } else { -1 };
        segments.sort_by(|a, b| {
            let ordering = a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal);
            if multiplier < 0 {
                ordering.reverse()
            } else {
                ordering
            }
        });
        T::collect_array(segments.into_iter().flat_map(|(_, v)| v).collect())
    }
}

impl<T: RangeValue> fmt::Debug for Range<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Range")
            .field("start", &self.start)
            .field("end", &self.end)
            .finish()
    }
}

pub struct RangeIter<'a, T: RangeValue> {
    current: T,
    end: T,
    step: T::Step,
    ascending: bool,
    excludes: Option<&'a (dyn Fn(&T) -> bool + Send + Sync)>,
}

impl<T: RangeValue> Iterator for RangeIter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        loop {
            if !self.current.in_bounds(self.end, self.ascending) {
                return None;
            }
            let value = self.current;
            self.current = value.advance(self.step);
            if self.excludes.is_some_and(|f| f(&value)) {
                continue;
            }
            return Some(value);
        }
    }
}

impl<'a, T: RangeValue> IntoIterator for &'a Range<T> {
    type Item = T;
    type IntoIter = RangeIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascending_and_descending_iteration() {
        let up: Vec<i32> = Range::of(0, 5, 1).iter().collect();
        assert_eq!(up, vec![0, 1, 2, 3, 4]);
        let down: Vec<i32> = Range::of(5, 0, -2).iter().collect();
        assert_eq!(down, vec![5, 3, 1]);
    }

    #[test]
    fn excludes_are_skipped() {
        let range = Range::with_excludes(0, 6, 1, |v: &i32| v % 2 == 1);
        let values: Vec<i32> = range.iter().collect();
        assert_eq!(values, vec![0, 2, 4]);
    }

    #[test]
    fn float_boundary_has_no_off_by_one() {
        let range = Range::of(0.0, 1.0, 0.1);
        let values: Vec<f64> = range.iter().collect();
        assert_eq!(values.len(), 10);
        assert!(values.last().unwrap() < &1.0);
    }

    #[test]
    fn split_is_contiguous_and_complete() {
        let range = Range::of(0_i64, 1000, 1);
        let parts = range.split(100);
        assert!(parts.len() <= pool::width().max(1));
        let mut all = Vec::new();
        for part in &parts {
            all.extend(part.iter());
        }
        let whole: Vec<i64> = range.iter().collect();
        assert_eq!(all, whole);
    }

    #[test]
    fn split_below_threshold_stays_whole() {
        let range = Range::of(0_i32, 10, 1);
        assert_eq!(range.split(100).len(), 1);
    }

    #[test]
    fn parallel_and_sequential_arrays_match() {
        let range = Range::of(0_i64, 1_000_000, 1);
        let sequential = range.to_array(false);
        let parallel = range.to_array(true);
        assert_eq!(sequential, parallel);
        assert_eq!(sequential.len(), 1_000_000);
        assert_eq!(sequential.get(999_999), 999_999);
    }

    #[test]
    fn descending_parallel_reassembles_in_range_order() {
        let range = Range::of(100_000_i64, 0, -1);
        assert!(!range.is_ascending());
        let sequential = range.to_array(false);
        let parallel = range.to_array(true);
        assert_eq!(sequential, parallel);
        assert_eq!(sequential.get(0), 100_000);
    }

    #[test]
    fn date_range_builds_coded_array() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 11).unwrap();
        let array = Range::of(start, end, 1).to_array(false);
        assert_eq!(array.len(), 10);
        assert_eq!(array.get(0), Some(start));
        assert_eq!(array.get(9), NaiveDate::from_ymd_opt(2024, 1, 10));
    }

    #[test]
    fn estimate_counts_partial_steps() {
        assert_eq!(Range::of(0_i32, 10, 3).estimate_size(), 4);
        assert_eq!(Range::of(0_i32, 10, -1).estimate_size(), 0);
    }
}
