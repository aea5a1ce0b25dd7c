//! Index-addressed sort engine shared by every array variant.
//!
//! The engine only ever compares and swaps ordinals; the concrete target
//! decides what a swap moves, so packed string arrays, code buffers, and
//! primitive slices all sort without copying their elements out.

use crate::datatypes::NativeType;
use crate::pool;
use std::cmp::Ordering;
use std::marker::PhantomData;

/// Below this partition length the engine switches to insertion sort.
pub const INSERTION_THRESHOLD: usize = 16;

/// At or above this partition length the pivot is a median of nine samples;
/// below it a median of three.
pub const MEDIAN_OF_NINE_THRESHOLD: usize = 128;

/// Below this partition length the parallel variant stops forking and runs
/// the sequential engine in place.
pub const PARALLEL_THRESHOLD: usize = 8192;

/// An index-addressed view of an orderable backing store.
///
/// `swap` takes `&self`: implementations mutate through interior pointers and
/// must tolerate concurrent swaps on disjoint index pairs, which is all the
/// parallel engine ever issues (sibling partitions never overlap).
pub trait SortTarget: Sync {
    fn compare(&self, a: usize, b: usize) -> Ordering;

    fn swap(&self, a: usize, b: usize);
}

/// Sorts `[start, end)` of the target. Not stable.
pub fn sort<T: SortTarget>(target: &T, start: usize, end: usize, parallel: bool) {
    assert!(start <= end, "index out of bounds: start {start} > end {end}");
    if end - start < 2 {
        return;
    }
    if parallel {
        pool::POOL.install(|| sort_parallel(target, start, end));
    } else {
        sort_sequential(target, start, end);
    }
}

fn sort_sequential<T: SortTarget>(target: &T, mut lo: usize, mut hi: usize) {
    // Recurse into the smaller partition only, so stack depth stays O(log n).
    loop {
        if hi - lo <= INSERTION_THRESHOLD {
            insertion_sort(target, lo, hi);
            return;
        }
        let p = partition(target, lo, hi);
        if p - lo < hi - p - 1 {
            sort_sequential(target, lo, p);
            lo = p + 1;
        } else {
            sort_sequential(target, p + 1, hi);
            hi = p;
        }
    }
}

fn sort_parallel<T: SortTarget>(target: &T, lo: usize, hi: usize) {
    if hi - lo < PARALLEL_THRESHOLD {
        sort_sequential(target, lo, hi);
        return;
    }
    let p = partition(target, lo, hi);
    rayon::join(
        || sort_parallel(target, lo, p),
        || sort_parallel(target, p + 1, hi),
    );
}

fn insertion_sort<T: SortTarget>(target: &T, lo: usize, hi: usize) {
    for i in lo + 1..hi {
        let mut j = i;
        while j > lo && target.compare(j, j - 1) == Ordering::Less {
            target.swap(j, j - 1);
            j -= 1;
        }
    }
}

/// Parks the pivot at `hi - 1`, partitions around it, and returns its final
/// position.
fn partition<T: SortTarget>(target: &T, lo: usize, hi: usize) -> usize {
    let pivot = select_pivot(target, lo, hi);
    target.swap(pivot, hi - 1);
    let mut store = lo;
    for i in lo..hi - 1 {
        if target.compare(i, hi - 1) == Ordering::Less {
            if i != store {
                target.swap(i, store);
            }
            store += 1;
        }
    }
    target.swap(store, hi - 1);
    store
}

fn select_pivot<T: SortTarget>(target: &T, lo: usize, hi: usize) -> usize {
    let len = hi - lo;
    let mid = lo + len / 2;
    if len >= MEDIAN_OF_NINE_THRESHOLD {
        let eighth = len / 8;
        let a = median_of_3(target, lo, lo + eighth, lo + 2 * eighth);
        let b = median_of_3(target, mid - eighth, mid, mid + eighth);
        let c = median_of_3(target, hi - 1 - 2 * eighth, hi - 1 - eighth, hi - 1);
        median_of_3(target, a, b, c)
    } else {
        median_of_3(target, lo, mid, hi - 1)
    }
}

fn median_of_3<T: SortTarget>(target: &T, a: usize, b: usize, c: usize) -> usize {
    if target.compare(a, b) == Ordering::Less {
        if target.compare(b, c) == Ordering::Less {
            b
        } else if target.compare(a, c) == Ordering::Less {
            c
        } else {
            a
        }
    } else if target.compare(a, c) == Ordering::Less {
        a
    } else if target.compare(b, c) == Ordering::Less {
        c
    } else {
        b
    }
}

/// A raw mutable pointer shareable across the pool's worker threads.
pub(crate) struct SharedPtr<T> {
    inner: *mut T,
}

impl<T> SharedPtr<T> {
    pub(crate) fn new(inner: *mut T) -> Self {
        Self { inner }
    }

    pub(crate) fn get(&self) -> *mut T {
        self.inner
    }
}

// Safety: every user of `SharedPtr` confines concurrent access to disjoint
// index ranges of the pointed-to buffer.
unsafe impl<T> Send for SharedPtr<T> {}
unsafe impl<T> Sync for SharedPtr<T> {}

/// Sort target over a primitive slice with a `+1`/`-1` direction multiplier.
pub struct SliceTarget<'a, T: NativeType> {
    ptr: SharedPtr<T>,
    len: usize,
    multiplier: i32,
    _marker: PhantomData<&'a mut [T]>,
}

impl<'a, T: NativeType> SliceTarget<'a, T> {
    pub fn new(slice: &'a mut [T], multiplier: i32) -> Self {
        Self {
            ptr: SharedPtr::new(slice.as_mut_ptr()),
            len: slice.len(),
            multiplier,
            _marker: PhantomData,
        }
    }

    fn read(&self, index: usize) -> T {
        assert!(index < self.len, "index out of bounds: {index} >= {}", self.len);
        // Safety: bounds asserted above; the slice outlives `self`.
        unsafe { *self.ptr.get().add(index) }
    }
}

impl<T: NativeType> SortTarget for SliceTarget<'_, T> {
    fn compare(&self, a: usize, b: usize) -> Ordering {
        let ordering = self.read(a).total_cmp(&self.read(b));
        if self.multiplier < 0 {
            ordering.reverse()
        } else {
            ordering
        }
    }

    fn swap(&self, a: usize, b: usize) {
        assert!(
            a < self.len && b < self.len,
            "index out of bounds: swap({a}, {b}) on length {}",
            self.len
        );
        if a == b {
            return;
        }
        // Safety: bounds asserted above and `a != b`, so the two element
        // pointers never alias; concurrent callers stay on disjoint ranges.
        unsafe { std::ptr::swap(self.ptr.get().add(a), self.ptr.get().add(b)) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn sorted_copy(values: &[i64], multiplier: i32, parallel: bool) -> Vec<i64> {
        let mut out = values.to_vec();
        let len = out.len();
        let target = SliceTarget::new(&mut out, multiplier);
        sort(&target, 0, len, parallel);
        out
    }

    #[test]
    fn small_partitions_use_insertion() {
        let values = vec![5_i64, 1, 4, 2, 3];
        assert_eq!(sorted_copy(&values, 1, false), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn ascending_and_descending_are_exact_reversals() {
        let mut rng = StdRng::seed_from_u64(7);
        let values: Vec<i64> = (0..1000).map(|_| rng.gen_range(-1_000_000..1_000_000)).collect();
        let asc = sorted_copy(&values, 1, false);
        let desc = sorted_copy(&values, -1, false);
        let mut reversed = asc.clone();
        reversed.reverse();
        assert_eq!(desc, reversed);
        assert!(asc.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn parallel_matches_sequential_above_threshold() {
        let mut rng = StdRng::seed_from_u64(11);
        let values: Vec<i64> = (0..50_000).map(|_| rng.gen()).collect();
        assert_eq!(sorted_copy(&values, 1, true), sorted_copy(&values, 1, false));
    }

    #[test]
    fn sub_range_sort_leaves_rest_untouched() {
        let mut values = vec![9_i64, 8, 7, 6, 5];
        let target = SliceTarget::new(&mut values, 1);
        sort(&target, 1, 4, false);
        assert_eq!(values, vec![9, 6, 7, 8, 5]);
    }

    #[test]
    fn float_sort_totals_nan_last() {
        let mut values = vec![2.5_f64, f64::NAN, 0.5];
        let len = values.len();
        let target = SliceTarget::new(&mut values, 1);
        sort(&target, 0, len, false);
        assert_eq!(values[0], 0.5);
        assert_eq!(values[1], 2.5);
        assert!(values[2].is_nan());
    }
}
