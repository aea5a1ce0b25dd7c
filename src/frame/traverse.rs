//! The parallel 2-D traversal engine.
//!
//! A frame's value space is one linear index range `[0, rows * cols)` in
//! column-major order (`row = index % rows`, `col = index / rows`); most
//! workloads iterate within a column, so contiguous linear segments stay
//! cache-friendly. Read-only traversals bisect that range at its midpoint
//! down to a pool-derived threshold; sequential mode uses an effectively
//! infinite threshold, guaranteeing a single synchronous sweep. Splitting is
//! always contiguous midpoint bisection and sibling results merge
//! left-biased, so outcomes do not depend on task completion order.

use super::{Frame, FrameCursor, FrameKey};
use crate::array::TypeError;
use crate::column::Column;
use crate::datatypes::Schema;
use crate::pool;
use crate::value::Value;
use rayon::prelude::*;
use std::cmp::Ordering;

/// A cell value located by the reduction engine, with its position and keys.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameValue<R, C> {
    pub row_key: R,
    pub col_key: C,
    pub row_ordinal: usize,
    pub col_ordinal: usize,
    pub value: Value,
}

fn threshold_for<R: FrameKey, C: FrameKey>(frame: &Frame<R, C>, total: usize) -> usize {
    if frame.is_parallel() {
        pool::split_threshold(total)
    } else {
        usize::MAX
    }
}

pub(super) fn for_each_value<R, C, F>(frame: &Frame<R, C>, f: &F)
where
    R: FrameKey,
    C: FrameKey,
    F: Fn(&FrameCursor<'_, R, C>) + Sync,
{
    let total = frame.num_rows() * frame.num_columns();
    if total == 0 {
        return;
    }
    let threshold = threshold_for(frame, total);
    if frame.is_parallel() {
        pool::POOL.install(|| for_each_segment(frame, 0, total, threshold, f));
    } else {
        for_each_segment(frame, 0, total, threshold, f);
    }
}

fn for_each_segment<R, C, F>(frame: &Frame<R, C>, from: usize, to: usize, threshold: usize, f: &F)
where
    R: FrameKey,
    C: FrameKey,
    F: Fn(&FrameCursor<'_, R, C>) + Sync,
{
    if to - from <= threshold {
        let rows = frame.num_rows();
        let mut cursor = frame.cursor();
        for index in from..to {
            cursor.at(index % rows, index / rows);
            f(&cursor);
        }
    } else {
        let mid = from + (to - from) / 2;
        rayon::join(
            || for_each_segment(frame, from, mid, threshold, f),
            || for_each_segment(frame, mid, to, threshold, f),
        );
    }
}

/// Seed-then-sweep reduction over one linear segment: scan forward until a
/// cell satisfies the predicate, then compare the remainder against that
/// seed.
fn reduce_segment<R, C, P>(
    frame: &Frame<R, C>,
    from: usize,
    to: usize,
    threshold: usize,
    predicate: &P,
    want_max: bool,
) -> Option<(usize, Value)>
where
    R: FrameKey,
    C: FrameKey,
    P: Fn(&Value) -> bool + Sync,
{
    if to - from <= threshold {
        let rows = frame.num_rows();
        let mut best: Option<(usize, Value)> = None;
        for index in from..to {
            let Some(value) = frame.value_at(index % rows, index / rows) else {
                continue;
            };
            if !predicate(&value) {
                continue;
            }
            match &best {
                None => best = Some((index, value)),
                Some((_, seed)) => {
                    if is_better(&value, seed, want_max) {
                        best = Some((index, value));
                    }
                }
            }
        }
        best
    } else {
        let mid = from + (to - from) / 2;
        let (left, right) = rayon::join(
            || reduce_segment(frame, from, mid, threshold, predicate, want_max),
            || reduce_segment(frame, mid, to, threshold, predicate, want_max),
        );
        merge_extrema(left, right, want_max)
    }
}

fn is_better(candidate: &Value, seed: &Value, want_max: bool) -> bool {
    match candidate.partial_cmp(seed) {
        Some(Ordering::Less) => !want_max,
        Some(Ordering::Greater) => want_max,
        _ => false,
    }
}

/// Left-biased merge: the right result wins only when strictly better, so
/// ties resolve to the smaller linear index.
fn merge_extrema(
    left: Option<(usize, Value)>,
    right: Option<(usize, Value)>,
    want_max: bool,
) -> Option<(usize, Value)> {
    match (left, right) {
        (None, right) => right,
        (left, None) => left,
        (Some(left), Some(right)) => {
            if is_better(&right.1, &left.1, want_max) {
                Some(right)
            } else {
                Some(left)
            }
        }
    }
}

pub(super) fn extremum<R, C, P>(
    frame: &Frame<R, C>,
    predicate: &P,
    want_max: bool,
) -> Option<FrameValue<R, C>>
where
    R: FrameKey,
    C: FrameKey,
    P: Fn(&Value) -> bool + Sync,
{
    let total = frame.num_rows() * frame.num_columns();
    if total == 0 {
        return None;
    }
    let threshold = threshold_for(frame, total);
    let found = if frame.is_parallel() {
        pool::POOL.install(|| reduce_segment(frame, 0, total, threshold, predicate, want_max))
    } else {
        reduce_segment(frame, 0, total, threshold, predicate, want_max)
    };
    found.map(|(index, value)| {
        let rows = frame.num_rows();
        let (row, col) = (index % rows, index / rows);
        FrameValue {
            row_key: frame.row_keys()[row].clone(),
            col_key: frame.col_keys()[col].clone(),
            row_ordinal: row,
            col_ordinal: col,
            value,
        }
    })
}

pub(super) fn bounds<R, C, P>(frame: &Frame<R, C>, predicate: &P) -> Option<(Value, Value)>
where
    R: FrameKey,
    C: FrameKey,
    P: Fn(&Value) -> bool + Sync,
{
    let (min, max) = pool::join(
        || extremum(frame, predicate, false),
        || extremum(frame, predicate, true),
    );
    match (min, max) {
        (Some(min), Some(max)) => Some((min.value, max.value)),
        _ => None,
    }
}

/// Elementwise apply decomposes the column-major linear space at column
/// boundaries: each column is one contiguous linear sub-range, and splitting
/// there lets the columns be mutated through disjoint `&mut` borrows.
fn apply_columns<R, C, F>(frame: &mut Frame<R, C>, f: F)
where
    R: FrameKey,
    C: FrameKey,
    F: Fn(usize, &mut Column) + Sync,
{
    let parallel = frame.is_parallel();
    let columns = frame.columns_mut();
    if parallel {
        pool::POOL.install(|| {
            columns
                .par_iter_mut()
                .enumerate()
                .for_each(|(ordinal, column)| f(ordinal, column));
        });
    } else {
        for (ordinal, column) in columns.iter_mut().enumerate() {
            f(ordinal, column);
        }
    }
}

pub(super) fn apply_booleans<R, C, F>(frame: &mut Frame<R, C>, f: &F)
where
    R: FrameKey,
    C: FrameKey,
    F: Fn(usize, usize, bool) -> bool + Sync,
{
    apply_columns(frame, |ordinal, column| {
        if let Some(array) = column.as_boolean_mut() {
            for row in 0..array.len() {
                let mapped = f(row, ordinal, array.get(row));
                array.set(row, mapped);
            }
        }
    });
}

pub(super) fn apply_ints<R, C, F>(frame: &mut Frame<R, C>, f: &F)
where
    R: FrameKey,
    C: FrameKey,
    F: Fn(usize, usize, i32) -> i32 + Sync,
{
    apply_columns(frame, |ordinal, column| {
        if let Some(array) = column.as_int_mut() {
            for row in 0..array.len() {
                let mapped = f(row, ordinal, array.get(row));
                array.set(row, mapped);
            }
        }
    });
}

pub(super) fn apply_longs<R, C, F>(frame: &mut Frame<R, C>, f: &F)
where
    R: FrameKey,
    C: FrameKey,
    F: Fn(usize, usize, i64) -> i64 + Sync,
{
    apply_columns(frame, |ordinal, column| {
        if let Some(array) = column.as_long_mut() {
            for row in 0..array.len() {
                let mapped = f(row, ordinal, array.get(row));
                array.set(row, mapped);
            }
        }
    });
}

pub(super) fn apply_doubles<R, C, F>(frame: &mut Frame<R, C>, f: &F)
where
    R: FrameKey,
    C: FrameKey,
    F: Fn(usize, usize, f64) -> f64 + Sync,
{
    apply_columns(frame, |ordinal, column| {
        if let Some(array) = column.as_double_mut() {
            for row in 0..array.len() {
                let mapped = f(row, ordinal, array.get(row));
                array.set(row, mapped);
            }
        }
    });
}

pub(super) fn apply_values<R, C, F>(frame: &mut Frame<R, C>, f: &F) -> Result<(), TypeError>
where
    R: FrameKey,
    C: FrameKey,
    F: Fn(usize, usize, Option<Value>) -> Option<Value> + Sync,
{
    let parallel = frame.is_parallel();
    let columns = frame.columns_mut();
    let apply_one = |(ordinal, column): (usize, &mut Column)| -> Result<(), TypeError> {
        for row in 0..column.len() {
            let mapped = f(row, ordinal, column.value(row));
            column.set_value(row, mapped)?;
        }
        Ok(())
    };
    if parallel {
        pool::POOL.install(|| {
            columns
                .par_iter_mut()
                .enumerate()
                .try_for_each(apply_one)
        })
    } else {
        columns.iter_mut().enumerate().try_for_each(apply_one)
    }
}

/// Ordinal selection over one key axis: contiguous bisection, matches
/// concatenated left before right so the original ordinal order survives.
fn select_ordinals<K, P>(keys: &[K], from: usize, to: usize, threshold: usize, predicate: &P) -> Vec<usize>
where
    K: Sync,
    P: Fn(&K) -> bool + Sync,
{
    if to - from <= threshold {
        (from..to).filter(|&i| predicate(&keys[i])).collect()
    } else {
        let mid = from + (to - from) / 2;
        let (mut left, right) = rayon::join(
            || select_ordinals(keys, from, mid, threshold, predicate),
            || select_ordinals(keys, mid, to, threshold, predicate),
        );
        left.extend(right);
        left
    }
}

pub(super) fn select<R, C, PR, PC>(
    frame: &Frame<R, C>,
    row_predicate: &PR,
    col_predicate: &PC,
) -> Frame<R, C>
where
    R: FrameKey,
    C: FrameKey,
    PR: Fn(&R) -> bool + Sync,
    PC: Fn(&C) -> bool + Sync,
{
    let row_threshold = threshold_for(frame, frame.num_rows());
    let col_threshold = threshold_for(frame, frame.num_columns());
    let (row_ordinals, col_ordinals) = if frame.is_parallel() {
        pool::join(
            || select_ordinals(frame.row_keys(), 0, frame.num_rows(), row_threshold, row_predicate),
            || {
                select_ordinals(
                    frame.col_keys(),
                    0,
                    frame.num_columns(),
                    col_threshold,
                    col_predicate,
                )
            },
        )
    } else {
        (
            select_ordinals(frame.row_keys(), 0, frame.num_rows(), row_threshold, row_predicate),
            select_ordinals(
                frame.col_keys(),
                0,
                frame.num_columns(),
                col_threshold,
                col_predicate,
            ),
        )
    };

    let row_keys: Vec<R> = row_ordinals
        .iter()
        .map(|&i| frame.row_keys()[i].clone())
        .collect();
    let col_keys: Vec<C> = col_ordinals
        .iter()
        .map(|&i| frame.col_keys()[i].clone())
        .collect();
    let columns: Vec<Column> = col_ordinals
        .iter()
        .map(|&c| frame.column(c).expect("selected ordinal").copy_indexes(&row_ordinals))
        .collect();
    let schema = if frame.schema().fields().len() == frame.num_columns() {
        Schema::new(
            col_ordinals
                .iter()
                .map(|&c| frame.schema().fields()[c].clone())
                .collect(),
        )
    } else {
        Schema::default()
    };

    let mut selected =
        Frame::new(schema, row_keys, col_keys, columns).expect("selection preserves lengths");
    selected.set_parallel(frame.is_parallel());
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::{DataType, Field};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

    /// `rows x 4` frame of doubles and longs, large enough to exercise the
    /// parallel split when `rows` is.
    fn numeric_frame(rows: usize, seed: u64) -> Frame<usize, String> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut columns = Vec::new();
        let mut col_keys = Vec::new();
        for c in 0..4 {
            if c % 2 == 0 {
                let values: Vec<f64> = (0..rows).map(|_| rng.gen_range(-1e6..1e6)).collect();
                columns.push(Column::from(values));
            } else {
                let values: Vec<i64> = (0..rows).map(|_| rng.gen_range(-1_000_000..1_000_000)).collect();
                columns.push(Column::from(values));
            }
            col_keys.push(format!("c{c}"));
        }
        let fields = col_keys
            .iter()
            .enumerate()
            .map(|(c, k)| {
                Field::new(
                    k.clone(),
                    if c % 2 == 0 { DataType::Double } else { DataType::Long },
                )
            })
            .collect();
        Frame::new(Schema::new(fields), (0..rows).collect(), col_keys, columns).expect("valid")
    }

    #[test]
    fn for_each_visits_every_cell_once() {
        for rows in [7_usize, 50_000] {
            let frame = numeric_frame(rows, 1);
            let sequential = AtomicU64::new(0);
            frame.for_each_value(|cursor| {
                sequential.fetch_add(
                    (cursor.row_ordinal() + 1) as u64 * (cursor.col_ordinal() + 3) as u64,
                    AtomicOrdering::Relaxed,
                );
            });
            let parallel_count = AtomicU64::new(0);
            let frame = frame.parallel();
            frame.for_each_value(|cursor| {
                parallel_count.fetch_add(
                    (cursor.row_ordinal() + 1) as u64 * (cursor.col_ordinal() + 3) as u64,
                    AtomicOrdering::Relaxed,
                );
            });
            assert_eq!(
                sequential.load(AtomicOrdering::Relaxed),
                parallel_count.load(AtomicOrdering::Relaxed)
            );
        }
    }

    #[test]
    fn min_max_parallel_sequential_equivalence() {
        for rows in [9_usize, 50_000] {
            let frame = numeric_frame(rows, 2);
            let predicate = |v: &Value| matches!(v, Value::Double(x) if x.is_finite());
            let seq_min = frame.min_value(predicate);
            let seq_max = frame.max_value(predicate);
            let frame = frame.parallel();
            assert_eq!(seq_min, frame.min_value(predicate));
            assert_eq!(seq_max, frame.max_value(predicate));
        }
    }

    #[test]
    fn min_carries_position_and_keys() {
        let frame = Frame::new(
            Schema::default(),
            vec!["r0".to_string(), "r1".to_string()],
            vec!["a".to_string(), "b".to_string()],
            vec![Column::from(vec![4_i64, 2]), Column::from(vec![9_i64, 7])],
        )
        .expect("valid");
        let min = frame.min_value(|_| true).expect("non-empty");
        assert_eq!(min.value, Value::Long(2));
        assert_eq!(min.row_key, "r1");
        assert_eq!(min.col_key, "a");
        assert_eq!((min.row_ordinal, min.col_ordinal), (1, 0));
    }

    #[test]
    fn reduction_is_empty_when_nothing_matches() {
        let frame = numeric_frame(100, 3);
        assert_eq!(frame.min_value(|_| false), None);
        assert_eq!(frame.bounds(|_| false), None);
        let frame = frame.parallel();
        assert_eq!(frame.max_value(|_| false), None);
    }

    #[test]
    fn bounds_brackets_the_matching_values() {
        for rows in [11_usize, 50_000] {
            let frame = numeric_frame(rows, 4);
            let predicate = |v: &Value| matches!(v, Value::Long(_));
            let sequential = frame.bounds(predicate).expect("longs exist");
            let frame = frame.parallel();
            let parallel = frame.bounds(predicate).expect("longs exist");
            assert_eq!(sequential, parallel);
            assert!(sequential.0.partial_cmp(&sequential.1) != Some(Ordering::Greater));
        }
    }

    #[test]
    fn apply_doubles_touches_only_double_columns() {
        for rows in [13_usize, 50_000] {
            let mut sequential = numeric_frame(rows, 5);
            let mut parallel = numeric_frame(rows, 5).parallel();
            sequential.apply_doubles(|_, _, v| v * 2.0);
            parallel.apply_doubles(|_, _, v| v * 2.0);
            assert_eq!(sequential.sequential(), parallel.sequential());
        }
    }

    #[test]
    fn apply_values_round_trips_types() {
        let mut frame = numeric_frame(64, 6).parallel();
        let untouched = numeric_frame(64, 6);
        frame.apply_values(|_, _, v| v).expect("identity maps cleanly");
        assert_eq!(frame.sequential(), untouched);
    }

    #[test]
    fn apply_longs_uses_ordinals() {
        let mut frame = Frame::new(
            Schema::default(),
            vec![0_usize, 1],
            vec!["a".to_string(), "b".to_string()],
            vec![Column::from(vec![0_i64, 0]), Column::from(vec![0_i64, 0])],
        )
        .expect("valid");
        frame.apply_longs(|row, col, _| row as i64 * 10 + col as i64);
        assert_eq!(frame.value_at(1, 1), Some(Value::Long(11)));
        assert_eq!(frame.value_at(0, 1), Some(Value::Long(1)));
    }

    #[test]
    fn select_preserves_ordinal_order() {
        for rows in [10_usize, 50_000] {
            let frame = numeric_frame(rows, 7);
            let sequential = frame.select(|r| r % 3 == 0, |c| c != "c2");
            let parallel = frame
                .clone()
                .parallel()
                .select(|r| r % 3 == 0, |c| c != "c2");
            assert_eq!(sequential, parallel.sequential());
            assert_eq!(sequential.num_columns(), 3);
            assert!(sequential
                .row_keys()
                .windows(2)
                .all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn select_gathers_cell_values() {
        let frame = Frame::new(
            Schema::default(),
            vec![0_usize, 1, 2],
            vec!["a".to_string(), "b".to_string()],
            vec![Column::from(vec![1_i64, 2, 3]), Column::from(vec![4_i64, 5, 6])],
        )
        .expect("valid");
        let selected = frame.select(|r| *r != 1, |c| c == "b");
        assert_eq!(selected.num_rows(), 2);
        assert_eq!(selected.num_columns(), 1);
        assert_eq!(selected.value_at(0, 0), Some(Value::Long(4)));
        assert_eq!(selected.value_at(1, 0), Some(Value::Long(6)));
    }
}
