mod traverse;

pub use traverse::FrameValue;

use crate::array::TypeError;
use crate::column::Column;
use crate::datatypes::Schema;
use crate::value::Value;
use std::fmt;
use std::slice;

/// Key types usable on a frame dimension. This is the narrow seam to the
/// out-of-scope key-indexing layer: the engines below operate purely on
/// ordinals and only touch keys to resolve selections and results.
pub trait FrameKey: Clone + PartialEq + fmt::Debug + Send + Sync {}

impl<K: Clone + PartialEq + fmt::Debug + Send + Sync> FrameKey for K {}

/// A two-dimensional, column-oriented container of typed dense arrays.
///
/// `parallel()`/`sequential()` set an execution-strategy flag on the frame
/// itself; bulk operations consult it, and no aliasing view of the backing
/// buffers is ever handed out.
#[derive(Clone)]
pub struct Frame<R: FrameKey, C: FrameKey> {
    schema: Schema,
    row_keys: Vec<R>,
    col_keys: Vec<C>,
    columns: Vec<Column>,
    parallel: bool,
}

impl<R: FrameKey, C: FrameKey> Frame<R, C> {
    /// Creates a new `Frame` from keyed columns.
    ///
    /// # Errors
    ///
    /// Returns an error if the column count does not match the column keys,
    /// or any column's length does not match the row keys.
    pub fn new(
        schema: Schema,
        row_keys: Vec<R>,
        col_keys: Vec<C>,
        columns: Vec<Column>,
    ) -> Result<Self, &'static str> {
        if col_keys.len() != columns.len() {
            return Err("one key per column is required");
        }
        if columns.iter().any(|c| c.len() != row_keys.len()) {
            return Err("columns must have the same length");
        }
        Ok(Self {
            schema,
            row_keys,
            col_keys,
            columns,
            parallel: false,
        })
    }

    /// Switches bulk operations on this frame to the multi-threaded
    /// strategy.
    #[must_use]
    pub fn parallel(mut self) -> Self {
        self.parallel = true;
        self
    }

    /// Switches bulk operations on this frame to the synchronous strategy.
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

    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.row_keys.len()
    }

    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Returns an `Iterator` over the columns.
    pub fn columns(&self) -> slice::Iter<'_, Column> {
        self.columns.iter()
    }

    /// Returns an immutable reference to a specific column.
    #[must_use]
    pub fn column(&self, ordinal: usize) -> Option<&Column> {
        self.columns.get(ordinal)
    }

    #[must_use]
    pub fn column_mut(&mut self, ordinal: usize) -> Option<&mut Column> {
        self.columns.get_mut(ordinal)
    }

    pub(crate) fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    #[must_use]
    pub fn row_keys(&self) -> &[R] {
        &self.row_keys
    }

    #[must_use]
    pub fn col_keys(&self) -> &[C] {
        &self.col_keys
    }

    /// Ordinal of the first row with the given key.
    #[must_use]
    pub fn row_ordinal(&self, key: &R) -> Option<usize> {
        self.row_keys.iter().position(|k| k == key)
    }

    /// Ordinal of the first column with the given key.
    #[must_use]
    pub fn col_ordinal(&self, key: &C) -> Option<usize> {
        self.col_keys.iter().position(|k| k == key)
    }

    /// Boxed view of the cell at (`row`, `col`).
    ///
    /// # Panics
    ///
    /// Panics if either ordinal is out of bounds.
    #[must_use]
    pub fn value_at(&self, row: usize, col: usize) -> Option<Value> {
        assert!(
            col < self.columns.len(),
            "index out of bounds: column {col} >= {}",
            self.columns.len()
        );
        self.columns[col].value(row)
    }

    /// Stores a boxed value at (`row`, `col`).
    ///
    /// # Errors
    ///
    /// Returns an error if the value's variant does not match the column
    /// type.
    ///
    /// # Panics
    ///
    /// Panics if either ordinal is out of bounds.
    pub fn set_value_at(
        &mut self,
        row: usize,
        col: usize,
        value: Option<Value>,
    ) -> Result<(), TypeError> {
        assert!(
            col < self.columns.len(),
            "index out of bounds: column {col} >= {}",
            self.columns.len()
        );
        self.columns[col].set_value(row, value)
    }

    /// A positionable accessor over this frame's cells.
    #[must_use]
    pub fn cursor(&self) -> FrameCursor<'_, R, C> {
        FrameCursor {
            frame: self,
            row: 0,
            col: 0,
        }
    }

    /// Moves all the rows of `other` into `self`, leaving `other` empty.
    ///
    /// # Panics
    ///
    /// Panics if the column types or counts differ.
    pub fn append(&mut self, other: &mut Self) {
        assert!(
            self.columns.len() == other.columns.len(),
            "unsupported operation: appending a frame with a different column count"
        );
        let to_index = self.row_keys.len();
        for (self_col, other_col) in self.columns.iter_mut().zip(&other.columns) {
            append_column(self_col, other_col, to_index)
                .expect("unsupported operation: appending a frame with different column types");
        }
        self.row_keys.append(&mut other.row_keys);
        for column in &mut other.columns {
            *column = column.copy_range(0, 0);
        }
    }

    /// Visits every cell. In parallel mode the column-major linear index
    /// space `[0, rows * cols)` bisects at its midpoint down to a
    /// pool-derived threshold, each leaf sweeping with its own cursor;
    /// sequential mode is a single synchronous sweep.
    pub fn for_each_value<F>(&self, f: F)
    where
        F: Fn(&FrameCursor<'_, R, C>) + Sync,
    {
        traverse::for_each_value(self, &f);
    }

    /// Elementwise in-place mapping over every boolean-typed cell.
    pub fn apply_booleans<F>(&mut self, f: F)
    where
        F: Fn(usize, usize, bool) -> bool + Sync,
    {
        traverse::apply_booleans(self, &f);
    }

    /// Elementwise in-place mapping over every int-typed cell.
    pub fn apply_ints<F>(&mut self, f: F)
    where
        F: Fn(usize, usize, i32) -> i32 + Sync,
    {
        traverse::apply_ints(self, &f);
    }

    /// Elementwise in-place mapping over every long-typed cell.
    pub fn apply_longs<F>(&mut self, f: F)
    where
        F: Fn(usize, usize, i64) -> i64 + Sync,
    {
        traverse::apply_longs(self, &f);
    }

    /// Elementwise in-place mapping over every double-typed cell.
    pub fn apply_doubles<F>(&mut self, f: F)
    where
        F: Fn(usize, usize, f64) -> f64 + Sync,
    {
        traverse::apply_doubles(self, &f);
    }

    /// Elementwise in-place mapping over every cell through the boxed view.
    ///
    /// # Errors
    ///
    /// Returns an error if the mapper produces a value whose variant does
    /// not match its column.
    pub fn apply_values<F>(&mut self, f: F) -> Result<(), TypeError>
    where
        F: Fn(usize, usize, Option<Value>) -> Option<Value> + Sync,
    {
        traverse::apply_values(self, &f)
    }

    /// Smallest cell value satisfying `predicate`, with its position and
    /// keys; `None` when nothing matches.
    #[must_use]
    pub fn min_value<P>(&self, predicate: P) -> Option<FrameValue<R, C>>
    where
        P: Fn(&Value) -> bool + Sync,
    {
        traverse::extremum(self, &predicate, false)
    }

    /// Largest cell value satisfying `predicate`.
    #[must_use]
    pub fn max_value<P>(&self, predicate: P) -> Option<FrameValue<R, C>>
    where
        P: Fn(&Value) -> bool + Sync,
    {
        traverse::extremum(self, &predicate, true)
    }

    /// Smallest and largest cell values satisfying `predicate`.
    #[must_use]
    pub fn bounds<P>(&self, predicate: P) -> Option<(Value, Value)>
    where
        P: Fn(&Value) -> bool + Sync,
    {
        traverse::bounds(self, &predicate)
    }

    /// Copies the sub-frame whose row and column keys satisfy the two
    /// predicates. Key selection runs as two independent tasks, each
    /// splitting its ordinal range and concatenating matches in ordinal
    /// order (left results before right).
    #[must_use]
    pub fn select<PR, PC>(&self, row_predicate: PR, col_predicate: PC) -> Self
    where
        PR: Fn(&R) -> bool + Sync,
        PC: Fn(&C) -> bool + Sync,
    {
        traverse::select(self, &row_predicate, &col_predicate)
    }
}

fn append_column(to: &mut Column, from: &Column, to_index: usize) -> Result<(), TypeError> {
    if to.data_type() != from.data_type() {
        return Err(TypeError);
    }
    let from_indexes: Vec<usize> = (0..from.len()).collect();
    let to_indexes: Vec<usize> = (to_index..to_index + from.len()).collect();
    to.update(from, &from_indexes, &to_indexes)
}

impl<R: FrameKey, C: FrameKey> PartialEq for Frame<R, C> {
    fn eq(&self, other: &Self) -> bool {
        self.row_keys == other.row_keys
            && self.col_keys == other.col_keys
            && self.columns == other.columns
    }
}

impl<R: FrameKey, C: FrameKey> fmt::Debug for Frame<R, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("rows", &self.num_rows())
            .field("columns", &self.columns)
            .finish()
    }
}

/// A reusable positionable accessor over one frame's cells.
pub struct FrameCursor<'a, R: FrameKey, C: FrameKey> {
    frame: &'a Frame<R, C>,
    row: usize,
    col: usize,
}

impl<'a, R: FrameKey, C: FrameKey> FrameCursor<'a, R, C> {
    /// Positions this cursor at (`row`, `col`).
    ///
    /// # Panics
    ///
    /// Panics if either ordinal is out of bounds.
    pub fn at(&mut self, row: usize, col: usize) -> &mut Self {
        assert!(
            row < self.frame.num_rows() && col < self.frame.num_columns(),
            "index out of bounds: ({row}, {col}) on {}x{}",
            self.frame.num_rows(),
            self.frame.num_columns()
        );
        self.row = row;
        self.col = col;
        self
    }

    #[must_use]
    pub fn row_ordinal(&self) -> usize {
        self.row
    }

    #[must_use]
    pub fn col_ordinal(&self) -> usize {
        self.col
    }

    #[must_use]
    pub fn row_key(&self) -> &'a R {
        &self.frame.row_keys[self.row]
    }

    #[must_use]
    pub fn col_key(&self) -> &'a C {
        &self.frame.col_keys[self.col]
    }

    #[must_use]
    pub fn value(&self) -> Option<Value> {
        self.frame.columns[self.col].value(self.row)
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        self.frame.columns[self.col].is_null(self.row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::{DataType, Field};

    fn sample_frame() -> Frame<i64, String> {
        let schema = Schema::new(vec![
            Field::new("len", DataType::Long),
            Field::new("score", DataType::Double),
        ]);
        Frame::new(
            schema,
            vec![10, 11, 12],
            vec!["len".to_string(), "score".to_string()],
            vec![
                Column::from(vec![5_i64, 6, 7]),
                Column::from(vec![0.5, f64::NAN, 2.0]),
            ],
        )
        .expect("valid columns")
    }

    #[test]
    fn frame_new_validates_lengths() {
        let err = Frame::new(
            Schema::default(),
            vec![0_i64],
            vec!["a".to_string()],
            vec![Column::from(vec![1_i64, 2])],
        );
        assert_eq!(err.err(), Some("columns must have the same length"));

        let empty = Frame::<i64, String>::new(Schema::default(), Vec::new(), Vec::new(), Vec::new())
            .expect("creating an empty frame should not fail");
        assert_eq!(empty.num_rows(), 0);
        assert_eq!(empty.num_columns(), 0);
    }

    #[test]
    fn cursor_reads_cells_and_keys() {
        let frame = sample_frame();
        let mut cursor = frame.cursor();
        cursor.at(2, 0);
        assert_eq!(cursor.value(), Some(Value::Long(7)));
        assert_eq!(*cursor.row_key(), 12);
        assert_eq!(cursor.col_key(), "len");
    }

    #[test]
    fn append_moves_rows() {
        let mut frame = sample_frame();
        let mut other = sample_frame();
        frame.append(&mut other);
        assert_eq!(frame.num_rows(), 6);
        assert_eq!(other.num_rows(), 0);
        assert_eq!(frame.value_at(4, 0), Some(Value::Long(6)));
    }

    #[test]
    fn null_channel_shows_through() {
        let frame = sample_frame();
        let mut cursor = frame.cursor();
        cursor.at(1, 1);
        assert!(cursor.is_null());
        assert_eq!(cursor.value(), None);
    }
}
