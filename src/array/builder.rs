use super::TypeError;
use crate::coding::TableCoding;
use crate::column::Column;
use crate::datatypes::DataType;
use crate::value::Value;
use std::cmp;
use std::sync::Arc;

/// Streaming accumulator used by source adapters to populate a column
/// without knowing the concrete array variant.
///
/// The builder presizes to the declared capacity and grows the backing
/// column geometrically past it, so per-element appends stay amortized even
/// over the exact-growth primitive arrays.
pub struct ArrayBuilder {
    inner: Inner,
    len: usize,
}

enum Inner {
    Column(Column),
    /// Enum targets accumulate raw labels; the lookup table is built from
    /// the distinct labels at finalization.
    Labels(Vec<Option<String>>),
}

impl ArrayBuilder {
    /// Creates a builder for the given target type, presized to `capacity`
    /// elements. Enum targets accumulate labels and derive their coding from
    /// the distinct labels at finalization.
    #[must_use]
    pub fn with_capacity(data_type: DataType, capacity: usize) -> Self {
        let inner = match data_type {
            DataType::Enum => Inner::Labels(Vec::with_capacity(capacity)),
            other => Inner::Column(Column::of(other, capacity)),
        };
        Self { inner, len: 0 }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends a boxed value; `None` appends the target's default.
    ///
    /// # Errors
    ///
    /// Returns an error if the value's variant does not match the target
    /// type.
    pub fn add_value(&mut self, value: Option<Value>) -> Result<(), TypeError> {
        match &mut self.inner {
            Inner::Labels(labels) => {
                let label = match value {
                    None => None,
                    Some(Value::Text(text)) => Some(text),
                    Some(_) => return Err(TypeError),
                };
                labels.push(label);
            }
            Inner::Column(column) => {
                if self.len == column.len() {
                    let grown = cmp::max(self.len + 1, self.len + self.len / 2);
                    column.expand(grown);
                }
                column.set_value(self.len, value)?;
            }
        }
        self.len += 1;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the target is not a boolean column.
    pub fn add_boolean(&mut self, value: bool) -> Result<(), TypeError> {
        self.add_value(Some(Value::Bool(value)))
    }

    /// # Errors
    ///
    /// Returns an error if the target is not an int column.
    pub fn add_int(&mut self, value: i32) -> Result<(), TypeError> {
        self.add_value(Some(Value::Int(value)))
    }

    /// # Errors
    ///
    /// Returns an error if the target is not a long column.
    pub fn add_long(&mut self, value: i64) -> Result<(), TypeError> {
        self.add_value(Some(Value::Long(value)))
    }

    /// # Errors
    ///
    /// Returns an error if the target is not a double column.
    pub fn add_double(&mut self, value: f64) -> Result<(), TypeError> {
        self.add_value(Some(Value::Double(value)))
    }

    /// Finalizes into a column of exactly the appended length.
    #[must_use]
    pub fn build(self) -> Column {
        match self.inner {
            Inner::Column(column) => {
                if self.len == column.len() {
                    column
                } else {
                    column.copy_range(0, self.len)
                }
            }
            Inner::Labels(labels) => {
                let coding = Arc::new(TableCoding::of(labels.iter().flatten().cloned()));
                let mut column = Column::coded_enum(labels.len(), Arc::clone(&coding));
                for (i, label) in labels.into_iter().enumerate() {
                    column
                        .set_value(i, label.map(Value::Text))
                        .expect("label column accepts text");
                }
                column
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_exact_length() {
        let mut builder = ArrayBuilder::with_capacity(DataType::Long, 8);
        for v in [5_i64, 6, 7] {
            builder.add_long(v).unwrap();
        }
        let column = builder.build();
        assert_eq!(column.len(), 3);
        assert_eq!(column.value(2), Some(Value::Long(7)));
    }

    #[test]
    fn grows_past_declared_capacity() {
        let mut builder = ArrayBuilder::with_capacity(DataType::Double, 1);
        for i in 0..100 {
            builder.add_double(f64::from(i)).unwrap();
        }
        let column = builder.build();
        assert_eq!(column.len(), 100);
        assert_eq!(column.value(99), Some(Value::Double(99.0)));
    }

    #[test]
    fn enum_target_derives_its_coding_from_the_data() {
        let mut builder = ArrayBuilder::with_capacity(DataType::Enum, 4);
        for label in ["green", "red", "green", "red"] {
            builder.add_value(Some(Value::Text(label.to_string()))).unwrap();
        }
        let column = builder.build();
        assert_eq!(column.data_type(), DataType::Enum);
        assert_eq!(column.len(), 4);
        assert_eq!(column.value(1), Some(Value::Text("red".to_string())));
        assert_eq!(
            column.distinct(10),
            vec![
                Value::Text("green".to_string()),
                Value::Text("red".to_string())
            ]
        );
    }

    #[test]
    fn type_mismatch_is_rejected() {
        let mut builder = ArrayBuilder::with_capacity(DataType::Int, 2);
        assert_eq!(builder.add_long(1), Err(TypeError));
        builder.add_int(1).unwrap();
        assert_eq!(builder.build().len(), 1);
    }

    #[test]
    fn null_appends_store_the_default() {
        let mut builder = ArrayBuilder::with_capacity(DataType::Double, 2);
        builder.add_value(None).unwrap();
        builder.add_double(1.5).unwrap();
        let column = builder.build();
        assert!(column.is_null(0));
        assert_eq!(column.value(1), Some(Value::Double(1.5)));
    }
}
