use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Read, Write};
use strum_macros::EnumString;

/// Supported element types.
#[derive(Clone, Copy, Debug, Deserialize, EnumString, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "snake_case")]
pub enum DataType {
    Boolean,
    Int,
    Long,
    Double,
    Utf8,
    Utf16,
    Enum,
    Date,
    DateTime,
    Time,
    Zoned,
    Object,
}

/// Rust-native counterpart of a fixed-width element type.
pub trait NativeType:
    fmt::Debug + fmt::Display + Send + Sync + Copy + PartialEq + PartialOrd + Default + 'static
{
    /// Total ordering usable by the sort engine. For floats this is IEEE-754
    /// `total_cmp`, which places NaN after every finite value.
    fn total_cmp(&self, other: &Self) -> Ordering;

    /// An injective 64-bit key for hashing (floats by bit pattern).
    fn to_key(self) -> u64;

    /// Whether this stored value occupies the type's null channel.
    fn is_null_value(self) -> bool {
        false
    }

    fn into_json_value(self) -> Option<JsonValue>;

    fn write_le<W: Write>(self, writer: &mut W) -> io::Result<()>;

    fn read_le<R: Read>(reader: &mut R) -> io::Result<Self>;
}

impl NativeType for bool {
    fn total_cmp(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn to_key(self) -> u64 {
        u64::from(self)
    }

    fn into_json_value(self) -> Option<JsonValue> {
        Some(JsonValue::Bool(self))
    }

    fn write_le<W: Write>(self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&[u8::from(self)])
    }

    fn read_le<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut buf = [0_u8; 1];
        reader.read_exact(&mut buf)?;
        Ok(buf[0] != 0)
    }
}

impl NativeType for i32 {
    fn total_cmp(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    #[allow(clippy::cast_sign_loss)]
    fn to_key(self) -> u64 {
        u64::from(self as u32)
    }

    fn into_json_value(self) -> Option<JsonValue> {
        Some(JsonValue::Number(self.into()))
    }

    fn write_le<W: Write>(self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.to_le_bytes())
    }

    fn read_le<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut buf = [0_u8; 4];
        reader.read_exact(&mut buf)?;
        Ok(Self::from_le_bytes(buf))
    }
}

impl NativeType for i64 {
    fn total_cmp(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    #[allow(clippy::cast_sign_loss)]
    fn to_key(self) -> u64 {
        self as u64
    }

    fn into_json_value(self) -> Option<JsonValue> {
        Some(JsonValue::Number(self.into()))
    }

    fn write_le<W: Write>(self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.to_le_bytes())
    }

    fn read_le<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut buf = [0_u8; 8];
        reader.read_exact(&mut buf)?;
        Ok(Self::from_le_bytes(buf))
    }
}

impl NativeType for f64 {
    fn total_cmp(&self, other: &Self) -> Ordering {
        f64::total_cmp(self, other)
    }

    fn to_key(self) -> u64 {
        self.to_bits()
    }

    fn is_null_value(self) -> bool {
        self.is_nan()
    }

    fn into_json_value(self) -> Option<JsonValue> {
        serde_json::Number::from_f64(self).map(JsonValue::Number)
    }

    fn write_le<W: Write>(self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.to_le_bytes())
    }

    fn read_le<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut buf = [0_u8; 8];
        reader.read_exact(&mut buf)?;
        Ok(Self::from_le_bytes(buf))
    }
}

/// Trait indicating a primitive fixed-width element type.
pub trait PrimitiveType: 'static {
    /// Corresponding Rust native type for the primitive type.
    type Native: NativeType;

    /// Returns the data type tag for this primitive type.
    fn data_type() -> DataType;

    /// Returns the value substituted for null entries by default.
    fn default_value() -> Self::Native;
}

pub struct BooleanType;
pub struct IntType;
pub struct LongType;
pub struct DoubleType;

impl PrimitiveType for BooleanType {
    type Native = bool;

    fn data_type() -> DataType {
        DataType::Boolean
    }

    fn default_value() -> bool {
        false
    }
}

impl PrimitiveType for IntType {
    type Native = i32;

    fn data_type() -> DataType {
        DataType::Int
    }

    fn default_value() -> i32 {
        0
    }
}

impl PrimitiveType for LongType {
    type Native = i64;

    fn data_type() -> DataType {
        DataType::Long
    }

    fn default_value() -> i64 {
        0
    }
}

impl PrimitiveType for DoubleType {
    type Native = f64;

    fn data_type() -> DataType {
        DataType::Double
    }

    /// NaN doubles as the null channel for `Double` columns.
    fn default_value() -> f64 {
        f64::NAN
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Field {
    name: String,
    data_type: DataType,
}

impl Field {
    pub fn new<N: Into<String>>(name: N, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }
}

/// Describes the meta-data of an ordered sequence of columns.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Schema {
    fields: Vec<Field>,
    /// A map of key-value pairs containing additional meta data.
    #[serde(default)]
    metadata: HashMap<String, String>,
}

impl Schema {
    /// Creates a new `Schema` from a sequence of `Field` values.
    #[must_use]
    pub fn new(fields: Vec<Field>) -> Self {
        Self::with_metadata(fields, HashMap::new())
    }

    /// Creates a new `Schema` from a sequence of `Field` values
    /// and adds additional metadata in form of key value pairs.
    #[must_use]
    pub fn with_metadata(fields: Vec<Field>, metadata: HashMap<String, String>) -> Self {
        Self { fields, metadata }
    }

    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    #[must_use]
    pub fn field_with_name(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name() == name)
    }

    /// Returns an immutable reference to the map of custom metadata key-value pairs.
    #[must_use]
    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn data_type_from_str() {
        assert_eq!(DataType::from_str("date_time").unwrap(), DataType::DateTime);
        assert_eq!(DataType::from_str("utf8").unwrap(), DataType::Utf8);
        assert!(DataType::from_str("decimal").is_err());
    }

    #[test]
    fn native_round_trip() {
        let mut buf = Vec::new();
        1.5_f64.write_le(&mut buf).unwrap();
        (-7_i32).write_le(&mut buf).unwrap();
        true.write_le(&mut buf).unwrap();
        let mut cursor = buf.as_slice();
        assert_eq!(f64::read_le(&mut cursor).unwrap(), 1.5);
        assert_eq!(i32::read_le(&mut cursor).unwrap(), -7);
        assert!(bool::read_le(&mut cursor).unwrap());
    }

    #[test]
    fn nan_is_the_double_null_channel() {
        assert!(DoubleType::default_value().is_null_value());
        assert!(!IntType::default_value().is_null_value());
    }

    #[test]
    fn schema_lookup() {
        let schema = Schema::new(vec![
            Field::new("ts", DataType::DateTime),
            Field::new("len", DataType::Long),
        ]);
        assert_eq!(schema.fields().len(), 2);
        assert_eq!(
            schema.field_with_name("ts").map(Field::data_type),
            Some(DataType::DateTime)
        );
        assert!(schema.field_with_name("missing").is_none());
    }
}
