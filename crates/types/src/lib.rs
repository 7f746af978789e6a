mod numeric;
mod temporal;

pub use numeric::Numeric;
pub use temporal::{add_interval_to_date, add_interval_to_datetime, parse_date, parse_datetime, parse_time, Interval};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::cmp::Ordering;

/// Base column type tag, per the engine's `ColumnType` vocabulary.
///
/// `Bool` is not one of the on-disk base types the data model enumerates
/// (NanoDB has no boolean column type); it exists only as the type of
/// predicate-evaluation results and literal TRUE/FALSE tokens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum SqlType {
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Float,
    Double,
    Numeric,
    Text,
    Bool,
    Date,
    Time,
    DateTime,
    Timestamp,
    Interval,
    FilePointer,
}

impl SqlType {
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            SqlType::TinyInt
                | SqlType::SmallInt
                | SqlType::Int
                | SqlType::BigInt
                | SqlType::Float
                | SqlType::Double
                | SqlType::Numeric
        )
    }

    pub fn is_temporal(self) -> bool {
        matches!(
            self,
            SqlType::Date | SqlType::Time | SqlType::DateTime | SqlType::Timestamp
        )
    }

    /// Numeric promotion precedence: `NUMERIC > DOUBLE > FLOAT > BIGINT > INTEGER > SMALLINT > TINYINT`.
    /// Higher number wins when widening two operands.
    pub fn numeric_rank(self) -> Option<u8> {
        Some(match self {
            SqlType::TinyInt => 0,
            SqlType::SmallInt => 1,
            SqlType::Int => 2,
            SqlType::BigInt => 3,
            SqlType::Float => 4,
            SqlType::Double => 5,
            SqlType::Numeric => 6,
            _ => return None,
        })
    }

    /// The wider of two numeric types per the promotion precedence, or
    /// `None` if either is not numeric.
    pub fn widen(self, other: SqlType) -> Option<SqlType> {
        let (ra, rb) = (self.numeric_rank()?, other.numeric_rank()?);
        Some(if ra >= rb { self } else { other })
    }
}

/// Full column type descriptor: base type tag plus the parameters that only
/// apply to a subset of base types (CHAR/VARCHAR length, NUMERIC
/// precision/scale).
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ColumnType {
    pub base: SqlType,
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
}

impl ColumnType {
    pub fn simple(base: SqlType) -> Self {
        Self {
            base,
            length: None,
            precision: None,
            scale: None,
        }
    }

    pub fn varchar(length: u32) -> Self {
        Self {
            base: SqlType::Text,
            length: Some(length),
            precision: None,
            scale: None,
        }
    }

    pub fn numeric(precision: u32, scale: u32) -> Self {
        Self {
            base: SqlType::Numeric,
            length: None,
            precision: Some(precision),
            scale: Some(scale),
        }
    }
}

impl From<SqlType> for ColumnType {
    fn from(base: SqlType) -> Self {
        ColumnType::simple(base)
    }
}

/// A file pointer `{page_no, slot}`: the synthetic `#TUPLE_PTR` column type
/// every index schema carries back into its table. Mirrors
/// `common::RecordId`'s shape without introducing a dependency cycle
/// (`common` depends on `types`, not the reverse).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct FilePointer {
    pub page_no: u64,
    pub slot: u16,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub enum Value {
    TinyInt(i8),
    SmallInt(i16),
    Int(i64),
    BigInt(i64),
    Float(f32),
    Double(f64),
    Numeric(Numeric),
    Text(String),
    Bool(bool),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Timestamp(NaiveDateTime),
    Interval(Interval),
    FilePointer(FilePointer),
    Null,
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn sql_type(&self) -> SqlType {
        match self {
            Value::TinyInt(_) => SqlType::TinyInt,
            Value::SmallInt(_) => SqlType::SmallInt,
            Value::Int(_) => SqlType::Int,
            Value::BigInt(_) => SqlType::BigInt,
            Value::Float(_) => SqlType::Float,
            Value::Double(_) => SqlType::Double,
            Value::Numeric(_) => SqlType::Numeric,
            Value::Text(_) => SqlType::Text,
            Value::Bool(_) => SqlType::Bool,
            Value::Date(_) => SqlType::Date,
            Value::Time(_) => SqlType::Time,
            Value::DateTime(_) => SqlType::DateTime,
            Value::Timestamp(_) => SqlType::Timestamp,
            Value::Interval(_) => SqlType::Interval,
            Value::FilePointer(_) => SqlType::FilePointer,
            Value::Null => SqlType::Int, // untyped null has no intrinsic type
        }
    }

    /// Widen a numeric value to `Numeric` for uniform arithmetic, returning
    /// `None` for non-numeric values.
    pub fn as_numeric(&self) -> Option<Numeric> {
        Some(match self {
            Value::TinyInt(v) => Numeric::from_i64(*v as i64),
            Value::SmallInt(v) => Numeric::from_i64(*v as i64),
            Value::Int(v) => Numeric::from_i64(*v),
            Value::BigInt(v) => Numeric::from_i64(*v),
            Value::Numeric(n) => *n,
            Value::Float(v) => Numeric::from_f64_lossy(*v as f64),
            Value::Double(v) => Numeric::from_f64_lossy(*v),
            _ => return None,
        })
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::TinyInt(v) => Some(*v as f64),
            Value::SmallInt(v) => Some(*v as f64),
            Value::Int(v) => Some(*v as f64),
            Value::BigInt(v) => Some(*v as f64),
            Value::Float(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            Value::Numeric(n) => Some(n.to_f64()),
            _ => None,
        }
    }

    /// Same-type/same-family comparison used by SQL predicate evaluation:
    /// returns `None` on a cross-family mismatch so callers can surface a
    /// cast error rather than silently ordering unrelated types.
    pub fn cmp_same_type(&self, other: &Value) -> Option<Ordering> {
        use Value::*;
        match (self, other) {
            (Text(a), Text(b)) => Some(a.cmp(b)),
            (Bool(a), Bool(b)) => Some(a.cmp(b)),
            (Date(a), Date(b)) => Some(a.cmp(b)),
            (Time(a), Time(b)) => Some(a.cmp(b)),
            (DateTime(a), DateTime(b)) | (Timestamp(a), Timestamp(b)) => Some(a.cmp(b)),
            (FilePointer(a), FilePointer(b)) => Some((a.page_no, a.slot).cmp(&(b.page_no, b.slot))),
            _ => {
                let (a, b) = (self.as_numeric()?, other.as_numeric()?);
                Some(a.cmp(&b))
            }
        }
    }

    pub fn eq_same_type(&self, other: &Value) -> Option<bool> {
        self.cmp_same_type(other).map(|o| o == Ordering::Equal)
    }
}

impl numeric::Numeric {
    /// Lossy conversion from a float, used only when widening FLOAT/DOUBLE
    /// operands into the common `Numeric` arithmetic path.
    pub fn from_f64_lossy(v: f64) -> Numeric {
        const SCALE: u32 = 9;
        Numeric::new((v * 10f64.powi(SCALE as i32)).round() as i128, SCALE)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.total_cmp(other) == Ordering::Equal
    }
}
impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.total_cmp(other))
    }
}
impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        self.total_cmp(other)
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        use Value::*;
        std::mem::discriminant(self).hash(state);
        match self {
            TinyInt(v) => v.hash(state),
            SmallInt(v) => v.hash(state),
            Int(v) | BigInt(v) => v.hash(state),
            Float(v) => v.to_bits().hash(state),
            Double(v) => v.to_bits().hash(state),
            Numeric(n) => n.hash(state),
            Text(s) => s.hash(state),
            Bool(b) => b.hash(state),
            Date(d) => d.hash(state),
            Time(t) => t.hash(state),
            DateTime(dt) | Timestamp(dt) => dt.hash(state),
            Interval(iv) => iv.hash(state),
            FilePointer(fp) => fp.hash(state),
            Null => {}
        }
    }
}

impl Value {
    /// Total order over all values, used for engine-internal purposes
    /// (B-tree keys, ORDER BY, GROUP BY bucketing) where a value must always
    /// be comparable to any other. NULLs sort before everything; otherwise
    /// numeric kinds compare by value across types, and unrelated families
    /// fall back to a fixed type-rank ordering so the order is still total.
    fn total_cmp(&self, other: &Value) -> Ordering {
        use Value::*;
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Null, _) => Ordering::Less,
            (_, Null) => Ordering::Greater,
            _ => {
                if let (Some(a), Some(b)) = (self.as_numeric(), other.as_numeric()) {
                    return a.cmp(&b);
                }
                match (self, other) {
                    (Text(a), Text(b)) => a.cmp(b),
                    (Bool(a), Bool(b)) => a.cmp(b),
                    (Date(a), Date(b)) => a.cmp(b),
                    (Time(a), Time(b)) => a.cmp(b),
                    (DateTime(a), DateTime(b)) | (Timestamp(a), Timestamp(b)) => a.cmp(b),
                    (Interval(a), Interval(b)) => (a.months, a.micros).cmp(&(b.months, b.micros)),
                    (FilePointer(a), FilePointer(b)) => {
                        (a.page_no, a.slot).cmp(&(b.page_no, b.slot))
                    }
                    _ => type_rank(self).cmp(&type_rank(other)),
                }
            }
        }
    }
}

fn type_rank(v: &Value) -> u8 {
    use Value::*;
    match v {
        Bool(_) => 0,
        TinyInt(_) | SmallInt(_) | Int(_) | BigInt(_) | Float(_) | Double(_) | Numeric(_) => 1,
        Text(_) => 2,
        Date(_) => 3,
        Time(_) => 4,
        DateTime(_) | Timestamp(_) => 5,
        Interval(_) => 6,
        FilePointer(_) => 7,
        Null => unreachable!("Null handled before type_rank"),
    }
}
