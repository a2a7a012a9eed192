use serde::{Serialize, Serializer};
use std::fmt::{self, Display, Formatter};

/// Dynamically typed scalar delivered by a driver, already decoded.
///
/// Each typed variant carries an `Option` so a column's type survives even
/// when the value is absent. `Null` is used when the driver cannot tell the
/// type of a missing value.
#[derive(Default, Debug, Clone)]
pub enum Value {
    #[default]
    Null,
    Boolean(Option<bool>),
    Int64(Option<i64>),
    Float64(Option<f64>),
    Varchar(Option<String>),
    Blob(Option<Box<[u8]>>),
}

impl Value {
    pub fn same_type(&self, other: &Self) -> bool {
        core::mem::discriminant(self) == core::mem::discriminant(other)
    }

    /// True for `Null` and for every typed variant holding `None`.
    pub fn is_null(&self) -> bool {
        matches!(
            self,
            Value::Null
                | Value::Boolean(None)
                | Value::Int64(None)
                | Value::Float64(None)
                | Value::Varchar(None)
                | Value::Blob(None)
        )
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Boolean(l), Self::Boolean(r)) => l == r,
            (Self::Int64(l), Self::Int64(r)) => l == r,
            (Self::Float64(l), Self::Float64(r)) => l == r,
            (Self::Varchar(l), Self::Varchar(r)) => l == r,
            (Self::Blob(l), Self::Blob(r)) => l == r,
            _ => self.same_type(other),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(Some(v)) => write!(f, "{v}"),
            Value::Int64(Some(v)) => write!(f, "{v}"),
            Value::Float64(Some(v)) => write!(f, "{v}"),
            Value::Varchar(Some(v)) => f.write_str(v),
            Value::Blob(Some(v)) => f.write_str(&hex::encode(v)),
            _ => f.write_str("NULL"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Boolean(Some(v)) => serializer.serialize_bool(*v),
            Value::Int64(Some(v)) => serializer.serialize_i64(*v),
            Value::Float64(Some(v)) => serializer.serialize_f64(*v),
            Value::Varchar(Some(v)) => serializer.serialize_str(v),
            Value::Blob(Some(v)) => serializer.serialize_str(&hex::encode(v)),
            _ => serializer.serialize_none(),
        }
    }
}
