use crate::schema::{Field, StructType};
use std::sync::Arc;

/// A decoded field value
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    UInt(u64),
    SInt(i64),
    Float(f64),
    Str(String),
    Enum { value: i128, label: Arc<str> },
    Record(Record),
    Array(Vec<Value>),
}

impl Value {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt(v) => Some(*v),
            Value::SInt(v) => u64::try_from(*v).ok(),
            Value::Enum { value, .. } => u64::try_from(*value).ok(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::UInt(v) => i64::try_from(*v).ok(),
            Value::SInt(v) => Some(*v),
            Value::Enum { value, .. } => i64::try_from(*value).ok(),
            _ => None,
        }
    }

    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::UInt(v) => Some(i128::from(*v)),
            Value::SInt(v) => Some(i128::from(*v)),
            Value::Enum { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Enumeration label
    pub fn label(&self) -> Option<&str> {
        match self {
            Value::Enum { label, .. } => Some(label.as_ref()),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a.as_slice()),
            _ => None,
        }
    }
}

/// A decoded struct instance: one value per field of its layout.
///
/// When the struct had a variant, the layout is the selected branch's.
#[derive(Clone, Debug)]
pub struct Record {
    layout: Arc<StructType>,
    values: Vec<Value>,
}

impl Record {
    pub(crate) fn new(layout: Arc<StructType>, values: Vec<Value>) -> Self {
        debug_assert_eq!(layout.fields().len(), values.len());
        Self { layout, values }
    }

    pub fn layout(&self) -> &Arc<StructType> {
        &self.layout
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Fields in declaration order
    pub fn fields(&self) -> impl Iterator<Item = (&Field, &Value)> {
        self.layout.fields().iter().zip(self.values.iter())
    }

    /// Looks up the last field named `name`
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.layout.field_index(name).map(|i| &self.values[i])
    }

    pub fn get_field(&self, name: &str) -> Option<(&Field, &Value)> {
        self.layout
            .field_index(name)
            .map(|i| (&self.layout.fields()[i], &self.values[i]))
    }

    pub fn uint(&self, name: &str) -> Option<u64> {
        self.get(name).and_then(Value::as_u64)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
            && (Arc::ptr_eq(&self.layout, &other.layout)
                || self
                    .layout
                    .fields()
                    .iter()
                    .map(Field::name)
                    .eq(other.layout.fields().iter().map(Field::name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_conversions() {
        assert_eq!(Value::UInt(5).as_i64(), Some(5));
        assert_eq!(Value::UInt(u64::MAX).as_i64(), None);
        assert_eq!(Value::SInt(-1).as_u64(), None);
        assert_eq!(Value::SInt(-1).as_i128(), Some(-1));
        let e = Value::Enum {
            value: 7,
            label: Arc::from("seven"),
        };
        assert_eq!(e.as_u64(), Some(7));
        assert_eq!(e.label(), Some("seven"));
        assert_eq!(Value::Str("x".into()).as_u64(), None);
        assert_eq!(Value::Float(0.5).as_f64(), Some(0.5));
    }
}
