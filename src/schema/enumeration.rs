use crate::error::Error;
use crate::reader::BitRead;
use crate::schema::{IntType, Value};
use std::sync::Arc;

/// Inclusive range of container values mapped to one label
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumRange {
    pub low: i128,
    pub high: i128,
    pub label: Arc<str>,
}

impl EnumRange {
    pub fn new(low: i128, high: i128, label: &str) -> Self {
        Self {
            low,
            high,
            label: Arc::from(label),
        }
    }
}

#[derive(Clone, Debug)]
pub struct EnumType {
    name: Option<String>,
    container: Arc<IntType>,
    // Sorted by `low`
    ranges: Vec<EnumRange>,
}

impl EnumType {
    pub fn new(name: Option<String>, container: Arc<IntType>, mut ranges: Vec<EnumRange>) -> Self {
        ranges.sort_by(|a, b| a.low.cmp(&b.low).then(a.high.cmp(&b.high)));
        Self {
            name,
            container,
            ranges,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn container(&self) -> &IntType {
        &self.container
    }

    pub fn ranges(&self) -> &[EnumRange] {
        &self.ranges
    }

    pub fn label_of(&self, value: i128) -> Option<&Arc<str>> {
        let end = self.ranges.partition_point(|r| r.low <= value);
        self.ranges[..end]
            .iter()
            .rev()
            .find(|r| r.high >= value)
            .map(|r| &r.label)
    }

    pub fn decode<R: BitRead + ?Sized>(&self, r: &mut R) -> Result<Value, Error> {
        let name = || self.name.clone().unwrap_or_else(|| "<anonymous>".to_owned());
        let value = self
            .container
            .decode(r)?
            .as_i128()
            .ok_or_else(|| Error::NotAnInteger(name()))?;
        let label = self
            .label_of(value)
            .ok_or_else(|| Error::EnumOutOfRange {
                name: name(),
                value,
            })?
            .clone();
        Ok(Value::Enum { value, label })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::MemReader;
    use crate::types::ByteOrder;
    use pretty_assertions::assert_eq;

    fn header_id_enum() -> EnumType {
        EnumType::new(
            Some("id".into()),
            Arc::new(IntType::new(5, None, false).unwrap()),
            vec![
                EnumRange::new(31, 31, "extended"),
                EnumRange::new(0, 30, "compact"),
            ],
        )
    }

    #[test]
    fn ranges_are_sorted_and_searched() {
        let e = header_id_enum();
        assert_eq!(e.ranges()[0].label.as_ref(), "compact");
        assert_eq!(e.label_of(0).map(|l| l.as_ref()), Some("compact"));
        assert_eq!(e.label_of(30).map(|l| l.as_ref()), Some("compact"));
        assert_eq!(e.label_of(31).map(|l| l.as_ref()), Some("extended"));
        assert_eq!(e.label_of(32), None);
        assert_eq!(e.label_of(-1), None);
    }

    #[test]
    fn decodes_label_and_ordinal() {
        let e = header_id_enum();
        let mut r = MemReader::new(vec![31], ByteOrder::LittleEndian);
        assert_eq!(
            e.decode(&mut r).unwrap(),
            Value::Enum {
                value: 31,
                label: Arc::from("extended")
            }
        );
        assert_eq!(r.position(), 5);
    }

    #[test]
    fn out_of_range_is_an_error() {
        let e = EnumType::new(
            None,
            Arc::new(IntType::new(8, None, false).unwrap()),
            vec![EnumRange::new(1, 2, "A"), EnumRange::new(5, 5, "B")],
        );
        let mut r = MemReader::new(vec![3], ByteOrder::LittleEndian);
        assert!(matches!(
            e.decode(&mut r),
            Err(Error::EnumOutOfRange { value: 3, .. })
        ));
    }
}
