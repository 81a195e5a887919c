use super::Transform;
use model::core::value::Record;
use std::collections::HashSet;

/// Drops every field that is not in the allow-list.
#[derive(Debug, Clone)]
pub struct FieldProjection {
    keep: HashSet<String>,
}

impl FieldProjection {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keep: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// `None` when every field is kept.
    pub fn from_allow_list(fields: Option<&[String]>) -> Option<Self> {
        fields.map(|fields| Self::new(fields.iter().cloned()))
    }
}

impl Transform for FieldProjection {
    fn apply(&self, record: &mut Record) {
        record.retain(|key, _| self.keep.contains(key));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keys_outside_allow_list_are_dropped() {
        let projection = FieldProjection::new(["id", "missing"]);
        let mut record = Record::try_from(json!({"name": "x", "id": 1, "age": 2})).unwrap();
        projection.apply(&mut record);

        assert_eq!(record, Record::try_from(json!({"id": 1})).unwrap());
    }

    #[test]
    fn test_no_allow_list_means_no_projection() {
        assert!(FieldProjection::from_allow_list(None).is_none());
        let fields = vec!["id".to_string()];
        assert!(FieldProjection::from_allow_list(Some(fields.as_slice())).is_some());
    }
}
