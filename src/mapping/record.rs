//! Ordered string-keyed record produced for each data row of a grid.

use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::Serialize;
use serde::Serializer;

/// A single data row keyed by the header row's field names.
///
/// Keys keep the order of the header row. Assigning a key that is already
/// present replaces its value but keeps its original position, so a header
/// with duplicate names yields the value of the right-most column.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty record able to hold `capacity` fields without reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Record {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Sets `name` to `value`.
    pub fn insert(&mut self, name: &str, value: &str) {
        match self.fields.iter_mut().find(|(key, _)| key == name) {
            Some((_, slot)) => {
                slot.clear();
                slot.push_str(value);
            }
            None => self.fields.push((name.to_owned(), value.to_owned())),
        }
    }

    /// Returns the value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Field names in header order.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.iter().map(|(key, _)| key.as_str())
    }

    /// `(name, value)` pairs in header order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.fields
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Reads the record into a fixed-shape type by field name.
    ///
    /// Every value is text, so target fields are expected to be `String`
    /// (or `Option<String>` for columns that may be missing).
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::to_value(self).and_then(serde_json::from_value)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<K: AsRef<str>, V: AsRef<str>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (key, value) in iter {
            record.insert(key.as_ref(), value.as_ref());
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn insert_keeps_first_position_and_last_value() {
        let mut record = Record::new();
        record.insert("id", "1");
        record.insert("name", "Ann");
        record.insert("id", "2");

        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["id", "name"]);
        assert_eq!(record.get("id"), Some("2"));
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn serializes_in_header_order() {
        let record: Record = [("zeta", "1"), ("alpha", "2")].into_iter().collect();
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"zeta":"1","alpha":"2"}"#);
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Variable {
        pff_variable: String,
        domain: String,
        #[serde(default)]
        notes: Option<String>,
    }

    #[test]
    fn parse_into_fixed_shape() {
        let record: Record = [("domain", "housing"), ("pff_variable", "hu1")]
            .into_iter()
            .collect();
        let variable: Variable = record.parse().unwrap();
        assert_eq!(
            variable,
            Variable {
                pff_variable: "hu1".to_owned(),
                domain: "housing".to_owned(),
                notes: None,
            }
        );
    }

    #[test]
    fn parse_reports_missing_field() {
        let record: Record = [("domain", "housing")].into_iter().collect();
        let error = record.parse::<Variable>().unwrap_err();
        assert!(error.to_string().contains("pff_variable"));
    }
}
