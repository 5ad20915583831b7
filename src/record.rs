//! Records as read from the export and their flattened, tabular form.

use std::collections::HashSet;

/// One nested key/value element of a [`Record`].
///
/// Both attributes are optional in the source document; see
/// [`MetadataFlattener`](crate::item::flatten::MetadataFlattener) for how
/// missing ones are handled.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetadataEntry {
    pub key: Option<String>,
    pub value: Option<String>,
}

impl MetadataEntry {
    pub fn new(key: Option<&str>, value: Option<&str>) -> Self {
        Self {
            key: key.map(str::to_string),
            value: value.map(str::to_string),
        }
    }
}

/// One `Record` element: its attributes in document order and its direct
/// metadata children.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    pub attributes: Vec<(String, String)>,
    pub metadata: Vec<MetadataEntry>,
}

/// A flattened record: field name to optional value, in first-insertion order.
///
/// A field holding `None` exists (it contributes a column) but has no value;
/// it is rendered as an empty cell.
///
/// ```
/// use record_flatten::record::FlatRecord;
///
/// let mut record = FlatRecord::new();
/// record.insert("id", Some("1".to_string()));
/// record.insert("name", Some("A".to_string()));
/// record.insert("id", Some("2".to_string()));
///
/// assert_eq!(record.keys().collect::<Vec<_>>(), vec!["id", "name"]);
/// assert_eq!(record.get("id"), Some("2"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FlatRecord {
    fields: Vec<(String, Option<String>)>,
}

impl FlatRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name` to `value`. An existing field keeps its position and only
    /// has its value replaced.
    pub fn insert<S: Into<String>>(&mut self, name: S, value: Option<String>) {
        let name = name.into();
        match self.fields.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.fields.iter().any(|(key, _)| key == name)
    }

    /// Value of `name`, `None` when the field is missing or holds no value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .and_then(|(_, value)| value.as_deref())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(key, _)| key.as_str())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.fields
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FlatRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = FlatRecord::new();
        for (key, value) in iter {
            record.insert(key, Some(value.into()));
        }
        record
    }
}

/// Every flattened record of a run, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    rows: Vec<FlatRecord>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: FlatRecord) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[FlatRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Union of all field names across rows, in order of first appearance.
    pub fn columns(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .flat_map(FlatRecord::keys)
            .filter(|key| seen.insert(*key))
            .collect()
    }

    /// Cells of `row` laid out along `columns`; missing fields are empty.
    pub fn cells<'a>(row: &'a FlatRecord, columns: &[&str]) -> Vec<&'a str> {
        columns
            .iter()
            .map(|column| row.get(column).unwrap_or(""))
            .collect()
    }
}

impl FromIterator<FlatRecord> for Table {
    fn from_iter<I: IntoIterator<Item = FlatRecord>>(iter: I) -> Self {
        Table {
            rows: iter.into_iter().collect(),
        }
    }
}
