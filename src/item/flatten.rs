use std::cell::Cell;

use log::debug;

use crate::{
    core::item::{ItemProcessor, ItemProcessorResult},
    record::{FlatRecord, Record},
};

/// Default prefix of the fields produced from metadata entries.
pub const DEFAULT_METADATA_PREFIX: &str = "Metadata_";

/// Folds a record's metadata entries into its attributes.
///
/// The record's attributes are copied as they are. Every metadata entry with a
/// non-empty `key` then sets the field `<prefix><key>` to its `value`; an entry
/// without a `value` still creates the field, holding no value. Entries
/// without a key are skipped. A later entry overwrites an earlier field of the
/// same name, attribute or metadata alike.
///
/// # Examples
///
/// ```
/// use record_flatten::core::item::ItemProcessor;
/// use record_flatten::item::flatten::MetadataFlattener;
/// use record_flatten::record::{MetadataEntry, Record};
///
/// let record = Record {
///     attributes: vec![("id".to_string(), "1".to_string())],
///     metadata: vec![
///         MetadataEntry::new(Some("color"), Some("red")),
///         MetadataEntry::new(None, Some("ignored")),
///     ],
/// };
///
/// let flattener = MetadataFlattener::default();
/// let flat = flattener.process(&record).unwrap();
///
/// assert_eq!(flat.keys().collect::<Vec<_>>(), vec!["id", "Metadata_color"]);
/// assert_eq!(flat.get("Metadata_color"), Some("red"));
/// assert_eq!(flattener.skipped_count(), 1);
/// ```
pub struct MetadataFlattener {
    prefix: String,
    folded_count: Cell<usize>,
    skipped_count: Cell<usize>,
}

impl Default for MetadataFlattener {
    fn default() -> Self {
        Self::new(DEFAULT_METADATA_PREFIX)
    }
}

impl MetadataFlattener {
    pub fn new<S: AsRef<str>>(prefix: S) -> Self {
        Self {
            prefix: prefix.as_ref().to_string(),
            folded_count: Cell::new(0),
            skipped_count: Cell::new(0),
        }
    }

    /// Number of metadata entries turned into fields so far.
    pub fn folded_count(&self) -> usize {
        self.folded_count.get()
    }

    /// Number of metadata entries dropped for lack of a key so far.
    pub fn skipped_count(&self) -> usize {
        self.skipped_count.get()
    }
}

impl ItemProcessor<Record, FlatRecord> for MetadataFlattener {
    fn process(&self, item: &Record) -> ItemProcessorResult<FlatRecord> {
        let mut flat = FlatRecord::new();
        for (name, value) in &item.attributes {
            flat.insert(name.as_str(), Some(value.clone()));
        }

        for entry in &item.metadata {
            match entry.key.as_deref() {
                Some(key) if !key.is_empty() => {
                    flat.insert(format!("{}{}", self.prefix, key), entry.value.clone());
                    self.folded_count.set(self.folded_count.get() + 1);
                }
                _ => {
                    debug!("Skipping metadata entry without key: {:?}", entry);
                    self.skipped_count.set(self.skipped_count.get() + 1);
                }
            }
        }

        Ok(flat)
    }
}
