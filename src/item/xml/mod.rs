//! XML support for loading an export document and reading its records.
//!
//! The whole document is parsed up front into an [`XmlDocument`] tree with
//! `quick-xml`'s event reader, so a malformed file is rejected before any
//! record is handed to a step. [`RecordItemReader`] then walks the root's
//! direct `Record` children in document order.
//!
//! # Examples
//!
//! ```
//! use record_flatten::item::xml::{RecordItemReaderBuilder, XmlDocument};
//! use record_flatten::core::item::ItemReader;
//!
//! let xml = r#"
//! <Export>
//!   <Record type="HeartRate" value="72">
//!     <MetadataEntry key="device" value="watch"/>
//!     <MetadataEntry value="no key here"/>
//!   </Record>
//! </Export>
//! "#;
//!
//! let document = XmlDocument::from_reader(xml.as_bytes()).unwrap();
//! let reader = RecordItemReaderBuilder::new().from_document(document);
//!
//! let record = reader.read().unwrap().unwrap();
//! assert_eq!(record.attributes.len(), 2);
//! assert_eq!(record.metadata.len(), 2);
//! assert!(record.metadata[1].key.is_none());
//! assert!(reader.read().unwrap().is_none());
//! ```

pub mod xml_reader;

pub use xml_reader::{
    Element, RecordItemReader, RecordItemReaderBuilder, XmlDocument, DEFAULT_METADATA_TAG,
    DEFAULT_RECORD_TAG,
};
