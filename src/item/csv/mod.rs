//! CSV support for writing flattened records as a table, and reading such a
//! table back.
//!
//! # Module Architecture
//!
//! 1. **CsvTableWriter**: buffers [`FlatRecord`](crate::record::FlatRecord)s
//!    and, once the step closes it, writes a header made of the union of all
//!    field names (first appearance first) followed by one row per record.
//!
//! 2. **CsvTableReader**: reads a headed CSV table into flat records, mainly
//!    to check that a produced table survives a read/write round trip.
//!
//! Both are built with builders and implement the core `ItemWriter` and
//! `ItemReader` traits, so they plug into a step like any other item stream.
//! Quoting follows the `csv` crate defaults: fields containing the
//! delimiter, a quote or a line break are quoted, quotes are doubled.
//!
//! # Examples
//!
//! ```
//! use record_flatten::core::item::{ItemReader, ItemWriter};
//! use record_flatten::item::csv::csv_reader::CsvTableReaderBuilder;
//! use record_flatten::item::csv::csv_writer::CsvTableWriterBuilder;
//!
//! let table = "id,comment\n1,\"needs, quoting\"\n2,\n";
//!
//! let reader = CsvTableReaderBuilder::new().from_reader(table.as_bytes()).unwrap();
//! let writer = CsvTableWriterBuilder::new().from_writer(Vec::new());
//!
//! while let Some(record) = reader.read().unwrap() {
//!     writer.write(&[record]).unwrap();
//! }
//! writer.close().unwrap();
//!
//! assert_eq!(String::from_utf8(writer.into_inner().unwrap()).unwrap(), table);
//! ```

/// A module providing facilities for reading CSV tables.
pub mod csv_reader;

/// A module providing facilities for writing CSV tables.
pub mod csv_writer;
