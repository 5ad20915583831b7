#![cfg_attr(docsrs, feature(doc_cfg))]

/*!
 # Record Flatten

 Turns an XML export made of `Record` elements into a CSV table.

 Each `Record` becomes one row. Its attributes become columns, and each of its
 `MetadataEntry` children adds one more column named `Metadata_<key>` holding
 the entry's `value`. The header is the union of every column seen, in order
 of first appearance; a row missing a column leaves that cell empty.

 ```text
 <Export>
   <Record id="1" name="A"><MetadataEntry key="color" value="red"/></Record>
   <Record id="2" name="B"/>
 </Export>
 ```

 becomes

 ```text
 id,name,Metadata_color
 1,A,red
 2,B,
 ```

 ## Core Concepts

 The conversion is a small batch job:

- **Job:** the whole conversion. A `Job` runs one or more `Step`s in order.
- **Step:** reads records, processes them and writes them out, one chunk at a time.
- **ItemReader:** [`RecordItemReader`](item::xml::RecordItemReader) yields the `Record`s of a parsed [`XmlDocument`](item::xml::XmlDocument).
- **ItemProcessor:** [`MetadataFlattener`](item::flatten::MetadataFlattener) turns a `Record` into a [`FlatRecord`](record::FlatRecord).
- **ItemWriter:** [`CsvTableWriter`](item::csv::csv_writer::CsvTableWriter) writes the flat records as one CSV table.

 ## Getting Started

```rust
# use record_flatten::{conversion::{self, ConversionConfig}, BatchError};
# use std::env::temp_dir;
fn main() -> Result<(), BatchError> {
    let input = temp_dir().join("record_flatten_doc_export.xml");
    std::fs::write(
        &input,
        r#"<Export>
             <Record id="1" name="A"><MetadataEntry key="color" value="red"/></Record>
             <Record id="2" name="B"/>
           </Export>"#,
    )
    .unwrap();
    let output = temp_dir().join("record_flatten_doc_output.csv");

    let config = ConversionConfig::default()
        .input_path(&input)
        .output_path(&output);
    let summary = conversion::run(&config)?;

    assert_eq!(summary.row_count, 2);
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "id,name,Metadata_color\n1,A,red\n2,B,\n"
    );

    Ok(())
}
```

 The `record-flatten` binary runs the same conversion from `export.xml` to
 `output.csv` in the working directory.

 ## License
 Licensed under either of

 -   Apache License, Version 2.0 (<http://www.apache.org/licenses/LICENSE-2.0>)
 -   MIT license (<http://opensource.org/licenses/MIT>)

 at your option.
 */

/// Conversion entry point and its settings
pub mod conversion;

/// Core module for batch operations
pub mod core;

/// Error types for batch operations
pub mod error;

#[doc(inline)]
pub use error::*;

/// Item readers, processors and writers (XML records, metadata flattening, CSV tables)
pub mod item;

/// Records and their flattened, tabular form
pub mod record;
