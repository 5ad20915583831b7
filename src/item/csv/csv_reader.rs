use csv::{ReaderBuilder, StringRecordsIntoIter};
use std::{cell::RefCell, fs::File, io::Read, path::Path};

use crate::{
    core::item::{ItemReader, ItemReaderResult},
    error::BatchError,
    record::FlatRecord,
};

/// Reads a CSV table with a header row back into flat records.
///
/// Every header column becomes a field of every record; empty cells are read
/// as empty strings, which the [`CsvTableWriter`](super::csv_writer::CsvTableWriter)
/// renders exactly as it renders missing fields. Writing the records read from
/// a table therefore reproduces that table.
///
/// # Examples
///
/// ```
/// use record_flatten::core::item::ItemReader;
/// use record_flatten::item::csv::csv_reader::CsvTableReaderBuilder;
///
/// let data = "id,name,Metadata_color\n1,A,red\n2,B,\n";
/// let reader = CsvTableReaderBuilder::new().from_reader(data.as_bytes()).unwrap();
///
/// assert_eq!(reader.headers(), ["id", "name", "Metadata_color"]);
///
/// let first = reader.read().unwrap().unwrap();
/// assert_eq!(first.get("Metadata_color"), Some("red"));
///
/// let second = reader.read().unwrap().unwrap();
/// assert_eq!(second.get("Metadata_color"), Some(""));
///
/// assert!(reader.read().unwrap().is_none());
/// ```
pub struct CsvTableReader<R> {
    headers: Vec<String>,
    /// Uses `RefCell` so records can be iterated behind the `&self` of
    /// `ItemReader::read`.
    records: RefCell<StringRecordsIntoIter<R>>,
}

impl<R> CsvTableReader<R> {
    pub fn headers(&self) -> &[String] {
        &self.headers
    }
}

impl<R: Read> ItemReader<FlatRecord> for CsvTableReader<R> {
    fn read(&self) -> ItemReaderResult<FlatRecord> {
        match self.records.borrow_mut().next() {
            Some(Ok(string_record)) => Ok(Some(
                self.headers
                    .iter()
                    .map(String::as_str)
                    .zip(string_record.iter())
                    .collect(),
            )),
            Some(Err(error)) => Err(BatchError::ItemReader(error.to_string())),
            None => Ok(None),
        }
    }
}

pub struct CsvTableReaderBuilder {
    delimiter: u8,
}

impl Default for CsvTableReaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvTableReaderBuilder {
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Reads the header row right away; the data rows are read on demand.
    pub fn from_reader<R: Read>(self, rdr: R) -> Result<CsvTableReader<R>, BatchError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .from_reader(rdr);

        let headers = reader
            .headers()
            .map_err(|e| BatchError::ItemReader(e.to_string()))?
            .iter()
            .map(str::to_string)
            .collect();

        Ok(CsvTableReader {
            headers,
            records: RefCell::new(reader.into_records()),
        })
    }

    pub fn from_path<P: AsRef<Path>>(self, path: P) -> Result<CsvTableReader<File>, BatchError> {
        let file_path = path.as_ref();
        let file = File::open(file_path).map_err(|e| {
            BatchError::ItemReader(format!("{}: {}", file_path.display(), e))
        })?;
        self.from_reader(file)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use crate::{
        core::item::{ItemReader, ItemWriter},
        item::csv::csv_writer::CsvTableWriterBuilder,
        BatchError,
    };

    use super::CsvTableReaderBuilder;

    #[test]
    fn empty_input_has_no_headers_and_no_rows() -> Result<(), BatchError> {
        let reader = CsvTableReaderBuilder::new().from_reader("".as_bytes())?;

        assert!(reader.headers().is_empty());
        assert!(reader.read()?.is_none());
        Ok(())
    }

    #[test]
    fn ragged_rows_are_an_error() -> Result<(), BatchError> {
        let reader = CsvTableReaderBuilder::new().from_reader("a,b\n1,2,3\n".as_bytes())?;

        assert!(matches!(reader.read(), Err(BatchError::ItemReader(_))));
        Ok(())
    }

    #[test]
    fn quoted_cells_are_unescaped() -> Result<(), BatchError> {
        let reader = CsvTableReaderBuilder::new()
            .from_reader("note\n\"a,\"\"b\"\"\nc\"\n".as_bytes())?;

        let record = reader.read()?.unwrap();
        assert_eq!(record.get("note"), Some("a,\"b\"\nc"));
        Ok(())
    }

    #[test]
    fn rewriting_a_table_reproduces_it() -> Result<(), Box<dyn Error>> {
        let original = "id,name,Metadata_note\n1,\"Smith, J\",\"said \"\"hi\"\"\"\n2,,\n3,C,\"multi\nline\"\n";

        let reader = CsvTableReaderBuilder::new().from_reader(original.as_bytes())?;
        let writer = CsvTableWriterBuilder::new().from_writer(vec![]);
        while let Some(record) = reader.read()? {
            writer.write(&[record])?;
        }
        writer.close()?;

        assert_eq!(String::from_utf8(writer.into_inner()?)?, original);
        Ok(())
    }
}
