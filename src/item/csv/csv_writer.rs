use std::{
    cell::{Cell, RefCell},
    fs::File,
    io::{self, Write},
    path::{Path, PathBuf},
};

use csv::WriterBuilder;
use log::{debug, warn};

use crate::{
    core::item::{ItemWriter, ItemWriterResult},
    record::{FlatRecord, Table},
    BatchError,
};

type SinkFactory<W> = Box<dyn FnOnce() -> io::Result<W>>;

/// Writes flat records as one CSV table.
///
/// The header is the union of every record's field names, so nothing can be
/// written before the last record is known: `write` only buffers, and `close`
/// creates the destination and serializes the whole table. A step that fails
/// before `close` leaves no output behind.
///
/// An empty table (no records, or records without any field) produces an
/// empty output, without header.
///
/// # Examples
///
/// ```
/// use record_flatten::core::item::ItemWriter;
/// use record_flatten::item::csv::csv_writer::CsvTableWriterBuilder;
/// use record_flatten::record::FlatRecord;
///
/// let writer = CsvTableWriterBuilder::new().from_writer(Vec::new());
///
/// writer.open().unwrap();
/// writer
///     .write(&[
///         FlatRecord::from_iter([("id", "1"), ("name", "A"), ("Metadata_color", "red")]),
///         FlatRecord::from_iter([("id", "2"), ("name", "B")]),
///     ])
///     .unwrap();
/// writer.close().unwrap();
///
/// let data = String::from_utf8(writer.into_inner().unwrap()).unwrap();
/// assert_eq!(data, "id,name,Metadata_color\n1,A,red\n2,B,\n");
/// ```
pub struct CsvTableWriter<W: Write> {
    delimiter: u8,
    table: RefCell<Table>,
    sink: RefCell<Option<SinkFactory<W>>>,
    finished: RefCell<Option<W>>,
    column_count: Cell<usize>,
}

impl<W: Write> ItemWriter<FlatRecord> for CsvTableWriter<W> {
    fn write(&self, items: &[FlatRecord]) -> ItemWriterResult {
        let mut table = self.table.borrow_mut();
        for item in items {
            table.push(item.clone());
        }
        debug!("Buffered {} rows ({} in total)", items.len(), table.len());
        Ok(())
    }

    /// Creates the destination and writes the header and every buffered row.
    fn close(&self) -> ItemWriterResult {
        let factory = self
            .sink
            .borrow_mut()
            .take()
            .ok_or_else(|| BatchError::ItemWriter("CSV writer already closed".to_string()))?;
        let sink = factory().map_err(|e| BatchError::ItemWriter(e.to_string()))?;

        let mut wtr = WriterBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .flexible(false)
            .from_writer(sink);

        let table = self.table.borrow();
        let columns = table.columns();
        self.column_count.set(columns.len());

        if columns.is_empty() {
            warn!("No fields to write, the CSV output is empty");
        } else {
            wtr.write_record(&columns)
                .map_err(|e| BatchError::ItemWriter(e.to_string()))?;
            for row in table.rows() {
                wtr.write_record(Table::cells(row, &columns))
                    .map_err(|e| BatchError::ItemWriter(e.to_string()))?;
            }
        }

        let inner = wtr
            .into_inner()
            .map_err(|e| BatchError::ItemWriter(e.error().to_string()))?;
        debug!(
            "Wrote {} rows over {} columns",
            table.len(),
            columns.len()
        );

        *self.finished.borrow_mut() = Some(inner);
        Ok(())
    }
}

impl<W: Write> CsvTableWriter<W> {
    /// Number of columns of the written table, known once closed.
    pub fn column_count(&self) -> usize {
        self.column_count.get()
    }

    /// Returns the underlying writer once the table has been written.
    pub fn into_inner(self) -> Result<W, BatchError> {
        self.finished
            .into_inner()
            .ok_or_else(|| BatchError::ItemWriter("CSV writer not closed".to_string()))
    }
}

pub struct CsvTableWriterBuilder {
    delimiter: u8,
}

impl Default for CsvTableWriterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvTableWriterBuilder {
    pub fn new() -> CsvTableWriterBuilder {
        CsvTableWriterBuilder { delimiter: b',' }
    }

    pub fn delimiter(mut self, delimiter: u8) -> CsvTableWriterBuilder {
        self.delimiter = delimiter;
        self
    }

    /// The file at `path` is created, or truncated, when the writer is closed.
    pub fn from_path<P: AsRef<Path>>(self, path: P) -> CsvTableWriter<File> {
        let path: PathBuf = path.as_ref().to_path_buf();
        self.build(Box::new(move || File::create(path)))
    }

    pub fn from_writer<W: Write + 'static>(self, wtr: W) -> CsvTableWriter<W> {
        self.build(Box::new(move || Ok(wtr)))
    }

    fn build<W: Write>(self, sink: SinkFactory<W>) -> CsvTableWriter<W> {
        CsvTableWriter {
            delimiter: self.delimiter,
            table: RefCell::new(Table::new()),
            sink: RefCell::new(Some(sink)),
            finished: RefCell::new(None),
            column_count: Cell::new(0),
        }
    }
}
