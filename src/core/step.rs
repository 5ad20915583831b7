use std::{
    cell::Cell,
    time::{Duration, Instant},
};

use log::{debug, error, info};
use uuid::Uuid;

use crate::BatchError;

use super::{
    build_name,
    item::{ItemProcessor, ItemReader, ItemWriter},
};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum StepStatus {
    /// The step has been built but not executed yet.
    Starting,
    /// The step is reading, processing and writing chunks.
    Started,
    /// Every item was read, processed and written, and the writer was closed.
    Success,
    /// A reader, processor or writer call failed; the writer was not closed.
    Failed,
}

#[derive(Debug, PartialEq)]
enum ChunkStatus {
    /// The chunk reached its configured size, more items may follow.
    Full,
    /// The reader is exhausted; the chunk may be partially filled or empty.
    Finished,
}

/// Outcome of one step execution.
#[derive(Debug)]
pub struct StepExecution {
    pub id: Uuid,
    pub name: String,
    pub status: StepStatus,
    pub start: Instant,
    pub end: Instant,
    pub duration: Duration,
    pub read_count: usize,
    pub write_count: usize,
}

/// A sequential phase of a job.
pub trait Step {
    /// Runs the step to completion.
    ///
    /// # Returns
    /// - `Ok(StepExecution)` when every item was written and the writer closed
    /// - `Err(BatchError)` with the first failure otherwise
    fn execute(&self) -> Result<StepExecution, BatchError>;

    fn get_name(&self) -> &str;
}

/// Chunk-oriented step: reads up to `chunk_size` items, processes them, then
/// hands the whole chunk to the writer, until the reader is exhausted.
///
/// Unlike a fault tolerant step there is no skip policy here: the first
/// failing read, process or write aborts the step.
pub struct StepInstance<'a, R, W> {
    id: Uuid,
    name: String,
    reader: &'a dyn ItemReader<R>,
    processor: &'a dyn ItemProcessor<R, W>,
    writer: &'a dyn ItemWriter<W>,
    chunk_size: usize,
    status: Cell<StepStatus>,
    read_count: Cell<usize>,
    write_count: Cell<usize>,
}

impl<R, W> Step for StepInstance<'_, R, W> {
    fn execute(&self) -> Result<StepExecution, BatchError> {
        let start = Instant::now();

        info!("Start of step: {}, id: {}", self.name, self.id);
        self.status.set(StepStatus::Started);

        if let Err(err) = self.run_chunks() {
            self.status.set(StepStatus::Failed);
            error!("Step {} failed: {}", self.name, err);
            return Err(err);
        }

        self.status.set(StepStatus::Success);
        info!("End of step: {}, id: {}", self.name, self.id);

        Ok(StepExecution {
            id: self.id,
            name: self.name.clone(),
            status: self.get_status(),
            start,
            end: Instant::now(),
            duration: start.elapsed(),
            read_count: self.get_read_count(),
            write_count: self.get_write_count(),
        })
    }

    fn get_name(&self) -> &str {
        &self.name
    }
}

impl<R, W> StepInstance<'_, R, W> {
    pub fn get_status(&self) -> StepStatus {
        self.status.get()
    }

    pub fn get_read_count(&self) -> usize {
        self.read_count.get()
    }

    pub fn get_write_count(&self) -> usize {
        self.write_count.get()
    }

    fn run_chunks(&self) -> Result<(), BatchError> {
        self.writer.open()?;

        let mut read_items: Vec<R> = Vec::with_capacity(self.chunk_size);

        loop {
            let chunk_status = self.read_chunk(&mut read_items)?;

            if !read_items.is_empty() {
                let processed_items = self.process_chunk(&read_items)?;
                self.write_chunk(&processed_items)?;
            }

            if chunk_status == ChunkStatus::Finished {
                break;
            }
        }

        self.writer.close()
    }

    fn read_chunk(&self, read_items: &mut Vec<R>) -> Result<ChunkStatus, BatchError> {
        debug!("Start reading chunk");
        read_items.clear();

        while let Some(item) = self.reader.read()? {
            read_items.push(item);
            self.read_count.set(self.read_count.get() + 1);

            if read_items.len() == self.chunk_size {
                debug!("End reading chunk: FULL");
                return Ok(ChunkStatus::Full);
            }
        }

        debug!("End reading chunk: FINISHED");
        Ok(ChunkStatus::Finished)
    }

    fn process_chunk(&self, read_items: &[R]) -> Result<Vec<W>, BatchError> {
        debug!("Start processing chunk");
        let processed_items = read_items
            .iter()
            .map(|item| self.processor.process(item))
            .collect::<Result<Vec<W>, BatchError>>()?;
        debug!("End processing chunk");

        Ok(processed_items)
    }

    fn write_chunk(&self, processed_items: &[W]) -> Result<(), BatchError> {
        debug!("Start writing chunk");
        self.writer.write(processed_items)?;
        self.writer.flush()?;
        self.write_count
            .set(self.write_count.get() + processed_items.len());
        debug!("End writing chunk");

        Ok(())
    }
}

pub struct StepBuilder<'a, R, W> {
    name: Option<String>,
    reader: Option<&'a dyn ItemReader<R>>,
    processor: Option<&'a dyn ItemProcessor<R, W>>,
    writer: Option<&'a dyn ItemWriter<W>>,
    chunk_size: usize,
}

impl<R, W> Default for StepBuilder<'_, R, W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, R, W> StepBuilder<'a, R, W> {
    pub fn new() -> StepBuilder<'a, R, W> {
        Self {
            name: None,
            reader: None,
            processor: None,
            writer: None,
            chunk_size: 1,
        }
    }

    pub fn name(mut self, name: String) -> StepBuilder<'a, R, W> {
        self.name = Some(name);
        self
    }

    pub fn reader(mut self, reader: &'a impl ItemReader<R>) -> StepBuilder<'a, R, W> {
        self.reader = Some(reader);
        self
    }

    pub fn processor(mut self, processor: &'a impl ItemProcessor<R, W>) -> StepBuilder<'a, R, W> {
        self.processor = Some(processor);
        self
    }

    pub fn writer(mut self, writer: &'a impl ItemWriter<W>) -> StepBuilder<'a, R, W> {
        self.writer = Some(writer);
        self
    }

    /// Sets the commit interval. A size of zero is treated as one.
    pub fn chunk(mut self, chunk_size: usize) -> StepBuilder<'a, R, W> {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn build(self) -> Result<StepInstance<'a, R, W>, BatchError> {
        let missing = |part: &str| BatchError::Configuration(format!("step has no {}", part));

        Ok(StepInstance {
            id: Uuid::new_v4(),
            name: self.name.unwrap_or_else(build_name),
            reader: self.reader.ok_or_else(|| missing("reader"))?,
            processor: self.processor.ok_or_else(|| missing("processor"))?,
            writer: self.writer.ok_or_else(|| missing("writer"))?,
            chunk_size: self.chunk_size,
            status: Cell::new(StepStatus::Starting),
            read_count: Cell::new(0),
            write_count: Cell::new(0),
        })
    }
}
