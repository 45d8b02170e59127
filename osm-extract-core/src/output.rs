//! Buffered, append-only extract outputs.
//!
//! An [`EntityEncoder`] turns entities into bytes; [`ExtractOutput`]
//! collects those bytes and hands them to the underlying writer whenever the
//! buffer grows past the commit threshold.

use std::io::{self, Write};

use crate::{Node, Relation, Way};

/// Default number of buffered bytes that triggers a write.
pub const DEFAULT_COMMIT_THRESHOLD: usize = 10 * 1024 * 1024;

/// Serialises entities in one output format.
pub trait EntityEncoder {
    /// Bytes written before the first entity.
    ///
    /// # Errors
    /// Propagates errors from writing into `out`.
    fn header(&mut self, _out: &mut Vec<u8>) -> io::Result<()> {
        Ok(())
    }

    /// Encode a node.
    ///
    /// # Errors
    /// Propagates errors from writing into `out`.
    fn node(&mut self, node: &Node, out: &mut Vec<u8>) -> io::Result<()>;

    /// Encode a way.
    ///
    /// # Errors
    /// Propagates errors from writing into `out`.
    fn way(&mut self, way: &Way, out: &mut Vec<u8>) -> io::Result<()>;

    /// Encode a relation.
    ///
    /// # Errors
    /// Propagates errors from writing into `out`.
    fn relation(&mut self, relation: &Relation, out: &mut Vec<u8>) -> io::Result<()>;

    /// Bytes written after the last entity.
    ///
    /// # Errors
    /// Propagates errors from writing into `out`.
    fn footer(&mut self, _out: &mut Vec<u8>) -> io::Result<()> {
        Ok(())
    }
}

/// Number of entities written per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteCounts {
    /// Nodes written.
    pub nodes: u64,
    /// Ways written.
    pub ways: u64,
    /// Relations written.
    pub relations: u64,
}

/// Buffered output of one extract.
pub struct ExtractOutput {
    encoder: Box<dyn EntityEncoder>,
    sink: Box<dyn Write>,
    buffer: Vec<u8>,
    commit_threshold: usize,
    bytes_written: u64,
    counts: WriteCounts,
    started: bool,
    closed: bool,
}

impl std::fmt::Debug for ExtractOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractOutput")
            .field("buffered", &self.buffer.len())
            .field("commit_threshold", &self.commit_threshold)
            .field("bytes_written", &self.bytes_written)
            .field("counts", &self.counts)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl ExtractOutput {
    /// Wrap `sink` with the given encoder and the default commit threshold.
    pub fn new(encoder: Box<dyn EntityEncoder>, sink: Box<dyn Write>) -> Self {
        Self {
            encoder,
            sink,
            buffer: Vec::new(),
            commit_threshold: DEFAULT_COMMIT_THRESHOLD,
            bytes_written: 0,
            counts: WriteCounts::default(),
            started: false,
            closed: false,
        }
    }

    /// Override the commit threshold in bytes.
    #[must_use]
    pub fn with_commit_threshold(mut self, bytes: usize) -> Self {
        self.commit_threshold = bytes;
        self
    }

    /// Append a node.
    ///
    /// # Errors
    /// Returns an I/O error when encoding or committing fails.
    pub fn write_node(&mut self, node: &Node) -> io::Result<()> {
        self.start()?;
        self.encoder.node(node, &mut self.buffer)?;
        self.counts.nodes += 1;
        self.commit_if_full()
    }

    /// Append a way.
    ///
    /// # Errors
    /// Returns an I/O error when encoding or committing fails.
    pub fn write_way(&mut self, way: &Way) -> io::Result<()> {
        self.start()?;
        self.encoder.way(way, &mut self.buffer)?;
        self.counts.ways += 1;
        self.commit_if_full()
    }

    /// Append a relation.
    ///
    /// # Errors
    /// Returns an I/O error when encoding or committing fails.
    pub fn write_relation(&mut self, relation: &Relation) -> io::Result<()> {
        self.start()?;
        self.encoder.relation(relation, &mut self.buffer)?;
        self.counts.relations += 1;
        self.commit_if_full()
    }

    /// Write the footer, flush everything and return the total byte count.
    ///
    /// Later calls return the same count without writing again.
    ///
    /// # Errors
    /// Returns an I/O error when the final write or flush fails.
    pub fn close(&mut self) -> io::Result<u64> {
        if self.closed {
            return Ok(self.bytes_written);
        }
        self.start()?;
        self.encoder.footer(&mut self.buffer)?;
        self.commit()?;
        self.sink.flush()?;
        self.closed = true;
        Ok(self.bytes_written)
    }

    /// Entities written so far.
    #[must_use]
    pub const fn counts(&self) -> WriteCounts {
        self.counts
    }

    /// Bytes handed to the underlying writer so far.
    #[must_use]
    pub const fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    fn start(&mut self) -> io::Result<()> {
        if !self.started {
            self.started = true;
            self.encoder.header(&mut self.buffer)?;
        }
        Ok(())
    }

    fn commit_if_full(&mut self) -> io::Result<()> {
        if self.buffer.len() > self.commit_threshold {
            self.commit()?;
        }
        Ok(())
    }

    fn commit(&mut self) -> io::Result<()> {
        self.sink.write_all(&self.buffer)?;
        self.bytes_written += u64::try_from(self.buffer.len()).unwrap_or(u64::MAX);
        self.buffer.clear();
        Ok(())
    }
}
