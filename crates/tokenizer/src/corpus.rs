use crate::config::ChunkCfg;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::mem;
use std::path::Path;

/// Single-pass stream of chunk batches over a line-oriented corpus.
///
/// Lines keep their terminators, with `\r\n` folded to `\n`, so concatenating
/// every chunk of every batch reproduces the consumed input in that form. Peak memory stays around
/// `buffer_size * chunk_len` characters regardless of corpus size. Restarting
/// means opening the source again.
pub struct CorpusBatches<R> {
    reader: R,
    cfg: ChunkCfg,
    max_lines: Option<usize>,
    lines_read: usize,
    pending: String,
    pending_chars: usize,
    batch: Vec<String>,
    state: StreamState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    Reading,
    Draining,
    Finished,
}

impl CorpusBatches<BufReader<File>> {
    pub fn open(
        path: impl AsRef<Path>,
        cfg: ChunkCfg,
        max_lines: Option<usize>,
    ) -> io::Result<Self> {
        let file = File::open(path.as_ref())?;
        Ok(Self::new(BufReader::new(file), cfg, max_lines))
    }
}

impl<R: BufRead> CorpusBatches<R> {
    /// `max_lines = Some(m)` stops after the line that takes the count past
    /// `m`, so at most `m + 1` lines are consumed.
    pub fn new(reader: R, cfg: ChunkCfg, max_lines: Option<usize>) -> Self {
        let cfg = ChunkCfg {
            chunk_len: cfg.chunk_len,
            buffer_size: cfg.buffer_size.max(1),
        };
        Self {
            reader,
            cfg,
            max_lines,
            lines_read: 0,
            pending: String::new(),
            pending_chars: 0,
            batch: Vec::with_capacity(cfg.buffer_size),
            state: StreamState::Reading,
        }
    }

    pub fn lines_read(&self) -> usize {
        self.lines_read
    }

    /// Flatten batches into individual chunks, as the trainer consumes them.
    pub fn into_chunks(self) -> CorpusChunks<R> {
        CorpusChunks {
            batches: self,
            current: Vec::new().into_iter(),
            error: None,
        }
    }

    fn seal_chunk(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        self.batch.push(mem::take(&mut self.pending));
        self.pending_chars = 0;
    }

    fn limit_exceeded(&self) -> bool {
        matches!(self.max_lines, Some(limit) if self.lines_read > limit)
    }

    fn take_batch(&mut self) -> Vec<String> {
        mem::replace(&mut self.batch, Vec::with_capacity(self.cfg.buffer_size))
    }

    fn read_until_batch(&mut self) -> io::Result<Option<Vec<String>>> {
        loop {
            let mut line = String::new();
            if self.reader.read_line(&mut line)? == 0 {
                self.state = StreamState::Draining;
                return Ok(None);
            }

            if line.ends_with("\r\n") {
                line.truncate(line.len() - 2);
                line.push('\n');
            }

            self.lines_read += 1;
            self.pending_chars += line.chars().count();
            self.pending.push_str(&line);

            if self.pending_chars >= self.cfg.chunk_len {
                self.seal_chunk();
            }

            let exceeded = self.limit_exceeded();
            if exceeded {
                self.state = StreamState::Draining;
            }

            if self.batch.len() >= self.cfg.buffer_size {
                return Ok(Some(self.take_batch()));
            }

            if exceeded {
                return Ok(None);
            }
        }
    }
}

impl<R: BufRead> Iterator for CorpusBatches<R> {
    type Item = io::Result<Vec<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state == StreamState::Reading {
            match self.read_until_batch() {
                Ok(Some(batch)) => return Some(Ok(batch)),
                Ok(None) => {}
                Err(err) => {
                    self.state = StreamState::Finished;
                    return Some(Err(err));
                }
            }
        }

        if self.state == StreamState::Draining {
            self.state = StreamState::Finished;
            self.seal_chunk();
            if !self.batch.is_empty() {
                return Some(Ok(self.take_batch()));
            }
        }

        None
    }
}

impl<R: BufRead> std::iter::FusedIterator for CorpusBatches<R> {}

/// Chunk-level view over [`CorpusBatches`].
///
/// The tokenizer trainer wants plain strings, so a read error ends the
/// stream and is parked for [`CorpusChunks::take_error`].
pub struct CorpusChunks<R> {
    batches: CorpusBatches<R>,
    current: std::vec::IntoIter<String>,
    error: Option<io::Error>,
}

impl<R: BufRead> CorpusChunks<R> {
    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }

    pub fn lines_read(&self) -> usize {
        self.batches.lines_read()
    }
}

impl<R: BufRead> Iterator for CorpusChunks<R> {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(chunk) = self.current.next() {
                return Some(chunk);
            }
            if self.error.is_some() {
                return None;
            }
            match self.batches.next()? {
                Ok(batch) => self.current = batch.into_iter(),
                Err(err) => {
                    self.error = Some(err);
                    return None;
                }
            }
        }
    }
}
