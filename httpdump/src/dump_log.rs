//! Newline-delimited JSON logs.
//!
//! The same framing is used for the dump log written by the recorder and the error log
//! written by the replayer: one JSON object per line, each line terminated by `\n`.

use crate::error::Error;
use serde::Serialize;
use std::{
    fs::{File, OpenOptions},
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
    sync::Mutex,
};
use tracing::warn;

/// Append-only line writer that can be shared between concurrent exchanges.
#[derive(Debug)]
pub struct LogWriter<W: Write> {
    sink: Mutex<W>,
}

impl LogWriter<BufWriter<File>> {
    /// Opens `path` for appending, creating it when missing.
    pub fn append_to<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }

    /// Creates `path`, truncating anything written by a previous run.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> LogWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink: Mutex::new(sink),
        }
    }

    /// Serializes `record` and writes it as a single line.
    ///
    /// The line and its terminator are written and flushed while holding the lock, so
    /// lines from concurrent callers never interleave.
    pub fn append<T: Serialize>(&self, record: &T) -> Result<(), Error> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut sink = self.sink.lock()?;
        sink.write_all(&line)?;
        sink.flush()?;

        Ok(())
    }

    pub fn into_inner(self) -> Result<W, Error> {
        Ok(self.sink.into_inner()?)
    }
}

/// A complete line read from a log, without its terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// 1-based position in the log.
    pub number: usize,
    pub bytes: Vec<u8>,
}

/// Lazy, forward-only reader over the complete lines of a log.
///
/// A trailing line without `\n` is treated as end of input, never as a record.
/// Blank lines are skipped.
#[derive(Debug)]
pub struct LogReader<R: BufRead> {
    source: R,
    line_number: usize,
    finished: bool,
}

impl LogReader<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> LogReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            line_number: 0,
            finished: false,
        }
    }
}

impl<R: BufRead> Iterator for LogReader<R> {
    type Item = Result<Line, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            let mut bytes = Vec::new();
            let read = match self.source.read_until(b'\n', &mut bytes) {
                Ok(read) => read,
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e.into()));
                }
            };
            self.line_number += 1;

            if read == 0 {
                self.finished = true;
            } else if bytes.last() != Some(&b'\n') {
                warn!(
                    line = self.line_number,
                    bytes = bytes.len(),
                    "Ignoring truncated last line of the log"
                );
                self.finished = true;
            } else {
                bytes.pop();
                if bytes.last() == Some(&b'\r') {
                    bytes.pop();
                }
                if bytes.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }

                return Some(Ok(Line {
                    number: self.line_number,
                    bytes,
                }));
            }
        }

        None
    }
}
