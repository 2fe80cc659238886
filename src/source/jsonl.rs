//! Tolerant line-delimited JSON reader
//!
//! Streams one value per non-empty line. Lines that fail to parse are dropped
//! because append-only logs may contain partial writes from concurrent
//! appenders. A missing file reads as an empty stream.

use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, Lines};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

pub(crate) struct JsonlReader<T> {
    path: PathBuf,
    lines: Option<Lines<BufReader<File>>>,
    line_no: usize,
    dropped: usize,
    _item: PhantomData<T>,
}

impl<T: DeserializeOwned> JsonlReader<T> {
    pub(crate) fn open(path: &Path) -> Self {
        let lines = match File::open(path) {
            Ok(file) => Some(BufReader::new(file).lines()),
            Err(err) if err.kind() == ErrorKind::NotFound => None,
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "failed to open log");
                None
            }
        };
        Self {
            path: path.to_path_buf(),
            lines,
            line_no: 0,
            dropped: 0,
            _item: PhantomData,
        }
    }

    /// False when the file could not be opened
    pub(crate) fn found(&self) -> bool {
        self.lines.is_some()
    }

    /// Number of non-empty lines skipped so far
    pub(crate) fn dropped(&self) -> usize {
        self.dropped
    }
}

impl<T: DeserializeOwned> Iterator for JsonlReader<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let lines = self.lines.as_mut()?;
        loop {
            let line = lines.next()?;
            self.line_no += 1;
            let line = match line {
                Ok(line) => line,
                // Invalid UTF-8 spoils one line only
                Err(err) if err.kind() == ErrorKind::InvalidData => {
                    tracing::debug!(
                        path = %self.path.display(),
                        line = self.line_no,
                        error = %err,
                        "unreadable line"
                    );
                    self.dropped += 1;
                    continue;
                }
                Err(err) => {
                    tracing::debug!(
                        path = %self.path.display(),
                        line = self.line_no,
                        error = %err,
                        "read failed, ending stream"
                    );
                    self.lines = None;
                    return None;
                }
            };

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match serde_json::from_str(trimmed) {
                Ok(value) => return Some(value),
                Err(err) => {
                    tracing::debug!(
                        path = %self.path.display(),
                        line = self.line_no,
                        error = %err,
                        "invalid JSON line"
                    );
                    self.dropped += 1;
                }
            }
        }
    }
}
