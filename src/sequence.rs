//! In-memory reference sequences keyed by chromosome name.
//!
//! Lookups never create entries: a missing chromosome is reported as
//! [`SequenceError::NotFound`].

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::GzDecoder;
use log::info;
use thiserror::Error;

use crate::types::one_based_to_zero;

#[derive(Debug, Error)]
pub enum SequenceError {
    #[error("I/O error while reading reference '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed reference '{path}' at line {line_no}: {problem}")]
    Malformed {
        path: String,
        line_no: usize,
        problem: String,
    },

    #[error("chromosome '{0}' not found in reference")]
    NotFound(String),

    #[error("position {pos} is outside chromosome '{chrom}' (length {len})")]
    OutOfRange { chrom: String, pos: u32, len: usize },
}

/// Named base sequences loaded from a (multi-)FASTA file.
#[derive(Debug, Clone, Default)]
pub struct SequenceStore {
    seqs: HashMap<String, Vec<u8>>,
}

impl SequenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a FASTA file; `.gz` paths are decompressed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SequenceError> {
        let path = path.as_ref();
        let label = path.display().to_string();
        let file = File::open(path).map_err(|e| SequenceError::Io {
            path: label.clone(),
            source: e,
        })?;

        let is_gz = path.extension().map(|e| e == "gz").unwrap_or(false);
        let store = if is_gz {
            Self::read(BufReader::new(GzDecoder::new(file)), &label)?
        } else {
            Self::read(BufReader::new(file), &label)?
        };

        info!("Loaded {} reference sequence(s) from {}", store.len(), label);
        Ok(store)
    }

    /// Load FASTA text from any reader.
    ///
    /// - the name is the header text up to the first whitespace
    /// - sequence lines are stripped of whitespace and concatenated
    /// - a header without sequence lines yields an empty sequence
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, SequenceError> {
        Self::read(reader, "<reader>")
    }

    fn read<R: BufRead>(mut reader: R, label: &str) -> Result<Self, SequenceError> {
        let mut seqs: HashMap<String, Vec<u8>> = HashMap::new();
        let mut current: Option<String> = None;
        let mut line = String::new();
        let mut line_no = 0usize;

        let malformed = |line_no: usize, problem: String| SequenceError::Malformed {
            path: label.to_string(),
            line_no,
            problem,
        };

        loop {
            line.clear();
            let n = reader.read_line(&mut line).map_err(|e| SequenceError::Io {
                path: label.to_string(),
                source: e,
            })?;
            if n == 0 {
                break;
            }
            line_no += 1;

            let s = line.trim();
            if s.is_empty() {
                continue;
            }

            if let Some(header) = s.strip_prefix('>') {
                let name = header.split_whitespace().next().unwrap_or("");
                if name.is_empty() {
                    return Err(malformed(line_no, "header without a sequence name".to_string()));
                }
                if seqs.contains_key(name) {
                    return Err(malformed(line_no, format!("duplicate sequence name '{name}'")));
                }
                seqs.insert(name.to_string(), Vec::new());
                current = Some(name.to_string());
                continue;
            }

            let Some(name) = current.as_ref() else {
                return Err(malformed(line_no, "sequence data before the first header".to_string()));
            };
            if let Some(seq) = seqs.get_mut(name) {
                seq.extend(s.bytes().filter(|b| !b.is_ascii_whitespace()));
            }
        }

        Ok(Self { seqs })
    }

    pub fn len(&self) -> usize {
        self.seqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seqs.is_empty()
    }

    pub fn exists(&self, chrom: &str) -> bool {
        self.seqs.contains_key(chrom)
    }

    pub fn get(&self, chrom: &str) -> Result<&[u8], SequenceError> {
        self.seqs
            .get(chrom)
            .map(|s| s.as_slice())
            .ok_or_else(|| SequenceError::NotFound(chrom.to_string()))
    }

    /// Base at a 1-based position.
    pub fn base_at(&self, chrom: &str, pos: u32) -> Result<u8, SequenceError> {
        let seq = self.get(chrom)?;
        one_based_to_zero(pos)
            .and_then(|p0| seq.get(p0 as usize).copied())
            .ok_or_else(|| SequenceError::OutOfRange {
                chrom: chrom.to_string(),
                pos,
                len: seq.len(),
            })
    }
}
