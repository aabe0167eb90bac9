use std::io::BufRead;
use std::path::Path;

use anyhow::Result;

use crate::annotation::io::ParseError;
use crate::index::GeneIndex;
use crate::model::types::GeneAnnotationParam;

/// High-level builder for a `GeneIndex` from a refFlat / genePred table.
///
/// Holds the classification ranges; the index footprints are derived from them.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnnotationBuilder {
    pub params: GeneAnnotationParam,
}

impl AnnotationBuilder {
    pub fn new(params: GeneAnnotationParam) -> Self {
        Self { params }
    }

    pub fn upstream(mut self, bases: u32) -> Self {
        self.params.upstream_range = bases;
        self
    }

    pub fn downstream(mut self, bases: u32) -> Self {
        self.params.downstream_range = bases;
        self
    }

    pub fn splice_into_exon(mut self, bases: u32) -> Self {
        self.params.splice_into_exon = bases;
        self
    }

    pub fn splice_into_intron(mut self, bases: u32) -> Self {
        self.params.splice_into_intron = bases;
        self
    }

    /// Build index from anything implementing `BufRead`.
    pub fn build_from_reader<R: BufRead>(&self, reader: R) -> Result<GeneIndex, ParseError> {
        GeneIndex::new(self.params).from_reader(reader)
    }

    /// Build index from a file path; `.gz` files are decompressed.
    pub fn build_from_path<P: AsRef<Path>>(&self, path: P) -> Result<GeneIndex> {
        GeneIndex::from_path(path, self.params)
    }
}

// -------------------- tests --------------------
