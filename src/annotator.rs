//! Variant annotation driver: index lookup, per-gene classification and TSV
//! output.
//!
//! Classification only reads the index and the reference, so batches are
//! spread over the rayon pool. Results are collected in input order.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use log::{debug, info};
use rayon::prelude::*;

use crate::annotation::io::ParseError;
use crate::annotation::variants::VariantReader;
use crate::classify::{Annotation, AnnotationLabel, Classifier};
use crate::index::GeneIndex;
use crate::model::gene::GeneModel;
use crate::sequence::SequenceStore;
use crate::types::Variant;

/// Variants classified per parallel batch in streaming mode.
pub const CHUNK_SIZE: usize = 4096;

/// Column header of the annotation table.
pub const OUTPUT_HEADER: &str = "#chrom\tpos\tref\talt\tgene\ttranscript\tlabels";

/// Classification of one variant against one candidate gene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationRecord<'a> {
    pub gene: &'a GeneModel,
    pub annotation: Annotation,
}

/// Counters reported by [`Annotator::annotate_reader`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnnotateSummary {
    /// Variants read and classified.
    pub variants: u64,
    /// Malformed variant lines that were skipped.
    pub skipped: u64,
    /// (variant, gene) records written.
    pub records: u64,
}

pub struct Annotator<'a> {
    index: &'a GeneIndex,
    reference: Option<&'a SequenceStore>,
}

impl<'a> Annotator<'a> {
    pub fn new(index: &'a GeneIndex, reference: Option<&'a SequenceStore>) -> Self {
        Self { index, reference }
    }

    /// Classify `variant` against every gene whose extended footprint covers it.
    ///
    /// Empty when the chromosome is unknown or the position is intergenic.
    pub fn annotate_variant(&self, variant: &Variant) -> Vec<AnnotationRecord<'a>> {
        let classifier = Classifier::new(self.index.params(), self.reference);
        self.index
            .lookup(&variant.chrom, variant.pos0())
            .into_iter()
            .map(|gene| AnnotationRecord {
                gene,
                annotation: classifier.classify(gene, variant),
            })
            .collect()
    }

    /// Classify a batch in parallel; the outer vector follows `variants`.
    pub fn annotate_batch(&self, variants: &[Variant]) -> Vec<Vec<AnnotationRecord<'a>>> {
        variants.par_iter().map(|v| self.annotate_variant(v)).collect()
    }

    /// Stream variants from `reader` and write the annotation table to `writer`.
    pub fn annotate_reader<R: BufRead, W: Write>(&self, reader: R, writer: W) -> Result<AnnotateSummary> {
        self.annotate_reader_with(reader, writer, |_, _| {})
    }

    /// Like [`annotate_reader`](Self::annotate_reader), also handing every
    /// classified variant and its records to `sink` in input order.
    pub fn annotate_reader_with<R, W, F>(&self, reader: R, mut writer: W, mut sink: F) -> Result<AnnotateSummary>
    where
        R: BufRead,
        W: Write,
        F: FnMut(&Variant, &[AnnotationRecord<'a>]),
    {
        let mut summary = AnnotateSummary::default();
        writeln!(writer, "{OUTPUT_HEADER}").context("write annotation header")?;

        let mut records = VariantReader::new(reader).records();
        let mut chunk: Vec<Variant> = Vec::with_capacity(CHUNK_SIZE);
        loop {
            chunk.clear();
            for rec in records.by_ref() {
                match rec {
                    Ok(v) => {
                        chunk.push(v);
                        if chunk.len() == CHUNK_SIZE {
                            break;
                        }
                    }
                    Err(ParseError::MalformedRecord { line_no, problem }) => {
                        debug!("skipping variant line {line_no}: {problem}");
                        summary.skipped += 1;
                    }
                    Err(e) => return Err(e).context("read variants"),
                }
            }
            if chunk.is_empty() {
                break;
            }

            for (variant, recs) in chunk.iter().zip(self.annotate_batch(&chunk)) {
                write_rows(&mut writer, variant, &recs).context("write annotation rows")?;
                sink(variant, &recs);
                summary.variants += 1;
                summary.records += recs.len() as u64;
            }
        }

        writer.flush().context("flush annotation output")?;
        info!(
            "Annotated {} variants ({} records, {} skipped lines)",
            summary.variants, summary.records, summary.skipped
        );
        Ok(summary)
    }
}

/// One row per record; a variant without candidate genes gets a single
/// `Intergenic` row with `.` for gene and transcript.
fn write_rows<W: Write>(w: &mut W, v: &Variant, recs: &[AnnotationRecord<'_>]) -> std::io::Result<()> {
    let prefix = format!("{}\t{}\t{}\t{}", v.chrom, v.pos(), v.ref_allele, v.alt_allele);
    if recs.is_empty() {
        return writeln!(w, "{prefix}\t.\t.\t{}", AnnotationLabel::Intergenic);
    }
    for r in recs {
        writeln!(w, "{prefix}\t{}\t{}\t{}", r.gene.name, r.gene.transcript, r.annotation)?;
    }
    Ok(())
}
