use std::io::BufRead;

use thiserror::Error;

use crate::model::gene::GeneModel;
use crate::types::{RefBlock, Strand};

/// Gene-model table layout, detected per line.
///
/// - RefFlat:  geneName name chrom strand txStart txEnd cdsStart cdsEnd exonCount exonStarts exonEnds
/// - GenePred: name chrom strand txStart txEnd cdsStart cdsEnd exonCount exonStarts exonEnds [...]
/// - RefGene:  bin name chrom strand ... exonEnds score name2 cdsStartStat cdsEndStat exonFrames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    RefFlat,
    GenePred,
    RefGene,
}

/// Parsing errors for gene-model and variant input.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("I/O error while reading '{path}': {source}")]
    IoPath {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed gene-model line {line_no}: {problem} ({line_preview})")]
    MalformedLine {
        line_no: usize,
        problem: String,
        line_preview: String,
    },

    #[error("bad coordinates on line {line_no}: {problem}")]
    BadCoordinates { line_no: usize, problem: String },

    #[error("malformed variant record on line {line_no}: {problem}")]
    MalformedRecord { line_no: usize, problem: String },
}

/// Streaming parser for UCSC refFlat / genePred / refGene tables.
///
/// Coordinates in these tables are already 0-based, half-open and are kept as-is.
///
/// # Example
/// ```
/// use std::io::Cursor;
/// use gene_anno::annotation::io::GeneRecordReader;
///
/// let table = "#geneName\tname\tchrom\n\
/// G1\tNM_1\tchr1\t+\t100\t350\t120\t320\t3\t100,200,300,\t150,250,350,\n";
///
/// let genes: Vec<_> = GeneRecordReader::new(Cursor::new(table.as_bytes()))
///     .records()
///     .collect::<Result<_, _>>()
///     .unwrap();
/// assert_eq!(genes.len(), 1);
/// assert_eq!(genes[0].exons().len(), 3);
/// ```
pub struct GeneRecordReader<R: BufRead> {
    reader: R,
    buf: String,
    line_no: usize,
}

impl<R: BufRead> GeneRecordReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: String::new(),
            line_no: 0,
        }
    }

    /// Returns an iterator over parsed gene models.
    ///
    /// - Skips blank lines
    /// - Skips comment lines starting with '#'
    pub fn records(mut self) -> impl Iterator<Item = Result<GeneModel, ParseError>> {
        std::iter::from_fn(move || loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => {
                    return Some(Err(ParseError::IoPath {
                        path: "<reader>".to_string(),
                        source: e,
                    }))
                }
            }
            self.line_no += 1;

            let line = self.buf.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            return Some(parse_gene_line(line, self.line_no));
        })
    }
}

/// Guess the table layout from the columns of one line.
pub fn detect_dialect(fields: &[&str]) -> Option<Dialect> {
    let is_strand = |s: &str| Strand::from_symbol(s).is_some();
    if fields.len() >= 16 && fields[0].parse::<u32>().is_ok() && is_strand(fields[3]) {
        Some(Dialect::RefGene)
    } else if fields.len() >= 11 && is_strand(fields[3]) {
        Some(Dialect::RefFlat)
    } else if fields.len() >= 10 && is_strand(fields[2]) {
        Some(Dialect::GenePred)
    } else {
        None
    }
}

/// Parse one non-comment line into a `GeneModel`.
pub fn parse_gene_line(line: &str, line_no: usize) -> Result<GeneModel, ParseError> {
    let fields: Vec<&str> = line.split('\t').map(|f| f.trim()).collect();

    let malformed = |problem: String| ParseError::MalformedLine {
        line_no,
        problem,
        line_preview: preview(line),
    };
    let bad = |problem: String| ParseError::BadCoordinates { line_no, problem };

    let dialect = detect_dialect(&fields).ok_or_else(|| {
        malformed(format!(
            "expected a refFlat (11 columns) or genePred (10 columns) record, got {} column(s)",
            fields.len()
        ))
    })?;

    // (gene name, transcript name, index of the chrom column)
    let (gene_name, tx_name, off) = match dialect {
        Dialect::RefFlat => (fields[0], fields[1], 2),
        Dialect::GenePred => (fields[0], fields[0], 1),
        Dialect::RefGene => {
            let name2 = fields[12];
            let gene = if name2.is_empty() { fields[1] } else { name2 };
            (gene, fields[1], 2)
        }
    };

    let chrom = fields[off];
    if chrom.is_empty() {
        return Err(malformed("empty chromosome name".to_string()));
    }
    // detect_dialect already checked the strand column
    let strand = Strand::from_symbol(fields[off + 1])
        .ok_or_else(|| malformed(format!("bad strand '{}'", fields[off + 1])))?;

    let coord = |idx: usize, what: &str| -> Result<u32, ParseError> {
        fields[idx]
            .parse::<u32>()
            .map_err(|_| bad(format!("{what} '{}' is not a coordinate", fields[idx])))
    };

    let tx_start = coord(off + 2, "txStart")?;
    let tx_end = coord(off + 3, "txEnd")?;
    let cds_start = coord(off + 4, "cdsStart")?;
    let cds_end = coord(off + 5, "cdsEnd")?;
    let exon_count: usize = fields[off + 6]
        .parse()
        .map_err(|_| malformed(format!("exonCount '{}' is not a number", fields[off + 6])))?;

    if tx_start >= tx_end {
        return Err(bad(format!("txStart {tx_start} >= txEnd {tx_end}")));
    }
    if cds_start > cds_end {
        return Err(bad(format!("cdsStart {cds_start} > cdsEnd {cds_end}")));
    }

    let starts = parse_coord_list(fields[off + 7]).map_err(|v| bad(format!("exonStarts entry '{v}'")))?;
    let ends = parse_coord_list(fields[off + 8]).map_err(|v| bad(format!("exonEnds entry '{v}'")))?;

    if starts.len() != exon_count || ends.len() != exon_count {
        return Err(malformed(format!(
            "exonCount is {exon_count} but found {} start(s) and {} end(s)",
            starts.len(),
            ends.len()
        )));
    }

    let mut exons = Vec::with_capacity(exon_count);
    for (&s, &e) in starts.iter().zip(ends.iter()) {
        if s >= e {
            return Err(bad(format!("exon start {s} >= exon end {e}")));
        }
        exons.push(RefBlock::new(s, e));
    }

    // cdsStart == cdsEnd marks a non-coding transcript
    let cds = (cds_start < cds_end).then(|| RefBlock::new(cds_start, cds_end));

    GeneModel::new(
        gene_name,
        tx_name,
        chrom,
        strand,
        RefBlock::new(tx_start, tx_end),
        cds,
        exons,
    )
    .map_err(|e| bad(e.to_string()))
}

/// Parse `"100,200,300,"`; returns the offending entry on failure.
fn parse_coord_list(s: &str) -> Result<Vec<u32>, String> {
    s.split(',')
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(|v| v.parse::<u32>().map_err(|_| v.to_string()))
        .collect()
}

pub(crate) fn preview(line: &str) -> String {
    const MAX: usize = 80;
    if line.chars().count() <= MAX {
        line.to_string()
    } else {
        let head: String = line.chars().take(MAX).collect();
        format!("{head}...")
    }
}
