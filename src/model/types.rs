use std::fmt;

use serde::{Serialize, Deserialize};

/// Internal numeric ID (index into `GeneIndex::genes`).
pub type GeneId = usize;

/// Number of intronic bases next to an exon boundary that form the
/// canonical splice dinucleotide (GT donor / AG acceptor).
pub const ESSENTIAL_SPLICE_BASES: u32 = 2;

/// Classification ranges shared by the index and every classification call.
///
/// All ranges are in bases and must be at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneAnnotationParam {
    /// Bases before the transcript 5' end counted as upstream.
    pub upstream_range: u32,

    /// Bases after the transcript 3' end counted as downstream.
    pub downstream_range: u32,

    /// Exonic bases next to an exon/intron boundary counted as splice site.
    pub splice_into_exon: u32,

    /// Intronic bases next to an exon/intron boundary counted as splice site.
    pub splice_into_intron: u32,
}

impl Default for GeneAnnotationParam {
    fn default() -> Self {
        Self {
            upstream_range: 500,
            downstream_range: 500,
            splice_into_exon: 3,
            splice_into_intron: 8,
        }
    }
}

/// Position of a variant inside a UTR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtrHit {
    /// Exonic bases between the UTR's 5' end (transcription direction) and the position.
    pub offset: u32,
    /// Exonic length of the whole UTR.
    pub length: u32,
}

/// A codon located on the genome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codon {
    /// 0-based codon number, counted from the CDS start in transcription direction.
    pub index: u32,
    /// 0-based genomic positions of the three bases, in transcription order.
    pub positions: [u32; 3],
    /// Which of the three bases holds the queried position (0..3).
    pub frame: u8,
}

/// Splice-site severity.
///
/// `Essential` covers the first/last [`ESSENTIAL_SPLICE_BASES`] intronic bases;
/// every other base inside the configured splice window is `Normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpliceSite {
    Normal,
    Essential,
}

impl fmt::Display for SpliceSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SpliceSite::Normal => "Normal",
            SpliceSite::Essential => "Essential",
        };
        write!(f, "{s}")
    }
}
