use serde::{Serialize, Deserialize};

/// Genomic strand of a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strand {
    Plus,
    Minus,
}

impl Strand {
    #[inline]
    pub fn is_forward(self) -> bool {
        self == Strand::Plus
    }

    /// Parse the `+` / `-` column of a gene-model file.
    pub fn from_symbol(s: &str) -> Option<Strand> {
        match s {
            "+" => Some(Strand::Plus),
            "-" => Some(Strand::Minus),
            _ => None,
        }
    }
}

/// Convert a 1-based position (files, output) to the internal 0-based one.
///
/// Returns `None` for position 0, which does not exist in 1-based space.
#[inline]
pub fn one_based_to_zero(pos: u32) -> Option<u32> {
    pos.checked_sub(1)
}

/// Convert an internal 0-based position back to 1-based.
#[inline]
pub fn zero_based_to_one(pos0: u32) -> u32 {
    pos0 + 1
}

/// A contiguous genomic interval.
/// Coordinates are 0-based, half-open: [start, end)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RefBlock {
    pub start: u32,
    pub end: u32,
}

impl RefBlock {
    /// Create a new block. Panics if start >= end.
    pub fn new(start: u32, end: u32) -> Self {
        assert!(start < end, "RefBlock requires start < end");
        Self { start, end }
    }

    /// Build a block from 1-based inclusive bounds, e.g. `[1000, 1100]` -> `[999, 1100)`.
    /// Panics if `first` is 0 or `first > last`.
    pub fn from_one_based(first: u32, last: u32) -> Self {
        let start = one_based_to_zero(first).expect("1-based coordinates start at 1");
        Self::new(start, last)
    }

    #[inline]
    pub fn len(self) -> u32 {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.end <= self.start
    }

    #[inline]
    pub fn contains_pos(self, pos: u32) -> bool {
        self.start <= pos && pos < self.end
    }

    #[inline]
    pub fn contains(self, other: RefBlock) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Intersection of two blocks, if non-empty.
    pub fn intersect(self, other: RefBlock) -> Option<RefBlock> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(RefBlock { start, end })
    }
}

/// Coarse shape of a variant, from allele lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariantKind {
    /// Reference and alternate have the same length.
    Substitution,
    Deletion,
    Insertion,
}

/// One input variant.
///
/// `pos` is 1-based as in the input file; use [`Variant::pos0`] for
/// everything that touches gene models or sequences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub chrom: String,
    pos: u32,
    pub ref_allele: String,
    pub alt_allele: String,
}

impl Variant {
    /// Returns `None` when `pos` is 0.
    pub fn new(
        chrom: impl Into<String>,
        pos: u32,
        ref_allele: impl Into<String>,
        alt_allele: impl Into<String>,
    ) -> Option<Self> {
        one_based_to_zero(pos)?;
        Some(Self {
            chrom: chrom.into(),
            pos,
            ref_allele: ref_allele.into(),
            alt_allele: alt_allele.into(),
        })
    }

    /// 1-based position.
    #[inline]
    pub fn pos(&self) -> u32 {
        self.pos
    }

    /// 0-based position.
    #[inline]
    pub fn pos0(&self) -> u32 {
        self.pos - 1
    }

    pub fn kind(&self) -> VariantKind {
        let r = self.ref_allele.len();
        let a = self.alt_allele.len();
        if r == a {
            VariantKind::Substitution
        } else if r > a {
            VariantKind::Deletion
        } else {
            VariantKind::Insertion
        }
    }

    /// Length change caused by the variant: positive for insertions,
    /// negative for deletions, 0 for substitutions.
    pub fn indel_length(&self) -> i64 {
        self.alt_allele.len() as i64 - self.ref_allele.len() as i64
    }

    /// Single-nucleotide A/C/G/T substitution.
    pub fn is_snv(&self) -> bool {
        let is_base = |s: &str| {
            s.len() == 1 && matches!(s.as_bytes()[0].to_ascii_uppercase(), b'A' | b'C' | b'G' | b'T')
        };
        is_base(&self.ref_allele) && is_base(&self.alt_allele)
    }
}
