//! Per-gene variant classification.
//!
//! The decision order is fixed: upstream, downstream, exon, intron, intergenic.
//! Exonic and intronic positions additionally get a splice-site label when they
//! fall inside the configured splice window.

use std::fmt;
use std::str::FromStr;

use log::{debug, warn};
use thiserror::Error;

use crate::model::codon::{self, complement, is_start, is_stop};
use crate::model::gene::GeneModel;
use crate::model::types::{Codon, GeneAnnotationParam, SpliceSite};
use crate::sequence::SequenceStore;
use crate::types::{one_based_to_zero, zero_based_to_one, Strand, Variant};

/// Separator between labels in the rendered annotation.
pub const LABEL_SEPARATOR: char = ':';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot parse annotation label '{0}'")]
pub struct LabelParseError(pub String);

/// Codon hit by a coding variant.
///
/// Bases are given in transcription orientation (complemented on the minus
/// strand), upper case. They are absent when no reference sequence is
/// available; `alt_codon` is only set for single-base substitutions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CodonDetail {
    /// 0-based codon number.
    pub index: u32,
    /// 0-based genomic positions, transcription order.
    pub positions: [u32; 3],
    pub ref_codon: Option<[u8; 3]>,
    pub alt_codon: Option<[u8; 3]>,
}

/// Renders as `codon=<n>|pos=<p1>,<p2>,<p3>[|ref=XYZ[|alt=XYZ]]`, with the
/// codon number and positions 1-based.
impl fmt::Display for CodonDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = self.positions.map(zero_based_to_one);
        write!(f, "codon={}|pos={},{},{}", self.index + 1, a, b, c)?;
        if let Some(r) = self.ref_codon {
            write!(f, "|ref={}", bases_str(r))?;
        }
        if let Some(r) = self.alt_codon {
            write!(f, "|alt={}", bases_str(r))?;
        }
        Ok(())
    }
}

impl FromStr for CodonDetail {
    type Err = LabelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || LabelParseError(s.to_string());

        let mut parts = s.split('|');
        let index: u32 = parts
            .next()
            .and_then(|p| p.strip_prefix("codon="))
            .and_then(|n| n.parse().ok())
            .filter(|&n| n > 0)
            .ok_or_else(err)?;

        let positions: Vec<u32> = parts
            .next()
            .and_then(|p| p.strip_prefix("pos="))
            .ok_or_else(err)?
            .split(',')
            .map(|v| v.parse::<u32>().ok().and_then(one_based_to_zero))
            .collect::<Option<_>>()
            .ok_or_else(err)?;
        let positions: [u32; 3] = positions.try_into().map_err(|_| err())?;

        let mut detail = CodonDetail {
            index: index - 1,
            positions,
            ref_codon: None,
            alt_codon: None,
        };
        for part in parts {
            if let Some(v) = part.strip_prefix("ref=") {
                detail.ref_codon = Some(parse_bases(v).ok_or_else(err)?);
            } else if let Some(v) = part.strip_prefix("alt=") {
                detail.alt_codon = Some(parse_bases(v).ok_or_else(err)?);
            } else {
                return Err(err());
            }
        }
        Ok(detail)
    }
}

fn bases_str(b: [u8; 3]) -> String {
    b.iter().map(|&c| c as char).collect()
}

fn parse_bases(s: &str) -> Option<[u8; 3]> {
    let b = s.as_bytes();
    (b.len() == 3 && b.iter().all(|c| c.is_ascii_alphabetic())).then(|| [b[0], b[1], b[2]])
}

/// One functional label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnnotationLabel {
    Upstream,
    Downstream,
    Utr5,
    Utr3,
    Intron,
    Exon,
    /// Coding change that could not be resolved to a codon.
    Snv,
    Synonymous,
    Nonsynonymous,
    StopGain,
    StopLost,
    StartGain,
    StartLose,
    NormalSpliceSite,
    EssentialSpliceSite,
    Intergenic,
    Codon(CodonDetail),
}

impl AnnotationLabel {
    /// Every label without a payload, in declaration order.
    pub const SIMPLE: [AnnotationLabel; 16] = [
        AnnotationLabel::Upstream,
        AnnotationLabel::Downstream,
        AnnotationLabel::Utr5,
        AnnotationLabel::Utr3,
        AnnotationLabel::Intron,
        AnnotationLabel::Exon,
        AnnotationLabel::Snv,
        AnnotationLabel::Synonymous,
        AnnotationLabel::Nonsynonymous,
        AnnotationLabel::StopGain,
        AnnotationLabel::StopLost,
        AnnotationLabel::StartGain,
        AnnotationLabel::StartLose,
        AnnotationLabel::NormalSpliceSite,
        AnnotationLabel::EssentialSpliceSite,
        AnnotationLabel::Intergenic,
    ];

    /// Category name; codon tokens collapse to `Codon`.
    pub fn name(&self) -> &'static str {
        match self {
            AnnotationLabel::Upstream => "Upstream",
            AnnotationLabel::Downstream => "Downstream",
            AnnotationLabel::Utr5 => "Utr5",
            AnnotationLabel::Utr3 => "Utr3",
            AnnotationLabel::Intron => "Intron",
            AnnotationLabel::Exon => "Exon",
            AnnotationLabel::Snv => "SNV",
            AnnotationLabel::Synonymous => "Synonymous",
            AnnotationLabel::Nonsynonymous => "Nonsynonymous",
            AnnotationLabel::StopGain => "Stop_Gain",
            AnnotationLabel::StopLost => "Stop_Lost",
            AnnotationLabel::StartGain => "Start_Gain",
            AnnotationLabel::StartLose => "Start_Lose",
            AnnotationLabel::NormalSpliceSite => "Normal_Splice_Site",
            AnnotationLabel::EssentialSpliceSite => "Essential_Splice_Site",
            AnnotationLabel::Intergenic => "Intergenic",
            AnnotationLabel::Codon(_) => "Codon",
        }
    }
}

impl From<SpliceSite> for AnnotationLabel {
    fn from(s: SpliceSite) -> Self {
        match s {
            SpliceSite::Normal => AnnotationLabel::NormalSpliceSite,
            SpliceSite::Essential => AnnotationLabel::EssentialSpliceSite,
        }
    }
}

impl fmt::Display for AnnotationLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotationLabel::Codon(d) => write!(f, "{d}"),
            other => f.write_str(other.name()),
        }
    }
}

impl FromStr for AnnotationLabel {
    type Err = LabelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(label) = Self::SIMPLE.iter().find(|l| l.name() == s) {
            return Ok(*label);
        }
        if s.starts_with("codon=") {
            return s.parse().map(AnnotationLabel::Codon);
        }
        Err(LabelParseError(s.to_string()))
    }
}

/// Ordered, non-empty label sequence for one (variant, gene) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub labels: Vec<AnnotationLabel>,
    /// Distance to the transcript for upstream/downstream hits.
    pub distance: Option<u32>,
}

impl Annotation {
    fn single(label: AnnotationLabel, distance: Option<u32>) -> Self {
        Self {
            labels: vec![label],
            distance,
        }
    }

    /// First label; `None` only for a hand-built empty annotation.
    pub fn primary(&self) -> Option<AnnotationLabel> {
        self.labels.first().copied()
    }

    pub fn contains(&self, label: AnnotationLabel) -> bool {
        self.labels.contains(&label)
    }

    pub fn codon(&self) -> Option<&CodonDetail> {
        self.labels.iter().find_map(|l| match l {
            AnnotationLabel::Codon(d) => Some(d),
            _ => None,
        })
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, label) in self.labels.iter().enumerate() {
            if i > 0 {
                write!(f, "{LABEL_SEPARATOR}")?;
            }
            write!(f, "{label}")?;
        }
        Ok(())
    }
}

impl FromStr for Annotation {
    type Err = LabelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(LabelParseError(s.to_string()));
        }
        let labels = s
            .split(LABEL_SEPARATOR)
            .map(str::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            labels,
            distance: None,
        })
    }
}

/// Applies the classification rules for one set of parameters and an
/// optional reference sequence.
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'a> {
    params: &'a GeneAnnotationParam,
    reference: Option<&'a SequenceStore>,
}

impl<'a> Classifier<'a> {
    pub fn new(params: &'a GeneAnnotationParam, reference: Option<&'a SequenceStore>) -> Self {
        Self { params, reference }
    }

    /// Classify `variant` against `gene`.
    ///
    /// # Example
    /// ```
    /// use gene_anno::{Classifier, GeneAnnotationParam, GeneModel, RefBlock, Strand, Variant};
    /// use gene_anno::AnnotationLabel;
    ///
    /// let gene = GeneModel::new(
    ///     "G", "NR_1", "chr1", Strand::Plus,
    ///     RefBlock::from_one_based(1000, 2000), None,
    ///     vec![RefBlock::from_one_based(1000, 2000)],
    /// ).unwrap();
    /// let params = GeneAnnotationParam::default();
    /// let ann = Classifier::new(&params, None)
    ///     .classify(&gene, &Variant::new("chr1", 600, "A", "G").unwrap());
    ///
    /// assert_eq!(ann.labels, vec![AnnotationLabel::Upstream]);
    /// assert_eq!(ann.distance, Some(400));
    /// ```
    pub fn classify(&self, gene: &GeneModel, variant: &Variant) -> Annotation {
        let pos = variant.pos0();
        let p = self.params;

        if let Some(d) = gene.is_upstream(pos, p.upstream_range) {
            return Annotation::single(AnnotationLabel::Upstream, Some(d));
        }
        if let Some(d) = gene.is_downstream(pos, p.downstream_range) {
            return Annotation::single(AnnotationLabel::Downstream, Some(d));
        }

        let mut labels = Vec::with_capacity(4);
        if gene.is_exon(pos).is_some() {
            labels.push(AnnotationLabel::Exon);
            if !gene.is_non_coding() {
                if gene.is_5prime_utr(pos).is_some() {
                    labels.push(AnnotationLabel::Utr5);
                    if self.creates_start(gene, variant) {
                        labels.push(AnnotationLabel::StartGain);
                    }
                } else if gene.is_3prime_utr(pos).is_some() {
                    labels.push(AnnotationLabel::Utr3);
                } else {
                    match gene.calculate_codon(pos) {
                        Some(codon) => {
                            let (detail, effect) = self.codon_change(gene, &codon, variant);
                            labels.push(AnnotationLabel::Codon(detail));
                            labels.extend(effect);
                        }
                        None => labels.push(AnnotationLabel::Snv),
                    }
                }
            }
        } else if gene.is_intron(pos).is_some() {
            labels.push(AnnotationLabel::Intron);
        } else {
            return Annotation::single(AnnotationLabel::Intergenic, None);
        }

        if let Some(site) = gene.is_splice_site(pos, p.splice_into_exon, p.splice_into_intron) {
            labels.push(site.into());
        }

        Annotation {
            labels,
            distance: None,
        }
    }

    /// Reference base at a 0-based position, in transcription orientation.
    fn strand_base(&self, gene: &GeneModel, pos: u32) -> Option<u8> {
        let store = self.reference?;
        match store.base_at(&gene.chrom, zero_based_to_one(pos)) {
            Ok(b) => {
                let b = if b.is_ascii_alphabetic() { b.to_ascii_uppercase() } else { b'N' };
                Some(match gene.strand {
                    Strand::Plus => b,
                    Strand::Minus => complement(b),
                })
            }
            Err(e) => {
                debug!("no reference base for {}:{}: {}", gene.chrom, zero_based_to_one(pos), e);
                None
            }
        }
    }

    fn strand_codon(&self, gene: &GeneModel, positions: [u32; 3]) -> Option<[u8; 3]> {
        Some([
            self.strand_base(gene, positions[0])?,
            self.strand_base(gene, positions[1])?,
            self.strand_base(gene, positions[2])?,
        ])
    }

    /// Alternate base in transcription orientation, for A/C/G/T substitutions.
    fn strand_alt(&self, gene: &GeneModel, variant: &Variant) -> Option<u8> {
        if !variant.is_snv() {
            return None;
        }
        let alt = variant.alt_allele.as_bytes()[0].to_ascii_uppercase();
        Some(match gene.strand {
            Strand::Plus => alt,
            Strand::Minus => complement(alt),
        })
    }

    fn check_ref_allele(&self, gene: &GeneModel, variant: &Variant, strand_ref: u8) {
        let genomic = match gene.strand {
            Strand::Plus => strand_ref,
            Strand::Minus => complement(strand_ref),
        };
        let given = variant.ref_allele.as_bytes()[0].to_ascii_uppercase();
        if given != genomic {
            warn!(
                "reference allele {} at {}:{} does not match reference base {}",
                variant.ref_allele,
                variant.chrom,
                variant.pos(),
                genomic as char
            );
        }
    }

    fn codon_change(
        &self,
        gene: &GeneModel,
        codon: &Codon,
        variant: &Variant,
    ) -> (CodonDetail, Option<AnnotationLabel>) {
        let ref_codon = self.strand_codon(gene, codon.positions);
        let mut detail = CodonDetail {
            index: codon.index,
            positions: codon.positions,
            ref_codon,
            alt_codon: None,
        };

        let (Some(ref_codon), Some(alt)) = (ref_codon, self.strand_alt(gene, variant)) else {
            return (detail, None);
        };
        let frame = codon.frame as usize;
        self.check_ref_allele(gene, variant, ref_codon[frame]);

        let mut alt_codon = ref_codon;
        alt_codon[frame] = alt;
        detail.alt_codon = Some(alt_codon);

        (detail, codon_effect(codon.index, ref_codon, alt_codon))
    }

    /// Whether a 5' UTR substitution creates an ATG that the reference lacks,
    /// reading the mature transcript across splice junctions.
    fn creates_start(&self, gene: &GeneModel, variant: &Variant) -> bool {
        let Some(alt) = self.strand_alt(gene, variant) else {
            return false;
        };
        let Some(t) = gene.transcript_offset(variant.pos0()) else {
            return false;
        };

        (t.saturating_sub(2)..=t).any(|first| {
            let positions = [
                gene.transcript_position(first),
                gene.transcript_position(first + 1),
                gene.transcript_position(first + 2),
            ];
            let [Some(a), Some(b), Some(c)] = positions else {
                return false;
            };
            let Some(ref_codon) = self.strand_codon(gene, [a, b, c]) else {
                return false;
            };
            let mut alt_codon = ref_codon;
            alt_codon[(t - first) as usize] = alt;
            !is_start(ref_codon) && is_start(alt_codon)
        })
    }
}

/// Effect of replacing `ref_codon` by `alt_codon` at codon `index`.
///
/// `None` if either codon contains a non-ACGT base.
pub fn codon_effect(index: u32, ref_codon: [u8; 3], alt_codon: [u8; 3]) -> Option<AnnotationLabel> {
    let ref_aa = codon::translate(ref_codon)?;
    let alt_aa = codon::translate(alt_codon)?;

    let (ref_stop, alt_stop) = (is_stop(ref_codon), is_stop(alt_codon));

    let label = if index == 0 && is_start(ref_codon) && !is_start(alt_codon) {
        AnnotationLabel::StartLose
    } else if ref_stop && !alt_stop {
        AnnotationLabel::StopLost
    } else if !ref_stop && alt_stop {
        AnnotationLabel::StopGain
    } else if ref_aa == alt_aa {
        AnnotationLabel::Synonymous
    } else {
        AnnotationLabel::Nonsynonymous
    };
    Some(label)
}
