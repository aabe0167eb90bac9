use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::model::types::{Codon, SpliceSite, UtrHit, ESSENTIAL_SPLICE_BASES};
use crate::types::{RefBlock, Strand};

/// Structural problems found while assembling a `GeneModel`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("transcript has no exons")]
    NoExons,

    #[error("exon [{start}, {end}) lies outside transcript [{tx_start}, {tx_end})")]
    ExonOutsideTranscript { start: u32, end: u32, tx_start: u32, tx_end: u32 },

    #[error("exons span [{first_start}, {last_end}) but transcript is [{tx_start}, {tx_end})")]
    TranscriptEndsNotExonic { first_start: u32, last_end: u32, tx_start: u32, tx_end: u32 },

    #[error("CDS [{start}, {end}) lies outside transcript [{tx_start}, {tx_end})")]
    CdsOutsideTranscript { start: u32, end: u32, tx_start: u32, tx_end: u32 },
}

/// One transcript of a gene, as read from a refFlat / genePred line.
///
/// All spans are 0-based, half-open. `exons` are sorted, non-overlapping and
/// lie inside `tx`; the gaps between consecutive exons are the introns.
/// `cds` is `None` for non-coding transcripts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneModel {
    pub name: String,
    pub transcript: String,
    pub chrom: String,
    pub strand: Strand,
    pub tx: RefBlock,
    pub cds: Option<RefBlock>,
    exons: Vec<RefBlock>,
}

impl GeneModel {
    /// Assemble a model, sorting and merging exons.
    pub fn new(
        name: impl Into<String>,
        transcript: impl Into<String>,
        chrom: impl Into<String>,
        strand: Strand,
        tx: RefBlock,
        cds: Option<RefBlock>,
        exons: Vec<RefBlock>,
    ) -> Result<Self, ModelError> {
        let exons = merge_blocks(exons);
        if exons.is_empty() {
            return Err(ModelError::NoExons);
        }
        if let Some(e) = exons.iter().find(|e| !tx.contains(**e)) {
            return Err(ModelError::ExonOutsideTranscript {
                start: e.start,
                end: e.end,
                tx_start: tx.start,
                tx_end: tx.end,
            });
        }
        // first and last exon must reach the transcript ends
        let (first_start, last_end) = (exons[0].start, exons[exons.len() - 1].end);
        if first_start != tx.start || last_end != tx.end {
            return Err(ModelError::TranscriptEndsNotExonic {
                first_start,
                last_end,
                tx_start: tx.start,
                tx_end: tx.end,
            });
        }
        if let Some(c) = cds {
            if !tx.contains(c) {
                return Err(ModelError::CdsOutsideTranscript {
                    start: c.start,
                    end: c.end,
                    tx_start: tx.start,
                    tx_end: tx.end,
                });
            }
        }

        Ok(Self {
            name: name.into(),
            transcript: transcript.into(),
            chrom: chrom.into(),
            strand,
            tx,
            cds,
            exons,
        })
    }

    pub fn exons(&self) -> &[RefBlock] {
        &self.exons
    }

    pub fn is_non_coding(&self) -> bool {
        self.cds.is_none()
    }

    // -----------------------
    // Flanks
    // -----------------------

    /// Distance of `pos` before the transcript's 5' end, if within `margin`.
    ///
    /// The base adjacent to the transcript has distance 1.
    pub fn is_upstream(&self, pos: u32, margin: u32) -> Option<u32> {
        let d = match self.strand {
            Strand::Plus => self.distance_left(pos),
            Strand::Minus => self.distance_right(pos),
        }?;
        (d <= margin).then_some(d)
    }

    /// Distance of `pos` past the transcript's 3' end, if within `margin`.
    pub fn is_downstream(&self, pos: u32, margin: u32) -> Option<u32> {
        let d = match self.strand {
            Strand::Plus => self.distance_right(pos),
            Strand::Minus => self.distance_left(pos),
        }?;
        (d <= margin).then_some(d)
    }

    fn distance_left(&self, pos: u32) -> Option<u32> {
        (pos < self.tx.start).then(|| self.tx.start - pos)
    }

    fn distance_right(&self, pos: u32) -> Option<u32> {
        (pos >= self.tx.end).then(|| pos - self.tx.end + 1)
    }

    // -----------------------
    // Exons / introns
    // -----------------------

    /// Index (genomic order) of the exon containing `pos`.
    pub fn is_exon(&self, pos: u32) -> Option<usize> {
        let i = self.exons.partition_point(|e| e.end <= pos);
        (i < self.exons.len() && self.exons[i].start <= pos).then_some(i)
    }

    /// Index (genomic order) of the intron containing `pos`.
    ///
    /// Intron `i` lies between exon `i` and exon `i + 1`.
    pub fn is_intron(&self, pos: u32) -> Option<usize> {
        let i = self.exons.partition_point(|e| e.end <= pos);
        (i > 0 && i < self.exons.len() && pos < self.exons[i].start).then(|| i - 1)
    }

    /// Exonic bases inside `[start, end)`.
    fn exonic_between(&self, start: u32, end: u32) -> u32 {
        if end <= start {
            return 0;
        }
        let window = RefBlock { start, end };
        self.exons
            .iter()
            .filter_map(|e| e.intersect(window))
            .map(|b| b.len())
            .sum()
    }

    // -----------------------
    // UTRs
    // -----------------------

    pub fn is_5prime_utr(&self, pos: u32) -> Option<UtrHit> {
        let cds = self.cds?;
        self.is_exon(pos)?;
        match self.strand {
            Strand::Plus if pos < cds.start => Some(UtrHit {
                offset: self.exonic_between(self.tx.start, pos),
                length: self.exonic_between(self.tx.start, cds.start),
            }),
            Strand::Minus if pos >= cds.end => Some(UtrHit {
                offset: self.exonic_between(pos + 1, self.tx.end),
                length: self.exonic_between(cds.end, self.tx.end),
            }),
            _ => None,
        }
    }

    pub fn is_3prime_utr(&self, pos: u32) -> Option<UtrHit> {
        let cds = self.cds?;
        self.is_exon(pos)?;
        match self.strand {
            Strand::Plus if pos >= cds.end => Some(UtrHit {
                offset: self.exonic_between(cds.end, pos),
                length: self.exonic_between(cds.end, self.tx.end),
            }),
            Strand::Minus if pos < cds.start => Some(UtrHit {
                offset: self.exonic_between(pos + 1, cds.start),
                length: self.exonic_between(self.tx.start, cds.start),
            }),
            _ => None,
        }
    }

    // -----------------------
    // Spliced coordinates
    // -----------------------

    /// Offset of `pos` in the spliced sequence of `region`, counted in
    /// transcription direction. `None` if `pos` is not exonic or outside `region`.
    fn spliced_offset(&self, region: RefBlock, pos: u32) -> Option<u32> {
        if !region.contains_pos(pos) {
            return None;
        }
        self.is_exon(pos)?;
        Some(match self.strand {
            Strand::Plus => self.exonic_between(region.start, pos),
            Strand::Minus => self.exonic_between(pos + 1, region.end),
        })
    }

    /// Inverse of `spliced_offset`.
    fn spliced_position(&self, region: RefBlock, offset: u32) -> Option<u32> {
        let blocks = self.exons.iter().filter_map(|e| e.intersect(region));
        let mut rest = offset;
        match self.strand {
            Strand::Plus => {
                for b in blocks {
                    if rest < b.len() {
                        return Some(b.start + rest);
                    }
                    rest -= b.len();
                }
            }
            Strand::Minus => {
                for b in blocks.rev() {
                    if rest < b.len() {
                        return Some(b.end - 1 - rest);
                    }
                    rest -= b.len();
                }
            }
        }
        None
    }

    /// Offset of `pos` in the mature transcript (0 = 5'-most exonic base).
    pub fn transcript_offset(&self, pos: u32) -> Option<u32> {
        self.spliced_offset(self.tx, pos)
    }

    /// Genomic position of a mature-transcript offset.
    pub fn transcript_position(&self, offset: u32) -> Option<u32> {
        self.spliced_position(self.tx, offset)
    }

    /// Offset of `pos` from the first coding base.
    pub fn coding_offset(&self, pos: u32) -> Option<u32> {
        self.spliced_offset(self.cds?, pos)
    }

    pub fn coding_length(&self) -> u32 {
        self.cds.map_or(0, |c| self.exonic_between(c.start, c.end))
    }

    /// Locate the codon containing `pos`.
    ///
    /// `None` outside the coding exons, and for a trailing partial codon when
    /// the coding length is not a multiple of three.
    pub fn calculate_codon(&self, pos: u32) -> Option<Codon> {
        let cds = self.cds?;
        let offset = self.coding_offset(pos)?;
        let index = offset / 3;
        let first = index * 3;
        if first + 3 > self.coding_length() {
            return None;
        }
        Some(Codon {
            index,
            positions: [
                self.spliced_position(cds, first)?,
                self.spliced_position(cds, first + 1)?,
                self.spliced_position(cds, first + 2)?,
            ],
            frame: (offset % 3) as u8,
        })
    }

    // -----------------------
    // Splice sites
    // -----------------------

    /// Splice-site check around internal exon/intron boundaries.
    ///
    /// - intron side: within `into_intron` bases of a boundary; the first/last
    ///   `ESSENTIAL_SPLICE_BASES` intronic bases are `Essential`, the rest `Normal`
    /// - exon side: within `into_exon` bases of a boundary, always `Normal`
    ///
    /// Transcript ends are not splice sites.
    pub fn is_splice_site(&self, pos: u32, into_exon: u32, into_intron: u32) -> Option<SpliceSite> {
        if let Some(i) = self.is_intron(pos) {
            let left = self.exons[i];
            let right = self.exons[i + 1];
            let d = (pos - left.end + 1).min(right.start - pos);
            if d > into_intron {
                return None;
            }
            return Some(if d <= ESSENTIAL_SPLICE_BASES {
                SpliceSite::Essential
            } else {
                SpliceSite::Normal
            });
        }

        let i = self.is_exon(pos)?;
        let exon = self.exons[i];
        let near_left = i > 0 && pos - exon.start < into_exon;
        let near_right = i + 1 < self.exons.len() && exon.end - pos <= into_exon;
        (near_left || near_right).then_some(SpliceSite::Normal)
    }
}

/// Sort blocks by start and merge overlapping/adjacent ones.
fn merge_blocks(mut blocks: Vec<RefBlock>) -> Vec<RefBlock> {
    blocks.retain(|b| !b.is_empty());
    if blocks.is_empty() {
        return blocks;
    }
    blocks.sort_by_key(|b| (b.start, b.end));

    let mut merged: Vec<RefBlock> = Vec::with_capacity(blocks.len());
    let mut cur = blocks[0];
    for &b in &blocks[1..] {
        if b.start <= cur.end {
            cur.end = cur.end.max(b.end);
        } else {
            merged.push(cur);
            cur = b;
        }
    }
    merged.push(cur);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---------- small helpers ----------

    /// Forward gene: exons [100,150) [200,250) [300,350), CDS [120,320).
    fn coding_plus() -> GeneModel {
        GeneModel::new(
            "G",
            "T",
            "chr1",
            Strand::Plus,
            RefBlock::new(100, 350),
            Some(RefBlock::new(120, 320)),
            vec![RefBlock::new(300, 350), RefBlock::new(100, 150), RefBlock::new(200, 250)],
        )
        .unwrap()
    }

    fn coding_minus() -> GeneModel {
        let mut g = coding_plus();
        g.strand = Strand::Minus;
        g
    }

    fn non_coding(strand: Strand) -> GeneModel {
        GeneModel::new(
            "NC",
            "NR_1",
            "chr1",
            strand,
            RefBlock::new(1000, 2000),
            None,
            vec![RefBlock::new(1000, 2000)],
        )
        .unwrap()
    }

    #[test]
    fn exons_are_sorted_and_merged() {
        let g = GeneModel::new(
            "G",
            "T",
            "chr1",
            Strand::Plus,
            RefBlock::new(0, 80),
            None,
            vec![RefBlock::new(50, 60), RefBlock::new(0, 10), RefBlock::new(55, 70), RefBlock::new(70, 80)],
        )
        .unwrap();
        assert_eq!(g.exons(), &[RefBlock::new(0, 10), RefBlock::new(50, 80)]);
        for w in g.exons().windows(2) {
            assert!(w[0].end < w[1].start);
        }
    }

    #[test]
    fn rejects_structures_outside_transcript() {
        let err = GeneModel::new("G", "T", "c", Strand::Plus, RefBlock::new(10, 20), None, vec![RefBlock::new(5, 15)]);
        assert!(matches!(err, Err(ModelError::ExonOutsideTranscript { .. })));

        let err = GeneModel::new(
            "G",
            "T",
            "c",
            Strand::Plus,
            RefBlock::new(10, 20),
            Some(RefBlock::new(12, 25)),
            vec![RefBlock::new(10, 20)],
        );
        assert!(matches!(err, Err(ModelError::CdsOutsideTranscript { .. })));

        let err = GeneModel::new("G", "T", "c", Strand::Plus, RefBlock::new(10, 20), None, vec![]);
        assert_eq!(err, Err(ModelError::NoExons));
    }

    #[test]
    fn rejects_transcript_ends_outside_exons() {
        // first exon starts 50 bases after the transcript start
        let err = GeneModel::new(
            "G1",
            "NM_1",
            "chr1",
            Strand::Plus,
            RefBlock::new(999, 1300),
            None,
            vec![RefBlock::new(1049, 1100), RefBlock::new(1200, 1300)],
        );
        assert_eq!(
            err,
            Err(ModelError::TranscriptEndsNotExonic { first_start: 1049, last_end: 1300, tx_start: 999, tx_end: 1300 })
        );

        let err = GeneModel::new("G", "T", "c", Strand::Minus, RefBlock::new(10, 40), None, vec![RefBlock::new(10, 30)]);
        assert!(matches!(err, Err(ModelError::TranscriptEndsNotExonic { last_end: 30, .. })));
    }

    #[test]
    fn upstream_downstream_forward() {
        let g = non_coding(Strand::Plus);
        assert_eq!(g.is_upstream(999, 500), Some(1));
        assert_eq!(g.is_upstream(500, 500), Some(500));
        assert_eq!(g.is_upstream(499, 500), None);
        assert_eq!(g.is_upstream(1000, 500), None);
        assert_eq!(g.is_upstream(2000, 500), None);

        assert_eq!(g.is_downstream(2000, 500), Some(1));
        assert_eq!(g.is_downstream(2499, 500), Some(500));
        assert_eq!(g.is_downstream(2500, 500), None);
        assert_eq!(g.is_downstream(999, 500), None);
    }

    #[test]
    fn upstream_downstream_reverse() {
        let g = non_coding(Strand::Minus);
        assert_eq!(g.is_upstream(2000, 500), Some(1));
        assert_eq!(g.is_upstream(999, 500), None);
        assert_eq!(g.is_downstream(999, 500), Some(1));
        assert_eq!(g.is_downstream(2000, 500), None);
    }

    #[test]
    fn exon_and_intron_are_exclusive_and_exhaustive_inside_transcript() {
        let g = coding_plus();
        for pos in g.tx.start..g.tx.end {
            let e = g.is_exon(pos).is_some();
            let i = g.is_intron(pos).is_some();
            assert!(e ^ i, "pos {pos}: exon={e} intron={i}");
        }
        assert_eq!(g.is_exon(100), Some(0));
        assert_eq!(g.is_exon(149), Some(0));
        assert_eq!(g.is_intron(150), Some(0));
        assert_eq!(g.is_exon(200), Some(1));
        assert_eq!(g.is_intron(299), Some(1));
        assert_eq!(g.is_exon(349), Some(2));
        assert_eq!(g.is_exon(350), None);
        assert_eq!(g.is_intron(350), None);
        assert_eq!(g.is_intron(99), None);
    }

    #[test]
    fn utr_forward() {
        let g = coding_plus();
        // 5' UTR: [100,120)
        assert_eq!(g.is_5prime_utr(100), Some(UtrHit { offset: 0, length: 20 }));
        assert_eq!(g.is_5prime_utr(119), Some(UtrHit { offset: 19, length: 20 }));
        assert_eq!(g.is_5prime_utr(120), None);
        // 3' UTR: [320,350)
        assert_eq!(g.is_3prime_utr(320), Some(UtrHit { offset: 0, length: 30 }));
        assert_eq!(g.is_3prime_utr(349), Some(UtrHit { offset: 29, length: 30 }));
        assert_eq!(g.is_3prime_utr(319), None);
        // intronic is never UTR
        assert_eq!(g.is_5prime_utr(160), None);
    }

    #[test]
    fn utr_reverse_swaps_sides() {
        let g = coding_minus();
        assert_eq!(g.is_5prime_utr(349), Some(UtrHit { offset: 0, length: 30 }));
        assert_eq!(g.is_5prime_utr(320), Some(UtrHit { offset: 29, length: 30 }));
        assert_eq!(g.is_3prime_utr(119), Some(UtrHit { offset: 0, length: 20 }));
        assert_eq!(g.is_3prime_utr(100), Some(UtrHit { offset: 19, length: 20 }));
        assert_eq!(g.is_5prime_utr(100), None);
    }

    #[test]
    fn non_coding_has_no_utr_or_codon() {
        let g = non_coding(Strand::Plus);
        assert!(g.is_non_coding());
        assert_eq!(g.is_5prime_utr(1500), None);
        assert_eq!(g.is_3prime_utr(1500), None);
        assert_eq!(g.calculate_codon(1500), None);
    }

    #[test]
    fn codon_forward_within_exon() {
        let g = coding_plus();
        // coding blocks: [120,150) 30bp, [200,250) 50bp, [300,320) 20bp => 100bp
        assert_eq!(g.coding_length(), 100);
        let c = g.calculate_codon(121).unwrap();
        assert_eq!(c.index, 0);
        assert_eq!(c.positions, [120, 121, 122]);
        assert_eq!(c.frame, 1);
    }

    #[test]
    fn codon_forward_spans_exon_boundary() {
        let g = coding_plus();
        // offset 30 is at 200; codon 9 = offsets 27,28,29 -> 147,148,149; codon 10 = 30.. -> 200..
        let c = g.calculate_codon(149).unwrap();
        assert_eq!(c.index, 9);
        assert_eq!(c.positions, [147, 148, 149]);

        // 80 coding bases before exon 3; codon 26 = offsets 78,79,80 -> 248,249,300
        let c = g.calculate_codon(300).unwrap();
        assert_eq!(c.index, 26);
        assert_eq!(c.positions, [248, 249, 300]);
        assert_eq!(c.frame, 2);
        assert_eq!(g.calculate_codon(248).unwrap().positions, [248, 249, 300]);
    }

    #[test]
    fn codon_partial_trailing_codon_is_none() {
        let g = coding_plus();
        // 100 coding bases: 33 full codons (99 bases), offset 99 -> 319 is partial
        assert!(g.calculate_codon(318).is_some());
        assert_eq!(g.calculate_codon(319), None);
    }

    #[test]
    fn codon_reverse_counts_from_cds_end() {
        let g = coding_minus();
        let c = g.calculate_codon(319).unwrap();
        assert_eq!(c.index, 0);
        assert_eq!(c.positions, [319, 318, 317]);
        // 20 bases in exon 3, then exon 2 from 249 down: codon 6 = offsets 18,19,20 -> 301,300,249
        let c = g.calculate_codon(249).unwrap();
        assert_eq!(c.index, 6);
        assert_eq!(c.positions, [301, 300, 249]);
    }

    #[test]
    fn codon_outside_coding_exons_is_none() {
        let g = coding_plus();
        assert_eq!(g.calculate_codon(110), None); // 5' UTR
        assert_eq!(g.calculate_codon(160), None); // intron
        assert_eq!(g.calculate_codon(330), None); // 3' UTR
    }

    #[test]
    fn transcript_offsets_roundtrip() {
        for g in [coding_plus(), coding_minus()] {
            for pos in [100u32, 149, 200, 249, 300, 349] {
                let off = g.transcript_offset(pos).unwrap();
                assert_eq!(g.transcript_position(off), Some(pos));
            }
            assert_eq!(g.transcript_offset(175), None);
        }
        assert_eq!(coding_plus().transcript_offset(200), Some(50));
        assert_eq!(coding_minus().transcript_offset(349), Some(0));
    }

    #[test]
    fn splice_site_intron_side() {
        let g = coding_plus();
        // intron 0 = [150,200)
        assert_eq!(g.is_splice_site(150, 3, 8), Some(SpliceSite::Essential));
        assert_eq!(g.is_splice_site(151, 3, 8), Some(SpliceSite::Essential));
        assert_eq!(g.is_splice_site(152, 3, 8), Some(SpliceSite::Normal));
        assert_eq!(g.is_splice_site(157, 3, 8), Some(SpliceSite::Normal));
        assert_eq!(g.is_splice_site(158, 3, 8), None);
        assert_eq!(g.is_splice_site(199, 3, 8), Some(SpliceSite::Essential));
        assert_eq!(g.is_splice_site(198, 3, 8), Some(SpliceSite::Essential));
        assert_eq!(g.is_splice_site(197, 3, 8), Some(SpliceSite::Normal));
        assert_eq!(g.is_splice_site(192, 3, 8), Some(SpliceSite::Normal));
        assert_eq!(g.is_splice_site(191, 3, 8), None);
    }

    #[test]
    fn splice_site_exon_side() {
        let g = coding_plus();
        // exon 0 [100,150): only right boundary is internal
        assert_eq!(g.is_splice_site(147, 3, 8), Some(SpliceSite::Normal));
        assert_eq!(g.is_splice_site(149, 3, 8), Some(SpliceSite::Normal));
        assert_eq!(g.is_splice_site(146, 3, 8), None);
        assert_eq!(g.is_splice_site(100, 3, 8), None);
        // exon 1 [200,250): both boundaries
        assert_eq!(g.is_splice_site(200, 3, 8), Some(SpliceSite::Normal));
        assert_eq!(g.is_splice_site(202, 3, 8), Some(SpliceSite::Normal));
        assert_eq!(g.is_splice_site(203, 3, 8), None);
        assert_eq!(g.is_splice_site(247, 3, 8), Some(SpliceSite::Normal));
        // last exon end is the transcript end
        assert_eq!(g.is_splice_site(349, 3, 8), None);
    }

    #[test]
    fn splice_site_window_respects_parameters() {
        let g = coding_plus();
        assert_eq!(g.is_splice_site(151, 3, 1), None);
        assert_eq!(g.is_splice_site(150, 3, 1), Some(SpliceSite::Essential));
        assert_eq!(g.is_splice_site(148, 1, 8), None);
        assert_eq!(g.is_splice_site(149, 1, 8), Some(SpliceSite::Normal));
    }
}
