use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use log::info;
use serde::{Serialize, Deserialize};

use crate::annotation::io::{GeneRecordReader, ParseError};
use crate::model::gene::GeneModel;
use crate::model::types::{GeneAnnotationParam, GeneId};
use crate::types::Strand;

const MAGIC: &[u8; 4] = b"GAX1";
const VERSION_STR: &str = env!("CARGO_PKG_VERSION");

/// A gene's transcript span widened by the upstream/downstream ranges.
/// 0-based, half-open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Footprint {
    pub start: u32,
    pub end: u32,
    pub gene_id: GeneId,
}

impl Footprint {
    /// Strand-aware extended footprint of `gene`.
    pub fn of(gene: &GeneModel, gene_id: GeneId, params: &GeneAnnotationParam) -> Self {
        let (before, after) = match gene.strand {
            Strand::Plus => (params.upstream_range, params.downstream_range),
            Strand::Minus => (params.downstream_range, params.upstream_range),
        };
        Self {
            start: gene.tx.start.saturating_sub(before),
            end: gene.tx.end.saturating_add(after),
            gene_id,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.end - self.start
    }
}

/// Per-chromosome footprints sorted by start.
///
/// `max_width` bounds how far before a query position an overlapping
/// footprint can start, which turns lookup into a binary search plus a short scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChrGenes {
    pub footprints: Vec<Footprint>,
    pub max_width: u32,
}

impl ChrGenes {
    fn finalize(&mut self) {
        self.footprints.sort_unstable_by_key(|f| (f.start, f.gene_id));
        self.max_width = self.footprints.iter().map(|f| f.width()).max().unwrap_or(0);
    }

    /// Gene ids whose footprint contains `pos`, ordered by footprint start.
    pub fn overlapping(&self, pos: u32) -> impl Iterator<Item = GeneId> + '_ {
        let lo = pos.saturating_sub(self.max_width.saturating_sub(1));
        let first = self.footprints.partition_point(|f| f.start < lo);
        self.footprints[first..]
            .iter()
            .take_while(move |f| f.start <= pos)
            .filter(move |f| pos < f.end)
            .map(|f| f.gene_id)
    }
}

/// Genes grouped by chromosome, answering "which genes' extended footprint
/// covers this position".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneIndex {
    params: GeneAnnotationParam,

    pub chr_names: Vec<String>,
    chr_to_id: HashMap<String, usize>,

    pub genes: Vec<GeneModel>,
    pub chr_genes: Vec<ChrGenes>,
}

/// Human-readable summary of the `GeneIndex`.
///
/// Prints the global gene/chromosome counts with the active ranges, then one
/// line per chromosome with gene counts and the widest footprint.
impl fmt::Display for GeneIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "GeneIndex: {} genes, {} chromosomes, upstream={} bp, downstream={} bp, splice exon/intron={}/{} bp",
            self.genes.len(),
            self.chr_names.len(),
            self.params.upstream_range,
            self.params.downstream_range,
            self.params.splice_into_exon,
            self.params.splice_into_intron,
        )?;

        for (i, chr_name) in self.chr_names.iter().enumerate() {
            let Some(chr) = self.chr_genes.get(i) else {
                writeln!(f, "  - {}: <missing ChrGenes>", chr_name)?;
                continue;
            };
            let n = chr.footprints.len();
            let coding = chr
                .footprints
                .iter()
                .filter(|fp| !self.genes[fp.gene_id].is_non_coding())
                .count();
            writeln!(
                f,
                "  - {}: genes={}, coding={}, non_coding={}, max_footprint={} bp",
                chr_name,
                n,
                coding,
                n - coding,
                chr.max_width
            )?;
        }

        Ok(())
    }
}

impl GeneIndex {
    pub fn new(params: GeneAnnotationParam) -> Self {
        Self {
            params,
            chr_names: Vec::new(),
            chr_to_id: HashMap::new(),
            genes: Vec::new(),
            chr_genes: Vec::new(),
        }
    }

    /// Build directly from gene models.
    pub fn from_genes<I>(params: GeneAnnotationParam, genes: I) -> Self
    where
        I: IntoIterator<Item = GeneModel>,
    {
        let mut idx = Self::new(params);
        for g in genes {
            idx.push_gene(g);
        }
        idx.build_footprints();
        idx
    }

    /// Build from a refFlat / genePred table.
    ///
    /// # Example
    /// ```
    /// use std::io::Cursor;
    /// use gene_anno::{GeneAnnotationParam, GeneIndex};
    ///
    /// let table = "G1\tNM_1\tchr1\t+\t1000\t2000\t1000\t1000\t1\t1000,\t2000,\n";
    /// let idx = GeneIndex::new(GeneAnnotationParam::default())
    ///     .from_reader(Cursor::new(table.as_bytes()))
    ///     .unwrap();
    ///
    /// assert_eq!(idx.genes.len(), 1);
    /// assert_eq!(idx.lookup("chr1", 600).len(), 1);
    /// assert!(idx.lookup("chr1", 400).is_empty());
    /// assert!(idx.lookup("chr2", 1500).is_empty());
    /// ```
    pub fn from_reader<R: BufRead>(mut self, reader: R) -> Result<Self, ParseError> {
        for gene in GeneRecordReader::new(reader).records() {
            self.push_gene(gene?);
        }
        self.build_footprints();
        Ok(self)
    }

    /// Build from a gene-model file (plain or `.gz`).
    pub fn from_path<P: AsRef<Path>>(path: P, params: GeneAnnotationParam) -> Result<Self> {
        let path = path.as_ref();
        let f = File::open(path)
            .with_context(|| format!("open gene file {}", path.display()))?;

        let is_gz = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("gz"))
            .unwrap_or(false);

        let reader: Box<dyn BufRead> = if is_gz {
            Box::new(BufReader::new(GzDecoder::new(f)))
        } else {
            Box::new(BufReader::new(f))
        };

        let idx = Self::new(params)
            .from_reader(reader)
            .with_context(|| format!("build gene index from {}", path.display()))?;
        info!(
            "Indexed {} gene models on {} chromosomes from {}",
            idx.genes.len(),
            idx.chr_names.len(),
            path.display()
        );
        Ok(idx)
    }

    pub fn params(&self) -> &GeneAnnotationParam {
        &self.params
    }

    /// Replace the classification ranges and rebuild all footprints.
    pub fn set_params(&mut self, params: GeneAnnotationParam) {
        self.params = params;
        self.build_footprints();
    }

    pub fn chr_id(&self, chrom: &str) -> Option<usize> {
        self.chr_to_id.get(chrom).copied()
    }

    /// Ids of the genes on `chrom` whose extended footprint contains the
    /// 0-based position `pos`. Unknown chromosomes give an empty result.
    pub fn lookup_ids(&self, chrom: &str, pos: u32) -> Vec<GeneId> {
        match self.chr_id(chrom).and_then(|id| self.chr_genes.get(id)) {
            Some(cg) => cg.overlapping(pos).collect(),
            None => Vec::new(),
        }
    }

    /// Genes on `chrom` whose extended footprint contains the 0-based position `pos`.
    pub fn lookup(&self, chrom: &str, pos: u32) -> Vec<&GeneModel> {
        self.lookup_ids(chrom, pos)
            .into_iter()
            .map(|id| &self.genes[id])
            .collect()
    }

    // -----------------------
    // Internal helpers
    // -----------------------

    fn intern_chr(&mut self, chr: &str) -> usize {
        if let Some(&id) = self.chr_to_id.get(chr) {
            return id;
        }
        let id = self.chr_names.len();
        self.chr_names.push(chr.to_string());
        self.chr_to_id.insert(chr.to_string(), id);
        self.chr_genes.push(ChrGenes::default());
        id
    }

    fn push_gene(&mut self, gene: GeneModel) {
        self.intern_chr(&gene.chrom);
        self.genes.push(gene);
    }

    fn build_footprints(&mut self) {
        for cg in &mut self.chr_genes {
            cg.footprints.clear();
        }
        for (gene_id, gene) in self.genes.iter().enumerate() {
            let chr_id = self.chr_to_id[&gene.chrom];
            self.chr_genes[chr_id]
                .footprints
                .push(Footprint::of(gene, gene_id, &self.params));
        }
        for cg in &mut self.chr_genes {
            cg.finalize();
        }
    }

    /// Serialize this index with a small header (magic + crate version) and a bincode payload.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut f = File::create(path)
            .with_context(|| format!("create index file {}", path.display()))?;

        f.write_all(MAGIC)?;

        let v = VERSION_STR.as_bytes();
        let len = v.len() as u16;
        f.write_all(&len.to_le_bytes())?;
        f.write_all(v)?;

        let payload = bincode::serialize(self)?;
        f.write_all(&payload)?;

        Ok(())
    }

    /// Load an index written by `save()`. Rejects wrong file types and version mismatches.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut f = File::open(path)
            .with_context(|| format!("open index file {}", path.display()))?;

        let mut magic = [0u8; 4];
        f.read_exact(&mut magic)?;
        if &magic != MAGIC {
            bail!("Not a GeneIndex file (bad magic): {}", path.display());
        }

        let mut len_buf = [0u8; 2];
        f.read_exact(&mut len_buf)?;
        let len = u16::from_le_bytes(len_buf) as usize;

        let mut ver_buf = vec![0u8; len];
        f.read_exact(&mut ver_buf)?;
        let file_version = std::str::from_utf8(&ver_buf)?;

        if file_version != VERSION_STR {
            bail!(
                "Index version mismatch: file={}, binary={}",
                file_version,
                VERSION_STR
            );
        }

        let mut payload = Vec::new();
        f.read_to_end(&mut payload)?;
        let idx: Self = bincode::deserialize(&payload)?;

        Ok(idx)
    }
}
