//! Frequency tables over an annotation run.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;

use crate::annotator::AnnotationRecord;
use crate::classify::AnnotationLabel;
use crate::types::{Variant, VariantKind};

/// Label, base-change, codon-change and indel-length counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyTable {
    pub labels: BTreeMap<String, u64>,
    pub base_changes: BTreeMap<String, u64>,
    pub codon_changes: BTreeMap<String, u64>,
    pub indel_lengths: BTreeMap<i64, u64>,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one variant and its records.
    ///
    /// Labels and codon changes are counted per record; base changes and
    /// indel lengths once per variant. A variant without records counts as
    /// `Intergenic`.
    pub fn add(&mut self, variant: &Variant, records: &[AnnotationRecord<'_>]) {
        if records.is_empty() {
            bump(&mut self.labels, AnnotationLabel::Intergenic.name().to_string());
        }
        for rec in records {
            for label in &rec.annotation.labels {
                bump(&mut self.labels, label.name().to_string());
            }
            if let Some(c) = rec.annotation.codon() {
                if let (Some(r), Some(a)) = (c.ref_codon, c.alt_codon) {
                    bump(&mut self.codon_changes, format!("{}->{}", bases(r), bases(a)));
                }
            }
        }

        if variant.is_snv() {
            let change = format!(
                "{}->{}",
                variant.ref_allele.to_ascii_uppercase(),
                variant.alt_allele.to_ascii_uppercase()
            );
            bump(&mut self.base_changes, change);
        } else if variant.kind() != VariantKind::Substitution {
            bump(&mut self.indel_lengths, variant.indel_length());
        }
    }

    /// Write `<prefix>.anno.freq`, `.base.freq`, `.codon.freq` and `.indel.freq`.
    pub fn write_all(&self, prefix: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let prefix = prefix.as_ref();
        let written = vec![
            write_table(&self.labels, &with_suffix(prefix, "anno"))?,
            write_table(&self.base_changes, &with_suffix(prefix, "base"))?,
            write_table(&self.codon_changes, &with_suffix(prefix, "codon"))?,
            write_table(&self.indel_lengths, &with_suffix(prefix, "indel"))?,
        ];
        info!("Wrote frequency tables with prefix {}", prefix.display());
        Ok(written)
    }
}

fn bump<K: Ord>(map: &mut BTreeMap<K, u64>, key: K) {
    *map.entry(key).or_insert(0) += 1;
}

fn bases(c: [u8; 3]) -> String {
    c.iter().map(|&b| b as char).collect()
}

fn with_suffix(prefix: &Path, kind: &str) -> PathBuf {
    let mut s = prefix.as_os_str().to_owned();
    s.push(format!(".{kind}.freq"));
    PathBuf::from(s)
}

fn write_table<K: Display>(map: &BTreeMap<K, u64>, path: &Path) -> Result<PathBuf> {
    let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut w = BufWriter::new(f);
    for (k, n) in map {
        writeln!(w, "{k}\t{n}").with_context(|| format!("write {}", path.display()))?;
    }
    w.flush().with_context(|| format!("flush {}", path.display()))?;
    Ok(path.to_path_buf())
}
