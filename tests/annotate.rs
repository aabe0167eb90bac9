use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use rstest::{fixture, rstest};

use gene_anno::{
    AnnotateSummary, Annotation, AnnotationLabel, Annotator, FrequencyTable, GeneAnnotationParam, GeneIndex,
    SequenceStore, Variant,
};

fn data(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data").join(name)
}

#[fixture]
#[once]
fn index() -> GeneIndex {
    GeneIndex::from_path(data("genes.refFlat"), GeneAnnotationParam::default()).unwrap()
}

#[fixture]
#[once]
fn reference() -> SequenceStore {
    SequenceStore::open(data("ref.fa")).unwrap()
}

fn annotate_file(index: &GeneIndex, reference: Option<&SequenceStore>) -> (AnnotateSummary, Vec<String>) {
    let input = BufReader::new(File::open(data("variants.vcf")).unwrap());
    let mut out = Vec::new();
    let summary = Annotator::new(index, reference).annotate_reader(input, &mut out).unwrap();
    let lines = String::from_utf8(out).unwrap().lines().map(str::to_string).collect();
    (summary, lines)
}

#[rstest]
fn loads_fixture_files(index: &GeneIndex, reference: &SequenceStore) {
    assert_eq!(index.genes.len(), 3);
    assert_eq!(index.chr_names, vec!["chr1".to_string(), "chr2".to_string()]);
    assert_eq!(reference.len(), 2);
    assert_eq!(reference.get("chr1").unwrap().len(), 7000);
    assert_eq!(reference.base_at("chr1", 1050).unwrap(), b'G');
}

#[rstest]
#[case("chr1", 600, "A", "G", "ALPHA", "Upstream")]
#[case("chr1", 1052, "T", "C", "ALPHA", "Exon:codon=14|pos=1050,1051,1052|ref=GCT|alt=GCC:Synonymous")]
#[case("chr1", 1102, "C", "G", "ALPHA", "Intron:Essential_Splice_Site")]
#[case("chr1", 1005, "C", "T", "ALPHA", "Exon:Utr5:Start_Gain")]
#[case("chr1", 1050, "GC", "G", "ALPHA", "Exon:codon=14|pos=1050,1051,1052|ref=GCT")]
#[case("chr2", 200, "C", "T", "GAMMA", "Exon")]
#[case("chr1", 5899, "A", "G", "BETA", "Exon:codon=1|pos=5900,5899,5898|ref=ATG|alt=ACG:Start_Lose")]
#[case("chr1", 6100, "A", "G", "BETA", "Upstream")]
fn single_variant_labels(
    index: &GeneIndex,
    reference: &SequenceStore,
    #[case] chrom: &str,
    #[case] pos: u32,
    #[case] ref_allele: &str,
    #[case] alt_allele: &str,
    #[case] gene: &str,
    #[case] expected: &str,
) {
    let v = Variant::new(chrom, pos, ref_allele, alt_allele).unwrap();
    let recs = Annotator::new(index, Some(reference)).annotate_variant(&v);
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].gene.name, gene);
    assert_eq!(recs[0].annotation.to_string(), expected);

    let parsed: Annotation = expected.parse().unwrap();
    assert_eq!(parsed.labels, recs[0].annotation.labels);
}

#[rstest]
fn annotate_fixture_file_with_reference(index: &GeneIndex, reference: &SequenceStore) {
    let (summary, lines) = annotate_file(index, Some(reference));
    assert_eq!(summary, AnnotateSummary { variants: 8, skipped: 1, records: 7 });
    assert_eq!(lines.len(), 9);
    assert!(lines[0].starts_with('#'));
    assert_eq!(lines[5], "chr1\t3000\tA\tG\t.\t.\tIntergenic");
    assert_eq!(
        lines[8],
        "chr1\t5899\tA\tG\tBETA\tNM_0002\tExon:codon=1|pos=5900,5899,5898|ref=ATG|alt=ACG:Start_Lose"
    );
}

#[rstest]
fn annotate_without_reference_drops_bases_and_effects(index: &GeneIndex) {
    let (summary, lines) = annotate_file(index, None);
    assert_eq!(summary.records, 7);
    assert_eq!(lines[2], "chr1\t1052\tT\tC\tALPHA\tNM_0001\tExon:codon=14|pos=1050,1051,1052");
    assert_eq!(lines[4], "chr1\t1005\tC\tT\tALPHA\tNM_0001\tExon:Utr5");
}

#[rstest]
fn output_labels_roundtrip(index: &GeneIndex, reference: &SequenceStore) {
    let (_, lines) = annotate_file(index, Some(reference));
    for line in lines.iter().skip(1) {
        let labels = line.rsplit('\t').next().unwrap();
        let parsed: Annotation = labels.parse().unwrap();
        assert_eq!(parsed.to_string(), labels);
    }
}

#[rstest]
fn frequency_tables_for_fixture(index: &GeneIndex, reference: &SequenceStore) {
    let input = BufReader::new(File::open(data("variants.vcf")).unwrap());
    let mut table = FrequencyTable::new();
    Annotator::new(index, Some(reference))
        .annotate_reader_with(input, std::io::sink(), |v, recs| table.add(v, recs))
        .unwrap();

    assert_eq!(table.labels["Exon"], 5);
    assert_eq!(table.labels["Codon"], 3);
    assert_eq!(table.labels["Intergenic"], 1);
    assert_eq!(table.labels["Start_Lose"], 1);
    assert_eq!(table.base_changes["A->G"], 3);
    assert_eq!(table.base_changes["C->T"], 2);
    assert_eq!(table.codon_changes["GCT->GCC"], 1);
    assert_eq!(table.codon_changes["ATG->ACG"], 1);
    assert_eq!(table.indel_lengths[&-1], 1);

    let dir = tempfile::tempdir().unwrap();
    let written = table.write_all(dir.path().join("fixture")).unwrap();
    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec!["fixture.anno.freq", "fixture.base.freq", "fixture.codon.freq", "fixture.indel.freq"]
    );
    let indel = std::fs::read_to_string(&written[3]).unwrap();
    assert_eq!(indel, "-1\t1\n");
}

#[rstest]
fn index_cache_roundtrip_gives_same_annotations(index: &GeneIndex, reference: &SequenceStore) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("genes.gax");
    index.save(&path).unwrap();
    let loaded = GeneIndex::load(&path).unwrap();

    assert_eq!(loaded.to_string(), index.to_string());
    assert_eq!(annotate_file(&loaded, Some(reference)), annotate_file(index, Some(reference)));
}

#[rstest]
fn narrower_ranges_turn_flanks_intergenic(index: &GeneIndex) {
    let mut narrow = index.clone();
    narrow.set_params(GeneAnnotationParam {
        upstream_range: 100,
        downstream_range: 100,
        ..GeneAnnotationParam::default()
    });
    let v = Variant::new("chr1", 600, "A", "G").unwrap();
    assert!(Annotator::new(&narrow, None).annotate_variant(&v).is_empty());

    let v = Variant::new("chr1", 950, "A", "G").unwrap();
    let recs = Annotator::new(&narrow, None).annotate_variant(&v);
    assert_eq!(recs[0].annotation.labels, vec![AnnotationLabel::Upstream]);
    assert_eq!(recs[0].annotation.distance, Some(50));
}
