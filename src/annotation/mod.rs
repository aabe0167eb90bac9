pub mod builder;
pub mod io;
pub mod variants;

pub use builder::AnnotationBuilder;
pub use io::{detect_dialect, parse_gene_line, Dialect, GeneRecordReader, ParseError};
pub use variants::{parse_variant_line, VariantReader, MIN_VARIANT_FIELDS};
