//! gene_anno
//!
//! Rule-based functional annotation of genomic variants against UCSC
//! refFlat / genePred gene models.
//! Gene structures are held as genomic blocks (0-based, half-open); variant
//! positions are 1-based as in the input files.

pub mod types;
pub mod model;
pub mod annotation;
pub mod index;
pub mod sequence;
pub mod classify;
pub mod annotator;
pub mod stats;

pub use index::GeneIndex;

pub use annotation::{AnnotationBuilder, ParseError};

pub use types::{RefBlock, Strand, Variant, VariantKind};

pub use model::gene::{GeneModel, ModelError};
pub use model::types::{GeneAnnotationParam, GeneId, SpliceSite};

pub use sequence::{SequenceError, SequenceStore};

// Classification and driver types at crate root.
pub use classify::{Annotation, AnnotationLabel, Classifier, CodonDetail};
pub use annotator::{AnnotateSummary, AnnotationRecord, Annotator};
pub use stats::FrequencyTable;
