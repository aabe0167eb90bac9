pub mod types;
pub mod gene;
pub mod codon;

pub use types::{
    Codon, GeneAnnotationParam, GeneId, SpliceSite, UtrHit,
    ESSENTIAL_SPLICE_BASES,
};
pub use gene::{GeneModel, ModelError};
