// Alignment result reading
//
// Protein-stage and nucleotide-stage aligner output both arrive as 12-column
// tabular text and are reduced to one best hit per query.

pub mod models;
pub mod reader;

pub use models::{format_evalue, AlignmentHit, HitId, HitMap};
pub use reader::{AlignmentRead, AlignmentResultReader, ReadStats, DEFAULT_EVALUE_THRESHOLD};
