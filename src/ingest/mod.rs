// Ingestion stages
//
// Stage 0 sorts raw CSV drops into per-group folders; stage 1 loads the
// grouped folders into a single JSON snapshot for the prompt builder.

pub mod extract;
pub mod organise;

pub use extract::{extract, Extraction, GroupTable};
pub use organise::{organise, OrganiseSummary};
