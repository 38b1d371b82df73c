//! Core domain types: resource identifiers, remote resource references and
//! the not-found-aware resolution result.

mod ids;
mod resolution;
mod resources;

pub use ids::{ExperimentId, PipelineId, PipelineVersionId};
pub use resolution::{NotFoundError, Resolution, ResourceKind};
pub use resources::{Experiment, Pipeline, PipelineVersion};
