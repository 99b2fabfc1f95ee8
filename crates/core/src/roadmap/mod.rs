//! Course roadmap model and normalization.
//!
//! A roadmap is the tutor-authored outline that seeds content generation:
//! ordered sections, each with an ordered list of subtopic titles. Jobs can
//! carry the roadmap in two shapes (a persisted section/subtopic tree or a
//! flat title→subtopics map); [`normalize`] canonicalizes both into one
//! immutable in-memory structure used by every pipeline stage.

mod normalizer;
mod types;

pub use normalizer::normalize;
pub use types::{Roadmap, RoadmapError, RoadmapSection};
