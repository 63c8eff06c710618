//! Business Logic Services
//!
//! The pipeline core: fission planning, style merging, asset handling,
//! generation providers, prompt expansion, sub-task execution, scheduling,
//! and progress aggregation.

pub mod aggregator;
pub mod assets;
pub mod expansion;
pub mod fission;
pub mod generator;
pub mod orchestrator;
pub mod scheduler;
pub mod style_merge;
pub mod worker;
