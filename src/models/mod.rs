//! Data Models
//!
//! Core data structures for tasks, sub-tasks, style templates, assets,
//! and pipeline settings.

pub mod asset;
pub mod settings;
pub mod style;
pub mod subtask;
pub mod task;

pub use asset::*;
pub use settings::*;
pub use style::*;
pub use subtask::*;
pub use task::*;
