//! ScriptReel Data Model
//!
//! Defines the data contracts shared by every pipeline stage:
//! - **Script:** speaker/text rows parsed from delimited text
//! - **Assets:** per-row audio clips and their measured durations
//! - **Timeline:** the immutable, gap-free plan of timed segments and
//!   sub-slides consumed by subtitle emission and render backends
//!
//! All times are seconds as `f64`, measured from the start of the video.

pub mod asset;
pub mod script;
pub mod timeline;

pub use asset::*;
pub use script::*;
pub use timeline::*;
