//! ScriptReel Timeline Construction
//!
//! Turns parsed script rows and per-row audio clips into a [`TimelinePlan`]
//! and projects that plan onto subtitle tracks:
//! - **Resolver:** finds `007.wav`-style clips and measures their duration
//! - **Splitter:** breaks over-long text into budget-sized sub-slides
//! - **Builder:** lays segments end to end on a gap-free timeline
//! - **Subtitles:** SRT, WebVTT, and plain cue lists from one set of timestamps
//!
//! [`TimelinePlan`]: scriptreel_model::TimelinePlan

pub mod builder;
pub mod probe;
pub mod resolver;
pub mod splitter;
pub mod subtitles;

pub use builder::*;
pub use probe::*;
pub use resolver::*;
pub use splitter::*;
pub use subtitles::*;
