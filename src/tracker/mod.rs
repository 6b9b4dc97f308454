//! Core of the tracker. [sampler::Sampler] commits elapsed time into a
//! [categories::CategoryStore] on every check interval, splitting it into all time and work time
//! with [classify]. [report] and [format] turn the totals into text.

pub mod categories;
pub mod classify;
pub mod format;
pub mod report;
pub mod sampler;
