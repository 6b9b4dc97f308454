//! Tracks the time spent on a project inside a creative tool. The host application feeds input
//! events and render notifications into a [session::Session], which sorts elapsed time into all
//! time, work time and render time and keeps the totals on the open document.
//!
//! Everything the host provides is behind the traits in [host]. The [cli] module is a headless
//! host that reads events from stdin.

pub mod cli;
pub mod host;
pub mod session;
pub mod tracker;
pub mod utils;
