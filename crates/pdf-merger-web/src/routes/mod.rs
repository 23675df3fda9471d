//! HTTP route handlers for the PDF merger service.
//!
//! Successful merges return the PDF itself; everything else is JSON.

mod health;
mod merge;

pub use health::health;
pub use merge::merge_files;
