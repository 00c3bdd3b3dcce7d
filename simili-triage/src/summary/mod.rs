//! Run summary types and helpers.

mod result;
mod run_summary;

pub(crate) use result::issue_ref;
pub use result::ProcessingResult;
pub use run_summary::RunSummary;
