//! Issue transfers: rule matching, execution and reverts.
//!
//! A transfer leaves a notice behind carrying
//! `<!-- simili-transfer-source: {JSON} -->`. The notice moves with the
//! issue, and a revert reaction on it sends the issue back.

mod error;
mod executor;
mod matcher;
mod metadata;
mod revert;

pub use error::{RevertError, TransferError};
pub use executor::{CloseOutcome, TransferExecutor, TransferOutcome, DEFAULT_COLLECTION_PREFIX};
pub use matcher::RuleMatcher;
pub use metadata::{TransferSourceMetadata, TRANSFER_SOURCE_MARKER};
pub use revert::{has_revert_marker, RevertAction, RevertDetector, REVERT_MARKER};
