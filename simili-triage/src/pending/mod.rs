//! Delayed actions persisted inside the issue itself.
//!
//! A status label (`pending-transfer` / `pending-close`) makes the issue
//! discoverable by listing; a comment carrying
//! `<!-- simili-pending-action: {JSON} -->` holds the payload. Removing the
//! label retires the action; the comment stays as history.

mod action;
mod error;
mod store;

pub use action::{
    format_pending_action_metadata, parse_pending_action_metadata, ActionType, PendingAction,
    PENDING_ACTION_MARKER,
};
pub(crate) use action::escape_comment_json;
pub use error::PendingError;
pub use store::PendingActionStore;

/// Label on issues with a scheduled transfer.
pub const LABEL_PENDING_TRANSFER: &str = "pending-transfer";

/// Label on issues with a scheduled close.
pub const LABEL_PENDING_CLOSE: &str = "pending-close";
