//! What a single invocation does.

use crate::issue::RepoRef;

/// One unit of work for [`Runner::run`](crate::runner::Runner::run).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Decide whether an issue should move, then transfer or schedule it.
    ProcessIssue {
        /// Repository holding the issue.
        repository: RepoRef,
        /// Issue number.
        number: u64,
    },

    /// Reconcile pending actions. Every enabled configured repository when
    /// `repository` is `None`.
    ProcessPending {
        /// Repository to reconcile.
        repository: Option<RepoRef>,
    },

    /// Move an optimistically transferred issue back if users asked for it.
    CheckRevert {
        /// Repository holding the issue.
        repository: RepoRef,
        /// Issue number.
        number: u64,
    },

    /// Schedule closing an issue as a duplicate.
    ScheduleClose {
        /// Repository holding the issue.
        repository: RepoRef,
        /// Issue number.
        number: u64,
        /// URL of the original issue.
        original_url: String,
    },
}
