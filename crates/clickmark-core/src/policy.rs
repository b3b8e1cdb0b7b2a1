//! Mutation policy table
//!
//! Every store operation is classified here: whether it mutates before or
//! after the remote confirms, and what happens when the remote call fails.
//! The store reads this table rather than deciding per call site.

use serde::Serialize;

/// Store operations exposed to the view controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Load,
    Insert,
    Delete,
    Rename,
    IncrementClick,
    Sort,
    Shuffle,
    ToggleEditMode,
}

/// When local state changes relative to the remote call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationPolicy {
    /// Apply locally first, reconcile on failure
    Optimistic,
    /// Apply locally only after the remote confirms
    ConfirmThenApply,
    /// Replace the whole collection with the remote's answer
    WholeCollection,
    /// Never touches the remote
    LocalOnly,
}

/// Recovery action when the remote call fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureRecovery {
    /// Re-read the full collection from the remote
    Reload,
    /// Drop the pending change; local state was never touched
    Discard,
    /// Keep whatever was there before the call
    KeepPrior,
    /// Operation cannot fail remotely
    None,
}

impl Operation {
    pub const ALL: [Operation; 8] = [
        Operation::Load,
        Operation::Insert,
        Operation::Delete,
        Operation::Rename,
        Operation::IncrementClick,
        Operation::Sort,
        Operation::Shuffle,
        Operation::ToggleEditMode,
    ];

    pub fn policy(self) -> MutationPolicy {
        match self {
            Operation::Load => MutationPolicy::WholeCollection,
            Operation::Delete => MutationPolicy::Optimistic,
            Operation::Insert | Operation::Rename | Operation::IncrementClick => {
                MutationPolicy::ConfirmThenApply
            }
            Operation::Sort | Operation::Shuffle => MutationPolicy::LocalOnly,
            // Leaving edit mode flushes through Rename, which carries its own policy
            Operation::ToggleEditMode => MutationPolicy::LocalOnly,
        }
    }

    pub fn recovery(self) -> FailureRecovery {
        match self.policy() {
            MutationPolicy::Optimistic => FailureRecovery::Reload,
            MutationPolicy::ConfirmThenApply => FailureRecovery::Discard,
            MutationPolicy::WholeCollection => FailureRecovery::KeepPrior,
            MutationPolicy::LocalOnly => FailureRecovery::None,
        }
    }

    /// Whether an identity must be present
    pub fn requires_identity(self) -> bool {
        !matches!(self, Operation::Sort | Operation::Shuffle)
    }

    /// Whether completing this operation replaces or reorders the whole
    /// collection and so must go through the single-writer gate
    pub fn is_collection_write(self) -> bool {
        matches!(self, Operation::Load | Operation::Insert) || self.recovery() == FailureRecovery::Reload
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Operation::Load => "load",
            Operation::Insert => "insert",
            Operation::Delete => "delete",
            Operation::Rename => "rename",
            Operation::IncrementClick => "increment_click",
            Operation::Sort => "sort",
            Operation::Shuffle => "shuffle",
            Operation::ToggleEditMode => "toggle_edit_mode",
        };
        f.write_str(name)
    }
}
