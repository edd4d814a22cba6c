//! Notifications going out of a run.
//!
//! kispec does not format anything. A run reports what happens to a
//! [`Reporter`], in order: a group starts, its cases start and finish, its
//! child groups do the same, the group finishes. Formatting, summaries and
//! exit codes are up to whoever implements the trait.
//!
//! Three adapters come with the crate: [`NoReporter`] drops everything,
//! [`RecordingReporter`] keeps owned [`Notification`]s in memory and
//! [`ChannelReporter`] sends them over a channel to be consumed elsewhere.

use crate::{metadata::Metadata, outcome::ExecutionResult, tree::NodeId};

mod no;
pub use no::*;

mod recording;
pub use recording::*;

mod channel;
pub use channel::*;

/// Receives the notifications of a run.
///
/// Every method has an empty default, so implementations only pick what they
/// care about.
pub trait Reporter {
    fn group_started(&mut self, id: NodeId, metadata: &Metadata) {
        let _ = (id, metadata);
    }

    fn case_started(&mut self, id: NodeId, metadata: &Metadata) {
        let _ = (id, metadata);
    }

    fn case_finished(&mut self, id: NodeId, metadata: &Metadata, result: &ExecutionResult) {
        let _ = (id, metadata, result);
    }

    fn group_finished(&mut self, id: NodeId, metadata: &Metadata) {
        let _ = (id, metadata);
    }

    /// Free form information about the run, like the active filters.
    fn message(&mut self, message: &str) {
        let _ = message;
    }
}

impl<R: Reporter + ?Sized> Reporter for &mut R {
    fn group_started(&mut self, id: NodeId, metadata: &Metadata) {
        (**self).group_started(id, metadata)
    }

    fn case_started(&mut self, id: NodeId, metadata: &Metadata) {
        (**self).case_started(id, metadata)
    }

    fn case_finished(&mut self, id: NodeId, metadata: &Metadata, result: &ExecutionResult) {
        (**self).case_finished(id, metadata, result)
    }

    fn group_finished(&mut self, id: NodeId, metadata: &Metadata) {
        (**self).group_finished(id, metadata)
    }

    fn message(&mut self, message: &str) {
        (**self).message(message)
    }
}

/// An owned copy of a reporter call.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Notification {
    GroupStarted {
        id: NodeId,
        description: String,
    },
    CaseStarted {
        id: NodeId,
        description: String,
    },
    CaseFinished {
        id: NodeId,
        description: String,
        result: ExecutionResult,
    },
    GroupFinished {
        id: NodeId,
        description: String,
    },
    Message(String),
}

impl Notification {
    pub(crate) fn group_started(id: NodeId, metadata: &Metadata) -> Self {
        Self::GroupStarted {
            id,
            description: metadata.full_description().to_string(),
        }
    }

    pub(crate) fn case_started(id: NodeId, metadata: &Metadata) -> Self {
        Self::CaseStarted {
            id,
            description: metadata.full_description().to_string(),
        }
    }

    pub(crate) fn case_finished(id: NodeId, metadata: &Metadata, result: &ExecutionResult) -> Self {
        Self::CaseFinished {
            id,
            description: metadata.full_description().to_string(),
            result: result.clone(),
        }
    }

    pub(crate) fn group_finished(id: NodeId, metadata: &Metadata) -> Self {
        Self::GroupFinished {
            id,
            description: metadata.full_description().to_string(),
        }
    }

    /// A one line rendering, handy for comparing sequences in tests.
    pub fn summary(&self) -> String {
        match self {
            Notification::GroupStarted { description, .. } => format!("group started: {description}"),
            Notification::CaseStarted { description, .. } => format!("case started: {description}"),
            Notification::CaseFinished {
                description,
                result,
                ..
            } => format!("case finished: {description} ({:?})", result.status),
            Notification::GroupFinished { description, .. } => {
                format!("group finished: {description}")
            }
            Notification::Message(message) => format!("message: {message}"),
        }
    }
}
