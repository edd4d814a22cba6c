use crate::{
    metadata::Metadata,
    outcome::ExecutionResult,
    reporter::{Notification, Reporter},
    tree::NodeId,
};

/// A [`Reporter`] keeping every notification in order.
#[derive(Debug, Default, Clone)]
pub struct RecordingReporter {
    pub notifications: Vec<Notification>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summaries(&self) -> Vec<String> {
        self.notifications.iter().map(Notification::summary).collect()
    }

    /// The results of finished cases, in the order they finished.
    pub fn finished(&self) -> impl Iterator<Item = (NodeId, &ExecutionResult)> {
        self.notifications.iter().filter_map(|notification| match notification {
            Notification::CaseFinished { id, result, .. } => Some((*id, result)),
            _ => None,
        })
    }
}

impl Reporter for RecordingReporter {
    fn group_started(&mut self, id: NodeId, metadata: &Metadata) {
        self.notifications
            .push(Notification::group_started(id, metadata));
    }

    fn case_started(&mut self, id: NodeId, metadata: &Metadata) {
        self.notifications.push(Notification::case_started(id, metadata));
    }

    fn case_finished(&mut self, id: NodeId, metadata: &Metadata, result: &ExecutionResult) {
        self.notifications
            .push(Notification::case_finished(id, metadata, result));
    }

    fn group_finished(&mut self, id: NodeId, metadata: &Metadata) {
        self.notifications
            .push(Notification::group_finished(id, metadata));
    }

    fn message(&mut self, message: &str) {
        self.notifications
            .push(Notification::Message(message.to_string()));
    }
}
