use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::{
    metadata::Metadata,
    outcome::ExecutionResult,
    reporter::{Notification, Reporter},
    tree::NodeId,
};

/// A [`Reporter`] forwarding owned notifications over a channel.
///
/// The receiving side can live on another thread, for example a formatter
/// printing progress while the run goes on. Once the receiver is gone,
/// notifications are dropped.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    sender: Sender<Notification>,
}

impl ChannelReporter {
    pub fn new(sender: Sender<Notification>) -> Self {
        Self { sender }
    }

    /// A reporter plus the receiving end of a fresh unbounded channel.
    pub fn unbounded() -> (Self, Receiver<Notification>) {
        let (sender, receiver) = unbounded();
        (Self { sender }, receiver)
    }

    fn send(&self, notification: Notification) {
        if self.sender.send(notification).is_err() {
            log::trace!(target: "kispec", "notification dropped, receiver is gone");
        }
    }
}

impl Reporter for ChannelReporter {
    fn group_started(&mut self, id: NodeId, metadata: &Metadata) {
        self.send(Notification::group_started(id, metadata));
    }

    fn case_started(&mut self, id: NodeId, metadata: &Metadata) {
        self.send(Notification::case_started(id, metadata));
    }

    fn case_finished(&mut self, id: NodeId, metadata: &Metadata, result: &ExecutionResult) {
        self.send(Notification::case_finished(id, metadata, result));
    }

    fn group_finished(&mut self, id: NodeId, metadata: &Metadata) {
        self.send(Notification::group_finished(id, metadata));
    }

    fn message(&mut self, message: &str) {
        self.send(Notification::Message(message.to_string()));
    }
}
