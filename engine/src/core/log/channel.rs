use crossbeam::channel::{Receiver, Sender, unbounded};

use super::Level;

/// Unformatted copy of one log record, delivered to capture channels.
#[derive(Debug, Clone, PartialEq)]
pub struct LogMessage {
    pub level: Level,
    pub tag: String,
    pub message: String,
}

/// Set of subscribers that receive every record the sink sees.
#[derive(Default)]
pub(crate) struct Captures {
    senders: Vec<Sender<LogMessage>>,
}

impl Captures {
    pub(crate) fn subscribe(&mut self) -> Receiver<LogMessage> {
        let (sender, receiver) = unbounded();
        self.senders.push(sender);
        receiver
    }

    /// Deliver `message` to every live subscriber, forgetting the ones whose
    /// receiver has been dropped.
    pub(crate) fn publish(&mut self, message: &LogMessage) {
        if self.senders.is_empty() {
            return;
        }
        self.senders
            .retain(|sender| sender.send(message.clone()).is_ok());
    }
}
