//! Event channel built on crossbeam-channel.
//!
//! Worker threads in the pruning and runner pools send through cloned
//! [`EventSender`]s; the CLI drains the matching [`EventReceiver`].

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::Event;

/// Sends events from pipeline workers.
#[derive(Clone)]
pub struct EventSender {
    inner: Sender<Event>,
}

impl EventSender {
    /// Send an event.
    ///
    /// A dropped receiver discards the event, so reporting stays optional.
    pub fn send(&self, event: Event) {
        let _ = self.inner.send(event);
    }
}

/// Receives events emitted while the pipeline runs.
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Iterate until every sender is dropped
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.iter()
    }
}

/// Factory for sender/receiver pairs.
pub struct EventChannel;

impl EventChannel {
    /// Create an unbounded event channel.
    pub fn new() -> (EventSender, EventReceiver) {
        let (sender, receiver) = unbounded();
        (
            EventSender { inner: sender },
            EventReceiver { inner: receiver },
        )
    }
}

/// A sender whose receiver is already gone.
pub fn null_sender() -> EventSender {
    let (sender, _receiver) = EventChannel::new();
    sender
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{PruneEvent, RunnerEvent};
    use std::thread;

    #[test]
    fn events_can_be_sent_from_worker_threads() {
        let (sender, receiver) = EventChannel::new();

        let handles: Vec<_> = (0..4)
            .map(|index| {
                let sender = sender.clone();
                thread::spawn(move || {
                    sender.send(Event::Prune(PruneEvent::TaskFailed {
                        index,
                        message: "unreadable".to_string(),
                    }));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        drop(sender);

        let mut indices: Vec<usize> = receiver
            .iter()
            .filter_map(|event| match event {
                Event::Prune(PruneEvent::TaskFailed { index, .. }) => Some(index),
                _ => None,
            })
            .collect();
        indices.sort_unstable();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn null_sender_does_not_panic() {
        let sender = null_sender();
        sender.send(Event::Runner(RunnerEvent::Started { total_configs: 3 }));
    }
}
