// notifier.rs - block height notifications for the replay log
// Copyright (C) 2018  David Stainton.

use futures::channel::mpsc::{self, UnboundedSender};
use futures::stream::{BoxStream, StreamExt};
use parking_lot::Mutex;

/// A source of chain height events driving the garbage collector.
/// Dropping the returned stream cancels the subscription.
pub trait HeightNotifier: Send + Sync {
    fn subscribe(&self) -> BoxStream<'static, u32>;
}

/// ChannelNotifier fans heights pushed through `notify` out to every live
/// subscriber.
#[derive(Default)]
pub struct ChannelNotifier {
    subscribers: Mutex<Vec<UnboundedSender<u32>>>,
}

impl ChannelNotifier {
    pub fn new() -> ChannelNotifier {
        ChannelNotifier::default()
    }

    /// Announce a new best height. Subscribers that went away are pruned.
    pub fn notify(&self, height: u32) {
        self.subscribers
            .lock()
            .retain(|subscriber| subscriber.unbounded_send(height).is_ok());
    }

    /// End every subscription; their streams terminate.
    pub fn close(&self) {
        self.subscribers.lock().clear();
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl HeightNotifier for ChannelNotifier {
    fn subscribe(&self) -> BoxStream<'static, u32> {
        let (tx, rx) = mpsc::unbounded();
        self.subscribers.lock().push(tx);
        rx.boxed()
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;

    use super::*;

    #[test]
    fn fan_out_test() {
        let notifier = ChannelNotifier::new();
        let mut first = notifier.subscribe();
        let mut second = notifier.subscribe();
        notifier.notify(7);
        assert_eq!(block_on(first.next()), Some(7));
        assert_eq!(block_on(second.next()), Some(7));
    }

    #[test]
    fn dropped_subscriber_is_pruned_test() {
        let notifier = ChannelNotifier::new();
        let stream = notifier.subscribe();
        assert_eq!(notifier.subscriber_count(), 1);
        drop(stream);
        notifier.notify(1);
        assert_eq!(notifier.subscriber_count(), 0);
    }

    #[test]
    fn close_ends_streams_test() {
        let notifier = ChannelNotifier::new();
        let mut stream = notifier.subscribe();
        notifier.notify(3);
        notifier.close();
        assert_eq!(notifier.subscriber_count(), 0);
        assert_eq!(block_on(stream.next()), Some(3));
        assert_eq!(block_on(stream.next()), None);
    }
}
