//! Single-value observable backed by `tokio::sync::watch`.
//!
//! A `Signal` owns the sender half. `send_replace` stores the value even when
//! no receiver exists, so publishing never fails. Sync callers use
//! `get`/`Receiver::has_changed`; async callers await `Receiver::changed`.
//! No tokio runtime is required to publish or read.

use tokio::sync::watch;

/// Observable value holder.
#[derive(Debug)]
pub struct Signal<T> {
    sender: watch::Sender<T>,
}

impl<T> Signal<T> {
    pub fn new(initial: T) -> Self {
        let (sender, _receiver) = watch::channel(initial);
        Self { sender }
    }

    /// Publishes `value` and notifies every subscriber.
    pub fn set(&self, value: T) {
        self.sender.send_replace(value);
    }

    /// Returns a receiver that sees the current value as already seen.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.sender.subscribe()
    }

    /// Number of live external subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl<T: Clone> Signal<T> {
    /// Clones the current value.
    pub fn get(&self) -> T {
        self.sender.borrow().clone()
    }
}

impl<T: PartialEq> Signal<T> {
    /// Publishes `value` only when it differs from the current one.
    ///
    /// Returns whether subscribers were notified.
    pub fn set_if_changed(&self, value: T) -> bool {
        self.sender.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        })
    }
}

impl<T: Default> Default for Signal<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::Signal;

    #[test]
    fn set_without_subscribers_keeps_latest_value() {
        let signal = Signal::new(1);
        signal.set(2);
        assert_eq!(signal.get(), 2);
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn subscriber_sees_change_after_set() {
        let signal = Signal::new(false);
        let receiver = signal.subscribe();
        assert!(!receiver.has_changed().unwrap());

        signal.set(true);
        assert!(receiver.has_changed().unwrap());
        assert!(*receiver.borrow());
    }

    #[test]
    fn set_if_changed_skips_equal_values() {
        let signal = Signal::new(Some(3));
        let mut receiver = signal.subscribe();

        assert!(!signal.set_if_changed(Some(3)));
        assert!(!receiver.has_changed().unwrap());

        assert!(signal.set_if_changed(None));
        assert!(receiver.has_changed().unwrap());
        assert_eq!(*receiver.borrow_and_update(), None);
        assert!(!receiver.has_changed().unwrap());
    }

    #[tokio::test]
    async fn async_subscriber_wakes_on_publish() {
        let signal = Signal::new(0_u32);
        let mut receiver = signal.subscribe();

        signal.set(7);
        receiver.changed().await.unwrap();
        assert_eq!(*receiver.borrow(), 7);
    }
}
