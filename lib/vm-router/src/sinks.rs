//! Bounded notification queues for the AMS, the foreground UI and VM
//! threads. The router pushes; consumers on other threads pop.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam::queue::ArrayQueue;
use vm_events::NormalizedEvent;

use crate::host::NotificationSink;
use crate::Config;

pub struct QueueSinks {
    ams: ArrayQueue<NormalizedEvent>,
    foreground: ArrayQueue<NormalizedEvent>,
    vm_thread: ArrayQueue<(NormalizedEvent, i32)>,
    dropped: AtomicU64,
}

impl QueueSinks {
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        Self {
            ams: ArrayQueue::new(capacity),
            foreground: ArrayQueue::new(capacity),
            vm_thread: ArrayQueue::new(capacity),
            dropped: AtomicU64::new(0),
        }
    }

    /// Queues of `config.queue_capacity()` events each.
    pub fn with_config(config: &Config) -> Self {
        Self::new(config.queue_capacity())
    }

    pub fn pop_ams(&self) -> Option<NormalizedEvent> {
        self.ams.pop()
    }

    pub fn pop_foreground(&self) -> Option<NormalizedEvent> {
        self.foreground.pop()
    }

    /// Returns the event and its owner (-1: all owners).
    pub fn pop_vm_thread(&self) -> Option<(NormalizedEvent, i32)> {
        self.vm_thread.pop()
    }

    /// Events lost to full queues so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn push<T: std::fmt::Debug>(&self, queue: &ArrayQueue<T>, name: &str, item: T) {
        if let Err(item) = queue.push(item) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            log::warn!("{name} queue full: dropping {item:?}");
        }
    }
}

impl NotificationSink for QueueSinks {
    fn notify_ams(&mut self, event: NormalizedEvent) {
        self.push(&self.ams, "AMS", event);
    }

    fn notify_foreground(&mut self, event: NormalizedEvent) {
        self.push(&self.foreground, "foreground", event);
    }

    fn notify_vm_thread(&mut self, event: NormalizedEvent, owner: i32) {
        self.push(&self.vm_thread, "VM thread", (event, owner));
    }
}

// The router holds one reference, consumer threads hold the others.
impl NotificationSink for Arc<QueueSinks> {
    fn notify_ams(&mut self, event: NormalizedEvent) {
        self.push(&self.ams, "AMS", event);
    }

    fn notify_foreground(&mut self, event: NormalizedEvent) {
        self.push(&self.foreground, "foreground", event);
    }

    fn notify_vm_thread(&mut self, event: NormalizedEvent, owner: i32) {
        self.push(&self.vm_thread, "VM thread", (event, owner));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_queues_drop_events() {
        let _ = env_logger::builder().is_test(true).try_init();

        let mut sinks = QueueSinks::new(1);
        sinks.notify_ams(NormalizedEvent::PauseAll);
        sinks.notify_ams(NormalizedEvent::ActivateAll);
        assert_eq!(1, sinks.dropped());

        assert_eq!(Some(NormalizedEvent::PauseAll), sinks.pop_ams());
        assert_eq!(None, sinks.pop_ams());
    }

    #[test]
    fn capacity_comes_from_config() {
        let config = Config::from_toml_str("version = 1\nqueue_capacity = 1").unwrap();
        let mut sinks = QueueSinks::with_config(&config);

        sinks.notify_vm_thread(NormalizedEvent::Rotation, 2);
        sinks.notify_vm_thread(NormalizedEvent::Shutdown, 2);
        assert_eq!(1, sinks.dropped());
        assert_eq!(Some((NormalizedEvent::Rotation, 2)), sinks.pop_vm_thread());
        assert_eq!(None, sinks.pop_vm_thread());

        let sinks = QueueSinks::with_config(&Config::default());
        assert_eq!(Config::default().queue_capacity(), sinks.ams.capacity());
    }

    #[test]
    fn shared_between_threads() {
        let sinks = Arc::new(QueueSinks::new(4));
        let mut router_side = sinks.clone();

        let consumer = std::thread::spawn(move || loop {
            if let Some(event) = sinks.pop_foreground() {
                return event;
            }
            std::thread::yield_now();
        });

        router_side.notify_foreground(NormalizedEvent::Rotation);
        router_side.notify_vm_thread(NormalizedEvent::Shutdown, 3);

        assert_eq!(NormalizedEvent::Rotation, consumer.join().unwrap());
        assert_eq!(Some((NormalizedEvent::Shutdown, 3)), router_side.pop_vm_thread());
        assert_eq!(0, router_side.dropped());
    }
}
