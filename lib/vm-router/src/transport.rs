//! Channel-backed event transport: the platform side sends raw records
//! from its own thread, the router receives them on the VM thread.
use std::time::Duration;

use crossbeam::channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use vm_events::RawEventRecord;

use crate::host::EventSource;

pub struct ChannelSource {
    receiver: Receiver<RawEventRecord>,
}

impl ChannelSource {
    pub fn new(receiver: Receiver<RawEventRecord>) -> Self {
        Self { receiver }
    }

    /// A bounded channel; the sender blocks when `capacity` records are
    /// queued.
    pub fn bounded(capacity: usize) -> (Sender<RawEventRecord>, Self) {
        let (sender, receiver) = crossbeam::channel::bounded(capacity);
        (sender, Self::new(receiver))
    }

    pub fn unbounded() -> (Sender<RawEventRecord>, Self) {
        let (sender, receiver) = crossbeam::channel::unbounded();
        (sender, Self::new(receiver))
    }

    pub fn pending(&self) -> usize {
        self.receiver.len()
    }
}

impl EventSource for ChannelSource {
    fn receive(&mut self, timeout_ms: i32) -> Option<RawEventRecord> {
        match timeout_ms {
            0 => match self.receiver.try_recv() {
                Ok(record) => Some(record),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => {
                    log::warn!("event transport disconnected");
                    None
                }
            },
            ms if ms < 0 => match self.receiver.recv() {
                Ok(record) => Some(record),
                Err(_) => {
                    log::warn!("event transport disconnected");
                    None
                }
            },
            ms => match self
                .receiver
                .recv_timeout(Duration::from_millis(ms as u64))
            {
                Ok(record) => Some(record),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => {
                    log::warn!("event transport disconnected");
                    None
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use vm_events::raw::EVENT_ROTATION;

    #[test]
    fn poll_does_not_block() {
        let (_sender, mut source) = ChannelSource::unbounded();
        let start = Instant::now();
        assert!(source.receive(0).is_none());
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn bounded_wait_times_out() {
        let (_sender, mut source) = ChannelSource::unbounded();
        let start = Instant::now();
        assert!(source.receive(30).is_none());
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn records_arrive_in_order() {
        let (sender, mut source) = ChannelSource::bounded(4);
        for event_type in [EVENT_ROTATION, EVENT_ROTATION + 100] {
            sender.send(RawEventRecord::empty(event_type)).unwrap();
        }
        assert_eq!(2, source.pending());

        assert_eq!(Some(EVENT_ROTATION), source.receive(0).unwrap().event_type());
        assert_eq!(
            Some(EVENT_ROTATION + 100),
            source.receive(-1).unwrap().event_type()
        );
    }

    #[test]
    fn blocking_receive_wakes_on_send() {
        let (sender, mut source) = ChannelSource::bounded(1);
        let platform = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            sender.send(RawEventRecord::empty(EVENT_ROTATION)).unwrap();
        });

        assert_eq!(Some(EVENT_ROTATION), source.receive(-1).unwrap().event_type());
        platform.join().unwrap();

        // The sender is gone now.
        assert!(source.receive(-1).is_none());
    }
}
