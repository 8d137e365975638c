//! Routes native platform events to blocked VM threads.
//!
//! One cycle: receive a raw record from the EventSource, decode it,
//! then either wake the thread(s) blocked on the resulting signal or
//! hand the event to a notification sink. The router runs on the VM
//! scheduler's thread and keeps no state between cycles; everything it
//! touches is passed in.

pub mod config;
pub mod dispatch;
pub mod host;
pub mod registry;
pub mod sinks;
pub mod timeslice;
pub mod transport;

mod error;

pub use config::{read_from_file, Config};
pub use dispatch::{dispatch, Delivery};
pub use error::RouterError;
pub use host::Host;
pub use registry::{BlockedThread, ReentryData, ResultSlot, ThreadId};
pub use timeslice::{clamp_time_slice, NextSlice, TimeSliceHook};

use host::EventSource;
use vm_events::decode;

pub struct Router<S: EventSource> {
    source: S,
    default_timeout_ms: i32,
}

impl<S: EventSource> Router<S> {
    pub fn new(source: S) -> Self {
        Self::with_config(source, &Config::default())
    }

    pub fn with_config(source: S, config: &Config) -> Self {
        Self {
            source,
            default_timeout_ms: config.default_timeout_ms(),
        }
    }

    /// Waits up to `timeout_ms` for one event and dispatches it.
    /// Returns None if no event arrived.
    pub fn handle_events(
        &mut self,
        threads: &mut [BlockedThread],
        host: &mut Host<'_>,
        timeout_ms: i32,
    ) -> Option<Delivery> {
        let record = self.source.receive(timeout_ms)?;
        Some(dispatch(decode(&record), threads, host))
    }

    /// Handles an event the platform says is pending, without blocking.
    pub fn inform_event(
        &mut self,
        threads: &mut [BlockedThread],
        host: &mut Host<'_>,
    ) -> Option<Delivery> {
        self.handle_events(threads, host, 0)
    }

    /// handle_events() with the configured default timeout.
    pub fn run_once(
        &mut self,
        threads: &mut [BlockedThread],
        host: &mut Host<'_>,
    ) -> Option<Delivery> {
        self.handle_events(threads, host, self.default_timeout_ms)
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
}
