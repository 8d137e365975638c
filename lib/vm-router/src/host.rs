//! What the router needs from the rest of the VM.
//!
//! The router owns none of this state: threads, queues, push tables and
//! the network flag all live elsewhere and are reached through these
//! traits, passed in explicitly on every call.
use vm_events::{NormalizedEvent, RawEventRecord, SignalClass, Status};

#[cfg(feature = "chapi")]
use vm_events::signal::ChapiKind;

use crate::registry::ThreadId;

/// The platform event transport.
pub trait EventSource {
    /// Receives one raw record. `timeout_ms`: 0 polls, negative waits
    /// forever, positive waits at most that long.
    fn receive(&mut self, timeout_ms: i32) -> Option<RawEventRecord>;
}

/// The VM's thread-blocking primitive.
pub trait ThreadResumer {
    /// Makes `thread` runnable again. The thread's reentry data has
    /// already been updated.
    fn resume(&mut self, thread: ThreadId);
}

pub trait NotificationSink {
    fn notify_ams(&mut self, event: NormalizedEvent);
    fn notify_foreground(&mut self, event: NormalizedEvent);
    /// `owner` -1 means every owner.
    fn notify_vm_thread(&mut self, event: NormalizedEvent, owner: i32);
}

pub trait PushRegistry {
    /// True if a push connection on `descriptor` has a thread blocked in it.
    fn find_push_blocked_handle(&mut self, descriptor: i32) -> bool;
    /// True if the push alarm `descriptor` has a thread blocked on it.
    fn find_push_timer_blocked_handle(&mut self, descriptor: i32) -> bool;
    fn check_in_all(&mut self);
}

/// Protocol-specific follow-up (messaging, content handlers, file
/// connections). All methods default to "not handled".
pub trait ProtocolHandler {
    /// Returns true if the protocol layer consumed the signal.
    fn check_signal(&mut self, _class: SignalClass, _descriptor: i32, _status: Status) -> bool {
        false
    }

    #[cfg(feature = "chapi")]
    fn process_chapi(&mut self, _kind: ChapiKind, _invocation: i32, _handle: i64) {}

    fn notify_disks_changed(&mut self) {}

    fn finalize(&mut self) {}
}

pub trait NetworkState {
    fn is_connected(&self) -> bool;
    fn set_connected(&mut self);
    fn clear_connected(&mut self);
    fn sockets_in_use(&self) -> usize;
    fn begin_network_shutdown(&mut self);
}

pub trait VmScheduler {
    /// Milliseconds until the VM needs the CPU again; -1 means "no
    /// deadline", SLICE_FINISHED means the VM is done.
    fn recommended_slice(&mut self) -> i64;
    fn measure_stack(&mut self, verbose: bool);
    fn finalize(&mut self);
}

pub trait PendingWork {
    fn refresh_pending(&mut self, timeout_ms: i32);
}

/// Collaborators used while dispatching one event.
pub struct Host<'a> {
    pub resumer: &'a mut dyn ThreadResumer,
    pub sinks: &'a mut dyn NotificationSink,
    pub push: &'a mut dyn PushRegistry,
    pub protocols: &'a mut dyn ProtocolHandler,
    pub network: &'a mut dyn NetworkState,
}
