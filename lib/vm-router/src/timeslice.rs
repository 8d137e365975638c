use crate::host::{PendingWork, ProtocolHandler, PushRegistry, VmScheduler};

/// VmScheduler::recommended_slice() value meaning the VM has finished.
pub const SLICE_FINISHED: i64 = -2;

/// Wait forever.
pub const SLICE_INDEFINITE: i32 = -1;

/// Converts a recommended slice into a wait timeout in milliseconds.
pub fn clamp_time_slice(to: i64) -> i32 {
    if !(0..=0x7FFF_FFFF).contains(&to) {
        return SLICE_INDEFINITE;
    }
    (to & 0x7FFF_FFFF) as i32
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NextSlice {
    Finished,
    /// Block for events for at most this many milliseconds (-1: forever).
    Wait(i32),
}

/// Asked by the scheduler, between event cycles, how long to block.
#[derive(Debug, Default)]
pub struct TimeSliceHook {
    finalized: bool,
}

impl TimeSliceHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn next_slice(
        &mut self,
        vm: &mut dyn VmScheduler,
        push: &mut dyn PushRegistry,
        protocols: &mut dyn ProtocolHandler,
        pending: &mut dyn PendingWork,
    ) -> NextSlice {
        let to = vm.recommended_slice();
        if to == SLICE_FINISHED {
            if !self.finalized {
                self.finalized = true;
                log::info!("VM finished: finalizing");
                vm.measure_stack(false);
                push.check_in_all();
                vm.finalize();
                protocols.finalize();
            }
            return NextSlice::Finished;
        }

        let ms = clamp_time_slice(to);
        pending.refresh_pending(ms);
        NextSlice::Wait(ms)
    }
}
