//! Blocked-thread registry scanner.
//!
//! The registry is a slice of blocked threads owned by the VM scheduler
//! and lent to the router for one dispatch. Waking a thread means
//! writing its status (and maybe a result) into its reentry data, then
//! asking the ThreadResumer to make it runnable.
use vm_events::{EventResult, SignalClass, Status, WaitKey};

use crate::host::ThreadResumer;
use crate::RouterError;

pub type ThreadId = u32;

/// A woken thread's result, copied out of the event.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ResultSlot {
    #[default]
    Empty,
    Handle(i64),
    Bytes(Vec<u8>),
}

impl ResultSlot {
    fn copy_from(result: &EventResult, thread: ThreadId, max_len: usize) -> Result<Self, RouterError> {
        match result {
            EventResult::None => Ok(Self::Empty),
            EventResult::Handle(handle) => Ok(Self::Handle(*handle)),
            EventResult::Bytes(bytes) => {
                let exhausted = || RouterError::ResourceExhaustion {
                    thread,
                    len: bytes.len(),
                };
                if bytes.len() > max_len {
                    return Err(exhausted());
                }

                let mut copy = Vec::new();
                copy.try_reserve_exact(bytes.len())
                    .map_err(|_| exhausted())?;
                copy.extend_from_slice(bytes);
                Ok(Self::Bytes(copy))
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReentryData {
    pub waiting_for: SignalClass,
    pub descriptor: i32,
    pub status: Status,
    pub result: ResultSlot,
    /// The largest byte result the thread can take.
    pub max_result_len: usize,
}

impl ReentryData {
    pub fn new(waiting_for: SignalClass, descriptor: i32) -> Self {
        Self {
            waiting_for,
            descriptor,
            status: vm_events::status::STATUS_OK,
            result: ResultSlot::Empty,
            max_result_len: usize::MAX,
        }
    }

    pub fn with_max_result_len(mut self, max_result_len: usize) -> Self {
        self.max_result_len = max_result_len;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockedThread {
    pub thread_id: ThreadId,
    /// None if the thread blocked without saying what for; such threads
    /// are never woken by events.
    pub reentry: Option<ReentryData>,
}

impl BlockedThread {
    pub fn new(thread_id: ThreadId, waiting_for: SignalClass, descriptor: i32) -> Self {
        Self {
            thread_id,
            reentry: Some(ReentryData::new(waiting_for, descriptor)),
        }
    }

    pub fn without_reentry(thread_id: ThreadId) -> Self {
        Self {
            thread_id,
            reentry: None,
        }
    }

    pub fn wait_key(&self) -> Option<WaitKey> {
        self.reentry
            .as_ref()
            .map(|r| WaitKey::new(r.waiting_for, r.descriptor))
    }

    fn matches(&self, key: WaitKey) -> bool {
        self.reentry
            .as_ref()
            .is_some_and(|r| key.matches(r.waiting_for, r.descriptor))
    }

    // No wildcard: the broadcast scans only wake exact waiters.
    fn matches_exactly(&self, key: WaitKey) -> bool {
        !matches!(key.class, SignalClass::NoSignal | SignalClass::Consumed)
            && self
                .reentry
                .as_ref()
                .is_some_and(|r| key.matches_exactly(r.waiting_for, r.descriptor))
    }
}

fn find_waiter(threads: &[BlockedThread], key: WaitKey) -> Option<usize> {
    threads.iter().position(|t| t.matches(key))
}

// Callers guarantee that `thread` has reentry data.
fn wake(
    thread: &mut BlockedThread,
    key: WaitKey,
    status: Status,
    result: Option<ResultSlot>,
    resumer: &mut dyn ThreadResumer,
) {
    let Some(reentry) = thread.reentry.as_mut() else {
        return;
    };

    reentry.status = status;
    if let Some(result) = result {
        reentry.result = result;
    }

    if key.is_forced() {
        log::error!(
            "{}:{} forced unblock of thread {} waiting for {:?} on {}",
            file!(),
            line!(),
            thread.thread_id,
            reentry.waiting_for,
            reentry.descriptor
        );
        reentry.waiting_for = SignalClass::Consumed;
    }

    log::trace!("waking thread {} with status {}", thread.thread_id, status);
    resumer.resume(thread.thread_id);
}

/// Wakes the first thread waiting on `key`. A key with class NoSignal
/// wakes the first thread on `key.descriptor`, whatever it waits for,
/// and marks its wait as consumed.
pub fn unblock_one(
    threads: &mut [BlockedThread],
    key: WaitKey,
    status: Status,
    resumer: &mut dyn ThreadResumer,
) -> bool {
    let Some(idx) = find_waiter(threads, key) else {
        return false;
    };
    wake(&mut threads[idx], key, status, None, resumer);
    true
}

/// Wakes every thread waiting exactly on `key`; returns how many were
/// woken. A NoSignal key wakes nobody.
pub fn unblock_all(
    threads: &mut [BlockedThread],
    key: WaitKey,
    status: Status,
    resumer: &mut dyn ThreadResumer,
) -> usize {
    let mut woken = 0;
    for thread in threads.iter_mut().filter(|t| t.matches_exactly(key)) {
        wake(thread, key, status, None, resumer);
        woken += 1;
    }
    woken
}

/// Wakes every thread waiting for `class`, on any descriptor.
pub fn unblock_class(
    threads: &mut [BlockedThread],
    class: SignalClass,
    status: Status,
    resumer: &mut dyn ThreadResumer,
) -> usize {
    if matches!(class, SignalClass::NoSignal | SignalClass::Consumed) {
        return 0;
    }

    let mut woken = 0;
    for thread in threads.iter_mut() {
        let Some(key) = thread.wait_key() else {
            continue;
        };
        if key.class == class {
            wake(thread, key, status, None, resumer);
            woken += 1;
        }
    }
    woken
}

/// Like unblock_one, but also hands `result` to the woken thread.
///
/// Fails with NoWaiter if nobody waits on `key`, and with
/// ResourceExhaustion if the result cannot be copied; in the latter case
/// the thread stays blocked and its reentry data is untouched.
pub fn unblock_one_with_result(
    threads: &mut [BlockedThread],
    key: WaitKey,
    status: Status,
    result: &EventResult,
    resumer: &mut dyn ThreadResumer,
) -> Result<ThreadId, RouterError> {
    let Some(idx) = find_waiter(threads, key) else {
        return Err(RouterError::NoWaiter {
            class: key.class,
            descriptor: key.descriptor,
        });
    };

    let thread = &mut threads[idx];
    let max_len = thread
        .reentry
        .as_ref()
        .map_or(usize::MAX, |r| r.max_result_len);
    let slot = ResultSlot::copy_from(result, thread.thread_id, max_len)?;

    wake(thread, key, status, Some(slot), resumer);
    Ok(thread.thread_id)
}

/// Like unblock_all, but also hands a copy of `result` to every woken
/// thread. Either every matching thread gets its copy and is woken, or,
/// on ResourceExhaustion, none is.
pub fn unblock_all_with_result(
    threads: &mut [BlockedThread],
    key: WaitKey,
    status: Status,
    result: &EventResult,
    resumer: &mut dyn ThreadResumer,
) -> Result<usize, RouterError> {
    let mut pending = Vec::new();
    for (idx, thread) in threads.iter().enumerate() {
        if !thread.matches_exactly(key) {
            continue;
        }
        let max_len = thread
            .reentry
            .as_ref()
            .map_or(usize::MAX, |r| r.max_result_len);
        pending.push((idx, ResultSlot::copy_from(result, thread.thread_id, max_len)?));
    }

    let woken = pending.len();
    for (idx, slot) in pending {
        wake(&mut threads[idx], key, status, Some(slot), resumer);
    }
    Ok(woken)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vm_events::status::*;

    #[derive(Default)]
    struct Resumed(Vec<ThreadId>);

    impl ThreadResumer for Resumed {
        fn resume(&mut self, thread: ThreadId) {
            self.0.push(thread);
        }
    }

    fn status_of(thread: &BlockedThread) -> Status {
        thread.reentry.as_ref().unwrap().status
    }

    #[test]
    fn first_exact_match_wins() {
        let mut threads = vec![
            BlockedThread::new(1, SignalClass::NetworkWrite, 5),
            BlockedThread::without_reentry(2),
            BlockedThread::new(3, SignalClass::NetworkRead, 5),
            BlockedThread::new(4, SignalClass::NetworkRead, 5),
        ];
        let mut resumed = Resumed::default();

        let key = WaitKey::new(SignalClass::NetworkRead, 5);
        assert!(unblock_one(&mut threads, key, STATUS_IO_ERROR, &mut resumed));

        assert_eq!(vec![3], resumed.0);
        assert_eq!(STATUS_IO_ERROR, status_of(&threads[2]));
        assert_eq!(STATUS_OK, status_of(&threads[3]));
        assert_eq!(STATUS_OK, status_of(&threads[0]));
    }

    #[test]
    fn no_match_is_not_an_error() {
        let mut threads = vec![BlockedThread::new(1, SignalClass::NetworkRead, 5)];
        let mut resumed = Resumed::default();

        let key = WaitKey::new(SignalClass::NetworkRead, 6);
        assert!(!unblock_one(&mut threads, key, STATUS_OK, &mut resumed));
        assert_eq!(0, unblock_all(&mut threads, key, STATUS_OK, &mut resumed));
        assert!(resumed.0.is_empty());
    }

    #[test]
    fn forced_unblock_consumes_the_wait() {
        let mut threads = vec![
            BlockedThread::new(1, SignalClass::NetworkRead, 4),
            BlockedThread::new(2, SignalClass::PushAlarm, 7),
        ];
        let mut resumed = Resumed::default();

        assert!(unblock_one(
            &mut threads,
            WaitKey::forced(7),
            STATUS_INTERRUPTED,
            &mut resumed
        ));
        assert_eq!(vec![2], resumed.0);
        let reentry = threads[1].reentry.as_ref().unwrap();
        assert_eq!(SignalClass::Consumed, reentry.waiting_for);
        assert_eq!(STATUS_INTERRUPTED, reentry.status);

        // Neither an exact scan nor another forced scan finds it again.
        let exact = WaitKey::new(SignalClass::PushAlarm, 7);
        assert!(!unblock_one(&mut threads, exact, STATUS_OK, &mut resumed));
        assert_eq!(0, unblock_all(&mut threads, exact, STATUS_OK, &mut resumed));
        assert!(!unblock_one(&mut threads, WaitKey::forced(7), STATUS_OK, &mut resumed));
        assert_eq!(vec![2], resumed.0);
    }

    #[test]
    fn unblock_all_has_no_wildcard() {
        let mut threads = vec![
            BlockedThread::new(1, SignalClass::NetworkRead, 7),
            BlockedThread::new(2, SignalClass::NetworkWrite, 7),
            BlockedThread::new(3, SignalClass::PushAlarm, 7),
        ];
        let before = threads.clone();
        let mut resumed = Resumed::default();

        assert_eq!(
            0,
            unblock_all(&mut threads, WaitKey::forced(7), STATUS_OK, &mut resumed)
        );
        assert_eq!(
            0,
            unblock_all_with_result(
                &mut threads,
                WaitKey::forced(7),
                STATUS_OK,
                &EventResult::Handle(1),
                &mut resumed
            )
            .unwrap()
        );
        assert!(resumed.0.is_empty());
        assert_eq!(before, threads);
    }

    #[test]
    fn unblock_all_skips_consumed_waits() {
        let mut threads = vec![
            BlockedThread::new(1, SignalClass::Push, 0),
            BlockedThread::new(2, SignalClass::Push, 0),
        ];
        let mut resumed = Resumed::default();

        assert!(unblock_one(&mut threads, WaitKey::forced(0), STATUS_OK, &mut resumed));
        let key = WaitKey::new(SignalClass::Push, 0);
        assert_eq!(1, unblock_all(&mut threads, key, STATUS_OK, &mut resumed));
        assert_eq!(vec![1, 2], resumed.0);

        let consumed = WaitKey::new(SignalClass::Consumed, 0);
        assert_eq!(0, unblock_all(&mut threads, consumed, STATUS_OK, &mut resumed));
    }

    #[test]
    fn unblock_all_wakes_every_exact_match() {
        let mut threads = vec![
            BlockedThread::new(1, SignalClass::Push, 0),
            BlockedThread::new(2, SignalClass::Push, 1),
            BlockedThread::new(3, SignalClass::Push, 0),
            BlockedThread::without_reentry(4),
        ];
        let mut resumed = Resumed::default();

        let key = WaitKey::new(SignalClass::Push, 0);
        assert_eq!(2, unblock_all(&mut threads, key, STATUS_OK, &mut resumed));
        assert_eq!(vec![1, 3], resumed.0);
    }

    #[test]
    fn unblock_class_ignores_descriptors() {
        let mut threads = vec![
            BlockedThread::new(1, SignalClass::NetworkRead, 1),
            BlockedThread::new(2, SignalClass::NetworkWrite, 1),
            BlockedThread::new(3, SignalClass::NetworkRead, 2),
        ];
        let mut resumed = Resumed::default();

        assert_eq!(
            2,
            unblock_class(&mut threads, SignalClass::NetworkRead, STATUS_IO_ERROR, &mut resumed)
        );
        assert_eq!(vec![1, 3], resumed.0);
        assert_eq!(
            0,
            unblock_class(&mut threads, SignalClass::NoSignal, STATUS_IO_ERROR, &mut resumed)
        );
    }

    #[test]
    fn results_are_copied_into_the_slot() {
        let mut threads = vec![BlockedThread::new(8, SignalClass::HostNameLookup, 3)];
        let mut resumed = Resumed::default();

        let key = WaitKey::new(SignalClass::HostNameLookup, 3);
        let result = EventResult::Bytes(vec![192, 168, 0, 1]);
        let woken = unblock_one_with_result(&mut threads, key, STATUS_OK, &result, &mut resumed);
        assert_eq!(8, woken.unwrap());

        let reentry = threads[0].reentry.as_ref().unwrap();
        assert_eq!(ResultSlot::Bytes(vec![192, 168, 0, 1]), reentry.result);
    }

    #[test]
    fn missing_waiter_is_reported() {
        let mut threads: Vec<BlockedThread> = vec![];
        let mut resumed = Resumed::default();

        let key = WaitKey::new(SignalClass::MediaEvent, 3);
        let err = unblock_one_with_result(
            &mut threads,
            key,
            STATUS_OK,
            &EventResult::Handle(1),
            &mut resumed,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RouterError::NoWaiter {
                class: SignalClass::MediaEvent,
                descriptor: 3
            }
        ));
    }

    #[test]
    fn resource_exhaustion_leaves_thread_blocked() {
        let mut threads = vec![BlockedThread {
            thread_id: 8,
            reentry: Some(
                ReentryData::new(SignalClass::HostNameLookup, 3).with_max_result_len(2),
            ),
        }];
        let before = threads.clone();
        let mut resumed = Resumed::default();

        let key = WaitKey::new(SignalClass::HostNameLookup, 3);
        let result = EventResult::Bytes(vec![1, 2, 3, 4]);
        let err = unblock_one_with_result(&mut threads, key, STATUS_OK, &result, &mut resumed)
            .unwrap_err();

        assert!(matches!(
            err,
            RouterError::ResourceExhaustion { thread: 8, len: 4 }
        ));
        assert!(resumed.0.is_empty());
        assert_eq!(before, threads);
    }

    #[test]
    fn unblock_all_with_result_is_all_or_nothing() {
        let mut threads = vec![
            BlockedThread::new(1, SignalClass::CardReaderData, 2),
            BlockedThread {
                thread_id: 2,
                reentry: Some(
                    ReentryData::new(SignalClass::CardReaderData, 2).with_max_result_len(0),
                ),
            },
        ];
        let before = threads.clone();
        let mut resumed = Resumed::default();

        let key = WaitKey::new(SignalClass::CardReaderData, 2);
        let bytes = EventResult::Bytes(vec![1]);
        assert!(unblock_all_with_result(&mut threads, key, 2, &bytes, &mut resumed).is_err());
        assert!(resumed.0.is_empty());
        assert_eq!(before, threads);

        let handle = EventResult::Handle(77);
        assert_eq!(
            2,
            unblock_all_with_result(&mut threads, key, 2, &handle, &mut resumed).unwrap()
        );
        assert_eq!(vec![1, 2], resumed.0);
        for thread in &threads {
            let reentry = thread.reentry.as_ref().unwrap();
            assert_eq!(2, reentry.status);
            assert_eq!(ResultSlot::Handle(77), reentry.result);
        }
    }

    // Whatever the registry looks like, an exact unblock_one wakes at
    // most one thread, and only one that waited on the key.
    #[test]
    fn random_registries() {
        use rand::Rng;

        let classes = [
            SignalClass::NetworkRead,
            SignalClass::NetworkWrite,
            SignalClass::Push,
            SignalClass::Consumed,
        ];
        let mut rng = rand::thread_rng();

        for _ in 0..200 {
            let mut threads: Vec<_> = (0..rng.gen_range(0..16))
                .map(|id| {
                    if rng.gen_bool(0.1) {
                        BlockedThread::without_reentry(id)
                    } else {
                        let class = classes[rng.gen_range(0..classes.len())];
                        BlockedThread::new(id, class, rng.gen_range(0..4))
                    }
                })
                .collect();
            let before = threads.clone();

            let key = WaitKey::new(classes[rng.gen_range(0..3)], rng.gen_range(0..4));
            let mut resumed = Resumed::default();
            let woke = unblock_one(&mut threads, key, STATUS_IO_ERROR, &mut resumed);

            let expected = before.iter().find(|t| t.wait_key() == Some(key));
            assert_eq!(expected.is_some(), woke);
            assert_eq!(expected.map(|t| t.thread_id).into_iter().collect::<Vec<_>>(), resumed.0);
        }
    }
}
