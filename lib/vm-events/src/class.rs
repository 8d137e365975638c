//! Wait classes: what a blocked VM thread is waiting for.
//!
//! The integer codes are stable: they appear in raw event records
//! (socket and location events) and in the reentry data the VM keeps
//! for every blocked thread.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum SignalClass {
    /// The thread was already unblocked by a forced (wildcard) wakeup
    /// and must not be unblocked again until it blocks anew.
    Consumed = -1,
    /// Wildcard: matches any class for a given descriptor.
    NoSignal = 0,
    NetworkRead = 1,
    NetworkWrite = 2,
    NetworkException = 3,
    HostNameLookup = 4,
    Ui = 5,
    Ams = 6,
    Push = 7,
    PushAlarm = 8,
    NetworkInit = 9,
    MediaEvent = 10,
    WmaSmsRead = 11,
    WmaCbsRead = 12,
    WmaMmsRead = 13,
    WmaSmsWrite = 14,
    WmaMmsWrite = 15,
    Location = 16,
    Orientation = 17,
    Proximity = 18,
    ChapiPlatformFinish = 19,
    ChapiJavaInvoke = 20,
    CardReaderData = 21,
    Sensor = 22,
    VmDebug = 23,
}

impl SignalClass {
    /// Classes woken with an I/O error when the platform network goes down.
    pub const NETWORK: [SignalClass; 5] = [
        SignalClass::NetworkInit,
        SignalClass::NetworkRead,
        SignalClass::NetworkWrite,
        SignalClass::NetworkException,
        SignalClass::HostNameLookup,
    ];

    pub const fn code(self) -> i32 {
        self as i32
    }

    pub fn is_network(self) -> bool {
        Self::NETWORK.contains(&self)
    }

    pub fn is_socket(self) -> bool {
        matches!(
            self,
            Self::NetworkRead | Self::NetworkWrite | Self::NetworkException | Self::HostNameLookup
        )
    }
}

impl TryFrom<i32> for SignalClass {
    type Error = i32;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        let class = match code {
            -1 => Self::Consumed,
            0 => Self::NoSignal,
            1 => Self::NetworkRead,
            2 => Self::NetworkWrite,
            3 => Self::NetworkException,
            4 => Self::HostNameLookup,
            5 => Self::Ui,
            6 => Self::Ams,
            7 => Self::Push,
            8 => Self::PushAlarm,
            9 => Self::NetworkInit,
            10 => Self::MediaEvent,
            11 => Self::WmaSmsRead,
            12 => Self::WmaCbsRead,
            13 => Self::WmaMmsRead,
            14 => Self::WmaSmsWrite,
            15 => Self::WmaMmsWrite,
            16 => Self::Location,
            17 => Self::Orientation,
            18 => Self::Proximity,
            19 => Self::ChapiPlatformFinish,
            20 => Self::ChapiJavaInvoke,
            21 => Self::CardReaderData,
            22 => Self::Sensor,
            23 => Self::VmDebug,
            x => return Err(x),
        };

        Ok(class)
    }
}

/// Identifies a blocked thread's wait condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WaitKey {
    pub class: SignalClass,
    pub descriptor: i32,
}

impl WaitKey {
    pub const fn new(class: SignalClass, descriptor: i32) -> Self {
        Self { class, descriptor }
    }

    /// A wildcard key: forces the first waiter on `descriptor` awake,
    /// whatever it waits for.
    pub const fn forced(descriptor: i32) -> Self {
        Self::new(SignalClass::NoSignal, descriptor)
    }

    pub fn is_forced(&self) -> bool {
        self.class == SignalClass::NoSignal
    }

    /// Exact match: same class and same descriptor.
    pub fn matches_exactly(&self, waiting_for: SignalClass, descriptor: i32) -> bool {
        self.class == waiting_for && self.descriptor == descriptor
    }

    /// Exact match, or a wildcard match on the descriptor. Consumed
    /// waiters never match.
    pub fn matches(&self, waiting_for: SignalClass, descriptor: i32) -> bool {
        if waiting_for == SignalClass::Consumed {
            return false;
        }
        self.matches_exactly(waiting_for, descriptor)
            || (self.is_forced() && self.descriptor == descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for code in -1..=23 {
            let class = SignalClass::try_from(code).unwrap();
            assert_eq!(code, class.code());
        }
        assert_eq!(Err(24), SignalClass::try_from(24));
        assert_eq!(Err(-2), SignalClass::try_from(-2));
    }

    #[test]
    fn wildcard_matches_any_class_on_descriptor() {
        let key = WaitKey::forced(7);
        assert!(key.matches(SignalClass::NetworkRead, 7));
        assert!(key.matches(SignalClass::PushAlarm, 7));
        assert!(!key.matches(SignalClass::NetworkRead, 8));
        assert!(!key.matches(SignalClass::Consumed, 7));
    }

    #[test]
    fn exact_keys_need_both_components() {
        let key = WaitKey::new(SignalClass::NetworkWrite, 3);
        assert!(key.matches(SignalClass::NetworkWrite, 3));
        assert!(!key.matches(SignalClass::NetworkRead, 3));
        assert!(!key.matches(SignalClass::NetworkWrite, 4));
    }

    #[test]
    fn network_classes() {
        assert_eq!(5, SignalClass::NETWORK.len());
        assert!(SignalClass::HostNameLookup.is_network());
        assert!(SignalClass::NetworkInit.is_network());
        assert!(!SignalClass::NetworkInit.is_socket());
        assert!(!SignalClass::Push.is_network());
    }
}
