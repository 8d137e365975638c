use crate::class::SignalClass;
use crate::event::NormalizedEvent;
use crate::status::{NetworkTransition, Status};

#[cfg(feature = "media")]
use crate::media::PlayerDescriptor;

/// The result payload a signal carries for the thread it wakes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventResult {
    None,
    /// An opaque platform word: socket extra data, media data, a card handle.
    Handle(i64),
    /// A variable-length result, e.g. resolved address bytes.
    Bytes(Vec<u8>),
}

#[cfg(feature = "chapi")]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChapiKind {
    PlatformFinish,
    JavaInvoke,
}

#[cfg(feature = "chapi")]
impl ChapiKind {
    pub fn class(self) -> SignalClass {
        match self {
            Self::PlatformFinish => SignalClass::ChapiPlatformFinish,
            Self::JavaInvoke => SignalClass::ChapiJavaInvoke,
        }
    }
}

#[cfg(feature = "media")]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MediaSignal {
    /// Completion of a player operation; wakes the thread waiting on
    /// the packed descriptor.
    Player {
        descriptor: PlayerDescriptor,
        status: Status,
        data: i64,
    },
    /// A notification for the VM event queue; the decoded
    /// NormalizedEvent carries the payload.
    Notify,
}

/// A decoded platform event, classified for routing.
///
/// Each variant carries only what routing needs. Events that go to a
/// notification sink carry their payload in `Decoded::event`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Signal {
    Key,
    Pen,
    Rotation,

    SocketReady {
        descriptor: i32,
        wait_kind: SignalClass,
        status: Status,
        result: EventResult,
    },

    NetworkInit {
        status: NetworkTransition,
    },

    Shutdown,
    PauseAll,
    ResumeAll,

    PushAlarm {
        descriptor: i32,
    },

    #[cfg(feature = "multi-isolate")]
    SelectForeground,

    #[cfg(feature = "on-device-debug")]
    EnableOnDeviceDebug,

    #[cfg(feature = "file-connection")]
    DisksChanged,

    #[cfg(feature = "wma")]
    Wma {
        class: SignalClass,
        descriptor: i32,
        status: Status,
    },

    #[cfg(feature = "media")]
    Media(MediaSignal),

    #[cfg(feature = "amms")]
    AdvancedMedia,

    #[cfg(feature = "location")]
    Location {
        class: SignalClass,
        descriptor: i32,
        status: Status,
    },

    #[cfg(feature = "chapi")]
    Chapi {
        kind: ChapiKind,
        invocation: i32,
        handle: i64,
    },

    #[cfg(feature = "card-device")]
    CardDevice {
        code: i32,
        handle: Option<i64>,
    },

    #[cfg(feature = "sensor")]
    SensorAvailable,

    #[cfg(feature = "sensor")]
    SensorOpenClose {
        descriptor: i32,
    },

    Unknown {
        event_type: Option<u32>,
    },
}

impl Signal {
    /// The wait class this signal belongs to.
    pub fn class(&self) -> SignalClass {
        match self {
            Self::Key | Self::Pen | Self::Rotation => SignalClass::Ui,
            Self::SocketReady { wait_kind, .. } => *wait_kind,
            Self::NetworkInit { .. } => SignalClass::NetworkInit,
            Self::Shutdown | Self::PauseAll | Self::ResumeAll => SignalClass::Ams,
            Self::PushAlarm { .. } => SignalClass::PushAlarm,
            #[cfg(feature = "multi-isolate")]
            Self::SelectForeground => SignalClass::Ams,
            #[cfg(feature = "on-device-debug")]
            Self::EnableOnDeviceDebug => SignalClass::Ams,
            #[cfg(feature = "file-connection")]
            Self::DisksChanged => SignalClass::NoSignal,
            #[cfg(feature = "wma")]
            Self::Wma { class, .. } => *class,
            #[cfg(feature = "media")]
            Self::Media(_) => SignalClass::MediaEvent,
            #[cfg(feature = "amms")]
            Self::AdvancedMedia => SignalClass::MediaEvent,
            #[cfg(feature = "location")]
            Self::Location { class, .. } => *class,
            #[cfg(feature = "chapi")]
            Self::Chapi { kind, .. } => kind.class(),
            #[cfg(feature = "card-device")]
            Self::CardDevice { .. } => SignalClass::CardReaderData,
            #[cfg(feature = "sensor")]
            Self::SensorAvailable | Self::SensorOpenClose { .. } => SignalClass::Sensor,
            Self::Unknown { .. } => SignalClass::NoSignal,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown { .. })
    }
}

/// The decoder's output: the routing signal plus, for sink-bound
/// events, the event to deliver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decoded {
    pub signal: Signal,
    pub event: Option<NormalizedEvent>,
}

impl Decoded {
    pub fn signal(signal: Signal) -> Self {
        Self {
            signal,
            event: None,
        }
    }

    pub fn with_event(signal: Signal, event: NormalizedEvent) -> Self {
        Self {
            signal,
            event: Some(event),
        }
    }

    pub fn unknown(event_type: Option<u32>) -> Self {
        Self::signal(Signal::Unknown { event_type })
    }
}
