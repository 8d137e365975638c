//! Events delivered to the AMS, the foreground UI, or a VM thread's
//! event queue. Unlike signals, these never touch the blocked-thread
//! registry.

/// Key event payload.
///
/// Typed characters travel as a one-character string; every other key
/// action carries the raw key code. Some input systems rely on typed
/// characters arriving as strings, so the two must stay distinct.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyInput {
    Typed(String),
    Code(i32),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NormalizedEvent {
    Key {
        action: i32,
        input: KeyInput,
    },
    Pen {
        action: i32,
        x: i32,
        y: i32,
    },
    Rotation,

    Shutdown,
    PauseAll,
    ActivateAll,

    /// `switch` is true for "switch to the next app", false for
    /// "let the user select an app".
    #[cfg(feature = "multi-isolate")]
    SelectForeground {
        switch: bool,
    },

    #[cfg(feature = "on-device-debug")]
    EnableOnDeviceDebug,

    #[cfg(feature = "media")]
    Media {
        owner: i32,
        player_id: i32,
        kind: i32,
        status: i32,
        data: i64,
    },

    #[cfg(feature = "amms")]
    AdvancedMedia {
        owner: i32,
        player_id: i32,
        kind: i32,
        data: i64,
    },

    #[cfg(feature = "sensor")]
    SensorAvailability {
        sensor_type: i32,
        available: bool,
    },

    #[cfg(feature = "chapi")]
    ContentHandler,
}

impl NormalizedEvent {
    /// The owner (isolate) a VM-thread event is destined for; -1 means
    /// all owners. None for events that are not owner-addressed.
    pub fn owner(&self) -> Option<i32> {
        match self {
            #[cfg(feature = "media")]
            Self::Media { owner, .. } => Some(*owner),
            #[cfg(feature = "amms")]
            Self::AdvancedMedia { owner, .. } => Some(*owner),
            #[cfg(feature = "sensor")]
            Self::SensorAvailability { .. } => Some(crate::media::OWNER_BROADCAST),
            _ => None,
        }
    }
}
