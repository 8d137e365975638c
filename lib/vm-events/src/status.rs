//! Status codes written into a woken thread's status slot.
pub type Status = i32;

pub const STATUS_OK: Status = 0;
pub const STATUS_IO_ERROR: Status = -1;
pub const STATUS_WOULD_BLOCK: Status = -2;
pub const STATUS_INTERRUPTED: Status = -3;
pub const STATUS_INVALID: Status = -4;

// Network transitions, as carried by network events.
pub const NETWORK_UP: i32 = 1;
pub const NETWORK_DOWN: i32 = 2;
pub const NETWORK_DOWN_REQUEST: i32 = 3;

// Card reader signals: used both as the descriptor and the status.
pub const CARD_SIGNAL_RESET: i32 = 1;
pub const CARD_SIGNAL_XFER: i32 = 2;
pub const CARD_SIGNAL_LOCK: i32 = 3;

/// What a network event reports about the platform network.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NetworkTransition {
    Up,
    Down,
    /// The platform asks the runtime to drop the network once idle.
    DownRequest,
    Other(i32),
}

impl From<i32> for NetworkTransition {
    fn from(net_type: i32) -> Self {
        match net_type {
            NETWORK_UP => Self::Up,
            NETWORK_DOWN => Self::Down,
            NETWORK_DOWN_REQUEST => Self::DownRequest,
            other => Self::Other(other),
        }
    }
}
