//! Raw event records, as delivered by the platform event transport.
//!
//! A record is an 8-byte header followed by a payload struct specific
//! to the event type, optionally followed by a variable-length tail:
//!
//! ```text
//! +------------+-------------+------------------------+----------------+
//! | event_type | payload_len | payload (repr(C) POD)  | tail (opaque)  |
//! |    u32     |     u32     |  size_of::<Payload>()  |                |
//! +------------+-------------+------------------------+----------------+
//! ```
//!
//! payload_len covers the payload struct and the tail. All payload
//! structs consist of 4- and 8-byte integers laid out without padding,
//! in native byte order (the transport runs on the same machine).
use core::mem::size_of;

pub const RAW_EVENT_MAX_LEN: usize = 512;
pub const HEADER_SIZE: usize = size_of::<EventHeader>();

// Event types.
pub const EVENT_KEY: u32 = 1;
pub const EVENT_PEN: u32 = 2;
pub const EVENT_SOCKET: u32 = 3;
pub const EVENT_NETWORK: u32 = 4;
pub const EVENT_END: u32 = 5;
pub const EVENT_PAUSE: u32 = 6;
pub const EVENT_RESUME: u32 = 7;
pub const EVENT_PUSH: u32 = 8;
pub const EVENT_ROTATION: u32 = 9;
pub const EVENT_ENABLE_ODD: u32 = 10;
pub const EVENT_FC_ROOT_CHANGED: u32 = 11;
pub const EVENT_SMS_INCOMING: u32 = 12;
pub const EVENT_CBS_INCOMING: u32 = 13;
pub const EVENT_SMS_SENDING_RESULT: u32 = 14;
pub const EVENT_MMS_INCOMING: u32 = 15;
pub const EVENT_MMS_SENDING_RESULT: u32 = 16;
pub const EVENT_MULTIMEDIA: u32 = 17;
pub const EVENT_ADVANCED_MULTIMEDIA: u32 = 18;
pub const EVENT_LOCATION: u32 = 19;
pub const EVENT_PROXIMITY: u32 = 20;
pub const EVENT_CHAPI_PLATFORM_FINISH: u32 = 21;
pub const EVENT_CHAPI_JAVA_INVOKE: u32 = 22;
pub const EVENT_CARD_DEVICE: u32 = 23;
pub const EVENT_SWITCH_FOREGROUND: u32 = 24;
pub const EVENT_SELECT_APP: u32 = 25;
pub const EVENT_SENSOR_AVAILABLE: u32 = 26;
pub const EVENT_SENSOR_OPEN_CLOSE: u32 = 27;

// Key actions.
pub const KEY_PRESSED: i32 = 1;
pub const KEY_RELEASED: i32 = 2;
pub const KEY_REPEATED: i32 = 3;
pub const KEY_TYPED: i32 = 4;

// Card device event types.
pub const CARD_DEVICE_RESET: i32 = 1;
pub const CARD_DEVICE_XFER: i32 = 2;
pub const CARD_DEVICE_UNLOCK: i32 = 3;

#[derive(Clone, Copy, Debug, Default)]
#[repr(C)]
pub struct EventHeader {
    pub event_type: u32,
    pub payload_len: u32,
}

#[derive(Clone, Copy, Debug, Default)]
#[repr(C)]
pub struct KeyPayload {
    pub key: i32,
    pub action: i32,
}

#[derive(Clone, Copy, Debug, Default)]
#[repr(C)]
pub struct PenPayload {
    pub action: i32,
    pub x: i32,
    pub y: i32,
}

#[derive(Clone, Copy, Debug, Default)]
#[repr(C)]
pub struct SocketPayload {
    pub handle: i32,
    pub waiting_for: i32, // SignalClass code.
    pub status: i32,
    pub reserved: u32,
    pub extra: i64,       // Ignored if the record has a tail.
}

#[derive(Clone, Copy, Debug, Default)]
#[repr(C)]
pub struct NetworkPayload {
    pub net_type: i32,
}

#[derive(Clone, Copy, Debug, Default)]
#[repr(C)]
pub struct PushPayload {
    pub alarm_handle: i32,
}

#[derive(Clone, Copy, Debug, Default)]
#[repr(C)]
pub struct WmaIncomingPayload {
    pub stub: i32,
}

#[derive(Clone, Copy, Debug, Default)]
#[repr(C)]
pub struct WmaSendingResultPayload {
    pub handle: i32,
    pub result: i32,
}

#[derive(Clone, Copy, Debug, Default)]
#[repr(C)]
pub struct MultimediaPayload {
    pub media_type: i32,
    pub app_id: i32,
    pub player_id: i32,
    pub status: i32,
    pub data: i64,
}

#[derive(Clone, Copy, Debug, Default)]
#[repr(C)]
pub struct LocationPayload {
    pub event: i32, // SignalClass code.
    pub provider: i32,
    pub operation_result: i32,
}

#[derive(Clone, Copy, Debug, Default)]
#[repr(C)]
pub struct ProximityPayload {
    pub provider: i32,
    pub operation_result: i32,
}

#[derive(Clone, Copy, Debug, Default)]
#[repr(C)]
pub struct ChapiPayload {
    pub invocation_id: i32,
    pub reserved: i32,
    pub event_handle: i64,
}

#[derive(Clone, Copy, Debug, Default)]
#[repr(C)]
pub struct CardDevicePayload {
    pub event_type: i32,
    pub handle: i32,
}

#[derive(Clone, Copy, Debug, Default)]
#[repr(C)]
pub struct SensorAvailablePayload {
    pub sensor_type: i32,
    pub is_available: i32,
}

#[derive(Clone, Copy, Debug, Default)]
#[repr(C)]
pub struct SensorPayload {
    pub sensor: i32,
}

/// An empty payload, for events that carry nothing but their type.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C)]
pub struct NoPayload {}

// No padding anywhere: as_bytes() below relies on it.
const _: () = assert!(size_of::<EventHeader>() == 8);
const _: () = assert!(size_of::<KeyPayload>() == 8);
const _: () = assert!(size_of::<PenPayload>() == 12);
const _: () = assert!(size_of::<SocketPayload>() == 24);
const _: () = assert!(size_of::<NetworkPayload>() == 4);
const _: () = assert!(size_of::<PushPayload>() == 4);
const _: () = assert!(size_of::<WmaIncomingPayload>() == 4);
const _: () = assert!(size_of::<WmaSendingResultPayload>() == 8);
const _: () = assert!(size_of::<MultimediaPayload>() == 24);
const _: () = assert!(size_of::<LocationPayload>() == 12);
const _: () = assert!(size_of::<ProximityPayload>() == 8);
const _: () = assert!(size_of::<ChapiPayload>() == 16);
const _: () = assert!(size_of::<CardDevicePayload>() == 8);
const _: () = assert!(size_of::<SensorAvailablePayload>() == 8);
const _: () = assert!(size_of::<SensorPayload>() == 4);
const _: () = assert!(size_of::<NoPayload>() == 0);

unsafe impl plain::Plain for EventHeader {}
unsafe impl plain::Plain for KeyPayload {}
unsafe impl plain::Plain for PenPayload {}
unsafe impl plain::Plain for SocketPayload {}
unsafe impl plain::Plain for NetworkPayload {}
unsafe impl plain::Plain for PushPayload {}
unsafe impl plain::Plain for WmaIncomingPayload {}
unsafe impl plain::Plain for WmaSendingResultPayload {}
unsafe impl plain::Plain for MultimediaPayload {}
unsafe impl plain::Plain for LocationPayload {}
unsafe impl plain::Plain for ProximityPayload {}
unsafe impl plain::Plain for ChapiPayload {}
unsafe impl plain::Plain for CardDevicePayload {}
unsafe impl plain::Plain for SensorAvailablePayload {}
unsafe impl plain::Plain for SensorPayload {}
unsafe impl plain::Plain for NoPayload {}

/// One raw event: a fixed-capacity buffer and the number of valid bytes.
#[derive(Clone)]
pub struct RawEventRecord {
    bytes: [u8; RAW_EVENT_MAX_LEN],
    len: usize,
}

impl Default for RawEventRecord {
    fn default() -> Self {
        Self {
            bytes: [0; RAW_EVENT_MAX_LEN],
            len: 0,
        }
    }
}

impl core::fmt::Debug for RawEventRecord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RawEventRecord")
            .field("event_type", &self.event_type())
            .field("len", &self.len)
            .finish()
    }
}

impl RawEventRecord {
    /// Wraps bytes received from the transport. Returns None if they
    /// do not fit into a record.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() > RAW_EVENT_MAX_LEN {
            return None;
        }

        let mut record = Self::default();
        record.bytes[..bytes.len()].copy_from_slice(bytes);
        record.len = bytes.len();
        Some(record)
    }

    /// Builds a record: header, payload, tail. Returns None if the
    /// result does not fit into RAW_EVENT_MAX_LEN.
    pub fn encode<T: plain::Plain>(event_type: u32, payload: &T, tail: &[u8]) -> Option<Self> {
        let payload_len = size_of::<T>() + tail.len();
        if HEADER_SIZE + payload_len > RAW_EVENT_MAX_LEN {
            return None;
        }

        let header = EventHeader {
            event_type,
            payload_len: payload_len as u32,
        };

        let mut record = Self::default();
        // Safe because the header and all payload structs are POD
        // without padding (see the size asserts above).
        unsafe {
            record.push(plain::as_bytes(&header));
            record.push(plain::as_bytes(payload));
        }
        record.push(tail);

        Some(record)
    }

    /// A record consisting of a header only.
    pub fn empty(event_type: u32) -> Self {
        // A header always fits.
        Self::encode(event_type, &NoPayload {}, &[]).unwrap_or_default()
    }

    fn push(&mut self, bytes: &[u8]) {
        self.bytes[self.len..(self.len + bytes.len())].copy_from_slice(bytes);
        self.len += bytes.len();
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn header(&self) -> Option<EventHeader> {
        self.read_at::<EventHeader>(0)
    }

    pub fn event_type(&self) -> Option<u32> {
        self.header().map(|h| h.event_type)
    }

    /// The payload bytes (payload struct and tail), as bounded by both
    /// payload_len and the record length.
    pub fn payload_bytes(&self) -> &[u8] {
        let Some(header) = self.header() else {
            return &[];
        };
        let end = core::cmp::min(self.len, HEADER_SIZE + header.payload_len as usize);
        &self.bytes[HEADER_SIZE..end]
    }

    /// Copies a POD value out of the record; the record buffer is not
    /// necessarily aligned for T.
    pub fn read_at<T: plain::Plain + Default>(&self, offset: usize) -> Option<T> {
        let end = offset.checked_add(size_of::<T>())?;
        if end > self.len {
            return None;
        }

        let mut val = T::default();
        plain::copy_from_bytes(&mut val, &self.bytes[offset..end]).ok()?;
        Some(val)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_lays_out_header_payload_tail() {
        let payload = SocketPayload {
            handle: 5,
            waiting_for: 1,
            status: 0,
            reserved: 0,
            extra: 0x1122_3344_5566_7788,
        };
        let record = RawEventRecord::encode(EVENT_SOCKET, &payload, &[9, 8, 7]).unwrap();

        assert_eq!(HEADER_SIZE + 24 + 3, record.len());
        let header = record.header().unwrap();
        assert_eq!(EVENT_SOCKET, header.event_type);
        assert_eq!(27, header.payload_len);

        let bytes = record.as_bytes();
        assert_eq!(&5_i32.to_ne_bytes(), &bytes[8..12]);
        assert_eq!(&[9, 8, 7], &bytes[32..35]);

        let back = record.read_at::<SocketPayload>(HEADER_SIZE).unwrap();
        assert_eq!(0x1122_3344_5566_7788, back.extra);
    }

    #[test]
    fn oversized_records_are_rejected() {
        let tail = [0_u8; RAW_EVENT_MAX_LEN];
        assert!(RawEventRecord::encode(EVENT_SOCKET, &SocketPayload::default(), &tail).is_none());
        assert!(RawEventRecord::from_bytes(&tail).is_some());
        assert!(RawEventRecord::from_bytes(&[0; RAW_EVENT_MAX_LEN + 1]).is_none());
    }

    #[test]
    fn short_records_have_no_header() {
        let record = RawEventRecord::from_bytes(&[1, 0, 0]).unwrap();
        assert!(record.header().is_none());
        assert!(record.payload_bytes().is_empty());
    }

    #[test]
    fn payload_is_bounded_by_record_length() {
        let mut bytes = RawEventRecord::empty(EVENT_PUSH).as_bytes().to_vec();
        // Claim a 100-byte payload but supply 4 bytes.
        bytes[4..8].copy_from_slice(&100_u32.to_ne_bytes());
        bytes.extend_from_slice(&[1, 2, 3, 4]);
        let record = RawEventRecord::from_bytes(&bytes).unwrap();
        assert_eq!(&[1, 2, 3, 4], record.payload_bytes());
    }
}
