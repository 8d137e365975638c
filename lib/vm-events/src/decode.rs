//! Raw event record -> Signal.
use core::mem::size_of;

use crate::class::SignalClass;
use crate::event::{KeyInput, NormalizedEvent};
use crate::raw::*;
use crate::signal::{Decoded, EventResult, Signal};

#[cfg(feature = "chapi")]
use crate::signal::ChapiKind;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("event record too short: {available} bytes")]
    NoHeader { available: usize },

    #[error("event {event_type}: payload needs {needed} bytes, {available} available")]
    Truncated {
        event_type: u32,
        needed: usize,
        available: usize,
    },

    #[error("unknown event type {0}")]
    UnknownEventType(u32),

    #[error("event {event_type}: invalid {field} {value}")]
    InvalidField {
        event_type: u32,
        field: &'static str,
        value: i64,
    },

    #[error("event {event_type}: subsystem not compiled in")]
    Disabled { event_type: u32 },
}

/// Decodes a raw record. Never fails: records that cannot be decoded
/// are logged and become Signal::Unknown.
pub fn decode(record: &RawEventRecord) -> Decoded {
    match try_decode(record) {
        Ok(decoded) => {
            log::trace!("decoded {:?}", decoded.signal);
            decoded
        }
        Err(DecodeError::Disabled { event_type }) => {
            log::debug!("dropping event {event_type}: subsystem not compiled in");
            Decoded::unknown(Some(event_type))
        }
        Err(err) => {
            log::error!("{}:{} unknown event: {err}", file!(), line!());
            Decoded::unknown(record.event_type())
        }
    }
}

pub fn try_decode(record: &RawEventRecord) -> Result<Decoded, DecodeError> {
    let Some(header) = record.header() else {
        return Err(DecodeError::NoHeader {
            available: record.len(),
        });
    };
    let event_type = header.event_type;
    let reader = PayloadReader {
        event_type,
        bytes: record.payload_bytes(),
    };

    let decoded = match event_type {
        EVENT_KEY => {
            let key = reader.read::<KeyPayload>()?;
            let input = if key.action == KEY_TYPED {
                let Some(ch) = char::from_u32(key.key as u32) else {
                    return Err(reader.invalid("key", key.key as i64));
                };
                KeyInput::Typed(ch.to_string())
            } else {
                KeyInput::Code(key.key)
            };
            Decoded::with_event(
                Signal::Key,
                NormalizedEvent::Key {
                    action: key.action,
                    input,
                },
            )
        }
        EVENT_PEN => {
            let pen = reader.read::<PenPayload>()?;
            Decoded::with_event(
                Signal::Pen,
                NormalizedEvent::Pen {
                    action: pen.action,
                    x: pen.x,
                    y: pen.y,
                },
            )
        }
        EVENT_SOCKET => {
            let socket = reader.read::<SocketPayload>()?;
            let wait_kind = match SignalClass::try_from(socket.waiting_for) {
                Ok(class) if class.is_socket() => class,
                _ => return Err(reader.invalid("waiting_for", socket.waiting_for as i64)),
            };
            let tail = reader.tail::<SocketPayload>();
            let result = if tail.is_empty() {
                EventResult::Handle(socket.extra)
            } else {
                EventResult::Bytes(tail.to_vec())
            };
            Decoded::signal(Signal::SocketReady {
                descriptor: socket.handle,
                wait_kind,
                status: socket.status,
                result,
            })
        }
        EVENT_NETWORK => {
            let network = reader.read::<NetworkPayload>()?;
            Decoded::signal(Signal::NetworkInit {
                status: network.net_type.into(),
            })
        }
        EVENT_END => Decoded::with_event(Signal::Shutdown, NormalizedEvent::Shutdown),
        EVENT_PAUSE => Decoded::with_event(Signal::PauseAll, NormalizedEvent::PauseAll),
        EVENT_RESUME => Decoded::with_event(Signal::ResumeAll, NormalizedEvent::ActivateAll),
        EVENT_PUSH => {
            let push = reader.read::<PushPayload>()?;
            Decoded::signal(Signal::PushAlarm {
                descriptor: push.alarm_handle,
            })
        }
        EVENT_ROTATION => Decoded::with_event(Signal::Rotation, NormalizedEvent::Rotation),

        #[cfg(feature = "on-device-debug")]
        EVENT_ENABLE_ODD => Decoded::with_event(
            Signal::EnableOnDeviceDebug,
            NormalizedEvent::EnableOnDeviceDebug,
        ),

        #[cfg(feature = "file-connection")]
        EVENT_FC_ROOT_CHANGED => Decoded::signal(Signal::DisksChanged),

        #[cfg(feature = "wma")]
        EVENT_SMS_INCOMING | EVENT_CBS_INCOMING | EVENT_MMS_INCOMING => {
            let incoming = reader.read::<WmaIncomingPayload>()?;
            let class = match event_type {
                EVENT_SMS_INCOMING => SignalClass::WmaSmsRead,
                EVENT_CBS_INCOMING => SignalClass::WmaCbsRead,
                _ => SignalClass::WmaMmsRead,
            };
            Decoded::signal(Signal::Wma {
                class,
                descriptor: incoming.stub,
                status: crate::status::STATUS_OK,
            })
        }

        #[cfg(feature = "wma")]
        EVENT_SMS_SENDING_RESULT | EVENT_MMS_SENDING_RESULT => {
            let sent = reader.read::<WmaSendingResultPayload>()?;
            let class = if event_type == EVENT_SMS_SENDING_RESULT {
                SignalClass::WmaSmsWrite
            } else {
                SignalClass::WmaMmsWrite
            };
            Decoded::signal(Signal::Wma {
                class,
                descriptor: sent.handle,
                status: sent.result,
            })
        }

        #[cfg(feature = "media")]
        EVENT_MULTIMEDIA => decode_media(&reader)?,

        #[cfg(feature = "amms")]
        EVENT_ADVANCED_MULTIMEDIA => {
            let media = reader.read::<MultimediaPayload>()?;
            log::trace!(
                "advanced media event: owner {} player {} kind {} data {}",
                media.app_id,
                media.player_id,
                media.media_type,
                media.data
            );
            Decoded::with_event(
                Signal::AdvancedMedia,
                NormalizedEvent::AdvancedMedia {
                    owner: media.app_id,
                    player_id: media.player_id,
                    kind: media.media_type,
                    data: media.data,
                },
            )
        }

        #[cfg(feature = "location")]
        EVENT_LOCATION => {
            let location = reader.read::<LocationPayload>()?;
            let class = match SignalClass::try_from(location.event) {
                Ok(
                    class @ (SignalClass::Location
                    | SignalClass::Orientation
                    | SignalClass::Proximity),
                ) => class,
                _ => return Err(reader.invalid("event", location.event as i64)),
            };
            Decoded::signal(Signal::Location {
                class,
                descriptor: location.provider,
                status: location.operation_result,
            })
        }

        #[cfg(feature = "location")]
        EVENT_PROXIMITY => {
            let proximity = reader.read::<ProximityPayload>()?;
            Decoded::signal(Signal::Location {
                class: SignalClass::Proximity,
                descriptor: proximity.provider,
                status: proximity.operation_result,
            })
        }

        #[cfg(feature = "chapi")]
        EVENT_CHAPI_PLATFORM_FINISH | EVENT_CHAPI_JAVA_INVOKE => {
            let chapi = reader.read::<ChapiPayload>()?;
            let kind = if event_type == EVENT_CHAPI_PLATFORM_FINISH {
                ChapiKind::PlatformFinish
            } else {
                ChapiKind::JavaInvoke
            };
            Decoded::with_event(
                Signal::Chapi {
                    kind,
                    invocation: chapi.invocation_id,
                    handle: chapi.event_handle,
                },
                NormalizedEvent::ContentHandler,
            )
        }

        #[cfg(feature = "card-device")]
        EVENT_CARD_DEVICE => {
            use crate::status::*;

            let card = reader.read::<CardDevicePayload>()?;
            let (code, handle) = match card.event_type {
                CARD_DEVICE_RESET => (CARD_SIGNAL_RESET, Some(card.handle as i64)),
                CARD_DEVICE_XFER => (CARD_SIGNAL_XFER, Some(card.handle as i64)),
                CARD_DEVICE_UNLOCK => (CARD_SIGNAL_LOCK, None),
                other => return Err(reader.invalid("card event type", other as i64)),
            };
            Decoded::signal(Signal::CardDevice { code, handle })
        }

        #[cfg(feature = "multi-isolate")]
        EVENT_SWITCH_FOREGROUND | EVENT_SELECT_APP => Decoded::with_event(
            Signal::SelectForeground,
            NormalizedEvent::SelectForeground {
                switch: event_type == EVENT_SWITCH_FOREGROUND,
            },
        ),

        #[cfg(feature = "sensor")]
        EVENT_SENSOR_AVAILABLE => {
            let sensor = reader.read::<SensorAvailablePayload>()?;
            Decoded::with_event(
                Signal::SensorAvailable,
                NormalizedEvent::SensorAvailability {
                    sensor_type: sensor.sensor_type,
                    available: sensor.is_available != 0,
                },
            )
        }

        #[cfg(feature = "sensor")]
        EVENT_SENSOR_OPEN_CLOSE => {
            let sensor = reader.read::<SensorPayload>()?;
            Decoded::signal(Signal::SensorOpenClose {
                descriptor: sensor.sensor,
            })
        }

        // Known, but compiled out.
        #[allow(unreachable_patterns)]
        EVENT_ENABLE_ODD
        | EVENT_FC_ROOT_CHANGED
        | EVENT_SMS_INCOMING
        | EVENT_CBS_INCOMING
        | EVENT_SMS_SENDING_RESULT
        | EVENT_MMS_INCOMING
        | EVENT_MMS_SENDING_RESULT
        | EVENT_MULTIMEDIA
        | EVENT_ADVANCED_MULTIMEDIA
        | EVENT_LOCATION
        | EVENT_PROXIMITY
        | EVENT_CHAPI_PLATFORM_FINISH
        | EVENT_CHAPI_JAVA_INVOKE
        | EVENT_CARD_DEVICE
        | EVENT_SWITCH_FOREGROUND
        | EVENT_SELECT_APP
        | EVENT_SENSOR_AVAILABLE
        | EVENT_SENSOR_OPEN_CLOSE => return Err(DecodeError::Disabled { event_type }),

        other => return Err(DecodeError::UnknownEventType(other)),
    };

    Ok(decoded)
}

#[cfg(feature = "media")]
fn decode_media(reader: &PayloadReader<'_>) -> Result<Decoded, DecodeError> {
    use crate::media::*;
    use crate::signal::MediaSignal;

    let media = reader.read::<MultimediaPayload>()?;
    log::trace!(
        "media event: owner {} player {} type {} data {}",
        media.app_id,
        media.player_id,
        media.media_type,
        media.data
    );

    if !is_queue_notification(media.media_type) {
        let descriptor = PlayerDescriptor::for_event(media.app_id, media.player_id, media.media_type);
        return Ok(Decoded::signal(Signal::Media(MediaSignal::Player {
            descriptor,
            status: media.status,
            data: media.data,
        })));
    }

    // Volume changes concern every player, whoever owns it.
    let owner = if media.media_type == MEDIA_VOLUME_CHANGED {
        OWNER_BROADCAST
    } else {
        media.app_id
    };

    Ok(Decoded::with_event(
        Signal::Media(MediaSignal::Notify),
        NormalizedEvent::Media {
            owner,
            player_id: media.player_id,
            kind: media.media_type,
            status: media.status,
            data: media.data,
        },
    ))
}

struct PayloadReader<'a> {
    event_type: u32,
    bytes: &'a [u8],
}

impl PayloadReader<'_> {
    fn read<T: plain::Plain + Default>(&self) -> Result<T, DecodeError> {
        let needed = size_of::<T>();
        if self.bytes.len() < needed {
            return Err(DecodeError::Truncated {
                event_type: self.event_type,
                needed,
                available: self.bytes.len(),
            });
        }

        let mut val = T::default();
        plain::copy_from_bytes(&mut val, &self.bytes[..needed]).map_err(|_| {
            DecodeError::Truncated {
                event_type: self.event_type,
                needed,
                available: self.bytes.len(),
            }
        })?;
        Ok(val)
    }

    // Bytes following the payload struct T.
    fn tail<T>(&self) -> &[u8] {
        self.bytes.get(size_of::<T>()..).unwrap_or(&[])
    }

    fn invalid(&self, field: &'static str, value: i64) -> DecodeError {
        DecodeError::InvalidField {
            event_type: self.event_type,
            field,
            value,
        }
    }
}
