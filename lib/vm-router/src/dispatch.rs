//! Signal -> registry/sink routing.
use vm_events::media::OWNER_BROADCAST;
use vm_events::status::{STATUS_IO_ERROR, STATUS_OK};
use vm_events::{
    Decoded, EventResult, NetworkTransition, NormalizedEvent, Signal, SignalClass, Status,
    WaitKey,
};

use crate::host::Host;
use crate::registry::{self, BlockedThread};
use crate::RouterError;

/// What happened to one event.
#[derive(Debug)]
pub enum Delivery {
    Foreground,
    Ams,
    VmThread { owner: i32 },
    /// This many blocked threads were woken.
    Woken(usize),
    /// Threads blocked in push connections were woken.
    PushWoken(usize),
    /// The protocol layer took the signal.
    Protocol,
    /// The network went down; `woken` threads got an I/O error.
    NetworkDown { woken: usize },
    NetworkShutdownStarted,
    /// A network down request while sockets are still in use.
    Deferred,
    /// Nobody was interested.
    Dropped,
    Failed(RouterError),
}

pub fn dispatch(decoded: Decoded, threads: &mut [BlockedThread], host: &mut Host<'_>) -> Delivery {
    let Decoded { signal, event } = decoded;
    log::trace!("dispatching {signal:?}");

    let delivery = match signal {
        Signal::Key | Signal::Pen | Signal::Rotation => match event {
            Some(event) => {
                host.sinks.notify_foreground(event);
                Delivery::Foreground
            }
            None => missing_event(&signal),
        },

        Signal::Shutdown | Signal::PauseAll | Signal::ResumeAll => to_ams(event, &signal, host),

        Signal::SocketReady {
            descriptor,
            wait_kind,
            status,
            ref result,
        } => match wait_kind {
            SignalClass::NetworkRead => socket_read(descriptor, status, result, threads, host),
            SignalClass::NetworkException => {
                let read = registry::unblock_one(
                    threads,
                    WaitKey::new(SignalClass::NetworkRead, descriptor),
                    status,
                    host.resumer,
                );
                let write = registry::unblock_one(
                    threads,
                    WaitKey::new(SignalClass::NetworkWrite, descriptor),
                    status,
                    host.resumer,
                );
                return woken(
                    read as usize + write as usize,
                    WaitKey::new(SignalClass::NetworkException, descriptor),
                );
            }
            _ => socket_write(wait_kind, descriptor, status, result, threads, host),
        },

        Signal::NetworkInit { status } => network_init(status, threads, host),

        Signal::PushAlarm { descriptor } => {
            if host.push.find_push_timer_blocked_handle(descriptor) {
                wake_push(threads, host)
            } else {
                no_waiter(WaitKey::new(SignalClass::PushAlarm, descriptor))
            }
        }

        #[cfg(feature = "multi-isolate")]
        Signal::SelectForeground => to_ams(event, &signal, host),

        #[cfg(feature = "on-device-debug")]
        Signal::EnableOnDeviceDebug => to_ams(event, &signal, host),

        #[cfg(feature = "file-connection")]
        Signal::DisksChanged => {
            host.protocols.notify_disks_changed();
            Delivery::Protocol
        }

        #[cfg(feature = "wma")]
        Signal::Wma {
            class,
            descriptor,
            status,
        } => {
            if host.protocols.check_signal(class, descriptor, status) {
                Delivery::Protocol
            } else {
                no_waiter(WaitKey::new(class, descriptor))
            }
        }

        #[cfg(feature = "media")]
        Signal::Media(vm_events::signal::MediaSignal::Player {
            descriptor,
            status,
            data,
        }) => wake_one_with_result(
            WaitKey::new(SignalClass::MediaEvent, descriptor.as_i32()),
            status,
            &EventResult::Handle(data),
            threads,
            host,
        ),

        #[cfg(feature = "media")]
        Signal::Media(vm_events::signal::MediaSignal::Notify) => {
            to_vm_thread(event, &signal, host)
        }

        #[cfg(feature = "amms")]
        Signal::AdvancedMedia => to_vm_thread(event, &signal, host),

        #[cfg(feature = "location")]
        Signal::Location {
            class,
            descriptor,
            status,
        } => {
            let key = WaitKey::new(class, descriptor);
            woken(registry::unblock_all(threads, key, status, host.resumer), key)
        }

        #[cfg(feature = "chapi")]
        Signal::Chapi {
            kind,
            invocation,
            handle,
        } => {
            host.protocols.process_chapi(kind, invocation, handle);
            to_ams(event, &signal, host)
        }

        #[cfg(feature = "card-device")]
        Signal::CardDevice { code, handle } => {
            let key = WaitKey::new(SignalClass::CardReaderData, code);
            let result = handle.map_or(EventResult::None, EventResult::Handle);
            match registry::unblock_all_with_result(threads, key, code, &result, host.resumer) {
                Ok(n) => woken(n, key),
                Err(err) => failed(err),
            }
        }

        #[cfg(feature = "sensor")]
        Signal::SensorAvailable => to_vm_thread(event, &signal, host),

        #[cfg(feature = "sensor")]
        Signal::SensorOpenClose { descriptor } => {
            let key = WaitKey::new(SignalClass::Sensor, descriptor);
            woken(
                registry::unblock_all(threads, key, STATUS_OK, host.resumer),
                key,
            )
        }

        Signal::Unknown { event_type } => {
            log::debug!("dropping unknown event {event_type:?}");
            Delivery::Dropped
        }
    };

    log::trace!("delivered: {delivery:?}");
    delivery
}

fn socket_read(
    descriptor: i32,
    status: Status,
    result: &EventResult,
    threads: &mut [BlockedThread],
    host: &mut Host<'_>,
) -> Delivery {
    let key = WaitKey::new(SignalClass::NetworkRead, descriptor);
    match registry::unblock_one_with_result(threads, key, status, result, host.resumer) {
        Ok(_) => return Delivery::Woken(1),
        Err(RouterError::NoWaiter { .. }) => {}
        Err(err) => return failed(err),
    }

    // Data arrived on a push connection nobody reads yet.
    if host.push.find_push_blocked_handle(descriptor) {
        return wake_push(threads, host);
    }

    if host
        .protocols
        .check_signal(SignalClass::NetworkRead, descriptor, status)
    {
        return Delivery::Protocol;
    }

    no_waiter(key)
}

// Write and host lookup ask the protocol layer before the registry.
fn socket_write(
    wait_kind: SignalClass,
    descriptor: i32,
    status: Status,
    result: &EventResult,
    threads: &mut [BlockedThread],
    host: &mut Host<'_>,
) -> Delivery {
    if host.protocols.check_signal(wait_kind, descriptor, status) {
        return Delivery::Protocol;
    }

    wake_one_with_result(
        WaitKey::new(wait_kind, descriptor),
        status,
        result,
        threads,
        host,
    )
}

fn network_init(
    transition: NetworkTransition,
    threads: &mut [BlockedThread],
    host: &mut Host<'_>,
) -> Delivery {
    match transition {
        NetworkTransition::Up => {
            log::info!("network up");
            host.network.set_connected();
            let key = WaitKey::new(SignalClass::NetworkInit, 0);
            woken(
                registry::unblock_all(threads, key, STATUS_OK, host.resumer),
                key,
            )
        }
        NetworkTransition::Down => {
            log::info!("network down");
            let mut woken_count = 0;
            for class in SignalClass::NETWORK {
                woken_count += registry::unblock_class(threads, class, STATUS_IO_ERROR, host.resumer);
            }
            if host.network.is_connected() {
                host.network.clear_connected();
            }
            Delivery::NetworkDown { woken: woken_count }
        }
        NetworkTransition::DownRequest => {
            let in_use = host.network.sockets_in_use();
            if host.network.is_connected() && in_use == 0 {
                log::info!("network down requested: shutting down");
                host.network.begin_network_shutdown();
                host.network.clear_connected();
                Delivery::NetworkShutdownStarted
            } else {
                log::warn!(
                    "network down request deferred: connected: {}, sockets in use: {}",
                    host.network.is_connected(),
                    in_use
                );
                Delivery::Deferred
            }
        }
        NetworkTransition::Other(status) => {
            log::warn!("unexpected network status {status}");
            Delivery::Dropped
        }
    }
}

fn wake_push(threads: &mut [BlockedThread], host: &mut Host<'_>) -> Delivery {
    let key = WaitKey::new(SignalClass::Push, 0);
    Delivery::PushWoken(registry::unblock_all(threads, key, STATUS_OK, host.resumer))
}

fn wake_one_with_result(
    key: WaitKey,
    status: Status,
    result: &EventResult,
    threads: &mut [BlockedThread],
    host: &mut Host<'_>,
) -> Delivery {
    match registry::unblock_one_with_result(threads, key, status, result, host.resumer) {
        Ok(_) => Delivery::Woken(1),
        Err(RouterError::NoWaiter { .. }) => no_waiter(key),
        Err(err) => failed(err),
    }
}

fn to_ams(event: Option<NormalizedEvent>, signal: &Signal, host: &mut Host<'_>) -> Delivery {
    let Some(event) = event else {
        return missing_event(signal);
    };
    host.sinks.notify_ams(event);
    Delivery::Ams
}

#[allow(unused)]
fn to_vm_thread(event: Option<NormalizedEvent>, signal: &Signal, host: &mut Host<'_>) -> Delivery {
    let Some(event) = event else {
        return missing_event(signal);
    };
    let owner = event.owner().unwrap_or(OWNER_BROADCAST);
    host.sinks.notify_vm_thread(event, owner);
    Delivery::VmThread { owner }
}

fn woken(count: usize, key: WaitKey) -> Delivery {
    if count == 0 {
        return no_waiter(key);
    }
    Delivery::Woken(count)
}

fn no_waiter(key: WaitKey) -> Delivery {
    log::debug!(
        "no thread waits for {:?} on {}: dropping",
        key.class,
        key.descriptor
    );
    Delivery::Dropped
}

fn missing_event(signal: &Signal) -> Delivery {
    log::error!("{}:{} {signal:?} without an event", file!(), line!());
    Delivery::Dropped
}

fn failed(err: RouterError) -> Delivery {
    log::error!("{}:{} {err}", file!(), line!());
    Delivery::Failed(err)
}
