//! Native platform events for the VM runtime.
//!
//! The platform delivers events as raw binary records (see `raw`). This
//! crate describes those records, the wait classes blocked VM threads
//! wait on, and decodes each record into a `Signal` that the router
//! (vm-router) dispatches to threads or notification sinks.
//!
//! Optional subsystems (media, location, smart cards, sensors, messaging,
//! content handlers, ...) are Cargo features; an event of a subsystem
//! that is compiled out decodes to Signal::Unknown.

pub mod class;
pub mod decode;
pub mod event;
pub mod media;
pub mod raw;
pub mod signal;
pub mod status;

pub use class::{SignalClass, WaitKey};
pub use decode::{decode, try_decode, DecodeError};
pub use event::{KeyInput, NormalizedEvent};
pub use raw::RawEventRecord;
pub use signal::{Decoded, EventResult, Signal};
pub use status::{NetworkTransition, Status};
