use vm_events::SignalClass;

use crate::registry::ThreadId;

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("no thread waits for {class:?} on descriptor {descriptor}")]
    NoWaiter { class: SignalClass, descriptor: i32 },

    #[error("thread {thread}: out of memory for a {len}-byte result")]
    ResourceExhaustion { thread: ThreadId, len: usize },

    #[error("bad config: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}
