//! Media player descriptors.
//!
//! A thread waiting on a media player operation waits on a descriptor that
//! packs the owner (isolate/app) id, the player id and the event kind:
//!
//! ```text
//!  31      26 25        16 15               0
//! +----------+------------+------------------+
//! |   kind   |   owner    |      player      |
//! |  6 bits  |  10 bits   |     16 bits      |
//! +----------+------------+------------------+
//! ```
//!
//! Fields are masked to their widths; callers must keep them in range,
//! otherwise distinct triples collide.

/// Media event types below this marker are notifications for the VM
/// event queue; the marker and above are completions of player
/// operations that some thread waits for.
pub const MEDIA_JAVA_EVENTS_MARKER: i32 = 100;

pub const MEDIA_END_OF_MEDIA: i32 = 1;
pub const MEDIA_DURATION_UPDATED: i32 = 2;
pub const MEDIA_RECORD_SIZE_LIMIT: i32 = 3;
pub const MEDIA_RECORD_ERROR: i32 = 4;
pub const MEDIA_BUFFERING_STARTED: i32 = 5;
pub const MEDIA_BUFFERING_STOPPED: i32 = 6;
pub const MEDIA_VOLUME_CHANGED: i32 = 7;
pub const MEDIA_ERROR: i32 = 8;

/// The owner id meaning "all owners".
pub const OWNER_BROADCAST: i32 = -1;

const KIND_BITS: u32 = 6;
const OWNER_BITS: u32 = 10;
const PLAYER_BITS: u32 = 16;

const KIND_SHIFT: u32 = OWNER_BITS + PLAYER_BITS;
const OWNER_SHIFT: u32 = PLAYER_BITS;

const KIND_MASK: u32 = (1 << KIND_BITS) - 1;
const OWNER_MASK: u32 = (1 << OWNER_BITS) - 1;
const PLAYER_MASK: u32 = (1 << PLAYER_BITS) - 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PlayerDescriptor(i32);

impl PlayerDescriptor {
    pub const MAX_OWNER: i32 = OWNER_MASK as i32;
    pub const MAX_PLAYER: i32 = PLAYER_MASK as i32;
    pub const MAX_KIND: i32 = KIND_MASK as i32;

    /// `kind` is relative to MEDIA_JAVA_EVENTS_MARKER.
    pub const fn pack(owner: i32, player: i32, kind: i32) -> Self {
        let packed = (((kind as u32) & KIND_MASK) << KIND_SHIFT)
            | (((owner as u32) & OWNER_MASK) << OWNER_SHIFT)
            | ((player as u32) & PLAYER_MASK);
        Self(packed as i32)
    }

    /// Builds the descriptor from an absolute media event type.
    pub const fn for_event(owner: i32, player: i32, media_type: i32) -> Self {
        Self::pack(owner, player, media_type - MEDIA_JAVA_EVENTS_MARKER)
    }

    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    pub const fn as_i32(self) -> i32 {
        self.0
    }

    pub const fn owner(self) -> i32 {
        (((self.0 as u32) >> OWNER_SHIFT) & OWNER_MASK) as i32
    }

    pub const fn player(self) -> i32 {
        ((self.0 as u32) & PLAYER_MASK) as i32
    }

    pub const fn kind(self) -> i32 {
        (((self.0 as u32) >> KIND_SHIFT) & KIND_MASK) as i32
    }

    pub const fn unpack(self) -> (i32, i32, i32) {
        (self.owner(), self.player(), self.kind())
    }
}

/// True if a media event of this type goes to the VM event queue rather
/// than to a waiting thread.
pub fn is_queue_notification(media_type: i32) -> bool {
    media_type > 0 && media_type < MEDIA_JAVA_EVENTS_MARKER
}

#[test]
fn pack_unpack() {
    let desc = PlayerDescriptor::pack(3, 7, 2);
    assert_eq!((3, 7, 2), desc.unpack());
    assert_eq!(desc, PlayerDescriptor::from_raw(desc.as_i32()));

    let desc = PlayerDescriptor::pack(
        PlayerDescriptor::MAX_OWNER,
        PlayerDescriptor::MAX_PLAYER,
        PlayerDescriptor::MAX_KIND,
    );
    assert_eq!(-1, desc.as_i32());
    assert_eq!(
        (
            PlayerDescriptor::MAX_OWNER,
            PlayerDescriptor::MAX_PLAYER,
            PlayerDescriptor::MAX_KIND
        ),
        desc.unpack()
    );
}

#[test]
fn for_event_is_relative_to_marker() {
    let desc = PlayerDescriptor::for_event(1, 2, MEDIA_JAVA_EVENTS_MARKER + 5);
    assert_eq!((1, 2, 5), desc.unpack());
}

#[test]
fn random_in_range_triples_are_unique() {
    use rand::Rng;
    use std::collections::HashMap;

    let mut rng = rand::thread_rng();
    let mut seen = HashMap::new();
    for _ in 0..10_000 {
        let owner = rng.gen_range(0..=PlayerDescriptor::MAX_OWNER);
        let player = rng.gen_range(0..=PlayerDescriptor::MAX_PLAYER);
        let kind = rng.gen_range(0..=PlayerDescriptor::MAX_KIND);

        let desc = PlayerDescriptor::pack(owner, player, kind);
        assert_eq!((owner, player, kind), desc.unpack());
        if let Some(prev) = seen.insert(desc, (owner, player, kind)) {
            assert_eq!(prev, (owner, player, kind));
        }
    }
}

#[test]
fn queue_notification_range() {
    assert!(!is_queue_notification(0));
    assert!(is_queue_notification(MEDIA_VOLUME_CHANGED));
    assert!(is_queue_notification(MEDIA_JAVA_EVENTS_MARKER - 1));
    assert!(!is_queue_notification(MEDIA_JAVA_EVENTS_MARKER));
    assert!(!is_queue_notification(-3));
}
