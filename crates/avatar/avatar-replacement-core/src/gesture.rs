//! Gesture inference.
//!
//! The host never announces that a gesture changed; it only exposes a
//! "performing" flag and the hash of the state on the gesture animator layer.
//! [`classify`] turns those into a [`GestureId`] each tick and
//! [`GestureTracker`] turns the id stream into start/end events.
//!
//! Entering a gesture from idle is not reported immediately. Animators take a
//! few frames to settle, so a watchdog waits `settle_frames` ticks and only
//! reports the start if the id is still non-idle by then. Returning to idle
//! before that drops the pending start; the end is still reported.

use serde::{Deserialize, Serialize};

use crate::config::GestureHashes;

/// 0 is idle, 1 and 2 are the recognized gestures, 3 is any other gesture.
/// External resolvers may produce other values.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct GestureId(pub i32);

impl GestureId {
    pub const IDLE: GestureId = GestureId(0);
    pub const PRIMARY: GestureId = GestureId(1);
    pub const SECONDARY: GestureId = GestureId(2);
    pub const OTHER: GestureId = GestureId(3);

    #[inline]
    pub fn is_idle(self) -> bool {
        self == Self::IDLE
    }
}

/// Resolve the gesture id from raw host state.
pub fn classify(performing: bool, layer_hash: i32, hashes: &GestureHashes) -> GestureId {
    if !performing {
        GestureId::IDLE
    } else if layer_hash == hashes.primary {
        GestureId::PRIMARY
    } else if layer_hash == hashes.secondary {
        GestureId::SECONDARY
    } else {
        GestureId::OTHER
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GestureEvent {
    Started(GestureId),
    Ended,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Watchdog {
    frames: u32,
}

/// Per-controller gesture state machine. Step it exactly once per tick.
#[derive(Clone, Debug)]
pub struct GestureTracker {
    current: GestureId,
    previous: GestureId,
    watchdog: Option<Watchdog>,
    settle_frames: u32,
}

impl GestureTracker {
    pub fn new(settle_frames: u32) -> Self {
        Self {
            current: GestureId::IDLE,
            previous: GestureId::IDLE,
            watchdog: None,
            settle_frames,
        }
    }

    pub fn current(&self) -> GestureId {
        self.current
    }

    pub fn previous(&self) -> GestureId {
        self.previous
    }

    /// True while a start is waiting for the animator to settle.
    pub fn is_settling(&self) -> bool {
        self.watchdog.is_some()
    }

    /// Feed this tick's resolved id; returns the event to fire, if any.
    pub fn step(&mut self, resolved: GestureId) -> Option<GestureEvent> {
        self.previous = self.current;
        self.current = resolved;

        let mut event = None;
        if self.current != self.previous {
            if self.previous.is_idle() {
                // Only one watchdog at a time; a pending one owns resolution.
                if self.watchdog.is_none() {
                    self.watchdog = Some(Watchdog { frames: 0 });
                }
            } else if self.current.is_idle() {
                event = Some(GestureEvent::Ended);
            } else if self.watchdog.is_none() {
                event = Some(GestureEvent::Started(self.current));
            }
        }

        if let Some(mut dog) = self.watchdog.take() {
            if self.current.is_idle() {
                return event;
            }
            if dog.frames >= self.settle_frames {
                return Some(GestureEvent::Started(self.current));
            }
            dog.frames += 1;
            self.watchdog = Some(dog);
        }
        event
    }
}
