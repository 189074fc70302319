//! Lifecycle hooks fired by the controller.
//!
//! Every method has an observational default that only logs. Override the ones
//! a downstream feature (sound, VFX, ...) cares about.

use log::info;

use crate::gesture::GestureId;
use crate::ids::CharacterId;

/// Identity of the character a hook fires for.
#[derive(Clone, Copy, Debug)]
pub struct HookContext<'a> {
    pub character: CharacterId,
    pub username: &'a str,
}

pub trait ReplacementHooks: Send + Sync {
    fn on_hit_enemy(&mut self, ctx: &HookContext<'_>, dead: bool) {
        info!("player hit enemy {} (dead: {dead})", ctx.username);
    }

    fn on_hit_ally(&mut self, ctx: &HookContext<'_>, ally: CharacterId, dead: bool) {
        info!("player hit ally {} -> {:?} (dead: {dead})", ctx.username, ally);
    }

    fn on_damage_taken(&mut self, ctx: &HookContext<'_>, dead: bool) {
        info!("player took damage {} (dead: {dead})", ctx.username);
    }

    fn on_damage_taken_by_ally(&mut self, ctx: &HookContext<'_>, ally: CharacterId, dead: bool) {
        info!(
            "player took damage from ally {} <- {:?} (dead: {dead})",
            ctx.username, ally
        );
    }

    fn on_death(&mut self, ctx: &HookContext<'_>) {
        info!("player death {}", ctx.username);
    }

    fn on_gesture_start(&mut self, ctx: &HookContext<'_>, gesture: GestureId) {
        info!("player gesture start {} id {}", ctx.username, gesture.0);
    }

    fn on_gesture_end(&mut self, ctx: &HookContext<'_>) {
        info!("player gesture end {}", ctx.username);
    }
}

/// Hooks that keep every default.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingHooks;

impl ReplacementHooks for LoggingHooks {}
