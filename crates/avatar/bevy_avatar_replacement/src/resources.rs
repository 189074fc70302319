//! World resources shared by the replacement systems.

use bevy::prelude::*;

use avatar_replacement_core::{
    CharacterId, ControllerState, HostSnapshot, NodeId, ReplacementController, ReplacementEvent,
    Scene, ViewStateRegistry,
};

/// The arena every controller edits; mirrored into entities each frame.
#[derive(Resource, Default)]
pub struct ReplacementScene(pub Scene);

/// Registry of replaced bodies, shared with gameplay code that hides or shows them.
#[derive(Resource, Default)]
pub struct ReplacementViewState(pub ViewStateRegistry);

/// Events from this frame's ticks, initializations and teardowns.
#[derive(Resource, Default)]
pub struct PendingReplacementEvents {
    pub events: Vec<ReplacementEvent>,
}

pub struct RosterEntry {
    pub controller: ReplacementController,
    /// Host state for the next tick. Gameplay code refreshes it every frame.
    pub host: HostSnapshot,
    retired: bool,
}

/// One controller per replaced character.
#[derive(Resource, Default)]
pub struct ReplacementRoster {
    entries: Vec<RosterEntry>,
}

impl ReplacementRoster {
    /// Queue a controller; it initializes on the next frame. A character that
    /// already has an entry keeps the old one.
    pub fn register(&mut self, controller: ReplacementController, host: HostSnapshot) -> bool {
        if self.get(host.character).is_some() {
            log::warn!("{} already has a body replacement", host.username);
            return false;
        }
        self.entries.push(RosterEntry {
            controller,
            host,
            retired: false,
        });
        true
    }

    /// Mark the character's controller for teardown on the next frame.
    pub fn retire(&mut self, character: CharacterId) -> bool {
        match self.get_mut(character) {
            Some(entry) => {
                entry.retired = true;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, character: CharacterId) -> Option<&RosterEntry> {
        self.entries.iter().find(|e| e.host.character == character)
    }

    pub fn get_mut(&mut self, character: CharacterId) -> Option<&mut RosterEntry> {
        self.entries
            .iter_mut()
            .find(|e| e.host.character == character)
    }

    pub fn host_mut(&mut self, character: CharacterId) -> Option<&mut HostSnapshot> {
        self.get_mut(character).map(|e| &mut e.host)
    }

    pub fn state(&self, character: CharacterId) -> Option<ControllerState> {
        self.get(character).map(|e| e.controller.state())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RosterEntry> {
        self.entries.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut RosterEntry> {
        self.entries.iter_mut()
    }

    /// Remove and return every retired entry.
    pub(crate) fn drain_retired(&mut self) -> Vec<RosterEntry> {
        let (retired, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|e| e.retired);
        self.entries = kept;
        retired
    }

    /// Scene roots owned by controllers (model, view model, ragdoll).
    pub fn owned_roots(&self) -> Vec<(CharacterId, NodeId)> {
        let mut roots = Vec::new();
        for entry in &self.entries {
            let ctl = &entry.controller;
            for root in [ctl.model(), ctl.view_model(), ctl.ragdoll()]
                .into_iter()
                .flatten()
            {
                roots.push((entry.host.character, root));
            }
        }
        roots
    }
}
