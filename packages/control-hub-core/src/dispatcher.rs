//! Resolves parsed actions into player control calls.
//!
//! Planning reads the mirror (to resolve `toggle_play` and validate item ids)
//! and runs under the mirror lock. Execution calls into the player and runs
//! after the lock is released, since the player may answer synchronously with
//! notifications that need the same lock.

use crate::actions::Action;
use crate::player::{PlayerController, PlayerState, ProgressionMode};
use crate::state::MirrorState;

/// A concrete, validated call into the player.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlCall {
    Play,
    Pause,
    Stop,
    Seek(f64),
    SetSpeed(f64),
    SetVolume(f64),
    SetMute(bool),
    SetProgression(ProgressionMode),
    Append { uri: String },
    InsertAfter { uri: String, after_id: u32 },
    Select { id: u32 },
    Remove { id: u32 },
    Clear,
}

impl ControlCall {
    pub fn execute(self, controller: &dyn PlayerController) {
        match self {
            Self::Play => controller.play(),
            Self::Pause => controller.pause(),
            Self::Stop => controller.stop(),
            Self::Seek(position) => controller.seek(position),
            Self::SetSpeed(speed) => controller.set_speed(speed),
            Self::SetVolume(volume) => controller.set_volume(volume),
            Self::SetMute(mute) => controller.set_mute(mute),
            Self::SetProgression(mode) => controller.set_queue_progression(mode),
            Self::Append { uri } => controller.queue_append(&uri),
            Self::InsertAfter { uri, after_id } => controller.queue_insert_after(&uri, after_id),
            Self::Select { id } => controller.queue_select(id),
            Self::Remove { id } => controller.queue_remove(id),
            Self::Clear => controller.queue_clear(),
        }
    }
}

/// Maps an action onto a control call, or `None` when it has no effect.
pub fn plan(action: Action, mirror: &MirrorState, queue_controllable: bool) -> Option<ControlCall> {
    if action.is_queue_action() && !queue_controllable {
        log::debug!("[Hub] Queue not controllable, ignoring {:?}", action);
        return None;
    }

    let known = |id: u32| {
        let found = mirror.find_item(id).is_some();
        if !found {
            log::debug!("[Hub] No queue item with id {}, ignoring", id);
        }
        found
    };

    match action {
        Action::TogglePlay => match mirror.state() {
            PlayerState::Stopped | PlayerState::Paused => Some(ControlCall::Play),
            PlayerState::Playing => Some(ControlCall::Pause),
            PlayerState::Buffering => None,
        },
        Action::Play => Some(ControlCall::Play),
        Action::Pause => Some(ControlCall::Pause),
        Action::Stop => Some(ControlCall::Stop),
        Action::Seek(position) => Some(ControlCall::Seek(position)),
        Action::SetSpeed(speed) => Some(ControlCall::SetSpeed(speed)),
        Action::SetVolume(volume) => Some(ControlCall::SetVolume(volume)),
        Action::SetMute(mute) => Some(ControlCall::SetMute(mute)),
        Action::SetProgression(mode) => Some(ControlCall::SetProgression(mode)),
        Action::Add { uri } => Some(ControlCall::Append { uri }),
        Action::Insert { uri, after_id } => {
            known(after_id).then_some(ControlCall::InsertAfter { uri, after_id })
        }
        Action::Select { id } => known(id).then_some(ControlCall::Select { id }),
        Action::Remove { id } => known(id).then_some(ControlCall::Remove { id }),
        Action::Clear => Some(ControlCall::Clear),
    }
}
