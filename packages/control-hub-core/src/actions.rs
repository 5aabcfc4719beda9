//! Text command grammar for inbound WebSocket frames.
//!
//! One command per line, `KEYWORD` or `KEYWORD:PAYLOAD`:
//!
//! ```text
//! toggle_play
//! seek:42.5
//! set_mute:true
//! set_progression:carousel
//! insert:https://example.com/a.mkv,12
//! ```

use thiserror::Error;

use crate::player::ProgressionMode;

/// A parsed remote command.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    TogglePlay,
    Play,
    Pause,
    Stop,
    Seek(f64),
    SetSpeed(f64),
    SetVolume(f64),
    SetMute(bool),
    SetProgression(ProgressionMode),
    Add { uri: String },
    Insert { uri: String, after_id: u32 },
    Select { id: u32 },
    Remove { id: u32 },
    Clear,
}

impl Action {
    /// Whether the action mutates the queue (gated by `queue_controllable`).
    pub fn is_queue_action(&self) -> bool {
        matches!(
            self,
            Self::Add { .. } | Self::Insert { .. } | Self::Select { .. } | Self::Remove { .. } | Self::Clear
        )
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ActionParseError {
    #[error("empty command")]
    Empty,

    #[error("unknown command: {0:?}")]
    UnknownKeyword(String),

    #[error("command {0:?} requires a payload")]
    MissingPayload(&'static str),

    #[error("command {0:?} takes no payload")]
    UnexpectedPayload(&'static str),

    #[error("invalid payload for {keyword:?}: {payload:?}")]
    InvalidPayload {
        keyword: &'static str,
        payload: String,
    },
}

/// Parses a single command line.
pub fn parse_action(text: &str) -> Result<Action, ActionParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ActionParseError::Empty);
    }

    let (keyword, payload) = match text.split_once(':') {
        Some((keyword, payload)) => (keyword.trim(), Some(payload.trim())),
        None => (text, None),
    };

    match keyword {
        "toggle_play" => no_payload("toggle_play", payload, Action::TogglePlay),
        "play" => no_payload("play", payload, Action::Play),
        "pause" => no_payload("pause", payload, Action::Pause),
        "stop" => no_payload("stop", payload, Action::Stop),
        "clear" => no_payload("clear", payload, Action::Clear),
        "seek" => parse_float("seek", payload).map(Action::Seek),
        "set_speed" => parse_float("set_speed", payload).map(Action::SetSpeed),
        "set_volume" => parse_float("set_volume", payload).map(Action::SetVolume),
        "set_mute" => {
            let value = require("set_mute", payload)?;
            match value {
                "true" | "1" => Ok(Action::SetMute(true)),
                "false" | "0" => Ok(Action::SetMute(false)),
                _ => Err(invalid("set_mute", value)),
            }
        }
        "set_progression" => {
            let value = require("set_progression", payload)?;
            value
                .parse::<ProgressionMode>()
                .map(Action::SetProgression)
                .map_err(|()| invalid("set_progression", value))
        }
        "add" => {
            let uri = require("add", payload)?;
            Ok(Action::Add {
                uri: uri.to_string(),
            })
        }
        "insert" => {
            let value = require("insert", payload)?;
            // URIs may contain commas, the id never does.
            let (uri, after_id) = value
                .rsplit_once(',')
                .ok_or_else(|| invalid("insert", value))?;
            let uri = uri.trim();
            if uri.is_empty() {
                return Err(invalid("insert", value));
            }
            let after_id = parse_id("insert", after_id.trim())?;
            Ok(Action::Insert {
                uri: uri.to_string(),
                after_id,
            })
        }
        "select" => {
            let value = require("select", payload)?;
            parse_id("select", value).map(|id| Action::Select { id })
        }
        "remove" => {
            let value = require("remove", payload)?;
            parse_id("remove", value).map(|id| Action::Remove { id })
        }
        other => Err(ActionParseError::UnknownKeyword(other.to_string())),
    }
}

/// Parses every non-blank line of a text frame.
pub fn parse_frame(text: &str) -> impl Iterator<Item = Result<Action, ActionParseError>> + '_ {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(parse_action)
}

fn no_payload(
    keyword: &'static str,
    payload: Option<&str>,
    action: Action,
) -> Result<Action, ActionParseError> {
    match payload {
        None => Ok(action),
        Some(_) => Err(ActionParseError::UnexpectedPayload(keyword)),
    }
}

fn require<'a>(keyword: &'static str, payload: Option<&'a str>) -> Result<&'a str, ActionParseError> {
    match payload {
        Some(p) if !p.is_empty() => Ok(p),
        _ => Err(ActionParseError::MissingPayload(keyword)),
    }
}

fn invalid(keyword: &'static str, payload: &str) -> ActionParseError {
    ActionParseError::InvalidPayload {
        keyword,
        payload: payload.to_string(),
    }
}

fn parse_float(keyword: &'static str, payload: Option<&str>) -> Result<f64, ActionParseError> {
    let value = require(keyword, payload)?;
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(invalid(keyword, value)),
    }
}

fn parse_id(keyword: &'static str, value: &str) -> Result<u32, ActionParseError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(keyword, value));
    }
    value.parse::<u32>().map_err(|_| invalid(keyword, value))
}
