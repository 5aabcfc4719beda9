//! JSON rendering of hub events and query documents.
//!
//! Numbers are written with a fixed number of decimals (`0.50`, not `0.5`),
//! so values are emitted as raw JSON number tokens instead of going through
//! serde_json's shortest float formatting.

use serde::ser::Error as _;
use serde::{Serialize, Serializer};
use serde_json::value::RawValue;

use super::{HubEvent, ItemInfo, Snapshot};
use crate::error::HubResult;
use crate::protocol_constants::{INVALID_QUEUE_INDEX, LEVEL_PRECISION, TIME_PRECISION};

fn fixed<S: Serializer>(value: f64, precision: usize, serializer: S) -> Result<S::Ok, S::Error> {
    // NaN/inf have no JSON representation.
    let value = if value.is_finite() { value } else { 0.0 };
    RawValue::from_string(format!("{:.*}", precision, value))
        .map_err(S::Error::custom)?
        .serialize(serializer)
}

/// Time values: seconds with 3 decimals.
pub(crate) fn fixed3<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    fixed(*value, TIME_PRECISION, serializer)
}

/// Speed and volume: 2 decimals.
pub(crate) fn fixed2<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    fixed(*value, LEVEL_PRECISION, serializer)
}

/// Queue index with `u32::MAX` standing in for "no item".
pub(crate) fn queue_index<S: Serializer>(
    value: &Option<usize>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let index = value
        .and_then(|i| u32::try_from(i).ok())
        .unwrap_or(INVALID_QUEUE_INDEX);
    serializer.serialize_u32(index)
}

/// Renders an event for broadcast.
pub fn encode_event(event: &HubEvent) -> HubResult<String> {
    Ok(serde_json::to_string(event)?)
}

/// Renders a snapshot, either tagged as a `snapshot` event or bare.
pub fn encode_snapshot(snapshot: &Snapshot, as_event: bool) -> HubResult<String> {
    if as_event {
        encode_event(&HubEvent::Snapshot(snapshot.clone()))
    } else {
        Ok(serde_json::to_string(snapshot)?)
    }
}

pub fn encode_item_info(info: &ItemInfo) -> HubResult<String> {
    Ok(serde_json::to_string(info)?)
}
