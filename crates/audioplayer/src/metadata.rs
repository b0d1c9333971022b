//! Tag extraction into [`TrackMetadata`].
//!
//! Tags arrive over several bus messages. Each one is merged into the pending
//! metadata; a known average bitrate marks the set as complete.

use audioplayer_types::{TrackMetadata, TrackNumber};

use crate::backend::TagValue;

/// Merge recognised tags into `metadata`. Unknown names and mistyped values
/// are skipped.
pub fn merge_tags(metadata: &mut TrackMetadata, tags: &[(String, TagValue)]) {
    for (name, value) in tags {
        match (name.as_str(), value) {
            ("artist", TagValue::Text(text)) => metadata.artist = Some(text.clone()),
            ("album-artist", TagValue::Text(text)) => {
                metadata.artist.get_or_insert_with(|| text.clone());
            }
            ("album", TagValue::Text(text)) => metadata.album = Some(text.clone()),
            ("title", TagValue::Text(text)) => metadata.title = Some(text.clone()),
            ("genre", TagValue::Text(text)) => metadata.genre = Some(text.clone()),
            ("track-number", value) => {
                if let Some(track) = track_number(value) {
                    metadata.track = Some(track);
                }
            }
            ("datetime" | "date", TagValue::Date { year }) => metadata.year = Some(*year),
            ("channel-mode", TagValue::Text(text)) => metadata.channels = Some(text.clone()),
            ("minimum-bitrate", TagValue::UInt(rate)) => metadata.bitrate_min = Some(*rate),
            ("maximum-bitrate", TagValue::UInt(rate)) => metadata.bitrate_max = Some(*rate),
            ("bitrate", TagValue::UInt(rate)) => metadata.bitrate_avg = Some(*rate),
            _ => {}
        }
    }
}

fn track_number(value: &TagValue) -> Option<TrackNumber> {
    match value {
        TagValue::UInt(n) => Some(TrackNumber::Number(*n)),
        TagValue::Text(text) => Some(match text.trim().parse::<u32>() {
            Ok(n) => TrackNumber::Number(n),
            Err(_) => TrackNumber::Text(text.clone()),
        }),
        TagValue::Date { .. } => None,
    }
}

/// Metadata is published once the average bitrate is known.
pub fn is_complete(metadata: &TrackMetadata) -> bool {
    metadata.bitrate_avg.is_some()
}
