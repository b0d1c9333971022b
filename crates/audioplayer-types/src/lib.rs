use serde::{Deserialize, Serialize};

/// Observable playback state of a player.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    /// No chain is running (includes players that were never started).
    #[default]
    Stopped,
    /// Chain exists but output is halted.
    Paused,
    /// Chain is rendering audio.
    Playing,
}

impl PlaybackState {
    /// Lowercase label used in logs and outbound payloads.
    pub fn label(self) -> &'static str {
        match self {
            PlaybackState::Stopped => "stopped",
            PlaybackState::Paused => "paused",
            PlaybackState::Playing => "playing",
        }
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One playlist entry.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Track {
    /// Filesystem path or http(s) URL.
    pub resource: String,
    /// MIME type (for example `audio/mpeg`). File tracks may leave this empty
    /// until their first load.
    pub audio_format: Option<String>,
}

impl Track {
    pub fn new(resource: impl Into<String>, audio_format: Option<String>) -> Self {
        Self {
            resource: resource.into(),
            audio_format,
        }
    }
}

/// Tag metadata gathered from the stream of the current track.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackMetadata {
    /// Track or album artist.
    pub artist: Option<String>,
    pub album: Option<String>,
    pub title: Option<String>,
    pub genre: Option<String>,
    /// Release year.
    pub year: Option<i32>,
    /// Track number; kept as text when the tag was not numeric.
    pub track: Option<TrackNumber>,
    /// Channel mode label (for example `joint-stereo`).
    pub channels: Option<String>,
    /// Minimum bitrate in bits per second.
    pub bitrate_min: Option<u32>,
    /// Maximum bitrate in bits per second.
    pub bitrate_max: Option<u32>,
    /// Average bitrate in bits per second.
    pub bitrate_avg: Option<u32>,
}

/// Track number as reported by the stream.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum TrackNumber {
    Number(u32),
    Text(String),
}

/// Outbound playback update, also returned by player listings.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlaybackInfo {
    /// Player id as a hyphenated uuid string.
    pub player_id: String,
    pub state: PlaybackState,
    /// Track duration in whole seconds, once known.
    pub duration: Option<u64>,
    /// Current track, absent for unknown players.
    pub track: Option<Track>,
    pub metadata: Option<TrackMetadata>,
    /// Current playlist index.
    pub index: Option<usize>,
}

/// Snapshot of a player's playlist.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlaylistSnapshot {
    pub tracks: Vec<Track>,
    pub index: Option<usize>,
    pub repeat: bool,
    pub shuffle: bool,
    /// Volume percent (1..=100).
    pub volume: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playback_state_serializes_snake_case() {
        let json = serde_json::to_string(&PlaybackState::Playing).unwrap();
        assert_eq!(json, "\"playing\"");
        assert_eq!(PlaybackState::Paused.to_string(), "paused");
    }

    #[test]
    fn track_number_is_untagged() {
        let numeric = serde_json::to_value(TrackNumber::Number(7)).unwrap();
        assert_eq!(numeric, serde_json::json!(7));
        let text = serde_json::to_value(TrackNumber::Text("7/12".into())).unwrap();
        assert_eq!(text, serde_json::json!("7/12"));
    }

    #[test]
    fn playback_info_defaults_to_stopped_without_track() {
        let info = PlaybackInfo {
            player_id: "abc".into(),
            ..Default::default()
        };
        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["state"], "stopped");
        assert!(value["track"].is_null());
    }
}
