//! MIME type to stage list mapping.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One format-specific stage: the name it gets in the chain and the backend
/// factory that produces it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSpec {
    pub name: String,
    pub factory: String,
}

impl StageSpec {
    pub fn new(name: &str, factory: &str) -> Self {
        Self {
            name: name.to_string(),
            factory: factory.to_string(),
        }
    }
}

/// Ordered format stages per supported MIME type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineTable {
    entries: BTreeMap<String, Vec<StageSpec>>,
}

/// Decode tail shared by every built-in format: one converter ahead of
/// replay gain, then the resampler.
fn gain_tail(convert_name: &str) -> [StageSpec; 3] {
    [
        StageSpec::new(convert_name, "audioconvert"),
        StageSpec::new("gain", "rgvolume"),
        StageSpec::new("resampler", "audioresample"),
    ]
}

fn aac_stages() -> Vec<StageSpec> {
    let mut stages = vec![
        StageSpec::new("parser", "aacparse"),
        StageSpec::new("decoder", "faad"),
    ];
    stages.extend(gain_tail("converter"));
    stages
}

impl Default for PipelineTable {
    fn default() -> Self {
        let mut entries = BTreeMap::new();

        let mut mpeg = vec![
            StageSpec::new("tags", "id3demux"),
            StageSpec::new("parser", "mpegaudioparse"),
            StageSpec::new("decoder", "mpg123audiodec"),
        ];
        mpeg.extend(gain_tail("converter"));
        entries.insert("audio/mpeg".to_string(), mpeg);

        let mut flac = vec![
            StageSpec::new("parser", "flacparse"),
            StageSpec::new("decoder", "flacdec"),
        ];
        flac.extend(gain_tail("converter"));
        entries.insert("audio/flac".to_string(), flac);

        let mut ogg = vec![
            StageSpec::new("demux", "oggdemux"),
            StageSpec::new("tags", "oggparse"),
            StageSpec::new("decoder", "vorbisdec"),
        ];
        ogg.extend(gain_tail("convert"));
        entries.insert("audio/ogg".to_string(), ogg);

        entries.insert("audio/x-hx-aac-adts".to_string(), aac_stages());
        entries.insert("audio/x-hx-aac-adif".to_string(), aac_stages());
        entries.insert("audio/aac".to_string(), aac_stages());

        Self { entries }
    }
}

impl PipelineTable {
    pub fn stages_for(&self, mime: &str) -> Option<&[StageSpec]> {
        self.entries.get(mime).map(Vec::as_slice)
    }

    pub fn supports(&self, mime: &str) -> bool {
        self.entries.contains_key(mime)
    }

    /// Replace (or add) the stage list for `mime`.
    pub fn insert(&mut self, mime: impl Into<String>, stages: Vec<StageSpec>) {
        self.entries.insert(mime.into(), stages);
    }

    pub fn formats(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
