//! Resource classification and file format detection.

use std::path::Path;

use url::Url;

use crate::error::{PlayerError, Result};

/// Where a track's bytes come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    File,
    Stream,
}

impl ResourceKind {
    /// Backend factory for the chain's source stage.
    pub fn source_factory(self) -> &'static str {
        match self {
            ResourceKind::File => "filesrc",
            ResourceKind::Stream => "souphttpsrc",
        }
    }
}

/// Existing paths are files, `http(s)` URLs are streams, anything else fails.
pub fn classify(resource: &str) -> Result<ResourceKind> {
    if Path::new(resource).exists() {
        return Ok(ResourceKind::File);
    }
    if is_stream_url(resource) {
        return Ok(ResourceKind::Stream);
    }
    Err(PlayerError::InvalidResource(resource.to_string()))
}

fn is_stream_url(resource: &str) -> bool {
    let Ok(url) = Url::parse(resource) else {
        return false;
    };
    matches!(url.scheme(), "http" | "https") && url.host_str().is_some_and(|host| !host.is_empty())
}

/// Detect a file's MIME type from its content, falling back to the
/// extension. `None` when neither is recognised or the file can't be read.
pub fn sniff_file_format(path: &Path) -> Option<&'static str> {
    let mut detector = infer::Infer::new();
    detector.add("audio/x-hx-aac-adif", "aac", is_adif);
    let kind = match detector.get_from_path(path) {
        Ok(kind) => kind,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "cannot read file header");
            return None;
        }
    };
    kind.and_then(|kind| pipeline_mime(kind.mime_type()))
        .or_else(|| format_from_extension(path))
}

fn is_adif(buf: &[u8]) -> bool {
    buf.starts_with(b"ADIF")
}

/// Map detected MIME names onto pipeline table keys.
fn pipeline_mime(detected: &str) -> Option<&'static str> {
    match detected {
        "audio/mpeg" => Some("audio/mpeg"),
        "audio/x-flac" | "audio/flac" => Some("audio/flac"),
        "audio/ogg" | "audio/opus" => Some("audio/ogg"),
        // infer only recognises the ADTS sync word as aac.
        "audio/aac" => Some("audio/x-hx-aac-adts"),
        "audio/x-hx-aac-adif" => Some("audio/x-hx-aac-adif"),
        _ => None,
    }
}

fn format_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "mp3" | "mp2" | "mpga" => Some("audio/mpeg"),
        "flac" => Some("audio/flac"),
        "ogg" | "oga" => Some("audio/ogg"),
        "aac" => Some("audio/aac"),
        _ => None,
    }
}
