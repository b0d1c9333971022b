//! Chain assembly and teardown.
//!
//! A chain is `source -> progress -> format stages -> volume -> sink`, each
//! stage linked to its predecessor. A failed build releases everything it
//! created before returning.

mod table;

pub use table::{PipelineTable, StageSpec};

use crate::backend::{BackendError, BackendState, ChainId, MediaBackend, StageId, StageProperty};
use crate::error::{PlayerError, Result};

pub const PROGRESS_FACTORY: &str = "progressreport";
pub const VOLUME_FACTORY: &str = "volume";
pub const SINK_FACTORY: &str = "autoaudiosink";

/// Live chain owned by a player. `stages` is in link order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveChain {
    pub chain: ChainId,
    pub source: StageId,
    pub volume: StageId,
    pub stages: Vec<StageId>,
}

/// Everything needed to build one chain.
pub struct ChainRequest<'a> {
    /// Chain name; the owning player id.
    pub name: String,
    /// Factory for the source stage (file or http).
    pub source_factory: &'a str,
    pub location: &'a str,
    pub audio_format: &'a str,
    /// Volume percent.
    pub volume: u8,
    pub progress_update_seconds: u32,
}

struct PartialChain<'b, B: MediaBackend> {
    backend: &'b B,
    chain: ChainId,
    stages: Vec<StageId>,
}

impl<B: MediaBackend> PartialChain<'_, B> {
    /// Create a stage and link it after the previous one.
    fn push(&mut self, factory: &str, name: &str) -> Result<StageId> {
        let config_err = |source: BackendError| PlayerError::PipelineConfiguration {
            stage: name.to_string(),
            factory: factory.to_string(),
            source,
        };
        let stage = self
            .backend
            .make_stage(self.chain, factory, name)
            .map_err(config_err)?;
        if let Some(prev) = self.stages.last().copied() {
            if let Err(err) = self.backend.link(prev, stage) {
                if let Err(cleanup) = self.backend.remove_stage(self.chain, stage) {
                    tracing::debug!(chain = self.chain.0, error = %cleanup, "remove stage failed");
                }
                return Err(config_err(err));
            }
        }
        self.stages.push(stage);
        Ok(stage)
    }

    fn configure(
        &self,
        stage: StageId,
        (name, factory): (&str, &str),
        property: StageProperty,
    ) -> Result<()> {
        self.backend
            .set_property(stage, property)
            .map_err(|source| PlayerError::PipelineConfiguration {
                stage: name.to_string(),
                factory: factory.to_string(),
                source,
            })
    }
}

/// Build a chain for `request.audio_format` using `table`.
pub fn build_chain<B: MediaBackend>(
    backend: &B,
    table: &PipelineTable,
    request: &ChainRequest<'_>,
) -> Result<ActiveChain> {
    let specs = table
        .stages_for(request.audio_format)
        .ok_or_else(|| PlayerError::UnsupportedFormat(request.audio_format.to_string()))?;
    let chain = backend
        .new_chain(&request.name)
        .map_err(|source| PlayerError::PipelineConfiguration {
            stage: request.name.clone(),
            factory: "chain".to_string(),
            source,
        })?;

    let mut partial = PartialChain {
        backend,
        chain,
        stages: Vec::with_capacity(specs.len() + 4),
    };
    match assemble(&mut partial, specs, request) {
        Ok((source, volume)) => {
            tracing::debug!(
                chain = %request.name,
                format = %request.audio_format,
                stages = partial.stages.len(),
                "chain built"
            );
            Ok(ActiveChain {
                chain,
                source,
                volume,
                stages: partial.stages,
            })
        }
        Err(err) => {
            tracing::warn!(chain = %request.name, error = %err, "chain build failed");
            dismantle(backend, chain, &partial.stages);
            Err(err)
        }
    }
}

fn assemble<B: MediaBackend>(
    partial: &mut PartialChain<'_, B>,
    specs: &[StageSpec],
    request: &ChainRequest<'_>,
) -> Result<(StageId, StageId)> {
    let source = partial.push(request.source_factory, "source")?;
    partial.configure(
        source,
        ("source", request.source_factory),
        StageProperty::Location(request.location.to_string()),
    )?;

    let progress = partial.push(PROGRESS_FACTORY, "progress")?;
    let progress_name = ("progress", PROGRESS_FACTORY);
    partial.configure(
        progress,
        progress_name,
        StageProperty::UpdateFreq(request.progress_update_seconds),
    )?;
    partial.configure(progress, progress_name, StageProperty::Silent(true))?;

    for spec in specs {
        partial.push(&spec.factory, &spec.name)?;
    }

    let volume = partial.push(VOLUME_FACTORY, "volume")?;
    partial.configure(
        volume,
        ("volume", VOLUME_FACTORY),
        StageProperty::Volume(volume_gain(request.volume)),
    )?;
    partial.push(SINK_FACTORY, "sink")?;
    Ok((source, volume))
}

/// Linear gain for a volume percent.
pub fn volume_gain(percent: u8) -> f64 {
    f64::from(percent) / 100.0
}

/// Stop the chain, unlink in reverse order, remove every stage and release it.
pub fn teardown_chain<B: MediaBackend>(backend: &B, active: &ActiveChain) {
    if let Err(err) = backend.set_state(active.chain, BackendState::Null) {
        tracing::warn!(chain = active.chain.0, error = %err, "failed to stop chain");
    }
    dismantle(backend, active.chain, &active.stages);
}

fn dismantle<B: MediaBackend>(backend: &B, chain: ChainId, stages: &[StageId]) {
    for pair in stages.windows(2).rev() {
        if let Err(err) = backend.unlink(pair[0], pair[1]) {
            tracing::debug!(chain = chain.0, error = %err, "unlink failed");
        }
    }
    for stage in stages.iter().rev() {
        if let Err(err) = backend.remove_stage(chain, *stage) {
            tracing::debug!(chain = chain.0, error = %err, "remove stage failed");
        }
    }
    backend.release_chain(chain);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryBackend;

    fn request(format: &str) -> ChainRequest<'_> {
        ChainRequest {
            name: "player-1".to_string(),
            source_factory: "filesrc",
            location: "/music/a.flac",
            audio_format: format,
            volume: 40,
            progress_update_seconds: 15,
        }
    }

    #[test]
    fn builds_full_chain_in_link_order() {
        let backend = MemoryBackend::new();
        let active =
            build_chain(&backend, &PipelineTable::default(), &request("audio/flac")).unwrap();
        let names = backend.stage_names(active.chain);
        assert_eq!(
            names,
            vec![
                "source",
                "progress",
                "parser",
                "decoder",
                "converter",
                "gain",
                "resampler",
                "volume",
                "sink",
            ]
        );
        let links = backend.links(active.chain);
        assert_eq!(links.len(), names.len() - 1);
        assert_eq!(links[0], ("source".to_string(), "progress".to_string()));
        assert_eq!(links.last().unwrap(), &("volume".to_string(), "sink".to_string()));
        assert_eq!(backend.chain_named("player-1"), Some(active.chain));
    }

    #[test]
    fn configures_source_progress_and_volume() {
        let backend = MemoryBackend::new();
        let active =
            build_chain(&backend, &PipelineTable::default(), &request("audio/mpeg")).unwrap();
        let chain = active.chain;
        assert_eq!(
            backend.property(chain, "source", "location"),
            Some(StageProperty::Location("/music/a.flac".into()))
        );
        assert_eq!(
            backend.property(chain, "progress", "update-freq"),
            Some(StageProperty::UpdateFreq(15))
        );
        assert_eq!(
            backend.property(chain, "progress", "silent"),
            Some(StageProperty::Silent(true))
        );
        assert_eq!(
            backend.property(chain, "volume", "volume"),
            Some(StageProperty::Volume(0.4))
        );
    }

    #[test]
    fn failed_stage_releases_everything() {
        let backend = MemoryBackend::new();
        backend.disable_factory("rgvolume");
        let err = build_chain(&backend, &PipelineTable::default(), &request("audio/ogg"))
            .unwrap_err();
        match err {
            PlayerError::PipelineConfiguration { stage, factory, .. } => {
                assert_eq!(stage, "gain");
                assert_eq!(factory, "rgvolume");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(backend.live_chains().is_empty());
        assert_eq!(backend.live_stage_count(), 0);
    }

    #[test]
    fn refused_link_removes_the_orphan_stage() {
        let backend = MemoryBackend::new();
        backend.refuse_links_to("rgvolume");
        let err = build_chain(&backend, &PipelineTable::default(), &request("audio/flac"))
            .unwrap_err();
        match err {
            PlayerError::PipelineConfiguration { stage, source, .. } => {
                assert_eq!(stage, "gain");
                assert!(matches!(source, BackendError::LinkFailed { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(backend.live_chains().is_empty());
        assert_eq!(backend.live_stage_count(), 0);
    }

    #[test]
    fn unsupported_format_creates_nothing() {
        let backend = MemoryBackend::new();
        let err = build_chain(&backend, &PipelineTable::default(), &request("audio/wav"))
            .unwrap_err();
        assert!(matches!(err, PlayerError::UnsupportedFormat(f) if f == "audio/wav"));
        assert!(backend.live_chains().is_empty());
    }

    #[test]
    fn teardown_leaves_no_stages() {
        let backend = MemoryBackend::new();
        let active =
            build_chain(&backend, &PipelineTable::default(), &request("audio/aac")).unwrap();
        backend.set_state(active.chain, BackendState::Playing).unwrap();
        teardown_chain(&backend, &active);
        assert!(backend.live_chains().is_empty());
        assert_eq!(backend.live_stage_count(), 0);
    }
}
