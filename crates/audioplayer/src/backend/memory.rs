//! In-memory media backend.
//!
//! Records every chain, stage, link and property so callers can inspect what
//! the player built, and lets them inject bus messages to drive playback.
//! Every effective state change queues a `StateChanged` message, like a real
//! pipeline bus would.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::{
    BackendError, BackendState, BusMessage, ChainId, MediaBackend, StageId, StageProperty,
};

#[derive(Default)]
struct ChainRecord {
    name: String,
    state: Option<BackendState>,
    stages: Vec<StageId>,
    links: Vec<(StageId, StageId)>,
    bus: VecDeque<BusMessage>,
    duration: Option<Duration>,
}

struct StageRecord {
    chain: ChainId,
    name: String,
    factory: String,
    properties: HashMap<&'static str, StageProperty>,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    chains: HashMap<ChainId, ChainRecord>,
    stages: HashMap<StageId, StageRecord>,
    disabled_factories: HashSet<String>,
    /// Factories whose stages refuse incoming links.
    unlinkable_factories: HashSet<String>,
    frozen_chains: HashSet<ChainId>,
    released_chains: usize,
}

impl Inner {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn chain_mut(&mut self, chain: ChainId) -> Result<&mut ChainRecord, BackendError> {
        self.chains
            .get_mut(&chain)
            .ok_or(BackendError::UnknownChain(chain))
    }
}

/// Cloneable handle; clones share the same backend state.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// Make `make_stage` fail for `factory` from now on.
    pub fn disable_factory(&self, factory: &str) {
        self.lock().disabled_factories.insert(factory.to_string());
    }

    pub fn enable_factory(&self, factory: &str) {
        self.lock().disabled_factories.remove(factory);
    }

    pub fn refuse_links_to(&self, factory: &str) {
        self.lock().unlinkable_factories.insert(factory.to_string());
    }

    /// Refuse every later state change on `chain`.
    pub fn freeze_chain(&self, chain: ChainId) {
        self.lock().frozen_chains.insert(chain);
    }

    /// Queue a message on a chain bus. Returns `false` for released chains.
    pub fn push_message(&self, chain: ChainId, message: BusMessage) -> bool {
        match self.lock().chains.get_mut(&chain) {
            Some(record) => {
                record.bus.push_back(message);
                true
            }
            None => false,
        }
    }

    /// Set the duration the next `query_duration` will report.
    pub fn set_duration(&self, chain: ChainId, duration: Duration) {
        if let Some(record) = self.lock().chains.get_mut(&chain) {
            record.duration = Some(duration);
        }
    }

    /// Live chain carrying `name` (player chains are named after the player id).
    pub fn chain_named(&self, name: &str) -> Option<ChainId> {
        self.lock()
            .chains
            .iter()
            .find(|(_, record)| record.name == name)
            .map(|(id, _)| *id)
    }

    pub fn live_chains(&self) -> Vec<ChainId> {
        let mut chains: Vec<ChainId> = self.lock().chains.keys().copied().collect();
        chains.sort_by_key(|chain| chain.0);
        chains
    }

    /// Live chains currently in `state`.
    pub fn chains_in_state(&self, state: BackendState) -> Vec<ChainId> {
        let inner = self.lock();
        let mut chains: Vec<ChainId> = inner
            .chains
            .iter()
            .filter(|(_, record)| record.state.unwrap_or(BackendState::Null) == state)
            .map(|(id, _)| *id)
            .collect();
        chains.sort_by_key(|chain| chain.0);
        chains
    }

    pub fn live_stage_count(&self) -> usize {
        self.lock().stages.len()
    }

    pub fn released_chain_count(&self) -> usize {
        self.lock().released_chains
    }

    /// Stage names of a chain in creation order.
    pub fn stage_names(&self, chain: ChainId) -> Vec<String> {
        let inner = self.lock();
        inner
            .chains
            .get(&chain)
            .map(|record| {
                record
                    .stages
                    .iter()
                    .filter_map(|stage| inner.stages.get(stage).map(|s| s.name.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Factory names of a chain in creation order.
    pub fn stage_factories(&self, chain: ChainId) -> Vec<String> {
        let inner = self.lock();
        inner
            .chains
            .get(&chain)
            .map(|record| {
                record
                    .stages
                    .iter()
                    .filter_map(|stage| inner.stages.get(stage).map(|s| s.factory.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Links of a chain as `(upstream name, downstream name)`.
    pub fn links(&self, chain: ChainId) -> Vec<(String, String)> {
        let inner = self.lock();
        let name = |stage: &StageId| {
            inner
                .stages
                .get(stage)
                .map(|s| s.name.clone())
                .unwrap_or_default()
        };
        inner
            .chains
            .get(&chain)
            .map(|record| {
                record
                    .links
                    .iter()
                    .map(|(from, to)| (name(from), name(to)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Last value assigned to `key` on the stage called `stage_name`.
    pub fn property(&self, chain: ChainId, stage_name: &str, key: &str) -> Option<StageProperty> {
        let inner = self.lock();
        let record = inner.chains.get(&chain)?;
        record
            .stages
            .iter()
            .filter_map(|stage| inner.stages.get(stage))
            .find(|stage| stage.name == stage_name)
            .and_then(|stage| stage.properties.get(key).cloned())
    }

    pub fn state_of(&self, chain: ChainId) -> Option<BackendState> {
        self.lock()
            .chains
            .get(&chain)
            .map(|record| record.state.unwrap_or(BackendState::Null))
    }
}

impl MediaBackend for MemoryBackend {
    fn new_chain(&self, name: &str) -> Result<ChainId, BackendError> {
        let mut inner = self.lock();
        let id = ChainId(inner.next_id());
        inner.chains.insert(
            id,
            ChainRecord {
                name: name.to_string(),
                ..Default::default()
            },
        );
        Ok(id)
    }

    fn make_stage(
        &self,
        chain: ChainId,
        factory: &str,
        name: &str,
    ) -> Result<StageId, BackendError> {
        let mut inner = self.lock();
        if inner.disabled_factories.contains(factory) {
            return Err(BackendError::FactoryUnavailable(factory.to_string()));
        }
        if !inner.chains.contains_key(&chain) {
            return Err(BackendError::UnknownChain(chain));
        }
        let id = StageId(inner.next_id());
        inner.stages.insert(
            id,
            StageRecord {
                chain,
                name: name.to_string(),
                factory: factory.to_string(),
                properties: HashMap::new(),
            },
        );
        inner.chain_mut(chain)?.stages.push(id);
        Ok(id)
    }

    fn link(&self, from: StageId, to: StageId) -> Result<(), BackendError> {
        let mut inner = self.lock();
        let chain = match (inner.stages.get(&from), inner.stages.get(&to)) {
            (Some(a), Some(b))
                if a.chain == b.chain && !inner.unlinkable_factories.contains(&b.factory) =>
            {
                a.chain
            }
            _ => return Err(BackendError::LinkFailed { from, to }),
        };
        inner.chain_mut(chain)?.links.push((from, to));
        Ok(())
    }

    fn unlink(&self, from: StageId, to: StageId) -> Result<(), BackendError> {
        let mut inner = self.lock();
        let chain = inner
            .stages
            .get(&from)
            .map(|stage| stage.chain)
            .ok_or(BackendError::UnknownStage(from))?;
        let record = inner.chain_mut(chain)?;
        let before = record.links.len();
        record.links.retain(|link| *link != (from, to));
        if record.links.len() == before {
            return Err(BackendError::LinkFailed { from, to });
        }
        Ok(())
    }

    fn remove_stage(&self, chain: ChainId, stage: StageId) -> Result<(), BackendError> {
        let mut inner = self.lock();
        let record = inner.chain_mut(chain)?;
        let before = record.stages.len();
        record.stages.retain(|s| *s != stage);
        if record.stages.len() == before {
            return Err(BackendError::UnknownStage(stage));
        }
        record.links.retain(|(from, to)| *from != stage && *to != stage);
        inner.stages.remove(&stage);
        Ok(())
    }

    fn release_chain(&self, chain: ChainId) {
        let mut inner = self.lock();
        if let Some(record) = inner.chains.remove(&chain) {
            for stage in record.stages {
                inner.stages.remove(&stage);
            }
            inner.released_chains += 1;
        }
    }

    fn set_state(&self, chain: ChainId, state: BackendState) -> Result<(), BackendError> {
        let mut inner = self.lock();
        if inner.frozen_chains.contains(&chain) {
            return Err(BackendError::StateChange(format!("chain {} is frozen", chain.0)));
        }
        let record = inner.chain_mut(chain)?;
        let old = record.state.unwrap_or(BackendState::Null);
        record.state = Some(state);
        if old != state {
            record.bus.push_back(BusMessage::StateChanged {
                old,
                new: state,
                pending: None,
            });
        }
        Ok(())
    }

    fn state(&self, chain: ChainId) -> Result<BackendState, BackendError> {
        self.state_of(chain).ok_or(BackendError::UnknownChain(chain))
    }

    fn pop_message(&self, chain: ChainId) -> Option<BusMessage> {
        self.lock().chains.get_mut(&chain)?.bus.pop_front()
    }

    fn query_duration(&self, chain: ChainId) -> Option<Duration> {
        self.lock().chains.get(&chain)?.duration
    }

    fn set_property(&self, stage: StageId, property: StageProperty) -> Result<(), BackendError> {
        let mut inner = self.lock();
        let record = inner
            .stages
            .get_mut(&stage)
            .ok_or(BackendError::UnknownStage(stage))?;
        record.properties.insert(property.key(), property);
        Ok(())
    }
}
