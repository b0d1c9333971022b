//! Drives the in-memory backend like a real pipeline would: playing chains
//! report a duration and tags, then reach end of stream.

use std::collections::HashMap;
use std::time::Duration;

use audioplayer::backend::memory::MemoryBackend;
use audioplayer::backend::{BackendState, BusMessage, ChainId, TagValue};

pub struct Simulator {
    backend: MemoryBackend,
    track_ticks: u32,
    tick: Duration,
    played: HashMap<ChainId, u32>,
}

impl Simulator {
    pub fn new(backend: MemoryBackend, track_ticks: u32, tick: Duration) -> Self {
        Self {
            backend,
            track_ticks: track_ticks.max(1),
            tick,
            played: HashMap::new(),
        }
    }

    /// Advance every playing chain by one tick.
    pub fn step(&mut self) {
        let live = self.backend.live_chains();
        self.played.retain(|chain, _| live.contains(chain));

        for chain in self.backend.chains_in_state(BackendState::Playing) {
            let played = self.played.entry(chain).or_insert(0);
            *played += 1;
            if *played == 1 {
                self.backend.set_duration(chain, self.tick * self.track_ticks);
                self.backend.push_message(chain, BusMessage::DurationChanged);
                self.backend.push_message(
                    chain,
                    BusMessage::Tag(vec![
                        ("title".to_string(), TagValue::Text(format!("Track {}", chain.0))),
                        ("bitrate".to_string(), TagValue::UInt(320_000)),
                    ]),
                );
            }
            if *played == self.track_ticks {
                tracing::debug!(chain = chain.0, "simulated end of stream");
                self.backend.push_message(chain, BusMessage::Eos);
            }
        }
    }
}
