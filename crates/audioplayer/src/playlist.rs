//! Playlist state and navigation invariants.
//!
//! The current index is `None` until a track is first loaded and stays inside
//! `0..len` afterwards. Inserts and removals keep it pointing at the same
//! logical track.

use audioplayer_types::{PlaylistSnapshot, Track, TrackMetadata};
use rand::seq::SliceRandom;

use crate::error::{PlayerError, Result};

#[derive(Clone, Debug)]
pub struct Playlist {
    tracks: Vec<Track>,
    current: Option<usize>,
    max_tracks: usize,
    volume: u8,
    pub repeat: bool,
    pub shuffle: bool,
    /// Duration of the current track in whole seconds.
    pub duration: Option<u64>,
    /// Completed tag metadata of the current track.
    pub metadata: Option<TrackMetadata>,
}

/// Accept volumes in `1..=100`.
pub fn validate_volume(volume: u8) -> Result<u8> {
    if (1..=100).contains(&volume) {
        Ok(volume)
    } else {
        Err(PlayerError::InvalidVolume(volume))
    }
}

impl Playlist {
    pub fn new(max_tracks: usize, volume: u8) -> Self {
        Self {
            tracks: Vec::new(),
            current: None,
            max_tracks,
            volume,
            repeat: false,
            shuffle: false,
            duration: None,
            metadata: None,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_full(&self) -> bool {
        self.tracks.len() >= self.max_tracks
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current.and_then(|index| self.tracks.get(index))
    }

    pub(crate) fn current_track_mut(&mut self) -> Option<&mut Track> {
        self.current.and_then(|index| self.tracks.get_mut(index))
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: u8) -> Result<()> {
        self.volume = validate_volume(volume)?;
        Ok(())
    }

    /// Insert `track` at `position` (clamped to the end), or append.
    ///
    /// Returns `false` once the playlist holds `max_tracks`.
    pub fn add(&mut self, track: Track, position: Option<usize>) -> bool {
        if self.is_full() {
            return false;
        }
        let position = position.map_or(self.tracks.len(), |p| p.min(self.tracks.len()));
        self.tracks.insert(position, track);
        if let Some(current) = self.current.as_mut() {
            if position <= *current {
                *current += 1;
            }
        }
        true
    }

    pub fn remove(&mut self, index: usize) -> Result<Track> {
        if index >= self.tracks.len() {
            return Err(PlayerError::InvalidTrackIndex(index));
        }
        if self.current == Some(index) {
            return Err(PlayerError::RemoveCurrentTrack);
        }
        let track = self.tracks.remove(index);
        if let Some(current) = self.current.as_mut() {
            if index < *current {
                *current -= 1;
            }
        }
        Ok(track)
    }

    /// Move the cursor to `index`. Out-of-range indexes leave state untouched.
    pub fn select(&mut self, index: usize) -> Result<()> {
        if index >= self.tracks.len() {
            return Err(PlayerError::InvalidTrackIndex(index));
        }
        self.current = Some(index);
        Ok(())
    }

    /// Index after the current one, if any. Before first playback this is 0.
    pub fn next_index(&self) -> Option<usize> {
        let next = self.current.map_or(0, |current| current + 1);
        (next < self.tracks.len()).then_some(next)
    }

    /// Index before the current one, if any.
    pub fn previous_index(&self) -> Option<usize> {
        self.current.and_then(|current| current.checked_sub(1))
    }

    /// Forget per-track state before loading another track.
    pub fn clear_track_state(&mut self) {
        self.duration = None;
        self.metadata = None;
    }

    /// Randomize order. The current track moves to position 0 and stays
    /// current.
    pub fn shuffle(&mut self) {
        let mut rng = rand::rng();
        match self.current {
            Some(current) => {
                let pinned = self.tracks.remove(current);
                self.tracks.shuffle(&mut rng);
                self.tracks.insert(0, pinned);
                self.current = Some(0);
            }
            None => self.tracks.shuffle(&mut rng),
        }
    }

    pub fn snapshot(&self) -> PlaylistSnapshot {
        PlaylistSnapshot {
            tracks: self.tracks.clone(),
            index: self.current,
            repeat: self.repeat,
            shuffle: self.shuffle,
            volume: self.volume,
        }
    }
}
