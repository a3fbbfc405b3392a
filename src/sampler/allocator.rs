// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! The voice pool: a fixed-capacity array of voice slots.

use tracing::warn;

use super::voice::Voice;

/// Owns the voice slots and hands them out for new notes.
///
/// The pool is allocated once at construction; acquiring and stealing only
/// ever scan it. When no slot is free the voice with the smallest trigger
/// ordinal is stolen, so stealing is oldest-trigger-order, deterministic, and
/// not amplitude-aware: a long-sustained pad gives way before a just-played
/// release tail.
pub struct VoiceAllocator {
    /// All voice slots. Only the first `max_voices` participate.
    voices: Vec<Voice>,
    /// Runtime-adjustable polyphony limit, at most the pool capacity.
    max_voices: usize,
}

impl VoiceAllocator {
    /// Creates a pool with the given capacity, fully available.
    pub fn new(capacity: usize) -> Self {
        Self {
            voices: vec![Voice::default(); capacity],
            max_voices: capacity,
        }
    }

    /// Returns the polyphony limit.
    pub fn max_voices(&self) -> usize {
        self.max_voices
    }

    /// Sets the polyphony limit, clamped to the pool capacity. Voices in
    /// slots beyond the new limit are hard-stopped.
    pub fn set_max_voices(&mut self, max_voices: usize) {
        self.max_voices = max_voices.min(self.voices.len());
        for voice in &mut self.voices[self.max_voices..] {
            voice.reset();
        }
    }

    /// Finds a slot for a new note: the first idle slot, or failing that the
    /// active voice with the smallest trigger ordinal. Returns None only when
    /// the polyphony limit is zero.
    pub fn acquire(&mut self) -> Option<usize> {
        if let Some(slot) = self.voices[..self.max_voices]
            .iter()
            .position(|voice| !voice.is_active())
        {
            return Some(slot);
        }

        let slot = self.voices[..self.max_voices]
            .iter()
            .enumerate()
            .min_by_key(|(_, voice)| voice.note_id())
            .map(|(slot, _)| slot)?;
        warn!(
            max_voices = self.max_voices,
            slot, "Voice pool exhausted, stealing oldest voice"
        );
        Some(slot)
    }

    /// Releases the first active, non-releasing voice playing the given note.
    /// Does nothing if there is none.
    pub fn release_note(&mut self, note: u8) {
        if let Some(voice) = self.voices[..self.max_voices]
            .iter_mut()
            .find(|voice| voice.is_active() && !voice.is_releasing() && voice.note() == note)
        {
            voice.release();
        }
    }

    /// Gracefully releases every active voice.
    pub fn release_all(&mut self) {
        for voice in &mut self.voices[..self.max_voices] {
            if voice.is_active() {
                voice.release();
            }
        }
    }

    /// Hard-stops every voice, returning the whole pool to idle with zero
    /// output.
    pub fn reset_all(&mut self) {
        for voice in &mut self.voices {
            voice.reset();
        }
    }

    /// Returns the number of active voices.
    pub fn active_count(&self) -> usize {
        self.voices[..self.max_voices]
            .iter()
            .filter(|voice| voice.is_active())
            .count()
    }

    /// Gets a voice slot.
    pub fn voice(&self, slot: usize) -> Option<&Voice> {
        self.voices.get(slot)
    }

    /// Gets a voice slot mutably.
    pub fn voice_mut(&mut self, slot: usize) -> Option<&mut Voice> {
        self.voices.get_mut(slot)
    }

    /// Returns the voice slots that participate in rendering.
    pub fn voices_mut(&mut self) -> &mut [Voice] {
        &mut self.voices[..self.max_voices]
    }
}

impl std::fmt::Debug for VoiceAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceAllocator")
            .field("active_voices", &self.active_count())
            .field("max_voices", &self.max_voices)
            .field("capacity", &self.voices.len())
            .finish()
    }
}
