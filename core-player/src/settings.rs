//! # Player Settings
//!
//! Explicit, typed configuration with clamped setters and the cycle orders
//! the UI toggles walk through. Persistence goes through the injected
//! [`SettingsStore`](bridge_traits::storage::SettingsStore), one typed key
//! per field.

use bridge_traits::provider::GangType;
use bridge_traits::storage::SettingsStore;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// What happens when a track ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayMode {
    /// Advance while a next entry exists, then stop.
    Sequence,
    /// Advance, wrapping from the last entry back to the first.
    Loop,
    /// Replay the current entry (and part) forever.
    Single,
    /// Advance, fetching fresh content at the playlist edge.
    Auto,
}

impl PlayMode {
    /// The order the UI toggle walks through.
    pub const CYCLE: [PlayMode; 4] = [
        PlayMode::Sequence,
        PlayMode::Loop,
        PlayMode::Single,
        PlayMode::Auto,
    ];

    /// Next mode in the UI toggle order.
    pub fn next(self) -> Self {
        let i = Self::CYCLE.iter().position(|m| *m == self).unwrap_or(0);
        Self::CYCLE[(i + 1) % Self::CYCLE.len()]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PlayMode::Sequence => "sequence",
            PlayMode::Loop => "loop",
            PlayMode::Single => "single",
            PlayMode::Auto => "auto",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        match s {
            "sequence" => Some(PlayMode::Sequence),
            "loop" => Some(PlayMode::Loop),
            "single" => Some(PlayMode::Single),
            "auto" => Some(PlayMode::Auto),
            _ => None,
        }
    }
}

/// Preferred audio rendition when several are offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioQuality {
    High,
    Medium,
    Low,
}

impl AudioQuality {
    pub fn as_str(self) -> &'static str {
        match self {
            AudioQuality::High => "high",
            AudioQuality::Medium => "medium",
            AudioQuality::Low => "low",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        match s {
            "high" => Some(AudioQuality::High),
            "medium" => Some(AudioQuality::Medium),
            "low" => Some(AudioQuality::Low),
            _ => None,
        }
    }
}

/// Playback rates the cycle toggle walks through.
pub const PLAYBACK_RATES: [f32; 6] = [0.5, 0.75, 1.0, 1.25, 1.5, 2.0];

/// The engine's explicit configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSettings {
    pub play_mode: PlayMode,
    /// Which category the auto mode fetches at the playlist edge.
    pub gang_type: GangType,
    /// Volume in `0.0..=1.0`.
    pub volume: f32,
    /// Volume to restore when unmuting.
    pub previous_volume: f32,
    pub muted: bool,
    /// Playback rate in `0.5..=2.0`.
    pub playback_rate: f32,
    pub audio_quality: AudioQuality,
    /// Sleep timer deadline, Unix epoch milliseconds.
    pub sleep_timer_deadline_ms: Option<i64>,
    /// User-configured discovery keywords; empty uses the provider's pool.
    pub custom_keywords: Vec<String>,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            play_mode: PlayMode::Auto,
            gang_type: GangType::Solo,
            volume: 0.8,
            previous_volume: 0.8,
            muted: false,
            playback_rate: 1.0,
            audio_quality: AudioQuality::High,
            sleep_timer_deadline_ms: None,
            custom_keywords: Vec::new(),
        }
    }
}

impl PlayerSettings {
    /// Set volume, clamped to `0.0..=1.0`. Zero mutes; a non-zero volume
    /// becomes the restore point for the next unmute.
    pub fn set_volume(&mut self, volume: f32) {
        let clamped = volume.clamp(0.0, 1.0);
        self.volume = clamped;
        if clamped > 0.0 {
            self.previous_volume = clamped;
        }
        self.muted = clamped == 0.0;
    }

    /// Toggle mute, restoring the pre-mute volume on unmute.
    pub fn toggle_mute(&mut self) {
        if self.muted {
            self.muted = false;
            self.volume = if self.previous_volume > 0.0 {
                self.previous_volume
            } else {
                0.8
            };
        } else {
            self.muted = true;
            self.previous_volume = self.volume;
            self.volume = 0.0;
        }
    }

    /// Set playback rate, clamped to `0.5..=2.0`.
    pub fn set_playback_rate(&mut self, rate: f32) {
        self.playback_rate = rate.clamp(0.5, 2.0);
    }

    /// Step to the next rate in [`PLAYBACK_RATES`]; an off-list rate starts
    /// the cycle over at the first entry.
    pub fn cycle_playback_rate(&mut self) {
        let i = PLAYBACK_RATES
            .iter()
            .position(|r| (*r - self.playback_rate).abs() < f32::EPSILON);
        self.playback_rate = match i {
            Some(i) => PLAYBACK_RATES[(i + 1) % PLAYBACK_RATES.len()],
            None => PLAYBACK_RATES[0],
        };
    }

    pub fn cycle_play_mode(&mut self) {
        self.play_mode = self.play_mode.next();
    }

    /// Load persisted settings, falling back to defaults per missing key.
    pub async fn load(store: &dyn SettingsStore) -> Result<Self> {
        let mut settings = Self::default();

        if let Some(mode) = store.get_string("play_mode").await? {
            if let Some(mode) = PlayMode::from_str(&mode) {
                settings.play_mode = mode;
            }
        }
        if let Some(gang) = store.get_string("gang_type").await? {
            match gang.as_str() {
                "solo" => settings.gang_type = GangType::Solo,
                "duo" => settings.gang_type = GangType::Duo,
                _ => {}
            }
        }
        if let Some(volume) = store.get_f64("volume").await? {
            settings.volume = (volume as f32).clamp(0.0, 1.0);
        }
        if let Some(previous) = store.get_f64("previous_volume").await? {
            settings.previous_volume = (previous as f32).clamp(0.0, 1.0);
        }
        if let Some(muted) = store.get_bool("muted").await? {
            settings.muted = muted;
        }
        if let Some(rate) = store.get_f64("playback_rate").await? {
            settings.playback_rate = (rate as f32).clamp(0.5, 2.0);
        }
        if let Some(quality) = store.get_string("audio_quality").await? {
            if let Some(quality) = AudioQuality::from_str(&quality) {
                settings.audio_quality = quality;
            }
        }
        if let Some(keywords) = store.get_string("custom_keywords").await? {
            if let Ok(parsed) = serde_json::from_str::<Vec<String>>(&keywords) {
                settings.custom_keywords = parsed;
            }
        }

        debug!(?settings.play_mode, settings.volume, "settings loaded");
        Ok(settings)
    }

    /// Persist every field through the store.
    ///
    /// The sleep timer deadline is deliberately not persisted; it is a
    /// session-scoped countdown.
    pub async fn save(&self, store: &dyn SettingsStore) -> Result<()> {
        store.set_string("play_mode", self.play_mode.as_str()).await?;
        let gang = match self.gang_type {
            GangType::Solo => "solo",
            GangType::Duo => "duo",
        };
        store.set_string("gang_type", gang).await?;
        store.set_f64("volume", self.volume as f64).await?;
        store
            .set_f64("previous_volume", self.previous_volume as f64)
            .await?;
        store.set_bool("muted", self.muted).await?;
        store
            .set_f64("playback_rate", self.playback_rate as f64)
            .await?;
        store
            .set_string("audio_quality", self.audio_quality.as_str())
            .await?;
        let keywords = serde_json::to_string(&self.custom_keywords)
            .map_err(|e| crate::error::PlayerError::Persistence(e.to_string()))?;
        store.set_string("custom_keywords", &keywords).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_shipped_behavior() {
        let settings = PlayerSettings::default();
        assert_eq!(settings.play_mode, PlayMode::Auto);
        assert_eq!(settings.volume, 0.8);
        assert_eq!(settings.playback_rate, 1.0);
        assert_eq!(settings.audio_quality, AudioQuality::High);
        assert!(!settings.muted);
    }

    #[test]
    fn play_mode_cycle_order() {
        assert_eq!(PlayMode::Sequence.next(), PlayMode::Loop);
        assert_eq!(PlayMode::Loop.next(), PlayMode::Single);
        assert_eq!(PlayMode::Single.next(), PlayMode::Auto);
        assert_eq!(PlayMode::Auto.next(), PlayMode::Sequence);
    }

    #[test]
    fn volume_clamps_and_tracks_restore_point() {
        let mut settings = PlayerSettings::default();

        settings.set_volume(1.5);
        assert_eq!(settings.volume, 1.0);
        assert_eq!(settings.previous_volume, 1.0);

        settings.set_volume(-0.2);
        assert_eq!(settings.volume, 0.0);
        assert!(settings.muted);
        // Restore point keeps the last audible volume.
        assert_eq!(settings.previous_volume, 1.0);
    }

    #[test]
    fn mute_round_trip_restores_volume() {
        let mut settings = PlayerSettings::default();
        settings.set_volume(0.6);

        settings.toggle_mute();
        assert!(settings.muted);
        assert_eq!(settings.volume, 0.0);

        settings.toggle_mute();
        assert!(!settings.muted);
        assert_eq!(settings.volume, 0.6);
    }

    #[test]
    fn rate_clamps_and_cycles() {
        let mut settings = PlayerSettings::default();

        settings.set_playback_rate(3.0);
        assert_eq!(settings.playback_rate, 2.0);

        settings.cycle_playback_rate();
        assert_eq!(settings.playback_rate, 0.5);

        settings.set_playback_rate(1.25);
        settings.cycle_playback_rate();
        assert_eq!(settings.playback_rate, 1.5);
    }
}
