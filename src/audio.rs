//! Audio triggers
//!
//! The simulation fires named effects and never waits on playback. Actual
//! output belongs to an [`AudioSink`] supplied by the host.

use serde::{Deserialize, Serialize};

use crate::settings::Settings;

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundEffect {
    /// Player fires
    Laser,
    /// Player is hit
    Impact,
}

impl SoundEffect {
    /// Name the host's sound bank uses
    pub fn name(&self) -> &'static str {
        match self {
            SoundEffect::Laser => "laser",
            SoundEffect::Impact => "impact",
        }
    }
}

/// Background music tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MusicTrack {
    Menu,
    Game,
}

/// Fire-and-forget effect trigger, as seen by gameplay code
pub trait SoundTrigger {
    fn trigger(&mut self, effect: SoundEffect);
}

/// Whatever actually makes noise
pub trait AudioSink {
    fn play_effect(&mut self, effect: SoundEffect, volume: f32);
    fn play_music(&mut self, track: MusicTrack, volume: f32);
    fn stop_music(&mut self, track: MusicTrack);
}

/// Sink that only logs; used by the headless runner
#[derive(Debug, Default)]
pub struct LogSink;

impl AudioSink for LogSink {
    fn play_effect(&mut self, effect: SoundEffect, volume: f32) {
        log::trace!("sfx {} @ {:.2}", effect.name(), volume);
    }

    fn play_music(&mut self, track: MusicTrack, volume: f32) {
        log::debug!("music {:?} @ {:.2}", track, volume);
    }

    fn stop_music(&mut self, track: MusicTrack) {
        log::debug!("music {:?} stopped", track);
    }
}

/// Audio manager for the game
pub struct AudioManager {
    sink: Box<dyn AudioSink>,
    master_volume: f32,
    sfx_volume: f32,
    music_volume: f32,
    sfx_enabled: bool,
    music_enabled: bool,
    muted: bool,
    current_music: Option<MusicTrack>,
}

impl Default for AudioManager {
    fn default() -> Self {
        Self::new(Box::new(LogSink))
    }
}

impl AudioManager {
    pub fn new(sink: Box<dyn AudioSink>) -> Self {
        Self {
            sink,
            master_volume: 0.8,
            sfx_volume: 0.3,
            music_volume: 0.5,
            sfx_enabled: true,
            music_enabled: true,
            muted: false,
            current_music: None,
        }
    }

    /// Pick up the user's audio preferences
    pub fn apply_settings(&mut self, settings: &Settings) {
        self.sfx_enabled = settings.sound_effects;
        self.set_sfx_volume(settings.effects_volume);
        self.music_enabled = settings.music;
        if !self.music_enabled {
            if let Some(track) = self.current_music.take() {
                self.sink.stop_music(track);
            }
        }
    }

    /// Set master volume (0.0 - 1.0)
    pub fn set_master_volume(&mut self, vol: f32) {
        self.master_volume = vol.clamp(0.0, 1.0);
    }

    /// Set SFX volume (0.0 - 1.0)
    pub fn set_sfx_volume(&mut self, vol: f32) {
        self.sfx_volume = vol.clamp(0.0, 1.0);
    }

    /// Mute/unmute all audio
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// Get effective effects volume
    fn effective_volume(&self) -> f32 {
        if self.muted || !self.sfx_enabled {
            0.0
        } else {
            self.master_volume * self.sfx_volume
        }
    }

    /// Play a sound effect
    pub fn play(&mut self, effect: SoundEffect) {
        let vol = self.effective_volume();
        if vol <= 0.0 {
            return;
        }
        self.sink.play_effect(effect, vol);
    }

    /// Switch background music, stopping whatever was playing
    pub fn play_music(&mut self, track: MusicTrack) {
        if self.current_music == Some(track) {
            return;
        }
        self.stop_music();
        if !self.music_enabled || self.muted {
            return;
        }
        self.sink.play_music(track, self.master_volume * self.music_volume);
        self.current_music = Some(track);
    }

    pub fn stop_music(&mut self) {
        if let Some(track) = self.current_music.take() {
            self.sink.stop_music(track);
        }
    }

    pub fn current_music(&self) -> Option<MusicTrack> {
        self.current_music
    }
}

impl SoundTrigger for AudioManager {
    fn trigger(&mut self, effect: SoundEffect) {
        self.play(effect);
    }
}

/// Records triggers instead of playing them
impl SoundTrigger for Vec<SoundEffect> {
    fn trigger(&mut self, effect: SoundEffect) {
        self.push(effect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Recorder {
        effects: Rc<RefCell<Vec<(SoundEffect, f32)>>>,
        music: Rc<RefCell<Vec<String>>>,
    }

    impl AudioSink for Recorder {
        fn play_effect(&mut self, effect: SoundEffect, volume: f32) {
            self.effects.borrow_mut().push((effect, volume));
        }

        fn play_music(&mut self, track: MusicTrack, _volume: f32) {
            self.music.borrow_mut().push(format!("play {track:?}"));
        }

        fn stop_music(&mut self, track: MusicTrack) {
            self.music.borrow_mut().push(format!("stop {track:?}"));
        }
    }

    fn manager() -> (AudioManager, Rc<RefCell<Vec<(SoundEffect, f32)>>>, Rc<RefCell<Vec<String>>>) {
        let rec = Recorder::default();
        let effects = rec.effects.clone();
        let music = rec.music.clone();
        (AudioManager::new(Box::new(rec)), effects, music)
    }

    #[test]
    fn test_effect_volume_and_mute() {
        let (mut audio, effects, _) = manager();
        audio.set_master_volume(1.0);
        audio.set_sfx_volume(0.5);
        audio.trigger(SoundEffect::Laser);
        audio.set_muted(true);
        audio.trigger(SoundEffect::Impact);

        let got = effects.borrow();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0], (SoundEffect::Laser, 0.5));
    }

    #[test]
    fn test_music_switch_stops_previous() {
        let (mut audio, _, music) = manager();
        audio.play_music(MusicTrack::Game);
        audio.play_music(MusicTrack::Game);
        audio.play_music(MusicTrack::Menu);
        assert_eq!(
            *music.borrow(),
            vec!["play Game".to_string(), "stop Game".into(), "play Menu".into()]
        );
        assert_eq!(audio.current_music(), Some(MusicTrack::Menu));
    }

    #[test]
    fn test_settings_disable_effects() {
        let (mut audio, effects, _) = manager();
        let settings = Settings {
            sound_effects: false,
            ..Settings::default()
        };
        audio.apply_settings(&settings);
        audio.play(SoundEffect::Laser);
        assert!(effects.borrow().is_empty());
    }

    #[test]
    fn test_effect_names() {
        assert_eq!(SoundEffect::Laser.name(), "laser");
        assert_eq!(SoundEffect::Impact.name(), "impact");
    }
}
