//! Scene lifecycle host
//!
//! Scenes are registered by name. Switching calls `exit` on the old scene
//! and `enter` on the new one. Scenes never switch directly: they request a
//! [`Transition`] and the manager applies it after the call returns.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::assets::AssetProvider;
use crate::audio::AudioManager;
use crate::input::InputEvent;
use crate::renderer::RenderContext;
use crate::settings::SettingsProvider;
use crate::sim::LevelId;

pub const MENU: &str = "menu";
pub const PAUSE: &str = "pause";
pub const GAME_OVER: &str = "gameOver";
pub const LEVEL_COMPLETE: &str = "levelComplete";
pub const LEVEL_SELECT: &str = "levelSelect";

/// A scene change requested by the running scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    /// Freeze the level behind the pause overlay
    Pause { level: LevelId },
    /// Player ship fell off screen
    GameOver { level: LevelId },
    /// Every enemy of the level destroyed
    LevelComplete { level: LevelId },
    LevelSelect,
    /// Back to the frozen level
    Resume,
    /// Restart the frozen level and play it again
    Retry,
    /// Restart the frozen level and go to the main menu
    Menu,
}

/// Receives transition requests
pub trait SceneHost {
    fn request(&mut self, transition: Transition);
}

impl SceneHost for Vec<Transition> {
    fn request(&mut self, transition: Transition) {
        self.push(transition);
    }
}

/// Collaborators a scene may use during lifecycle calls
pub struct SceneEnv<'a> {
    pub settings: &'a dyn SettingsProvider,
    pub assets: &'a mut dyn AssetProvider,
    pub audio: &'a mut AudioManager,
}

pub trait Scene {
    fn name(&self) -> &str;

    fn enter(&mut self, env: &mut SceneEnv<'_>);

    fn exit(&mut self, env: &mut SceneEnv<'_>);

    fn update(&mut self, dt: f32, env: &mut SceneEnv<'_>, host: &mut dyn SceneHost);

    fn render(&self, ctx: &mut dyn RenderContext, assets: &dyn AssetProvider, time_ms: f64);

    fn handle_input(&mut self, _event: InputEvent, _host: &mut dyn SceneHost) {}

    /// Reset to a fresh start; scenes without state ignore it
    fn restart(&mut self, _env: &mut SceneEnv<'_>) {}
}

/// Named-scene state machine
#[derive(Default)]
pub struct SceneManager {
    scenes: HashMap<String, Box<dyn Scene>>,
    current: Option<String>,
    /// Frozen scene drawn behind an overlay (pause, game over, ...)
    background: Option<String>,
}

impl SceneManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_scene(&mut self, scene: Box<dyn Scene>) {
        self.scenes.insert(scene.name().to_string(), scene);
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn background(&self) -> Option<&str> {
        self.background.as_deref()
    }

    pub fn scene(&self, name: &str) -> Option<&dyn Scene> {
        self.scenes.get(name).map(|s| s.as_ref())
    }

    /// Switch scenes: exit the current one, then enter `name`.
    /// Unknown names leave the current scene running.
    pub fn set_state(&mut self, name: &str, env: &mut SceneEnv<'_>) -> bool {
        if !self.scenes.contains_key(name) {
            log::warn!("No scene named `{name}`");
            return false;
        }
        if let Some(current) = self.current.take() {
            if let Some(scene) = self.scenes.get_mut(&current) {
                scene.exit(env);
            }
        }
        log::info!("Scene -> {name}");
        self.current = Some(name.to_string());
        if let Some(scene) = self.scenes.get_mut(name) {
            scene.enter(env);
        }
        true
    }

    pub fn update(&mut self, dt: f32, env: &mut SceneEnv<'_>) {
        let mut requests = Vec::new();
        if let Some(scene) = self.current.as_ref().and_then(|n| self.scenes.get_mut(n)) {
            scene.update(dt, env, &mut requests);
        }
        self.apply(requests, env);
    }

    pub fn handle_input(&mut self, event: InputEvent, env: &mut SceneEnv<'_>) {
        let mut requests = Vec::new();
        if let Some(scene) = self.current.as_ref().and_then(|n| self.scenes.get_mut(n)) {
            scene.handle_input(event, &mut requests);
        }
        self.apply(requests, env);
    }

    /// Background first, then the current scene on top
    pub fn render(&self, ctx: &mut dyn RenderContext, assets: &dyn AssetProvider, time_ms: f64) {
        if let Some(bg) = self.background.as_ref().filter(|b| self.current.as_ref() != Some(*b)) {
            if let Some(scene) = self.scenes.get(bg) {
                scene.render(ctx, assets, time_ms);
            }
        }
        if let Some(scene) = self.current.as_ref().and_then(|n| self.scenes.get(n)) {
            scene.render(ctx, assets, time_ms);
        }
    }

    fn restart_background(&mut self, env: &mut SceneEnv<'_>) {
        if let Some(scene) = self.background.as_ref().and_then(|n| self.scenes.get_mut(n)) {
            scene.restart(env);
        }
    }

    fn apply(&mut self, requests: Vec<Transition>, env: &mut SceneEnv<'_>) {
        for t in requests {
            match t {
                Transition::Pause { level } => self.overlay(level, PAUSE, env),
                Transition::GameOver { level } => self.overlay(level, GAME_OVER, env),
                Transition::LevelComplete { level } => self.overlay(level, LEVEL_COMPLETE, env),
                Transition::LevelSelect => {
                    self.set_state(LEVEL_SELECT, env);
                }
                Transition::Resume => {
                    if let Some(bg) = self.background.take() {
                        self.set_state(&bg, env);
                    }
                }
                Transition::Retry => {
                    self.restart_background(env);
                    if let Some(bg) = self.background.take() {
                        self.set_state(&bg, env);
                    }
                }
                Transition::Menu => {
                    self.restart_background(env);
                    self.background = None;
                    self.set_state(MENU, env);
                }
            }
        }
    }

    fn overlay(&mut self, level: LevelId, target: &str, env: &mut SceneEnv<'_>) {
        if !self.scenes.contains_key(target) {
            log::warn!("No `{target}` scene registered; staying in {level}");
            return;
        }
        self.background = Some(level.scene_name().to_string());
        self.set_state(target, env);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::Loader;
    use crate::renderer::DrawList;
    use crate::settings::Settings;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    /// Scene that records lifecycle calls and emits a scripted transition
    struct Probe {
        name: String,
        log: Log,
        emit: Option<Transition>,
    }

    impl Scene for Probe {
        fn name(&self) -> &str {
            &self.name
        }

        fn enter(&mut self, _env: &mut SceneEnv<'_>) {
            self.log.borrow_mut().push(format!("enter {}", self.name));
        }

        fn exit(&mut self, _env: &mut SceneEnv<'_>) {
            self.log.borrow_mut().push(format!("exit {}", self.name));
        }

        fn update(&mut self, _dt: f32, _env: &mut SceneEnv<'_>, host: &mut dyn SceneHost) {
            if let Some(t) = self.emit.take() {
                host.request(t);
            }
        }

        fn render(&self, ctx: &mut dyn RenderContext, _assets: &dyn AssetProvider, _time_ms: f64) {
            ctx.text(glam::Vec2::ZERO, &self.name, 10.0, crate::renderer::WHITE);
        }

        fn restart(&mut self, _env: &mut SceneEnv<'_>) {
            self.log.borrow_mut().push(format!("restart {}", self.name));
        }
    }

    fn probe(name: &str, log: &Log, emit: Option<Transition>) -> Box<dyn Scene> {
        Box::new(Probe {
            name: name.to_string(),
            log: log.clone(),
            emit,
        })
    }

    #[test]
    fn test_set_state_exits_then_enters() {
        let log: Log = Rc::default();
        let settings = Settings::default();
        let mut assets = Loader::new();
        let mut audio = AudioManager::default();
        let mut env = SceneEnv {
            settings: &settings,
            assets: &mut assets,
            audio: &mut audio,
        };

        let mut mgr = SceneManager::new();
        mgr.add_scene(probe(MENU, &log, None));
        mgr.add_scene(probe("level1", &log, None));
        assert!(mgr.set_state(MENU, &mut env));
        assert!(mgr.set_state("level1", &mut env));
        assert!(!mgr.set_state("nowhere", &mut env));
        assert_eq!(mgr.current(), Some("level1"));
        assert_eq!(*log.borrow(), vec!["enter menu", "exit menu", "enter level1"]);
    }

    #[test]
    fn test_game_over_overlay_and_retry() {
        let log: Log = Rc::default();
        let settings = Settings::default();
        let mut assets = Loader::new();
        let mut audio = AudioManager::default();
        let mut env = SceneEnv {
            settings: &settings,
            assets: &mut assets,
            audio: &mut audio,
        };

        let mut mgr = SceneManager::new();
        mgr.add_scene(probe(
            "level2",
            &log,
            Some(Transition::GameOver { level: LevelId::Two }),
        ));
        mgr.add_scene(probe(GAME_OVER, &log, Some(Transition::Retry)));
        mgr.set_state("level2", &mut env);

        mgr.update(0.016, &mut env);
        assert_eq!(mgr.current(), Some(GAME_OVER));
        assert_eq!(mgr.background(), Some("level2"));

        // Overlay draws over the frozen level
        let mut list = DrawList::new();
        mgr.render(&mut list, &Loader::new(), 0.0);
        assert_eq!(list.texts().collect::<Vec<_>>(), vec!["level2", GAME_OVER]);

        mgr.update(0.016, &mut env);
        assert_eq!(mgr.current(), Some("level2"));
        assert_eq!(mgr.background(), None);
        assert_eq!(
            *log.borrow(),
            vec![
                "enter level2",
                "exit level2",
                "enter gameOver",
                "restart level2",
                "exit gameOver",
                "enter level2",
            ]
        );
    }

    #[test]
    fn test_missing_overlay_keeps_level_running() {
        let log: Log = Rc::default();
        let settings = Settings::default();
        let mut assets = Loader::new();
        let mut audio = AudioManager::default();
        let mut env = SceneEnv {
            settings: &settings,
            assets: &mut assets,
            audio: &mut audio,
        };

        let mut mgr = SceneManager::new();
        mgr.add_scene(probe(
            "level1",
            &log,
            Some(Transition::Pause { level: LevelId::One }),
        ));
        mgr.set_state("level1", &mut env);
        mgr.update(0.016, &mut env);
        assert_eq!(mgr.current(), Some("level1"));
        assert_eq!(mgr.background(), None);
    }
}
