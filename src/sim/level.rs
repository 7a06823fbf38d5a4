//! One playable level
//!
//! [`LevelSim`] owns everything a level needs between `enter` and `exit`:
//! the player, the entity store, timers, difficulty and the optional physics
//! world. The three levels differ only by their [`VariantDescriptor`].
//!
//! Frame order in [`LevelSim::update`]:
//! 1. physics step, contact resolution, read-back of falling bodies
//! 2. a destroyed player only keeps falling
//! 3. shoot cooldown, fire
//! 4. player movement or fall
//! 5. player bullets
//! 6. enemy spawn
//! 7. enemy steering and shooting
//! 8. enemy bullets, asteroids
//! 9. manual AABB collision when physics is off
//! 10. progress and completion
//! 11. poison
//!
//! Removals are compacted at the end of the frame.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::Serialize;

use super::aabb::{self, Bounded, Rect};
use super::damage::{
    BulletHit, PlayerHit, apply_asteroid_hit, apply_bullet_hit, apply_enemy_bullet_hit,
    apply_poison_tick,
};
use super::difficulty::DifficultyProfile;
use super::slab::EntityId;
use super::state::{Player, Poison, Projectile};
use super::store::{EntityCounts, EntityKind, EntityStore};
use super::variant::{
    BULLET_IMAGE, ENEMY_BULLET_IMAGE, LevelId, MENU_IMAGE, PLAYER_IMAGE, Placement, SteerContext,
    VariantDescriptor, steer,
};
use crate::assets::{AssetEntry, AssetProvider, LoadTicket};
use crate::audio::{MusicTrack, SoundEffect, SoundTrigger};
use crate::consts::{FALLING_ROTATION, LOW_HEALTH_BLINK_MS, LOW_HEALTH_FRACTION, TIMER_EPSILON};
use crate::error::Result;
use crate::input::{InputEvent, Key, KeyState, PointerId, TouchButtonId, TouchControls};
use crate::physics::{BodyTag, BodyType, Contact, PhysicsAdapter};
use crate::renderer::{Color, DrawCommand, RenderContext, hud, rgb};
use crate::scene::{Scene, SceneEnv, SceneHost, Transition};
use crate::settings::{Difficulty, SettingsProvider};
use crate::tuning::Tuning;

/// Top-left of the pause button
const MENU_BUTTON_POS: Vec2 = Vec2::new(20.0, 20.0);
/// The pause button is drawn at the menu image size times this
const MENU_BUTTON_SCALE: f32 = 2.5;

const BULLET_FALLBACK: Color = rgb(0xffff00, 1.0);
const ENEMY_FALLBACK: Color = rgb(0xff0000, 1.0);
const SHIELD_COLOR: Color = rgb(0x66ccff, 1.0);
const ASTEROID_COLOR: Color = rgb(0x8a7f72, 1.0);

/// Serializable summary of a level, for logs and the headless runner
#[derive(Debug, Clone, Serialize)]
pub struct LevelSnapshot {
    pub level: u8,
    pub difficulty: DifficultyProfile,
    pub progress: f32,
    pub completed: bool,
    pub enemies_spawned: u32,
    pub enemies_destroyed: u32,
    pub player: Player,
    pub poisoned: bool,
    pub entities: EntityCounts,
    pub physics: bool,
    pub is_loading: bool,
    pub assets_loaded: bool,
}

pub struct LevelSim {
    level: LevelId,
    variant: &'static VariantDescriptor,
    tuning: Tuning,
    seed: u64,
    rng: Pcg32,

    pub player: Player,
    pub store: EntityStore,
    pub poison: Poison,
    profile: DifficultyProfile,

    /// Seconds until the player may fire again
    shoot_cooldown: f32,
    spawn_timer: f32,
    enemies_spawned: u32,
    enemies_destroyed: u32,
    asteroid_timer: f32,
    progress: f32,
    completed: bool,

    is_loading: bool,
    assets_loaded: bool,
    load_generation: u64,

    keys: KeyState,
    touch: TouchControls,
    menu_button: Rect,

    physics: PhysicsAdapter,
}

impl LevelSim {
    /// Build a level in its initial state. Physics is brought up here; if it
    /// cannot be, the level silently uses manual collision.
    pub fn new(level: LevelId, tuning: Tuning, seed: u64) -> Self {
        let mut physics = PhysicsAdapter::new(&tuning.physics, tuning.physics_gravity());
        physics.initialize();

        Self {
            level,
            variant: level.descriptor(),
            seed,
            rng: Pcg32::seed_from_u64(seed),
            player: Player::new(&tuning.player),
            store: EntityStore::new(),
            poison: Poison::new(&tuning.poison),
            profile: DifficultyProfile::lookup(level, Difficulty::default()),
            shoot_cooldown: 0.0,
            spawn_timer: 0.0,
            enemies_spawned: 0,
            enemies_destroyed: 0,
            asteroid_timer: 0.0,
            progress: 0.0,
            completed: false,
            is_loading: false,
            assets_loaded: false,
            load_generation: 0,
            keys: KeyState::default(),
            touch: TouchControls::default(),
            menu_button: Rect::new(MENU_BUTTON_POS, Vec2::ZERO),
            physics,
            tuning,
        }
    }

    // === Accessors ===

    pub fn level(&self) -> LevelId {
        self.level
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn profile(&self) -> &DifficultyProfile {
        &self.profile
    }

    /// Percentage of the level's enemies destroyed, `[0, 100]`
    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn assets_loaded(&self) -> bool {
        self.assets_loaded
    }

    pub fn uses_physics(&self) -> bool {
        self.physics.is_ready()
    }

    pub fn touch_controls_mut(&mut self) -> &mut TouchControls {
        &mut self.touch
    }

    pub fn menu_button(&self) -> Rect {
        self.menu_button
    }

    pub fn snapshot(&self) -> LevelSnapshot {
        LevelSnapshot {
            level: self.level.number(),
            difficulty: self.profile,
            progress: self.progress,
            completed: self.completed,
            enemies_spawned: self.enemies_spawned,
            enemies_destroyed: self.enemies_destroyed,
            player: self.player.clone(),
            poisoned: self.poison.active,
            entities: self.store.counts(),
            physics: self.physics.is_ready(),
            is_loading: self.is_loading,
            assets_loaded: self.assets_loaded,
        }
    }

    // === Lifecycle ===

    /// Start the level: pick up the difficulty and request its assets
    pub fn enter(&mut self, settings: &dyn SettingsProvider) -> LoadTicket {
        log::info!("Entering {}", self.level);
        self.touch.set_enabled(settings.touch_controls());
        self.configure_difficulty(settings.difficulty().as_str());
        self.issue_load()
    }

    pub fn exit(&mut self) {
        log::info!("Leaving {}", self.level);
    }

    /// Return to the initial state, re-read the difficulty and reload assets
    pub fn restart(&mut self, settings: &dyn SettingsProvider) -> LoadTicket {
        log::debug!("Restarting {}", self.level);

        self.rng = Pcg32::seed_from_u64(self.seed);
        self.player = Player::new(&self.tuning.player);
        self.store.clear();
        self.poison.clear();
        self.physics.clear();

        self.shoot_cooldown = 0.0;
        self.spawn_timer = 0.0;
        self.enemies_spawned = 0;
        self.enemies_destroyed = 0;
        self.asteroid_timer = 0.0;
        self.progress = 0.0;
        self.completed = false;
        self.keys = KeyState::default();
        self.touch.reset();

        self.configure_difficulty(settings.difficulty().as_str());
        self.issue_load()
    }

    /// Apply a difficulty tier by name; unknown names fall back to medium
    pub fn configure_difficulty(&mut self, tier: &str) {
        self.profile = DifficultyProfile::for_tier(self.level, tier);
        log::info!(
            "{} difficulty `{}`: {} enemies, spawn every {}s, {} hp, {} damage",
            self.level,
            tier,
            self.profile.max_enemies,
            self.profile.spawn_interval,
            self.profile.enemy_health,
            self.profile.enemy_damage
        );
    }

    // === Assets ===

    /// Images this level draws
    pub fn manifest(&self) -> Vec<AssetEntry> {
        self.variant.manifest()
    }

    fn issue_load(&mut self) -> LoadTicket {
        self.load_generation += 1;
        self.is_loading = true;
        self.assets_loaded = false;
        LoadTicket {
            generation: self.load_generation,
        }
    }

    /// Report the outcome of a load. Returns false for a stale ticket, which
    /// is ignored.
    pub fn finish_loading(&mut self, ticket: LoadTicket, result: Result<()>) -> bool {
        if ticket.generation != self.load_generation {
            log::warn!(
                "Ignoring stale asset load for {} (ticket {}, current {})",
                self.level,
                ticket.generation,
                self.load_generation
            );
            return false;
        }

        self.is_loading = false;
        match result {
            Ok(()) => {
                self.assets_loaded = true;
                log::info!("{} assets loaded", self.level);
            }
            Err(e) => {
                self.assets_loaded = false;
                log::error!("Error loading {} assets: {e}", self.level);
            }
        }
        true
    }

    /// Pick up image-dependent layout (the pause button size)
    pub fn sync_assets(&mut self, assets: &dyn AssetProvider) {
        if let Some(menu) = assets.image(MENU_IMAGE) {
            self.menu_button.size = menu.size.as_vec2() * MENU_BUTTON_SCALE;
        }
    }

    /// Load the manifest synchronously and complete `ticket` with the result
    pub fn load_assets_blocking(&mut self, ticket: LoadTicket, assets: &mut dyn AssetProvider) -> bool {
        let result = assets.load_images(&self.manifest());
        let applied = self.finish_loading(ticket, result);
        if applied && self.assets_loaded {
            self.sync_assets(&*assets);
        }
        applied
    }

    // === Input ===

    pub fn set_keys(&mut self, keys: KeyState) {
        self.keys = keys;
    }

    pub fn handle_key_down(&mut self, key: Key, host: &mut dyn SceneHost) {
        if key == Key::Pause {
            log::info!("Pausing {}", self.level);
            host.request(Transition::Pause { level: self.level });
            return;
        }
        self.keys.set(key, true);
    }

    pub fn handle_key_up(&mut self, key: Key) {
        self.keys.set(key, false);
    }

    /// Click or tap. The pause button wins over the touch buttons.
    pub fn handle_click(&mut self, pos: Vec2, pointer: PointerId, host: &mut dyn SceneHost) -> bool {
        let button = self.menu_button;
        if button.size.x > 0.0 && button.size.y > 0.0 && button.contains_point(pos) {
            log::info!("Menu button pressed, pausing {}", self.level);
            host.request(Transition::Pause { level: self.level });
            return true;
        }
        self.touch.touch_start(pos, pointer);
        false
    }

    pub fn handle_pointer_move(&mut self, pos: Vec2, pointer: PointerId) {
        self.touch.touch_move(pos, pointer);
    }

    pub fn handle_pointer_up(&mut self, pointer: PointerId) {
        self.touch.touch_end(pointer);
    }

    pub fn handle_input(&mut self, event: InputEvent, host: &mut dyn SceneHost) {
        match event {
            InputEvent::KeyDown(key) => self.handle_key_down(key, host),
            InputEvent::KeyUp(key) => self.handle_key_up(key),
            InputEvent::Click { pos, pointer } => {
                self.handle_click(pos, pointer, host);
            }
            InputEvent::PointerMove { pos, pointer } => self.handle_pointer_move(pos, pointer),
            InputEvent::PointerUp { pointer } => self.handle_pointer_up(pointer),
        }
    }

    /// Demo input: line up with the closest live enemy and keep firing
    pub fn autopilot(&self) -> KeyState {
        let center = self.player.bounds().center();
        let target = self
            .store
            .enemies
            .values()
            .filter(|e| !e.is_falling())
            .min_by(|a, b| a.pos.x.total_cmp(&b.pos.x))
            .map(|e| e.bounds().center().y);

        match target {
            Some(y) => KeyState {
                up: center.y > y + 10.0,
                down: center.y < y - 10.0,
                shoot: true,
            },
            None => KeyState::default(),
        }
    }

    // === Update ===

    /// Advance one frame. Inert while loading or after a failed load.
    pub fn update(&mut self, dt: f32, host: &mut dyn SceneHost, sfx: &mut dyn SoundTrigger) {
        if self.is_loading || !self.assets_loaded {
            return;
        }
        self.advance(dt, host, sfx);
        self.end_frame();
    }

    fn advance(&mut self, dt: f32, host: &mut dyn SceneHost, sfx: &mut dyn SoundTrigger) {
        if self.physics.is_ready() {
            let contacts = self.physics.step(dt);
            for contact in contacts {
                self.resolve_contact(contact, sfx);
            }
            self.pull_falling_bodies();
        }

        if self.player.destroyed {
            self.update_player(dt, host);
            return;
        }

        self.update_shooting(dt, sfx);
        self.update_player(dt, host);
        self.store.update_bullets(dt, self.tuning.viewport.x);
        self.update_enemy_spawn(dt);
        self.update_enemies(dt);
        self.store.update_enemy_bullets(dt);
        self.update_asteroids(dt);
        if !self.physics.is_ready() {
            self.check_collisions(sfx);
        }
        self.update_progress(host);
        self.update_poison(dt);
    }

    fn update_shooting(&mut self, dt: f32, sfx: &mut dyn SoundTrigger) {
        if self.shoot_cooldown > 0.0 {
            self.shoot_cooldown -= dt;
        }
        let wants = self.keys.shoot || self.touch.is_pressed(TouchButtonId::Shoot);
        if wants && self.shoot_cooldown <= 0.0 {
            self.shoot(sfx);
        }
    }

    fn shoot(&mut self, sfx: &mut dyn SoundTrigger) {
        let size = self.tuning.bullet.size;
        let p = &self.player;
        self.store.add_bullet(Projectile {
            pos: Vec2::new(p.pos.x + p.size.x, p.pos.y + p.size.y / 2.0 - size.y / 2.0),
            size,
            speed: self.tuning.bullet.speed,
            poison: false,
        });
        self.shoot_cooldown = self.tuning.player.shoot_cooldown;
        sfx.trigger(SoundEffect::Laser);
    }

    fn update_player(&mut self, dt: f32, host: &mut dyn SceneHost) {
        let height = self.tuning.viewport.y;

        if self.player.is_falling() {
            if !self.falls_by_physics(&BodyTag::player()) {
                let dy = self.player.fall.integrate(dt);
                self.player.pos.y += dy;
            }
            if !self.player.destroyed && self.player.pos.y > height {
                self.player.destroyed = true;
                log::info!("Game over on {}", self.level);
                host.request(Transition::GameOver { level: self.level });
            }
            return;
        }

        let up = self.keys.up || self.touch.is_pressed(TouchButtonId::Up);
        let down = self.keys.down || self.touch.is_pressed(TouchButtonId::Down);
        let player = &mut self.player;
        player.velocity_y = 0.0;
        if up {
            player.velocity_y = -player.speed;
        }
        if down {
            player.velocity_y = player.speed;
        }
        player.pos.y = (player.pos.y + player.velocity_y * dt).clamp(0.0, height - player.size.y);
    }

    fn update_enemy_spawn(&mut self, dt: f32) {
        if self.enemies_spawned >= self.profile.max_enemies {
            return;
        }
        self.spawn_timer += dt;
        if self.spawn_timer + TIMER_EPSILON < self.profile.spawn_interval {
            return;
        }
        self.spawn_timer = 0.0;

        let enemy = self
            .variant
            .spawn_enemy(&self.tuning, &self.profile, &self.player, &mut self.rng);
        log::debug!(
            "Spawned enemy {}/{} at y={:.0}{}",
            self.enemies_spawned + 1,
            self.profile.max_enemies,
            enemy.pos.y,
            if enemy.shield.is_some() { " (shielded)" } else { "" }
        );
        self.store.add_enemy(enemy);
        self.enemies_spawned += 1;
    }

    fn update_enemies(&mut self, dt: f32) {
        let ctx = SteerContext {
            viewport: self.tuning.viewport,
            player_right: self.player.pos.x + self.player.size.x,
            hold_distance: self.tuning.enemy.hold_distance,
            reversal_min: self.tuning.enemy.reversal_min,
            reversal_jitter: self.tuning.enemy.reversal_jitter,
        };
        let cooldown = self.profile.shoot_cooldown;
        let variant = self.variant;
        let tuning = &self.tuning;
        let physics = &self.physics;
        let rng = &mut self.rng;
        let mut shots = Vec::new();

        self.store.update_enemies(dt, ctx.viewport.y, |id, enemy, dt| {
            if enemy.is_falling() {
                let tag = BodyTag::entity(EntityKind::Enemy, id);
                if physics.body_type(&tag.key()) != Some(BodyType::Dynamic) {
                    let dy = enemy.fall.integrate(dt);
                    enemy.pos.y += dy;
                }
                return;
            }

            steer(enemy, &ctx, rng, dt);

            enemy.shoot_timer += dt;
            if enemy.shoot_timer + TIMER_EPSILON >= cooldown {
                enemy.shoot_timer = 0.0;
                shots.push(variant.enemy_bullet(tuning, enemy, rng));
            }
        });

        for bullet in shots {
            self.store.add_enemy_bullet(bullet);
        }
    }

    fn update_asteroids(&mut self, dt: f32) {
        if !self.variant.asteroids {
            return;
        }
        let a = &self.tuning.asteroid;
        self.asteroid_timer += dt;
        if self.asteroid_timer + TIMER_EPSILON >= a.spawn_interval
            && self.store.asteroids.len() < a.max_alive
        {
            self.asteroid_timer = 0.0;
            let asteroid = self.variant.spawn_asteroid(&self.tuning, &mut self.rng);
            log::debug!("Asteroid incoming at y={:.0}", asteroid.pos.y);
            self.store.add_asteroid(asteroid);
        }
        self.store.update_asteroids(dt);
    }

    fn check_collisions(&mut self, sfx: &mut dyn SoundTrigger) {
        let mut destroyed = 0;
        aabb::bullets_vs_enemies(&mut self.store.bullets, &mut self.store.enemies, |_, enemy, _, _| {
            if apply_bullet_hit(enemy) == BulletHit::Destroyed {
                destroyed += 1;
            }
        });
        self.record_destroyed(destroyed);

        let damage = self.profile.enemy_damage;
        let poison = &mut self.poison;
        aabb::enemy_bullets_vs_player(&mut self.store.enemy_bullets, &mut self.player, |bullet, player, _| {
            announce_player_hit(apply_enemy_bullet_hit(player, poison, bullet, damage), sfx);
        });
        aabb::asteroids_vs_player(&mut self.store.asteroids, &mut self.player, |asteroid, player, _| {
            announce_player_hit(apply_asteroid_hit(player, poison, asteroid), sfx);
        });
    }

    /// Physics contact: same rules as the AABB scans
    fn resolve_contact(&mut self, contact: Contact, sfx: &mut dyn SoundTrigger) {
        if let Some((bullet, enemy)) = contact.between(EntityKind::PlayerBullet, EntityKind::Enemy) {
            let (Some(bullet_id), Some(enemy_id)) = (bullet.id, enemy.id) else {
                return;
            };
            if !self.store.bullets.contains(bullet_id) {
                return;
            }
            let Some(target) = self.store.enemies.get_mut(enemy_id) else {
                return;
            };
            let hit = apply_bullet_hit(target);
            if hit == BulletHit::Ignored {
                return;
            }
            self.store.bullets.mark_removed(bullet_id);
            if hit == BulletHit::Destroyed {
                self.record_destroyed(1);
                self.physics.set_body_type(&enemy.key(), BodyType::Dynamic);
            }
        } else if let Some((bullet, _)) = contact.between(EntityKind::EnemyBullet, EntityKind::Player) {
            let Some(id) = bullet.id else {
                return;
            };
            let Some(projectile) = self.store.enemy_bullets.get(id) else {
                return;
            };
            let hit =
                apply_enemy_bullet_hit(&mut self.player, &mut self.poison, projectile, self.profile.enemy_damage);
            self.after_player_contact(hit, |store| store.enemy_bullets.mark_removed(id), sfx);
        } else if let Some((asteroid, _)) = contact.between(EntityKind::Asteroid, EntityKind::Player) {
            let Some(id) = asteroid.id else {
                return;
            };
            let Some(rock) = self.store.asteroids.get(id) else {
                return;
            };
            let hit = apply_asteroid_hit(&mut self.player, &mut self.poison, rock);
            self.after_player_contact(hit, |store| store.asteroids.mark_removed(id), sfx);
        }
    }

    fn after_player_contact<F>(&mut self, hit: PlayerHit, consume: F, sfx: &mut dyn SoundTrigger)
    where
        F: FnOnce(&mut EntityStore) -> bool,
    {
        if !hit.landed() {
            return;
        }
        consume(&mut self.store);
        announce_player_hit(hit, sfx);
        if matches!(hit, PlayerHit::Lethal { .. }) {
            self.physics.set_body_type(&BodyTag::player().key(), BodyType::Dynamic);
        }
    }

    fn record_destroyed(&mut self, count: u32) {
        if count == 0 {
            return;
        }
        self.enemies_destroyed += count;
        log::debug!(
            "Enemy destroyed ({}/{})",
            self.enemies_destroyed,
            self.profile.max_enemies
        );
    }

    fn update_progress(&mut self, host: &mut dyn SceneHost) {
        let max = self.profile.max_enemies;
        self.progress = if max == 0 {
            100.0
        } else {
            (self.enemies_destroyed as f32 / max as f32 * 100.0).min(100.0)
        };

        if !self.completed && self.enemies_destroyed >= max {
            self.completed = true;
            log::info!("{} complete", self.level);
            host.request(Transition::LevelComplete { level: self.level });
        }
    }

    fn update_poison(&mut self, dt: f32) {
        let tick = self.poison.advance(dt);
        if let Some(damage) = tick.damage {
            if let PlayerHit::Lethal { .. } = apply_poison_tick(&mut self.player, damage) {
                log::info!("Player ship destroyed by poison");
            }
        }
        if tick.expired {
            log::debug!("Poison wore off");
        }
    }

    // === Physics bookkeeping ===

    fn falls_by_physics(&self, tag: &BodyTag) -> bool {
        self.physics.body_type(&tag.key()) == Some(BodyType::Dynamic)
    }

    /// Copy gravity-driven positions back onto falling entities
    fn pull_falling_bodies(&mut self) {
        if self.player.is_falling() {
            if let Some(pos) = self.physics.body_position(&BodyTag::player().key()) {
                if self.falls_by_physics(&BodyTag::player()) {
                    self.player.pos = pos;
                }
            }
        }
        for (id, enemy) in self.store.enemies.iter_mut() {
            if !enemy.is_falling() {
                continue;
            }
            let key = BodyTag::entity(EntityKind::Enemy, id).key();
            if self.physics.body_type(&key) == Some(BodyType::Dynamic) {
                if let Some(pos) = self.physics.body_position(&key) {
                    enemy.pos = pos;
                }
            }
        }
    }

    /// Mirror the store into the physics world: release removed bodies,
    /// create missing ones and move the kinematic ones.
    fn push_bodies(&mut self) {
        let mut live: Vec<(BodyTag, Rect, bool)> = vec![(
            BodyTag::player(),
            self.player.bounds(),
            self.player.is_falling(),
        )];
        live.extend(tagged(EntityKind::PlayerBullet, self.store.bullets.iter()));
        live.extend(tagged(EntityKind::EnemyBullet, self.store.enemy_bullets.iter()));
        live.extend(
            self.store
                .enemies
                .iter()
                .map(|(id, e)| (BodyTag::entity(EntityKind::Enemy, id), e.bounds(), e.is_falling())),
        );
        live.extend(tagged(EntityKind::Asteroid, self.store.asteroids.iter()));

        for (tag, rect, falling) in live {
            let key = tag.key();
            match self.physics.body_type(&key) {
                None => {
                    let body_type = if falling { BodyType::Dynamic } else { BodyType::Kinematic };
                    self.physics.create_body(tag, rect, body_type);
                }
                Some(BodyType::Dynamic) => {}
                Some(_) if falling => self.physics.set_body_type(&key, BodyType::Dynamic),
                Some(_) => self.physics.set_position(&key, rect.pos),
            }
        }
    }

    fn end_frame(&mut self) {
        self.store.compact();
        let removed = self.store.take_removed();
        if !self.physics.is_ready() {
            return;
        }
        for (kind, id) in removed {
            self.physics.remove_body(&BodyTag::entity(kind, id).key());
        }
        self.push_bodies();
    }

    // === Render ===

    pub fn render(&self, ctx: &mut dyn RenderContext, assets: &dyn AssetProvider, time_ms: f64) {
        let viewport = self.tuning.viewport;
        if self.is_loading {
            hud::loading_screen(ctx, viewport, self.level.number(), assets.progress(), time_ms);
            return;
        }

        hud::clear(ctx, viewport);
        self.render_layers(ctx, assets);
        self.render_entities(ctx, assets, time_ms);
        self.render_hud(ctx, assets, time_ms);
    }

    fn render_layers(&self, ctx: &mut dyn RenderContext, assets: &dyn AssetProvider) {
        let viewport = self.tuning.viewport;
        for layer in self.variant.layers {
            let Some(image) = assets.image(layer.key) else {
                continue;
            };
            let natural = image.size.as_vec2();
            let rect = match layer.placement {
                Placement::Fill => Rect::new(Vec2::ZERO, viewport),
                Placement::Ground { x, scale } => {
                    let size = natural * scale;
                    Rect::new(Vec2::new(x, viewport.y - size.y), size)
                }
                Placement::At { pos, scale } => Rect::new(pos, natural * scale),
            };
            ctx.image(layer.key, rect, 0.0, 1.0);
        }
    }

    fn render_entities(&self, ctx: &mut dyn RenderContext, assets: &dyn AssetProvider, time_ms: f64) {
        for bullet in self.store.bullets.values() {
            sprite(ctx, assets, BULLET_IMAGE, bullet.bounds(), 0.0, 1.0, BULLET_FALLBACK);
        }
        for bullet in self.store.enemy_bullets.values() {
            sprite(ctx, assets, ENEMY_BULLET_IMAGE, bullet.bounds(), 0.0, 1.0, ENEMY_FALLBACK);
        }

        if !self.player.destroyed {
            let blink = self.player.health_fraction() < LOW_HEALTH_FRACTION
                && (time_ms / LOW_HEALTH_BLINK_MS).floor() as i64 % 2 == 0;
            let alpha = if blink { 0.5 } else { 1.0 };
            sprite(ctx, assets, PLAYER_IMAGE, self.player.bounds(), 0.0, alpha, BULLET_FALLBACK);
        }

        for enemy in self.store.enemies.values() {
            let rect = enemy.bounds();
            if enemy.is_falling() {
                sprite(ctx, assets, self.variant.enemy_image, rect, FALLING_ROTATION, 1.0, ENEMY_FALLBACK);
                continue;
            }
            sprite(ctx, assets, self.variant.enemy_image, rect, 0.0, 1.0, ENEMY_FALLBACK);
            hud::health_bar(
                ctx,
                Rect::from_xywh(rect.pos.x, rect.pos.y - 10.0, rect.size.x, 6.0),
                enemy.health_fraction(),
            );
            if let Some(shield) = enemy.shield.filter(|s| s.is_up()) {
                let mut color = SHIELD_COLOR;
                color[3] = 0.3 + 0.7 * shield.health as f32 / shield.max_health.max(1) as f32;
                ctx.draw(DrawCommand::Circle {
                    center: rect.center(),
                    radius: rect.size.max_element() / 2.0 + 5.0,
                    fill: [color[0], color[1], color[2], 0.15],
                    stroke: Some(color),
                });
            }
        }

        for asteroid in self.store.asteroids.values() {
            ctx.draw(DrawCommand::Rock {
                rect: asteroid.bounds(),
                rotation: asteroid.rotation,
                color: ASTEROID_COLOR,
            });
        }
    }

    fn render_hud(&self, ctx: &mut dyn RenderContext, assets: &dyn AssetProvider, time_ms: f64) {
        let width = self.tuning.viewport.x;

        if let Some(menu) = assets.image(MENU_IMAGE) {
            let size = menu.size.as_vec2() * MENU_BUTTON_SCALE;
            ctx.image(MENU_IMAGE, Rect::new(self.menu_button.pos, size), 0.0, 1.0);
        }

        hud::progress_bar(
            ctx,
            hud::bar_rect(width, hud::PROGRESS_BAR_Y),
            self.progress,
            hud::PROGRESS_FILL,
            "Progress",
        );
        let health_bar = hud::bar_rect(width, hud::HEALTH_BAR_Y);
        hud::progress_bar(
            ctx,
            health_bar,
            self.player.health_fraction() * 100.0,
            hud::HEALTH_FILL,
            "Health",
        );

        if self.poison.active {
            hud::poison_indicator(
                ctx,
                health_bar.pos + Vec2::new(0.0, 30.0),
                self.poison.duration,
                self.poison.max_duration,
                time_ms,
            );
        }

        hud::touch_controls(ctx, &self.touch);
    }
}

fn tagged<'a, T: Bounded + 'a>(
    kind: EntityKind,
    iter: impl Iterator<Item = (EntityId, &'a T)>,
) -> impl Iterator<Item = (BodyTag, Rect, bool)> {
    iter.map(move |(id, e)| (BodyTag::entity(kind, id), e.bounds(), false))
}

/// Image if loaded, colored box otherwise
fn sprite(
    ctx: &mut dyn RenderContext,
    assets: &dyn AssetProvider,
    key: &str,
    rect: Rect,
    rotation: f32,
    alpha: f32,
    fallback: Color,
) {
    if assets.image(key).is_some() {
        ctx.image(key, rect, rotation, alpha);
    } else {
        let mut color = fallback;
        color[3] *= alpha;
        ctx.fill_rect(rect, color);
    }
}

fn announce_player_hit(hit: PlayerHit, sfx: &mut dyn SoundTrigger) {
    if !hit.landed() {
        return;
    }
    sfx.trigger(SoundEffect::Impact);
    if let PlayerHit::Lethal { .. } = hit {
        log::info!("Player ship destroyed");
    }
}

impl Scene for LevelSim {
    fn name(&self) -> &str {
        self.level.scene_name()
    }

    fn enter(&mut self, env: &mut SceneEnv<'_>) {
        let ticket = LevelSim::enter(self, env.settings);
        env.audio.play_music(MusicTrack::Game);
        self.load_assets_blocking(ticket, &mut *env.assets);
    }

    fn exit(&mut self, env: &mut SceneEnv<'_>) {
        LevelSim::exit(self);
        env.audio.stop_music();
        env.audio.play_music(MusicTrack::Menu);
    }

    fn update(&mut self, dt: f32, env: &mut SceneEnv<'_>, host: &mut dyn SceneHost) {
        LevelSim::update(self, dt, host, &mut *env.audio);
    }

    fn render(&self, ctx: &mut dyn RenderContext, assets: &dyn AssetProvider, time_ms: f64) {
        LevelSim::render(self, ctx, assets, time_ms);
    }

    fn handle_input(&mut self, event: InputEvent, host: &mut dyn SceneHost) {
        LevelSim::handle_input(self, event, host);
    }

    fn restart(&mut self, env: &mut SceneEnv<'_>) {
        let ticket = LevelSim::restart(self, env.settings);
        self.load_assets_blocking(ticket, &mut *env.assets);
    }
}
