//! Game state and core simulation types
//!
//! The authoritative run snapshot: entity store, progression counters,
//! timers, the seeded RNG and the upgrade pool.

use std::collections::BTreeMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::motion::MotionState;
use super::rng::SimRng;
use super::upgrades::{UpgradeId, initial_pool};
use crate::balance::{INITIAL_XP_NEEDED, ORB_BASE_DAMAGE, StartStats};
use crate::consts::*;
use crate::meta::MetaSave;

/// Entity identifier; monotonically increasing, never reused within a run
pub type EntityId = u32;

/// Current phase of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Active gameplay
    Running,
    /// Level-up fired; waiting for an upgrade choice
    UpgradeChoice,
    /// Pause menu open
    Paused,
    /// Run ended (terminal)
    GameOver,
}

/// Entity discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Player,
    Mob,
    Projectile,
    Xp,
    Shard,
    Particle,
}

/// Player attributes, including power counters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub hp: f32,
    pub max_hp: f32,
    pub damage: f32,
    pub speed: f32,
    pub attack_speed: f32,
    pub projectile_speed: f32,
    pub pickup_range: f32,
    /// Remaining invulnerability seconds
    pub invuln: f32,
    /// HP per second
    pub regen: f32,
    pub xp_gain: f32,
    pub aura_level: u32,
    pub orb_count: u32,
    /// Per-hit orb damage
    pub orb_damage: f32,
}

impl PlayerStats {
    pub fn from_start(stats: &StartStats) -> Self {
        Self {
            hp: stats.hp,
            max_hp: stats.max_hp,
            damage: stats.damage,
            speed: stats.speed,
            attack_speed: stats.attack_speed,
            projectile_speed: stats.projectile_speed,
            pickup_range: stats.pickup_range,
            invuln: 0.0,
            regen: stats.regen,
            xp_gain: stats.xp_gain,
            aura_level: 0,
            orb_count: 0,
            orb_damage: ORB_BASE_DAMAGE,
        }
    }
}

/// Mob attributes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MobStats {
    pub hp: f32,
    pub max_hp: f32,
    pub damage: f32,
    pub speed: f32,
    pub elite: bool,
    /// Run time of the last orb hit (shared by every orb)
    pub last_orb_hit: Option<f32>,
}

/// Kind-specific attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Body {
    Player(PlayerStats),
    Mob(MobStats),
    Projectile { damage: f32, life: f32 },
    Xp { value: f32, elite: bool },
    Shard { value: u32 },
    /// Cosmetic; `alpha` fades over the last moments of `life`
    Particle { life: f32, alpha: f32 },
}

/// Any simulated object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub body: Body,
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self.body {
            Body::Player(_) => EntityKind::Player,
            Body::Mob(_) => EntityKind::Mob,
            Body::Projectile { .. } => EntityKind::Projectile,
            Body::Xp { .. } => EntityKind::Xp,
            Body::Shard { .. } => EntityKind::Shard,
            Body::Particle { .. } => EntityKind::Particle,
        }
    }

    pub fn as_mob(&self) -> Option<&MobStats> {
        match &self.body {
            Body::Mob(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_mob_mut(&mut self) -> Option<&mut MobStats> {
        match &mut self.body {
            Body::Mob(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_player(&self) -> Option<&PlayerStats> {
        match &self.body {
            Body::Player(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_player_mut(&mut self) -> Option<&mut PlayerStats> {
        match &mut self.body {
            Body::Player(p) => Some(p),
            _ => None,
        }
    }
}

/// Final totals of a run, reported once at game over
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub time: f32,
    pub kills: u32,
    pub shards: u32,
}

/// Side effects the presentation layer reacts to, emitted once per occurrence
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    Spawned { id: EntityId, kind: EntityKind },
    EliteSpawned { id: EntityId },
    Removed { id: EntityId, kind: EntityKind },
    ProjectileFired { id: EntityId },
    MobHit { id: EntityId, damage: f32 },
    MobKilled { id: EntityId, elite: bool },
    PlayerDamaged { damage: f32, hp: f32 },
    XpCollected { value: f32 },
    ShardCollected { value: u32 },
    LevelUp { level: u32, choices: Vec<UpgradeId> },
    UpgradeChosen { id: UpgradeId },
    UpgradeCursor { index: usize },
    Paused,
    Resumed,
    StatsToggled { visible: bool },
    GameOver(RunSummary),
}

/// Per-run configuration derived from settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunConfig {
    pub seed: u32,
    /// Play-area size; the rectangle spans `[0, w] x [0, h]`
    pub arena: Vec2,
    /// Number of upgrades offered per level-up
    pub upgrade_choices: usize,
    /// Seconds the moving flag outlives the last movement
    pub move_grace: f32,
    pub anim_stiffness: f32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed: 12345,
            arena: Vec2::new(DEFAULT_ARENA_WIDTH, DEFAULT_ARENA_HEIGHT),
            upgrade_choices: 3,
            move_grace: 0.12,
            anim_stiffness: super::motion::DEFAULT_STIFFNESS,
        }
    }
}

/// Complete run state
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub config: RunConfig,
    /// Elapsed run seconds
    pub time: f32,
    pub player_id: EntityId,
    /// Entity store, iterated in id order
    pub entities: BTreeMap<EntityId, Entity>,
    next_id: EntityId,
    pub spawn_timer: f32,
    pub projectile_timer: f32,
    /// Last minute an elite was spawned for
    pub last_elite_minute: u32,
    pub xp: f32,
    pub level: u32,
    pub xp_needed: u32,
    pub kills: u32,
    /// Gameplay randomness (spawns, upgrade offers, loot)
    pub rng: SimRng,
    /// Cosmetic randomness (particles); never touches gameplay
    pub cosmetic_rng: SimRng,
    pub phase: GamePhase,
    pub upgrade_pool: Vec<UpgradeId>,
    pub offered_upgrades: Vec<UpgradeId>,
    /// Highlighted offer for navigate/confirm intents
    pub upgrade_cursor: usize,
    /// False once game over has been triggered
    pub run_active: bool,
    pub start_stats: StartStats,
    pub meta: MetaSave,
    /// Shards collected this run, merged into `meta` at game over
    pub run_shards: u32,
    pub motion: MotionState,
    pub stats_visible: bool,
    /// Events raised since the last drain
    pub(crate) events: Vec<GameEvent>,
}

impl GameState {
    /// Create a run with the player at the arena center
    pub fn new(config: RunConfig, start_stats: StartStats, meta: MetaSave) -> Self {
        let mut state = Self {
            config,
            time: 0.0,
            player_id: 0,
            entities: BTreeMap::new(),
            next_id: 0,
            spawn_timer: 0.0,
            projectile_timer: 0.0,
            last_elite_minute: 0,
            xp: 0.0,
            level: 1,
            xp_needed: INITIAL_XP_NEEDED,
            kills: 0,
            rng: SimRng::new(config.seed),
            cosmetic_rng: SimRng::cosmetic(config.seed),
            phase: GamePhase::Running,
            upgrade_pool: initial_pool(),
            offered_upgrades: Vec::new(),
            upgrade_cursor: 0,
            run_active: true,
            start_stats,
            meta,
            run_shards: 0,
            motion: MotionState::default(),
            stats_visible: false,
            events: Vec::new(),
        };

        let id = state.next_entity_id();
        state.player_id = id;
        state.entities.insert(
            id,
            Entity {
                id,
                pos: config.arena * 0.5,
                vel: Vec2::ZERO,
                radius: PLAYER_RADIUS,
                body: Body::Player(PlayerStats::from_start(&start_stats)),
            },
        );
        state
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Next id that will be assigned
    pub fn peek_next_id(&self) -> EntityId {
        self.next_id
    }

    /// True while the tick must not advance
    pub fn paused(&self) -> bool {
        self.phase != GamePhase::Running
    }

    pub fn has_player(&self) -> bool {
        self.entities
            .get(&self.player_id)
            .is_some_and(|e| e.kind() == EntityKind::Player)
    }

    /// The player entity.
    ///
    /// # Panics
    /// If the player was removed from the store, which is a programming error.
    pub fn player(&self) -> &Entity {
        match self.entities.get(&self.player_id) {
            Some(e) => e,
            None => panic!("player entity {} missing from store", self.player_id),
        }
    }

    /// Mutable player entity. Panics like [`GameState::player`].
    pub fn player_mut(&mut self) -> &mut Entity {
        let id = self.player_id;
        match self.entities.get_mut(&id) {
            Some(e) => e,
            None => panic!("player entity {id} missing from store"),
        }
    }

    /// Copy of the player's stats
    pub fn player_stats(&self) -> PlayerStats {
        match self.player().as_player() {
            Some(p) => *p,
            None => panic!("entity {} is not the player", self.player_id),
        }
    }

    pub fn player_stats_mut(&mut self) -> &mut PlayerStats {
        let id = self.player_id;
        match self.player_mut().as_player_mut() {
            Some(p) => p,
            None => panic!("entity {id} is not the player"),
        }
    }

    /// Number of live entities of a kind
    pub fn count(&self, kind: EntityKind) -> usize {
        self.entities.values().filter(|e| e.kind() == kind).count()
    }

    /// Record an event for the host
    pub(crate) fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Take every event raised since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Summary of the run so far
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            time: self.time,
            kills: self.kills,
            shards: self.run_shards,
        }
    }
}

/// Start a run: build the state and return it with the player's id
pub fn create_run(
    config: RunConfig,
    start_stats: StartStats,
    meta: MetaSave,
) -> (GameState, EntityId) {
    let state = GameState::new(config, start_stats, meta);
    let player_id = state.player_id;
    log::info!(
        "Run started (seed {}, hp {}, damage {})",
        config.seed,
        start_stats.max_hp,
        start_stats.damage
    );
    (state, player_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_state() -> GameState {
        GameState::new(RunConfig::default(), StartStats::BASE, MetaSave::default())
    }

    #[test]
    fn test_run_starts_with_single_player() {
        let (state, player_id) = create_run(RunConfig::default(), StartStats::BASE, MetaSave::default());
        assert_eq!(state.count(EntityKind::Player), 1);
        assert_eq!(state.player().id, player_id);
        assert_eq!(state.player().kind(), EntityKind::Player);
        assert_eq!(state.level, 1);
        assert_eq!(state.xp_needed, INITIAL_XP_NEEDED);
        assert_eq!(state.phase, GamePhase::Running);
        assert!(state.run_active);
    }

    #[test]
    fn test_player_starts_centered_with_start_stats() {
        let state = new_state();
        assert_eq!(state.player().pos, state.config.arena * 0.5);
        let p = state.player_stats();
        assert_eq!(p.max_hp, StartStats::BASE.max_hp);
        assert_eq!(p.aura_level, 0);
        assert_eq!(p.orb_count, 0);
    }

    #[test]
    fn test_entity_ids_increase() {
        let mut state = new_state();
        let a = state.next_entity_id();
        let b = state.next_entity_id();
        assert!(b > a);
        assert!(a > state.player_id);
        assert_eq!(state.peek_next_id(), b + 1);
    }

    #[test]
    fn test_drain_empties_event_buffer() {
        let mut state = new_state();
        state.emit(GameEvent::Paused);
        assert_eq!(state.drain_events(), vec![GameEvent::Paused]);
        assert!(state.drain_events().is_empty());
    }
}
