//! Void Survivor - deterministic arena survival simulation
//!
//! Core modules:
//! - `sim`: Deterministic simulation (entities, spawning, combat, upgrades, tick)
//! - `balance`: Tuning constants and pure balance formulas
//! - `meta`: Cross-run meta progression (shards, permanent upgrades)
//! - `persistence`: Save/load of the meta record and debug snapshots
//! - `settings`: Headless configuration (arena size, seed, choices)
//! - `session`: Host boundary that owns the ledger and the active run

pub mod balance;
pub mod meta;
pub mod persistence;
pub mod session;
pub mod settings;
pub mod sim;

pub use meta::MetaSave;
pub use session::Session;
pub use settings::Settings;

use glam::Vec2;

/// Shared simulation dimensions
pub mod consts {
    /// Fixed step used by the headless runner (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Player collision radius
    pub const PLAYER_RADIUS: f32 = 14.0;
    /// Normal mob collision radius
    pub const MOB_RADIUS: f32 = 12.0;
    /// Elite mob collision radius
    pub const ELITE_RADIUS: f32 = 16.0;
    /// Projectile collision radius
    pub const PROJECTILE_RADIUS: f32 = 3.0;
    /// XP gem radius (normal / elite)
    pub const XP_RADIUS: f32 = 4.0;
    pub const ELITE_XP_RADIUS: f32 = 5.0;
    /// Shard pickup radius
    pub const SHARD_RADIUS: f32 = 5.0;
    /// Particle radius (cosmetic)
    pub const PARTICLE_RADIUS: f32 = 2.0;

    /// Pickups dropped outside the play area are pulled this far inside it
    pub const PICKUP_INSET: f32 = 8.0;
    /// Extra slack added to the contact radius when collecting pickups
    pub const PICKUP_CONTACT_SLACK: f32 = 4.0;

    /// Spawn ring distance as a fraction of the larger arena dimension
    pub const SPAWN_RING_FACTOR: f32 = 0.6;

    /// Default arena size (the old viewport size)
    pub const DEFAULT_ARENA_WIDTH: f32 = 1280.0;
    pub const DEFAULT_ARENA_HEIGHT: f32 = 720.0;
}

/// Squared distance between two points
#[inline]
pub fn dist_sq(a: Vec2, b: Vec2) -> f32 {
    a.distance_squared(b)
}

/// Unit vector from `from` toward `to`, or zero when the points coincide
#[inline]
pub fn direction_to(from: Vec2, to: Vec2) -> Vec2 {
    (to - from).normalize_or_zero()
}

/// Clamp a point into `[inset, size - inset]` on both axes
#[inline]
pub fn clamp_to_rect(pos: Vec2, size: Vec2, inset: f32) -> Vec2 {
    Vec2::new(
        pos.x.max(inset).min(size.x - inset),
        pos.y.max(inset).min(size.y - inset),
    )
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}
