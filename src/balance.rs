//! Centralized balance constants and pure formulas
//!
//! Everything numeric that shapes a run lives here so rebalancing never
//! requires hunting through simulation code. All functions are pure.

use serde::{Deserialize, Serialize};

// === XP / level curve ===
pub const XP_CURVE_MULT: f64 = 1.20;
pub const XP_CURVE_FLAT: f64 = 5.0;
/// xp required for the first level-up
pub const INITIAL_XP_NEEDED: u32 = 5;

// === Spawning & combat pacing ===
/// Seconds between mob spawns at t=0
pub const SPAWN_INTERVAL_START: f32 = 1.4;
/// Lower bound for the spawn interval
pub const SPAWN_INTERVAL_MIN: f32 = 0.25;
/// Per-second reduction before clamping
pub const SPAWN_INTERVAL_DECAY: f32 = 0.006;
/// Base projectile fire interval (the timer is drained faster by attack speed)
pub const FIRE_INTERVAL_BASE: f32 = 1.65;
/// Seconds between elite spawns
pub const ELITE_PERIOD: f32 = 60.0;

// === Mobs ===
pub const MOB_BASE_HP: f32 = 8.0;
pub const MOB_HP_PER_SEC: f32 = 0.25;
pub const MOB_DAMAGE: f32 = 4.0;
pub const MOB_BASE_SPEED: f32 = 36.0;
pub const MOB_SPEED_JITTER: f32 = 22.0;
pub const MOB_SPAWN_JITTER: f32 = 120.0;

pub const ELITE_BASE_HP: f32 = 120.0;
pub const ELITE_HP_PER_SEC: f32 = 1.2;
pub const ELITE_DAMAGE: f32 = 10.0;
pub const ELITE_BASE_SPEED: f32 = 30.0;
pub const ELITE_SPEED_JITTER: f32 = 15.0;
pub const ELITE_SPAWN_JITTER: f32 = 140.0;

// === Loot ===
pub const XP_GEM_VALUE: f32 = 2.0;
pub const ELITE_XP_GEM_VALUE: f32 = 20.0;
pub const SHARD_CHANCE_BASE: f32 = 0.05;
pub const SHARD_CHANCE_PER_SEC: f32 = 0.0005;
pub const SHARD_CHANCE_MAX: f32 = 0.25;
pub const ELITE_SHARD_MULT: u32 = 10;

// === Player combat ===
pub const PROJECTILE_LIFE: f32 = 1.2;
/// Invulnerability window after taking a hit
pub const PLAYER_INVULN: f32 = 0.6;
/// Pushback applied to the player on mob contact
pub const CONTACT_PUSHBACK: f32 = 10.0;

// === Pickup magnets ===
pub const XP_MAGNET_FACTOR: f32 = 0.2;
pub const XP_MAGNET_SPEED: f32 = 200.0;
pub const SHARD_RANGE_FACTOR: f32 = 0.8;
pub const SHARD_MAGNET_FACTOR: f32 = 0.15;
pub const SHARD_MAGNET_SPEED: f32 = 160.0;

// === Powers ===
pub const AURA_BASE_RADIUS: f32 = 80.0;
pub const AURA_RADIUS_INCREMENT: f32 = 0.2;
pub const AURA_DPS_PER_LEVEL: f32 = 14.0;
/// Chance per mob per tick that the aura emits a cosmetic particle
pub const AURA_PARTICLE_CHANCE: f32 = 0.02;

pub const ORB_BASE_DAMAGE: f32 = 8.0;
pub const ORB_ORBIT_RADIUS: f32 = 70.0;
pub const ORB_RADIUS: f32 = 6.0;
/// Radians per second
pub const ORB_ANGULAR_SPEED: f32 = 2.0;
/// Minimum seconds between orb hits on the same mob
pub const ORB_HIT_COOLDOWN: f32 = 1.0;

// === In-run upgrade values ===
pub const UPGRADE_DAMAGE_PLUS: f32 = 5.0;
pub const UPGRADE_ATTACK_SPEED_MULT: f32 = 1.25;
pub const UPGRADE_MOVE_SPEED_MULT: f32 = 1.10;
pub const UPGRADE_PROJECTILE_SPEED_MULT: f32 = 1.20;
pub const UPGRADE_MAX_HP_PLUS: f32 = 25.0;
pub const UPGRADE_MAX_HP_HEAL: f32 = 25.0;
pub const UPGRADE_PICKUP_RANGE_MULT: f32 = 1.5;
pub const UPGRADE_REGEN_PLUS: f32 = 0.5;
pub const UPGRADE_ORB_DAMAGE_PLUS: f32 = 5.0;

// === Meta upgrade per-level values ===
pub const META_HP_PER_LEVEL: f32 = 10.0;
pub const META_DAMAGE_PER_LEVEL: f32 = 5.0;
pub const META_SPEED_PCT_PER_LEVEL: f32 = 0.05;
pub const META_REGEN_PER_LEVEL: f32 = 0.25;
pub const META_PICKUP_RANGE_PER_LEVEL: f32 = 10.0;
pub const META_XP_GAIN_PCT_PER_LEVEL: f32 = 0.10;

/// Stats a run begins with, derived from base values plus meta upgrades
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartStats {
    pub hp: f32,
    pub max_hp: f32,
    pub damage: f32,
    pub speed: f32,
    pub attack_speed: f32,
    pub projectile_speed: f32,
    pub pickup_range: f32,
    pub regen: f32,
    pub xp_gain: f32,
}

impl StartStats {
    /// Fixed base stats before any meta upgrade
    pub const BASE: StartStats = StartStats {
        hp: 50.0,
        max_hp: 50.0,
        damage: 10.0,
        speed: 80.0,
        attack_speed: 1.0,
        projectile_speed: 100.0,
        pickup_range: 50.0,
        regen: 0.0,
        xp_gain: 1.0,
    };
}

impl Default for StartStats {
    fn default() -> Self {
        Self::BASE
    }
}

/// xp required for the next level given the current requirement
pub fn next_xp_needed(current: u32) -> u32 {
    (current as f64 * XP_CURVE_MULT + XP_CURVE_FLAT).round() as u32
}

/// Seconds between mob spawns at the given run time
pub fn spawn_interval_at(time: f32) -> f32 {
    (SPAWN_INTERVAL_START - time * SPAWN_INTERVAL_DECAY)
        .clamp(SPAWN_INTERVAL_MIN, SPAWN_INTERVAL_START)
}

/// Aura radius; level 1 is the base radius, each extra level adds 20% of base
pub fn aura_radius_at(level: u32) -> f32 {
    if level == 0 {
        return 0.0;
    }
    AURA_BASE_RADIUS * (1.0 + AURA_RADIUS_INCREMENT * (level - 1) as f32)
}

/// Aura damage per second, strictly linear in level
pub fn aura_dps_at(level: u32) -> f32 {
    AURA_DPS_PER_LEVEL * level as f32
}

/// Linear meta-upgrade cost for going from `prior_level` to `prior_level + 1`
pub fn meta_cost(base: u64, per_level: u64, prior_level: u32) -> u64 {
    base + prior_level as u64 * per_level
}

/// Probability that a normal mob drops a shard at the given run time
pub fn shard_drop_chance(time: f32) -> f32 {
    (SHARD_CHANCE_BASE + time * SHARD_CHANCE_PER_SEC).min(SHARD_CHANCE_MAX)
}

/// Shard value for a drop; elites are worth ten times as much
pub fn shard_value(time: f32, kills: u32, elite: bool) -> u32 {
    let base = 1 + (time / 60.0 * 0.6).floor() as u32 + kills / 200;
    if elite { base * ELITE_SHARD_MULT } else { base }
}

/// Normal mob hit points at the given run time
pub fn mob_hp_at(time: f32) -> f32 {
    MOB_BASE_HP + (time * MOB_HP_PER_SEC).floor()
}

/// Elite hit points at the given run time
pub fn elite_hp_at(time: f32) -> f32 {
    ELITE_BASE_HP + (time * ELITE_HP_PER_SEC).floor()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_xp_curve_example() {
        assert_eq!(next_xp_needed(10), 17);
        assert_eq!(next_xp_needed(INITIAL_XP_NEEDED), 11);
    }

    #[test]
    fn test_spawn_interval_clamps() {
        assert!((spawn_interval_at(0.0) - SPAWN_INTERVAL_START).abs() < 1e-6);
        assert_eq!(spawn_interval_at(10_000.0), SPAWN_INTERVAL_MIN);
    }

    #[test]
    fn test_aura_radius_scaling() {
        assert_eq!(aura_radius_at(0), 0.0);
        assert_eq!(aura_radius_at(1), AURA_BASE_RADIUS);
        assert!((aura_radius_at(2) - AURA_BASE_RADIUS * 1.2).abs() < 1e-4);
        assert!((aura_radius_at(4) - AURA_BASE_RADIUS * 1.6).abs() < 1e-4);
    }

    #[test]
    fn test_aura_dps_linear() {
        assert_eq!(aura_dps_at(0), 0.0);
        assert!((aura_dps_at(3) - 3.0 * aura_dps_at(1)).abs() < 1e-6);
    }

    #[test]
    fn test_meta_cost_uses_prior_level() {
        assert_eq!(meta_cost(20, 10, 0), 20);
        assert_eq!(meta_cost(20, 10, 1), 30);
    }

    #[test]
    fn test_shard_chance_caps() {
        assert!((shard_drop_chance(0.0) - 0.05).abs() < 1e-6);
        assert_eq!(shard_drop_chance(3600.0), SHARD_CHANCE_MAX);
    }

    #[test]
    fn test_shard_value_scales() {
        assert_eq!(shard_value(0.0, 0, false), 1);
        assert_eq!(shard_value(0.0, 0, true), 10);
        // 300s -> floor(3.0) = 3, 450 kills -> 2
        assert_eq!(shard_value(300.0, 450, false), 6);
    }

    #[test]
    fn test_mob_hp_grows_in_whole_steps() {
        assert_eq!(mob_hp_at(0.0), 8.0);
        assert_eq!(mob_hp_at(7.9), 9.0);
        assert_eq!(elite_hp_at(60.0), 192.0);
    }

    proptest! {
        #[test]
        fn test_xp_curve_never_decreases(current in 0u32..1_000_000) {
            prop_assert!(next_xp_needed(current) >= current);
        }

        #[test]
        fn test_spawn_interval_non_increasing(a in 0.0f32..5000.0, b in 0.0f32..5000.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(spawn_interval_at(hi) <= spawn_interval_at(lo));
            prop_assert!(spawn_interval_at(lo) >= SPAWN_INTERVAL_MIN);
        }
    }
}
