//! Spawn operations
//!
//! Each constructor allocates the next id, derives initial attributes from
//! run time, player stats and the RNG, inserts into the store and emits a
//! `Spawned` event. RNG draws happen in a fixed order per operation.

use glam::Vec2;

use super::collision::pick_angle;
use super::state::{Body, Entity, EntityId, GameEvent, GameState, MobStats};
use crate::balance::*;
use crate::consts::*;
use crate::{clamp_to_rect, polar_to_cartesian};

fn insert(state: &mut GameState, pos: Vec2, vel: Vec2, radius: f32, body: Body) -> EntityId {
    let id = state.next_entity_id();
    let entity = Entity {
        id,
        pos,
        vel,
        radius,
        body,
    };
    let kind = entity.kind();
    state.entities.insert(id, entity);
    state.emit(GameEvent::Spawned { id, kind });
    id
}

/// Point on the spawn ring around the player: draws angle, then jitter
fn ring_position(state: &mut GameState, jitter: f32) -> Vec2 {
    let center = state.player().pos;
    let angle = state.rng.angle();
    let base = state.config.arena.x.max(state.config.arena.y) * SPAWN_RING_FACTOR;
    let dist = base + state.rng.next_f32() * jitter;
    center + polar_to_cartesian(dist, angle)
}

/// Spawn a normal mob on the ring around the player
pub fn spawn_mob(state: &mut GameState) -> EntityId {
    let pos = ring_position(state, MOB_SPAWN_JITTER);
    let hp = mob_hp_at(state.time);
    let speed = MOB_BASE_SPEED + state.rng.next_f32() * MOB_SPEED_JITTER;
    insert(
        state,
        pos,
        Vec2::ZERO,
        MOB_RADIUS,
        Body::Mob(MobStats {
            hp,
            max_hp: hp,
            damage: MOB_DAMAGE,
            speed,
            elite: false,
            last_orb_hit: None,
        }),
    )
}

/// Spawn an elite: tougher, larger, guaranteed shard and boosted xp
pub fn spawn_elite(state: &mut GameState) -> EntityId {
    let pos = ring_position(state, ELITE_SPAWN_JITTER);
    let hp = elite_hp_at(state.time);
    let speed = ELITE_BASE_SPEED + state.rng.next_f32() * ELITE_SPEED_JITTER;
    let id = insert(
        state,
        pos,
        Vec2::ZERO,
        ELITE_RADIUS,
        Body::Mob(MobStats {
            hp,
            max_hp: hp,
            damage: ELITE_DAMAGE,
            speed,
            elite: true,
            last_orb_hit: None,
        }),
    );
    log::info!("Elite {} spawned at {:.0}s (hp {})", id, state.time, hp);
    state.emit(GameEvent::EliteSpawned { id });
    id
}

/// Drop an xp gem, kept inside the play area
pub fn spawn_xp(state: &mut GameState, pos: Vec2, value: f32, elite: bool) -> EntityId {
    let pos = clamp_to_rect(pos, state.config.arena, PICKUP_INSET);
    let radius = if elite { ELITE_XP_RADIUS } else { XP_RADIUS };
    insert(state, pos, Vec2::ZERO, radius, Body::Xp { value, elite })
}

/// Drop a shard, kept inside the play area
pub fn spawn_shard(state: &mut GameState, pos: Vec2, value: u32) -> EntityId {
    let pos = clamp_to_rect(pos, state.config.arena, PICKUP_INSET);
    insert(state, pos, Vec2::ZERO, SHARD_RADIUS, Body::Shard { value })
}

/// Cosmetic particle; uses the cosmetic RNG only
pub fn spawn_particle(state: &mut GameState, pos: Vec2) -> EntityId {
    let life = 0.5 + state.cosmetic_rng.next_f32() * 0.3;
    let speed = 40.0 + state.cosmetic_rng.next_f32() * 80.0;
    let angle = state.cosmetic_rng.angle();
    insert(
        state,
        pos,
        polar_to_cartesian(speed, angle),
        PARTICLE_RADIUS,
        Body::Particle { life, alpha: 1.0 },
    )
}

pub fn spawn_hit_burst(state: &mut GameState, pos: Vec2, count: usize) {
    for _ in 0..count {
        spawn_particle(state, pos);
    }
}

/// Fire at the nearest mob, or in a random direction when none exist
pub fn fire_projectile(state: &mut GameState) -> EntityId {
    let angle = match pick_angle(state) {
        Some(a) => a,
        None => state.rng.angle(),
    };
    let player = state.player_stats();
    let origin = state.player().pos;
    let id = insert(
        state,
        origin,
        polar_to_cartesian(player.projectile_speed, angle),
        PROJECTILE_RADIUS,
        Body::Projectile {
            damage: player.damage,
            life: PROJECTILE_LIFE,
        },
    );
    state.emit(GameEvent::ProjectileFired { id });
    id
}

/// Roll a shard drop for a death; elites always drop and skip the roll
pub fn roll_shard_drop(state: &mut GameState, pos: Vec2, elite: bool) -> Option<EntityId> {
    let drop = elite || state.rng.next_f32() < shard_drop_chance(state.time);
    if !drop {
        return None;
    }
    let value = shard_value(state.time, state.kills, elite);
    log::debug!("Shard drop worth {} at {:.0}s", value, state.time);
    Some(spawn_shard(state, pos, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::MetaSave;
    use crate::sim::state::{EntityKind, RunConfig};

    fn new_state() -> GameState {
        GameState::new(RunConfig::default(), StartStats::BASE, MetaSave::default())
    }

    #[test]
    fn test_mob_spawns_on_ring() {
        let mut state = new_state();
        let id = spawn_mob(&mut state);
        let mob = &state.entities[&id];
        let base = DEFAULT_ARENA_WIDTH * SPAWN_RING_FACTOR;
        let d = mob.pos.distance(state.player().pos);
        assert!(d >= base - 1e-2 && d <= base + MOB_SPAWN_JITTER + 1e-2);
        let stats = *mob.as_mob().expect("mob body");
        assert_eq!(stats.hp, MOB_BASE_HP);
        assert!(!stats.elite);
        assert!(stats.speed >= MOB_BASE_SPEED && stats.speed < MOB_BASE_SPEED + MOB_SPEED_JITTER);
    }

    #[test]
    fn test_elite_is_tagged_and_tougher() {
        let mut state = new_state();
        state.time = 60.0;
        let id = spawn_elite(&mut state);
        let mob = *state.entities[&id].as_mob().expect("mob body");
        assert!(mob.elite);
        assert_eq!(mob.hp, elite_hp_at(60.0));
        assert_eq!(state.entities[&id].radius, ELITE_RADIUS);
        let events = state.drain_events();
        assert!(events.contains(&GameEvent::EliteSpawned { id }));
    }

    #[test]
    fn test_pickups_are_clamped_into_arena() {
        let mut state = new_state();
        let xp = spawn_xp(&mut state, Vec2::new(-50.0, 5000.0), 2.0, false);
        let pos = state.entities[&xp].pos;
        assert_eq!(pos, Vec2::new(PICKUP_INSET, DEFAULT_ARENA_HEIGHT - PICKUP_INSET));
        let shard = spawn_shard(&mut state, Vec2::new(5000.0, 3.0), 1);
        assert_eq!(
            state.entities[&shard].pos,
            Vec2::new(DEFAULT_ARENA_WIDTH - PICKUP_INSET, PICKUP_INSET)
        );
    }

    #[test]
    fn test_elite_death_always_drops_shard_without_rolling() {
        let mut state = new_state();
        let rng_before = state.rng.clone();
        let id = roll_shard_drop(&mut state, Vec2::new(100.0, 100.0), true);
        assert_eq!(state.rng, rng_before);
        let id = id.expect("elite always drops");
        assert!(matches!(state.entities[&id].body, Body::Shard { value: 10 }));
    }

    #[test]
    fn test_particles_do_not_touch_gameplay_rng() {
        let mut state = new_state();
        let rng_before = state.rng.clone();
        spawn_hit_burst(&mut state, Vec2::ZERO, 10);
        assert_eq!(state.rng, rng_before);
        assert_eq!(state.count(EntityKind::Particle), 10);
    }

    #[test]
    fn test_projectile_aims_at_mob() {
        let mut state = new_state();
        let player_pos = state.player().pos;
        let mob = spawn_mob(&mut state);
        if let Some(m) = state.entities.get_mut(&mob) {
            m.pos = player_pos + Vec2::new(0.0, 100.0);
        }
        let shot = fire_projectile(&mut state);
        let vel = state.entities[&shot].vel;
        assert!(vel.x.abs() < 1e-3);
        assert!((vel.y - StartStats::BASE.projectile_speed).abs() < 1e-3);
    }
}
