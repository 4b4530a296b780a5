//! Per-frame simulation tick
//!
//! Core game loop that advances a run deterministically. Step order is
//! fixed: it defines the gameplay RNG consumption sequence, so reordering
//! steps changes what a seed produces.

use std::collections::BTreeSet;

use glam::Vec2;

use super::collision::circles_overlap;
use super::spawn::{
    fire_projectile, roll_shard_drop, spawn_elite, spawn_hit_burst, spawn_mob, spawn_particle,
    spawn_xp,
};
use super::state::{Body, EntityId, EntityKind, GameEvent, GamePhase, GameState};
use super::upgrades::{apply_upgrade, pick_random_upgrades};
use crate::balance::*;
use crate::consts::*;
use crate::{direction_to, dist_sq, polar_to_cartesian};

/// Input intents for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Movement axes (held)
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    /// Pause toggle (also resumes from the pause menu)
    pub pause: bool,
    pub resume: bool,
    /// Flip the in-run stats overlay
    pub toggle_stats: bool,
    /// Move the upgrade cursor by this many cards (usually -1, 0 or 1)
    pub navigate_upgrade: i32,
    /// Commit the highlighted upgrade
    pub confirm_upgrade: bool,
    /// Commit the upgrade at this offer index
    pub choose_upgrade: Option<usize>,
}

impl TickInput {
    /// Net movement axis; opposing inputs cancel
    pub fn axis(&self) -> Vec2 {
        let x = self.right as i32 - self.left as i32;
        let y = self.down as i32 - self.up as i32;
        Vec2::new(x as f32, y as f32)
    }
}

/// Advance the run by `dt` seconds and return the events raised
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) -> Vec<GameEvent> {
    handle_intents(state, input);

    // No tick logic runs outside Running
    if state.phase != GamePhase::Running {
        return state.drain_events();
    }
    assert!(
        state.has_player(),
        "player entity {} missing at tick start",
        state.player_id
    );
    if !dt.is_finite() || dt < 0.0 {
        log::debug!("Ignoring tick with invalid dt {dt}");
        return state.drain_events();
    }

    let start_pos = state.player().pos;
    let mut removals = BTreeSet::new();

    // 1. Time and the per-minute elite
    state.time += dt;
    let minute = (state.time / ELITE_PERIOD).floor() as u32;
    if minute >= 1 && minute != state.last_elite_minute {
        state.last_elite_minute = minute;
        spawn_elite(state);
    }

    // 2. Invulnerability and regen
    {
        let p = state.player_stats_mut();
        if p.invuln > 0.0 {
            p.invuln -= dt;
        }
        if p.regen > 0.0 {
            p.hp = (p.hp + p.regen * dt).min(p.max_hp);
        }
    }

    // 3. Mob spawn timer
    state.spawn_timer -= dt;
    if state.spawn_timer <= 0.0 {
        spawn_mob(state);
        state.spawn_timer = spawn_interval_at(state.time);
    }

    // 4. Auto-fire, scaled by attack speed
    state.projectile_timer -= dt * state.player_stats().attack_speed;
    if state.projectile_timer <= 0.0 {
        fire_projectile(state);
        state.projectile_timer = FIRE_INTERVAL_BASE;
    }

    // 5. Player movement
    move_player(state, input.axis(), dt);

    // 6-7. Passive damage sources
    apply_aura(state, dt);
    apply_orbs(state);

    // 8. Deaths from aura and orbs
    collect_passive_deaths(state, &mut removals);

    // 9. Main entity loop; entities spawned below wait for the next tick
    let player_id = state.player_id;
    let ids: Vec<EntityId> = state
        .entities
        .keys()
        .copied()
        .filter(|&id| id != player_id)
        .collect();
    for id in ids {
        if !state.run_active {
            break;
        }
        if removals.contains(&id) {
            continue;
        }
        let Some(kind) = state.entities.get(&id).map(|e| e.kind()) else {
            continue;
        };
        match kind {
            EntityKind::Mob => update_mob(state, id, dt),
            EntityKind::Projectile => update_projectile(state, id, dt, &mut removals),
            EntityKind::Xp | EntityKind::Shard => update_pickup(state, id, dt, &mut removals),
            EntityKind::Particle => update_particle(state, id, dt, &mut removals),
            EntityKind::Player => {}
        }
    }

    // 10. Batch removal
    for id in removals {
        if id == player_id {
            continue;
        }
        if let Some(e) = state.entities.remove(&id) {
            state.emit(GameEvent::Removed {
                id,
                kind: e.kind(),
            });
        }
    }

    // 11. Derived motion signals
    let end_pos = state.player().pos;
    let input_active = input.axis() != Vec2::ZERO;
    let (grace, stiffness) = (state.config.move_grace, state.config.anim_stiffness);
    state
        .motion
        .update(start_pos, end_pos, input_active, dt, grace, stiffness);

    state.drain_events()
}

/// Process one-shot intents for whichever phase they apply to
fn handle_intents(state: &mut GameState, input: &TickInput) {
    match state.phase {
        GamePhase::Running if input.pause => {
            state.phase = GamePhase::Paused;
            state.emit(GameEvent::Paused);
        }
        GamePhase::Paused if input.pause || input.resume => {
            state.phase = GamePhase::Running;
            state.emit(GameEvent::Resumed);
        }
        // A level-up with nothing to offer waits for an explicit resume
        GamePhase::UpgradeChoice if input.resume && state.offered_upgrades.is_empty() => {
            state.phase = GamePhase::Running;
            state.emit(GameEvent::Resumed);
        }
        _ => {}
    }

    if input.toggle_stats {
        state.stats_visible = !state.stats_visible;
        state.emit(GameEvent::StatsToggled {
            visible: state.stats_visible,
        });
    }

    if state.phase != GamePhase::UpgradeChoice {
        return;
    }
    if input.navigate_upgrade != 0 {
        navigate_upgrade(state, input.navigate_upgrade);
    }
    if let Some(index) = input.choose_upgrade {
        commit_upgrade(state, index);
    } else if input.confirm_upgrade {
        let cursor = state.upgrade_cursor;
        commit_upgrade(state, cursor);
    }
}

/// Move the offer cursor, clamped to the current offers
pub fn navigate_upgrade(state: &mut GameState, delta: i32) {
    let len = state.offered_upgrades.len();
    if len == 0 {
        return;
    }
    let next = (state.upgrade_cursor as i64 + delta as i64).clamp(0, len as i64 - 1) as usize;
    if next != state.upgrade_cursor {
        state.upgrade_cursor = next;
        state.emit(GameEvent::UpgradeCursor { index: next });
    }
}

/// Commit offer `index` and resume the run. Returns false when no choice is
/// pending or the index is out of range.
pub fn commit_upgrade(state: &mut GameState, index: usize) -> bool {
    if state.phase != GamePhase::UpgradeChoice {
        return false;
    }
    let Some(&id) = state.offered_upgrades.get(index) else {
        log::debug!("Upgrade index {index} out of range");
        return false;
    };
    apply_upgrade(state, id);
    state.offered_upgrades.clear();
    state.upgrade_cursor = 0;
    state.phase = GamePhase::Running;
    // Xp gathered while the choice was pending
    if state.xp >= state.xp_needed as f32 {
        level_up(state);
    }
    true
}

/// Add xp scaled by the player's xp gain; fires at most one level-up
pub fn grant_xp(state: &mut GameState, amount: f32) {
    state.xp += amount * state.player_stats().xp_gain;
    if state.phase == GamePhase::Running && state.xp >= state.xp_needed as f32 {
        level_up(state);
    }
}

fn level_up(state: &mut GameState) {
    state.level += 1;
    // Overflow is discarded
    state.xp = 0.0;
    state.xp_needed = next_xp_needed(state.xp_needed);
    let choices = pick_random_upgrades(
        &state.upgrade_pool,
        &mut state.rng,
        state.config.upgrade_choices,
    );
    log::info!(
        "Level {} reached at {:.1}s, next at {} xp",
        state.level,
        state.time,
        state.xp_needed
    );
    state.offered_upgrades = choices.clone();
    state.upgrade_cursor = 0;
    state.phase = GamePhase::UpgradeChoice;
    state.emit(GameEvent::LevelUp {
        level: state.level,
        choices,
    });
}

/// Damage the player unless invulnerable; ends the run at zero hp
pub fn damage_player(state: &mut GameState, amount: f32) {
    let p = state.player_stats_mut();
    if p.invuln > 0.0 {
        return;
    }
    p.hp = (p.hp - amount).max(0.0);
    p.invuln = PLAYER_INVULN;
    let hp = p.hp;
    state.emit(GameEvent::PlayerDamaged { damage: amount, hp });
    if hp <= 0.0 {
        game_over(state);
    }
}

fn game_over(state: &mut GameState) {
    if !state.run_active {
        return;
    }
    state.run_active = false;
    state.phase = GamePhase::GameOver;
    state.meta.shards += state.run_shards as u64;
    let summary = state.summary();
    log::info!(
        "Game over at {:.1}s: {} kills, {} shards",
        summary.time,
        summary.kills,
        summary.shards
    );
    state.emit(GameEvent::GameOver(summary));
}

fn move_player(state: &mut GameState, axis: Vec2, dt: f32) {
    let dir = axis.normalize_or_zero();
    let speed = state.player_stats().speed;
    let arena = state.config.arena;
    let player = state.player_mut();
    player.vel = dir * speed;
    if dir == Vec2::ZERO {
        return;
    }
    let r = player.radius;
    let next = player.pos + player.vel * dt;
    player.pos = Vec2::new(
        next.x.clamp(r, (arena.x - r).max(r)),
        next.y.clamp(r, (arena.y - r).max(r)),
    );
}

fn apply_aura(state: &mut GameState, dt: f32) {
    let level = state.player_stats().aura_level;
    if level == 0 {
        return;
    }
    let radius = aura_radius_at(level);
    let dps = aura_dps_at(level);
    let center = state.player().pos;

    let mut touched = Vec::new();
    for e in state.entities.values_mut() {
        let (pos, mob_radius) = (e.pos, e.radius);
        let Some(mob) = e.as_mob_mut() else {
            continue;
        };
        let reach = radius + mob_radius;
        if dist_sq(center, pos) < reach * reach {
            mob.hp -= dps * dt;
            touched.push(pos);
        }
    }
    for pos in touched {
        if state.cosmetic_rng.next_f32() < AURA_PARTICLE_CHANCE {
            spawn_particle(state, pos);
        }
    }
}

fn apply_orbs(state: &mut GameState) {
    let p = state.player_stats();
    if p.orb_count == 0 {
        return;
    }
    let center = state.player().pos;
    let time = state.time;
    let orbs: Vec<Vec2> = (0..p.orb_count)
        .map(|i| {
            let angle = time * ORB_ANGULAR_SPEED
                + i as f32 / p.orb_count as f32 * std::f32::consts::TAU;
            center + polar_to_cartesian(ORB_ORBIT_RADIUS, angle)
        })
        .collect();

    let mut hits = Vec::new();
    for e in state.entities.values_mut() {
        let (id, pos, mob_radius) = (e.id, e.pos, e.radius);
        let Some(mob) = e.as_mob_mut() else {
            continue;
        };
        for &orb in &orbs {
            // One cooldown per mob, shared by every orb
            let ready = mob
                .last_orb_hit
                .is_none_or(|last| time - last >= ORB_HIT_COOLDOWN);
            if ready && circles_overlap(orb, ORB_RADIUS, pos, mob_radius) {
                mob.hp -= p.orb_damage;
                mob.last_orb_hit = Some(time);
                hits.push((id, pos));
            }
        }
    }
    for (id, pos) in hits {
        state.emit(GameEvent::MobHit {
            id,
            damage: p.orb_damage,
        });
        spawn_hit_burst(state, pos, 4);
    }
}

fn collect_passive_deaths(state: &mut GameState, removals: &mut BTreeSet<EntityId>) {
    let dead: Vec<(EntityId, Vec2, bool)> = state
        .entities
        .values()
        .filter_map(|e| {
            let mob = e.as_mob()?;
            (mob.hp <= 0.0).then_some((e.id, e.pos, mob.elite))
        })
        .collect();
    for (id, pos, elite) in dead {
        kill_mob(state, id, pos, elite);
        removals.insert(id);
    }
}

/// Award a kill: counter, xp gem and shard roll
fn kill_mob(state: &mut GameState, id: EntityId, pos: Vec2, elite: bool) {
    state.kills += 1;
    state.emit(GameEvent::MobKilled { id, elite });
    let value = if elite { ELITE_XP_GEM_VALUE } else { XP_GEM_VALUE };
    spawn_xp(state, pos, value, elite);
    roll_shard_drop(state, pos, elite);
}

fn update_mob(state: &mut GameState, id: EntityId, dt: f32) {
    let player = state.player();
    let (player_pos, player_radius) = (player.pos, player.radius);
    let Some(e) = state.entities.get_mut(&id) else {
        return;
    };
    let Some((speed, damage)) = e.as_mob().map(|m| (m.speed, m.damage)) else {
        return;
    };
    e.vel = direction_to(e.pos, player_pos) * speed;
    e.pos += e.vel * dt;
    let (pos, radius) = (e.pos, e.radius);

    if circles_overlap(player_pos, player_radius, pos, radius) {
        damage_player(state, damage);
        // Pushback applies even while invulnerable
        let push = direction_to(pos, player_pos) * CONTACT_PUSHBACK;
        state.player_mut().pos += push;
    }
}

fn update_projectile(
    state: &mut GameState,
    id: EntityId,
    dt: f32,
    removals: &mut BTreeSet<EntityId>,
) {
    let Some(e) = state.entities.get_mut(&id) else {
        return;
    };
    e.pos += e.vel * dt;
    let Body::Projectile { damage, life } = &mut e.body else {
        return;
    };
    *life -= dt;
    if *life <= 0.0 {
        removals.insert(id);
        return;
    }
    let (pos, radius, damage) = (e.pos, e.radius, *damage);

    let target = state
        .entities
        .values()
        .find(|m| {
            m.kind() == EntityKind::Mob
                && !removals.contains(&m.id)
                && circles_overlap(m.pos, m.radius, pos, radius)
        })
        .map(|m| m.id);
    let Some(mob_id) = target else {
        return;
    };

    let Some(m) = state.entities.get_mut(&mob_id) else {
        return;
    };
    let mob_pos = m.pos;
    let Some(mob) = m.as_mob_mut() else {
        return;
    };
    mob.hp -= damage;
    let (dead, elite) = (mob.hp <= 0.0, mob.elite);

    state.emit(GameEvent::MobHit { id: mob_id, damage });
    spawn_hit_burst(state, pos, 4);
    removals.insert(id);
    if dead {
        kill_mob(state, mob_id, mob_pos, elite);
        spawn_hit_burst(state, mob_pos, 10);
        removals.insert(mob_id);
    }
}

fn update_pickup(state: &mut GameState, id: EntityId, dt: f32, removals: &mut BTreeSet<EntityId>) {
    let player = state.player();
    let (player_pos, player_radius) = (player.pos, player.radius);
    let pickup_range = state.player_stats().pickup_range;
    let Some(e) = state.entities.get_mut(&id) else {
        return;
    };
    let (range, factor, pull) = match e.body {
        Body::Shard { .. } => (
            pickup_range * SHARD_RANGE_FACTOR,
            SHARD_MAGNET_FACTOR,
            SHARD_MAGNET_SPEED,
        ),
        _ => (pickup_range, XP_MAGNET_FACTOR, XP_MAGNET_SPEED),
    };

    let detect = player_radius + e.radius + range * factor;
    if dist_sq(player_pos, e.pos) >= detect * detect {
        return;
    }
    let offset = player_pos - e.pos;
    if offset.length() < range {
        e.pos += offset.normalize_or_zero() * pull * dt;
    }

    let contact = player_radius + e.radius + PICKUP_CONTACT_SLACK;
    if dist_sq(player_pos, e.pos) >= contact * contact {
        return;
    }
    let body = e.body.clone();
    removals.insert(id);
    match body {
        Body::Xp { value, .. } => {
            state.emit(GameEvent::XpCollected { value });
            grant_xp(state, value);
        }
        Body::Shard { value } => {
            state.run_shards += value;
            state.emit(GameEvent::ShardCollected { value });
        }
        _ => {}
    }
}

fn update_particle(
    state: &mut GameState,
    id: EntityId,
    dt: f32,
    removals: &mut BTreeSet<EntityId>,
) {
    let Some(e) = state.entities.get_mut(&id) else {
        return;
    };
    e.pos += e.vel * dt;
    e.vel *= 0.9;
    let Body::Particle { life, alpha } = &mut e.body else {
        return;
    };
    *life -= dt;
    if *life <= 0.0 {
        removals.insert(id);
    } else if *life < 0.3 {
        *alpha = *life / 0.3;
    }
}

/// Label/value rows for the in-run stats overlay
pub fn stats_rows(state: &GameState) -> Vec<(String, String)> {
    let p = state.player_stats();
    let mut rows = vec![
        ("Level".to_string(), state.level.to_string()),
        (
            "XP".to_string(),
            format!("{:.0} / {}", state.xp, state.xp_needed),
        ),
        ("Kills".to_string(), state.kills.to_string()),
        ("HP".to_string(), format!("{:.0} / {:.0}", p.hp, p.max_hp)),
        ("Damage".to_string(), format!("{:.0}", p.damage)),
        ("Attack Speed".to_string(), format!("{:.2}x", p.attack_speed)),
        ("Move Speed".to_string(), format!("{:.0}", p.speed)),
        (
            "Projectile Speed".to_string(),
            format!("{:.0}", p.projectile_speed),
        ),
        ("Pickup Range".to_string(), format!("{:.0}", p.pickup_range)),
        ("Regen".to_string(), format!("{:.2}/s", p.regen)),
        ("XP Gain".to_string(), format!("{:.2}x", p.xp_gain)),
    ];
    if p.aura_level > 0 {
        rows.push(("Aura".to_string(), format!("Lv {}", p.aura_level)));
    }
    if p.orb_count > 0 {
        rows.push((
            "Magic Orbs".to_string(),
            format!("{} ({:.0} dmg)", p.orb_count, p.orb_damage),
        ));
    }
    rows
}
