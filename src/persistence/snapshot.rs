//! Debug snapshots of run progression
//!
//! A snapshot carries player stats, progression counters and the meta
//! record, not transient combat entities. Applying one merges meta
//! conservatively and overwrites run fields outright.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::meta::{MetaSave, MetaStats};
use crate::sim::GameState;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("invalid snapshot: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Player attributes; absent fields keep the current value on apply
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerSnapshot {
    pub hp: Option<f32>,
    pub max_hp: Option<f32>,
    pub damage: Option<f32>,
    pub speed: Option<f32>,
    pub attack_speed: Option<f32>,
    pub projectile_speed: Option<f32>,
    pub pickup_range: Option<f32>,
    pub regen: Option<f32>,
    pub xp_gain: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aura_level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orbiter_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orbiter_damage: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunSnapshot {
    pub version: u32,
    /// Milliseconds since the Unix epoch
    pub timestamp: f64,
    pub time: Option<f32>,
    pub level: Option<u32>,
    pub xp: Option<f32>,
    pub xp_needed: Option<u32>,
    pub kills: Option<u32>,
    pub run_shards: Option<u32>,
    pub meta: Option<MetaSave>,
    pub player: Option<PlayerSnapshot>,
}

/// Current wall-clock time in milliseconds
#[cfg(target_arch = "wasm32")]
pub fn now_ms() -> f64 {
    js_sys::Date::now()
}

#[cfg(not(target_arch = "wasm32"))]
pub fn now_ms() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as f64)
        .unwrap_or(0.0)
}

pub fn build_snapshot(state: &GameState, timestamp_ms: f64) -> RunSnapshot {
    let p = state.player_stats();
    RunSnapshot {
        version: SNAPSHOT_VERSION,
        timestamp: timestamp_ms,
        time: Some(state.time),
        level: Some(state.level),
        xp: Some(state.xp),
        xp_needed: Some(state.xp_needed),
        kills: Some(state.kills),
        run_shards: Some(state.run_shards),
        meta: Some(state.meta.clone()),
        player: Some(PlayerSnapshot {
            hp: Some(p.hp),
            max_hp: Some(p.max_hp),
            damage: Some(p.damage),
            speed: Some(p.speed),
            attack_speed: Some(p.attack_speed),
            projectile_speed: Some(p.projectile_speed),
            pickup_range: Some(p.pickup_range),
            regen: Some(p.regen),
            xp_gain: Some(p.xp_gain),
            aura_level: (p.aura_level > 0).then_some(p.aura_level),
            orbiter_count: (p.orb_count > 0).then_some(p.orb_count),
            orbiter_damage: (p.orb_count > 0).then_some(p.orb_damage),
        }),
    }
}

pub fn snapshot_to_json(snap: &RunSnapshot) -> Result<String, SnapshotError> {
    Ok(serde_json::to_string_pretty(snap)?)
}

/// Parse a snapshot; unknown fields are ignored
pub fn parse_snapshot(json: &str) -> Result<RunSnapshot, SnapshotError> {
    Ok(serde_json::from_str(json)?)
}

fn merge_meta(current: &mut MetaSave, incoming: &MetaSave) {
    current.shards = current.shards.max(incoming.shards);
    for (id, &level) in &incoming.purchased {
        let entry = current.purchased.entry(id.clone()).or_insert(0);
        *entry = (*entry).max(level);
    }
    let (a, b) = (&current.stats, &incoming.stats);
    current.stats = MetaStats {
        total_kills: a.total_kills.max(b.total_kills),
        total_time: a.total_time.max(b.total_time),
        runs: a.runs.max(b.runs),
        best_time: a.best_time.max(b.best_time),
    };
    current.normalize();
}

fn set<T: Copy>(field: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *field = v;
    }
}

/// Apply a snapshot to a live run
pub fn apply_snapshot(state: &mut GameState, snap: &RunSnapshot) {
    if snap.version != SNAPSHOT_VERSION {
        log::warn!(
            "Snapshot version {} differs from {}, applying best-effort",
            snap.version,
            SNAPSHOT_VERSION
        );
    }

    if let Some(meta) = &snap.meta {
        merge_meta(&mut state.meta, meta);
    }

    set(&mut state.time, snap.time);
    set(&mut state.level, snap.level);
    set(&mut state.xp, snap.xp);
    set(&mut state.xp_needed, snap.xp_needed);
    set(&mut state.kills, snap.kills);
    set(&mut state.run_shards, snap.run_shards);
    if snap.time.is_some() {
        // Skipped minutes do not queue a burst of elites
        state.last_elite_minute = (state.time / crate::balance::ELITE_PERIOD).floor() as u32;
    }

    if let Some(ps) = &snap.player {
        let p = state.player_stats_mut();
        set(&mut p.hp, ps.hp);
        set(&mut p.max_hp, ps.max_hp);
        set(&mut p.damage, ps.damage);
        set(&mut p.speed, ps.speed);
        set(&mut p.attack_speed, ps.attack_speed);
        set(&mut p.projectile_speed, ps.projectile_speed);
        set(&mut p.pickup_range, ps.pickup_range);
        set(&mut p.regen, ps.regen);
        set(&mut p.xp_gain, ps.xp_gain);
        set(&mut p.aura_level, ps.aura_level);
        set(&mut p.orb_count, ps.orbiter_count);
        set(&mut p.orb_damage, ps.orbiter_damage);
        p.hp = p.hp.min(p.max_hp);
    }
    log::info!("Snapshot applied (t={:.1}s, level {})", state.time, state.level);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::StartStats;
    use crate::sim::upgrades::{UpgradeId, apply_upgrade};
    use crate::sim::{GameState, RunConfig};

    fn new_state() -> GameState {
        GameState::new(RunConfig::default(), StartStats::BASE, MetaSave::default())
    }

    #[test]
    fn test_snapshot_uses_camel_case_fields() {
        let mut state = new_state();
        apply_upgrade(&mut state, UpgradeId::MagicOrb);
        let json = snapshot_to_json(&build_snapshot(&state, 1000.0)).expect("serialize");
        for key in ["\"xpNeeded\"", "\"runShards\"", "\"maxHp\"", "\"orbiterCount\""] {
            assert!(json.contains(key), "missing {key}");
        }
        assert!(!json.contains("auraLevel"));
    }

    #[test]
    fn test_apply_overwrites_run_fields() {
        let mut source = new_state();
        source.time = 185.0;
        source.level = 7;
        source.kills = 321;
        source.run_shards = 12;
        source.player_stats_mut().damage = 42.0;
        let snap = parse_snapshot(
            &snapshot_to_json(&build_snapshot(&source, 0.0)).expect("serialize"),
        )
        .expect("parse");

        let mut target = new_state();
        apply_snapshot(&mut target, &snap);
        assert_eq!(target.time, 185.0);
        assert_eq!(target.level, 7);
        assert_eq!(target.kills, 321);
        assert_eq!(target.run_shards, 12);
        assert_eq!(target.player_stats().damage, 42.0);
        assert_eq!(target.last_elite_minute, 3);
    }

    #[test]
    fn test_meta_merges_conservatively() {
        let mut state = new_state();
        state.meta.shards = 50;
        state.meta.purchased.insert("meta_hp".into(), 3);
        state.meta.stats.runs = 9;

        let snap = parse_snapshot(
            r#"{"version":1,"timestamp":0,"meta":{"shards":20,
                "purchased":{"meta_hp":1,"meta_xp":2},
                "stats":{"totalKills":500,"totalTime":10,"runs":2,"bestTime":300}}}"#,
        )
        .expect("parse");
        apply_snapshot(&mut state, &snap);
        assert_eq!(state.meta.shards, 50);
        assert_eq!(state.meta.level("meta_hp"), 3);
        assert_eq!(state.meta.level("meta_xp"), 2);
        assert_eq!(state.meta.stats.runs, 9);
        assert_eq!(state.meta.stats.total_kills, 500);
        assert_eq!(state.meta.stats.best_time, 300.0);
    }

    #[test]
    fn test_merged_levels_are_clamped() {
        let mut state = new_state();
        let snap = parse_snapshot(
            r#"{"version":1,"meta":{"purchased":{"meta_pickup":900,"meta_gone":3}}}"#,
        )
        .expect("parse");
        apply_snapshot(&mut state, &snap);
        assert_eq!(state.meta.level("meta_pickup"), 20);
        assert!(!state.meta.purchased.contains_key("meta_gone"));
    }

    #[test]
    fn test_version_mismatch_and_missing_fields_are_tolerated() {
        let mut state = new_state();
        state.level = 4;
        let snap = parse_snapshot(r#"{"version":99,"kills":5,"somethingNew":true}"#)
            .expect("parse");
        apply_snapshot(&mut state, &snap);
        assert_eq!(state.kills, 5);
        assert_eq!(state.level, 4);
        assert_eq!(state.player_stats().max_hp, StartStats::BASE.max_hp);
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(parse_snapshot("not json").is_err());
    }
}
