//! Cross-run meta progression
//!
//! Shards earned in runs buy permanent upgrades. Purchased levels are the
//! only record kept: start stats are rebuilt from them and total spend is
//! reconstructed from the cost curve, so no transaction log is needed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::balance::*;
use crate::sim::RunSummary;

/// Lifetime statistics across runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetaStats {
    pub total_kills: u64,
    /// Seconds
    pub total_time: f64,
    pub runs: u32,
    /// Longest survival in seconds
    pub best_time: f64,
}

/// Persistent meta record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetaSave {
    pub shards: u64,
    /// Upgrade id -> purchased level
    pub purchased: BTreeMap<String, u32>,
    pub stats: MetaStats,
}

/// Refund availability for a menu button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefundState {
    pub disabled: bool,
    pub spent: u64,
}

/// Static meta upgrade definition
#[derive(Debug, Clone, Copy)]
pub struct MetaUpgradeDef {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub max_level: u32,
    pub cost_base: u64,
    pub cost_per_level: u64,
    /// Applies the effect of the absolute level reached
    pub apply: fn(u32, &mut StartStats),
}

impl MetaUpgradeDef {
    /// Cost of going from `level` to `level + 1`
    pub fn cost(&self, level: u32) -> u64 {
        meta_cost(self.cost_base, self.cost_per_level, level)
    }
}

pub const META_UPGRADES: [MetaUpgradeDef; 6] = [
    MetaUpgradeDef {
        id: "meta_hp",
        name: "Vitality",
        description: "+10 Max HP per level",
        max_level: 50,
        cost_base: 20,
        cost_per_level: 10,
        apply: |lvl, s| {
            s.max_hp += META_HP_PER_LEVEL * lvl as f32;
            s.hp = s.max_hp;
        },
    },
    MetaUpgradeDef {
        id: "meta_damage",
        name: "Might",
        description: "+5 Damage per level",
        max_level: 50,
        cost_base: 15,
        cost_per_level: 8,
        apply: |lvl, s| s.damage += META_DAMAGE_PER_LEVEL * lvl as f32,
    },
    MetaUpgradeDef {
        id: "meta_speed",
        name: "Swiftness",
        description: "+5% Move Speed per level",
        max_level: 50,
        cost_base: 15,
        cost_per_level: 12,
        apply: |lvl, s| s.speed *= 1.0 + META_SPEED_PCT_PER_LEVEL * lvl as f32,
    },
    MetaUpgradeDef {
        id: "meta_regen",
        name: "Regen",
        description: "+0.25 HP/s per level",
        max_level: 50,
        cost_base: 30,
        cost_per_level: 15,
        apply: |lvl, s| s.regen += META_REGEN_PER_LEVEL * lvl as f32,
    },
    MetaUpgradeDef {
        id: "meta_pickup",
        name: "Magnet",
        description: "+10 Pickup Range per level",
        max_level: 20,
        cost_base: 20,
        cost_per_level: 14,
        apply: |lvl, s| s.pickup_range += META_PICKUP_RANGE_PER_LEVEL * lvl as f32,
    },
    MetaUpgradeDef {
        id: "meta_xp",
        name: "Wisdom",
        description: "+10% XP Gain per level",
        max_level: 40,
        cost_base: 25,
        cost_per_level: 20,
        apply: |lvl, s| s.xp_gain *= 1.0 + META_XP_GAIN_PCT_PER_LEVEL * lvl as f32,
    },
];

pub fn meta_upgrade(id: &str) -> Option<&'static MetaUpgradeDef> {
    META_UPGRADES.iter().find(|u| u.id == id)
}

/// Base stats with every purchased level applied
pub fn build_start_stats(meta: &MetaSave) -> StartStats {
    let mut stats = StartStats::BASE;
    for def in &META_UPGRADES {
        let level = meta.level(def.id);
        if level > 0 {
            (def.apply)(level, &mut stats);
        }
    }
    stats
}

/// Total shards spent, reconstructed from purchased levels
pub fn compute_spent_shards(meta: &MetaSave) -> u64 {
    META_UPGRADES
        .iter()
        .map(|def| (0..meta.level(def.id)).map(|l| def.cost(l)).sum::<u64>())
        .sum()
}

impl MetaSave {
    pub fn level(&self, id: &str) -> u32 {
        self.purchased.get(id).copied().unwrap_or(0)
    }

    /// Clamp every known level to its maximum and drop ids with no
    /// definition. Returns true when the record changed.
    pub fn normalize(&mut self) -> bool {
        let before = self.purchased.len();
        self.purchased.retain(|id, _| meta_upgrade(id).is_some());
        let mut changed = self.purchased.len() != before;
        for (id, level) in self.purchased.iter_mut() {
            if let Some(def) = meta_upgrade(id)
                && *level > def.max_level
            {
                log::warn!("Clamping {id} level {level} to {}", def.max_level);
                *level = def.max_level;
                changed = true;
            }
        }
        changed
    }

    /// Buy one level. Returns false for unknown ids, maxed upgrades or
    /// insufficient shards, leaving the record untouched.
    pub fn purchase(&mut self, id: &str) -> bool {
        let Some(def) = meta_upgrade(id) else {
            return false;
        };
        let current = self.level(id);
        if current >= def.max_level {
            return false;
        }
        let cost = def.cost(current);
        if self.shards < cost {
            return false;
        }
        self.shards -= cost;
        self.purchased.insert(id.to_string(), current + 1);
        log::info!("Purchased {} level {} for {} shards", def.name, current + 1, cost);
        true
    }

    /// Return every spent shard and clear all levels; returns the refund
    pub fn refund_all(&mut self) -> u64 {
        let spent = compute_spent_shards(self);
        self.shards += spent;
        self.purchased.clear();
        log::info!("Refunded {spent} shards");
        spent
    }

    pub fn refund_state(&self) -> RefundState {
        let spent = compute_spent_shards(self);
        RefundState {
            disabled: spent == 0,
            spent,
        }
    }

    /// Hard reset: shards, levels and stats
    pub fn reset(&mut self) {
        *self = Self::default();
        log::info!("Meta progression reset");
    }

    /// Fold a finished run into the lifetime stats. Shards are merged by
    /// the tick at game over, not here.
    pub fn record_run(&mut self, summary: &RunSummary) {
        let time = summary.time as f64;
        self.stats.runs += 1;
        self.stats.total_kills += summary.kills as u64;
        self.stats.total_time += time;
        self.stats.best_time = self.stats.best_time.max(time);
    }
}

/// `Hh Mm Ss`, `Mm Ss` or `Ss`
pub fn format_duration(seconds: f64) -> String {
    let s = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    let h = (s / 3600.0).floor() as u64;
    let m = ((s % 3600.0) / 60.0).floor() as u64;
    let sec = (s % 60.0).floor() as u64;
    if h > 0 {
        format!("{h}h {m}m {sec}s")
    } else if m > 0 {
        format!("{m}m {sec}s")
    } else {
        format!("{sec}s")
    }
}

/// Human-readable lifetime statistics
pub fn meta_stats_lines(meta: &MetaSave) -> Vec<String> {
    let spent = compute_spent_shards(meta);
    let runs = meta.stats.runs;
    let (avg_time, avg_kills) = if runs > 0 {
        (
            format_duration(meta.stats.total_time / runs as f64),
            format!("{:.1}", meta.stats.total_kills as f64 / runs as f64),
        )
    } else {
        ("-".to_string(), "-".to_string())
    };
    vec![
        format!("Runs: {runs}"),
        format!("Total Play Time: {}", format_duration(meta.stats.total_time)),
        format!("Best Survival Time: {}", format_duration(meta.stats.best_time)),
        format!("Total Kills: {}", meta.stats.total_kills),
        format!("Average Time / Run: {avg_time}"),
        format!("Average Kills / Run: {avg_kills}"),
        format!("Current Shards: {}", meta.shards),
        format!("Spent Shards (Upgrades): {spent}"),
        format!("Total Shards Acquired: {}", meta.shards + spent),
    ]
}
