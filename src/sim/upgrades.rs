//! In-run upgrade catalog and random selection
//!
//! Upgrades are static data records whose effect only touches the player's
//! stats. The pool of offerable ids grows through post-apply unlock hooks
//! (the orb damage upgrade appears after the first orb is taken).

use serde::{Deserialize, Serialize};

use super::rng::SimRng;
use super::state::{GameEvent, GameState, PlayerStats};
use crate::balance::*;

/// In-run upgrade identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UpgradeId {
    #[serde(rename = "dmg")]
    Damage,
    #[serde(rename = "aspd")]
    AttackSpeed,
    #[serde(rename = "speed")]
    MoveSpeed,
    #[serde(rename = "projspd")]
    ProjectileSpeed,
    #[serde(rename = "hp")]
    MaxHealth,
    #[serde(rename = "pickup")]
    PickupRange,
    #[serde(rename = "regen")]
    Regeneration,
    #[serde(rename = "aura")]
    Aura,
    #[serde(rename = "magicOrb")]
    MagicOrb,
    #[serde(rename = "magicOrbDmg")]
    MagicOrbDamage,
}

impl UpgradeId {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpgradeId::Damage => "dmg",
            UpgradeId::AttackSpeed => "aspd",
            UpgradeId::MoveSpeed => "speed",
            UpgradeId::ProjectileSpeed => "projspd",
            UpgradeId::MaxHealth => "hp",
            UpgradeId::PickupRange => "pickup",
            UpgradeId::Regeneration => "regen",
            UpgradeId::Aura => "aura",
            UpgradeId::MagicOrb => "magicOrb",
            UpgradeId::MagicOrbDamage => "magicOrbDmg",
        }
    }
}

/// Static upgrade definition
#[derive(Debug, Clone, Copy)]
pub struct UpgradeDef {
    pub id: UpgradeId,
    pub name: &'static str,
    pub description: &'static str,
    /// Powers (aura, orbs) have their own level counters
    pub power: bool,
    pub apply: fn(&mut PlayerStats),
}

pub const UPGRADES: [UpgradeDef; 10] = [
    UpgradeDef {
        id: UpgradeId::Damage,
        name: "Sharpened Projectiles",
        description: "+5 damage",
        power: false,
        apply: |p| p.damage += UPGRADE_DAMAGE_PLUS,
    },
    UpgradeDef {
        id: UpgradeId::AttackSpeed,
        name: "Attack Speed",
        description: "Fire 25% faster",
        power: false,
        apply: |p| p.attack_speed *= UPGRADE_ATTACK_SPEED_MULT,
    },
    UpgradeDef {
        id: UpgradeId::MoveSpeed,
        name: "Boots",
        description: "+10% move speed",
        power: false,
        apply: |p| p.speed *= UPGRADE_MOVE_SPEED_MULT,
    },
    UpgradeDef {
        id: UpgradeId::ProjectileSpeed,
        name: "Projectile Speed",
        description: "+20% projectile speed",
        power: false,
        apply: |p| p.projectile_speed *= UPGRADE_PROJECTILE_SPEED_MULT,
    },
    UpgradeDef {
        id: UpgradeId::MaxHealth,
        name: "Max Health",
        description: "+25 max HP & heal 25",
        power: false,
        apply: |p| {
            p.max_hp += UPGRADE_MAX_HP_PLUS;
            p.hp = (p.hp + UPGRADE_MAX_HP_HEAL).min(p.max_hp);
        },
    },
    UpgradeDef {
        id: UpgradeId::PickupRange,
        name: "Magnet",
        description: "+50% pickup range",
        power: false,
        apply: |p| p.pickup_range *= UPGRADE_PICKUP_RANGE_MULT,
    },
    UpgradeDef {
        id: UpgradeId::Regeneration,
        name: "Regeneration",
        description: "+0.5 HP/s regen",
        power: false,
        apply: |p| p.regen += UPGRADE_REGEN_PLUS,
    },
    UpgradeDef {
        id: UpgradeId::Aura,
        name: "Magic Aura",
        description: "Unlock / +20% aura (damage field)",
        power: true,
        apply: |p| p.aura_level += 1,
    },
    UpgradeDef {
        id: UpgradeId::MagicOrb,
        name: "Magic Orbs",
        description: "Unlock / +1 Magic Orb",
        power: true,
        apply: |p| p.orb_count += 1,
    },
    UpgradeDef {
        id: UpgradeId::MagicOrbDamage,
        name: "Magic Orb Damage",
        description: "Magic Orb damage +5",
        power: false,
        apply: |p| p.orb_damage += UPGRADE_ORB_DAMAGE_PLUS,
    },
];

/// Look up a definition by id
pub fn upgrade_def(id: UpgradeId) -> &'static UpgradeDef {
    // Catalog order matches the enum declaration order
    &UPGRADES[id as usize]
}

/// Pool at run start; unlockable upgrades are held back
pub fn initial_pool() -> Vec<UpgradeId> {
    UPGRADES
        .iter()
        .map(|u| u.id)
        .filter(|&id| id != UpgradeId::MagicOrbDamage)
        .collect()
}

/// Draw up to `count` distinct entries from `pool` without replacement
pub fn pick_random_upgrades(pool: &[UpgradeId], rng: &mut SimRng, count: usize) -> Vec<UpgradeId> {
    let mut remaining = pool.to_vec();
    let mut picks = Vec::with_capacity(count.min(remaining.len()));
    while !remaining.is_empty() && picks.len() < count {
        let idx = rng.index(remaining.len());
        picks.push(remaining.remove(idx));
    }
    picks
}

/// Post-apply hook: upgrades that become offerable after applying `id`
pub fn unlocks_after(id: UpgradeId, before: &PlayerStats, after: &PlayerStats) -> Vec<UpgradeId> {
    match id {
        UpgradeId::MagicOrb if before.orb_count == 0 && after.orb_count > 0 => {
            vec![UpgradeId::MagicOrbDamage]
        }
        _ => Vec::new(),
    }
}

/// Apply an upgrade to the player, keep it in the pool and add any unlocks
pub fn apply_upgrade(state: &mut GameState, id: UpgradeId) {
    let before = state.player_stats();
    (upgrade_def(id).apply)(state.player_stats_mut());
    let after = state.player_stats();

    // Duplicates are allowed across a run; the chosen upgrade stays offerable
    if !state.upgrade_pool.contains(&id) {
        state.upgrade_pool.push(id);
    }
    for unlocked in unlocks_after(id, &before, &after) {
        if !state.upgrade_pool.contains(&unlocked) {
            log::info!("Upgrade unlocked: {}", upgrade_def(unlocked).name);
            state.upgrade_pool.push(unlocked);
        }
    }
    state.emit(GameEvent::UpgradeChosen { id });
}

fn additive_level(current: f32, base: f32, step: f32) -> u32 {
    ((current - base) / step).floor().max(0.0) as u32
}

fn multiplicative_level(current: f32, base: f32, mult: f32) -> u32 {
    if base <= 0.0 || current <= 0.0 {
        return 0;
    }
    let level = ((current / base).ln() / mult.ln()).round();
    if level.is_finite() { level.max(0.0) as u32 } else { 0 }
}

/// How many times an upgrade has been taken, derived from stats
pub fn upgrade_level(player: &PlayerStats, start: &StartStats, id: UpgradeId) -> u32 {
    match id {
        UpgradeId::Damage => additive_level(player.damage, start.damage, UPGRADE_DAMAGE_PLUS),
        UpgradeId::AttackSpeed => {
            multiplicative_level(player.attack_speed, start.attack_speed, UPGRADE_ATTACK_SPEED_MULT)
        }
        UpgradeId::MoveSpeed => {
            multiplicative_level(player.speed, start.speed, UPGRADE_MOVE_SPEED_MULT)
        }
        UpgradeId::ProjectileSpeed => multiplicative_level(
            player.projectile_speed,
            start.projectile_speed,
            UPGRADE_PROJECTILE_SPEED_MULT,
        ),
        UpgradeId::MaxHealth => additive_level(player.max_hp, start.max_hp, UPGRADE_MAX_HP_PLUS),
        UpgradeId::PickupRange => multiplicative_level(
            player.pickup_range,
            start.pickup_range,
            UPGRADE_PICKUP_RANGE_MULT,
        ),
        UpgradeId::Regeneration => {
            ((player.regen - start.regen) / UPGRADE_REGEN_PLUS).round().max(0.0) as u32
        }
        UpgradeId::Aura => player.aura_level,
        UpgradeId::MagicOrb => player.orb_count,
        UpgradeId::MagicOrbDamage => {
            additive_level(player.orb_damage, ORB_BASE_DAMAGE, UPGRADE_ORB_DAMAGE_PLUS)
        }
    }
}

/// A choice as presented at level-up
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpgradeOffer {
    pub id: UpgradeId,
    pub name: &'static str,
    pub description: &'static str,
    pub power: bool,
    pub current_level: u32,
    pub next_level: u32,
}

/// Cards for the currently offered upgrades
pub fn offer_cards(state: &GameState) -> Vec<UpgradeOffer> {
    let player = state.player_stats();
    state
        .offered_upgrades
        .iter()
        .map(|&id| {
            let def = upgrade_def(id);
            let level = upgrade_level(&player, &state.start_stats, id);
            UpgradeOffer {
                id,
                name: def.name,
                description: def.description,
                power: def.power,
                current_level: level,
                next_level: level + 1,
            }
        })
        .collect()
}
