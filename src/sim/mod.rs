//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Seeded RNG only (gameplay and cosmetic streams kept apart)
//! - Stable iteration order (by entity ID)
//! - No rendering, audio or platform dependencies

pub mod collision;
pub mod motion;
pub mod rng;
pub mod spawn;
pub mod state;
pub mod tick;
pub mod upgrades;

pub use motion::{Facing, MotionState};
pub use rng::SimRng;
pub use state::{
    Body, Entity, EntityId, EntityKind, GameEvent, GamePhase, GameState, MobStats, PlayerStats,
    RunConfig, RunSummary, create_run,
};
pub use tick::{TickInput, commit_upgrade, grant_xp, stats_rows, tick};
pub use upgrades::{UpgradeId, UpgradeOffer, offer_cards};
