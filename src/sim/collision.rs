//! Circle overlap tests and target selection
//!
//! Every simulated body is a circle, so contact is a squared-distance check.

use glam::Vec2;

use super::state::{EntityId, EntityKind, GameState};
use crate::dist_sq;

/// True when two circles strictly overlap
#[inline]
pub fn circles_overlap(a: Vec2, ra: f32, b: Vec2, rb: f32) -> bool {
    let r = ra + rb;
    dist_sq(a, b) < r * r
}

/// Nearest mob to `from`, ties resolved by lowest id
pub fn nearest_mob(state: &GameState, from: Vec2) -> Option<(EntityId, Vec2)> {
    let mut best: Option<(EntityId, Vec2, f32)> = None;
    for e in state.entities.values() {
        if e.kind() != EntityKind::Mob {
            continue;
        }
        let d = dist_sq(from, e.pos);
        if best.is_none_or(|(_, _, bd)| d < bd) {
            best = Some((e.id, e.pos, d));
        }
    }
    best.map(|(id, pos, _)| (id, pos))
}

/// Angle from the player toward the nearest mob, if any mob exists
pub fn pick_angle(state: &GameState) -> Option<f32> {
    let origin = state.player().pos;
    nearest_mob(state, origin).map(|(_, target)| {
        let d = target - origin;
        d.y.atan2(d.x)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::StartStats;
    use crate::meta::MetaSave;
    use crate::sim::state::{Body, Entity, MobStats, RunConfig};

    fn state_with_mobs(positions: &[Vec2]) -> GameState {
        let mut state = GameState::new(RunConfig::default(), StartStats::BASE, MetaSave::default());
        state.player_mut().pos = Vec2::ZERO;
        for &pos in positions {
            let id = state.next_entity_id();
            state.entities.insert(
                id,
                Entity {
                    id,
                    pos,
                    vel: Vec2::ZERO,
                    radius: 8.0,
                    body: Body::Mob(MobStats {
                        hp: 10.0,
                        max_hp: 10.0,
                        damage: 1.0,
                        speed: 10.0,
                        elite: false,
                        last_orb_hit: None,
                    }),
                },
            );
        }
        state
    }

    #[test]
    fn test_overlap_is_strict() {
        assert!(circles_overlap(Vec2::ZERO, 5.0, Vec2::new(9.0, 0.0), 5.0));
        assert!(!circles_overlap(Vec2::ZERO, 5.0, Vec2::new(10.0, 0.0), 5.0));
    }

    #[test]
    fn test_no_mobs_no_angle() {
        let state = state_with_mobs(&[]);
        assert_eq!(pick_angle(&state), None);
    }

    #[test]
    fn test_aims_at_nearest_mob() {
        let state = state_with_mobs(&[Vec2::new(100.0, 0.0), Vec2::new(0.0, 50.0)]);
        let angle = pick_angle(&state).expect("mob present");
        assert!((angle - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }
}
