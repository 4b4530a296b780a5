//! Movement detection and animation-state smoothing
//!
//! Derived per tick from the player's net displacement. Nothing here feeds
//! back into gameplay; it only drives the logical moving/idle and facing
//! signals a renderer consumes.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Minimum displacement that counts as movement (filters micro jitter)
pub const MOVE_EPSILON: f32 = 0.05;
/// Animation playback speed while moving
pub const MOVE_ANIM_SPEED: f32 = 0.7;
/// Default smoothing stiffness for animation speed
pub const DEFAULT_STIFFNESS: f32 = 10.0;

/// True when the net displacement exceeds `epsilon`.
///
/// Opposing inputs that cancel produce zero displacement and therefore no
/// movement, regardless of which keys are held.
pub fn did_move(prev: Vec2, current: Vec2, epsilon: f32) -> bool {
    prev.distance(current) > epsilon
}

/// Result of one grace-period step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovingState {
    pub moving: bool,
    pub remaining_grace: f32,
}

/// Advance the moving flag with a grace period after movement stops
pub fn compute_moving_state(
    input_active: bool,
    displacement_moving: bool,
    dt: f32,
    grace_duration: f32,
    remaining_grace: f32,
) -> MovingState {
    if input_active || displacement_moving {
        return MovingState {
            moving: true,
            remaining_grace: grace_duration,
        };
    }
    if remaining_grace > 0.0 {
        return MovingState {
            moving: true,
            remaining_grace: (remaining_grace - dt).max(0.0),
        };
    }
    MovingState {
        moving: false,
        remaining_grace: 0.0,
    }
}

/// Exponential approach of `current` toward `target`; always finite
pub fn smooth_anim_speed(current: f32, target: f32, dt: f32, stiffness: f32) -> f32 {
    let current = if current.is_finite() { current } else { 0.0 };
    let target = if target.is_finite() { target } else { 0.0 };
    let alpha = (dt * stiffness).min(1.0);
    let alpha = if alpha.is_finite() { alpha.max(0.0) } else { 0.0 };
    // f64 keeps `target - current` from overflowing near f32::MAX
    let (current, target) = (current as f64, target as f64);
    (current + (target - current) * alpha as f64) as f32
}

/// Horizontal facing of the player sprite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Facing {
    Left,
    #[default]
    Right,
}

/// Animation-facing state carried across ticks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionState {
    pub moving: bool,
    pub remaining_grace: f32,
    pub facing: Facing,
    pub anim_speed: f32,
}

impl Default for MotionState {
    fn default() -> Self {
        Self {
            moving: false,
            remaining_grace: 0.0,
            facing: Facing::Right,
            anim_speed: 0.0,
        }
    }
}

impl MotionState {
    /// Update from this tick's displacement
    pub fn update(
        &mut self,
        prev: Vec2,
        current: Vec2,
        input_active: bool,
        dt: f32,
        grace: f32,
        stiffness: f32,
    ) {
        let moved = did_move(prev, current, MOVE_EPSILON);
        let next = compute_moving_state(input_active, moved, dt, grace, self.remaining_grace);
        self.moving = next.moving;
        self.remaining_grace = next.remaining_grace;

        let dx = current.x - prev.x;
        if moved && dx.abs() > MOVE_EPSILON {
            self.facing = if dx < 0.0 { Facing::Left } else { Facing::Right };
        }

        let target = if self.moving { MOVE_ANIM_SPEED } else { 0.0 };
        self.anim_speed = smooth_anim_speed(self.anim_speed, target, dt, stiffness);
    }
}
