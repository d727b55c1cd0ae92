//! Everything the player controller mutates lives in `PlayerContext` :
//! - physics : position, vertical velocity, ground line
//! - display : state, facing, per state playback cursors
//!
//! Methods consume and return the context (same as the state machine on top of
//! it), each one a single step of the per tick update so they can be tested
//! in isolation.
use crate::config::Settings;
use crate::engine::Point;
use crate::sprite::{AnimationState, Playback};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Facing {
    Left,
    Right,
}

impl Facing {
    pub fn name(self) -> &'static str {
        match self {
            Facing::Left => "left",
            Facing::Right => "right",
        }
    }
}

/// Movement tunables, fixed for the whole run
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Physics {
    pub movement_speed: f32,
    pub jump_force: f32,
    pub gravity: f32,
    pub ground_ratio: f32,
}

impl From<&Settings> for Physics {
    fn from(settings: &Settings) -> Self {
        Physics {
            movement_speed: settings.movement_speed,
            jump_force: settings.jump_force,
            gravity: settings.gravity,
            ground_ratio: settings.ground_ratio,
        }
    }
}

impl Default for Physics {
    fn default() -> Self {
        Physics::from(&Settings::default())
    }
}

/// Canvas dimensions in pixels
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
}

/// Playback position inside one animation
/// - frame : index into the state's frames, always < frame count
/// - ticks : simulation ticks since the frame last advanced
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Cursor {
    pub frame: usize,
    pub ticks: u32,
}

/// Result of pushing the animation gate forward one tick
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Advance {
    /// gate still closed, or the frame moved and playback continues
    Playing,
    /// a one-shot animation played its last frame
    Finished,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PlayerContext {
    pub position: Point,
    pub velocity_y: f32,
    pub facing: Facing,
    pub state: AnimationState,
    pub is_jumping: bool,
    pub is_shooting: bool,
    pub ground_y: f32,
    pub bounds: Bounds,
    physics: Physics,
    cursors: [Cursor; AnimationState::COUNT],
}

impl PlayerContext {
    /// standing idle on the ground, centered horizontally, facing right
    pub fn new(physics: Physics, bounds: Bounds) -> Self {
        let ground_y = bounds.height * physics.ground_ratio;
        PlayerContext {
            position: Point {
                x: bounds.width / 2.0,
                y: ground_y,
            },
            velocity_y: 0.0,
            facing: Facing::Right,
            state: AnimationState::Idle,
            is_jumping: false,
            is_shooting: false,
            ground_y,
            bounds,
            physics,
            cursors: [Cursor::default(); AnimationState::COUNT],
        }
    }

    pub fn cursor(&self, state: AnimationState) -> Cursor {
        self.cursors[state.index()]
    }

    /// Semi implicit Euler : position first, then velocity
    /// # Returns
    /// * `(context, true)` - touched the ground this tick
    pub fn fall(mut self) -> (Self, bool) {
        if !self.is_jumping {
            return (self, false);
        }
        self.position.y += self.velocity_y;
        self.velocity_y += self.physics.gravity;

        if self.position.y >= self.ground_y {
            self.position.y = self.ground_y;
            self.velocity_y = 0.0;
            self.is_jumping = false;
            return (self, true);
        }
        (self, false)
    }

    /// Shift horizontally for each held direction; right is applied last so it
    /// wins facing when both are held
    /// # Returns
    /// * `(context, moved)`
    pub fn walk(mut self, left: bool, right: bool) -> (Self, bool) {
        let speed = self.physics.movement_speed;
        if left {
            self.position.x -= speed;
            self.facing = Facing::Left;
        }
        if right {
            self.position.x += speed;
            self.facing = Facing::Right;
        }
        (self, left || right)
    }

    /// Keep the sprite inside the canvas, using the current state's frame width
    pub fn clamp_to_bounds(mut self) -> Self {
        let half_width = self.state.spec().frame_width as f32 * 0.5;
        // min before max : a canvas narrower than the frame pins to the left margin
        self.position.x = self
            .position
            .x
            .min(self.bounds.width - half_width)
            .max(half_width);
        self
    }

    pub fn with_state(mut self, state: AnimationState) -> Self {
        self.state = state;
        self
    }

    pub fn start_jump(mut self) -> Self {
        self.is_jumping = true;
        self.velocity_y = self.physics.jump_force;
        self.reset_frame(AnimationState::Jump)
    }

    pub fn start_shoot(mut self) -> Self {
        self.is_shooting = true;
        self.reset_frame(AnimationState::Shoot)
    }

    pub fn cancel_shoot(mut self) -> Self {
        self.is_shooting = false;
        self.reset_frame(AnimationState::Shoot)
    }

    pub fn finish_shoot(mut self) -> Self {
        self.is_shooting = false;
        self
    }

    /// only the frame index resets, the gate counter keeps running
    fn reset_frame(mut self, state: AnimationState) -> Self {
        self.cursors[state.index()].frame = 0;
        self
    }

    /// New canvas size : move the ground, snap to it unless mid jump
    pub fn resize(mut self, bounds: Bounds) -> Self {
        self.bounds = bounds;
        self.ground_y = bounds.height * self.physics.ground_ratio;
        if !self.is_jumping {
            self.position.y = self.ground_y;
        }
        self.clamp_to_bounds()
    }

    /// Tick the current state's gate and step its cursor when it opens
    /// # Arguments
    /// * `frame_count` - frames actually loaded for the current state
    /// * `delay` - ticks per frame, from the amplitude clock
    pub fn advance(mut self, frame_count: usize, delay: u32) -> (Self, Advance) {
        if frame_count == 0 {
            return (self, Advance::Playing);
        }
        let playback = self.state.spec().playback;
        let cursor = &mut self.cursors[self.state.index()];

        cursor.ticks += 1;
        if cursor.ticks < delay {
            return (self, Advance::Playing);
        }
        cursor.ticks = 0;

        let last = frame_count - 1;
        let advance = match playback {
            Playback::Loop => {
                cursor.frame = (cursor.frame + 1) % frame_count;
                Advance::Playing
            }
            Playback::Hold => {
                cursor.frame = (cursor.frame + 1).min(last);
                Advance::Playing
            }
            Playback::OneShot => {
                if cursor.frame >= last {
                    cursor.frame = last;
                    Advance::Finished
                } else {
                    cursor.frame += 1;
                    Advance::Playing
                }
            }
        };
        (self, advance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn bounds() -> Bounds {
        Bounds {
            width: 800.0,
            height: 600.0,
        }
    }

    fn context() -> PlayerContext {
        PlayerContext::new(Physics::default(), bounds())
    }

    #[test]
    fn starts_centered_on_ground() {
        let context = context();
        assert_relative_eq!(context.ground_y, 450.0);
        assert_relative_eq!(context.position.x, 400.0);
        assert_relative_eq!(context.position.y, 450.0);
        assert_eq!(context.facing, Facing::Right);
        assert_eq!(context.state, AnimationState::Idle);
    }

    #[test]
    fn fall_moves_position_before_velocity() {
        let (context, landed) = context().start_jump().fall();
        assert!(!landed);
        assert_relative_eq!(context.position.y, 450.0 - 18.0);
        assert_relative_eq!(context.velocity_y, -18.0 + 1.2);
    }

    #[test]
    fn fall_is_a_no_op_on_the_ground() {
        let before = context();
        let (after, landed) = before.fall();
        assert!(!landed);
        assert_eq!(before, after);
    }

    #[test]
    fn landing_snaps_to_ground() {
        let mut context = context();
        context.is_jumping = true;
        context.position.y = 449.0;
        context.velocity_y = 7.3;

        let (context, landed) = context.fall();
        assert!(landed);
        assert!(!context.is_jumping);
        assert_eq!(context.position.y, context.ground_y);
        assert_eq!(context.velocity_y, 0.0);
    }

    #[test]
    fn both_directions_cancel_out_and_face_right() {
        let mut context = context();
        context.facing = Facing::Left;
        let (context, moved) = context.walk(true, true);
        assert!(moved);
        assert_relative_eq!(context.position.x, 400.0);
        assert_eq!(context.facing, Facing::Right);
    }

    #[test]
    fn clamp_uses_current_state_width() {
        let mut context = context();
        context.position.x = 10.0;
        let idle = context.clamp_to_bounds();
        assert_relative_eq!(idle.position.x, 30.5);

        let shoot = context.with_state(AnimationState::Shoot).clamp_to_bounds();
        assert_relative_eq!(shoot.position.x, 67.0);

        context.position.x = 5000.0;
        let idle = context.clamp_to_bounds();
        assert_relative_eq!(idle.position.x, 800.0 - 30.5);
    }

    #[test]
    fn resize_snaps_grounded_player() {
        let context = context().resize(Bounds {
            width: 400.0,
            height: 400.0,
        });
        assert_relative_eq!(context.ground_y, 300.0);
        assert_relative_eq!(context.position.y, 300.0);
        assert_relative_eq!(context.position.x, 400.0 - 30.5);
    }

    #[test]
    fn resize_leaves_jump_arc_alone() {
        let (context, _) = context().start_jump().fall();
        let y = context.position.y;
        let velocity = context.velocity_y;

        let context = context.resize(Bounds {
            width: 1000.0,
            height: 1000.0,
        });
        assert!(context.is_jumping);
        assert_relative_eq!(context.ground_y, 750.0);
        assert_relative_eq!(context.position.y, y);
        assert_relative_eq!(context.velocity_y, velocity);
    }

    #[test]
    fn gate_holds_frame_until_delay_reached() {
        let mut context = context();
        for _ in 0..5 {
            context = context.advance(8, 6).0;
        }
        assert_eq!(context.cursor(AnimationState::Idle).frame, 0);
        assert_eq!(context.cursor(AnimationState::Idle).ticks, 5);

        context = context.advance(8, 6).0;
        assert_eq!(context.cursor(AnimationState::Idle), Cursor { frame: 1, ticks: 0 });
    }

    #[test]
    fn empty_state_never_advances() {
        let (context, advance) = context().advance(0, 1);
        assert_eq!(advance, Advance::Playing);
        assert_eq!(context.cursor(AnimationState::Idle), Cursor::default());
    }

    #[test]
    fn one_shot_reports_finished_past_last_frame() {
        let mut context = context().with_state(AnimationState::Shoot);
        for _ in 0..2 {
            let (next, advance) = context.advance(3, 1);
            assert_eq!(advance, Advance::Playing);
            context = next;
        }
        let (context, advance) = context.advance(3, 1);
        assert_eq!(advance, Advance::Finished);
        assert_eq!(context.cursor(AnimationState::Shoot).frame, 2);
    }
}
