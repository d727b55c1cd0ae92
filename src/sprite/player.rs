use crate::engine::{Point, Renderer, Size};
use crate::sprite::frames::{FrameCounts, FrameStore, SheetFrame};
use crate::sprite::state::{Advance, Bounds, Cursor, Facing, Physics, PlayerContext};
use crate::sprite::AnimationState;

/// ┌──────────────── Per Tick Update (Event::Update) ────────────────┐
/// │  1. fall        airborne ? y += v ; v += g ; land on ground     │
/// │  2. walk        held left / right shift x, set facing           │
/// │  3. resolve     Jump > Shoot > Walk > Idle                      │
/// │  4. clamp       x inside canvas, current state's frame width    │
/// │  5. advance     gate the cursor by the clock's effective delay  │
/// ├──────────────── Edge Triggered Events ──────────────────────────┤
/// │  Jump     grounded      →  Jump  (velocity, cursor 0, no shoot) │
/// │  Shoot    not shooting  →  shooting flag latched, cursor 0      │
/// │  Release  grounded and not shooting  →  Idle                    │
/// │  Resize   move the ground, snap if grounded                     │
/// └─────────────────────────────────────────────────────────────────┘
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Event {
    Jump,
    Shoot,
    Release,
    Resize(Bounds),
    Update(Tick),
}

/// Directional keys held at the moment of the tick
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Held {
    pub left: bool,
    pub right: bool,
}

impl Held {
    pub fn any_direction(&self) -> bool {
        self.left || self.right
    }
}

/// Inputs of one simulation step
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Tick {
    pub held: Held,
    pub frames: FrameCounts,
    pub delay: u32,
}

/// Wraps the context so transitions only happen through `transition`
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PlayerStateMachine {
    context: PlayerContext,
}

impl PlayerStateMachine {
    pub fn new(physics: Physics, bounds: Bounds) -> Self {
        PlayerStateMachine {
            context: PlayerContext::new(physics, bounds),
        }
    }

    // CONSUMING self and returning the next state, same as every other
    // transition in the sprite module
    pub fn transition(self, event: Event) -> Self {
        let context = self.context;
        let context = match event {
            Event::Jump if !context.is_jumping => {
                let context = context.start_jump().with_state(AnimationState::Jump);
                if context.is_shooting {
                    context.cancel_shoot()
                } else {
                    context
                }
            }
            Event::Shoot if !context.is_shooting => context.start_shoot(),
            Event::Release if !context.is_jumping && !context.is_shooting => {
                context.with_state(AnimationState::Idle)
            }
            Event::Resize(bounds) => context.resize(bounds),
            Event::Update(tick) => Self::update(context, tick),
            // jump while airborne, shoot while shooting, release mid action
            _ => context,
        };
        PlayerStateMachine { context }
    }

    fn update(context: PlayerContext, tick: Tick) -> PlayerContext {
        let held = tick.held;
        let resting = if held.any_direction() {
            AnimationState::Walk
        } else {
            AnimationState::Idle
        };

        let (context, landed) = context.fall();
        let context = if landed && context.state == AnimationState::Jump {
            context.with_state(resting)
        } else {
            context
        };

        let (context, moved) = context.walk(held.left, held.right);
        let context = Self::resolve(context, moved).clamp_to_bounds();

        match context.advance(tick.frames.get(context.state), tick.delay) {
            (context, Advance::Finished) if context.state == AnimationState::Shoot => {
                context.finish_shoot().with_state(resting)
            }
            (context, _) => context,
        }
    }

    // +----------+-------------------------------------------+
    // | Priority | Condition                                 |
    // +----------+-------------------------------------------+
    // | 1 Jump   | airborne (a latched shoot waits)          |
    // | 2 Shoot  | shooting flag latched                     |
    // | 3 Walk   | moved this tick                           |
    // | 4 Idle   | otherwise                                 |
    // +----------+-------------------------------------------+
    fn resolve(context: PlayerContext, moved: bool) -> PlayerContext {
        if context.is_jumping {
            context.with_state(AnimationState::Jump)
        } else if context.is_shooting {
            context.with_state(AnimationState::Shoot)
        } else if moved {
            context.with_state(AnimationState::Walk)
        } else {
            context.with_state(AnimationState::Idle)
        }
    }

    pub fn context(&self) -> &PlayerContext {
        &self.context
    }

    pub fn state(&self) -> AnimationState {
        self.context.state
    }

    pub fn position(&self) -> Point {
        self.context.position
    }

    pub fn facing(&self) -> Facing {
        self.context.facing
    }

    pub fn is_jumping(&self) -> bool {
        self.context.is_jumping
    }

    pub fn is_shooting(&self) -> bool {
        self.context.is_shooting
    }

    pub fn cursor(&self, state: AnimationState) -> Cursor {
        self.context.cursor(state)
    }

    /// Draw the current frame anchored at the feet, or a placeholder naming the
    /// missing sheet when the state has no frames
    pub fn draw(&self, renderer: &Renderer, frames: &FrameStore<SheetFrame>) {
        let state = self.state();
        let spec = state.spec();
        let position = self.position();
        let cursor = self.cursor(state);

        match frames.frame(state, cursor.frame) {
            Some(frame) => {
                let size = Size {
                    width: spec.frame_width as f32,
                    height: spec.frame_height as f32,
                };
                let center = Point {
                    x: position.x,
                    y: position.y - size.height / 2.0,
                };
                renderer.draw_sprite(
                    &frame.image,
                    &frame.source,
                    center,
                    size,
                    self.facing() == Facing::Left,
                );
            }
            None => {
                renderer.draw_placeholder(
                    &[
                        format!("ERROR: no frames for [{state}]"),
                        format!("check that [{}] exists", spec.path),
                    ],
                    Point {
                        x: position.x,
                        y: position.y - 50.0,
                    },
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const BOUNDS: Bounds = Bounds {
        width: 800.0,
        height: 600.0,
    };

    fn player() -> PlayerStateMachine {
        PlayerStateMachine::new(Physics::default(), BOUNDS)
    }

    fn tick(held: Held) -> Event {
        Event::Update(Tick {
            held,
            frames: FrameCounts::nominal(),
            delay: 1,
        })
    }

    fn idle() -> Event {
        tick(Held::default())
    }

    fn run(player: PlayerStateMachine, events: usize, event: Event) -> PlayerStateMachine {
        (0..events).fold(player, |player, _| player.transition(event))
    }

    #[test]
    fn looping_state_wraps_at_frame_count() {
        let mut player = player();
        let mut frames = vec![player.cursor(AnimationState::Idle).frame];
        for _ in 0..8 {
            player = player.transition(idle());
            frames.push(player.cursor(AnimationState::Idle).frame);
        }
        assert_eq!(frames, vec![0, 1, 2, 3, 4, 5, 6, 7, 0]);
    }

    #[test]
    fn jump_cursor_saturates_on_last_frame() {
        let mut player = player().transition(Event::Jump);
        for _ in 0..15 {
            player = player.transition(idle());
            assert!(player.is_jumping());
        }
        assert_eq!(player.state(), AnimationState::Jump);
        assert_eq!(player.cursor(AnimationState::Jump).frame, 9);
    }

    #[test]
    fn shoot_plays_once_then_idles() {
        let player = run(player().transition(Event::Shoot), 14, idle());
        assert!(player.is_shooting());
        assert_eq!(player.state(), AnimationState::Shoot);
        assert_eq!(player.cursor(AnimationState::Shoot).frame, 14);

        let player = player.transition(idle());
        assert!(!player.is_shooting());
        assert_eq!(player.state(), AnimationState::Idle);
        assert_eq!(player.cursor(AnimationState::Shoot).frame, 14);
    }

    #[test]
    fn shoot_finishing_while_held_walks() {
        let held = tick(Held {
            left: false,
            right: true,
        });
        let player = run(player().transition(Event::Shoot), 15, held);
        assert!(!player.is_shooting());
        assert_eq!(player.state(), AnimationState::Walk);
    }

    #[test]
    fn jump_preempts_shoot() {
        let player = player()
            .transition(Event::Shoot)
            .transition(idle())
            .transition(idle());
        assert_eq!(player.cursor(AnimationState::Shoot).frame, 2);

        let player = player.transition(Event::Jump);
        assert_eq!(player.state(), AnimationState::Jump);
        assert!(!player.is_shooting());
        assert_eq!(player.cursor(AnimationState::Shoot).frame, 0);

        let player = player.transition(idle());
        assert_eq!(player.state(), AnimationState::Jump);
        assert_eq!(player.cursor(AnimationState::Shoot).frame, 0);
    }

    #[test]
    fn shoot_pressed_mid_air_waits_for_landing() {
        let player = player()
            .transition(Event::Jump)
            .transition(idle())
            .transition(Event::Shoot)
            .transition(idle());
        assert!(player.is_shooting());
        assert_eq!(player.state(), AnimationState::Jump);

        let mut player = player;
        while player.is_jumping() {
            player = player.transition(idle());
        }
        let player = player.transition(idle());
        assert_eq!(player.state(), AnimationState::Shoot);
    }

    #[test]
    fn second_jump_press_mid_air_is_ignored() {
        let player = run(player().transition(Event::Jump), 3, idle());
        let velocity = player.context().velocity_y;
        let player = player.transition(Event::Jump);
        assert_relative_eq!(player.context().velocity_y, velocity);
    }

    #[test]
    fn landing_resolves_to_ground_and_walk_when_held() {
        let held = tick(Held {
            left: true,
            right: false,
        });
        let mut player = player().transition(Event::Jump);
        let mut ticks = 0;
        while player.is_jumping() {
            player = player.transition(held);
            ticks += 1;
            assert!(ticks < 1000, "never landed");
        }
        let context = player.context();
        assert_eq!(context.position.y, context.ground_y);
        assert_eq!(context.velocity_y, 0.0);
        assert_eq!(player.state(), AnimationState::Walk);
        assert_eq!(player.facing(), Facing::Left);
    }

    #[test]
    fn release_idles_immediately_when_grounded() {
        let held = tick(Held {
            left: false,
            right: true,
        });
        let player = player().transition(held);
        assert_eq!(player.state(), AnimationState::Walk);
        let player = player.transition(Event::Release);
        assert_eq!(player.state(), AnimationState::Idle);
    }

    #[test]
    fn release_does_not_interrupt_jump_or_shoot() {
        let jumping = player().transition(Event::Jump).transition(Event::Release);
        assert_eq!(jumping.state(), AnimationState::Jump);

        let shooting = player()
            .transition(Event::Shoot)
            .transition(idle())
            .transition(Event::Release);
        assert_eq!(shooting.state(), AnimationState::Shoot);
    }

    #[test]
    fn cursor_stays_in_range_after_truncated_load() {
        let frames = FrameCounts::nominal()
            .with(AnimationState::Walk, 3)
            .with(AnimationState::Jump, 2)
            .with(AnimationState::Shoot, 4);
        let held = Held {
            left: false,
            right: true,
        };
        let step = |held| {
            Event::Update(Tick {
                held,
                frames,
                delay: 1,
            })
        };

        let mut player = player();
        for i in 0..200 {
            let event = match i % 37 {
                0 => Event::Jump,
                11 => Event::Shoot,
                20 => Event::Release,
                _ => step(if i % 2 == 0 { held } else { Held::default() }),
            };
            player = player.transition(event);
            for state in AnimationState::ALL {
                let count = frames.get(state);
                assert!(player.cursor(state).frame < count.max(1), "{state} at tick {i}");
            }
        }
    }

    #[test]
    fn empty_frames_still_move_the_player() {
        let event = Event::Update(Tick {
            held: Held {
                left: true,
                right: false,
            },
            frames: FrameCounts::default(),
            delay: 1,
        });
        let player = run(player(), 4, event);
        assert_relative_eq!(player.position().x, 400.0 - 20.0);
        assert_eq!(player.state(), AnimationState::Walk);
        assert_eq!(player.cursor(AnimationState::Walk), Cursor::default());
    }

    #[test]
    fn horizontal_clamp_holds_across_resize() {
        let right = tick(Held {
            left: false,
            right: true,
        });
        let player = run(player(), 200, right);
        assert_relative_eq!(player.position().x, 800.0 - 30.5);

        let player = player.transition(Event::Resize(Bounds {
            width: 320.0,
            height: 240.0,
        }));
        assert_relative_eq!(player.position().x, 320.0 - 30.5);
        assert_relative_eq!(player.position().y, 180.0);

        let player = run(player.transition(Event::Shoot), 3, right);
        assert_relative_eq!(player.position().x, 320.0 - 67.0);
    }
}
