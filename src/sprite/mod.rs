// TABLE:
// ┌──────────────────────────────────────────────────────────────────────────┐
// │                      Sprite Module Layout                                │
// ├───────────────────┬──────────────────────────────────────────────────────┤
// │ File              │ Responsibility                                       │
// ├───────────────────┼──────────────────────────────────────────────────────┤
// │ mod.rs            │ AnimationState + per state clip table (geometry,     │
// │                   │ sheet path, playback policy)                         │
// │ frames.rs         │ slicing sheets into frames, FrameStore               │
// │ state.rs          │ PlayerContext : pose, physics, playback cursors      │
// │ player.rs         │ PlayerStateMachine : events, priority resolution     │
// └───────────────────┴──────────────────────────────────────────────────────┘
pub mod frames;
pub mod player;
pub mod state;

use std::fmt;

/// How the playback cursor behaves once it reaches the last frame
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Playback {
    /// wrap back to frame 0
    Loop,
    /// freeze on the last frame until something resets the cursor
    Hold,
    /// play once, then hand control back to the state machine
    OneShot,
}

/// Fixed description of a sprite sheet: where it lives and how to cut it
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ClipSpec {
    pub path: &'static str,
    pub frame_count: usize,
    pub frame_width: u32,
    pub frame_height: u32,
    pub playback: Playback,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AnimationState {
    Idle,
    Walk,
    Run,
    Stop,
    Shoot,
    Jump,
}

impl AnimationState {
    pub const COUNT: usize = 6;
    pub const ALL: [AnimationState; AnimationState::COUNT] = [
        AnimationState::Idle,
        AnimationState::Walk,
        AnimationState::Run,
        AnimationState::Stop,
        AnimationState::Shoot,
        AnimationState::Jump,
    ];

    // +-------+-------------------+--------+---------+----------+
    // | State | Sheet             | Frames | W x H   | Playback |
    // +-------+-------------------+--------+---------+----------+
    // | Idle  | 1c/idle/all.png   |   8    |  61x70  | Loop     |
    // | Walk  | 1c/walk/all.png   |   8    |  61x70  | Loop     |
    // | Run   | 1c/run/all.png    |   8    |  61x70  | Loop     |
    // | Stop  | 1c/idle/all.png   |   8    |  61x70  | Loop     |
    // | Shoot | 1c/shoot/all.png  |  15    | 134x97  | OneShot  |
    // | Jump  | 1c/ju/all.png     |  10    |  61x63  | Hold     |
    // +-------+-------------------+--------+---------+----------+
    pub const fn spec(self) -> ClipSpec {
        use AnimationState::*;
        match self {
            Idle | Stop => ClipSpec {
                path: "1c/idle/all.png",
                frame_count: 8,
                frame_width: 61,
                frame_height: 70,
                playback: Playback::Loop,
            },
            Walk => ClipSpec {
                path: "1c/walk/all.png",
                frame_count: 8,
                frame_width: 61,
                frame_height: 70,
                playback: Playback::Loop,
            },
            Run => ClipSpec {
                path: "1c/run/all.png",
                frame_count: 8,
                frame_width: 61,
                frame_height: 70,
                playback: Playback::Loop,
            },
            Shoot => ClipSpec {
                path: "1c/shoot/all.png",
                frame_count: 15,
                frame_width: 134,
                frame_height: 97,
                playback: Playback::OneShot,
            },
            Jump => ClipSpec {
                path: "1c/ju/all.png",
                frame_count: 10,
                frame_width: 61,
                frame_height: 63,
                playback: Playback::Hold,
            },
        }
    }

    /// slot of this state in per state arrays
    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        use AnimationState::*;
        match self {
            Idle => "idle",
            Walk => "walk",
            Run => "run",
            Stop => "stop",
            Shoot => "shoot",
            Jump => "jump",
        }
    }
}

impl fmt::Display for AnimationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
