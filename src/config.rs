use serde::Deserialize;

// ==================== Constants ====================
// Asset paths relative to the page serving the wasm module
pub const SETTINGS_PATH: &str = "settings.json";
pub const MUSIC_PATH: &str = "music.mp3";

pub const MOVEMENT_SPEED: f32 = 5.0;
// negative because top left is origin
pub const JUMP_FORCE: f32 = -18.0;
pub const GRAVITY: f32 = 1.2;
pub const GROUND_Y_RATIO: f32 = 0.75;
pub const BASE_FRAME_DELAY: u32 = 6;
pub const MUSIC_VOLUME: f64 = 0.6;

/// Tunables for a run of the demo
/// - every field falls back to the constant table above when missing
/// - loaded best effort from `settings.json`, see `game::load_settings`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub movement_speed: f32,
    pub jump_force: f32,
    pub gravity: f32,
    pub ground_ratio: f32,
    pub base_frame_delay: u32,
    pub music_path: String,
    pub music_volume: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            movement_speed: MOVEMENT_SPEED,
            jump_force: JUMP_FORCE,
            gravity: GRAVITY,
            ground_ratio: GROUND_Y_RATIO,
            base_frame_delay: BASE_FRAME_DELAY,
            music_path: MUSIC_PATH.to_string(),
            music_volume: MUSIC_VOLUME,
        }
    }
}

impl Settings {
    /// Clamp values that would break the simulation back into range
    /// - a zero delay would make the animation gate fire never
    /// - ground ratio outside 0..=1 puts the floor off screen
    /// - gravity must pull down or a jump never lands
    pub fn sanitized(mut self) -> Self {
        self.movement_speed = or_default(
            "movement_speed",
            self.movement_speed,
            MOVEMENT_SPEED,
            |speed| speed >= 0.0,
        );
        self.jump_force = or_default("jump_force", self.jump_force, JUMP_FORCE, |_| true);
        self.gravity = or_default("gravity", self.gravity, GRAVITY, |gravity| gravity > 0.0);
        if self.base_frame_delay == 0 {
            log::warn!("base_frame_delay must be at least 1, using 1");
            self.base_frame_delay = 1;
        }
        if !(0.0..=1.0).contains(&self.ground_ratio) {
            log::warn!(
                "ground_ratio {} out of range, using {}",
                self.ground_ratio,
                GROUND_Y_RATIO
            );
            self.ground_ratio = GROUND_Y_RATIO;
        }
        self.music_volume = if self.music_volume.is_finite() {
            self.music_volume.clamp(0.0, 1.0)
        } else {
            MUSIC_VOLUME
        };
        self
    }
}

fn or_default(name: &str, value: f32, default: f32, valid: impl Fn(f32) -> bool) -> f32 {
    if value.is_finite() && valid(value) {
        value
    } else {
        log::warn!("{} {} out of range, using {}", name, value, default);
        default
    }
}
