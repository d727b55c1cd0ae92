use crate::audio::{AmplitudeClock, ClockReading, LevelSource, Music};
use crate::browser;
use crate::config::{Settings, SETTINGS_PATH};
use crate::engine::input::{InputEvent, KeyState};
use crate::engine::{self, Game, Point, Rect, Renderer, Size, TextStyle};
use crate::error::AssetError;
use crate::sprite::frames::{extract_clip, FrameStore, SheetFrame};
use crate::sprite::player::{Event, Held, PlayerStateMachine, Tick};
use crate::sprite::state::{Bounds, Physics};
use crate::sprite::AnimationState;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::future::join_all;

/// TABLE
/// ┌────────────────────────── Frame Overview ───────────────────────────────┐
/// │                                                                         │
/// │    ┌─────────────┐          ┌─────────────┐          ┌─────────────┐    │
/// │    │  engine.rs  │  events  │   game.rs   │  Event   │  player.rs  │    │
/// │    │  GameLoop   ├─────────►│  Stage      ├─────────►│  transition │    │
/// │    │  KeyState   │          │  update()   │          │             │    │
/// │    └─────────────┘          └──────┬──────┘          └─────────────┘    │
/// │                                    │                                    │
/// │                              ┌─────┴──────┐                             │
/// │                              │  audio.rs  │  effective delay per tick   │
/// │                              │  Amplitude │                             │
/// │                              │  Clock     │                             │
/// │                              └────────────┘                             │
/// │                                                                         │
/// ├──────────────────────── Call Sequence ──────────────────────────────────┤
/// │  1. Drain edge events : Jump / Shoot / Release / Resize                 │
/// │  2. Sample music loudness -> ClockReading                               │
/// │  3. Event::Update with held keys, frame counts and effective delay      │
/// │  4. draw() : background -> sprite (or placeholder) -> status overlay    │
/// └─────────────────────────────────────────────────────────────────────────┘
pub enum BeatSprite {
    /// Sheets, music and settings are still loading
    Loading,

    /// Everything that could load has loaded
    Loaded(Stage),
}

impl BeatSprite {
    pub fn new() -> Self {
        BeatSprite::Loading
    }

    /// Best effort `settings.json`, built in constants otherwise
    async fn load_settings() -> Settings {
        match browser::fetch_json::<Settings>(SETTINGS_PATH).await {
            Ok(settings) => {
                log::info!("Loaded settings from {}", SETTINGS_PATH);
                settings.sanitized()
            }
            Err(err) => {
                log::info!("Using built in settings, {} unavailable : {:#}", SETTINGS_PATH, err);
                Settings::default()
            }
        }
    }

    async fn load_clip(state: AnimationState) -> Result<Vec<SheetFrame>, AssetError> {
        let path = state.spec().path;
        let image = engine::load_image(path)
            .await
            .map_err(|err| AssetError::Load {
                path: path.to_string(),
                reason: format!("{:#}", err),
            })?;
        log::info!(
            "[PASS] {} sheet loaded, width : {}",
            state,
            image.natural_width()
        );
        extract_clip(Some(&image), state)
    }

    // Every sheet loads in parallel, a failed one only empties its own state
    async fn load_frames() -> FrameStore<SheetFrame> {
        let results = join_all(
            AnimationState::ALL.map(|state| async move { (state, Self::load_clip(state).await) }),
        )
        .await;

        let mut store = FrameStore::new();
        for (state, result) in results {
            match result {
                Ok(frames) => {
                    log::info!("[PASS] {} : extracted {} frames", state, frames.len());
                    store.populate(state, frames);
                }
                Err(err) => log::error!("[FAIL] {} : {}", state, err),
            }
        }
        store
    }

    fn load_music(settings: &Settings) -> Option<Music> {
        match Music::new(&settings.music_path, settings.music_volume) {
            Ok(music) => Some(music),
            Err(err) => {
                log::warn!("{}, animation will run at base speed", err);
                None
            }
        }
    }
}

impl Default for BeatSprite {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl Game for BeatSprite {
    async fn initialize(&self) -> Result<Box<dyn Game>> {
        match self {
            BeatSprite::Loading => {
                let settings = Self::load_settings().await;
                let (width, height) = browser::fit_canvas_to_window()?;
                let bounds = Bounds {
                    width: width as f32,
                    height: height as f32,
                };
                let frames = Self::load_frames().await;
                let music = Self::load_music(&settings);
                Ok(Box::new(BeatSprite::Loaded(Stage::new(
                    &settings, bounds, frames, music,
                ))))
            }
            BeatSprite::Loaded(_) => Err(anyhow!("Game is already initialized")),
        }
    }

    fn update(&mut self, keystate: &mut KeyState) {
        if let BeatSprite::Loaded(stage) = self {
            stage.update(keystate);
        }
    }

    fn draw(&self, renderer: &Renderer) {
        if let BeatSprite::Loaded(stage) = self {
            stage.draw(renderer);
        }
    }
}

/// Logical controls and the `KeyboardEvent.code` they are bound to
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Control {
    Left,
    Right,
    Jump,
    Shoot,
}

impl Control {
    pub fn code(self) -> &'static str {
        match self {
            Control::Left => "ArrowLeft",
            Control::Right => "ArrowRight",
            Control::Jump => "ArrowUp",
            Control::Shoot => "Space",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        [Control::Left, Control::Right, Control::Jump, Control::Shoot]
            .into_iter()
            .find(|control| control.code() == code)
    }
}

pub struct Stage {
    player: PlayerStateMachine,
    frames: FrameStore<SheetFrame>,
    clock: AmplitudeClock,
    reading: ClockReading,
    music: Option<Music>,
    bounds: Bounds,
}

impl Stage {
    pub fn new(
        settings: &Settings,
        bounds: Bounds,
        frames: FrameStore<SheetFrame>,
        music: Option<Music>,
    ) -> Self {
        let clock = AmplitudeClock::new(settings.base_frame_delay);
        let reading = ClockReading {
            effective_delay: clock.base_delay(),
            speed_multiplier: 1.0,
        };
        Stage {
            player: PlayerStateMachine::new(Physics::from(settings), bounds),
            frames,
            clock,
            reading,
            music,
            bounds,
        }
    }

    pub fn player(&self) -> &PlayerStateMachine {
        &self.player
    }

    pub fn update(&mut self, keystate: &mut KeyState) {
        let events: Vec<InputEvent> = keystate.drain_events().collect();
        for event in events {
            self.handle(event);
        }

        let held = Held {
            left: keystate.is_pressed(Control::Left.code()),
            right: keystate.is_pressed(Control::Right.code()),
        };
        let level = self.music.as_mut().and_then(|music| music.level());
        self.reading = self.clock.sample(level);

        self.player = self.player.transition(Event::Update(Tick {
            held,
            frames: self.frames.counts(),
            delay: self.reading.effective_delay,
        }));
    }

    fn handle(&mut self, event: InputEvent) {
        match event {
            InputEvent::Pressed(code) => {
                self.start_music();
                match Control::from_code(&code) {
                    Some(Control::Jump) => self.player = self.player.transition(Event::Jump),
                    Some(Control::Shoot) => self.player = self.player.transition(Event::Shoot),
                    _ => {}
                }
            }
            InputEvent::Released(code) => {
                if matches!(
                    Control::from_code(&code),
                    Some(Control::Left) | Some(Control::Right)
                ) {
                    self.player = self.player.transition(Event::Release);
                }
            }
            InputEvent::Resized => match browser::fit_canvas_to_window() {
                Ok((width, height)) => self.resize(Bounds {
                    width: width as f32,
                    height: height as f32,
                }),
                Err(err) => log::error!("Could not resize canvas : {:#}", err),
            },
        }
    }

    pub fn resize(&mut self, bounds: Bounds) {
        self.bounds = bounds;
        self.player = self.player.transition(Event::Resize(bounds));
    }

    fn start_music(&self) {
        if let Some(music) = &self.music {
            if !music.is_playing() {
                music.play();
            }
        }
    }

    /// Overlay text : pose flags, then the current animation speed
    pub fn status_lines(&self) -> [String; 2] {
        let player = &self.player;
        [
            format!(
                "state: {} | facing: {} | jumping: {} | shooting: {}",
                player.state(),
                player.facing().name(),
                player.is_jumping(),
                player.is_shooting()
            ),
            format!("animation speed: {}x", self.reading.speed_multiplier),
        ]
    }

    fn draw(&self, renderer: &Renderer) {
        let canvas = Rect::new(
            Point::default(),
            Size {
                width: self.bounds.width,
                height: self.bounds.height,
            },
        );
        // Draw order matters : background -> character -> overlay
        renderer.fill_rect(&canvas, "#FFD2D2");
        self.player.draw(renderer, &self.frames);

        let style = TextStyle {
            font: "14px sans-serif",
            color: "rgba(0, 0, 0, 0.47)",
            align: "center",
            baseline: "top",
        };
        let [status, speed] = self.status_lines();
        let center = self.bounds.width / 2.0;
        renderer.draw_text(&status, Point { x: center, y: 8.0 }, &style);
        renderer.draw_text(&speed, Point { x: center, y: 42.0 }, &style);
    }
}
