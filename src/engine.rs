use crate::browser;
use anyhow::{anyhow, Error, Result};
// ELI5: web assembly is a single threaded environment, so Rc RefCell > Mutex
use async_trait::async_trait;
use futures::channel::oneshot::channel;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::{
    // unchecked_ref (unsafe) cast from Javascript type to Rust type
    // - because we control the closure creation and specify the expected type,
    // in principle this should be generally safe (unsafe) code
    JsCast,
    JsValue,
};
use web_sys::{CanvasRenderingContext2d, HtmlImageElement};

use self::input::KeyState;

#[async_trait(?Send)]
pub trait Game {
    async fn initialize(&self) -> Result<Box<dyn Game>>;
    fn update(&mut self, keystate: &mut KeyState);
    fn draw(&self, renderer: &Renderer);
}

// length of a frame in milliseconds
const FRAME_SIZE: f32 = 1.0 / 60.0 * 1000.0;
// most updates a single callback may run, a hidden tab resumes from here
const MAX_CATCH_UP_STEPS: f32 = 5.0;

pub struct GameLoop {
    last_frame: f64,
    accumulated_delta: f32,
}

type SharedLoopClosure = Rc<RefCell<Option<browser::LoopClosure>>>;

impl GameLoop {
    // TABLE:
    // ┌──────────── One requestAnimationFrame callback ─────────────┐
    // │ 1. drain keyboard / resize events into KeyState             │
    // │ 2. game.update() once per elapsed FRAME_SIZE (fixed step)   │
    // │ 3. game.draw() once                                         │
    // │ 4. request the next frame                                   │
    // └─────────────────────────────────────────────────────────────┘
    pub async fn start(game: impl Game + 'static) -> Result<()> {
        let mut events = input::prepare_input()?;
        let mut game = game.initialize().await?;
        let mut keystate = KeyState::new();
        let mut game_loop = GameLoop {
            last_frame: browser::now()?,
            accumulated_delta: 0.0,
        };
        let renderer = Renderer {
            context: browser::context()?,
        };
        let f: SharedLoopClosure = Rc::new(RefCell::new(None));
        let g = f.clone();
        *g.borrow_mut() = Some(browser::create_raf_closure(move |perf: f64| {
            input::process_input(&mut keystate, &mut events);

            let (steps, remainder) = fixed_steps(
                game_loop.accumulated_delta + (perf - game_loop.last_frame) as f32,
            );
            for _ in 0..steps {
                game.update(&mut keystate);
            }
            game_loop.accumulated_delta = remainder;
            game_loop.last_frame = perf;
            game.draw(&renderer);

            if let Some(next) = f.borrow().as_ref() {
                if let Err(err) = browser::request_animation_frame(next) {
                    log::error!("GameLoop stopped : {:#}", err);
                }
            }
        }));

        browser::request_animation_frame(
            g.borrow()
                .as_ref()
                .ok_or_else(|| anyhow!("GameLoop: Loop is None"))?,
        )?;

        Ok(())
    }
}

/// Split elapsed time into whole update steps
/// # Returns
/// * `(steps, remainder)` - remainder carries into the next callback
fn fixed_steps(accumulated: f32) -> (u32, f32) {
    let mut accumulated = accumulated.min(FRAME_SIZE * MAX_CATCH_UP_STEPS);
    let mut steps = 0;
    while accumulated > FRAME_SIZE {
        accumulated -= FRAME_SIZE;
        steps += 1;
    }
    (steps, accumulated)
}

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Rect {
    pub position: Point,
    pub size: Size,
}

impl Rect {
    pub fn new(position: Point, size: Size) -> Self {
        Rect { position, size }
    }

    pub fn x(&self) -> f32 {
        self.position.x
    }

    pub fn y(&self) -> f32 {
        self.position.y
    }

    pub fn width(&self) -> f32 {
        self.size.width
    }

    pub fn height(&self) -> f32 {
        self.size.height
    }
}

/// How a line of text is painted
pub struct TextStyle<'a> {
    pub font: &'a str,
    pub color: &'a str,
    pub align: &'a str,
    pub baseline: &'a str,
}

pub struct Renderer {
    context: CanvasRenderingContext2d,
}

impl Renderer {
    pub fn fill_rect(&self, rect: &Rect, color: &str) {
        self.context.set_fill_style_str(color);
        self.context.fill_rect(
            rect.x().into(),
            rect.y().into(),
            rect.width().into(),
            rect.height().into(),
        );
    }

    /// Draw `frame` of `image` centered on `center`
    /// - `mirrored` flips it horizontally around its own center
    pub fn draw_sprite(
        &self,
        image: &HtmlImageElement,
        frame: &Rect,
        center: Point,
        size: Size,
        mirrored: bool,
    ) {
        // transform stays between save / restore
        self.context.save();
        if let Err(err) = self.draw_transformed(image, frame, center, size, mirrored) {
            log::error!("Could not draw sprite : {:#?}", err);
        }
        self.context.restore();
    }

    fn draw_transformed(
        &self,
        image: &HtmlImageElement,
        frame: &Rect,
        center: Point,
        size: Size,
        mirrored: bool,
    ) -> std::result::Result<(), JsValue> {
        self.context.translate(center.x.into(), center.y.into())?;
        if mirrored {
            self.context.scale(-1.0, 1.0)?;
        }
        self.context
            .draw_image_with_html_image_element_and_sw_and_sh_and_dx_and_dy_and_dw_and_dh(
                image,
                frame.x().into(),
                frame.y().into(),
                frame.width().into(),
                frame.height().into(),
                (-size.width / 2.0).into(),
                (-size.height / 2.0).into(),
                size.width.into(),
                size.height.into(),
            )
    }

    pub fn draw_text(&self, text: &str, position: Point, style: &TextStyle) {
        self.context.set_font(style.font);
        self.context.set_fill_style_str(style.color);
        self.context.set_text_align(style.align);
        self.context.set_text_baseline(style.baseline);
        if let Err(err) = self
            .context
            .fill_text(text, position.x.into(), position.y.into())
        {
            log::error!("Could not draw text '{}' : {:#?}", text, err);
        }
    }

    /// Red diagnostic lines, first one centered on `anchor`, 30px apart
    pub fn draw_placeholder(&self, lines: &[String], anchor: Point) {
        let style = TextStyle {
            font: "20px sans-serif",
            color: "rgb(255, 0, 0)",
            align: "center",
            baseline: "alphabetic",
        };
        for (i, line) in lines.iter().enumerate() {
            let position = Point {
                x: anchor.x,
                y: anchor.y + 30.0 * i as f32,
            };
            self.draw_text(line, position, &style);
        }
    }
}

/// Asynchronously load an image from a given source path
/// # Arguments
/// * `source` - string slice to path/url
/// # Returns
/// * `Ok(HtmlImageElement)` - on load success
/// * `Err` - on load fail
pub async fn load_image(source: &str) -> Result<HtmlImageElement> {
    let image = browser::new_image()?;
    let (tx, rx) = channel::<Result<(), Error>>();
    let success_tx = Rc::new(RefCell::new(Some(tx)));
    let error_tx = success_tx.clone();
    let path = source.to_string();

    let success_callback = browser::closure_once(move || {
        if let Some(tx) = success_tx.borrow_mut().take() {
            let _ = tx.send(Ok(()));
        }
    });

    let error_callback = browser::closure_once(move |err: JsValue| {
        if let Some(tx) = error_tx.borrow_mut().take() {
            let _ = tx.send(Err(anyhow!(
                "[engine.rs::load_image] Error loading image '{}': {:#?}",
                path,
                err
            )));
        }
    });

    image.set_onload(Some(success_callback.as_ref().unchecked_ref()));
    image.set_onerror(Some(error_callback.as_ref().unchecked_ref()));
    image.set_src(source);

    // keep callback alive until image is loaded or errors
    success_callback.forget();
    error_callback.forget();

    // ?? - double unwrap because Result<Result<(), Error>, oneshot::Canceled>
    // - first unwrap yields channel result : Result<(), Error>
    // - second unwrap yields image load result : () or propagating Error
    rx.await??;

    Ok(image)
}


pub mod input {
    use crate::browser;
    use anyhow::Result;
    use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
    use std::collections::{HashSet, VecDeque};
    use wasm_bindgen::JsCast;
    use web_sys::KeyboardEvent;

    // keys the page would otherwise scroll on
    const CAPTURED_CODES: [&str; 5] = ["ArrowLeft", "ArrowRight", "ArrowUp", "ArrowDown", "Space"];

    /// What the DOM callbacks push, in arrival order
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum BrowserEvent {
        KeyDown(String),
        KeyUp(String),
        Resize,
        Blur,
    }

    /// Edge triggered events, one per physical press / release
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum InputEvent {
        Pressed(String),
        Released(String),
        Resized,
    }

    /// ┌──────────── KeyState ────────────┐
    /// │ held   : polled every tick       │  continuous movement
    /// │ events : drained by the game     │  jump / shoot / release / resize
    /// └──────────────────────────────────┘
    #[derive(Debug, Default)]
    pub struct KeyState {
        held: HashSet<String>,
        events: VecDeque<InputEvent>,
    }

    impl KeyState {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn is_pressed(&self, code: &str) -> bool {
            self.held.contains(code)
        }

        /// keyboard auto repeat arrives as more keydowns, only the first counts
        pub fn set_pressed(&mut self, code: &str) {
            if self.held.insert(code.to_string()) {
                self.events.push_back(InputEvent::Pressed(code.to_string()));
            }
        }

        pub fn set_released(&mut self, code: &str) {
            if self.held.remove(code) {
                self.events.push_back(InputEvent::Released(code.to_string()));
            }
        }

        /// window lost focus : its keyups never arrive, release everything
        pub fn release_all(&mut self) {
            let mut codes: Vec<String> = self.held.drain().collect();
            codes.sort();
            self.events.extend(codes.into_iter().map(InputEvent::Released));
        }

        pub fn set_resized(&mut self) {
            self.events.push_back(InputEvent::Resized);
        }

        pub fn drain_events(&mut self) -> impl Iterator<Item = InputEvent> + '_ {
            self.events.drain(..)
        }
    }

    /// Hook keyboard and resize callbacks on the window
    /// # Returns
    /// * receiving end of the event queue, drained by `process_input`
    pub fn prepare_input() -> Result<UnboundedReceiver<BrowserEvent>> {
        let (sender, receiver) = unbounded();
        let window = browser::window()?;

        let keydown_sender = sender.clone();
        let onkeydown = browser::closure_wrap(Box::new(move |event: KeyboardEvent| {
            capture(&event);
            send(&keydown_sender, BrowserEvent::KeyDown(event.code()));
        }) as Box<dyn FnMut(KeyboardEvent)>);

        let keyup_sender = sender.clone();
        let onkeyup = browser::closure_wrap(Box::new(move |event: KeyboardEvent| {
            capture(&event);
            send(&keyup_sender, BrowserEvent::KeyUp(event.code()));
        }) as Box<dyn FnMut(KeyboardEvent)>);

        let resize_sender = sender.clone();
        let onresize = browser::closure_wrap(Box::new(move |_event: web_sys::Event| {
            send(&resize_sender, BrowserEvent::Resize);
        }) as Box<dyn FnMut(web_sys::Event)>);

        let onblur = browser::closure_wrap(Box::new(move |_event: web_sys::Event| {
            send(&sender, BrowserEvent::Blur);
        }) as Box<dyn FnMut(web_sys::Event)>);

        window.set_onkeydown(Some(onkeydown.as_ref().unchecked_ref()));
        window.set_onkeyup(Some(onkeyup.as_ref().unchecked_ref()));
        window.set_onresize(Some(onresize.as_ref().unchecked_ref()));
        window.set_onblur(Some(onblur.as_ref().unchecked_ref()));

        // callbacks live for the whole page
        onkeydown.forget();
        onkeyup.forget();
        onresize.forget();
        onblur.forget();

        Ok(receiver)
    }

    fn capture(event: &KeyboardEvent) {
        if CAPTURED_CODES.contains(&event.code().as_str()) {
            event.prevent_default();
        }
    }

    fn send(sender: &UnboundedSender<BrowserEvent>, event: BrowserEvent) {
        if let Err(err) = sender.unbounded_send(event) {
            log::warn!("Dropped input event : {:#?}", err);
        }
    }

    /// Move everything queued since the last frame into the key state
    pub fn process_input(state: &mut KeyState, receiver: &mut UnboundedReceiver<BrowserEvent>) {
        // Ok(Some) event, Ok(None) channel closed, Err queue empty
        while let Ok(Some(event)) = receiver.try_next() {
            apply(state, event);
        }
    }

    pub fn apply(state: &mut KeyState, event: BrowserEvent) {
        match event {
            BrowserEvent::KeyDown(code) => state.set_pressed(&code),
            BrowserEvent::KeyUp(code) => state.set_released(&code),
            BrowserEvent::Resize => state.set_resized(),
            BrowserEvent::Blur => state.release_all(),
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn auto_repeat_presses_once() {
            let mut state = KeyState::new();
            for _ in 0..3 {
                apply(&mut state, BrowserEvent::KeyDown("ArrowUp".to_string()));
            }
            assert!(state.is_pressed("ArrowUp"));
            let events: Vec<_> = state.drain_events().collect();
            assert_eq!(events, vec![InputEvent::Pressed("ArrowUp".to_string())]);
        }

        #[test]
        fn release_clears_held_and_queues_once() {
            let mut state = KeyState::new();
            apply(&mut state, BrowserEvent::KeyDown("ArrowLeft".to_string()));
            apply(&mut state, BrowserEvent::KeyUp("ArrowLeft".to_string()));
            apply(&mut state, BrowserEvent::KeyUp("ArrowLeft".to_string()));
            assert!(!state.is_pressed("ArrowLeft"));

            let events: Vec<_> = state.drain_events().collect();
            assert_eq!(
                events,
                vec![
                    InputEvent::Pressed("ArrowLeft".to_string()),
                    InputEvent::Released("ArrowLeft".to_string()),
                ]
            );
        }

        #[test]
        fn events_drain_in_arrival_order() {
            let mut state = KeyState::new();
            apply(&mut state, BrowserEvent::KeyDown("Space".to_string()));
            apply(&mut state, BrowserEvent::Resize);
            apply(&mut state, BrowserEvent::KeyDown("ArrowUp".to_string()));

            let events: Vec<_> = state.drain_events().collect();
            assert_eq!(
                events,
                vec![
                    InputEvent::Pressed("Space".to_string()),
                    InputEvent::Resized,
                    InputEvent::Pressed("ArrowUp".to_string()),
                ]
            );
            assert_eq!(state.drain_events().count(), 0);
            assert!(state.is_pressed("Space"));
        }

        #[test]
        fn blur_releases_every_held_key() {
            let mut state = KeyState::new();
            apply(&mut state, BrowserEvent::KeyDown("ArrowRight".to_string()));
            apply(&mut state, BrowserEvent::KeyDown("ArrowLeft".to_string()));
            state.drain_events().for_each(drop);

            apply(&mut state, BrowserEvent::Blur);
            assert!(!state.is_pressed("ArrowLeft"));
            assert!(!state.is_pressed("ArrowRight"));
            let events: Vec<_> = state.drain_events().collect();
            assert_eq!(
                events,
                vec![
                    InputEvent::Released("ArrowLeft".to_string()),
                    InputEvent::Released("ArrowRight".to_string()),
                ]
            );

            // nothing held, nothing to release
            apply(&mut state, BrowserEvent::Blur);
            assert_eq!(state.drain_events().count(), 0);
        }

        #[test]
        fn process_input_drains_the_channel() {
            let (sender, mut receiver) = unbounded();
            sender
                .unbounded_send(BrowserEvent::KeyDown("ArrowRight".to_string()))
                .unwrap();
            sender.unbounded_send(BrowserEvent::Resize).unwrap();

            let mut state = KeyState::new();
            process_input(&mut state, &mut receiver);
            assert!(state.is_pressed("ArrowRight"));
            assert_eq!(state.drain_events().count(), 2);
        }
    }
}
