//! Slicing horizontal sprite sheets into frames, and the per state store the
//! controller and renderer read from.
//!
//! ```text
//!  sheet.width = 500, frame_width = 61, requested = 8
//!  ┌────┬────┬────┬────┬────┬────┬────┬────┬──┐
//!  │ 0  │ 1  │ 2  │ 3  │ 4  │ 5  │ 6  │ 7  │  │  -> 8 frames, the 12px tail is ignored
//!  └────┴────┴────┴────┴────┴────┴────┴────┴──┘
//!  sheet.width = 300 -> floor(300 / 61) = 4 frames, never padded back to 8
//! ```
use crate::engine::{Point, Rect, Size};
use crate::error::AssetError;
use crate::sprite::AnimationState;
use web_sys::HtmlImageElement;

/// Anything frames can be cut out of
pub trait SpriteSheet {
    type Frame;

    fn width(&self) -> u32;

    /// Cut a single frame, `None` when the rectangle leaves the sheet
    fn slice(&self, x: u32, y: u32, width: u32, height: u32) -> Option<Self::Frame>;
}

/// Cut `requested` frames of `frame_width` x `frame_height` from the top row of
/// `sheet`, left to right
/// # Returns
/// * `Ok(frames)` - `min(requested, floor(width / frame_width))` frames
/// * `Err` - sheet missing, narrower than one frame, or a slice failed. No
///   partial sequence is ever returned
pub fn extract<S: SpriteSheet>(
    sheet: Option<&S>,
    path: &str,
    frame_width: u32,
    frame_height: u32,
    requested: usize,
) -> Result<Vec<S::Frame>, AssetError> {
    let sheet = sheet.ok_or_else(|| AssetError::Load {
        path: path.to_string(),
        reason: "sheet was never decoded".to_string(),
    })?;

    let width = sheet.width();
    if frame_width == 0 || width < frame_width {
        return Err(AssetError::Decode {
            path: path.to_string(),
            width,
            frame_width,
        });
    }

    let available = (width / frame_width) as usize;
    let count = requested.min(available);
    (0..count)
        .map(|index| {
            sheet
                .slice(index as u32 * frame_width, 0, frame_width, frame_height)
                .ok_or_else(|| AssetError::Slice {
                    path: path.to_string(),
                    index,
                })
        })
        .collect()
}

/// `extract` with the geometry from the clip table
pub fn extract_clip<S: SpriteSheet>(
    sheet: Option<&S>,
    state: AnimationState,
) -> Result<Vec<S::Frame>, AssetError> {
    let spec = state.spec();
    extract(
        sheet,
        spec.path,
        spec.frame_width,
        spec.frame_height,
        spec.frame_count,
    )
}

/// A frame living inside a browser image : the sheet plus the source rectangle
#[derive(Debug, Clone)]
pub struct SheetFrame {
    pub image: HtmlImageElement,
    pub source: Rect,
}

impl SpriteSheet for HtmlImageElement {
    type Frame = SheetFrame;

    fn width(&self) -> u32 {
        self.natural_width()
    }

    fn slice(&self, x: u32, y: u32, width: u32, height: u32) -> Option<SheetFrame> {
        if x + width > self.natural_width() || y + height > self.natural_height() {
            return None;
        }
        Some(SheetFrame {
            image: self.clone(),
            source: Rect::new(
                Point {
                    x: x as f32,
                    y: y as f32,
                },
                Size {
                    width: width as f32,
                    height: height as f32,
                },
            ),
        })
    }
}

/// Number of usable frames per state, what the controller needs from the store
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct FrameCounts([usize; AnimationState::COUNT]);

impl FrameCounts {
    /// every state fully populated with its nominal frame count
    pub fn nominal() -> Self {
        FrameCounts(AnimationState::ALL.map(|state| state.spec().frame_count))
    }

    pub fn with(mut self, state: AnimationState, count: usize) -> Self {
        self.0[state.index()] = count;
        self
    }

    pub fn get(&self, state: AnimationState) -> usize {
        self.0[state.index()]
    }
}

/// Ordered frames per animation state
/// - filled once after loading, read only afterwards
/// - a state may stay empty for the whole run when its sheet failed
#[derive(Debug, Clone)]
pub struct FrameStore<F> {
    frames: [Vec<F>; AnimationState::COUNT],
}

impl<F> Default for FrameStore<F> {
    fn default() -> Self {
        FrameStore {
            frames: std::array::from_fn(|_| Vec::new()),
        }
    }
}

impl<F> FrameStore<F> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate a state; a state that already has frames is left alone
    pub fn populate(&mut self, state: AnimationState, frames: Vec<F>) {
        let slot = &mut self.frames[state.index()];
        if !slot.is_empty() {
            log::warn!("frames for [{state}] already loaded, ignoring second set");
            return;
        }
        *slot = frames;
    }

    pub fn frames(&self, state: AnimationState) -> &[F] {
        &self.frames[state.index()]
    }

    pub fn frame(&self, state: AnimationState, index: usize) -> Option<&F> {
        self.frames[state.index()].get(index)
    }

    pub fn counts(&self) -> FrameCounts {
        FrameCounts(std::array::from_fn(|i| self.frames[i].len()))
    }
}
