use crate::browser;
use crate::error::AudioError;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;
use web_sys::{AnalyserNode, AudioContext, HtmlAudioElement};

// exponential smoothing coefficient applied every tick
const SMOOTHING: f32 = 0.12;
// loudness domain mapped onto the playback speed range, both ends saturate
const LEVEL_DOMAIN: (f32, f32) = (0.0, 0.2);
const SPEED_RANGE: (f32, f32) = (0.5, 2.0);
const FFT_SIZE: u32 = 1024;

/// Live loudness, `None` while nothing is playing
pub trait LevelSource {
    fn level(&mut self) -> Option<f32>;
}

/// What the clock decided for one tick
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ClockReading {
    /// ticks before the animation cursor may advance
    pub effective_delay: u32,
    /// `base / effective`, rounded to two decimals for display
    pub speed_multiplier: f32,
}

/// Converts music loudness into an animation gate period
/// ┌──────────────┐  lerp 0.12   ┌──────────┐  map [0,0.2]→[0.5,2]  ┌──────────────┐
/// │ raw level    ├─────────────►│ smoothed ├──────────────────────►│ speed factor │
/// └──────────────┘              └──────────┘                       └──────┬───────┘
///                                         max(1, round(base / factor))    │
///                                                  effective delay ◄──────┘
#[derive(Debug, Clone, PartialEq)]
pub struct AmplitudeClock {
    smoothed: f32,
    base_delay: u32,
}

impl AmplitudeClock {
    pub fn new(base_delay: u32) -> Self {
        AmplitudeClock {
            smoothed: 0.0,
            base_delay: base_delay.max(1),
        }
    }

    pub fn smoothed(&self) -> f32 {
        self.smoothed
    }

    pub fn base_delay(&self) -> u32 {
        self.base_delay
    }

    /// Feed one tick of loudness
    /// - `None` (no music) keeps the smoothed level and plays at base speed
    pub fn sample(&mut self, level: Option<f32>) -> ClockReading {
        let effective_delay = match level {
            Some(level) => {
                self.smoothed = lerp(self.smoothed, level, SMOOTHING);
                self.delay_for(speed_factor(self.smoothed))
            }
            None => self.base_delay,
        };
        ClockReading {
            effective_delay,
            speed_multiplier: self.multiplier(effective_delay),
        }
    }

    fn delay_for(&self, factor: f32) -> u32 {
        ((self.base_delay as f32 / factor).round() as u32).max(1)
    }

    fn multiplier(&self, effective_delay: u32) -> f32 {
        (self.base_delay as f32 / effective_delay as f32 * 100.0).round() / 100.0
    }
}

fn lerp(from: f32, to: f32, amount: f32) -> f32 {
    from + (to - from) * amount
}

/// Clamped linear map of a smoothed level onto the speed range
pub fn speed_factor(level: f32) -> f32 {
    let (low, high) = LEVEL_DOMAIN;
    let (slow, fast) = SPEED_RANGE;
    let t = ((level - low) / (high - low)).clamp(0.0, 1.0);
    slow + (fast - slow) * t
}

/// Background music routed through an analyser so its loudness can drive the
/// clock
pub struct Music {
    element: HtmlAudioElement,
    analyser: Option<Analyser>,
    samples: Vec<f32>,
}

struct Analyser {
    context: AudioContext,
    node: AnalyserNode,
}

impl Music {
    /// Create the audio element; the analyser is optional on top of it
    /// # Returns
    /// * `Err(AudioError::Unavailable)` - no audio element could be created
    pub fn new(source: &str, volume: f64) -> Result<Self, AudioError> {
        let element = HtmlAudioElement::new_with_src(source)
            .map_err(|err| AudioError::Unavailable(format!("{:#?}", err)))?;
        element.set_loop(true);
        element.set_volume(volume);

        let analyser = match Self::connect_analyser(&element) {
            Ok(analyser) => Some(analyser),
            Err(err) => {
                log::warn!("{err}, animation will run at base speed");
                None
            }
        };

        Ok(Music {
            element,
            analyser,
            samples: vec![0.0; FFT_SIZE as usize],
        })
    }

    fn connect_analyser(element: &HtmlAudioElement) -> Result<Analyser, AudioError> {
        let unavailable = |err: JsValue| AudioError::Unavailable(format!("{:#?}", err));

        let context = AudioContext::new().map_err(unavailable)?;
        let source = context
            .create_media_element_source(element)
            .map_err(unavailable)?;
        let node = context.create_analyser().map_err(unavailable)?;
        node.set_fft_size(FFT_SIZE);
        source.connect_with_audio_node(&node).map_err(unavailable)?;
        node.connect_with_audio_node(&context.destination())
            .map_err(unavailable)?;

        Ok(Analyser { context, node })
    }

    pub fn is_playing(&self) -> bool {
        !self.element.paused()
    }

    /// Start looping playback; browsers only allow this after a user gesture
    pub fn play(&self) {
        if let Some(analyser) = &self.analyser {
            if let Ok(promise) = analyser.context.resume() {
                browser::spawn_local(async move {
                    if let Err(err) = JsFuture::from(promise).await {
                        log::warn!("Could not resume audio context : {:#?}", err);
                    }
                });
            }
        }
        match self.element.play() {
            Ok(promise) => browser::spawn_local(async move {
                if let Err(err) = JsFuture::from(promise).await {
                    log::warn!("Music refused to play : {:#?}", err);
                }
            }),
            Err(err) => log::warn!("Music refused to play : {:#?}", err),
        }
    }
}

impl LevelSource for Music {
    /// RMS of the current time domain window
    fn level(&mut self) -> Option<f32> {
        if !self.is_playing() {
            return None;
        }
        let analyser = self.analyser.as_ref()?;
        analyser.node.get_float_time_domain_data(&mut self.samples);
        Some(rms(&self.samples))
    }
}

fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn silence_halves_the_speed() {
        let mut clock = AmplitudeClock::new(6);
        let reading = clock.sample(Some(0.0));
        assert_eq!(reading.effective_delay, 12);
        assert_relative_eq!(reading.speed_multiplier, 0.5);
    }

    #[test]
    fn loud_level_doubles_the_speed() {
        assert_relative_eq!(speed_factor(0.2), 2.0);
        let clock = AmplitudeClock::new(6);
        assert_eq!(clock.delay_for(speed_factor(0.2)), 3);
    }

    #[test]
    fn delay_never_drops_below_one() {
        let clock = AmplitudeClock::new(1);
        assert_eq!(clock.delay_for(speed_factor(0.2)), 1);
    }

    #[test]
    fn speed_factor_saturates_outside_domain() {
        assert_relative_eq!(speed_factor(-1.0), 0.5);
        assert_relative_eq!(speed_factor(5.0), 2.0);
        assert_relative_eq!(speed_factor(0.1), 1.25);
    }

    #[test]
    fn smoothing_moves_twelve_percent_per_tick() {
        let mut clock = AmplitudeClock::new(6);
        clock.sample(Some(1.0));
        assert_relative_eq!(clock.smoothed(), 0.12);
        clock.sample(Some(1.0));
        assert_relative_eq!(clock.smoothed(), 0.12 + 0.88 * 0.12);
    }

    #[test]
    fn sustained_loudness_converges_to_fastest_delay() {
        let mut clock = AmplitudeClock::new(6);
        let mut reading = clock.sample(Some(0.5));
        for _ in 0..100 {
            reading = clock.sample(Some(0.5));
        }
        assert_eq!(reading.effective_delay, 3);
        assert_relative_eq!(reading.speed_multiplier, 2.0);
    }

    #[test]
    fn no_audio_runs_at_base_delay_and_keeps_level() {
        let mut clock = AmplitudeClock::new(6);
        clock.sample(Some(0.2));
        let smoothed = clock.smoothed();

        let reading = clock.sample(None);
        assert_eq!(reading.effective_delay, 6);
        assert_relative_eq!(reading.speed_multiplier, 1.0);
        assert_relative_eq!(clock.smoothed(), smoothed);
    }

    #[test]
    fn multiplier_rounds_to_two_decimals() {
        let clock = AmplitudeClock::new(6);
        assert_relative_eq!(clock.multiplier(7), 0.86);
        assert_relative_eq!(clock.multiplier(5), 1.2);
    }

    #[test]
    fn rms_of_constant_signal_is_its_magnitude() {
        assert_relative_eq!(rms(&[0.5, -0.5, 0.5, -0.5]), 0.5);
        assert_eq!(rms(&[]), 0.0);
    }
}
