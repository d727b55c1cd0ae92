//! Error types for asset loading and audio setup.
//!
//! None of these abort the game: a sprite error leaves that animation without
//! frames, an audio error leaves the clock at its neutral speed.

use thiserror::Error;

/// Errors produced while loading and slicing a sprite sheet
#[derive(Debug, Error, PartialEq)]
pub enum AssetError {
    /// The sheet could not be fetched or the image element refused it
    #[error("Could not load sprite sheet '{path}': {reason}")]
    Load {
        /// Sheet path as requested
        path: String,
        /// Browser supplied reason
        reason: String,
    },

    /// The decoded sheet cannot hold a single frame
    #[error("Sprite sheet '{path}' is {width}px wide, narrower than one {frame_width}px frame")]
    Decode {
        /// Sheet path as requested
        path: String,
        /// Decoded sheet width
        width: u32,
        /// Expected width of a single frame
        frame_width: u32,
    },

    /// Slicing frame `index` fell outside of the decoded sheet
    #[error("Sprite sheet '{path}': frame {index} exceeds the sheet bounds")]
    Slice {
        /// Sheet path as requested
        path: String,
        /// Index of the first frame that failed
        index: usize,
    },
}

/// Errors produced while wiring up background music
#[derive(Debug, Error, PartialEq)]
pub enum AudioError {
    /// Audio element or Web Audio graph is not available
    #[error("Audio unavailable: {0}")]
    Unavailable(String),
}
