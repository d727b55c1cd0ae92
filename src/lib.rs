// ==================== Imports ====================
use log::LevelFilter;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsValue;

pub mod audio;
pub mod browser;
pub mod config;
pub mod engine;
pub mod error;
pub mod game;
pub mod sprite;

use engine::GameLoop;
use game::BeatSprite;

// ==================== Main Functions ====================
/// Main entry for Webassembly module
/// - installs panic hook and console logger
/// - loads sheets, music and settings
/// - starts the game loop
#[wasm_bindgen]
pub fn main_js() -> Result<(), JsValue> {
    // setup better panic messages for debugging
    console_error_panic_hook::set_once();
    browser::init_logger(LevelFilter::Info);

    // spawns a new asynchronous task in local thread, for web assembly
    // environment, using wasm_bindgen_futures
    browser::spawn_local(async move {
        if let Err(err) = GameLoop::start(BeatSprite::new()).await {
            log::error!("Could not start game : {:#}", err);
        }
    });

    Ok(())
}
