pub mod analysis;
pub mod canvas;
pub mod config;
pub mod engine;
pub mod playback;
pub mod remote;
