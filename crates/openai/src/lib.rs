mod client;
mod error;

pub use deck_live_openai_types as types;
pub use client::config::{Config, ConfigBuilder};
pub use client::stats::Stats;
pub use client::Client;
pub use client::consts;
pub use error::Error;
