pub mod board;
pub mod config;
pub mod error;
pub mod profiles;
pub mod types;

pub use board::*;
pub use config::BotConfig;
pub use error::BotError;
pub use profiles::*;
pub use types::*;
