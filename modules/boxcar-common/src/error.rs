use thiserror::Error;

use crate::types::{GameId, PlayerId};

#[derive(Error, Debug)]
pub enum BotError {
    #[error("game not found: {0}")]
    GameNotFound(GameId),

    #[error("player not found: {0}")]
    PlayerNotFound(PlayerId),

    #[error("invalid action: {0}")]
    InvalidAction(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
