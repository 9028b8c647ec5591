use crate::errors::BotError;

pub type Result<T> = std::result::Result<T, BotError>;
