use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscordApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid REST response: {0}")]
    ResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("The Discord bot is not configured: {0}")]
    NotConfigured(&'static str),
}
