pub mod config;
pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod server;
pub mod telegram;
pub mod transport;
pub mod validation;

pub use controller::Controller;
pub use dispatcher::Dispatcher;
pub use error::{BotError, TransportError};
