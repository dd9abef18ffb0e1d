pub mod config;
pub mod connection;
pub mod error;
pub mod roster;
pub mod session;
pub mod timer;
pub mod typing;
pub mod view;

pub use connection::{ConnectionStatus, Connector, Reconnector};
pub use error::ClientError;
pub use session::{InputEvent, WsConnector};
