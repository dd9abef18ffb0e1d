pub mod actor;
pub mod broadcast;
pub mod handler;
pub mod protocol;
pub mod registry;

pub use broadcast::{Broadcaster, Delivery};
pub use registry::{ConnectionRegistry, ConnectionSender, Session, SessionId};
