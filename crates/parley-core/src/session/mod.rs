pub mod actor;
pub mod command;

pub use actor::{SessionError, SessionHandle, SessionInput, spawn_session};
pub use command::Command;
