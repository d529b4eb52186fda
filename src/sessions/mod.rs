pub mod manager;
pub mod writer;

pub use manager::{ActiveSession, CloseSession, SessionCommand, SessionManager};
pub use writer::SessionWriter;
