mod connection;
pub mod helpers;
pub mod memory;
mod migrations;
pub mod models;
pub mod repositories;
pub mod store;

pub use connection::Database;
pub use memory::{MemoryFeedbackStore, MemorySessionStore};
pub use models::{CategoryUsage, FeedbackRecord, NewSession, Session, SessionStatus};
pub use store::{FeedbackStore, SessionStore};
