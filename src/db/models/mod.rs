pub mod feedback;
pub mod session;

pub use feedback::FeedbackRecord;
pub use session::{CategoryUsage, NewSession, Session, SessionStatus};
