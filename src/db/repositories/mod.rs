pub mod feedback;
pub mod sessions;
