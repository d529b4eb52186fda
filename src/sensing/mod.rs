pub mod content_type;
pub mod controller;
pub mod loop_worker;
pub mod stability;

pub use content_type::detect_content_type;
pub use controller::IntakeController;
pub use loop_worker::{intake_loop, IntakeMessage};
pub use stability::{StabilityFilter, StabilityState};
