pub mod logging;
pub mod time;

pub use time::now_ms;
