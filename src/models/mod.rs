pub mod classification;
pub mod event;

pub use classification::{ClassificationMethod, ClassificationResult};
pub use event::{ContentType, Detection, EventKind, ScreenEvent, StableDetection};
