pub mod classifier;
pub mod feedback;
pub mod keywords;
pub mod package_rules;
pub mod strategies;

pub use classifier::ContentClassifier;
pub use feedback::{record_user_feedback, CachedFeedbackStore};
pub use keywords::KeywordStore;
pub use package_rules::{app_label, PackageRuleTable};
pub use strategies::{ClassificationInput, ClassificationStrategy};
