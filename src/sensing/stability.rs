//! Debounce for raw detections.
//!
//! A (package, content type) pair is only passed on once it has been seen on
//! consecutive evaluations, so a transient loading screen or a one-frame
//! mis-detection never reaches the session manager on its own.

use crate::models::{ContentType, EventKind, StableDetection};
use crate::settings::StabilitySettings;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StabilityState {
    pub last_package: Option<String>,
    pub last_type: Option<ContentType>,
    pub consecutive: u32,
    pub last_eval_ms: Option<i64>,
}

/// One filter per observed stream.
#[derive(Debug, Clone)]
pub struct StabilityFilter {
    settings: StabilitySettings,
    state: StabilityState,
}

impl Default for StabilityFilter {
    fn default() -> Self {
        Self::new(StabilitySettings::default())
    }
}

impl StabilityFilter {
    pub fn new(settings: StabilitySettings) -> Self {
        Self {
            settings,
            state: StabilityState::default(),
        }
    }

    pub fn state(&self) -> &StabilityState {
        &self.state
    }

    pub fn evaluate(
        &mut self,
        package_id: &str,
        content_type: ContentType,
        kind: EventKind,
        now_ms: i64,
    ) -> Option<StableDetection> {
        if package_id.trim().is_empty() {
            return None;
        }

        if !kind.is_important() && self.in_cooldown(now_ms) {
            return None;
        }

        let same_pair = self.state.last_package.as_deref() == Some(package_id)
            && self.state.last_type == Some(content_type);
        if same_pair {
            self.state.consecutive = self.state.consecutive.saturating_add(1);
        } else {
            self.state.last_package = Some(package_id.to_string());
            self.state.last_type = Some(content_type);
            self.state.consecutive = 1;
        }
        self.state.last_eval_ms = Some(now_ms);

        (self.state.consecutive >= self.settings.required_stable).then(|| StableDetection {
            package_id: package_id.to_string(),
            content_type,
            timestamp_ms: now_ms,
            consecutive: self.state.consecutive,
        })
    }

    pub fn reset(&mut self) {
        self.state = StabilityState::default();
    }

    fn in_cooldown(&self, now_ms: i64) -> bool {
        self.state
            .last_eval_ms
            .is_some_and(|last| now_ms.saturating_sub(last) < self.settings.cooldown_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PKG: &str = "com.instagram.android";

    #[test]
    fn single_observation_never_emits() {
        let mut filter = StabilityFilter::default();
        assert!(filter
            .evaluate(PKG, ContentType::Video, EventKind::WindowStateChanged, 0)
            .is_none());
    }

    #[test]
    fn second_consecutive_observation_emits() {
        let mut filter = StabilityFilter::default();
        filter.evaluate(PKG, ContentType::Video, EventKind::WindowStateChanged, 0);
        let stable = filter
            .evaluate(PKG, ContentType::Video, EventKind::WindowStateChanged, 10)
            .unwrap();

        assert_eq!(stable.package_id, PKG);
        assert_eq!(stable.content_type, ContentType::Video);
        assert_eq!(stable.timestamp_ms, 10);
        assert_eq!(stable.consecutive, 2);
    }

    #[test]
    fn mismatch_resets_the_counter() {
        let mut filter = StabilityFilter::default();
        filter.evaluate(PKG, ContentType::Video, EventKind::Scrolled, 0);
        assert!(filter
            .evaluate(PKG, ContentType::Text, EventKind::Scrolled, 100)
            .is_none());
        assert_eq!(filter.state().consecutive, 1);
        assert_eq!(filter.state().last_type, Some(ContentType::Text));

        assert!(filter
            .evaluate(PKG, ContentType::Video, EventKind::Scrolled, 200)
            .is_none());
    }

    #[test]
    fn cooldown_drops_unimportant_events() {
        let mut filter = StabilityFilter::default();
        filter.evaluate(PKG, ContentType::Video, EventKind::Clicked, 0);
        let before = filter.state().clone();

        assert!(filter
            .evaluate(PKG, ContentType::Video, EventKind::Focused, 2_999)
            .is_none());
        assert_eq!(filter.state(), &before);

        let stable = filter.evaluate(PKG, ContentType::Video, EventKind::Other, 3_000);
        assert!(stable.is_some());
    }

    #[test]
    fn important_events_bypass_cooldown() {
        let mut filter = StabilityFilter::default();
        filter.evaluate(PKG, ContentType::Video, EventKind::ContentChanged, 0);
        assert!(filter
            .evaluate(PKG, ContentType::Video, EventKind::ContentChanged, 5)
            .is_some());
    }

    #[test]
    fn extreme_timestamps_stay_in_cooldown_without_overflow() {
        let mut filter = StabilityFilter::default();
        filter.evaluate(PKG, ContentType::Video, EventKind::Clicked, 1);
        let before = filter.state().clone();

        assert!(filter
            .evaluate(PKG, ContentType::Video, EventKind::Focused, i64::MIN)
            .is_none());
        assert_eq!(filter.state(), &before);
    }

    #[test]
    fn blank_package_is_skipped_without_touching_state() {
        let mut filter = StabilityFilter::default();
        filter.evaluate(PKG, ContentType::Video, EventKind::Scrolled, 0);
        let before = filter.state().clone();

        assert!(filter
            .evaluate("  ", ContentType::Video, EventKind::Scrolled, 10)
            .is_none());
        assert_eq!(filter.state(), &before);
    }

    #[test]
    fn required_count_is_configurable() {
        let mut filter = StabilityFilter::new(StabilitySettings {
            cooldown_ms: 0,
            required_stable: 3,
        });
        assert!(filter.evaluate(PKG, ContentType::Text, EventKind::Other, 0).is_none());
        assert!(filter.evaluate(PKG, ContentType::Text, EventKind::Other, 1).is_none());
        assert!(filter.evaluate(PKG, ContentType::Text, EventKind::Other, 2).is_some());
    }
}
