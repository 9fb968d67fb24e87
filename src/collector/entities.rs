//! Dynamic entity set tracking.
//!
//! The standby application list changes as replication clients attach and
//! detach. Each refresh replaces the tracked membership wholesale and
//! notifies an injected observer about the difference, so the presentation
//! layer can create or tear down per-entity structures.

use tracing::debug;

/// Receives entity lifecycle notifications.
///
/// Supplied at collector construction; the collector has no knowledge of
/// what the observer does with the events.
pub trait EntityObserver {
    /// Called for every name present in the new list but not the old one.
    fn on_added(&mut self, name: &str);

    /// Called for every previously tracked name absent from the new list.
    fn on_removed(&mut self, name: &str);
}

/// Observer that ignores all notifications.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl EntityObserver for NullObserver {
    fn on_added(&mut self, _name: &str) {}
    fn on_removed(&mut self, _name: &str) {}
}

/// Ordered membership of a dynamic entity set.
///
/// Order is preserved from the source list so notification order is
/// deterministic: additions follow the new list, removals the old one.
#[derive(Debug, Default)]
pub struct EntityTracker {
    names: Vec<String>,
}

impl EntityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Replaces the tracked set with `new`, emitting added notifications
    /// (new-list order) before removed notifications (old-list order).
    /// Names present in both sets produce no notification.
    pub fn replace(&mut self, new: Vec<String>, observer: &mut dyn EntityObserver) {
        for name in &new {
            if !self.names.contains(name) {
                debug!(entity = %name, "entity added");
                observer.on_added(name);
            }
        }
        for name in &self.names {
            if !new.contains(name) {
                debug!(entity = %name, "entity removed");
                observer.on_removed(name);
            }
        }
        self.names = new;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl EntityObserver for Recorder {
        fn on_added(&mut self, name: &str) {
            self.events.push(format!("+{name}"));
        }
        fn on_removed(&mut self, name: &str) {
            self.events.push(format!("-{name}"));
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn first_replace_emits_additions_in_list_order() {
        let mut tracker = EntityTracker::new();
        let mut observer = Recorder::default();

        tracker.replace(names(&["a", "b"]), &mut observer);

        assert_eq!(observer.events, vec!["+a", "+b"]);
        assert_eq!(tracker.names(), names(&["a", "b"]));
    }

    #[test]
    fn unchanged_membership_is_silent() {
        let mut tracker = EntityTracker::new();
        let mut observer = Recorder::default();
        tracker.replace(names(&["a", "b"]), &mut observer);
        observer.events.clear();

        tracker.replace(names(&["a", "b"]), &mut observer);

        assert!(observer.events.is_empty());
    }

    #[test]
    fn empty_replace_emits_removals_in_old_order() {
        let mut tracker = EntityTracker::new();
        let mut observer = Recorder::default();
        tracker.replace(names(&["a", "b"]), &mut observer);
        observer.events.clear();

        tracker.replace(Vec::new(), &mut observer);

        assert_eq!(observer.events, vec!["-a", "-b"]);
        assert!(tracker.is_empty());
    }

    #[test]
    fn mixed_diff_emits_additions_before_removals() {
        let mut tracker = EntityTracker::new();
        let mut observer = Recorder::default();
        tracker.replace(names(&["a", "b"]), &mut observer);
        observer.events.clear();

        tracker.replace(names(&["b", "c"]), &mut observer);

        assert_eq!(observer.events, vec!["+c", "-a"]);
        assert_eq!(tracker.names(), names(&["b", "c"]));
    }

    #[test]
    fn churn_sequence_produces_expected_event_order() {
        let mut tracker = EntityTracker::new();
        let mut observer = Recorder::default();

        tracker.replace(Vec::new(), &mut observer);
        tracker.replace(names(&["a"]), &mut observer);
        tracker.replace(names(&["a", "b"]), &mut observer);
        tracker.replace(Vec::new(), &mut observer);

        assert_eq!(observer.events, vec!["+a", "+b", "-a", "-b"]);
    }
}
