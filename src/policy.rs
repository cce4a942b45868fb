//! Cooldown-gated alert policy.
//!
//! Each frame the policy decides whether a warning is spoken:
//!
//! 1. Keep detections whose class is in the label table and whose confidence
//!    reaches the threshold.
//! 2. A kept class is eligible when more than its cooldown has elapsed since it
//!    last triggered (never-seen classes count as last triggered at 0).
//! 3. If any class is eligible, every eligible class is stamped with `now` and the
//!    phrase names every kept label, deduplicated and sorted.
//!
//! Cooldown state is a plain value threaded through `evaluate`; the policy holds
//! no hidden mutable state.

use std::collections::{BTreeSet, HashMap};

use anyhow::{anyhow, Result};

use crate::detect::labels::BENIGN_CLASSES;
use crate::detect::{Detection, LabelTable};

/// Long cooldown (seconds) for people and pets.
pub const DEFAULT_NOTIFY_INTERVAL_S: f64 = 3.0;

/// Short cooldown (seconds) for vehicles and every other tracked class.
pub const DEFAULT_DANGER_INTERVAL_S: f64 = 0.3;

/// Cooldown durations, keyed by class membership.
#[derive(Clone, Debug, PartialEq)]
pub struct CooldownPolicy {
    /// Interval applied to `benign_classes`.
    pub notify_interval_s: f64,
    /// Interval applied to all other classes.
    pub danger_interval_s: f64,
    benign_classes: BTreeSet<u32>,
}

impl CooldownPolicy {
    pub fn new(notify_interval_s: f64, danger_interval_s: f64) -> Result<Self> {
        for (name, value) in [
            ("notify interval", notify_interval_s),
            ("danger interval", danger_interval_s),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(anyhow!("{} must be a non-negative number of seconds", name));
            }
        }
        Ok(Self {
            notify_interval_s,
            danger_interval_s,
            benign_classes: BENIGN_CLASSES.into_iter().collect(),
        })
    }

    pub fn is_benign(&self, class_id: u32) -> bool {
        self.benign_classes.contains(&class_id)
    }

    /// Cooldown for a class, in seconds.
    pub fn cooldown_for(&self, class_id: u32) -> f64 {
        if self.is_benign(class_id) {
            self.notify_interval_s
        } else {
            self.danger_interval_s
        }
    }
}

impl Default for CooldownPolicy {
    fn default() -> Self {
        Self {
            notify_interval_s: DEFAULT_NOTIFY_INTERVAL_S,
            danger_interval_s: DEFAULT_DANGER_INTERVAL_S,
            benign_classes: BENIGN_CLASSES.into_iter().collect(),
        }
    }
}

/// Last alert time per class, in seconds since the Unix epoch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CooldownState {
    last_alert: HashMap<u32, f64>,
}

impl CooldownState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last alert time for a class; 0 when it never alerted.
    pub fn last_alert(&self, class_id: u32) -> f64 {
        self.last_alert.get(&class_id).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, class_id: u32) -> bool {
        self.last_alert.contains_key(&class_id)
    }

    pub fn record(&mut self, class_id: u32, at: f64) {
        self.last_alert.insert(class_id, at);
    }

    pub fn len(&self) -> usize {
        self.last_alert.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_alert.is_empty()
    }
}

/// What fired on one frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alert {
    /// Text handed to the speech notifier.
    pub phrase: String,
    /// Classes whose cooldown elapsed, in ascending id order.
    pub triggered: Vec<u32>,
    /// Every visible label, sorted.
    pub labels: Vec<String>,
}

/// Outcome of evaluating one frame: the updated state and the alert, if any.
#[derive(Clone, Debug)]
pub struct Evaluation {
    pub state: CooldownState,
    pub alert: Option<Alert>,
}

/// Alert policy: label table, confidence threshold and cooldown table.
#[derive(Clone, Debug)]
pub struct AlertPolicy {
    labels: LabelTable,
    cooldowns: CooldownPolicy,
    threshold: f32,
}

impl AlertPolicy {
    pub fn new(labels: LabelTable, cooldowns: CooldownPolicy, threshold: f32) -> Result<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(anyhow!(
                "confidence threshold must be within 0.0..=1.0 (got {})",
                threshold
            ));
        }
        Ok(Self {
            labels,
            cooldowns,
            threshold,
        })
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    pub fn cooldowns(&self) -> &CooldownPolicy {
        &self.cooldowns
    }

    /// Labelled detections at or above the threshold.
    pub fn visible<'a>(
        &'a self,
        detections: &'a [Detection],
    ) -> impl Iterator<Item = &'a Detection> + 'a {
        detections
            .iter()
            .filter(|d| self.labels.contains(d.class_id) && d.confidence >= self.threshold)
    }

    /// Decide whether this frame speaks, returning the updated cooldown state.
    pub fn evaluate(
        &self,
        mut state: CooldownState,
        detections: &[Detection],
        now: f64,
    ) -> Evaluation {
        let triggered: BTreeSet<u32> = self
            .visible(detections)
            .map(|d| d.class_id)
            .filter(|&class_id| {
                now - state.last_alert(class_id) > self.cooldowns.cooldown_for(class_id)
            })
            .collect();

        if triggered.is_empty() {
            return Evaluation { state, alert: None };
        }

        for &class_id in &triggered {
            state.record(class_id, now);
        }

        let labels: Vec<String> = self
            .visible(detections)
            .filter_map(|d| self.labels.label(d.class_id))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect();

        let alert = Alert {
            phrase: warning_phrase(&labels),
            triggered: triggered.into_iter().collect(),
            labels,
        };
        Evaluation {
            state,
            alert: Some(alert),
        }
    }
}

/// `"Warning. Car ahead"` or `"Warning. Bicycle and Car ahead"`.
pub fn warning_phrase<S: AsRef<str>>(labels: &[S]) -> String {
    let joined = labels
        .iter()
        .map(|label| label.as_ref())
        .collect::<Vec<&str>>()
        .join(" and ");
    format!("Warning. {} ahead", joined)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::labels::{BICYCLE, CAR, DOG, HUMAN, TRUCK};

    fn policy() -> AlertPolicy {
        AlertPolicy::new(LabelTable::coco_hazards(), CooldownPolicy::default(), 0.6).unwrap()
    }

    #[test]
    fn phrase_joins_labels_with_and() {
        assert_eq!(warning_phrase(&["Car"]), "Warning. Car ahead");
        assert_eq!(
            warning_phrase(&["Bicycle", "Car", "Dog"]),
            "Warning. Bicycle and Car and Dog ahead"
        );
    }

    #[test]
    fn cooldown_table_splits_benign_and_danger() {
        let cooldowns = CooldownPolicy::default();
        assert_eq!(cooldowns.cooldown_for(HUMAN), 3.0);
        assert_eq!(cooldowns.cooldown_for(DOG), 3.0);
        assert_eq!(cooldowns.cooldown_for(CAR), 0.3);
        assert_eq!(cooldowns.cooldown_for(TRUCK), 0.3);
    }

    #[test]
    fn invalid_intervals_and_threshold_rejected() {
        assert!(CooldownPolicy::new(-1.0, 0.3).is_err());
        assert!(CooldownPolicy::new(3.0, f64::NAN).is_err());
        assert!(AlertPolicy::new(LabelTable::default(), CooldownPolicy::default(), 1.5).is_err());
    }

    #[test]
    fn only_eligible_classes_are_stamped() {
        let policy = policy();
        let mut state = CooldownState::new();
        state.record(HUMAN, 100.0);

        let detections = vec![Detection::new(HUMAN, 0.9), Detection::new(CAR, 0.8)];
        let eval = policy.evaluate(state, &detections, 101.0);

        let alert = eval.alert.expect("car is eligible");
        assert_eq!(alert.triggered, vec![CAR]);
        assert_eq!(alert.phrase, "Warning. Car and Human ahead");
        assert_eq!(eval.state.last_alert(HUMAN), 100.0);
        assert_eq!(eval.state.last_alert(CAR), 101.0);
    }

    #[test]
    fn duplicate_detections_produce_one_label() {
        let policy = policy();
        let detections = vec![
            Detection::new(BICYCLE, 0.7),
            Detection::new(BICYCLE, 0.95),
            Detection::new(HUMAN, 0.61),
        ];
        let eval = policy.evaluate(CooldownState::new(), &detections, 50.0);
        let alert = eval.alert.unwrap();
        assert_eq!(alert.labels, vec!["Bicycle", "Human"]);
        assert_eq!(alert.triggered, vec![HUMAN, BICYCLE]);
    }

    #[test]
    fn threshold_is_inclusive() {
        let policy = policy();
        let eval = policy.evaluate(CooldownState::new(), &[Detection::new(CAR, 0.6)], 10.0);
        assert!(eval.alert.is_some());
    }
}
