//! Derived goal progress health.
//!
//! Expected progress is the linear interpolation of elapsed time between the
//! goal's creation and target dates, clamped to [0, 100]. Health compares the
//! recorded progress against that expectation.

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GoalHealth {
    #[serde(rename = "On Target")]
    OnTarget,
    #[serde(rename = "At Risk")]
    AtRisk,
    Behind,
    Overdue,
}

impl GoalHealth {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnTarget => "On Target",
            Self::AtRisk => "At Risk",
            Self::Behind => "Behind",
            Self::Overdue => "Overdue",
        }
    }
}

pub fn expected_progress(
    created: DateTime<Utc>,
    target: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> i64 {
    let Some(target) = target else {
        return 0;
    };
    let total_days = (target - created).num_days();
    if total_days <= 0 {
        return 0;
    }
    let days_passed = (now - created).num_days();
    let expected = ((days_passed as f64 / total_days as f64) * 100.0).round() as i64;
    expected.clamp(0, 100)
}

pub fn classify(
    progress: i64,
    created: DateTime<Utc>,
    target: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> GoalHealth {
    if let Some(target) = target {
        if now > target && progress < 100 {
            return GoalHealth::Overdue;
        }
    }
    let variance = progress - expected_progress(created, target, now);
    if variance < -25 {
        GoalHealth::Behind
    } else if variance <= -10 {
        GoalHealth::AtRisk
    } else {
        GoalHealth::OnTarget
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn halfway_goal_at_forty_percent_is_at_risk() {
        let created = Utc::now() - Duration::days(50);
        let target = Some(created + Duration::days(100));
        let now = Utc::now();

        assert_eq!(expected_progress(created, target, now), 50);
        assert_eq!(classify(40, created, target, now), GoalHealth::AtRisk);
    }

    #[test]
    fn behind_requires_variance_below_minus_twenty_five() {
        let created = Utc::now() - Duration::days(50);
        let target = Some(created + Duration::days(100));
        let now = Utc::now();

        // variance -26
        assert_eq!(classify(24, created, target, now), GoalHealth::Behind);
        // variance -25 is still only At Risk
        assert_eq!(classify(25, created, target, now), GoalHealth::AtRisk);
    }

    #[test]
    fn on_target_when_progress_tracks_time() {
        let created = Utc::now() - Duration::days(50);
        let target = Some(created + Duration::days(100));
        let now = Utc::now();

        assert_eq!(classify(50, created, target, now), GoalHealth::OnTarget);
        assert_eq!(classify(45, created, target, now), GoalHealth::OnTarget);
        assert_eq!(classify(90, created, target, now), GoalHealth::OnTarget);
    }

    #[test]
    fn past_target_and_unfinished_is_overdue() {
        let created = Utc::now() - Duration::days(120);
        let target = Some(created + Duration::days(100));
        let now = Utc::now();

        assert_eq!(classify(80, created, target, now), GoalHealth::Overdue);
        // A finished goal is never overdue.
        assert_eq!(classify(100, created, target, now), GoalHealth::OnTarget);
    }

    #[test]
    fn no_target_means_zero_expectation() {
        let created = Utc::now() - Duration::days(30);
        assert_eq!(expected_progress(created, None, Utc::now()), 0);
        assert_eq!(classify(0, created, None, Utc::now()), GoalHealth::OnTarget);
    }

    #[test]
    fn expected_progress_is_clamped() {
        let created = Utc::now() - Duration::days(200);
        let target = Some(created + Duration::days(100));
        assert_eq!(expected_progress(created, target, Utc::now()), 100);

        let future_created = Utc::now() + Duration::days(10);
        let future_target = Some(future_created + Duration::days(100));
        assert_eq!(expected_progress(future_created, future_target, Utc::now()), 0);
    }
}
