//! Savings tracking: logged events, a goal, milestones and streaks.

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::building::round2;
use crate::error::ValidationError;

/// Dollar thresholds celebrated as milestones.
pub const MILESTONES: [f64; 7] = [10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SavingsKind {
    SetpointChange,
    Schedule,
    Maintenance,
    Upgrade,
    RateSwitch,
    #[default]
    Other,
}

impl SavingsKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SavingsKind::SetpointChange => "setpoint_change",
            SavingsKind::Schedule => "schedule",
            SavingsKind::Maintenance => "maintenance",
            SavingsKind::Upgrade => "upgrade",
            SavingsKind::RateSwitch => "rate_switch",
            SavingsKind::Other => "other",
        }
    }
}

impl std::fmt::Display for SavingsKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SavingsKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "setpoint_change" | "setpoint" => Ok(SavingsKind::SetpointChange),
            "schedule" => Ok(SavingsKind::Schedule),
            "maintenance" => Ok(SavingsKind::Maintenance),
            "upgrade" => Ok(SavingsKind::Upgrade),
            "rate_switch" | "rate" => Ok(SavingsKind::RateSwitch),
            "other" => Ok(SavingsKind::Other),
            other => Err(ValidationError::InvalidValue {
                field: "kind".to_string(),
                message: format!("unknown savings kind '{other}'"),
            }),
        }
    }
}

/// One logged saving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsEvent {
    pub id: Uuid,
    pub occurred_on: NaiveDate,
    /// Dollars
    pub amount: f64,
    pub kind: SavingsKind,
    pub note: Option<String>,
}

impl SavingsEvent {
    pub fn new(
        occurred_on: NaiveDate,
        amount: f64,
        kind: SavingsKind,
        note: Option<String>,
    ) -> Result<Self, ValidationError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(ValidationError::InvalidValue {
                field: "amount".to_string(),
                message: format!("must be a positive dollar amount, got {amount}"),
            });
        }
        Ok(Self {
            id: Uuid::new_v4(),
            occurred_on,
            amount,
            kind,
            note: note.filter(|n| !n.trim().is_empty()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsGoal {
    /// Dollars
    pub target: f64,
    pub label: Option<String>,
    pub deadline: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsSummary {
    pub total: f64,
    pub this_month: f64,
    pub event_count: usize,
    pub goal: Option<SavingsGoal>,
    /// 0-100
    pub goal_progress_pct: Option<f64>,
    pub goal_remaining: Option<f64>,
    pub milestones_reached: Vec<f64>,
    pub next_milestone: Option<f64>,
    pub to_next_milestone: Option<f64>,
    /// Consecutive days with at least one event, ending today or yesterday
    pub streak_days: u32,
}

pub fn milestones_reached(total: f64) -> Vec<f64> {
    MILESTONES.iter().copied().filter(|m| total >= *m).collect()
}

pub fn next_milestone(total: f64) -> Option<f64> {
    MILESTONES.iter().copied().find(|m| total < *m)
}

/// In-memory view over events and the goal.
#[derive(Debug, Clone, Default)]
pub struct SavingsTracker {
    events: Vec<SavingsEvent>,
    goal: Option<SavingsGoal>,
}

impl SavingsTracker {
    pub fn new(events: Vec<SavingsEvent>, goal: Option<SavingsGoal>) -> Self {
        Self { events, goal }
    }

    pub fn events(&self) -> &[SavingsEvent] {
        &self.events
    }

    pub fn add(&mut self, event: SavingsEvent) {
        self.events.push(event);
    }

    pub fn set_goal(&mut self, goal: Option<SavingsGoal>) {
        self.goal = goal;
    }

    pub fn total(&self) -> f64 {
        self.events.iter().map(|e| e.amount).sum()
    }

    /// Days in the unbroken run of active days ending at `today`. A run
    /// ending yesterday still counts so the streak survives until the day
    /// is over.
    pub fn streak(&self, today: NaiveDate) -> u32 {
        let days: BTreeSet<NaiveDate> = self.events.iter().map(|e| e.occurred_on).collect();
        let mut day = if days.contains(&today) {
            today
        } else {
            today - Duration::days(1)
        };
        let mut streak = 0;
        while days.contains(&day) {
            streak += 1;
            day -= Duration::days(1);
        }
        streak
    }

    pub fn summary(&self, today: NaiveDate) -> SavingsSummary {
        let total = self.total();
        let this_month = self
            .events
            .iter()
            .filter(|e| e.occurred_on.year() == today.year() && e.occurred_on.month() == today.month())
            .map(|e| e.amount)
            .sum::<f64>();

        let (goal_progress_pct, goal_remaining) = match &self.goal {
            Some(goal) if goal.target > 0.0 => (
                Some(round2((total / goal.target * 100.0).min(100.0))),
                Some(round2((goal.target - total).max(0.0))),
            ),
            _ => (None, None),
        };
        let next = next_milestone(total);

        SavingsSummary {
            total: round2(total),
            this_month: round2(this_month),
            event_count: self.events.len(),
            goal: self.goal.clone(),
            goal_progress_pct,
            goal_remaining,
            milestones_reached: milestones_reached(total),
            next_milestone: next,
            to_next_milestone: next.map(|m| round2(m - total)),
            streak_days: self.streak(today),
        }
    }

    /// Milestones crossed going from `before` to `after`.
    pub fn newly_reached(before: f64, after: f64) -> Vec<f64> {
        MILESTONES
            .iter()
            .copied()
            .filter(|m| before < *m && after >= *m)
            .collect()
    }
}
