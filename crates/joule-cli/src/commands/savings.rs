use chrono::{Local, NaiveDate};
use clap::Subcommand;
use joule_core::savings::{SavingsGoal, SavingsKind, SavingsTracker};
use joule_core::{Database, SavingsEvent};
use serde_json::json;
use uuid::Uuid;

use super::{print_json, CliResult};

#[derive(Subcommand)]
pub enum SavingsAction {
    /// Log a saving in dollars
    Add {
        amount: f64,
        /// setpoint_change, schedule, maintenance, upgrade, rate_switch or other
        #[arg(long, default_value = "other")]
        kind: String,
        /// YYYY-MM-DD, defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        note: Option<String>,
    },
    /// List logged savings
    List,
    /// Totals, goal progress, milestones and streak
    Summary,
    /// Set or clear the savings goal
    Goal {
        /// Target in dollars
        target: Option<f64>,
        #[arg(long)]
        label: Option<String>,
        /// YYYY-MM-DD
        #[arg(long)]
        deadline: Option<NaiveDate>,
        /// Remove the current goal
        #[arg(long, conflicts_with = "target")]
        clear: bool,
    },
    /// Delete a logged saving
    Delete { id: Uuid },
}

pub fn run(action: SavingsAction) -> CliResult {
    let db = Database::open()?;
    let today = Local::now().date_naive();

    match action {
        SavingsAction::Add {
            amount,
            kind,
            date,
            note,
        } => {
            let kind: SavingsKind = kind.parse()?;
            let event = SavingsEvent::new(date.unwrap_or(today), amount, kind, note)?;
            let before = db.savings_tracker()?.total();
            db.add_savings_event(&event)?;
            let reached = SavingsTracker::newly_reached(before, before + event.amount);
            print_json(&json!({
                "event": event,
                "total": ((before + event.amount) * 100.0).round() / 100.0,
                "milestones_reached": reached,
            }))
        }
        SavingsAction::List => print_json(&db.savings_events()?),
        SavingsAction::Summary => print_json(&db.savings_tracker()?.summary(today)),
        SavingsAction::Goal {
            target,
            label,
            deadline,
            clear,
        } => {
            if clear {
                db.set_savings_goal(None)?;
                println!("savings goal cleared");
                return Ok(());
            }
            match target {
                Some(target) if target > 0.0 => {
                    let goal = SavingsGoal {
                        target,
                        label,
                        deadline,
                    };
                    db.set_savings_goal(Some(&goal))?;
                    print_json(&goal)
                }
                Some(target) => Err(format!("goal must be positive, got {target}").into()),
                None => print_json(&db.savings_goal()?),
            }
        }
        SavingsAction::Delete { id } => {
            if !db.delete_savings_event(id)? {
                return Err(format!("no saving with id {id}").into());
            }
            println!("deleted {id}");
            Ok(())
        }
    }
}
