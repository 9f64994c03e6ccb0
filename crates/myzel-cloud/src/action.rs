//! Flattened, printable form of a [`DiffResult`](crate::DiffResult)

use serde::{Deserialize, Serialize};
use std::fmt;

/// One line of a plan: what happens to a logical resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
    pub action_type: ActionType,
    /// Registry tag, empty for kept resources
    pub resource_type: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Create,
    Update,
    Delete,
    /// Deployed and matching, nothing to do
    Keep,
}

impl ActionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Keep => "keep",
        }
    }

    /// Marker printed in front of a plan line
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Create => "+",
            Self::Update => "~",
            Self::Delete => "-",
            Self::Keep => " ",
        }
    }

    pub fn is_change(self) -> bool {
        self != Self::Keep
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Plan {
    pub actions: Vec<Action>,
}

impl Plan {
    pub fn new(actions: Vec<Action>) -> Self {
        Self { actions }
    }

    /// Actions that touch the provider, in plan order
    pub fn changes(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter().filter(|a| a.action_type.is_change())
    }

    pub fn has_changes(&self) -> bool {
        self.changes().next().is_some()
    }

    pub fn summary(&self) -> PlanSummary {
        self.actions
            .iter()
            .fold(PlanSummary::default(), |mut summary, action| {
                match action.action_type {
                    ActionType::Create => summary.create += 1,
                    ActionType::Update => summary.update += 1,
                    ActionType::Delete => summary.delete += 1,
                    ActionType::Keep => summary.unchanged += 1,
                }
                summary
            })
    }
}

/// Per-type counts of a [`Plan`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub delete: usize,
    pub unchanged: usize,
}

impl fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to delete, {} unchanged",
            self.create, self.update, self.delete, self.unchanged
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(name: &str, action_type: ActionType) -> Action {
        Action {
            name: name.to_string(),
            action_type,
            resource_type: "storage".to_string(),
            description: String::new(),
        }
    }

    #[test]
    fn test_summary_counts_every_type() {
        let plan = Plan::new(vec![
            line("a", ActionType::Create),
            line("b", ActionType::Create),
            line("c", ActionType::Delete),
            line("d", ActionType::Keep),
        ]);
        assert!(plan.has_changes());
        assert_eq!(
            plan.summary().to_string(),
            "2 to create, 0 to update, 1 to delete, 1 unchanged"
        );
        let changed: Vec<&str> = plan.changes().map(|a| a.name.as_str()).collect();
        assert_eq!(changed, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_keep_only_plan_has_no_changes() {
        let plan = Plan::new(vec![line("a", ActionType::Keep)]);
        assert!(!plan.has_changes());
        assert!(!Plan::default().has_changes());
    }
}
