//! The per-turn audit record: what the bot saw, what it considered, what it
//! chose, and how execution went. Written once per turn attempt and never
//! modified afterward; persistence is best-effort and the record also rides
//! the turn-complete event.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::executor::ExecutionResult;
use crate::options::{InfeasibleOption, ScoredOption, TurnPlan};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyAudit {
    pub turn_number: u32,
    pub skill: String,
    pub archetype: String,
    /// Short content digest of the snapshot this turn decided against.
    pub snapshot_digest: String,
    /// Narrative plan/rationale text.
    pub plan_summary: String,
    pub feasible: Vec<ScoredOption>,
    pub infeasible: Vec<InfeasibleOption>,
    pub selected_plan: TurnPlan,
    pub execution: ExecutionResult,
    pub bot_status: String,
    pub retries_used: u32,
    pub fell_back_to_pass: bool,
    pub duration_ms: u64,
    pub created_at: DateTime<Utc>,
}

impl StrategyAudit {
    /// The JSON shape persisted and carried on `bot:turn-complete`.
    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl std::fmt::Display for StrategyAudit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Bot Turn {} ===", self.turn_number)?;
        writeln!(f, "Profile:    {} / {}", self.skill, self.archetype)?;
        writeln!(f, "Snapshot:   {}", self.snapshot_digest)?;
        writeln!(f, "Options:    {} feasible, {} infeasible", self.feasible.len(), self.infeasible.len())?;
        writeln!(f, "Plan:       {}", self.plan_summary)?;
        writeln!(
            f,
            "Execution:  {} ({} actions, {}ms)",
            if self.execution.success { "ok" } else { "failed" },
            self.execution.actions_completed,
            self.execution.duration_ms,
        )?;
        if let Some(error) = &self.execution.error {
            writeln!(f, "Error:      {error}")?;
        }
        writeln!(f, "Retries:    {}", self.retries_used)?;
        writeln!(f, "Fallback:   {}", self.fell_back_to_pass)?;
        writeln!(f, "Status:     {}", self.bot_status)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StrategyAudit {
        StrategyAudit {
            turn_number: 4,
            skill: "seasoned".into(),
            archetype: "magnate".into(),
            snapshot_digest: "a1b2c3d4e5f6".into(),
            plan_summary: "Deliver Coal to Karst for 18M".into(),
            feasible: Vec::new(),
            infeasible: Vec::new(),
            selected_plan: TurnPlan::default(),
            execution: ExecutionResult {
                success: true,
                actions_completed: 1,
                error: None,
                duration_ms: 12,
            },
            bot_status: "money=78M".into(),
            retries_used: 0,
            fell_back_to_pass: false,
            duration_ms: 40,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn payload_uses_camel_case_keys() {
        let payload = sample().to_payload();
        assert!(payload.get("turnNumber").is_some());
        assert!(payload.get("fellBackToPass").is_some());
        assert!(payload.get("snapshotDigest").is_some());
        assert!(payload.get("turn_number").is_none());
    }

    #[test]
    fn display_summarizes_the_turn() {
        let text = sample().to_string();
        assert!(text.contains("Bot Turn 4"));
        assert!(text.contains("seasoned / magnate"));
        assert!(text.contains("Retries:    0"));
    }
}
