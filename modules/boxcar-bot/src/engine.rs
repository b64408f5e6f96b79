//! Turn orchestration: capture → generate → score → select → validate →
//! execute, with a bounded retry walk over ranked candidates and a guaranteed
//! pass fallback. Every turn reaches a terminal outcome, leaves an audit
//! record, and emits start/complete events; nothing here throws past the
//! collaborator boundary.

use std::time::Instant;

use chrono::Utc;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use tracing::{debug, info, warn};

use boxcar_common::{BotConfig, BotError, GameId, PlayerId, SkillProfile, UserId};

use crate::audit::StrategyAudit;
use crate::executor::{self, ExecutionResult};
use crate::options::{self, BotAction, ScoredOption, TurnPlan};
use crate::scoring;
use crate::snapshot;
use crate::traits::BotDeps;
use crate::validate;

/// Candidate attempts per turn, counting both validation and execution
/// failures. The cap applies even when fewer candidates exist.
pub const MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, Copy)]
pub struct TurnRequest {
    pub game_id: GameId,
    pub bot_player_id: PlayerId,
    pub bot_user_id: UserId,
    pub config: BotConfig,
    pub turn_number: u32,
}

#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub success: bool,
    pub fell_back_to_pass: bool,
    pub retries_used: u32,
    pub audit: StrategyAudit,
}

pub struct StrategyEngine {
    deps: BotDeps,
}

impl StrategyEngine {
    pub fn new(deps: BotDeps) -> Self {
        Self { deps }
    }

    /// Decide and execute one bot turn. Always terminates with an audit and a
    /// turn-complete event; a missing game or player degrades to a pass
    /// outcome instead of propagating.
    pub async fn take_turn(&self, req: TurnRequest) -> TurnOutcome {
        let started = Instant::now();
        let skill = req.config.skill_profile();
        let archetype = req.config.archetype_profile();

        info!(
            game = %req.game_id,
            bot = %req.bot_player_id,
            turn = req.turn_number,
            skill = %skill.name,
            archetype = %archetype.name,
            "Bot turn starting"
        );
        self.emit(
            req.game_id,
            "bot:turn-start",
            json!({
                "botPlayerId": req.bot_player_id,
                "turnNumber": req.turn_number,
            }),
        )
        .await;

        let snapshot = match snapshot::capture(
            &self.deps,
            req.game_id,
            req.bot_player_id,
            req.bot_user_id,
        )
        .await
        {
            Ok(snapshot) => snapshot,
            Err(e) => return self.degraded_turn(&req, e, started).await,
        };

        let generated = options::generate(&snapshot);
        let ranked = scoring::score(&generated.feasible, &snapshot, skill, archetype);

        // One perturbation draw fixes the candidate order for the whole turn.
        let mut rng = match req.config.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        let candidates = perturb(&ranked, skill, &mut rng);

        let mut retries = 0u32;
        let mut executed: Option<(TurnPlan, ExecutionResult)> = None;
        for candidate in candidates.iter().take(MAX_RETRIES as usize) {
            let plan = TurnPlan::single(candidate.clone());
            let validation = validate::validate(&plan, &snapshot);
            if !validation.valid {
                debug!(
                    candidate = %candidate.description,
                    violations = ?validation.violations,
                    "Candidate failed validation"
                );
                retries += 1;
                continue;
            }
            let result = executor::execute(&self.deps, &plan, &snapshot).await;
            if result.success {
                executed = Some((plan, result));
                break;
            }
            retries += 1;
        }

        let (plan, result, fell_back) = match executed {
            Some((plan, result)) => (plan, result, false),
            None => {
                // Guaranteed fallback: passing is always valid and succeeds.
                let plan = pass_plan();
                let result = executor::execute(&self.deps, &plan, &snapshot).await;
                (plan, result, true)
            }
        };

        let plan_summary = if fell_back {
            format!("fell back to pass after {retries} failed attempts")
        } else {
            let rationale = plan
                .actions
                .first()
                .map(|a| a.rationale.as_str())
                .unwrap_or_default();
            format!("{} [{rationale}]", plan.describe())
        };

        let audit = StrategyAudit {
            turn_number: req.turn_number,
            skill: skill.name.clone(),
            archetype: archetype.name.clone(),
            snapshot_digest: snapshot.digest(),
            plan_summary,
            feasible: ranked,
            infeasible: generated.infeasible,
            selected_plan: plan,
            execution: result.clone(),
            bot_status: snapshot.status_summary(),
            retries_used: retries,
            fell_back_to_pass: fell_back,
            duration_ms: started.elapsed().as_millis() as u64,
            created_at: Utc::now(),
        };
        self.finish(&req, &audit).await;

        info!(
            game = %req.game_id,
            bot = %req.bot_player_id,
            turn = req.turn_number,
            success = result.success,
            retries,
            fell_back,
            "Bot turn complete"
        );
        TurnOutcome {
            success: result.success,
            fell_back_to_pass: fell_back,
            retries_used: retries,
            audit,
        }
    }

    /// Snapshot capture failed: audit the failure and complete the turn as a
    /// pass without touching game state.
    async fn degraded_turn(
        &self,
        req: &TurnRequest,
        error: BotError,
        started: Instant,
    ) -> TurnOutcome {
        warn!(
            game = %req.game_id,
            bot = %req.bot_player_id,
            error = %error,
            "Snapshot capture failed; degrading to pass"
        );
        let audit = StrategyAudit {
            turn_number: req.turn_number,
            skill: req.config.skill_profile().name.clone(),
            archetype: req.config.archetype_profile().name.clone(),
            snapshot_digest: "unavailable".to_string(),
            plan_summary: format!("snapshot capture failed: {error}"),
            feasible: Vec::new(),
            infeasible: Vec::new(),
            selected_plan: TurnPlan::default(),
            execution: ExecutionResult::failed(error.to_string()),
            bot_status: "unknown".to_string(),
            retries_used: 0,
            fell_back_to_pass: true,
            duration_ms: started.elapsed().as_millis() as u64,
            created_at: Utc::now(),
        };
        self.finish(req, &audit).await;
        TurnOutcome {
            success: false,
            fell_back_to_pass: true,
            retries_used: 0,
            audit,
        }
    }

    /// Persist the audit and emit turn-complete. Both best-effort: a dead
    /// audit store or socket layer must not fail the turn.
    async fn finish(&self, req: &TurnRequest, audit: &StrategyAudit) {
        if let Err(e) = self
            .deps
            .audits
            .save_turn_audit(req.game_id, req.bot_player_id, audit)
            .await
        {
            warn!(game = %req.game_id, error = %e, "Failed to persist turn audit");
        }
        self.emit(
            req.game_id,
            "bot:turn-complete",
            json!({
                "botPlayerId": req.bot_player_id,
                "audit": audit.to_payload(),
            }),
        )
        .await;
    }

    async fn emit(&self, game_id: GameId, event: &str, payload: serde_json::Value) {
        if let Err(e) = self.deps.events.emit(game_id, event, payload).await {
            warn!(game = %game_id, event, error = %e, "Event emission failed");
        }
    }
}

fn pass_plan() -> TurnPlan {
    TurnPlan::single(ScoredOption {
        action: BotAction::PassTurn,
        description: "Pass the turn".to_string(),
        score: 0.0,
        rationale: "no executable candidate remained".to_string(),
    })
}

/// Apply the skill's single perturbation draw to the ranked order: a draw in
/// `[0, random_choice_percent)` moves a uniformly random candidate to the
/// front, the next `suboptimality_percent` band promotes the second-ranked
/// candidate, and anything else leaves the ranking as scored.
fn perturb(ranked: &[ScoredOption], skill: &SkillProfile, rng: &mut SmallRng) -> Vec<ScoredOption> {
    let mut candidates = ranked.to_vec();
    if candidates.len() < 2 {
        return candidates;
    }
    let draw: f64 = rng.gen_range(0.0..1.0);
    if draw < skill.random_choice_percent {
        let pick = rng.gen_range(0..candidates.len());
        let chosen = candidates.remove(pick);
        candidates.insert(0, chosen);
        debug!(pick, "Perturbation: random choice");
    } else if draw < skill.random_choice_percent + skill.suboptimality_percent {
        candidates.swap(0, 1);
        debug!("Perturbation: second-ranked choice");
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxcar_common::{DimensionWeights, Lookahead};

    fn skill(random: f64, subopt: f64) -> SkillProfile {
        SkillProfile {
            name: "test".into(),
            base_weights: DimensionWeights::uniform(1.0),
            random_choice_percent: random,
            suboptimality_percent: subopt,
            lookahead: Lookahead {
                depth: 1,
                breadth: 1,
                discount: 0.5,
            },
        }
    }

    fn ranked(n: usize) -> Vec<ScoredOption> {
        (0..n)
            .map(|i| ScoredOption {
                action: BotAction::PassTurn,
                description: format!("option {i}"),
                score: (n - i) as f64,
                rationale: String::new(),
            })
            .collect()
    }

    #[test]
    fn zero_bands_keep_the_ranked_order() {
        let mut rng = SmallRng::seed_from_u64(7);
        let out = perturb(&ranked(4), &skill(0.0, 0.0), &mut rng);
        let names: Vec<&str> = out.iter().map(|o| o.description.as_str()).collect();
        assert_eq!(names, vec!["option 0", "option 1", "option 2", "option 3"]);
    }

    #[test]
    fn full_suboptimality_band_promotes_the_second_pick() {
        let mut rng = SmallRng::seed_from_u64(7);
        let out = perturb(&ranked(4), &skill(0.0, 1.0), &mut rng);
        assert_eq!(out[0].description, "option 1");
        assert_eq!(out[1].description, "option 0");
        assert_eq!(out[2].description, "option 2");
    }

    #[test]
    fn full_random_band_keeps_every_candidate() {
        let mut rng = SmallRng::seed_from_u64(11);
        let out = perturb(&ranked(5), &skill(1.0, 0.0), &mut rng);
        assert_eq!(out.len(), 5);
        for i in 0..5 {
            assert!(out.iter().any(|o| o.description == format!("option {i}")));
        }
    }

    #[test]
    fn perturbation_is_deterministic_for_a_fixed_seed() {
        let a = perturb(&ranked(5), &skill(1.0, 0.0), &mut SmallRng::seed_from_u64(42));
        let b = perturb(&ranked(5), &skill(1.0, 0.0), &mut SmallRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn single_candidate_is_left_alone() {
        let mut rng = SmallRng::seed_from_u64(1);
        let out = perturb(&ranked(1), &skill(1.0, 0.0), &mut rng);
        assert_eq!(out.len(), 1);
    }
}
