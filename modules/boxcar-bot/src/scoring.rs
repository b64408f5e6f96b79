//! Weighted option scoring. Each action kind touches a subset of the fixed
//! dimension catalog; the final per-dimension weight is the skill base weight
//! times the archetype multiplier. No randomness lives here — identical
//! inputs always produce the identical total order.

use tracing::debug;

use boxcar_common::{ArchetypeProfile, ScoreDimension, SkillProfile};

use crate::options::{BotAction, FeasibleOption, ScoredOption};
use crate::snapshot::WorldSnapshot;

/// Score and rank feasible options, descending. Empty in, empty out.
pub fn score(
    options: &[FeasibleOption],
    snapshot: &WorldSnapshot,
    skill: &SkillProfile,
    archetype: &ArchetypeProfile,
) -> Vec<ScoredOption> {
    let mut scored: Vec<ScoredOption> = options
        .iter()
        .map(|option| {
            let signals = signals_for(&option.action, snapshot, skill);
            let mut contributions: Vec<(ScoreDimension, f64)> = signals
                .into_iter()
                .map(|(dim, signal)| {
                    let weight = skill.base_weights.get(dim) * archetype.multipliers.get(dim);
                    (dim, signal * weight)
                })
                .filter(|(_, c)| *c != 0.0)
                .collect();
            let total: f64 = contributions.iter().map(|(_, c)| c).sum();

            contributions.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
            let rationale = if contributions.is_empty() {
                "no scoring dimensions apply".to_string()
            } else {
                contributions
                    .iter()
                    .take(3)
                    .map(|(dim, c)| format!("{} {:+.1}", dim.as_str(), c))
                    .collect::<Vec<_>>()
                    .join(", ")
            };

            ScoredOption {
                action: option.action.clone(),
                description: option.description.clone(),
                score: total,
                rationale,
            }
        })
        .collect();

    // Descending by score; description breaks ties so the order is total.
    scored.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.description.cmp(&b.description))
    });

    if let Some(top) = scored.first() {
        debug!(score = top.score, pick = %top.description, "Options scored");
    }
    scored
}

/// Raw (dimension, signal) pairs for one action. Signals are unweighted and
/// roughly commensurate across dimensions.
fn signals_for(
    action: &BotAction,
    snapshot: &WorldSnapshot,
    skill: &SkillProfile,
) -> Vec<(ScoreDimension, f64)> {
    match action {
        BotAction::DeliverLoad {
            payment,
            movement_cost,
            ..
        } => {
            let mut signals = vec![
                (ScoreDimension::IncomeNow, *payment as f64 / 4.0),
                (
                    ScoreDimension::IncomePerDistance,
                    *payment as f64 / (*movement_cost).max(1) as f64,
                ),
                (
                    ScoreDimension::MultiDeliveryPotential,
                    followup_potential(followup_deliveries(snapshot), &skill.lookahead),
                ),
                (ScoreDimension::RiskExposure, risk_signal(snapshot)),
            ];
            if snapshot.loads.len() > 1 {
                signals.push((ScoreDimension::LoadSynergy, 1.0));
            }
            signals
        }
        BotAction::PickupAndDeliver {
            load,
            payment,
            pickup_cost,
            deliver_city,
            ..
        } => {
            // Income is one step removed; the lookahead discount applies.
            let pay = payment.unwrap_or(0) as f64;
            let delivered_now = deliver_city.is_some();
            let discount = if delivered_now {
                1.0
            } else {
                skill.lookahead.discount
            };
            vec![
                (ScoreDimension::IncomeNow, pay / 4.0 * discount),
                (
                    ScoreDimension::IncomePerDistance,
                    pay * discount / (*pickup_cost).max(1) as f64,
                ),
                (ScoreDimension::LoadScarcity, scarcity_signal(snapshot, load)),
                (
                    ScoreDimension::MultiDeliveryPotential,
                    followup_potential(followup_deliveries(snapshot), &skill.lookahead),
                ),
                (ScoreDimension::RiskExposure, risk_signal(snapshot)),
            ]
        }
        BotAction::BuildTrack {
            segments,
            cost,
            toward,
        } => {
            let mut signals = vec![
                (
                    ScoreDimension::NetworkExpansion,
                    2.0 * segments.len() as f64 / (*cost).max(1) as f64,
                ),
                (ScoreDimension::BackboneAlignment, 1.5),
                (
                    ScoreDimension::RiskExposure,
                    -(*cost as f64) / snapshot.money.max(1) as f64,
                ),
            ];
            let blocking = blocking_signal(snapshot, toward);
            if blocking > 0.0 {
                signals.push((ScoreDimension::CompetitorBlocking, blocking));
            }
            signals
        }
        BotAction::BuildTowardMajorCity {
            segments,
            cost,
            city,
        } => {
            let connected = snapshot.connected_major_cities.len();
            let remaining = snapshot.victory_city_count.saturating_sub(connected);
            let mut signals = vec![
                (
                    ScoreDimension::VictoryProgress,
                    if remaining > 0 { 2.0 + remaining as f64 } else { 0.0 },
                ),
                (
                    ScoreDimension::MajorCityProximity,
                    proximity_signal(snapshot.board, segments, city),
                ),
                (
                    ScoreDimension::NetworkExpansion,
                    2.0 * segments.len() as f64 / (*cost).max(1) as f64,
                ),
                (
                    ScoreDimension::RiskExposure,
                    -(*cost as f64) / snapshot.money.max(1) as f64,
                ),
            ];
            if snapshot.demands().any(|(_, d)| d.city == *city) {
                signals.push((ScoreDimension::BackboneAlignment, 1.0));
            }
            signals
        }
        BotAction::UpgradeTrain { target, cost, .. } => {
            let capacity_gain =
                target.capacity() as f64 - snapshot.train_type.capacity() as f64;
            let speed_gain = target.speed() as f64 - snapshot.train_type.speed() as f64;
            vec![
                (
                    ScoreDimension::UpgradeRoi,
                    capacity_gain * 3.0 + speed_gain * 0.5 - *cost as f64 / 10.0,
                ),
                (
                    ScoreDimension::RiskExposure,
                    -(*cost as f64) / snapshot.money.max(1) as f64,
                ),
            ]
        }
        // The floor: any non-trivial alternative outranks passing.
        BotAction::PassTurn => Vec::new(),
    }
}

/// How many more demands in hand the carried loads could still serve.
fn followup_deliveries(snapshot: &WorldSnapshot) -> usize {
    snapshot
        .demands()
        .filter(|(_, d)| snapshot.carries(&d.load))
        .count()
        .saturating_sub(1)
}

/// Discounted value of follow-on deliveries under the skill's lookahead:
/// `breadth` deliveries fit in each projected turn, `depth` turns project at
/// most, and each turn out decays by `discount`.
fn followup_potential(followups: usize, lookahead: &boxcar_common::Lookahead) -> f64 {
    let breadth = (lookahead.breadth as usize).max(1);
    let mut total = 0.0;
    for k in 1..=followups {
        let step = k.div_ceil(breadth);
        if step > lookahead.depth as usize {
            break;
        }
        total += lookahead.discount.powi(step as i32);
    }
    total
}

/// Negative pressure from active events. More events, more exposure.
fn risk_signal(snapshot: &WorldSnapshot) -> f64 {
    -0.5 * snapshot.active_events.len() as f64
}

/// Scarce loads score higher: one source city left means a corner worth
/// taking.
fn scarcity_signal(snapshot: &WorldSnapshot, load: &str) -> f64 {
    let sources = snapshot
        .city_loads
        .values()
        .filter(|stock| stock.iter().any(|l| l == load))
        .count()
        + snapshot
            .dropped_loads
            .values()
            .filter(|drops| drops.iter().any(|d| d.load == load))
            .count();
    match sources {
        0 | 1 => 2.0,
        2 => 1.0,
        _ => 0.5,
    }
}

/// How close an extension's railhead ends up to the target city. Landing in
/// the city scores full marks; the signal decays with remaining distance.
fn proximity_signal(
    board: &boxcar_common::Board,
    segments: &[boxcar_common::TrackSegment],
    city: &str,
) -> f64 {
    let Some(center) = board.city(city).map(|c| c.mileposts[0]) else {
        return 0.0;
    };
    let Some(railhead) = segments.last().map(|s| s.to) else {
        return 0.0;
    };
    5.0 / (1.0 + railhead.distance(center) as f64)
}

/// Opponents hovering near the target city make a build there contested.
fn blocking_signal(snapshot: &WorldSnapshot, city: &str) -> f64 {
    let posts = snapshot.board.city_mileposts(city);
    snapshot
        .opponents
        .iter()
        .filter(|o| {
            o.position
                .map(|p| posts.iter().any(|c| c.distance(p) <= 3))
                .unwrap_or(false)
        })
        .count() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::generate;
    use crate::testing::fixtures;
    use boxcar_common::{Archetype, SkillLevel};

    fn delivery_snapshot() -> crate::snapshot::WorldSnapshot {
        fixtures::snapshot_builder()
            .with_track(&[(5, 9), (6, 9), (7, 9)])
            .position(5, 9)
            .movement(9)
            .carrying(&["Coal"])
            .demand(3, "Stonebridge", "Coal", 16)
            .build()
    }

    #[test]
    fn empty_in_empty_out() {
        let snapshot = fixtures::snapshot_builder().build();
        let scored = score(
            &[],
            &snapshot,
            SkillLevel::Master.profile(),
            Archetype::Clockwork.profile(),
        );
        assert!(scored.is_empty());
    }

    #[test]
    fn scoring_is_deterministic() {
        let snapshot = delivery_snapshot();
        let options = generate(&snapshot);
        let a = score(
            &options.feasible,
            &snapshot,
            SkillLevel::Seasoned.profile(),
            Archetype::Magnate.profile(),
        );
        let b = score(
            &options.feasible,
            &snapshot,
            SkillLevel::Seasoned.profile(),
            Archetype::Magnate.profile(),
        );
        assert_eq!(a, b);
    }

    #[test]
    fn output_is_sorted_descending() {
        let snapshot = delivery_snapshot();
        let options = generate(&snapshot);
        let scored = score(
            &options.feasible,
            &snapshot,
            SkillLevel::Master.profile(),
            Archetype::Clockwork.profile(),
        );
        for pair in scored.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn pass_turn_ranks_below_a_reachable_delivery() {
        let snapshot = delivery_snapshot();
        let options = generate(&snapshot);
        let scored = score(
            &options.feasible,
            &snapshot,
            SkillLevel::Master.profile(),
            Archetype::Clockwork.profile(),
        );
        let pass_rank = scored
            .iter()
            .position(|o| o.action == BotAction::PassTurn)
            .unwrap();
        let delivery_rank = scored
            .iter()
            .position(|o| matches!(o.action, BotAction::DeliverLoad { .. }))
            .unwrap();
        assert!(delivery_rank < pass_rank);
    }

    #[test]
    fn different_profiles_diverge_on_the_same_options() {
        let snapshot = delivery_snapshot();
        let options = generate(&snapshot);
        let magnate = score(
            &options.feasible,
            &snapshot,
            SkillLevel::Master.profile(),
            Archetype::Magnate.profile(),
        );
        let surveyor = score(
            &options.feasible,
            &snapshot,
            SkillLevel::Master.profile(),
            Archetype::Surveyor.profile(),
        );
        let magnate_scores: Vec<f64> = magnate.iter().map(|o| o.score).collect();
        let surveyor_scores: Vec<f64> = surveyor.iter().map(|o| o.score).collect();
        assert_ne!(magnate_scores, surveyor_scores);
    }

    #[test]
    fn every_scored_option_has_a_rationale() {
        let snapshot = delivery_snapshot();
        let options = generate(&snapshot);
        let scored = score(
            &options.feasible,
            &snapshot,
            SkillLevel::Novice.profile(),
            Archetype::Gambler.profile(),
        );
        assert!(scored.iter().all(|o| !o.rationale.is_empty()));
    }
}
