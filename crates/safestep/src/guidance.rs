//! Turn-by-turn guidance plan.
//!
//! Routes are canned: every trip walks the same short sequence of
//! instructions, stretched or cut to its step count, and always ends on the
//! arrival step. The progress value attached to each step is what the
//! step protocol records when the traveller reaches it.

use serde::Serialize;

use crate::trip::MAX_PROGRESS;

/// Arrow shown for a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Keep going ahead.
    Straight,
    /// Turn left.
    Left,
    /// Turn right.
    Right,
}

/// One instruction on a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteStep {
    /// Zero-based step index.
    pub index: u32,
    /// Arrow to show.
    pub direction: Direction,
    /// Text read to the traveller.
    pub instruction: &'static str,
    /// Length of the leg.
    pub distance_meters: u32,
    /// Progress recorded on reaching this step.
    pub progress: u32,
    /// Encouragement spoken on reaching this step, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reassurance: Option<&'static str>,
}

const LEGS: [(Direction, &str, u32); 4] = [
    (Direction::Straight, "Continue straight on Main Street", 500),
    (Direction::Right, "Turn right onto Oak Avenue", 200),
    (Direction::Straight, "Continue straight", 800),
    (Direction::Left, "Turn left onto Elm Street", 150),
];

const ARRIVAL: (Direction, &str, u32) = (Direction::Straight, "Your destination is ahead", 100);

const REASSURANCE: [&str; 3] = [
    "You're doing great!",
    "You're on the right path",
    "Almost there, keep going",
];

/// Progress for reaching step `step` of `total_steps`, rounded half up.
#[must_use]
pub fn step_progress(step: u32, total_steps: u32) -> u32 {
    if total_steps == 0 {
        return MAX_PROGRESS;
    }
    let reached = u64::from(step.saturating_add(1).min(total_steps));
    let total = u64::from(total_steps);
    let pct = (reached * 200 + total) / (total * 2);
    u32::try_from(pct).unwrap_or(MAX_PROGRESS)
}

/// Build the step plan for a route of `total_steps` steps.
#[must_use]
pub fn canned_route(total_steps: u32) -> Vec<RouteStep> {
    (0..total_steps)
        .map(|index| {
            let (direction, instruction, distance_meters) = if index + 1 == total_steps {
                ARRIVAL
            } else {
                LEGS[index as usize % LEGS.len()]
            };
            let reassurance = match index {
                1..=3 if index + 1 < total_steps => Some(REASSURANCE[(index / 2) as usize]),
                _ => None,
            };
            RouteStep {
                index,
                direction,
                instruction,
                distance_meters,
                progress: step_progress(index, total_steps),
                reassurance,
            }
        })
        .collect()
}
