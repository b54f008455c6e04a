use chrono::{DateTime, Utc};
use rayon::prelude::*;

use crate::error::PlanError;
use crate::factory::{FactorySlot, SlotId};
use crate::job::{JobBook, JobTemplate};
use crate::temporal::{DateRange, Duration};

/// What the strategy is trying to place.
#[derive(Debug, Clone, Copy)]
pub struct SlotRequest<'a> {
    pub template: &'a JobTemplate,
    pub duration: Duration,
    pub desired: DateTime<Utc>,
    pub collision_step: Duration,
}

/// Policy choosing one slot among the candidates for a job.
pub trait SlotSelector: Send + Sync {
    /// `candidates` is never empty and is in slot order. `None` means no
    /// candidate is acceptable.
    fn select(
        &self,
        candidates: &[&FactorySlot],
        request: &SlotRequest<'_>,
        jobs: &JobBook,
    ) -> Result<Option<SlotId>, PlanError>;
}

/// Picks the slot least utilized over the horizon following the desired
/// date. Ties go to the earlier candidate.
#[derive(Debug, Clone, Copy)]
pub struct LowestUtilization {
    horizon: Duration,
}

impl LowestUtilization {
    pub fn new(horizon: Duration) -> Self {
        Self { horizon }
    }
}

impl SlotSelector for LowestUtilization {
    fn select(
        &self,
        candidates: &[&FactorySlot],
        request: &SlotRequest<'_>,
        jobs: &JobBook,
    ) -> Result<Option<SlotId>, PlanError> {
        let window = DateRange::starting_at(request.desired, self.horizon)?;
        let utilizations = candidates
            .par_iter()
            .map(|slot| slot.utilization(&window, jobs))
            .collect::<Result<Vec<f64>, PlanError>>()?;
        Ok(first_minimum(candidates, &utilizations))
    }
}

/// Picks the slot where the job could start soonest. Ties go to the earlier
/// candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct EarliestStart;

impl SlotSelector for EarliestStart {
    fn select(
        &self,
        candidates: &[&FactorySlot],
        request: &SlotRequest<'_>,
        jobs: &JobBook,
    ) -> Result<Option<SlotId>, PlanError> {
        let starts = candidates
            .par_iter()
            .map(|slot| {
                slot.earliest_start(request.desired, request.duration, request.collision_step, jobs)
            })
            .collect::<Result<Vec<_>, PlanError>>()?;
        Ok(first_minimum(candidates, &starts))
    }
}

fn first_minimum<T: PartialOrd>(candidates: &[&FactorySlot], scores: &[T]) -> Option<SlotId> {
    let mut best: Option<(usize, &T)> = None;
    for (idx, score) in scores.iter().enumerate() {
        match best {
            Some((_, current)) if score >= current => {}
            _ => best = Some((idx, score)),
        }
    }
    best.map(|(idx, _)| candidates[idx].id())
}
