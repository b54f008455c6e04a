use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::FactoryId;
use crate::error::PlanError;
use crate::job::{Activity, Job, JobBook, JobId, JobTemplate};
use crate::resource::ProductionLocation;
use crate::temporal::{DateRange, Duration};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotId(pub u32);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot-{}", self.0)
    }
}

/// Kind of execution slot, described by the activities it can run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotType {
    name: String,
    activities: BTreeSet<Activity>,
}

impl SlotType {
    pub fn new(name: impl Into<String>, activities: impl IntoIterator<Item = Activity>) -> Self {
        Self {
            name: name.into(),
            activities: activities.into_iter().collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn activities(&self) -> impl Iterator<Item = &Activity> {
        self.activities.iter()
    }

    pub fn accepts(&self, template: &JobTemplate) -> bool {
        self.activities.contains(template.activity())
    }
}

impl fmt::Display for SlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// One unit of execution capacity. No two of its jobs overlap in time,
/// although they may abut.
#[derive(Debug, Clone)]
pub struct FactorySlot {
    id: SlotId,
    name: String,
    factory: FactoryId,
    slot_type: SlotType,
    input: ProductionLocation,
    output: ProductionLocation,
    jobs: Vec<JobId>,
}

impl FactorySlot {
    pub(crate) fn new(
        id: SlotId,
        name: String,
        factory: FactoryId,
        slot_type: SlotType,
        input: ProductionLocation,
        output: ProductionLocation,
    ) -> Self {
        Self {
            id,
            name,
            factory,
            slot_type,
            input,
            output,
            jobs: Vec::new(),
        }
    }

    pub fn id(&self) -> SlotId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn factory(&self) -> FactoryId {
        self.factory
    }

    pub fn slot_type(&self) -> &SlotType {
        &self.slot_type
    }

    pub fn input_location(&self) -> &ProductionLocation {
        &self.input
    }

    pub fn output_location(&self) -> &ProductionLocation {
        &self.output
    }

    /// Copy of the hosted job ids, in insertion order.
    pub fn jobs(&self) -> Vec<JobId> {
        self.jobs.clone()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn holds(&self, job: JobId) -> bool {
        self.jobs.contains(&job)
    }

    /// Hosted jobs with their ranges, earliest start first.
    pub fn schedule(&self, book: &JobBook) -> Result<Vec<(JobId, DateRange)>, PlanError> {
        let mut ranges = self
            .jobs
            .iter()
            .map(|id| Ok((*id, book.job(*id)?.date_range(book)?)))
            .collect::<Result<Vec<_>, PlanError>>()?;
        ranges.sort_by_key(|(id, range)| (range.start(), *id));
        Ok(ranges)
    }

    /// Jobs running at any point of the UTC day `date`.
    pub fn jobs_on_day(&self, date: NaiveDate, book: &JobBook) -> Result<Vec<JobId>, PlanError> {
        let day = DateRange::day(date)?;
        Ok(self
            .schedule(book)?
            .into_iter()
            .filter(|(_, range)| range.intersects(&day))
            .map(|(id, _)| id)
            .collect())
    }

    /// The job running at `instant`, if any.
    pub fn job_on(
        &self,
        instant: DateTime<Utc>,
        book: &JobBook,
    ) -> Result<Option<JobId>, PlanError> {
        let running: Vec<JobId> = self
            .schedule(book)?
            .into_iter()
            .filter(|(_, range)| range.covers(instant))
            .map(|(id, _)| id)
            .collect();
        match running.as_slice() {
            [] => Ok(None),
            [id] => Ok(Some(*id)),
            many => Err(PlanError::Internal(format!(
                "{} runs {} jobs at {instant}: {many:?}",
                self.id,
                many.len()
            ))),
        }
    }

    /// Share of `range` taken by the single longest job inside it.
    pub fn utilization(&self, range: &DateRange, book: &JobBook) -> Result<f64, PlanError> {
        let span = range.duration().to_seconds()?;
        if span == 0 {
            return Err(PlanError::InvalidArgument(format!(
                "utilization needs a non-empty range, got {range}"
            )));
        }
        let mut longest = 0_u64;
        for (_, job_range) in self.schedule(book)? {
            if let Some(shared) = job_range.overlap(range) {
                longest = longest.max(shared.duration().to_seconds()?);
            }
        }
        Ok(longest as f64 / span as f64)
    }

    /// First start at or after `desired` where a job of `duration` fits
    /// without overlapping the hosted jobs.
    ///
    /// A single hosted job that already covers `desired` pushes the start to
    /// `collision_step` past its end.
    pub fn earliest_start(
        &self,
        desired: DateTime<Utc>,
        duration: Duration,
        collision_step: Duration,
        book: &JobBook,
    ) -> Result<DateTime<Utc>, PlanError> {
        let schedule = self.schedule(book)?;
        let needed = duration.to_time_delta()?;

        match schedule.as_slice() {
            [] => return Ok(desired),
            [(_, only)] if only.covers(desired) => {
                return after(only.end(), collision_step.to_time_delta()?);
            }
            _ => {}
        }

        let mut gap_start = desired;
        for (_, range) in &schedule {
            if range.start() >= gap_start && range.start() - gap_start >= needed {
                return Ok(gap_start);
            }
            gap_start = gap_start.max(range.end());
        }
        Ok(gap_start)
    }

    /// Checks that `job` can join this slot: its dependencies finish before it
    /// starts and it overlaps none of the hosted jobs.
    pub(crate) fn validate_placement(&self, job: &Job, book: &JobBook) -> Result<(), PlanError> {
        let start = job.start_date(book)?;
        for dependency in job.dependencies() {
            let finish = book.job(*dependency)?.earliest_finishing_date(book)?;
            if finish > start {
                return Err(PlanError::InvalidArgument(format!(
                    "job '{}' starts at {start} before dependency {dependency} finishes at {finish}",
                    job.name()
                )));
            }
        }

        let range = job.date_range(book)?;
        for (hosted, hosted_range) in self.schedule(book)? {
            if hosted_range.intersects(&range) {
                return Err(PlanError::InvalidArgument(format!(
                    "job '{}' {range} overlaps {hosted} {hosted_range} in {}",
                    job.name(),
                    self.id
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn attach(&mut self, job: JobId) {
        self.jobs.push(job);
    }

    pub(crate) fn detach(&mut self, job: JobId) -> bool {
        let before = self.jobs.len();
        self.jobs.retain(|hosted| *hosted != job);
        self.jobs.len() != before
    }
}

fn after(instant: DateTime<Utc>, step: chrono::TimeDelta) -> Result<DateTime<Utc>, PlanError> {
    instant.checked_add_signed(step).ok_or_else(|| {
        PlanError::InvalidArgument(format!("{instant} + {step} is out of range"))
    })
}
