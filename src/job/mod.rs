//! Jobs, their templates and the status machine.
//!
//! Jobs live in a [`JobBook`] owned by the factory manager and refer to their
//! dependencies by [`JobId`]. Every derived date is computed against the book,
//! so a job's schedule always reflects the current dates of what it waits on.

mod status;
mod template;

pub use status::{JobMode, JobStatus};
pub use template::{Activity, JobTemplate, TemplateCatalog, TemplateId};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::PlanError;
use crate::temporal::{DateRange, Duration};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// How a job's start date is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobKind {
    /// Starts on an assigned date, or when its last dependency ends if that
    /// is later.
    Simple { start: DateTime<Utc> },
    /// Starts when the last of its dependencies ends.
    DependencyDriven,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    name: String,
    template: TemplateId,
    dependency_templates: Vec<TemplateId>,
    mode: JobMode,
    duration: Duration,
    runs: u32,
    status: JobStatus,
    kind: JobKind,
    dependencies: Vec<JobId>,
}

impl Job {
    /// A job from `template` running `runs` times, starting at `start`.
    pub fn simple(
        name: impl Into<String>,
        template: &JobTemplate,
        runs: u32,
        start: DateTime<Utc>,
    ) -> Result<Self, PlanError> {
        Self::from_template(name.into(), template, runs, JobKind::Simple { start })
    }

    /// A job from `template` that starts once its dependencies end.
    pub fn dependency_driven(
        name: impl Into<String>,
        template: &JobTemplate,
        runs: u32,
    ) -> Result<Self, PlanError> {
        Self::from_template(name.into(), template, runs, JobKind::DependencyDriven)
    }

    fn from_template(
        name: String,
        template: &JobTemplate,
        runs: u32,
        kind: JobKind,
    ) -> Result<Self, PlanError> {
        if name.trim().is_empty() {
            return Err(PlanError::InvalidArgument(
                "job name must not be blank".to_string(),
            ));
        }
        if runs == 0 {
            return Err(PlanError::InvalidArgument(format!(
                "job '{name}' must run at least once"
            )));
        }
        let duration = template.duration_per_run().multiply(runs)?;
        Ok(Self {
            name,
            template: template.id(),
            dependency_templates: template.dependencies().to_vec(),
            mode: template.mode(),
            duration,
            runs,
            status: JobStatus::Prospective,
            kind,
            dependencies: Vec::new(),
        })
    }

    pub fn with_dependencies(mut self, dependencies: Vec<JobId>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template(&self) -> TemplateId {
        self.template
    }

    pub fn dependency_templates(&self) -> &[TemplateId] {
        &self.dependency_templates
    }

    pub fn mode(&self) -> JobMode {
        self.mode
    }

    /// Own duration, excluding dependencies.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn runs(&self) -> u32 {
        self.runs
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn dependencies(&self) -> &[JobId] {
        &self.dependencies
    }

    /// Reassigns the start of a simple job. Jobs already placed in a slot are
    /// only reachable through shared references, so this cannot move them.
    pub fn set_start_date(&mut self, start: DateTime<Utc>) -> Result<(), PlanError> {
        match &mut self.kind {
            JobKind::Simple { start: current } => {
                *current = start;
                Ok(())
            }
            JobKind::DependencyDriven => Err(PlanError::InvalidState(format!(
                "job '{}' derives its start from its dependencies",
                self.name
            ))),
        }
    }

    pub fn set_status(&mut self, next: JobStatus) -> Result<(), PlanError> {
        if !self.status.can_transition_to(next) {
            return Err(PlanError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    pub(crate) fn set_dependencies(&mut self, dependencies: Vec<JobId>) {
        self.dependencies = dependencies;
    }

    pub fn start_date(&self, book: &JobBook) -> Result<DateTime<Utc>, PlanError> {
        match self.kind {
            JobKind::Simple { start } => {
                let latest = self.latest_dependency_end(book)?;
                Ok(latest.map_or(start, |latest| latest.max(start)))
            }
            JobKind::DependencyDriven => self.earliest_start_date(book),
        }
    }

    /// Latest end among the dependencies, or the own start without any.
    pub fn earliest_start_date(&self, book: &JobBook) -> Result<DateTime<Utc>, PlanError> {
        if let Some(latest) = self.latest_dependency_end(book)? {
            return Ok(latest);
        }
        match self.kind {
            JobKind::Simple { start } => Ok(start),
            JobKind::DependencyDriven => Err(PlanError::InvalidState(format!(
                "job '{}' has no dependencies to derive its start from",
                self.name
            ))),
        }
    }

    pub fn end_date(&self, book: &JobBook) -> Result<DateTime<Utc>, PlanError> {
        Ok(self.date_range(book)?.end())
    }

    pub fn earliest_finishing_date(&self, book: &JobBook) -> Result<DateTime<Utc>, PlanError> {
        let range = DateRange::starting_at(self.earliest_start_date(book)?, self.duration)?;
        Ok(range.end())
    }

    pub fn date_range(&self, book: &JobBook) -> Result<DateRange, PlanError> {
        Ok(DateRange::starting_at(self.start_date(book)?, self.duration)?)
    }

    /// Span from the earliest start anywhere in the dependency chain through
    /// this job's end.
    pub fn total_duration(&self, book: &JobBook) -> Result<Duration, PlanError> {
        let first = self.chain_start(book)?;
        Ok(Duration::between(first, self.end_date(book)?)?)
    }

    fn chain_start(&self, book: &JobBook) -> Result<DateTime<Utc>, PlanError> {
        let mut first = self.start_date(book)?;
        for id in &self.dependencies {
            first = first.min(book.job(*id)?.chain_start(book)?);
        }
        Ok(first)
    }

    fn latest_dependency_end(&self, book: &JobBook) -> Result<Option<DateTime<Utc>>, PlanError> {
        let mut latest = None;
        for id in &self.dependencies {
            let end = book.job(*id)?.end_date(book)?;
            latest = Some(latest.map_or(end, |current: DateTime<Utc>| current.max(end)));
        }
        Ok(latest)
    }

    /// True when every dependency has finished.
    pub fn dependencies_finished(&self, book: &JobBook) -> Result<bool, PlanError> {
        for id in &self.dependencies {
            if book.job(*id)?.status() != JobStatus::Finished {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Arena of scheduled jobs, ordered by id.
#[derive(Debug, Clone, Default)]
pub struct JobBook {
    jobs: BTreeMap<JobId, Job>,
    next_id: u64,
}

impl JobBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: JobId) -> Option<&Job> {
        self.jobs.get(&id)
    }

    pub fn job(&self, id: JobId) -> Result<&Job, PlanError> {
        self.jobs.get(&id).ok_or(PlanError::UnknownJob(id))
    }

    pub fn contains(&self, id: JobId) -> bool {
        self.jobs.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (JobId, &Job)> {
        self.jobs.iter().map(|(id, job)| (*id, job))
    }

    /// Jobs of `template` that have not been cancelled.
    pub fn ids_for_template(&self, template: TemplateId) -> Vec<JobId> {
        self.iter()
            .filter(|(_, job)| job.template() == template && job.status() != JobStatus::Cancelled)
            .map(|(id, _)| id)
            .collect()
    }

    /// Jobs that list `id` among their dependencies.
    pub fn dependents_of(&self, id: JobId) -> Vec<JobId> {
        self.iter()
            .filter(|(_, job)| job.dependencies().contains(&id))
            .map(|(dependent, _)| dependent)
            .collect()
    }

    pub(crate) fn insert(&mut self, job: Job) -> JobId {
        self.next_id += 1;
        let id = JobId(self.next_id);
        self.jobs.insert(id, job);
        id
    }

    pub(crate) fn get_mut(&mut self, id: JobId) -> Result<&mut Job, PlanError> {
        self.jobs.get_mut(&id).ok_or(PlanError::UnknownJob(id))
    }

    pub(crate) fn remove(&mut self, id: JobId) -> Result<Job, PlanError> {
        self.jobs.remove(&id).ok_or(PlanError::UnknownJob(id))
    }
}
