use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use super::{Factory, FactoryId, FactorySlot, SlotId, SlotType};
use crate::error::PlanError;
use crate::job::{Job, JobBook, JobId, JobKind, JobStatus, TemplateId};
use crate::resource::ProductionLocation;

/// Owns every factory, slot and scheduled job.
///
/// All job mutation goes through here so the slot invariants are checked on
/// every insert. The manager is not internally synchronized; callers that
/// share one across threads must serialize access themselves.
#[derive(Debug, Clone, Default)]
pub struct FactoryManager {
    factories: Vec<Factory>,
    jobs: JobBook,
    next_slot: u32,
}

impl FactoryManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_factory(&mut self, name: impl Into<String>) -> Result<FactoryId, PlanError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(PlanError::InvalidArgument(
                "factory name must not be blank".to_string(),
            ));
        }
        let id = FactoryId(u32::try_from(self.factories.len()).map_err(|_| {
            PlanError::InvalidArgument("too many factories".to_string())
        })?);
        self.factories.push(Factory::new(id, name));
        Ok(id)
    }

    pub fn add_slot(
        &mut self,
        factory: FactoryId,
        name: impl Into<String>,
        slot_type: SlotType,
        input: ProductionLocation,
        output: ProductionLocation,
    ) -> Result<SlotId, PlanError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(PlanError::InvalidArgument(
                "slot name must not be blank".to_string(),
            ));
        }
        if input.is_wildcard() || output.is_wildcard() {
            return Err(PlanError::InvalidArgument(format!(
                "slot '{name}' needs concrete input and output locations"
            )));
        }
        let id = SlotId(self.next_slot);
        let owner = self.factory_mut(factory)?;
        owner.push_slot(FactorySlot::new(id, name, factory, slot_type, input, output));
        self.next_slot += 1;
        Ok(id)
    }

    pub fn factories(&self) -> &[Factory] {
        &self.factories
    }

    pub fn factory(&self, id: FactoryId) -> Result<&Factory, PlanError> {
        self.factories
            .iter()
            .find(|factory| factory.id() == id)
            .ok_or(PlanError::UnknownFactory(id))
    }

    fn factory_mut(&mut self, id: FactoryId) -> Result<&mut Factory, PlanError> {
        self.factories
            .iter_mut()
            .find(|factory| factory.id() == id)
            .ok_or(PlanError::UnknownFactory(id))
    }

    /// Every slot, factory by factory in creation order.
    pub fn slots(&self) -> impl Iterator<Item = &FactorySlot> {
        self.factories.iter().flat_map(|factory| factory.slots().iter())
    }

    pub fn slot(&self, id: SlotId) -> Result<&FactorySlot, PlanError> {
        self.factories
            .iter()
            .find_map(|factory| factory.slot(id))
            .ok_or(PlanError::UnknownSlot(id))
    }

    fn slot_mut(&mut self, id: SlotId) -> Result<&mut FactorySlot, PlanError> {
        self.factories
            .iter_mut()
            .find_map(|factory| factory.slot_mut(id))
            .ok_or(PlanError::UnknownSlot(id))
    }

    /// Slot ids across all factories grouped by type, each group in slot
    /// order.
    pub fn slots_by_type(&self) -> BTreeMap<SlotType, Vec<SlotId>> {
        let mut groups: BTreeMap<SlotType, Vec<SlotId>> = BTreeMap::new();
        for slot in self.slots() {
            groups
                .entry(slot.slot_type().clone())
                .or_default()
                .push(slot.id());
        }
        groups
    }

    pub fn jobs(&self) -> &JobBook {
        &self.jobs
    }

    pub fn job(&self, id: JobId) -> Result<&Job, PlanError> {
        self.jobs.job(id)
    }

    /// Live (not cancelled) jobs created from `template`.
    pub fn jobs_for_template(&self, template: TemplateId) -> Vec<JobId> {
        self.jobs.ids_for_template(template)
    }

    /// The slot hosting `job`. A job found in two slots is an internal error.
    pub fn find_slot(&self, job: JobId) -> Result<Option<SlotId>, PlanError> {
        let hosts: Vec<SlotId> = self
            .slots()
            .filter(|slot| slot.holds(job))
            .map(FactorySlot::id)
            .collect();
        match hosts.as_slice() {
            [] => Ok(None),
            [slot] => Ok(Some(*slot)),
            many => Err(PlanError::Internal(format!(
                "{job} is hosted by several slots: {many:?}"
            ))),
        }
    }

    /// Places `job` in `slot`.
    ///
    /// A job without explicit dependencies inherits every job of each of its
    /// dependency templates that is neither finished nor cancelled, so work
    /// left over from earlier plans is never picked up. The job is rejected, and nothing changes,
    /// when a dependency finishes after it starts or when it overlaps a job
    /// already in the slot.
    pub fn add_job(&mut self, slot: SlotId, mut job: Job) -> Result<JobId, PlanError> {
        if job.dependencies().is_empty() && !job.dependency_templates().is_empty() {
            let mut resolved = Vec::new();
            for dependency in job.dependency_templates() {
                let found: Vec<JobId> = self
                    .jobs
                    .ids_for_template(*dependency)
                    .into_iter()
                    .filter(|id| self.jobs.get(*id).is_some_and(|j| !j.status().is_terminal()))
                    .collect();
                if found.is_empty() {
                    return Err(PlanError::UnresolvedDependency {
                        template: job.template(),
                        dependency: *dependency,
                    });
                }
                resolved.extend(found);
            }
            job.set_dependencies(resolved);
        }
        for dependency in job.dependencies() {
            self.jobs.job(*dependency)?;
        }
        if job.dependencies().is_empty() && job.kind() == JobKind::DependencyDriven {
            return Err(PlanError::InvalidArgument(format!(
                "job '{}' derives its start from dependencies but has none",
                job.name()
            )));
        }

        self.slot(slot)?.validate_placement(&job, &self.jobs)?;

        let name = job.name().to_string();
        let id = self.jobs.insert(job);
        self.slot_mut(slot)?.attach(id);
        debug!(%id, %slot, job = %name, "job added to slot");
        Ok(id)
    }

    /// Takes `job` out of its slot and the book. Fails while a job that is
    /// not cancelled still depends on it.
    pub fn remove_job(&mut self, job: JobId) -> Result<Job, PlanError> {
        self.jobs.job(job)?;
        let blocking: Vec<JobId> = self
            .jobs
            .dependents_of(job)
            .into_iter()
            .filter(|dependent| {
                self.jobs
                    .get(*dependent)
                    .is_some_and(|j| j.status() != JobStatus::Cancelled)
            })
            .collect();
        if !blocking.is_empty() {
            return Err(PlanError::InvalidState(format!(
                "{job} is still required by {blocking:?}"
            )));
        }
        if let Some(slot) = self.find_slot(job)? {
            self.slot_mut(slot)?.detach(job);
        }
        self.jobs.remove(job)
    }

    pub fn set_job_status(&mut self, job: JobId, status: JobStatus) -> Result<(), PlanError> {
        self.jobs.get_mut(job)?.set_status(status)
    }

    /// Moves every job from `PROSPECTIVE` to `NOT_STARTED`. Either all jobs
    /// move or none do.
    pub fn submit(&mut self, jobs: &[JobId]) -> Result<(), PlanError> {
        for id in jobs {
            let status = self.jobs.job(*id)?.status();
            if !status.can_transition_to(JobStatus::NotStarted) {
                return Err(PlanError::InvalidTransition {
                    from: status,
                    to: JobStatus::NotStarted,
                });
            }
        }
        for id in jobs {
            self.set_job_status(*id, JobStatus::NotStarted)?;
        }
        Ok(())
    }

    /// Cancels every non-terminal job in `jobs` and removes all of them.
    ///
    /// Fails up front when a job outside the set still depends on one inside
    /// it.
    pub fn dispose(&mut self, jobs: &[JobId]) -> Result<(), PlanError> {
        let members: HashSet<JobId> = jobs.iter().copied().collect();
        for id in jobs {
            self.jobs.job(*id)?;
            for dependent in self.jobs.dependents_of(*id) {
                let outside = !members.contains(&dependent);
                let live = self
                    .jobs
                    .get(dependent)
                    .is_some_and(|j| j.status() != JobStatus::Cancelled);
                if outside && live {
                    return Err(PlanError::InvalidState(format!(
                        "{id} is still required by {dependent} outside the disposed set"
                    )));
                }
            }
        }

        for id in jobs {
            let job = self.jobs.get_mut(*id)?;
            if !job.status().is_terminal() {
                job.set_status(JobStatus::Cancelled)?;
            }
        }
        for id in jobs.iter().rev() {
            self.remove_job(*id)?;
        }
        Ok(())
    }

    /// Starts every automatic job that is due at `now` and whose dependencies
    /// have finished. Returns the started jobs.
    pub fn start_due_jobs(&mut self, now: DateTime<Utc>) -> Result<Vec<JobId>, PlanError> {
        let mut due = Vec::new();
        for (id, job) in self.jobs.iter() {
            if job.status() != JobStatus::NotStarted || job.mode().requires_confirmation() {
                continue;
            }
            if job.start_date(&self.jobs)? <= now && job.dependencies_finished(&self.jobs)? {
                due.push(id);
            }
        }
        for id in &due {
            self.set_job_status(*id, JobStatus::Pending)?;
        }
        if !due.is_empty() {
            debug!(count = due.len(), %now, "started due jobs");
        }
        Ok(due)
    }

    /// Starts a job on explicit confirmation, regardless of its mode.
    pub fn confirm_start(&mut self, job: JobId) -> Result<(), PlanError> {
        let record = self.jobs.job(job)?;
        if !record.dependencies_finished(&self.jobs)? {
            return Err(PlanError::InvalidState(format!(
                "{job} cannot start before its dependencies finish"
            )));
        }
        self.set_job_status(job, JobStatus::Pending)
    }

    pub fn finish_job(&mut self, job: JobId) -> Result<(), PlanError> {
        self.set_job_status(job, JobStatus::Finished)
    }
}
