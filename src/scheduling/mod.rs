//! Turns a [`ProductionPlanTemplate`] into a [`ProductionPlan`].
//!
//! Templates are visited dependencies-first. Each one is given a slot by the
//! configured [`SlotSelector`], a start date that avoids the slot's existing
//! jobs and follows its dependency jobs, and is then added to the slot.

mod selector;

pub use selector::{EarliestStart, LowestUtilization, SlotRequest, SlotSelector};

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::config::PlannerConfig;
use crate::error::PlanError;
use crate::factory::{FactoryManager, FactorySlot, SlotId};
use crate::graph::TemplateGraph;
use crate::job::{Job, JobId, JobTemplate, TemplateId};
use crate::plan::{self, ProductionPlan, ProductionPlanTemplate, Reservation};
use crate::resource::ResourceManager;

pub struct SchedulingStrategy {
    config: PlannerConfig,
    selector: Box<dyn SlotSelector>,
    resources: Option<Arc<ResourceManager>>,
}

/// Jobs and reservations made so far by one scheduling run.
#[derive(Default)]
struct Progress {
    jobs: Vec<JobId>,
    reservations: Vec<Reservation>,
    by_template: HashMap<TemplateId, Vec<JobId>>,
}

impl SchedulingStrategy {
    /// Lowest-utilization slot choice over the configured horizon.
    pub fn new(config: PlannerConfig) -> Self {
        let selector = LowestUtilization::new(config.utilization_horizon);
        Self {
            config,
            selector: Box::new(selector),
            resources: None,
        }
    }

    pub fn with_selector(mut self, selector: impl SlotSelector + 'static) -> Self {
        self.selector = Box::new(selector);
        self
    }

    /// Books template inputs and outputs against `resources` for every job.
    pub fn with_resources(mut self, resources: Arc<ResourceManager>) -> Self {
        self.resources = Some(resources);
        self
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Places every template reachable from the plan template's roots.
    ///
    /// On failure everything placed by this call is rolled back and no plan
    /// is returned. Callers must not schedule concurrently against the same
    /// manager.
    pub fn schedule(
        &self,
        template: &ProductionPlanTemplate,
        manager: &mut FactoryManager,
    ) -> Result<ProductionPlan, PlanError> {
        let mut progress = Progress::default();
        match self.place_all(template, manager, &mut progress) {
            Ok(()) => {
                info!(
                    plan = template.name(),
                    jobs = progress.jobs.len(),
                    "production plan created"
                );
                Ok(ProductionPlan::new(
                    template.name().to_string(),
                    template.roots().to_vec(),
                    progress.jobs,
                    progress.reservations,
                    self.resources.clone(),
                ))
            }
            Err(err) => {
                self.roll_back(manager, &progress);
                Err(err)
            }
        }
    }

    fn place_all(
        &self,
        template: &ProductionPlanTemplate,
        manager: &mut FactoryManager,
        progress: &mut Progress,
    ) -> Result<(), PlanError> {
        let catalog = template.catalog();
        let graph = TemplateGraph::build(catalog, template.roots())?;
        let order = graph.scheduling_order()?;
        let slot_groups = manager.slots_by_type();

        for template_id in order {
            let job_template = catalog.get(template_id)?;

            let mut candidates: Vec<SlotId> = slot_groups
                .iter()
                .filter(|(slot_type, _)| slot_type.accepts(job_template))
                .flat_map(|(_, slots)| slots.iter().copied())
                .collect();
            candidates.sort();
            if candidates.is_empty() {
                return Err(PlanError::NoSlotAvailable {
                    template: job_template.name().to_string(),
                });
            }

            let mut dependencies = Vec::new();
            for dependency in job_template.dependencies() {
                match progress.by_template.get(dependency) {
                    Some(jobs) if !jobs.is_empty() => dependencies.extend(jobs.iter().copied()),
                    _ => {
                        return Err(PlanError::UnresolvedDependency {
                            template: template_id,
                            dependency: *dependency,
                        });
                    }
                }
            }
            let desired = desired_start(template.desired_start(), &dependencies, manager)?;

            let parts = self.run_split(job_template, candidates.len());
            for (part, runs) in parts.into_iter().enumerate() {
                let name = if part == 0 {
                    job_template.name().to_string()
                } else {
                    format!("{} #{}", job_template.name(), part + 1)
                };
                let id = self.place(
                    job_template,
                    name,
                    runs,
                    desired,
                    &candidates,
                    &dependencies,
                    manager,
                    progress,
                )?;
                progress.by_template.entry(template_id).or_default().push(id);
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn place(
        &self,
        job_template: &JobTemplate,
        name: String,
        runs: u32,
        desired: DateTime<Utc>,
        candidates: &[SlotId],
        dependencies: &[JobId],
        manager: &mut FactoryManager,
        progress: &mut Progress,
    ) -> Result<JobId, PlanError> {
        let duration = job_template.duration_per_run().multiply(runs)?;
        let request = SlotRequest {
            template: job_template,
            duration,
            desired,
            collision_step: self.config.collision_step,
        };

        let (slot_id, start) = {
            let slots = candidates
                .iter()
                .map(|id| manager.slot(*id))
                .collect::<Result<Vec<&FactorySlot>, PlanError>>()?;
            let slot_id = self
                .selector
                .select(&slots, &request, manager.jobs())?
                .ok_or_else(|| PlanError::NoSlotAvailable {
                    template: job_template.name().to_string(),
                })?;
            let slot = manager.slot(slot_id)?;
            let start = slot.earliest_start(
                desired,
                duration,
                self.config.collision_step,
                manager.jobs(),
            )?;
            (slot_id, start)
        };
        debug!(template = job_template.name(), %slot_id, %start, runs, "slot chosen");

        let job = Job::simple(name, job_template, runs, start)?.with_dependencies(dependencies.to_vec());
        let id = manager.add_job(slot_id, job)?;
        progress.jobs.push(id);
        self.reserve(job_template, runs, id, slot_id, manager, progress)?;
        Ok(id)
    }

    /// Runs per job: a parallelizable template is spread over up to one job
    /// per candidate slot, otherwise it stays whole.
    fn run_split(&self, job_template: &JobTemplate, candidates: usize) -> Vec<u32> {
        let runs = job_template.runs();
        let parts = u32::try_from(candidates).unwrap_or(u32::MAX).min(runs);
        if !self.config.split_parallel_runs || !job_template.is_parallelizable() || parts <= 1 {
            return vec![runs];
        }
        (0..parts)
            .map(|part| runs / parts + u32::from(part < runs % parts))
            .collect()
    }

    fn reserve(
        &self,
        job_template: &JobTemplate,
        runs: u32,
        job: JobId,
        slot_id: SlotId,
        manager: &FactoryManager,
        progress: &mut Progress,
    ) -> Result<(), PlanError> {
        let Some(resources) = &self.resources else {
            return Ok(());
        };
        let slot = manager.slot(slot_id)?;
        let bookings = job_template
            .inputs()
            .iter()
            .map(|item| (item, slot.input_location(), -1))
            .chain(
                job_template
                    .outputs()
                    .iter()
                    .map(|item| (item, slot.output_location(), 1)),
            );

        for (item, location, sign) in bookings {
            if item.resource_type.is_shareable() {
                continue;
            }
            let quantity = item.quantity.checked_mul(i64::from(runs)).ok_or_else(|| {
                PlanError::InvalidArgument(format!(
                    "{} x {runs} runs of {} overflows",
                    item.quantity, item.resource_type
                ))
            })?;
            if sign < 0 {
                resources.consume(&item.resource_type, location, quantity)?;
            } else {
                resources.produce(&item.resource_type, location, quantity)?;
            }
            debug!(%job, resource = %item.resource_type, %location, delta = sign * quantity, "reserved");
            progress.reservations.push(Reservation {
                job,
                resource_type: item.resource_type.clone(),
                location: location.clone(),
                delta: sign * quantity,
            });
        }
        Ok(())
    }

    /// Removes what a failed run placed. Rollback failures are logged; the
    /// original error is what the caller sees.
    fn roll_back(&self, manager: &mut FactoryManager, progress: &Progress) {
        if let Err(err) = manager.dispose(&progress.jobs) {
            error!(error = %err, "failed to remove jobs of an aborted scheduling run");
        }
        if let Some(resources) = &self.resources {
            if let Err(err) = plan::release(resources, &progress.reservations) {
                error!(error = %err, "failed to release reservations of an aborted scheduling run");
            }
        }
    }
}

/// Later of the plan's desired start and the end of every dependency job.
fn desired_start(
    plan_start: DateTime<Utc>,
    dependencies: &[JobId],
    manager: &FactoryManager,
) -> Result<DateTime<Utc>, PlanError> {
    let mut desired = plan_start;
    for id in dependencies {
        desired = desired.max(manager.job(*id)?.end_date(manager.jobs())?);
    }
    Ok(desired)
}
