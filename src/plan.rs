use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::info;

use crate::error::PlanError;
use crate::factory::FactoryManager;
use crate::job::{JobId, JobStatus, TemplateCatalog, TemplateId};
use crate::resource::{ProductionLocation, ResourceManager, ResourceType};

/// What to produce: root templates drawn from a catalog, and the earliest
/// date work may begin.
#[derive(Debug, Clone)]
pub struct ProductionPlanTemplate {
    name: String,
    desired_start: DateTime<Utc>,
    roots: Vec<TemplateId>,
    catalog: TemplateCatalog,
}

impl ProductionPlanTemplate {
    pub fn new(
        name: impl Into<String>,
        desired_start: DateTime<Utc>,
        catalog: TemplateCatalog,
        roots: Vec<TemplateId>,
    ) -> Result<Self, PlanError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(PlanError::InvalidArgument(
                "plan template name must not be blank".to_string(),
            ));
        }
        if roots.is_empty() {
            return Err(PlanError::InvalidArgument(format!(
                "plan template '{name}' needs at least one root template"
            )));
        }
        for root in &roots {
            catalog.get(*root)?;
        }
        Ok(Self {
            name,
            desired_start,
            roots,
            catalog,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn desired_start(&self) -> DateTime<Utc> {
        self.desired_start
    }

    pub fn roots(&self) -> &[TemplateId] {
        &self.roots
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Prospective,
    NotStarted,
    Pending,
    Finished,
    Disposed,
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PlanStatus::Prospective => "prospective",
            PlanStatus::NotStarted => "not_started",
            PlanStatus::Pending => "pending",
            PlanStatus::Finished => "finished",
            PlanStatus::Disposed => "disposed",
        };
        f.write_str(label)
    }
}

/// A resource change made on behalf of a plan. Negative deltas were consumed,
/// positive ones produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub job: JobId,
    pub resource_type: ResourceType,
    pub location: ProductionLocation,
    pub delta: i64,
}

/// Jobs placed by a scheduling run.
///
/// A new plan is `PROSPECTIVE`: its jobs occupy slots and its reservations
/// are booked. It must be either submitted or disposed; dropping it leaves
/// both in place.
#[derive(Debug)]
pub struct ProductionPlan {
    name: String,
    roots: Vec<TemplateId>,
    jobs: Vec<JobId>,
    status: PlanStatus,
    reservations: Vec<Reservation>,
    resources: Option<Arc<ResourceManager>>,
}

impl ProductionPlan {
    pub(crate) fn new(
        name: String,
        roots: Vec<TemplateId>,
        jobs: Vec<JobId>,
        reservations: Vec<Reservation>,
        resources: Option<Arc<ResourceManager>>,
    ) -> Self {
        Self {
            name,
            roots,
            jobs,
            status: PlanStatus::Prospective,
            reservations,
            resources,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn roots(&self) -> &[TemplateId] {
        &self.roots
    }

    /// Jobs in the order they were scheduled.
    pub fn jobs(&self) -> &[JobId] {
        &self.jobs
    }

    pub fn status(&self) -> PlanStatus {
        self.status
    }

    pub fn reservations(&self) -> &[Reservation] {
        &self.reservations
    }

    /// Commits the plan: every job becomes `NOT_STARTED`.
    pub fn submit(&mut self, manager: &mut FactoryManager) -> Result<(), PlanError> {
        self.require_prospective("submit")?;
        manager.submit(&self.jobs)?;
        self.status = PlanStatus::NotStarted;
        info!(plan = %self.name, jobs = self.jobs.len(), "plan submitted");
        Ok(())
    }

    /// Abandons the plan: jobs are cancelled and leave their slots, and every
    /// reservation is returned to the pool.
    pub fn dispose(&mut self, manager: &mut FactoryManager) -> Result<(), PlanError> {
        self.require_prospective("dispose")?;
        manager.dispose(&self.jobs)?;
        if let Some(resources) = &self.resources {
            release(resources, &self.reservations)?;
        }
        info!(plan = %self.name, jobs = self.jobs.len(), "plan disposed");
        self.jobs.clear();
        self.reservations.clear();
        self.status = PlanStatus::Disposed;
        Ok(())
    }

    /// Re-derives the status of a submitted plan from its jobs.
    pub fn refresh_status(&mut self, manager: &FactoryManager) -> Result<PlanStatus, PlanError> {
        if matches!(self.status, PlanStatus::Prospective | PlanStatus::Disposed) {
            return Ok(self.status);
        }
        let mut statuses = Vec::with_capacity(self.jobs.len());
        for id in &self.jobs {
            statuses.push(manager.job(*id)?.status());
        }
        let all_finished = statuses
            .iter()
            .all(|status| matches!(status, JobStatus::Finished | JobStatus::Cancelled))
            && statuses.contains(&JobStatus::Finished);
        self.status = if all_finished {
            PlanStatus::Finished
        } else if statuses
            .iter()
            .any(|status| matches!(status, JobStatus::Pending | JobStatus::Finished))
        {
            PlanStatus::Pending
        } else {
            PlanStatus::NotStarted
        };
        Ok(self.status)
    }

    fn require_prospective(&self, operation: &str) -> Result<(), PlanError> {
        if self.status != PlanStatus::Prospective {
            return Err(PlanError::InvalidState(format!(
                "cannot {operation} plan '{}' in status {}",
                self.name, self.status
            )));
        }
        Ok(())
    }
}

/// Undoes `reservations`, newest first.
pub(crate) fn release(
    resources: &ResourceManager,
    reservations: &[Reservation],
) -> Result<(), PlanError> {
    for reservation in reservations.iter().rev() {
        if reservation.delta < 0 {
            resources.produce(
                &reservation.resource_type,
                &reservation.location,
                reservation.delta.saturating_neg(),
            )?;
        } else {
            resources.consume(
                &reservation.resource_type,
                &reservation.location,
                reservation.delta,
            )?;
        }
    }
    Ok(())
}
