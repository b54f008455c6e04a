//! Flat timeline of a plan's jobs for renderers and spreadsheets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::PlanError;
use crate::factory::FactoryManager;
use crate::job::JobStatus;
use crate::plan::ProductionPlan;

/// One job of a plan as a renderer sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineRow {
    pub job: u64,
    pub name: String,
    pub template: u32,
    pub factory: String,
    pub slot: String,
    pub status: JobStatus,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub runs: u32,
}

/// Rows for every job of `plan`, earliest start first.
pub fn timeline(
    plan: &ProductionPlan,
    manager: &FactoryManager,
) -> Result<Vec<TimelineRow>, PlanError> {
    let book = manager.jobs();
    let mut rows = Vec::with_capacity(plan.jobs().len());
    for id in plan.jobs() {
        let job = manager.job(*id)?;
        let slot_id = manager.find_slot(*id)?.ok_or_else(|| {
            PlanError::Internal(format!("{id} belongs to plan '{}' but to no slot", plan.name()))
        })?;
        let slot = manager.slot(slot_id)?;
        let factory = manager.factory(slot.factory())?;
        let range = job.date_range(book)?;
        rows.push(TimelineRow {
            job: id.0,
            name: job.name().to_string(),
            template: job.template().0,
            factory: factory.name().to_string(),
            slot: slot.name().to_string(),
            status: job.status(),
            start: range.start(),
            end: range.end(),
            runs: job.runs(),
        });
    }
    rows.sort_by_key(|row| (row.start, row.job));
    Ok(rows)
}

pub fn write_timeline_csv<W: Write>(rows: &[TimelineRow], out: W) -> Result<(), PlanError> {
    let mut writer = csv::Writer::from_writer(out);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn save_timeline_csv<P: AsRef<Path>>(rows: &[TimelineRow], path: P) -> Result<(), PlanError> {
    let file = File::create(path)?;
    write_timeline_csv(rows, file)
}

pub fn timeline_to_json(rows: &[TimelineRow]) -> Result<String, PlanError> {
    Ok(serde_json::to_string_pretty(rows)?)
}
