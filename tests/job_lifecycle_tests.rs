use chrono::{DateTime, TimeZone, Utc};
use production_planner::error::{ErrorKind, PlanError};
use production_planner::factory::{FactoryManager, SlotId, SlotType};
use production_planner::job::{
    Activity, Job, JobMode, JobStatus, JobTemplate, TemplateCatalog, TemplateId,
};
use production_planner::resource::ProductionLocation;
use production_planner::temporal::Duration;

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, hour, 0, 0).unwrap()
}

fn template(id: u32, hours: u64) -> JobTemplate {
    JobTemplate::new(
        TemplateId(id),
        format!("step {id}"),
        Activity::new("assembly"),
        Duration::hours(hours),
    )
    .unwrap()
}

fn manager_with_slot() -> (FactoryManager, SlotId) {
    let mut manager = FactoryManager::new();
    let factory = manager.add_factory("plant").unwrap();
    let slot = manager
        .add_slot(
            factory,
            "line 1",
            SlotType::new("line", [Activity::new("assembly")]),
            ProductionLocation::site("dock"),
            ProductionLocation::site("dock"),
        )
        .unwrap();
    (manager, slot)
}

#[test]
fn status_machine_allows_only_listed_transitions() {
    use JobStatus::*;
    assert!(Prospective.can_transition_to(NotStarted));
    assert!(Prospective.can_transition_to(Cancelled));
    assert!(!Prospective.can_transition_to(Pending));
    assert!(NotStarted.can_transition_to(Pending));
    assert!(Pending.can_transition_to(Finished));
    assert!(!NotStarted.can_transition_to(Finished));
    assert!(Cancelled.is_terminal());
    assert!(Finished.is_terminal());
    assert!(!Pending.is_terminal());
}

#[test]
fn illegal_transition_is_reported() {
    let mut job = Job::simple("paint", &template(1, 2), 1, at(8)).unwrap();
    let err = job.set_status(JobStatus::Finished).unwrap_err();
    assert!(matches!(
        err,
        PlanError::InvalidTransition {
            from: JobStatus::Prospective,
            to: JobStatus::Finished
        }
    ));
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(job.status(), JobStatus::Prospective);
}

#[test]
fn job_duration_scales_with_runs() {
    let job = Job::simple("weld", &template(1, 3), 4, at(0)).unwrap();
    assert_eq!(job.duration(), Duration::hours(12));
    assert!(Job::simple("weld", &template(1, 3), 0, at(0)).is_err());
    assert!(Job::simple("  ", &template(1, 3), 1, at(0)).is_err());
}

#[test]
fn template_validation() {
    assert!(
        JobTemplate::new(TemplateId(1), "", Activity::new("x"), Duration::hours(1)).is_err()
    );
    assert!(template(1, 1).with_runs(0).is_err());
    let deduped = template(2, 1).depends_on(TemplateId(1)).depends_on(TemplateId(1));
    assert_eq!(deduped.dependencies(), &[TemplateId(1)]);

    let mut catalog = TemplateCatalog::new();
    catalog.add(template(1, 1)).unwrap();
    assert!(catalog.add(template(1, 2)).is_err());
    assert!(matches!(
        catalog.get(TemplateId(9)),
        Err(PlanError::UnknownTemplate(TemplateId(9)))
    ));
}

#[test]
fn dependency_driven_job_starts_when_dependencies_end() {
    let (mut manager, slot) = manager_with_slot();
    let first = template(1, 2);
    let second = template(2, 3).depends_on(TemplateId(1));

    let a = manager.add_job(slot, Job::simple("a", &first, 1, at(6)).unwrap()).unwrap();
    let b = manager
        .add_job(slot, Job::dependency_driven("b", &second, 1).unwrap())
        .unwrap();

    let book = manager.jobs();
    let job_b = manager.job(b).unwrap();
    assert_eq!(job_b.dependencies(), &[a]);
    assert_eq!(job_b.start_date(book).unwrap(), at(8));
    assert_eq!(job_b.end_date(book).unwrap(), at(11));
    assert_eq!(job_b.total_duration(book).unwrap(), Duration::hours(5));
}

#[test]
fn dependency_driven_job_without_dependencies_is_rejected() {
    let (mut manager, slot) = manager_with_slot();
    let err = manager
        .add_job(slot, Job::dependency_driven("lonely", &template(1, 1), 1).unwrap())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert!(manager.jobs().is_empty());
}

#[test]
fn missing_dependency_jobs_are_unresolved() {
    let (mut manager, slot) = manager_with_slot();
    let dependent = template(2, 1).depends_on(TemplateId(1));
    let err = manager
        .add_job(slot, Job::simple("b", &dependent, 1, at(9)).unwrap())
        .unwrap_err();
    assert!(matches!(err, PlanError::UnresolvedDependency { .. }));
}

#[test]
fn set_start_date_only_applies_to_simple_jobs() {
    let mut simple = Job::simple("a", &template(1, 1), 1, at(1)).unwrap();
    simple.set_start_date(at(5)).unwrap();
    assert!(matches!(
        simple.kind(),
        production_planner::job::JobKind::Simple { start } if start == at(5)
    ));

    let dependent = template(2, 1).depends_on(TemplateId(1));
    let mut driven = Job::dependency_driven("b", &dependent, 1).unwrap();
    assert!(driven.set_start_date(at(5)).is_err());
}

#[test]
fn execution_lifecycle_follows_dependencies() {
    let (mut manager, slot) = manager_with_slot();
    let first = template(1, 2);
    let second = template(2, 1).depends_on(TemplateId(1));
    let a = manager.add_job(slot, Job::simple("a", &first, 1, at(6)).unwrap()).unwrap();
    let b = manager.add_job(slot, Job::simple("b", &second, 1, at(8)).unwrap()).unwrap();
    manager.submit(&[a, b]).unwrap();

    assert!(manager.start_due_jobs(at(5)).unwrap().is_empty());
    assert_eq!(manager.start_due_jobs(at(9)).unwrap(), vec![a]);
    assert_eq!(manager.job(b).unwrap().status(), JobStatus::NotStarted);

    manager.finish_job(a).unwrap();
    assert_eq!(manager.start_due_jobs(at(9)).unwrap(), vec![b]);
    manager.finish_job(b).unwrap();
    assert_eq!(manager.job(b).unwrap().status(), JobStatus::Finished);
}

#[test]
fn manual_jobs_wait_for_confirmation() {
    let (mut manager, slot) = manager_with_slot();
    let manual = template(1, 1).with_mode(JobMode::Manual);
    let id = manager.add_job(slot, Job::simple("m", &manual, 1, at(1)).unwrap()).unwrap();
    manager.submit(&[id]).unwrap();

    assert!(manager.start_due_jobs(at(3)).unwrap().is_empty());
    manager.confirm_start(id).unwrap();
    assert_eq!(manager.job(id).unwrap().status(), JobStatus::Pending);
}

#[test]
fn confirm_start_requires_finished_dependencies() {
    let (mut manager, slot) = manager_with_slot();
    let first = template(1, 1);
    let second = template(2, 1).depends_on(TemplateId(1)).with_mode(JobMode::Manual);
    let a = manager.add_job(slot, Job::simple("a", &first, 1, at(1)).unwrap()).unwrap();
    let b = manager.add_job(slot, Job::simple("b", &second, 1, at(2)).unwrap()).unwrap();
    manager.submit(&[a, b]).unwrap();

    let err = manager.confirm_start(b).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[test]
fn removing_a_required_job_fails() {
    let (mut manager, slot) = manager_with_slot();
    let first = template(1, 1);
    let second = template(2, 1).depends_on(TemplateId(1));
    let a = manager.add_job(slot, Job::simple("a", &first, 1, at(1)).unwrap()).unwrap();
    let b = manager.add_job(slot, Job::simple("b", &second, 1, at(2)).unwrap()).unwrap();

    assert!(manager.remove_job(a).is_err());
    manager.remove_job(b).unwrap();
    manager.remove_job(a).unwrap();
    assert!(manager.slot(slot).unwrap().is_empty());
    assert!(manager.find_slot(a).unwrap().is_none());
}

#[test]
fn full_status_chain_and_terminal_lock() {
    let mut job = Job::simple("paint", &template(1, 2), 1, at(8)).unwrap();
    job.set_status(JobStatus::NotStarted).unwrap();
    job.set_status(JobStatus::Pending).unwrap();
    job.set_status(JobStatus::Finished).unwrap();
    for next in [
        JobStatus::Prospective,
        JobStatus::NotStarted,
        JobStatus::Pending,
        JobStatus::Cancelled,
    ] {
        assert!(job.set_status(next).is_err());
    }
    assert_eq!(job.status(), JobStatus::Finished);
}

#[test]
fn simple_job_never_starts_before_its_dependencies_end() {
    let (mut manager, slot) = manager_with_slot();
    let a = manager
        .add_job(slot, Job::simple("a", &template(1, 5), 1, at(0)).unwrap())
        .unwrap();
    let dependent = template(2, 1).depends_on(TemplateId(1));
    let book = manager.jobs();

    let early = Job::simple("b", &dependent, 1, at(1)).unwrap().with_dependencies(vec![a]);
    assert_eq!(early.start_date(book).unwrap(), at(5));
    assert_eq!(early.end_date(book).unwrap(), at(6));

    let late = Job::simple("c", &dependent, 1, at(7)).unwrap().with_dependencies(vec![a]);
    assert_eq!(late.start_date(book).unwrap(), at(7));
}

#[test]
fn finished_jobs_are_not_resolved_as_dependencies() {
    let (mut manager, slot) = manager_with_slot();
    let first = template(1, 1);
    let dependent = template(2, 1).depends_on(TemplateId(1));
    let old = manager.add_job(slot, Job::simple("a", &first, 1, at(0)).unwrap()).unwrap();
    manager.submit(&[old]).unwrap();
    assert_eq!(manager.start_due_jobs(at(0)).unwrap(), vec![old]);
    manager.finish_job(old).unwrap();

    let err = manager
        .add_job(slot, Job::simple("b", &dependent, 1, at(4)).unwrap())
        .unwrap_err();
    assert!(matches!(
        err,
        PlanError::UnresolvedDependency {
            template: TemplateId(2),
            dependency: TemplateId(1)
        }
    ));

    let fresh = manager.add_job(slot, Job::simple("a", &first, 1, at(2)).unwrap()).unwrap();
    let b = manager
        .add_job(slot, Job::simple("b", &dependent, 1, at(4)).unwrap())
        .unwrap();
    assert_eq!(manager.job(b).unwrap().dependencies(), &[fresh]);
}
