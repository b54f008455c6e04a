use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use production_planner::error::{ErrorKind, PlanError};
use production_planner::factory::{FactoryManager, SlotId, SlotType};
use production_planner::job::{Activity, Job, JobTemplate, TemplateId};
use production_planner::resource::ProductionLocation;
use production_planner::temporal::{DateRange, Duration};

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, day, hour, 0, 0).unwrap()
}

fn template(hours: u64) -> JobTemplate {
    JobTemplate::new(TemplateId(1), "cut", Activity::new("cutting"), Duration::hours(hours)).unwrap()
}

fn setup(slots: usize) -> (FactoryManager, Vec<SlotId>) {
    let mut manager = FactoryManager::new();
    let factory = manager.add_factory("north").unwrap();
    let ids = (0..slots)
        .map(|idx| {
            manager
                .add_slot(
                    factory,
                    format!("saw {idx}"),
                    SlotType::new("saw", [Activity::new("cutting")]),
                    ProductionLocation::site("yard"),
                    ProductionLocation::site("store"),
                )
                .unwrap()
        })
        .collect();
    (manager, ids)
}

fn place(manager: &mut FactoryManager, slot: SlotId, start: DateTime<Utc>, hours: u64) {
    manager
        .add_job(slot, Job::simple("job", &template(hours), 1, start).unwrap())
        .unwrap();
}

#[test]
fn adjacent_jobs_are_accepted() {
    let (mut manager, slots) = setup(1);
    place(&mut manager, slots[0], at(1, 0), 10);
    place(&mut manager, slots[0], at(1, 10), 10);
    assert_eq!(manager.slot(slots[0]).unwrap().len(), 2);
}

#[test]
fn overlapping_job_is_rejected_and_slot_unchanged() {
    let (mut manager, slots) = setup(1);
    place(&mut manager, slots[0], at(1, 0), 10);
    let err = manager
        .add_job(slots[0], Job::simple("late", &template(3), 1, at(1, 9)).unwrap())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(manager.slot(slots[0]).unwrap().len(), 1);
    assert_eq!(manager.jobs().len(), 1);
}

#[test]
fn simple_job_start_moves_past_late_dependency() {
    let (mut manager, slots) = setup(2);
    let first = template(4);
    let second = JobTemplate::new(TemplateId(2), "sand", Activity::new("cutting"), Duration::hours(1))
        .unwrap()
        .depends_on(TemplateId(1));
    manager
        .add_job(slots[0], Job::simple("cut", &first, 1, at(1, 0)).unwrap())
        .unwrap();
    let sand = manager
        .add_job(slots[1], Job::simple("sand", &second, 1, at(1, 3)).unwrap())
        .unwrap();
    let book = manager.jobs();
    let job = manager.job(sand).unwrap();
    assert_eq!(job.start_date(book).unwrap(), at(1, 4));
    assert_eq!(job.end_date(book).unwrap(), at(1, 5));
}

#[test]
fn earliest_start_on_empty_slot_is_desired_date() {
    let (manager, slots) = setup(1);
    let slot = manager.slot(slots[0]).unwrap();
    let start = slot
        .earliest_start(at(2, 5), Duration::hours(3), Duration::seconds(1), manager.jobs())
        .unwrap();
    assert_eq!(start, at(2, 5));
}

#[test]
fn single_covering_job_pushes_start_past_its_end() {
    let (mut manager, slots) = setup(1);
    place(&mut manager, slots[0], at(1, 0), 10);
    let slot = manager.slot(slots[0]).unwrap();
    let start = slot
        .earliest_start(at(1, 5), Duration::hours(2), Duration::seconds(1), manager.jobs())
        .unwrap();
    assert_eq!(start, at(1, 10) + chrono::TimeDelta::seconds(1));
}

#[test]
fn earliest_start_uses_fitting_gap_between_jobs() {
    let (mut manager, slots) = setup(1);
    place(&mut manager, slots[0], at(1, 0), 2);
    place(&mut manager, slots[0], at(1, 4), 2);
    place(&mut manager, slots[0], at(1, 12), 2);
    let slot = manager.slot(slots[0]).unwrap();
    let book = manager.jobs();

    let short = slot
        .earliest_start(at(1, 1), Duration::hours(2), Duration::seconds(1), book)
        .unwrap();
    assert_eq!(short, at(1, 2));

    let long = slot
        .earliest_start(at(1, 1), Duration::hours(5), Duration::seconds(1), book)
        .unwrap();
    assert_eq!(long, at(1, 6));

    let huge = slot
        .earliest_start(at(1, 1), Duration::hours(7), Duration::seconds(1), book)
        .unwrap();
    assert_eq!(huge, at(1, 14));
}

#[test]
fn earliest_start_uses_leading_gap() {
    let (mut manager, slots) = setup(1);
    place(&mut manager, slots[0], at(1, 10), 2);
    let slot = manager.slot(slots[0]).unwrap();
    let start = slot
        .earliest_start(at(1, 0), Duration::hours(3), Duration::seconds(1), manager.jobs())
        .unwrap();
    assert_eq!(start, at(1, 0));
}

#[test]
fn utilization_is_longest_job_share_of_range() {
    let (mut manager, slots) = setup(1);
    place(&mut manager, slots[0], at(1, 0), 6);
    place(&mut manager, slots[0], at(1, 12), 3);
    let slot = manager.slot(slots[0]).unwrap();
    let day = DateRange::new(at(1, 0), at(2, 0)).unwrap();
    let utilization = slot.utilization(&day, manager.jobs()).unwrap();
    assert!((utilization - 0.25).abs() < 1e-9);

    let empty = DateRange::new(at(1, 0), at(1, 0)).unwrap();
    assert!(slot.utilization(&empty, manager.jobs()).is_err());
}

#[test]
fn factory_utilization_averages_slots() {
    let (mut manager, slots) = setup(2);
    place(&mut manager, slots[0], at(1, 0), 12);
    let factory = &manager.factories()[0];
    let utilization = factory
        .utilization(at(1, 0), at(2, 0), manager.jobs())
        .unwrap();
    assert!((utilization - 0.25).abs() < 1e-9);
}

#[test]
fn day_and_instant_queries() {
    let (mut manager, slots) = setup(1);
    place(&mut manager, slots[0], at(1, 20), 6);
    let slot = manager.slot(slots[0]).unwrap();
    let book = manager.jobs();

    let second_day = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
    assert_eq!(slot.jobs_on_day(second_day, book).unwrap().len(), 1);
    let third_day = NaiveDate::from_ymd_opt(2025, 6, 3).unwrap();
    assert!(slot.jobs_on_day(third_day, book).unwrap().is_empty());

    assert!(slot.job_on(at(1, 22), book).unwrap().is_some());
    assert!(slot.job_on(at(2, 2), book).unwrap().is_none());
}

#[test]
fn slots_group_by_type() {
    let (mut manager, slots) = setup(2);
    let factory = manager.factories()[0].id();
    let press = manager
        .add_slot(
            factory,
            "press",
            SlotType::new("press", [Activity::new("pressing")]),
            ProductionLocation::site("yard"),
            ProductionLocation::site("yard"),
        )
        .unwrap();
    let groups = manager.slots_by_type();
    assert_eq!(groups.len(), 2);
    let saw = SlotType::new("saw", [Activity::new("cutting")]);
    assert_eq!(groups[&saw], slots);
    assert!(groups.values().any(|ids| ids == &vec![press]));
}

#[test]
fn wildcard_slot_locations_are_rejected() {
    let mut manager = FactoryManager::new();
    let factory = manager.add_factory("south").unwrap();
    let err = manager
        .add_slot(
            factory,
            "anywhere",
            SlotType::new("saw", [Activity::new("cutting")]),
            ProductionLocation::Anywhere,
            ProductionLocation::site("yard"),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}
