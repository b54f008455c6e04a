use chrono::{TimeZone, Utc};
use production_planner::config::PlannerConfig;
use production_planner::factory::{FactoryManager, SlotType};
use production_planner::job::{Activity, JobStatus, JobTemplate, TemplateCatalog, TemplateId};
use production_planner::plan::ProductionPlanTemplate;
use production_planner::report::{
    TimelineRow, save_timeline_csv, timeline, timeline_to_json, write_timeline_csv,
};
use production_planner::resource::ProductionLocation;
use production_planner::scheduling::SchedulingStrategy;
use production_planner::temporal::Duration;

fn scheduled() -> Vec<TimelineRow> {
    let mut manager = FactoryManager::new();
    let factory = manager.add_factory("east").unwrap();
    manager
        .add_slot(
            factory,
            "oven",
            SlotType::new("oven", [Activity::new("baking")]),
            ProductionLocation::site("pantry"),
            ProductionLocation::site("shop"),
        )
        .unwrap();

    let mut catalog = TemplateCatalog::new();
    catalog
        .add(
            JobTemplate::new(TemplateId(1), "dough", Activity::new("baking"), Duration::hours(1))
                .unwrap(),
        )
        .unwrap();
    catalog
        .add(
            JobTemplate::new(TemplateId(2), "bread", Activity::new("baking"), Duration::hours(2))
                .unwrap()
                .depends_on(TemplateId(1)),
        )
        .unwrap();
    let start = Utc.with_ymd_and_hms(2025, 4, 1, 5, 0, 0).unwrap();
    let template =
        ProductionPlanTemplate::new("morning", start, catalog, vec![TemplateId(2)]).unwrap();

    let plan = SchedulingStrategy::new(PlannerConfig::default())
        .schedule(&template, &mut manager)
        .unwrap();
    timeline(&plan, &manager).unwrap()
}

#[test]
fn timeline_lists_jobs_in_start_order() {
    let rows = scheduled();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].name, "dough");
    assert_eq!(rows[1].name, "bread");
    assert_eq!(rows[0].factory, "east");
    assert_eq!(rows[0].slot, "oven");
    assert_eq!(rows[0].status, JobStatus::Prospective);
    assert!(rows[0].end <= rows[1].start);
}

#[test]
fn csv_has_header_and_one_line_per_job() {
    let rows = scheduled();
    let mut out = Vec::new();
    write_timeline_csv(&rows, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("job,name,template,factory,slot,status,start,end,runs"));
    assert!(lines[1].contains("dough"));
    assert!(lines[1].contains("prospective"));
}

#[test]
fn csv_can_be_saved_to_disk() {
    let rows = scheduled();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("timeline.csv");
    save_timeline_csv(&rows, &path).unwrap();

    let mut reader = csv::Reader::from_path(&path).unwrap();
    let loaded: Vec<TimelineRow> = reader.deserialize().map(Result::unwrap).collect();
    assert_eq!(loaded, rows);
}

#[test]
fn json_export_contains_every_row() {
    let rows = scheduled();
    let json = timeline_to_json(&rows).unwrap();
    let parsed: Vec<TimelineRow> = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, rows);
}
