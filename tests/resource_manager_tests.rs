use chrono::{TimeZone, Utc};
use production_planner::resource::{
    ProductionLocation, Resource, ResourceError, ResourceManager, ResourceQuantity, ResourceType,
    ZeroResourceFactory,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

fn ore() -> ResourceType {
    ResourceType::new(1, "ore")
}

fn mine() -> ProductionLocation {
    ProductionLocation::site("mine")
}

#[test]
fn missing_resource_is_created_at_zero() {
    let manager = ResourceManager::default();
    let resource = manager.resource(&ore(), &mine());
    assert_eq!(resource.amount(), 0);
    assert_eq!(resource.location(), &mine());
}

#[test]
fn consuming_past_zero_goes_negative() {
    let manager = ResourceManager::default();
    manager.consume(&ore(), &mine(), 5).unwrap();
    let remaining = manager.consume(&ore(), &mine(), 5).unwrap();
    assert_eq!(remaining, -10);
    assert_eq!(manager.amount(&ore(), &mine()), -10);
}

#[test]
fn produce_adds_to_amount() {
    let manager = ResourceManager::default();
    manager.produce(&ore(), &mine(), 7).unwrap();
    manager.consume(&ore(), &mine(), 2).unwrap();
    assert_eq!(manager.amount(&ore(), &mine()), 5);
}

#[test]
fn invalid_mutations_are_rejected() {
    let manager = ResourceManager::default();
    assert!(matches!(
        manager.consume(&ore(), &mine(), -1),
        Err(ResourceError::InvalidArgument(_))
    ));
    let tool = ResourceType::shareable(2, "drill");
    assert!(matches!(
        manager.consume(&tool, &mine(), 1),
        Err(ResourceError::Unsupported(_))
    ));
    assert!(matches!(
        manager.produce(&ore(), &ProductionLocation::Anywhere, 1),
        Err(ResourceError::InvalidArgument(_))
    ));
    assert!(ResourceQuantity::new(ore(), -3).is_err());
}

#[test]
fn wildcard_lookup_sums_every_location() {
    let manager = ResourceManager::default();
    manager.produce(&ore(), &mine(), 4).unwrap();
    manager.produce(&ore(), &ProductionLocation::site("port"), 6).unwrap();
    let total = manager.resource(&ore(), &ProductionLocation::Anywhere);
    assert_eq!(total.amount(), 10);

    total.set_amount(0);
    assert_eq!(manager.amount(&ore(), &mine()), 4);
}

#[test]
fn snapshot_is_independent_of_original() {
    let manager = ResourceManager::default();
    manager.produce(&ore(), &mine(), 10).unwrap();
    let snapshot = manager.snapshot();

    manager.consume(&ore(), &mine(), 3).unwrap();
    snapshot.produce(&ore(), &mine(), 5).unwrap();

    assert_eq!(manager.amount(&ore(), &mine()), 7);
    assert_eq!(snapshot.amount(&ore(), &mine()), 15);
}

#[test]
fn projection_leaves_pool_untouched() {
    let manager = ResourceManager::default();
    manager.produce(&ore(), &mine(), 10).unwrap();
    let items = vec![
        ResourceQuantity::new(ore(), 4).unwrap(),
        ResourceQuantity::new(ore(), 8).unwrap(),
        ResourceQuantity::new(ResourceType::new(3, "coal"), 1).unwrap(),
    ];
    let projected = manager
        .calculate_projected_resource_status(&items, &mine())
        .unwrap();

    assert_eq!(projected.len(), 2);
    let ore_left = projected
        .iter()
        .find(|r| r.resource_type() == &ore())
        .unwrap();
    assert_eq!(ore_left.amount(), -2);
    assert_eq!(manager.amount(&ore(), &mine()), 10);

    let shortages = manager.shortages(&items, &mine()).unwrap();
    assert_eq!(shortages.len(), 2);
}

#[test]
fn loader_runs_once_on_first_access() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let manager = ResourceManager::with_loader(Arc::new(ZeroResourceFactory::new()), move || {
        counter.fetch_add(1, Ordering::SeqCst);
        vec![Resource::new(ore(), mine(), 12)]
    });

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(manager.amount(&ore(), &mine()), 12);
    assert_eq!(manager.amount(&ore(), &mine()), 12);
    assert_eq!(manager.resources_at(&mine()).len(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn last_updated_comes_from_factory() {
    let stamp = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let manager = ResourceManager::new(Arc::new(ZeroResourceFactory::as_of(stamp)));
    assert_eq!(manager.last_updated(), Some(stamp));
    assert_eq!(ResourceManager::default().last_updated(), None);
}

#[test]
fn insert_and_remove() {
    let manager = ResourceManager::default();
    manager.insert(Resource::new(ore(), mine(), 3)).unwrap();
    assert_eq!(manager.amount(&ore(), &mine()), 3);
    assert!(
        manager
            .insert(Resource::new(ore(), ProductionLocation::Anywhere, 1))
            .is_err()
    );
    let removed = manager.remove(&ore(), &mine()).unwrap();
    assert_eq!(removed.amount(), 3);
    assert!(manager.resources_at(&mine()).is_empty());
}

#[test]
fn concurrent_consumers_do_not_lose_updates() {
    let manager = Arc::new(ResourceManager::default());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let manager = Arc::clone(&manager);
            thread::spawn(move || {
                for _ in 0..100 {
                    manager.consume(&ore(), &mine(), 1).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(manager.amount(&ore(), &mine()), -800);
}
