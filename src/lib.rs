pub mod config;
pub mod error;
pub mod factory;
pub mod graph;
pub mod job;
pub mod plan;
pub mod report;
pub mod resource;
pub mod scheduling;
pub mod temporal;

pub use config::{ConfigError, PlannerConfig};
pub use error::{ErrorKind, PlanError};
pub use factory::{Factory, FactoryId, FactoryManager, FactorySlot, SlotId, SlotType};
pub use graph::TemplateGraph;
pub use job::{
    Activity, Job, JobBook, JobId, JobKind, JobMode, JobStatus, JobTemplate, TemplateCatalog,
    TemplateId,
};
pub use plan::{PlanStatus, ProductionPlan, ProductionPlanTemplate, Reservation};
pub use resource::{
    ProductionLocation, Resource, ResourceError, ResourceFactory, ResourceLoader,
    ResourceManager, ResourceQuantity, ResourceType, ZeroResourceFactory,
};
pub use scheduling::{EarliestStart, LowestUtilization, SchedulingStrategy, SlotSelector};
pub use temporal::{DateRange, Duration, TemporalError, TimeUnit};
