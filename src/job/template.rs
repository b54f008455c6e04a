use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::JobMode;
use crate::error::PlanError;
use crate::resource::ResourceQuantity;
use crate::temporal::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TemplateId(pub u32);

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "template-{}", self.0)
    }
}

/// The kind of work a template performs; slot types accept a set of these.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Activity(String);

impl Activity {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Blueprint for the jobs the scheduler materializes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobTemplate {
    id: TemplateId,
    name: String,
    activity: Activity,
    duration_per_run: Duration,
    runs: u32,
    #[serde(default)]
    mode: JobMode,
    #[serde(default)]
    parallelizable: bool,
    #[serde(default)]
    dependencies: Vec<TemplateId>,
    #[serde(default)]
    inputs: Vec<ResourceQuantity>,
    #[serde(default)]
    outputs: Vec<ResourceQuantity>,
}

impl JobTemplate {
    pub fn new(
        id: TemplateId,
        name: impl Into<String>,
        activity: Activity,
        duration_per_run: Duration,
    ) -> Result<Self, PlanError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(PlanError::InvalidArgument(format!(
                "{id} requires a non-blank name"
            )));
        }
        Ok(Self {
            id,
            name,
            activity,
            duration_per_run,
            runs: 1,
            mode: JobMode::default(),
            parallelizable: false,
            dependencies: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        })
    }

    pub fn with_runs(mut self, runs: u32) -> Result<Self, PlanError> {
        if runs == 0 {
            return Err(PlanError::InvalidArgument(format!(
                "{} must run at least once",
                self.id
            )));
        }
        self.runs = runs;
        Ok(self)
    }

    pub fn with_mode(mut self, mode: JobMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn parallelizable(mut self, parallelizable: bool) -> Self {
        self.parallelizable = parallelizable;
        self
    }

    /// Adds a dependency; repeated ids are kept once.
    pub fn depends_on(mut self, dependency: TemplateId) -> Self {
        if !self.dependencies.contains(&dependency) {
            self.dependencies.push(dependency);
        }
        self
    }

    pub fn with_input(mut self, input: ResourceQuantity) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn with_output(mut self, output: ResourceQuantity) -> Self {
        self.outputs.push(output);
        self
    }

    pub fn id(&self) -> TemplateId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn activity(&self) -> &Activity {
        &self.activity
    }

    pub fn duration_per_run(&self) -> Duration {
        self.duration_per_run
    }

    pub fn runs(&self) -> u32 {
        self.runs
    }

    pub fn mode(&self) -> JobMode {
        self.mode
    }

    pub fn is_parallelizable(&self) -> bool {
        self.parallelizable
    }

    pub fn dependencies(&self) -> &[TemplateId] {
        &self.dependencies
    }

    pub fn inputs(&self) -> &[ResourceQuantity] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[ResourceQuantity] {
        &self.outputs
    }
}

/// Templates addressed by id. Dependency ids may point at templates that are
/// added later, so cycles are only detected at scheduling time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateCatalog {
    templates: BTreeMap<TemplateId, JobTemplate>,
}

impl TemplateCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, template: JobTemplate) -> Result<TemplateId, PlanError> {
        let id = template.id();
        if self.templates.contains_key(&id) {
            return Err(PlanError::InvalidArgument(format!(
                "{id} is already registered"
            )));
        }
        self.templates.insert(id, template);
        Ok(id)
    }

    pub fn get(&self, id: TemplateId) -> Result<&JobTemplate, PlanError> {
        self.templates.get(&id).ok_or(PlanError::UnknownTemplate(id))
    }

    pub fn contains(&self, id: TemplateId) -> bool {
        self.templates.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &JobTemplate> {
        self.templates.values()
    }
}
