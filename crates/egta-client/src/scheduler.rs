use reqwest::Method;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use crate::assignment::{symgrps_to_assignment, SymmetryGroup};
use crate::client::{EgtaClient, Route};
use crate::error::{EgtaError, Result};
use crate::game::Game;
use crate::models::{Configuration, ProfileStructure, SchedulerInfo, SchedulerRequirements};
use crate::profile::Profile;

/// Parameters of a new generic scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerParams {
    pub name: String,
    pub active: bool,
    /// Memory in MB each simulation needs.
    pub process_memory: u64,
    /// Players per profile.
    pub size: u32,
    /// Seconds needed for a single observation.
    pub time_per_observation: u64,
    pub observations_per_simulation: u64,
    pub nodes: u32,
    /// Overrides on top of the simulator's default configuration.
    pub configuration: Configuration,
}

impl SchedulerParams {
    pub fn new(name: impl Into<String>, size: u32) -> Self {
        Self {
            name: name.into(),
            active: false,
            process_memory: 0,
            size,
            time_per_observation: 0,
            observations_per_simulation: 1,
            nodes: 1,
            configuration: Configuration::new(),
        }
    }
}

/// Scheduler fields to change; unset fields are left alone. The service does
/// not allow changing the configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchedulerUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_memory: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_per_observation: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observations_per_simulation: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_observation_requirement: Option<u64>,
}

impl SchedulerUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A profile named by id, by assignment string, or by symmetry groups.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileRef {
    Id(u64),
    Assignment(String),
    Groups(Vec<SymmetryGroup>),
}

impl From<u64> for ProfileRef {
    fn from(id: u64) -> Self {
        ProfileRef::Id(id)
    }
}

impl From<&str> for ProfileRef {
    fn from(assignment: &str) -> Self {
        ProfileRef::Assignment(assignment.to_string())
    }
}

impl From<String> for ProfileRef {
    fn from(assignment: String) -> Self {
        ProfileRef::Assignment(assignment)
    }
}

impl From<Vec<SymmetryGroup>> for ProfileRef {
    fn from(groups: Vec<SymmetryGroup>) -> Self {
        ProfileRef::Groups(groups)
    }
}

/// Handle on a remote generic scheduler.
#[derive(Debug, Clone)]
pub struct Scheduler {
    client: EgtaClient,
    id: u64,
}

impl Scheduler {
    pub(crate) fn new(client: EgtaClient, id: u64) -> Self {
        Self { client, id }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn get_info(&self) -> Result<SchedulerInfo> {
        self.client.fetch(
            Method::GET,
            Route::Api,
            &format!("schedulers/{}.json", self.id),
            json!({}),
        )
    }

    pub fn get_requirements(&self) -> Result<SchedulerRequirements> {
        let mut reqs: SchedulerRequirements = self.client.fetch(
            Method::GET,
            Route::Api,
            &format!("schedulers/{}.json", self.id),
            json!({ "granularity": "with_requirements" }),
        )?;
        let collection = format!("{}s", snake_case(&reqs.kind));
        reqs.url = self.client.resource_url(&collection, reqs.id)?;
        Ok(reqs)
    }

    pub fn update(&self, update: &SchedulerUpdate) -> Result<()> {
        if update.is_empty() {
            return Err(EgtaError::Validation(format!(
                "no fields to update on scheduler {}",
                self.id
            )));
        }
        self.client.call(
            Method::PUT,
            Route::Api,
            &format!("generic_schedulers/{}.json", self.id),
            json!({ "scheduler": update }),
        )
    }

    pub fn activate(&self) -> Result<()> {
        self.set_active(true)
    }

    pub fn deactivate(&self) -> Result<()> {
        self.set_active(false)
    }

    fn set_active(&self, active: bool) -> Result<()> {
        self.update(&SchedulerUpdate {
            active: Some(active),
            ..SchedulerUpdate::default()
        })
    }

    pub fn add_role(&self, role: &str, count: u32) -> Result<()> {
        self.post("add_role", json!({ "role": role, "count": count }))
            .map(|_| ())
    }

    pub fn remove_role(&self, role: &str) -> Result<()> {
        self.post("remove_role", json!({ "role": role })).map(|_| ())
    }

    /// Requests `count` observations of the profile. An existing requirement
    /// for the same profile keeps its count.
    pub fn add_profile(&self, assignment: &str, count: u64) -> Result<Profile> {
        let body = self.post(
            "add_profile",
            json!({ "assignment": assignment, "count": count }),
        )?;
        let profile: ProfileStructure = serde_json::from_str(&body)?;
        Ok(self.client.get_profile(profile.id))
    }

    pub fn add_profile_groups(&self, groups: &[SymmetryGroup], count: u64) -> Result<Profile> {
        self.add_profile(&symgrps_to_assignment(groups)?, count)
    }

    /// Sets the requested count of a profile, adding it if needed.
    pub fn update_profile(&self, profile: impl Into<ProfileRef>, count: u64) -> Result<Profile> {
        let (profile_id, assignment) = match profile.into() {
            ProfileRef::Id(id) => {
                let structure = self.client.get_profile(id).get_structure()?;
                (id, structure.assignment)
            }
            ProfileRef::Assignment(assignment) => {
                (self.add_profile(&assignment, 0)?.id(), assignment)
            }
            ProfileRef::Groups(groups) => {
                let assignment = symgrps_to_assignment(&groups)?;
                (self.add_profile(&assignment, 0)?.id(), assignment)
            }
        };
        self.remove_profile(profile_id)?;
        self.add_profile(&assignment, count)
    }

    pub fn remove_profile(&self, profile_id: u64) -> Result<()> {
        self.post("remove_profile", json!({ "profile_id": profile_id }))
            .map(|_| ())
    }

    pub fn remove_all_profiles(&self) -> Result<()> {
        for requirement in self.get_requirements()?.scheduling_requirements {
            self.remove_profile(requirement.profile_id)?;
        }
        Ok(())
    }

    /// Creates a game with this scheduler's simulator, size and
    /// configuration, named after the scheduler unless `name` is given.
    pub fn create_game(&self, name: Option<&str>) -> Result<Game> {
        let reqs = self.get_requirements()?;
        let configuration: Configuration = reqs.configuration.iter().cloned().collect();
        self.client.create_game(
            reqs.simulator_id,
            name.unwrap_or(&reqs.name),
            reqs.size,
            &configuration,
        )
    }

    pub fn destroy(&self) -> Result<()> {
        self.client.call(
            Method::DELETE,
            Route::Api,
            &format!("generic_schedulers/{}.json", self.id),
            json!({}),
        )?;
        info!(scheduler = self.id, "destroyed generic scheduler");
        Ok(())
    }

    fn post(&self, action: &str, params: Value) -> Result<String> {
        self.client.send(
            Method::POST,
            Route::Api,
            &format!("generic_schedulers/{}/{action}.json", self.id),
            params,
        )
    }
}

/// `GenericScheduler` -> `generic_scheduler`.
fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
