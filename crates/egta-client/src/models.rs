//! Response payloads of the EGTA Online API.
//!
//! Field names follow the service's JSON. `url` fields are not part of the
//! wire format; the client fills them in with the resource's web address.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// `{role: [strategies]}` as used by the bulk add/remove helpers.
pub type RoleStrategies = BTreeMap<String, Vec<String>>;

/// Simulator run-time parameters, `{key: value}`.
pub type Configuration = BTreeMap<String, String>;

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorSummary {
    pub id: u64,
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorInfo {
    pub id: u64,
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub source: Value,
    #[serde(default)]
    pub configuration: Configuration,
    #[serde(default)]
    pub role_configuration: RoleStrategies,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub url: String,
}

impl SimulatorInfo {
    /// `name-version`, the label the service uses in simulation listings.
    pub fn fullname(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerInfo {
    pub id: u64,
    pub name: String,
    pub active: bool,
    pub process_memory: u64,
    pub size: u32,
    pub time_per_observation: u64,
    pub observations_per_simulation: u64,
    pub nodes: u32,
    pub default_observation_requirement: u64,
    pub simulator_instance_id: u64,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulingRequirement {
    pub profile_id: u64,
    pub requirement: u64,
    pub current_count: u64,
}

/// Scheduler details at `with_requirements` granularity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerRequirements {
    pub id: u64,
    pub name: String,
    pub active: bool,
    pub process_memory: u64,
    pub size: u32,
    pub time_per_observation: u64,
    pub observations_per_simulation: u64,
    pub nodes: u32,
    pub default_observation_requirement: u64,
    pub simulator_id: u64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub configuration: Vec<(String, String)>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub scheduling_requirements: Vec<SchedulingRequirement>,
    #[serde(default)]
    pub url: String,
}

/// Entry of the games listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSummary {
    pub id: u64,
    pub name: String,
    pub size: u32,
    pub simulator_instance_id: u64,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRole {
    pub name: String,
    pub count: u32,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub strategies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameStructure {
    pub id: u64,
    pub name: String,
    pub size: u32,
    pub simulator_instance_id: u64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub configuration: Vec<(String, String)>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub roles: Vec<GameRole>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub url: String,
}

/// Game structure plus its profiles at some granularity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "P: Deserialize<'de>"))]
pub struct GameData<P> {
    #[serde(flatten)]
    pub game: GameStructure,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub profiles: Vec<P>,
}

pub type GameSummaryData = GameData<ProfileSummary>;
pub type GameObservationData = GameData<ProfileObservations>;
pub type GameFullData = GameData<ProfileFull>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileStructure {
    pub id: u64,
    pub assignment: String,
    pub observations_count: u64,
    #[serde(default)]
    pub role_configuration: BTreeMap<String, u32>,
    pub simulator_instance_id: u64,
    pub size: u32,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// A symmetry group as reported back by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupDescriptor {
    pub id: u64,
    pub role: String,
    pub strategy: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryGroup {
    pub id: u64,
    pub role: String,
    pub strategy: String,
    pub count: u32,
    #[serde(default)]
    pub payoff: Option<f64>,
    #[serde(default)]
    pub payoff_sd: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub id: u64,
    pub observations_count: u64,
    pub simulator_instance_id: u64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub symmetry_groups: Vec<SummaryGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationGroup {
    pub id: u64,
    pub payoff: f64,
    #[serde(default)]
    pub payoff_sd: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    #[serde(default)]
    pub features: Value,
    #[serde(default)]
    pub extended_features: Value,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub symmetry_groups: Vec<ObservationGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileObservations {
    pub id: u64,
    pub simulator_instance_id: u64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub symmetry_groups: Vec<GroupDescriptor>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub observations: Vec<Observation>,
}

/// One player's payoff within a full observation. `sid` names the symmetry group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerObservation {
    pub sid: u64,
    pub p: f64,
    #[serde(default)]
    pub f: Value,
    #[serde(default)]
    pub e: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullObservation {
    #[serde(default)]
    pub features: Value,
    #[serde(default)]
    pub extended_features: Value,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub players: Vec<PlayerObservation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileFull {
    pub id: u64,
    pub simulator_instance_id: u64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub symmetry_groups: Vec<GroupDescriptor>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub observations: Vec<FullObservation>,
}

/// Row of the simulations table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationRow {
    pub state: String,
    pub profile: String,
    pub simulator: String,
    pub folder: u64,
    /// `None` when the service shows `N/A`.
    pub job: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationDetail {
    pub folder_number: u64,
    pub job: Option<u64>,
    pub profile: String,
    pub simulator_fullname: String,
    pub size: u32,
    pub state: String,
    pub error_message: String,
}
