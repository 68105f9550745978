//! In-memory records and the rules the live service enforces on them.

use std::collections::BTreeMap;

use chrono::{SecondsFormat, Utc};
use tracing::debug;

use crate::arena::Arena;
use crate::error::{MockError, MockResult};

pub type Configuration = BTreeMap<String, String>;

/// Largest observation count a single profile requirement may ask for.
pub const MAX_OBSERVATION_REQUIREMENT: u64 = 10_000;

pub(crate) fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug)]
pub(crate) struct SimulatorRecord {
    pub id: u64,
    pub name: String,
    pub version: String,
    pub email: String,
    pub configuration: Configuration,
    pub role_configuration: BTreeMap<String, Vec<String>>,
    pub created_at: String,
    pub updated_at: String,
}

impl SimulatorRecord {
    pub fn fullname(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }

    fn has_strategy(&self, role: &str, strategy: &str) -> bool {
        self.role_configuration
            .get(role)
            .is_some_and(|strategies| strategies.iter().any(|s| s == strategy))
    }
}

/// A simulator paired with one configuration. Profiles belong to instances.
#[derive(Debug)]
pub(crate) struct InstanceRecord {
    pub id: u64,
    pub simulator_id: u64,
    pub configuration: Configuration,
}

#[derive(Debug)]
pub(crate) struct SchedulerRecord {
    pub id: u64,
    pub name: String,
    pub active: bool,
    pub process_memory: u64,
    pub size: u32,
    pub time_per_observation: u64,
    pub observations_per_simulation: u64,
    pub nodes: u32,
    pub default_observation_requirement: u64,
    pub instance_id: u64,
    pub roles: BTreeMap<String, u32>,
    /// Requested observation count per profile id.
    pub requirements: BTreeMap<u64, u64>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewScheduler {
    pub simulator_id: u64,
    pub name: String,
    pub active: bool,
    pub process_memory: u64,
    pub size: u32,
    pub time_per_observation: u64,
    pub observations_per_simulation: u64,
    pub nodes: u32,
    pub default_observation_requirement: u64,
    pub configuration: Configuration,
}

/// Scheduler fields a `PUT` may change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerChanges {
    pub name: Option<String>,
    pub active: Option<bool>,
    pub process_memory: Option<u64>,
    pub size: Option<u32>,
    pub time_per_observation: Option<u64>,
    pub observations_per_simulation: Option<u64>,
    pub nodes: Option<u32>,
    pub default_observation_requirement: Option<u64>,
}

#[derive(Debug)]
pub(crate) struct GameRole {
    pub count: u32,
    pub strategies: Vec<String>,
}

#[derive(Debug)]
pub(crate) struct GameRecord {
    pub id: u64,
    pub name: String,
    pub size: u32,
    pub instance_id: u64,
    pub roles: BTreeMap<String, GameRole>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug)]
pub(crate) struct GroupRecord {
    pub id: u64,
    pub role: String,
    pub strategy: String,
    pub count: u32,
}

/// One simulated outcome: a payoff per player, tagged with the player's group id.
#[derive(Debug)]
pub(crate) struct ObservationRecord {
    pub players: Vec<(u64, f64)>,
}

#[derive(Debug)]
pub(crate) struct ProfileRecord {
    pub id: u64,
    pub instance_id: u64,
    pub assignment: String,
    pub groups: Vec<GroupRecord>,
    pub observations: Vec<ObservationRecord>,
    pub created_at: String,
    pub updated_at: String,
}

impl ProfileRecord {
    pub fn size(&self) -> u32 {
        self.groups
            .iter()
            .fold(0u32, |size, group| size.saturating_add(group.count))
    }

    pub fn role_configuration(&self) -> BTreeMap<String, u32> {
        let mut roles = BTreeMap::new();
        for group in &self.groups {
            let players: &mut u32 = roles.entry(group.role.clone()).or_insert(0);
            *players = players.saturating_add(group.count);
        }
        roles
    }
}

#[derive(Debug)]
pub(crate) struct SimulationRecord {
    pub id: u64,
    pub profile_id: u64,
    pub assignment: String,
    pub simulator_fullname: String,
    pub size: u32,
    pub state: String,
    pub job: Option<u64>,
    pub error_message: String,
}

/// Parses `role: count strategy, count strategy; role: ...` into
/// `(role, strategy, count)` triples. A strategy may appear once per role.
pub(crate) fn parse_assignment(assignment: &str) -> MockResult<Vec<(String, String, u32)>> {
    let invalid = || MockError::Unprocessable(format!("malformed assignment {assignment:?}"));
    let mut groups: Vec<(String, String, u32)> = Vec::new();
    for role_part in assignment.split(';') {
        let (role, strategies) = role_part.split_once(':').ok_or_else(invalid)?;
        let role = role.trim();
        if role.is_empty() {
            return Err(invalid());
        }
        for entry in strategies.split(',') {
            let (count, strategy) = entry.trim().split_once(' ').ok_or_else(invalid)?;
            let count: u32 = count.parse().map_err(|_| invalid())?;
            let strategy = strategy.trim();
            if strategy.is_empty() {
                return Err(invalid());
            }
            if groups.iter().any(|(r, s, _)| r == role && s == strategy) {
                return Err(MockError::Unprocessable(format!(
                    "strategy {strategy} listed twice for role {role}"
                )));
            }
            groups.push((role.to_string(), strategy.to_string(), count));
        }
    }
    Ok(groups)
}

/// Whether adding `count` players to roles already holding `used` overflows `size`.
fn exceeds(used: impl IntoIterator<Item = u32>, count: u32, size: u32) -> bool {
    used.into_iter()
        .try_fold(count, u32::checked_add)
        .map_or(true, |total| total > size)
}

fn render_assignment(groups: &[(String, String, u32)]) -> String {
    let mut roles: BTreeMap<&str, Vec<(&str, u32)>> = BTreeMap::new();
    for (role, strategy, count) in groups {
        if *count > 0 {
            roles
                .entry(role.as_str())
                .or_default()
                .push((strategy.as_str(), *count));
        }
    }
    roles
        .into_iter()
        .map(|(role, mut strategies)| {
            strategies.sort_unstable();
            let rendered: Vec<String> = strategies
                .into_iter()
                .map(|(strategy, count)| format!("{count} {strategy}"))
                .collect();
            format!("{role}: {}", rendered.join(", "))
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug)]
pub(crate) struct Store {
    pub simulators: Arena<SimulatorRecord>,
    pub instances: Arena<InstanceRecord>,
    pub schedulers: Arena<SchedulerRecord>,
    pub games: Arena<GameRecord>,
    pub profiles: Arena<ProfileRecord>,
    pub simulations: Arena<SimulationRecord>,
    next_group_id: u64,
    next_job_id: u64,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            simulators: Arena::new("simulator"),
            instances: Arena::new("simulator instance"),
            schedulers: Arena::new("scheduler"),
            games: Arena::new("game"),
            profiles: Arena::new("profile"),
            simulations: Arena::new("simulation"),
            next_group_id: 0,
            next_job_id: 1,
        }
    }
}

impl Store {
    pub fn create_simulator(
        &mut self,
        name: &str,
        version: &str,
        configuration: Configuration,
    ) -> MockResult<u64> {
        if self
            .simulators
            .values()
            .any(|sim| sim.name == name && sim.version == version)
        {
            return Err(MockError::Conflict(format!("simulator {name}-{version}")));
        }
        let now = timestamp();
        Ok(self.simulators.insert_with(|id| SimulatorRecord {
            id,
            name: name.to_string(),
            version: version.to_string(),
            email: "egta@example.com".to_string(),
            configuration,
            role_configuration: BTreeMap::new(),
            created_at: now.clone(),
            updated_at: now,
        }))
    }

    pub fn simulator_add_role(&mut self, id: u64, role: &str) -> MockResult<()> {
        let sim = self.simulators.get_mut(id)?;
        if !sim.role_configuration.contains_key(role) {
            sim.role_configuration.insert(role.to_string(), Vec::new());
            sim.updated_at = timestamp();
        }
        Ok(())
    }

    pub fn simulator_remove_role(&mut self, id: u64, role: &str) -> MockResult<()> {
        let sim = self.simulators.get_mut(id)?;
        sim.role_configuration
            .remove(role)
            .ok_or_else(|| MockError::NotFound(format!("role {role}")))?;
        sim.updated_at = timestamp();
        Ok(())
    }

    pub fn simulator_add_strategy(&mut self, id: u64, role: &str, strategy: &str) -> MockResult<()> {
        let sim = self.simulators.get_mut(id)?;
        let strategies = sim
            .role_configuration
            .get_mut(role)
            .ok_or_else(|| MockError::NotFound(format!("role {role}")))?;
        if !strategies.iter().any(|s| s == strategy) {
            strategies.push(strategy.to_string());
            strategies.sort();
            sim.updated_at = timestamp();
        }
        Ok(())
    }

    pub fn simulator_remove_strategy(
        &mut self,
        id: u64,
        role: &str,
        strategy: &str,
    ) -> MockResult<()> {
        let sim = self.simulators.get_mut(id)?;
        let strategies = sim
            .role_configuration
            .get_mut(role)
            .ok_or_else(|| MockError::NotFound(format!("role {role}")))?;
        strategies.retain(|s| s != strategy);
        sim.updated_at = timestamp();
        Ok(())
    }

    /// Simulator defaults overlaid with `overrides`.
    fn full_configuration(&self, simulator_id: u64, overrides: Configuration) -> MockResult<Configuration> {
        let mut configuration = self.simulators.get(simulator_id)?.configuration.clone();
        configuration.extend(overrides);
        Ok(configuration)
    }

    fn instance_for(&mut self, simulator_id: u64, configuration: Configuration) -> u64 {
        if let Some(instance) = self
            .instances
            .values()
            .find(|inst| inst.simulator_id == simulator_id && inst.configuration == configuration)
        {
            return instance.id;
        }
        self.instances.insert_with(|id| InstanceRecord {
            id,
            simulator_id,
            configuration,
        })
    }

    pub fn simulator_of_instance(&self, instance_id: u64) -> MockResult<&SimulatorRecord> {
        let instance = self.instances.get(instance_id)?;
        self.simulators.get(instance.simulator_id)
    }

    pub fn create_scheduler(&mut self, params: NewScheduler) -> MockResult<u64> {
        let configuration = self.full_configuration(params.simulator_id, params.configuration)?;
        if self.schedulers.values().any(|s| s.name == params.name) {
            return Err(MockError::Conflict(format!("scheduler {}", params.name)));
        }
        let instance_id = self.instance_for(params.simulator_id, configuration);
        let now = timestamp();
        Ok(self.schedulers.insert_with(|id| SchedulerRecord {
            id,
            name: params.name,
            active: params.active,
            process_memory: params.process_memory,
            size: params.size,
            time_per_observation: params.time_per_observation,
            observations_per_simulation: params.observations_per_simulation,
            nodes: params.nodes,
            default_observation_requirement: params.default_observation_requirement,
            instance_id,
            roles: BTreeMap::new(),
            requirements: BTreeMap::new(),
            created_at: now.clone(),
            updated_at: now,
        }))
    }

    pub fn update_scheduler(&mut self, id: u64, changes: SchedulerChanges) -> MockResult<()> {
        if let Some(name) = &changes.name {
            if self.schedulers.values().any(|s| &s.name == name && s.id != id) {
                return Err(MockError::Conflict(format!("scheduler {name}")));
            }
        }
        let sched = self.schedulers.get_mut(id)?;
        if let Some(name) = changes.name {
            sched.name = name;
        }
        if let Some(active) = changes.active {
            sched.active = active;
        }
        if let Some(value) = changes.process_memory {
            sched.process_memory = value;
        }
        if let Some(value) = changes.size {
            sched.size = value;
        }
        if let Some(value) = changes.time_per_observation {
            sched.time_per_observation = value;
        }
        if let Some(value) = changes.observations_per_simulation {
            sched.observations_per_simulation = value;
        }
        if let Some(value) = changes.nodes {
            sched.nodes = value;
        }
        if let Some(value) = changes.default_observation_requirement {
            sched.default_observation_requirement = value;
        }
        sched.updated_at = timestamp();
        self.run_scheduler(id)
    }

    pub fn scheduler_add_role(&mut self, id: u64, role: &str, count: u32) -> MockResult<()> {
        let instance_id = self.schedulers.get(id)?.instance_id;
        if !self
            .simulator_of_instance(instance_id)?
            .role_configuration
            .contains_key(role)
        {
            return Err(MockError::Unprocessable(format!(
                "role {role} is not defined by the simulator"
            )));
        }
        let sched = self.schedulers.get_mut(id)?;
        if sched.roles.contains_key(role) {
            return Err(MockError::Conflict(format!("role {role}")));
        }
        if exceeds(sched.roles.values().copied(), count, sched.size) {
            return Err(MockError::Unprocessable(format!(
                "role {role} with {count} players exceeds scheduler size {}",
                sched.size
            )));
        }
        sched.roles.insert(role.to_string(), count);
        sched.updated_at = timestamp();
        Ok(())
    }

    pub fn scheduler_remove_role(&mut self, id: u64, role: &str) -> MockResult<()> {
        let sched = self.schedulers.get_mut(id)?;
        if sched.roles.remove(role).is_some() {
            sched.updated_at = timestamp();
        }
        Ok(())
    }

    /// Adds a requirement, keeping the count of one that already exists, and
    /// returns the profile id.
    pub fn scheduler_add_profile(&mut self, id: u64, assignment: &str, count: u64) -> MockResult<u64> {
        if count > MAX_OBSERVATION_REQUIREMENT {
            return Err(MockError::Unprocessable(format!(
                "count {count} exceeds the limit of {MAX_OBSERVATION_REQUIREMENT} observations"
            )));
        }
        let groups = parse_assignment(assignment)?;
        let sched = self.schedulers.get(id)?;
        let sim = self.simulator_of_instance(sched.instance_id)?;

        let mut role_counts: BTreeMap<&str, u32> = BTreeMap::new();
        for (role, strategy, count) in &groups {
            if !sched.roles.contains_key(role.as_str()) {
                return Err(MockError::Unprocessable(format!(
                    "role {role} is not part of scheduler {id}"
                )));
            }
            if !sim.has_strategy(role, strategy) {
                return Err(MockError::Unprocessable(format!(
                    "strategy {strategy} is not defined for role {role}"
                )));
            }
            let players = role_counts.entry(role.as_str()).or_insert(0);
            *players = players.checked_add(*count).ok_or_else(|| {
                MockError::Unprocessable(format!("player count for role {role} overflows"))
            })?;
        }
        let expected: BTreeMap<&str, u32> =
            sched.roles.iter().map(|(role, count)| (role.as_str(), *count)).collect();
        if role_counts != expected {
            return Err(MockError::Unprocessable(format!(
                "assignment {assignment:?} does not match the scheduler's role counts"
            )));
        }

        let instance_id = sched.instance_id;
        let profile_id = self.profile_for(instance_id, &groups);
        let sched = self.schedulers.get_mut(id)?;
        sched.requirements.entry(profile_id).or_insert(count);
        sched.updated_at = timestamp();
        self.run_scheduler(id)?;
        Ok(profile_id)
    }

    pub fn scheduler_remove_profile(&mut self, id: u64, profile_id: u64) -> MockResult<()> {
        let sched = self.schedulers.get_mut(id)?;
        if sched.requirements.remove(&profile_id).is_some() {
            sched.updated_at = timestamp();
        }
        Ok(())
    }

    pub fn destroy_scheduler(&mut self, id: u64) -> MockResult<()> {
        self.schedulers.remove(id).map(|_| ())
    }

    fn profile_for(&mut self, instance_id: u64, groups: &[(String, String, u32)]) -> u64 {
        let assignment = render_assignment(groups);
        if let Some(profile) = self
            .profiles
            .values()
            .find(|p| p.instance_id == instance_id && p.assignment == assignment)
        {
            return profile.id;
        }
        let mut records = Vec::new();
        for (role, strategy, count) in groups.iter().filter(|(_, _, count)| *count > 0) {
            records.push(GroupRecord {
                id: self.next_group_id,
                role: role.clone(),
                strategy: strategy.clone(),
                count: *count,
            });
            self.next_group_id += 1;
        }
        records.sort_by(|a, b| (&a.role, &a.strategy).cmp(&(&b.role, &b.strategy)));
        let now = timestamp();
        self.profiles.insert_with(|id| ProfileRecord {
            id,
            instance_id,
            assignment,
            groups: records,
            observations: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Runs the simulations an active scheduler is missing. Inactive
    /// schedulers keep their requirements pending.
    fn run_scheduler(&mut self, id: u64) -> MockResult<()> {
        let sched = self.schedulers.get(id)?;
        if !sched.active {
            return Ok(());
        }
        let pending: Vec<(u64, u64)> = sched
            .requirements
            .iter()
            .map(|(profile, count)| (*profile, *count))
            .collect();
        let fullname = self.simulator_of_instance(sched.instance_id)?.fullname();
        for (profile_id, requirement) in pending {
            while (self.profiles.get(profile_id)?.observations.len() as u64) < requirement {
                self.simulate(profile_id, &fullname)?;
            }
        }
        Ok(())
    }

    fn simulate(&mut self, profile_id: u64, fullname: &str) -> MockResult<()> {
        let job = self.next_job_id;
        self.next_job_id += 1;
        let profile = self.profiles.get_mut(profile_id)?;
        let round = profile.observations.len() as f64;
        let players = profile
            .groups
            .iter()
            .flat_map(|group| {
                (0..group.count).map(move |player| {
                    let payoff = group.id as f64 + round * 0.5 + f64::from(player) * 0.25;
                    (group.id, payoff)
                })
            })
            .collect();
        profile.observations.push(ObservationRecord { players });
        profile.updated_at = timestamp();
        let assignment = profile.assignment.clone();
        let size = profile.size();
        let folder = self.simulations.insert_with(|id| SimulationRecord {
            id,
            profile_id,
            assignment,
            simulator_fullname: fullname.to_string(),
            size,
            state: "complete".to_string(),
            job: Some(job),
            error_message: String::new(),
        });
        debug!(profile = profile_id, folder, job, "simulated profile");
        Ok(())
    }

    pub fn create_game(
        &mut self,
        simulator_id: u64,
        name: &str,
        size: u32,
        configuration: Configuration,
    ) -> MockResult<u64> {
        let configuration = self.full_configuration(simulator_id, configuration)?;
        if self.games.values().any(|game| game.name == name) {
            return Err(MockError::Conflict(format!("game {name}")));
        }
        let instance_id = self.instance_for(simulator_id, configuration);
        let now = timestamp();
        Ok(self.games.insert_with(|id| GameRecord {
            id,
            name: name.to_string(),
            size,
            instance_id,
            roles: BTreeMap::new(),
            created_at: now.clone(),
            updated_at: now,
        }))
    }

    pub fn game_add_role(&mut self, id: u64, role: &str, count: u32) -> MockResult<()> {
        let instance_id = self.games.get(id)?.instance_id;
        if !self
            .simulator_of_instance(instance_id)?
            .role_configuration
            .contains_key(role)
        {
            return Err(MockError::Unprocessable(format!(
                "role {role} is not defined by the simulator"
            )));
        }
        let game = self.games.get_mut(id)?;
        if game.roles.contains_key(role) {
            return Err(MockError::Conflict(format!("role {role}")));
        }
        if exceeds(game.roles.values().map(|r| r.count), count, game.size) {
            return Err(MockError::Unprocessable(format!(
                "role {role} with {count} players exceeds game size {}",
                game.size
            )));
        }
        game.roles.insert(
            role.to_string(),
            GameRole {
                count,
                strategies: Vec::new(),
            },
        );
        game.updated_at = timestamp();
        Ok(())
    }

    pub fn game_remove_role(&mut self, id: u64, role: &str) -> MockResult<()> {
        let game = self.games.get_mut(id)?;
        if game.roles.remove(role).is_some() {
            game.updated_at = timestamp();
        }
        Ok(())
    }

    pub fn game_add_strategy(&mut self, id: u64, role: &str, strategy: &str) -> MockResult<()> {
        let instance_id = self.games.get(id)?.instance_id;
        if !self.simulator_of_instance(instance_id)?.has_strategy(role, strategy) {
            return Err(MockError::Unprocessable(format!(
                "strategy {strategy} is not defined for role {role}"
            )));
        }
        let game = self.games.get_mut(id)?;
        let entry = game
            .roles
            .get_mut(role)
            .ok_or_else(|| MockError::Unprocessable(format!("role {role} is not part of game {id}")))?;
        if !entry.strategies.iter().any(|s| s == strategy) {
            entry.strategies.push(strategy.to_string());
            entry.strategies.sort();
            game.updated_at = timestamp();
        }
        Ok(())
    }

    pub fn game_remove_strategy(&mut self, id: u64, role: &str, strategy: &str) -> MockResult<()> {
        let game = self.games.get_mut(id)?;
        if let Some(entry) = game.roles.get_mut(role) {
            entry.strategies.retain(|s| s != strategy);
            game.updated_at = timestamp();
        }
        Ok(())
    }

    pub fn destroy_game(&mut self, id: u64) -> MockResult<()> {
        self.games.remove(id).map(|_| ())
    }

    /// Profiles with data that fit entirely inside the game's roles and strategies.
    pub fn game_profiles(&self, game: &GameRecord) -> Vec<&ProfileRecord> {
        let role_counts: BTreeMap<String, u32> = game
            .roles
            .iter()
            .map(|(role, entry)| (role.clone(), entry.count))
            .collect();
        self.profiles
            .values()
            .filter(|profile| {
                profile.instance_id == game.instance_id
                    && !profile.observations.is_empty()
                    && profile.role_configuration() == role_counts
                    && profile.groups.iter().all(|group| {
                        game.roles
                            .get(&group.role)
                            .is_some_and(|entry| entry.strategies.contains(&group.strategy))
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> (Store, u64) {
        let mut store = Store::default();
        let sim = store
            .create_simulator("sim", "1", Configuration::from([("key".into(), "value".into())]))
            .unwrap();
        for (role, strategies) in [("a", ["1", "2"]), ("b", ["5", "6"])] {
            store.simulator_add_role(sim, role).unwrap();
            for strategy in strategies {
                store.simulator_add_strategy(sim, role, strategy).unwrap();
            }
        }
        (store, sim)
    }

    fn scheduler(store: &mut Store, sim: u64, name: &str, active: bool) -> u64 {
        let id = store
            .create_scheduler(NewScheduler {
                simulator_id: sim,
                name: name.into(),
                active,
                process_memory: 0,
                size: 4,
                time_per_observation: 0,
                observations_per_simulation: 1,
                nodes: 1,
                default_observation_requirement: 0,
                configuration: Configuration::new(),
            })
            .unwrap();
        store.scheduler_add_role(id, "a", 2).unwrap();
        store.scheduler_add_role(id, "b", 2).unwrap();
        id
    }

    #[test]
    fn parses_and_canonicalizes_assignments() {
        let groups = parse_assignment("b: 1 6, 1 5; a: 2 1").unwrap();
        assert_eq!(groups.len(), 3);
        assert_eq!(render_assignment(&groups), "a: 2 1; b: 1 5, 1 6");
        assert!(parse_assignment("a 2 1").is_err());
        assert!(parse_assignment("a: two 1").is_err());
        assert_eq!(parse_assignment("a: 1 x, 1 x").unwrap_err().status(), 422);
        assert_eq!(parse_assignment("a: 1 x; a: 1 x").unwrap_err().status(), 422);
    }

    #[test]
    fn overflowing_role_counts_are_unprocessable() {
        let (mut store, sim) = seeded();
        let id = scheduler(&mut store, sim, "s", false);
        store.scheduler_remove_role(id, "b").unwrap();
        assert_eq!(store.scheduler_add_role(id, "b", u32::MAX).unwrap_err().status(), 422);

        let game = store.create_game(sim, "g", 4, Configuration::new()).unwrap();
        store.game_add_role(game, "a", 1).unwrap();
        assert_eq!(store.game_add_role(game, "b", u32::MAX).unwrap_err().status(), 422);
        store.game_add_role(game, "b", 3).unwrap();
    }

    #[test]
    fn profile_counts_are_bounded() {
        let (mut store, sim) = seeded();
        let id = scheduler(&mut store, sim, "s", true);
        let overflow = format!("a: {} 1, 1 2; b: 2 5", u32::MAX);
        assert_eq!(store.scheduler_add_profile(id, &overflow, 1).unwrap_err().status(), 422);
        let err = store
            .scheduler_add_profile(id, "a: 2 1; b: 2 5", MAX_OBSERVATION_REQUIREMENT + 1)
            .unwrap_err();
        assert_eq!(err.status(), 422);
        assert_eq!(store.simulations.len(), 0);
    }

    #[test]
    fn duplicate_simulators_conflict() {
        let (mut store, _) = seeded();
        let err = store.create_simulator("sim", "1", Configuration::new()).unwrap_err();
        assert_eq!(err.status(), 409);
    }

    #[test]
    fn scheduler_roles_are_checked() {
        let (mut store, sim) = seeded();
        let id = scheduler(&mut store, sim, "s", false);
        assert_eq!(store.scheduler_add_role(id, "a", 1).unwrap_err().status(), 409);
        assert_eq!(store.scheduler_add_role(id, "c", 1).unwrap_err().status(), 422);
        store.scheduler_remove_role(id, "b").unwrap();
        assert_eq!(store.scheduler_add_role(id, "b", 3).unwrap_err().status(), 422);
    }

    #[test]
    fn active_schedulers_run_requirements() {
        let (mut store, sim) = seeded();
        let id = scheduler(&mut store, sim, "s", true);
        let profile = store.scheduler_add_profile(id, "a: 2 1; b: 1 5, 1 6", 2).unwrap();
        assert_eq!(store.profiles.get(profile).unwrap().observations.len(), 2);
        assert_eq!(store.simulations.len(), 2);
        assert_eq!(store.profiles.get(profile).unwrap().observations[0].players.len(), 4);
    }

    #[test]
    fn inactive_schedulers_wait_for_activation() {
        let (mut store, sim) = seeded();
        let id = scheduler(&mut store, sim, "s", false);
        let profile = store.scheduler_add_profile(id, "a: 2 1; b: 2 5", 3).unwrap();
        assert!(store.profiles.get(profile).unwrap().observations.is_empty());
        store
            .update_scheduler(
                id,
                SchedulerChanges {
                    active: Some(true),
                    ..SchedulerChanges::default()
                },
            )
            .unwrap();
        assert_eq!(store.profiles.get(profile).unwrap().observations.len(), 3);
    }

    #[test]
    fn profiles_are_shared_per_instance() {
        let (mut store, sim) = seeded();
        let first = scheduler(&mut store, sim, "s1", true);
        let second = scheduler(&mut store, sim, "s2", true);
        let a = store.scheduler_add_profile(first, "a: 2 1; b: 2 5", 1).unwrap();
        let b = store.scheduler_add_profile(second, "b: 2 5; a: 2 1", 4).unwrap();
        assert_eq!(a, b);
        assert_eq!(store.profiles.get(a).unwrap().observations.len(), 4);
    }

    #[test]
    fn game_profiles_follow_roles_and_strategies() {
        let (mut store, sim) = seeded();
        let sched = scheduler(&mut store, sim, "s", true);
        store.scheduler_add_profile(sched, "a: 2 1; b: 1 5, 1 6", 1).unwrap();
        store.scheduler_add_profile(sched, "a: 2 1; b: 2 5", 2).unwrap();
        let game = store.create_game(sim, "g", 4, Configuration::new()).unwrap();
        store.game_add_role(game, "a", 2).unwrap();
        store.game_add_role(game, "b", 2).unwrap();
        for (role, strategy) in [("a", "1"), ("b", "5"), ("b", "6")] {
            store.game_add_strategy(game, role, strategy).unwrap();
        }
        assert_eq!(store.game_profiles(store.games.get(game).unwrap()).len(), 2);
        store.game_remove_strategy(game, "b", "6").unwrap();
        assert_eq!(store.game_profiles(store.games.get(game).unwrap()).len(), 1);
    }
}
