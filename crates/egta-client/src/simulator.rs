use std::collections::BTreeSet;

use reqwest::Method;
use serde_json::json;
use tracing::debug;

use crate::client::{EgtaClient, Route};
use crate::error::{EgtaError, Result};
use crate::game::Game;
use crate::models::{Configuration, RoleStrategies, SimulatorInfo};
use crate::scheduler::{Scheduler, SchedulerParams};

/// Handle on a remote simulator.
#[derive(Debug, Clone)]
pub struct Simulator {
    client: EgtaClient,
    id: u64,
}

impl Simulator {
    pub(crate) fn new(client: EgtaClient, id: u64) -> Self {
        Self { client, id }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn get_info(&self) -> Result<SimulatorInfo> {
        let mut info: SimulatorInfo = self.client.fetch(
            Method::GET,
            Route::Api,
            &format!("simulators/{}.json", self.id),
            json!({}),
        )?;
        info.url = self.client.resource_url("simulators", info.id)?;
        Ok(info)
    }

    pub fn add_role(&self, role: &str) -> Result<()> {
        self.post("add_role", json!({ "role": role }))
    }

    pub fn remove_role(&self, role: &str) -> Result<()> {
        self.post("remove_role", json!({ "role": role }))
    }

    /// Adds `strategy` to `role` unless it is already there.
    pub fn add_strategy(&self, role: &str, strategy: &str) -> Result<()> {
        let info = self.get_info()?;
        let existing = info
            .role_configuration
            .get(role)
            .ok_or_else(|| EgtaError::NotFound(format!("role {role} in simulator {}", self.id)))?;
        if existing.iter().any(|s| s == strategy) {
            debug!(simulator = self.id, role, strategy, "strategy already present");
            return Ok(());
        }
        self.post_strategy(role, strategy)
    }

    /// Adds every role in `roles` and whichever of its strategies are missing.
    pub fn add_dict(&self, roles: &RoleStrategies) -> Result<()> {
        let existing = self.get_info()?.role_configuration;
        for (role, strategies) in roles {
            let present: BTreeSet<&str> = existing
                .get(role)
                .map(|list| list.iter().map(String::as_str).collect())
                .unwrap_or_default();
            self.add_role(role)?;
            let missing: BTreeSet<&str> = strategies
                .iter()
                .map(String::as_str)
                .filter(|s| !present.contains(s))
                .collect();
            for strategy in missing {
                self.post_strategy(role, strategy)?;
            }
        }
        Ok(())
    }

    pub fn remove_strategy(&self, role: &str, strategy: &str) -> Result<()> {
        self.post("remove_strategy", json!({ "role": role, "strategy": strategy }))
    }

    /// Removes the listed strategies. Roles stay, even when emptied.
    pub fn remove_dict(&self, roles: &RoleStrategies) -> Result<()> {
        for (role, strategies) in roles {
            let unique: BTreeSet<&str> = strategies.iter().map(String::as_str).collect();
            for strategy in unique {
                self.remove_strategy(role, strategy)?;
            }
        }
        Ok(())
    }

    pub fn create_generic_scheduler(&self, params: &SchedulerParams) -> Result<Scheduler> {
        self.client.create_generic_scheduler(self.id, params)
    }

    pub fn create_game(&self, name: &str, size: u32, configuration: &Configuration) -> Result<Game> {
        self.client.create_game(self.id, name, size, configuration)
    }

    fn post_strategy(&self, role: &str, strategy: &str) -> Result<()> {
        self.post("add_strategy", json!({ "role": role, "strategy": strategy }))
    }

    fn post(&self, action: &str, params: serde_json::Value) -> Result<()> {
        self.client.call(
            Method::POST,
            Route::Api,
            &format!("simulators/{}/{action}.json", self.id),
            params,
        )
    }
}
