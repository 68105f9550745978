use std::collections::BTreeSet;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::client::{EgtaClient, Route};
use crate::error::{EgtaError, Result};
use crate::models::{GameFullData, GameObservationData, GameStructure, GameSummaryData, RoleStrategies};

/// How much profile data a game or profile read includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Granularity {
    /// Roles and strategies only.
    #[default]
    Structure,
    /// Profiles with payoffs aggregated per symmetry group.
    Summary,
    /// Profiles with payoffs aggregated per observation.
    Observations,
    /// Every player of every observation.
    Full,
}

impl Granularity {
    pub fn as_str(self) -> &'static str {
        match self {
            Granularity::Structure => "structure",
            Granularity::Summary => "summary",
            Granularity::Observations => "observations",
            Granularity::Full => "full",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = EgtaError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "structure" => Ok(Granularity::Structure),
            "summary" => Ok(Granularity::Summary),
            "observations" => Ok(Granularity::Observations),
            "full" => Ok(Granularity::Full),
            other => Err(EgtaError::Validation(format!(
                "unknown granularity {other:?}"
            ))),
        }
    }
}

/// Handle on a remote game.
#[derive(Debug, Clone)]
pub struct Game {
    client: EgtaClient,
    id: u64,
}

impl Game {
    pub(crate) fn new(client: EgtaClient, id: u64) -> Self {
        Self { client, id }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Raw game payload at `granularity`, with its web `url` added.
    pub fn get_info(&self, granularity: Granularity) -> Result<Value> {
        let body = self.client.send(
            Method::GET,
            Route::Site,
            &format!("games/{}.json", self.id),
            json!({ "granularity": granularity.as_str() }),
        )?;
        let mut info = match serde_json::from_str(&body)? {
            // structure comes back as a JSON string holding the JSON document
            Value::String(inner) => serde_json::from_str(&inner)?,
            other => other,
        };
        let Some(fields) = info.as_object_mut() else {
            return Err(EgtaError::UnexpectedBody(format!(
                "game {} info is not an object",
                self.id
            )));
        };
        fields.insert(
            "url".to_string(),
            Value::String(self.client.resource_url("games", self.id)?),
        );
        Ok(info)
    }

    fn get_typed<T: DeserializeOwned>(&self, granularity: Granularity) -> Result<T> {
        Ok(serde_json::from_value(self.get_info(granularity)?)?)
    }

    pub fn get_structure(&self) -> Result<GameStructure> {
        self.get_typed(Granularity::Structure)
    }

    pub fn get_summary(&self) -> Result<GameSummaryData> {
        self.get_typed(Granularity::Summary)
    }

    pub fn get_observations(&self) -> Result<GameObservationData> {
        self.get_typed(Granularity::Observations)
    }

    pub fn get_full_data(&self) -> Result<GameFullData> {
        self.get_typed(Granularity::Full)
    }

    pub fn add_role(&self, role: &str, count: u32) -> Result<()> {
        self.post("add_role", json!({ "role": role, "count": count }))
    }

    pub fn remove_role(&self, role: &str) -> Result<()> {
        self.post("remove_role", json!({ "role": role }))
    }

    pub fn add_strategy(&self, role: &str, strategy: &str) -> Result<()> {
        self.post("add_strategy", json!({ "role": role, "strategy": strategy }))
    }

    /// Adds every listed strategy; roles must already exist in the game.
    pub fn add_dict(&self, roles: &RoleStrategies) -> Result<()> {
        for (role, strategies) in roles {
            for strategy in strategies {
                self.add_strategy(role, strategy)?;
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

    pub fn destroy(&self) -> Result<()> {
        self.client.call(
            Method::DELETE,
            Route::Api,
            &format!("games/{}.json", self.id),
            json!({}),
        )?;
        info!(game = self.id, "destroyed game");
        Ok(())
    }

    fn post(&self, action: &str, params: Value) -> Result<()> {
        self.client.call(
            Method::POST,
            Route::Api,
            &format!("games/{}/{action}.json", self.id),
            params,
        )
    }
}

/// A game that is destroyed when this guard goes out of scope.
///
/// Deletion failures on drop are logged and swallowed.
#[derive(Debug)]
pub struct TempGame {
    game: Game,
    armed: bool,
}

impl TempGame {
    pub(crate) fn new(game: Game) -> Self {
        Self { game, armed: true }
    }

    /// Disarms the guard and hands back a game that outlives it.
    pub fn keep(mut self) -> Game {
        self.armed = false;
        self.game.clone()
    }
}

impl Deref for TempGame {
    type Target = Game;

    fn deref(&self) -> &Game {
        &self.game
    }
}

impl Drop for TempGame {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(err) = self.game.destroy() {
            warn!(game = self.game.id, error = %err, "failed to destroy temporary game");
        }
    }
}
