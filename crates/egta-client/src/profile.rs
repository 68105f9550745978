use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::client::{EgtaClient, Route};
use crate::error::Result;
use crate::game::Granularity;
use crate::models::{ProfileFull, ProfileObservations, ProfileStructure, ProfileSummary};

/// Handle on a remote profile.
#[derive(Debug, Clone)]
pub struct Profile {
    client: EgtaClient,
    id: u64,
}

impl Profile {
    pub(crate) fn new(client: EgtaClient, id: u64) -> Self {
        Self { client, id }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn get_info(&self, granularity: Granularity) -> Result<Value> {
        self.client.fetch(
            Method::GET,
            Route::Api,
            &format!("profiles/{}.json", self.id),
            json!({ "granularity": granularity.as_str() }),
        )
    }

    fn get_typed<T: DeserializeOwned>(&self, granularity: Granularity) -> Result<T> {
        Ok(serde_json::from_value(self.get_info(granularity)?)?)
    }

    pub fn get_structure(&self) -> Result<ProfileStructure> {
        self.get_typed(Granularity::Structure)
    }

    pub fn get_summary(&self) -> Result<ProfileSummary> {
        self.get_typed(Granularity::Summary)
    }

    pub fn get_observations(&self) -> Result<ProfileObservations> {
        self.get_typed(Granularity::Observations)
    }

    pub fn get_full_data(&self) -> Result<ProfileFull> {
        self.get_typed(Granularity::Full)
    }
}
