use std::fmt;
use std::sync::Arc;

use reqwest::blocking::Client;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{EgtaError, Result};
use crate::form;
use crate::game::{Game, TempGame};
use crate::html;
use crate::models::{
    Configuration, GameSummary, SchedulerInfo, SimulationDetail, SimulationRow, SimulatorSummary,
};
use crate::pages::Pages;
use crate::profile::Profile;
use crate::scheduler::{Scheduler, SchedulerParams};
use crate::simulator::Simulator;

/// Where an endpoint lives: the JSON API under `api/v3/`, or the site itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Route {
    Api,
    Site,
}

/// Session with an EGTA Online server.
///
/// Cloning is cheap and shares the connection pool; resource handles hold a
/// clone. Every call blocks for one request, or several when retried.
#[derive(Clone)]
pub struct EgtaClient {
    http: Client,
    config: Arc<ClientConfig>,
}

impl fmt::Debug for EgtaClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EgtaClient")
            .field("base_url", &self.config.base_url.as_str())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// One page of a listing. Pages are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
    pub sort: Option<String>,
    pub direction: Direction,
}

impl PageRequest {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page,
            per_page,
            sort: None,
            direction: Direction::Asc,
        }
    }

    pub fn sorted_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.sort = Some(column.into());
        self.direction = direction;
        self
    }

    fn params(&self, page: u32) -> Value {
        json!({
            "page": page,
            "per_page": self.per_page,
            "sort": self.sort,
            "direction": self.direction.as_str(),
        })
    }
}

/// Column the simulations table is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimulationColumn {
    State,
    Profile,
    Simulator,
    Folder,
    #[default]
    Job,
}

impl SimulationColumn {
    /// Sort key understood by the service.
    pub fn field(self) -> &'static str {
        match self {
            SimulationColumn::State => "state",
            SimulationColumn::Profile => "profiles.assignment",
            SimulationColumn::Simulator => "simulator_fullname",
            SimulationColumn::Folder => "id",
            SimulationColumn::Job => "job_id",
        }
    }
}

impl std::str::FromStr for SimulationColumn {
    type Err = EgtaError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "state" => Ok(SimulationColumn::State),
            "profile" => Ok(SimulationColumn::Profile),
            "simulator" => Ok(SimulationColumn::Simulator),
            "folder" => Ok(SimulationColumn::Folder),
            "job" => Ok(SimulationColumn::Job),
            other => Err(EgtaError::Validation(format!(
                "unknown simulation column {other:?}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationQuery {
    /// First page to fetch, at least 1.
    pub page_start: u32,
    pub ascending: bool,
    pub column: SimulationColumn,
}

impl Default for SimulationQuery {
    fn default() -> Self {
        Self {
            page_start: 1,
            ascending: false,
            column: SimulationColumn::Job,
        }
    }
}

#[derive(Deserialize)]
struct SimulatorList {
    simulators: Vec<SimulatorSummary>,
}

#[derive(Deserialize)]
struct SchedulerList {
    generic_schedulers: Vec<SchedulerInfo>,
}

#[derive(Deserialize)]
struct GameList {
    games: Vec<GameSummary>,
}

#[derive(Serialize)]
struct NewScheduler<'a> {
    simulator_id: u64,
    name: &'a str,
    active: bool,
    process_memory: u64,
    size: u32,
    time_per_observation: u64,
    observations_per_simulation: u64,
    nodes: u32,
    default_observation_requirement: u64,
    configuration: &'a Configuration,
}

impl EgtaClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|source| EgtaError::Transport {
            url: config.base_url.to_string(),
            source,
        })?;
        info!(base_url = %config.base_url, "egta session opened");
        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Releases this handle on the session; the pool closes with the last clone.
    pub fn close(self) {
        debug!(base_url = %self.config.base_url, "egta session closed");
    }

    fn endpoint_url(&self, route: Route, endpoint: &str) -> Result<Url> {
        let path = match route {
            Route::Api => format!("api/v3/{endpoint}"),
            Route::Site => endpoint.to_string(),
        };
        Ok(self.config.base_url.join(&path)?)
    }

    /// Web address of a resource, e.g. `https://host/games/3`.
    pub(crate) fn resource_url(&self, collection: &str, id: u64) -> Result<String> {
        Ok(self
            .config
            .base_url
            .join(&format!("{collection}/{id}"))?
            .to_string())
    }

    /// Sends one logical request, retrying per the session's policy, and
    /// returns the body of the successful response.
    pub(crate) fn send(
        &self,
        method: Method,
        route: Route,
        endpoint: &str,
        params: Value,
    ) -> Result<String> {
        let url = self.endpoint_url(route, endpoint)?;
        let mut pairs = form::flatten(&params);
        pairs.push(("auth_token".to_string(), self.config.auth_token.clone()));
        let label = format!("{method} {endpoint}");

        self.config.retry.run(&label, |attempt| {
            debug!(method = %method, url = %url, attempt, "sending request");
            let request = self.http.request(method.clone(), url.clone());
            let request = if method == Method::GET {
                request.query(&pairs)
            } else {
                request.form(&pairs)
            };
            let transport = |source| EgtaError::Transport {
                url: url.to_string(),
                source,
            };
            let response = request.send().map_err(transport)?;
            let status = response.status();
            let body = response.text().map_err(transport)?;
            debug!(method = %method, url = %url, status = status.as_u16(), bytes = body.len(), "response");
            if status.is_success() {
                Ok(body)
            } else {
                Err(EgtaError::from_status(status, body))
            }
        })
    }

    pub(crate) fn fetch<T: DeserializeOwned>(
        &self,
        method: Method,
        route: Route,
        endpoint: &str,
        params: Value,
    ) -> Result<T> {
        let body = self.send(method, route, endpoint, params)?;
        Ok(serde_json::from_str(&body)?)
    }

    pub(crate) fn call(
        &self,
        method: Method,
        route: Route,
        endpoint: &str,
        params: Value,
    ) -> Result<()> {
        self.send(method, route, endpoint, params).map(|_| ())
    }

    pub fn get_simulators(&self) -> Result<Vec<SimulatorSummary>> {
        let list: SimulatorList = self.fetch(Method::GET, Route::Api, "simulators", json!({}))?;
        Ok(list.simulators)
    }

    /// Handle for a simulator id; no request is made until it is used.
    pub fn get_simulator(&self, id: u64) -> Simulator {
        Simulator::new(self.clone(), id)
    }

    /// Looks a simulator up by name and optional version.
    ///
    /// Without a version the name must be unambiguous.
    pub fn get_simulator_by_name(&self, name: &str, version: Option<&str>) -> Result<Simulator> {
        let matches: Vec<SimulatorSummary> = self
            .get_simulators()?
            .into_iter()
            .filter(|sim| sim.name == name && version.map_or(true, |v| sim.version == v))
            .collect();
        match (matches.as_slice(), version) {
            ([], Some(version)) => Err(EgtaError::NotFound(format!(
                "simulator {name} version {version}"
            ))),
            ([], None) => Err(EgtaError::NotFound(format!("simulator {name}"))),
            ([only], _) => Ok(self.get_simulator(only.id)),
            (many, Some(_)) => Ok(self.get_simulator(many[0].id)),
            (many, None) => {
                let versions: Vec<&str> = many.iter().map(|sim| sim.version.as_str()).collect();
                Err(EgtaError::Validation(format!(
                    "simulator {name} has multiple versions: {}",
                    versions.join(", ")
                )))
            }
        }
    }

    pub fn get_generic_schedulers(&self) -> Result<Vec<SchedulerInfo>> {
        let list: SchedulerList =
            self.fetch(Method::GET, Route::Api, "generic_schedulers", json!({}))?;
        Ok(list.generic_schedulers)
    }

    pub fn get_scheduler(&self, id: u64) -> Scheduler {
        Scheduler::new(self.clone(), id)
    }

    pub fn get_scheduler_by_name(&self, name: &str) -> Result<Scheduler> {
        self.get_generic_schedulers()?
            .into_iter()
            .find(|sched| sched.name == name)
            .map(|sched| self.get_scheduler(sched.id))
            .ok_or_else(|| EgtaError::NotFound(format!("generic scheduler {name}")))
    }

    /// Creates a generic scheduler. Its configuration is the simulator's
    /// defaults overlaid with `params.configuration`.
    pub fn create_generic_scheduler(
        &self,
        simulator_id: u64,
        params: &SchedulerParams,
    ) -> Result<Scheduler> {
        let configuration = self.merged_configuration(simulator_id, &params.configuration)?;
        let scheduler = NewScheduler {
            simulator_id,
            name: &params.name,
            active: params.active,
            process_memory: params.process_memory,
            size: params.size,
            time_per_observation: params.time_per_observation,
            observations_per_simulation: params.observations_per_simulation,
            nodes: params.nodes,
            default_observation_requirement: 0,
            configuration: &configuration,
        };
        let created: SchedulerInfo = self.fetch(
            Method::POST,
            Route::Api,
            "generic_schedulers",
            json!({ "scheduler": scheduler }),
        )?;
        info!(scheduler = created.id, name = %created.name, "created generic scheduler");
        Ok(self.get_scheduler(created.id))
    }

    pub fn get_games(&self) -> Result<Vec<GameSummary>> {
        let list: GameList = self.fetch(Method::GET, Route::Api, "games", json!({}))?;
        Ok(list.games)
    }

    pub fn get_games_page(&self, request: &PageRequest) -> Result<Vec<GameSummary>> {
        if request.page == 0 || request.per_page == 0 {
            return Err(EgtaError::Validation(
                "page and per_page start at 1".to_string(),
            ));
        }
        let list: GameList = self.fetch(
            Method::GET,
            Route::Api,
            "games",
            request.params(request.page),
        )?;
        Ok(list.games)
    }

    /// Walks the games listing page by page, starting at `request.page`.
    pub fn iter_games(&self, request: PageRequest) -> Result<Pages<GameSummary>> {
        if request.page == 0 || request.per_page == 0 {
            return Err(EgtaError::Validation(
                "page and per_page start at 1".to_string(),
            ));
        }
        let client = self.clone();
        let first = request.page;
        Ok(Pages::new(first, move |page| {
            let list: GameList =
                client.fetch(Method::GET, Route::Api, "games", request.params(page))?;
            Ok(list.games)
        }))
    }

    pub fn get_game(&self, id: u64) -> Game {
        Game::new(self.clone(), id)
    }

    pub fn get_game_by_name(&self, name: &str) -> Result<Game> {
        self.get_games()?
            .into_iter()
            .find(|game| game.name == name)
            .map(|game| self.get_game(game.id))
            .ok_or_else(|| EgtaError::NotFound(format!("game {name}")))
    }

    /// Creates a game. Game creation is only exposed by the site, which
    /// answers with the new game's page.
    pub fn create_game(
        &self,
        simulator_id: u64,
        name: &str,
        size: u32,
        configuration: &Configuration,
    ) -> Result<Game> {
        let configuration = self.merged_configuration(simulator_id, configuration)?;
        let body = json!({
            "game": {"name": name, "size": size},
            "selector": {"simulator_id": simulator_id, "configuration": configuration},
        });
        let page = self.send(Method::POST, Route::Site, "games", body)?;
        let id = html::game_id(&page).ok_or_else(|| {
            EgtaError::UnexpectedBody(format!("no game id in response to creating {name}"))
        })?;
        info!(game = id, name, "created game");
        Ok(self.get_game(id))
    }

    /// Returns the game called `name`, creating it first if it does not exist.
    pub fn create_or_get_game(
        &self,
        simulator_id: u64,
        name: &str,
        size: u32,
        configuration: &Configuration,
    ) -> Result<Game> {
        match self.get_game_by_name(name) {
            Ok(game) => Ok(game),
            Err(err) if err.is_not_found() => {
                self.create_game(simulator_id, name, size, configuration)
            }
            Err(err) => Err(err),
        }
    }

    /// Creates a game that is destroyed when the returned guard drops.
    pub fn create_temp_game(
        &self,
        simulator_id: u64,
        name: &str,
        size: u32,
        configuration: &Configuration,
    ) -> Result<TempGame> {
        self.create_game(simulator_id, name, size, configuration)
            .map(TempGame::new)
    }

    pub fn get_profile(&self, id: u64) -> Profile {
        Profile::new(self.clone(), id)
    }

    /// Simulations, most recent job first unless the query says otherwise.
    pub fn get_simulations(&self, query: SimulationQuery) -> Result<Pages<SimulationRow>> {
        if query.page_start == 0 {
            return Err(EgtaError::Validation("page_start starts at 1".to_string()));
        }
        let client = self.clone();
        let direction = if query.ascending {
            Direction::Asc
        } else {
            Direction::Desc
        };
        Ok(Pages::new(query.page_start, move |page| {
            let params = json!({
                "direction": direction.as_str(),
                "sort": query.column.field(),
                "page": page,
            });
            let body = client.send(Method::GET, Route::Site, "simulations", params)?;
            html::table_rows(&body)
                .into_iter()
                .map(parse_simulation_row)
                .collect()
        }))
    }

    pub fn get_simulation(&self, folder: u64) -> Result<SimulationDetail> {
        let body = self.send(
            Method::GET,
            Route::Site,
            &format!("simulations/{folder}"),
            json!({}),
        )?;
        let fields: std::collections::BTreeMap<String, String> =
            html::detail_fields(&body, "show_for simulation")
                .into_iter()
                .map(|(key, value)| (key.to_lowercase().replace(' ', "_"), value))
                .collect();
        let field = |key: &str| {
            fields
                .get(key)
                .cloned()
                .ok_or_else(|| EgtaError::UnexpectedBody(format!("simulation page lacks {key}")))
        };
        Ok(SimulationDetail {
            folder_number: parse_number(&field("folder_number")?)?,
            job: parse_optional_number(&field("job")?)?,
            profile: field("profile")?,
            simulator_fullname: field("simulator_fullname")?,
            size: parse_number(&field("size")?)?,
            state: field("state")?,
            error_message: fields.get("error_message").cloned().unwrap_or_default(),
        })
    }

    fn merged_configuration(
        &self,
        simulator_id: u64,
        overrides: &Configuration,
    ) -> Result<Configuration> {
        let mut configuration = self.get_simulator(simulator_id).get_info()?.configuration;
        configuration.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(configuration)
    }
}

fn parse_simulation_row(cells: Vec<String>) -> Result<SimulationRow> {
    let [state, profile, simulator, folder, job]: [String; 5] =
        cells.try_into().map_err(|cells: Vec<String>| {
            EgtaError::UnexpectedBody(format!(
                "simulation row has {} cells, expected 5",
                cells.len()
            ))
        })?;
    Ok(SimulationRow {
        state,
        profile,
        simulator,
        folder: parse_number(&folder)?,
        job: parse_optional_number(&job)?,
    })
}

fn parse_number<T: std::str::FromStr>(text: &str) -> Result<T> {
    text.trim()
        .parse()
        .map_err(|_| EgtaError::UnexpectedBody(format!("expected a number, got {text:?}")))
}

/// The service prints `N/A` for missing numbers.
fn parse_optional_number(text: &str) -> Result<Option<u64>> {
    if text.trim().eq_ignore_ascii_case("n/a") {
        Ok(None)
    } else {
        parse_number(text).map(Some)
    }
}
