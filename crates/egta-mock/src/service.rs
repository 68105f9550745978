use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::{MockError, MockResult};
use crate::render::{self, Granularity};
use crate::request::{MockMethod, MockRequest, MockResponse, Params};
use crate::store::{Configuration, NewScheduler, SchedulerChanges, SimulationRecord, Store};

/// Rows per page of the simulations table.
pub const SIMULATIONS_PAGE_SIZE: usize = 25;

#[derive(Debug, Default)]
struct Faults {
    /// Status every request answers with while set.
    status: Option<u16>,
    /// Requests left to fail; `None` fails until cleared.
    remaining: Option<u32>,
    invalid_games: bool,
    latency: Duration,
}

/// The mock's state and request router. Thread safe; share it behind an `Arc`.
#[derive(Debug, Default)]
pub struct MockService {
    store: parking_lot::Mutex<Store>,
    faults: parking_lot::Mutex<Faults>,
    requests: AtomicU64,
    auth_token: Option<String>,
}

impl MockService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects requests whose `auth_token` differs from `token` with 401.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Registers a simulator. The live API cannot create simulators, so
    /// tests seed them here.
    pub fn create_simulator(
        &self,
        name: &str,
        version: &str,
        configuration: Configuration,
    ) -> MockResult<u64> {
        let id = self.store.lock().create_simulator(name, version, configuration)?;
        info!(simulator = id, name, version, "seeded simulator");
        Ok(id)
    }

    /// Adds `role` with `strategies` to a seeded simulator.
    pub fn add_simulator_role(&self, simulator_id: u64, role: &str, strategies: &[&str]) -> MockResult<()> {
        let mut store = self.store.lock();
        store.simulator_add_role(simulator_id, role)?;
        for strategy in strategies {
            store.simulator_add_strategy(simulator_id, role, strategy)?;
        }
        Ok(())
    }

    /// Answers every request, or only the next `count`, with `status`.
    pub fn fail_requests(&self, status: u16, count: Option<u32>) {
        let mut faults = self.faults.lock();
        faults.status = Some(status);
        faults.remaining = count;
    }

    pub fn clear_failures(&self) {
        let mut faults = self.faults.lock();
        faults.status = None;
        faults.remaining = None;
    }

    /// Makes the games listing return entries the client cannot decode.
    pub fn set_invalid_games(&self, invalid: bool) {
        self.faults.lock().invalid_games = invalid;
    }

    /// Delay applied before answering each request.
    pub fn set_latency(&self, latency: Duration) {
        self.faults.lock().latency = latency;
    }

    /// Requests received so far, failed ones included.
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn reset_request_count(&self) {
        self.requests.store(0, Ordering::SeqCst);
    }

    pub fn handle(&self, request: &MockRequest) -> MockResponse {
        let seq = self.requests.fetch_add(1, Ordering::SeqCst) + 1;
        let latency = self.faults.lock().latency;
        if !latency.is_zero() {
            thread::sleep(latency);
        }
        let response = match self.dispatch(request) {
            Ok(response) => response,
            Err(err) => MockResponse::error(&err),
        };
        debug!(
            seq,
            method = ?request.method,
            path = %request.path,
            status = response.status,
            "mock request"
        );
        response
    }

    fn dispatch(&self, request: &MockRequest) -> MockResult<MockResponse> {
        self.injected_failure()?;
        if let Some(token) = &self.auth_token {
            if request.params.get("auth_token") != Some(token.as_str()) {
                return Err(MockError::Unauthorized);
            }
        }
        let segments = request.segments();
        match segments.as_slice() {
            ["api", "v3", rest @ ..] => self.api(request.method, rest, &request.params),
            rest => self.site(request.method, rest, &request.params),
        }
    }

    fn injected_failure(&self) -> MockResult<()> {
        let mut faults = self.faults.lock();
        let Some(status) = faults.status else {
            return Ok(());
        };
        match faults.remaining {
            Some(0) => {
                faults.status = None;
                faults.remaining = None;
                Ok(())
            }
            Some(left) => {
                faults.remaining = Some(left - 1);
                if left == 1 {
                    faults.status = None;
                    faults.remaining = None;
                }
                Err(MockError::Injected(status))
            }
            None => Err(MockError::Injected(status)),
        }
    }

    fn api(&self, method: MockMethod, path: &[&str], params: &Params) -> MockResult<MockResponse> {
        use MockMethod::{Delete, Get, Post, Put};

        let mut store = self.store.lock();
        let ok = |value: Value| Ok(MockResponse::json(200, &value));
        match (method, path) {
            (Get, ["simulators"]) => {
                let sims: Vec<Value> = store.simulators.values().map(render::simulator_summary).collect();
                ok(json!({ "simulators": sims }))
            }
            (Get, ["simulators", id]) => ok(render::simulator_info(store.simulators.get(parse_id(id)?)?)),
            (Post, ["simulators", id, action]) => {
                let id = parse_id(id)?;
                let role = params.require("role")?;
                match *action {
                    "add_role" => store.simulator_add_role(id, role)?,
                    "remove_role" => store.simulator_remove_role(id, role)?,
                    "add_strategy" => store.simulator_add_strategy(id, role, params.require("strategy")?)?,
                    "remove_strategy" => {
                        store.simulator_remove_strategy(id, role, params.require("strategy")?)?
                    }
                    other => return Err(MockError::NotFound(format!("action {other}"))),
                }
                Ok(MockResponse::empty())
            }

            (Get, ["generic_schedulers"]) => {
                let scheds: Vec<Value> = store.schedulers.values().map(render::scheduler_info).collect();
                ok(json!({ "generic_schedulers": scheds }))
            }
            (Post, ["generic_schedulers"]) => {
                let id = store.create_scheduler(new_scheduler(params)?)?;
                Ok(MockResponse::json(201, &render::scheduler_info(store.schedulers.get(id)?)))
            }
            (Get, ["schedulers" | "generic_schedulers", id]) => {
                let sched = store.schedulers.get(parse_id(id)?)?;
                match params.get("granularity") {
                    Some("with_requirements") => ok(render::scheduler_requirements(&store, sched)?),
                    None | Some("structure") => ok(render::scheduler_info(sched)),
                    Some(other) => Err(MockError::Unprocessable(format!("unknown granularity {other}"))),
                }
            }
            (Put, ["generic_schedulers", id]) => {
                store.update_scheduler(parse_id(id)?, scheduler_changes(params)?)?;
                Ok(MockResponse::empty())
            }
            (Delete, ["generic_schedulers", id]) => {
                store.destroy_scheduler(parse_id(id)?)?;
                Ok(MockResponse::empty())
            }
            (Post, ["generic_schedulers", id, action]) => {
                let id = parse_id(id)?;
                match *action {
                    "add_role" => {
                        store.scheduler_add_role(id, params.require("role")?, params.require_number("count")?)?
                    }
                    "remove_role" => store.scheduler_remove_role(id, params.require("role")?)?,
                    "add_profile" => {
                        let profile = store.scheduler_add_profile(
                            id,
                            params.require("assignment")?,
                            params.require_number("count")?,
                        )?;
                        let view = render::profile_info(store.profiles.get(profile)?, Granularity::Structure);
                        return ok(view);
                    }
                    "remove_profile" => {
                        store.scheduler_remove_profile(id, params.require_number("profile_id")?)?
                    }
                    other => return Err(MockError::NotFound(format!("action {other}"))),
                }
                Ok(MockResponse::empty())
            }

            (Get, ["games"]) => {
                if self.faults.lock().invalid_games {
                    return ok(json!({ "games": [{ "id": "not-a-number", "name": null }] }));
                }
                ok(json!({ "games": games_listing(&store, params)? }))
            }
            (Delete, ["games", id]) => {
                store.destroy_game(parse_id(id)?)?;
                Ok(MockResponse::empty())
            }
            (Post, ["games", id, action]) => {
                let id = parse_id(id)?;
                let role = params.require("role")?;
                match *action {
                    "add_role" => store.game_add_role(id, role, params.require_number("count")?)?,
                    "remove_role" => store.game_remove_role(id, role)?,
                    "add_strategy" => store.game_add_strategy(id, role, params.require("strategy")?)?,
                    "remove_strategy" => store.game_remove_strategy(id, role, params.require("strategy")?)?,
                    other => return Err(MockError::NotFound(format!("action {other}"))),
                }
                Ok(MockResponse::empty())
            }

            (Get, ["profiles", id]) => {
                let granularity = granularity(params)?;
                ok(render::profile_info(store.profiles.get(parse_id(id)?)?, granularity))
            }

            _ => Err(MockError::NotFound(format!("route {method:?} /api/v3/{}", path.join("/")))),
        }
    }

    /// Routes the live service only serves from its web front end.
    fn site(&self, method: MockMethod, path: &[&str], params: &Params) -> MockResult<MockResponse> {
        let mut store = self.store.lock();
        match (method, path) {
            (MockMethod::Post, ["games"]) => {
                let simulator_id = params.require_number("selector[simulator_id]")?;
                let name = params.require("game[name]")?;
                let size = params.require_number("game[size]")?;
                let configuration = params.nested("selector[configuration]");
                let id = store.create_game(simulator_id, name, size, configuration)?;
                info!(game = id, name, "created game");
                Ok(MockResponse::html(render::game_page(store.games.get(id)?)))
            }
            (MockMethod::Get, ["games", id]) => {
                let granularity = granularity(params)?;
                let game = store.games.get(parse_id(id)?)?;
                let info = render::game_info(&store, game, granularity)?;
                let info = if granularity == Granularity::Structure {
                    // the live service sends this one as a JSON-encoded string
                    Value::String(info.to_string())
                } else {
                    info
                };
                Ok(MockResponse::json(200, &info))
            }
            (MockMethod::Get, ["simulations"]) => {
                let rows = simulations_listing(&store, params)?;
                Ok(MockResponse::html(render::simulations_page(&rows)))
            }
            (MockMethod::Get, ["simulations", id]) => {
                let sim = store.simulations.get(parse_id(id)?)?;
                Ok(MockResponse::html(render::simulation_page(sim)))
            }
            _ => Err(MockError::NotFound(format!("route {method:?} /{}", path.join("/")))),
        }
    }
}

fn parse_id(raw: &str) -> MockResult<u64> {
    raw.parse()
        .map_err(|_| MockError::NotFound(format!("resource {raw}")))
}

fn granularity(params: &Params) -> MockResult<Granularity> {
    params.get("granularity").unwrap_or("structure").parse()
}

fn new_scheduler(params: &Params) -> MockResult<NewScheduler> {
    let field = |name: &str| format!("scheduler[{name}]");
    Ok(NewScheduler {
        simulator_id: params.require_number(&field("simulator_id"))?,
        name: params.require(&field("name"))?.to_string(),
        active: params.flag(&field("active"))?.unwrap_or(false),
        process_memory: params.number(&field("process_memory"))?.unwrap_or(0),
        size: params.require_number(&field("size"))?,
        time_per_observation: params.number(&field("time_per_observation"))?.unwrap_or(0),
        observations_per_simulation: params.number(&field("observations_per_simulation"))?.unwrap_or(1),
        nodes: params.number(&field("nodes"))?.unwrap_or(1),
        default_observation_requirement: params
            .number(&field("default_observation_requirement"))?
            .unwrap_or(0),
        configuration: params.nested("scheduler[configuration]"),
    })
}

fn scheduler_changes(params: &Params) -> MockResult<SchedulerChanges> {
    let field = |name: &str| format!("scheduler[{name}]");
    Ok(SchedulerChanges {
        name: params.get(&field("name")).map(str::to_string),
        active: params.flag(&field("active"))?,
        process_memory: params.number(&field("process_memory"))?,
        size: params.number(&field("size"))?,
        time_per_observation: params.number(&field("time_per_observation"))?,
        observations_per_simulation: params.number(&field("observations_per_simulation"))?,
        nodes: params.number(&field("nodes"))?,
        default_observation_requirement: params.number(&field("default_observation_requirement"))?,
    })
}

fn descending(params: &Params) -> MockResult<bool> {
    match params.get("direction") {
        None => Ok(false),
        Some(direction) if direction.eq_ignore_ascii_case("asc") => Ok(false),
        Some(direction) if direction.eq_ignore_ascii_case("desc") => Ok(true),
        Some(other) => Err(MockError::Unprocessable(format!("unknown direction {other}"))),
    }
}

/// Games sorted by `sort`/`direction`; one page when `page` is given.
fn games_listing(store: &Store, params: &Params) -> MockResult<Vec<Value>> {
    let mut games: Vec<_> = store.games.values().collect();
    match params.get("sort").unwrap_or("id") {
        "id" => {}
        "name" => games.sort_by(|a, b| a.name.cmp(&b.name)),
        "size" => games.sort_by_key(|game| game.size),
        "created_at" => games.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        other => return Err(MockError::Unprocessable(format!("cannot sort games by {other}"))),
    }
    if descending(params)? {
        games.reverse();
    }
    if let Some(page) = params.number::<usize>("page")? {
        let per_page = params.number::<usize>("per_page")?.unwrap_or(25);
        if page == 0 || per_page == 0 {
            return Err(MockError::Unprocessable("page and per_page start at 1".to_string()));
        }
        games = games
            .into_iter()
            .skip((page - 1).saturating_mul(per_page))
            .take(per_page)
            .collect();
    }
    Ok(games.into_iter().map(render::game_summary).collect())
}

fn simulations_listing<'a>(store: &'a Store, params: &Params) -> MockResult<Vec<&'a SimulationRecord>> {
    let mut rows: Vec<&SimulationRecord> = store.simulations.values().collect();
    let sort = params.get("sort").unwrap_or("job_id");
    match sort {
        "job_id" => rows.sort_by_key(|sim| sim.job),
        "id" => {}
        "state" => rows.sort_by(|a, b| a.state.cmp(&b.state)),
        "profiles.assignment" => rows.sort_by(|a, b| a.assignment.cmp(&b.assignment)),
        "simulator_fullname" => rows.sort_by(|a, b| a.simulator_fullname.cmp(&b.simulator_fullname)),
        other => return Err(MockError::Unprocessable(format!("cannot sort simulations by {other}"))),
    }
    let descending = match params.get("direction") {
        None => true,
        Some(_) => descending(params)?,
    };
    if descending {
        rows.reverse();
    }
    let page = params.number::<usize>("page")?.unwrap_or(1);
    if page == 0 {
        return Err(MockError::Unprocessable("page starts at 1".to_string()));
    }
    Ok(rows
        .into_iter()
        .skip((page - 1).saturating_mul(SIMULATIONS_PAGE_SIZE))
        .take(SIMULATIONS_PAGE_SIZE)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn get(service: &MockService, target: &str) -> MockResponse {
        service.handle(&MockRequest::new(MockMethod::Get, target, b""))
    }

    fn post(service: &MockService, target: &str, body: &str) -> MockResponse {
        service.handle(&MockRequest::new(MockMethod::Post, target, body.as_bytes()))
    }

    fn seeded() -> MockService {
        let service = MockService::new();
        let sim = service
            .create_simulator("sim", "1", Configuration::new())
            .expect("seed simulator");
        service.add_simulator_role(sim, "a", &["1", "2"]).expect("role a");
        service.add_simulator_role(sim, "b", &["5"]).expect("role b");
        service
    }

    #[test]
    fn lists_simulators_from_zero() {
        let service = seeded();
        let response = get(&service, "/api/v3/simulators");
        assert_eq!(response.status, 200);
        let body: Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["simulators"][0]["id"], 0);
        assert_eq!(body["simulators"][0]["name"], "sim");
    }

    #[test]
    fn unknown_ids_and_routes_are_404() {
        let service = seeded();
        assert_eq!(get(&service, "/api/v3/simulators/9.json").status, 404);
        assert_eq!(get(&service, "/api/v3/nothing").status, 404);
        assert_eq!(get(&service, "/games/0.json").status, 404);
    }

    #[test]
    fn injected_failures_count_down() {
        let service = seeded();
        service.fail_requests(504, Some(2));
        assert_eq!(get(&service, "/api/v3/simulators").status, 504);
        assert_eq!(get(&service, "/api/v3/simulators").status, 504);
        assert_eq!(get(&service, "/api/v3/simulators").status, 200);
        assert_eq!(service.request_count(), 3);
        service.reset_request_count();
        assert_eq!(service.request_count(), 0);
    }

    #[test]
    fn auth_token_is_enforced() {
        let service = seeded().with_auth_token("secret");
        assert_eq!(get(&service, "/api/v3/simulators").status, 401);
        assert_eq!(get(&service, "/api/v3/simulators?auth_token=secret").status, 200);
    }

    #[test]
    fn structure_is_double_encoded() {
        let service = seeded();
        let created = post(
            &service,
            "/games",
            "game%5Bname%5D=g&game%5Bsize%5D=2&selector%5Bsimulator_id%5D=0",
        );
        assert!(created.body.contains("id=\"game_0\""));
        let structure: Value = serde_json::from_str(&get(&service, "/games/0.json").body).unwrap();
        let inner: Value = serde_json::from_str(structure.as_str().unwrap()).unwrap();
        assert_eq!(inner["name"], "g");
        let summary: Value =
            serde_json::from_str(&get(&service, "/games/0.json?granularity=summary").body).unwrap();
        assert!(summary["profiles"].as_array().unwrap().is_empty());
    }

    #[test]
    fn duplicate_games_conflict() {
        let service = seeded();
        let body = "game%5Bname%5D=g&game%5Bsize%5D=2&selector%5Bsimulator_id%5D=0";
        assert_eq!(post(&service, "/games", body).status, 200);
        assert_eq!(post(&service, "/games", body).status, 409);
    }
}
