mod cli;
mod config;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use egta_client::{
    Direction, EgtaClient, Granularity, PageRequest, SimulationColumn, SimulationQuery,
};
use egta_mock::{MockServer, MockService};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, ConnectionArgs, GameCommand, ProfileCommand, SchedCommand, SimCommand};
use crate::config::Settings;

fn main() -> Result<()> {
    // a missing .env is fine
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Mock {
            listen,
            simulators,
            require_token,
        } => run_mock(listen, &simulators, require_token),
        command => {
            let client = connect(&cli.connection)?;
            let result = run(&client, command);
            client.close();
            result
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn connect(args: &ConnectionArgs) -> Result<EgtaClient> {
    let mut settings = Settings::load()?;
    if args.auth_token.is_some() {
        settings.auth_token = args.auth_token.clone();
    }
    if args.domain.is_some() {
        settings.domain = args.domain.clone();
        settings.base_url = None;
    }
    if args.base_url.is_some() {
        settings.base_url = args.base_url.clone();
    }
    if args.retries.is_some() {
        settings.retries = args.retries;
    }
    let config = settings.client_config()?;
    EgtaClient::new(config).context("failed to create EGTA client")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(client: &EgtaClient, command: Command) -> Result<()> {
    match command {
        Command::Sim(SimCommand::List) => print_json(&client.get_simulators()?),
        Command::Sim(SimCommand::Info { id }) => print_json(&client.get_simulator(id).get_info()?),
        Command::Sim(SimCommand::Find { name, version }) => {
            let sim = client.get_simulator_by_name(&name, version.as_deref())?;
            print_json(&sim.get_info()?)
        }

        Command::Sched(SchedCommand::List) => print_json(&client.get_generic_schedulers()?),
        Command::Sched(SchedCommand::Info { id }) => print_json(&client.get_scheduler(id).get_info()?),
        Command::Sched(SchedCommand::Requirements { id }) => {
            print_json(&client.get_scheduler(id).get_requirements()?)
        }
        Command::Sched(SchedCommand::Activate { id }) => {
            client.get_scheduler(id).activate()?;
            info!(scheduler = id, "activated");
            Ok(())
        }
        Command::Sched(SchedCommand::Deactivate { id }) => {
            client.get_scheduler(id).deactivate()?;
            info!(scheduler = id, "deactivated");
            Ok(())
        }

        Command::Game(GameCommand::List {
            page,
            per_page,
            sort,
            desc,
        }) => {
            let games = match page {
                Some(page) => {
                    let direction = if desc { Direction::Desc } else { Direction::Asc };
                    let mut request = PageRequest::new(page, per_page);
                    if let Some(sort) = sort {
                        request = request.sorted_by(sort, direction);
                    } else {
                        request.direction = direction;
                    }
                    client.get_games_page(&request)?
                }
                None => client.get_games()?,
            };
            print_json(&games)
        }
        Command::Game(GameCommand::Info { id, granularity }) => {
            let granularity: Granularity = granularity.parse()?;
            print_json(&client.get_game(id).get_info(granularity)?)
        }

        Command::Profile(ProfileCommand::Info { id, granularity }) => {
            let granularity: Granularity = granularity.parse()?;
            print_json(&client.get_profile(id).get_info(granularity)?)
        }

        Command::Simulations {
            folder: Some(folder),
            ..
        } => print_json(&client.get_simulation(folder)?),
        Command::Simulations {
            folder: None,
            page,
            asc,
            column,
            limit,
        } => {
            let query = SimulationQuery {
                page_start: page,
                ascending: asc,
                column: column.parse::<SimulationColumn>()?,
            };
            let rows = client
                .get_simulations(query)?
                .take(limit.unwrap_or(usize::MAX))
                .collect::<egta_client::Result<Vec<_>>>()?;
            print_json(&rows)
        }

        Command::Mock { .. } => bail!("mock is handled before connecting"),
    }
}

fn run_mock(listen: std::net::SocketAddr, simulators: &[String], require_token: Option<String>) -> Result<()> {
    let mut service = MockService::new();
    if let Some(token) = require_token {
        service = service.with_auth_token(token);
    }
    for spec in simulators {
        let (name, version) = spec
            .split_once(':')
            .ok_or_else(|| anyhow!("simulator {spec:?} is not NAME:VERSION"))?;
        service.create_simulator(name, version, Default::default())?;
    }
    let server = MockServer::bind(listen, service)
        .with_context(|| format!("failed to bind mock server to {listen}"))?;
    println!("EGTA mock listening on {}", server.base_url());
    server.join();
    Ok(())
}
