//! Simulation listings scraped from the site pages.

mod common;

use egta_client::models::SimulationRow;
use egta_client::{EgtaClient, SchedulerParams, SimulationColumn, SimulationQuery};

fn rows(client: &EgtaClient, query: SimulationQuery) -> Vec<SimulationRow> {
    client
        .get_simulations(query)
        .expect("query")
        .collect::<Result<_, _>>()
        .expect("every page")
}

fn sorted_by(client: &EgtaClient, column: SimulationColumn, ascending: bool) -> Vec<SimulationRow> {
    rows(
        client,
        SimulationQuery {
            column,
            ascending,
            ..SimulationQuery::default()
        },
    )
}

fn is_sorted<T: PartialOrd>(values: &[T], ascending: bool) -> bool {
    values.windows(2).all(|pair| {
        if ascending {
            pair[0] <= pair[1]
        } else {
            pair[0] >= pair[1]
        }
    })
}

fn active_scheduler(
    client: &EgtaClient,
    simulator_id: u64,
    name: &str,
    roles: &[(&str, u32)],
) -> egta_client::Scheduler {
    let size = roles.iter().map(|(_, count)| count).sum();
    let mut params = SchedulerParams::new(name, size);
    params.active = true;
    let sched = client
        .create_generic_scheduler(simulator_id, &params)
        .expect("scheduler");
    for (role, count) in roles {
        sched.add_role(role, *count).expect("role");
    }
    sched
}

#[test]
fn lists_and_describes_simulations() {
    let (server, client) = common::start();
    assert!(rows(&client, SimulationQuery::default()).is_empty());

    let sim = common::seed_simulator(&server, "sim", "1");
    let sched = active_scheduler(&client, sim, "sched1", &[("a", 2), ("b", 2)]);
    sched.add_profile("a: 2 1; b: 1 5, 1 6", 2).expect("profile");

    let listed = rows(&client, SimulationQuery::default());
    assert_eq!(listed.len(), 2);
    // newest job first
    assert!(listed[0].job > listed[1].job);
    let newest = &listed[0];
    assert_eq!(newest.state, "complete");
    assert_eq!(newest.profile, "a: 2 1; b: 1 5, 1 6");
    assert_eq!(newest.simulator, "sim-1");

    let detail = client.get_simulation(newest.folder).expect("detail");
    assert_eq!(detail.folder_number, newest.folder);
    assert_eq!(detail.job, newest.job);
    assert_eq!(detail.profile, newest.profile);
    assert_eq!(detail.simulator_fullname, "sim-1");
    assert_eq!(detail.size, 4);
    assert_eq!(detail.state, "complete");
    assert!(detail.error_message.is_empty());

    assert!(client.get_simulation(99).unwrap_err().is_not_found());
}

#[test]
fn sorts_by_every_column() {
    let (server, client) = common::start();
    let sim1 = common::seed_simulator(&server, "sim", "1");
    active_scheduler(&client, sim1, "sched1", &[("a", 2), ("b", 2)])
        .add_profile("a: 2 1; b: 1 5, 1 6", 2)
        .expect("profile");
    let sim2 = common::seed_simulator(&server, "other", "1");
    active_scheduler(&client, sim2, "sched2", &[("a", 2), ("b", 3)])
        .add_profile("a: 2 1; b: 2 5, 1 6", 3)
        .expect("profile");

    assert_eq!(rows(&client, SimulationQuery::default()).len(), 5);

    for ascending in [false, true] {
        let simulators: Vec<String> = sorted_by(&client, SimulationColumn::Simulator, ascending)
            .into_iter()
            .map(|row| row.simulator)
            .collect();
        assert!(is_sorted(&simulators, ascending));

        let folders: Vec<u64> = sorted_by(&client, SimulationColumn::Folder, ascending)
            .into_iter()
            .map(|row| row.folder)
            .collect();
        assert!(is_sorted(&folders, ascending));

        let profiles: Vec<String> = sorted_by(&client, SimulationColumn::Profile, ascending)
            .into_iter()
            .map(|row| row.profile)
            .collect();
        assert!(is_sorted(&profiles, ascending));

        let states: Vec<String> = sorted_by(&client, SimulationColumn::State, ascending)
            .into_iter()
            .map(|row| row.state)
            .collect();
        assert!(is_sorted(&states, ascending));

        let jobs: Vec<Option<u64>> = sorted_by(&client, SimulationColumn::Job, ascending)
            .into_iter()
            .map(|row| row.job)
            .collect();
        assert!(is_sorted(&jobs, ascending));
    }
}

#[test]
fn pages_start_where_asked() {
    let (server, client) = common::start();
    let sim = common::seed_simulator(&server, "sim", "1");
    let sched = active_scheduler(&client, sim, "sched", &[("a", 2), ("b", 3)]);
    sched.add_profile("a: 2 1; b: 2 5, 1 6", 3).expect("profile");

    let from_page_two = SimulationQuery {
        page_start: 2,
        ..SimulationQuery::default()
    };
    assert!(rows(&client, from_page_two).is_empty());

    sched.add_profile("a: 2 1; b: 1 5, 2 6", 22).expect("profile");
    assert_eq!(rows(&client, SimulationQuery::default()).len(), 25);
    assert_eq!(rows(&client, from_page_two).len(), 0);

    sched.add_profile("a: 2 1; b: 3 5", 1).expect("profile");
    assert_eq!(rows(&client, from_page_two).len(), 1);

    let zero = SimulationQuery {
        page_start: 0,
        ..SimulationQuery::default()
    };
    assert!(client.get_simulations(zero).err().is_some_and(|err| err.is_validation()));
}
