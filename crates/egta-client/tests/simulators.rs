//! Simulator lookups and role/strategy edits against the mock service.

mod common;

use std::collections::BTreeSet;

use egta_client::models::RoleStrategies;

fn roles(pairs: &[(&str, &[&str])]) -> RoleStrategies {
    pairs
        .iter()
        .map(|(role, strategies)| {
            (
                role.to_string(),
                strategies.iter().map(|s| s.to_string()).collect(),
            )
        })
        .collect()
}

#[test]
fn finds_simulators_by_id_and_name() {
    let (server, client) = common::start();
    server.create_simulator("foo", "1", Default::default()).expect("foo");
    server.create_simulator("bar", "1", Default::default()).expect("bar 1");
    server.create_simulator("bar", "2", Default::default()).expect("bar 2");
    assert!(server.create_simulator("bar", "2", Default::default()).is_err());

    let ids: BTreeSet<u64> = client
        .get_simulators()
        .expect("list")
        .into_iter()
        .map(|sim| sim.id)
        .collect();
    assert_eq!(ids, BTreeSet::from([0, 1, 2]));

    assert_eq!(client.get_simulator_by_name("foo", None).expect("foo").id(), 0);
    assert_eq!(client.get_simulator_by_name("foo", Some("1")).expect("foo 1").id(), 0);
    assert_eq!(client.get_simulator_by_name("bar", Some("1")).expect("bar 1").id(), 1);
    assert_eq!(client.get_simulator_by_name("bar", Some("2")).expect("bar 2").id(), 2);
    assert_eq!(client.get_simulator(2).get_info().expect("info").fullname(), "bar-2");

    assert!(client.get_simulator_by_name("bar", None).unwrap_err().is_validation());
    assert!(client.get_simulator_by_name("baz", None).unwrap_err().is_not_found());
    assert!(client.get_simulator(3).get_info().unwrap_err().is_not_found());
}

#[test]
fn info_carries_configuration_and_url() {
    let (server, client) = common::start();
    let id = common::seed_simulator(&server, "sim", "1");
    let info = client.get_simulator(id).get_info().expect("info");
    assert_eq!(info.name, "sim");
    assert_eq!(info.configuration.get("key").map(String::as_str), Some("value"));
    assert_eq!(info.url, format!("{}simulators/{id}", server.base_url()));
    assert!(info.source.is_object());
    assert_eq!(
        info.role_configuration,
        roles(&[("a", &["1", "2", "3", "4"]), ("b", &["5", "6", "7"])])
    );
}

#[test]
fn added_strategy_shows_up_in_info() {
    let (server, client) = common::start();
    let id = common::seed_simulator(&server, "sim", "1");
    let sim = client.get_simulator(id);

    sim.add_role("role1").expect("add role");
    sim.add_strategy("role1", "strat1").expect("add strategy");
    let info = sim.get_info().expect("info");
    assert_eq!(info.role_configuration["role1"], vec!["strat1".to_string()]);

    server.reset_request_count();
    sim.add_strategy("role1", "strat1").expect("add again");
    // only the info lookup, no second add
    assert_eq!(server.request_count(), 1);
    assert_eq!(
        sim.get_info().expect("info").role_configuration["role1"],
        vec!["strat1".to_string()]
    );

    assert!(sim.add_strategy("missing", "x").unwrap_err().is_not_found());
}

#[test]
fn bulk_edits_and_missing_roles() {
    let (server, client) = common::start();
    let id = common::seed_simulator(&server, "sim", "1");
    let sim = client.get_simulator(id);
    let before = sim.get_info().expect("info");

    sim.remove_strategy("a", "3").expect("remove strategy");
    assert_eq!(
        sim.get_info().expect("info").role_configuration,
        roles(&[("a", &["1", "2", "4"]), ("b", &["5", "6", "7"])])
    );
    // snapshots are not refreshed
    assert_eq!(before.role_configuration["a"].len(), 4);

    sim.remove_role("b").expect("remove role");
    sim.add_dict(&roles(&[("a", &["2", "3"])])).expect("add dict");
    assert_eq!(
        sim.get_info().expect("info").role_configuration,
        roles(&[("a", &["1", "2", "3", "4"])])
    );

    sim.remove_dict(&roles(&[("a", &["4", "5", "4"])])).expect("remove dict");
    assert_eq!(
        sim.get_info().expect("info").role_configuration,
        roles(&[("a", &["1", "2", "3"])])
    );

    assert!(sim.remove_dict(&roles(&[("c", &["8"])])).unwrap_err().is_not_found());
    assert!(sim.remove_role("c").unwrap_err().is_not_found());
}
