//! Generic scheduler lifecycle and profile requirements.

mod common;

use std::collections::BTreeSet;

use egta_client::{
    Granularity, Scheduler, SchedulerParams, SchedulerUpdate, Simulator, SymmetryGroup,
};

const ASSIGNMENT: &str = "a: 8 1; b: 1 5, 1 7";

fn scheduler(sim: &Simulator, name: &str, active: bool, size: u32) -> Scheduler {
    let mut params = SchedulerParams::new(name, size);
    params.active = active;
    sim.create_generic_scheduler(&params).expect("create scheduler")
}

/// `(current_count, requirement)` of every requirement on `sched`.
fn requirements(sched: &Scheduler) -> Vec<(u64, u64)> {
    sched
        .get_requirements()
        .expect("requirements")
        .scheduling_requirements
        .into_iter()
        .map(|req| (req.current_count, req.requirement))
        .collect()
}

fn scheduler_ids(client: &egta_client::EgtaClient) -> BTreeSet<u64> {
    client
        .get_generic_schedulers()
        .expect("list")
        .into_iter()
        .map(|sched| sched.id)
        .collect()
}

#[test]
fn lists_finds_and_destroys_schedulers() {
    let (server, client) = common::start();
    let id = common::seed_simulator(&server, "sim", "1");
    let sim = client.get_simulator(id);
    let scheds: Vec<Scheduler> = ["1", "2", "3", "4", "5"]
        .into_iter()
        .map(|name| scheduler(&sim, name, false, 10))
        .collect();

    let err = sim
        .create_generic_scheduler(&SchedulerParams::new("4", 10))
        .unwrap_err();
    assert!(err.is_conflict());

    assert_eq!(client.get_scheduler_by_name("3").expect("by name").id(), scheds[2].id());
    assert_eq!(scheduler_ids(&client), BTreeSet::from([0, 1, 2, 3, 4]));

    scheds[1].destroy().expect("destroy 2");
    scheds[2].destroy().expect("destroy 3");
    assert_eq!(scheduler_ids(&client), BTreeSet::from([0, 3, 4]));

    assert!(client.get_scheduler(5).get_info().unwrap_err().is_not_found());
    assert!(client.get_scheduler(2).get_info().unwrap_err().is_not_found());
    assert!(client.get_scheduler_by_name("3").unwrap_err().is_not_found());
}

#[test]
fn info_updates_and_requirements() {
    let (server, client) = common::start();
    let id = common::seed_simulator(&server, "sim", "1");
    let sim = client.get_simulator(id);
    let mut params = SchedulerParams::new("sched", 10);
    params.active = true;
    params.configuration.insert("extra".into(), "1".into());
    let sched = sim.create_generic_scheduler(&params).expect("create");

    let info = sched.get_info().expect("info");
    assert!(info.active);
    assert_eq!(info.size, 10);
    assert_eq!(info.observations_per_simulation, 1);

    let reqs = sched.get_requirements().expect("requirements");
    assert_eq!(reqs.kind, "GenericScheduler");
    assert_eq!(reqs.simulator_id, id);
    assert_eq!(
        reqs.url,
        format!("{}generic_schedulers/{}", server.base_url(), sched.id())
    );
    assert_eq!(
        reqs.configuration,
        vec![
            ("extra".to_string(), "1".to_string()),
            ("key".to_string(), "value".to_string()),
        ]
    );
    assert!(reqs.scheduling_requirements.is_empty());

    sched.deactivate().expect("deactivate");
    assert!(!sched.get_info().expect("info").active);
    // earlier snapshots are not refreshed
    assert!(info.active);
    sched.activate().expect("activate");
    assert!(sched.get_info().expect("info").active);

    sched
        .update(&SchedulerUpdate {
            process_memory: Some(1),
            ..SchedulerUpdate::default()
        })
        .expect("update");
    assert_eq!(sched.get_info().expect("info").process_memory, 1);
    assert!(sched.update(&SchedulerUpdate::default()).unwrap_err().is_validation());
}

#[test]
fn roles_respect_simulator_and_size() {
    let (server, client) = common::start();
    let id = common::seed_simulator(&server, "sim", "1");
    let sched = scheduler(&client.get_simulator(id), "sched", true, 10);

    sched.add_role("a", 8).expect("add a");
    assert!(sched.add_role("a", 1).unwrap_err().is_conflict());
    assert!(sched.add_role("c", 1).unwrap_err().is_validation());
    assert!(sched.add_role("b", 3).unwrap_err().is_validation());
    sched.add_role("b", 2).expect("add b");

    sched.remove_role("b").expect("remove b");
    sched.remove_role("b").expect("remove b again");
    sched.remove_role("c").expect("remove unknown role");
}

#[test]
fn profiles_are_shared_and_scheduled() {
    let (server, client) = common::start();
    let id = common::seed_simulator(&server, "sim", "1");
    let sim = client.get_simulator(id);
    let sched1 = scheduler(&sim, "sched", true, 10);
    sched1.add_role("a", 8).expect("role a");
    sched1.add_role("b", 2).expect("role b");

    let groups = vec![
        SymmetryGroup::new("b", "7", 1),
        SymmetryGroup::new("a", "1", 8),
        SymmetryGroup::new("b", "5", 1),
    ];
    assert_eq!(egta_client::symgrps_to_assignment(&groups).expect("render"), ASSIGNMENT);

    let prof1 = sched1.add_profile(ASSIGNMENT, 3).expect("add profile");
    assert_eq!(client.get_profile(prof1.id()).get_structure().expect("structure").id, prof1.id());
    assert_eq!(sched1.add_profile_groups(&groups, 0).expect("re-add").id(), prof1.id());
    assert_eq!(requirements(&sched1), vec![(3, 3)]);

    let structure = prof1.get_structure().expect("structure");
    assert_eq!(structure.assignment, ASSIGNMENT);
    assert_eq!(structure.observations_count, 3);
    assert_eq!(structure.size, 10);
    assert_eq!(structure.role_configuration["a"], 8);
    assert_eq!(
        serde_json::to_value(&structure).expect("encode"),
        prof1.get_info(Granularity::Structure).expect("raw")
    );

    let summary = prof1.get_summary().expect("summary");
    assert_eq!(summary.observations_count, 3);
    assert_eq!(summary.symmetry_groups.len(), 3);
    assert!(summary.symmetry_groups.iter().all(|g| g.payoff.is_some()));

    let observations = prof1.get_observations().expect("observations");
    assert_eq!(observations.symmetry_groups.len(), 3);
    assert_eq!(observations.observations.len(), 3);
    assert!(observations
        .observations
        .iter()
        .all(|obs| obs.symmetry_groups.len() == 3));

    let full = prof1.get_full_data().expect("full");
    assert_eq!(full.symmetry_groups.len(), 3);
    assert_eq!(full.observations.len(), 3);
    assert!(full.observations.iter().all(|obs| obs.players.len() == 10));

    assert!("unknown".parse::<Granularity>().unwrap_err().is_validation());

    // same simulator instance, same profile
    let sched2 = scheduler(&sim, "sched2", true, 10);
    sched2.add_role("a", 8).expect("role a");
    sched2.add_role("b", 2).expect("role b");
    let prof2 = sched2.add_profile(ASSIGNMENT, 5).expect("add profile");
    assert_eq!(prof2.id(), prof1.id());
    assert_eq!(prof1.get_structure().expect("structure").observations_count, 5);
    assert_eq!(requirements(&sched2), vec![(5, 5)]);
    assert_eq!(requirements(&sched1), vec![(5, 3)]);

    sched1.remove_profile(prof1.id()).expect("remove");
    assert!(requirements(&sched1).is_empty());

    sched1.add_profile(ASSIGNMENT, 1).expect("re-add");
    assert_eq!(requirements(&sched1), vec![(5, 1)]);

    sched1.update_profile(prof1.id(), 4).expect("update by id");
    assert_eq!(requirements(&sched1), vec![(5, 4)]);

    let count = |profile: egta_client::Profile| {
        profile.get_structure().expect("structure").observations_count
    };
    assert_eq!(count(sched1.update_profile(prof1.id(), 6).expect("by id")), 6);
    assert_eq!(count(sched1.update_profile(ASSIGNMENT, 8).expect("by assignment")), 8);

    // inactive schedulers hold requirements until activated
    sched1.deactivate().expect("deactivate");
    assert_eq!(count(sched1.update_profile(groups.clone(), 9).expect("by groups")), 8);
    assert_eq!(requirements(&sched1), vec![(8, 9)]);
    sched1.activate().expect("activate");
    assert_eq!(count(prof1.clone()), 9);

    sched1.remove_all_profiles().expect("remove all");
    assert!(requirements(&sched1).is_empty());

    assert!(!requirements(&sched2).is_empty());
    sched2.remove_profile(prof2.id()).expect("remove");
    assert!(requirements(&sched2).is_empty());
}

#[test]
fn profiles_must_fit_the_scheduler() {
    let (server, client) = common::start();
    let id = common::seed_simulator(&server, "sim", "1");
    let sched = scheduler(&client.get_simulator(id), "sched", false, 4);
    sched.add_role("a", 2).expect("role a");
    sched.add_role("b", 2).expect("role b");

    assert!(sched.add_profile("a: 2 1; b: 2 9", 1).unwrap_err().is_validation());
    assert!(sched.add_profile("a: 1 1; b: 2 5", 1).unwrap_err().is_validation());
    assert!(sched.add_profile("a 2 1", 1).unwrap_err().is_validation());

    let profile = sched.add_profile("a: 2 1; b: 2 5", 2).expect("valid profile");
    assert_eq!(profile.get_structure().expect("structure").observations_count, 0);
    assert_eq!(requirements(&sched), vec![(0, 2)]);
}

#[test]
fn overflowing_role_counts_are_rejected() {
    let (server, client) = common::start();
    let id = common::seed_simulator(&server, "sim", "1");
    let sched = scheduler(&client.get_simulator(id), "sched", true, 4);
    sched.add_role("a", 1).expect("role a");

    assert!(sched.add_role("b", u32::MAX).unwrap_err().is_validation());
    sched.add_role("b", 3).expect("mock still serving");
    assert_eq!(sched.get_info().expect("info").name, "sched");
}

#[test]
fn profile_requirements_are_checked() {
    let (server, client) = common::start();
    let id = common::seed_simulator(&server, "sim", "1");
    let sched = scheduler(&client.get_simulator(id), "sched", true, 4);
    sched.add_role("a", 2).expect("role a");
    sched.add_role("b", 2).expect("role b");

    let huge = egta_mock::MAX_OBSERVATION_REQUIREMENT + 1;
    assert!(sched.add_profile("a: 2 1; b: 2 5", huge).unwrap_err().is_validation());
    assert!(sched.add_profile("a: 1 1, 1 1; b: 2 5", 1).unwrap_err().is_validation());
    assert!(requirements(&sched).is_empty());

    sched.add_profile("a: 2 1; b: 2 5", 1).expect("bounded profile");
    assert_eq!(requirements(&sched), vec![(1, 1)]);
}

#[test]
fn scheduler_games_copy_its_setup() {
    let (server, client) = common::start();
    let id = common::seed_simulator(&server, "sim", "1");
    let sched = scheduler(&client.get_simulator(id), "sched", true, 4);

    let game = sched.create_game(None).expect("game");
    let structure = game.get_structure().expect("structure");
    assert_eq!(structure.name, "sched");
    assert_eq!(structure.size, 4);
    assert_eq!(
        structure.configuration,
        vec![("key".to_string(), "value".to_string())]
    );

    let named = sched.create_game(Some("other")).expect("named game");
    assert_eq!(named.get_structure().expect("structure").name, "other");
}

#[test]
fn missing_profile_is_not_found() {
    let (_server, client) = common::start();
    assert!(client.get_profile(0).get_structure().unwrap_err().is_not_found());
}
