//! JSON documents and HTML pages in the shapes the live service produces.

use std::fmt::Write as _;
use std::str::FromStr;

use serde_json::{json, Value};

use crate::error::{MockError, MockResult};
use crate::store::{GameRecord, ProfileRecord, SchedulerRecord, SimulationRecord, SimulatorRecord, Store};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Granularity {
    Structure,
    Summary,
    Observations,
    Full,
}

impl FromStr for Granularity {
    type Err = MockError;

    fn from_str(value: &str) -> MockResult<Self> {
        match value {
            "structure" => Ok(Granularity::Structure),
            "summary" => Ok(Granularity::Summary),
            "observations" => Ok(Granularity::Observations),
            "full" => Ok(Granularity::Full),
            other => Err(MockError::Unprocessable(format!("unknown granularity {other}"))),
        }
    }
}

pub(crate) fn simulator_summary(sim: &SimulatorRecord) -> Value {
    json!({
        "id": sim.id,
        "name": sim.name,
        "version": sim.version,
        "email": sim.email,
        "created_at": sim.created_at,
        "updated_at": sim.updated_at,
    })
}

pub(crate) fn simulator_info(sim: &SimulatorRecord) -> Value {
    let mut info = simulator_summary(sim);
    info["source"] = json!({ "url": format!("/uploads/simulator/source/{}/{}.zip", sim.id, sim.fullname()) });
    info["configuration"] = json!(sim.configuration);
    info["role_configuration"] = json!(sim.role_configuration);
    info
}

pub(crate) fn scheduler_info(sched: &SchedulerRecord) -> Value {
    json!({
        "id": sched.id,
        "name": sched.name,
        "active": sched.active,
        "process_memory": sched.process_memory,
        "size": sched.size,
        "time_per_observation": sched.time_per_observation,
        "observations_per_simulation": sched.observations_per_simulation,
        "nodes": sched.nodes,
        "default_observation_requirement": sched.default_observation_requirement,
        "simulator_instance_id": sched.instance_id,
        "created_at": sched.created_at,
        "updated_at": sched.updated_at,
    })
}

pub(crate) fn scheduler_requirements(store: &Store, sched: &SchedulerRecord) -> MockResult<Value> {
    let instance = store.instances.get(sched.instance_id)?;
    let mut requirements = Vec::new();
    for (profile_id, requirement) in &sched.requirements {
        let profile = store.profiles.get(*profile_id)?;
        requirements.push(json!({
            "profile_id": profile_id,
            "requirement": requirement,
            "current_count": profile.observations.len(),
        }));
    }
    Ok(json!({
        "id": sched.id,
        "name": sched.name,
        "active": sched.active,
        "process_memory": sched.process_memory,
        "size": sched.size,
        "time_per_observation": sched.time_per_observation,
        "observations_per_simulation": sched.observations_per_simulation,
        "nodes": sched.nodes,
        "default_observation_requirement": sched.default_observation_requirement,
        "simulator_id": instance.simulator_id,
        "configuration": config_pairs(&instance.configuration),
        "type": "GenericScheduler",
        "scheduling_requirements": requirements,
    }))
}

fn config_pairs(configuration: &crate::store::Configuration) -> Vec<[&str; 2]> {
    configuration
        .iter()
        .map(|(key, value)| [key.as_str(), value.as_str()])
        .collect()
}

pub(crate) fn game_summary(game: &GameRecord) -> Value {
    json!({
        "id": game.id,
        "name": game.name,
        "size": game.size,
        "simulator_instance_id": game.instance_id,
        "created_at": game.created_at,
        "updated_at": game.updated_at,
    })
}

pub(crate) fn game_info(store: &Store, game: &GameRecord, granularity: Granularity) -> MockResult<Value> {
    let instance = store.instances.get(game.instance_id)?;
    let roles: Vec<Value> = game
        .roles
        .iter()
        .map(|(name, role)| json!({ "name": name, "count": role.count, "strategies": role.strategies }))
        .collect();
    let mut info = game_summary(game);
    info["configuration"] = json!(config_pairs(&instance.configuration));
    info["roles"] = json!(roles);
    if granularity != Granularity::Structure {
        let profiles: Vec<Value> = store
            .game_profiles(game)
            .into_iter()
            .map(|profile| profile_info(profile, granularity))
            .collect();
        info["profiles"] = json!(profiles);
    }
    Ok(info)
}

pub(crate) fn profile_info(profile: &ProfileRecord, granularity: Granularity) -> Value {
    match granularity {
        Granularity::Structure => json!({
            "id": profile.id,
            "assignment": profile.assignment,
            "observations_count": profile.observations.len(),
            "role_configuration": profile.role_configuration(),
            "simulator_instance_id": profile.instance_id,
            "size": profile.size(),
            "created_at": profile.created_at,
            "updated_at": profile.updated_at,
        }),
        Granularity::Summary => {
            let groups: Vec<Value> = profile
                .groups
                .iter()
                .map(|group| {
                    let payoffs: Vec<f64> = profile
                        .observations
                        .iter()
                        .flat_map(|obs| obs.players.iter())
                        .filter(|(sid, _)| *sid == group.id)
                        .map(|(_, payoff)| *payoff)
                        .collect();
                    let (mean, sd) = mean_sd(&payoffs);
                    json!({
                        "id": group.id,
                        "role": group.role,
                        "strategy": group.strategy,
                        "count": group.count,
                        "payoff": mean,
                        "payoff_sd": sd,
                    })
                })
                .collect();
            json!({
                "id": profile.id,
                "observations_count": profile.observations.len(),
                "simulator_instance_id": profile.instance_id,
                "symmetry_groups": groups,
            })
        }
        Granularity::Observations => {
            let observations: Vec<Value> = profile
                .observations
                .iter()
                .map(|obs| {
                    let groups: Vec<Value> = profile
                        .groups
                        .iter()
                        .map(|group| {
                            let payoffs: Vec<f64> = obs
                                .players
                                .iter()
                                .filter(|(sid, _)| *sid == group.id)
                                .map(|(_, payoff)| *payoff)
                                .collect();
                            let (mean, sd) = mean_sd(&payoffs);
                            json!({ "id": group.id, "payoff": mean, "payoff_sd": sd })
                        })
                        .collect();
                    json!({ "features": {}, "extended_features": {}, "symmetry_groups": groups })
                })
                .collect();
            json!({
                "id": profile.id,
                "simulator_instance_id": profile.instance_id,
                "symmetry_groups": group_descriptors(profile),
                "observations": observations,
            })
        }
        Granularity::Full => {
            let observations: Vec<Value> = profile
                .observations
                .iter()
                .map(|obs| {
                    let players: Vec<Value> = obs
                        .players
                        .iter()
                        .map(|(sid, payoff)| json!({ "sid": sid, "p": payoff, "f": {}, "e": {} }))
                        .collect();
                    json!({ "features": {}, "extended_features": {}, "players": players })
                })
                .collect();
            json!({
                "id": profile.id,
                "simulator_instance_id": profile.instance_id,
                "symmetry_groups": group_descriptors(profile),
                "observations": observations,
            })
        }
    }
}

fn group_descriptors(profile: &ProfileRecord) -> Vec<Value> {
    profile
        .groups
        .iter()
        .map(|group| {
            json!({
                "id": group.id,
                "role": group.role,
                "strategy": group.strategy,
                "count": group.count,
            })
        })
        .collect()
}

/// Mean and sample standard deviation; the deviation needs two samples.
fn mean_sd(values: &[f64]) -> (Option<f64>, Option<f64>) {
    if values.is_empty() {
        return (None, None);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if values.len() < 2 {
        return (Some(mean), None);
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (Some(mean), Some(var.sqrt()))
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><title>{} | EGTAOnline</title></head>\n<body>\n{body}\n</body>\n</html>\n",
        escape(title)
    )
}

/// Page shown after a game is created.
pub(crate) fn game_page(game: &GameRecord) -> String {
    page(
        &game.name,
        &format!(
            "<div class=\"show_for game\" id=\"game_{}\">\n<h2>{}</h2>\n<p>Size: {}</p>\n</div>",
            game.id,
            escape(&game.name),
            game.size
        ),
    )
}

pub(crate) fn simulations_page(rows: &[&SimulationRecord]) -> String {
    let mut body = String::from(
        "<table class=\"simulations\">\n<thead><tr><th>State</th><th>Profile</th><th>Simulator</th><th>Folder</th><th>Job</th></tr></thead>\n<tbody>\n",
    );
    for sim in rows {
        let _ = writeln!(
            body,
            "<tr><td>{}</td><td><a href=\"/profiles/{}\">{}</a></td><td>{}</td><td><a href=\"/simulations/{}\">{}</a></td><td>{}</td></tr>",
            escape(&sim.state),
            sim.profile_id,
            escape(&sim.assignment),
            escape(&sim.simulator_fullname),
            sim.id,
            sim.id,
            job_text(sim.job),
        );
    }
    body.push_str("</tbody>\n</table>");
    page("Simulations", &body)
}

pub(crate) fn simulation_page(sim: &SimulationRecord) -> String {
    let fields = [
        ("Folder number", sim.id.to_string()),
        ("Job", job_text(sim.job)),
        ("Profile", sim.assignment.clone()),
        ("Simulator fullname", sim.simulator_fullname.clone()),
        ("Size", sim.size.to_string()),
        ("State", sim.state.clone()),
        ("Error message", sim.error_message.clone()),
    ];
    let mut body = String::from("<div class=\"show_for simulation\">\n");
    for (label, value) in fields {
        let _ = writeln!(body, "<p><strong>{label}:</strong> {}</p>", escape(&value));
    }
    body.push_str("</div>");
    page(&format!("Simulation {}", sim.id), &body)
}

fn job_text(job: Option<u64>) -> String {
    job.map_or_else(|| "N/A".to_string(), |job| job.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sd_needs_two_samples() {
        assert_eq!(mean_sd(&[]), (None, None));
        assert_eq!(mean_sd(&[2.0]), (Some(2.0), None));
        let (mean, sd) = mean_sd(&[1.0, 3.0]);
        assert_eq!(mean, Some(2.0));
        assert!((sd.unwrap() - 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn escapes_markup_and_quotes() {
        assert_eq!(
            escape(r#"<a href='x'>"&"</a>"#),
            "&lt;a href=&#39;x&#39;&gt;&quot;&amp;&quot;&lt;/a&gt;"
        );
    }

    #[test]
    fn unknown_granularity_is_unprocessable() {
        assert_eq!("weird".parse::<Granularity>().unwrap_err().status(), 422);
        assert_eq!("full".parse::<Granularity>().unwrap(), Granularity::Full);
    }

    #[test]
    fn simulation_page_lists_fields() {
        let sim = SimulationRecord {
            id: 7,
            profile_id: 1,
            assignment: "a: 2 x".into(),
            simulator_fullname: "sim-1".into(),
            size: 2,
            state: "complete".into(),
            job: None,
            error_message: String::new(),
        };
        let html = simulation_page(&sim);
        assert!(html.contains("<div class=\"show_for simulation\">"));
        assert!(html.contains("<p><strong>Job:</strong> N/A</p>"));
        assert!(simulations_page(&[&sim]).contains("<td>sim-1</td>"));
    }
}
