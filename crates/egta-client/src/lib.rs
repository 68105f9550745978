//! Blocking client for the EGTA Online experiment-management service.
//!
//! An [`EgtaClient`] owns the auth token, a pooled HTTP transport and the
//! [`RetryPolicy`]. Resource handles ([`Simulator`], [`Scheduler`], [`Game`],
//! [`Profile`]) are a client clone plus an id; each method issues one or
//! more requests and returns a typed snapshot of the remote state.
//!
//! ```no_run
//! use egta_client::{ClientConfig, EgtaClient};
//!
//! let client = EgtaClient::new(ClientConfig::new("token"))?;
//! let sim = client.get_simulator_by_name("market", Some("1.0"))?;
//! sim.add_strategy("buyers", "truthful")?;
//! # Ok::<_, egta_client::EgtaError>(())
//! ```

mod assignment;
mod client;
mod config;
mod error;
mod form;
mod game;
mod html;
pub mod models;
mod pages;
mod profile;
mod retry;
mod scheduler;
mod simulator;

pub use assignment::{symgrps_to_assignment, SymmetryGroup};
pub use client::{Direction, EgtaClient, PageRequest, SimulationColumn, SimulationQuery};
pub use config::{ClientConfig, DEFAULT_DOMAIN};
pub use error::{EgtaError, Result};
pub use game::{Game, Granularity, TempGame};
pub use pages::Pages;
pub use profile::Profile;
pub use retry::RetryPolicy;
pub use scheduler::{ProfileRef, Scheduler, SchedulerParams, SchedulerUpdate};
pub use simulator::Simulator;
