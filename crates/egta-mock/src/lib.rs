//! In-memory stand-in for the EGTA Online service.
//!
//! [`MockService`] holds arenas of simulators, schedulers, games, profiles
//! and simulations and answers [`MockRequest`]s with the paths, parameters,
//! JSON fields and status codes of the live service. [`MockServer`] puts it
//! behind a loopback HTTP listener so the real client can talk to it.
//!
//! ```no_run
//! use egta_mock::MockServer;
//!
//! let server = MockServer::start()?;
//! let sim = server.create_simulator("market", "1.0", Default::default())?;
//! server.add_simulator_role(sim, "buyers", &["truthful", "shade"])?;
//! println!("serving at {}", server.base_url());
//! # Ok::<_, Box<dyn std::error::Error>>(())
//! ```

mod arena;
mod error;
mod render;
mod request;
mod server;
mod service;
mod store;

pub use error::{MockError, MockResult};
pub use request::{MockMethod, MockRequest, MockResponse, Params};
pub use server::MockServer;
pub use service::{MockService, SIMULATIONS_PAGE_SIZE};
pub use store::{Configuration, MAX_OBSERVATION_REQUIREMENT};
