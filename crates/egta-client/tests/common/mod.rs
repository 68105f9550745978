#![allow(dead_code)]

use std::time::Duration;

use egta_client::{ClientConfig, EgtaClient, RetryPolicy};
use egta_mock::{Configuration, MockServer};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn client_for(server: &MockServer, retry: RetryPolicy) -> EgtaClient {
    let config = ClientConfig::new("test-token")
        .with_base_url(&server.base_url())
        .expect("mock url parses")
        .with_retry(retry);
    EgtaClient::new(config).expect("client builds")
}

/// Retries without sleeping.
pub fn fast_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy::default()
        .with_max_retries(max_retries)
        .with_delay(Duration::ZERO)
}

pub fn start() -> (MockServer, EgtaClient) {
    init_tracing();
    let server = MockServer::start().expect("mock server starts");
    let client = client_for(&server, fast_retry(2));
    (server, client)
}

/// Seeds `name`/`version` with roles `a: 1 2 3 4` and `b: 5 6 7`.
pub fn seed_simulator(server: &MockServer, name: &str, version: &str) -> u64 {
    let configuration = Configuration::from([("key".to_string(), "value".to_string())]);
    let id = server
        .create_simulator(name, version, configuration)
        .expect("seed simulator");
    server
        .add_simulator_role(id, "a", &["1", "2", "3", "4"])
        .expect("seed role a");
    server
        .add_simulator_role(id, "b", &["5", "6", "7"])
        .expect("seed role b");
    id
}
