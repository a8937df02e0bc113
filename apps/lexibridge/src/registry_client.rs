// SPDX-FileCopyrightText: © 2025 Lexibridge Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Consul-style self-registration. Registering is a fire-and-forget,
//! non-fatal collaborator: a registry outage never prevents the server
//! from serving translation traffic.

use serde_json::json;
use tracing::{error, info, warn};

use crate::config::{Config, RegistryConfig};

const APP_NAME: &str = "lexibridge";

/// Attempts to register this instance with a Consul-compatible HTTP API.
/// Requires both `http_addr` and `service_address` to be configured; a
/// missing either one is treated as "registry disabled", not an error.
pub async fn register(config: &Config, app_id: &str) {
    let registry = &config.registry;
    let (Some(http_addr), Some(service_address)) =
        (&registry.http_addr, &registry.service_address)
    else {
        return;
    };

    let service_port = registry.service_port.unwrap_or(config.server_port);
    let health_endpoint = format!(
        "{}://{}:{}{}/health",
        registry.service_scheme, service_address, service_port, config.server_root_path
    );

    let payload = json!({
        "Name": APP_NAME,
        "ID": app_id,
        "Tags": ["prometheus"],
        "Address": service_address,
        "Port": service_port,
        "Check": {
            "HTTP": health_endpoint,
            "Interval": "10s",
            "Timeout": "5s",
        },
        "Meta": {
            "metrics_port": service_port.to_string(),
            "metrics_path": "/metrics",
        },
    });

    let url = format!("https://{http_addr}/v1/agent/service/register");
    let client = build_client(registry);

    match client
        .put(&url)
        .query(&[("replace-existing-checks", "true")])
        .json(&payload)
        .send()
        .await
    {
        Ok(response) if response.status().is_success() => {
            info!(app_id, %http_addr, "Registered with service registry");
        },
        Ok(response) => {
            warn!(status = %response.status(), app_id, "Service registry rejected registration");
        },
        Err(e) => {
            error!(error = %e, app_id, "Failed to register with service registry");
        },
    }
}

/// Deregisters this instance. Called from the top-level server-stop path
/// after graceful shutdown completes, not from `Drop` (which cannot run
/// async code).
pub async fn deregister(config: &Config, app_id: &str) {
    let registry = &config.registry;
    let Some(http_addr) = &registry.http_addr else {
        return;
    };

    let url = format!("https://{http_addr}/v1/agent/service/deregister/{app_id}");
    let client = build_client(registry);

    if let Err(e) = client.put(&url).send().await {
        error!(error = %e, app_id, "Failed to deregister from service registry");
    } else {
        info!(app_id, "Deregistered from service registry");
    }
}

fn build_client(registry: &RegistryConfig) -> reqwest::Client {
    let mut builder = reqwest::Client::builder();
    if let Some(token) = &registry.auth_token {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Ok(value) = reqwest::header::HeaderValue::from_str(&format!("Bearer {token}")) {
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }
        builder = builder.default_headers(headers);
    }
    builder.build().unwrap_or_default()
}
