// SPDX-FileCopyrightText: © 2025 Lexibridge Contributors
//
// SPDX-License-Identifier: MPL-2.0

use opentelemetry::global;
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::{Protocol, WithExportConfig, WithHttpConfig};
use opentelemetry_sdk::{
    metrics::{PeriodicReader, SdkMeterProvider},
    trace::{self as sdktrace, SdkTracerProvider},
    Resource,
};
use std::sync::Arc;
use std::time::Duration;
use sysinfo::System;
use tokio::sync::Mutex;
use tracing_opentelemetry::OpenTelemetryLayer;

use crate::config::TelemetryConfig;

/// Build OTLP metrics exporter with optional custom headers.
fn build_otlp_exporter(
    endpoint: &str,
    headers: &std::collections::HashMap<String, String>,
) -> Result<opentelemetry_otlp::MetricExporter, Box<dyn std::error::Error>> {
    let mut exporter_builder = opentelemetry_otlp::MetricExporter::builder()
        .with_http()
        .with_protocol(Protocol::HttpBinary)
        .with_endpoint(endpoint)
        .with_timeout(Duration::from_secs(10));

    if !headers.is_empty() {
        tracing::info!("Adding {} custom headers to OTLP exporter", headers.len());
        exporter_builder = exporter_builder.with_headers(headers.clone());
    }

    exporter_builder.build().map_err(|e| {
        tracing::error!("Failed to build OTLP metrics exporter: {}", e);
        e.into()
    })
}

fn build_otlp_span_exporter(
    endpoint: &str,
    headers: &std::collections::HashMap<String, String>,
) -> Result<opentelemetry_otlp::SpanExporter, Box<dyn std::error::Error>> {
    let mut exporter_builder = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_protocol(Protocol::HttpBinary)
        .with_endpoint(endpoint)
        .with_timeout(Duration::from_secs(10));

    if !headers.is_empty() {
        tracing::info!("Adding {} custom headers to OTLP trace exporter", headers.len());
        exporter_builder = exporter_builder.with_headers(headers.clone());
    }

    exporter_builder.build().map_err(|e| {
        tracing::error!("Failed to build OTLP trace exporter: {}", e);
        e.into()
    })
}

/// Initialize metrics provider with OTLP export.
fn init_metrics_with_otlp(
    builder: opentelemetry_sdk::metrics::MeterProviderBuilder,
    endpoint: &str,
    headers: &std::collections::HashMap<String, String>,
) -> Result<SdkMeterProvider, Box<dyn std::error::Error>> {
    tracing::info!(endpoint = %endpoint, "Configuring OTLP metrics exporter");

    let exporter = build_otlp_exporter(endpoint, headers)?;
    let reader = PeriodicReader::builder(exporter).with_interval(Duration::from_secs(5)).build();

    let provider = builder.with_reader(reader).build();
    global::set_meter_provider(provider.clone());

    tracing::info!("OTLP exporter will send metrics to: {}", endpoint);
    Ok(provider)
}

/// Initialize metrics provider without export (local collection only).
fn init_metrics_local_only(
    builder: opentelemetry_sdk::metrics::MeterProviderBuilder,
) -> SdkMeterProvider {
    tracing::info!("No OTLP endpoint configured, metrics will be collected but not exported");
    let provider = builder.build();
    global::set_meter_provider(provider.clone());
    provider
}

/// Initializes the OpenTelemetry metrics provider with optional OTLP push
/// export. This runs alongside, not instead of, the local Prometheus
/// text-exposition registry served at `/metrics`: the two surfaces serve
/// different consumers (a push-based collector vs. a scrape target).
///
/// # Errors
///
/// Returns an error if the OTLP metrics exporter fails to build.
pub fn init_metrics(
    config: &TelemetryConfig,
) -> Result<SdkMeterProvider, Box<dyn std::error::Error>> {
    tracing::info!(
        "Initializing metrics with config: enable={}, endpoint={:?}",
        config.enable,
        config.otlp_endpoint
    );

    let resource = Resource::builder_empty()
        .with_attributes([
            opentelemetry::KeyValue::new("service.name", "lexibridge"),
            opentelemetry::KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
        ])
        .build();

    let builder = SdkMeterProvider::builder().with_resource(resource);

    if let Some(endpoint) = &config.otlp_endpoint {
        init_metrics_with_otlp(builder, endpoint, &config.otlp_headers)
    } else {
        Ok(init_metrics_local_only(builder))
    }
}

/// Starts system metrics collection. Must be called after the tokio runtime
/// is available.
pub fn start_system_metrics() {
    start_system_metrics_collection();
}

fn start_system_metrics_collection() {
    let system = Arc::new(Mutex::new(System::new()));

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(10));
        let meter = global::meter("lexibridge_system");

        let cpu_usage_gauge = meter
            .f64_gauge("system_cpu_utilization")
            .with_description("System-wide CPU utilization as a percentage")
            .with_unit("%")
            .build();

        let process_cpu_gauge = meter
            .f64_gauge("process_cpu_utilization")
            .with_description(
                "Process CPU utilization normalized by number of CPUs (0-100%)",
            )
            .with_unit("%")
            .build();

        let memory_usage_gauge = meter
            .u64_gauge("system_memory_usage")
            .with_description("Used system memory in bytes")
            .with_unit("By")
            .build();

        let memory_total_gauge = meter
            .u64_gauge("system_memory_total")
            .with_description("Total system memory in bytes")
            .with_unit("By")
            .build();

        let process_memory_gauge = meter
            .u64_gauge("process_memory_usage")
            .with_description("Process memory usage in bytes")
            .with_unit("By")
            .build();

        tracing::info!("System metrics collection started");

        {
            let system_clone = Arc::clone(&system);
            let _ = tokio::task::spawn_blocking(move || {
                let mut sys = system_clone.blocking_lock();
                sys.refresh_cpu_usage();
                if let Ok(current_pid) = sysinfo::get_current_pid() {
                    sys.refresh_processes(sysinfo::ProcessesToUpdate::Some(&[current_pid]), true);
                }
            })
            .await;
        }

        loop {
            interval.tick().await;

            let system_clone = Arc::clone(&system);
            #[allow(clippy::significant_drop_tightening)]
            let result = tokio::task::spawn_blocking(move || {
                let mut sys = system_clone.blocking_lock();

                sys.refresh_cpu_usage();
                sys.refresh_memory();

                let cpu_usage: f64 = if sys.cpus().is_empty() {
                    0.0
                } else {
                    let cpu_count = sys.cpus().len();
                    let sum: f64 = sys.cpus().iter().map(|cpu| f64::from(cpu.cpu_usage())).sum();
                    #[allow(clippy::cast_precision_loss)]
                    {
                        sum / (cpu_count as f64)
                    }
                };

                let used_memory = sys.used_memory();
                let total_memory = sys.total_memory();

                #[allow(clippy::cast_precision_loss)]
                let num_cpus = sys.cpus().len().max(1) as f64;
                let (process_cpu, process_memory) = sysinfo::get_current_pid()
                    .ok()
                    .and_then(|current_pid| {
                        sys.refresh_processes(
                            sysinfo::ProcessesToUpdate::Some(&[current_pid]),
                            true,
                        );
                        sys.process(current_pid).map(|process| {
                            let process_memory = process.memory();
                            let process_cpu_raw = f64::from(process.cpu_usage());
                            let process_cpu = process_cpu_raw / num_cpus;
                            (Some(process_cpu), Some(process_memory))
                        })
                    })
                    .unwrap_or((None, None));

                (cpu_usage, used_memory, total_memory, process_cpu, process_memory)
            })
            .await;

            let (cpu_usage, used_memory, total_memory, process_cpu_usage, process_memory_usage) =
                result.unwrap_or_else(|e| {
                    tracing::warn!("Failed to collect system metrics: {}", e);
                    (0.0, 0, 0, None, None)
                });

            cpu_usage_gauge.record(cpu_usage, &[]);
            memory_usage_gauge.record(used_memory, &[]);
            memory_total_gauge.record(total_memory, &[]);

            if let Some(process_cpu) = process_cpu_usage {
                process_cpu_gauge.record(process_cpu, &[]);
            }
            if let Some(process_memory) = process_memory_usage {
                process_memory_gauge.record(process_memory, &[]);
            }

            tracing::debug!(
                target: "lexibridge::telemetry::system_metrics",
                system_cpu_usage = %cpu_usage,
                used_memory_mb = %(used_memory / 1024 / 1024),
                total_memory_mb = %(total_memory / 1024 / 1024),
                process_cpu_usage = ?process_cpu_usage,
                process_memory_mb = ?process_memory_usage.map(|m| m / 1024 / 1024),
                "Collected system metrics"
            );
        }
    });
}

/// Initializes an OpenTelemetry tracing layer that exports spans via OTLP.
///
/// # Errors
///
/// Returns an error if `otlp_traces_endpoint` is missing or the exporter
/// cannot be constructed.
pub fn init_tracing_with_otlp<S>(
    config: &TelemetryConfig,
) -> Result<OpenTelemetryLayer<S, sdktrace::Tracer>, Box<dyn std::error::Error>>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    let endpoint = config.otlp_traces_endpoint.as_ref().ok_or_else(|| {
        "Tracing is enabled but no `otlp_traces_endpoint` is configured".to_string()
    })?;

    tracing::info!(endpoint = %endpoint, "Configuring OTLP trace exporter");
    let exporter = build_otlp_span_exporter(endpoint, &config.otlp_headers)?;

    let resource = Resource::builder_empty()
        .with_attributes([
            opentelemetry::KeyValue::new("service.name", "lexibridge"),
            opentelemetry::KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
        ])
        .build();

    let provider =
        SdkTracerProvider::builder().with_batch_exporter(exporter).with_resource(resource).build();

    let tracer = provider.tracer("lexibridge");
    global::set_tracer_provider(provider);

    Ok(tracing_opentelemetry::layer().with_tracer(tracer))
}

/// Renders the process-local Prometheus registry as text exposition format,
/// for the scrape-style `/metrics` endpoint. Distinct from [`init_metrics`],
/// which pushes OTLP metrics to a remote collector: this registry is
/// populated by counters/gauges registered directly against
/// `prometheus::default_registry()` and is always available locally, with
/// no collector configuration required.
///
/// # Errors
///
/// Returns an error if the registry's current metric families fail to
/// encode, which indicates a duplicate or malformed metric registration.
pub fn render_prometheus_text() -> Result<String, prometheus::Error> {
    prometheus::TextEncoder::new().encode_to_string(&prometheus::default_registry().gather())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_prometheus_text_succeeds_with_empty_registry() {
        let rendered = render_prometheus_text();
        assert!(rendered.is_ok());
    }
}
