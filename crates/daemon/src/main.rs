use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig as _;

use sy_daemon::bootstrap;
use sy_daemon::cli::{Cli, Command, ConfigCommand};
use sy_domain::config::{Config, ObservabilityConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        // Default to serve when no subcommand is given.
        None | Some(Command::Serve) => {
            let (config, _config_path) = sy_daemon::cli::load_config()?;
            let tracer_provider = init_tracing(&config.observability);
            serve(Arc::new(config), tracer_provider).await
        }
        Some(Command::Tick { json }) => {
            let runtime = one_shot_runtime()?;
            sy_daemon::cli::tick::run(&runtime, json).await
        }
        Some(Command::Publish(cmd)) => {
            let runtime = one_shot_runtime()?;
            exit_unless(sy_daemon::cli::publish::run(&runtime, cmd).await?)
        }
        Some(Command::Program(cmd)) => {
            let runtime = one_shot_runtime()?;
            exit_unless(sy_daemon::cli::catalog::program(&runtime, cmd).await?)
        }
        Some(Command::Term(cmd)) => {
            let runtime = one_shot_runtime()?;
            exit_unless(sy_daemon::cli::catalog::term(&runtime, cmd).await?)
        }
        Some(Command::Lesson(cmd)) => {
            let runtime = one_shot_runtime()?;
            exit_unless(sy_daemon::cli::catalog::lesson(&runtime, cmd).await?)
        }
        Some(Command::Asset(cmd)) => {
            let runtime = one_shot_runtime()?;
            exit_unless(sy_daemon::cli::catalog::asset(&runtime, cmd).await?)
        }
        Some(Command::Seed) => {
            let runtime = one_shot_runtime()?;
            sy_daemon::cli::seed::run(&runtime).await
        }
        Some(Command::Config(ConfigCommand::Validate)) => {
            let (config, config_path) = sy_daemon::cli::load_config()?;
            if !sy_daemon::cli::config::validate(&config, &config_path) {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Show)) => {
            let (config, _config_path) = sy_daemon::cli::load_config()?;
            sy_daemon::cli::config::show(&config)
        }
        Some(Command::Version) => {
            println!("syllabus {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// CLI tracing plus a runtime over the configured store.
fn one_shot_runtime() -> anyhow::Result<bootstrap::Runtime> {
    init_cli_tracing();
    let (config, _) = sy_daemon::cli::load_config()?;
    bootstrap::build_runtime(Arc::new(config))
}

/// Exit with status 1 when a command reported a rejection.
fn exit_unless(ok: bool) -> anyhow::Result<()> {
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

/// Initialize structured JSON tracing (only for the `serve` command).
///
/// When `otlp_endpoint` is configured, an OpenTelemetry layer is added so
/// publish passes are also exported as OTel spans via OTLP/gRPC. The
/// returned provider must be shut down on exit to flush pending spans.
fn init_tracing(obs: &ObservabilityConfig) -> Option<opentelemetry_sdk::trace::SdkTracerProvider> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sy_publishing=debug"));

    let fmt_layer = tracing_subscriber::fmt::layer().json();

    let Some(endpoint) = obs.export_endpoint() else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
        return None;
    };

    let exporter = match opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
    {
        Ok(e) => e,
        Err(e) => {
            eprintln!(
                "WARNING: failed to create OTLP exporter for {endpoint}: {e}; \
                 starting without OpenTelemetry"
            );
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .init();
            return None;
        }
    };

    let resource = opentelemetry_sdk::Resource::builder()
        .with_service_name(obs.service_name.clone())
        .build();

    let tracer_provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_sampler(opentelemetry_sdk::trace::Sampler::TraceIdRatioBased(
            obs.sample_rate,
        ))
        .with_resource(resource)
        .build();

    let otel_layer =
        tracing_opentelemetry::layer().with_tracer(tracer_provider.tracer("syllabus"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(otel_layer)
        .init();

    Some(tracer_provider)
}

/// Compact stderr-only tracing for one-shot commands, so stdout carries
/// only the command's output.
fn init_cli_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

/// Run the scheduling engine until SIGINT or SIGTERM.
async fn serve(
    config: Arc<Config>,
    tracer_provider: Option<opentelemetry_sdk::trace::SdkTracerProvider>,
) -> anyhow::Result<()> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Syllabus starting");

    let runtime = bootstrap::build_runtime(config)?;
    let shutdown = CancellationToken::new();
    let handles = bootstrap::spawn_background_tasks(&runtime, &shutdown);

    shutdown_signal().await?;
    shutdown.cancel();

    // Passes finish before their task exits.
    for handle in handles {
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "background task ended abnormally");
        }
    }

    if let Some(provider) = tracer_provider {
        if let Err(e) = provider.shutdown() {
            tracing::warn!(error = ?e, "OpenTelemetry tracer provider shutdown failed");
        }
    }

    tracing::info!("shutdown complete");
    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() -> anyhow::Result<()> {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

        tokio::select! {
            res = ctrl_c => {
                res?;
                tracing::info!("received SIGINT, shutting down");
            }
            _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await?;
        tracing::info!("received SIGINT, shutting down");
    }

    Ok(())
}
