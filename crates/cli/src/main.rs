//! `atrium`: operator tool over an exported access snapshot.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;

use atrium_auth::snapshot::AccessSnapshot;
use atrium_auth::{Action, Authorizer, PermissionRequest, PermissionType};
use atrium_core::UserId;
use atrium_infra::{AccessConfig, AccessRuntime, InMemoryAccessStore};

#[derive(Parser)]
#[command(name = "atrium", about = "Inspect and maintain group-based access control", version)]
struct Cli {
    /// Snapshot file (defaults to $ATRIUM_SNAPSHOT).
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate one request and explain the decision.
    Check {
        #[arg(long)]
        user: UserId,
        /// MODULE, PAGE or COMPONENT.
        #[arg(long = "type")]
        permission_type: PermissionType,
        /// Module key.
        #[arg(long)]
        resource_type: String,
        /// Module, page or `page.component` key.
        #[arg(long)]
        identifier: String,
        #[arg(long, default_value = "READ")]
        action: Action,
    },

    /// Print a user's effective permission set.
    Permissions {
        #[arg(long)]
        user: UserId,
    },

    /// Report orphaned registry entries and duplicate routes.
    Health,

    /// Remove orphaned pages and components and write the result back.
    Cleanup {
        /// Acting OWNER or ADMIN.
        #[arg(long)]
        actor: UserId,
        /// Where to write the cleaned snapshot (default: overwrite the input).
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Re-export the snapshot in canonical order.
    Export {
        /// Output file (default: stdout).
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    atrium_observability::init();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "command failed");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = AccessConfig::from_env().context("reading ATRIUM_* configuration")?;
    let Some(path) = cli.snapshot.or_else(|| config.snapshot_path.clone()) else {
        bail!("no snapshot given; pass --snapshot or set ATRIUM_SNAPSHOT");
    };
    let rt = load(&path, &config)?;

    match cli.command {
        Command::Check {
            user,
            permission_type,
            resource_type,
            identifier,
            action,
        } => {
            let request = PermissionRequest::parse(permission_type, &resource_type, &identifier, action)?;
            let decision = rt.authorizer.check(user, &request)?;
            eprintln!("{}", decision.summary());
            print_json(&decision)?;
            Ok(if decision.allowed {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            })
        }
        Command::Permissions { user } => {
            print_json(&rt.authorizer.user_permissions(user)?)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Health => {
            let report = rt.registry.health_check()?;
            print_json(&report)?;
            Ok(if report.is_healthy() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            })
        }
        Command::Cleanup { actor, output } => {
            let report = rt.registry.cleanup(actor)?;
            let target = output.unwrap_or(path);
            write_snapshot(&rt, Some(&target))?;
            eprintln!("removed {} registry entries; wrote {}", report.total(), target.display());
            print_json(&report)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Export { output } => {
            write_snapshot(&rt, output.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load(path: &Path, config: &AccessConfig) -> anyhow::Result<AccessRuntime> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading snapshot {}", path.display()))?;
    let snapshot = AccessSnapshot::from_json(&json)
        .with_context(|| format!("parsing snapshot {}", path.display()))?;
    let store = InMemoryAccessStore::from_snapshot(&snapshot)?;
    tracing::debug!(path = %path.display(), "snapshot loaded");
    Ok(AccessRuntime::new(Arc::new(store), config))
}

fn write_snapshot(rt: &AccessRuntime, output: Option<&Path>) -> anyhow::Result<()> {
    let json = rt.export()?.to_json()?;
    match output {
        Some(path) => std::fs::write(path, json + "\n")
            .with_context(|| format!("writing snapshot {}", path.display())),
        None => {
            println!("{json}");
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
