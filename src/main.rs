// src/main.rs

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pyplan::requirement::{load_requirement_lines, parse_requirement};
use pyplan::{
    Environment, GraphClient, GraphClientConfig, ResolutionResult, Resolver, ResolverConfig,
    SelectionSource,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "pyplan")]
#[command(author, version, about = "Install planning and conflict detection for Python package environments", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Flags shared by every planning command
#[derive(Args)]
struct CommonArgs {
    /// Environment file in pip-freeze format (name==version per line)
    #[arg(short, long)]
    env: Option<PathBuf>,

    /// Requirements file whose constraints the plan must respect
    #[arg(short, long)]
    requirements: Option<PathBuf>,

    /// Emit the raw resolution result as JSON
    #[arg(long)]
    json: bool,

    /// Graph service endpoint
    #[arg(long, default_value = "http://localhost:7474", env = "PYPLAN_GRAPH_URL")]
    graph_url: String,

    /// Graph database name
    #[arg(long, default_value = "neo4j", env = "PYPLAN_GRAPH_DATABASE")]
    graph_database: String,

    /// Graph service username
    #[arg(long, default_value = "neo4j", env = "PYPLAN_GRAPH_USER")]
    graph_user: String,

    /// Graph service password
    #[arg(long, default_value = "", env = "PYPLAN_GRAPH_PASSWORD", hide_env_values = true)]
    graph_password: String,

    /// Abort resolution after this many planned selections
    #[arg(long, default_value_t = pyplan::resolver::DEFAULT_MAX_PLAN_PACKAGES)]
    max_packages: usize,

    /// Abort resolution after this many queued constraints
    #[arg(long, default_value_t = pyplan::resolver::DEFAULT_MAX_QUEUE_ENTRIES)]
    max_queue: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether one new package is installable against the environment
    Check {
        /// Package to check
        package: String,
        /// Version constraint, e.g. "==4.57.2" (empty accepts any version)
        #[arg(default_value = "")]
        constraint: String,
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Plan a single install, upgrading installed packages where necessary
    Install {
        /// Package to install
        package: String,
        /// Minimum-version constraint, e.g. ">=0.110.0"
        #[arg(default_value = "")]
        constraint: String,
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Plan several installs at once, upgrading where necessary
    InstallMulti {
        /// Targets as requirement strings, e.g. "fastapi>=0.110.0"
        #[arg(required = true)]
        targets: Vec<String>,
        #[command(flatten)]
        common: CommonArgs,
    },
}

/// Parse a pip-freeze environment file into a name→version map
fn load_environment(path: &Path) -> Result<Environment> {
    let mut env = Environment::new();
    for line in load_requirement_lines(path)? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (name, version) = line
            .split_once("==")
            .with_context(|| format!("Environment line '{}' is not name==version", line))?;
        env.insert(name.trim().to_string(), version.trim().to_string());
    }
    Ok(env)
}

fn load_inputs(common: &CommonArgs) -> Result<(Environment, Vec<String>)> {
    let env = match &common.env {
        Some(path) => load_environment(path)?,
        None => Environment::new(),
    };
    let requirements = match &common.requirements {
        Some(path) => load_requirement_lines(path)?,
        None => Vec::new(),
    };
    Ok((env, requirements))
}

fn build_resolver(common: &CommonArgs) -> Result<Resolver<GraphClient>> {
    let client = GraphClient::new(GraphClientConfig {
        endpoint: common.graph_url.clone(),
        database: common.graph_database.clone(),
        username: common.graph_user.clone(),
        password: common.graph_password.clone(),
    })?;
    Ok(Resolver::with_config(
        client,
        ResolverConfig {
            max_plan_packages: common.max_packages,
            max_queue_entries: common.max_queue,
        },
    ))
}

fn report(result: &ResolutionResult, json: bool) -> Result<bool> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(result.ok);
    }

    if result.ok {
        println!("ok: a consistent install plan exists");
        let mut changed = false;
        for selection in result.plan.iter() {
            if selection.source != SelectionSource::Existing {
                println!(
                    "  {}=={} ({})",
                    selection.name, selection.version, selection.source
                );
                changed = true;
            }
        }
        if !changed {
            println!("  environment already satisfies the request");
        }
    } else {
        println!("conflict: no consistent install plan");
        for conflict in &result.conflicts {
            println!("  {}", conflict);
        }
    }
    Ok(result.ok)
}

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let ok = match cli.command {
        Commands::Check {
            package,
            constraint,
            common,
        } => {
            let (env, requirements) = load_inputs(&common)?;
            let resolver = build_resolver(&common)?;
            let result = resolver.check_single(&env, &requirements, &package, &constraint)?;
            report(&result, common.json)?
        }
        Commands::Install {
            package,
            constraint,
            common,
        } => {
            let (env, requirements) = load_inputs(&common)?;
            let resolver = build_resolver(&common)?;
            let result =
                resolver.install_single_with_upgrade(&env, &requirements, &package, &constraint)?;
            report(&result, common.json)?
        }
        Commands::InstallMulti { targets, common } => {
            let mut new_packages = Vec::with_capacity(targets.len());
            for entry in &targets {
                let requirement = parse_requirement(entry)
                    .with_context(|| format!("Invalid target '{}'", entry))?;
                new_packages.push((requirement.name, requirement.constraint.to_string()));
            }
            let (env, requirements) = load_inputs(&common)?;
            let resolver = build_resolver(&common)?;
            let result =
                resolver.install_multi_with_upgrade(&env, &requirements, &new_packages)?;
            report(&result, common.json)?
        }
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
