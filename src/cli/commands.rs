use crate::config::{FileConfigSource, FrameworkConfig};
use crate::module::ModuleResolver;
use crate::request::RequestContext;
use crate::route::{EntryKind, RouteCatalog, RouteResolver};
use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use http::Method;
use serde_json::json;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Command-line interface for modrouter
///
/// Inspects a configuration directory: resolves URLs against it, compiles
/// every route table, and lists what a module declares.
#[derive(Parser, Debug)]
#[command(name = "modrouter")]
#[command(about = "Module and route resolution tools", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve a URL and print the module and route as JSON
    Resolve {
        /// Configuration root holding modules.* and <module>/routes.*
        #[arg(short, long, env = "MODROUTER_CONFIG")]
        config: PathBuf,

        /// Absolute URL, e.g. https://admin.example.com/account/profile
        #[arg(short, long)]
        url: String,

        #[arg(short, long, default_value = "GET")]
        method: String,
    },
    /// Compile every module's route table and report problems
    Check {
        #[arg(short, long, env = "MODROUTER_CONFIG")]
        config: PathBuf,
    },
    /// List the packages and entries of one module
    Routes {
        #[arg(short, long, env = "MODROUTER_CONFIG")]
        config: PathBuf,

        #[arg(short = 'M', long)]
        module: String,
    },
}

/// Parse the process arguments and run the selected command
pub fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let stdout = std::io::stdout();
    execute(&cli.command, &mut stdout.lock())
}

/// Run `command`, writing its report to `out`
pub fn execute(command: &Commands, out: &mut impl Write) -> anyhow::Result<()> {
    match command {
        Commands::Resolve { config, url, method } => {
            let resolver = load_resolver(config)?;
            let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                .with_context(|| format!("invalid HTTP method '{method}'"))?;
            let request = RequestContext::from_url(method, url)?;
            let module = resolver.modules().resolve(&request.host, &request.path);
            let route = resolver
                .resolve(&module, &request, false)
                .map_err(|e| anyhow!("{e}"))?;
            let report = json!({ "module": module, "route": route });
            writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
        }
        Commands::Check { config } => {
            let resolver = load_resolver(config)?;
            let names = resolver.modules().module_names();
            let mut failures = Vec::new();
            for name in &names {
                match resolver.catalog().table(name) {
                    Ok(table) => writeln!(
                        out,
                        "ok    {name}: {} packages, {} entries",
                        table.package_keys().len(),
                        table.entry_count()
                    )?,
                    Err(e) => {
                        writeln!(out, "error {name}: {e}")?;
                        failures.push(name.clone());
                    }
                }
            }
            if !failures.is_empty() {
                return Err(anyhow!("{} of {} modules failed to compile", failures.len(), names.len()));
            }
        }
        Commands::Routes { config, module } => {
            let resolver = load_resolver(config)?;
            if !resolver.modules().is_module(module) {
                return Err(anyhow!("unknown module '{module}'"));
            }
            let table = resolver.catalog().table(module)?;
            for package in table.package_keys() {
                writeln!(out, "{package}")?;
                for entry in table.package(package).unwrap_or_default() {
                    let kind = match entry.kind {
                        EntryKind::Route => "",
                        EntryKind::Fallback => " [fallback]",
                        EntryKind::DynamicMarker => " [dynamic]",
                    };
                    writeln!(
                        out,
                        "  {:<7} {:<32} {}{kind}",
                        entry.http_method.as_deref().unwrap_or("*"),
                        entry.pattern,
                        entry.action.as_deref().unwrap_or("-"),
                    )?;
                }
            }
        }
    }
    Ok(())
}

/// Build a resolver over the configuration directory `root`
pub fn load_resolver(root: &Path) -> anyhow::Result<RouteResolver> {
    let config = Arc::new(FrameworkConfig::load_from_dir(root)?);
    let source = FileConfigSource::new(root);
    let modules = Arc::new(ModuleResolver::from_source(&source, &config)?);
    let catalog = Arc::new(RouteCatalog::new(Arc::new(source), Arc::clone(&config)));
    Ok(RouteResolver::new(config, modules, catalog))
}
