use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use plugkit::config::HostConfig;
use plugkit::plugins::{AppType, PluginDescriptor, PluginRegistry};

#[derive(Parser)]
#[command(name = "plugkit")]
#[command(about = "Discover and inspect project plugins", long_about = None)]
struct Cli {
    /// Project root (defaults to the current directory)
    #[arg(short, long, global = true)]
    project: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the plugins active for the project
    List {
        /// Extra plugin root to scan (repeatable)
        #[arg(long = "plugins-dir")]
        plugins_dirs: Vec<PathBuf>,
        /// Only show plugins where this property is set (e.g. "ui")
        #[arg(long)]
        property: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Load in-progress plugins from a plugin project's src/features
    Dev {
        /// Root of the plugin project
        plugin_project: PathBuf,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Print the default plugin root
    Root,
    /// Show version information
    Version,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let project = match cli.project {
        Some(p) => p,
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };

    match cli.command {
        Some(Commands::Version) | None => {
            println!("plugkit {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Root) => {
            println!("{}", PluginRegistry::default_root().display());
        }
        Some(Commands::List {
            plugins_dirs,
            property,
            json,
        }) => {
            let host = HostConfig::load().context("Failed to load host config")?;
            let mut registry = PluginRegistry::for_project(&project);
            for dir in host.plugin_roots().into_iter().chain(plugins_dirs) {
                registry.add_root(dir);
            }
            registry.discover_roots();
            print_plugins(&mut registry, property.as_deref(), json)?;
        }
        Some(Commands::Dev {
            plugin_project,
            json,
        }) => {
            let mut registry = PluginRegistry::for_project(&project);
            let added = registry.load_dev(&plugin_project);
            if !json {
                println!("Loaded {} dev plugin(s) from {}", added, plugin_project.display());
            }
            print_plugins(&mut registry, None, json)?;
        }
    }

    Ok(())
}

fn print_plugins(registry: &mut PluginRegistry, property: Option<&str>, json: bool) -> Result<()> {
    let plugins: Vec<PluginDescriptor> = registry.read(property).into_iter().cloned().collect();
    let app_type = registry.app_type().unwrap_or("common").to_string();

    if json {
        let out = serde_json::json!({ "appType": app_type, "plugins": plugins });
        println!(
            "{}",
            serde_json::to_string_pretty(&out).context("Failed to render plugins")?
        );
        return Ok(());
    }

    println!("App type: {}", app_type);
    if plugins.is_empty() {
        println!("No active plugins.");
        return Ok(());
    }
    for plugin in &plugins {
        let ui = match &plugin.ui {
            Some(ui) => ui
                .root_link
                .clone()
                .unwrap_or_else(|| ui.root.display().to_string()),
            None => "-".to_string(),
        };
        println!("  {:<24} {:<12} {}", plugin.name, app_type_label(plugin), ui);
    }
    Ok(())
}

fn app_type_label(plugin: &PluginDescriptor) -> String {
    match &plugin.app_type {
        None => "*".to_string(),
        Some(AppType::Single(t)) => t.clone(),
        Some(AppType::Multiple(types)) => types.join(","),
    }
}
