use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

use headlines::api::ApiClient;
use headlines::app::{App, AppEvent, View, VIEW_PREFERENCE_KEY};
use headlines::config::Config;
use headlines::storage::{Database, DatabaseError};
use headlines::theme::{detect_system_theme, ThemeSignal};
use headlines::timeline::{LoadState, TimelineLoader};
use headlines::ui;
use headlines::util::{format_relative_time, sanitize_line};

/// Get the config directory path (~/.config/headlines/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    let config_dir = PathBuf::from(home).join(".config").join("headlines");
    Ok(config_dir)
}

#[derive(Parser, Debug)]
#[command(
    name = "headlines",
    about = "Terminal client for aggregated headlines and a clustered story timeline"
)]
struct Args {
    /// Server base URL (overrides `server_url` in the config file)
    #[arg(long, value_name = "URL")]
    server: Option<String>,

    /// Config file (default: ~/.config/headlines/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the timeline instead of starting the TUI
    Timeline {
        /// Number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: usize,
        /// Items per page
        #[arg(long)]
        limit: Option<usize>,
        /// Only stories from the last N days
        #[arg(long)]
        days: Option<u32>,
    },
    /// Print story clusters
    Clusters,
    /// Show the active theme
    Theme {
        /// Flip and persist the theme choice
        #[arg(long)]
        toggle: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing for debug logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
    }

    // Set directory permissions on Unix (user-only access)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        match std::fs::metadata(&config_dir) {
            Ok(metadata) => {
                let mut perms = metadata.permissions();
                perms.set_mode(0o700);
                if let Err(e) = std::fs::set_permissions(&config_dir, perms) {
                    tracing::warn!(
                        path = %config_dir.display(),
                        error = %e,
                        "Failed to set config directory permissions to 0700"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(
                    path = %config_dir.display(),
                    error = %e,
                    "Failed to read config directory metadata"
                );
            }
        }
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    if let Some(server) = args.server {
        config.server_url = server;
    }

    let db_path = config_dir.join("state.db");
    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = match Database::open(db_path_str).await {
        Ok(db) => db,
        Err(DatabaseError::InstanceLocked) => {
            eprintln!(
                "Error: Another instance of headlines appears to be running. Please close it and try again."
            );
            std::process::exit(1);
        }
        Err(e) => {
            return Err(anyhow::anyhow!("Failed to open database: {}", e));
        }
    };

    let mut theme = ThemeSignal::new(db.clone());
    theme.init(detect_system_theme().or(config.theme_hint())).await;

    let api = ApiClient::new(&config.server_url, config.request_timeout())
        .with_context(|| format!("Invalid server URL: {}", config.server_url))?;

    match args.command {
        Some(Command::Timeline { pages, limit, days }) => {
            let limit = limit.unwrap_or(config.timeline_limit);
            let days = days.unwrap_or(config.timeline_days);
            print_timeline(&api, pages, limit, days).await
        }
        Some(Command::Clusters) => print_clusters(&api).await,
        Some(Command::Theme { toggle }) => {
            if toggle {
                theme.toggle().await;
            }
            println!("{}", theme.current().as_str());
            Ok(())
        }
        None => run_tui(api, db, config, theme).await,
    }
}

async fn run_tui(api: ApiClient, db: Database, config: Config, theme: ThemeSignal) -> Result<()> {
    let mut app = App::new(Arc::new(api), db.clone(), config, theme);

    match db.get_preference(VIEW_PREFERENCE_KEY).await {
        Ok(Some(name)) => {
            if let Some(view) = View::from_str_name(&name) {
                app.set_view(view);
            }
        }
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "Failed to read saved view, ignoring"),
    }

    // Create event channel for background tasks
    let (event_tx, event_rx) = mpsc::channel::<AppEvent>(32);

    ui::run(&mut app, event_tx, event_rx).await
}

async fn print_timeline(api: &ApiClient, pages: usize, limit: usize, days: u32) -> Result<()> {
    let mut loader = TimelineLoader::new(limit, days);
    loader.load_initial(api, limit, days).await;
    for _ in 1..pages {
        if loader.load_more(api).await.is_none() {
            break;
        }
    }

    if loader.state() == LoadState::Errored && loader.is_empty() {
        let summary = loader.last_error().map(|e| e.to_string()).unwrap_or_default();
        anyhow::bail!("Failed to load timeline: {}", summary);
    }

    let now = Local::now();
    for item in loader.items() {
        let cluster = match (item.expandable_cluster(), item.cluster_size) {
            (Some(_), Some(size)) => format!(" [+{}]", size.saturating_sub(1)),
            _ => String::new(),
        };
        println!(
            "{:>10}  {:<24}  {}{}",
            format_relative_time(item.pub_date, &now),
            sanitize_line(&item.feed_title),
            sanitize_line(&item.title),
            cluster
        );
        println!("{:>10}  {}", "", item.link);
    }

    match loader.state() {
        LoadState::Errored => eprintln!(
            "Stopped early: {}",
            loader.last_error().map(|e| e.to_string()).unwrap_or_default()
        ),
        LoadState::Exhausted => eprintln!("{} items (end of timeline)", loader.len()),
        _ => eprintln!("{} of {} items", loader.len(), loader.total_count()),
    }
    Ok(())
}

async fn print_clusters(api: &ApiClient) -> Result<()> {
    let response = api
        .fetch_clusters()
        .await
        .context("Failed to load clusters")?;
    for cluster in &response.clusters {
        println!(
            "[{}] {} ({} stories)",
            cluster.id,
            sanitize_line(&cluster.representative.title),
            cluster.cluster_size
        );
        for story in &cluster.others {
            println!(
                "    {}  {}",
                sanitize_line(&story.feed_title),
                sanitize_line(&story.title)
            );
        }
    }
    eprintln!("{} clusters", response.total_count);
    Ok(())
}
