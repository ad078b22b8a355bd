use std::{collections::HashMap, fs, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use crossbeam_channel::bounded;
use recipe_view::{
    launch_bridge, BridgeCommand, EventEffect, NavigationEvent, RenderTree, ScreenController,
    UiEvent,
};
use remote_config::{
    HttpRemoteConfigBackend, MissingRemoteConfigBackend, RemoteConfigBackend, RemoteFlagStore,
    StaticRemoteConfigBackend,
};
use shared::domain::{Recipe, Section};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, Settings};

/// Preview the recipe details screen with remotely configured step styles.
#[derive(Parser, Debug)]
struct Args {
    /// Recipe JSON file. Defaults to a built-in sample.
    #[arg(long, conflicts_with = "sample")]
    recipe: Option<PathBuf>,
    /// Index of the built-in sample recipe.
    #[arg(long)]
    sample: Option<usize>,
    #[arg(long, default_value = "ingredients")]
    section: Section,
    #[arg(long)]
    remote_config_url: Option<String>,
    /// Serve these flags instead of contacting a backend, e.g. --flag stepsStyle=circle.
    #[arg(long = "flag", value_parser = parse_flag)]
    flags: Vec<(String, String)>,
    /// How long to wait for the refresh before giving up on a re-render.
    #[arg(long)]
    wait_ms: Option<u64>,
    /// Request a dismiss after rendering.
    #[arg(long)]
    dismiss: bool,
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings()?;
    if let Some(url) = &args.remote_config_url {
        settings.remote_config_url = Some(url.clone());
    }
    if let Some(wait_ms) = args.wait_ms {
        settings.refresh_wait_ms = wait_ms;
    }

    let recipe = Arc::new(load_recipe(&args)?);
    let backend = build_backend(&settings, &args.flags)?;
    let flags = RemoteFlagStore::with_settings(
        backend,
        settings.flag_defaults.clone(),
        settings.flag_store_settings(),
    );

    let (cmd_tx, cmd_rx) = bounded::<BridgeCommand>(16);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(64);
    let (nav_tx, nav_rx) = bounded::<NavigationEvent>(4);
    let bridge = launch_bridge(Arc::clone(&flags), cmd_rx, ui_tx)
        .context("failed to start flag refresh worker")?;

    let mut controller = ScreenController::new(recipe, flags, nav_tx, cmd_tx.clone(), ui_rx);
    controller.select_section(args.section);
    print_tree(controller.on_mount(), args.json)?;

    match controller.wait_for_refresh(Duration::from_millis(settings.refresh_wait_ms)) {
        Some(EventEffect::Rerendered) => {
            if let Some(tree) = controller.tree() {
                println!("--- remote config activated ---");
                print_tree(tree, args.json)?;
            }
        }
        Some(_) => info!(status = controller.status(), "flag refresh left the screen unchanged"),
        None => warn!(
            wait_ms = settings.refresh_wait_ms,
            "flag refresh still pending; keeping current render"
        ),
    }

    if args.dismiss {
        controller.on_dismiss_requested();
        while let Ok(NavigationEvent::Pop) = nav_rx.try_recv() {
            println!("navigation: pop");
        }
    }

    let _ = cmd_tx.send(BridgeCommand::Shutdown);
    drop(controller);
    if bridge.join().is_err() {
        warn!("flag refresh worker panicked");
    }
    Ok(())
}

fn load_recipe(args: &Args) -> Result<Recipe> {
    if let Some(path) = &args.recipe {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read recipe '{}'", path.display()))?;
        return Recipe::from_json(&raw)
            .with_context(|| format!("invalid recipe json in '{}'", path.display()));
    }

    let index = args.sample.unwrap_or(0);
    let samples = Recipe::samples();
    let count = samples.len();
    samples
        .into_iter()
        .nth(index)
        .ok_or_else(|| anyhow!("sample {index} does not exist ({count} samples available)"))
}

fn build_backend(
    settings: &Settings,
    static_flags: &[(String, String)],
) -> Result<Arc<dyn RemoteConfigBackend>> {
    if !static_flags.is_empty() {
        let values: HashMap<String, String> = static_flags.iter().cloned().collect();
        info!(keys = values.len(), "serving flags from the command line");
        return Ok(Arc::new(StaticRemoteConfigBackend::new(values)));
    }

    match settings.remote_config_endpoint()? {
        Some(endpoint) => {
            info!(%endpoint, "fetching remote config over http");
            Ok(Arc::new(HttpRemoteConfigBackend::new(
                endpoint,
                settings.app_id.clone(),
            )))
        }
        None => {
            info!("no remote config url configured; using local defaults");
            Ok(Arc::new(MissingRemoteConfigBackend))
        }
    }
}

fn print_tree(tree: &RenderTree, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(tree)?);
    } else {
        print!("{tree}");
    }
    Ok(())
}

fn parse_flag(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("flag key is empty in '{raw}'"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}
