use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Parser;
use directories::ProjectDirs;
use eframe::egui;
use pagedesk_core::{FileHistoryStore, Session, ViewerConfig};
use pagedesk_gui::ViewerApp;
use pagedesk_render::PdfiumEngine;
use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{prelude::*, EnvFilter};

#[derive(Debug, Parser)]
#[command(
    name = "pagedesk",
    version,
    about = "Desktop PDF viewer and page editor"
)]
struct Args {
    /// Page to open the document on (0-based)
    #[arg(short = 'p', long = "page")]
    page: Option<usize>,

    /// PDF file to open at startup
    file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let project_dirs = ProjectDirs::from("net", "pagedesk", "pagedesk")
        .ok_or_else(|| anyhow!("unable to resolve platform data directories"))?;
    let _log_guard = init_logging(&project_dirs)?;

    let config = ViewerConfig::load(&project_dirs.config_dir().join("config.toml"));
    let history_path = project_dirs
        .data_local_dir()
        .join("state")
        .join("history.json");
    let store = FileHistoryStore::new(history_path)?;
    let session = Session::new(config.clone(), Box::new(store));
    let engine = PdfiumEngine::new()?;

    let mut viewport = egui::ViewportBuilder::default()
        .with_inner_size([1400.0, 900.0])
        .with_min_inner_size([800.0, 600.0])
        .with_title("Pagedesk");
    if let Some(icon) = load_icon(&config) {
        viewport = viewport.with_icon(icon);
    }
    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        "Pagedesk",
        options,
        Box::new(move |cc| {
            let mut app = ViewerApp::new(Box::new(engine), session);
            if let Some(path) = args.file {
                app.open_file_at(&cc.egui_ctx, path, args.page);
            }
            Ok(Box::new(app))
        }),
    )
    .map_err(|err| anyhow!("failed to run the viewer: {err}"))
}

fn init_logging(project_dirs: &ProjectDirs) -> Result<WorkerGuard> {
    let log_dir = project_dirs.data_local_dir().join("logs");
    fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::never(log_dir, "pagedesk.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(file_writer);
    let console_layer = tracing_subscriber::fmt::layer();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|err| anyhow!(err))?;

    Ok(guard)
}

fn load_icon(config: &ViewerConfig) -> Option<egui::IconData> {
    let path = config.icon_path.as_ref()?;
    match image::open(path) {
        Ok(decoded) => {
            let rgba = decoded.to_rgba8();
            let (width, height) = rgba.dimensions();
            Some(egui::IconData {
                rgba: rgba.into_raw(),
                width,
                height,
            })
        }
        Err(err) => {
            warn!(?err, ?path, "failed to load window icon");
            None
        }
    }
}
