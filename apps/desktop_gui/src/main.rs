//! Banter desktop client binary: spawns the backend worker thread and hands
//! the UI over to eframe.

mod backend_bridge;
mod controller;
mod media;
mod notify;
mod ui;

use clap::Parser;
use crossbeam_channel::bounded;

use crate::backend_bridge::commands::BackendCommand;
use crate::backend_bridge::runtime::spawn_backend_thread;
use crate::controller::events::UiEvent;
use crate::ui::theme::{PersistedDesktopSettings, SETTINGS_STORAGE_KEY};
use crate::ui::{DesktopApp, StartupConfig};

#[derive(Parser, Debug)]
#[command(name = "banter", about = "Banter desktop messaging client")]
struct Args {
    /// Server base URL prefilled on the sign-in form.
    #[arg(long, default_value = "http://127.0.0.1:5001")]
    server_url: String,
    /// Email address prefilled on the sign-in form.
    #[arg(long, default_value = "")]
    email: String,
    /// Tracing filter, e.g. "info" or "desktop_gui=debug,client_core=debug".
    #[arg(long, default_value = "info")]
    log_filter: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(args.log_filter)
        .init();

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(256);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(2048);
    spawn_backend_thread(cmd_rx, ui_tx);

    let startup = StartupConfig {
        server_url: args.server_url,
        email: args.email,
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Banter")
            .with_inner_size([1180.0, 760.0])
            .with_min_inner_size([860.0, 560.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Banter",
        options,
        Box::new(|cc| {
            let persisted_settings = cc.storage.and_then(|storage| {
                storage
                    .get_string(SETTINGS_STORAGE_KEY)
                    .and_then(|text| serde_json::from_str::<PersistedDesktopSettings>(&text).ok())
            });
            Ok(Box::new(DesktopApp::new(
                cmd_tx,
                ui_rx,
                persisted_settings,
                startup,
            )))
        }),
    )
    .map_err(|err| anyhow::anyhow!("desktop shell exited with error: {err}"))
}
