mod app;
mod background;
mod completion;
mod config;
mod error;
mod event;
mod logging;
mod markdown;
mod session;
mod state;
mod theme;
mod transcript;
mod transform;

use app::ChatApp;
use completion::CompletionClient;
use config::Config;
use eframe::egui;
use session::history::MessageStore;
use session::saved::SessionManager;
use session::store::SlotStore;
use state::AppState;
use std::sync::mpsc;
use tracing::info;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    logging::init(&config.log_level);

    let data_dir = config.resolved_data_dir();
    let store = SlotStore::new(&data_dir);

    let (tx, rx) = mpsc::channel();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("chatbot-ui-runtime")
        .build()?;
    let client = runtime.block_on(async { CompletionClient::new(&config.endpoint, tx) })?;
    info!(
        chat_url = client.chat_url(),
        data_dir = %data_dir.display(),
        "starting chatbot-ui"
    );

    let app = ChatApp::new(
        rx,
        client,
        MessageStore::restore(store.clone()),
        SessionManager::restore(store.clone()),
        AppState::restore(store),
    );
    let _runtime = runtime;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Chatbot UI")
            .with_inner_size(config.window_size)
            .with_min_inner_size([480.0, 360.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Chatbot UI",
        native_options,
        Box::new(move |_creation_context| Ok(Box::new(app))),
    )?;

    Ok(())
}
