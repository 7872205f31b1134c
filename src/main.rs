#[cfg(not(target_arch = "wasm32"))]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use podcast_wizard::core::config::Config;
    use podcast_wizard::core::io::NativeStorage;
    use podcast_wizard::services::api::HttpBackend;
    use podcast_wizard::services::synthesis::FileAudioSink;
    use podcast_wizard::services::workflow::WizardController;
    use std::sync::Arc;

    env_logger::init();

    let config = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading config: {:#}", e);
            eprintln!("Please check 'config.yml' or remove it to use the defaults.");
            return Err(e);
        }
    };
    config.ensure_directories()?;

    let backend = Arc::new(HttpBackend::new(&config.backend)?);
    let storage = Arc::new(NativeStorage::new(&config.prefs_folder));
    let sink = Arc::new(FileAudioSink::new(&config.output_folder));

    let mut controller = WizardController::new(config, backend, storage, sink).await?;
    podcast_wizard::ui::console::run(&mut controller).await
}

// The browser build starts from `podcast_wizard::start`.
#[cfg(target_arch = "wasm32")]
fn main() {}
