use std::sync::Arc;

use gatebot_core::{
    config::Config,
    store::{MemoryStore, PortalStore},
};

#[tokio::main]
async fn main() -> Result<(), gatebot_core::Error> {
    gatebot_core::logging::init("gatebot");

    let cfg = Arc::new(Config::load()?);
    let store: Arc<dyn PortalStore> = Arc::new(MemoryStore::new());

    gatebot_telegram::router::run_polling(cfg, store)
        .await
        .map_err(|e| gatebot_core::Error::Platform(format!("telegram bot failed: {e}")))?;

    Ok(())
}
