use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};
use tracing::info;

use gatebot_core::{
    config::Config,
    guard::MembershipGuard,
    platform::ChatPlatform,
    service::PortalService,
    store::PortalStore,
    verify::VerificationEngine,
    wizard::{SetupSessions, SetupWizard},
};

use crate::handlers;
use crate::TelegramPortal;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub store: Arc<dyn PortalStore>,
    pub platform: Arc<dyn ChatPlatform>,
    pub engine: Arc<VerificationEngine>,
    pub guard: Arc<MembershipGuard>,
    pub wizard: Arc<SetupWizard>,
    pub service: Arc<PortalService>,
}

pub async fn run_polling(cfg: Arc<Config>, store: Arc<dyn PortalStore>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    let me = bot.get_me().await?;
    info!(bot = me.username(), "gatebot started");

    let platform: Arc<dyn ChatPlatform> =
        Arc::new(TelegramPortal::new(bot.clone(), me.user.id));

    let engine = Arc::new(VerificationEngine::new(
        store.clone(),
        platform.clone(),
        cfg.invite_expiry_minutes(),
        cfg.invite_max_uses,
    ));
    let guard = Arc::new(MembershipGuard::new(store.clone(), platform.clone()));
    let sessions = Arc::new(SetupSessions::new(
        cfg.setup_session_ttl,
        cfg.setup_session_capacity,
    ));
    let wizard = Arc::new(SetupWizard::new(
        store.clone(),
        platform.clone(),
        sessions,
    ));
    let service = Arc::new(PortalService::new(store.clone()));

    let state = Arc::new(AppState {
        cfg,
        store,
        platform,
        engine,
        guard,
        wizard,
        service,
    });

    // Join events must be declared in the handler tree or Telegram will not
    // deliver chat_member updates over polling.
    let handler = dptree::entry()
        .branch(Update::filter_chat_member().endpoint(handlers::handle_chat_member))
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}
