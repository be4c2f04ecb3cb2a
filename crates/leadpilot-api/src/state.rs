//! Application state wiring all services together.
//!
//! The core orchestrator is generic over its cache, log and tool set;
//! AppState pins it to the concrete infra implementations.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use leadpilot_core::llm::box_provider::BoxLlmProvider;
use leadpilot_core::orchestrator::{Orchestrator, OrchestratorSettings};
use leadpilot_core::session::store::SessionStore;
use leadpilot_core::tools::book_meeting::BookMeetingTool;
use leadpilot_core::tools::dispatcher::ToolDispatcher;
use leadpilot_core::tools::notify_team::NotifyTeamTool;
use leadpilot_core::tools::save_lead::SaveLeadTool;
use leadpilot_infra::alert::SlackWebhookAlerter;
use leadpilot_infra::cache::InMemorySessionCache;
use leadpilot_infra::calendar::GoogleCalendar;
use leadpilot_infra::llm::openai::OpenAiProvider;
use leadpilot_infra::mail::SmtpMailer;
use leadpilot_infra::sqlite::conversation::SqliteConversationLog;
use leadpilot_infra::sqlite::lead::SqliteLeadRepository;
use leadpilot_infra::sqlite::pool::DatabasePool;
use leadpilot_types::config::AppConfig;

/// Concrete type aliases for the core generics pinned to infra implementations.
pub type ConcreteTools = ToolDispatcher<
    SqliteLeadRepository,
    SqliteConversationLog,
    GoogleCalendar,
    SmtpMailer,
    SlackWebhookAlerter,
>;

pub type ConcreteSessionStore = SessionStore<InMemorySessionCache, SqliteConversationLog>;

pub type ConcreteOrchestrator =
    Orchestrator<InMemorySessionCache, SqliteConversationLog, ConcreteTools>;

/// Shared application state handed to every HTTP handler.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ConcreteOrchestrator>,
    pub cache: InMemorySessionCache,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Connect to the database and the configured model provider, then wire
    /// the orchestrator.
    pub async fn init(config: &AppConfig) -> anyhow::Result<Self> {
        let db_pool = DatabasePool::new(&config.database.url).await?;
        let provider = OpenAiProvider::new(&config.llm)?;
        Self::build(config, db_pool, BoxLlmProvider::new(provider))
    }

    /// Wire the services around an already-open pool and provider.
    pub fn build(
        config: &AppConfig,
        db_pool: DatabasePool,
        provider: BoxLlmProvider,
    ) -> anyhow::Result<Self> {
        let cache = InMemorySessionCache::from_config(&config.session);
        let conversations = SqliteConversationLog::new(db_pool.clone());
        let leads = SqliteLeadRepository::new(db_pool.clone());

        let calendar = GoogleCalendar::from_config(&config.calendar)?;
        let mailer = SmtpMailer::from_config(&config.email)?;
        let alerts = SlackWebhookAlerter::from_config(&config.alert)?;

        let tools = ToolDispatcher::new(
            SaveLeadTool::new(leads, conversations.clone(), config.scoring.default_clarity),
            BookMeetingTool::new(calendar, mailer),
            NotifyTeamTool::new(alerts),
        );

        let sessions = Arc::new(SessionStore::new(cache.clone(), conversations));
        let orchestrator = Orchestrator::new(
            provider,
            sessions,
            tools,
            OrchestratorSettings::from_config(&config.llm, &config.agent),
        );

        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            cache,
            db_pool,
        })
    }

    pub fn sessions(&self) -> &Arc<ConcreteSessionStore> {
        self.orchestrator.sessions()
    }

    /// Start the background sweep that evicts expired cache entries.
    pub fn spawn_cache_sweeper(
        &self,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        self.cache.spawn_sweeper(interval, cancel)
    }
}
