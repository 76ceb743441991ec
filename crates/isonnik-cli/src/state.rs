//! Application state wiring all services together.
//!
//! The core services are generic over the store and backend ports; AppState
//! pins them to the profile store and the reqwest backend.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use isonnik_core::account::AccountService;
use isonnik_core::chat::{
    ChatCollectionService, ContextService, DispatchOptions, HistoryReconciler, MessageDispatcher,
    Reconciled, SingleChat,
};
use isonnik_core::quota::{QuotaTracker, SubscriptionService};
use isonnik_core::render::SessionSink;
use isonnik_core::storage::credentials::CredentialStore;
use isonnik_infra::config::{apply_overrides, load_client_config};
use isonnik_infra::filesystem::resolve_data_dir;
use isonnik_infra::http::HttpChatBackend;
use isonnik_infra::kv::ProfileStore;
use isonnik_infra::speech::CommandSpeech;
use isonnik_types::config::ClientConfig;
use isonnik_types::error::ClientError;
use tracing::debug;

pub type Store = ProfileStore;
pub type Backend = HttpChatBackend;

pub type SingleDispatcher = MessageDispatcher<SingleChat<Store>, Store, Backend>;
pub type ThreadDispatcher = MessageDispatcher<ChatCollectionService<Store>, Store, Backend>;

/// Global flags that change how state is built.
#[derive(Debug, Default, Clone)]
pub struct StateOptions {
    pub api_url: Option<String>,
    pub profile: Option<String>,
    /// Keep everything in memory for this run only.
    pub ephemeral: bool,
}

/// Shared application state holding all services.
pub struct AppState {
    pub config: ClientConfig,
    pub store: Arc<Store>,
    pub backend: Arc<Backend>,
    pub credentials: CredentialStore<Store>,
    pub chat: Arc<SingleChat<Store>>,
    pub chats: Arc<ChatCollectionService<Store>>,
    pub quota: QuotaTracker<Store>,
    pub reconciler: HistoryReconciler<Store, Backend>,
    pub dispatcher: SingleDispatcher,
    pub thread_dispatcher: ThreadDispatcher,
    pub context: ContextService<Store, Backend>,
    pub subscriptions: SubscriptionService<Store, Backend>,
    pub accounts: AccountService<Store, Backend>,
    pub speech: CommandSpeech,
}

impl AppState {
    /// Load config, open the profile store and wire the services.
    pub async fn init(options: StateOptions) -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        let config = apply_overrides(
            load_client_config(&data_dir).await,
            options.api_url,
            options.profile,
        );

        let store = if options.ephemeral {
            ProfileStore::ephemeral()
        } else {
            ProfileStore::open(&data_dir, &config.profile, config.storage)
                .await
                .with_context(|| format!("failed to open profile '{}'", config.profile))?
        };
        debug!(store = %store.describe(), profile = %config.profile, "Profile store opened");
        let store = Arc::new(store);

        let backend = Arc::new(
            HttpChatBackend::new(
                &config.api_base_url,
                Duration::from_secs(config.request_timeout_secs),
            )
            .context("failed to build backend client")?,
        );

        let credentials = CredentialStore::new(Arc::clone(&store));
        let chat = Arc::new(SingleChat::new(Arc::clone(&store), &config.welcome_message));
        let chats = Arc::new(ChatCollectionService::new(Arc::clone(&store)));
        chats.load().await.context("failed to load chat list")?;
        let quota = QuotaTracker::new(Arc::clone(&store), config.free_message_limit);

        let dispatch_options = DispatchOptions {
            single_flight: config.single_flight,
            limits_gate: config.limits_gate,
        };

        let reconciler =
            HistoryReconciler::new(Arc::clone(&backend), credentials.clone(), Arc::clone(&chat));
        let dispatcher = MessageDispatcher::new(
            Arc::clone(&chat),
            Arc::clone(&backend),
            credentials.clone(),
            quota.clone(),
            dispatch_options,
        );
        let thread_dispatcher = MessageDispatcher::new(
            Arc::clone(&chats),
            Arc::clone(&backend),
            credentials.clone(),
            quota.clone(),
            dispatch_options,
        );
        let context =
            ContextService::new(Arc::clone(&backend), credentials.clone(), Arc::clone(&chat));
        let subscriptions = SubscriptionService::new(
            Arc::clone(&backend),
            credentials.clone(),
            quota.clone(),
            config.payment_amount,
            config.payment_description.clone(),
        );
        let accounts = AccountService::new(
            Arc::clone(&backend),
            credentials.clone(),
            Arc::clone(&chat),
            Arc::clone(&chats),
            quota.clone(),
        );
        let speech = CommandSpeech::from_config(&config.speech);

        Ok(Self {
            config,
            store,
            backend,
            credentials,
            chat,
            chats,
            quota,
            reconciler,
            dispatcher,
            thread_dispatcher,
            context,
            subscriptions,
            accounts,
            speech,
        })
    }

    /// Startup for the synced chat: reconcile history and refresh the quota
    /// concurrently, then render the indicator.
    pub async fn start_session(&self, sink: &dyn SessionSink) -> Result<Reconciled, ClientError> {
        let token = self.credentials.load().await?;
        let (reconciled, _) = tokio::join!(
            self.reconciler.initialize_session(sink),
            self.quota
                .refresh_from_backend(self.backend.as_ref(), token.as_ref(), sink),
        );
        let reconciled = reconciled?;
        self.quota.render_indicator(sink).await?;
        Ok(reconciled)
    }
}
