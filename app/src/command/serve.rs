use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tonic::transport::Server;
use tracing::info;

use ember_config::Config;
use ember_conversation::{
    OrchestratorConfig, ReaperConfig, SessionReaper, SessionStore, SessionStoreConfig,
    TurnOrchestrator,
};
use ember_core::{Embedder, MemoryStore, MessageStore, ToolRegistry};
use ember_providers::{OpenAiProvider, ZeroEmbedder};
use ember_server::{AssistantServiceServer, ChatService};
use ember_storage::Storage;
use ember_tools::SaveMemoryTool;

/// Parameters for the `serve` command.
#[derive(Debug, Clone)]
pub struct ServeInput {
    /// Listen address override; `None` uses the config file.
    pub listen: Option<String>,
}

/// Wires storage, provider, tools, sessions, and the reaper together and
/// runs the gRPC gateway until interrupted.
#[derive(Debug, Clone, Copy)]
pub struct ServeStrategy;

impl super::CommandStrategy for ServeStrategy {
    type Input = ServeInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;
        info!("Loaded config from ~/.ember/config.json");

        let storage = Arc::new(Storage::connect(&config.database.url).await?);
        storage.ping().await?;
        info!("Connected to database: {}", config.database.url);

        let messages: Arc<dyn MessageStore> = storage.clone();
        let memories: Arc<dyn MemoryStore> = storage;

        let mut provider = OpenAiProvider::new(config.providers.openai.api_key.clone())
            .with_model(config.providers.openai.model.clone());
        if let Some(base_url) = config.providers.openai.base_url.clone() {
            provider = provider.with_base_url(base_url);
        }

        let embedder: Arc<dyn Embedder> = Arc::new(ZeroEmbedder::new(config.memory.embedding_dim));

        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(SaveMemoryTool::new(memories.clone(), embedder)));
        let registry = Arc::new(registry);
        info!("Registered tools: {:?}", registry.list());

        let sessions = Arc::new(SessionStore::new(
            messages.clone(),
            memories,
            SessionStoreConfig {
                memory_limit: config.memory.recent_limit,
                ..SessionStoreConfig::default()
            },
        ));

        let orchestrator = Arc::new(
            TurnOrchestrator::new(Arc::new(provider), messages, registry).with_config(
                OrchestratorConfig {
                    model: Some(config.providers.openai.model.clone()),
                    turn_timeout: None,
                },
            ),
        );

        let reaper = SessionReaper::new(
            sessions.clone(),
            ReaperConfig {
                interval: Duration::from_secs(config.session.reap_interval_secs),
                idle_threshold: Duration::from_secs(config.session.idle_timeout_secs),
            },
        )
        .spawn();

        let addr: SocketAddr = input
            .listen
            .unwrap_or_else(|| config.server.listen_addr.clone())
            .parse()?;

        let service = AssistantServiceServer::new(ChatService::new(sessions, orchestrator))
            .max_decoding_message_size(config.server.max_message_bytes)
            .max_encoding_message_size(config.server.max_message_bytes);

        info!("gRPC gateway listening on {addr}");
        Server::builder()
            .add_service(service)
            .serve_with_shutdown(addr, async {
                let _ = tokio::signal::ctrl_c().await;
                info!("Shutdown signal received");
            })
            .await?;

        reaper.shutdown().await;
        info!("Gateway stopped");
        Ok(())
    }
}
