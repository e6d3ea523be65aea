use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tracing::{info, warn};
use trace_adapters::embeddings::{OpenAiEmbeddingAdapter, OpenAiEmbeddingConfig};
use trace_adapters::openai::{OpenAiAdapter, OpenAiConfig};
use trace_graph::{GraphStore, InMemoryGraphStore, Neo4jGraphStore, Neo4jSettings};
use trace_orchestrator::{
    DecisionOrchestrator, DecisionRequest, EvidenceItem, OrchestratorConfig,
    TracingDecisionObserver,
};
use trace_policy::KnowledgeBase;
use trace_primitives::NodeId;
use trace_server::{AppState, Cli, Command, Settings, StoreKind, serve};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let settings = cli.settings;

    let command = cli.command.unwrap_or(Command::Serve);

    trace_telemetry::init_tracing(&settings.log_level, settings.log_format)?;
    settings.validate(&command).map_err(|reason| anyhow!(reason))?;

    if matches!(command, Command::Seed { .. }) && settings.store == StoreKind::Memory {
        warn!("the memory store seeds the sample organisation on every start; nothing to persist");
        return Ok(());
    }

    let store = open_store(&settings).await?;

    if let Command::Seed { file, database } = &command {
        let knowledge_base = match file {
            Some(path) => {
                let text = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("reading {}", path.display()))?;
                KnowledgeBase::from_json(&text)?
            }
            None => KnowledgeBase::builtin()?,
        };
        let target = match database.as_deref() {
            Some(name) => store.scoped(name).await?,
            None => store,
        };
        let summary = knowledge_base.load_into(target.as_ref()).await?;
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let orchestrator = build_orchestrator(&settings, store)?;

    match command {
        Command::Serve => serve(AppState::new(orchestrator), settings.listen_addr()).await?,
        Command::Decide {
            request,
            evidence,
            actor,
            database,
        } => {
            let mut decision = DecisionRequest::new(request);
            decision.evidence = evidence.into_iter().map(EvidenceItem::Text).collect();
            decision.actor = actor.map(NodeId::new).transpose()?;
            decision.database = database;
            let outcome = orchestrator.decide(decision).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::Trace { id, database } => {
            let id = NodeId::new(id)?;
            let store = orchestrator.store_for(database.as_deref()).await?;
            let trace = store
                .decision_trace(&id)
                .await?
                .ok_or_else(|| anyhow!("decision {id} not found"))?;
            println!("{}", serde_json::to_string_pretty(&trace)?);
        }
        Command::Embed { ids, database } => {
            for id in ids {
                let id = NodeId::new(id)?;
                let indexed = orchestrator.index_decision(&id, database.as_deref()).await?;
                println!("{id}: {}", if indexed { "indexed" } else { "skipped" });
            }
        }
        Command::Seed { .. } => {}
    }

    Ok(())
}

async fn open_store(settings: &Settings) -> Result<Arc<dyn GraphStore>> {
    match settings.store {
        StoreKind::Neo4j => {
            let password = settings.neo4j_password.clone().unwrap_or_default();
            let neo4j = Neo4jSettings::new(
                settings.neo4j_uri.clone(),
                settings.neo4j_username.clone(),
                password,
            )
            .with_database(settings.neo4j_database.clone());
            let store = Neo4jGraphStore::connect(neo4j)
                .await
                .context("connecting to Neo4j")?;
            Ok(Arc::new(store))
        }
        StoreKind::Memory => {
            let store = InMemoryGraphStore::new().with_database(settings.neo4j_database.clone());
            let summary = KnowledgeBase::builtin()?.load_into(&store).await?;
            info!(policies = summary.policies, "seeded in-memory store with sample organisation");
            Ok(Arc::new(store))
        }
    }
}

fn build_orchestrator(
    settings: &Settings,
    store: Arc<dyn GraphStore>,
) -> Result<DecisionOrchestrator> {
    let api_key = settings.openai_api_key.clone().unwrap_or_default();

    let mut chat = OpenAiConfig::new(settings.llm_model.clone())
        .with_api_key(api_key.clone())
        .with_timeout(settings.request_timeout());
    let mut embedding = OpenAiEmbeddingConfig::new(settings.embedding_model.clone())
        .with_api_key(api_key)
        .with_timeout(settings.request_timeout());
    if let Some(base_url) = &settings.openai_base_url {
        chat = chat.with_base_url(base_url)?;
        embedding = embedding.with_base_url(base_url)?;
    }
    if let Some(temperature) = settings.llm_temperature {
        chat = chat.with_default_temperature(temperature);
    }

    let config = OrchestratorConfig {
        precedent_top_k: settings.precedent_top_k,
        actor_name: settings.actor_name.clone(),
        temperature: settings.llm_temperature,
        ..OrchestratorConfig::default()
    };

    Ok(DecisionOrchestrator::new(
        store,
        Arc::new(OpenAiAdapter::new(chat)?),
        Arc::new(OpenAiEmbeddingAdapter::new(embedding)?),
    )
    .with_config(config)
    .with_observer(Arc::new(TracingDecisionObserver)))
}
