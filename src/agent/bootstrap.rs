//! Startup wiring. Everything registered here is frozen before the first dispatch.

use super::{Cortex, DomainTableBuilder};
use crate::classifier::{Classifier, StructuredCompletion};
use crate::config::AgentConfig;
use crate::domains::{
    FoundationHandler, IntelHandler, OpsHandler, PlaceholderHandler, TacticalHandler,
};
use crate::gemini::GeminiClient;
use crate::memory::MemoryAdapter;
use crate::models::DomainId;
use crate::strategy::Playbook;
use crate::tools::{create_default_registry, CapabilityRegistry};
use crate::Result;
use std::sync::Arc;
use tracing::info;

/// Validate the configuration and assemble a cortex from injected collaborators.
pub fn bootstrap(
    config: &AgentConfig,
    completion: Arc<dyn StructuredCompletion>,
    capabilities: Arc<CapabilityRegistry>,
    memory: Arc<MemoryAdapter>,
) -> Result<Cortex> {
    config.validate()?;

    let playbook = Arc::new(Playbook::from_tables(&config.strategies)?);

    let mut builder = DomainTableBuilder::new();
    builder.register(
        DomainId::Tactical,
        Arc::new(TacticalHandler::new(capabilities.clone(), playbook.clone())),
    )?;
    builder.register(DomainId::Intel, Arc::new(IntelHandler::new(capabilities.clone())))?;
    builder.register(DomainId::Ops, Arc::new(OpsHandler::new(capabilities.clone())))?;
    builder.register(
        DomainId::Growth,
        Arc::new(PlaceholderHandler::new("The Architect (Growth)")),
    )?;
    builder.register(
        DomainId::Engineering,
        Arc::new(PlaceholderHandler::new("Forge (Engineering)")),
    )?;
    builder.register(
        DomainId::Foundation,
        Arc::new(FoundationHandler::new(capabilities.clone())),
    )?;
    let table = builder.build(config)?;

    let classifier = Classifier::from_config(completion, config);

    info!(
        domains = table.len(),
        fallback = %table.fallback_domain(),
        strategies = playbook.len(),
        capabilities = capabilities.len(),
        "Cortex online"
    );

    Ok(Cortex::new(classifier, table, memory, playbook, capabilities))
}

/// Build every collaborator from configuration: Gemini classifier, default
/// capabilities and the memory adapter.
pub async fn from_config(config: &AgentConfig) -> Result<Cortex> {
    config.validate()?;

    let completion = Arc::new(GeminiClient::new(
        config.llm.api_key.clone().unwrap_or_default(),
        config.llm.model.clone(),
    )?);
    let capabilities = Arc::new(create_default_registry(config)?);
    let memory = Arc::new(MemoryAdapter::from_config(&config.memory).await?);

    bootstrap(config, completion, capabilities, memory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CortexError;
    use crate::memory::LocalFileMemory;
    use crate::strategy::ScoringTable;

    #[tokio::test]
    async fn test_invalid_strategy_table_is_fatal() {
        let mut config = AgentConfig::default();
        let mut broken = ScoringTable::second_day_play();
        broken.min_score = 90.0;
        broken.max_score = 10.0;
        config.strategies.push(broken);

        let memory =
            MemoryAdapter::initialize(2, None, Arc::new(LocalFileMemory::in_memory())).await;
        let completion = Arc::new(GeminiClient::new(String::new(), None).unwrap());

        let result = bootstrap(
            &config,
            completion,
            Arc::new(CapabilityRegistry::new()),
            Arc::new(memory),
        );
        assert!(matches!(result, Err(CortexError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_duplicate_strategy_names_are_fatal() {
        let mut config = AgentConfig::default();
        config.strategies.push(ScoringTable::second_day_play());

        let memory =
            MemoryAdapter::initialize(2, None, Arc::new(LocalFileMemory::in_memory())).await;
        let completion = Arc::new(GeminiClient::new(String::new(), None).unwrap());

        let result = bootstrap(
            &config,
            completion,
            Arc::new(CapabilityRegistry::new()),
            Arc::new(memory),
        );
        assert!(matches!(
            result,
            Err(CortexError::RegistrationConflict { kind: "strategy", .. })
        ));
    }

    #[tokio::test]
    async fn test_from_config_offline() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AgentConfig::default();
        config.memory.local_path = dir.path().join("memory.jsonl");
        config.tools.vault_path = dir.path().join("vault");

        let cortex = from_config(&config).await.unwrap();
        assert_eq!(cortex.domains().len(), DomainId::ALL.len());
        assert_eq!(cortex.playbook().len(), 1);
        assert_eq!(cortex.capabilities().len(), 4);
    }
}
