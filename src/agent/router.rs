//! Domain table: validated DomainId → handler mapping, built once at startup.

use crate::config::AgentConfig;
use crate::error::CortexError;
use crate::models::DomainId;
use crate::Result;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Executes a task for one domain.
#[async_trait::async_trait]
pub trait DomainHandler: Send + Sync {
    async fn handle(&self, task_parameters: &str) -> Result<String>;
}

/// Collects handlers before the table is frozen.
#[derive(Default)]
pub struct DomainTableBuilder {
    handlers: BTreeMap<DomainId, Arc<dyn DomainHandler>>,
}

impl DomainTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, domain: DomainId, handler: Arc<dyn DomainHandler>) -> Result<()> {
        if self.handlers.contains_key(&domain) {
            return Err(CortexError::RegistrationConflict {
                kind: "domain",
                name: domain.to_string(),
            });
        }
        debug!(domain = %domain, "Domain handler registered");
        self.handlers.insert(domain, handler);
        Ok(())
    }

    /// Freeze against the catalog. Every active domain needs a handler;
    /// handlers for inactive or uncatalogued domains are dropped.
    pub fn build(mut self, config: &AgentConfig) -> Result<DomainTable> {
        let mut handlers = BTreeMap::new();
        for domain in config.active_domains() {
            let handler = self.handlers.remove(&domain.name).ok_or_else(|| {
                CortexError::InvalidConfig(format!("no handler for active domain {}", domain.name))
            })?;
            handlers.insert(domain.name, handler);
        }

        for unused in self.handlers.keys() {
            warn!(domain = %unused, "Handler registered for inactive domain, not dispatchable");
        }

        let fallback_handler = handlers.get(&config.fallback_domain).cloned().ok_or_else(|| {
            CortexError::InvalidConfig(format!(
                "fallback domain {} is not active",
                config.fallback_domain
            ))
        })?;

        Ok(DomainTable {
            handlers,
            fallback: (config.fallback_domain, fallback_handler),
        })
    }
}

/// Read-only after startup.
pub struct DomainTable {
    handlers: BTreeMap<DomainId, Arc<dyn DomainHandler>>,
    fallback: (DomainId, Arc<dyn DomainHandler>),
}

/// Outcome of resolving a decision's domain name.
pub struct Resolved {
    pub domain: DomainId,
    pub handler: Arc<dyn DomainHandler>,
    pub fell_back: bool,
}

impl DomainTable {
    /// Resolve a domain name; anything unknown or inactive goes to the fallback.
    pub fn resolve(&self, domain_name: &str) -> Resolved {
        let found = domain_name
            .parse::<DomainId>()
            .and_then(|id| {
                self.handlers
                    .get(&id)
                    .map(|h| (id, h.clone()))
                    .ok_or_else(|| CortexError::DispatchNotFound(id.to_string()))
            });

        match found {
            Ok((domain, handler)) => Resolved {
                domain,
                handler,
                fell_back: false,
            },
            Err(e) => {
                warn!(
                    requested = %domain_name,
                    fallback = %self.fallback.0,
                    error = %e,
                    "Unresolved domain, dispatching to fallback"
                );
                Resolved {
                    domain: self.fallback.0,
                    handler: self.fallback.1.clone(),
                    fell_back: true,
                }
            }
        }
    }

    pub fn fallback_domain(&self) -> DomainId {
        self.fallback.0
    }

    pub fn domains(&self) -> impl Iterator<Item = DomainId> + '_ {
        self.handlers.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    #[async_trait::async_trait]
    impl DomainHandler for Named {
        async fn handle(&self, _task_parameters: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    fn full_builder() -> DomainTableBuilder {
        let mut builder = DomainTableBuilder::new();
        for domain in DomainId::ALL {
            builder
                .register(domain, Arc::new(Named(domain.as_str())))
                .unwrap();
        }
        builder
    }

    #[tokio::test]
    async fn test_each_domain_resolves_to_its_handler() {
        let table = full_builder().build(&AgentConfig::default()).unwrap();
        for domain in DomainId::ALL {
            let resolved = table.resolve(&domain.as_str().to_lowercase());
            assert_eq!(resolved.domain, domain);
            assert!(!resolved.fell_back);
            assert_eq!(resolved.handler.handle("").await.unwrap(), domain.as_str());
        }
    }

    #[tokio::test]
    async fn test_unknown_domain_falls_back() {
        let table = full_builder().build(&AgentConfig::default()).unwrap();
        let resolved = table.resolve("MEDICAL");
        assert!(resolved.fell_back);
        assert_eq!(resolved.domain, DomainId::Foundation);
        assert_eq!(resolved.handler.handle("").await.unwrap(), "FOUNDATION");
    }

    #[test]
    fn test_inactive_domain_falls_back() {
        let mut config = AgentConfig::default();
        for d in config.domains.iter_mut() {
            if d.name == DomainId::Engineering {
                d.active = false;
            }
        }
        let table = full_builder().build(&config).unwrap();
        assert_eq!(table.len(), 5);
        assert!(table.resolve("ENGINEERING").fell_back);
    }

    #[test]
    fn test_duplicate_handler_rejected() {
        let mut builder = full_builder();
        let err = builder
            .register(DomainId::Ops, Arc::new(Named("again")))
            .unwrap_err();
        assert!(matches!(
            err,
            CortexError::RegistrationConflict { kind: "domain", .. }
        ));
    }

    #[test]
    fn test_missing_handler_for_active_domain() {
        let mut builder = DomainTableBuilder::new();
        builder
            .register(DomainId::Foundation, Arc::new(Named("f")))
            .unwrap();
        assert!(matches!(
            builder.build(&AgentConfig::default()),
            Err(CortexError::InvalidConfig(_))
        ));
    }
}
