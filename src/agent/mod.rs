//! Cortex: classify → dispatch → remember
//!
//! The cortex owns the frozen domain table and the classifier, and shares the
//! memory adapter, playbook and capability registry with the handlers.

use crate::classifier::Classifier;
use crate::memory::MemoryAdapter;
use crate::models::{Decision, MemoryRecord, RecordKind, Response, ResponseStatus, Task};
use crate::strategy::Playbook;
use crate::tools::{spawn_guarded, CapabilityRegistry};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub mod bootstrap;
pub mod router;

pub use bootstrap::bootstrap;
pub use router::{DomainHandler, DomainTable, DomainTableBuilder, Resolved};

const RECORD_SOURCE: &str = "cortex";

pub struct Cortex {
    classifier: Classifier,
    table: DomainTable,
    memory: Arc<MemoryAdapter>,
    playbook: Arc<Playbook>,
    capabilities: Arc<CapabilityRegistry>,
}

impl Cortex {
    pub fn new(
        classifier: Classifier,
        table: DomainTable,
        memory: Arc<MemoryAdapter>,
        playbook: Arc<Playbook>,
        capabilities: Arc<CapabilityRegistry>,
    ) -> Self {
        Self {
            classifier,
            table,
            memory,
            playbook,
            capabilities,
        }
    }

    pub async fn classify(&self, task: &Task) -> Decision {
        self.classifier.classify(task).await
    }

    /// Dispatch a decision on its own, outside of [`Cortex::process`].
    pub async fn dispatch(&self, decision: &Decision) -> Response {
        self.dispatch_task(Uuid::new_v4(), decision, &decision.task_parameters)
            .await
    }

    /// Record the task, classify it, dispatch it and record the outcome.
    pub async fn process(&self, task: Task) -> Response {
        info!(
            task_id = %task.task_id,
            source = ?task.source,
            "Cortex: task received"
        );

        let user_record = MemoryRecord::new(RecordKind::User, task.text.clone())
            .with_source(task.source.clone().unwrap_or_else(|| RECORD_SOURCE.to_string()))
            .with_metadata(json!({ "task_id": task.task_id }));
        let mut degraded = self.remember(user_record).await;

        let decision = self.classify(&task).await;

        // An empty parameter string (e.g. after a classifier fallback) hands
        // the handler the original request.
        let params = if decision.task_parameters.is_empty() {
            task.text.as_str()
        } else {
            decision.task_parameters.as_str()
        };
        let mut response = self.dispatch_task(task.task_id, &decision, params).await;

        let outcome = match response.status {
            ResponseStatus::Success => MemoryRecord::new(RecordKind::Assistant, response.output.clone()),
            ResponseStatus::Failed => MemoryRecord::new(
                RecordKind::System,
                response.error.clone().unwrap_or_default(),
            ),
        }
        .with_source(response.domain.as_str())
        .with_metadata(json!({
            "task_id": task.task_id,
            "domain": response.domain,
            "fell_back": response.fell_back,
        }));
        degraded |= self.remember(outcome).await;

        response.memory_degraded = degraded;
        info!(
            task_id = %task.task_id,
            domain = %response.domain,
            status = ?response.status,
            memory_degraded = degraded,
            elapsed_ms = response.execution_time_ms,
            "Cortex: task complete"
        );
        response
    }

    async fn dispatch_task(&self, task_id: Uuid, decision: &Decision, params: &str) -> Response {
        let start = Instant::now();
        let Resolved {
            domain,
            handler,
            fell_back,
        } = self.table.resolve(&decision.domain_name);

        debug!(task_id = %task_id, domain = %domain, params = %params, "Dispatching");

        let owned = params.to_string();
        let outcome = spawn_guarded(async move { handler.handle(&owned).await }).await;

        let (status, output, error) = match outcome {
            Ok(Ok(output)) => (ResponseStatus::Success, output, None),
            Ok(Err(e)) => {
                warn!(task_id = %task_id, domain = %domain, error = %e, "Handler failed");
                (ResponseStatus::Failed, String::new(), Some(e.to_string()))
            }
            Err(panic) => {
                warn!(task_id = %task_id, domain = %domain, panic = %panic, "Handler panicked");
                (
                    ResponseStatus::Failed,
                    String::new(),
                    Some(format!("Handler panicked: {}", panic)),
                )
            }
        };

        Response {
            task_id,
            domain,
            reasoning: decision.reasoning.clone(),
            status,
            output,
            error,
            fell_back,
            memory_degraded: false,
            execution_time_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Store a record; returns true when it did not reach long-term storage.
    async fn remember(&self, record: MemoryRecord) -> bool {
        match self.memory.store(record).await {
            Ok(receipt) => receipt.degraded,
            Err(e) => {
                warn!(error = %e, "Memory write failed, continuing");
                true
            }
        }
    }

    pub fn memory(&self) -> &Arc<MemoryAdapter> {
        &self.memory
    }

    pub fn playbook(&self) -> &Arc<Playbook> {
        &self.playbook
    }

    pub fn capabilities(&self) -> &Arc<CapabilityRegistry> {
        &self.capabilities
    }

    pub fn domains(&self) -> &DomainTable {
        &self.table
    }
}
