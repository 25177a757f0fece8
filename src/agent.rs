//! Agent dispatcher and process entry point
//!
//! Translates the named operations (store, query, clear) into signed node
//! envelopes and normalizes every outcome into a [`UniformResult`]. Each
//! request is a single stateless exchange: validate, build envelope, await
//! the node once, reshape. Retry policy belongs to the caller.

use std::sync::Arc;

use serde_json::Value;
use tracing::{error, info};

use crate::config::Config;
use crate::error::{AgentError, Result};
use crate::kb::{KbBackend, KbClient, KbRunInput, KbRunOutput};
use crate::schemas::{
    AgentRunInput, CallInputs, KbDeployment, QueryPayload, StorePayload, UniformResult,
};
use crate::signing::ConsumerCredential;

const NO_RESULTS_MESSAGE: &str = "No relevant information found for your query.";

/// The fixed set of operations this agent dispatches
///
/// Routing goes through this enum, so an unknown `func_name` is rejected as
/// a typed error before any envelope exists, and the dispatch match is
/// checked for completeness by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Store,
    Query,
    Clear,
}

impl Operation {
    pub const ALL: [Operation; 3] = [Operation::Store, Operation::Query, Operation::Clear];

    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "store" => Ok(Operation::Store),
            "query" => Ok(Operation::Query),
            "clear" => Ok(Operation::Clear),
            other => Err(AgentError::UnknownOperation(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Store => "store",
            Operation::Query => "query",
            Operation::Clear => "clear",
        }
    }

    /// Function id the node knows this operation by
    pub fn backend_func(&self) -> &'static str {
        match self {
            Operation::Store => "ingest_knowledge",
            Operation::Query => "search",
            Operation::Clear => "clear",
        }
    }
}

/// Dispatcher bound to one knowledge base deployment and consumer identity
pub struct KnowledgeBaseAgent {
    deployment: KbDeployment,
    consumer_id: String,
    credential: ConsumerCredential,
    backend: Arc<dyn KbBackend>,
}

impl KnowledgeBaseAgent {
    pub fn new(
        deployment: KbDeployment,
        consumer_id: String,
        credential: ConsumerCredential,
        backend: Arc<dyn KbBackend>,
    ) -> Self {
        Self {
            deployment,
            consumer_id,
            credential,
            backend,
        }
    }

    pub fn deployment(&self) -> &KbDeployment {
        &self.deployment
    }

    /// One-time establish step for the bound deployment
    pub async fn establish(&self) -> Result<()> {
        self.backend.create(&self.deployment).await
    }

    /// Store knowledge in the deployment's knowledge base
    pub async fn store(&self, payload: Option<&Value>) -> UniformResult {
        self.dispatch(Operation::Store, payload).await
    }

    /// Query the knowledge base
    pub async fn query(&self, payload: Option<&Value>) -> UniformResult {
        self.dispatch(Operation::Query, payload).await
    }

    /// Clear all data from the knowledge base
    pub async fn clear(&self) -> UniformResult {
        self.dispatch(Operation::Clear, None).await
    }

    /// Run one operation, converting every failure into the uniform shape
    pub async fn dispatch(&self, operation: Operation, payload: Option<&Value>) -> UniformResult {
        let outcome = match operation {
            Operation::Store => self.try_store(payload).await,
            Operation::Query => self.try_query(payload).await,
            Operation::Clear => self.try_clear().await,
        };
        outcome.unwrap_or_else(|e| {
            error!(operation = operation.name(), "operation failed: {}", e);
            UniformResult::error(e.to_string())
        })
    }

    /// Build the signed envelope for one operation
    fn kb_input(&self, operation: Operation, func_input_data: Option<Value>) -> KbRunInput {
        KbRunInput {
            consumer_id: self.consumer_id.clone(),
            inputs: CallInputs {
                func_name: operation.backend_func().to_string(),
                func_input_data,
            },
            deployment: self.deployment.clone(),
            signature: self.credential.sign_consumer_id(&self.consumer_id),
        }
    }

    async fn try_store(&self, payload: Option<&Value>) -> Result<UniformResult> {
        let payload =
            payload.ok_or_else(|| AgentError::validation("store requires func_input_data"))?;
        let store: StorePayload = serde_json::from_value(payload.clone())
            .map_err(|e| AgentError::validation(format!("invalid store payload: {}", e)))?;
        store.validate()?;

        let input = self.kb_input(Operation::Store, Some(serde_json::to_value(&store)?));
        let reply = self.backend.run(input).await?;
        Ok(reshape_reply(reply))
    }

    async fn try_query(&self, payload: Option<&Value>) -> Result<UniformResult> {
        let payload =
            payload.ok_or_else(|| AgentError::validation("query requires func_input_data"))?;
        let query: QueryPayload = serde_json::from_value(payload.clone())
            .map_err(|e| AgentError::validation(format!("invalid query payload: {}", e)))?;
        query.validate()?;
        info!(query = %query.query, top_k = query.top_k, "querying knowledge base");

        let input = self.kb_input(Operation::Query, Some(serde_json::to_value(&query)?));
        let reply = self.backend.run(input).await?;

        if !reply.is_success() {
            return Ok(UniformResult::error(reply.message.unwrap_or_else(|| {
                "Unknown error in knowledge base query".to_string()
            })));
        }
        if reply.results.is_empty() {
            return Ok(UniformResult::empty_query(
                reply
                    .message
                    .unwrap_or_else(|| NO_RESULTS_MESSAGE.to_string()),
            ));
        }

        let hits = reply.knowledge_hits()?;
        if hits.is_empty() {
            return Ok(UniformResult::empty_query(NO_RESULTS_MESSAGE));
        }
        Ok(UniformResult::query_hits(hits))
    }

    async fn try_clear(&self) -> Result<UniformResult> {
        let input = self.kb_input(Operation::Clear, None);
        let reply = self.backend.run(input).await?;
        Ok(reshape_reply(reply))
    }
}

/// Reshape a store/clear node reply into the uniform shape.
///
/// Success surfaces the node's top-level fields (e.g. `id`) verbatim; raw
/// result rows, when present, are carried through under `results_raw`.
fn reshape_reply(reply: KbRunOutput) -> UniformResult {
    if !reply.is_success() {
        let status = reply.status;
        return UniformResult::error(
            reply
                .message
                .unwrap_or_else(|| format!("knowledge base reported status `{}`", status)),
        );
    }

    let KbRunOutput {
        results,
        message,
        mut extra,
        ..
    } = reply;
    if !results.is_empty() {
        extra.insert("results_raw".to_string(), Value::from(results));
    }
    UniformResult::success_with_data(message, extra)
}

// ============== Entry Point ==============

/// Run one inbound request against the configured node.
///
/// Never returns an unhandled fault: every error from envelope validation to
/// the node call lands in the uniform error shape.
pub async fn run(request: Value) -> UniformResult {
    match Config::load() {
        Ok(config) => run_with_config(request, &config).await,
        Err(e) => fail(e),
    }
}

/// Run one inbound request with an explicit configuration
pub async fn run_with_config(request: Value, config: &Config) -> UniformResult {
    let prepared = (|| {
        let input = parse_input(request)?;
        let credential = config.credential()?;
        let node_url = input
            .deployment
            .primary_kb()?
            .node_url
            .clone()
            .unwrap_or_else(|| config.node.url.clone());
        let backend: Arc<dyn KbBackend> =
            Arc::new(KbClient::new(&node_url, config.node.timeout_secs)?);
        Ok::<_, AgentError>((input, backend, credential))
    })();

    match prepared {
        Ok((input, backend, credential)) => match try_run(input, backend, credential).await {
            Ok(result) => result,
            Err(e) => fail(e),
        },
        Err(e) => fail(e),
    }
}

/// Run one inbound request against an injected backend (tests, embedders)
pub async fn run_with_backend(
    request: Value,
    backend: Arc<dyn KbBackend>,
    credential: ConsumerCredential,
) -> UniformResult {
    let input = match parse_input(request) {
        Ok(input) => input,
        Err(e) => return fail(e),
    };
    match try_run(input, backend, credential).await {
        Ok(result) => result,
        Err(e) => fail(e),
    }
}

fn parse_input(request: Value) -> Result<AgentRunInput> {
    serde_json::from_value(request)
        .map_err(|e| AgentError::validation(format!("invalid run input: {}", e)))
}

fn fail(e: AgentError) -> UniformResult {
    error!("knowledge base agent request failed: {}", e);
    UniformResult::error(e.to_string())
}

async fn try_run(
    input: AgentRunInput,
    backend: Arc<dyn KbBackend>,
    credential: ConsumerCredential,
) -> Result<UniformResult> {
    input.validate()?;
    let operation = Operation::parse(&input.inputs.func_name)?;
    let deployment = input.deployment.primary_kb()?.clone();

    let agent = KnowledgeBaseAgent::new(deployment, input.consumer_id, credential, backend);
    agent.establish().await?;
    Ok(agent
        .dispatch(operation, input.inputs.func_input_data.as_ref())
        .await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::{KnowledgeItem, QueryHits};
    use crate::signing::verify_consumer_id;
    use chrono::{DateTime, Utc};
    use serde_json::{json, Map};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Default)]
    struct StubBackend {
        replies: Mutex<VecDeque<Result<KbRunOutput>>>,
        runs: Mutex<Vec<KbRunInput>>,
        creates: Mutex<usize>,
    }

    impl StubBackend {
        fn with_reply(reply: KbRunOutput) -> Arc<Self> {
            let stub = Self::default();
            stub.replies.lock().unwrap().push_back(Ok(reply));
            Arc::new(stub)
        }

        fn with_error(error: AgentError) -> Arc<Self> {
            let stub = Self::default();
            stub.replies.lock().unwrap().push_back(Err(error));
            Arc::new(stub)
        }

        fn run_count(&self) -> usize {
            self.runs.lock().unwrap().len()
        }

        fn create_count(&self) -> usize {
            *self.creates.lock().unwrap()
        }

        fn last_run(&self) -> KbRunInput {
            self.runs.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait::async_trait]
    impl KbBackend for StubBackend {
        async fn create(&self, _deployment: &KbDeployment) -> Result<()> {
            *self.creates.lock().unwrap() += 1;
            Ok(())
        }

        async fn run(&self, input: KbRunInput) -> Result<KbRunOutput> {
            self.runs.lock().unwrap().push(input);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(success_reply(Map::new())))
        }
    }

    fn success_reply(extra: Map<String, Value>) -> KbRunOutput {
        KbRunOutput {
            status: "success".to_string(),
            results: Vec::new(),
            message: None,
            extra,
        }
    }

    fn search_reply(items: Vec<KnowledgeItem>) -> KbRunOutput {
        let payload = serde_json::to_string(&QueryHits { data: items }).unwrap();
        let row = serde_json::to_string(&json!({ "results": [payload] })).unwrap();
        KbRunOutput {
            status: "completed".to_string(),
            results: vec![row],
            message: None,
            extra: Map::new(),
        }
    }

    fn item() -> KnowledgeItem {
        KnowledgeItem {
            chunk: "hello".to_string(),
            chunk_start: 0,
            chunk_end: 5,
            full_text: "hello world".to_string(),
            metadata: Map::new(),
            source: Some("unit-test".to_string()),
            timestamp: DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        }
    }

    fn credential() -> ConsumerCredential {
        ConsumerCredential::from_seed([7u8; 32])
    }

    fn deployment() -> KbDeployment {
        KbDeployment {
            name: "market_kb".to_string(),
            node_url: None,
        }
    }

    fn agent(backend: &Arc<StubBackend>) -> KnowledgeBaseAgent {
        KnowledgeBaseAgent::new(
            deployment(),
            "consumer-1".to_string(),
            credential(),
            backend.clone() as Arc<dyn KbBackend>,
        )
    }

    fn request(func_name: &str, func_input_data: Value) -> Value {
        json!({
            "consumer_id": "consumer-1",
            "signature": credential().sign_consumer_id("consumer-1"),
            "deployment": { "name": "kb-agent", "kb_deployments": [{ "name": "market_kb" }] },
            "inputs": { "func_name": func_name, "func_input_data": func_input_data }
        })
    }

    #[test]
    fn test_operation_set_is_closed() {
        for op in Operation::ALL {
            assert_eq!(Operation::parse(op.name()).unwrap(), op);
        }
        assert!(matches!(
            Operation::parse("nonexistent"),
            Err(AgentError::UnknownOperation(_))
        ));
    }

    #[tokio::test]
    async fn test_store_success_populates_id() {
        let mut extra = Map::new();
        extra.insert("id".to_string(), json!("abc123"));
        let stub = StubBackend::with_reply(success_reply(extra));

        let result = agent(&stub)
            .store(Some(&json!({
                "text": "hello world",
                "metadata": {"source": "unit-test"}
            })))
            .await;

        assert!(result.is_success());
        assert_eq!(result.data.get("id"), Some(&json!("abc123")));
        let sent = stub.last_run();
        assert_eq!(sent.inputs.func_name, "ingest_knowledge");
        assert_eq!(
            sent.inputs.func_input_data.unwrap()["text"],
            json!("hello world")
        );
    }

    #[tokio::test]
    async fn test_store_missing_text_skips_backend() {
        let stub = Arc::new(StubBackend::default());

        let result = agent(&stub).store(Some(&json!({"metadata": {}}))).await;

        assert!(!result.is_success());
        assert!(result.message.unwrap().contains("store payload"));
        assert_eq!(stub.run_count(), 0);
    }

    #[tokio::test]
    async fn test_store_empty_text_rejected() {
        let stub = Arc::new(StubBackend::default());

        let result = agent(&stub).store(Some(&json!({"text": "   "}))).await;

        assert!(!result.is_success());
        assert_eq!(stub.run_count(), 0);
    }

    #[tokio::test]
    async fn test_store_transport_fault_normalized() {
        let stub = StubBackend::with_error(AgentError::backend("connection refused"));

        let result = agent(&stub).store(Some(&json!({"text": "hello"}))).await;

        assert!(!result.is_success());
        assert!(result.message.unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_query_top_k_defaults_to_two_in_envelope() {
        let stub = StubBackend::with_reply(search_reply(vec![item()]));

        let result = agent(&stub).query(Some(&json!({"query": "hello"}))).await;

        assert!(result.is_success());
        let sent = stub.last_run();
        assert_eq!(sent.inputs.func_name, "search");
        assert_eq!(sent.inputs.func_input_data.unwrap()["top_k"], json!(2));
    }

    #[tokio::test]
    async fn test_query_top_k_passes_through_unchanged() {
        let stub = StubBackend::with_reply(search_reply(vec![item()]));

        let result = agent(&stub)
            .query(Some(&json!({"query": "hello", "top_k": 1})))
            .await;

        assert_eq!(
            stub.last_run().inputs.func_input_data.unwrap()["top_k"],
            json!(1)
        );
        assert_eq!(result.results.unwrap(), vec![item()]);
    }

    #[tokio::test]
    async fn test_query_zero_hits_is_success() {
        let stub = StubBackend::with_reply(search_reply(Vec::new()));

        let result = agent(&stub).query(Some(&json!({"query": "hello"}))).await;

        assert!(result.is_success());
        assert_eq!(result.results, Some(Vec::new()));
        assert!(!result.message.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_query_missing_rows_is_success_with_message() {
        let stub = StubBackend::with_reply(success_reply(Map::new()));

        let result = agent(&stub).query(Some(&json!({"query": "hello"}))).await;

        assert!(result.is_success());
        assert_eq!(result.results, Some(Vec::new()));
        assert_eq!(result.message.as_deref(), Some(NO_RESULTS_MESSAGE));
    }

    #[tokio::test]
    async fn test_query_backend_failure_propagates_message() {
        let stub = StubBackend::with_reply(KbRunOutput {
            status: "error".to_string(),
            results: Vec::new(),
            message: Some("index offline".to_string()),
            extra: Map::new(),
        });

        let result = agent(&stub).query(Some(&json!({"query": "hello"}))).await;

        assert!(!result.is_success());
        assert_eq!(result.message.as_deref(), Some("index offline"));
    }

    #[tokio::test]
    async fn test_query_transport_fault_normalized() {
        let stub = StubBackend::with_error(AgentError::backend("connection refused"));

        let result = agent(&stub).query(Some(&json!({"query": "hello"}))).await;

        assert!(!result.is_success());
        assert!(result.message.unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_query_malformed_reply_fails_loudly() {
        let stub = StubBackend::with_reply(KbRunOutput {
            status: "completed".to_string(),
            results: vec!["{bad".to_string()],
            message: None,
            extra: Map::new(),
        });

        let result = agent(&stub).query(Some(&json!({"query": "hello"}))).await;

        assert!(!result.is_success());
        assert!(result
            .message
            .unwrap()
            .contains("Malformed knowledge base reply"));
    }

    #[tokio::test]
    async fn test_clear_sends_no_payload() {
        let stub = StubBackend::with_reply(success_reply(Map::new()));

        let result = agent(&stub).clear().await;

        assert!(result.is_success());
        let sent = stub.last_run();
        assert_eq!(sent.inputs.func_name, "clear");
        assert!(sent.inputs.func_input_data.is_none());
    }

    #[tokio::test]
    async fn test_clear_reshapes_backend_status() {
        let stub = StubBackend::with_reply(KbRunOutput {
            status: "error".to_string(),
            results: Vec::new(),
            message: Some("nothing to clear".to_string()),
            extra: Map::new(),
        });

        let result = agent(&stub).clear().await;

        assert!(!result.is_success());
        assert_eq!(result.message.as_deref(), Some("nothing to clear"));
    }

    #[tokio::test]
    async fn test_envelope_is_signed_for_consumer() {
        let stub = StubBackend::with_reply(success_reply(Map::new()));

        let _ = agent(&stub).clear().await;

        let sent = stub.last_run();
        assert_eq!(sent.consumer_id, "consumer-1");
        assert_eq!(sent.deployment.name, "market_kb");
        verify_consumer_id("consumer-1", &sent.signature, &credential().verifying_key()).unwrap();
    }

    #[tokio::test]
    async fn test_run_rejects_unknown_func_name() {
        let stub = Arc::new(StubBackend::default());

        let result = run_with_backend(
            request("nonexistent", json!(null)),
            stub.clone() as Arc<dyn KbBackend>,
            credential(),
        )
        .await;

        assert!(!result.is_success());
        assert!(result.message.unwrap().contains("Invalid function name"));
        assert_eq!(stub.run_count(), 0);
        assert_eq!(stub.create_count(), 0);
    }

    #[tokio::test]
    async fn test_run_rejects_empty_signature() {
        let stub = Arc::new(StubBackend::default());
        let mut raw = request("store", json!({"text": "hello"}));
        raw["signature"] = json!("");

        let result =
            run_with_backend(raw, stub.clone() as Arc<dyn KbBackend>, credential()).await;

        assert!(!result.is_success());
        assert_eq!(stub.run_count(), 0);
    }

    #[tokio::test]
    async fn test_run_rejects_malformed_envelope() {
        let stub = Arc::new(StubBackend::default());

        let result = run_with_backend(
            json!({"inputs": {"func_name": "store"}}),
            stub.clone() as Arc<dyn KbBackend>,
            credential(),
        )
        .await;

        assert!(!result.is_success());
        assert!(result.message.unwrap().contains("invalid run input"));
    }

    #[tokio::test]
    async fn test_run_store_example() {
        let mut extra = Map::new();
        extra.insert("id".to_string(), json!("abc123"));
        let stub = StubBackend::with_reply(success_reply(extra));

        let result = run_with_backend(
            request(
                "store",
                json!({"text": "hello world", "metadata": {"source": "unit-test"}}),
            ),
            stub.clone() as Arc<dyn KbBackend>,
            credential(),
        )
        .await;

        assert!(result.is_success());
        assert_eq!(result.data.get("id"), Some(&json!("abc123")));
        assert_eq!(stub.create_count(), 1);
    }

    #[tokio::test]
    async fn test_run_query_example() {
        let stub = StubBackend::with_reply(search_reply(vec![item()]));

        let result = run_with_backend(
            request("query", json!({"query": "hello", "top_k": 1})),
            stub.clone() as Arc<dyn KbBackend>,
            credential(),
        )
        .await;

        assert!(result.is_success());
        assert_eq!(result.results.unwrap(), vec![item()]);
    }
}
