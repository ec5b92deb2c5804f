//! The six end-to-end scenarios driving the Orchestrator through a real
//! query/plan/execute/synthesize cycle with deterministic collaborators.

use std::sync::Arc;
use std::time::Duration;

use orchestra::{cancellation_pair, Orchestrator, OrchestratorConfig};
use orchestra_context::ContextManager;
use orchestra_core::ErrorKind;
use orchestra_registry::ToolRegistry;
use orchestra_testing::{
    echo_tool_definition, fetch_tool_definition, summarize_tool_definition, EchoTool, FailingTool,
    FetchTool, InMemoryPersistence, NeverReturnsTool, SlowTool, StubLanguageModel,
};

fn base_registry() -> ToolRegistry {
    let registry = ToolRegistry::new();
    registry
        .register(echo_tool_definition(), Arc::new(EchoTool))
        .expect("register echo");
    registry
        .register(fetch_tool_definition(), Arc::new(FetchTool::new("welcome to the front page")))
        .expect("register fetch");
    registry
        .register(
            summarize_tool_definition(),
            Arc::new(orchestra_testing::SummarizeTool),
        )
        .expect("register summarize");
    registry
}

fn orchestrator_with(registry: ToolRegistry) -> Orchestrator {
    let context = Arc::new(ContextManager::new(Arc::new(InMemoryPersistence::default())));
    Orchestrator::new(
        OrchestratorConfig::default(),
        Arc::new(registry),
        context,
        Arc::new(StubLanguageModel::default()),
    )
}

#[tokio::test]
async fn simple_single_tool_query_succeeds() {
    let orchestrator = orchestrator_with(base_registry());

    let result = orchestrator
        .handle_query("echo hello there", "session-1".to_string(), None, None, None)
        .await
        .expect("query succeeds");

    assert!(result.error.is_none());
    assert_eq!(result.tools_used.len(), 1);
    assert_eq!(result.tools_used[0].name, "Echo");
    assert!(result.text.contains("echo hello there"));
}

#[tokio::test]
async fn two_step_chain_wires_fetch_into_summarize() {
    let orchestrator = orchestrator_with(base_registry());

    let result = orchestrator
        .handle_query(
            "fetch the front page and then summarize it",
            "session-2".to_string(),
            None,
            None,
            None,
        )
        .await
        .expect("query succeeds");

    assert!(result.error.is_none());
    assert_eq!(result.tools_used.len(), 2);
    assert!(result.text.contains("welcome to the front page"));
}

#[tokio::test]
async fn flaky_tool_recovers_within_retry_budget() {
    let registry = ToolRegistry::new();
    registry
        .register(
            fetch_tool_definition(),
            Arc::new(FetchTool::flaky("recovered", 1)),
        )
        .expect("register fetch");
    let orchestrator = orchestrator_with(registry);

    let result = orchestrator
        .handle_query("fetch the front page", "session-3".to_string(), None, None, None)
        .await
        .expect("query succeeds");

    assert!(result.error.is_none());
    assert!(result.text.contains("recovered"));
}

#[tokio::test]
async fn partial_failure_with_no_fallback_surfaces_tool_failure() {
    let registry = ToolRegistry::new();
    registry
        .register(
            fetch_tool_definition(),
            Arc::new(FailingTool {
                message: "front page is gone".to_string(),
            }),
        )
        .expect("register fetch");
    let orchestrator = orchestrator_with(registry);

    let result = orchestrator
        .handle_query("fetch the front page", "session-4".to_string(), None, None, None)
        .await
        .expect("handle_query returns Ok even when the plan fails");

    let error = result.error.expect("tool failure surfaced");
    assert_eq!(error.kind, ErrorKind::ToolFailure);
}

#[tokio::test]
async fn noncritical_success_does_not_mask_critical_failure() {
    // Fetch succeeds and has a dependent (Summarize), so the planner marks
    // it non-critical. Summarize is the leaf step and fails permanently.
    // The plan must surface a tool failure even though one step succeeded.
    let registry = ToolRegistry::new();
    registry
        .register(fetch_tool_definition(), Arc::new(FetchTool::new("welcome to the front page")))
        .expect("register fetch");
    registry
        .register(
            summarize_tool_definition(),
            Arc::new(FailingTool {
                message: "summarizer is down".to_string(),
            }),
        )
        .expect("register summarize");
    let orchestrator = orchestrator_with(registry);

    let result = orchestrator
        .handle_query(
            "fetch the front page and then summarize it",
            "session-9".to_string(),
            None,
            None,
            None,
        )
        .await
        .expect("handle_query returns Ok even when the plan fails");

    let error = result.error.expect("critical failure surfaced despite a non-critical success");
    assert_eq!(error.kind, ErrorKind::ToolFailure);
}

#[tokio::test]
async fn critical_step_timeout_surfaces_deadline_exceeded() {
    let registry = ToolRegistry::new();
    registry
        .register(fetch_tool_definition(), Arc::new(NeverReturnsTool))
        .expect("register fetch");
    let config = OrchestratorConfig {
        step_timeout_secs: 1,
        plan_timeout_secs: 1,
        ..OrchestratorConfig::default()
    };
    let context = Arc::new(ContextManager::new(Arc::new(InMemoryPersistence::default())));
    let orchestrator = Orchestrator::new(
        config,
        Arc::new(registry),
        context,
        Arc::new(StubLanguageModel::default()),
    );

    let result = orchestrator
        .handle_query("fetch the front page", "session-10".to_string(), None, None, None)
        .await
        .expect("handle_query returns Ok even when the plan fails");

    let error = result.error.expect("deadline exceeded surfaced");
    assert_eq!(error.kind, ErrorKind::DeadlineExceeded);
}

#[tokio::test(flavor = "multi_thread")]
async fn cancellation_mid_execution_is_reported_and_bounded() {
    let registry = ToolRegistry::new();
    registry
        .register(fetch_tool_definition(), Arc::new(NeverReturnsTool))
        .expect("register fetch");
    let orchestrator = orchestrator_with(registry);

    let (handle, token) = cancellation_pair();
    let query = tokio::spawn(async move {
        orchestrator
            .handle_query("fetch the front page", "session-5".to_string(), None, None, Some(token))
            .await
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    handle.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), query)
        .await
        .expect("cancellation resolves within the grace window")
        .expect("task did not panic")
        .expect("handle_query returns Ok on cancellation");

    assert_eq!(result.error.unwrap().kind, ErrorKind::Canceled);
}

#[tokio::test]
async fn idle_session_is_evicted_and_next_query_starts_fresh() {
    let context = Arc::new(ContextManager::new(Arc::new(InMemoryPersistence::default())));
    let orchestrator = Orchestrator::new(
        OrchestratorConfig::default(),
        Arc::new(base_registry()),
        context.clone(),
        Arc::new(StubLanguageModel::default()),
    );

    orchestrator
        .handle_query("echo first visit", "session-6".to_string(), None, None, None)
        .await
        .expect("first query succeeds");
    assert_eq!(context.active_session_count(), 1);

    context.sweep(chrono::Duration::seconds(-1)).await;
    assert_eq!(context.active_session_count(), 0);

    let result = orchestrator
        .handle_query("echo second visit", "session-6".to_string(), None, None, None)
        .await
        .expect("second query succeeds after eviction");
    assert!(result.text.contains("echo second visit"));
}

#[tokio::test]
async fn slow_tool_within_deadline_still_succeeds() {
    let registry = ToolRegistry::new();
    registry
        .register(
            fetch_tool_definition(),
            Arc::new(SlowTool {
                delay: Duration::from_millis(50),
            }),
        )
        .expect("register fetch");
    let orchestrator = orchestrator_with(registry);

    let result = orchestrator
        .handle_query("fetch the front page", "session-7".to_string(), None, None, None)
        .await
        .expect("query succeeds");

    assert!(result.error.is_none());
}
