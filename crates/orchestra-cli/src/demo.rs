//! The built-in demo tool set and orchestrator wiring used by every CLI
//! command — the stub collaborators from `orchestra-testing` plus a small,
//! fixed catalog (`EchoTool`/`FetchTool`/`SummarizeTool`).

use std::sync::Arc;

use orchestra::{Orchestrator, OrchestratorConfig};
use orchestra_context::ContextManager;
use orchestra_registry::ToolRegistry;
use orchestra_testing::{
    echo_tool_definition, fetch_tool_definition, summarize_tool_definition, EchoTool,
    InMemoryPersistence, StubLanguageModel,
};

pub fn demo_registry() -> ToolRegistry {
    let registry = ToolRegistry::new();
    registry
        .register(echo_tool_definition(), Arc::new(EchoTool))
        .expect("built-in echo tool registers cleanly");
    registry
        .register(
            fetch_tool_definition(),
            Arc::new(orchestra_testing::FetchTool::new(
                "Orchestra demo front page — hello from the CLI harness.",
            )),
        )
        .expect("built-in fetch tool registers cleanly");
    registry
        .register(summarize_tool_definition(), Arc::new(orchestra_testing::SummarizeTool))
        .expect("built-in summarize tool registers cleanly");
    registry
}

pub fn demo_orchestrator(config: OrchestratorConfig) -> Orchestrator {
    let context = Arc::new(ContextManager::new(Arc::new(InMemoryPersistence::default())));
    Orchestrator::new(
        config,
        Arc::new(demo_registry()),
        context,
        Arc::new(StubLanguageModel::default()),
    )
}
