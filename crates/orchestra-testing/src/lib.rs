//! Deterministic collaborators and canned tools shared by the scenario
//! tests under `tests/`.

mod collaborators;
mod tools;

pub use collaborators::{CollaboratorErrorMode, InMemoryPersistence, StubLanguageModel};
pub use tools::{
    echo_tool_definition, fetch_tool_definition, summarize_tool_definition, EchoTool, FailingTool,
    FetchTool, NeverReturnsTool, SlowTool, SummarizeTool,
};
