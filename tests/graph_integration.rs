//! End-to-end graph runs: scripted model, real tag lookups, SQLite checkpoints

use async_trait::async_trait;
use codeace::agent::{
    AgentGraph, ChatModel, Checkpointer, GenerationOptions, GraphState, Message, Node, Role,
    RunConfig, SqliteCheckpointer, ToolDefinition,
};
use codeace::session::ChatSession;
use codeace::tools::{FindDefinitionsTool, FindImplementationsTool, ToolCall, ToolRegistry};
use codeace::{Error, Result};
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

const TAGS: &str = "\
Parser\tsrc/parser.rs\t/^pub struct Parser/;\"\tc
parse\tsrc/parser.rs\t/^fn parse/;\"\tf
parse\tsrc/main.rs\t/parse(/;\"\tr
";

/// Asks for both tag lookups on its first turn, then summarizes what the
/// tools returned.
#[derive(Default)]
struct LookupModel {
    tags_file: String,
    calls: Mutex<Vec<usize>>,
}

#[async_trait]
impl ChatModel for LookupModel {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        _options: &GenerationOptions,
    ) -> Result<Message> {
        self.calls.lock().unwrap().push(messages.len());
        assert!(tools.iter().any(|t| t.function.name == "find_definitions"));

        match messages.last().map(|m| m.role) {
            Some(Role::User) => Ok(Message::assistant_with_tool_calls(
                "",
                vec![
                    ToolCall::new(
                        "call_1",
                        "find_definitions",
                        json!({"tags_to_find": ["Parser", "parse"], "tags_file_path": self.tags_file}),
                    ),
                    ToolCall::new(
                        "call_2",
                        "find_implementations",
                        json!({"tags_to_find": ["parse"], "tags_file_path": self.tags_file}),
                    ),
                ],
            )),
            _ => {
                let results: Vec<&str> = messages
                    .iter()
                    .filter(|m| m.role == Role::Tool)
                    .map(|m| m.content.as_str())
                    .collect();
                Ok(Message::assistant(results.join(" | ")))
            }
        }
    }
}

fn write_tags(dir: &Path) -> String {
    let path = dir.join("tags");
    std::fs::write(&path, TAGS).unwrap();
    path.to_string_lossy().to_string()
}

fn registry() -> Arc<ToolRegistry> {
    let mut tools = ToolRegistry::new();
    tools.register(FindDefinitionsTool);
    tools.register(FindImplementationsTool);
    Arc::new(tools)
}

#[tokio::test]
async fn test_tag_lookup_round_trip_is_checkpointed() {
    let dir = tempfile::tempdir().unwrap();
    let tags_file = write_tags(dir.path());
    let db = dir.path().join("state").join("checkpoints.db");

    let model = Arc::new(LookupModel {
        tags_file,
        ..Default::default()
    });
    let checkpointer = Arc::new(SqliteCheckpointer::open(&db).await.unwrap());
    let graph = AgentGraph::new(model.clone(), registry()).with_checkpointer(checkpointer.clone());

    let config = RunConfig::default().with_thread("thread-1");
    let state = graph
        .advance(GraphState::new(vec![Message::user("where is Parser?")]), &config)
        .await
        .unwrap();

    // user, assistant(tool calls), two tool results, final answer
    assert_eq!(state.messages.len(), 5);
    assert_eq!(state.messages[2].tool_call_id.as_deref(), Some("call_1"));
    assert_eq!(state.messages[3].tool_call_id.as_deref(), Some("call_2"));

    let definitions: HashMap<String, String> = serde_json::from_str(&state.messages[2].content).unwrap();
    assert_eq!(definitions["Parser"], "src/parser.rs");
    assert_eq!(definitions["parse"], "src/parser.rs");

    // last matching line wins for references
    let references: HashMap<String, String> = serde_json::from_str(&state.messages[3].content).unwrap();
    assert_eq!(references["parse"], "src/main.rs");

    assert!(state.final_response().unwrap().contains("src/parser.rs"));
    assert_eq!(*model.calls.lock().unwrap(), vec![1, 4]);

    let saved = checkpointer.load("thread-1").await.unwrap().unwrap();
    assert_eq!(saved.next, Node::End);
    assert_eq!(saved.messages, state.messages);
}

#[tokio::test]
async fn test_thread_resumes_after_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let tags_file = write_tags(dir.path());
    let db = dir.path().join("checkpoints.db");

    {
        let model = Arc::new(LookupModel {
            tags_file: tags_file.clone(),
            ..Default::default()
        });
        let checkpointer = Arc::new(SqliteCheckpointer::open(&db).await.unwrap());
        let graph = AgentGraph::new(model, registry()).with_checkpointer(checkpointer);
        graph
            .advance(
                GraphState::new(vec![Message::user("first")]),
                &RunConfig::default().with_thread("t"),
            )
            .await
            .unwrap();
    }

    let model = Arc::new(LookupModel {
        tags_file,
        ..Default::default()
    });
    let checkpointer = Arc::new(SqliteCheckpointer::open(&db).await.unwrap());
    let graph = AgentGraph::new(model.clone(), registry()).with_checkpointer(checkpointer);

    let state = graph
        .advance(
            GraphState::new(vec![Message::user("second")]),
            &RunConfig::default().with_thread("t"),
        )
        .await
        .unwrap();

    // earlier five messages plus a second lookup round
    assert_eq!(state.messages.len(), 10);
    assert_eq!(state.messages[0].content, "first");
    assert_eq!(state.messages[5].content, "second");
    assert_eq!(*model.calls.lock().unwrap(), vec![6, 9]);
}

#[tokio::test]
async fn test_unknown_tool_leaves_checkpoint_at_tools_node() {
    struct WrongToolModel;

    #[async_trait]
    impl ChatModel for WrongToolModel {
        async fn complete(
            &self,
            _messages: &[Message],
            _tools: &[ToolDefinition],
            _options: &GenerationOptions,
        ) -> Result<Message> {
            Ok(Message::assistant_with_tool_calls(
                "",
                vec![ToolCall::new("call_1", "grep", json!({}))],
            ))
        }
    }

    let checkpointer = Arc::new(SqliteCheckpointer::in_memory().await.unwrap());
    let graph = AgentGraph::new(Arc::new(WrongToolModel), registry()).with_checkpointer(checkpointer.clone());

    let result = graph
        .advance(
            GraphState::new(vec![Message::user("hi")]),
            &RunConfig::default().with_thread("bad"),
        )
        .await;
    assert!(matches!(result, Err(Error::UnknownTool(name)) if name == "grep"));

    let saved = checkpointer.load("bad").await.unwrap().unwrap();
    assert_eq!(saved.next, Node::Tools);
    assert_eq!(saved.messages.len(), 2);
}

#[tokio::test]
async fn test_session_continues_given_thread() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("repo");
    std::fs::create_dir(&source).unwrap();
    let tags_file = write_tags(&source);

    let model = Arc::new(LookupModel {
        tags_file,
        ..Default::default()
    });
    let checkpointer = Arc::new(SqliteCheckpointer::in_memory().await.unwrap());
    let graph = AgentGraph::new(model.clone(), registry()).with_checkpointer(checkpointer);

    let mut first = ChatSession::new("tags");
    first.set_source(&source).unwrap();
    assert!(first.mapping_done());
    first.answer(&graph, "where is Parser?", &RunConfig::default()).await.unwrap();
    let thread = first.thread_id().to_string();

    let mut second = ChatSession::new("tags").with_thread_id(thread.clone());
    second.set_source(&source).unwrap();
    second.answer(&graph, "and parse?", &RunConfig::default()).await.unwrap();

    let saved = graph.checkpoint(&thread).await.unwrap().unwrap();
    // one system prompt; the second session sent only its query
    assert_eq!(saved.messages.iter().filter(|m| m.role == Role::System).count(), 1);
    assert_eq!(saved.messages.iter().filter(|m| m.role == Role::User).count(), 2);
}
