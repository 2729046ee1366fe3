//! Agent graph
//!
//! Two nodes and one router. `agent` asks the model for the next message;
//! `tools` executes the calls that message requested; the router sends the
//! run back to `tools` while the model keeps asking, and ends it otherwise.

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::checkpoint::{Checkpoint, Checkpointer};
use super::client::ChatModel;
use super::loop_guard::LoopGuard;
use super::types::{GenerationOptions, Message, Role, ToolDefinition};
use crate::config::AgentConfig;
use crate::error::{Error, Result};
use crate::tools::ToolRegistry;

/// A node of the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Node {
    /// Model turn
    Agent,
    /// Tool turn
    Tools,
    /// Terminal
    End,
}

impl Node {
    pub fn as_str(&self) -> &'static str {
        match self {
            Node::Agent => "agent",
            Node::Tools => "tools",
            Node::End => "end",
        }
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Node {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "agent" => Ok(Node::Agent),
            "tools" => Ok(Node::Tools),
            "end" => Ok(Node::End),
            other => Err(Error::Checkpoint(format!("Unknown node: {}", other))),
        }
    }
}

/// Messages flowing through the graph. Only ever appended to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphState {
    pub messages: Vec<Message>,
}

impl GraphState {
    pub fn new(messages: Vec<Message>) -> Self {
        GraphState { messages }
    }

    /// Most recent message, if any
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Text of the closing assistant message, once the run has ended
    pub fn final_response(&self) -> Option<&str> {
        self.last()
            .filter(|m| m.role == Role::Assistant && !m.has_tool_calls())
            .map(|m| m.content.as_str())
    }
}

/// Decide where the run goes after a model turn.
///
/// Tool calls on the last message lead to `Tools`; anything else, an empty
/// state included, ends the run.
pub fn route(state: &GraphState) -> Node {
    match state.last() {
        Some(message) if message.has_tool_calls() => Node::Tools,
        _ => {
            debug!("No tool calls requested, ending run");
            Node::End
        }
    }
}

/// Execute the tool calls of the last message.
///
/// Every name is resolved before anything runs, so an unknown tool fails the
/// turn without side effects. Calls run concurrently; results come back in
/// call order, each tagged with its call id.
pub async fn run_tools(tools: &ToolRegistry, state: &GraphState) -> Result<Vec<Message>> {
    let Some(last) = state.last() else {
        return Ok(Vec::new());
    };

    for call in &last.tool_calls {
        tools.get(&call.name)?;
    }

    let pending = last.tool_calls.iter().map(|call| async move {
        let tool = tools.get(&call.name)?;
        let started = Instant::now();
        let output = tool.execute(call.arguments.clone()).await?;
        info!(
            "Tool {} ({}) finished in {}ms",
            call.name,
            call.id,
            started.elapsed().as_millis()
        );
        Ok::<_, Error>(Message::tool(&call.id, output.into_text()))
    });

    try_join_all(pending).await
}

/// Content of the tool reply given to a call whose turn never finished
pub const INTERRUPTED_TOOL_REPLY: &str = "Error: tool call did not complete";

/// Answer every tool call of the last assistant turn that has no tool reply.
///
/// A turn that failed or was cancelled in the tools node leaves its calls
/// open; the model API rejects a history like that. Returns the number of
/// replies added.
pub fn close_pending_calls(state: &mut GraphState) -> usize {
    let Some(start) = state
        .messages
        .iter()
        .rposition(|m| m.role == Role::Assistant)
    else {
        return 0;
    };

    let answered: Vec<&str> = state.messages[start + 1..]
        .iter()
        .filter(|m| m.role == Role::Tool)
        .filter_map(|m| m.tool_call_id.as_deref())
        .collect();

    let replies: Vec<Message> = state.messages[start]
        .tool_calls
        .iter()
        .filter(|call| !answered.contains(&call.id.as_str()))
        .map(|call| Message::tool(&call.id, INTERRUPTED_TOOL_REPLY))
        .collect();

    let count = replies.len();
    state.messages.extend(replies);
    count
}

/// Per-run settings
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Thread to load from and save to when a checkpointer is attached
    pub thread_id: Option<String>,
    /// Model turns allowed in this run
    pub max_hops: u32,
    /// Upper bound on each model call
    pub model_timeout: Duration,
    /// Cancels the in-flight node
    pub cancel: CancellationToken,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            thread_id: None,
            max_hops: 25,
            model_timeout: Duration::from_secs(120),
            cancel: CancellationToken::new(),
        }
    }
}

impl RunConfig {
    pub fn from_config(config: &AgentConfig) -> Self {
        RunConfig {
            max_hops: config.max_hops,
            model_timeout: config.model_timeout,
            ..Default::default()
        }
    }

    pub fn with_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// The compiled agent/tools graph
pub struct AgentGraph {
    model: Arc<dyn ChatModel>,
    tools: Arc<ToolRegistry>,
    checkpointer: Option<Arc<dyn Checkpointer>>,
    options: GenerationOptions,
    definitions: Vec<ToolDefinition>,
}

impl AgentGraph {
    pub fn new(model: Arc<dyn ChatModel>, tools: Arc<ToolRegistry>) -> Self {
        let definitions = tools.definitions();
        AgentGraph {
            model,
            tools,
            checkpointer: None,
            options: GenerationOptions::default(),
            definitions,
        }
    }

    pub fn with_checkpointer(mut self, checkpointer: Arc<dyn Checkpointer>) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn has_checkpointer(&self) -> bool {
        self.checkpointer.is_some()
    }

    /// Stored state of a thread, if a checkpointer is attached
    pub async fn checkpoint(&self, thread_id: &str) -> Result<Option<Checkpoint>> {
        match self.checkpointer {
            Some(ref store) => store.load(thread_id).await,
            None => Ok(None),
        }
    }

    /// Run the graph until it ends.
    ///
    /// `input` holds the caller's new messages. With a checkpointer and a
    /// thread id they are appended to the stored thread; an empty input
    /// resumes the thread at the node it stopped before. Errors leave the
    /// checkpoint at the last completed node.
    pub async fn advance(&self, input: GraphState, config: &RunConfig) -> Result<GraphState> {
        let store = match (&self.checkpointer, &config.thread_id) {
            (Some(store), Some(thread)) => Some((store.as_ref(), thread.as_str())),
            _ => None,
        };

        let mut state = GraphState::default();
        let mut step = 0u64;
        let mut next = Node::Agent;

        if let Some((store, thread)) = store {
            if let Some(saved) = store.load(thread).await? {
                debug!("Loaded thread {} at step {} (next: {})", thread, saved.step, saved.next);
                state.messages = saved.messages;
                step = saved.step;
                if input.messages.is_empty() {
                    next = saved.next;
                }
            }
        }

        if !input.messages.is_empty() {
            let closed = close_pending_calls(&mut state);
            if closed > 0 {
                warn!("Closed {} unanswered tool calls from an interrupted turn", closed);
            }
            state.messages.extend(input.messages);
            step += 1;
            self.save(store, step, next, &state).await?;
        }

        let mut guard = LoopGuard::new(config.max_hops);
        let started = Instant::now();

        loop {
            match next {
                Node::Agent => {
                    let hop = guard.hop()?;
                    debug!("Agent turn {}", hop);
                    let reply = self.call_model(&state, config).await?;
                    state.messages.push(reply);
                    next = route(&state);
                }
                Node::Tools => {
                    if let Some(last) = state.last() {
                        let repeats = guard.record_batch(&last.tool_calls);
                        if repeats > 1 {
                            warn!("Model requested the same tool batch {} times in a row", repeats);
                        }
                    }
                    let results = tokio::select! {
                        biased;
                        _ = config.cancel.cancelled() => return Err(Error::Cancelled),
                        results = run_tools(&self.tools, &state) => results?,
                    };
                    state.messages.extend(results);
                    next = Node::Agent;
                }
                Node::End => break,
            }

            step += 1;
            self.save(store, step, next, &state).await?;
        }

        info!(
            "Run finished after {} model turns in {}ms",
            guard.hops(),
            started.elapsed().as_millis()
        );
        Ok(state)
    }

    /// One model call, bounded by the run's timeout and cancel token
    async fn call_model(&self, state: &GraphState, config: &RunConfig) -> Result<Message> {
        let call = self.model.complete(&state.messages, &self.definitions, &self.options);

        tokio::select! {
            biased;
            _ = config.cancel.cancelled() => Err(Error::Cancelled),
            result = tokio::time::timeout(config.model_timeout, call) => match result {
                Ok(reply) => reply,
                Err(_) => Err(Error::Timeout(format!(
                    "Model did not answer within {:?}",
                    config.model_timeout
                ))),
            },
        }
    }

    async fn save(
        &self,
        store: Option<(&dyn Checkpointer, &str)>,
        step: u64,
        next: Node,
        state: &GraphState,
    ) -> Result<()> {
        if let Some((store, thread)) = store {
            store
                .save(&Checkpoint::new(thread, step, next, state.messages.clone()))
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::checkpoint::MemoryCheckpointer;
    use crate::tools::{Tool, ToolCall, ToolOutput};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays canned replies and records how many messages it was shown
    struct ScriptedModel {
        replies: Mutex<VecDeque<Message>>,
        seen: Mutex<Vec<usize>>,
        delay: Duration,
    }

    impl ScriptedModel {
        fn new(replies: Vec<Message>) -> Self {
            ScriptedModel {
                replies: Mutex::new(replies.into()),
                seen: Mutex::new(Vec::new()),
                delay: Duration::ZERO,
            }
        }

        fn slow(delay: Duration) -> Self {
            ScriptedModel {
                delay,
                ..Self::new(vec![Message::assistant("late")])
            }
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(
            &self,
            messages: &[Message],
            _tools: &[ToolDefinition],
            _options: &GenerationOptions,
        ) -> Result<Message> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            reject_open_calls(messages)?;
            self.seen.lock().unwrap().push(messages.len());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| Error::Provider("script exhausted".to_string()))
        }
    }

    /// Fails like the chat-completions API does when a tool call has no reply
    fn reject_open_calls(messages: &[Message]) -> Result<()> {
        for (i, message) in messages.iter().enumerate() {
            for call in &message.tool_calls {
                let answered = messages[i + 1..]
                    .iter()
                    .any(|m| m.role == Role::Tool && m.tool_call_id.as_deref() == Some(call.id.as_str()));
                if !answered {
                    return Err(Error::Provider(format!("400: tool_call {} has no tool response", call.id)));
                }
            }
        }
        Ok(())
    }

    /// Model that always asks for the same tool
    struct LoopingModel;

    #[async_trait]
    impl ChatModel for LoopingModel {
        async fn complete(
            &self,
            messages: &[Message],
            _tools: &[ToolDefinition],
            _options: &GenerationOptions,
        ) -> Result<Message> {
            Ok(Message::assistant_with_tool_calls(
                "",
                vec![ToolCall::new(format!("c{}", messages.len()), "echo", json!({"text": "again"}))],
            ))
        }
    }

    /// Echoes `text` after sleeping `delay_ms`
    struct EchoTool {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the input"
        }

        fn parameters_schema(&self) -> Value {
            json!({"type": "object", "properties": {"text": {"type": "string"}}})
        }

        async fn execute(&self, args: Value) -> Result<ToolOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let delay = args["delay_ms"].as_u64().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            match args["text"].as_str() {
                Some(text) => Ok(ToolOutput::text(text)),
                None => Err(Error::InvalidInput("missing text".to_string())),
            }
        }
    }

    fn registry() -> (Arc<ToolRegistry>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool { calls: calls.clone() });
        (Arc::new(registry), calls)
    }

    fn echo_call(id: &str, text: &str, delay_ms: u64) -> ToolCall {
        ToolCall::new(id, "echo", json!({"text": text, "delay_ms": delay_ms}))
    }

    #[test]
    fn test_route() {
        assert_eq!(route(&GraphState::default()), Node::End);
        assert_eq!(route(&GraphState::new(vec![Message::user("hi")])), Node::End);
        assert_eq!(
            route(&GraphState::new(vec![Message::assistant("done")])),
            Node::End
        );
        assert_eq!(
            route(&GraphState::new(vec![Message::assistant_with_tool_calls(
                "",
                vec![echo_call("1", "x", 0)]
            )])),
            Node::Tools
        );
    }

    #[test]
    fn test_node_round_trips_through_str() {
        for node in [Node::Agent, Node::Tools, Node::End] {
            assert_eq!(node.as_str().parse::<Node>().unwrap(), node);
        }
        assert!("__end__".parse::<Node>().is_err());
    }

    #[tokio::test]
    async fn test_run_tools_preserves_call_order() {
        let (tools, _) = registry();
        let state = GraphState::new(vec![Message::assistant_with_tool_calls(
            "",
            vec![echo_call("a", "slow", 60), echo_call("b", "fast", 0)],
        )]);

        let results = run_tools(&tools, &state).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].tool_call_id.as_deref(), Some("a"));
        assert_eq!(results[0].content, "slow");
        assert_eq!(results[1].tool_call_id.as_deref(), Some("b"));
        assert_eq!(results[1].content, "fast");
    }

    #[tokio::test]
    async fn test_run_tools_without_calls_is_empty() {
        let (tools, _) = registry();
        assert!(run_tools(&tools, &GraphState::default()).await.unwrap().is_empty());
        let state = GraphState::new(vec![Message::user("hi")]);
        assert!(run_tools(&tools, &state).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_tool_fails_before_any_call_runs() {
        let (tools, calls) = registry();
        let state = GraphState::new(vec![Message::assistant_with_tool_calls(
            "",
            vec![
                echo_call("a", "x", 0),
                ToolCall::new("b", "grep", json!({})),
            ],
        )]);

        match run_tools(&tools, &state).await {
            Err(Error::UnknownTool(name)) => assert_eq!(name, "grep"),
            other => panic!("expected unknown tool, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_tool_failure_fails_the_turn() {
        let (tools, _) = registry();
        let state = GraphState::new(vec![Message::assistant_with_tool_calls(
            "",
            vec![ToolCall::new("a", "echo", json!({}))],
        )]);
        assert!(matches!(
            run_tools(&tools, &state).await,
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_advance_runs_tools_then_answers() {
        let (tools, calls) = registry();
        let model = Arc::new(ScriptedModel::new(vec![
            Message::assistant_with_tool_calls("", vec![echo_call("c1", "found it", 0)]),
            Message::assistant("The answer"),
        ]));
        let graph = AgentGraph::new(model.clone(), tools);

        let state = graph
            .advance(GraphState::new(vec![Message::user("question")]), &RunConfig::default())
            .await
            .unwrap();

        assert_eq!(state.messages.len(), 4);
        assert_eq!(state.messages[2].role, Role::Tool);
        assert_eq!(state.messages[2].content, "found it");
        assert_eq!(state.final_response(), Some("The answer"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*model.seen.lock().unwrap(), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_max_hops_exceeded() {
        let (tools, _) = registry();
        let graph = AgentGraph::new(Arc::new(LoopingModel), tools);
        let config = RunConfig {
            max_hops: 3,
            ..Default::default()
        };

        let result = graph
            .advance(GraphState::new(vec![Message::user("loop")]), &config)
            .await;
        assert!(matches!(result, Err(Error::MaxHopsExceeded(3))));
    }

    #[tokio::test]
    async fn test_timeout_keeps_last_checkpoint() {
        let (tools, _) = registry();
        let store = Arc::new(MemoryCheckpointer::new());
        let graph = AgentGraph::new(Arc::new(ScriptedModel::slow(Duration::from_secs(5))), tools)
            .with_checkpointer(store.clone());
        let config = RunConfig {
            model_timeout: Duration::from_millis(50),
            ..Default::default()
        }
        .with_thread("t");

        let result = graph
            .advance(GraphState::new(vec![Message::user("hi")]), &config)
            .await;
        assert!(matches!(result, Err(Error::Timeout(_))));

        let saved = store.load("t").await.unwrap().unwrap();
        assert_eq!(saved.messages, vec![Message::user("hi")]);
        assert_eq!(saved.next, Node::Agent);
    }

    #[tokio::test]
    async fn test_cancelled_before_model_answers() {
        let (tools, _) = registry();
        let model = Arc::new(ScriptedModel::slow(Duration::from_secs(5)));
        let graph = AgentGraph::new(model.clone(), tools);
        let cancel = CancellationToken::new();
        let config = RunConfig::default().with_cancel(cancel.clone());

        let handle = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                cancel.cancel();
            }
        });

        let result = graph
            .advance(GraphState::new(vec![Message::user("hi")]), &config)
            .await;
        handle.await.unwrap();

        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(model.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_thread_resumes_with_history() {
        let (tools, _) = registry();
        let model = Arc::new(ScriptedModel::new(vec![
            Message::assistant("first answer"),
            Message::assistant("second answer"),
        ]));
        let graph = AgentGraph::new(model.clone(), tools)
            .with_checkpointer(Arc::new(MemoryCheckpointer::new()));
        let config = RunConfig::default().with_thread("thread-1");

        graph
            .advance(GraphState::new(vec![Message::user("one")]), &config)
            .await
            .unwrap();
        let state = graph
            .advance(GraphState::new(vec![Message::user("two")]), &config)
            .await
            .unwrap();

        assert_eq!(state.messages.len(), 4);
        assert_eq!(state.final_response(), Some("second answer"));
        assert_eq!(*model.seen.lock().unwrap(), vec![1, 3]);

        let saved = graph.checkpoint("thread-1").await.unwrap().unwrap();
        assert_eq!(saved.next, Node::End);
        assert_eq!(saved.messages, state.messages);
    }

    #[tokio::test]
    async fn test_empty_input_on_finished_thread_is_a_no_op() {
        let (tools, _) = registry();
        let model = Arc::new(ScriptedModel::new(vec![Message::assistant("done")]));
        let graph = AgentGraph::new(model.clone(), tools)
            .with_checkpointer(Arc::new(MemoryCheckpointer::new()));
        let config = RunConfig::default().with_thread("t");

        graph
            .advance(GraphState::new(vec![Message::user("hi")]), &config)
            .await
            .unwrap();
        let state = graph.advance(GraphState::default(), &config).await.unwrap();

        assert_eq!(state.final_response(), Some("done"));
        assert_eq!(model.seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_close_pending_calls_answers_only_open_ids() {
        let mut state = GraphState::new(vec![
            Message::user("q"),
            Message::assistant_with_tool_calls("", vec![echo_call("a", "x", 0), echo_call("b", "y", 0)]),
            Message::tool("a", "x"),
        ]);

        assert_eq!(close_pending_calls(&mut state), 1);
        assert_eq!(state.messages.len(), 4);
        assert_eq!(state.messages[3].tool_call_id.as_deref(), Some("b"));
        assert_eq!(state.messages[3].content, INTERRUPTED_TOOL_REPLY);

        // nothing left open
        assert_eq!(close_pending_calls(&mut state), 0);
        let mut finished = GraphState::new(vec![Message::user("q"), Message::assistant("a")]);
        assert_eq!(close_pending_calls(&mut finished), 0);
    }

    #[tokio::test]
    async fn test_unknown_tool_turn_does_not_break_the_thread() {
        let (tools, _) = registry();
        let model = Arc::new(ScriptedModel::new(vec![
            Message::assistant_with_tool_calls("", vec![ToolCall::new("call_1", "grep", json!({}))]),
            Message::assistant("fine"),
            Message::assistant("still fine"),
        ]));
        let graph = AgentGraph::new(model.clone(), tools)
            .with_checkpointer(Arc::new(MemoryCheckpointer::new()));
        let config = RunConfig::default().with_thread("t");

        let first = graph
            .advance(GraphState::new(vec![Message::user("one")]), &config)
            .await;
        assert!(matches!(first, Err(Error::UnknownTool(_))));

        let second = graph
            .advance(GraphState::new(vec![Message::user("two")]), &config)
            .await
            .unwrap();
        assert_eq!(second.final_response(), Some("fine"));
        assert_eq!(second.messages[2].role, Role::Tool);
        assert_eq!(second.messages[2].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(second.messages[2].content, INTERRUPTED_TOOL_REPLY);
        assert_eq!(second.messages[3], Message::user("two"));

        let third = graph
            .advance(GraphState::new(vec![Message::user("three")]), &config)
            .await
            .unwrap();
        assert_eq!(third.final_response(), Some("still fine"));
        assert_eq!(*model.seen.lock().unwrap(), vec![1, 4, 6]);
    }

    #[tokio::test]
    async fn test_cancel_during_tools_appends_nothing() {
        let (tools, calls) = registry();
        let model = Arc::new(ScriptedModel::new(vec![
            Message::assistant_with_tool_calls("", vec![echo_call("c1", "slow", 5_000)]),
            Message::assistant("recovered"),
        ]));
        let store = Arc::new(MemoryCheckpointer::new());
        let graph = AgentGraph::new(model.clone(), tools).with_checkpointer(store.clone());
        let cancel = CancellationToken::new();
        let config = RunConfig::default().with_thread("t").with_cancel(cancel.clone());

        let handle = tokio::spawn({
            let calls = calls.clone();
            async move {
                while calls.load(Ordering::SeqCst) == 0 {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
                cancel.cancel();
            }
        });

        let result = graph
            .advance(GraphState::new(vec![Message::user("hi")]), &config)
            .await;
        handle.await.unwrap();
        assert!(matches!(result, Err(Error::Cancelled)));

        let saved = store.load("t").await.unwrap().unwrap();
        assert_eq!(saved.next, Node::Tools);
        assert_eq!(saved.messages.len(), 2);
        assert!(saved.messages.iter().all(|m| m.role != Role::Tool));

        let state = graph
            .advance(
                GraphState::new(vec![Message::user("again")]),
                &RunConfig::default().with_thread("t"),
            )
            .await
            .unwrap();
        assert_eq!(state.final_response(), Some("recovered"));
        assert_eq!(state.messages[2].content, INTERRUPTED_TOOL_REPLY);
        assert_eq!(*model.seen.lock().unwrap(), vec![1, 4]);
    }
}
