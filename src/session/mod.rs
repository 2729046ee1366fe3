//! Chat session context
//!
//! Everything an interactive front end keeps between turns: the visible
//! conversation, the selected source tree, and the graph thread the
//! conversation is checkpointed under.

pub mod history;
pub mod paths;

pub use history::{default_history_filename, load_conversation, save_conversation, ChatEntry};
pub use paths::{load_last_source, save_last_source, SavedPaths};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

use crate::agent::{AgentGraph, GraphState, Message, PromptContext, PromptTemplate, RunConfig};
use crate::config::Config;
use crate::error::{Error, Result};

/// Reply given while no source directory is selected
pub const NO_SOURCE_REPLY: &str =
    "Please select a source directory and run the mapping process first.";

/// State of one chat
#[derive(Debug, Clone)]
pub struct ChatSession {
    thread_id: String,
    messages: Vec<ChatEntry>,
    source: Option<PathBuf>,
    extra_source: Option<PathBuf>,
    use_summary_context: bool,
    mapping_done: bool,
    tags_file_name: String,
    prompt_file: Option<PathBuf>,
}

impl ChatSession {
    /// Empty session looking for `tags_file_name` inside the source tree
    pub fn new(tags_file_name: impl Into<String>) -> Self {
        ChatSession {
            thread_id: Uuid::new_v4().to_string(),
            messages: Vec::new(),
            source: None,
            extra_source: None,
            use_summary_context: true,
            mapping_done: false,
            tags_file_name: tags_file_name.into(),
            prompt_file: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        ChatSession {
            prompt_file: config.agent.system_prompt_file.clone(),
            ..Self::new(config.agent.tags_file.clone())
        }
    }

    /// Continue an existing checkpointed thread
    pub fn with_thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = thread_id.into();
        self
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn messages(&self) -> &[ChatEntry] {
        &self.messages
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn extra_source(&self) -> Option<&Path> {
        self.extra_source.as_deref()
    }

    /// Whether the source tree has a tags file
    pub fn mapping_done(&self) -> bool {
        self.mapping_done
    }

    /// ctags file of the selected source
    pub fn tags_file(&self) -> Option<PathBuf> {
        self.source.as_ref().map(|s| s.join(&self.tags_file_name))
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(ChatEntry::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(ChatEntry::assistant(content));
    }

    /// Start a new chat: no messages, fresh thread
    pub fn reset(&mut self) {
        self.messages.clear();
        self.thread_id = Uuid::new_v4().to_string();
        debug!("Session reset, new thread {}", self.thread_id);
    }

    /// Replace the conversation wholesale, e.g. after loading a saved file.
    ///
    /// The old thread no longer matches, so a fresh one is started.
    pub fn replace_messages(&mut self, messages: Vec<ChatEntry>) {
        self.messages = messages;
        self.thread_id = Uuid::new_v4().to_string();
    }

    /// Select the source tree. Selecting a different tree re-checks for its
    /// tags file.
    pub fn set_source(&mut self, path: &Path) -> Result<()> {
        let path = path
            .canonicalize()
            .map_err(|e| Error::InvalidInput(format!("{}: {}", path.display(), e)))?;
        if !path.is_dir() {
            return Err(Error::InvalidInput(format!("{} is not a directory", path.display())));
        }

        if self.source.as_deref() != Some(path.as_path()) {
            self.mapping_done = path.join(&self.tags_file_name).is_file();
            info!(
                "Source set to {} (tags file {})",
                path.display(),
                if self.mapping_done { "found" } else { "missing" }
            );
            self.source = Some(path);
        }
        Ok(())
    }

    /// Forget the selected source
    pub fn clear_source(&mut self) {
        self.source = None;
        self.mapping_done = false;
    }

    pub fn set_extra_source(&mut self, path: Option<PathBuf>) {
        self.extra_source = path;
    }

    /// Whether earlier turns are replayed to the model on a fresh thread
    pub fn set_use_summary_context(&mut self, enabled: bool) {
        self.use_summary_context = enabled;
    }

    fn system_prompt(&self, source: &Path) -> Result<String> {
        let context = PromptContext {
            source_path: source.to_path_buf(),
            extra_source_path: self.extra_source.clone(),
            tags_file: source.join(&self.tags_file_name),
        };
        PromptTemplate::system(self.prompt_file.as_deref())?.render(&context)
    }

    /// Answer one user query through the graph.
    ///
    /// The query and the reply are recorded together once the run succeeds;
    /// a failed turn leaves the conversation unchanged. On a
    /// thread the checkpointer already knows, only the query is sent; a fresh
    /// thread starts with the system prompt (and the earlier turns, when
    /// summary context is on).
    pub async fn answer(&mut self, graph: &AgentGraph, query: &str, config: &RunConfig) -> Result<String> {
        let Some(source) = self.source.clone() else {
            self.push_user(query);
            self.push_assistant(NO_SOURCE_REPLY);
            return Ok(NO_SOURCE_REPLY.to_string());
        };

        let resumed = graph.checkpoint(&self.thread_id).await?.is_some();
        let mut input = Vec::new();
        if !resumed {
            input.push(Message::system(self.system_prompt(&source)?));
            if self.use_summary_context {
                input.extend(self.messages.iter().map(Message::from));
            }
        }
        input.push(Message::user(query));

        let config = config.clone().with_thread(self.thread_id.clone());
        let state = graph.advance(GraphState::new(input), &config).await?;

        let reply = state.final_response().unwrap_or_default().to_string();
        self.push_user(query);
        self.push_assistant(reply.clone());
        Ok(reply)
    }
}

/// Shared handle to a session; one turn at a time
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<Mutex<ChatSession>>,
}

impl SessionHandle {
    pub fn new(session: ChatSession) -> Self {
        SessionHandle {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// Claim the session for a turn. Fails with `Busy` while another turn
    /// holds it instead of queueing behind it.
    pub fn try_begin_turn(&self) -> Result<OwnedMutexGuard<ChatSession>> {
        self.inner
            .clone()
            .try_lock_owned()
            .map_err(|_| Error::Busy("a turn is already running for this session".to_string()))
    }

    /// Wait for the session (for non-turn access such as saving)
    pub async fn lock(&self) -> OwnedMutexGuard<ChatSession> {
        self.inner.clone().lock_owned().await
    }
}
