use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::catalog::CatalogError;
use crate::core::catalog::seed::{PRODUCT_COLUMNS, PRODUCT_TABLE};
use crate::core::llm::{
    ChatMessage, GenerateRequest, LlmError, LlmManager, ModelReply, ToolDeclaration,
};
use crate::core::memory::{ConversationStore, Turn};
use crate::core::tools::ToolRegistry;

/// Assistant text used whenever a turn cannot produce a real answer.
pub const FALLBACK_REPLY: &str =
    "I apologize, but I couldn't generate a proper response. Please try rephrasing your question.";

pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 10;

/// Build the fixed system instruction for the catalog agent.
pub fn build_system_instruction(table: &str, columns: &[&str]) -> String {
    format!(
        "You are a helpful Customer Service Agent for a computer store. You will take the users questions and turn them into SQL queries using the tools
    available.

    DATABASE INFORMATION:
    - Table name: {table}
    - Columns: {columns}

    IMPORTANT SQL RULES:
    - Always use single quotes (') for string literals
    - DO NOT escape quotes in the SQL query
    - For category searches use: WHERE LOWER(category) = 'mouse'
    - For partial matches use: WHERE LOWER(name) LIKE '%mouse%'
    - Use proper SQLite syntax

    EXAMPLE QUERIES:
    - Correct: SELECT * FROM {table} WHERE LOWER(category) = 'mouse'
    - Correct: SELECT * FROM {table} WHERE price < 1000
    - Correct: SELECT * FROM {table} WHERE LOWER(name) LIKE '%mouse%'

    When responding to users:
    1. Generate appropriate SQL queries using the rules above
    2. Use the query results to provide helpful, customer-friendly responses
    3. Include relevant product details in your answers
    ",
        table = table,
        columns = columns.join(", "),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingModel,
    ToolRequested,
    ToolExecuting,
    Responding,
}

/// Why a turn ended without a model answer.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error(transparent)]
    Model(#[from] LlmError),
    #[error(transparent)]
    Tool(#[from] CatalogError),
    #[error("no final answer after {0} model round-trips")]
    TooManyRounds(usize),
}

/// One live conversation with the model, bound to the catalog tools.
///
/// The session owns the running model history. The visible [`ConversationStore`]
/// only ever receives the user text and exactly one assistant turn per submit.
pub struct AgentSession<'a> {
    llm: LlmManager,
    tools: ToolRegistry<'a>,
    manifest: Vec<ToolDeclaration>,
    system_instruction: String,
    history: Vec<ChatMessage>,
    turns: ConversationStore,
    state: SessionState,
    max_tool_rounds: usize,
    session_id: String,
}

impl<'a> AgentSession<'a> {
    pub fn new(llm: LlmManager, tools: ToolRegistry<'a>) -> Self {
        let manifest = tools.manifest();
        let session_id = uuid::Uuid::new_v4().to_string();
        info!("Agent session started: {}", session_id);
        Self {
            llm,
            tools,
            manifest,
            system_instruction: build_system_instruction(PRODUCT_TABLE, &PRODUCT_COLUMNS),
            history: Vec::new(),
            turns: ConversationStore::new(),
            state: SessionState::Idle,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            session_id,
        }
    }

    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds.max(1);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn turns(&self) -> &ConversationStore {
        &self.turns
    }

    /// The running model conversation of completed turns.
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn llm(&self) -> &LlmManager {
        &self.llm
    }

    /// Run one user turn to completion and return the assistant text.
    ///
    /// Never fails: every error path ends in [`FALLBACK_REPLY`]. A failed turn
    /// leaves the model history as it was before the submit.
    pub async fn submit(&mut self, text: &str) -> String {
        info!("Sending message to the model ({} chars)", text.len());
        self.turns.append(Turn::user(text));

        let checkpoint = self.history.len();
        self.history.push(ChatMessage::User(text.to_string()));

        let answer = match self.run_turn().await {
            Ok(answer) => {
                info!("Response received from the model");
                self.history.push(ChatMessage::Assistant {
                    text: Some(answer.clone()),
                    tool_calls: Vec::new(),
                });
                answer
            }
            Err(e) => {
                warn!("Turn failed: {}", e);
                self.history.truncate(checkpoint);
                FALLBACK_REPLY.to_string()
            }
        };

        self.state = SessionState::Responding;
        self.turns.append(Turn::assistant(answer.clone()));
        self.state = SessionState::Idle;
        answer
    }

    async fn run_turn(&mut self) -> Result<String, TurnError> {
        for round in 1..=self.max_tool_rounds {
            self.state = SessionState::AwaitingModel;
            let request = GenerateRequest {
                system_instruction: &self.system_instruction,
                messages: &self.history,
                tools: &self.manifest,
            };
            let reply = self.llm.generate(&request).await?;

            match reply {
                ModelReply::Text(text) => {
                    debug!("Final answer after {} round(s)", round);
                    return Ok(text);
                }
                ModelReply::ToolCalls { text, calls } => {
                    self.state = SessionState::ToolRequested;
                    info!("Round {}: model requested {} tool call(s)", round, calls.len());
                    self.history.push(ChatMessage::Assistant {
                        text,
                        tool_calls: calls.clone(),
                    });

                    self.state = SessionState::ToolExecuting;
                    let mut outcomes = Vec::with_capacity(calls.len());
                    for call in &calls {
                        outcomes.push(self.tools.dispatch(call)?);
                    }
                    self.history.push(ChatMessage::ToolResults(outcomes));
                }
            }
        }
        Err(TurnError::TooManyRounds(self.max_tool_rounds))
    }

    /// Drop the visible turns and the model conversation. Safe to call repeatedly.
    pub fn reset(&mut self) {
        self.turns.clear();
        self.history.clear();
        self.state = SessionState::Idle;
        self.session_id = uuid::Uuid::new_v4().to_string();
        info!("Chat cleared, new session: {}", self.session_id);
    }
}
