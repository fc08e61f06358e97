//! One conversational turn with the HR assistant.
//!
//! Conversations live in memory, keyed by a UUID thread id. Each turn
//! refreshes the system prompt for the employee, sends the history to the
//! model and executes any tool calls until the model answers in text.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    access::Requester,
    employee::Employee,
    llm::{ChatClient, ChatMessage, Role},
    prompt::{PromptContext, complete_instructions, employee_context, greeting_now},
    tools::ToolSet,
};

struct Conversation {
    owner: String,
    messages: Vec<ChatMessage>,
    touched: Instant,
}

/// In-memory conversations, each owned by the employee who started it.
/// Threads idle for longer than the TTL are dropped.
pub struct ConversationStore {
    ttl: Duration,
    threads: RwLock<HashMap<String, Conversation>>,
}

impl ConversationStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            threads: RwLock::new(HashMap::new()),
        }
    }

    fn is_live(&self, conversation: &Conversation, now: Instant) -> bool {
        now.saturating_duration_since(conversation.touched) < self.ttl
    }

    fn prune(&self, threads: &mut HashMap<String, Conversation>, now: Instant) {
        threads.retain(|_, conversation| self.is_live(conversation, now));
    }

    /// Stores a new conversation for `owner` and returns its thread id.
    pub fn create(&self, owner: &str, messages: Vec<ChatMessage>) -> String {
        let thread_id = Uuid::new_v4().to_string();
        let now = Instant::now();
        let mut threads = self.threads.write();
        self.prune(&mut threads, now);
        threads.insert(
            thread_id.clone(),
            Conversation {
                owner: owner.to_string(),
                messages,
                touched: now,
            },
        );
        thread_id
    }

    /// History of a live thread, only when `owner` started it.
    pub fn get(&self, thread_id: &str, owner: &str) -> Option<Vec<ChatMessage>> {
        self.get_at(thread_id, owner, Instant::now())
    }

    fn get_at(&self, thread_id: &str, owner: &str, now: Instant) -> Option<Vec<ChatMessage>> {
        let threads = self.threads.read();
        let conversation = threads.get(thread_id)?;
        (conversation.owner.eq_ignore_ascii_case(owner) && self.is_live(conversation, now))
            .then(|| conversation.messages.clone())
    }

    /// Swaps in the current system prompt and appends one turn's messages
    /// to the stored thread, so concurrent turns never overwrite each other.
    pub fn append(&self, thread_id: &str, system: ChatMessage, turn: Vec<ChatMessage>) {
        let mut threads = self.threads.write();
        let Some(conversation) = threads.get_mut(thread_id) else {
            warn!(%thread_id, "conversation expired during turn");
            return;
        };
        match conversation.messages.first_mut() {
            Some(first) if first.role == Role::System => *first = system,
            _ => conversation.messages.insert(0, system),
        }
        conversation.messages.extend(turn);
        conversation.touched = Instant::now();
    }

    /// Number of live conversations.
    pub fn len(&self) -> usize {
        let mut threads = self.threads.write();
        self.prune(&mut threads, Instant::now());
        threads.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatReply {
    pub response: String,
    pub thread_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Apology {
    Trouble,
    TooLong,
    NoResponse,
}

impl Apology {
    fn render(self, greeting: &str, name: &str) -> String {
        let body = match self {
            Self::Trouble => "I'm having trouble processing your request right now. Please try again later.",
            Self::TooLong => "it's taking too long to process your request. Please try again later.",
            Self::NoResponse => "I couldn't generate a response. Please try again.",
        };
        format!("{greeting}, {name}! I apologize, but {body}")
    }
}

#[derive(Clone)]
pub struct Assistant {
    llm: ChatClient,
    tools: ToolSet,
    conversations: Arc<ConversationStore>,
    max_tool_rounds: usize,
}

impl Assistant {
    pub fn new(llm: ChatClient, tools: ToolSet, max_tool_rounds: usize, conversation_ttl: Duration) -> Self {
        Self {
            llm,
            tools,
            conversations: Arc::new(ConversationStore::new(conversation_ttl)),
            max_tool_rounds: max_tool_rounds.max(1),
        }
    }

    pub const fn tools(&self) -> &ToolSet {
        &self.tools
    }

    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    pub async fn reply(
        &self,
        employee_id: &str,
        employee: &Employee,
        message: &str,
        thread_id: Option<&str>,
    ) -> ChatReply {
        self.turn(employee_id, employee, message, thread_id, greeting_now())
            .await
    }

    async fn turn(
        &self,
        employee_id: &str,
        employee: &Employee,
        message: &str,
        thread_id: Option<&str>,
        greeting: &str,
    ) -> ChatReply {
        let name = employee.display_name();
        let requester = Requester::from_employee(employee_id, employee);
        let greeting_instruction = format!(
            "Always start your response with '{greeting}, {name}!' Provide helpful information based on the employee data."
        );
        let system = ChatMessage::system(complete_instructions(&PromptContext {
            requester: &requester,
            employee_name: &name,
            greeting_instruction: Some(&greeting_instruction),
        }));

        let existing = thread_id.and_then(|id| {
            self.conversations
                .get(id, employee_id)
                .map(|messages| (id.to_string(), messages))
        });
        if existing.is_none() && thread_id.is_some() {
            info!(employee_id, "thread unknown, expired or owned by someone else; starting a new one");
        }
        let (thread_id, mut messages) = if let Some(found) = existing {
            found
        } else {
            let messages = vec![
                system.clone(),
                ChatMessage::user(employee_context(&requester, employee, greeting)),
            ];
            let id = self.conversations.create(employee_id, messages.clone());
            info!(employee_id, thread_id = %id, threads = self.conversations.len(), "created conversation");
            (id, messages)
        };

        // The prompt is rebuilt every turn so the greeting tracks the clock.
        match messages.first_mut() {
            Some(first) if first.role == Role::System => *first = system.clone(),
            _ => messages.insert(0, system.clone()),
        }
        let history_len = messages.len();

        if message.trim().is_empty() {
            info!(employee_id, "sending initial greeting");
            self.conversations.append(&thread_id, system, Vec::new());
            return ChatReply {
                response: format!("{greeting}, {name}! I'm your HR assistant. How may I help you today?"),
                thread_id,
            };
        }

        info!(employee_id, %thread_id, "processing query");
        messages.push(ChatMessage::user(message));
        let response = match self.run_tools(&mut messages, &requester).await {
            Ok(text) => text,
            Err(apology) => apology.render(greeting, &name),
        };
        let turn = messages.split_off(history_len);
        self.conversations.append(&thread_id, system, turn);
        ChatReply { response, thread_id }
    }

    /// Calls the model until it answers without tool calls.
    async fn run_tools(&self, messages: &mut Vec<ChatMessage>, requester: &Requester) -> Result<String, Apology> {
        let definitions = ToolSet::definitions(requester);

        for round in 1..=self.max_tool_rounds {
            let reply = self.llm.complete(messages, &definitions).await.map_err(|err| {
                warn!(error = %err, "language model call failed");
                Apology::Trouble
            })?;

            if reply.tool_calls.is_empty() {
                let text = reply.content.clone().filter(|t| !t.trim().is_empty());
                messages.push(reply);
                return text.ok_or(Apology::NoResponse);
            }

            debug!(round, calls = reply.tool_calls.len(), "model requested tools");
            let calls = reply.tool_calls.clone();
            messages.push(reply);
            for call in calls {
                let output = self
                    .tools
                    .dispatch(&call.function.name, &call.function.arguments, requester)
                    .await;
                messages.push(ChatMessage::tool(call.id, output.to_string()));
            }
        }

        warn!(rounds = self.max_tool_rounds, "tool loop did not converge");
        Err(Apology::TooLong)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        http::build_client,
        hr::tests::{mount_employee, service},
    };
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_string_contains, method, path},
    };

    fn assistant(llm_base: &str, hr_base: &str, rounds: usize) -> Assistant {
        let llm = ChatClient::new(build_client(Duration::from_secs(5)).unwrap(), llm_base, "sk", "gpt-4o");
        Assistant::new(llm, ToolSet::new(service(hr_base)), rounds, Duration::from_secs(600))
    }

    fn sara() -> Employee {
        serde_json::from_value(json!({"_id": "db1", "firstName": "Sara", "lastName": "Ali", "grade": "L4"})).unwrap()
    }

    fn text_reply(text: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": text}, "finish_reason": "stop"}]
        }))
    }

    fn tool_reply(name: &str, arguments: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": name, "arguments": arguments}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        }))
    }

    #[tokio::test]
    async fn empty_message_greets_without_model_call() {
        let llm = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(text_reply("unused"))
            .expect(0)
            .mount(&llm)
            .await;

        let bot = assistant(&llm.uri(), "http://127.0.0.1:9", 4);
        let reply = bot.turn("EMP1", &sara(), "", None, "Good morning").await;
        assert_eq!(
            reply.response,
            "Good morning, Sara Ali! I'm your HR assistant. How may I help you today?"
        );

        let thread = bot.conversations().get(&reply.thread_id, "EMP1").unwrap();
        assert_eq!(thread.len(), 2);
        assert_eq!(thread[0].role, Role::System);
        assert!(thread[1].content.as_deref().unwrap().contains("Employee ID: EMP1"));
    }

    #[tokio::test]
    async fn tool_calls_are_executed_and_answered() {
        let hr = MockServer::start().await;
        mount_employee(&hr, "EMP1", json!({"_id": "db1", "grade": "L4"})).await;
        Mock::given(method("GET"))
            .and(path("/c-emp-attendance/getDataByEmployeeId/db1/2025-04-01/2025-04-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "statusCode": 200,
                "data": [{"date": "2025-04-01", "status": "Absent"}]
            })))
            .expect(1)
            .mount(&hr)
            .await;

        let llm = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains("tool_call_id"))
            .respond_with(text_reply("Good morning, Sara Ali! You were absent on 2025-04-01."))
            .with_priority(1)
            .mount(&llm)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(tool_reply(
                "get_my_attendance",
                r#"{"employee_id":"EMP1","date_type":"2025-04-01"}"#,
            ))
            .expect(1)
            .mount(&llm)
            .await;

        let bot = assistant(&llm.uri(), &hr.uri(), 4);
        let reply = bot
            .turn("EMP1", &sara(), "Was I absent on April 1st?", None, "Good morning")
            .await;
        assert_eq!(reply.response, "Good morning, Sara Ali! You were absent on 2025-04-01.");

        let thread = bot.conversations().get(&reply.thread_id, "EMP1").unwrap();
        let tool_message = thread.iter().find(|m| m.role == Role::Tool).unwrap();
        assert!(tool_message.content.as_deref().unwrap().contains("Total Absent Days: 1"));
        assert_eq!(thread.last().unwrap().role, Role::Assistant);
    }

    #[tokio::test]
    async fn existing_thread_is_continued() {
        let llm = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(text_reply("Sure."))
            .mount(&llm)
            .await;

        let bot = assistant(&llm.uri(), "http://127.0.0.1:9", 4);
        let first = bot.turn("EMP1", &sara(), "", None, "Good evening").await;
        let second = bot
            .turn("EMP1", &sara(), "Hello", Some(&first.thread_id), "Good evening")
            .await;
        assert_eq!(second.thread_id, first.thread_id);
        assert_eq!(second.response, "Sure.");
        assert_eq!(bot.conversations().len(), 1);
        assert_eq!(bot.conversations().get(&first.thread_id, "EMP1").unwrap().len(), 4);
    }

    #[tokio::test]
    async fn model_failure_becomes_apology() {
        let llm = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&llm)
            .await;

        let bot = assistant(&llm.uri(), "http://127.0.0.1:9", 4);
        let reply = bot.turn("EMP1", &sara(), "Hi", None, "Good afternoon").await;
        assert_eq!(
            reply.response,
            "Good afternoon, Sara Ali! I apologize, but I'm having trouble processing your request right now. Please try again later."
        );
    }

    #[tokio::test]
    async fn endless_tool_calls_hit_round_limit() {
        let llm = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(tool_reply("get_salary", "{}"))
            .expect(2)
            .mount(&llm)
            .await;

        let bot = assistant(&llm.uri(), "http://127.0.0.1:9", 2);
        let reply = bot.turn("EMP1", &sara(), "Hi", None, "Good morning").await;
        assert!(reply.response.contains("it's taking too long"));
    }

    #[tokio::test]
    async fn blank_answer_is_reported() {
        let llm = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(text_reply("   "))
            .mount(&llm)
            .await;

        let bot = assistant(&llm.uri(), "http://127.0.0.1:9", 2);
        let reply = bot.turn("EMP1", &sara(), "Hi", None, "Good morning").await;
        assert!(reply.response.ends_with("I couldn't generate a response. Please try again."));
    }

    #[tokio::test]
    async fn thread_of_another_employee_is_not_continued() {
        let llm = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("DE89370400440532013000"))
            .respond_with(text_reply("Your IBAN is DE89370400440532013000."))
            .with_priority(1)
            .expect(0)
            .mount(&llm)
            .await;
        Mock::given(method("POST"))
            .respond_with(text_reply("I can only help with your own records."))
            .mount(&llm)
            .await;

        let bot = assistant(&llm.uri(), "http://127.0.0.1:9", 4);
        let owner: Employee = serde_json::from_value(json!({
            "_id": "db0",
            "firstName": "Huda",
            "grade": "L0",
            "bankingInfo": {"iban": "DE89370400440532013000"}
        }))
        .unwrap();
        let first = bot.turn("EMP1", &owner, "", None, "Good morning").await;
        assert!(
            bot.conversations().get(&first.thread_id, "EMP1").unwrap()[1]
                .content
                .as_deref()
                .unwrap()
                .contains("DE89370400440532013000")
        );

        let other = bot
            .turn("EMP2", &sara(), "What is the IBAN?", Some(&first.thread_id), "Good morning")
            .await;
        assert_ne!(other.thread_id, first.thread_id);
        assert_eq!(other.response, "I can only help with your own records.");
        assert!(bot.conversations().get(&first.thread_id, "EMP2").is_none());
        assert_eq!(bot.conversations().get(&first.thread_id, "EMP1").unwrap().len(), 2);
    }

    #[test]
    fn idle_threads_expire() {
        let store = ConversationStore::new(Duration::from_secs(60));
        let id = store.create("EMP1", vec![ChatMessage::system("prompt")]);
        let now = Instant::now();
        assert!(store.get_at(&id, "EMP1", now).is_some());
        assert!(store.get_at(&id, "EMP1", now + Duration::from_secs(61)).is_none());

        let short_lived = ConversationStore::new(Duration::ZERO);
        let id = short_lived.create("EMP1", vec![ChatMessage::system("prompt")]);
        assert_eq!(short_lived.len(), 0);
        assert!(short_lived.get(&id, "EMP1").is_none());
    }

    #[test]
    fn turns_are_appended_not_overwritten() {
        let store = ConversationStore::new(Duration::from_secs(60));
        let id = store.create("EMP1", vec![ChatMessage::system("old prompt")]);

        store.append(&id, ChatMessage::system("new prompt"), vec![ChatMessage::user("first")]);
        store.append(&id, ChatMessage::system("new prompt"), vec![ChatMessage::user("second")]);

        let thread = store.get(&id, "emp1").unwrap();
        assert_eq!(thread.len(), 3);
        assert_eq!(thread[0].content.as_deref(), Some("new prompt"));
        assert_eq!(thread[2].content.as_deref(), Some("second"));
    }
}
