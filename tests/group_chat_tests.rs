use async_trait::async_trait;
use parliament::client_wrapper::{ClientWrapper, Message, Role, SendError, TokenUsage};
use parliament::group_chat::{GroupChatError, SelectorGroupChat, TerminationCondition, USER_SOURCE};
use parliament::Agent;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Replies from a script, then repeats its last line. Records every request it receives.
struct ScriptedClient {
    replies: Mutex<VecDeque<String>>,
    fallback: String,
    requests: Mutex<Vec<Vec<Message>>>,
    usage: Option<TokenUsage>,
    usage_slot: tokio::sync::Mutex<Option<TokenUsage>>,
}

impl ScriptedClient {
    fn new(replies: &[&str]) -> Self {
        ScriptedClient {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            fallback: replies.last().map(|r| r.to_string()).unwrap_or_default(),
            requests: Mutex::new(Vec::new()),
            usage: None,
            usage_slot: tokio::sync::Mutex::new(None),
        }
    }

    fn with_usage(mut self, total_tokens: usize) -> Self {
        self.usage = Some(TokenUsage {
            input_tokens: total_tokens / 2,
            output_tokens: total_tokens - total_tokens / 2,
            total_tokens,
        });
        self
    }

    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn last_request(&self) -> Vec<Message> {
        self.requests.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl ClientWrapper for ScriptedClient {
    async fn send_message(&self, messages: &[Message]) -> Result<Message, SendError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        *self.usage_slot.lock().await = self.usage.clone();
        Ok(Message::new(Role::Assistant, reply))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }

    fn usage_slot(&self) -> Option<&tokio::sync::Mutex<Option<TokenUsage>>> {
        Some(&self.usage_slot)
    }
}

struct FailingClient;

#[async_trait]
impl ClientWrapper for FailingClient {
    async fn send_message(&self, _messages: &[Message]) -> Result<Message, SendError> {
        Err("503 Service Unavailable".into())
    }

    fn model_name(&self) -> &str {
        "failing"
    }
}

/// Never answers; only cancellation can end a call to it.
struct HangingClient;

#[async_trait]
impl ClientWrapper for HangingClient {
    async fn send_message(&self, _messages: &[Message]) -> Result<Message, SendError> {
        std::future::pending::<()>().await;
        Ok(Message::new(Role::Assistant, "unreachable"))
    }

    fn model_name(&self) -> &str {
        "hanging"
    }
}

fn agent(name: &str, client: Arc<dyn ClientWrapper>) -> Agent {
    Agent::new(name, client)
        .with_system_message(format!("You are {}.", name))
        .with_description(format!("{} the tester", name))
}

#[tokio::test]
async fn test_run_stops_at_max_messages() {
    let moderator = Arc::new(ScriptedClient::new(&["Shauli", "Avi", "Shauli", "Avi"]));
    let mut chat = SelectorGroupChat::new("ParliamentChat", moderator.clone())
        .with_termination(TerminationCondition::MaxMessages(5))
        .with_allow_repeated_speaker(true);
    chat.add_participant(agent("Shauli", Arc::new(ScriptedClient::new(&["I decide."]))))
        .unwrap();
    chat.add_participant(agent("Avi", Arc::new(ScriptedClient::new(&["No you don't."]))))
        .unwrap();

    let result = chat
        .run("You are discussing today's topic: weather.", CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.messages.len(), 5);
    assert_eq!(result.messages[0].source, USER_SOURCE);
    assert_eq!(
        &*result.messages[0].content,
        "You are discussing today's topic: weather."
    );
    let speakers: Vec<&str> = result.messages[1..]
        .iter()
        .map(|m| m.source.as_str())
        .collect();
    assert_eq!(speakers, vec!["Shauli", "Avi", "Shauli", "Avi"]);
    assert_eq!(&*result.messages[2].content, "No you don't.");
    assert!(result.stop_reason.contains("Maximum number of messages 5"));
    assert_eq!(moderator.request_count(), 4);
}

#[tokio::test]
async fn test_moderator_may_pick_the_same_speaker_twice() {
    let moderator = Arc::new(ScriptedClient::new(&["Avi"]));
    let mut chat = SelectorGroupChat::new("chat", moderator)
        .with_termination(TerminationCondition::MaxMessages(3))
        .with_allow_repeated_speaker(true);
    chat.add_participant(agent("Shauli", Arc::new(ScriptedClient::new(&["a"]))))
        .unwrap();
    chat.add_participant(agent("Avi", Arc::new(ScriptedClient::new(&["b"]))))
        .unwrap();

    let result = chat.run("task", CancellationToken::new()).await.unwrap();
    assert_eq!(result.messages[1].source, "Avi");
    assert_eq!(result.messages[2].source, "Avi");
}

#[tokio::test]
async fn test_repeated_speaker_excluded_by_default() {
    let moderator = Arc::new(ScriptedClient::new(&["Shauli"]));
    let mut chat = SelectorGroupChat::new("chat", moderator.clone())
        .with_termination(TerminationCondition::MaxMessages(5));
    chat.add_participant(agent("Shauli", Arc::new(ScriptedClient::new(&["a"]))))
        .unwrap();
    chat.add_participant(agent("Avi", Arc::new(ScriptedClient::new(&["b"]))))
        .unwrap();

    let result = chat.run("task", CancellationToken::new()).await.unwrap();
    let speakers: Vec<&str> = result.messages[1..]
        .iter()
        .map(|m| m.source.as_str())
        .collect();
    assert_eq!(speakers, vec!["Shauli", "Avi", "Shauli", "Avi"]);
    // with two seats only the first turn has a real choice
    assert_eq!(moderator.request_count(), 1);
}

#[tokio::test]
async fn test_unrecognised_selection_falls_back_to_first_eligible() {
    let moderator = Arc::new(ScriptedClient::new(&["the bartender"]));
    let mut chat = SelectorGroupChat::new("chat", moderator)
        .with_termination(TerminationCondition::MaxMessages(2));
    chat.add_participant(agent("Shauli", Arc::new(ScriptedClient::new(&["a"]))))
        .unwrap();
    chat.add_participant(agent("Avi", Arc::new(ScriptedClient::new(&["b"]))))
        .unwrap();

    let result = chat.run("task", CancellationToken::new()).await.unwrap();
    assert_eq!(result.messages[1].source, "Shauli");
}

#[tokio::test]
async fn test_selection_request_carries_roles_and_history() {
    let moderator = Arc::new(ScriptedClient::new(&["Avi"]));
    let mut chat = SelectorGroupChat::new("chat", moderator.clone())
        .with_selector_prompt("Pick whoever is funniest.")
        .with_termination(TerminationCondition::MaxMessages(2));
    chat.add_participant(agent("Shauli", Arc::new(ScriptedClient::new(&["a"]))))
        .unwrap();
    chat.add_participant(agent("Avi", Arc::new(ScriptedClient::new(&["b"]))))
        .unwrap();

    chat.run("Discuss parking.", CancellationToken::new())
        .await
        .unwrap();

    let request = moderator.last_request();
    assert_eq!(request.len(), 2);
    assert_eq!(request[0].role, Role::System);
    assert_eq!(&*request[0].content, "Pick whoever is funniest.");
    assert!(request[1].content.contains("Shauli: Shauli the tester"));
    assert!(request[1].content.contains("user: Discuss parking."));
    assert!(request[1].content.contains("[Shauli, Avi]"));
}

#[tokio::test]
async fn test_speaker_sees_what_others_said() {
    let moderator = Arc::new(ScriptedClient::new(&["Shauli", "Avi"]));
    let avi_client = Arc::new(ScriptedClient::new(&["Objection."]));
    let mut chat = SelectorGroupChat::new("chat", moderator)
        .with_termination(TerminationCondition::MaxMessages(3))
        .with_allow_repeated_speaker(true);
    chat.add_participant(agent("Shauli", Arc::new(ScriptedClient::new(&["It will rain."]))))
        .unwrap();
    chat.add_participant(agent("Avi", avi_client.clone())).unwrap();

    chat.run("Discuss the weather.", CancellationToken::new())
        .await
        .unwrap();

    let request = avi_client.last_request();
    assert_eq!(request[0].role, Role::System);
    assert_eq!(&*request[0].content, "You are Avi.");
    let routed: Vec<&str> = request[1..].iter().map(|m| &*m.content).collect();
    assert_eq!(
        routed,
        vec!["user: Discuss the weather.", "Shauli: It will rain."]
    );
}

#[tokio::test]
async fn test_tokens_are_accumulated() {
    let moderator = Arc::new(ScriptedClient::new(&["Shauli"]).with_usage(10));
    let mut chat = SelectorGroupChat::new("chat", moderator)
        .with_termination(TerminationCondition::MaxMessages(2));
    chat.add_participant(agent(
        "Shauli",
        Arc::new(ScriptedClient::new(&["a"]).with_usage(25)),
    ))
    .unwrap();
    chat.add_participant(agent("Avi", Arc::new(ScriptedClient::new(&["b"]))))
        .unwrap();

    let result = chat.run("task", CancellationToken::new()).await.unwrap();
    assert_eq!(result.total_tokens_used, 35);
}

#[tokio::test]
async fn test_no_participants() {
    let mut chat = SelectorGroupChat::new("chat", Arc::new(ScriptedClient::new(&["x"])));
    let err = chat.run("task", CancellationToken::new()).await.unwrap_err();
    assert_eq!(err, GroupChatError::NoParticipants);
}

#[test]
fn test_duplicate_participant_rejected() {
    let mut chat = SelectorGroupChat::new("chat", Arc::new(ScriptedClient::new(&["x"])));
    chat.add_participant(agent("Avi", Arc::new(ScriptedClient::new(&["a"]))))
        .unwrap();
    let err = chat
        .add_participant(agent("Avi", Arc::new(ScriptedClient::new(&["b"]))))
        .unwrap_err();
    assert_eq!(err, GroupChatError::DuplicateParticipant("Avi".to_string()));
    assert_eq!(chat.participants().len(), 1);
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let mut chat = SelectorGroupChat::new("chat", Arc::new(ScriptedClient::new(&["Avi"])));
    chat.add_participant(agent("Avi", Arc::new(ScriptedClient::new(&["a"]))))
        .unwrap();

    let token = CancellationToken::new();
    token.cancel();
    let err = chat.run("task", token).await.unwrap_err();
    assert_eq!(err, GroupChatError::Cancelled);
}

#[tokio::test]
async fn test_cancel_interrupts_a_pending_call() {
    let mut chat = SelectorGroupChat::new("chat", Arc::new(ScriptedClient::new(&["Avi"])));
    chat.add_participant(agent("Avi", Arc::new(HangingClient)))
        .unwrap();

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let err = chat.run("task", token).await.unwrap_err();
    assert_eq!(err, GroupChatError::Cancelled);
}

#[tokio::test]
async fn test_participant_failure_ends_the_run() {
    let mut chat = SelectorGroupChat::new("chat", Arc::new(ScriptedClient::new(&["Avi"])));
    chat.add_participant(agent("Avi", Arc::new(FailingClient)))
        .unwrap();

    match chat.run("task", CancellationToken::new()).await {
        Err(GroupChatError::Provider(msg)) => assert!(msg.contains("503")),
        other => panic!("expected provider error, got {:?}", other.map(|r| r.messages.len())),
    }
}

#[tokio::test]
async fn test_moderator_failure_ends_the_run() {
    let mut chat = SelectorGroupChat::new("chat", Arc::new(FailingClient));
    chat.add_participant(agent("Shauli", Arc::new(ScriptedClient::new(&["a"]))))
        .unwrap();
    chat.add_participant(agent("Avi", Arc::new(ScriptedClient::new(&["b"]))))
        .unwrap();

    let err = chat.run("task", CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, GroupChatError::Provider(_)));
}
