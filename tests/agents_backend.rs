mod support;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use agent_chat::conversation::Conversation;
use agent_chat::provider::ChatBackend;
use agent_chat::providers::AgentsBackend;
use agent_chat::runner::{TurnOutcome, TurnRunner};
use agents_api::{
    AgentsApiClient, AgentsApiConfig, Credentials, PollPolicy, RetryPolicy, RunOrchestrator,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use support::{messages_json, run_json, ScriptedServer};

fn backend(server: &ScriptedServer) -> AgentsBackend {
    let config = AgentsApiConfig::new(Credentials::new(&server.base_url, "test-key", "asst_e2e"))
        .with_retry_policy(RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1),
        });
    let client = AgentsApiClient::new(config).expect("client");
    let orchestrator = RunOrchestrator::new(Arc::new(client)).with_poll_policy(PollPolicy {
        interval: Duration::from_millis(5),
        max_wait: Duration::from_secs(5),
        max_consecutive_failures: 3,
    });
    AgentsBackend::new(orchestrator)
}

#[tokio::test]
async fn hello_round_trip_through_hosted_backend() {
    let server = ScriptedServer::new(vec![
        (200, run_json("queued")),
        (200, run_json("in_progress")),
        (200, run_json("completed")),
        (200, messages_json("Hi there")),
    ])
    .await;
    let runner = TurnRunner::new(Arc::new(backend(&server)));
    let mut conversation = Conversation::new("Helper");

    let outcome = runner.submit(&mut conversation, "Hello").await.expect("turn");

    assert_eq!(
        outcome,
        TurnOutcome::Replied {
            thread_id: "thread_1".to_string(),
            run_id: "run_1".to_string(),
        }
    );
    assert_eq!(
        conversation.messages().last().expect("reply").content,
        "Hi there"
    );
    assert_eq!(
        server.request_lines(),
        vec![
            "POST /threads/runs",
            "GET /threads/thread_1/runs/run_1",
            "GET /threads/thread_1/runs/run_1",
            "GET /threads/thread_1/messages",
        ]
    );
}

#[tokio::test]
async fn failed_run_becomes_error_reply() {
    let mut failed = run_json("failed");
    failed["last_error"] = json!({"code": "rate_limit_exceeded", "message": "rate limited"});
    let server = ScriptedServer::new(vec![(200, run_json("queued")), (200, failed)]).await;
    let runner = TurnRunner::new(Arc::new(backend(&server)));
    let mut conversation = Conversation::new("Helper");

    runner.submit(&mut conversation, "Hello").await.expect("turn");

    assert_eq!(
        conversation.messages().last().expect("error reply").content,
        "Sorry, an error occurred: Run failed: rate limited"
    );
    assert_eq!(conversation.thread_id(), Some("thread_1"));
}

#[tokio::test]
async fn turn_after_failed_first_turn_continues_its_thread() {
    let mut failed = run_json("failed");
    failed["last_error"] = json!({"code": "rate_limit_exceeded", "message": "rate limited"});
    let server = ScriptedServer::new(vec![
        (200, run_json("queued")),
        (200, failed),
        (200, json!({"id": "msg_2", "role": "user", "created_at": 1_700_000_002, "content": []})),
        (200, run_json("queued")),
        (200, run_json("completed")),
        (200, messages_json("Back again")),
    ])
    .await;
    let runner = TurnRunner::new(Arc::new(backend(&server)));
    let mut conversation = Conversation::new("Helper");

    let first = runner.submit(&mut conversation, "Hello").await.expect("first");
    assert!(matches!(first, TurnOutcome::Failed { .. }));
    let second = runner.submit(&mut conversation, "Retry").await.expect("second");

    assert_eq!(
        second,
        TurnOutcome::Replied {
            thread_id: "thread_1".to_string(),
            run_id: "run_1".to_string(),
        }
    );
    assert_eq!(
        server.request_lines(),
        vec![
            "POST /threads/runs",
            "GET /threads/thread_1/runs/run_1",
            "POST /threads/thread_1/messages",
            "POST /threads/thread_1/runs",
            "GET /threads/thread_1/runs/run_1",
            "GET /threads/thread_1/messages",
        ]
    );
}

#[tokio::test]
async fn agent_profile_reads_the_configured_agent() {
    let server = ScriptedServer::new(vec![(
        200,
        json!({"id": "asst_e2e", "object": "assistant", "name": "Support Bot", "model": "gpt-4o"}),
    )])
    .await;

    let agent = backend(&server)
        .agent_profile(agent_chat::provider::new_cancel_signal())
        .await
        .expect("agent");

    assert_eq!(agent.name, "Support Bot");
    assert_eq!(server.request_lines(), vec!["GET /assistants/asst_e2e"]);
}

#[test]
fn missing_credentials_fail_backend_setup() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(br#"{"endpoint":"https://host.test"}"#)
        .expect("write");

    let options = agent_chat::providers::BackendOptions {
        config_path: Some(file.path().to_path_buf()),
        agent_id: None,
        auth_mode: None,
    };
    let error = match agent_chat::providers::backend_for_id("agents", &options) {
        Ok(_) => panic!("incomplete credentials should fail"),
        Err(error) => error,
    };
    assert!(error.to_string().contains("incomplete agent configuration"));
}
