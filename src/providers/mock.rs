use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use agents_api::AgentSummary;
use async_trait::async_trait;

use crate::provider::{
    BackendProfile, CancelSignal, ChatBackend, TurnFailure, TurnReply, TurnRequest,
};

use super::MOCK_BACKEND_ID;

pub const MOCK_AGENT_ID: &str = "asst_mock";
pub const MOCK_AGENT_NAME: &str = "Mock Agent";
pub const MOCK_THREAD_ID: &str = "thread_mock";

const CANCEL_CHECK_INTERVAL: Duration = Duration::from_millis(10);

/// One scripted turn outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockStep {
    Reply(String),
    Fail(String),
}

/// Deterministic offline backend.
///
/// Scripted steps are consumed in order; once they run out every turn echoes
/// the user's text.
#[derive(Debug)]
pub struct MockBackend {
    agent: AgentSummary,
    steps: Mutex<VecDeque<MockStep>>,
    requests: Mutex<Vec<TurnRequest>>,
    delay: Duration,
    next_run: AtomicU64,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl MockBackend {
    pub fn new(steps: Vec<MockStep>) -> Self {
        Self {
            agent: AgentSummary {
                id: MOCK_AGENT_ID.to_string(),
                name: MOCK_AGENT_NAME.to_string(),
                description: Some("Offline backend that echoes or replays scripted replies".to_string()),
                model: Some("mock".to_string()),
                created_at: None,
            },
            steps: Mutex::new(steps.into()),
            requests: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
            next_run: AtomicU64::new(1),
        }
    }

    /// Simulated run latency; cancellation is observed while it elapses.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_agent_name(mut self, name: impl Into<String>) -> Self {
        self.agent.name = name.into();
        self
    }

    /// Turn requests seen so far, oldest first.
    pub fn requests(&self) -> Vec<TurnRequest> {
        lock_unpoisoned(&self.requests).clone()
    }

    async fn simulate_latency(&self, cancel: &CancelSignal) -> Result<(), String> {
        let mut remaining = self.delay;
        while !remaining.is_zero() {
            if cancel.load(Ordering::SeqCst) {
                return Err("request was cancelled".to_string());
            }
            let step = remaining.min(CANCEL_CHECK_INTERVAL);
            tokio::time::sleep(step).await;
            remaining -= step;
        }

        if cancel.load(Ordering::SeqCst) {
            return Err("request was cancelled".to_string());
        }
        Ok(())
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    fn profile(&self) -> BackendProfile {
        BackendProfile {
            backend_id: MOCK_BACKEND_ID.to_string(),
            agent_id: self.agent.id.clone(),
        }
    }

    async fn agent_profile(&self, _cancel: CancelSignal) -> Result<AgentSummary, String> {
        Ok(self.agent.clone())
    }

    async fn list_agents(&self, _cancel: CancelSignal) -> Result<Vec<AgentSummary>, String> {
        Ok(vec![self.agent.clone()])
    }

    async fn send_turn(
        &self,
        request: TurnRequest,
        cancel: CancelSignal,
    ) -> Result<TurnReply, TurnFailure> {
        lock_unpoisoned(&self.requests).push(request.clone());
        self.simulate_latency(&cancel)
            .await
            .map_err(|error| TurnFailure::new(request.thread_id.clone(), error))?;

        // A scripted failure stands for a run that failed after its thread existed.
        let thread_id = request
            .thread_id
            .unwrap_or_else(|| MOCK_THREAD_ID.to_string());
        let run_number = self.next_run.fetch_add(1, Ordering::SeqCst);
        let step = lock_unpoisoned(&self.steps).pop_front();
        let content = match step {
            Some(MockStep::Reply(text)) => text,
            Some(MockStep::Fail(error)) => return Err(TurnFailure::new(Some(thread_id), error)),
            None => format!("You said: {}", request.text),
        };

        Ok(TurnReply {
            thread_id,
            run_id: format!("run_mock_{run_number}"),
            message_id: Some(format!("msg_mock_{run_number}")),
            content,
            created_at: None,
            usage: None,
        })
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
