use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::conversation::{Conversation, TurnRejected};
use crate::provider::{new_cancel_signal, CancelSignal, ChatBackend, TurnFailure};

/// How a started turn ended. Either way the transcript gained an assistant message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Replied { thread_id: String, run_id: String },
    Failed { error: String },
}

/// Drives one turn at a time against a backend.
///
/// The cancel signal of the in-flight turn is kept outside the conversation so
/// another task (a Ctrl-C handler) can trip it while `submit` is suspended.
pub struct TurnRunner {
    backend: Arc<dyn ChatBackend>,
    active: Mutex<Option<CancelSignal>>,
}

impl TurnRunner {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Arc<Self> {
        Arc::new(Self {
            backend,
            active: Mutex::new(None),
        })
    }

    pub fn backend(&self) -> &Arc<dyn ChatBackend> {
        &self.backend
    }

    pub fn is_active(&self) -> bool {
        lock_unpoisoned(&self.active).is_some()
    }

    /// Sends `text` and appends the reply, or an error reply, to `conversation`.
    ///
    /// Only a rejected turn (blank text, run already active) leaves the
    /// transcript untouched; backend failures become [`TurnOutcome::Failed`].
    pub async fn submit(
        &self,
        conversation: &mut Conversation,
        text: &str,
    ) -> Result<TurnOutcome, TurnRejected> {
        let (request, cancel) = {
            let mut active = lock_unpoisoned(&self.active);
            if active.is_some() {
                return Err(TurnRejected::RunAlreadyActive);
            }
            let request = conversation.begin_turn(text)?;
            let cancel = new_cancel_signal();
            *active = Some(Arc::clone(&cancel));
            (request, cancel)
        };

        tracing::debug!(
            thread_id = request.thread_id.as_deref().unwrap_or("<new>"),
            attachments = request.attachments.len(),
            "starting turn"
        );

        let thread_id = request.thread_id.clone();
        let backend = Arc::clone(&self.backend);
        let worker = tokio::spawn(async move { backend.send_turn(request, cancel).await });
        let result = match worker.await {
            Ok(result) => result,
            Err(error) if error.is_panic() => {
                Err(TurnFailure::new(thread_id, "Chat backend panicked"))
            }
            Err(_) => Err(TurnFailure::new(thread_id, "Chat backend task was aborted")),
        };

        lock_unpoisoned(&self.active).take();

        let outcome = match result {
            Ok(reply) => {
                let outcome = TurnOutcome::Replied {
                    thread_id: reply.thread_id.clone(),
                    run_id: reply.run_id.clone(),
                };
                conversation.complete_turn(reply);
                outcome
            }
            Err(failure) => {
                conversation.fail_turn(&failure);
                TurnOutcome::Failed {
                    error: failure.message,
                }
            }
        };

        Ok(outcome)
    }

    /// Trips the cancel signal of the in-flight turn. Returns false when idle.
    pub fn cancel_active(&self) -> bool {
        match lock_unpoisoned(&self.active).as_ref() {
            Some(cancel) => {
                cancel.store(true, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
