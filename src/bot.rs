// src/bot.rs
//! Telegram update loop and per-participant event queues.

use crate::channel::{ChannelError, InboundEvent, Participant, ParticipantId};
use crate::interview::{InterviewMachine, Script};
use crate::telegram_client::{TelegramClient, Update};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

const POLL_TIMEOUT_SECS: u64 = 30;
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Map a message text to an interview event. Unknown slash commands yield `None`.
pub fn classify(text: &str, script: &Script) -> Option<InboundEvent> {
    let trimmed = text.trim();

    if trimmed == script.begin_label {
        return Some(InboundEvent::Begin);
    }
    if trimmed == script.cancel_label {
        return Some(InboundEvent::Cancel);
    }

    if let Some(command) = trimmed.strip_prefix('/') {
        // "/start@SomeBot arg" -> "start"
        let name = command
            .split_whitespace()
            .next()
            .unwrap_or("")
            .split('@')
            .next()
            .unwrap_or("");
        return match name {
            "start" => Some(InboundEvent::Greet),
            "begin" => Some(InboundEvent::Begin),
            "cancel" => Some(InboundEvent::Cancel),
            "end" => Some(InboundEvent::End),
            _ => None,
        };
    }

    Some(InboundEvent::Text(text.to_string()))
}

/// Extract sender and event from a Telegram update. Updates without a text
/// message or a sender are skipped.
pub fn to_inbound(update: &Update, script: &Script) -> Option<(Participant, InboundEvent)> {
    let message = update.message.as_ref()?;
    let from = message.from.as_ref()?;
    let text = message.text.as_deref()?;

    let event = classify(text, script)?;
    let participant = Participant {
        id: from.id,
        chat_id: message.chat.id,
        username: from.username.clone(),
    };
    Some((participant, event))
}

type Envelope = (Participant, InboundEvent);
type WorkerMap = Arc<Mutex<HashMap<ParticipantId, Worker>>>;

struct Worker {
    tx: mpsc::UnboundedSender<Envelope>,
    handle: JoinHandle<()>,
}

/// Routes events to one queue per participant. Each queue is drained by its own
/// task, so a participant's events are handled strictly in arrival order while
/// different participants proceed concurrently. A worker retires once its queue
/// is empty and the participant has no running interview.
pub struct Dispatcher {
    machine: Arc<InterviewMachine>,
    workers: WorkerMap,
}

impl Dispatcher {
    pub fn new(machine: Arc<InterviewMachine>) -> Self {
        Self {
            machine,
            workers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn spawn_worker(&self, participant_id: ParticipantId) -> Worker {
        let (tx, rx) = mpsc::unbounded_channel::<Envelope>();
        let handle = tokio::spawn(run_worker(
            participant_id,
            rx,
            self.machine.clone(),
            self.workers.clone(),
        ));
        Worker { tx, handle }
    }

    pub async fn worker_count(&self) -> usize {
        self.workers.lock().await.len()
    }

    pub async fn dispatch(&self, participant: Participant, event: InboundEvent) {
        let mut workers = self.workers.lock().await;
        let id = participant.id;

        let worker = workers
            .entry(id)
            .or_insert_with(|| self.spawn_worker(id));

        if let Err(mpsc::error::SendError(envelope)) = worker.tx.send((participant, event)) {
            tracing::warn!(participant_id = id, "Participant queue was closed, restarting it");
            let replacement = self.spawn_worker(id);
            if replacement.tx.send(envelope).is_err() {
                tracing::error!(participant_id = id, "Failed to queue event");
            }
            workers.insert(id, replacement);
        }
    }

    /// Close every queue and wait for pending events to be handled.
    pub async fn shutdown(&self) {
        let workers: Vec<Worker> = self.workers.lock().await.drain().map(|(_, w)| w).collect();
        tracing::info!("Draining {} participant queues", workers.len());

        for Worker { tx, handle } in workers {
            drop(tx);
            if let Err(e) = handle.await {
                tracing::error!("Participant worker failed: {}", e);
            }
        }
    }
}

async fn run_worker(
    participant_id: ParticipantId,
    mut rx: mpsc::UnboundedReceiver<Envelope>,
    machine: Arc<InterviewMachine>,
    workers: WorkerMap,
) {
    let mut pending = rx.recv().await;

    while let Some((participant, event)) = pending.take() {
        if let Err(e) = machine.handle(&participant, event).await {
            tracing::error!(participant_id, "Failed to handle event: {}", e);
        }

        if machine.sessions().is_active(participant_id).await {
            pending = rx.recv().await;
            continue;
        }

        // Holding the map lock keeps `dispatch` from queueing behind our back
        let mut map = workers.lock().await;
        match rx.try_recv() {
            Ok(next) => pending = Some(next),
            Err(_) => {
                map.remove(&participant_id);
                tracing::debug!(participant_id, "Participant worker retired");
                return;
            }
        }
    }
    tracing::debug!(participant_id, "Participant queue closed");
}

/// Fetch one batch of updates, dispatch them and return the next offset.
pub async fn poll_once(
    client: &TelegramClient,
    dispatcher: &Dispatcher,
    script: &Script,
    offset: Option<i64>,
    timeout_secs: u64,
) -> Result<Option<i64>, ChannelError> {
    let updates = client.get_updates(offset, timeout_secs).await?;
    let mut next = offset;

    for update in updates {
        next = Some(update.update_id + 1);
        match to_inbound(&update, script) {
            Some((participant, event)) => dispatcher.dispatch(participant, event).await,
            None => tracing::debug!(update_id = update.update_id, "Skipping update"),
        }
    }

    Ok(next)
}

pub async fn run_polling(client: &TelegramClient, dispatcher: &Dispatcher, script: &Script) {
    tracing::info!("Polling Telegram for updates");
    let mut offset = None;

    loop {
        match poll_once(client, dispatcher, script, offset, POLL_TIMEOUT_SECS).await {
            Ok(next) => offset = next,
            Err(e) => {
                tracing::error!("Failed to fetch updates: {}", e);
                tokio::time::sleep(POLL_RETRY_DELAY).await;
            }
        }
    }
}
