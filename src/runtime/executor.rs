//! Session runtime executor

use super::traits::ChatApi;
use super::{SessionHandle, SessionSnapshot, SessionUpdate};
use crate::state_machine::{transition, Effect, Event, Operation, SessionContext, SessionState};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

const EVENT_CHANNEL_CAPACITY: usize = 32;
const BROADCAST_CAPACITY: usize = 128;

/// Generic session runtime that can work with any Chat API implementation
pub struct SessionRuntime<A>
where
    A: ChatApi + 'static,
{
    context: SessionContext,
    state: SessionState,
    api: Arc<A>,
    event_rx: mpsc::Receiver<Event>,
    /// Upgraded for spawned requests so completions come back as events.
    /// Weak, so the loop ends once every handle and in-flight request is gone.
    event_tx: mpsc::WeakSender<Event>,
    broadcast_tx: broadcast::Sender<SessionUpdate>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    shutdown: CancellationToken,
    commands_processed: u64,
}

impl<A> SessionRuntime<A>
where
    A: ChatApi + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        context: SessionContext,
        state: SessionState,
        api: Arc<A>,
        event_rx: mpsc::Receiver<Event>,
        event_tx: mpsc::WeakSender<Event>,
        broadcast_tx: broadcast::Sender<SessionUpdate>,
        snapshot_tx: watch::Sender<SessionSnapshot>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            context,
            state,
            api,
            event_rx,
            event_tx,
            broadcast_tx,
            snapshot_tx,
            shutdown,
            commands_processed: 0,
        }
    }

    /// Create the channels, spawn the runtime task and return a handle to it
    pub fn spawn(context: SessionContext, api: Arc<A>) -> SessionHandle {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        let state = SessionState::default();
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::from_state(&state, 0));
        let shutdown = CancellationToken::new();

        let runtime = Self::new(
            context,
            state,
            api,
            event_rx,
            event_tx.downgrade(),
            broadcast_tx.clone(),
            snapshot_tx,
            shutdown.clone(),
        );
        tokio::spawn(runtime.run());

        SessionHandle::new(event_tx, broadcast_tx, snapshot_rx, shutdown)
    }

    pub async fn run(mut self) {
        tracing::info!("Starting session runtime");

        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => break,
                event = self.event_rx.recv() => match event {
                    Some(event) => self.process_event(event),
                    None => break,
                },
            }
        }

        tracing::info!(
            active = ?self.state.active,
            commands = self.commands_processed,
            "Session runtime stopped"
        );
    }

    fn process_event(&mut self, event: Event) {
        let is_command = event.is_command();
        if let Some(generation) = event.generation() {
            if generation != self.state.generation {
                tracing::debug!(
                    generation,
                    current = self.state.generation,
                    "Discarding stale completion"
                );
            }
        }

        match transition(&self.state, &self.context, event) {
            Ok(result) => {
                self.state = result.new_state;
                for effect in result.effects {
                    self.execute_effect(effect);
                }
            }
            Err(e) => {
                // Rejections are user-facing (e.g. a second send while one is pending)
                tracing::warn!(error = %e, "Transition rejected");
                let _ = self.broadcast_tx.send(SessionUpdate::Error {
                    operation: Operation::Send,
                    message: e.to_string(),
                });
            }
        }

        if is_command {
            self.commands_processed += 1;
        }
        self.snapshot_tx.send_replace(SessionSnapshot::from_state(
            &self.state,
            self.commands_processed,
        ));
    }

    fn execute_effect(&self, effect: Effect) {
        match effect {
            Effect::ListConversations => {
                self.spawn_request(|api| async move {
                    let result = api.list_conversations().await;
                    if let Err(e) = &result {
                        tracing::error!(error = %e, "Failed to list conversations");
                    }
                    Event::DirectoryLoaded { result }
                });
            }

            Effect::CreateConversation { generation } => {
                self.spawn_request(move |api| async move {
                    let result = api.create_conversation().await;
                    match &result {
                        Ok(conv) => tracing::info!(conv_id = %conv.id, "Conversation created"),
                        Err(e) => tracing::error!(error = %e, "Failed to create conversation"),
                    }
                    Event::ConversationCreated { generation, result }
                });
            }

            Effect::FetchMessages {
                conversation_id,
                generation,
            } => {
                self.spawn_request(move |api| async move {
                    let result = api.get_messages(&conversation_id).await;
                    if let Err(e) = &result {
                        tracing::error!(conv_id = %conversation_id, error = %e, "Failed to load messages");
                    }
                    Event::MessagesLoaded {
                        generation,
                        conversation_id,
                        result,
                    }
                });
            }

            Effect::SendMessage {
                conversation_id,
                text,
                generation,
            } => {
                tracing::info!(conv_id = %conversation_id, generation, "Sending message");
                // Never cancelled: if the timeout wins, this keeps running and its
                // completion is dropped as stale.
                self.spawn_request(move |api| async move {
                    let result = api.send_message(&conversation_id, &text).await;
                    match &result {
                        Err(e) if e.kind.is_transient() => {
                            tracing::warn!(conv_id = %conversation_id, error = %e, "Send failed");
                        }
                        Err(e) => {
                            tracing::error!(conv_id = %conversation_id, error = %e, "Send rejected");
                        }
                        Ok(()) => {}
                    }
                    Event::SendSettled { generation, result }
                });
            }

            Effect::ScheduleSendTimeout { delay, generation } => {
                let Some(event_tx) = self.event_tx.upgrade() else {
                    return;
                };
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = event_tx.send(Event::SendTimedOut { generation }).await;
                });
            }

            Effect::RenameConversation {
                conversation_id,
                title,
            } => {
                self.spawn_request(move |api| async move {
                    let result = api.rename_conversation(&conversation_id, &title).await;
                    if let Err(e) = &result {
                        tracing::error!(conv_id = %conversation_id, error = %e, "Failed to rename conversation");
                    }
                    Event::ConversationRenamed {
                        conversation_id,
                        result,
                    }
                });
            }

            Effect::DeleteConversation { conversation_id } => {
                self.spawn_request(move |api| async move {
                    let result = api.delete_conversation(&conversation_id).await;
                    match &result {
                        Ok(()) => tracing::info!(conv_id = %conversation_id, "Conversation deleted"),
                        Err(e) => tracing::error!(conv_id = %conversation_id, error = %e, "Failed to delete conversation"),
                    }
                    Event::ConversationDeleted {
                        conversation_id,
                        result,
                    }
                });
            }

            Effect::NotifyError { operation, message } => {
                let _ = self
                    .broadcast_tx
                    .send(SessionUpdate::Error { operation, message });
            }

            Effect::NotifyDispatchSettled { outcome } => {
                tracing::info!(?outcome, "Dispatch settled");
                let _ = self
                    .broadcast_tx
                    .send(SessionUpdate::DispatchSettled { outcome });
            }
        }
    }

    /// Run a collaborator call as a background task and feed its completion
    /// back into the event loop
    fn spawn_request<F, Fut>(&self, request: F)
    where
        F: FnOnce(Arc<A>) -> Fut,
        Fut: Future<Output = Event> + Send + 'static,
    {
        let Some(event_tx) = self.event_tx.upgrade() else {
            return;
        };
        let future = request(Arc::clone(&self.api));
        tokio::spawn(async move {
            let event = future.await;
            if event_tx.send(event).await.is_err() {
                tracing::debug!("Runtime stopped before request completed");
            }
        });
    }
}
