//! WidgetController - orchestrates the panel and the single outbound exchange
//!
//! Drives Submit -> gateway -> reveal -> store, owns the opening/focus timers
//! and enforces that at most one exchange is in flight per widget instance.
//!
//! Closing the panel does not cancel an exchange: the reply is still revealed
//! into the store while the panel is hidden. Only [`WidgetController::shutdown`]
//! (unmount) cancels the gateway request and the reveal.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use widget_core::{ConversationState, ConversationStore, Message, MessageDraft, StoreError};
use widget_gateway::{ChatGateway, GatewayError};
use widget_state::{ExchangePhase, PanelState, StateMachine, WidgetEvent, WidgetState};

use crate::config::ControllerOptions;
use crate::reveal::{RevealOutcome, StreamingEngine};
use crate::timer::ScheduledTask;

/// Single user-facing message for every gateway failure.
pub const APOLOGY_TEXT: &str = "Failed to get response. Please try again.";

const NOTICE_CHANNEL_CAPACITY: usize = 64;

/// Notifications for the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetNotice {
    StateChanged(WidgetState),
    /// The panel became ready; move focus to the input.
    FocusRequested,
}

/// Why a submit was refused. Refusals never touch the conversation.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejected {
    #[error("Input is empty")]
    EmptyInput,

    #[error("Panel is not ready")]
    PanelNotReady,

    #[error("Another message is still in flight")]
    Busy,

    #[error("Widget has been unmounted")]
    Unmounted,
}

/// How an accepted exchange ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeOutcome {
    Revealed(RevealOutcome),
    Failed(GatewayError),
    /// The reveal lost ownership of its placeholder.
    Aborted(StoreError),
}

struct Session {
    machine: StateMachine,
    input: String,
    opening: Option<ScheduledTask>,
    focus: Option<ScheduledTask>,
    unmounted: bool,
}

impl Session {
    fn cancel_timers(&mut self) {
        if let Some(task) = self.opening.take() {
            task.cancel();
        }
        if let Some(task) = self.focus.take() {
            task.cancel();
        }
    }
}

struct ControllerInner {
    store: ConversationStore,
    gateway: Arc<dyn ChatGateway>,
    engine: StreamingEngine,
    options: ControllerOptions,
    session: Mutex<Session>,
    notices: broadcast::Sender<WidgetNotice>,
    shutdown: CancellationToken,
}

/// Handle to one widget instance. Clones share the same instance.
#[derive(Clone)]
pub struct WidgetController {
    inner: Arc<ControllerInner>,
}

impl WidgetController {
    /// Create a controller with a conversation seeded by the greeting.
    pub fn new(gateway: Arc<dyn ChatGateway>, options: ControllerOptions) -> Self {
        let (notices, _) = broadcast::channel(NOTICE_CHANNEL_CAPACITY);
        let inner = ControllerInner {
            store: ConversationStore::with_greeting(options.greeting.clone()),
            gateway,
            engine: StreamingEngine::new(options.pacing),
            options,
            session: Mutex::new(Session {
                machine: StateMachine::new(),
                input: String::new(),
                opening: None,
                focus: None,
                unmounted: false,
            }),
            notices,
            shutdown: CancellationToken::new(),
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn store(&self) -> &ConversationStore {
        &self.inner.store
    }

    pub fn messages(&self) -> Vec<Message> {
        self.inner.store.snapshot()
    }

    pub fn state(&self) -> WidgetState {
        *self.inner.session.lock().machine.state()
    }

    /// Snapshot for rendering.
    pub fn view(&self) -> ConversationState {
        let state = self.state();
        ConversationState {
            messages: self.inner.store.snapshot(),
            pending_send: state.is_pending(),
            panel_open: state.is_open(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WidgetNotice> {
        self.inner.notices.subscribe()
    }

    pub fn input(&self) -> String {
        self.inner.session.lock().input.clone()
    }

    pub fn set_input(&self, text: impl Into<String>) {
        self.inner.session.lock().input = text.into();
    }

    /// Whether the send button should be enabled.
    pub fn can_submit(&self) -> bool {
        let session = self.inner.session.lock();
        !session.unmounted
            && !session.input.trim().is_empty()
            && session.machine.state().accepts_user_input()
    }

    pub fn is_unmounted(&self) -> bool {
        self.inner.session.lock().unmounted
    }

    /// Open the panel: show the loading placeholder, then become ready.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(&self) {
        let transition = {
            let mut session = self.inner.session.lock();
            if session.unmounted {
                return;
            }
            let transition = session.machine.handle_event(WidgetEvent::Open);
            if !transition.changed {
                return;
            }
            let weak = Arc::downgrade(&self.inner);
            session.opening = Some(ScheduledTask::after(
                self.inner.options.loading_delay,
                move || ControllerInner::finish_opening(&weak),
            ));
            transition
        };
        self.inner.notify(WidgetNotice::StateChanged(transition.to));
    }

    /// Close the panel. Pending opening and focus timers are cleared; an
    /// exchange in flight keeps running.
    pub fn close(&self) {
        let transition = {
            let mut session = self.inner.session.lock();
            session.cancel_timers();
            session.machine.handle_event(WidgetEvent::Close)
        };
        if transition.changed {
            self.inner.notify(WidgetNotice::StateChanged(transition.to));
        }
    }

    /// Launcher behaviour: open when closed, close otherwise.
    pub fn toggle(&self) {
        if self.state().panel == PanelState::Closed {
            self.open();
        } else {
            self.close();
        }
    }

    /// Submit the current input buffer.
    ///
    /// On acceptance the trimmed text is appended as a user message, the
    /// buffer is cleared and the exchange runs on a spawned task whose
    /// handle is returned.
    pub fn submit(&self) -> Result<JoinHandle<ExchangeOutcome>, SubmitRejected> {
        let (history, cancel, state) = {
            let mut session = self.inner.session.lock();
            if session.unmounted {
                return Err(SubmitRejected::Unmounted);
            }

            let state = *session.machine.state();
            let rejection = if state.exchange != ExchangePhase::Idle {
                Some(SubmitRejected::Busy)
            } else if state.panel != PanelState::Ready {
                Some(SubmitRejected::PanelNotReady)
            } else if session.input.trim().is_empty() {
                Some(SubmitRejected::EmptyInput)
            } else {
                None
            };
            if let Some(rejection) = rejection {
                log::debug!("Submit rejected in {:?}: {}", state, rejection);
                return Err(rejection);
            }

            let transition = session
                .machine
                .try_handle_event(WidgetEvent::Submit)
                .map_err(|_| SubmitRejected::Busy)?;

            let text = session.input.trim().to_string();
            self.inner.store.append(MessageDraft::user(text));
            session.input.clear();

            (
                self.inner.store.snapshot(),
                self.inner.shutdown.child_token(),
                transition.to,
            )
        };
        self.inner.notify(WidgetNotice::StateChanged(state));

        let inner = Arc::clone(&self.inner);
        Ok(tokio::spawn(async move {
            inner.run_exchange(history, cancel).await
        }))
    }

    /// Put `text` into the input buffer and submit it.
    pub fn send_message(
        &self,
        text: impl Into<String>,
    ) -> Result<JoinHandle<ExchangeOutcome>, SubmitRejected> {
        self.set_input(text);
        self.submit()
    }

    /// Unmount: close the panel, clear timers and cancel any exchange.
    /// The partially revealed reply is kept as-is.
    pub fn shutdown(&self) {
        let transition = {
            let mut session = self.inner.session.lock();
            if session.unmounted {
                return;
            }
            session.unmounted = true;
            session.cancel_timers();
            session.machine.handle_event(WidgetEvent::Unmount)
        };
        self.inner.shutdown.cancel();
        log::debug!("Widget controller shut down");
        if transition.changed {
            self.inner.notify(WidgetNotice::StateChanged(transition.to));
        }
    }
}

impl ControllerInner {
    fn notify(&self, notice: WidgetNotice) {
        let _ = self.notices.send(notice);
    }

    fn transition(&self, event: WidgetEvent) {
        let transition = self.session.lock().machine.handle_event(event);
        if transition.changed {
            self.notify(WidgetNotice::StateChanged(transition.to));
        }
    }

    fn finish_opening(weak: &Weak<Self>) {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        let transition = {
            let mut session = inner.session.lock();
            session.opening = None;
            let transition = session.machine.handle_event(WidgetEvent::LoadingElapsed);
            if transition.changed {
                let weak = Arc::downgrade(&inner);
                session.focus = Some(ScheduledTask::after(inner.options.focus_delay, move || {
                    if let Some(inner) = weak.upgrade() {
                        inner.notify(WidgetNotice::FocusRequested);
                    }
                }));
            }
            transition
        };
        if transition.changed {
            inner.notify(WidgetNotice::StateChanged(transition.to));
        }
    }

    async fn run_exchange(
        self: Arc<Self>,
        history: Vec<Message>,
        cancel: CancellationToken,
    ) -> ExchangeOutcome {
        match self.gateway.send(&history, Some(&cancel)).await {
            Ok(reply) => {
                self.transition(WidgetEvent::GatewaySucceeded);
                let result = self.engine.reveal(&self.store, &reply, &cancel).await;
                self.transition(WidgetEvent::RevealFinished);
                match result {
                    Ok(outcome) => ExchangeOutcome::Revealed(outcome),
                    Err(e) => {
                        log::error!("Reveal aborted: {}", e);
                        ExchangeOutcome::Aborted(e)
                    }
                }
            }
            Err(GatewayError::Cancelled) => {
                log::debug!("Chat exchange cancelled by unmount");
                self.transition(WidgetEvent::GatewayFailed);
                ExchangeOutcome::Failed(GatewayError::Cancelled)
            }
            Err(e) => {
                log::warn!("Chat exchange failed [{}]: {}", e.kind(), e);
                self.apologize();
                self.transition(WidgetEvent::GatewayFailed);
                ExchangeOutcome::Failed(e)
            }
        }
    }

    /// Append the apology, replacing a half-revealed draft if one is last.
    fn apologize(&self) {
        let draft = MessageDraft::assistant(APOLOGY_TEXT);
        if self.store.last().is_some_and(|m| m.is_streaming()) {
            if let Err(e) = self.store.replace_last(draft) {
                log::error!("Failed to replace draft with apology: {}", e);
            }
        } else {
            self.store.append(draft);
        }
    }
}
