use std::sync::Arc;

use parley_protocol::ProtocolEvent;
use tokio::sync::{mpsc, oneshot, watch};

use crate::domain::action::Action;
use crate::domain::classify::classify;
use crate::domain::effect::Effect;
use crate::domain::reduce::apply;
use crate::domain::state::SessionState;
use crate::session::command::Command;

const COMMAND_CAPACITY: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session shutting down")]
    ShuttingDown,

    #[error("Channel closed")]
    ChannelClosed,
}

/// Input serialized into the single action stream.
#[derive(Debug)]
pub enum SessionInput {
    Event(ProtocolEvent),
    Command(Command),
}

enum SessionCmd {
    Input(Box<SessionInput>),
    GetState {
        reply: oneshot::Sender<Arc<SessionState>>,
    },
    Shutdown,
}

/// Cheap handle to a running session actor.
#[derive(Clone)]
pub struct SessionHandle {
    cmd_tx: mpsc::Sender<SessionCmd>,
    state_rx: watch::Receiver<Arc<SessionState>>,
}

impl SessionHandle {
    pub async fn deliver_event(&self, event: ProtocolEvent) -> Result<(), SessionError> {
        self.send(SessionCmd::Input(Box::new(SessionInput::Event(event))))
            .await
    }

    /// Parse one raw transport frame and deliver it.
    pub async fn deliver_json(&self, text: &str) -> Result<(), SessionError> {
        self.deliver_event(ProtocolEvent::from_json(text)).await
    }

    pub async fn command(&self, command: Command) -> Result<(), SessionError> {
        self.send(SessionCmd::Input(Box::new(SessionInput::Command(command))))
            .await
    }

    /// State after every input sent before this call has been applied.
    pub async fn state(&self) -> Result<Arc<SessionState>, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(SessionCmd::GetState { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| SessionError::ChannelClosed)
    }

    /// Latest published state; changes on every applied action.
    pub fn subscribe(&self) -> watch::Receiver<Arc<SessionState>> {
        self.state_rx.clone()
    }

    pub fn shutdown(&self) {
        let _ = self.cmd_tx.try_send(SessionCmd::Shutdown);
    }

    async fn send(&self, cmd: SessionCmd) -> Result<(), SessionError> {
        if self.cmd_tx.is_closed() {
            return Err(SessionError::ShuttingDown);
        }
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| SessionError::ChannelClosed)
    }
}

struct SessionActor {
    state: Arc<SessionState>,
    state_tx: watch::Sender<Arc<SessionState>>,
    effect_tx: mpsc::UnboundedSender<Effect>,
    effects_dropped: bool,
}

impl SessionActor {
    async fn run(mut self, mut cmd_rx: mpsc::Receiver<SessionCmd>) {
        while let Some(cmd) = cmd_rx.recv().await {
            match cmd {
                SessionCmd::Input(input) => self.handle_input(*input),
                SessionCmd::GetState { reply } => {
                    let _ = reply.send(self.state.clone());
                }
                SessionCmd::Shutdown => break,
            }
        }
        tracing::debug!(target: "parley.session", "Session actor stopped");
    }

    fn handle_input(&mut self, input: SessionInput) {
        let action = match input {
            SessionInput::Event(event) => match classify(event) {
                Some(action) => action,
                None => return,
            },
            SessionInput::Command(command) => command.into_action(),
        };
        self.handle_action(action);
    }

    fn handle_action(&mut self, action: Action) {
        let (next, effects) = apply(&self.state, action);
        self.state = Arc::new(next);
        self.state_tx.send_replace(self.state.clone());

        for effect in effects {
            if self.effect_tx.send(effect).is_err() && !self.effects_dropped {
                tracing::warn!(
                    target: "parley.session",
                    "Effect receiver dropped; outbound messages are discarded"
                );
                self.effects_dropped = true;
            }
        }
    }
}

/// Start a session actor owning `initial`. The receiver yields every effect
/// in the order the reducer produced it; the actor never waits on it.
pub fn spawn_session(initial: SessionState) -> (SessionHandle, mpsc::UnboundedReceiver<Effect>) {
    let state = Arc::new(initial);
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CAPACITY);
    let (effect_tx, effect_rx) = mpsc::unbounded_channel();
    let (state_tx, state_rx) = watch::channel(state.clone());

    let actor = SessionActor {
        state,
        state_tx,
        effect_tx,
        effects_dropped: false,
    };
    tokio::spawn(actor.run(cmd_rx));

    (SessionHandle { cmd_tx, state_rx }, effect_rx)
}
