//! Canvas Hub
//!
//! The canvas and every session live together behind one lock. Input
//! handling, canvas edits and render scheduling all run while holding it,
//! so each unit of work sees and leaves a consistent canvas.
//!
//! Deferred renders run on a timer task that only reports back through a
//! channel; the server feeds those reports to [`Hub::fire_render`].

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::time::Instant;

use crate::core::Canvas;
use crate::input::InputEvent;
use crate::registry::SessionRegistry;
use crate::renderer::RenderDecision;
use crate::session::{Effect, Outbound, Session, SessionEvent, SessionId, QUIT_MESSAGE};
use crate::telnet::{option, parse_naws, TelnetCommand};

/// The hub as shared between connection tasks
pub type SharedHub = Arc<Mutex<Hub>>;

/// A deferred render whose timer has run out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderDue {
    pub session: SessionId,
    pub token: u64,
}

pub struct Hub {
    canvas: Canvas,
    sessions: SessionRegistry,
    frame_interval: Duration,
    render_tx: mpsc::UnboundedSender<RenderDue>,
}

impl Hub {
    pub fn new(
        canvas: Canvas,
        max_sessions: usize,
        frame_interval: Duration,
        render_tx: mpsc::UnboundedSender<RenderDue>,
    ) -> Self {
        Self {
            canvas,
            sessions: SessionRegistry::new(max_sessions),
            frame_interval,
            render_tx,
        }
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn session(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn is_full(&self) -> bool {
        self.sessions.is_full()
    }

    /// Register a new connection. Returns `None` when at capacity.
    pub fn register(
        &mut self,
        address: String,
        output: mpsc::Sender<Outbound>,
        shutdown: oneshot::Sender<()>,
    ) -> Option<SessionId> {
        let id = self.sessions.next_id();
        let session = Session::new(id, address, output, shutdown, self.frame_interval);
        match self.sessions.insert(session) {
            Ok(id) => {
                info!("Session {} registered ({} active)", id, self.sessions.len());
                Some(id)
            }
            Err(_) => None,
        }
    }

    /// Apply negotiation traffic from a session
    pub fn handle_negotiation(&mut self, id: SessionId, commands: &[TelnetCommand]) {
        for command in commands {
            debug!("Telnet from session {}: {:?}", id, command);
            if let TelnetCommand::Subnegotiation { option: option::NAWS, data } = command {
                let Some((width, height)) = parse_naws(data) else {
                    continue;
                };
                if let Some(session) = self.sessions.get_mut(id) {
                    session.resize(width as usize, height as usize);
                    self.schedule_render(id);
                }
            }
        }
    }

    /// Apply decoded input from a session, in order
    pub fn handle_input(&mut self, id: SessionId, events: &[InputEvent]) {
        for &input in events {
            debug!("Input from session {}: {}", id, input.to_json());
            for event in SessionEvent::from_input(input) {
                if !self.dispatch(id, event) {
                    return;
                }
            }
        }
    }

    /// Run one event through its handler and act on the result.
    /// Returns false once the session is gone.
    pub fn dispatch(&mut self, id: SessionId, event: SessionEvent) -> bool {
        let Some(session) = self.sessions.get_mut(id) else {
            return false;
        };
        match session.handle(event, &mut self.canvas) {
            Effect::None => {}
            Effect::Render => self.schedule_render(id),
            Effect::Broadcast => self.broadcast(),
            Effect::Quit => {
                self.disconnect(id, Some(QUIT_MESSAGE));
                return false;
            }
        }
        true
    }

    /// Render a session now, or arrange for it to be rendered within one frame interval
    pub fn schedule_render(&mut self, id: SessionId) {
        let Some(session) = self.sessions.get_mut(id) else {
            return;
        };
        if !session.is_active() {
            return;
        }

        match session.scheduler.request(Instant::now()) {
            RenderDecision::Immediate => self.render_now(id),
            RenderDecision::Defer { token, delay } => {
                let render_tx = self.render_tx.clone();
                let timer = tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = render_tx.send(RenderDue { session: id, token });
                });
                session.scheduler.arm(token, timer.abort_handle());
            }
            RenderDecision::Pending => {}
        }
    }

    /// Schedule a render for every live session, oldest first
    pub fn broadcast(&mut self) {
        for id in self.sessions.ids() {
            self.schedule_render(id);
        }
    }

    /// Complete a deferred render if it is still wanted
    pub fn fire_render(&mut self, due: RenderDue) {
        let fired = self
            .sessions
            .get_mut(due.session)
            .map(|session| session.scheduler.fire(due.token))
            .unwrap_or(false);
        if fired {
            self.render_now(due.session);
        }
    }

    fn render_now(&mut self, id: SessionId) {
        let cursors: HashSet<(usize, usize)> = self.sessions.iter().filter_map(|s| s.cursor).collect();
        if let Some(session) = self.sessions.get_mut(id) {
            session.render(&self.canvas, &cursors);
            session.scheduler.rendered(Instant::now());
        }
    }

    /// Remove a session and tear it down. Safe to call more than once.
    pub fn disconnect(&mut self, id: SessionId, message: Option<&str>) {
        let Some(mut session) = self.sessions.remove(id) else {
            return;
        };
        session.terminate(message);
        info!(
            "Session {} ({}) disconnected ({} active)",
            id,
            session.address,
            self.sessions.len()
        );

        // Everyone else stops drawing its cursor
        if session.cursor.is_some() {
            self.broadcast();
        }
    }
}
