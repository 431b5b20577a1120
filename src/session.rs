//! Canvas Sessions
//!
//! One session per connected client. A session owns its viewport, cursor,
//! render bookkeeping and the channel to its socket writer. Decoded input
//! is turned into [`SessionEvent`]s and each event kind has exactly one
//! handler; the handler reports what must be redrawn as an [`Effect`].

use std::collections::HashSet;
use std::time::Duration;

use bytes::Bytes;
use log::debug;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};

use crate::core::{Canvas, GRID_SIZE};
use crate::input::{Direction, InputEvent, KeyEvent, MouseEvent, MouseKind};
use crate::renderer::frame::MAX_ZOOM;
use crate::renderer::{disconnect_sequence, render_screen, render_viewport, Frame, RenderScheduler, Viewport};

/// Session identifier, assigned in registration order
pub type SessionId = u64;

/// Terminal size assumed until the client reports its own
pub const DEFAULT_WIDTH: usize = 80;
pub const DEFAULT_HEIGHT: usize = 24;

/// Largest terminal dimension accepted from a size report
pub const MAX_TERMINAL_SIZE: usize = GRID_SIZE;

/// Frames queued for a client's socket writer before new ones are dropped
pub const OUTPUT_QUEUE_CAPACITY: usize = 100;

/// Farewell sent when the user quits
pub const QUIT_MESSAGE: &str = "Goodbye!";

/// Messages for a session's socket writer
#[derive(Debug)]
pub enum Outbound {
    Data(Bytes),
    /// Flush and close the connection
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Terminating,
}

/// Events a session reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Wheel: button 0 zooms in, anything else zooms out
    Scroll { button: u8 },
    /// Pointer moved (viewport-relative)
    MouseMove { x: i32, y: i32 },
    /// Pointer moved with the left button held
    MouseDrag { x: i32, y: i32, erase: bool },
    /// Button pressed
    MouseClick { x: i32, y: i32, erase: bool },
    ArrowKey(Direction),
    KeyPress(char),
}

impl SessionEvent {
    /// Map a decoded input event to the session events it triggers
    pub fn from_input(input: InputEvent) -> Vec<SessionEvent> {
        match input {
            InputEvent::Mouse(mouse) => Self::from_mouse(mouse),
            InputEvent::Key(KeyEvent::Arrow { key }) => vec![SessionEvent::ArrowKey(key)],
            InputEvent::Key(KeyEvent::Character { key }) => vec![SessionEvent::KeyPress(key)],
        }
    }

    fn from_mouse(mouse: MouseEvent) -> Vec<SessionEvent> {
        let MouseEvent { x, y, .. } = mouse;
        let erase = mouse.modifiers.shift;
        match mouse.kind {
            MouseKind::Scroll => vec![SessionEvent::Scroll { button: mouse.button }],
            MouseKind::Move if mouse.button == 0 => vec![
                SessionEvent::MouseMove { x, y },
                SessionEvent::MouseDrag { x, y, erase },
            ],
            MouseKind::Move => vec![SessionEvent::MouseMove { x, y }],
            // Release reports do not draw
            MouseKind::Click if mouse.is_release() => Vec::new(),
            MouseKind::Click => vec![SessionEvent::MouseClick { x, y, erase }],
        }
    }
}

/// What a handled event requires next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    /// Redraw this session only
    Render,
    /// Redraw every session
    Broadcast,
    /// End this session
    Quit,
}

/// A connected client
pub struct Session {
    pub id: SessionId,
    /// Peer address
    pub address: String,
    pub view: Viewport,
    /// Grid position of this session's pointer, once it has moved
    pub cursor: Option<(usize, usize)>,
    pub scheduler: RenderScheduler,
    state: SessionState,
    last_frame: Option<Frame>,
    output: mpsc::Sender<Outbound>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl Session {
    pub fn new(
        id: SessionId,
        address: String,
        output: mpsc::Sender<Outbound>,
        shutdown: oneshot::Sender<()>,
        frame_interval: Duration,
    ) -> Self {
        Self {
            id,
            address,
            view: Viewport::new(DEFAULT_WIDTH, DEFAULT_HEIGHT),
            cursor: None,
            scheduler: RenderScheduler::new(frame_interval),
            state: SessionState::Active,
            last_frame: None,
            output,
            shutdown: Some(shutdown),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// The frame the client is currently showing
    pub fn last_frame(&self) -> Option<&Frame> {
        self.last_frame.as_ref()
    }

    /// Apply a terminal size report, capped at [`MAX_TERMINAL_SIZE`] each way
    pub fn resize(&mut self, width: usize, height: usize) {
        let width = width.min(MAX_TERMINAL_SIZE);
        let height = height.min(MAX_TERMINAL_SIZE);
        debug!("Session {} resized to {}x{}", self.id, width, height);
        self.view.width = width;
        self.view.height = height;
    }

    /// Run the handler for one event
    pub fn handle(&mut self, event: SessionEvent, canvas: &mut Canvas) -> Effect {
        if !self.is_active() {
            return Effect::None;
        }
        match event {
            SessionEvent::Scroll { button } => self.on_scroll(button),
            SessionEvent::MouseMove { x, y } => self.on_mouse_move(x, y, canvas),
            SessionEvent::MouseDrag { x, y, erase } | SessionEvent::MouseClick { x, y, erase } => {
                self.on_draw(x, y, erase, canvas)
            }
            SessionEvent::ArrowKey(direction) => self.on_arrow(direction, canvas),
            SessionEvent::KeyPress(key) => self.on_key_press(key, canvas),
        }
    }

    fn on_scroll(&mut self, button: u8) -> Effect {
        self.view.zoom = if button == 0 {
            self.view.zoom.saturating_sub(1)
        } else {
            (self.view.zoom + 1).min(MAX_ZOOM)
        };
        Effect::Render
    }

    fn on_mouse_move(&mut self, x: i32, y: i32, canvas: &Canvas) -> Effect {
        self.cursor = Some(self.view.to_grid(x, y, canvas.size()));
        Effect::Broadcast
    }

    fn on_draw(&mut self, x: i32, y: i32, erase: bool, canvas: &mut Canvas) -> Effect {
        let (gx, gy) = self.view.to_grid(x, y, canvas.size());
        canvas.adjust(gy, gx, if erase { -1 } else { 1 });
        Effect::Broadcast
    }

    fn on_arrow(&mut self, direction: Direction, canvas: &Canvas) -> Effect {
        // Columns move twice as fast to match the character aspect ratio
        let (dx, dy) = match direction {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-2, 0),
            Direction::Right => (2, 0),
        };
        self.pan(dx, dy, canvas.size());
        Effect::Broadcast
    }

    fn on_key_press(&mut self, key: char, canvas: &Canvas) -> Effect {
        match key {
            'q' | '\x03' => Effect::Quit,
            'w' => self.on_arrow(Direction::Up, canvas),
            's' => self.on_arrow(Direction::Down, canvas),
            'a' => self.on_arrow(Direction::Left, canvas),
            'd' => self.on_arrow(Direction::Right, canvas),
            _ => Effect::None,
        }
    }

    /// Move the viewport origin, keeping it on the grid
    fn pan(&mut self, dx: isize, dy: isize, grid_size: usize) {
        let last = grid_size.saturating_sub(1);
        self.view.x = self.view.x.saturating_add_signed(dx).min(last);
        self.view.y = self.view.y.saturating_add_signed(dy).min(last);
    }

    /// Render the viewport and send the difference from the previous frame
    pub fn render(&mut self, canvas: &Canvas, cursors: &HashSet<(usize, usize)>) {
        if !self.is_active() {
            return;
        }
        let frame = render_viewport(canvas, &self.view, cursors);
        let output = render_screen(self.last_frame.as_ref(), &frame);
        if self.send(output.freeze()) {
            self.last_frame = Some(frame);
        }
    }

    /// Queue bytes for the client. Returns false if they were not queued.
    ///
    /// When the client is not draining its queue the bytes are dropped and
    /// the next render is a full redraw. A closed writer is ignored; the
    /// read side notices the disconnect.
    pub fn send(&mut self, data: Bytes) -> bool {
        match self.output.try_send(Outbound::Data(data)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!("Session {} output queue full, dropping frame", self.id);
                self.last_frame = None;
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Move to Terminating, stop timers, send the farewell and close the
    /// connection. Only the first call has any effect.
    pub fn terminate(&mut self, message: Option<&str>) -> bool {
        if self.state == SessionState::Terminating {
            return false;
        }
        self.state = SessionState::Terminating;
        self.scheduler.cancel();

        if let Some(message) = message {
            self.send(Bytes::from(disconnect_sequence(message)));
        }
        let _ = self.output.try_send(Outbound::Close);
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        true
    }
}
