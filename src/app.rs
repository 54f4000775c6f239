//! Terminal runtime: owns the screen, the event loop and the tasks that talk
//! to the model.

use crate::config::Config;
use crate::events::{AppEvent, Effect, TuiEvent};
use crate::llm::{ModelBackend, SessionParams};
use crate::ui::ChatView;
use anyhow::{Context, Result};
use crossterm::{
    event::{DisableBracketedPaste, EnableBracketedPaste, Event, EventStream, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::{self, Stdout};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{Duration, interval};
use tracing::{debug, error, info};

/// Carry out one effect against the backend.
///
/// Returns the event to feed back into the view; `Quit` has none.
pub async fn run_effect(
    backend: &dyn ModelBackend,
    params: &SessionParams,
    effect: Effect,
) -> Option<AppEvent> {
    match effect {
        Effect::CreateSession { generation, history } => {
            let result = backend.create_session(&history, params).await;
            Some(AppEvent::SessionCreated { generation, result })
        }
        Effect::Send {
            generation,
            mut session,
            text,
        } => {
            let result = backend
                .send(&mut session, &text)
                .await
                .map(|reply| (session, reply));
            Some(AppEvent::ReplyReceived { generation, result })
        }
        Effect::Quit => None,
    }
}

/// Spawns a task per effect and routes the results back to the event loop
pub struct Dispatcher {
    backend: Arc<dyn ModelBackend>,
    params: SessionParams,
    tx: mpsc::UnboundedSender<AppEvent>,
}

impl Dispatcher {
    pub fn new(
        backend: Arc<dyn ModelBackend>,
        params: SessionParams,
        tx: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            backend,
            params,
            tx,
        }
    }

    /// Start every effect. Returns true when one of them asks to quit.
    pub fn dispatch(&self, effects: Vec<Effect>) -> bool {
        let mut quit = false;
        for effect in effects {
            if effect.is_quit() {
                quit = true;
                continue;
            }

            let backend = Arc::clone(&self.backend);
            let params = self.params;
            let tx = self.tx.clone();
            tokio::spawn(async move {
                let Some(event) = run_effect(backend.as_ref(), &params, effect).await else {
                    return;
                };
                if tx.send(event).is_err() {
                    debug!("Event loop gone, dropping result");
                }
            });
        }
        quit
    }
}

/// Raw mode and the alternate screen, restored on drop
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode().context("Failed to enable raw mode")?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)
            .context("Failed to enter alternate screen")?;
        let terminal =
            Terminal::new(CrosstermBackend::new(stdout)).context("Failed to create terminal")?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(
            self.terminal.backend_mut(),
            DisableBracketedPaste,
            LeaveAlternateScreen
        );
        let _ = self.terminal.show_cursor();
    }
}

fn to_tui_event(event: Event) -> Option<TuiEvent> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => Some(TuiEvent::Key(key)),
        Event::Paste(text) => Some(TuiEvent::Paste(text)),
        Event::Resize(width, height) => Some(TuiEvent::Resize(width, height)),
        _ => None,
    }
}

/// Run the chat screen until the user quits
pub async fn run(config: &Config, backend: Arc<dyn ModelBackend>) -> Result<()> {
    let mut guard = TerminalGuard::enter()?;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let dispatcher = Dispatcher::new(backend, config.session_params(), tx);

    let mut view = ChatView::new(config);
    let mut events = EventStream::new();
    let mut ticker = interval(Duration::from_millis(config.ui.tick_rate_ms.max(16)));

    info!(model = %config.model, "Chat started");
    let mut quit = dispatcher.dispatch(view.start());

    while !quit {
        guard
            .terminal
            .draw(|frame| view.render(frame))
            .context("Failed to draw")?;

        let effects = tokio::select! {
            maybe_event = events.next() => match maybe_event {
                Some(Ok(event)) => match to_tui_event(event) {
                    Some(event) => view.handle_event(event),
                    None => Vec::new(),
                },
                Some(Err(err)) => {
                    error!(error = %err, "Terminal event stream failed");
                    return Err(err).context("Failed to read terminal event");
                }
                None => break,
            },
            Some(event) = rx.recv() => view.apply(event),
            _ = ticker.tick() => view.handle_event(TuiEvent::Tick),
        };

        quit = dispatcher.dispatch(effects);
    }

    info!(messages = view.messages().len(), "Chat closed");
    Ok(())
}
