//! Terminal user interface.
//!
//! The UI loop is the single driver of the application: it waits on terminal
//! input, completed backend tasks, state change notifications and wallet
//! events, and redraws after whichever of them changed something.

mod form;
mod status_bar;
mod views;
mod widgets;

use crossterm::event::{Event as TerminalEvent, EventStream, KeyEventKind};
use futures::{future::LocalBoxFuture, stream::FuturesUnordered, FutureExt, StreamExt};
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tuirealm::{
    event::{Key, KeyEvent, KeyModifiers},
    terminal::TerminalBridge,
    tui::prelude::{Constraint, Direction, Layout},
    Frame,
};

use self::{
    form::{ActionForm, FormStatus},
    status_bar::StatusBarState,
    views::main::{MainScreen, ScreenFeedback},
};
use crate::{
    backend::{state::StateView, wallet::ProviderEvent, Backend, BackendEvent, Task},
    config::Network,
    Event,
};

/// What the UI loop should do after an event was processed.
enum UiFeedback {
    Redraw,
    ExecuteTask { task: Task, block: bool },
    Quit,
    None,
}

struct Ui {
    network: Network,
    screen: MainScreen,
    form: Option<ActionForm>,
    status_bar: StatusBarState,
}

impl Ui {
    fn new(network: Network, has_wallet: bool, state: StateView) -> Self {
        let mut status_bar = StatusBarState::new(&network);
        status_bar.update_state(&network, &state);

        let screen = MainScreen::new(network.clone(), has_wallet, state);
        status_bar.add_child(MainScreen::NAME);

        Ui {
            network,
            screen,
            form: None,
            status_bar,
        }
    }

    fn view(&mut self, frame: &mut Frame) {
        let mut constraints = vec![Constraint::Max(3), Constraint::Min(10)];
        if let Some(form) = &self.form {
            constraints.push(Constraint::Length(form.height()));
        }
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(frame.size());

        self.status_bar.view(frame, layout[0]);
        self.screen.view(frame, layout[1]);
        if let Some(form) = &mut self.form {
            form.view(frame, layout[2]);
        }
    }

    fn redraw(&mut self, terminal: &mut TerminalBridge) {
        if let Err(error) = terminal.raw_mut().draw(|frame| self.view(frame)) {
            tracing::error!(%error, "unable to draw the terminal");
        }
    }

    fn update_state(&mut self, state: &StateView) {
        self.status_bar.update_state(&self.network, state);
        self.screen.update_state(state);
    }

    fn block(&mut self) {
        self.status_bar.block();
    }

    fn unblock(&mut self) {
        self.status_bar.unblock();
    }

    fn close_form(&mut self) {
        if self.form.take().is_some() {
            self.status_bar.to_parent();
        }
    }

    fn on_event(&mut self, event: Event) -> UiFeedback {
        if let (Some(form), Event::Key(key)) = (&mut self.form, &event) {
            return match form.on_key(*key) {
                FormStatus::Submit(action) => {
                    self.close_form();
                    UiFeedback::ExecuteTask {
                        task: Task::Action(action),
                        block: true,
                    }
                }
                FormStatus::Redraw => UiFeedback::Redraw,
                FormStatus::Ignored => UiFeedback::None,
                FormStatus::Cancel => {
                    self.close_form();
                    UiFeedback::Redraw
                }
            };
        }

        match self.screen.on_event(&event) {
            ScreenFeedback::Form(form) => {
                self.status_bar.add_child(form.title());
                self.form = Some(form);
                UiFeedback::Redraw
            }
            ScreenFeedback::Task { task, block } => UiFeedback::ExecuteTask { task, block },
            ScreenFeedback::Redraw => UiFeedback::Redraw,
            ScreenFeedback::Quit => UiFeedback::Quit,
            ScreenFeedback::None => UiFeedback::None,
        }
    }
}

fn is_interrupt(key: &KeyEvent) -> bool {
    matches!(
        key,
        KeyEvent {
            code: Key::Char('c'),
            modifiers: KeyModifiers::CONTROL,
        }
    )
}

async fn next_provider_event(
    events: &mut Option<mpsc::UnboundedReceiver<ProviderEvent>>,
) -> Option<ProviderEvent> {
    match events {
        Some(events) => events.recv().await,
        None => std::future::pending().await,
    }
}

/// Runs the terminal UI until the user quits.
pub async fn run_ui(backend: &Backend) {
    let mut terminal = TerminalBridge::new().expect("cannot initialize terminal");
    terminal
        .enter_alternate_screen()
        .expect("cannot enter alternate screen");
    terminal.enable_raw_mode().expect("cannot enable raw mode");

    let mut ui = Ui::new(
        backend.network().clone(),
        backend.has_wallet(),
        backend.view().await,
    );

    let mut terminal_events = EventStream::new();
    let mut updates = backend.subscribe();
    let mut provider_events = backend.subscribe_provider_events();

    let run_task = |task: Task, block: bool| {
        async move { (block, backend.run_task(task).await) }.boxed_local()
    };
    let mut active_tasks: FuturesUnordered<LocalBoxFuture<(bool, BackendEvent)>> =
        FuturesUnordered::new();
    let mut blocking_tasks: usize = 0;

    let mut feedback = UiFeedback::ExecuteTask {
        task: Task::Initialize,
        block: true,
    };

    loop {
        match feedback {
            UiFeedback::Redraw => ui.redraw(&mut terminal),
            UiFeedback::ExecuteTask { task, block } => {
                if block {
                    blocking_tasks += 1;
                    ui.block();
                }
                active_tasks.push(run_task(task, block));
                ui.redraw(&mut terminal);
            }
            UiFeedback::Quit => break,
            UiFeedback::None => {}
        }

        feedback = tokio::select! {
            Some(event) = terminal_events.next() => match event {
                Ok(TerminalEvent::Key(key)) if key.kind != KeyEventKind::Release => {
                    let key = KeyEvent::from(key);
                    if is_interrupt(&key) {
                        UiFeedback::Quit
                    } else if blocking_tasks > 0 {
                        // Repeated triggers of a running task are dropped here
                        UiFeedback::None
                    } else {
                        ui.on_event(Event::Key(key))
                    }
                }
                Ok(TerminalEvent::Resize(..)) => UiFeedback::Redraw,
                Ok(_) => UiFeedback::None,
                Err(error) => {
                    tracing::error!(%error, "terminal event error");
                    UiFeedback::None
                }
            },
            Some((block, event)) = active_tasks.next() => {
                if block {
                    blocking_tasks -= 1;
                    if blocking_tasks == 0 {
                        ui.unblock();
                    }
                }
                if let BackendEvent::TaskCompleted { task, execution_result } = &event {
                    tracing::debug!(?task, ?execution_result, "task completed");
                }
                ui.update_state(&backend.view().await);
                ui.on_event(Event::Backend(event));
                UiFeedback::Redraw
            }
            update = updates.recv() => match update {
                Ok(update) => {
                    ui.update_state(&backend.view().await);
                    ui.on_event(Event::Backend(BackendEvent::AppStateUpdated(update)));
                    UiFeedback::Redraw
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "state updates lagged behind");
                    ui.update_state(&backend.view().await);
                    UiFeedback::Redraw
                }
                Err(RecvError::Closed) => UiFeedback::None,
            },
            Some(event) = next_provider_event(&mut provider_events) => {
                tracing::info!(?event, "wallet event");
                UiFeedback::ExecuteTask {
                    task: Task::ProviderEvent(event),
                    block: false,
                }
            }
        };
    }

    drop(active_tasks);

    let _ = terminal.leave_alternate_screen();
    let _ = terminal.disable_raw_mode();
    let _ = terminal.clear_screen();
}
