//! The contract screen, the one a user sees on application start.

use chrono::{DateTime, Duration, Utc};
use chrono_humanize::{Accuracy, HumanTime, Tense};
use tuirealm::{
    command::Direction as ScrollDirection,
    event::{Key, KeyEvent, KeyModifiers},
    tui::prelude::{Constraint, Direction, Layout, Rect},
    Frame,
};

use super::actions::{action_entry, ActionEntry};
use crate::{
    backend::{
        abi::U256,
        actions::ActionKind,
        state::{ContractSnapshot, StateView},
        Task,
    },
    config::Network,
    ui::{
        form::ActionForm,
        widgets::{
            key_help::{self, KeyHint},
            panel::Panel,
        },
    },
    Event,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Quit,
    Connect,
    SwitchNetwork,
    Refresh,
    Action(ActionKind),
}

const COMMANDS: [(char, &str, Command); 12] = [
    ('q', "Quit", Command::Quit),
    ('c', "Connect wallet", Command::Connect),
    ('n', "Switch network", Command::SwitchNetwork),
    ('r', "Refresh", Command::Refresh),
    ('k', "Check in", Command::Action(ActionKind::CheckIn)),
    ('x', "Declare deceased", Command::Action(ActionKind::DeclareDeceased)),
    ('d', "Deposit", Command::Action(ActionKind::Deposit)),
    ('h', "Heartbeat interval", Command::Action(ActionKind::SetHeartbeatInterval)),
    ('a', "Add beneficiary", Command::Action(ActionKind::AddBeneficiary)),
    ('e', "Remove beneficiary", Command::Action(ActionKind::RemoveBeneficiary)),
    ('u', "Update share", Command::Action(ActionKind::UpdateBeneficiaryShare)),
    ('t', "Distribute ERC-20", Command::Action(ActionKind::DistributeErc20)),
];

/// What the UI loop should do after a key reached the screen.
pub(crate) enum ScreenFeedback {
    Form(ActionForm),
    /// Blocking tasks keep key input ignored until they complete
    Task { task: Task, block: bool },
    Redraw,
    Quit,
    None,
}

pub(crate) struct MainScreen {
    network: Network,
    has_wallet: bool,
    state: StateView,
    overview: Panel,
    contract: Panel,
}

impl MainScreen {
    pub(crate) const NAME: &'static str = "Inheritance contract";

    pub(crate) fn new(network: Network, has_wallet: bool, state: StateView) -> Self {
        let overview = Panel::new("Wallet", &overview_text(&network, has_wallet, &state));
        let contract = contract_panel(&state);
        MainScreen {
            network,
            has_wallet,
            state,
            overview,
            contract,
        }
    }

    fn key_hints(&self) -> Vec<KeyHint> {
        COMMANDS
            .iter()
            .map(|&(key, label, command)| KeyHint {
                key,
                label,
                busy: matches!(
                    command,
                    Command::Action(kind) if self.state.in_flight.contains(&kind)
                ),
            })
            .collect()
    }

    fn command(&self, command: Command) -> ScreenFeedback {
        let task = |task, block| ScreenFeedback::Task { task, block };
        match command {
            Command::Quit => ScreenFeedback::Quit,
            Command::Connect => task(Task::Connect, true),
            Command::SwitchNetwork => task(Task::SwitchNetwork, true),
            Command::Refresh => task(Task::Refresh, false),
            Command::Action(kind) => match action_entry(kind, &self.state.drafts) {
                ActionEntry::Form(form) => ScreenFeedback::Form(form),
                ActionEntry::Ready(action) => task(Task::Action(action), true),
            },
        }
    }

    fn scroll(&mut self, direction: ScrollDirection) -> ScreenFeedback {
        if self.contract.scroll(direction) {
            ScreenFeedback::Redraw
        } else {
            ScreenFeedback::None
        }
    }

    pub(crate) fn on_event(&mut self, event: &Event) -> ScreenFeedback {
        let Event::Key(key) = event else {
            return ScreenFeedback::None;
        };
        match key {
            KeyEvent {
                code: Key::Char(c),
                modifiers: KeyModifiers::NONE,
            } => match COMMANDS.iter().find(|(key, ..)| key == c) {
                Some(&(_, _, command)) => self.command(command),
                None => ScreenFeedback::None,
            },
            KeyEvent { code: Key::Up, .. }
            | KeyEvent {
                code: Key::Char('p'),
                modifiers: KeyModifiers::CONTROL,
            } => self.scroll(ScrollDirection::Up),
            KeyEvent {
                code: Key::Down, ..
            }
            | KeyEvent {
                code: Key::Char('n'),
                modifiers: KeyModifiers::CONTROL,
            } => self.scroll(ScrollDirection::Down),
            _ => ScreenFeedback::None,
        }
    }

    /// Rebuilds the panels from a fresh copy of the application state.
    pub(crate) fn update_state(&mut self, state: &StateView) {
        self.overview = Panel::new(
            "Wallet",
            &overview_text(&self.network, self.has_wallet, state),
        );
        self.contract = contract_panel(state);
        self.state = state.clone();
    }

    pub(crate) fn view(&mut self, frame: &mut Frame, area: Rect) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints(
                [
                    Constraint::Length(6),
                    Constraint::Min(5),
                    Constraint::Max(4),
                ]
                .as_ref(),
            )
            .split(area);

        self.overview.view(frame, layout[0]);
        self.contract.view(frame, layout[1]);
        key_help::view(frame, layout[2], &self.key_hints());
    }
}

fn network_line(network: &Network, has_wallet: bool, state: &StateView) -> String {
    if !has_wallet {
        return "No wallet configured".to_owned();
    }
    match &state.chain.active_chain_id {
        Some(chain_id) if chain_id.matches(&network.chain_id) => {
            format!("Network: {}", network.name)
        }
        Some(chain_id) => format!("Network: {chain_id}"),
        None => "Network: unknown".to_owned(),
    }
}

fn overview_text(network: &Network, has_wallet: bool, state: &StateView) -> String {
    let account = state
        .chain
        .active_account
        .map_or_else(|| "not connected".to_owned(), |account| account.to_string());

    format!(
        "Contract: {}\nAccount: {}\n{}\nStatus: {}",
        network.contract_address,
        account,
        network_line(network, has_wallet, state),
        state.status,
    )
}

fn contract_panel(state: &StateView) -> Panel {
    match &state.snapshot.snapshot {
        None => Panel::new("Contract state", "Not loaded"),
        Some(snapshot) if state.snapshot.trusted => {
            Panel::new("Contract state", &snapshot_text(snapshot, Utc::now())).scrollable()
        }
        Some(snapshot) => Panel::new(
            "Contract state (stale, may not match the current network)",
            &snapshot_text(snapshot, Utc::now()),
        )
        .scrollable()
        .stale(),
    }
}

fn snapshot_text(snapshot: &ContractSnapshot, now: DateTime<Utc>) -> String {
    let mut lines = vec![
        format!("Owner: {}", snapshot.owner),
        format!(
            "Deceased: {}",
            if snapshot.is_deceased { "Yes" } else { "No" }
        ),
        format!(
            "Heartbeat interval: {}",
            interval_text(snapshot.heartbeat_interval)
        ),
        format!(
            "Last check-in: {}",
            timestamp_text(snapshot.last_check_in, now)
        ),
        format!("Next check-in due: {}", deadline_text(snapshot, now)),
        "Beneficiaries:".to_owned(),
    ];

    if snapshot.beneficiaries.is_empty() {
        lines.push("  None".to_owned());
    } else {
        lines.extend(
            snapshot
                .beneficiaries
                .iter()
                .map(|beneficiary| format!("  {}  {}%", beneficiary.wallet, beneficiary.share)),
        );
    }

    lines.join("\n")
}

/// Contract numbers come as 256 bits, anything that doesn't fit 64 bits is
/// not a sensible duration or timestamp anyway.
fn to_u64(value: U256) -> Option<u64> {
    u64::try_from(value).ok()
}

fn to_datetime(seconds: u64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(i64::try_from(seconds).ok()?, 0)
}

fn interval_text(interval: U256) -> String {
    let duration = to_u64(interval)
        .and_then(|seconds| i64::try_from(seconds).ok())
        .and_then(Duration::try_seconds);
    match duration {
        Some(duration) if !duration.is_zero() => format!(
            "{} seconds ({})",
            interval,
            HumanTime::from(duration).to_text_en(Accuracy::Precise, Tense::Present)
        ),
        _ => format!("{interval} seconds"),
    }
}

fn timestamp_text(timestamp: U256, now: DateTime<Utc>) -> String {
    if timestamp.is_zero() {
        return "-".to_owned();
    }
    match to_u64(timestamp).and_then(to_datetime) {
        Some(datetime) => format!(
            "{} ({})",
            datetime.format("%Y-%m-%d %H:%M:%S UTC"),
            HumanTime::from(datetime - now)
        ),
        None => timestamp.to_string(),
    }
}

fn deadline_text(snapshot: &ContractSnapshot, now: DateTime<Utc>) -> String {
    if snapshot.last_check_in.is_zero() {
        return "-".to_owned();
    }
    let deadline = snapshot
        .last_check_in
        .checked_add(snapshot.heartbeat_interval)
        .unwrap_or(U256::MAX);
    timestamp_text(deadline, now)
}
