//! Status bar component definitions.

use itertools::Itertools;
use tui_realm_stdlib::Label;
use tuirealm::{
    props::BorderSides,
    tui::{
        prelude::{Constraint, Direction, Layout, Rect},
        widgets::Block,
    },
    Frame, MockComponent,
};

use crate::{
    backend::{actions::ActionKind, state::StateView},
    config::Network,
};

pub(crate) struct StatusBarState {
    breadcrumbs: Vec<&'static str>,
    blocked: bool,
    network: &'static str,
    on_expected_network: bool,
    in_flight: Vec<ActionKind>,
}

impl StatusBarState {
    pub(crate) fn new(network: &Network) -> Self {
        StatusBarState {
            breadcrumbs: Vec::new(),
            blocked: false,
            network: network.name,
            on_expected_network: false,
            in_flight: Vec::new(),
        }
    }

    pub(crate) fn block(&mut self) {
        self.blocked = true;
    }

    pub(crate) fn unblock(&mut self) {
        self.blocked = false;
    }

    pub(crate) fn add_child(&mut self, name: &'static str) {
        self.breadcrumbs.push(name);
    }

    pub(crate) fn to_parent(&mut self) {
        self.breadcrumbs.pop();
    }

    pub(crate) fn update_state(&mut self, network: &Network, state: &StateView) {
        self.on_expected_network = state.chain.on_expected_network(&network.chain_id);
        self.in_flight = state.in_flight.clone();
    }

    pub(crate) fn view(&self, frame: &mut Frame, area: Rect) {
        let block = Block::new().borders(BorderSides::ALL);

        let layout = Layout::default()
            .horizontal_margin(1)
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(20), Constraint::Max(40)].as_ref())
            .split(block.inner(area));

        let left = if self.blocked {
            "Executing a task, please wait".to_owned()
        } else if !self.in_flight.is_empty() {
            format!("Pending: {}", self.in_flight.iter().join(", "))
        } else {
            self.breadcrumbs.join(" / ")
        };
        Label::default().text(left).view(frame, layout[0]);

        let network = if self.on_expected_network {
            self.network.to_owned()
        } else {
            format!("Not on {}", self.network)
        };
        Label::default().text(network).view(frame, layout[1]);

        frame.render_widget(block, area);
    }
}
