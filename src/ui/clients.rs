use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::models::Client;

// Represents the state of the client list screen
pub struct ClientsState {
    clients: Vec<Client>,
    list_state: ListState,
    show_delete_confirmation: bool,
    show_quit_confirmation: bool,
    status: Option<String>,
}

impl ClientsState {
    pub fn new(clients: Vec<Client>) -> Self {
        let mut list_state = ListState::default();
        if !clients.is_empty() {
            list_state.select(Some(0));
        }

        Self {
            clients,
            list_state,
            show_delete_confirmation: false,
            show_quit_confirmation: false,
            status: None,
        }
    }

    pub fn next(&mut self) {
        if self.clients.is_empty() {
            return;
        }

        let i = match self.list_state.selected() {
            Some(i) => {
                if i >= self.clients.len() - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.clients.is_empty() {
            return;
        }

        let i = match self.list_state.selected() {
            Some(i) => {
                if i == 0 {
                    self.clients.len() - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn toggle_delete_confirmation(&mut self) {
        self.show_delete_confirmation = !self.show_delete_confirmation;
    }

    pub fn toggle_quit_confirmation(&mut self) {
        self.show_quit_confirmation = !self.show_quit_confirmation;
    }

    pub fn selected_client(&self) -> Option<&Client> {
        self.list_state.selected().and_then(|i| self.clients.get(i))
    }

    pub fn selected_client_id(&self) -> Option<i64> {
        self.selected_client().map(|c| c.id)
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some(message.into());
    }

    /// Appends a freshly inserted client to the display list. The id stays at
    /// whatever the caller built; the store does not hand it back.
    pub fn push_client(&mut self, client: Client) {
        self.clients.push(client);
        if self.list_state.selected().is_none() {
            self.list_state.select(Some(0));
        }
    }

    /// Removes the selected row and re-appends the updated record, forcing the
    /// list to re-render with the new values.
    pub fn replace_selected(&mut self, client: Client) {
        if let Some(i) = self.list_state.selected() {
            if i < self.clients.len() {
                self.clients.remove(i);
            }
            self.clients.push(client);
            self.list_state.select(Some(self.clients.len() - 1));
        }
    }

    pub fn remove_selected(&mut self) {
        if let Some(i) = self.list_state.selected() {
            if i < self.clients.len() {
                self.clients.remove(i);
            }
            if self.clients.is_empty() {
                self.list_state.select(None);
            } else if i >= self.clients.len() {
                self.list_state.select(Some(self.clients.len() - 1));
            }
        }
    }
}

pub enum ClientAction {
    Exit,
    NewClient,
    EditClient(Client), // Carries a copy of the selected row
    DeleteClient(i64),  // Contains client_id
}

pub fn render_clients<B: Backend>(frame: &mut Frame<B>, state: &mut ClientsState) {
    let size = frame.size();

    // Create the layout
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Min(1),
                Constraint::Length(1),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(size);

    // Create and render the clients list
    let items: Vec<ListItem> = state
        .clients
        .iter()
        .map(|client| {
            ListItem::new(Spans::from(vec![Span::raw(format!(
                "{} {}",
                client.last_name, client.first_name
            ))]))
        })
        .collect();

    let clients_list = List::new(items)
        .block(Block::default().title("Clients").borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );

    frame.render_stateful_widget(clients_list, chunks[0], &mut state.list_state);

    // Status line for validation, selection and store messages
    let status = Paragraph::new(state.status.clone().unwrap_or_default())
        .style(Style::default().fg(Color::Yellow));
    frame.render_widget(status, chunks[1]);

    // Create and render the buttons
    let buttons_text = if state.selected_client().is_some() {
        "<N> New Client | <E> Edit Client | <D> Delete Client | <Q> Quit"
    } else {
        "<N> New Client | <Q> Quit"
    };

    let buttons = Paragraph::new(buttons_text)
        .block(Block::default().borders(Borders::TOP))
        .style(Style::default().fg(Color::White));

    frame.render_widget(buttons, chunks[2]);

    // Render confirmation popups if needed
    if state.show_delete_confirmation {
        render_confirmation(
            frame,
            size,
            "Confirm Delete",
            &[
                "Are you sure you want to delete this client?",
                "",
                "Its reservations will also be deleted.",
            ],
        );
    } else if state.show_quit_confirmation {
        render_confirmation(frame, size, "Confirm Quit", &["Quit the client manager?"]);
    }
}

fn render_confirmation<B: Backend>(frame: &mut Frame<B>, size: Rect, title: &str, lines: &[&str]) {
    let popup_area = centered_rect(50, 20, size);

    let mut text = vec![Spans::from("")];
    text.extend(lines.iter().map(|line| Spans::from(*line)));
    text.push(Spans::from(""));
    text.push(Spans::from("<Y> Yes  <N> No"));

    let popup = Paragraph::new(text)
        .block(Block::default().title(title).borders(Borders::ALL))
        .style(Style::default().fg(Color::White).bg(Color::Black));

    frame.render_widget(popup, popup_area);
}

// Helper function to create a centered rect
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

pub fn handle_input(state: &mut ClientsState) -> Result<Option<ClientAction>> {
    if let Event::Key(key) = event::read()? {
        if state.show_delete_confirmation {
            match key.code {
                KeyCode::Char('y') => {
                    if let Some(id) = state.selected_client_id() {
                        state.toggle_delete_confirmation();
                        return Ok(Some(ClientAction::DeleteClient(id)));
                    }
                }
                KeyCode::Char('n') | KeyCode::Esc => {
                    state.toggle_delete_confirmation();
                    state.set_status("Deletion cancelled.");
                }
                _ => {}
            }
            return Ok(None);
        }

        if state.show_quit_confirmation {
            match key.code {
                KeyCode::Char('y') => {
                    return Ok(Some(ClientAction::Exit));
                }
                KeyCode::Char('n') | KeyCode::Esc => {
                    state.toggle_quit_confirmation();
                    state.set_status("Welcome back!");
                }
                _ => {}
            }
            return Ok(None);
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                state.toggle_quit_confirmation();
            }
            KeyCode::Char('n') => {
                return Ok(Some(ClientAction::NewClient));
            }
            KeyCode::Char('e') => {
                if let Some(client) = state.selected_client().cloned() {
                    return Ok(Some(ClientAction::EditClient(client)));
                }
                state.set_status("You must select a client to update.");
            }
            KeyCode::Char('d') => {
                if state.selected_client().is_some() {
                    state.toggle_delete_confirmation();
                } else {
                    state.set_status("You must select a client to delete.");
                }
            }
            KeyCode::Down => {
                state.next();
            }
            KeyCode::Up => {
                state.previous();
            }
            _ => {}
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(last: &str) -> Client {
        Client {
            last_name: last.to_string(),
            first_name: "Test".to_string(),
            city: "Ville".to_string(),
            ..Client::default()
        }
    }

    #[test]
    fn selection_wraps_around_the_list() {
        let mut state = ClientsState::new(vec![named("A"), named("B")]);

        assert_eq!(state.list_state.selected(), Some(0));
        state.next();
        assert_eq!(state.list_state.selected(), Some(1));
        state.next();
        assert_eq!(state.list_state.selected(), Some(0));
        state.previous();
        assert_eq!(state.list_state.selected(), Some(1));
    }

    #[test]
    fn remove_selected_clamps_the_selection() {
        let mut state = ClientsState::new(vec![named("A"), named("B")]);
        state.next();

        state.remove_selected();
        assert_eq!(state.clients.len(), 1);
        assert_eq!(state.list_state.selected(), Some(0));

        state.remove_selected();
        assert!(state.clients.is_empty());
        assert_eq!(state.list_state.selected(), None);
    }

    #[test]
    fn replace_selected_reappends_at_the_end() {
        let mut state = ClientsState::new(vec![named("A"), named("B")]);

        state.replace_selected(named("C"));

        assert_eq!(state.clients[0].last_name, "B");
        assert_eq!(state.clients[1].last_name, "C");
        assert_eq!(state.list_state.selected(), Some(1));
    }
}
