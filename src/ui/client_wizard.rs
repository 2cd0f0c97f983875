use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::models::Client;

pub enum ClientWizardAction {
    Cancel,
    Save(Client),
}

#[derive(Clone, PartialEq, Copy)]
pub enum ClientField {
    LastName,
    FirstName,
    Address,
    City,
}

pub struct ClientWizardState {
    pub client: Client,
    pub current_field: ClientField,
    pub editing: bool,
    pub error: Option<String>,
}

impl ClientWizardState {
    pub fn new() -> Self {
        Self {
            client: Client {
                id: 0,
                last_name: String::new(),
                first_name: String::new(),
                address: Some(String::new()),
                city: String::new(),
            },
            current_field: ClientField::LastName,
            editing: false,
            error: None,
        }
    }

    /// Starts the form from the selected row's fields.
    pub fn from_existing(client: Client) -> Self {
        Self {
            client,
            current_field: ClientField::LastName,
            editing: false,
            error: None,
        }
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn toggle_editing(&mut self) {
        self.editing = !self.editing;
    }

    pub fn next_field(&mut self) {
        self.current_field = match self.current_field {
            ClientField::LastName => ClientField::FirstName,
            ClientField::FirstName => ClientField::Address,
            ClientField::Address => ClientField::City,
            ClientField::City => ClientField::LastName,
        };
    }

    pub fn previous_field(&mut self) {
        self.current_field = match self.current_field {
            ClientField::LastName => ClientField::City,
            ClientField::FirstName => ClientField::LastName,
            ClientField::Address => ClientField::FirstName,
            ClientField::City => ClientField::Address,
        };
    }

    pub fn edit_current_field(&mut self, key: KeyCode) {
        if !self.editing {
            return;
        }

        let field_value = match self.current_field {
            ClientField::LastName => &mut self.client.last_name,
            ClientField::FirstName => &mut self.client.first_name,
            ClientField::Address => {
                if self.client.address.is_none() {
                    self.client.address = Some(String::new());
                }
                self.client.address.as_mut().unwrap()
            }
            ClientField::City => &mut self.client.city,
        };

        match key {
            KeyCode::Char(c) => {
                field_value.push(c);
            }
            KeyCode::Backspace => {
                field_value.pop();
            }
            _ => {}
        }
    }
}

pub fn render_client_wizard<B: Backend>(f: &mut Frame<B>, state: &mut ClientWizardState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(1),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(f.size());

    // Title with appropriate text based on whether we're editing or creating
    let title_text = if state.client.id == 0 {
        "New Client"
    } else {
        "Edit Client"
    };

    let title = Paragraph::new(title_text)
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    // Form fields
    render_form(f, state, chunks[1]);

    // Validation and store errors
    let error = Paragraph::new(state.error.clone().unwrap_or_default())
        .style(Style::default().fg(Color::Red));
    f.render_widget(error, chunks[2]);

    // Help text
    let help_text = if state.editing {
        "Enter - Save field | Esc - Cancel editing"
    } else {
        "Enter - Edit field | Up/Down - Navigate fields | S - Save client | Esc - Cancel"
    };

    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[3]);
}

fn render_form<B: Backend>(f: &mut Frame<B>, state: &mut ClientWizardState, area: Rect) {
    let field_names = ["Last name", "First name", "Address", "City"];

    // Create a new empty string for the case when address is None
    let empty_string = String::new();

    let field_values = [
        &state.client.last_name,
        &state.client.first_name,
        state.client.address.as_ref().unwrap_or(&empty_string),
        &state.client.city,
    ];

    let items: Vec<ListItem> = field_names
        .iter()
        .zip(field_values.iter())
        .enumerate()
        .map(|(i, (name, value))| {
            let content = if i == state.current_field as usize && state.editing {
                Spans::from(vec![
                    Span::styled(format!("{}: ", name), Style::default().fg(Color::Yellow)),
                    Span::styled(
                        format!("{}|", value),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                ])
            } else {
                let style = if i == state.current_field as usize {
                    Style::default().fg(Color::Yellow)
                } else {
                    Style::default()
                };

                Spans::from(vec![
                    Span::styled(format!("{}: ", name), style),
                    Span::raw(value.as_str()),
                ])
            };

            ListItem::new(content)
        })
        .collect();

    let form_list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Client Details"))
        .highlight_style(Style::default().fg(Color::Yellow));

    f.render_widget(form_list, area);
}

pub fn handle_input(state: &mut ClientWizardState) -> Result<Option<ClientWizardAction>> {
    if let Event::Key(key) = event::read()? {
        match key.code {
            KeyCode::Esc => {
                if state.editing {
                    state.toggle_editing();
                } else {
                    return Ok(Some(ClientWizardAction::Cancel));
                }
            }
            KeyCode::Enter => {
                state.toggle_editing();
            }
            KeyCode::Up if !state.editing => {
                state.previous_field();
            }
            KeyCode::Down if !state.editing => {
                state.next_field();
            }
            KeyCode::Char('s') if !state.editing => {
                // Validation happens in the controller so invalid input keeps
                // the form open with an error message.
                return Ok(Some(ClientWizardAction::Save(state.client.clone())));
            }
            _ if state.editing => {
                state.edit_current_field(key.code);
            }
            _ => {}
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typing_edits_the_current_field() {
        let mut state = ClientWizardState::new();
        state.toggle_editing();

        state.edit_current_field(KeyCode::Char('D'));
        state.edit_current_field(KeyCode::Char('u'));
        state.edit_current_field(KeyCode::Backspace);

        assert_eq!(state.client.last_name, "D");
    }

    #[test]
    fn field_navigation_cycles() {
        let mut state = ClientWizardState::new();

        state.next_field();
        assert!(state.current_field == ClientField::FirstName);
        state.previous_field();
        state.previous_field();
        assert!(state.current_field == ClientField::City);
    }
}
