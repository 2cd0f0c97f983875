mod config;
mod db;
mod models;
mod ui;
mod validation;

use std::io;

use anyhow::Result;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use tracing::error;
use tracing_subscriber::EnvFilter;
use tui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use crate::ui::{
    client_wizard::{
        handle_input as handle_client_wizard_input, render_client_wizard, ClientWizardAction,
        ClientWizardState,
    },
    clients::{handle_input as handle_clients_input, render_clients, ClientAction, ClientsState},
};

// Represents the current screen in the app
enum AppScreen {
    Clients,
    ClientWizard,
}

// Main application state
struct AppState {
    db: db::Database,
    screen: AppScreen,
    clients_state: ClientsState,
    client_wizard_state: Option<ClientWizardState>,
}

impl AppState {
    fn new(db: db::Database, clients_state: ClientsState) -> Self {
        Self {
            db,
            screen: AppScreen::Clients,
            clients_state,
            client_wizard_state: None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    // Load configuration
    let config = config::init()?;
    println!("Initializing client manager...");

    // Initialize database connection and schema
    let db = db::init(&config).await?;
    println!("Database connection established");

    // Fetch the initial client list; a storage failure starts the app with an
    // empty list and a status message instead of aborting.
    let clients_state = match db.list_clients().await {
        Ok(clients) => {
            let mut state = ClientsState::new(clients);
            state.set_status("Welcome!");
            state
        }
        Err(err) => {
            error!("could not load the client list at startup: {err}");
            let mut state = ClientsState::new(Vec::new());
            state.set_status("The client list could not be loaded.");
            state
        }
    };

    // Setup terminal
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app state
    let mut app_state = AppState::new(db, clients_state);

    // Run the main app loop
    let result = run_app(&mut terminal, &mut app_state).await;

    // Restore terminal
    terminal::disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    // Release the pool before exiting
    app_state.db.close().await;

    // Show any error message
    if let Err(err) = result {
        println!("Error: {}", err);
    }

    println!("Goodbye!");

    Ok(())
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app_state: &mut AppState) -> Result<()> {
    loop {
        // Render current screen
        terminal.draw(|f| match app_state.screen {
            AppScreen::Clients => {
                render_clients(f, &mut app_state.clients_state);
            }
            AppScreen::ClientWizard => {
                if let Some(state) = &mut app_state.client_wizard_state {
                    render_client_wizard(f, state);
                }
            }
        })?;

        // Handle input for current screen; every store call blocks the loop
        // until it completes.
        let should_quit = match app_state.screen {
            AppScreen::Clients => handle_clients_screen(app_state).await?,
            AppScreen::ClientWizard => handle_client_wizard_screen(app_state).await?,
        };

        if should_quit {
            break;
        }
    }

    Ok(())
}

async fn handle_clients_screen(app_state: &mut AppState) -> Result<bool> {
    match handle_clients_input(&mut app_state.clients_state)? {
        Some(ClientAction::Exit) => {
            return Ok(true);
        }
        Some(ClientAction::NewClient) => {
            app_state.client_wizard_state = Some(ClientWizardState::new());
            app_state.screen = AppScreen::ClientWizard;
        }
        Some(ClientAction::EditClient(client)) => {
            // The form starts from the in-memory row; the canonical record is
            // re-fetched on save.
            app_state.client_wizard_state = Some(ClientWizardState::from_existing(client));
            app_state.screen = AppScreen::ClientWizard;
        }
        Some(ClientAction::DeleteClient(id)) => match app_state.db.delete_client(id).await {
            Ok(()) => {
                app_state.clients_state.remove_selected();
                app_state.clients_state.set_status("The client was deleted.");
            }
            Err(_) => {
                app_state
                    .clients_state
                    .set_status("The client could not be deleted.");
            }
        },
        None => {}
    }

    Ok(false)
}

async fn handle_client_wizard_screen(app_state: &mut AppState) -> Result<bool> {
    if let Some(state) = &mut app_state.client_wizard_state {
        match handle_client_wizard_input(state)? {
            Some(ClientWizardAction::Cancel) => {
                app_state.screen = AppScreen::Clients;
            }
            Some(ClientWizardAction::Save(form)) => {
                if form.id == 0 {
                    add_client(app_state, form).await;
                } else {
                    modify_client(app_state, form).await;
                }
            }
            None => {}
        }
    }

    Ok(false)
}

/// Validates the form and inserts a new client. The display list gets the
/// client as built from the form; the store does not hand the new id back.
async fn add_client(app_state: &mut AppState, form: models::Client) {
    let Some(wizard) = &mut app_state.client_wizard_state else {
        return;
    };

    if !validation::validate_client(&form) {
        wizard.set_error("Some of your fields contain errors.");
        return;
    }

    match app_state.db.insert_client(&form).await {
        Ok(()) => {
            app_state.clients_state.push_client(form);
            app_state.clients_state.set_status("The client was added.");
            app_state.screen = AppScreen::Clients;
        }
        Err(_) => {
            wizard.set_error("The client could not be saved.");
        }
    }
}

/// Re-fetches the canonical record by id before applying the form fields, so a
/// stale in-memory copy cannot be written back.
async fn modify_client(app_state: &mut AppState, form: models::Client) {
    let Some(wizard) = &mut app_state.client_wizard_state else {
        return;
    };

    let mut canonical = match app_state.db.find_client(form.id).await {
        Ok(Some(client)) => client,
        Ok(None) => {
            app_state
                .clients_state
                .set_status("The client no longer exists.");
            app_state.screen = AppScreen::Clients;
            return;
        }
        Err(_) => {
            wizard.set_error("The client could not be loaded.");
            return;
        }
    };

    canonical.last_name = form.last_name;
    canonical.first_name = form.first_name;
    canonical.address = form.address;
    canonical.city = form.city;

    if !validation::validate_client(&canonical) {
        wizard.set_error("Some of your fields contain errors.");
        return;
    }

    match app_state.db.update_client(&canonical).await {
        Ok(()) => {
            app_state.clients_state.replace_selected(canonical);
            app_state.clients_state.set_status("The client was updated.");
            app_state.screen = AppScreen::Clients;
        }
        Err(_) => {
            wizard.set_error("The client could not be updated.");
        }
    }
}
