//! Interactive shell state.
//!
//! The shell moves between the auth screen and the dashboard. Which one is
//! shown is decided by the route guard from the current session; a
//! redirect from the session manager (logout or expiry) sends the user back
//! to the auth screen.

use std::io::{self, Write};

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use todolist_core::auth::guard;
use todolist_core::utils::truncate_string;
use todolist_core::{
    AuthMode, AuthRedirect, Config, Credentials, LogoutReason, Route, SessionManager, Task,
    TaskId, TaskService,
};

use crate::commands::{Command, ListFilter, HELP};

/// Longest task text shown in a listing row
const MAX_ROW_TEXT: usize = 60;

/// How a dashboard visit ended
enum DashboardExit {
    SignedOut(LogoutReason),
    Quit,
}

pub struct App {
    config: Config,
    session: SessionManager,
    tasks: TaskService,
    redirects: broadcast::Receiver<AuthRedirect>,
    input: Lines<BufReader<Stdin>>,
    /// Ids in the order of the last listing, for `toggle <n>`
    last_listed: Vec<TaskId>,
}

impl App {
    pub fn new(config: Config, session: SessionManager, tasks: TaskService) -> Self {
        let redirects = session.redirects();
        Self {
            config,
            session,
            tasks,
            redirects,
            input: BufReader::new(tokio::io::stdin()).lines(),
            last_listed: Vec::new(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        loop {
            let route = guard(Route::Dashboard, self.session.current().as_ref());
            debug!(?route, "Routing");

            match route {
                Route::Auth => {
                    if !self.auth_screen().await? {
                        return Ok(());
                    }
                    // Drop redirects from before this sign-in
                    self.redirects = self.session.redirects();
                }
                Route::Dashboard => match self.dashboard().await? {
                    DashboardExit::Quit => return Ok(()),
                    DashboardExit::SignedOut(reason) => {
                        self.tasks.clear();
                        self.last_listed.clear();
                        match reason {
                            LogoutReason::Expired => {
                                println!("\nYour session has expired. Please sign in again.")
                            }
                            LogoutReason::Requested => println!("\nSigned out."),
                        }
                    }
                },
            }
        }
    }

    fn prompt(text: &str) -> Result<()> {
        print!("{}", text);
        io::stdout().flush()?;
        Ok(())
    }

    /// Read one line; None on end of input
    async fn read_line(&mut self) -> Result<Option<String>> {
        Ok(self
            .input
            .next_line()
            .await
            .context("Failed to read from stdin")?
            .map(|line| line.trim().to_string()))
    }

    async fn read_password() -> Result<String> {
        tokio::task::spawn_blocking(|| rpassword::prompt_password("Password: "))
            .await
            .context("Password prompt task failed")?
            .context("Failed to read password")
    }

    /// Sign in or up. Returns false when the user leaves instead.
    async fn auth_screen(&mut self) -> Result<bool> {
        println!("\n=== todolist ===\n");

        loop {
            Self::prompt("Sign in or create an account? [I/u/q]: ")?;
            let Some(choice) = self.read_line().await? else {
                return Ok(false);
            };
            let mode = match choice.to_lowercase().as_str() {
                "" | "i" | "in" => AuthMode::SignIn,
                "u" | "up" => AuthMode::SignUp,
                "q" | "quit" => return Ok(false),
                _ => {
                    println!("Please answer i, u, or q.");
                    continue;
                }
            };

            let email = match self.config.last_email.clone() {
                Some(last) => {
                    Self::prompt(&format!("Email [{}]: ", last))?;
                    match self.read_line().await? {
                        Some(input) if input.is_empty() => last,
                        Some(input) => input,
                        None => return Ok(false),
                    }
                }
                None => {
                    Self::prompt("Email: ")?;
                    match self.read_line().await? {
                        Some(input) => input,
                        None => return Ok(false),
                    }
                }
            };
            let password = Self::read_password().await?;

            let credentials = Credentials::new(&email, password);
            if let Err(e) = credentials.validate() {
                println!("{}", e);
                continue;
            }

            println!("\nAuthenticating...");
            match self.session.authenticate(mode, &credentials).await {
                Ok(session) => {
                    self.config.last_email = Some(email);
                    if let Err(e) = self.config.save() {
                        warn!(error = %e, "Failed to save config");
                    }
                    println!(
                        "Signed in as {} (session valid for {} minutes)",
                        session.email,
                        session.minutes_until_expiry()
                    );
                    return Ok(true);
                }
                Err(e) => println!("{}", e),
            }
        }
    }

    async fn dashboard(&mut self) -> Result<DashboardExit> {
        self.refresh().await;
        self.print_lists(ListFilter::All);
        println!("\nType 'help' for commands.");

        loop {
            Self::prompt("> ")?;

            let line = tokio::select! {
                line = self.input.next_line() => line.context("Failed to read from stdin")?,
                redirect = self.redirects.recv() => {
                    let reason = match redirect {
                        Ok(redirect) => redirect.reason,
                        Err(RecvError::Lagged(_)) | Err(RecvError::Closed) => LogoutReason::Requested,
                    };
                    return Ok(DashboardExit::SignedOut(reason));
                }
            };

            let Some(line) = line else {
                return Ok(DashboardExit::Quit);
            };

            match Command::parse(&line) {
                Ok(Command::Quit) => return Ok(DashboardExit::Quit),
                Ok(command) => self.execute(command).await,
                Err(message) if message.is_empty() => {}
                Err(message) => println!("{}", message),
            }
        }
    }

    async fn execute(&mut self, command: Command) {
        match command {
            Command::List(filter) => self.print_lists(filter),
            Command::Search(query) => {
                self.tasks.state().set_search_query(&query);
                self.print_lists(ListFilter::All);
            }
            Command::Add { priority, text } => match self.tasks.add(&text, priority).await {
                Ok(task) => println!("Added: {} ({})", task.text, task.priority),
                Err(e) => println!("{}", e),
            },
            Command::Toggle(target) => {
                let Some(id) = self.resolve_target(&target) else {
                    println!("No task '{}' in the last listing", target);
                    return;
                };
                match self.tasks.toggle(&id).await {
                    Ok(task) if task.completed => println!("Done: {}", task.text),
                    Ok(task) => println!("Reopened: {}", task.text),
                    Err(e) => println!("{}", e),
                }
            }
            Command::Refresh => {
                self.refresh().await;
                self.print_lists(ListFilter::All);
            }
            Command::Whoami => match self.session.current() {
                Some(session) => {
                    let counts = self.tasks.state().counts();
                    println!(
                        "{} ({} minutes left, {} open, {} done)",
                        session.email,
                        session.minutes_until_expiry(),
                        counts.open,
                        counts.done
                    )
                }
                None => println!("Not signed in"),
            },
            Command::Logout => {
                info!("Logout requested");
                self.session.logout();
            }
            Command::Help => println!("{}", HELP),
            Command::Quit => {}
        }
    }

    async fn refresh(&mut self) {
        match self.tasks.load().await {
            Ok(count) => debug!(count, "Tasks refreshed"),
            Err(e) => println!("{}", e),
        }
    }

    fn resolve_target(&self, target: &str) -> Option<TaskId> {
        if let Ok(row) = target.parse::<usize>() {
            return row
                .checked_sub(1)
                .and_then(|index| self.last_listed.get(index))
                .cloned();
        }
        let id = TaskId::new(target);
        self.tasks.state().get(&id).map(|task| task.id)
    }

    fn print_lists(&mut self, filter: ListFilter) {
        let state = self.tasks.state();
        let query = state.search_query();
        let sections: Vec<(&str, Vec<Task>)> = match filter {
            ListFilter::All => vec![("To do", state.filtered(false)), ("Done", state.filtered(true))],
            ListFilter::Open => vec![("To do", state.filtered(false))],
            ListFilter::Done => vec![("Done", state.filtered(true))],
        };

        if !query.is_empty() {
            println!("\n(search: \"{}\")", query);
        }

        self.last_listed.clear();
        for (title, tasks) in sections {
            println!("\n{} ({})", title, tasks.len());
            if tasks.is_empty() {
                println!("  nothing here");
            }
            for task in tasks {
                self.last_listed.push(task.id.clone());
                println!(
                    "  {:>2}. {} {:<6} {}  [{}]",
                    self.last_listed.len(),
                    task.status_marker(),
                    task.priority,
                    truncate_string(&task.text, MAX_ROW_TEXT),
                    task.toggle_label()
                );
            }
        }
    }
}
