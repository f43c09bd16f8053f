use std::sync::{Arc, Mutex, PoisonError};

use rustyline::{history::MemHistory, Editor, ExternalPrinter};
use snafu::{ResultExt, Snafu};
use tokio::task::JoinHandle;

use crate::app::App;
use crate::model::{VideoId, CATEGORIES};
use crate::service::access::{Login, Selection, UnlockState};
use crate::service::gateway::Backend;

mod parse;
mod render;

type Line = rustyline::Result<String>;

/// Line editor that reads on a blocking thread, so the prompt can wait alongside other work.
pub struct Repl {
    editor: Arc<Mutex<Editor<(), MemHistory>>>,
    printer: Option<Box<dyn ExternalPrinter + Send>>,
    pending: Option<JoinHandle<Line>>,
    message: Option<String>,
}

impl Repl {
    pub fn new() -> Result<Self, ReplError> {
        let config = rustyline::Config::default();
        let mut editor =
            rustyline::Editor::with_history(config, MemHistory::new()).context(RustylineSnafu)?;

        // not available when stdin or stdout is not a terminal
        let printer = match editor.create_external_printer() {
            Ok(printer) => Some(Box::new(printer) as Box<dyn ExternalPrinter + Send>),
            Err(error) => {
                tracing::debug!(%error, "no external printer, printing directly");
                None
            }
        };

        let repl = Self {
            editor: Arc::new(Mutex::new(editor)),
            printer,
            pending: None,
            message: None,
        };
        Ok(repl)
    }

    /// Read and parse one command.
    ///
    /// Cancel safe: a line still being typed when the future is dropped is picked up by the next call.
    pub async fn prompt(&mut self) -> Action {
        if self.pending.is_none() {
            self.pending = Some(self.read_line());
        }

        let Some(pending) = self.pending.as_mut() else {
            return Action::None;
        };

        let line = pending.await;
        self.pending = None;

        let input = match line {
            Ok(Ok(input)) => input,
            Ok(Err(error)) => {
                tracing::debug!(%error, "input closed");
                return Action::Exit;
            }
            Err(error) => {
                tracing::error!(%error, "input task failed");
                return Action::Exit;
            }
        };

        self.editor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .add_history_entry(input.as_str())
            .ok();

        match parse::parse(&input) {
            Ok(action) => action,
            Err(err) => {
                self.reply(err.to_string());
                Action::None
            }
        }
    }

    fn read_line(&mut self) -> JoinHandle<Line> {
        let message = self
            .message
            .take()
            .map(|msg| format!("{msg}\n"))
            .unwrap_or_default();
        let prompt = format!("{}coursegate> ", message);
        let editor = Arc::clone(&self.editor);

        tokio::task::spawn_blocking(move || {
            editor
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .readline(&prompt)
        })
    }

    /// Whether a line is being read right now.
    pub fn is_reading(&self) -> bool {
        self.pending.is_some()
    }

    /// Queue `message` for the next prompt.
    pub fn reply(&mut self, message: impl Into<String>) {
        let message = message.into();

        if let Some(msg) = self.message.as_mut() {
            msg.push('\n');
            msg.push_str(&message);
        } else {
            self.message = Some(message);
        }
    }

    /// Show `message` right away, above the line being typed.
    pub fn announce(&mut self, message: impl Into<String>) {
        let message = message.into();

        if !self.is_reading() {
            return self.reply(message);
        }

        match self.printer.as_mut() {
            Some(printer) => {
                if let Err(error) = printer.print(message) {
                    tracing::warn!(%error, "could not print above the prompt");
                }
            }
            None => println!("{message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Action {
    List,
    Search { term: String },
    Category { name: String },
    Categories,
    Refresh,
    Open { video_id: VideoId },
    Login { student_id: String, password: String },
    Cancel,
    Logout,
    Close,
    Retry,
    Pause,
    Play,
    Status,
    External,
    Material,
    Help,
    Exit,
    None,
}

#[derive(Debug, Snafu)]
pub enum ReplError {
    #[snafu(display("failed to initialize REPL: {}", source))]
    Rustyline {
        source: rustyline::error::ReadlineError,
    },
}

pub async fn start<B: Backend>(repl: &mut Repl, app: &mut App<B>) -> Result<(), ReplError> {
    tracing::info!("starting REPL");

    match app.refresh().await {
        Ok(_) => repl.reply(render::catalog(&app.catalog, app.profile().student().await.as_ref())),
        Err(error) => repl.reply(render::banner(&error.message())),
    }
    repl.reply(render::HELP);

    loop {
        let command = tokio::select! {
            action = repl.prompt() => Some(action),
            () = app.answered(), if app.is_unlocking() => None,
        };

        let Some(action) = command else {
            unlock_answered(repl, app).await;
            continue;
        };

        match action {
            Action::Exit => break,
            Action::List => {
                let student = app.profile().student().await;
                repl.reply(render::catalog(&app.catalog, student.as_ref()));
            }
            Action::Search { term } => {
                app.catalog.set_term(term);
                let student = app.profile().student().await;
                repl.reply(render::catalog(&app.catalog, student.as_ref()));
            }
            Action::Category { name } => {
                app.catalog.set_category(name);
                let student = app.profile().student().await;
                repl.reply(render::catalog(&app.catalog, student.as_ref()));
            }
            Action::Categories => {
                let current = app.catalog.category().trim().to_string();
                let categories = CATEGORIES
                    .iter()
                    .map(|name| {
                        let marker = if *name == current { '*' } else { ' ' };
                        format!("{marker} {name}")
                    })
                    .collect::<Vec<_>>()
                    .join("\n");

                repl.reply(categories);
            }
            Action::Refresh => match app.refresh().await {
                Ok(count) => repl.reply(format!("loaded {count} videos")),
                Err(error) => repl.reply(render::banner(&error.message())),
            },
            Action::Open { video_id } => match app.open(&video_id).await {
                None => repl.reply(format!("no video `{video_id}` in the catalog")),
                Some(Selection::AuthRequired) => repl.reply(render::LOGIN_PROMPT),
                Some(Selection::Unlocking) => repl.reply(render::session(app.session())),
            },
            Action::Login {
                student_id,
                password,
            } => match app.login(&student_id, &password).await {
                Ok(Login::SignedIn) => {
                    let student = app.profile().student().await;
                    repl.reply(render::student(student.as_ref()));
                }
                Ok(Login::Resumed) => {
                    let student = app.profile().student().await;
                    repl.reply(render::student(student.as_ref()));
                    repl.reply(render::session(app.session()));
                }
                Err(error) => repl.reply(format!("login failed: {error}")),
            },
            Action::Cancel => {
                if app.dismiss_login().is_some() {
                    repl.reply("login cancelled");
                }
            }
            Action::Logout => {
                app.logout().await;
                repl.reply("signed out");
            }
            Action::Close => {
                if app.close() {
                    repl.reply("player closed");
                }
            }
            Action::Retry => match app.retry().await {
                Some(Selection::Unlocking) => repl.reply(render::session(app.session())),
                Some(Selection::AuthRequired) => repl.reply(render::LOGIN_PROMPT),
                None => repl.reply("nothing to retry"),
            },
            Action::Pause => {
                if !app.pause() {
                    repl.reply("nothing is playing");
                }
            }
            Action::Play => {
                if !app.resume() {
                    repl.reply("nothing is playing");
                }
            }
            Action::Status => {
                let student = app.profile().student().await;
                repl.reply(render::student(student.as_ref()));
                repl.reply(render::session(app.session()));
            }
            Action::External => match app.session().and_then(|session| session.playback()) {
                Some(playback) => repl.reply(format!("open externally: {}", playback.video_url)),
                None => repl.reply("no unlocked video"),
            },
            Action::Material => {
                let link = app
                    .session()
                    .and_then(|session| session.playback())
                    .and_then(|playback| playback.material_link.clone());

                match link {
                    Some(link) => repl.reply(format!("material: {link}")),
                    None => repl.reply("no material for this video"),
                }
            }
            Action::Help => repl.reply(render::HELP),
            Action::None => continue,
        }
    }

    app.close();
    Ok(())
}

async fn unlock_answered<B: Backend>(repl: &mut Repl, app: &mut App<B>) {
    let failed = matches!(app.settle().await, Some(UnlockState::Error(_)));

    let mut lines = vec![render::session(app.session())];
    if failed {
        lines.push(render::RETRY_HINT.to_string());
    }

    repl.announce(lines.join("\n"));
}
