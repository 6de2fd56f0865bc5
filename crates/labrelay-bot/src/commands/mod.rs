//! Chat command parsing and dispatch.
//!
//! A command is a message starting with the configured prefix:
//!
//! ```text
//! !gitlab issue create myorg/myrepo Crash on start
//! The app crashes when the config is empty.
//! ```
//!
//! The first line holds the verb and its arguments, every following line is
//! the body.

mod commit;
mod general;
mod issue;

use std::borrow::Cow;
use std::fmt::Write as _;

use chrono::{DateTime, FixedOffset};
use labrelay_core::{escape_html, OptionsConfig};
use tracing::{debug, info};

use crate::session::{Session, SessionResolver};

pub use commit::DiffLineKind;
pub use issue::IssueVerb;

/// One parsed command message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub verb: String,
    pub args: Vec<String>,
    pub body: Vec<String>,
}

impl Invocation {
    /// Parses `text`, or returns `None` when it does not start with `prefix`.
    pub fn parse(prefix: &str, text: &str) -> Option<Self> {
        let rest = text.strip_prefix(prefix)?;
        if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
            return None;
        }

        let mut lines = rest.lines();
        let mut words = lines.next().unwrap_or_default().split_whitespace();
        let verb = words.next().unwrap_or_default().to_string();
        let args = words.map(str::to_string).collect();
        let body = lines.map(str::to_string).collect();

        Some(Self { verb, args, body })
    }
}

/// Top-level command verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Ping,
    Server,
    Login,
    Logout,
    Whoami,
    Show,
    Diff,
    Log,
    Issue,
    Help,
}

impl Verb {
    /// Every accepted spelling, aliases included.
    const NAMES: [(&'static str, Verb); 11] = [
        ("ping", Verb::Ping),
        ("server", Verb::Server),
        ("login", Verb::Login),
        ("logout", Verb::Logout),
        ("whoami", Verb::Whoami),
        ("show", Verb::Show),
        ("commit", Verb::Show),
        ("diff", Verb::Diff),
        ("log", Verb::Log),
        ("issue", Verb::Issue),
        ("help", Verb::Help),
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::NAMES
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(name))
            .map(|(_, verb)| *verb)
    }

    /// Verbs that work without a stored GitLab token.
    pub fn allowed_without_session(self) -> bool {
        matches!(self, Verb::Ping | Verb::Server | Verb::Login | Verb::Help)
    }
}

/// What to send back to the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Html(String),
    /// Several messages, sent in order.
    Many(Vec<Reply>),
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Text(text.into())
    }

    pub fn html(html: impl Into<String>) -> Self {
        Reply::Html(html.into())
    }

    /// The message body, whichever format it is in. Parts of a
    /// [`Reply::Many`] are joined with newlines.
    pub fn body(&self) -> Cow<'_, str> {
        match self {
            Reply::Text(body) | Reply::Html(body) => Cow::Borrowed(body),
            Reply::Many(parts) => Cow::Owned(
                parts
                    .iter()
                    .map(|part| part.body())
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
        }
    }

    /// The single messages to send, in order.
    pub fn messages(&self) -> Vec<&Reply> {
        match self {
            Reply::Many(parts) => parts.iter().flat_map(Reply::messages).collect(),
            single => vec![single],
        }
    }
}

/// Options the handlers need from the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSettings {
    pub prefix: String,
    /// `strftime` pattern for timestamps.
    pub time_format: String,
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self::from(&OptionsConfig::default())
    }
}

impl From<&OptionsConfig> for CommandSettings {
    fn from(options: &OptionsConfig) -> Self {
        Self {
            prefix: options.command_prefix.clone(),
            time_format: options.time_format.clone(),
        }
    }
}

/// Everything a handler gets besides the GitLab session.
#[derive(Clone, Copy)]
pub(crate) struct CommandContext<'a> {
    pub settings: &'a CommandSettings,
    pub domain: &'a str,
    pub host: &'a str,
    pub sender: &'a str,
    pub args: &'a [String],
    pub body: &'a [String],
}

impl<'a> CommandContext<'a> {
    /// The context for a sub-command: the first argument is consumed.
    pub fn shifted(self) -> Self {
        Self {
            args: self.args.get(1..).unwrap_or_default(),
            ..self
        }
    }

    /// Prefix as it appears in replies.
    pub fn prefix(&self) -> String {
        escape_html(&self.settings.prefix)
    }

    /// `Usage: <code>!gitlab {syntax}</code>`; `syntax` must already be escaped.
    pub fn usage(&self, syntax: &str) -> Reply {
        Reply::html(format!("Usage: <code>{} {}</code>", self.prefix(), syntax))
    }

    pub fn format_time(&self, time: &DateTime<FixedOffset>) -> String {
        let mut out = String::new();
        if write!(out, "{}", time.format(&self.settings.time_format)).is_err() {
            return time.to_rfc3339();
        }
        out
    }
}

/// Reply for a verb nobody registered.
pub(crate) fn unknown_command(ctx: &CommandContext<'_>) -> Reply {
    Reply::html(format!(
        "Unknown command. Type <code>{} help</code> for help.",
        ctx.prefix()
    ))
}

/// Reply for a verb that needs a GitLab token the user has not given.
pub(crate) fn auth_required(ctx: &CommandContext<'_>) -> Reply {
    Reply::html(format!(
        "That command can only be used if you're logged in.\nTry <code>{} login &lt;access token&gt;</code>",
        ctx.prefix()
    ))
}

/// Parses a positional number, falling back to `default` when absent.
///
/// `Err` means the argument is present but not a positive number.
pub(crate) fn optional_number(args: &[String], index: usize, default: u32) -> Result<u32, ()> {
    match args.get(index) {
        None => Ok(default),
        Some(arg) => arg.parse::<u32>().ok().filter(|n| *n > 0).ok_or(()),
    }
}

/// Routes commands from chat users to their handlers.
pub struct CommandRouter {
    sessions: SessionResolver,
    settings: CommandSettings,
}

impl CommandRouter {
    pub fn new(sessions: SessionResolver, settings: CommandSettings) -> Self {
        Self { sessions, settings }
    }

    pub fn sessions(&self) -> &SessionResolver {
        &self.sessions
    }

    pub fn settings(&self) -> &CommandSettings {
        &self.settings
    }

    /// Handles one chat message. `None` means nothing is sent back.
    pub async fn handle_message(&self, room_id: &str, sender: &str, text: &str) -> Option<Reply> {
        let invocation = Invocation::parse(&self.settings.prefix, text)?;
        self.dispatch(room_id, sender, &invocation).await
    }

    /// Runs a parsed command for `sender`.
    pub async fn dispatch(
        &self,
        room_id: &str,
        sender: &str,
        invocation: &Invocation,
    ) -> Option<Reply> {
        let ctx = CommandContext {
            settings: &self.settings,
            domain: self.sessions.domain(),
            host: self.sessions.host(),
            sender,
            args: &invocation.args,
            body: &invocation.body,
        };

        let Some(verb) = Verb::from_name(&invocation.verb) else {
            debug!(room = %room_id, verb = %invocation.verb, "Unknown command");
            return Some(unknown_command(&ctx));
        };

        let session = self.sessions.resolve(sender);
        if session.is_none() && !verb.allowed_without_session() {
            debug!(room = %room_id, sender = %sender, verb = ?verb, "Command needs login");
            return Some(auth_required(&ctx));
        }
        info!(room = %room_id, sender = %sender, verb = ?verb, "Command dispatched");

        match verb {
            Verb::Ping => Some(general::ping()),
            Verb::Server => Some(general::server(&ctx)),
            Verb::Login => {
                Some(general::login(&ctx, &self.sessions, session.is_some()).await)
            }
            Verb::Help => Some(general::help(&ctx, session.is_some())),
            _ => {
                let session: Session = session?;
                self.dispatch_authenticated(verb, &ctx, session.as_ref()).await
            }
        }
    }

    async fn dispatch_authenticated(
        &self,
        verb: Verb,
        ctx: &CommandContext<'_>,
        api: &dyn labrelay_gitlab::GitlabApi,
    ) -> Option<Reply> {
        match verb {
            Verb::Logout => Some(general::logout(ctx, &self.sessions)),
            Verb::Whoami => Some(general::whoami(ctx, api).await),
            Verb::Show => Some(commit::show(ctx, api).await),
            Verb::Diff => Some(commit::diff(ctx, api).await),
            Verb::Log => Some(commit::log(ctx, api).await),
            Verb::Issue => issue::dispatch(ctx, api).await,
            Verb::Ping | Verb::Server | Verb::Login | Verb::Help => None,
        }
    }
}
