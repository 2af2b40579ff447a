//! chat-session - terminal client for the chat API
//!
//! Signs in, loads the conversation list and reads commands or chat
//! messages from stdin, one per line.

use chat_session::api::{build_http_client, AuthClient, AuthSession, HttpChatApi, Sender, User};
use chat_session::config::{ClientConfig, Credentials};
use chat_session::directory::Directory;
use chat_session::render::{render_markdown, render_message};
use chat_session::runtime::{SessionHandle, SessionRuntime, SessionSnapshot, SessionUpdate};
use std::io::{IsTerminal, Write};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const HELP: &str = "\
Commands:
  /list                list conversations
  /new                 start a new conversation
  /open N              open conversation N
  /rename N TITLE      rename conversation N
  /delete N            delete conversation N
  /search TEXT         find conversations by title
  /logout              sign out and exit (also /quit)
  /help                show this help
Anything else is sent as a message.";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    List,
    New,
    Open(usize),
    Rename(usize, String),
    Delete(usize),
    Search(String),
    Logout,
    Help,
    Send(String),
}

impl Command {
    /// Parse one input line. Conversation numbers are 1-based as listed.
    fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Command::Send(line.to_string()));
        };

        let (name, args) = match rest.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (rest, ""),
        };

        match name {
            "list" | "ls" => Ok(Command::List),
            "new" => Ok(Command::New),
            "open" => Ok(Command::Open(parse_index(args)?)),
            "delete" | "rm" => Ok(Command::Delete(parse_index(args)?)),
            "rename" => {
                let (index, title) = args
                    .split_once(char::is_whitespace)
                    .ok_or("usage: /rename N TITLE")?;
                Ok(Command::Rename(parse_index(index)?, title.trim().to_string()))
            }
            "search" => Ok(Command::Search(args.to_string())),
            "logout" | "quit" | "exit" => Ok(Command::Logout),
            "help" | "?" => Ok(Command::Help),
            other => Err(format!("unknown command /{other}, try /help")),
        }
    }

    /// Question to ask before running a destructive command
    fn confirmation(&self) -> Option<&'static str> {
        match self {
            Command::Delete(_) => Some("Delete this chat permanently?"),
            Command::Logout => Some("Are you sure you want to logout?"),
            _ => None,
        }
    }
}

/// Ask a y/N question on stdout and read the answer. End of input is a no.
async fn confirm<R>(lines: &mut Lines<R>, question: &str) -> std::io::Result<bool>
where
    R: AsyncBufRead + Unpin,
{
    print!("{question} [y/N] ");
    std::io::stdout().flush()?;
    let answer = lines.next_line().await?.unwrap_or_default();
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn parse_index(arg: &str) -> Result<usize, String> {
    match arg.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("expected a conversation number, got {arg:?}")),
    }
}

#[derive(Debug, Default)]
struct Args {
    register: Option<String>,
    help: bool,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args, String> {
    let mut parsed = Args::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--register" => {
                parsed.register = Some(args.next().ok_or("--register needs a NAME")?);
            }
            "-h" | "--help" => parsed.help = true,
            other => return Err(format!("unexpected argument {other:?}")),
        }
    }
    Ok(parsed)
}

struct Repl {
    handle: SessionHandle,
    user: User,
    assistant_name: String,
    placeholder: String,
    ansi: bool,
}

impl Repl {
    async fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        print_conversations(&self.handle.settled().await?);
        self.print_welcome();

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let command = match Command::parse(&line) {
                Ok(command) => command,
                Err(message) => {
                    eprintln!("{message}");
                    continue;
                }
            };
            if let Some(question) = command.confirmation() {
                if !confirm(&mut lines, question).await? {
                    println!("Cancelled.");
                    continue;
                }
            }
            if command == Command::Logout {
                break;
            }
            self.execute(command).await?;
        }

        self.handle.shutdown();
        println!("Signed out.");
        Ok(())
    }

    async fn execute(&self, command: Command) -> Result<(), Box<dyn std::error::Error>> {
        match command {
            Command::Send(text) => {
                let before = self.handle.snapshot().messages.len();
                self.handle.send(text).await?;
                self.print_dim(&self.placeholder);
                let snapshot = self.handle.settled().await?;
                for message in snapshot
                    .messages
                    .iter()
                    .skip(before)
                    .filter(|m| m.sender == Sender::Bot)
                {
                    println!("{}", render_message(message, &self.assistant_name, self.ansi));
                }
            }
            Command::List => print_conversations(&self.handle.settled().await?),
            Command::New => {
                self.handle.new_conversation().await?;
                self.handle.settled().await?;
                self.print_welcome();
            }
            Command::Open(n) => {
                let Some(id) = self.conversation_id(n) else {
                    return Ok(());
                };
                self.handle.open(id).await?;
                let snapshot = self.handle.settled().await?;
                if let Some(conversation) = snapshot.active_conversation() {
                    println!("== {} ==", conversation.display_title());
                }
                if snapshot.messages.is_empty() {
                    self.print_welcome();
                }
                for message in &snapshot.messages {
                    println!("{}", render_message(message, &self.assistant_name, self.ansi));
                }
            }
            Command::Rename(n, title) => {
                let Some(id) = self.conversation_id(n) else {
                    return Ok(());
                };
                self.handle.rename(id, title).await?;
                print_conversations(&self.handle.settled().await?);
            }
            Command::Delete(n) => {
                let Some(id) = self.conversation_id(n) else {
                    return Ok(());
                };
                self.handle.delete(id).await?;
                print_conversations(&self.handle.settled().await?);
            }
            Command::Search(query) => {
                let snapshot = self.handle.snapshot();
                let directory = Directory::new(snapshot.conversations.clone());
                let matches = directory.search(&query);
                if matches.is_empty() {
                    println!("No conversations match {query:?}");
                }
                for conversation in matches {
                    let index = snapshot
                        .conversations
                        .iter()
                        .position(|c| c.id == conversation.id)
                        .unwrap_or_default();
                    println!("{:>3}. {}", index + 1, conversation.display_title());
                }
            }
            Command::Help => println!("{HELP}"),
            Command::Logout => {}
        }
        Ok(())
    }

    /// Map a listed number to its conversation id
    fn conversation_id(&self, n: usize) -> Option<String> {
        let conversations = self.handle.conversations();
        let id = conversations.get(n - 1).map(|c| c.id.clone());
        if id.is_none() {
            eprintln!("No conversation {n}; there are {}", conversations.len());
        }
        id
    }

    fn print_welcome(&self) {
        let greeting = if self.user.name.is_empty() {
            "# Welcome".to_string()
        } else {
            format!("# Welcome, {}", self.user.name)
        };
        println!(
            "{}",
            render_markdown(
                &format!("{greeting}\n\nAsk me about placements, careers, interviews, and skills."),
                self.ansi
            )
        );
    }

    fn print_dim(&self, text: &str) {
        if self.ansi {
            println!("\x1b[2m{text}\x1b[0m");
        } else {
            println!("{text}");
        }
    }
}

fn print_conversations(snapshot: &SessionSnapshot) {
    if snapshot.conversations.is_empty() {
        println!("No conversations yet.");
        return;
    }
    for (i, conversation) in snapshot.conversations.iter().enumerate() {
        let marker = if snapshot.active.as_deref() == Some(conversation.id.as_str()) {
            '*'
        } else {
            ' '
        };
        println!("{marker}{:>3}. {}", i + 1, conversation.display_title());
    }
}

/// Print failures reported by the runtime until it stops
async fn report_updates(mut updates: broadcast::Receiver<SessionUpdate>) {
    loop {
        match updates.recv().await {
            Ok(SessionUpdate::Error { operation, message }) => {
                eprintln!("Could not {operation}: {message}");
            }
            Ok(SessionUpdate::DispatchSettled { outcome }) => {
                tracing::debug!(?outcome, "Dispatch settled");
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Update listener lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

async fn sign_in(
    config: &ClientConfig,
    auth: &AuthClient,
    register: Option<&str>,
) -> Result<AuthSession, Box<dyn std::error::Error>> {
    let credentials = config.require_credentials()?;

    if let Some(name) = register {
        let Credentials::Password { email, password } = credentials else {
            return Err("--register needs CHAT_EMAIL and CHAT_PASSWORD".into());
        };
        auth.register(name, email, password).await?;
        tracing::info!(%email, "Registered account");
    }

    match credentials {
        Credentials::Token(token) => Ok(AuthSession::new(token.clone(), User::default())),
        Credentials::Password { email, password } => Ok(auth.login(email, password).await?),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = parse_args(std::env::args().skip(1))?;
    if args.help {
        println!("Usage: chat-session [--register NAME]\n\n{HELP}");
        return Ok(());
    }

    let config = ClientConfig::from_env()?;

    // Logs go to stderr so they don't interleave with the conversation
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_session=info".into()),
        )
        .with(config.log_json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr)
        }))
        .with((!config.log_json).then(|| {
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
        }))
        .init();

    tracing::info!(api_url = %config.api_url, "Starting chat session");

    let client = build_http_client(config.http_timeout)?;
    let auth = AuthClient::new(client.clone(), config.api_url.clone());
    let session = sign_in(&config, &auth, args.register.as_deref()).await?;
    let user = session.user.clone();

    let api = Arc::new(HttpChatApi::new(client, config.api_url.clone(), session));
    let context = config.session_context();
    let placeholder = context.placeholder_text.clone();
    let handle = SessionRuntime::spawn(context, api);
    // Subscribe first so a failed initial listing is still reported
    tokio::spawn(report_updates(handle.subscribe()));
    handle.refresh().await?;

    let repl = Repl {
        handle,
        user,
        assistant_name: config.assistant_name.clone(),
        placeholder,
        ansi: std::io::stdout().is_terminal(),
    };
    repl.run().await
}
