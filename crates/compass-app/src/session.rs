//! Interactive terminal session over a [`ConversationEngine`].

use std::io::Write;
use std::path::PathBuf;

use tokio::io::{AsyncBufReadExt, BufReader};

use compass_chat::export::write_transcript;
use compass_chat::{ConversationEngine, MessageRole};
use compass_core::config::{CompassConfig, ExportFormat};
use compass_core::{Permission, Role};

/// One parsed input line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Ask(String),
    Suggest,
    /// 1-based index into the current suggestions.
    Pick(usize),
    Reset,
    Export(Option<ExportFormat>),
    History,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Command {
        let line = line.trim();
        if line.is_empty() {
            return Command::Empty;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Command::Ask(line.to_string());
        };

        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let arg = parts.next();

        match name {
            "suggest" | "s" => Command::Suggest,
            "reset" => Command::Reset,
            "history" => Command::History,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            "export" => match arg {
                None => Command::Export(None),
                Some(fmt) => match fmt.parse::<ExportFormat>() {
                    Ok(format) => Command::Export(Some(format)),
                    Err(_) => Command::Unknown(line.to_string()),
                },
            },
            n => match n.parse::<usize>() {
                Ok(index) if index > 0 => Command::Pick(index),
                _ => Command::Unknown(line.to_string()),
            },
        }
    }
}

const HELP: &str = "\
Type a question and press enter.
  /suggest        list suggested questions
  /<n>            ask suggestion n
  /reset          start a new conversation
  /export [fmt]   save the transcript (txt or json)
  /history        show the conversation so far
  /quit           leave";

/// Terminal front end for one conversation.
pub struct Session {
    engine: ConversationEngine,
    role: Role,
    label: String,
    export_dir: PathBuf,
    export_format: ExportFormat,
}

impl Session {
    pub fn new(engine: ConversationEngine, config: &CompassConfig) -> Self {
        Self {
            engine,
            role: config.general.role,
            label: config.chat.assistant_label.clone(),
            export_dir: PathBuf::from(&config.export.dir),
            export_format: config.export.format,
        }
    }

    /// Read commands from stdin until `/quit` or end of input.
    pub async fn run(&self) -> std::io::Result<()> {
        self.spawn_thinking_indicator();

        println!("{}. Type /help for commands.\n", self.label);
        self.print_suggestions();

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            if !self.handle(Command::parse(&line)).await {
                break;
            }
        }

        tracing::info!("Session ended");
        Ok(())
    }

    /// Execute one command. Returns `false` when the session should end.
    async fn handle(&self, command: Command) -> bool {
        match command {
            Command::Empty => {}
            Command::Ask(text) => self.ask(&text).await,
            Command::Pick(index) => match index
                .checked_sub(1)
                .and_then(|i| self.engine.suggested_questions().get(i).cloned())
            {
                Some(question) => {
                    println!("You: {}", question);
                    self.ask(&question).await;
                }
                None => println!("No suggestion {}. Try /suggest.", index),
            },
            Command::Suggest => self.print_suggestions(),
            Command::Reset => {
                self.engine.reset();
                println!("Started a new conversation.\n");
                self.print_suggestions();
            }
            Command::Export(format) => self.export(format.unwrap_or(self.export_format)),
            Command::History => self.print_history(),
            Command::Help => println!("{}", HELP),
            Command::Quit => return false,
            Command::Unknown(input) => println!("Unknown command: {}. Type /help.", input),
        }
        true
    }

    async fn ask(&self, text: &str) {
        match self.engine.ask(text).await {
            Ok(Some(reply)) => {
                println!("\n{}: {}\n", self.label, reply.content);
                self.print_suggestions();
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Question not submitted");
                println!("{}", e);
            }
        }
    }

    fn export(&self, format: ExportFormat) {
        if let Err(e) = self.role.require(Permission::ExportInsights) {
            println!("{}", e);
            return;
        }

        let messages = self.engine.messages();
        let today = chrono::Local::now().date_naive();
        match write_transcript(&self.export_dir, &messages, format, &self.label, today) {
            Ok(path) => println!("Transcript saved to {}", path.display()),
            Err(e) => {
                tracing::error!(error = %e, "Transcript export failed");
                println!("Export failed: {}", e);
            }
        }
    }

    fn print_suggestions(&self) {
        let suggestions = self.engine.suggested_questions();
        if suggestions.is_empty() {
            return;
        }
        println!("Suggested questions:");
        for (i, q) in suggestions.iter().enumerate() {
            println!("  /{} {}", i + 1, q);
        }
        println!();
    }

    fn print_history(&self) {
        let messages = self.engine.messages();
        if messages.is_empty() {
            println!("No messages yet.");
            return;
        }
        for m in messages {
            let speaker = match m.role {
                MessageRole::User => "You",
                MessageRole::Assistant => self.label.as_str(),
            };
            println!(
                "[{}] {}: {}\n",
                m.timestamp.format("%H:%M:%S"),
                speaker,
                m.content
            );
        }
    }

    /// Print a notice whenever the engine starts "thinking".
    fn spawn_thinking_indicator(&self) {
        let mut updates = self.engine.subscribe();
        let label = self.label.clone();
        tokio::spawn(async move {
            let mut responding = false;
            while updates.changed().await.is_ok() {
                let now = updates.borrow_and_update().is_responding();
                if now && !responding {
                    eprintln!("{} is thinking...", label);
                }
                responding = now;
            }
        });
    }
}
