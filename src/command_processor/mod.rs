use crate::config::Config;
use crate::controller::Controller;
use crate::forms::{Form, FormField};
use crate::terminal::Terminal;
use anyhow::{Result, anyhow};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

pub mod appointment_handler;
pub mod auth_handler;
pub mod config_handler;
pub mod contact_handler;
pub mod exit_handler;
pub mod help_handler;
pub mod tab_handler;
pub mod version_handler;

/// Command line arguments structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandArgs {
    pub command: String,
    pub args: Vec<String>,
    pub flags: HashMap<String, Option<String>>,
}

impl CommandArgs {
    pub fn new(command: String, args: Vec<String>, flags: HashMap<String, Option<String>>) -> Self {
        Self { command, args, flags }
    }

    /// Tokenizes one line of interactive input. `--name value` pairs become
    /// flags; a flag followed by another flag or nothing has no value.
    pub fn parse(input: &str) -> Result<Self> {
        let normalized_input = preprocess_input(input);
        let tokens = shell_words::split(&normalized_input)
            .map_err(|e| anyhow!("Entrada inválida: {}", e))?;
        debug!("Tokenized input: {:?}", tokens);
        let mut tokens_iter = tokens.into_iter();
        let first_token = tokens_iter.next().ok_or_else(|| anyhow!("No command provided"))?;
        let command = if first_token.eq_ignore_ascii_case("agenda") {
            tokens_iter
                .next()
                .ok_or_else(|| anyhow!("No command provided after 'agenda'"))?
                .to_lowercase()
        } else {
            first_token.to_lowercase()
        };
        let mut args = Vec::new();
        let mut flags = HashMap::new();
        let mut current_flag: Option<String> = None;
        for token in tokens_iter {
            if let Some(name) = token.strip_prefix("--").filter(|n| !n.is_empty()) {
                if let Some(flag_name) = current_flag.take() {
                    flags.insert(flag_name, None);
                }
                current_flag = Some(name.to_lowercase());
            } else if token == "-y" {
                flags.insert("yes".to_string(), None);
            } else if let Some(flag_name) = current_flag.take() {
                flags.insert(flag_name, Some(token));
            } else {
                args.push(token);
            }
        }
        if let Some(flag_name) = current_flag {
            flags.insert(flag_name, None);
        }
        debug!("Final parsed command: {:?}, args: {:?}, flags: {:?}", command, args, flags);
        Ok(CommandArgs { command, args, flags })
    }

    pub fn flag(&self, name: &str) -> Option<&str> {
        self.flags.get(name).and_then(|v| v.as_deref())
    }

    pub fn has_flag(&self, name: &str) -> bool {
        self.flags.contains_key(name)
    }

    /// First positional argument, lowercased.
    pub fn action(&self) -> Option<String> {
        self.args.first().map(|a| a.to_lowercase())
    }
}

/// Standardized input preprocessing function
pub fn preprocess_input(input: &str) -> String {
    input.replace('\u{a0}', " ").trim().to_string()
}

/// Everything a command can read or change.
pub struct AppContext {
    pub controller: Controller,
    pub terminal: Box<dyn Terminal>,
    pub config: Config,
    pub config_path: Option<PathBuf>,
    pub should_exit: bool,
}

impl AppContext {
    pub fn new(controller: Controller, terminal: Box<dyn Terminal>, config: Config) -> Self {
        Self { controller, terminal, config, config_path: None, should_exit: false }
    }

    pub fn with_config_path(mut self, path: PathBuf) -> Self {
        self.config_path = Some(path);
        self
    }

    pub fn print(&mut self, text: &str) {
        self.terminal.print(text);
    }

    pub fn color(&self) -> bool {
        self.config.display.color
    }
}

pub(crate) fn ensure_signed_in(ctx: &AppContext) -> Result<()> {
    if ctx.controller.is_authenticated() {
        Ok(())
    } else {
        Err(anyhow!("No hay una sesión activa. Use 'login' o 'signup'."))
    }
}

/// Answer that empties an optional field while prompting.
pub const CLEAR_ANSWER: &str = "-";

/// Fills `form` from the command's flags. Without any field flag, prompts
/// for every field instead, showing the current value; an empty answer keeps
/// it and [`CLEAR_ANSWER`] empties an optional one. Returns `false` if the
/// user aborted a prompt.
pub(crate) fn fill_form<F: Form>(ctx: &mut AppContext, form: &mut F, args: &CommandArgs) -> Result<bool> {
    let fields = form.fields();
    if fields.iter().any(|f| args.has_flag(f.key())) {
        for field in fields {
            if let Some(value) = args.flag(field.key()) {
                form.set(*field, value.to_string());
            }
        }
        return Ok(true);
    }

    ctx.print(form.title());
    for field in fields {
        let current = form.value(*field).to_string();
        let marker = if field.required() { String::new() } else { format!(" (opcional, '{}' vacía)", CLEAR_ANSWER) };
        let prompt = if current.is_empty() {
            format!("{}{}: ", field.label(), marker)
        } else {
            format!("{}{} [{}]: ", field.label(), marker, current)
        };
        match ctx.terminal.read_line(&prompt)? {
            Some(answer) if answer.trim().is_empty() => {}
            Some(answer) if answer.trim() == CLEAR_ANSWER && !field.required() => {
                form.set(*field, String::new())
            }
            Some(answer) => form.set(*field, answer.trim().to_string()),
            None => return Ok(false),
        }
    }
    Ok(true)
}

pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + 'a>>;

pub trait CommandHandler: Debug + Send + Sync {
    fn execute<'a>(&'a self, ctx: &'a mut AppContext, args: CommandArgs) -> HandlerFuture<'a>;
    fn can_handle(&self, command: &str) -> bool;
}

#[derive(Debug)]
pub struct CommandProcessor {
    handlers: Vec<Box<dyn CommandHandler>>,
}

impl CommandProcessor {
    pub fn new() -> Self {
        let handlers: Vec<Box<dyn CommandHandler>> = vec![
            Box::new(auth_handler::AuthHandler),
            Box::new(contact_handler::ContactHandler),
            Box::new(appointment_handler::AppointmentHandler),
            Box::new(tab_handler::TabHandler),
            Box::new(config_handler::ConfigHandler),
            Box::new(version_handler::VersionHandler),
            Box::new(help_handler::HelpHandler),
            Box::new(exit_handler::ExitHandler),
        ];
        Self { handlers }
    }

    /// Applies pending session events, then runs the matching handler.
    pub async fn execute(&self, ctx: &mut AppContext, args: CommandArgs) -> Result<()> {
        debug!("Attempting to execute command: {}", args.command);
        debug!("Parsed arguments: {:?}", args.args);
        debug!("Parsed flags: {:?}", args.flags);
        ctx.controller.sync_session().await?;

        let command_name = args.command.clone();
        for handler in &self.handlers {
            if handler.can_handle(&command_name) {
                info!("Executing command '{}'", command_name);
                return match handler.execute(ctx, args).await {
                    Ok(()) => {
                        debug!("Command '{}' executed successfully", command_name);
                        Ok(())
                    }
                    Err(e) => {
                        log::error!("Failed to execute command '{}': {}", command_name, e);
                        Err(e)
                    }
                };
            }
        }
        warn!("Unrecognized command: {}", command_name);
        ctx.print("Comando desconocido. Escriba 'help' para ver los comandos disponibles.");
        Ok(())
    }
}

impl Default for CommandProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::list_view::ListView;
    use crate::service::MemoryBackend;
    use crate::terminal::{ScriptedTerminal, Transcript};
    use secrecy::SecretString;
    use std::sync::Arc;

    pub fn context(answers: &[&str]) -> (AppContext, Transcript, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let terminal = ScriptedTerminal::new(answers.iter().copied());
        let transcript = terminal.transcript();
        let mut config = Config::default();
        config.display.color = false;
        let controller = Controller::new(backend.clone(), ListView::default());
        (AppContext::new(controller, Box::new(terminal), config), transcript, backend)
    }

    pub async fn signed_in(answers: &[&str]) -> (AppContext, Transcript, Arc<MemoryBackend>) {
        let (mut ctx, transcript, backend) = context(answers);
        ctx.controller
            .sign_up("ana@x.com", &SecretString::from("secreto".to_string()))
            .await
            .expect("sign up");
        (ctx, transcript, backend)
    }

    pub fn args(line: &str) -> CommandArgs {
        CommandArgs::parse(line).expect("parsable line")
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_keeps_case_of_values() {
        let args = args("Contact add --nombre Ana --apellido \"de la Cruz\" -y");
        assert_eq!(args.command, "contact");
        assert_eq!(args.args, vec!["add".to_string()]);
        assert_eq!(args.flag("nombre"), Some("Ana"));
        assert_eq!(args.flag("apellido"), Some("de la Cruz"));
        assert!(args.has_flag("yes"));
    }

    #[test]
    fn test_parse_trailing_flag_and_prefix() {
        let args = args("agenda appointment delete 3 --yes");
        assert_eq!(args.command, "appointment");
        assert_eq!(args.args, vec!["delete".to_string(), "3".to_string()]);
        assert_eq!(args.flags.get("yes"), Some(&None));
    }

    #[test]
    fn test_parse_rejects_empty_and_unbalanced() {
        assert!(CommandArgs::parse("   ").is_err());
        assert!(CommandArgs::parse("contact search \"ana").is_err());
    }

    #[tokio::test]
    async fn test_unknown_command_is_reported() -> Result<()> {
        let (mut ctx, transcript, _) = context(&[]);
        CommandProcessor::new().execute(&mut ctx, args("bailar")).await?;
        assert!(transcript.contains("Comando desconocido"));
        Ok(())
    }
}
