use crate::command_processor::{AppContext, CommandArgs, CommandProcessor};
use crate::render;
use anyhow::Result;

const PROMPT: &str = "agenda> ";

pub struct Application {
    command_processor: CommandProcessor,
}

impl Application {
    pub fn new() -> Self {
        Self { command_processor: CommandProcessor::new() }
    }

    /// Resolves the stored session, if any, and shows the first screen.
    pub async fn start(&self, ctx: &mut AppContext) {
        ctx.print("Cargando...");
        if let Err(e) = ctx.controller.start().await {
            ctx.print(&format!("Error: {}", e));
        }
        if ctx.controller.is_authenticated() {
            let screen = render::active_tab(ctx.controller.state(), ctx.color());
            ctx.print(screen.trim_end());
        } else {
            ctx.print("Use 'login' o 'signup' para comenzar. Escriba 'help' para ver los comandos.");
        }
    }

    /// Interactive loop. Ends on `exit`, Ctrl-C or Ctrl-D.
    pub async fn run(&self, ctx: &mut AppContext) -> Result<()> {
        log::info!("Starting interactive session");
        self.start(ctx).await;

        while !ctx.should_exit {
            let Some(line) = ctx.terminal.read_line(PROMPT)? else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }
            ctx.terminal.add_history(&line);
            if let Err(err) = self.process_input(ctx, &line).await {
                ctx.print(&format!("Error: {}", err));
            }
        }

        ctx.controller.shutdown();
        Ok(())
    }

    /// Runs a single command given on the command line.
    pub async fn run_once(&self, ctx: &mut AppContext, args: CommandArgs) -> Result<()> {
        if needs_session(&args.command) {
            if let Err(e) = ctx.controller.start().await {
                log::warn!("Could not restore session: {}", e);
            }
        }
        let result = self.command_processor.execute(ctx, args).await;
        ctx.controller.shutdown();
        result
    }

    /// Process one line of interactive input.
    ///
    /// # Errors
    /// Returns an error if the line cannot be tokenized or the command fails.
    pub async fn process_input(&self, ctx: &mut AppContext, input: &str) -> Result<()> {
        let command_args = CommandArgs::parse(input)?;
        self.command_processor.execute(ctx, command_args).await
    }
}

impl Default for Application {
    fn default() -> Self {
        Self::new()
    }
}

/// Commands that never touch the service.
pub fn needs_session(command: &str) -> bool {
    !matches!(command, "config" | "help" | "version" | "--help" | "-h" | "--version" | "-v")
}
