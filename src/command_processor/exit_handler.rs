//! Exit command handler for agenda
//!
//! Handles exit and quit commands. The REPL stops after the current command
//! once `should_exit` is set.

use super::{AppContext, CommandArgs, CommandHandler, HandlerFuture};

#[derive(Debug)]
pub struct ExitHandler;

impl CommandHandler for ExitHandler {
    fn execute<'a>(&'a self, ctx: &'a mut AppContext, _args: CommandArgs) -> HandlerFuture<'a> {
        Box::pin(async move {
            ctx.print("Hasta luego");
            ctx.should_exit = true;
            Ok(())
        })
    }
    fn can_handle(&self, command: &str) -> bool {
        command == "exit" || command == "quit" || command == "salir"
    }
}
