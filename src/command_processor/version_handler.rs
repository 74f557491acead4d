//! Version command handler for agenda
//!
//! Handles version-related commands.

use super::{AppContext, CommandArgs, CommandHandler, HandlerFuture};
use crate::version::get_display_version;

#[derive(Debug)]
pub struct VersionHandler;

impl CommandHandler for VersionHandler {
    fn execute<'a>(&'a self, ctx: &'a mut AppContext, _args: CommandArgs) -> HandlerFuture<'a> {
        Box::pin(async move {
            ctx.print(&format!("agenda {}", get_display_version()));
            ctx.print("Gestor personal de contactos y citas.");
            Ok(())
        })
    }
    fn can_handle(&self, command: &str) -> bool {
        command == "version" || command == "--version" || command == "-v"
    }
}
