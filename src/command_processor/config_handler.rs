//! Config command handler for agenda
//!
//! Handles config-related commands such as set and show.
//
// # Examples
//
// ```
// let handler = ConfigHandler;
// let args = CommandArgs::parse("config set display.color false")?;
// handler.execute(&mut ctx, args).await?;
// ```

use super::{AppContext, CommandArgs, CommandHandler, HandlerFuture};
use crate::config::SETTABLE_KEYS;
use anyhow::{Result, anyhow};

#[derive(Debug)]
pub struct ConfigHandler;

fn set(ctx: &mut AppContext, args: &CommandArgs) -> Result<()> {
    let (Some(key), Some(value)) = (args.args.get(1), args.args.get(2)) else {
        return Err(anyhow!("Uso: config set <clave> <valor>. Claves: {}", SETTABLE_KEYS.join(", ")));
    };
    let mut updated = ctx.config.clone();
    updated.set(key, value)?;
    match &ctx.config_path {
        Some(path) => updated.save_to(path)?,
        None => updated.save()?,
    }
    ctx.config = updated;
    ctx.print(&format!("{} = {}", key, value));
    if key.starts_with("service.") || key.starts_with("session.") {
        ctx.print("El cambio se aplicará al reiniciar");
    }
    Ok(())
}

impl CommandHandler for ConfigHandler {
    fn execute<'a>(&'a self, ctx: &'a mut AppContext, args: CommandArgs) -> HandlerFuture<'a> {
        Box::pin(async move {
            match args.action().as_deref() {
                Some("set") => set(ctx, &args),
                None | Some("get") | Some("show") => {
                    let shown = ctx.config.to_display_string()?;
                    ctx.print(shown.trim_end());
                    Ok(())
                }
                Some(other) => Err(anyhow!("Acción desconocida '{}'. Use show o set", other)),
            }
        })
    }
    fn can_handle(&self, command: &str) -> bool {
        command == "config"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_processor::test_support::{args, context};
    use crate::config::Config;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_set_saves_and_applies() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        let (ctx, transcript, _) = context(&[]);
        let mut ctx = ctx.with_config_path(path.clone());

        ConfigHandler.execute(&mut ctx, args("config set display.color true")).await?;
        assert!(ctx.color());
        assert!(Config::load_from(&path)?.display.color);

        ConfigHandler.execute(&mut ctx, args("config show")).await?;
        assert!(transcript.contains("[display]"));
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_value_changes_nothing() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        let (ctx, _, _) = context(&[]);
        let mut ctx = ctx.with_config_path(path.clone());
        let before = ctx.config.clone();

        let result = ConfigHandler.execute(&mut ctx, args("config set display.default_sort_field telefono")).await;
        assert!(result.is_err());
        assert_eq!(ctx.config, before);
        assert!(!path.exists());
        Ok(())
    }
}
