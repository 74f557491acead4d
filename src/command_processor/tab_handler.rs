//! Tab command handler for agenda
//!
//! `tab` shows or switches the active tab. Bare `list` and `add` act on
//! whichever tab is active.

use super::appointment_handler::AppointmentHandler;
use super::contact_handler::ContactHandler;
use super::{AppContext, CommandArgs, CommandHandler, HandlerFuture, ensure_signed_in};
use crate::controller::Tab;
use crate::render;
use anyhow::anyhow;

#[derive(Debug)]
pub struct TabHandler;

fn show_active(ctx: &mut AppContext) {
    let screen = render::active_tab(ctx.controller.state(), ctx.color());
    ctx.print(screen.trim_end());
}

impl CommandHandler for TabHandler {
    fn execute<'a>(&'a self, ctx: &'a mut AppContext, args: CommandArgs) -> HandlerFuture<'a> {
        Box::pin(async move {
            ensure_signed_in(ctx)?;
            match args.command.as_str() {
                "tab" => {
                    if let Some(name) = args.args.first() {
                        let tab = name.parse::<Tab>().map_err(|e| anyhow!(e))?;
                        ctx.controller.set_tab(tab);
                    }
                    show_active(ctx);
                    Ok(())
                }
                "add" | "new" => {
                    let mut forwarded = args.clone();
                    forwarded.args.insert(0, "add".to_string());
                    match ctx.controller.state().tab {
                        Tab::Contacts => {
                            forwarded.command = "contact".to_string();
                            ContactHandler.execute(ctx, forwarded).await
                        }
                        Tab::Appointments => {
                            forwarded.command = "appointment".to_string();
                            AppointmentHandler.execute(ctx, forwarded).await
                        }
                    }
                }
                _ => {
                    show_active(ctx);
                    Ok(())
                }
            }
        })
    }

    fn can_handle(&self, command: &str) -> bool {
        matches!(command, "tab" | "list" | "ls" | "add" | "new")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_processor::test_support::{args, signed_in};
    use anyhow::Result;

    #[tokio::test]
    async fn test_switch_tab_and_list() -> Result<()> {
        let (mut ctx, transcript, _) = signed_in(&[]).await;
        TabHandler.execute(&mut ctx, args("list")).await?;
        assert!(transcript.contains("ana@x.com"));
        assert!(transcript.contains("[Contactos (0)]"));
        assert!(transcript.contains("No hay contactos aún"));

        TabHandler.execute(&mut ctx, args("tab citas")).await?;
        assert_eq!(ctx.controller.state().tab, Tab::Appointments);
        assert!(transcript.contains("[Citas (0)]"));
        assert!(transcript.contains("No hay citas agendadas"));
        Ok(())
    }

    #[tokio::test]
    async fn test_add_follows_active_tab() -> Result<()> {
        let (mut ctx, _, _) = signed_in(&[]).await;
        TabHandler
            .execute(&mut ctx, args("add --nombre Ana --apellido Zeta --numero 111 --email a@x.com"))
            .await?;
        assert_eq!(ctx.controller.state().contacts.len(), 1);

        TabHandler.execute(&mut ctx, args("tab appointments")).await?;
        TabHandler
            .execute(&mut ctx, args("add --contact 1 --title Cita --date 2025-03-15 --time 08:00"))
            .await?;
        assert_eq!(ctx.controller.state().appointments.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_tab() {
        let (mut ctx, _, _) = signed_in(&[]).await;
        let err = TabHandler.execute(&mut ctx, args("tab notas")).await.unwrap_err();
        assert_eq!(err.to_string(), "Pestaña desconocida: notas");
    }
}
