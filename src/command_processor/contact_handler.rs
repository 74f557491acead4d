//! Contact command handler for agenda
//!
//! Handles listing, searching, sorting and editing contacts. Records are
//! addressed by their position in the current listing or by an id prefix.
//
// # Examples
//
// ```
// let handler = ContactHandler;
// let args = CommandArgs::parse("contact add --nombre Ana --apellido Zeta --numero 111 --email a@x.com")?;
// handler.execute(&mut ctx, args).await?;
// ```

use super::{AppContext, CommandArgs, CommandHandler, HandlerFuture, ensure_signed_in, fill_form};
use crate::forms::{ContactForm, EditTarget};
use crate::list_view::SortField;
use crate::models::Contact;
use crate::render;
use anyhow::{Result, anyhow};

pub const DELETE_CONFIRMATION: &str = "¿Estás seguro de eliminar este contacto?";

#[derive(Debug)]
pub struct ContactHandler;

fn find(ctx: &AppContext, args: &CommandArgs) -> Result<Contact> {
    let key = args.args.get(1).ok_or_else(|| anyhow!("Indique el contacto (número de fila o id)"))?;
    ctx.controller
        .find_contact(key)
        .cloned()
        .ok_or_else(|| anyhow!("Contacto no encontrado: {}", key))
}

pub(crate) fn print_listing(ctx: &mut AppContext) {
    let state = ctx.controller.state();
    let table = render::contact_table(&state.contact_listing(), &state.contact_view);
    ctx.print(table.trim_end());
}

impl ContactHandler {
    async fn save(&self, ctx: &mut AppContext, args: &CommandArgs, target: EditTarget<Contact>) -> Result<()> {
        let mut form = ContactForm::new(target);
        if !fill_form(ctx, &mut form, args)? {
            ctx.print("Cancelado");
            return Ok(());
        }
        let payload = form.submit()?;
        let editing = form.target().is_editing();
        let saved = ctx.controller.save_contact(form.into_target(), payload).await?;
        let verb = if editing { "actualizado" } else { "agregado" };
        ctx.print(&format!("Contacto {}: {}", verb, saved.full_name()));
        Ok(())
    }

    async fn delete(&self, ctx: &mut AppContext, args: &CommandArgs) -> Result<()> {
        let contact = find(ctx, args)?;
        ctx.print(&render::contact_detail(&contact));
        if !args.has_flag("yes") && !ctx.terminal.confirm(DELETE_CONFIRMATION)? {
            ctx.print("Cancelado");
            return Ok(());
        }
        ctx.controller.delete_contact(contact.id).await?;
        ctx.print(&format!("Contacto eliminado: {}", contact.full_name()));
        Ok(())
    }
}

impl CommandHandler for ContactHandler {
    fn execute<'a>(&'a self, ctx: &'a mut AppContext, args: CommandArgs) -> HandlerFuture<'a> {
        Box::pin(async move {
            ensure_signed_in(ctx)?;
            match args.action().as_deref() {
                None | Some("list") | Some("ls") => {
                    print_listing(ctx);
                    Ok(())
                }
                Some("search") | Some("find") => {
                    ctx.controller.set_search(args.args[1..].join(" "));
                    print_listing(ctx);
                    Ok(())
                }
                Some("sort") => {
                    let field = args
                        .args
                        .get(1)
                        .ok_or_else(|| anyhow!("Indique el campo: nombre, apellido o email"))?
                        .parse::<SortField>()
                        .map_err(|e| anyhow!(e))?;
                    ctx.controller.toggle_sort(field);
                    print_listing(ctx);
                    Ok(())
                }
                Some("show") => {
                    let contact = find(ctx, &args)?;
                    ctx.print(render::contact_detail(&contact).trim_end());
                    Ok(())
                }
                Some("add") | Some("create") => self.save(ctx, &args, EditTarget::Creating).await,
                Some("edit") | Some("update") => {
                    let contact = find(ctx, &args)?;
                    self.save(ctx, &args, EditTarget::Editing(contact)).await
                }
                Some("delete") | Some("rm") => self.delete(ctx, &args).await,
                Some(other) => Err(anyhow!(
                    "Acción desconocida '{}'. Use list, search, sort, show, add, edit o delete",
                    other
                )),
            }
        })
    }

    fn can_handle(&self, command: &str) -> bool {
        matches!(command, "contact" | "contacts" | "contacto" | "contactos")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_processor::test_support::{args, context, signed_in};
    use crate::list_view::SortOrder;
    use pretty_assertions::assert_eq;

    async fn seed(ctx: &mut AppContext) -> Result<()> {
        ContactHandler
            .execute(ctx, args("contact add --nombre Ana --apellido Zeta --numero 111 --email a@x.com"))
            .await?;
        ContactHandler
            .execute(ctx, args("contact add --nombre Beto --apellido Alfa --numero 222 --email b@x.com"))
            .await
    }

    fn names(ctx: &AppContext) -> Vec<String> {
        ctx.controller.state().contacts.iter().map(|c| c.nombre.clone()).collect()
    }

    #[tokio::test]
    async fn test_requires_session() {
        let (mut ctx, _, _) = context(&[]);
        let err = ContactHandler.execute(&mut ctx, args("contact list")).await.unwrap_err();
        assert!(err.to_string().contains("No hay una sesión activa"));
    }

    #[tokio::test]
    async fn test_add_with_flags() -> Result<()> {
        let (mut ctx, transcript, _) = signed_in(&[]).await;
        seed(&mut ctx).await?;
        assert_eq!(names(&ctx), vec!["Ana", "Beto"]);
        assert!(transcript.contains("Contacto agregado: Beto Alfa"));
        Ok(())
    }

    #[tokio::test]
    async fn test_add_prompts_for_each_field() -> Result<()> {
        let (mut ctx, transcript, _) = signed_in(&["Carla", "Mora", "333", "c@x.com"]).await;
        ContactHandler.execute(&mut ctx, args("contact add")).await?;
        assert!(transcript.contains("Agregar Contacto"));
        assert_eq!(names(&ctx), vec!["Carla"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_field_is_reported() -> Result<()> {
        let (mut ctx, _, _) = signed_in(&[]).await;
        let err = ContactHandler
            .execute(&mut ctx, args("contact add --nombre Ana --email a@x.com"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "El campo 'Apellido' es obligatorio");
        assert!(ctx.controller.state().contacts.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_sort_and_search() -> Result<()> {
        let (mut ctx, transcript, _) = signed_in(&[]).await;
        seed(&mut ctx).await?;

        ContactHandler.execute(&mut ctx, args("contact sort apellido")).await?;
        let first = ctx.controller.find_contact("1").map(|c| c.nombre.clone());
        assert_eq!(first.as_deref(), Some("Beto"));

        ContactHandler.execute(&mut ctx, args("contact sort apellido")).await?;
        assert_eq!(ctx.controller.state().contact_view.sort_order(), SortOrder::Desc);

        transcript.clear();
        ContactHandler.execute(&mut ctx, args("contact search 222")).await?;
        let listing = ctx.controller.state().contact_listing();
        assert_eq!(listing.rows.len(), 1);
        assert!(transcript.contains("Beto"));
        assert!(!transcript.contains("Zeta"));

        ContactHandler.execute(&mut ctx, args("contact search zzz")).await?;
        assert!(transcript.contains("No se encontraron contactos"));
        Ok(())
    }

    #[tokio::test]
    async fn test_edit_keeps_unflagged_fields() -> Result<()> {
        let (mut ctx, transcript, _) = signed_in(&[]).await;
        seed(&mut ctx).await?;
        ContactHandler.execute(&mut ctx, args("contact edit 2 --numero 999")).await?;
        let beto = ctx.controller.find_contact("2").cloned().unwrap();
        assert_eq!(beto.numero, "999");
        assert_eq!(beto.apellido, "Alfa");
        assert!(transcript.contains("Contacto actualizado: Beto Alfa"));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_asks_for_confirmation() -> Result<()> {
        let (mut ctx, transcript, _) = signed_in(&["n", "s"]).await;
        seed(&mut ctx).await?;

        ContactHandler.execute(&mut ctx, args("contact delete 1")).await?;
        assert!(transcript.contains(DELETE_CONFIRMATION));
        assert_eq!(names(&ctx), vec!["Ana", "Beto"]);

        ContactHandler.execute(&mut ctx, args("contact delete 1")).await?;
        assert_eq!(names(&ctx), vec!["Beto"]);

        ContactHandler.execute(&mut ctx, args("contact delete 1 --yes")).await?;
        assert!(ctx.controller.state().contacts.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_record() {
        let (mut ctx, _, _) = signed_in(&[]).await;
        let err = ContactHandler.execute(&mut ctx, args("contact show 7")).await.unwrap_err();
        assert_eq!(err.to_string(), "Contacto no encontrado: 7");
    }
}
