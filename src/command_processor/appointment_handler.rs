//! Appointment command handler for agenda
//!
//! Handles listing, scheduling, editing and deleting appointments.
//
// # Examples
//
// ```
// let handler = AppointmentHandler;
// let args = CommandArgs::parse("appointment add --contact 1 --title Dentista --date 2025-03-15 --time 09:00")?;
// handler.execute(&mut ctx, args).await?;
// ```

use super::{AppContext, CommandArgs, CommandHandler, HandlerFuture, ensure_signed_in, fill_form};
use crate::forms::{AppointmentField, AppointmentForm, EditTarget, Form, FormField};
use crate::models::Appointment;
use crate::render;
use anyhow::{Result, anyhow};
use uuid::Uuid;

pub const DELETE_CONFIRMATION: &str = "¿Estás seguro de eliminar esta cita?";

#[derive(Debug)]
pub struct AppointmentHandler;

fn find(ctx: &AppContext, args: &CommandArgs) -> Result<crate::models::AppointmentWithContact> {
    let key = args.args.get(1).ok_or_else(|| anyhow!("Indique la cita (número de fila o id)"))?;
    ctx.controller
        .find_appointment(key)
        .cloned()
        .ok_or_else(|| anyhow!("Cita no encontrada: {}", key))
}

pub(crate) fn print_listing(ctx: &mut AppContext) {
    let table = render::appointment_table(&ctx.controller.state().appointments, ctx.color());
    ctx.print(table.trim_end());
}

/// The contact field accepts the same addresses as `contact show`; it is
/// stored as the resolved id.
fn resolve_contact(ctx: &AppContext, form: &mut AppointmentForm) {
    let raw = form.value(AppointmentField::Contact).trim().to_string();
    if raw.is_empty() || Uuid::parse_str(&raw).is_ok() {
        return;
    }
    if let Some(contact) = ctx.controller.find_contact(&raw) {
        form.set(AppointmentField::Contact, contact.id.to_string());
    }
}

impl AppointmentHandler {
    async fn save(&self, ctx: &mut AppContext, args: &CommandArgs, target: EditTarget<Appointment>) -> Result<()> {
        if ctx.controller.state().contacts.is_empty() {
            return Err(anyhow!("Agregue un contacto antes de agendar una cita"));
        }
        let mut form = AppointmentForm::new(target);
        let prompting = !form.fields().iter().any(|f| args.has_flag(f.key()));
        if prompting {
            super::contact_handler::print_listing(ctx);
        }
        if !fill_form(ctx, &mut form, args)? {
            ctx.print("Cancelado");
            return Ok(());
        }
        resolve_contact(ctx, &mut form);
        let payload = form.submit(&ctx.controller.state().contacts)?;
        let editing = form.target().is_editing();
        let saved = ctx.controller.save_appointment(form.into_target(), payload).await?;
        let verb = if editing { "actualizada" } else { "agendada" };
        ctx.print(&format!(
            "Cita {}: {} el {} a las {}",
            verb,
            saved.title,
            render::long_date(saved.date),
            saved.time.format("%H:%M")
        ));
        Ok(())
    }

    async fn delete(&self, ctx: &mut AppContext, args: &CommandArgs) -> Result<()> {
        let appointment = find(ctx, args)?;
        ctx.print(render::appointment_detail(&appointment, ctx.color()).trim_end());
        if !args.has_flag("yes") && !ctx.terminal.confirm(DELETE_CONFIRMATION)? {
            ctx.print("Cancelado");
            return Ok(());
        }
        ctx.controller.delete_appointment(appointment.id).await?;
        ctx.print(&format!("Cita eliminada: {}", appointment.title));
        Ok(())
    }
}

impl CommandHandler for AppointmentHandler {
    fn execute<'a>(&'a self, ctx: &'a mut AppContext, args: CommandArgs) -> HandlerFuture<'a> {
        Box::pin(async move {
            ensure_signed_in(ctx)?;
            match args.action().as_deref() {
                None | Some("list") | Some("ls") => {
                    print_listing(ctx);
                    Ok(())
                }
                Some("show") => {
                    let appointment = find(ctx, &args)?;
                    let detail = render::appointment_detail(&appointment, ctx.color());
                    ctx.print(detail.trim_end());
                    Ok(())
                }
                Some("add") | Some("create") => self.save(ctx, &args, EditTarget::Creating).await,
                Some("edit") | Some("update") => {
                    let appointment = find(ctx, &args)?;
                    self.save(ctx, &args, EditTarget::Editing(appointment.appointment)).await
                }
                Some("delete") | Some("rm") => self.delete(ctx, &args).await,
                Some(other) => Err(anyhow!(
                    "Acción desconocida '{}'. Use list, show, add, edit o delete",
                    other
                )),
            }
        })
    }

    fn can_handle(&self, command: &str) -> bool {
        matches!(command, "appointment" | "appointments" | "cita" | "citas")
    }
}
