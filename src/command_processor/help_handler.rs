//! Help command handler for agenda
//!
//! Handles help-related commands.
//
// # Examples
//
// ```
// let handler = HelpHandler;
// let args = CommandArgs::new("help".to_string(), vec![], HashMap::new());
// handler.execute(&mut ctx, args).await?;
// ```

use super::{AppContext, CommandArgs, CommandHandler, HandlerFuture};

#[derive(Debug)]
pub struct HelpHandler;

const HELP: &str = "\
agenda - contactos y citas

USO:
  agenda [COMANDO] [ACCIÓN] [OPCIONES]

SESIÓN:
  login [email]             Iniciar sesión
  signup [email]            Crear una cuenta
  logout                    Cerrar sesión
  whoami                    Mostrar el usuario actual

CONTACTOS:
  contact list              Listar contactos
  contact search <texto>    Filtrar por nombre, apellido, email o número
  contact sort <campo>      Ordenar por nombre, apellido o email
  contact show <n|id>       Ver un contacto
  contact add               Agregar (--nombre --apellido --numero --email)
  contact edit <n|id>       Modificar
  contact delete <n|id>     Eliminar (--yes para no preguntar)

CITAS:
  appointment list          Listar citas por fecha y hora
  appointment show <n|id>   Ver una cita
  appointment add           Agendar (--contact --title --description --date --time --status)
  appointment edit <n|id>   Modificar
  appointment delete <n|id> Eliminar (--yes para no preguntar)

OTROS:
  tab [contacts|appointments]  Cambiar de pestaña
  list | add                Actuar sobre la pestaña activa
  config show | set <k> <v> Configuración
  version                   Versión
  help                      Esta ayuda
  exit                      Salir

<n> es la posición en el último listado; <id> un prefijo de al menos 4 caracteres.";

impl CommandHandler for HelpHandler {
    fn execute<'a>(&'a self, ctx: &'a mut AppContext, _args: CommandArgs) -> HandlerFuture<'a> {
        Box::pin(async move {
            ctx.print(HELP);
            Ok(())
        })
    }
    fn can_handle(&self, command: &str) -> bool {
        command == "help" || command == "--help" || command == "-h" || command == "ayuda"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_processor::test_support::{args, context};

    #[tokio::test]
    async fn test_help_lists_commands() -> anyhow::Result<()> {
        let (mut ctx, transcript, _) = context(&[]);
        HelpHandler.execute(&mut ctx, args("help")).await?;
        for command in ["login", "contact search", "appointment add", "tab", "config"] {
            assert!(transcript.contains(command), "missing {}", command);
        }
        Ok(())
    }
}
