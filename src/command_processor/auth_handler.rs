//! Authentication command handler for agenda
//!
//! Handles login, signup, logout and whoami. Passwords are always read from
//! the terminal, never from arguments.
//
// # Examples
//
// ```
// let handler = AuthHandler;
// let args = CommandArgs::new("login".to_string(), vec!["ana@x.com".to_string()], HashMap::new());
// handler.execute(&mut ctx, args).await?;
// ```

use super::{AppContext, CommandArgs, CommandHandler, HandlerFuture};
use crate::controller::SignUpOutcome;
use anyhow::{Result, anyhow};

#[derive(Debug)]
pub struct AuthHandler;

fn read_credentials(ctx: &mut AppContext, args: &CommandArgs) -> Result<Option<(String, secrecy::SecretString)>> {
    let email = match args.args.first() {
        Some(email) => email.clone(),
        None => match ctx.terminal.read_line("Email: ")? {
            Some(email) => email.trim().to_string(),
            None => return Ok(None),
        },
    };
    if email.is_empty() {
        return Err(anyhow!("El email es obligatorio"));
    }
    let Some(password) = ctx.terminal.read_secret("Contraseña: ")? else {
        return Ok(None);
    };
    Ok(Some((email, password)))
}

impl AuthHandler {
    async fn login(&self, ctx: &mut AppContext, args: &CommandArgs) -> Result<()> {
        let Some((email, password)) = read_credentials(ctx, args)? else {
            return Ok(());
        };
        ctx.controller.sign_in(&email, &password).await?;
        let summary = format!(
            "Sesión iniciada como {} ({} contactos, {} citas)",
            email,
            ctx.controller.state().contacts.len(),
            ctx.controller.state().appointments.len()
        );
        ctx.print(&summary);
        Ok(())
    }

    async fn signup(&self, ctx: &mut AppContext, args: &CommandArgs) -> Result<()> {
        let Some((email, password)) = read_credentials(ctx, args)? else {
            return Ok(());
        };
        match ctx.controller.sign_up(&email, &password).await? {
            SignUpOutcome::SignedIn => ctx.print(&format!("Cuenta creada. Sesión iniciada como {}", email)),
            SignUpOutcome::ConfirmationPending => ctx.print(&format!(
                "Cuenta creada. Revise {} para confirmar su email antes de iniciar sesión.",
                email
            )),
        }
        Ok(())
    }

    async fn logout(&self, ctx: &mut AppContext) -> Result<()> {
        if !ctx.controller.is_authenticated() {
            ctx.print("No hay una sesión activa");
            return Ok(());
        }
        ctx.controller.sign_out().await?;
        ctx.print("Sesión cerrada");
        Ok(())
    }

    fn whoami(&self, ctx: &mut AppContext) {
        let line = match ctx.controller.session() {
            Some(session) => format!("{} ({})", session.email(), session.user_id()),
            None => "No hay una sesión activa".to_string(),
        };
        ctx.print(&line);
    }
}

impl CommandHandler for AuthHandler {
    fn execute<'a>(&'a self, ctx: &'a mut AppContext, args: CommandArgs) -> HandlerFuture<'a> {
        Box::pin(async move {
            match args.command.as_str() {
                "login" | "signin" => self.login(ctx, &args).await,
                "signup" | "register" => self.signup(ctx, &args).await,
                "logout" | "signout" => self.logout(ctx).await,
                _ => {
                    self.whoami(ctx);
                    Ok(())
                }
            }
        })
    }

    fn can_handle(&self, command: &str) -> bool {
        matches!(command, "login" | "signin" | "signup" | "register" | "logout" | "signout" | "whoami")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_processor::test_support::{args, context, signed_in};
    use crate::service::MemoryBackend;
    use crate::terminal::ScriptedTerminal;

    #[tokio::test]
    async fn test_signup_then_whoami() -> Result<()> {
        let (mut ctx, transcript, _) = context(&["secreto"]);
        AuthHandler.execute(&mut ctx, args("signup ana@x.com")).await?;
        assert!(ctx.controller.is_authenticated());
        AuthHandler.execute(&mut ctx, args("whoami")).await?;
        assert!(transcript.contains("Sesión iniciada como ana@x.com"));
        assert!(!transcript.contains("secreto"));
        Ok(())
    }

    #[tokio::test]
    async fn test_login_prompts_for_email() -> Result<()> {
        let (mut ctx, transcript, _) = signed_in(&["ana@x.com", "secreto"]).await;
        ctx.controller.sign_out().await?;
        AuthHandler.execute(&mut ctx, args("login")).await?;
        assert!(ctx.controller.is_authenticated());
        assert!(transcript.contains("Email: ana@x.com"));
        Ok(())
    }

    #[tokio::test]
    async fn test_bad_credentials_surface_verbatim() {
        let (mut ctx, _, _) = context(&["mala"]);
        let err = AuthHandler.execute(&mut ctx, args("login nadie@x.com")).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid login credentials");
    }

    #[tokio::test]
    async fn test_signup_pending_confirmation() -> Result<()> {
        let backend = std::sync::Arc::new(MemoryBackend::requiring_confirmation());
        let terminal = ScriptedTerminal::new(["secreto"]);
        let transcript = terminal.transcript();
        let controller = crate::controller::Controller::new(backend, Default::default());
        let mut ctx = AppContext::new(controller, Box::new(terminal), Default::default());
        AuthHandler.execute(&mut ctx, args("signup eva@x.com")).await?;
        assert!(!ctx.controller.is_authenticated());
        assert!(transcript.contains("para confirmar su email"));
        Ok(())
    }

    #[tokio::test]
    async fn test_logout() -> Result<()> {
        let (mut ctx, transcript, _) = signed_in(&[]).await;
        AuthHandler.execute(&mut ctx, args("logout")).await?;
        assert!(!ctx.controller.is_authenticated());
        assert!(transcript.contains("Sesión cerrada"));
        Ok(())
    }
}
