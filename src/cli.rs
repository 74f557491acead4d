use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Agenda - personal contacts and appointments from the terminal
#[derive(Debug, Parser)]
#[command(name = "agenda")]
#[command(about = "Gestor personal de contactos y citas", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute (if not specified, enters interactive mode)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Use an alternative config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Sign in with email and password
    Login {
        email: Option<String>,
    },

    /// Create an account
    #[command(alias = "register")]
    Signup {
        email: Option<String>,
    },

    /// Sign out and forget the stored session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Manage contacts
    #[command(alias = "contacts", alias = "contacto", alias = "contactos")]
    Contact {
        #[command(subcommand)]
        action: ContactActions,
    },

    /// Manage appointments
    #[command(alias = "appointments", alias = "cita", alias = "citas")]
    Appointment {
        #[command(subcommand)]
        action: AppointmentActions,
    },

    /// Show or switch the active tab
    Tab {
        /// contacts | appointments
        tab: Option<String>,
    },

    /// List the records of the active tab
    List,

    /// View or modify configuration
    Config {
        #[command(subcommand)]
        action: ConfigActions,
    },

    /// Show version information
    Version,
}

#[derive(Debug, Default, Clone, Args)]
pub struct ContactFields {
    #[arg(long)]
    pub nombre: Option<String>,
    #[arg(long)]
    pub apellido: Option<String>,
    #[arg(long)]
    pub numero: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum ContactActions {
    /// List contacts with the current search and sort
    #[command(alias = "ls")]
    List,

    /// Filter the list; no terms clears the search
    #[command(alias = "find")]
    Search {
        terms: Vec<String>,
    },

    /// Sort by nombre, apellido or email; repeating the field flips the order
    Sort {
        field: String,
    },

    /// Show one contact by list position or id prefix
    Show {
        key: String,
    },

    /// Create a contact, prompting for missing fields
    #[command(alias = "create")]
    Add {
        #[command(flatten)]
        fields: ContactFields,
    },

    /// Edit a contact, prompting for fields not given
    #[command(alias = "update")]
    Edit {
        key: String,
        #[command(flatten)]
        fields: ContactFields,
    },

    /// Delete a contact and its appointments
    #[command(alias = "rm")]
    Delete {
        key: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Debug, Default, Clone, Args)]
pub struct AppointmentFields {
    /// Contact by list position or id prefix
    #[arg(long)]
    pub contact: Option<String>,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    pub date: Option<String>,
    /// HH:MM
    #[arg(long)]
    pub time: Option<String>,
    /// pending | confirmed | cancelled | completed
    #[arg(long)]
    pub status: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum AppointmentActions {
    /// List appointments by date and time
    #[command(alias = "ls")]
    List,

    /// Show one appointment by list position or id prefix
    Show {
        key: String,
    },

    /// Schedule an appointment, prompting for missing fields
    #[command(alias = "create")]
    Add {
        #[command(flatten)]
        fields: AppointmentFields,
    },

    /// Edit an appointment, prompting for fields not given
    #[command(alias = "update")]
    Edit {
        key: String,
        #[command(flatten)]
        fields: AppointmentFields,
    },

    /// Delete an appointment
    #[command(alias = "rm")]
    Delete {
        key: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigActions {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Setting key (e.g. service.url, display.color)
        key: String,
        value: String,
    },
}

fn push_flag(
    flags: &mut std::collections::HashMap<String, Option<String>>,
    name: &str,
    value: &Option<String>,
) {
    if let Some(value) = value {
        flags.insert(name.to_string(), Some(value.clone()));
    }
}

/// Convert the parsed command line into the form the command processor
/// consumes. Returns `None` when no subcommand was given.
pub fn convert_to_command_args(cli: &Cli) -> Option<crate::command_processor::CommandArgs> {
    use crate::command_processor::CommandArgs;
    use std::collections::HashMap;

    let command = cli.command.as_ref()?;

    let mut args = Vec::new();
    let mut flags = HashMap::new();

    let command_str = match command {
        Commands::Login { email } | Commands::Signup { email } => {
            args.extend(email.iter().cloned());
            if matches!(command, Commands::Login { .. }) { "login" } else { "signup" }
        }
        Commands::Logout => "logout",
        Commands::Whoami => "whoami",
        Commands::Contact { action } => {
            match action {
                ContactActions::List => args.push("list".to_string()),
                ContactActions::Search { terms } => {
                    args.push("search".to_string());
                    args.extend(terms.iter().cloned());
                }
                ContactActions::Sort { field } => {
                    args.push("sort".to_string());
                    args.push(field.clone());
                }
                ContactActions::Show { key } => {
                    args.push("show".to_string());
                    args.push(key.clone());
                }
                ContactActions::Add { fields } | ContactActions::Edit { fields, .. } => {
                    if let ContactActions::Edit { key, .. } = action {
                        args.push("edit".to_string());
                        args.push(key.clone());
                    } else {
                        args.push("add".to_string());
                    }
                    push_flag(&mut flags, "nombre", &fields.nombre);
                    push_flag(&mut flags, "apellido", &fields.apellido);
                    push_flag(&mut flags, "numero", &fields.numero);
                    push_flag(&mut flags, "email", &fields.email);
                }
                ContactActions::Delete { key, yes } => {
                    args.push("delete".to_string());
                    args.push(key.clone());
                    if *yes {
                        flags.insert("yes".to_string(), None);
                    }
                }
            }
            "contact"
        }
        Commands::Appointment { action } => {
            match action {
                AppointmentActions::List => args.push("list".to_string()),
                AppointmentActions::Show { key } => {
                    args.push("show".to_string());
                    args.push(key.clone());
                }
                AppointmentActions::Add { fields } | AppointmentActions::Edit { fields, .. } => {
                    if let AppointmentActions::Edit { key, .. } = action {
                        args.push("edit".to_string());
                        args.push(key.clone());
                    } else {
                        args.push("add".to_string());
                    }
                    push_flag(&mut flags, "contact", &fields.contact);
                    push_flag(&mut flags, "title", &fields.title);
                    push_flag(&mut flags, "description", &fields.description);
                    push_flag(&mut flags, "date", &fields.date);
                    push_flag(&mut flags, "time", &fields.time);
                    push_flag(&mut flags, "status", &fields.status);
                }
                AppointmentActions::Delete { key, yes } => {
                    args.push("delete".to_string());
                    args.push(key.clone());
                    if *yes {
                        flags.insert("yes".to_string(), None);
                    }
                }
            }
            "appointment"
        }
        Commands::Tab { tab } => {
            args.extend(tab.iter().cloned());
            "tab"
        }
        Commands::List => "list",
        Commands::Config { action } => {
            match action {
                ConfigActions::Show => args.push("show".to_string()),
                ConfigActions::Set { key, value } => {
                    args.push("set".to_string());
                    args.push(key.clone());
                    args.push(value.clone());
                }
            }
            "config"
        }
        Commands::Version => "version",
    };

    Some(CommandArgs::new(command_str.to_string(), args, flags))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn convert(argv: &[&str]) -> crate::command_processor::CommandArgs {
        let cli = Cli::try_parse_from(argv).expect("valid command line");
        convert_to_command_args(&cli).expect("a subcommand")
    }

    #[test]
    fn test_no_subcommand_means_interactive() {
        let cli = Cli::try_parse_from(["agenda", "--verbose"]).unwrap();
        assert!(cli.verbose);
        assert!(convert_to_command_args(&cli).is_none());
    }

    #[test]
    fn test_contact_add_flags() {
        let args = convert(&["agenda", "contact", "add", "--nombre", "Ana", "--email", "a@x.com"]);
        assert_eq!(args.command, "contact");
        assert_eq!(args.args, vec!["add".to_string()]);
        assert_eq!(args.flags.get("nombre"), Some(&Some("Ana".to_string())));
        assert_eq!(args.flags.get("email"), Some(&Some("a@x.com".to_string())));
        assert!(!args.flags.contains_key("apellido"));
    }

    #[test]
    fn test_appointment_alias_and_delete() {
        let args = convert(&["agenda", "citas", "delete", "2", "--yes"]);
        assert_eq!(args.command, "appointment");
        assert_eq!(args.args, vec!["delete".to_string(), "2".to_string()]);
        assert_eq!(args.flags.get("yes"), Some(&None));
    }

    #[test]
    fn test_search_terms_and_config_path() {
        let cli =
            Cli::try_parse_from(["agenda", "--config", "/tmp/a.toml", "contact", "search", "ana", "maria"])
                .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/a.toml")));
        let args = convert_to_command_args(&cli).unwrap();
        assert_eq!(args.args, vec!["search", "ana", "maria"]);
    }

    #[test]
    fn test_config_set() {
        let args = convert(&["agenda", "config", "set", "display.color", "false"]);
        assert_eq!(args.command, "config");
        assert_eq!(args.args, vec!["set", "display.color", "false"]);
    }
}
