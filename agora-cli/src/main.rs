use std::path::PathBuf;

use agora_core::config::Config;
use agora_core::core_event::{EventManager, EventManagerImpl, Modality};
use agora_core::core_member::{MemberManager, MemberManagerImpl, User};
use agora_core::core_model::{EventId, InterestId, PublicationId, Timestamp, UserId};
use agora_core::core_notify::{NotifyManager, NotifyManagerImpl};
use agora_core::core_publication::{PublicationManager, PublicationManagerImpl, Visibility};
use agora_core::core_role::Role;
use agora_core::logging::{init_logging_with_config, LogConfig, LogLevel};
use agora_core::CommunityStore;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "agora")]
#[command(author, version, about = "Community engine admin tool", long_about = None)]
struct Args {
    /// Set the log level (trace, debug, info, warn, error); overrides the
    /// configuration file
    #[arg(short, long)]
    log_level: Option<String>,

    /// Enable JSON formatted logging
    #[arg(long)]
    json_logs: bool,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database and run pending migrations
    Init,

    /// Register an account
    AddUser {
        display_name: String,
        email: String,
        /// interested, member, coordinator, or mentor
        #[arg(default_value = "interested")]
        role: String,
    },

    /// Change an account's role (acting as a mentor)
    SetRole {
        #[arg(long)]
        actor: i64,
        user: i64,
        role: String,
    },

    /// Add a keyword to the interest vocabulary
    AddInterest {
        #[arg(long)]
        actor: i64,
        keyword: String,
    },

    /// Declare an interest on the actor's own profile
    Declare {
        #[arg(long)]
        actor: i64,
        interest: i64,
    },

    /// Author a publication (starts in draft)
    AddPublication {
        #[arg(long)]
        actor: i64,
        title: String,
        content: String,
        #[arg(long)]
        private: bool,
    },

    /// Tag a publication with an interest
    Tag {
        #[arg(long)]
        actor: i64,
        publication: i64,
        interest: i64,
    },

    /// Publish and fan out notifications
    Publish {
        #[arg(long)]
        actor: i64,
        publication: i64,
    },

    /// Grant publication access to users and/or whole roles
    Grant {
        #[arg(long)]
        actor: i64,
        publication: i64,
        #[arg(long = "user")]
        users: Vec<i64>,
        #[arg(long = "role")]
        roles: Vec<String>,
    },

    /// Revoke publication access from users and/or whole roles
    Revoke {
        #[arg(long)]
        actor: i64,
        publication: i64,
        #[arg(long = "user")]
        users: Vec<i64>,
        #[arg(long = "role")]
        roles: Vec<String>,
    },

    /// Schedule an event
    AddEvent {
        #[arg(long)]
        actor: i64,
        name: String,
        starts_at: u64,
        ends_at: u64,
        /// in_person, virtual, or hybrid
        modality: String,
        #[arg(long)]
        capacity: Option<u32>,
    },

    /// Enroll the actor into an event
    Enroll {
        #[arg(long)]
        actor: i64,
        event: i64,
    },

    /// Cancel the actor's enrollment
    Cancel {
        #[arg(long)]
        actor: i64,
        event: i64,
    },

    /// Mark users as attended
    Attend {
        #[arg(long)]
        actor: i64,
        event: i64,
        #[arg(long = "user")]
        users: Vec<i64>,
    },

    /// Mark users as absent
    Absent {
        #[arg(long)]
        actor: i64,
        event: i64,
        #[arg(long = "user")]
        users: Vec<i64>,
    },

    /// List the actor's notifications
    Notifications {
        #[arg(long)]
        actor: i64,
        #[arg(long)]
        include_read: bool,
    },
}

struct App {
    members: MemberManagerImpl,
    publications: PublicationManagerImpl,
    events: EventManagerImpl,
    notify: NotifyManagerImpl,
}

impl App {
    fn new(store: CommunityStore) -> Self {
        Self {
            members: MemberManagerImpl::new(store.clone()),
            publications: PublicationManagerImpl::new(store.clone()),
            events: EventManagerImpl::new(store.clone()),
            notify: NotifyManagerImpl::new(store),
        }
    }

    fn actor(&self, id: i64) -> Result<User> {
        self.members
            .get_user(UserId(id))
            .with_context(|| format!("loading acting user {id}"))
    }
}

fn parse_role(s: &str) -> Result<Role> {
    s.parse::<Role>()
        .map_err(|e| anyhow::anyhow!("{e} (expected interested, member, coordinator, or mentor)"))
}

fn parse_roles(roles: &[String]) -> Result<Vec<Role>> {
    roles.iter().map(|r| parse_role(r)).collect()
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;

    let level_name = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    let log_level = LogLevel::from_str(&level_name).unwrap_or_else(|| {
        eprintln!("Invalid log level '{level_name}', using 'warn'");
        LogLevel::Warn
    });
    init_logging_with_config(
        LogConfig::new(log_level).json_format(args.json_logs || config.logging.json_format),
    )?;
    let store = CommunityStore::open(&config.database)
        .with_context(|| format!("opening database {}", config.database.path.display()))?;
    agora_core::metrics::init_metrics();
    let app = App::new(store);

    match args.command {
        Command::Init => {
            // Opening the store above already ran migrations.
            info!(path = %config.database.path.display(), "database ready");
            println!("database ready at {}", config.database.path.display());
        }
        Command::AddUser {
            display_name,
            email,
            role,
        } => {
            let user = app
                .members
                .register_user(&display_name, &email, parse_role(&role)?)?;
            print_json(&user)?;
        }
        Command::SetRole { actor, user, role } => {
            let actor = app.actor(actor)?;
            app.members
                .change_role(&actor, UserId(user), parse_role(&role)?)?;
            println!("role updated");
        }
        Command::AddInterest { actor, keyword } => {
            let actor = app.actor(actor)?;
            let interest = app.members.create_interest(&actor, &keyword)?;
            print_json(&interest)?;
        }
        Command::Declare { actor, interest } => {
            let actor = app.actor(actor)?;
            let added = app.members.declare_interest(&actor, InterestId(interest))?;
            println!("{}", if added { "declared" } else { "already declared" });
        }
        Command::AddPublication {
            actor,
            title,
            content,
            private,
        } => {
            let actor = app.actor(actor)?;
            let visibility = if private {
                Visibility::Private
            } else {
                Visibility::Public
            };
            let publication =
                app.publications
                    .create_publication(&actor, &title, &content, visibility)?;
            print_json(&publication)?;
        }
        Command::Tag {
            actor,
            publication,
            interest,
        } => {
            let actor = app.actor(actor)?;
            let added = app.publications.tag_interest(
                &actor,
                PublicationId(publication),
                InterestId(interest),
            )?;
            println!("{}", if added { "tagged" } else { "already tagged" });
        }
        Command::Publish { actor, publication } => {
            let actor = app.actor(actor)?;
            let outcome = app
                .publications
                .publish(&actor, PublicationId(publication))?;
            print_json(&outcome)?;
        }
        Command::Grant {
            actor,
            publication,
            users,
            roles,
        } => {
            let actor = app.actor(actor)?;
            let users: Vec<UserId> = users.into_iter().map(UserId).collect();
            let outcome = app.publications.grant_access(
                &actor,
                PublicationId(publication),
                &users,
                &parse_roles(&roles)?,
            )?;
            print_json(&outcome)?;
        }
        Command::Revoke {
            actor,
            publication,
            users,
            roles,
        } => {
            let actor = app.actor(actor)?;
            let users: Vec<UserId> = users.into_iter().map(UserId).collect();
            let outcome = app.publications.revoke_access(
                &actor,
                PublicationId(publication),
                &users,
                &parse_roles(&roles)?,
            )?;
            print_json(&outcome)?;
        }
        Command::AddEvent {
            actor,
            name,
            starts_at,
            ends_at,
            modality,
            capacity,
        } => {
            let actor = app.actor(actor)?;
            let modality: Modality = modality
                .parse()
                .map_err(|e| anyhow::anyhow!("{e} (expected in_person, virtual, or hybrid)"))?;
            let event = app.events.create_event(
                &actor,
                &name,
                Timestamp::from_millis(starts_at),
                Timestamp::from_millis(ends_at),
                modality,
                capacity,
            )?;
            print_json(&event)?;
        }
        Command::Enroll { actor, event } => {
            let actor = app.actor(actor)?;
            let participation = app.events.enroll(&actor, EventId(event))?;
            print_json(&participation)?;
        }
        Command::Cancel { actor, event } => {
            let actor = app.actor(actor)?;
            app.events.cancel_enrollment(&actor, EventId(event))?;
            println!("enrollment cancelled");
        }
        Command::Attend {
            actor,
            event,
            users,
        } => {
            let actor = app.actor(actor)?;
            let users: Vec<UserId> = users.into_iter().map(UserId).collect();
            let outcome = app.events.mark_attended(&actor, EventId(event), &users)?;
            print_json(&outcome)?;
        }
        Command::Absent {
            actor,
            event,
            users,
        } => {
            let actor = app.actor(actor)?;
            let users: Vec<UserId> = users.into_iter().map(UserId).collect();
            let outcome = app.events.mark_absent(&actor, EventId(event), &users)?;
            print_json(&outcome)?;
        }
        Command::Notifications {
            actor,
            include_read,
        } => {
            let actor = app.actor(actor)?;
            let notifications = app.notify.list_notifications(&actor, include_read)?;
            print_json(&notifications)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_role_rejects_unknown_names() {
        assert!(parse_role("member").is_ok());
        assert!(parse_role("admin").is_err());
    }
}
