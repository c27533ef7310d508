use std::path::PathBuf;
use std::sync::Arc;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use devmarks::cli::{
    AdminCommands, AuthCommands, CategoryCommands, PageCommands, UserCommands, run_admin_init,
    run_admin_set_role, run_auth_login, run_auth_logout, run_auth_register, run_category_add,
    run_category_delete, run_category_list, run_category_rename, run_page_add, run_page_delete,
    run_page_edit, run_page_list, run_user_list,
};
use devmarks::config::{ConfigOverrides, ServerConfig};
use devmarks::server::{AppState, create_router};
use devmarks::store::{SqliteStore, Store};
use devmarks::types::Role;

#[derive(Parser)]
#[command(name = "devmarks")]
#[command(about = "A bookmark library for developers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands (run on the server host)
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Register, sign in and sign out
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },

    /// Manage pages
    Page {
        #[command(subcommand)]
        command: PageCommands,
    },

    /// Manage categories
    Category {
        #[command(subcommand)]
        command: CategoryCommands,
    },

    /// Browse registered users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Start the server
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(long, short)]
        port: Option<u16>,

        /// Data directory for the database
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Configuration file (defaults to devmarks.toml in the data directory)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Session lifetime in hours (0 for no expiry)
        #[arg(long)]
        token_ttl_hours: Option<u32>,
    },
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

async fn serve(overrides: ConfigOverrides, config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config = ServerConfig::resolve(overrides, config_path.as_deref())?;

    let db_path = config.db_path();
    if !db_path.exists() {
        bail!("Server not initialized. Run 'devmarks admin init' first to create the database and an administrator.");
    }

    let store = SqliteStore::new(&db_path)?;
    store.initialize()?;
    if !store.has_admin()? {
        bail!("Server not initialized. Run 'devmarks admin init' first to create the database and an administrator.");
    }

    let store: Arc<dyn Store> = Arc::new(store);
    let state = Arc::new(AppState::new(store.clone(), config.token_ttl()));
    let app = create_router(state);
    let addr = config.socket_addr()?;

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close()?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("devmarks=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            host,
            port,
            data_dir,
            config,
            token_ttl_hours,
        } => {
            let overrides = ConfigOverrides {
                host,
                port,
                data_dir,
                token_ttl_hours,
            };
            serve(overrides, config).await?;
        }
        // The remaining commands block on the database or reqwest's blocking
        // client, so they run off the async runtime.
        command => tokio::task::spawn_blocking(move || run_command(command)).await??,
    }

    Ok(())
}

fn run_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                data_dir,
                admin_email,
                admin_password,
                non_interactive,
            } => run_admin_init(data_dir, admin_email, admin_password, non_interactive),
            AdminCommands::Promote { data_dir, email } => {
                run_admin_set_role(data_dir, email, Role::Admin)
            }
            AdminCommands::Demote { data_dir, email } => {
                run_admin_set_role(data_dir, email, Role::User)
            }
        },
        Commands::Auth { command } => match command {
            AuthCommands::Register {
                server,
                email,
                password,
                non_interactive,
            } => run_auth_register(server, email, password, non_interactive),
            AuthCommands::Login {
                server,
                email,
                password,
                non_interactive,
            } => run_auth_login(server, email, password, non_interactive),
            AuthCommands::Logout => run_auth_logout(),
        },
        Commands::Page { command } => match command {
            PageCommands::List {
                category,
                server,
                json,
            } => run_page_list(category, server, json),
            PageCommands::Add {
                title,
                url,
                description,
                category,
                common,
                non_interactive,
            } => run_page_add(title, url, description, category, common, non_interactive),
            PageCommands::Edit {
                page_id,
                title,
                url,
                description,
                category,
                common,
                non_interactive,
            } => run_page_edit(page_id, title, url, description, category, common, non_interactive),
            PageCommands::Delete {
                page_id,
                non_interactive,
                yes,
            } => run_page_delete(page_id, non_interactive, yes),
        },
        Commands::Category { command } => match command {
            CategoryCommands::List { server, json } => run_category_list(server, json),
            CategoryCommands::Add {
                name,
                non_interactive,
            } => run_category_add(name, non_interactive),
            CategoryCommands::Rename {
                category_id,
                name,
                non_interactive,
            } => run_category_rename(category_id, name, non_interactive),
            CategoryCommands::Delete {
                category_id,
                non_interactive,
                yes,
            } => run_category_delete(category_id, non_interactive, yes),
        },
        Commands::User { command } => match command {
            UserCommands::List { role, json } => run_user_list(role, json),
        },
        Commands::Serve { .. } => bail!("serve must run on the async runtime"),
    }
}
