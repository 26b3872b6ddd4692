use clap::{Parser, Subcommand};

use inkpress::{
    configuration::Settings,
    seeder::{self, AdminAccount},
    startup::{Application, connect_pool},
    telemetry::init_logger,
};

#[derive(Parser)]
#[command(name = "inkpress")]
#[command(about = "Content management backend")]
#[command(version)]
struct Cli {
    /// Configuration file, later files override earlier ones
    #[arg(
        short,
        long = "config",
        global = true,
        default_value = "configuration/application.toml"
    )]
    configs: Vec<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default)
    Serve,

    /// Apply database migrations and exit
    Migrate,

    /// Insert the permission catalogue and default roles
    Seed {
        /// Also create an administrator holding the Super Admin role
        #[arg(long, requires_all = ["admin_email", "admin_password"])]
        admin_username: Option<String>,

        #[arg(long)]
        admin_email: Option<String>,

        #[arg(long)]
        admin_password: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = Settings::try_load(&cli.configs)?;
    init_logger(&cfg.log);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let app = Application::build(&cfg).await?;
            app.run_until_stopped().await?;
        }
        Commands::Migrate => {
            let pool = connect_pool(&cfg.database).await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            tracing::info!("Migrations applied");
        }
        Commands::Seed {
            admin_username,
            admin_email,
            admin_password,
        } => {
            let pool = connect_pool(&cfg.database).await?;
            sqlx::migrate!("./migrations").run(&pool).await?;

            let admin = match (admin_username, admin_email, admin_password) {
                (Some(username), Some(email), Some(password)) => Some(AdminAccount {
                    username,
                    email,
                    password,
                }),
                _ => None,
            };

            seeder::run(&pool, admin).await?;
        }
    }

    Ok(())
}
