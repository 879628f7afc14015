use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use cryptex::auth::{LoginForm, SignupForm};
use cryptex::config::Config;
use cryptex::dashboard::Dashboard;
use cryptex::home::Home;
use cryptex::notify::{Notifier, TerminalSink};
use cryptex::render;
use cryptex::router::Route;
use cryptex::session::FileBackend;
use cryptex::state::AppContext;

#[derive(Parser)]
#[command(name = "cryptex")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Track a crypto portfolio against the live market")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL
    #[arg(long, env = "CRYPTEX_BACKEND_URL", global = true)]
    backend_url: Option<String>,

    /// Disable coloured percentage cells
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account
    Signup {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show holdings and portfolio stats
    Dashboard,
    /// Add a holding
    Add {
        coin: String,
        quantity: String,
        buy_price: String,
    },
    /// Change the quantity of a holding
    Edit { id: String, quantity: String },
    /// Delete a holding
    Delete { id: String },
    /// Portfolio value and the live market
    Home,
    /// Open the screen at a path (/, /login, /signup, /dashboard, /home)
    Open { path: String },
}

async fn show(ctx: &AppContext, route: Route, color: bool) -> anyhow::Result<()> {
    match route.resolve() {
        Route::Dashboard => {
            let mut view = Dashboard::new(ctx.clone());
            let loaded = view.load().await;
            print!("{}", render::dashboard(&view));
            loaded?;
        }
        Route::Home => {
            let mut view = Home::new(ctx.clone());
            let loaded = view.load().await;
            print!("{}", render::home(&view, color));
            loaded?;
        }
        Route::Root | Route::Login => {
            println!("Sign in with `cryptex login --email <EMAIL> --password <PASSWORD>`")
        }
        Route::Signup => {
            println!("Create an account with `cryptex signup --username <NAME> --email <EMAIL> --password <PASSWORD>`")
        }
    }
    Ok(())
}

/// The load failure was already shown; changes to a holding do not depend on it.
async fn load_for_change(view: &mut Dashboard) {
    if let Err(e) = view.load().await {
        debug!("continuing with a partial dashboard: {e}");
    }
}

async fn run(cli: Cli, ctx: AppContext) -> anyhow::Result<()> {
    let color = !cli.no_color;
    match cli.command {
        Commands::Login { email, password } => {
            let route = LoginForm::with_credentials(ctx.clone(), email, password).submit().await?;
            show(&ctx, route, color).await?;
        }
        Commands::Signup { username, email, password } => {
            let route = SignupForm::with_details(ctx.clone(), username, email, password).submit().await?;
            show(&ctx, route, color).await?;
        }
        Commands::Logout => match ctx.logout().await {
            Ok(_) => ctx.notifier.success("Logged out").await,
            Err(e) => {
                ctx.notifier.error(e.user_message()).await;
                return Err(e.into());
            }
        },
        Commands::Dashboard => show(&ctx, Route::Dashboard, color).await?,
        Commands::Add { coin, quantity, buy_price } => {
            let mut view = Dashboard::new(ctx.clone());
            load_for_change(&mut view).await;
            view.add(&coin, &quantity, &buy_price).await?;
            print!("{}", render::dashboard(&view));
        }
        Commands::Edit { id, quantity } => {
            let mut view = Dashboard::new(ctx.clone());
            load_for_change(&mut view).await;
            if let Err(e) = view.begin_edit(&id) {
                ctx.notifier.error(e.user_message()).await;
                return Err(e.into());
            }
            view.set_edit_quantity(quantity);
            view.save_edit().await?;
            print!("{}", render::dashboard(&view));
        }
        Commands::Delete { id } => {
            let mut view = Dashboard::new(ctx.clone());
            load_for_change(&mut view).await;
            view.delete(&id).await?;
            ctx.notifier.success("Holding deleted").await;
            print!("{}", render::dashboard(&view));
        }
        Commands::Home => show(&ctx, Route::Home, color).await?,
        Commands::Open { path } => {
            let route = match ctx.navigator.navigate_to_path(&path).await {
                Ok(route) => route,
                Err(e) => {
                    ctx.notifier.error(e.to_string()).await;
                    return Err(e.into());
                }
            };
            show(&ctx, route, color).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(url) = &cli.backend_url {
        config.backend_url = url.clone();
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(backend = %config.backend_url, session = %config.session_file.display(), "starting");
    let backend = Arc::new(FileBackend::new(config.session_file.clone()));
    let notifier = Notifier::with_sink(Arc::new(TerminalSink::new(!cli.no_color)));
    let ctx = match AppContext::new(config, backend, notifier).context("failed to build http client") {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("{e:#}");
            return ExitCode::FAILURE;
        }
    };

    // failures were already shown through the notifier
    match run(cli, ctx).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            debug!("command failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}
