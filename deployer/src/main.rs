use clap::{Parser, Subcommand};
use deployer::{
    run_setup, DeployConfig, DeployResult, HealthProbe, Orchestrator, SetupOptions, StdinPrompt,
    DEFAULT_CONFIG_FILE,
};
use platform::{health_url_for, GcloudPlatform};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "deployer")]
#[command(about = "Deploy the PC build Discord bot to Google App Engine")]
struct Cli {
    /// Deployment config file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Directory holding app.yaml, main.py and requirements.txt
    #[arg(short, long, global = true)]
    dir: Option<PathBuf>,
    /// Google Cloud project to deploy into
    #[arg(short, long, global = true)]
    project: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check prerequisites, configure the project and deploy (default)
    Deploy {
        /// Poll the health endpoint after deploying
        #[arg(long)]
        verify: bool,
    },
    /// Run the pre-flight checks without touching the cloud project
    Check,
    /// Fill in credentials and the project id
    Setup {
        /// Discord bot token (defaults to $DISCORD_BOT_TOKEN, then a prompt)
        #[arg(long)]
        bot_token: Option<String>,
        /// Gemini API key (defaults to $GEMINI_API_KEY, then a prompt)
        #[arg(long)]
        api_key: Option<String>,
        /// Reconfigure even if app.yaml is already filled in
        #[arg(short, long)]
        force: bool,
    },
    /// Poll a deployed service's health endpoint
    Verify {
        /// Service URL; /health is appended
        #[arg(short, long)]
        url: String,
        /// Give up after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("{}", e);
        eprintln!("✗ {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> DeployResult<()> {
    let mut config = DeployConfig::load(&cli.config)?.apply_env();
    if let Some(dir) = cli.dir {
        config = config.with_work_dir(dir);
    }
    if let Some(project) = &cli.project {
        config = config.with_project_id(project.clone());
    }

    match cli.command.unwrap_or(Commands::Deploy { verify: false }) {
        Commands::Deploy { verify } => {
            if verify {
                config = config.with_verify(true);
            }
            deploy(config).await
        }
        Commands::Check => check(config).await,
        Commands::Setup {
            bot_token,
            api_key,
            force,
        } => {
            let options = SetupOptions {
                work_dir: config.work_dir.clone(),
                config_path: cli.config,
                bot_token,
                api_key,
                project_id: cli.project,
                force,
            };
            run_setup(&options, &mut StdinPrompt)?;
            Ok(())
        }
        Commands::Verify { url, timeout } => {
            let timeout = timeout
                .map(Duration::from_secs)
                .unwrap_or_else(|| config.health.timeout());
            verify(&health_url_for(&url), config.health.interval(), timeout).await
        }
    }
}

fn orchestrator(config: DeployConfig) -> DeployResult<Orchestrator> {
    let platform = GcloudPlatform::new(config.gcloud_config(), config.work_dir.clone())?;
    Orchestrator::new(config, Box::new(platform))
}

async fn deploy(config: DeployConfig) -> DeployResult<()> {
    println!("Deploying to project {}", config.project_id);
    println!();

    let health = config.health.clone();
    let mut orchestrator = orchestrator(config)?;
    let report = orchestrator.deploy().await?;

    let elapsed = report.finished_at - report.started_at;
    info!("Deploy finished in {}s", elapsed.num_seconds());
    println!();
    println!("✓ Deployment complete in {}s", elapsed.num_seconds());

    if health.verify {
        if let Some(endpoint) = &report.endpoint {
            verify(&endpoint.health_url, health.interval(), health.timeout()).await?;
        }
    }

    Ok(())
}

async fn check(config: DeployConfig) -> DeployResult<()> {
    let mut orchestrator = orchestrator(config)?;
    let report = orchestrator.preflight().await?;

    println!();
    if report.unconfigured_env.is_empty() {
        println!("✓ Ready to deploy");
    } else {
        println!(
            "✓ Ready to deploy ({} environment variable(s) still need values)",
            report.unconfigured_env.len()
        );
    }
    Ok(())
}

async fn verify(health_url: &str, interval: Duration, timeout: Duration) -> DeployResult<()> {
    println!("Waiting for {} to report healthy...", health_url);

    let probe = HealthProbe::new(interval, timeout)?;
    let report = probe.wait_until_healthy(health_url).await?;
    let ready = report
        .body
        .as_ref()
        .and_then(|body| body.bot_ready)
        .unwrap_or(true);
    println!("✓ Health check passed (bot ready: {})", ready);
    Ok(())
}
