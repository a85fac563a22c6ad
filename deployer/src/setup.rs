//! First-time configuration of a bot checkout.
//!
//! Fills the credential placeholders in `app.yaml` and records the target
//! project in `deploy.toml`. Values come from flags, then the environment
//! (including `.env`), then an interactive prompt.

use crate::config::{DeployConfig, PROJECT_ID_ENV};
use crate::orchestrator::DeployResult;
use manifest::{
    placeholders_remaining, set_env_value, substitute_placeholders, validate_api_key,
    validate_bot_token, ArtifactSet, Credentials, ManifestResult, API_KEY_KEY, BOT_TOKEN_KEY,
    MANIFEST_FILE,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::info;

pub const BOT_TOKEN_ENV: &str = "DISCORD_BOT_TOKEN";
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Source of interactive answers.
pub trait Prompt {
    fn ask(&mut self, question: &str) -> io::Result<String>;
}

pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn ask(&mut self, question: &str) -> io::Result<String> {
        print!("{}", question);
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().lock().read_line(&mut input)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed before setup finished",
            ));
        }
        Ok(input.trim().to_string())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SetupOptions {
    pub work_dir: PathBuf,
    pub config_path: PathBuf,
    pub bot_token: Option<String>,
    pub api_key: Option<String>,
    pub project_id: Option<String>,
    /// Reconfigure without asking when the manifest is already filled in
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupOutcome {
    Configured { manifest: PathBuf, config: PathBuf },
    AlreadyConfigured,
}

pub fn run_setup(options: &SetupOptions, prompt: &mut dyn Prompt) -> DeployResult<SetupOutcome> {
    ArtifactSet::for_setup().check(&options.work_dir)?;

    let manifest_path = options.work_dir.join(MANIFEST_FILE);
    let text = std::fs::read_to_string(&manifest_path)?;

    if placeholders_remaining(&text).is_empty() && !options.force {
        println!("✓ {} appears to be configured already.", MANIFEST_FILE);
        let answer = prompt.ask("Do you want to reconfigure? (y/N): ")?;
        if !answer.eq_ignore_ascii_case("y") {
            println!("Setup cancelled.");
            return Ok(SetupOutcome::AlreadyConfigured);
        }
    }

    let bot_token = resolve(
        options.bot_token.as_deref(),
        BOT_TOKEN_ENV,
        "🤖 Enter your Discord Bot Token: ",
        validate_bot_token,
        prompt,
    )?;
    let api_key = resolve(
        options.api_key.as_deref(),
        API_KEY_ENV,
        "🔑 Enter your Gemini API Key: ",
        validate_api_key,
        prompt,
    )?;
    let from_env = std::env::var(PROJECT_ID_ENV)
        .ok()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty());
    let project_id = match options.project_id.clone().or(from_env) {
        Some(id) => id,
        None => ask_non_empty(prompt, "☁️  Enter your Google Cloud Project ID: ")?,
    };

    let config = DeployConfig::load(&options.config_path)?.with_project_id(project_id);
    config.validate()?;

    // A reconfigured manifest has no markers left, so the values are also
    // written by key.
    let credentials = Credentials::new(bot_token, api_key);
    let updated = substitute_placeholders(&text, &credentials);
    let updated = set_env_value(&updated, BOT_TOKEN_KEY, &credentials.bot_token);
    let updated = set_env_value(&updated, API_KEY_KEY, &credentials.api_key);
    std::fs::write(&manifest_path, updated)?;
    println!("✓ Updated {}", MANIFEST_FILE);

    config.save(&options.config_path)?;
    println!("✓ Updated {}", options.config_path.display());

    info!("Setup complete for project {}", config.project_id);
    println!();
    println!("Next steps:");
    println!("  1. Review {} and {}", MANIFEST_FILE, options.config_path.display());
    println!("  2. Run: gcloud auth login");
    println!("  3. Run: deployer");

    Ok(SetupOutcome::Configured {
        manifest: manifest_path,
        config: options.config_path.clone(),
    })
}

/// Explicit or environment values must already be valid; prompted values
/// are asked for again until they are.
fn resolve(
    explicit: Option<&str>,
    env_key: &str,
    question: &str,
    validate: fn(&str) -> ManifestResult<()>,
    prompt: &mut dyn Prompt,
) -> DeployResult<String> {
    let provided = explicit.map(str::to_string).or_else(|| {
        std::env::var(env_key)
            .ok()
            .filter(|value| !value.trim().is_empty())
    });

    if let Some(value) = provided {
        validate(&value)?;
        return Ok(value);
    }

    loop {
        let answer = prompt.ask(question)?;
        match validate(&answer) {
            Ok(()) => return Ok(answer),
            Err(e) => println!("✗ {}. Please check and try again.", e),
        }
    }
}

fn ask_non_empty(prompt: &mut dyn Prompt, question: &str) -> io::Result<String> {
    loop {
        let answer = prompt.ask(question)?;
        if !answer.is_empty() {
            return Ok(answer);
        }
    }
}
