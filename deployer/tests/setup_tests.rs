//! Setup flow with scripted answers.

use deployer::{
    run_setup, DeployConfig, DeployError, Prompt, SetupOptions, SetupOutcome, PROJECT_ID_ENV,
};
use manifest::{placeholders_remaining, ManifestEnv, ManifestError};
use serial_test::serial;
use std::collections::VecDeque;
use std::fs;
use std::io;
use tempfile::TempDir;

const TOKEN: &str = "MTIzNDU2Nzg5MDEyMzQ1Njc4.GaBcDe.abcdefghijklmnopqrstuvwxy_-";
const KEY: &str = "AIzaSyD-1234567890abcdefghijklmnopq";
const NEW_TOKEN: &str = "QUJDREVGR0hJSktMTU5PUFFS.HbCdEf.zyxwvutsrqponmlkjihgfedcb_-";
const NEW_KEY: &str = "AIzaSyZ-0987654321zyxwvutsrqponmlkji";

const TEMPLATE: &str = r#"runtime: python39
entrypoint: python main.py
env_variables:
  DISCORD_BOT_TOKEN: "YOUR_DISCORD_BOT_TOKEN_HERE"
  GEMINI_API_KEY: "YOUR_GEMINI_API_KEY_HERE"
  LOG_LEVEL: "INFO"
"#;

struct ScriptedPrompt {
    answers: VecDeque<String>,
    asked: Vec<String>,
}

impl ScriptedPrompt {
    fn new(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|a| a.to_string()).collect(),
            asked: Vec::new(),
        }
    }
}

impl Prompt for ScriptedPrompt {
    fn ask(&mut self, question: &str) -> io::Result<String> {
        self.asked.push(question.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no more answers"))
    }
}

fn checkout(manifest: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("app.yaml"), manifest).unwrap();
    fs::write(dir.path().join("main.py"), "").unwrap();
    fs::write(dir.path().join("discord_pc_bot.py"), "").unwrap();
    fs::write(dir.path().join("requirements.txt"), "").unwrap();
    dir
}

fn options(dir: &TempDir) -> SetupOptions {
    SetupOptions {
        work_dir: dir.path().to_path_buf(),
        config_path: dir.path().join("deploy.toml"),
        ..Default::default()
    }
}

fn clear_env() {
    std::env::remove_var("DISCORD_BOT_TOKEN");
    std::env::remove_var("GEMINI_API_KEY");
    std::env::remove_var(PROJECT_ID_ENV);
}

fn configured_manifest() -> String {
    TEMPLATE
        .replace("YOUR_DISCORD_BOT_TOKEN_HERE", TOKEN)
        .replace("YOUR_GEMINI_API_KEY_HERE", KEY)
}

#[test]
#[serial]
fn test_setup_from_flags() {
    clear_env();
    let dir = checkout(TEMPLATE);
    let mut opts = options(&dir);
    opts.bot_token = Some(TOKEN.to_string());
    opts.api_key = Some(KEY.to_string());
    opts.project_id = Some("pc-build-bot".to_string());

    let mut prompt = ScriptedPrompt::new(&[]);
    let outcome = run_setup(&opts, &mut prompt).unwrap();

    assert!(matches!(outcome, SetupOutcome::Configured { .. }));
    assert!(prompt.asked.is_empty());

    let manifest = fs::read_to_string(dir.path().join("app.yaml")).unwrap();
    assert!(placeholders_remaining(&manifest).is_empty());
    let env = ManifestEnv::parse(&manifest);
    assert_eq!(env.get("DISCORD_BOT_TOKEN"), Some(TOKEN));
    assert_eq!(env.get("GEMINI_API_KEY"), Some(KEY));

    let config = DeployConfig::load(&dir.path().join("deploy.toml")).unwrap();
    assert_eq!(config.project_id, "pc-build-bot");
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn test_prompt_reasks_until_valid() {
    clear_env();
    let dir = checkout(TEMPLATE);
    let mut prompt = ScriptedPrompt::new(&["not-a-token", TOKEN, "sk-wrong", KEY, "", "pc-build-bot"]);

    run_setup(&options(&dir), &mut prompt).unwrap();

    assert_eq!(prompt.asked.len(), 6);
    let config = DeployConfig::load(&dir.path().join("deploy.toml")).unwrap();
    assert_eq!(config.project_id, "pc-build-bot");
}

#[test]
#[serial]
fn test_invalid_flag_value_is_an_error() {
    clear_env();
    let dir = checkout(TEMPLATE);
    let mut opts = options(&dir);
    opts.bot_token = Some("definitely-not-a-token".to_string());

    let err = run_setup(&opts, &mut ScriptedPrompt::new(&[])).unwrap_err();
    assert!(matches!(
        err,
        DeployError::Manifest(ManifestError::InvalidCredential { .. })
    ));
    // Nothing is written on failure
    let manifest = fs::read_to_string(dir.path().join("app.yaml")).unwrap();
    assert_eq!(manifest, TEMPLATE);
}

#[test]
#[serial]
fn test_credentials_from_environment() {
    std::env::set_var("DISCORD_BOT_TOKEN", TOKEN);
    std::env::set_var("GEMINI_API_KEY", KEY);
    let dir = checkout(TEMPLATE);
    let mut prompt = ScriptedPrompt::new(&["pc-build-bot"]);

    let result = run_setup(&options(&dir), &mut prompt);
    clear_env();

    result.unwrap();
    assert_eq!(prompt.asked.len(), 1);
    let manifest = fs::read_to_string(dir.path().join("app.yaml")).unwrap();
    assert!(manifest.contains(TOKEN));
}

#[test]
#[serial]
fn test_configured_manifest_asks_before_reconfiguring() {
    clear_env();
    let dir = checkout(&configured_manifest());
    let mut prompt = ScriptedPrompt::new(&["n"]);

    let outcome = run_setup(&options(&dir), &mut prompt).unwrap();

    assert_eq!(outcome, SetupOutcome::AlreadyConfigured);
    assert!(!dir.path().join("deploy.toml").exists());
}

#[test]
#[serial]
fn test_reconfiguring_replaces_existing_credentials() {
    clear_env();
    let dir = checkout(&configured_manifest());
    let mut prompt = ScriptedPrompt::new(&["y", NEW_TOKEN, NEW_KEY, "pc-build-bot"]);

    let outcome = run_setup(&options(&dir), &mut prompt).unwrap();

    assert!(matches!(outcome, SetupOutcome::Configured { .. }));
    let manifest = fs::read_to_string(dir.path().join("app.yaml")).unwrap();
    let env = ManifestEnv::parse(&manifest);
    assert_eq!(env.get("DISCORD_BOT_TOKEN"), Some(NEW_TOKEN));
    assert_eq!(env.get("GEMINI_API_KEY"), Some(NEW_KEY));
    assert_eq!(env.get("LOG_LEVEL"), Some("INFO"));
    assert!(!manifest.contains(TOKEN));
}

#[test]
#[serial]
fn test_force_reconfigures_without_asking() {
    clear_env();
    let dir = checkout(&configured_manifest());
    let mut opts = options(&dir);
    opts.bot_token = Some(NEW_TOKEN.to_string());
    opts.api_key = Some(NEW_KEY.to_string());
    opts.project_id = Some("pc-build-bot".to_string());
    opts.force = true;

    let mut prompt = ScriptedPrompt::new(&[]);
    run_setup(&opts, &mut prompt).unwrap();

    assert!(prompt.asked.is_empty());
    let manifest = fs::read_to_string(dir.path().join("app.yaml")).unwrap();
    assert_eq!(ManifestEnv::parse(&manifest).get("DISCORD_BOT_TOKEN"), Some(NEW_TOKEN));
}

#[test]
#[serial]
fn test_project_id_from_environment() {
    clear_env();
    std::env::set_var(PROJECT_ID_ENV, "env-project");
    let dir = checkout(TEMPLATE);
    let mut prompt = ScriptedPrompt::new(&[TOKEN, KEY]);

    let result = run_setup(&options(&dir), &mut prompt);
    clear_env();

    result.unwrap();
    assert_eq!(prompt.asked.len(), 2);
    let config = DeployConfig::load(&dir.path().join("deploy.toml")).unwrap();
    assert_eq!(config.project_id, "env-project");
}

#[test]
#[serial]
fn test_setup_requires_bot_module() {
    clear_env();
    let dir = checkout(TEMPLATE);
    fs::remove_file(dir.path().join("discord_pc_bot.py")).unwrap();

    let err = run_setup(&options(&dir), &mut ScriptedPrompt::new(&[])).unwrap_err();
    match err {
        DeployError::Manifest(ManifestError::MissingArtifact { name }) => {
            assert_eq!(name, "discord_pc_bot.py")
        }
        other => panic!("expected missing bot module, got {:?}", other),
    }
}

#[test]
#[serial]
fn test_placeholder_project_is_refused() {
    clear_env();
    let dir = checkout(TEMPLATE);
    let mut opts = options(&dir);
    opts.bot_token = Some(TOKEN.to_string());
    opts.api_key = Some(KEY.to_string());
    opts.project_id = Some("your-project-id-here".to_string());

    let err = run_setup(&opts, &mut ScriptedPrompt::new(&[])).unwrap_err();
    assert!(matches!(err, DeployError::Config(_)));
    assert!(!dir.path().join("deploy.toml").exists());
    let manifest = fs::read_to_string(dir.path().join("app.yaml")).unwrap();
    assert_eq!(manifest, TEMPLATE);
}
