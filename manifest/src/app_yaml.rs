//! Inspection of the `app.yaml` App Engine manifest.
//!
//! Only the two top-level keys deploys care about are read: `runtime` and
//! the flat `env_variables` mapping. Nested structures elsewhere in the
//! document are skipped.

use crate::credentials::Credentials;
use std::collections::BTreeMap;

pub const BOT_TOKEN_KEY: &str = "DISCORD_BOT_TOKEN";
pub const API_KEY_KEY: &str = "GEMINI_API_KEY";
pub const LOG_LEVEL_KEY: &str = "LOG_LEVEL";

/// Keys the bot refuses to start without.
pub const REQUIRED_ENV_KEYS: [&str; 2] = [BOT_TOKEN_KEY, API_KEY_KEY];

const ENV_SECTION: &str = "env_variables";

/// Marker values shipped in the template manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    BotToken,
    ApiKey,
}

impl Placeholder {
    pub const ALL: [Placeholder; 2] = [Placeholder::BotToken, Placeholder::ApiKey];

    pub fn marker(&self) -> &'static str {
        match self {
            Placeholder::BotToken => "YOUR_DISCORD_BOT_TOKEN_HERE",
            Placeholder::ApiKey => "YOUR_GEMINI_API_KEY_HERE",
        }
    }

    pub fn env_key(&self) -> &'static str {
        match self {
            Placeholder::BotToken => BOT_TOKEN_KEY,
            Placeholder::ApiKey => API_KEY_KEY,
        }
    }

    fn is_marker(value: &str) -> bool {
        Self::ALL.iter().any(|p| p.marker() == value)
    }
}

/// Template markers still present in a manifest.
pub fn placeholders_remaining(text: &str) -> Vec<Placeholder> {
    Placeholder::ALL
        .into_iter()
        .filter(|p| text.contains(p.marker()))
        .collect()
}

pub fn substitute_placeholders(text: &str, credentials: &Credentials) -> String {
    text.replace(Placeholder::BotToken.marker(), &credentials.bot_token)
        .replace(Placeholder::ApiKey.marker(), &credentials.api_key)
}

/// Sets `key` inside the `env_variables` block, replacing any existing
/// value. Indentation and trailing comments on the line are kept; the key
/// is appended to the block (or a new block) when absent.
pub fn set_env_value(text: &str, key: &str, value: &str) -> String {
    let entry = format!("{}: \"{}\"", key, value);
    let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
    let mut in_env_section = false;
    let mut section_end = None;
    let mut entry_indent = "  ".to_string();

    for (i, raw) in text.lines().enumerate() {
        let line = strip_comment(raw);
        if line.trim().is_empty() {
            continue;
        }

        let indented = line.starts_with(' ') || line.starts_with('\t');
        if !indented {
            in_env_section = matches!(split_entry(line), Some((k, _)) if k == ENV_SECTION);
            if in_env_section {
                section_end = Some(i + 1);
            }
            continue;
        }

        if in_env_section {
            let body = line.trim_start();
            let indent = &line[..line.len() - body.len()];
            section_end = Some(i + 1);
            entry_indent = indent.to_string();

            if matches!(split_entry(body), Some((k, _)) if k == key) {
                let comment = &raw[line.trim_end().len()..];
                lines[i] = format!("{}{}{}", indent, entry, comment);
                return join_lines(text, lines);
            }
        }
    }

    match section_end {
        Some(at) => lines.insert(at, format!("{}{}", entry_indent, entry)),
        None => {
            lines.push(format!("{}:", ENV_SECTION));
            lines.push(format!("{}{}", entry_indent, entry));
        }
    }
    join_lines(text, lines)
}

fn join_lines(original: &str, lines: Vec<String>) -> String {
    let mut joined = lines.join("\n");
    if original.ends_with('\n') || original.is_empty() {
        joined.push('\n');
    }
    joined
}

/// `runtime` and `env_variables` as declared in `app.yaml`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestEnv {
    pub runtime: Option<String>,
    pub vars: BTreeMap<String, String>,
}

impl ManifestEnv {
    pub fn parse(text: &str) -> Self {
        let mut env = ManifestEnv::default();
        let mut in_env_section = false;

        for raw in text.lines() {
            let line = strip_comment(raw);
            if line.trim().is_empty() {
                continue;
            }

            let indented = line.starts_with(' ') || line.starts_with('\t');
            if !indented {
                in_env_section = false;
                if let Some((key, value)) = split_entry(line) {
                    if key == ENV_SECTION {
                        in_env_section = true;
                    } else if key == "runtime" && !value.is_empty() {
                        env.runtime = Some(value);
                    }
                }
                continue;
            }

            if in_env_section {
                if let Some((key, value)) = split_entry(line.trim_start()) {
                    env.vars.insert(key, value);
                }
            }
        }

        env
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Present, non-empty and not a template marker.
    pub fn is_configured(&self, key: &str) -> bool {
        self.get(key)
            .is_some_and(|value| !value.is_empty() && !Placeholder::is_marker(value))
    }

    pub fn unconfigured_keys(&self) -> Vec<&'static str> {
        REQUIRED_ENV_KEYS
            .into_iter()
            .filter(|key| !self.is_configured(key))
            .collect()
    }
}

fn strip_comment(line: &str) -> &str {
    let mut in_single = false;
    let mut in_double = false;
    for (i, c) in line.char_indices() {
        match c {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            '#' if !in_single && !in_double => {
                let preceded_by_space = i == 0 || line[..i].ends_with([' ', '\t']);
                if preceded_by_space {
                    return &line[..i];
                }
            }
            _ => {}
        }
    }
    line
}

fn split_entry(line: &str) -> Option<(String, String)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim();
    if key.is_empty() || key.starts_with('-') {
        return None;
    }
    Some((key.to_string(), unquote(value.trim()).to_string()))
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
