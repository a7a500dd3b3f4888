use std::path::Path;

/// Process settings, all sourced from the environment. Missing service
/// credentials are not an error here; construction of the real clients
/// fails later with a pointed message instead.
#[derive(Debug, Clone)]
pub struct Settings {
    pub openai_api_key: Option<String>,
    pub gpt_model: String,
    pub weaviate_url: Option<String>,
    pub weaviate_api_key: Option<String>,
}

impl Settings {
    pub fn load() -> Self {
        load_dotenv();
        Self {
            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            gpt_model: std::env::var("GPT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            weaviate_url: std::env::var("WEAVIATE_URL").ok(),
            weaviate_api_key: std::env::var("WEAVIATE_API_KEY").ok(),
        }
    }
}

/// Load environment variables from a `.env` file (best-effort). Checks the
/// working directory and up to two parents so crate-local runs find the
/// repo-root file.
pub fn load_dotenv() {
    for path in [".env", "../.env", "../../.env"] {
        load_env_file_if_present(path);
    }
}

fn load_env_file_if_present(path: impl AsRef<Path>) {
    if let Ok(content) = std::fs::read_to_string(path) {
        parse_env_file(&content);
    }
}

fn parse_env_file(content: &str) {
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = parse_key_value(trimmed) {
            set_env_if_unset(&key, &value);
        }
    }
}

fn parse_key_value(line: &str) -> Option<(String, String)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    let value = value.trim().trim_matches('"').trim_matches('\'');
    Some((key.to_string(), value.to_string()))
}

fn set_env_if_unset(key: &str, value: &str) {
    if std::env::var(key).is_err() {
        std::env::set_var(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quoted_and_plain_values() {
        assert_eq!(
            parse_key_value("KEY=value"),
            Some(("KEY".to_string(), "value".to_string()))
        );
        assert_eq!(
            parse_key_value("KEY=\"quoted value\""),
            Some(("KEY".to_string(), "quoted value".to_string()))
        );
        assert_eq!(parse_key_value("=value"), None);
        assert_eq!(parse_key_value("no equals sign"), None);
    }
}
