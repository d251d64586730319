pub mod parse;
pub mod types;

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub use parse::{load_config, parse_config, ConfigError};
pub use types::Config;

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV_VAR: &str = "CWTAIL_CONFIG";

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // VAR_NAME starts with a letter or underscore, followed by alphanumerics or underscores
    PATTERN.get_or_init(|| Regex::new(r"\$env\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap())
}

/// Expands environment variables in a string.
/// Supports $env{VAR_NAME} syntax.
/// If an environment variable is not set, it's left unchanged.
pub fn expand_env_vars(text: &str) -> String {
    env_var_pattern()
        .replace_all(text, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .to_string()
}

/// Names of `$env{...}` references still present in `text`, sorted and deduplicated.
pub fn unexpanded_env_vars(text: &str) -> Vec<String> {
    let mut names: Vec<String> = env_var_pattern()
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect();
    names.sort();
    names.dedup();
    names
}

/// Expands tilde (~) in paths to the user's home directory.
/// Returns the path unchanged if it doesn't start with tilde or home directory cannot be determined.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();

    if let Some(rest) = path_str.strip_prefix("~/") {
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(rest);
        }
    } else if path_str == "~" {
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir;
        }
    }

    path.to_path_buf()
}

/// Resolves the config file path. Returns the first match from:
/// 1. Explicit path (flag or `CWTAIL_CONFIG`, with tilde expansion)
/// 2. ./config.yaml
/// 3. ~/.config/cwtail/config.yaml
/// 4. /etc/cwtail/config.yaml
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(expand_tilde(path));
    }

    let local = PathBuf::from("config.yaml");
    if local.exists() {
        return Some(local);
    }

    if let Some(home_dir) = dirs::home_dir() {
        let user_config = home_dir.join(".config/cwtail/config.yaml");
        if user_config.exists() {
            return Some(user_config);
        }
    }

    let system_config = PathBuf::from("/etc/cwtail/config.yaml");
    if system_config.exists() {
        return Some(system_config);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_vars_single() {
        std::env::set_var("CWTAIL_TEST_VAR", "test_value");
        let result = expand_env_vars("path/$env{CWTAIL_TEST_VAR}/file");
        assert_eq!(result, "path/test_value/file");
        std::env::remove_var("CWTAIL_TEST_VAR");
    }

    #[test]
    fn test_expand_env_vars_unset() {
        let result = expand_env_vars("token: $env{CWTAIL_NONEXISTENT_VAR}");
        assert_eq!(result, "token: $env{CWTAIL_NONEXISTENT_VAR}");
    }

    #[test]
    fn test_expand_env_vars_ignores_shell_syntax() {
        let result = expand_env_vars("${HOME}/logs");
        assert_eq!(result, "${HOME}/logs");
    }

    #[test]
    fn test_unexpanded_env_vars_dedup() {
        let names = unexpanded_env_vars("$env{B} $env{A} $env{B}");
        assert_eq!(names, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_expand_tilde_with_path() {
        let expanded = expand_tilde(Path::new("~/offsets"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expanded, home.join("offsets"));
        }
    }

    #[test]
    fn test_expand_tilde_no_expansion() {
        assert_eq!(expand_tilde(Path::new("/var/lib/cwtail")), Path::new("/var/lib/cwtail"));
        assert_eq!(expand_tilde(Path::new("relative/path")), Path::new("relative/path"));
    }

    #[test]
    fn test_resolve_explicit_path_wins() {
        let resolved = resolve_config_path(Some(Path::new("/opt/cwtail.yaml")));
        assert_eq!(resolved, Some(PathBuf::from("/opt/cwtail.yaml")));
    }
}
