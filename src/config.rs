//! Layered hook configuration.
//!
//! Values come from two places: the repository's git config (`git config -l
//! -z`) and an optional `key = value` file committed to the repository
//! itself. The in-repository file wins over git config, which wins over the
//! built-in defaults.

use std::collections::BTreeMap;

use regex::Regex;

use crate::error::{HookError, Result};
use crate::git::GitRunner;

/// Slack incoming-webhook URL. Required; read from git config only.
pub const WEBHOOK_URL: &str = "hooks.slack.webhook-url";
/// `git show` argument naming the in-repository config file. Git config only.
pub const IN_REPO_CONFIG_FILE: &str = "hooks.slack.in-repo-hook-config-file";
/// Channel to post to, e.g. `#dev` or `@someone`. Required.
pub const CHANNEL: &str = "hooks.slack.channel";
/// Title link template with `{commit}` and optional `{reponame}` placeholders.
pub const COMMIT_URL: &str = "hooks.slack.commit-url";
/// Regex matched against the raw ref (`refs/heads/main`); no match, no post.
pub const BRANCH_REGEX: &str = "hooks.slack.branch-regex";
/// Display name of the posting bot, default `GIT push`.
pub const BOT_NAME: &str = "hooks.slack.bot-name";
/// Human readable repository name, default the directory name.
pub const REPOSITORY_TITLE: &str = "hooks.slack.repository-title";
/// Slack icon for the message, default `:cherries:`.
pub const BOT_ICON: &str = "hooks.slack.bot-icon";
/// Anything but `0` leaves merge commits out. Default `0`.
pub const HIDE_MERGES: &str = "hooks.slack.hide-merges";
/// Anything but `0` drops a bare repository's `.git` suffix. Default `1`.
pub const STRIP_BARE_GIT_EXTENSION: &str = "hooks.slack.strip-bare-git-extension";
pub const CORE_BARE: &str = "core.bare";

pub const DEFAULT_IN_REPO_CONFIG_FILE: &str = "HEAD:.git_slack_hook.conf";
pub const DEFAULT_BRANCH_REGEX: &str = ".*";
pub const DEFAULT_BOT_NAME: &str = "GIT push";
pub const DEFAULT_BOT_ICON: &str = ":cherries:";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookConfig {
    global: BTreeMap<String, String>,
    repo: BTreeMap<String, String>,
}

impl HookConfig {
    pub fn new(global: BTreeMap<String, String>, repo: BTreeMap<String, String>) -> Self {
        HookConfig { global, repo }
    }

    /// Reads git config, then the in-repository file it points at. A missing
    /// or unreadable repository file leaves the repository layer empty.
    pub fn load(git: &dyn GitRunner) -> Result<Self> {
        let global = parse_global_config(&git.run(&["config", "-l", "-z"])?);

        let spec = global
            .get(IN_REPO_CONFIG_FILE)
            .map(String::as_str)
            .unwrap_or(DEFAULT_IN_REPO_CONFIG_FILE);
        let repo = match git.run(&["show", spec]) {
            Ok(raw) => parse_repo_config(&raw),
            Err(e) => {
                log::debug!("no in-repository config at {}: {}", spec, e);
                BTreeMap::new()
            }
        };

        Ok(HookConfig { global, repo })
    }

    pub fn global_value<'a>(&'a self, key: &str, default: Option<&'a str>) -> Option<&'a str> {
        self.global.get(key).map(String::as_str).or(default)
    }

    pub fn repo_value<'a>(&'a self, key: &str, default: Option<&'a str>) -> Option<&'a str> {
        self.repo.get(key).map(String::as_str).or(default)
    }

    /// Repository value, then global value, then `default`. An empty string
    /// at either layer counts as unset.
    pub fn any_value<'a>(&'a self, key: &str, default: Option<&'a str>) -> Option<&'a str> {
        let non_empty = |v: &&str| !v.is_empty();
        self.repo_value(key, None)
            .filter(non_empty)
            .or_else(|| self.global_value(key, None).filter(non_empty))
            .or(default)
    }
}

/// Parses `git config -l -z`: NUL-separated entries, key and value split on
/// the first newline.
pub fn parse_global_config(raw: &str) -> BTreeMap<String, String> {
    raw.split('\0')
        .filter(|item| !item.is_empty())
        .map(|item| match item.split_once('\n') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (item.to_string(), String::new()),
        })
        .collect()
}

/// Parses the in-repository file: `key = value` lines, `#` comments.
pub fn parse_repo_config(raw: &str) -> BTreeMap<String, String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| match line.split_once('=') {
            Some((key, value)) => (key.trim().to_string(), value.trim().to_string()),
            None => (line.to_string(), String::new()),
        })
        .collect()
}

/// Everything one push needs, resolved once from [`HookConfig`].
#[derive(Debug, Clone)]
pub struct HookSettings {
    pub webhook_url: Option<String>,
    pub channel: Option<String>,
    pub commit_url: Option<String>,
    pub branch_regex: Regex,
    pub bot_name: String,
    pub bot_icon: String,
    pub repository_title: Option<String>,
    pub hide_merges: bool,
    pub strip_bare_git_extension: bool,
    pub bare: bool,
}

impl HookSettings {
    pub fn resolve(config: &HookConfig) -> Result<Self> {
        let pattern = config
            .any_value(BRANCH_REGEX, Some(DEFAULT_BRANCH_REGEX))
            .unwrap_or(DEFAULT_BRANCH_REGEX);
        let branch_regex = Regex::new(pattern).map_err(|source| HookError::InvalidBranchRegex {
            pattern: pattern.to_string(),
            source,
        })?;

        let owned = |v: Option<&str>| v.map(str::to_string);

        Ok(HookSettings {
            webhook_url: owned(config.global_value(WEBHOOK_URL, None).filter(|v| !v.is_empty())),
            channel: owned(config.any_value(CHANNEL, None)),
            commit_url: owned(config.any_value(COMMIT_URL, None)),
            branch_regex,
            bot_name: config
                .any_value(BOT_NAME, Some(DEFAULT_BOT_NAME))
                .unwrap_or(DEFAULT_BOT_NAME)
                .to_string(),
            bot_icon: config
                .any_value(BOT_ICON, Some(DEFAULT_BOT_ICON))
                .unwrap_or(DEFAULT_BOT_ICON)
                .to_string(),
            repository_title: owned(config.any_value(REPOSITORY_TITLE, None)),
            hide_merges: config.any_value(HIDE_MERGES, Some("0")) != Some("0"),
            strip_bare_git_extension: config.any_value(STRIP_BARE_GIT_EXTENSION, Some("1"))
                != Some("0"),
            bare: config.global_value(CORE_BARE, Some("false")) == Some("true"),
        })
    }

    /// The filter must match at the very start of the ref name.
    pub fn ref_matches(&self, refname: &str) -> bool {
        self.branch_regex
            .find(refname)
            .map_or(false, |m| m.start() == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct ScriptedGit {
        config: String,
        repo_file: Option<String>,
        calls: RefCell<Vec<String>>,
    }

    impl GitRunner for ScriptedGit {
        fn run(&self, args: &[&str]) -> Result<String> {
            self.calls.borrow_mut().push(args.join(" "));
            match args {
                ["config", ..] => Ok(self.config.clone()),
                ["show", _] => self
                    .repo_file
                    .clone()
                    .ok_or_else(|| HookError::GitError("fatal: invalid object name".to_string())),
                _ => Err(HookError::Other(format!("unexpected call {:?}", args))),
            }
        }
    }

    fn map(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn global_config_splits_on_nul_and_first_newline() {
        let raw = "core.bare\ntrue\0hooks.slack.channel\n#general\0multi.line\nfirst\nsecond\0";
        let parsed = parse_global_config(raw);
        assert_eq!(parsed.get("core.bare").unwrap(), "true");
        assert_eq!(parsed.get("hooks.slack.channel").unwrap(), "#general");
        assert_eq!(parsed.get("multi.line").unwrap(), "first\nsecond");
        assert_eq!(parsed.len(), 3);
    }

    #[test]
    fn repo_config_skips_comments_and_trims() {
        let raw = "# comment\n\n  hooks.slack.channel =  #dev  \nhooks.slack.commit-url=https://x/{commit}?a=b\n   # indented comment\n";
        let parsed = parse_repo_config(raw);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed.get("hooks.slack.channel").unwrap(), "#dev");
        assert_eq!(
            parsed.get("hooks.slack.commit-url").unwrap(),
            "https://x/{commit}?a=b"
        );
    }

    #[test]
    fn any_value_prefers_repo_then_global_then_default() {
        let config = HookConfig::new(
            map(&[(BOT_NAME, "global-bot"), (CHANNEL, "#global")]),
            map(&[(CHANNEL, "#repo")]),
        );
        assert_eq!(config.any_value(CHANNEL, None), Some("#repo"));
        assert_eq!(config.any_value(BOT_NAME, Some("x")), Some("global-bot"));
        assert_eq!(config.any_value(BOT_ICON, Some(":x:")), Some(":x:"));
        assert_eq!(config.any_value(BOT_ICON, None), None);
    }

    #[test]
    fn empty_override_does_not_win() {
        let config = HookConfig::new(map(&[(CHANNEL, "#global")]), map(&[(CHANNEL, "")]));
        assert_eq!(config.any_value(CHANNEL, None), Some("#global"));
        assert_eq!(config.repo_value(CHANNEL, None), Some(""));
    }

    #[test]
    fn load_uses_configured_in_repo_file() {
        let git = ScriptedGit {
            config: format!("{}\nmain:hook.conf\0{}\n#global\0", IN_REPO_CONFIG_FILE, CHANNEL),
            repo_file: Some(format!("{} = #repo\n", CHANNEL)),
            calls: RefCell::new(Vec::new()),
        };
        let config = HookConfig::load(&git).unwrap();
        assert_eq!(config.any_value(CHANNEL, None), Some("#repo"));
        assert_eq!(config.global_value(CHANNEL, None), Some("#global"));
        assert!(git.calls.borrow().contains(&"show main:hook.conf".to_string()));
    }

    #[test]
    fn load_treats_missing_repo_file_as_empty() {
        let git = ScriptedGit {
            config: format!("{}\n#global\0", CHANNEL),
            repo_file: None,
            calls: RefCell::new(Vec::new()),
        };
        let config = HookConfig::load(&git).unwrap();
        assert_eq!(config.any_value(CHANNEL, None), Some("#global"));
        assert!(git
            .calls
            .borrow()
            .contains(&format!("show {}", DEFAULT_IN_REPO_CONFIG_FILE)));
    }

    #[test]
    fn settings_defaults() {
        let settings = HookSettings::resolve(&HookConfig::default()).unwrap();
        assert_eq!(settings.webhook_url, None);
        assert_eq!(settings.channel, None);
        assert_eq!(settings.bot_name, "GIT push");
        assert_eq!(settings.bot_icon, ":cherries:");
        assert!(!settings.hide_merges);
        assert!(settings.strip_bare_git_extension);
        assert!(!settings.bare);
        assert!(settings.ref_matches("refs/heads/anything"));
    }

    #[test]
    fn webhook_url_is_only_read_from_git_config() {
        let config = HookConfig::new(
            BTreeMap::new(),
            map(&[(WEBHOOK_URL, "https://hooks.example/repo")]),
        );
        let settings = HookSettings::resolve(&config).unwrap();
        assert_eq!(settings.webhook_url, None);
    }

    #[test]
    fn branch_filter_is_anchored_at_start() {
        let config = HookConfig::new(map(&[(BRANCH_REGEX, "heads/main")]), BTreeMap::new());
        let settings = HookSettings::resolve(&config).unwrap();
        assert!(!settings.ref_matches("refs/heads/main"));

        let config = HookConfig::new(map(&[(BRANCH_REGEX, "^refs/heads/main$")]), BTreeMap::new());
        let settings = HookSettings::resolve(&config).unwrap();
        assert!(settings.ref_matches("refs/heads/main"));
        assert!(!settings.ref_matches("refs/heads/feature"));
    }

    #[test]
    fn invalid_branch_regex_is_reported() {
        let config = HookConfig::new(map(&[(BRANCH_REGEX, "refs/(heads")]), BTreeMap::new());
        let err = HookSettings::resolve(&config).unwrap_err();
        assert!(matches!(err, HookError::InvalidBranchRegex { .. }));
    }

    #[test]
    fn flags_follow_zero_means_off() {
        let config = HookConfig::new(
            map(&[(HIDE_MERGES, "1"), (CORE_BARE, "true")]),
            map(&[(STRIP_BARE_GIT_EXTENSION, "0")]),
        );
        let settings = HookSettings::resolve(&config).unwrap();
        assert!(settings.hide_merges);
        assert!(settings.bare);
        assert!(!settings.strip_bare_git_extension);
    }
}
