//! Git `post-receive` hook that announces pushed commits on Slack.

use std::io::BufRead;
use std::path::PathBuf;

pub mod config;
pub mod error;
pub mod git;
pub mod git_collector;
pub mod models;
pub mod notification;
pub mod publisher;

use crate::config::{HookConfig, HookSettings};
use crate::error::{HookError, Result};
use crate::git::GitRunner;
use crate::git_collector::{repo_name, GitCollector};
use crate::models::PushEvent;
use crate::notification::{build_attachments, build_payload};
use crate::publisher::Notifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoWebhookUrl,
    RefFiltered,
    NoChannel,
    RefDeleted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    Sent { commits: usize },
    Skipped(SkipReason),
}

/// Everything shared by the push events of one hook invocation.
pub struct PushContext<'a> {
    git: &'a dyn GitRunner,
    settings: HookSettings,
    repo_name: String,
}

impl<'a> PushContext<'a> {
    pub fn new(git: &'a dyn GitRunner, config: &HookConfig, cwd: impl Into<PathBuf>) -> Result<Self> {
        let settings = HookSettings::resolve(config)?;
        let cwd: PathBuf = cwd.into();
        let repo_name = repo_name(&cwd, settings.bare, settings.strip_bare_git_extension);
        Ok(PushContext {
            git,
            settings,
            repo_name,
        })
    }

    pub fn repo_name(&self) -> &str {
        &self.repo_name
    }

    /// Processes one push event. `connect` builds the notifier for the
    /// configured webhook URL and is only called when there is something to
    /// send.
    pub fn handle_push<F>(&self, event: &PushEvent, connect: &F) -> Result<PushOutcome>
    where
        F: Fn(&str) -> Box<dyn Notifier>,
    {
        let webhook_url = match self.settings.webhook_url.as_deref() {
            Some(url) => url,
            None => {
                log::warn!("Slack hook: No webhook_url set.");
                return Ok(PushOutcome::Skipped(SkipReason::NoWebhookUrl));
            }
        };

        if !self.settings.ref_matches(&event.refname) {
            log::info!("{} does not match branch regex, not posting", event.refname);
            return Ok(PushOutcome::Skipped(SkipReason::RefFiltered));
        }

        let channel = match self.settings.channel.as_deref() {
            Some(channel) => channel,
            None => {
                log::warn!("Slack hook: No slack_channel set.");
                return Ok(PushOutcome::Skipped(SkipReason::NoChannel));
            }
        };

        if event.is_ref_deletion() {
            log::info!("{} was deleted, nothing to announce", event.refname);
            return Ok(PushOutcome::Skipped(SkipReason::RefDeleted));
        }

        let collector = GitCollector::new(self.git);
        let revisions = collector.list_revisions(&event.old, &event.new)?;
        let attachments =
            build_attachments(&collector, &revisions, &self.settings, &self.repo_name)?;

        let repo_title = self
            .settings
            .repository_title
            .as_deref()
            .unwrap_or(&self.repo_name);
        let payload = build_payload(&self.settings, channel, repo_title, event, attachments);
        let commits = payload.attachments.len();

        connect(webhook_url).send(&payload)?;
        log::info!("posted {} commits for {}", commits, event.refname);

        Ok(PushOutcome::Sent { commits })
    }

    /// Handles every `<old> <new> <ref>` line of `input` in order. Malformed
    /// lines are skipped; any other failure stops the run.
    pub fn run<R, F>(&self, input: R, connect: &F) -> Result<Vec<PushOutcome>>
    where
        R: BufRead,
        F: Fn(&str) -> Box<dyn Notifier>,
    {
        let mut outcomes = Vec::new();
        for line in input.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let event: PushEvent = match line.parse() {
                Ok(event) => event,
                Err(HookError::MalformedPushLine(raw)) => {
                    log::warn!("ignoring malformed input line '{}'", raw);
                    continue;
                }
                Err(e) => return Err(e),
            };
            outcomes.push(self.handle_push(&event, connect)?);
        }
        Ok(outcomes)
    }
}
