//! Turns extracted revisions into a Slack webhook payload.

use crate::config::HookSettings;
use crate::error::Result;
use crate::git_collector::GitCollector;
use crate::models::{abbreviate, Attachment, Payload, PushEvent, Revision};

pub const MERGE_COLOR: &str = "good";

/// Attachment for one revision. `parents` comes from a parent lookup on the
/// revision; two parents mark it as a merge in the title.
pub fn build_attachment(
    revision: &Revision,
    parents: &[String],
    commit_url: Option<&str>,
    repo_name: &str,
) -> Attachment {
    let mut title = revision.short_id().to_string();
    let mut color = None;
    if parents.len() == 2 {
        let joined = parents
            .iter()
            .map(|p| abbreviate(p))
            .collect::<Vec<_>>()
            .join(" + ");
        title.push_str(&format!("   ( merge {} )", joined));
        color = Some(MERGE_COLOR.to_string());
    }

    Attachment {
        fallback: format!(
            "Commit #{} by {} <{}> on {}:\n{}",
            revision.short_id(),
            revision.name,
            revision.email,
            revision.date,
            revision.message
        ),
        author_name: revision.name.clone(),
        author_link: format!("mailto:{}", revision.email),
        title,
        title_link: commit_url.map(|template| render_commit_url(template, &revision.id, repo_name)),
        text: revision.message.clone(),
        ts: revision.timestamp,
        color,
    }
}

/// Fills the `{commit}` and `{reponame}` placeholders.
pub fn render_commit_url(template: &str, commit: &str, repo_name: &str) -> String {
    template
        .replace("{commit}", commit)
        .replace("{reponame}", repo_name)
}

/// Envelope around the attachments.
pub fn build_payload(
    settings: &HookSettings,
    channel: &str,
    repo_title: &str,
    event: &PushEvent,
    attachments: Vec<Attachment>,
) -> Payload {
    Payload {
        channel: channel.to_string(),
        username: settings.bot_name.clone(),
        icon_emoji: settings.bot_icon.clone(),
        text: format!(
            "[{} / *{}*] {} commits",
            repo_title,
            event.short_ref(),
            attachments.len()
        ),
        attachments,
    }
}

/// Builds attachments for every revision, dropping merges when
/// `hide_merges` is set.
pub fn build_attachments(
    collector: &GitCollector,
    revisions: &[Revision],
    settings: &HookSettings,
    repo_name: &str,
) -> Result<Vec<Attachment>> {
    let mut attachments = Vec::with_capacity(revisions.len());
    for revision in revisions {
        let parents = collector.parents(&revision.id)?;
        if parents.len() >= 2 && settings.hide_merges {
            log::debug!("hiding merge {}", revision.short_id());
            continue;
        }
        attachments.push(build_attachment(
            revision,
            &parents,
            settings.commit_url.as_deref(),
            repo_name,
        ));
    }
    Ok(attachments)
}
