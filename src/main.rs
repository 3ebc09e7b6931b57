use std::io;
use std::process;

use anyhow::Context;
use git_slack_hook::config::HookConfig;
use git_slack_hook::git::GitCli;
use git_slack_hook::publisher::{Notifier, WebhookPublisher};
use git_slack_hook::PushContext;
use tracing_subscriber::{fmt, EnvFilter};

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("git_slack_hook=warn"));
    fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    process::exit(match run() {
        Ok(()) => 0,
        Err(err) => {
            log::error!("Slack hook: {:#}", err);
            err.downcast_ref::<git_slack_hook::error::HookError>()
                .map_or(1, |e| e.exit_code())
        }
    });
}

fn run() -> anyhow::Result<()> {
    let cwd = std::env::current_dir().context("cannot determine working directory")?;
    let git = GitCli::new(&cwd);
    let config = HookConfig::load(&git)?;
    let context = PushContext::new(&git, &config, cwd)?;

    let connect = |url: &str| -> Box<dyn Notifier> { Box::new(WebhookPublisher::new(url)) };
    context.run(io::stdin().lock(), &connect)?;
    Ok(())
}
