use anyhow::{Context, bail};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use repo_monitor::commands::{self, CheckCiRequest, RecentCommitsRequest};
use repo_monitor::config::Config;
use repo_monitor::github::{CachedGitHubClient, GitHubApi, GitHubClient, OctocrabTransport};
use repo_monitor::types::PrStateFilter;

const USAGE: &str = "usage: repo-monitor <drift|status|prs|commits|ci> [owner/name]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "repo_monitor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut args = std::env::args().skip(1);
    let command = args.next().unwrap_or_else(|| "status".to_string());
    let target = args.next();

    let config = Config::load().context("failed to load configuration")?;
    let Some(token) = config.github_token.clone() else {
        bail!("GITHUB_TOKEN is not set");
    };

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupted, cancelling pending requests");
                cancel.cancel();
            }
        }
    });

    let transport = OctocrabTransport::from_token(token)?;
    let client = GitHubClient::new(transport, &config.client).with_cancellation(cancel);
    let cached = CachedGitHubClient::new(client.clone(), config.cache);

    let user = client
        .current_user()
        .await
        .context("failed to authenticate with GitHub")?;
    tracing::info!(%user, "authenticated");

    match command.as_str() {
        "drift" => {
            let reports = commands::check_drift(&client, &config.repos, target.as_deref()).await?;
            print_json(&reports)
        }
        "status" => {
            let statuses =
                commands::list_status(&cached, target.as_deref().unwrap_or_default(), false)
                    .await?;
            print_json(&statuses)
        }
        "prs" => {
            let prs =
                commands::list_prs(&cached, target.as_deref(), PrStateFilter::Open, 0).await?;
            print_json(&prs)
        }
        "commits" => {
            let request = RecentCommitsRequest {
                repository: target,
                since: Some("24h".to_string()),
                ..Default::default()
            };
            print_json(&commands::recent_commits(&client, &request).await?)
        }
        "ci" => {
            let Some(repository) = target else {
                bail!("ci needs a repository\n{}", USAGE);
            };
            let request = CheckCiRequest {
                repository,
                ..Default::default()
            };
            print_json(&commands::check_ci(&client, &request).await?)
        }
        other => bail!("unknown command '{}'\n{}", other, USAGE),
    }
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
