use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use futures::TryStreamExt;
use rocket::routes;
use tokio::sync::mpsc::unbounded_channel;

use marvin::{
    bot::Marvin,
    config::MarvinConfig,
    github::GitHubClient,
    webhooks::{github_webhook, EventSender, GitHubSecret},
};

#[derive(Parser)]
#[command(version)]
struct Opts {
    /// Configuration file for marvin
    #[arg(short, long)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Receive GitHub webhooks and act on them (the default)
    Serve,
    /// Search issues and pull requests, e.g. `search repo:NixOS/nixpkgs label:needs_merger`
    Search {
        #[arg(required = true)]
        terms: Vec<String>,
    },
    /// List the repositories the configured token's installation can access
    Repos,
}

fn load_config(path: &Path) -> anyhow::Result<MarvinConfig> {
    let config_file =
        File::open(path).with_context(|| format!("couldn't open {}:", path.display()))?;
    serde_yaml::from_reader(BufReader::new(config_file)).context("couldn't parse config file")
}

async fn serve(config: MarvinConfig) -> anyhow::Result<()> {
    let (sender, receiver) = unbounded_channel();
    let github_secret = config.github_secret.clone();

    let marvin = Marvin::new(&config).context("failed to create marvin bot")?;
    tokio::spawn(async move { marvin.run(receiver).await });

    let rocket = rocket::build()
        .mount("/", routes![github_webhook])
        .manage(EventSender(sender))
        .manage(GitHubSecret(github_secret));
    rocket
        .launch()
        .await
        .map(|_| ())
        .map_err(|err| anyhow::anyhow!(err))
}

async fn search(config: &MarvinConfig, terms: &[String]) -> anyhow::Result<()> {
    let github = GitHubClient::new(config.github_api_url.clone(), &config.user_agent)?;
    let terms: Vec<&str> = terms.iter().map(String::as_str).collect();

    let count = github
        .search_issue_count(&terms, &config.github_token)
        .await
        .context("search failed")?;
    println!("{} results", count);

    let issues = github.search_issues(&terms, &config.github_token);
    futures::pin_mut!(issues);
    while let Some(issue) = issues.try_next().await.context("search failed")? {
        match &issue.html_url {
            Some(html_url) => println!("{} {}", html_url, issue),
            None => println!("{}", issue),
        }
    }

    Ok(())
}

async fn repos(config: &MarvinConfig) -> anyhow::Result<()> {
    let github = GitHubClient::new(config.github_api_url.clone(), &config.user_agent)?;
    let repositories = github
        .installation_repositories(&config.github_token)
        .await
        .context("couldn't list installation repositories")?;

    for repository in repositories {
        println!("{}", repository.full_name);
    }

    Ok(())
}

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let opts = Opts::parse();
    let config = load_config(&opts.config)?;

    match opts.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Search { terms } => search(&config, &terms).await,
        Command::Repos => repos(&config).await,
    }
}
