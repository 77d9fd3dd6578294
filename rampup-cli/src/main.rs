mod render;

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use reqwest::ClientBuilder;
use tracing_subscriber::EnvFilter;

use rampup_core::{
    AppConfig, AppController, GeminiNewsSource, Navigation, StateStore,
};

/// Shown when the settings partition could not be written. Losing the
/// cache is acceptable; losing this is not, so the failure is loud.
const SETTINGS_WARNING: &str =
    "WARNING: failed to save settings; your company list and read history changes may be lost";

#[derive(Parser)]
#[command(
    name = "rampup",
    about = "Personal news dashboard: company blogs and industry news, cached locally"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the industry news dashboard (fetches once while empty)
    Home,
    /// Show one tracked company's blog posts
    Company {
        /// Company id, as printed by `companies`
        id: String,
    },
    /// Show articles saved for later
    Saved,
    /// List tracked companies
    Companies,
    /// Toggle an article's read mark
    Read {
        /// Article id, as printed in the views
        article_id: String,
    },
    /// Toggle an article in the saved list
    Save {
        /// Article id, as printed in the views
        article_id: String,
    },
    /// Track a new company blog
    Add {
        name: String,
        url: String,
    },
    /// Stop tracking a company and drop its cached news
    Remove {
        id: String,
    },
    /// Restore the built-in company list (asks for confirmation)
    Reset,
    /// Force a re-fetch, globally or for one company
    Refresh {
        #[arg(long)]
        company: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = AppConfig::load();
    let api_key = std::env::var(&config.api_key_env).unwrap_or_default();
    if api_key.is_empty() {
        tracing::warn!(var = %config.api_key_env, "api key not set; fetches will come back empty");
    }
    let client = ClientBuilder::new()
        .timeout(Duration::from_secs(config.request_timeout_seconds))
        .user_agent("rampup/0.1")
        .build()
        .context("failed to build HTTP client")?;
    let source = Arc::new(GeminiNewsSource::new(client, api_key, config.model.clone()));
    let api = AppController::load(StateStore::new(config_dir()), source).await;

    run(cli.command, &api).await
}

async fn run(command: Command, api: &AppController) -> anyhow::Result<()> {
    match command {
        Command::Home => show_home(api).await?,
        Command::Company { id } => show_company(api, &id).await?,
        Command::Saved => {
            render::articles("Read Later", &api.saved_articles().await, None);
        }
        Command::Companies => {
            render::companies(&api.companies().await);
        }
        Command::Read { article_id } => {
            api.toggle_read(&article_id)
                .await
                .context(SETTINGS_WARNING)?;
            println!("Toggled read mark on {article_id}.");
        }
        Command::Save { article_id } => {
            let Some(article) = api.find_article(&article_id).await else {
                bail!("no article with id {article_id} in any cached view");
            };
            api.toggle_save(&article).await.context(SETTINGS_WARNING)?;
            if article.is_saved {
                println!("Removed \"{}\" from the saved list.", article.title);
            } else {
                println!("Saved \"{}\" for later.", article.title);
            }
        }
        Command::Add { name, url } => {
            let nav = api.add_company(&name, &url).await.context(SETTINGS_WARNING)?;
            println!("Now tracking {name}.");
            // The navigation intent is what triggers the first fetch:
            // the new company's view mounts empty and refreshes itself.
            if let Navigation::Company(id) = nav {
                show_company(api, &id).await?;
            }
        }
        Command::Remove { id } => {
            api.remove_company(&id).await.context(SETTINGS_WARNING)?;
            println!("Stopped tracking company {id}; its cached news is gone.");
        }
        Command::Reset => {
            if confirm("Reset to default companies? This will clear your custom company list.")? {
                api.reset_to_defaults().await.context(SETTINGS_WARNING)?;
                println!("Companies restored to defaults.");
                show_home(api).await?;
            } else {
                println!("Reset cancelled.");
            }
        }
        Command::Refresh { company } => match company {
            Some(id) => {
                let count = api.refresh_company_news(&id).await?;
                println!("Fetched {count} articles.");
                show_company(api, &id).await?;
            }
            None => {
                let count = api.refresh_global_news().await?;
                println!("Fetched {count} articles.");
                show_home(api).await?;
            }
        },
    }
    Ok(())
}

async fn show_home(api: &AppController) -> anyhow::Result<()> {
    api.refresh_global_if_empty().await?;
    let state = api.snapshot().await;
    render::articles(
        "Industry News",
        &api.global_articles().await,
        Some(state.global_news.last_updated),
    );
    Ok(())
}

async fn show_company(api: &AppController, company_id: &str) -> anyhow::Result<()> {
    let Some(company) = api.company(company_id).await else {
        bail!("this source is no longer being tracked: {company_id}");
    };
    api.refresh_company_if_empty(company_id).await?;
    let last_updated = api
        .snapshot()
        .await
        .company_news
        .get(company_id)
        .map(|cache| cache.last_updated)
        .unwrap_or(0);
    render::articles(
        &company.name,
        &api.company_articles(company_id).await,
        Some(last_updated),
    );
    Ok(())
}

fn confirm(question: &str) -> anyhow::Result<bool> {
    print!("{question} [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn config_dir() -> std::path::PathBuf {
    // Linux: ~/.config/rampup
    let mut dir = dirs::config_dir().unwrap_or_else(|| std::env::current_dir().unwrap());
    dir.push("rampup");
    dir
}
