use anyhow::Context;
use clap::Parser;
use repotrend_core::{
    decorate::favorite_ids,
    usecases::{
        DecorateListWithFavorites, GetFavoriteRepositories, IsFavorite, RemoveFromFavorites,
        SearchFavorites, SearchRepositories,
    },
    Config, DataSource, DetailSession, GitHubSource, LocalFavorites, PagingConfig, Repository,
    Services, TimeFrame, TrendingMode, TrendingSession,
};
use repotrend_store::FavoritesStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod output;

#[derive(Parser)]
#[command(name = "repotrend")]
#[command(version, about = "Trending GitHub repositories with a local favorites list", long_about = None)]
struct Cli {
    /// GitHub token (raises the search rate limit)
    #[arg(long, env = "GITHUB_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    /// Favorites database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// API base URL (GitHub Enterprise or a proxy)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// List repositories created recently, most stars first
    Trending {
        /// day, week or month
        #[arg(long, default_value = "day")]
        since: TimeFrame,
        /// How many pages to load
        #[arg(long, default_value_t = 1)]
        pages: u32,
        /// Use the trending listing endpoint instead of search
        #[arg(long)]
        listing: bool,
        #[arg(long)]
        json: bool,
    },
    /// Search repositories created within the time frame
    Search {
        query: String,
        #[arg(long, default_value = "day")]
        since: TimeFrame,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        json: bool,
    },
    /// List favorites, optionally filtered
    Favorites {
        /// Substring of name, full name or description
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Add a repository to favorites by id
    Add { id: i64 },
    /// Remove a repository from favorites by id
    Remove { id: i64 },
    /// Show repository details
    Show {
        id: i64,
        #[arg(long)]
        json: bool,
    },
    /// Drop stored repositories that are no longer favorites
    Prune,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so --json output stays clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "repotrend=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let Some(command) = cli.command else {
        println!("No command specified. Try --help");
        return Ok(());
    };

    match command {
        Commands::Trending {
            since,
            pages,
            listing,
            json,
        } => {
            tracing::info!("Loading {} page(s) of trending repositories for {}", pages, since);
            let services = build_services(&config, listing)?;
            let session = TrendingSession::new(services);

            session.select_time_frame(since).await;
            for _ in 1..pages {
                if session.state().error.is_some() {
                    break;
                }
                session.load_more().await;
            }

            if let Some(error) = session.state().error {
                anyhow::bail!(error);
            }
            if !json {
                println!("Trending: {}\n", since);
            }
            output::print_list(&session.repositories(), json)?;
        }
        Commands::Search {
            query,
            since,
            page,
            json,
        } => {
            tracing::info!("Searching for: {}", query);
            let services = build_services(&config, false)?;
            let found = SearchRepositories::new(&services)
                .execute_page(&query, since, page)
                .await
                .context("Search failed")?;

            let favorites = GetFavoriteRepositories::new(&services).snapshot().await?;
            let decorated = DecorateListWithFavorites.execute(found, &favorite_ids(&favorites));
            output::print_list(&decorated, json)?;
        }
        Commands::Favorites { query, json } => {
            let services = build_services(&config, false)?;
            let favorites = match query.as_deref().map(str::trim) {
                Some(q) if !q.is_empty() => SearchFavorites::new(&services).execute(q).await?,
                _ => GetFavoriteRepositories::new(&services).snapshot().await?,
            };
            output::print_list(&favorites, json)?;
        }
        Commands::Add { id } => {
            let services = build_services(&config, false)?;
            let session = DetailSession::new(&services);
            let (repo, _) = load_detail(&session, id).await?;

            if repo.is_favorite {
                println!("{} is already a favorite", repo.full_name);
            } else {
                session.toggle_favorite(&repo).await;
                if let Some(error) = session.state().error {
                    anyhow::bail!(error);
                }
                println!("★ Added {} to favorites", repo.full_name);
            }
        }
        Commands::Remove { id } => {
            let services = build_services(&config, false)?;
            if IsFavorite::new(&services).execute(id).await? {
                RemoveFromFavorites::new(&services)
                    .execute(id)
                    .await
                    .context("Failed to remove from favorites")?;
                println!("Removed {} from favorites", id);
            } else {
                println!("{} is not a favorite", id);
            }
        }
        Commands::Show { id, json } => {
            let services = build_services(&config, false)?;
            let session = DetailSession::new(&services);
            let (repo, source) = load_detail(&session, id).await?;
            output::print_detail(&repo, source, json)?;
        }
        Commands::Prune => {
            let store = open_store(&config)?;
            let removed = store.clear_non_favorites()?;
            println!("Removed {} stored repositories", removed);
        }
    }

    Ok(())
}

/// Config file, then CLI flags and env on top
fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = Config::load()?;

    if let Some(token) = &cli.token {
        config.github.token = Some(token.clone());
    }
    if let Some(url) = &cli.api_url {
        config.github.api_url = url.clone();
    }
    if let Some(db) = &cli.db {
        config.storage.database_path = Some(db.clone());
    }

    Ok(config)
}

fn open_store(config: &Config) -> anyhow::Result<FavoritesStore> {
    let path = config.database_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    tracing::debug!("Opening favorites database at {}", path.display());
    FavoritesStore::open(&path)
        .with_context(|| format!("Failed to open database at {}", path.display()))
}

fn build_services(config: &Config, listing: bool) -> anyhow::Result<Services> {
    let store = Arc::new(open_store(config)?);
    let favorites = Arc::new(LocalFavorites::new(store)?);

    let mode = if listing {
        TrendingMode::Listing
    } else {
        config.trending.mode
    };
    let remote = Arc::new(GitHubSource::from_config(&config.github, mode)?);

    Ok(Services::new(remote, favorites).with_paging(PagingConfig::from(&config.paging)))
}

async fn load_detail(
    session: &DetailSession,
    id: i64,
) -> anyhow::Result<(Repository, DataSource)> {
    let mut rx = session.subscribe();
    session.load_repository(id);

    let state = rx.wait_for(|s| !s.is_loading).await?.clone();
    if let Some(error) = state.error {
        anyhow::bail!(error);
    }
    let repo = state
        .repository
        .ok_or_else(|| anyhow::anyhow!("Repository {} not found", id))?;
    Ok((repo, state.data_source))
}
