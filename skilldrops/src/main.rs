//! SkillDrops command-line driver.
//!
//! Wires the persistence core together on startup and exposes one
//! subcommand per user-facing operation: dropping a skill, managing
//! favorites and ratings, stats, sign-in, and offline-cache lifecycle.

use clap::{Parser, Subcommand, ValueEnum};
use skilldrops::app::AppContext;
use skilldrops::config;
use skilldrops::offline::{CacheStorage, HttpFetcher, OfflineCache, ResourceRequest};
use skilldrops::store::{
    Database, FavoriteRepository, FileBackend, LocalStore, RatingRepository, RatingValue, Skill,
    SkillRepository,
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "skilldrops", about = "Bite-sized skills, online or off")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a random skill and count it towards today's streak.
    Drop,
    /// List all skills, optionally filtered by category.
    Skills {
        #[arg(long)]
        category: Option<String>,
    },
    /// Contribute a new skill.
    Contribute {
        title: String,
        summary: String,
        #[arg(long)]
        url: Option<String>,
        #[arg(long, default_value = "general")]
        category: String,
    },
    /// List saved favorites, newest first when signed in.
    Favorites,
    /// Save a skill to favorites.
    Favorite { skill_id: String },
    /// Remove a skill from favorites.
    Unfavorite { skill_id: String },
    /// Rate a skill up or down.
    Rate {
        skill_id: String,
        rating: CliRating,
    },
    /// Clear a rating.
    Unrate { skill_id: String },
    /// Show usage statistics.
    Stats,
    /// Sign in and migrate local favorites to the remote store.
    Login {
        user_id: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// Sign out and fall back to the local store.
    Logout,
    /// Show or set the UI theme.
    Theme { value: Option<String> },
    /// Manage the offline resource cache.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum CliRating {
    Up,
    Down,
}

impl From<CliRating> for RatingValue {
    fn from(value: CliRating) -> Self {
        match value {
            CliRating::Up => RatingValue::Up,
            CliRating::Down => RatingValue::Down,
        }
    }
}

#[derive(Subcommand)]
enum CacheAction {
    /// Fetch and cache the app shell for offline use.
    Install,
    /// Promote the current cache generation and purge stale ones.
    Activate,
    /// Serve one resource through the cache (for inspection).
    Get { path: String },
}

fn print_skill(skill: &Skill) {
    println!("[{}] {} ({})", skill.id, skill.title, skill.category);
    println!("  {}", skill.summary);
    if let Some(url) = &skill.url {
        println!("  {url}");
    }
}

async fn run_cache_command(action: CacheAction) -> anyhow::Result<()> {
    let storage = CacheStorage::new(config::cache_dir());
    let fetcher = HttpFetcher::new(config::base_url());
    let mut cache = OfflineCache::new(storage, fetcher);
    match action {
        CacheAction::Install => {
            let cached = cache.install().await?;
            println!("Cached {cached} app shell resources");
        }
        CacheAction::Activate => {
            let purged = cache.activate().await?;
            match purged.len() {
                0 => println!("No stale caches to purge"),
                n => println!("Purged {n} stale cache(s): {}", purged.join(", ")),
            }
        }
        CacheAction::Get { path } => {
            let response = cache.handle(&ResourceRequest::document(&path)).await?;
            println!(
                "{} {} ({} bytes)",
                response.status,
                response.content_type.as_deref().unwrap_or("-"),
                response.body.len()
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log_dir = config::log_dir();
    std::fs::create_dir_all(&log_dir).ok();
    let file_appender = tracing_appender::rolling::daily(log_dir, "skilldrops");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        // Cache commands don't need the stores at all.
        Commands::Cache { action } => run_cache_command(action).await,
        command => run_store_command(command).await,
    }
}

async fn run_store_command(command: Commands) -> anyhow::Result<()> {
    let db = Database::open(&config::db_path()).await?;
    let local = LocalStore::new(db.pool().clone());
    let seeded = local.seed_default_skills().await?;
    if seeded > 0 {
        tracing::info!(seeded, "Seeded starter skills");
    }

    let backend = FileBackend::new(config::remote_dir());
    let ctx = AppContext::new(local, backend);
    ctx.restore_identity().await?;

    match command {
        Commands::Drop => match ctx.drop_skill().await? {
            Some(skill) => print_skill(&skill),
            None => println!("No skills available"),
        },
        Commands::Skills { category } => {
            let skills = match category {
                Some(category) => ctx.store().skills_by_category(&category).await?,
                None => ctx.store().get_all_skills().await?,
            };
            for skill in &skills {
                print_skill(skill);
            }
            println!("{} skill(s)", skills.len());
        }
        Commands::Contribute {
            title,
            summary,
            url,
            category,
        } => {
            let draft = skilldrops::store::SkillDraft {
                title,
                summary,
                url,
                category,
            };
            let skill = ctx.store().add_skill(&draft).await?;
            println!("Added skill {}", skill.id);
        }
        Commands::Favorites => {
            let favorites = ctx.store().get_favorites().await?;
            for favorite in &favorites {
                println!("[{}] {}", favorite.skill_id, favorite.title);
            }
            println!("{} favorite(s)", favorites.len());
        }
        Commands::Favorite { skill_id } => {
            let Some(skill) = ctx.store().get_skill(&skill_id).await? else {
                anyhow::bail!("no skill with id {skill_id}");
            };
            ctx.store().add_favorite(&skill).await?;
            println!("Saved {}", skill.title);
        }
        Commands::Unfavorite { skill_id } => {
            ctx.store().remove_favorite(&skill_id).await?;
            println!("Removed favorite {skill_id}");
        }
        Commands::Rate { skill_id, rating } => {
            ctx.store().add_rating(&skill_id, rating.into()).await?;
            println!("Rated {skill_id}");
        }
        Commands::Unrate { skill_id } => {
            ctx.store().remove_rating(&skill_id).await?;
            println!("Cleared rating for {skill_id}");
        }
        Commands::Stats => {
            let stats = ctx.stats().await?;
            println!("Skills:    {}", stats.total_skills);
            println!("Favorites: {}", stats.favorites_count);
            println!("Streak:    {} day(s)", stats.streak);
        }
        Commands::Login { user_id, name } => {
            ctx.sign_in(&user_id, name).await?;
            println!("Signed in as {user_id}");
        }
        Commands::Logout => {
            ctx.sign_out().await?;
            println!("Signed out");
        }
        Commands::Theme { value } => match value {
            Some(theme) => {
                ctx.set_theme(&theme).await?;
                println!("Theme set to {theme}");
            }
            None => match ctx.theme().await? {
                Some(theme) => println!("{theme}"),
                None => println!("light (default)"),
            },
        },
        Commands::Cache { .. } => unreachable!("dispatched before store setup"),
    }

    Ok(())
}
