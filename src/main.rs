use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

use tidings::cache::FeedCache;
use tidings::config::{default_config_path, Config};
use tidings::feed::{Article, FeedFetcher, HttpFetcher};
use tidings::storage::ReadStatusSet;

#[derive(Parser, Debug)]
#[command(name = "tidings", about = "Print a merged timeline of your feeds")]
struct Args {
    /// Feed URLs to show (defaults to `feeds` from the config file)
    #[arg(value_name = "URL")]
    feeds: Vec<String>,

    /// Config file (default: ~/.config/tidings/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Serve only cached content; never touch the network
    #[arg(long)]
    offline: bool,

    /// Refetch every feed even if its cache entry is still fresh
    #[arg(long)]
    refresh: bool,

    /// Hide articles already marked as read
    #[arg(long)]
    unread: bool,

    /// Mark every article of the listed feeds as read after printing
    #[arg(long)]
    mark_read: bool,

    /// Print the downloads list instead of the timeline
    #[arg(long)]
    downloads: bool,

    /// Save article INDEX (0-based, in feed order) of feed URL to the downloads list
    #[arg(long, num_args = 2, value_names = ["URL", "INDEX"], conflicts_with = "downloads")]
    download: Option<Vec<String>>,

    /// Remove entry INDEX (0-based, in the order saved) from the downloads list
    #[arg(long, value_name = "INDEX", conflicts_with_all = ["downloads", "download"])]
    remove_download: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = args.config.clone().or_else(default_config_path);
    let config = match &config_path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    let cache_path = config
        .cache_file()
        .context("Could not determine a cache directory; set cache_path in the config file")?;
    let read_status_path = config.read_status_file().context(
        "Could not determine a cache directory; set read_status_path in the config file",
    )?;

    let mut options = config.cache_options();
    options.offline |= args.offline;

    let fetcher = HttpFetcher::new().context("Failed to build HTTP client")?;
    let mut cache = FeedCache::new(fetcher, options);

    // A broken cache file only costs a refetch; a broken read-status file would
    // silently reset what the user has read, so that one is fatal.
    if let Err(e) = cache.load(&cache_path) {
        tracing::warn!(error = %e, "Ignoring unreadable cache file");
        eprintln!("Warning: {e}. Starting with an empty cache.");
    }
    let mut read_status = ReadStatusSet::load(&read_status_path)
        .context("Failed to load read status; move the file aside to reset it")?;

    let feeds = if args.feeds.is_empty() {
        config.feeds.clone()
    } else {
        args.feeds.clone()
    };

    if let Some(values) = &args.download {
        let (url, index) = parse_download(values)?;
        cache
            .add_to_downloaded(url, index)
            .await
            .with_context(|| format!("Failed to save article {index} of {url}"))?;
        println!("Saved article {index} of {url}");
        return save_cache(&cache, &cache_path);
    }

    if let Some(index) = args.remove_download {
        let removed = cache
            .remove_from_downloaded(index)
            .context("Failed to remove download")?;
        println!("Removed \"{}\"", removed.title);
        return save_cache(&cache, &cache_path);
    }

    if args.downloads {
        for (index, article) in cache.downloads().iter().enumerate() {
            print!("[{index}] ");
            print_article(article, None);
        }
        return Ok(());
    }

    if feeds.is_empty() {
        eprintln!("No feeds given. Pass feed URLs or add `feeds = [...]` to the config file.");
        std::process::exit(1);
    }

    if args.refresh {
        for url in &feeds {
            if let Err(e) = cache.get_articles(url, true).await {
                eprintln!("{url}: {e}");
            }
        }
    }

    let timeline = cache.get_timeline(&feeds).await;

    let mut shown = 0usize;
    for (url, article) in &timeline {
        let read = read_status.is_read(url, &article.title);
        if args.unread && read {
            continue;
        }
        print_article(article, Some(read));
        shown += 1;
    }
    println!("{shown} of {} articles", timeline.len());

    if args.mark_read {
        for (url, article) in &timeline {
            read_status.mark_as_read(url, &article.title);
        }
        tracing::info!(marked = timeline.len(), "Marked timeline as read");
    }

    save_cache(&cache, &cache_path)?;
    read_status.save(&read_status_path).with_context(|| {
        format!(
            "Failed to save read status to {}",
            read_status_path.display()
        )
    })?;

    Ok(())
}

fn save_cache<F: FeedFetcher>(cache: &FeedCache<F>, path: &Path) -> Result<()> {
    cache
        .save(path)
        .with_context(|| format!("Failed to save cache to {}", path.display()))
}

/// Split the two `--download` values into a feed URL and an article index.
fn parse_download(values: &[String]) -> Result<(&str, usize)> {
    match values {
        [url, index] => {
            let index = index
                .parse()
                .with_context(|| format!("Invalid article index '{index}'"))?;
            Ok((url.as_str(), index))
        }
        _ => anyhow::bail!("--download takes a feed URL and an article index"),
    }
}

fn print_article(article: &Article, read: Option<bool>) {
    let marker = match read {
        Some(true) => "  ",
        Some(false) => "* ",
        None => "",
    };
    let date = article
        .published
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "----------------".to_string());
    println!("{marker}{date}  {}", article.title);
    if let Some(link) = article.link() {
        println!("{}{link}", " ".repeat(marker.len() + 18));
    }
}
