use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use chrono::Utc;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use news_pulse::client::HttpNewsSource;
use news_pulse::format::{time_ago, ArticleView};
use news_pulse::poller::{Poller, ViewState};
use news_pulse::query::{Category, NewsFilter, SortBy, DEFAULT_KEYWORDS};

#[derive(Parser)]
#[command(name = "news-watch")]
#[command(author, version, about = "Follow a News Pulse server from the terminal")]
struct Cli {
    /// Base URL of the News Pulse server
    #[arg(long, default_value = "http://localhost:3000")]
    server: String,

    /// Search keywords
    #[arg(short, long, default_value = DEFAULT_KEYWORDS)]
    keywords: String,

    /// Headline category (business, entertainment, general, health, science, sports, technology)
    #[arg(short, long)]
    category: Option<Category>,

    /// Sort order (publishedAt, relevancy, popularity)
    #[arg(short, long, default_value = "publishedAt")]
    sort_by: SortBy,

    /// Start with auto-refresh turned off
    #[arg(long)]
    no_auto_refresh: bool,

    /// Auto-refresh interval in seconds
    #[arg(short, long, default_value_t = 30)]
    interval: u64,
}

#[derive(Debug, PartialEq)]
enum Command {
    Search(String),
    Category(Option<Category>),
    Sort(SortBy),
    ToggleAutoRefresh,
    Refresh,
    Help,
    Quit,
}

const HELP: &str = "commands: /<keywords> search | c <category|all> | s <sort> | a toggle auto-refresh | r refresh | q quit";

fn parse_command(line: &str) -> Result<Command> {
    let line = line.trim();
    if let Some(keywords) = line.strip_prefix('/') {
        return Ok(Command::Search(keywords.trim().to_string()));
    }

    let (word, arg) = match line.split_once(char::is_whitespace) {
        Some((word, arg)) => (word, arg.trim()),
        None => (line, ""),
    };

    let command = match (word, arg) {
        ("c", "all") | ("c", "") => Command::Category(None),
        ("c", name) => Command::Category(Some(name.parse()?)),
        ("s", name) => Command::Sort(name.parse()?),
        ("a", "") => Command::ToggleAutoRefresh,
        ("r", "") => Command::Refresh,
        ("h", "") | ("?", "") => Command::Help,
        ("q", "") => Command::Quit,
        _ => bail!("unrecognized command '{}'", line),
    };
    Ok(command)
}

fn apply(poller: &Poller, command: Command) {
    match command {
        Command::Search(keywords) => poller.set_keywords(&keywords),
        Command::Category(category) => poller.set_category(category),
        Command::Sort(sort_by) => poller.set_sort_by(sort_by),
        Command::ToggleAutoRefresh => {
            let enabled = poller.toggle_auto_refresh();
            println!("Auto-refresh {}", if enabled { "on" } else { "off" });
        }
        Command::Refresh => poller.refresh(),
        Command::Help => println!("{}", HELP),
        Command::Quit => {}
    }
}

fn render(state: &ViewState, filter: &NewsFilter, auto_refresh: bool) {
    if state.show_spinner() {
        println!("Loading news articles...");
        return;
    }
    if state.loading {
        println!("Updating...");
        return;
    }

    let now = Utc::now();
    println!();
    println!(
        "== {} Articles Found | topic: {} | sort: {} | auto-refresh: {}",
        state.articles.len(),
        filter.topic(),
        filter.sort_by.label(),
        if auto_refresh { "on" } else { "off" }
    );
    if let Some(updated) = state.last_updated {
        println!("Last updated: {}", time_ago(updated, now));
    }
    if let Some(error) = &state.last_error {
        println!("Last fetch failed: {}", error);
    }

    for (i, view) in ArticleView::list(&state.articles, now).iter().enumerate() {
        println!("{:>2}. [{}] {}", i + 1, view.source, view.title);
        println!("    {} | {}", view.author, view.published_ago);
        println!("    {}", view.url);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "news_pulse=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let source = Arc::new(HttpNewsSource::new(&cli.server)?);
    info!("Watching {}", source.endpoint());

    let filter = NewsFilter {
        keywords: cli.keywords,
        category: cli.category,
        sort_by: cli.sort_by,
    };
    let poller = Poller::spawn(
        source,
        filter,
        !cli.no_auto_refresh,
        Duration::from_secs(cli.interval.max(1)),
    );
    println!("{}", HELP);

    let mut view = poller.view();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            changed = view.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = view.borrow_and_update().clone();
                render(&state, &poller.filter(), poller.auto_refresh());
            }
            line = lines.next_line(), if stdin_open => {
                match line? {
                    Some(line) if line.trim().is_empty() => {}
                    Some(line) => match parse_command(&line) {
                        Ok(Command::Quit) => break,
                        Ok(command) => apply(&poller, command),
                        Err(e) => println!("{}\n{}", e, HELP),
                    },
                    None => stdin_open = false,
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    poller.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search() {
        assert_eq!(
            parse_command("/ rust async ").unwrap(),
            Command::Search("rust async".to_string())
        );
    }

    #[test]
    fn test_parse_category() {
        assert_eq!(
            parse_command("c science").unwrap(),
            Command::Category(Some(Category::Science))
        );
        assert_eq!(parse_command("c all").unwrap(), Command::Category(None));
        assert_eq!(parse_command("c").unwrap(), Command::Category(None));
        assert!(parse_command("c gossip").is_err());
    }

    #[test]
    fn test_parse_sort() {
        assert_eq!(parse_command("s popularity").unwrap(), Command::Sort(SortBy::Popularity));
        assert!(parse_command("s").is_err());
    }

    #[test]
    fn test_parse_single_letter_commands() {
        assert_eq!(parse_command("a").unwrap(), Command::ToggleAutoRefresh);
        assert_eq!(parse_command(" r ").unwrap(), Command::Refresh);
        assert_eq!(parse_command("?").unwrap(), Command::Help);
        assert_eq!(parse_command("q").unwrap(), Command::Quit);
    }

    #[test]
    fn test_parse_unknown() {
        assert!(parse_command("x").is_err());
        assert!(parse_command("a now").is_err());
    }

    #[test]
    fn test_cli_parses_filters() {
        let cli = Cli::try_parse_from([
            "news-watch",
            "--keywords",
            "space",
            "--category",
            "science",
            "--sort-by",
            "relevancy",
            "--no-auto-refresh",
        ])
        .unwrap();

        assert_eq!(cli.keywords, "space");
        assert_eq!(cli.category, Some(Category::Science));
        assert_eq!(cli.sort_by, SortBy::Relevancy);
        assert!(cli.no_auto_refresh);
        assert_eq!(cli.interval, 30);
        assert_eq!(cli.server, "http://localhost:3000");
    }
}
