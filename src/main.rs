//! Bubbla CLI
//!
//! Composition root for the news core: loads configuration, builds the
//! HTTP fetcher, notification service and preference store, and drives
//! the API facade from the command line.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use bubbla_news::config::Config;
use bubbla_news::feed;
use bubbla_news::http_client::{HttpClientConfig, HttpUrlFetcher};
use bubbla_news::metrics;
use bubbla_news::notifications::{
    FileTopicPreferences, InMemoryNotificationService, NotificationService,
    SnsNotificationService, TopicPreferences,
};
use bubbla_news::reconciler::TopicOutcome;
use bubbla_news::schemas::{NewsItem, NewsSource, Topic};
use bubbla_news::{BubblaApi, SearchableList};

/// Bubbla news reader core
#[derive(Parser, Debug)]
#[command(name = "bubbla")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Fetch the Bubbla news feed and manage push-topic subscriptions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, default_value = "false", global = true)]
    json_logs: bool,

    /// Print Prometheus metrics before exiting
    #[arg(long, default_value = "false", global = true)]
    print_metrics: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List news items
    News {
        /// Only this category ("Senaste" for everything)
        #[arg(short, long)]
        category: Option<String>,

        /// Only items containing every word of this query
        #[arg(short, long)]
        search: Option<String>,

        /// Output format (json, table, summary)
        #[arg(short, long, default_value = "summary")]
        output: String,
    },

    /// List the feed's categories
    Categories {
        /// Group categories by type
        #[arg(short, long, default_value = "false")]
        grouped: bool,
    },

    /// Show how the feed is distributed over news sites
    Distribution,

    /// List push topics and their stored state
    Topics,

    /// Exclude a topic from push notifications (or include it again)
    Exclude {
        /// Topic name (e.g. "afrika") or full topic ARN
        #[arg(short, long)]
        topic: String,

        /// Include the topic instead of excluding it
        #[arg(long, default_value = "false")]
        include: bool,
    },

    /// Register a device token and reconcile its subscriptions
    Register {
        /// Device token as hex
        #[arg(short, long)]
        token: String,

        /// Use an in-memory notification service instead of SNS
        #[arg(long, default_value = "false")]
        dry_run: bool,
    },
}

/// Sets up structured logging with tracing
fn setup_logging(log_level: &str, json_output: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    if json_output {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(&cli.log_level, cli.json_logs);

    let correlation_id = uuid::Uuid::new_v4().to_string();
    let span = info_span!("session", correlation_id = %correlation_id);

    let print_metrics = cli.print_metrics;
    let result = run(cli).instrument(span).await;

    if print_metrics {
        println!("{}", metrics::gather_metrics());
    }
    result
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    config.validate()?;
    let news_source = config.news_source()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        news_source = %news_source,
        feed = %config.feed_base_url,
        sns = config.has_sns(),
        "Configuration loaded"
    );

    let fetcher = Arc::new(HttpUrlFetcher::new(HttpClientConfig::from_config(&config))?);

    match cli.command {
        Commands::News {
            category,
            search,
            output,
        } => {
            let api = build_api(&config, news_source, fetcher, false).await?;
            show_news(&api, category.as_deref(), search.as_deref(), &output).await?;
        }

        Commands::Categories { grouped } => {
            let api = build_api(&config, news_source, fetcher, false).await?;
            show_categories(&api, grouped).await?;
        }

        Commands::Distribution => {
            let api = build_api(&config, news_source, fetcher, false).await?;
            show_distribution(&api).await?;
        }

        Commands::Topics => {
            let api = build_api(&config, news_source, fetcher, false).await?;
            let preferences = FileTopicPreferences::open(&config.preferences_path).await?;
            show_topics(&api, &preferences).await?;
        }

        Commands::Exclude { topic, include } => {
            let api = build_api(&config, news_source, fetcher, false).await?;
            let preferences = FileTopicPreferences::open(&config.preferences_path).await?;
            let topic = resolve_topic(&api, &topic).await?;
            preferences.make_topic(&topic, !include);
            preferences.save().await?;
            println!(
                "{} {} (takes effect on next registration)",
                if include { "Included" } else { "Excluded" },
                topic.name()
            );
        }

        Commands::Register { token, dry_run } => {
            ensure_registration_target(&config, dry_run)?;
            let api = build_api(&config, news_source, fetcher, dry_run).await?;
            let preferences = FileTopicPreferences::open(&config.preferences_path).await?;
            register(&api, &token, &preferences).await?;
            if !dry_run {
                preferences.save().await?;
            }
        }
    }

    Ok(())
}

/// A real registration needs SNS. Simulated subscriptions must never end
/// up in the stored preferences.
fn ensure_registration_target(config: &Config, dry_run: bool) -> Result<()> {
    if !dry_run && !config.has_sns() {
        anyhow::bail!(
            "SNS_PLATFORM_APPLICATION_ARN is not set; use --dry-run to register against simulated topics"
        );
    }
    Ok(())
}

/// Builds the facade. Without SNS configuration, or for dry runs, an
/// in-memory service seeded with one topic per feed category is used.
async fn build_api(
    config: &Config,
    news_source: NewsSource,
    fetcher: Arc<HttpUrlFetcher>,
    dry_run: bool,
) -> Result<BubblaApi> {
    let notification_service: Arc<dyn NotificationService> =
        match (&config.sns_platform_application_arn, dry_run) {
            (Some(platform_arn), false) => Arc::new(
                SnsNotificationService::from_env(
                    config.aws_region.as_deref(),
                    platform_arn.clone(),
                    news_source,
                )
                .await,
            ),
            _ => {
                warn!("SNS not in use - topics are simulated from feed categories");
                let probe = BubblaApi::new(
                    news_source,
                    config.feed_base_url.clone(),
                    fetcher.clone(),
                    Arc::new(InMemoryNotificationService::default()),
                );
                let items = probe.news().await?;
                Arc::new(InMemoryNotificationService::new(simulated_topics(
                    news_source,
                    &items,
                )))
            }
        };

    Ok(BubblaApi::new(
        news_source,
        config.feed_base_url.clone(),
        fetcher,
        notification_service,
    ))
}

fn simulated_topics(news_source: NewsSource, items: &[NewsItem]) -> Vec<Topic> {
    feed::sorted_categories(items)
        .iter()
        .map(|category| {
            Topic::new(format!(
                "arn:aws:sns:local:000000000000:{}_{}",
                news_source,
                category.to_lowercase()
            ))
        })
        .collect()
}

/// Accepts a full topic ARN or a topic name of the selected source
async fn resolve_topic(api: &BubblaApi, topic: &str) -> Result<Topic> {
    if topic.starts_with("arn:") {
        return Ok(Topic::new(topic));
    }
    let topics = api.notification_service().list_topics().await?;
    topics
        .into_iter()
        .find(|t| t.name().eq_ignore_ascii_case(topic))
        .ok_or_else(|| anyhow::anyhow!("no topic named {}", topic))
}

async fn show_news(
    api: &BubblaApi,
    category: Option<&str>,
    search: Option<&str>,
    output_format: &str,
) -> Result<()> {
    let items = match api.news_for_category(category).await {
        Ok(items) => items,
        Err(e) => {
            error!(error = %e, "Failed to fetch news");
            println!("Nyheterna kunde inte hämtas: {}", e);
            return Ok(());
        }
    };

    let mut list = SearchableList::new(items);
    if let Some(query) = search {
        list.update_filtered_items_to_match_search_text(query);
    }

    match output_format {
        "json" => {
            let items: Vec<&NewsItem> = list.iter().collect();
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        "table" => {
            println!("\n{:<16} {:<14} {:<20} {}", "Published", "Category", "Domain", "Title");
            println!("{}", "-".repeat(100));
            for item in list.iter() {
                println!(
                    "{:<16} {:<14} {:<20} {}",
                    item.publication_date.format("%Y-%m-%d %H:%M"),
                    item.category,
                    item.domain,
                    item.title
                );
            }
            println!("\nTotal: {} items", list.len());
        }
        _ => {
            println!("\nNews Summary");
            println!("============");
            println!("Source:   {}", api.news_source());
            println!("Category: {}", category.unwrap_or(feed::LATEST_CATEGORY));
            println!("Items:    {}", list.len());
            if let Some(first) = list.get(0) {
                println!("Newest:   {} ({})", first.title, first.domain);
            }
        }
    }
    Ok(())
}

async fn show_categories(api: &BubblaApi, grouped: bool) -> Result<()> {
    let items = api.news().await?;
    if grouped {
        for group in api.categories_with_types_from_news_items(&items) {
            println!("{}", group.category_type);
            for category in group.categories {
                println!("  - {}", category);
            }
        }
    } else {
        for category in feed::categories_from_news_items(&items) {
            println!("{}", category);
        }
    }
    Ok(())
}

async fn show_distribution(api: &BubblaApi) -> Result<()> {
    let items = api.news().await?;
    let distribution = api.news_source_distribution_from_news_items(&items);
    println!("\n{:<30} {:>6} {:>8}", "Domain", "Items", "Share");
    println!("{}", "-".repeat(46));
    for entry in distribution {
        println!(
            "{:<30} {:>6} {:>7.1}%",
            entry.domain,
            entry.count,
            entry.percentage * 100.0
        );
    }
    Ok(())
}

async fn show_topics(api: &BubblaApi, preferences: &dyn TopicPreferences) -> Result<()> {
    let topics = api.notification_service().list_topics().await?;
    println!("\n{:<20} {:<10} {}", "Topic", "Excluded", "Subscription");
    println!("{}", "-".repeat(60));
    for topic in topics {
        println!(
            "{:<20} {:<10} {}",
            topic.name(),
            preferences.exclude_topic(&topic),
            preferences
                .subscription_arn_for_topic(&topic)
                .unwrap_or_else(|| "-".to_string())
        );
    }
    Ok(())
}

async fn register(api: &BubblaApi, token: &str, preferences: &dyn TopicPreferences) -> Result<()> {
    let report = api.register_device(token, preferences).await?;

    println!("\nRegistration");
    println!("============");
    println!("Endpoint:     {}", report.endpoint_arn);
    println!("Subscribed:   {}", report.subscribed());
    println!("Unsubscribed: {}", report.unsubscribed());
    println!("Unchanged:    {}", report.unchanged());

    for result in report.failures() {
        if let TopicOutcome::Failed { action, error } = &result.outcome {
            println!("  ! {} {} failed: {}", action, result.topic.name(), error);
        }
    }
    Ok(())
}
