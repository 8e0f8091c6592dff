//! Trendcast CLI entry point.

use clap::{Parser, Subcommand};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trendcast::{
    config::Config,
    data::{CandleSource, FearGreedClient, SentimentSource, TwelveDataClient},
    history::HistoryStore,
    notify::Notifier,
    orchestrator::Orchestrator,
    predictor::Predictor,
    types::Resolution,
};

#[derive(Parser)]
#[command(name = "trendcast")]
#[command(about = "Adaptive forex trend prediction agent")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one prediction cycle
    Cycle,
    /// Run prediction cycles on an interval
    Watch {
        /// Seconds between cycles (defaults to the configured interval)
        #[arg(long)]
        interval_secs: Option<u64>,
    },
    /// Predict once for a single symbol and print the result
    Predict {
        /// Symbol in Twelve Data notation, e.g. EUR/USD
        symbol: String,
    },
    /// Show the most recent ledger entries
    History {
        #[arg(short, long, default_value = "20")]
        limit: u32,
    },
    /// Test Telegram notification
    TestNotify,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Cycle => run_cycle_once(config).await,
        Commands::Watch { interval_secs } => watch(config, interval_secs).await,
        Commands::Predict { symbol } => predict_once(config, &symbol).await,
        Commands::History { limit } => show_history(config, limit).await,
        Commands::TestNotify => test_notify(config).await,
    }
}

fn build_notifier(config: &Config) -> Notifier {
    match &config.telegram {
        Some(tg) => Notifier::new(tg.bot_token.clone(), tg.chat_id.clone()),
        None => {
            tracing::warn!("Telegram not configured, notifications disabled");
            Notifier::disabled()
        }
    }
}

async fn run_cycle_once(config: Config) -> anyhow::Result<()> {
    let store = HistoryStore::connect(&config.database.expanded_path()).await?;
    let candles = TwelveDataClient::new(&config.data);
    let sentiment = FearGreedClient::new(&config.data.fear_greed_url);
    let notifier = build_notifier(&config);

    let orchestrator = Orchestrator::new(&config, &store, &candles, &sentiment, &notifier);
    let report = orchestrator.run_cycle().await?;

    println!(
        "cycle complete: {} prediction(s) at gate {:.0}%, {} notified, {} failed",
        report.predictions.len(),
        report.threshold,
        report.notified,
        report.failures.len()
    );
    Ok(())
}

async fn watch(config: Config, interval_secs: Option<u64>) -> anyhow::Result<()> {
    let interval =
        Duration::from_secs(interval_secs.unwrap_or(config.agent.watch_interval_secs));
    let store = HistoryStore::connect(&config.database.expanded_path()).await?;
    let candles = TwelveDataClient::new(&config.data);
    let sentiment = FearGreedClient::new(&config.data.fear_greed_url);
    let notifier = build_notifier(&config);
    let orchestrator = Orchestrator::new(&config, &store, &candles, &sentiment, &notifier);

    tracing::info!("watch mode: one cycle every {:?}", interval);
    loop {
        // A failed cycle is logged; the next one is still attempted.
        if let Err(e) = orchestrator.run_cycle().await {
            tracing::error!("cycle failed: {}", e);
        }
        tokio::time::sleep(interval).await;
    }
}

async fn predict_once(config: Config, symbol: &str) -> anyhow::Result<()> {
    let candles_client = TwelveDataClient::new(&config.data);
    let sentiment_client = FearGreedClient::new(&config.data.fear_greed_url);

    let candles = candles_client
        .fetch_candles(symbol, &config.data.interval, config.data.output_size)
        .await?;
    let sentiment = sentiment_client.fetch_sentiment().await.unwrap_or_default();

    let predictor = Predictor::new(config.model.clone());
    let friendly = config.symbols.friendly_name(symbol);
    let prediction = predictor.predict(symbol, &friendly, &candles, &sentiment)?;

    println!("\n📈 {} forecast\n", prediction.friendly_name);
    println!("Current price:   {:.5}", prediction.current_price);
    println!("Predicted price: {:.5}", prediction.predicted_price);
    println!(
        "Trend:           {} ({:+.3}%)",
        prediction.trend,
        prediction.percent_change()
    );
    println!("Confidence:      {:.1}%", prediction.confidence);
    println!("ATR:             {:.5}", prediction.atr);
    println!("Reason:          {}", prediction.reason);
    Ok(())
}

async fn show_history(config: Config, limit: u32) -> anyhow::Result<()> {
    let store = HistoryStore::connect(&config.database.expanded_path()).await?;
    let records = store.tail(limit).await?;

    if records.is_empty() {
        println!("ledger is empty");
        return Ok(());
    }

    println!(
        "\n{:<10} {:<17} {:>10} {:>10} {:>8} {:>7}  {}",
        "symbol", "created", "price", "predicted", "trend", "conf", "outcome"
    );
    println!("{}", "-".repeat(80));
    for record in &records {
        let outcome = match record.resolution {
            Resolution::Resolved {
                actual_trend,
                is_correct,
                ..
            } => format!("{} ({})", actual_trend, if is_correct { "✔" } else { "✘" }),
            Resolution::Unresolved => "pending".to_string(),
        };
        println!(
            "{:<10} {:<17} {:>10.5} {:>10.5} {:>8} {:>6.1}%  {}",
            record.symbol,
            record.created_at.format("%Y-%m-%d %H:%M").to_string(),
            record.current_price,
            record.predicted_price,
            record.predicted_trend.to_string(),
            record.confidence,
            outcome,
        );
    }
    Ok(())
}

async fn test_notify(config: Config) -> anyhow::Result<()> {
    let tg = config
        .telegram
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("Telegram not configured in config.toml"))?;

    let notifier = Notifier::new(tg.bot_token.clone(), tg.chat_id.clone());
    notifier
        .send_raw("🧪 *Test notification*\n\nIf you see this, Telegram integration is working!")
        .await?;

    println!("✅ Test notification sent!");
    Ok(())
}
