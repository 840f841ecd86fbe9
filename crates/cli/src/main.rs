use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

use riskdesk_core::{AssetClass, ExchangeRateService, MarketAnalysisContext, Side, TradeSignal};
use riskdesk_risk::{DynamicRiskManager, ExcursionStats, RiskConfig, RiskWeights};

#[derive(Parser)]
#[command(name = "riskdesk")]
#[command(about = "Position sizing and dynamic basket risk: size, stop, take-profit")]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Path to a TOML risk configuration
    #[arg(short, long, env = "RISKDESK_CONFIG")]
    config: Option<PathBuf>,

    /// Weight preset overriding the configured weights (balanced, trend_following, structure_first)
    #[arg(long)]
    weights: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a position size for one trade intent
    Size {
        /// Total account capital, in account currency
        #[arg(long)]
        capital: Decimal,

        /// Percent of capital to risk (0-100]
        #[arg(long)]
        risk_pct: Decimal,

        #[arg(long)]
        entry: Decimal,

        #[arg(long)]
        stop: Decimal,

        /// STOCK, FUTURE, FOREX or CRYPTO
        #[arg(long, default_value = "FOREX", value_parser = parse_asset_class)]
        asset_class: AssetClass,

        #[arg(long, default_value = "1")]
        contract_size: Decimal,

        #[arg(long, default_value = "1")]
        leverage: Decimal,

        /// Current drawdown, percent
        #[arg(long, default_value = "0")]
        drawdown: Decimal,

        /// Drawdown at which sizing is blocked, percent
        #[arg(long, default_value = "100")]
        max_drawdown: Decimal,

        #[arg(long, default_value = "USD")]
        account_currency: String,

        #[arg(long, default_value = "USD")]
        quote_currency: String,

        /// Quote-to-account rate; skips the live lookup
        #[arg(long)]
        rate: Option<Decimal>,
    },

    /// Adjust a basket stop-loss to the market context
    BasketSl {
        /// Base stop amount, positive, in account currency
        #[arg(long)]
        base_sl: Decimal,

        /// Basket direction (buy / sell)
        #[arg(long, value_parser = parse_side)]
        side: Side,

        /// Path to a market-analysis JSON document
        #[arg(long)]
        context: Option<PathBuf>,

        /// Path to a closed-trade CSV with MAE/MFE columns
        #[arg(long)]
        history: Option<PathBuf>,

        /// Current floating P/L of the basket, negative while losing
        #[arg(long, default_value = "0", allow_negative_numbers = true)]
        pnl: Decimal,

        /// Prediction confidence, 0-1 or percent
        #[arg(long)]
        confidence: Option<Decimal>,
    },

    /// Print the take-profit ladder for a basket
    TieredTp {
        /// Base take-profit amount
        #[arg(long)]
        base_tp: Decimal,

        /// Volatility measure; computed from --data when omitted
        #[arg(long)]
        volatility: Option<Decimal>,

        /// Path to a bar CSV used to compute ATR volatility
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Overrides basket.volatility_factor
        #[arg(long)]
        factor: Option<Decimal>,

        /// Number of tiers to print, including the base target
        #[arg(long, default_value = "4")]
        levels: u32,
    },

    /// Average True Range of a bar CSV
    Atr {
        /// Path to CSV data file
        #[arg(short, long)]
        data: PathBuf,

        /// Overrides basket.atr_period
        #[arg(long)]
        period: Option<usize>,
    },

    /// MAE / MFE summary of a closed-trade CSV
    Excursion {
        /// Path to CSV trade history
        #[arg(long)]
        history: PathBuf,

        /// Overrides excursion.percentile
        #[arg(long)]
        percentile: Option<Decimal>,
    },

    /// Print the effective configuration as TOML
    Config,

    /// List built-in weight presets
    Weights,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_deref(), cli.weights.as_deref())?;

    match cli.command {
        Commands::Size {
            capital,
            risk_pct,
            entry,
            stop,
            asset_class,
            contract_size,
            leverage,
            drawdown,
            max_drawdown,
            account_currency,
            quote_currency,
            rate,
        } => {
            let mut builder = TradeSignal::builder(capital, risk_pct, entry, stop)
                .currencies(&account_currency, &quote_currency)
                .asset_class(asset_class)
                .contract_size(contract_size)
                .leverage(leverage)
                .drawdown(drawdown, max_drawdown);
            if let Some(rate) = rate {
                builder = builder.exchange_rate(rate);
            }
            let signal = builder.build()?;

            let rates: Box<dyn ExchangeRateService> = if signal.exchange_rate.is_some()
                || signal.account_currency == signal.quote_currency
            {
                Box::new(riskdesk_fx::FixedRates::new())
            } else {
                Box::new(riskdesk_fx::live_service(&config.fx)?)
            };
            let sizer = riskdesk_risk::PositionSizer::new(rates);
            let result = sizer.calculate(&signal);
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::BasketSl {
            base_sl,
            side,
            context,
            history,
            pnl,
            confidence,
        } => {
            let context = context.as_deref().map(load_context).transpose()?;
            let stats = match history {
                Some(path) => excursion_stats(&path, config.excursion.percentile)?,
                None => None,
            };

            let manager = DynamicRiskManager::new(&config);
            let (sl, breakdown) = manager.calculate_dynamic_basket_sl(
                base_sl,
                side,
                context.as_ref(),
                stats.as_ref(),
                pnl,
                confidence,
            );

            let sep = "=".repeat(60);
            println!("\n{sep}");
            println!("  DYNAMIC BASKET STOP ({side})");
            println!("{sep}");
            println!("  Base SL:         {:.2}", base_sl);
            println!("  Adjusted SL:     {:.2}", sl);
            println!("  Trend:           {:.3}", breakdown.trend_score);
            println!("  Sentiment:       {:.3}", breakdown.sentiment_score);
            println!("  Structure:       {:.3}", breakdown.structure_score);
            println!("  Excursion:       {:.3}", breakdown.excursion_score);
            println!("  Confidence:      {:.3}", breakdown.confidence_score);
            println!("  Total Score:     {:.3}", breakdown.total_score);
            println!("  Multiplier:      {:.3}", breakdown.multiplier);
            if breakdown.conflict_alert {
                println!("  CONFLICT ALERT:  factors disagree, review the basket");
            }
            if let Some(err) = &breakdown.error {
                println!("  Error:           {err}");
            }
            println!("{sep}\n");
        }
        Commands::TieredTp {
            base_tp,
            volatility,
            data,
            factor,
            levels,
        } => {
            let volatility = match (volatility, data) {
                (Some(v), _) => v,
                (None, Some(path)) => atr_of(&path, config.basket.atr_period)?,
                (None, None) => anyhow::bail!("either --volatility or --data is required"),
            };
            let factor = factor.unwrap_or(config.basket.volatility_factor);
            let manager = DynamicRiskManager::new(&config);

            println!("Take-profit ladder (volatility {volatility:.5}, factor {factor}):");
            for level in 0..levels {
                let target = manager.calculate_tiered_tp(base_tp, volatility, factor, level);
                println!("  tier {level:<2} {target:.2}");
            }
        }
        Commands::Atr { data, period } => {
            let period = period.unwrap_or(config.basket.atr_period);
            let atr = atr_of(&data, period)?;
            println!("ATR({period}) = {atr}");
        }
        Commands::Excursion { history, percentile } => {
            let percentile = percentile.unwrap_or(config.excursion.percentile);
            match excursion_stats(&history, percentile)? {
                Some(stats) => println!("{}", serde_json::to_string_pretty(&stats)?),
                None => println!("No trades in {}", history.display()),
            }
        }
        Commands::Config => {
            print!("{}", config.to_toml_string()?);
        }
        Commands::Weights => {
            println!("Built-in weight presets (trend / sentiment / structure / excursion / confidence):");
            for name in ["balanced", "trend_following", "structure_first"] {
                if let Some(w) = RiskWeights::by_name(name) {
                    println!(
                        "  {name:<16} {} / {} / {} / {} / {}",
                        w.trend, w.sentiment, w.structure, w.excursion, w.confidence
                    );
                }
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>, preset: Option<&str>) -> Result<RiskConfig> {
    let mut config = match path {
        Some(path) => {
            let config = RiskConfig::load(path)?;
            tracing::info!(path = %path.display(), "Loaded risk configuration");
            config
        }
        None => RiskConfig::default(),
    };
    if let Some(name) = preset {
        config.weights = RiskWeights::by_name(name)
            .with_context(|| format!("unknown weight preset: {name}"))?;
    }
    Ok(config)
}

fn load_context(path: &Path) -> Result<MarketAnalysisContext> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let context = MarketAnalysisContext::from_json_str(&text)
        .with_context(|| format!("parsing market context {}", path.display()))?;
    Ok(context)
}

fn excursion_stats(path: &Path, percentile: Decimal) -> Result<Option<ExcursionStats>> {
    let trades = riskdesk_data::load_trades_from_csv(path)?;
    tracing::info!(trades = trades.len(), "Loaded trade history");
    Ok(ExcursionStats::from_trades(&trades, percentile))
}

fn atr_of(path: &Path, period: usize) -> Result<Decimal> {
    if period == 0 {
        anyhow::bail!("ATR period must be > 0");
    }
    let bars = riskdesk_data::load_bars_from_csv(path)?;
    tracing::info!(bars = bars.len(), "Loaded historical data");
    riskdesk_indicators::Atr::over(period, bars.iter().map(|b| (b.high, b.low, b.close)))
        .with_context(|| format!("need at least {period} bars for ATR, got {}", bars.len()))
}

fn parse_asset_class(s: &str) -> Result<AssetClass, String> {
    AssetClass::from_label(s).ok_or_else(|| format!("unknown asset class: {s}"))
}

fn parse_side(s: &str) -> Result<Side, String> {
    Side::from_label(s).ok_or_else(|| format!("unknown side: {s}"))
}
