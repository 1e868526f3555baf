#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]

use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use nexus::analytics::{
    Drivers, EconomicBurden, ModelInsight, RegionFilter, RiskSummary, Utilization, forecast,
};
use nexus::export::export_csv;
use nexus::{Engine, EngineConfig, FittedModel, LiveModel, ModelKind, Subject};

#[derive(Parser)]
#[command(
    name = "nexus",
    about = "Medical-insurance cost analytics and on-demand regression models",
    long_about = "Loads a medical-insurance cost table, trains any of eleven regression \
                 families on demand and reports forecasts, risk segments, utilization and \
                 economic burden."
)]
struct Cli {
    /// TOML file with engine settings
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Dataset CSV, overriding the configured path
    #[arg(long, global = true, value_name = "FILE")]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct PredictArgs {
    /// Model selector, e.g. "Random Forest" (see `nexus models`)
    #[arg(long, default_value = "Random Forest")]
    model: ModelKind,

    #[arg(long, default_value = "45")]
    age: f64,

    #[arg(long, default_value = "28.5")]
    bmi: f64,

    /// Male or Female
    #[arg(long, default_value = "Male")]
    sex: String,

    /// true/false, or Never/Former/Current
    #[arg(long, default_value = "false")]
    smoker: String,

    /// North, South, East or West
    #[arg(long, default_value = "North")]
    region: String,

    #[arg(long, default_value = "0")]
    dependents: f64,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "List the model selectors")]
    Models,
    #[command(about = "Forecast one subject's annual cost against optimal health")]
    Predict(PredictArgs),
    #[command(about = "Risk stratification of the population")]
    Risk,
    #[command(about = "Procedure frequency and visits vs. medication")]
    Usage {
        /// Region to restrict to, or "All"
        #[arg(long, default_value = "All")]
        region: String,
    },
    #[command(about = "Share of income spent on health")]
    Econ,
    #[command(about = "Explain what drives a model's predictions")]
    Insights {
        #[arg(long, default_value = "Random Forest")]
        model: ModelKind,
    },
    #[command(about = "Write the dataset with derived columns to CSV")]
    Export {
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Cli {
        config,
        data,
        command,
    } = Cli::parse();

    let Some(command) = command else {
        if let Err(e) = Cli::command().print_help() {
            eprintln!("Error: {e}");
            process::exit(1);
        }
        println!();
        return;
    };

    let result = build_engine(config, data).and_then(|mut engine| match command {
        Commands::Models => {
            list_models();
            Ok(())
        }
        Commands::Predict(args) => run_predict(&mut engine, args),
        Commands::Risk => run_risk(&mut engine),
        Commands::Usage { region } => run_usage(&mut engine, &region),
        Commands::Econ => run_econ(&mut engine),
        Commands::Insights { model } => run_insights(&mut engine, model),
        Commands::Export { output } => run_export(&mut engine, output),
    });

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn build_engine(
    config: Option<PathBuf>,
    data: Option<PathBuf>,
) -> Result<Engine, Box<dyn std::error::Error>> {
    let mut config = match config {
        Some(path) => EngineConfig::load(&path)?,
        None => EngineConfig::default(),
    };
    if let Some(path) = data {
        config = config.with_dataset_path(path);
    }
    config.validate()?;
    Ok(Engine::new(config))
}

fn require_model(
    engine: &mut Engine,
    kind: ModelKind,
) -> Result<Arc<FittedModel>, Box<dyn std::error::Error>> {
    match engine.live_model(kind) {
        LiveModel::Online(model) => {
            println!("{kind} Online");
            Ok(model)
        }
        LiveModel::Offline(reason) => Err(format!("{kind}: {reason}").into()),
    }
}

fn list_models() {
    for kind in ModelKind::ALL {
        println!(
            "{:<30} {:<20} {}",
            kind.to_string(),
            kind.explainability_kind().to_string(),
            if kind.requires_scaling() { "scaled" } else { "" }
        );
    }
}

fn run_predict(engine: &mut Engine, args: PredictArgs) -> Result<(), Box<dyn std::error::Error>> {
    let model = require_model(engine, args.model)?;
    let subject = Subject::from_labels(
        args.age,
        args.bmi,
        &args.sex,
        &args.smoker,
        &args.region,
        args.dependents,
    );
    if subject.region.is_none() {
        log::warn!("Unknown region '{}'; region effects ignored", args.region);
    }
    let result = forecast(&model, &subject, engine.config())?;

    println!("Predicted annual cost: ${:.0}", result.cost);
    println!("Optimal-health cost:   ${:.0}", result.optimal_cost);
    if result.premium_alert {
        println!(
            "RISK ANALYSIS: profile suggests a ${:.0} premium compared to optimal health.",
            result.gap
        );
    } else {
        println!("LOW RISK PROFILE: tracking with healthy baseline.");
    }
    println!(
        "Risk meter: {:.1}% of ${:.0}",
        result.gauge_fraction * 100.0,
        engine.config().gauge_ceiling
    );
    Ok(())
}

fn run_risk(engine: &mut Engine) -> Result<(), Box<dyn std::error::Error>> {
    let dataset = engine.dataset();
    let summary = RiskSummary::compute(&dataset, engine.config());
    let high = summary
        .categories
        .iter()
        .find(|c| c.category == nexus::RiskCategory::High)
        .map_or(0, |c| c.count);

    println!(
        "High risk patients: {high} ({:.1}% of {})",
        summary.high_share * 100.0,
        summary.total_rows
    );
    let money = |v: Option<f64>| v.map_or_else(|| "n/a".to_string(), |v| format!("${v:.0}"));
    println!("Avg cost (High risk): {}", money(summary.mean_cost_high));
    println!("Avg cost (Low risk):  {}", money(summary.mean_cost_low));
    println!("Segmentation by total cost:");
    for stats in &summary.categories {
        println!(
            "  {:<7} {:>7} rows  ${:.0}",
            stats.category.to_string(),
            stats.count,
            stats.total_cost
        );
    }
    println!("Scatter sample: {} points", summary.scatter.len());
    Ok(())
}

fn run_usage(engine: &mut Engine, region: &str) -> Result<(), Box<dyn std::error::Error>> {
    let dataset = engine.dataset();
    let usage = Utilization::compute(&dataset, RegionFilter::from_arg(region));
    println!(
        "Region: {} ({} rows; available: {})",
        usage.filter,
        usage.rows,
        usage.regions.join(", ")
    );

    match &usage.procedures {
        Some(procedures) => {
            println!("Procedure frequency (avg count):");
            for p in procedures {
                let mean = p.mean.map_or_else(|| "n/a".to_string(), |m| format!("{m:.3}"));
                println!("  {:<24} {mean}", p.procedure);
            }
        }
        None => println!("No procedure data found in CSV."),
    }

    match &usage.density {
        Some(cells) => {
            println!("Visits vs. medication (visits, meds: rows):");
            for cell in cells {
                println!("  {}, {}: {}", cell.visits, cell.medications, cell.count);
            }
        }
        None => println!("No visit/medication data found in CSV."),
    }
    Ok(())
}

fn run_econ(engine: &mut Engine) -> Result<(), Box<dyn std::error::Error>> {
    let dataset = engine.dataset();
    let burden = EconomicBurden::compute(&dataset, engine.config());
    match burden.mean_burden {
        Some(mean) => println!("Avg burden: {mean:.1}% of annual income"),
        None => println!("Avg burden: n/a"),
    }
    if let Some(income) = burden.median_income {
        println!("Median income: ${income:.0}");
    }
    println!(
        "Spending more than {}% of income on health: {:.1}% of patients",
        burden.alert_percent,
        burden.share_above_alert * 100.0
    );
    Ok(())
}

fn run_insights(engine: &mut Engine, kind: ModelKind) -> Result<(), Box<dyn std::error::Error>> {
    let model = require_model(engine, kind)?;
    let insight = ModelInsight::of(&model);

    println!("Algorithm:      {}", insight.kind);
    println!("Input features: {}", insight.feature_count);
    println!("Training rows:  {}", insight.training_rows);
    match &insight.drivers {
        Drivers::Importance(pairs) => {
            println!("Feature importance:");
            for (name, value) in pairs {
                println!("  {name:<16} {value:.4}");
            }
        }
        Drivers::Coefficient(pairs) => {
            println!("Weight impact (positive vs negative):");
            for (name, value) in pairs {
                println!("  {name:<16} {value:+.4}");
            }
        }
        Drivers::Opaque => {
            println!(
                "{kind} predicts from distances in feature space rather than explicit weights \
                 or splits, so it has no per-feature drivers. Try Random Forest or Linear \
                 Regression for clear drivers."
            );
        }
    }
    if let Some(note) = insight.note {
        println!("Analyst note: {note}");
    }
    Ok(())
}

fn run_export(engine: &mut Engine, output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let dataset = engine.dataset();
    let rows = export_csv(&dataset, &output)?;
    println!("Wrote {rows} rows to {}", output.display());
    Ok(())
}
