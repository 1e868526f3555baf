//! Population summaries and per-subject forecasts built on the loaded dataset
//! and fitted models.

use crate::config::EngineConfig;
use crate::data::{Dataset, InsuranceRecord, RiskCategory, median};
use crate::encode::{SmokerStatus, Subject};
use crate::model::{FittedModel, ModelKind};
use crate::predict::{PredictError, predict};
use crate::regressors::Explainability;
use itertools::Itertools;
use std::fmt;

/// A subject's predicted cost next to the same subject at optimal health.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostForecast {
    pub cost: f64,
    pub optimal_cost: f64,
    /// `cost - optimal_cost`; negative when the subject already beats the baseline.
    pub gap: f64,
    pub premium_alert: bool,
    /// Position of `cost` on the risk meter, in `[0, 1]`.
    pub gauge_fraction: f64,
}

/// Scores `subject` and its optimal-health twin (BMI at `optimal_bmi`, never smoked).
pub fn forecast(
    model: &FittedModel,
    subject: &Subject,
    config: &EngineConfig,
) -> Result<CostForecast, PredictError> {
    let schema = model.schema();
    let cost = predict(model, schema, subject)?;
    let optimal = Subject {
        bmi: config.optimal_bmi,
        smoker: SmokerStatus::Never,
        ..subject.clone()
    };
    let optimal_cost = predict(model, schema, &optimal)?;
    let gap = cost - optimal_cost;
    Ok(CostForecast {
        cost,
        optimal_cost,
        gap,
        premium_alert: gap > config.premium_alert_threshold,
        gauge_fraction: cost.clamp(0.0, config.gauge_ceiling) / config.gauge_ceiling,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryStats {
    pub category: RiskCategory,
    pub count: usize,
    pub total_cost: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskPoint {
    pub age: f64,
    pub cost: f64,
    pub bmi: f64,
    pub category: RiskCategory,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskSummary {
    pub total_rows: usize,
    /// One entry per category, Low to High, including empty ones.
    pub categories: Vec<CategoryStats>,
    pub high_share: f64,
    pub mean_cost_high: Option<f64>,
    pub mean_cost_low: Option<f64>,
    pub scatter: Vec<RiskPoint>,
}

impl RiskSummary {
    pub fn compute(dataset: &Dataset, config: &EngineConfig) -> Self {
        let by_category = dataset
            .records
            .iter()
            .filter_map(|r| r.risk_category.map(|c| (c, r.annual_medical_cost)))
            .into_group_map();

        let categories: Vec<CategoryStats> = RiskCategory::ALL
            .into_iter()
            .map(|category| {
                let costs = by_category.get(&category).map(Vec::as_slice).unwrap_or(&[]);
                CategoryStats {
                    category,
                    count: costs.len(),
                    total_cost: costs.iter().flatten().sum(),
                }
            })
            .collect();

        let mean_cost = |category: RiskCategory| {
            let costs: Vec<f64> = by_category
                .get(&category)
                .into_iter()
                .flatten()
                .flatten()
                .copied()
                .collect();
            (!costs.is_empty()).then(|| costs.iter().sum::<f64>() / costs.len() as f64)
        };

        let total_rows = dataset.len();
        let high = by_category.get(&RiskCategory::High).map_or(0, Vec::len);
        let scatter = dataset
            .sample(config.scatter_sample, config.seed)
            .into_iter()
            .filter_map(|r| {
                Some(RiskPoint {
                    age: r.age?,
                    cost: r.annual_medical_cost?,
                    bmi: r.bmi?,
                    category: r.risk_category?,
                })
            })
            .collect();

        Self {
            total_rows,
            categories,
            high_share: if total_rows > 0 {
                high as f64 / total_rows as f64
            } else {
                0.0
            },
            mean_cost_high: mean_cost(RiskCategory::High),
            mean_cost_low: mean_cost(RiskCategory::Low),
            scatter,
        }
    }
}

/// Restricts utilization analytics to one region.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RegionFilter {
    #[default]
    All,
    Only(String),
}

impl RegionFilter {
    /// `"All"` (any case) means no filter; anything else is matched verbatim.
    pub fn from_arg(arg: &str) -> Self {
        if arg.eq_ignore_ascii_case("all") {
            RegionFilter::All
        } else {
            RegionFilter::Only(arg.to_string())
        }
    }

    pub fn matches(&self, record: &InsuranceRecord) -> bool {
        match self {
            RegionFilter::All => true,
            RegionFilter::Only(name) => record.region.as_deref() == Some(name.as_str()),
        }
    }
}

impl fmt::Display for RegionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionFilter::All => f.write_str("All"),
            RegionFilter::Only(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureMean {
    pub procedure: String,
    /// `None` when no row in the selection has a value for this procedure.
    pub mean: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DensityCell {
    pub visits: f64,
    pub medications: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Utilization {
    pub filter: RegionFilter,
    pub regions: Vec<String>,
    pub rows: usize,
    /// `None` when the source has no `proc_*` columns.
    pub procedures: Option<Vec<ProcedureMean>>,
    /// `None` when visit or medication counts are absent from the selection.
    pub density: Option<Vec<DensityCell>>,
}

impl Utilization {
    pub fn compute(dataset: &Dataset, filter: RegionFilter) -> Self {
        let selected: Vec<&InsuranceRecord> =
            dataset.records.iter().filter(|r| filter.matches(r)).collect();

        let procedures = (!dataset.procedure_columns.is_empty()).then(|| {
            dataset
                .procedure_columns
                .iter()
                .enumerate()
                .map(|(idx, name)| {
                    let values: Vec<f64> = selected
                        .iter()
                        .filter_map(|r| r.procedures.get(idx).copied().flatten())
                        .collect();
                    ProcedureMean {
                        procedure: name.clone(),
                        mean: (!values.is_empty())
                            .then(|| values.iter().sum::<f64>() / values.len() as f64),
                    }
                })
                .collect()
        });

        let pairs: Vec<(f64, f64)> = selected
            .iter()
            .filter_map(|r| Some((r.visits_last_year?, r.medication_count?)))
            .collect();
        let density = (!pairs.is_empty()).then(|| {
            pairs
                .into_iter()
                .sorted_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)))
                .dedup_with_count()
                .map(|(count, (visits, medications))| DensityCell {
                    visits,
                    medications,
                    count,
                })
                .collect()
        });

        Self {
            regions: dataset.regions().into_iter().map(String::from).collect(),
            rows: selected.len(),
            filter,
            procedures,
            density,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BurdenPoint {
    pub income: f64,
    pub burden_percent: f64,
    pub category: Option<RiskCategory>,
}

/// Share of income spent on health across the population.
#[derive(Debug, Clone, PartialEq)]
pub struct EconomicBurden {
    pub mean_burden: Option<f64>,
    pub median_income: Option<f64>,
    pub alert_percent: f64,
    /// Fraction of rows with a burden above `alert_percent`.
    pub share_above_alert: f64,
    pub points: Vec<BurdenPoint>,
}

impl EconomicBurden {
    pub fn compute(dataset: &Dataset, config: &EngineConfig) -> Self {
        let burdens: Vec<f64> = dataset
            .records
            .iter()
            .filter_map(InsuranceRecord::burden_percent)
            .collect();
        let above = burdens
            .iter()
            .filter(|&&b| b > config.burden_alert_percent)
            .count();
        let points = dataset
            .sample(config.scatter_sample, config.seed)
            .into_iter()
            .filter_map(|r| {
                Some(BurdenPoint {
                    income: r.income,
                    burden_percent: r.burden_percent()?,
                    category: r.risk_category,
                })
            })
            .collect();

        Self {
            mean_burden: (!burdens.is_empty())
                .then(|| burdens.iter().sum::<f64>() / burdens.len() as f64),
            median_income: median(dataset.records.iter().map(|r| r.income)),
            alert_percent: config.burden_alert_percent,
            share_above_alert: if burdens.is_empty() {
                0.0
            } else {
                above as f64 / burdens.len() as f64
            },
            points,
        }
    }
}

/// Per-feature drivers of a fitted model, sorted ascending by value.
#[derive(Debug, Clone, PartialEq)]
pub enum Drivers {
    Importance(Vec<(String, f64)>),
    Coefficient(Vec<(String, f64)>),
    Opaque,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelInsight {
    pub kind: ModelKind,
    pub drivers: Drivers,
    pub feature_count: usize,
    pub training_rows: usize,
    pub note: Option<&'static str>,
}

impl ModelInsight {
    pub fn of(model: &FittedModel) -> Self {
        let paired = |values: &[f64]| -> Vec<(String, f64)> {
            model
                .schema()
                .names()
                .iter()
                .cloned()
                .zip(values.iter().copied())
                .sorted_by(|a, b| a.1.total_cmp(&b.1))
                .collect()
        };
        let drivers = match model.explainability() {
            Explainability::Importance(v) => Drivers::Importance(paired(v)),
            Explainability::Coefficient(v) => Drivers::Coefficient(paired(v)),
            Explainability::Opaque => Drivers::Opaque,
        };
        Self {
            kind: model.kind(),
            drivers,
            feature_count: model.schema().len(),
            training_rows: model.training_rows(),
            note: model.kind().analyst_note(),
        }
    }
}
