//! # Dataset Loading
//!
//! Reads the insurance table from disk and derives the columns every analysis
//! depends on. Loading never fails: a missing or unreadable file degrades to a
//! one-row placeholder so that the pages built on top still render.
//!
//! - Income: missing cells take the median of the present ones; a file without
//!   any usable income falls back to a fixed default.
//! - Risk score: `0.4 * age + 0.6 * bmi`, unless the file already has one.
//! - Risk category: tertiles of the risk score (`Low`/`Medium`/`High`). The bin
//!   edges come from this particular file, so categories are relative to the
//!   population loaded. Degenerate score distributions put everybody in `Medium`.

use crate::config::EngineConfig;
use crate::encode::{DependentsColumn, Subject};
use itertools::Itertools;
use polars::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Quantile boundaries used for the three risk bins.
const RISK_QUANTILES: [f64; 4] = [0.0, 0.33, 0.66, 1.0];

const PLACEHOLDER_AGE: f64 = 30.0;
const PLACEHOLDER_COST: f64 = 5000.0;

/// Prefix marking per-procedure count columns.
pub const PROCEDURE_PREFIX: &str = "proc_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskCategory {
    Low,
    Medium,
    High,
}

impl RiskCategory {
    pub const ALL: [RiskCategory; 3] = [RiskCategory::Low, RiskCategory::Medium, RiskCategory::High];

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Low" => Some(RiskCategory::Low),
            "Medium" => Some(RiskCategory::Medium),
            "High" => Some(RiskCategory::High),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskCategory::Low => "Low",
            RiskCategory::Medium => "Medium",
            RiskCategory::High => "High",
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One insured subject as read from the source table.
///
/// Raw fields stay optional: the loader keeps malformed or empty cells as
/// `None` and leaves it to each consumer to decide what a usable row is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsuranceRecord {
    pub age: Option<f64>,
    pub bmi: Option<f64>,
    pub sex: Option<String>,
    pub smoker: Option<String>,
    pub region: Option<String>,
    pub dependents: Option<f64>,
    pub annual_medical_cost: Option<f64>,
    /// Always populated after loading (imputed if necessary).
    pub income: f64,
    pub risk_score: Option<f64>,
    pub risk_category: Option<RiskCategory>,
    pub visits_last_year: Option<f64>,
    pub medication_count: Option<f64>,
    /// Values aligned with [`Dataset::procedure_columns`].
    pub procedures: Vec<Option<f64>>,
}

impl InsuranceRecord {
    /// The prediction inputs of this row, or `None` if any of them is missing.
    pub fn subject(&self) -> Option<Subject> {
        Some(Subject::from_labels(
            self.age?,
            self.bmi?,
            self.sex.as_deref()?,
            self.smoker.as_deref()?,
            self.region.as_deref()?,
            self.dependents?,
        ))
    }

    /// Share of income spent on health, in percent.
    pub fn burden_percent(&self) -> Option<f64> {
        let cost = self.annual_medical_cost?;
        let burden = cost / self.income * 100.0;
        burden.is_finite().then_some(burden)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSource {
    File(PathBuf),
    /// The source file was absent or unreadable.
    Placeholder,
}

#[derive(Debug, Clone)]
pub struct Dataset {
    pub source: DatasetSource,
    pub dependents_column: DependentsColumn,
    pub procedure_columns: Vec<String>,
    pub records: Vec<InsuranceRecord>,
}

impl Dataset {
    /// The stand-in used when no source file can be read.
    pub fn placeholder(income_fallback: f64) -> Self {
        let record = InsuranceRecord {
            age: Some(PLACEHOLDER_AGE),
            bmi: None,
            sex: None,
            smoker: None,
            region: None,
            dependents: None,
            annual_medical_cost: Some(PLACEHOLDER_COST),
            income: income_fallback,
            risk_score: None,
            risk_category: None,
            visits_last_year: None,
            medication_count: None,
            procedures: Vec::new(),
        };
        let mut dataset = Self {
            source: DatasetSource::Placeholder,
            dependents_column: DependentsColumn::Dependents,
            procedure_columns: Vec::new(),
            records: vec![record],
        };
        dataset.derive_risk(false);
        dataset
    }

    pub fn is_placeholder(&self) -> bool {
        self.source == DatasetSource::Placeholder
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Seeded random subset of at most `n` rows, returned in file order.
    pub fn sample(&self, n: usize, seed: u64) -> Vec<&InsuranceRecord> {
        sample_indices(self.records.len(), n, seed)
            .into_iter()
            .map(|i| &self.records[i])
            .collect()
    }

    /// Distinct region labels in order of first appearance.
    pub fn regions(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter_map(|r| r.region.as_deref())
            .unique()
            .collect()
    }

    /// Fills `risk_score` where it is missing and, unless the file supplied
    /// categories, re-bins every row into tertiles.
    fn derive_risk(&mut self, keep_file_categories: bool) {
        for record in &mut self.records {
            if record.risk_score.is_none() {
                record.risk_score = match (record.age, record.bmi) {
                    (Some(age), Some(bmi)) => Some(0.4 * age + 0.6 * bmi),
                    _ => None,
                };
            }
        }
        if keep_file_categories {
            return;
        }
        let scores: Vec<Option<f64>> = self.records.iter().map(|r| r.risk_score).collect();
        let categories = assign_risk_categories(&scores);
        for (record, category) in self.records.iter_mut().zip(categories) {
            record.risk_category = category;
        }
    }
}

/// Indices of a seeded random subset of `0..len`, sorted ascending.
/// When `len <= n` every index is returned.
pub fn sample_indices(len: usize, n: usize, seed: u64) -> Vec<usize> {
    if len <= n {
        return (0..len).collect();
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut picked = rand::seq::index::sample(&mut rng, len, n).into_vec();
    picked.sort_unstable();
    picked
}

/// Bins risk scores into `Low`/`Medium`/`High` tertiles.
///
/// Falls back to `Medium` for every row (missing scores included) when no
/// score is present, when fewer than three distinct scores exist, or when two
/// bin edges coincide.
pub fn assign_risk_categories(scores: &[Option<f64>]) -> Vec<Option<RiskCategory>> {
    match tertile_edges(scores) {
        Some(edges) => scores
            .iter()
            .map(|score| {
                score.map(|v| {
                    if v <= edges[1] {
                        RiskCategory::Low
                    } else if v <= edges[2] {
                        RiskCategory::Medium
                    } else {
                        RiskCategory::High
                    }
                })
            })
            .collect(),
        None => {
            log::debug!("Risk score distribution is degenerate; assigning Medium to every row");
            vec![Some(RiskCategory::Medium); scores.len()]
        }
    }
}

fn tertile_edges(scores: &[Option<f64>]) -> Option<[f64; 4]> {
    let mut present: Vec<f64> = scores.iter().flatten().copied().collect();
    present.sort_by(f64::total_cmp);
    if present.iter().dedup().count() < 3 {
        return None;
    }
    let edges = RISK_QUANTILES.map(|q| quantile_sorted(&present, q));
    if edges.windows(2).any(|w| w[1] <= w[0]) {
        return None;
    }
    Some(edges)
}

/// Linear-interpolation quantile of an ascending, non-empty slice.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Median of the given values, `None` when there are none.
pub fn median(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let mut sorted: Vec<f64> = values.into_iter().collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    Some(quantile_sorted(&sorted, 0.5))
}

/// Loads the configured dataset, falling back to the placeholder when the file
/// is absent or cannot be parsed.
pub fn load_dataset(config: &EngineConfig) -> Dataset {
    let path = config.dataset_path.as_path();
    if !path.exists() {
        log::warn!(
            "Dataset '{}' not found; using placeholder row",
            path.display()
        );
        return Dataset::placeholder(config.income_fallback);
    }
    match internal::read_dataset(path, config.income_fallback) {
        Ok(dataset) => {
            log::info!(
                "Loaded {} rows from '{}'",
                dataset.len(),
                path.display()
            );
            dataset
        }
        Err(e) => {
            log::warn!(
                "Failed to read dataset '{}': {e}; using placeholder row",
                path.display()
            );
            Dataset::placeholder(config.income_fallback)
        }
    }
}

/// Failures while parsing the source table. Never escapes [`load_dataset`].
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Error from the underlying Polars DataFrame library: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("The input file has no data rows.")]
    NoRows,
}

mod internal {
    use super::*;

    pub(super) fn read_dataset(path: &Path, income_fallback: f64) -> Result<Dataset, DataError> {
        let df = CsvReader::new(File::open(path)?)
            .with_options(
                CsvReadOptions::default()
                    .with_has_header(true)
                    // Whole-file inference: a fractional cell deep in an
                    // otherwise integral column must not be read as null.
                    .with_infer_schema_length(None)
                    .with_ignore_errors(true)
                    .with_parse_options(CsvParseOptions::default().with_separator(b',')),
            )
            .finish()?;

        let n = df.height();
        if n == 0 {
            return Err(DataError::NoRows);
        }

        let columns: Vec<String> = df
            .get_column_names()
            .into_iter()
            .map(|c| c.to_string())
            .collect();
        log::debug!("Columns found: {columns:?}");

        let dependents_column = DependentsColumn::detect(columns.iter().map(String::as_str));
        let procedure_columns: Vec<String> = columns
            .iter()
            .filter(|c| c.starts_with(PROCEDURE_PREFIX))
            .cloned()
            .collect();

        let age = numeric_column(&df, "age")?;
        let bmi = numeric_column(&df, "bmi")?;
        let sex = text_column(&df, "sex")?;
        let smoker = text_column(&df, "smoker")?;
        let region = text_column(&df, "region")?;
        // A file with neither dependents header counts everybody as having none.
        let dependents = numeric_column(&df, dependents_column.name())?
            .unwrap_or_else(|| vec![Some(0.0); n]);
        let cost = numeric_column(&df, "annual_medical_cost")?;
        let income = numeric_column(&df, "income")?;
        let risk_score = numeric_column(&df, "risk_score")?;
        let risk_category = text_column(&df, "risk_category")?;
        let visits = numeric_column(&df, "visits_last_year")?;
        let medication = numeric_column(&df, "medication_count")?;
        let procedures = procedure_columns
            .iter()
            .map(|name| Ok(numeric_column(&df, name)?.unwrap_or_else(|| vec![None; n])))
            .collect::<Result<Vec<_>, DataError>>()?;

        let income = impute_income(income, n, income_fallback);
        let has_file_categories = risk_category.is_some();

        let cell = |col: &Option<Vec<Option<f64>>>, i: usize| col.as_ref().and_then(|v| v[i]);
        let text = |col: &Option<Vec<Option<String>>>, i: usize| {
            col.as_ref().and_then(|v| v[i].clone())
        };

        let records = (0..n)
            .map(|i| InsuranceRecord {
                age: cell(&age, i),
                bmi: cell(&bmi, i),
                sex: text(&sex, i),
                smoker: text(&smoker, i),
                region: text(&region, i),
                dependents: dependents[i],
                annual_medical_cost: cell(&cost, i),
                income: income[i],
                risk_score: cell(&risk_score, i),
                risk_category: text(&risk_category, i)
                    .as_deref()
                    .and_then(RiskCategory::from_label),
                visits_last_year: cell(&visits, i),
                medication_count: cell(&medication, i),
                procedures: procedures.iter().map(|p| p[i]).collect(),
            })
            .collect();

        let mut dataset = Dataset {
            source: DatasetSource::File(path.to_path_buf()),
            dependents_column,
            procedure_columns,
            records,
        };
        dataset.derive_risk(has_file_categories);
        Ok(dataset)
    }

    /// Median-imputes missing income; with no usable income at all every row
    /// gets the fallback.
    fn impute_income(income: Option<Vec<Option<f64>>>, n: usize, fallback: f64) -> Vec<f64> {
        let Some(values) = income else {
            log::debug!("No income column; using fallback {fallback}");
            return vec![fallback; n];
        };
        let fill = median(values.iter().flatten().copied()).unwrap_or(fallback);
        values.into_iter().map(|v| v.unwrap_or(fill)).collect()
    }

    fn has_column(df: &DataFrame, name: &str) -> bool {
        df.get_column_names().iter().any(|c| c.as_str() == name)
    }

    /// Numeric view of a column. Unparseable and non-finite cells become `None`;
    /// an absent column yields `Ok(None)`.
    fn numeric_column(df: &DataFrame, name: &str) -> Result<Option<Vec<Option<f64>>>, DataError> {
        if !has_column(df, name) {
            return Ok(None);
        }
        let casted = df.column(name)?.cast(&DataType::Float64)?;
        let values = casted
            .f64()?
            .into_iter()
            .map(|v| v.filter(|x| x.is_finite()))
            .collect();
        Ok(Some(values))
    }

    /// Text view of a column; booleans and numbers are rendered as strings.
    fn text_column(df: &DataFrame, name: &str) -> Result<Option<Vec<Option<String>>>, DataError> {
        if !has_column(df, name) {
            return Ok(None);
        }
        let casted = df.column(name)?.cast(&DataType::String)?;
        let values = casted
            .str()?
            .into_iter()
            .map(|v| v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string))
            .collect();
        Ok(Some(values))
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::io::{self, Write};
    use tempfile::NamedTempFile;

    fn create_test_csv(content: &str) -> io::Result<NamedTempFile> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "{}", content)?;
        file.flush()?;
        Ok(file)
    }

    fn config_for(file: &NamedTempFile) -> EngineConfig {
        EngineConfig::default().with_dataset_path(file.path())
    }

    #[test]
    fn missing_file_yields_placeholder() {
        let config = EngineConfig::default().with_dataset_path("/nonexistent/medical_insurance.csv");
        let dataset = load_dataset(&config);

        assert!(dataset.is_placeholder());
        assert_eq!(dataset.len(), 1);
        let row = &dataset.records[0];
        assert_eq!(row.age, Some(30.0));
        assert_eq!(row.annual_medical_cost, Some(5000.0));
        assert_eq!(row.income, 50_000.0);
        assert_eq!(row.risk_category, Some(RiskCategory::Medium));
    }

    #[test]
    fn income_is_median_imputed() {
        let content = "age,bmi,sex,smoker,region,children,annual_medical_cost,income\n\
                       30,22.0,Male,Never,North,0,1000,10000\n\
                       40,25.0,Female,Former,South,1,2000,\n\
                       50,30.0,Male,Current,East,2,3000,30000\n\
                       60,35.0,Female,Never,West,3,4000,40000";
        let file = create_test_csv(content).unwrap();
        let dataset = load_dataset(&config_for(&file));

        assert_eq!(dataset.dependents_column, DependentsColumn::Children);
        assert_abs_diff_eq!(dataset.records[1].income, 30000.0, epsilon = 1e-9);
        assert_abs_diff_eq!(dataset.records[0].income, 10000.0, epsilon = 1e-9);
    }

    #[test]
    fn absent_income_uses_fallback() {
        let content = "age,bmi,annual_medical_cost\n30,22.0,1000\n40,25.0,2000";
        let file = create_test_csv(content).unwrap();
        let dataset = load_dataset(&config_for(&file));
        assert!(dataset.records.iter().all(|r| r.income == 50_000.0));
        // No dependents header at all: zeros.
        assert_eq!(dataset.dependents_column, DependentsColumn::Dependents);
        assert!(dataset.records.iter().all(|r| r.dependents == Some(0.0)));
    }

    #[test]
    fn risk_score_and_tertiles_are_derived() {
        let mut rows = vec!["age,bmi,annual_medical_cost".to_string()];
        for i in 0..9 {
            rows.push(format!("{},{},1000", 20 + 5 * i, 20 + i));
        }
        let file = create_test_csv(&rows.join("\n")).unwrap();
        let dataset = load_dataset(&config_for(&file));

        let first = &dataset.records[0];
        assert_abs_diff_eq!(first.risk_score.unwrap(), 0.4 * 20.0 + 0.6 * 20.0, epsilon = 1e-9);
        assert_eq!(first.risk_category, Some(RiskCategory::Low));
        assert_eq!(dataset.records[4].risk_category, Some(RiskCategory::Medium));
        assert_eq!(dataset.records[8].risk_category, Some(RiskCategory::High));
    }

    #[test]
    fn file_risk_columns_are_respected() {
        let content = "age,bmi,risk_score,risk_category\n30,22,99.5,High\n40,25,1.0,Low";
        let file = create_test_csv(content).unwrap();
        let dataset = load_dataset(&config_for(&file));
        assert_eq!(dataset.records[0].risk_score, Some(99.5));
        assert_eq!(dataset.records[0].risk_category, Some(RiskCategory::High));
        assert_eq!(dataset.records[1].risk_category, Some(RiskCategory::Low));
    }

    #[test]
    fn fewer_than_three_distinct_scores_fall_back_to_medium() {
        let scores = vec![Some(1.0), Some(1.0), Some(2.0), Some(2.0), None];
        let categories = assign_risk_categories(&scores);
        assert!(categories.iter().all(|c| *c == Some(RiskCategory::Medium)));
    }

    #[test]
    fn duplicate_edges_fall_back_to_medium() {
        // Three distinct values, but the lower tertile edge equals the minimum.
        let mut scores = vec![Some(1.0); 10];
        scores.push(Some(2.0));
        scores.push(Some(3.0));
        let categories = assign_risk_categories(&scores);
        assert!(categories.iter().all(|c| *c == Some(RiskCategory::Medium)));
    }

    #[test]
    fn malformed_cells_become_missing() {
        let content = "age,bmi,sex,smoker,region,dependents,annual_medical_cost\n\
                       abc,22.0,Male,Never,North,0,1000\n\
                       40,25.0,Female,Former,South,1,2000";
        let file = create_test_csv(content).unwrap();
        let dataset = load_dataset(&config_for(&file));
        assert_eq!(dataset.len(), 2);
        assert!(dataset.records[0].subject().is_none());
        assert!(dataset.records[1].subject().is_some());
    }

    #[test]
    fn late_fractional_values_still_parse() {
        let mut rows =
            vec!["age,bmi,sex,smoker,region,children,annual_medical_cost,income".to_string()];
        for _ in 0..150 {
            rows.push("40,28,Male,Never,North,0,5000,40000".to_string());
        }
        for _ in 0..50 {
            rows.push("40,28.7,Female,Current,South,1,5000.55,41250.5".to_string());
        }
        let file = create_test_csv(&rows.join("\n")).unwrap();
        let dataset = load_dataset(&config_for(&file));

        assert_eq!(dataset.len(), 200);
        let usable = dataset
            .records
            .iter()
            .filter(|r| r.subject().is_some() && r.annual_medical_cost.is_some())
            .count();
        assert_eq!(usable, 200);
        let last = &dataset.records[199];
        assert_eq!(last.bmi, Some(28.7));
        assert_eq!(last.annual_medical_cost, Some(5000.55));
        assert_abs_diff_eq!(last.income, 41250.5, epsilon = 1e-9);
    }

    #[test]
    fn procedure_columns_are_collected() {
        let content = "age,bmi,proc_mri,proc_xray\n30,22,1,3\n40,25,0,2";
        let file = create_test_csv(content).unwrap();
        let dataset = load_dataset(&config_for(&file));
        assert_eq!(dataset.procedure_columns, vec!["proc_mri", "proc_xray"]);
        assert_eq!(dataset.records[0].procedures, vec![Some(1.0), Some(3.0)]);
    }

    #[test]
    fn sample_is_seeded_and_bounded() {
        let a = sample_indices(100, 10, 42);
        let b = sample_indices(100, 10, 42);
        assert_eq!(a, b);
        assert_eq!(a.len(), 10);
        assert!(a.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(sample_indices(5, 10, 42), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn median_handles_even_counts() {
        assert_eq!(median([4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(std::iter::empty()), None);
    }
}
