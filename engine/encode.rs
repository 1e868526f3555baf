//! # Feature Encoding
//!
//! Turns a subject's raw attributes into the fixed 9-column numeric vector the
//! regressors consume. The column order is the implicit contract between the
//! trainer and the predictor and is captured by [`FeatureSchema`]:
//!
//! ```text
//! [age, bmi, sex_code, smoker_code, <dependents>, region_North, region_South, region_East, region_West]
//! ```
//!
//! The dependents column is named after whatever the source file used
//! (`children` or `dependents`), so two schemas built from different files are
//! not interchangeable.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of columns in every encoded feature vector.
pub const FEATURE_COUNT: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    Male,
    Female,
    /// Anything the source file spells differently. Encodes like `Female`.
    Unspecified,
}

impl Sex {
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "Male" => Sex::Male,
            "Female" => Sex::Female,
            _ => Sex::Unspecified,
        }
    }

    pub fn code(self) -> f64 {
        match self {
            Sex::Male => 1.0,
            Sex::Female | Sex::Unspecified => 0.0,
        }
    }
}

/// Canonical three-level smoking history.
///
/// Boolean inputs collapse onto it: `true` is `Current`, `false` is `Never`.
/// Text that is neither a level name nor a boolean spelling reads as `Never`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SmokerStatus {
    Never,
    Former,
    Current,
}

impl SmokerStatus {
    pub fn from_label(label: &str) -> Self {
        let trimmed = label.trim();
        match trimmed {
            "Current" => SmokerStatus::Current,
            "Former" => SmokerStatus::Former,
            "Never" => SmokerStatus::Never,
            _ => match trimmed.to_ascii_lowercase().as_str() {
                "current" | "true" | "yes" | "1" => SmokerStatus::Current,
                "former" => SmokerStatus::Former,
                _ => SmokerStatus::Never,
            },
        }
    }

    pub fn code(self) -> f64 {
        match self {
            SmokerStatus::Current => 2.0,
            SmokerStatus::Former => 1.0,
            SmokerStatus::Never => 0.0,
        }
    }
}

impl From<bool> for SmokerStatus {
    fn from(active: bool) -> Self {
        if active {
            SmokerStatus::Current
        } else {
            SmokerStatus::Never
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    North,
    South,
    East,
    West,
}

impl Region {
    pub const ALL: [Region; 4] = [Region::North, Region::South, Region::East, Region::West];

    /// Exact-match lookup; names outside the four-region vocabulary yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        Region::ALL.into_iter().find(|r| r.name() == name.trim())
    }

    pub fn name(self) -> &'static str {
        match self {
            Region::North => "North",
            Region::South => "South",
            Region::East => "East",
            Region::West => "West",
        }
    }

    fn column_name(self) -> &'static str {
        match self {
            Region::North => "region_North",
            Region::South => "region_South",
            Region::East => "region_East",
            Region::West => "region_West",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The attributes a cost estimate is computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub age: f64,
    pub bmi: f64,
    pub sex: Sex,
    pub smoker: SmokerStatus,
    /// `None` for regions outside the known vocabulary.
    pub region: Option<Region>,
    pub dependents: f64,
}

impl Subject {
    /// Builds a subject from the loosely typed fields a form or a file row carries.
    pub fn from_labels(
        age: f64,
        bmi: f64,
        sex: &str,
        smoker: &str,
        region: &str,
        dependents: f64,
    ) -> Self {
        Self {
            age,
            bmi,
            sex: Sex::from_label(sex),
            smoker: SmokerStatus::from_label(smoker),
            region: Region::from_name(region),
            dependents,
        }
    }
}

/// Which header the source file used for the dependents count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DependentsColumn {
    Children,
    Dependents,
}

impl DependentsColumn {
    pub fn name(self) -> &'static str {
        match self {
            DependentsColumn::Children => "children",
            DependentsColumn::Dependents => "dependents",
        }
    }

    /// `children` wins when the file has it; otherwise `dependents`, present or not.
    pub fn detect<'a>(mut columns: impl Iterator<Item = &'a str>) -> Self {
        if columns.any(|c| c == "children") {
            DependentsColumn::Children
        } else {
            DependentsColumn::Dependents
        }
    }
}

/// Ordered names of the encoded columns a model was trained on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    names: Vec<String>,
    dependents: DependentsColumn,
}

impl FeatureSchema {
    pub fn new(dependents: DependentsColumn) -> Self {
        let mut names = Vec::with_capacity(FEATURE_COUNT);
        names.extend(["age", "bmi", "sex_code", "smoker_code"].map(String::from));
        names.push(dependents.name().to_string());
        names.extend(Region::ALL.map(|r| r.column_name().to_string()));
        Self { names, dependents }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn dependents_column(&self) -> &str {
        self.dependents.name()
    }
}

#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    schema: FeatureSchema,
}

impl FeatureEncoder {
    pub fn new(schema: FeatureSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Encodes a single subject into a vector laid out by the schema.
    ///
    /// The row starts zeroed and every column is filled by name, so an unknown
    /// region simply leaves the one-hot block at zero.
    pub fn encode(&self, subject: &Subject) -> Array1<f64> {
        let mut row = Array1::zeros(self.schema.len());
        let dependents_col = self.schema.dependents_column();
        for (idx, name) in self.schema.names().iter().enumerate() {
            row[idx] = match name.as_str() {
                "age" => subject.age,
                "bmi" => subject.bmi,
                "sex_code" => subject.sex.code(),
                "smoker_code" => subject.smoker.code(),
                n if n == dependents_col => subject.dependents,
                n => match subject.region {
                    Some(region) if region.column_name() == n => 1.0,
                    _ => 0.0,
                },
            };
        }
        row
    }

    /// Stacks encoded subjects into an `n x 9` design matrix.
    pub fn encode_all(&self, subjects: &[Subject]) -> Array2<f64> {
        let mut x = Array2::zeros((subjects.len(), self.schema.len()));
        for (mut out, subject) in x.rows_mut().into_iter().zip(subjects) {
            out.assign(&self.encode(subject));
        }
        x
    }
}
