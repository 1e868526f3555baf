use crate::data::Dataset;
use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write CSV output: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Refusing to export the placeholder dataset; no source file was loaded.")]
    PlaceholderDataset,
}

fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Writes every row with its derived columns (imputed income, risk score,
/// risk category and burden percent). Missing values become empty cells.
pub fn write_dataset<W: io::Write>(dataset: &Dataset, out: W) -> Result<usize, ExportError> {
    if dataset.is_placeholder() {
        return Err(ExportError::PlaceholderDataset);
    }
    let mut writer = csv::Writer::from_writer(out);

    let mut header = vec![
        "age",
        "bmi",
        "sex",
        "smoker",
        "region",
        dataset.dependents_column.name(),
        "annual_medical_cost",
        "income",
        "risk_score",
        "risk_category",
        "burden_percent",
        "visits_last_year",
        "medication_count",
    ];
    header.extend(dataset.procedure_columns.iter().map(String::as_str));
    writer.write_record(&header)?;

    for record in &dataset.records {
        let mut row = vec![
            cell(record.age),
            cell(record.bmi),
            record.sex.clone().unwrap_or_default(),
            record.smoker.clone().unwrap_or_default(),
            record.region.clone().unwrap_or_default(),
            cell(record.dependents),
            cell(record.annual_medical_cost),
            record.income.to_string(),
            cell(record.risk_score),
            record
                .risk_category
                .map(|c| c.label().to_string())
                .unwrap_or_default(),
            cell(record.burden_percent()),
            cell(record.visits_last_year),
            cell(record.medication_count),
        ];
        row.extend(
            (0..dataset.procedure_columns.len())
                .map(|i| cell(record.procedures.get(i).copied().flatten())),
        );
        writer.write_record(&row)?;
    }
    writer.flush()?;
    log::info!("Exported {} rows", dataset.len());
    Ok(dataset.len())
}

pub fn export_csv(dataset: &Dataset, path: &Path) -> Result<usize, ExportError> {
    let file = std::fs::File::create(path)?;
    write_dataset(dataset, io::BufWriter::new(file))
}
