#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

pub const REGIONS: [&str; 4] = ["North", "South", "East", "West"];

/// Expected cost before noise; smokers and high BMI cost more.
pub fn true_cost(age: f64, bmi: f64, smoker: &str, region: &str, children: f64) -> f64 {
    let smoker_load = match smoker {
        "Current" => 12_000.0,
        "Former" => 4_000.0,
        _ => 0.0,
    };
    let region_load = match region {
        "North" => 600.0,
        "East" => 300.0,
        _ => 0.0,
    };
    2_000.0 + 250.0 * age + 300.0 * (bmi - 20.0) + smoker_load + region_load + 500.0 * children
}

/// Writes a realistic medical-insurance table with `n` rows.
pub fn write_insurance_csv(path: &Path, n: usize, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 1_500.0).unwrap();
    let bmi_dist = Normal::<f64>::new(28.0, 5.0).unwrap();
    let income_dist = Normal::<f64>::new(55_000.0, 15_000.0).unwrap();

    let mut out = String::from(
        "age,bmi,sex,smoker,region,children,annual_medical_cost,income,\
         visits_last_year,medication_count,proc_imaging,proc_surgery\n",
    );
    for i in 0..n {
        let age = rng.gen_range(18..90) as f64;
        let bmi: f64 = bmi_dist.sample(&mut rng).clamp(15.0, 50.0);
        let sex = if rng.gen_bool(0.5) { "Male" } else { "Female" };
        let smoker = match rng.gen_range(0..10) {
            0 | 1 => "Current",
            2 | 3 => "Former",
            _ => "Never",
        };
        let region = REGIONS[rng.gen_range(0..4)];
        let children = rng.gen_range(0..5) as f64;
        let cost = (true_cost(age, bmi, smoker, region, children) + noise.sample(&mut rng)).max(500.0);
        // Every tenth income is left blank to exercise imputation.
        let income = if i % 10 == 0 {
            String::new()
        } else {
            format!("{:.0}", income_dist.sample(&mut rng).max(8_000.0))
        };
        let visits = rng.gen_range(0..12);
        let meds = rng.gen_range(0..6);
        let imaging = rng.gen_range(0..3);
        let surgery = rng.gen_range(0..2);
        writeln!(
            out,
            "{age},{bmi:.1},{sex},{smoker},{region},{children},{cost:.2},{income},{visits},{meds},{imaging},{surgery}"
        )
        .unwrap();
    }
    fs::write(path, out).unwrap();
}

pub fn insurance_dir(n: usize, seed: u64) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("medical_insurance.csv");
    write_insurance_csv(&path, n, seed);
    (dir, path)
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
