//! Result output formatting and writing.

use crate::orchestrator::SweepResults;
use crate::OutputFormat;
use anyhow::Result;
use lib_types::impedance::ResultPoint;
use std::io::Write;
use std::path::Path;

/// Per-parameter data file names, in output column order. The instrument's
/// web front end polls these by name, so the flat one-value-per-line layout
/// is part of the external interface and is written for every format.
pub const DATA_FILE_NAMES: [&str; 16] = [
    "data_frequency",
    "data_phase",
    "data_amplitude",
    "data_Y_abs",
    "data_phaseY",
    "data_R_s",
    "data_X_s",
    "data_G_p",
    "data_B_p",
    "data_C_s",
    "data_C_p",
    "data_L_s",
    "data_L_p",
    "data_R_p",
    "data_Q",
    "data_D",
];

const COLUMN_LABELS: [&str; 16] = [
    "frequency_hz",
    "phase_z_deg",
    "amplitude_z",
    "y_abs",
    "phase_y_deg",
    "r_s",
    "x_s",
    "g_p",
    "b_p",
    "c_s",
    "c_p",
    "l_s",
    "l_p",
    "r_p",
    "q",
    "d",
];

/// One output row, in the same order as [`DATA_FILE_NAMES`].
fn row_values(point: &ResultPoint) -> [f64; 16] {
    let d = &point.derived;
    [
        point.frequency.0,
        d.phase_z_deg,
        d.amplitude_z,
        d.y_abs,
        d.phase_y_deg,
        d.r_s,
        d.x_s,
        d.g_p,
        d.b_p,
        d.c_s,
        d.c_p,
        d.l_s,
        d.l_p,
        d.r_p,
        d.q,
        d.d,
    ]
}

/// Write measurement results to the output directory.
pub fn write_results(results: &SweepResults, output_dir: &Path, format: OutputFormat) -> Result<()> {
    // Per-parameter data files, one value per line.
    for (column, name) in DATA_FILE_NAMES.iter().enumerate() {
        let path = output_dir.join(name);
        let mut f = std::fs::File::create(&path)?;
        for point in &results.points {
            writeln!(f, "{:.5}", row_values(point)[column])?;
        }
        tracing::debug!("Wrote {:?}", path);
    }
    tracing::info!(
        "Wrote {} per-parameter data files to {:?}",
        DATA_FILE_NAMES.len(),
        output_dir
    );

    // Combined table in the requested format.
    match format {
        OutputFormat::Text => {
            let table_path = output_dir.join("results.txt");
            let mut f = std::fs::File::create(&table_path)?;
            writeln!(f, "{}", COLUMN_LABELS.join("    "))?;
            for point in &results.points {
                writeln!(f, "{}", format_row(point))?;
            }
            tracing::info!("Wrote results table to {:?}", table_path);
        }
        OutputFormat::Json => {
            let json_path = output_dir.join("results.json");
            let mut f = std::fs::File::create(&json_path)?;
            let json = serde_json::json!({
                "calibration": results.calibration,
                "points": results.points,
            });
            writeln!(f, "{}", serde_json::to_string_pretty(&json)?)?;
            tracing::info!("Wrote results to {:?}", json_path);
        }
        OutputFormat::Csv => {
            let csv_path = output_dir.join("results.csv");
            let mut f = std::fs::File::create(&csv_path)?;
            writeln!(f, "{}", COLUMN_LABELS.join(","))?;
            for point in &results.points {
                let cells: Vec<String> = row_values(point)
                    .iter()
                    .map(|v| v.to_string())
                    .collect();
                writeln!(f, "{}", cells.join(","))?;
            }
            tracing::info!("Wrote results to {:?}", csv_path);
        }
    }

    // Write summary
    let summary_path = output_dir.join("summary.txt");
    let mut f = std::fs::File::create(&summary_path)?;

    writeln!(f, "LCR Measurement Summary")?;
    writeln!(f, "=======================")?;
    writeln!(f)?;
    writeln!(f, "Steps:        {}", results.points.len())?;
    if let (Some(first), Some(last)) = (results.points.first(), results.points.last()) {
        writeln!(
            f,
            "Frequency:    {:.2} Hz to {:.2} Hz",
            first.frequency.0, last.frequency.0
        )?;
    }
    writeln!(f, "Compensation: {:?}", results.calibration)?;

    let non_finite = results
        .points
        .iter()
        .filter(|p| !p.derived.all_finite())
        .count();
    if non_finite > 0 {
        writeln!(f)?;
        writeln!(
            f,
            "{} of {} rows contain non-finite derived values",
            non_finite,
            results.points.len()
        )?;
    }

    tracing::info!("Wrote summary to {:?}", summary_path);

    Ok(())
}

/// Print the measurement table to stdout.
pub fn print_results(results: &SweepResults) {
    println!("\n=== Measurement Results ===\n");
    println!("{}", COLUMN_LABELS.join("    "));
    for point in &results.points {
        println!("{}", format_row(point));
    }
    println!();
}

/// One table row: frequency to hundredths, everything else to five decimal
/// places, four-space separated. Non-finite values print as-is rather
/// than being clamped.
fn format_row(point: &ResultPoint) -> String {
    let values = row_values(point);
    let mut row = format!(" {:.2}", values[0]);
    for v in &values[1..] {
        row.push_str(&format!("    {:.5}", v));
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_types::sweep::CalibMode;
    use lib_types::units::Hertz;
    use lib_types::Complex64;

    fn sample_results() -> SweepResults {
        let points = vec![
            ResultPoint::new(Hertz(1000.0), Complex64::new(100.0, -50.0)),
            ResultPoint::new(Hertz(2000.0), Complex64::new(90.0, -25.0)),
        ];
        SweepResults {
            calibration: CalibMode::None,
            points,
        }
    }

    #[test]
    fn test_writes_all_data_files() {
        let dir = tempfile::tempdir().unwrap();
        write_results(&sample_results(), dir.path(), OutputFormat::Text).unwrap();

        for name in DATA_FILE_NAMES {
            let content = std::fs::read_to_string(dir.path().join(name)).unwrap();
            assert_eq!(content.lines().count(), 2, "{name}");
        }
        let freq = std::fs::read_to_string(dir.path().join("data_frequency")).unwrap();
        assert_eq!(freq.lines().next().unwrap(), "1000.00000");
        let r_s = std::fs::read_to_string(dir.path().join("data_R_s")).unwrap();
        assert_eq!(r_s.lines().next().unwrap(), "100.00000");
        let x_s = std::fs::read_to_string(dir.path().join("data_X_s")).unwrap();
        assert_eq!(x_s.lines().next().unwrap(), "-50.00000");
    }

    #[test]
    fn test_json_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        write_results(&sample_results(), dir.path(), OutputFormat::Json).unwrap();

        let content = std::fs::read_to_string(dir.path().join("results.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["points"].as_array().unwrap().len(), 2);
        assert_eq!(value["calibration"], "none");
    }

    #[test]
    fn test_csv_has_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        write_results(&sample_results(), dir.path(), OutputFormat::Csv).unwrap();

        let content = std::fs::read_to_string(dir.path().join("results.csv")).unwrap();
        let mut lines = content.lines();
        assert!(lines.next().unwrap().starts_with("frequency_hz,"));
        assert_eq!(lines.count(), 2);
    }

    #[test]
    fn test_row_format_matches_instrument_layout() {
        let results = sample_results();
        let row = format_row(&results.points[0]);
        assert!(row.starts_with(" 1000.00    "));
        assert_eq!(row.split_whitespace().count(), 16);
    }
}
