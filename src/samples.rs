//! The position sample store: date-partitioned CSV files, append-only.

use anyhow::{Context, Result};
use csv::WriterBuilder;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::types::PositionSample;

/// Path of the sample file for one service date.
pub fn sample_file_path(dir: &str, date: chrono::NaiveDate) -> PathBuf {
    Path::new(dir).join(format!("date={}.csv", date.format("%Y-%m-%d")))
}

/// Appends samples to a CSV file, writing headers only on creation.
pub fn append_samples(path: &Path, samples: &[PositionSample]) -> Result<()> {
    if samples.is_empty() {
        return Ok(());
    }

    let file_exists = path.exists();
    debug!(path = %path.display(), file_exists, count = samples.len(), "Appending samples");

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    for sample in samples {
        writer.serialize(sample)?;
    }
    writer.flush()?;

    Ok(())
}

/// Loads every `date=*.csv` sample file in a directory.
///
/// A malformed row fails the whole load; the store is append-only and a
/// bad row means the file was corrupted, not that one sample was noisy.
pub fn load_samples(dir: &str) -> Result<Vec<PositionSample>> {
    let mut samples = Vec::new();

    for entry in fs::read_dir(dir).with_context(|| format!("reading sample dir {dir}"))? {
        let entry = entry?;
        let path = entry.path();

        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.starts_with("date=") || path.extension().and_then(|e| e.to_str()) != Some("csv") {
            continue;
        }

        let file = File::open(&path)?;
        let mut rdr = csv::Reader::from_reader(file);
        for result in rdr.deserialize() {
            let sample: PositionSample =
                result.with_context(|| format!("parsing {}", path.display()))?;
            samples.push(sample);
        }
    }

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::env;

    fn temp_dir(name: &str) -> String {
        let dir = format!("{}/{}", env::temp_dir().display(), name);
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn sample() -> PositionSample {
        PositionSample {
            trip_id: "101".to_string(),
            stop_id: "70011".to_string(),
            latitude: 37.44,
            longitude: -122.16,
            observed_at: NaiveDate::from_ymd_opt(2024, 3, 4)
                .unwrap()
                .and_hms_opt(8, 41, 0)
                .unwrap(),
        }
    }

    #[test]
    fn test_append_then_load_round_trip() {
        let dir = temp_dir("railtime_samples_roundtrip");
        let path = sample_file_path(&dir, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());

        append_samples(&path, &[sample()]).unwrap();
        append_samples(&path, &[sample()]).unwrap();

        let loaded = load_samples(&dir).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0], sample());

        // Header must appear exactly once across appends.
        let content = fs::read_to_string(&path).unwrap();
        let header_count = content.lines().filter(|l| l.contains("trip_id")).count();
        assert_eq!(header_count, 1);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_ignores_unrelated_files() {
        let dir = temp_dir("railtime_samples_unrelated");
        fs::write(Path::new(&dir).join("notes.txt"), "not a sample file").unwrap();

        let loaded = load_samples(&dir).unwrap();
        assert!(loaded.is_empty());

        fs::remove_dir_all(&dir).unwrap();
    }
}
