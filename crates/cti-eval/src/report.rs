//! Evaluation report output
//!
//! Writes the per-pair table as CSV and bundles per-pair and corpus scores
//! into a serializable report.

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cti_core::{CtiError, Result};

use crate::batch::PairReport;
use crate::metrics::{CorpusMetrics, ScoreRecord};

const CSV_HEADER: [&str; 9] = [
    "file",
    "precision",
    "recall",
    "f1",
    "exact_match",
    "extra_mention",
    "missing_gold",
    "partial_overlap",
    "type_mismatch",
];

/// Write one CSV row per pair; rates are percentages with two decimals
pub fn write_csv<W: Write>(writer: W, reports: &[PairReport]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(CSV_HEADER).map_err(report_error)?;

    for report in reports {
        let m = &report.metrics;
        csv.write_record([
            report.name.clone(),
            percent(m.precision()),
            percent(m.recall()),
            percent(m.f1_score()),
            m.exact_match.to_string(),
            m.extra_mention.to_string(),
            m.missing_gold.to_string(),
            m.partial_overlap.to_string(),
            m.type_mismatch.to_string(),
        ])
        .map_err(report_error)?;
    }

    csv.flush()
        .map_err(|e| CtiError::Report(format!("Failed to flush CSV output: {e}")))
}

/// Write the CSV table to a file
pub fn write_csv_file(path: impl AsRef<Path>, reports: &[PairReport]) -> Result<()> {
    let path = path.as_ref();
    let file = std::fs::File::create(path).map_err(|e| CtiError::io(path, e))?;
    write_csv(file, reports)
}

fn percent(rate: f64) -> String {
    format!("{:.2}%", rate * 100.0)
}

fn report_error(e: csv::Error) -> CtiError {
    CtiError::Report(format!("Failed to write CSV record: {e}"))
}

/// Named per-pair record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairRecord {
    pub file: String,
    #[serde(flatten)]
    pub scores: ScoreRecord<usize>,
}

/// Complete evaluation report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub generated_at: DateTime<Utc>,
    pub pairs: Vec<PairRecord>,
    pub corpus: ScoreRecord<f64>,
    pub num_documents: usize,
}

impl EvaluationReport {
    /// Build a report, failing with `EmptyBatch` when no pair was scored
    pub fn new(reports: &[PairReport]) -> Result<Self> {
        let corpus = CorpusMetrics::aggregate(reports.iter().map(|r| &r.metrics))?;

        Ok(Self {
            generated_at: Utc::now(),
            pairs: reports
                .iter()
                .map(|r| PairRecord {
                    file: r.name.clone(),
                    scores: r.metrics.record(),
                })
                .collect(),
            corpus: corpus.record(),
            num_documents: corpus.num_documents,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CtiError::Report(format!("Failed to serialize report: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::PairMetrics;

    fn reports() -> Vec<PairReport> {
        vec![
            PairReport {
                name: "2017-2-1.json".to_string(),
                metrics: PairMetrics {
                    exact_match: 1,
                    missing_gold: 1,
                    ..Default::default()
                },
            },
            PairReport {
                name: "2017-2-2.json".to_string(),
                metrics: PairMetrics {
                    exact_match: 1,
                    extra_mention: 1,
                    type_mismatch: 1,
                    ..Default::default()
                },
            },
        ]
    }

    #[test]
    fn test_write_csv() {
        let mut buffer = Vec::new();
        write_csv(&mut buffer, &reports()).unwrap();

        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "file,precision,recall,f1,exact_match,extra_mention,missing_gold,partial_overlap,type_mismatch"
        );
        assert_eq!(lines[1], "2017-2-1.json,100.00%,50.00%,66.67%,1,0,1,0,0");
        assert_eq!(lines[2], "2017-2-2.json,50.00%,100.00%,66.67%,1,1,0,0,1");
    }

    #[test]
    fn test_write_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("evaluation_report.csv");

        write_csv_file(&path, &reports()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("file,precision"));
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn test_evaluation_report() {
        let report = EvaluationReport::new(&reports()).unwrap();

        assert_eq!(report.num_documents, 2);
        assert!((report.corpus.precision - 0.75).abs() < 1e-9);
        assert!((report.corpus.recall - 0.75).abs() < 1e-9);

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["pairs"][0]["file"], "2017-2-1.json");
        assert_eq!(json["pairs"][0]["exact_match_count"], 1);
        assert!(json["generated_at"].is_string());
    }

    #[test]
    fn test_evaluation_report_empty() {
        assert!(matches!(
            EvaluationReport::new(&[]),
            Err(CtiError::EmptyBatch)
        ));
    }
}
