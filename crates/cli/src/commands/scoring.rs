//! Single and batch scoring commands

use anyhow::{bail, Context, Result};
use colored::Colorize;
use serde_json::{json, Map, Value};
use std::path::Path;
use tabled::Tabled;

use crate::client::{ApiClient, BatchRecord, BatchResponse, Prediction};
use crate::output::{
    color_flag, color_risk, format_customer_id, format_probability, print_heading, print_info,
    print_json, print_table, print_warning, OutputFormat,
};

/// Row for batch results
#[derive(Tabled)]
struct BatchRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Customer")]
    customer_id: String,
    #[tabled(rename = "Probability")]
    probability: String,
    #[tabled(rename = "Risk")]
    risk_level: String,
    #[tabled(rename = "Result")]
    result: String,
    #[tabled(rename = "Model")]
    model: String,
}

fn read_json_file(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn apply_options(body: &mut Map<String, Value>, model: Option<&str>, threshold: Option<f64>) {
    if let Some(model) = model {
        body.insert("model".to_string(), json!(model));
    }
    if let Some(threshold) = threshold {
        body.insert("threshold".to_string(), json!(threshold));
    }
}

/// Role name the server reports for a requested model or one of its aliases
fn model_role(requested: &str) -> Option<&'static str> {
    match requested.trim().to_ascii_lowercase().as_str() {
        "primary" | "random_forest" => Some("primary"),
        "fallback" | "logistic_regression" => Some("fallback"),
        _ => None,
    }
}

/// Build a predict body from a record file.
///
/// The file holds one object, either flat (`customer_id` next to the
/// features) or with the features nested under `features`.
pub fn predict_body(record: Value, model: Option<&str>, threshold: Option<f64>) -> Result<Value> {
    let Value::Object(mut body) = record else {
        bail!("Record file must contain a JSON object");
    };
    apply_options(&mut body, model, threshold);
    Ok(Value::Object(body))
}

/// Build a batch body from a records file.
///
/// Accepts a bare array of records or an object with a `records` array.
pub fn batch_body(records: Value, model: Option<&str>, threshold: Option<f64>) -> Result<Value> {
    let mut body = match records {
        Value::Array(records) => {
            let mut body = Map::new();
            body.insert("records".to_string(), Value::Array(records));
            body
        }
        Value::Object(body) if body.get("records").map_or(false, Value::is_array) => body,
        _ => bail!("Batch file must contain an array of records or an object with a 'records' array"),
    };
    apply_options(&mut body, model, threshold);
    Ok(Value::Object(body))
}

/// Score one record
pub async fn predict(
    client: &ApiClient,
    file: &Path,
    model: Option<&str>,
    threshold: Option<f64>,
    format: OutputFormat,
) -> Result<()> {
    let body = predict_body(read_json_file(file)?, model, threshold)?;
    let result: Prediction = client.post("predict", &body).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            print_heading("Theft Risk Assessment", 50);
            println!(
                "Customer:      {}",
                format_customer_id(result.customer_id.as_ref()).cyan()
            );
            println!("Probability:   {}", format_probability(result.probability));
            println!("Risk Level:    {}", color_risk(&result.risk_level));
            println!("Result:        {}", color_flag(result.prediction));
            println!("Model Used:    {}", result.model_used);
            if let Some(timestamp) = result.timestamp {
                println!("Scored At:     {}", timestamp.format("%Y-%m-%d %H:%M:%S UTC"));
            }
            if model.is_some_and(|m| model_role(m) != Some(result.model_used.as_str())) {
                println!();
                print_warning(&format!(
                    "Requested model was not used; scored by {}",
                    result.model_used
                ));
            }
        }
    }

    Ok(())
}

/// Score a file of records
pub async fn batch(
    client: &ApiClient,
    file: &Path,
    model: Option<&str>,
    threshold: Option<f64>,
    format: OutputFormat,
) -> Result<()> {
    let body = batch_body(read_json_file(file)?, model, threshold)?;
    let response: BatchResponse = client.post("predict_batch", &body).await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => {
            let rows: Vec<BatchRow> = response
                .records
                .iter()
                .enumerate()
                .map(|(i, record)| batch_row(i + 1, record))
                .collect();
            print_table(rows);

            let summary = &response.summary;
            println!();
            print_heading("Summary", 50);
            println!("Records:       {}", summary.total);
            println!("Flagged:       {}", summary.flagged.to_string().red().bold());
            println!("High Risk:     {}", summary.high_risk);
            println!("Model:         {}", summary.model);
            println!("Threshold:     {}", summary.threshold);
            if let Some(mean) = summary.mean_probability {
                println!("Mean Prob.:    {}", format_probability(mean));
            }
            println!(
                "Completed:     {}",
                summary.completed_at.format("%Y-%m-%d %H:%M:%S UTC")
            );

            if summary.failed > 0 {
                println!();
                print_warning(&format!("{} record(s) could not be scored", summary.failed));
            } else if summary.total > 0 {
                println!();
                print_info("All records scored");
            }
        }
    }

    Ok(())
}

fn batch_row(index: usize, record: &BatchRecord) -> BatchRow {
    match record {
        BatchRecord::Scored(p) => BatchRow {
            index,
            customer_id: format_customer_id(p.customer_id.as_ref()),
            probability: format_probability(p.probability),
            risk_level: color_risk(&p.risk_level),
            result: color_flag(p.prediction),
            model: p.model_used.clone(),
        },
        BatchRecord::Failed(e) => BatchRow {
            index,
            customer_id: format_customer_id(e.customer_id.as_ref()),
            probability: "-".to_string(),
            risk_level: "-".to_string(),
            result: match &e.feature {
                Some(feature) => format!("{}: {}", e.code, feature),
                None => e.code.clone(),
            }
            .red()
            .to_string(),
            model: "-".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_predict_body_merges_options() {
        let body = predict_body(
            json!({"customer_id": "C-1", "tamper_indicator": 1}),
            Some("fallback"),
            Some(0.4),
        )
        .unwrap();
        assert_eq!(body["model"], "fallback");
        assert_eq!(body["threshold"], 0.4);
        assert_eq!(body["tamper_indicator"], 1);
    }

    #[test]
    fn test_predict_body_keeps_file_options_without_flags() {
        let body = predict_body(json!({"customer_id": "C-1", "threshold": 0.6}), None, None).unwrap();
        assert_eq!(body["threshold"], 0.6);
        assert!(body.get("model").is_none());
    }

    #[test]
    fn test_predict_body_rejects_non_object() {
        assert!(predict_body(json!([1, 2]), None, None).is_err());
    }

    #[test]
    fn test_batch_body_from_array() {
        let body = batch_body(json!([{"customer_id": "A"}, {"customer_id": "B"}]), None, Some(0.7))
            .unwrap();
        assert_eq!(body["records"].as_array().unwrap().len(), 2);
        assert_eq!(body["threshold"], 0.7);
    }

    #[test]
    fn test_batch_body_from_object() {
        let body = batch_body(json!({"records": [], "model": "primary"}), None, None).unwrap();
        assert_eq!(body["model"], "primary");
        assert!(batch_body(json!({"rows": []}), None, None).is_err());
    }

    #[test]
    fn test_model_role_resolves_aliases() {
        assert_eq!(model_role("random_forest"), Some("primary"));
        assert_eq!(model_role("Logistic_Regression"), Some("fallback"));
        assert_eq!(model_role("primary"), Some("primary"));
        assert_eq!(model_role("xgboost"), None);
    }

    #[test]
    fn test_failed_row_without_feature() {
        let record: BatchRecord = serde_json::from_value(json!({
            "customer_id": "C-1",
            "error": "fallback model produced a non-finite score",
            "code": "NON_FINITE_SCORE"
        }))
        .unwrap();
        let row = batch_row(1, &record);
        assert!(row.result.contains("NON_FINITE_SCORE"));
        assert_eq!(row.probability, "-");
    }

    #[test]
    fn test_read_json_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("record.json");
        std::fs::write(&path, r#"{"customer_id": "C-9"}"#).unwrap();
        assert_eq!(read_json_file(&path).unwrap()["customer_id"], "C-9");

        assert!(read_json_file(&dir.path().join("missing.json")).is_err());
    }
}
