//! Service status and model introspection commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, FeatureList, HealthResponse, ModelInfo};
use crate::output::{
    color_status, format_metric, print_heading, print_json, print_success, print_table,
    print_warning, OutputFormat,
};

/// Row for the feature importance table
#[derive(Tabled)]
struct FeatureRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Feature")]
    name: String,
    #[tabled(rename = "Type")]
    data_type: String,
    #[tabled(rename = "Importance")]
    importance: String,
    #[tabled(rename = "Share")]
    share: String,
}

/// Row for the training metrics table
#[derive(Tabled)]
struct MetricsRow {
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "ROC AUC")]
    roc_auc: String,
    #[tabled(rename = "Precision")]
    precision: String,
    #[tabled(rename = "Recall")]
    recall: String,
    #[tabled(rename = "F1")]
    f1_score: String,
}

/// Show service health
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health: HealthResponse = client.get("health").await?;

    match format {
        OutputFormat::Json => print_json(&health)?,
        OutputFormat::Table => {
            print_heading("Service Health", 50);
            println!("Endpoint:      {}", client.base_url().as_str().cyan());
            println!("Status:        {}", color_status(&health.status));
            println!("Version:       {}", health.version);
            println!("Checked:       {}", health.timestamp.format("%Y-%m-%d %H:%M:%S UTC"));
            println!();

            match (&health.model_version, health.model_loaded) {
                (Some(version), true) => print_success(&format!("Model bundle {} loaded", version)),
                _ => print_warning("No model bundle loaded"),
            }

            if !health.components.is_empty() {
                println!();
                let mut names: Vec<&String> = health.components.keys().collect();
                names.sort();
                for name in names {
                    let component = &health.components[name];
                    match &component.message {
                        Some(message) => println!(
                            "  {:<12} {} ({})",
                            name,
                            color_status(&component.status),
                            message
                        ),
                        None => println!("  {:<12} {}", name, color_status(&component.status)),
                    }
                }
            }
        }
    }

    Ok(())
}

/// Show model metadata and training metrics
pub async fn show_model_info(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let info: ModelInfo = client.get("model_info").await?;

    match format {
        OutputFormat::Json => print_json(&info)?,
        OutputFormat::Table => {
            print_heading("Model Information", 50);
            println!("Bundle Version:   {}", info.version.cyan());
            println!("Primary Model:    {} ({} trees)", info.model_type, info.n_trees);
            println!("Fallback Model:   {}", info.fallback_model_type);
            println!("Features:         {}", info.features_count);
            println!();

            println!("{}", "Training Metrics".bold());
            let metrics = &info.training_metrics;
            print_table(vec![
                MetricsRow {
                    model: "primary".to_string(),
                    roc_auc: format_metric(metrics.primary.roc_auc),
                    precision: format_metric(metrics.primary.precision),
                    recall: format_metric(metrics.primary.recall),
                    f1_score: format_metric(metrics.primary.f1_score),
                },
                MetricsRow {
                    model: "fallback".to_string(),
                    roc_auc: format_metric(metrics.fallback.roc_auc),
                    precision: format_metric(metrics.fallback.precision),
                    recall: format_metric(metrics.fallback.recall),
                    f1_score: format_metric(metrics.fallback.f1_score),
                },
            ]);
        }
    }

    Ok(())
}

/// Show features ranked by importance
pub async fn show_features(
    client: &ApiClient,
    top: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let path = match top {
        Some(n) => format!("features?top={}", n),
        None => "features".to_string(),
    };
    let list: FeatureList = client.get(&path).await?;

    match format {
        OutputFormat::Json => print_json(&list)?,
        OutputFormat::Table => {
            let rows: Vec<FeatureRow> = list
                .features
                .iter()
                .enumerate()
                .map(|(i, f)| FeatureRow {
                    rank: i + 1,
                    name: f.name.clone(),
                    data_type: f.data_type.clone(),
                    importance: format!("{:.4}", f.importance),
                    share: format!("{:.2}%", f.importance_percent),
                })
                .collect();
            let shown = rows.len();

            print_table(rows);
            println!("\nShowing {} of {} features", shown, list.feature_count);
        }
    }

    Ok(())
}
