use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use reqwest::{multipart, Client, Response};
use serde_json::{json, Map, Value};
use soil_productivity::{
    config::{Config, ModelConfig},
    ml::{
        load_dataset, save_model, train_random_forest, ProductivityModel, RetrainOverrides,
        TrainingParams,
    },
};
use std::path::PathBuf;
use validator::Validate;

#[derive(Parser)]
#[command(name = "soil-cli")]
#[command(about = "Soil Productivity Prediction CLI", long_about = None)]
struct Cli {
    #[arg(short, long, env = "SOIL_API_URL", default_value = "http://localhost:5000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server health
    Health,

    /// Score a record given as a JSON file or as key=value pairs
    Predict {
        /// JSON file holding one record or an array of records
        #[arg(short, long, conflicts_with = "fields")]
        file: Option<PathBuf>,

        /// Measurements such as N=90 pH=6.5 "Soil Type=Loam"
        #[arg(value_name = "KEY=VALUE")]
        fields: Vec<String>,
    },

    /// Upload a CSV or Excel file for batch scoring
    Upload {
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },

    /// Show the loaded model
    Info,

    /// List the soil types the model knows
    SoilTypes,

    /// Retrain the served model
    Retrain {
        #[arg(long)]
        n_samples: Option<usize>,

        #[arg(long)]
        n_trees: Option<usize>,

        #[arg(long)]
        max_depth: Option<u16>,

        #[arg(long)]
        seed: Option<u64>,
    },

    /// Train a model locally and write the artifact
    Train {
        /// Artifact path, defaults to the configured model path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// CSV or Excel training data; synthetic data is used otherwise
        #[arg(short, long)]
        data: Option<PathBuf>,

        #[arg(long)]
        n_samples: Option<usize>,

        #[arg(long)]
        n_trees: Option<usize>,

        #[arg(long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = Client::new();

    match cli.command {
        Commands::Health => {
            let response = client
                .get(format!("{}/api/health", cli.url))
                .send()
                .await?;
            print_body(response).await?;
        }

        Commands::Predict { file, fields } => {
            let body = match file {
                Some(path) => {
                    let text = std::fs::read_to_string(&path)
                        .with_context(|| format!("reading {}", path.display()))?;
                    serde_json::from_str(&text)
                        .with_context(|| format!("parsing {}", path.display()))?
                }
                None => parse_fields(&fields)?,
            };

            let response = client
                .post(format!("{}/api/predict", cli.url))
                .json(&body)
                .send()
                .await?;
            print_body(response).await?;
        }

        Commands::Upload { path } => {
            let bytes = std::fs::read(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload.csv".to_string());

            let form = multipart::Form::new()
                .part("file", multipart::Part::bytes(bytes).file_name(file_name));

            let response = client
                .post(format!("{}/api/predict", cli.url))
                .multipart(form)
                .send()
                .await?;
            print_body(response).await?;
        }

        Commands::Info => {
            let response = client
                .get(format!("{}/api/model/info", cli.url))
                .send()
                .await?;
            print_body(response).await?;
        }

        Commands::SoilTypes => {
            let response = client
                .get(format!("{}/api/soil-types", cli.url))
                .send()
                .await?;
            print_body(response).await?;
        }

        Commands::Retrain {
            n_samples,
            n_trees,
            max_depth,
            seed,
        } => {
            let response = client
                .post(format!("{}/api/model/retrain", cli.url))
                .json(&json!({
                    "n_samples": n_samples,
                    "n_trees": n_trees,
                    "max_depth": max_depth,
                    "seed": seed,
                }))
                .send()
                .await?;
            print_body(response).await?;
        }

        Commands::Train {
            output,
            data,
            n_samples,
            n_trees,
            seed,
        } => {
            let config = Config::load().context("loading configuration")?;
            let params = training_params(
                &config.model,
                RetrainOverrides {
                    n_samples,
                    n_trees,
                    max_depth: None,
                    seed,
                },
            )?;

            let output = output.unwrap_or(config.model.path);
            let data = data.or(config.model.training_data_path);

            println!("Training random forest ({} trees)...", params.n_trees);
            let dataset = load_dataset(&params, data.as_deref())?;
            let model = train_random_forest(&dataset, &params)?;
            save_model(&model, &output)?;

            println!("Model written to {}", output.display());
            println!("{}", serde_json::to_string_pretty(model.metadata())?);
        }
    }

    Ok(())
}

/// Configured training parameters with command-line overrides applied,
/// checked against the same bounds the retrain endpoint enforces.
fn training_params(
    model: &ModelConfig,
    overrides: RetrainOverrides,
) -> anyhow::Result<TrainingParams> {
    let params = overrides.apply(model.training_params());
    params
        .validate()
        .context("invalid training parameters")?;
    Ok(params)
}

/// Turn `key=value` arguments into a JSON record. Values that parse as
/// numbers are sent as numbers.
fn parse_fields(fields: &[String]) -> anyhow::Result<Value> {
    if fields.is_empty() {
        bail!("provide --file or at least one KEY=VALUE pair");
    }

    let mut record = Map::new();
    for field in fields {
        let Some((key, value)) = field.split_once('=') else {
            bail!("expected KEY=VALUE, got '{}'", field);
        };
        let value = match value.trim().parse::<f64>() {
            Ok(number) => json!(number),
            Err(_) => json!(value),
        };
        record.insert(key.trim().to_string(), value);
    }

    Ok(Value::Object(record))
}

async fn print_body(response: Response) -> anyhow::Result<()> {
    let status = response.status();
    let body: Value = response.json().await?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    if !status.is_success() {
        bail!("request failed with status {}", status);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_training_params_apply_overrides() {
        let params = training_params(
            &ModelConfig::default(),
            RetrainOverrides {
                n_trees: Some(12),
                seed: Some(3),
                ..RetrainOverrides::default()
            },
        )
        .unwrap();

        assert_eq!(params.n_trees, 12);
        assert_eq!(params.seed, 3);
        assert_eq!(params.n_samples, ModelConfig::default().n_samples);
    }

    #[test]
    fn test_training_params_reject_zero_trees() {
        let err = training_params(
            &ModelConfig::default(),
            RetrainOverrides {
                n_trees: Some(0),
                ..RetrainOverrides::default()
            },
        )
        .unwrap_err();

        assert!(err.to_string().contains("invalid training parameters"));
    }

    #[test]
    fn test_training_params_reject_tiny_sample_count() {
        let result = training_params(
            &ModelConfig::default(),
            RetrainOverrides {
                n_samples: Some(3),
                ..RetrainOverrides::default()
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_fields_types_numbers() {
        let record = parse_fields(&["N=90".to_string(), "Soil Type=Loam".to_string()]).unwrap();
        assert_eq!(record["N"], json!(90.0));
        assert_eq!(record["Soil Type"], json!("Loam"));
        assert!(parse_fields(&["nitrogen".to_string()]).is_err());
        assert!(parse_fields(&[]).is_err());
    }
}
