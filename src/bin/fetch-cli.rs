use std::path::PathBuf;

use clap::Parser;
use fetch_middleware::config::{load_config, FetchConfig};
use fetch_middleware::http::headers::header_map;
use fetch_middleware::http::{FetchRequest, FetchStack, HttpFetch, RequestInit};
use fetch_middleware::observability::init_logging;
use serde_json::json;
use tower::ServiceExt;

#[derive(Parser)]
#[command(name = "fetch-cli")]
#[command(about = "Perform one HTTP request through the decorated fetch stack", long_about = None)]
struct Cli {
    /// URL to fetch
    url: String,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// Extra request header, as "Name: value" (repeatable)
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Request body
    #[arg(short, long)]
    data: Option<String>,

    /// Print a JSON summary instead of the raw response
    #[arg(long)]
    json: bool,
}

fn split_header(line: &str) -> Result<(&str, &str), String> {
    line.split_once(':')
        .map(|(name, value)| (name.trim(), value.trim()))
        .ok_or_else(|| format!("header {line:?} is not in \"Name: value\" form"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => FetchConfig::default(),
    };
    init_logging(&config.logging)?;

    let pairs = cli
        .headers
        .iter()
        .map(|line| split_header(line))
        .collect::<Result<Vec<_>, _>>()?;
    let init = RequestInit {
        method: Some(cli.method.to_uppercase().parse()?),
        headers: Some(header_map(pairs)?),
        body: cli.data.map(Into::into),
    };

    let fetch = HttpFetch::from_config(&config.client)?;
    let service = FetchStack::from_config(&config, fetch)?;

    let response = service
        .oneshot(FetchRequest::with_init(cli.url, init))
        .await?;
    print_response(response, cli.json).await
}

async fn print_response(res: reqwest::Response, as_json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let headers: serde_json::Map<String, serde_json::Value> = res
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.to_string(),
                json!(String::from_utf8_lossy(value.as_bytes())),
            )
        })
        .collect();
    let body = res.text().await?;

    if as_json {
        let summary = json!({
            "status": status.as_u16(),
            "headers": headers,
            "body": body,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", status);
        for (name, value) in &headers {
            println!("{}: {}", name, value.as_str().unwrap_or_default());
        }
        println!();
        println!("{}", body);
    }

    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
    }
    Ok(())
}
