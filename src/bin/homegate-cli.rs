use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};
use std::path::PathBuf;

use homegate::config::schema::DEFAULT_RUNTIME_PATH;
use homegate::lifecycle::runtime_files::{read_address, MANAGEMENT_URL_FILENAME};

#[derive(Parser)]
#[command(name = "homegate-cli")]
#[command(about = "Management CLI for the homegate gateway", long_about = None)]
struct Cli {
    /// Control-plane URL. Read from the runtime directory when omitted.
    #[arg(short, long)]
    url: Option<String>,

    /// Runtime directory holding management.url
    #[arg(short, long, default_value = DEFAULT_RUNTIME_PATH)]
    runtime_path: PathBuf,

    /// Bearer token for non-loopback access
    #[arg(short, long)]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the control plane is alive
    Ping,
    /// List registered routes
    Routes,
    /// Register or overwrite a route
    AddRoute {
        /// Path prefix, e.g. /v1/apps
        path: String,
        /// Backend base URL, e.g. http://127.0.0.1:4000
        target: String,
    },
    /// Show the data-plane port
    Port,
    /// Move the data plane to another port
    SetPort { port: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let base = match cli.url {
        Some(url) => url,
        None => read_address(&cli.runtime_path, MANAGEMENT_URL_FILENAME)?,
    };

    let mut headers = HeaderMap::new();
    if let Some(key) = &cli.key {
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {key}"))?);
    }

    let res = match cli.command {
        Commands::Ping => client.get(format!("{base}/ping")).send().await?,
        Commands::Routes => client.get(format!("{base}/v1/gateway/routes")).send().await?,
        Commands::AddRoute { path, target } => {
            client
                .post(format!("{base}/v1/gateway/routes"))
                .headers(headers)
                .json(&json!({ "path": path, "target": target }))
                .send()
                .await?
        }
        Commands::Port => client.get(format!("{base}/v1/gateway/port")).send().await?,
        Commands::SetPort { port } => {
            client
                .put(format!("{base}/v1/gateway/port"))
                .headers(headers)
                .json(&json!({ "port": port }))
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    if !status.is_success() {
        eprintln!("Error: control plane returned status {}", status);
        if !text.is_empty() {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
