use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "guard-cli")]
#[command(about = "Operator CLI for service-guard circuit breakers", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    /// Admin API key, sent as a bearer token
    #[arg(short, long, env = "SERVICE_GUARD_API_KEY")]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show every breaker and the health summary
    Status,
    /// Show a single breaker
    Show { name: String },
    /// Reset a breaker to closed
    Reset { name: String },
    /// Reset every breaker
    ResetAll,
    /// Force a breaker open
    ForceOpen {
        name: String,
        #[arg(short, long)]
        reason: Option<String>,
    },
    /// Force a breaker into half-open
    ForceHalfOpen { name: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let mut headers = HeaderMap::new();
    if let Some(key) = &cli.key {
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {key}"))?);
    }

    let request = match &cli.command {
        Commands::Status => client.get(format!("{base}/circuit-breakers/status")),
        Commands::Show { name } => client.get(format!("{base}/circuit-breakers/{name}")),
        Commands::Reset { name } => client.post(format!("{base}/circuit-breakers/{name}/reset")),
        Commands::ResetAll => client.post(format!("{base}/circuit-breakers/reset-all")),
        Commands::ForceOpen { name, reason } => {
            let req = client.post(format!("{base}/circuit-breakers/{name}/force-open"));
            match reason {
                Some(reason) => req.json(&serde_json::json!({ "reason": reason })),
                None => req,
            }
        }
        Commands::ForceHalfOpen { name } => {
            client.post(format!("{base}/circuit-breakers/{name}/force-half-open"))
        }
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: admin API returned status {status}");
        if let Ok(text) = res.text().await {
            eprintln!("Response: {text}");
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
