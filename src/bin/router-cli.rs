use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "router-cli")]
#[command(about = "Management CLI for the dispatch router", long_about = None)]
struct Cli {
    /// Admin API base URL
    #[arg(short, long, default_value = "http://localhost:30002")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version and serving generation
    Status,
    /// List stored routes
    Routes,
    /// List stored redirects
    Redirects,
    /// Add or replace a route
    AddRoute {
        path: String,
        /// Upstream URL, e.g. http://localhost:30001
        host: String,
    },
    /// Add or replace a redirect
    AddRedirect {
        path: String,
        destination: String,
        /// "perm" for 308, anything else for 307
        #[arg(long, default_value = "temp")]
        kind: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let res = match cli.command {
        Commands::Status => client.get(format!("{}/status", cli.url)).send().await?,
        Commands::Routes => client.get(format!("{}/routes", cli.url)).send().await?,
        Commands::Redirects => client.get(format!("{}/redirects", cli.url)).send().await?,
        Commands::AddRoute { path, host } => {
            client
                .post(format!("{}/routes", cli.url))
                .json(&json!([{ "path": path, "host": host }]))
                .send()
                .await?
        }
        Commands::AddRedirect {
            path,
            destination,
            kind,
        } => {
            client
                .post(format!("{}/redirects", cli.url))
                .json(&json!([{ "path": path, "redirect": destination, "type": kind }]))
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let text = res.text().await?;
    if text.is_empty() {
        println!("{}", status);
        return Ok(());
    }

    let json: Value = serde_json::from_str(&text)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
