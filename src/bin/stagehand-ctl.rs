use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "stagehand-ctl")]
#[command(about = "Inspect a running stagehand application through its debug server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:15050")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show application phase and version
    Status,
    /// Dump published debug values
    Vars,
    /// Print Prometheus metrics
    Metrics,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Status => {
            let res = client.get(format!("{}/debug/status", base)).send().await?;
            print_json(res).await?;
        }
        Commands::Vars => {
            let res = client.get(format!("{}/debug/vars", base)).send().await?;
            print_json(res).await?;
        }
        Commands::Metrics => {
            let res = client.get(format!("{}/metrics", base)).send().await?;
            if check_status(&res) {
                print!("{}", res.text().await?);
            } else {
                print_failure(res).await;
            }
        }
    }

    Ok(())
}

fn check_status(res: &reqwest::Response) -> bool {
    res.status().is_success()
}

async fn print_failure(res: reqwest::Response) {
    eprintln!("Error: debug server returned status {}", res.status());
    if let Ok(text) = res.text().await {
        eprintln!("Response: {}", text);
    }
}

async fn print_json(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    if !check_status(&res) {
        print_failure(res).await;
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
