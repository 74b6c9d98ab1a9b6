use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde_json::json;

use status_mirror::security::signature::{sign, SIGNATURE_HEADER};

#[derive(Parser)]
#[command(name = "status-mirror-cli")]
#[command(about = "Operator tools for the status mirror webhook", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the X-Hub-Signature-256 value for a payload
    Sign {
        #[arg(short, long)]
        secret: String,

        #[command(flatten)]
        payload: Payload,
    },
    /// Post a signed push event to a running mirror
    Deliver {
        #[arg(short, long, default_value = "http://localhost:8080/webhook")]
        url: String,

        #[arg(short, long)]
        secret: String,

        /// Branch named in the generated push event
        #[arg(short, long, default_value = "main", conflicts_with = "file")]
        branch: String,

        /// Send this file as the payload instead of a generated event
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct Payload {
    /// Read the payload from a file
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Use this text as the payload
    #[arg(short, long)]
    body: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Sign { secret, payload } => {
            let body = match (payload.file, payload.body) {
                (Some(path), _) => tokio::fs::read(path).await?,
                (None, Some(text)) => text.into_bytes(),
                (None, None) => Vec::new(),
            };
            println!("{}", sign(secret.as_bytes(), &body));
        }
        Commands::Deliver {
            url,
            secret,
            branch,
            file,
        } => {
            let body = match file {
                Some(path) => tokio::fs::read(path).await?,
                None => serde_json::to_vec(&json!({ "ref": format!("refs/heads/{branch}") }))?,
            };
            let signature = HeaderValue::from_str(&sign(secret.as_bytes(), &body))?;

            let res = reqwest::Client::new()
                .post(&url)
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .header(SIGNATURE_HEADER, signature)
                .body(body)
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if status.is_success() {
        println!("{status}: {text}");
    } else {
        eprintln!("Error: webhook returned status {status}");
        eprintln!("Response: {text}");
    }
    Ok(())
}
