use std::process::ExitCode;

use clap::{Parser, Subcommand};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde_json::Value;

use signed_proxy::signature::{unix_now, Signer};

/// Characters escaped when a file path is placed in a URL.
const PATH_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

#[derive(Parser)]
#[command(name = "proxy-cli")]
#[command(about = "Operator CLI for the signed-URL download proxy", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mint a sign token (or a full signed URL) for a path
    Sign {
        #[arg(long)]
        secret: String,
        /// Decoded file path, e.g. "/photos/cat.jpg"
        #[arg(long)]
        path: String,
        /// Lifetime from now, in seconds
        #[arg(long, default_value_t = 3600, conflicts_with = "expires_at")]
        ttl_secs: u64,
        /// Absolute expiry (Unix seconds)
        #[arg(long)]
        expires_at: Option<u64>,
        /// Public proxy address; prints a complete URL when given
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Check a sign token against a path
    Verify {
        #[arg(long)]
        secret: String,
        #[arg(long)]
        path: String,
        #[arg(long)]
        token: String,
    },
    /// Show the proxy's health summary
    Health {
        #[arg(short, long, default_value = "http://localhost:8080")]
        url: String,
    },
    /// Show the proxy's performance report
    Metrics {
        #[arg(short, long, default_value = "http://localhost:8080")]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Sign {
            secret,
            path,
            ttl_secs,
            expires_at,
            base_url,
        } => {
            let expiry = expires_at.unwrap_or_else(|| unix_now() + ttl_secs);
            let token = Signer::new(&secret).sign(&path, expiry);
            let query = url::form_urlencoded::Serializer::new(String::new())
                .append_pair("sign", &token)
                .finish();

            match base_url {
                Some(base) => println!(
                    "{}{}?{}",
                    base.trim_end_matches('/'),
                    utf8_percent_encode(&path, PATH_ESCAPE),
                    query
                ),
                None => println!("{query}"),
            }
        }
        Commands::Verify {
            secret,
            path,
            token,
        } => {
            if let Err(e) = Signer::new(&secret).verify(&path, &token) {
                eprintln!("Invalid: {e}");
                return Ok(ExitCode::FAILURE);
            }
            println!("Valid");
        }
        Commands::Health { url } => {
            let res = reqwest::get(format!("{}/_/health", url.trim_end_matches('/'))).await?;
            print_response(res).await?;
        }
        Commands::Metrics { url } => {
            let res = reqwest::get(format!("{}/_/metrics", url.trim_end_matches('/'))).await?;
            print_response(res).await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let json: Value = res.json().await?;
    if !status.is_success() {
        eprintln!("Proxy returned status {status}");
    }
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
