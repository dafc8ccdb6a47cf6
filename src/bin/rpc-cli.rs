use clap::{Parser, Subcommand};
use reqwest::header::{HeaderValue, CONTENT_TYPE, HOST};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "rpc-cli")]
#[command(about = "Diagnostic client for the RPC gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8543")]
    url: String,

    /// Override the Host header, e.g. to test the virtual host whitelist
    #[arg(long)]
    host: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a bare GET liveness probe
    Health,
    /// Call a JSON-RPC method
    Call {
        method: String,
        /// Parameters as a JSON array
        #[arg(default_value = "[]")]
        params: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut request = match &cli.command {
        Commands::Health => client.get(&cli.url),
        Commands::Call { method, params } => {
            let params: Value = serde_json::from_str(params)?;
            let payload = json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": method,
                "params": params,
            });
            client
                .post(&cli.url)
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .body(serde_json::to_vec(&payload)?)
        }
    };
    if let Some(host) = &cli.host {
        request = request.header(HOST, HeaderValue::from_str(host)?);
    }

    let res = request.send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let text = res.text().await?;
    if text.is_empty() {
        println!("{} (empty body)", status);
        return Ok(());
    }
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
