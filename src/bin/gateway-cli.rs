use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Map, Value};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Demo client for the secure AI gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    /// Bearer token from `login`
    #[arg(short, long)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway liveness
    Health,
    /// Exchange username and password for a token
    Login {
        #[arg(long, default_value = "demo")]
        username: String,
        #[arg(long, default_value = "password123")]
        password: String,
    },
    /// Send a prompt to the chat endpoint
    Chat {
        prompt: String,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        max_tokens: Option<u64>,
    },
    /// Classify a piece of text
    Analyze {
        text: String,
        #[arg(long)]
        model: Option<String>,
    },
    /// Show recent audit records (admin only)
    Audit {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(token) = &cli.token {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token))?,
        );
    }

    match cli.command {
        Commands::Health => {
            let res = client.get(format!("{}/health", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Login { username, password } => {
            let res = client
                .post(format!("{}/api/auth/login", cli.url))
                .json(&json!({ "username": username, "password": password }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Chat {
            prompt,
            model,
            max_tokens,
        } => {
            let mut body = Map::new();
            body.insert("prompt".into(), Value::from(prompt));
            if let Some(model) = model {
                body.insert("model".into(), Value::from(model));
            }
            if let Some(max_tokens) = max_tokens {
                body.insert("max_tokens".into(), Value::from(max_tokens));
            }
            let res = client
                .post(format!("{}/api/openai/chat", cli.url))
                .headers(headers)
                .json(&body)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Analyze { text, model } => {
            let mut body = Map::new();
            body.insert("text".into(), Value::from(text));
            if let Some(model) = model {
                body.insert("model".into(), Value::from(model));
            }
            let res = client
                .post(format!("{}/api/huggingface/analyze", cli.url))
                .headers(headers)
                .json(&body)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Audit { limit } => {
            let res = client
                .get(format!("{}/api/admin/audit?limit={}", cli.url, limit))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Some(retry) = res.headers().get("retry-after").and_then(|v| v.to_str().ok()) {
            eprintln!("Retry after: {}s", retry);
        }
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
