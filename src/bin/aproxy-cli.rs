use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "aproxy-cli")]
#[command(about = "Management CLI for the aproxy manager", long_about = None)]
struct Cli {
    #[arg(short, long, env = "APROXY_URL", default_value = "http://127.0.0.1:9607")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List proxies with their live status
    List,
    /// Create and start a proxy
    Add {
        #[arg(long)]
        address: String,
        #[arg(long)]
        port: u16,
        #[arg(long)]
        threads: Option<u16>,
        /// Peer as host:port (repeatable)
        #[arg(long = "backend", value_parser = parse_backend)]
        backends: Vec<Value>,
        /// Rewrite rule as order:src:dst (repeatable)
        #[arg(long = "location", value_parser = parse_location)]
        locations: Vec<Value>,
    },
    /// Stop and delete a proxy
    Delete(Target),
    /// Manage rewrite rules of a proxy
    #[command(subcommand)]
    Location(LocationCommand),
    /// Manage peers of a proxy
    #[command(subcommand)]
    Backend(BackendCommand),
}

#[derive(Args)]
struct Target {
    #[arg(long)]
    id: String,
    #[arg(long)]
    address: String,
    #[arg(long)]
    port: u16,
}

impl Target {
    fn body(&self) -> Value {
        json!({ "id": self.id, "address": self.address, "port": self.port })
    }
}

#[derive(Subcommand)]
enum LocationCommand {
    Add {
        #[command(flatten)]
        target: Target,
        /// order:src:dst
        #[arg(value_parser = parse_location)]
        location: Value,
    },
    Delete {
        #[command(flatten)]
        target: Target,
        /// order:src:dst (order is ignored)
        #[arg(value_parser = parse_location)]
        location: Value,
    },
}

#[derive(Subcommand)]
enum BackendCommand {
    Add {
        #[command(flatten)]
        target: Target,
        /// host:port
        #[arg(value_parser = parse_backend)]
        backend: Value,
    },
    Delete {
        #[command(flatten)]
        target: Target,
        /// host:port
        #[arg(value_parser = parse_backend)]
        backend: Value,
    },
}

fn parse_backend(raw: &str) -> Result<Value, String> {
    let (host, port) = raw
        .rsplit_once(':')
        .ok_or_else(|| format!("expected host:port, got '{}'", raw))?;
    let port: u16 = port
        .parse()
        .map_err(|_| format!("invalid port in '{}'", raw))?;
    Ok(json!({ "host": host, "port": port }))
}

fn parse_location(raw: &str) -> Result<Value, String> {
    let mut parts = raw.splitn(3, ':');
    let (Some(order), Some(src), Some(dst)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("expected order:src:dst, got '{}'", raw));
    };
    let order: i32 = order
        .parse()
        .map_err(|_| format!("invalid order in '{}'", raw))?;
    Ok(json!({ "order": order, "src": src, "dst": dst }))
}

fn with_field(mut body: Value, field: &str, value: Value) -> Value {
    if let Some(map) = body.as_object_mut() {
        map.insert(field.to_string(), value);
    }
    body
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::List => client.get(format!("{}/aproxy/list", base)).send().await?,
        Commands::Add {
            address,
            port,
            threads,
            backends,
            locations,
        } => {
            let mut body = json!({
                "address": address,
                "port": port,
                "backends": backends,
                "locations": locations,
            });
            if let Some(threads) = threads {
                body = with_field(body, "threads", json!(threads));
            }
            client.post(format!("{}/aproxy/add", base)).json(&body).send().await?
        }
        Commands::Delete(target) => {
            client
                .post(format!("{}/aproxy/delete", base))
                .json(&target.body())
                .send()
                .await?
        }
        Commands::Location(command) => {
            let (path, target, location) = match command {
                LocationCommand::Add { target, location } => ("add", target, location),
                LocationCommand::Delete { target, location } => ("delete", target, location),
            };
            client
                .post(format!("{}/aproxy/location/{}", base, path))
                .json(&with_field(target.body(), "location", location))
                .send()
                .await?
        }
        Commands::Backend(command) => {
            let (path, target, backend) = match command {
                BackendCommand::Add { target, backend } => ("add", target, backend),
                BackendCommand::Delete { target, backend } => ("delete", target, backend),
            };
            client
                .post(format!("{}/aproxy/backend/{}", base, path))
                .json(&with_field(target.body(), "backend", backend))
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
        eprintln!("Error: manager returned status {}", status);
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
