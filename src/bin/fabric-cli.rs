use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use traefik_fabric::cluster::{CallContext, RestClusterClient};
use traefik_fabric::config::ClusterConfig;
use traefik_fabric::provider::generate;

#[derive(Parser)]
#[command(name = "fabric-cli")]
#[command(about = "Management CLI for the Service Fabric Traefik provider", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Yaml,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk a cluster once and print the generated document
    Render {
        #[arg(long, default_value = "http://localhost:19080/")]
        cluster: String,

        #[arg(long, value_enum, default_value = "yaml")]
        format: Format,

        #[arg(long, default_value_t = 5)]
        timeout_secs: u64,
    },
    /// Print poll statistics from a running provider
    Status {
        #[arg(short, long, default_value = "http://localhost:8080")]
        url: String,

        #[arg(short, long)]
        key: String,
    },
    /// Print the document a running provider serves
    Config {
        #[arg(short, long, default_value = "http://localhost:8080")]
        url: String,

        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            cluster,
            format,
            timeout_secs,
        } => render(cluster, format, timeout_secs).await?,
        Commands::Status { url, key } => {
            let mut headers = HeaderMap::new();
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", key))?,
            );
            let res = reqwest::Client::new()
                .get(format!("{}/admin/status", url.trim_end_matches('/')))
                .headers(headers)
                .send()
                .await?;
            print_json(res).await?;
        }
        Commands::Config { url, json } => {
            let path = if json { "config.json" } else { "config" };
            let res = reqwest::get(format!("{}/{}", url.trim_end_matches('/'), path)).await?;
            let status = res.status();
            let body = res.text().await?;
            if status.is_success() {
                print!("{}", body);
            } else {
                eprintln!("Error: provider returned status {}", status);
                eprintln!("Response: {}", body);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

async fn render(
    cluster: String,
    format: Format,
    timeout_secs: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = ClusterConfig {
        endpoint: cluster,
        timeout_secs,
        ..ClusterConfig::default()
    };
    let client = RestClusterClient::new(&config)?;
    let ctx = CallContext::new(CancellationToken::new(), Duration::from_secs(timeout_secs));

    let (document, report) = generate(&client, ctx).await?;
    eprintln!(
        "{} applications, {} services ({} enabled, {} failed)",
        report.applications, report.services, report.services_enabled, report.services_failed
    );

    match format {
        Format::Yaml => print!("{}", document.to_yaml()?),
        Format::Json => println!("{}", document.to_json()?),
    }
    Ok(())
}

async fn print_json(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_render_defaults() {
        let cli = Cli::try_parse_from(["fabric-cli", "render"]).unwrap();
        match cli.command {
            Commands::Render {
                cluster,
                format,
                timeout_secs,
            } => {
                assert_eq!(cluster, "http://localhost:19080/");
                assert!(matches!(format, Format::Yaml));
                assert_eq!(timeout_secs, 5);
            }
            _ => panic!("expected render"),
        }
    }

    #[test]
    fn test_status_requires_key() {
        assert!(Cli::try_parse_from(["fabric-cli", "status"]).is_err());

        let cli = Cli::try_parse_from(["fabric-cli", "status", "-k", "secret", "-u", "http://admin:9000"])
            .unwrap();
        match cli.command {
            Commands::Status { url, key } => {
                assert_eq!(url, "http://admin:9000");
                assert_eq!(key, "secret");
            }
            _ => panic!("expected status"),
        }
    }

    #[test]
    fn test_config_json_flag() {
        let cli = Cli::try_parse_from(["fabric-cli", "config", "--json"]).unwrap();
        assert!(matches!(cli.command, Commands::Config { json: true, .. }));
    }
}
