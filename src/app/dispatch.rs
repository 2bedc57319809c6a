use anyhow::{Context, Result, bail};
use tracing::info;

use crate::cli::commands::{Cli, Commands, CookieCommands};
use onebot::config::cookies::{load_sites, login};
use onebot::{Config, InboundMessage, UrlInfo};

pub async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Resolve {
            message,
            target,
            sender,
        } => {
            let pipeline = UrlInfo::from_config(&config.urlinfo)?;
            let line = match target {
                Some(target) => {
                    pipeline
                        .on_message(&InboundMessage::new(sender, target, message))
                        .await
                }
                None => pipeline.resolve(&message).await,
            };
            if let Some(line) = line {
                println!("{line}");
            }
            Ok(())
        }

        Commands::Config => {
            let rendered = toml::to_string_pretty(&config.redacted())
                .context("Failed to serialize config")?;
            println!("# {}", config.config_path.display());
            print!("{rendered}");
            Ok(())
        }

        Commands::Cookies { cookie_command } => match cookie_command {
            CookieCommands::Login { sites, out } => {
                let Some(out) = out.or_else(|| config.urlinfo.cookie_file.clone()) else {
                    bail!("No cookie file: pass --out or set urlinfo.cookie_file");
                };
                let sites = load_sites(&sites)?;
                let store = login(
                    &sites,
                    &config.urlinfo.user_agent,
                    config.urlinfo.limits.api_timeout(),
                )
                .await?;
                store.save(&out)?;
                info!(path = %out.display(), cookies = store.cookies.len(), "cookie store written");
                Ok(())
            }
        },
    }
}
