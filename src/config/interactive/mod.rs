
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};

use super::{Config, SearchConfig};

#[inline]
pub fn run_interactive_config() -> Result<()> {
    eprintln!("{}", style("🔧 Paperchat Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config()?;

    eprintln!("{}", style("Ollama Configuration").bold().yellow());
    eprintln!("Configure your local Ollama instance for embeddings and answer generation.");
    eprintln!();

    configure_ollama(&mut config)?;

    eprintln!();
    eprintln!("{}", style("Web Search Configuration").bold().yellow());
    configure_search(&mut config.search)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_ollama_connection(&config)? {
        eprintln!("{}", style("✓ Ollama connection successful!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not connect to Ollama").yellow()
        );
        eprintln!("You can continue, but make sure Ollama is running before ingesting or chatting.");
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config() -> Result<()> {
    let config = Config::load_default().context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();
    eprint!("{}", format_config_summary(&config));
    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn format_config_summary(config: &Config) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    let _ = writeln!(out, "Ollama Settings:");
    let _ = writeln!(out, "  Host: {}", config.ollama.host);
    let _ = writeln!(out, "  Port: {}", config.ollama.port);
    let _ = writeln!(out, "  Embedding model: {}", config.ollama.embedding_model);
    let _ = writeln!(out, "  Chat model: {}", config.ollama.chat_model);
    let _ = writeln!(out, "  Temperature: {}", config.ollama.temperature);
    let _ = writeln!(
        out,
        "  Max tokens: {}",
        config
            .ollama
            .max_tokens
            .map_or_else(|| "server default".to_string(), |n| n.to_string())
    );
    let _ = writeln!(out, "  Batch size: {}", config.ollama.batch_size);
    match config.ollama.ollama_url() {
        Ok(url) => {
            let _ = writeln!(out, "  Ollama URL: {}", url);
        }
        Err(e) => {
            let _ = writeln!(out, "  Ollama URL: invalid ({})", e);
        }
    }
    let _ = writeln!(out, "Search Settings:");
    let _ = writeln!(out, "  Provider: {}", config.search.provider);
    if let Some(url) = &config.search.searx_url {
        let _ = writeln!(out, "  SearXNG URL: {}", url);
    }
    let _ = writeln!(out, "Chunking Settings:");
    let _ = writeln!(out, "  Window size: {} tokens", config.chunking.window_size);
    let _ = writeln!(out, "  Overlap: {} tokens", config.chunking.overlap_size);
    out
}

fn load_existing_config() -> Result<Config> {
    match Config::load_default() {
        Ok(config) => {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        }
        Err(_) => {
            eprintln!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            let base_dir = Config::default_base_dir()?;
            Ok(Config {
                ollama: Default::default(),
                chunking: Default::default(),
                search: Default::default(),
                base_dir,
            })
        }
    }
}

fn configure_ollama(config: &mut Config) -> Result<()> {
    let protocols = &["http", "https"];
    let default_index = protocols
        .iter()
        .position(|&p| p == config.ollama.protocol)
        .unwrap_or(0);

    let protocol_index = Select::new()
        .with_prompt("Ollama protocol")
        .default(default_index)
        .items(protocols)
        .interact()?;

    config.ollama.protocol = protocols[protocol_index].to_string();

    config.ollama.host = Input::new()
        .with_prompt("Ollama host")
        .default(config.ollama.host.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Host cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    config.ollama.port = Input::new()
        .with_prompt("Ollama port")
        .default(config.ollama.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    config.ollama.embedding_model = Input::new()
        .with_prompt("Embedding model")
        .default(config.ollama.embedding_model.clone())
        .validate_with(non_empty_model)
        .interact_text()?;

    config.ollama.chat_model = Input::new()
        .with_prompt("Chat model")
        .default(config.ollama.chat_model.clone())
        .validate_with(non_empty_model)
        .interact_text()?;

    config.ollama.temperature = Input::new()
        .with_prompt("Temperature")
        .default(config.ollama.temperature)
        .validate_with(|input: &f32| -> Result<(), &str> {
            if (0.0..=2.0).contains(input) {
                Ok(())
            } else {
                Err("Temperature must be between 0.0 and 2.0")
            }
        })
        .interact_text()?;

    config.ollama.batch_size = Input::new()
        .with_prompt("Batch size for embedding generation")
        .default(config.ollama.batch_size)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if *input == 0 {
                Err("Batch size must be greater than 0")
            } else if *input > 1000 {
                Err("Batch size must be 1000 or less")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    Ok(())
}

fn configure_search(search: &mut SearchConfig) -> Result<()> {
    let providers = &["duckduckgo", "searx"];
    let default_index = providers
        .iter()
        .position(|&p| p == search.provider)
        .unwrap_or(0);

    let provider_index = Select::new()
        .with_prompt("Search provider for agent mode")
        .default(default_index)
        .items(providers)
        .interact()?;

    search.provider = providers[provider_index].to_string();

    if search.provider == "searx" {
        let current = search.searx_url.clone().unwrap_or_default();
        let url: String = Input::new()
            .with_prompt("SearXNG base URL")
            .default(current)
            .validate_with(|input: &String| -> Result<(), &str> {
                url::Url::parse(input).map(|_| ()).map_err(|_| "Invalid URL")
            })
            .interact_text()?;
        search.searx_url = Some(url);
    } else {
        search.searx_url = None;
    }

    Ok(())
}

fn non_empty_model(input: &String) -> Result<(), &'static str> {
    if input.trim().is_empty() {
        Err("Model name cannot be empty")
    } else {
        Ok(())
    }
}

fn test_ollama_connection(config: &Config) -> Result<bool> {
    let url = format!(
        "{}://{}:{}/api/version",
        config.ollama.protocol, config.ollama.host, config.ollama.port
    );

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(std::time::Duration::from_secs(5)))
        .build()
        .into();

    match agent.get(&url).call() {
        Ok(_) => Ok(true),
        Err(ureq::Error::StatusCode(code)) if (400..500).contains(&code) => Ok(true),
        Err(_) => Ok(false),
    }
}
