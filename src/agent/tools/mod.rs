
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::debug;
use ureq::Agent;

use crate::config::{Config, SearchConfig};

const SEARCH_TIMEOUT_SECONDS: u64 = 30;

/// A callable search tool: one string in, unstructured text out
pub trait SearchTool {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    /// Forward the query to the search service and return its response text
    /// unmodified
    fn call(&self, query: &str) -> Result<String>;
}

fn search_agent() -> Agent {
    Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(SEARCH_TIMEOUT_SECONDS)))
        .user_agent(concat!("paperchat/", env!("CARGO_PKG_VERSION")))
        .build()
        .into()
}

/// DuckDuckGo instant-answer API tool
pub struct DuckDuckGoTool {
    agent: Agent,
    base_url: String,
}

impl DuckDuckGoTool {
    #[inline]
    pub fn new() -> Self {
        Self::with_base_url("https://api.duckduckgo.com")
    }

    #[inline]
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            agent: search_agent(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl Default for DuckDuckGoTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl SearchTool for DuckDuckGoTool {
    fn name(&self) -> &str {
        "duckduckgo_search"
    }

    fn description(&self) -> &str {
        "Search the web via the DuckDuckGo instant-answer API. \
         Input: a search query string. Output: raw result text."
    }

    fn call(&self, query: &str) -> Result<String> {
        let url = format!(
            "{}/?q={}&format=json&no_redirect=1&no_html=1",
            self.base_url,
            urlencoding::encode(query)
        );
        debug!("DuckDuckGo search: {}", query);

        let mut response = self
            .agent
            .get(&url)
            .call()
            .context("DuckDuckGo search request failed")?;

        response
            .body_mut()
            .read_to_string()
            .context("Failed to read DuckDuckGo response")
    }
}

/// Search tool backed by a self-hosted SearXNG instance
pub struct SearxTool {
    agent: Agent,
    base_url: String,
}

impl SearxTool {
    #[inline]
    pub fn new(base_url: &str) -> Self {
        Self {
            agent: search_agent(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl SearchTool for SearxTool {
    fn name(&self) -> &str {
        "searx_search"
    }

    fn description(&self) -> &str {
        "Search the web via a SearXNG metasearch instance. \
         Input: a search query string. Output: raw result text."
    }

    fn call(&self, query: &str) -> Result<String> {
        let url = format!(
            "{}/search?q={}&format=json",
            self.base_url,
            urlencoding::encode(query)
        );
        debug!("SearXNG search: {}", query);

        let mut response = self
            .agent
            .get(&url)
            .call()
            .context("SearXNG search request failed")?;

        response
            .body_mut()
            .read_to_string()
            .context("Failed to read SearXNG response")
    }
}

/// Build the tool roster for the configured search provider
#[inline]
pub fn tools_from_config(config: &Config) -> Result<Vec<Box<dyn SearchTool>>> {
    tools_from_search_config(&config.search)
}

fn tools_from_search_config(search: &SearchConfig) -> Result<Vec<Box<dyn SearchTool>>> {
    match search.provider.as_str() {
        "duckduckgo" => Ok(vec![Box::new(DuckDuckGoTool::new())]),
        "searx" => {
            let base_url = search
                .searx_url
                .as_deref()
                .context("search provider 'searx' requires searx_url")?;
            Ok(vec![Box::new(SearxTool::new(base_url))])
        }
        other => anyhow::bail!("Unknown search provider: {}", other),
    }
}
