//! Wiring: configuration in, research runner out

use agent_crew::Llm;
use agent_llm::LLMProvider;
use agent_llm::providers::OpenAIProvider;
use std::sync::Arc;

use crate::api::{DuckDuckGoNewsClient, NewsSource, PriceSource, YahooFinanceClient};
use crate::cache::DataCache;
use crate::config::AppConfig;
use crate::crew::{CrewResearchRunner, newsletter_crew};
use crate::error::Result;
use crate::tools::{NewsSearchTool, PriceHistoryTool};

/// Build the research runner against the real data sources and LLM endpoint
pub fn build_runner(config: &AppConfig, verbose: bool) -> Result<Arc<CrewResearchRunner>> {
    let provider = Arc::new(OpenAIProvider::with_config(config.openai_config()?)?);
    let prices = Arc::new(YahooFinanceClient::new()?);
    let news = Arc::new(DuckDuckGoNewsClient::new(
        config.request_timeout,
        config.news_rate_limit,
    )?);

    tracing::info!(
        api_base = %config.openai_api_base,
        model = %config.model,
        "Research runner configured"
    );

    build_runner_with(config, provider, prices, news, verbose)
}

/// Build the research runner over explicit provider and data sources
pub fn build_runner_with(
    config: &AppConfig,
    provider: Arc<dyn LLMProvider>,
    prices: Arc<dyn PriceSource>,
    news: Arc<dyn NewsSource>,
    verbose: bool,
) -> Result<Arc<CrewResearchRunner>> {
    let config = Arc::new(config.clone());
    let price_tool = PriceHistoryTool::new(
        prices,
        DataCache::new(config.cache_ttl_prices),
        config.clone(),
    );
    let news_tool = NewsSearchTool::new(
        news,
        DataCache::new(config.cache_ttl_news),
        config.news_max_results,
    );

    let llm = Llm::new(provider, config.model.clone());
    let crew = newsletter_crew(llm, Arc::new(price_tool), Arc::new(news_tool), verbose)?;

    Ok(Arc::new(CrewResearchRunner::new(crew)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MockNewsSource, MockPriceSource};
    use tokio_test::assert_ok;

    #[test]
    fn test_build_runner_requires_api_key_for_openai() {
        let Err(err) = build_runner(&AppConfig::default(), false) else {
            panic!("expected a missing key error");
        };
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_build_runner_for_local_endpoint() {
        let config = AppConfig::builder()
            .openai_api_base("http://localhost:1234/v1")
            .build()
            .unwrap();
        assert_ok!(build_runner(&config, false));
    }

    #[test]
    fn test_runner_uses_configured_model_and_tools() {
        let config = AppConfig::builder()
            .openai_api_base("http://localhost:1234/v1")
            .model("local-model")
            .build()
            .unwrap();
        let provider = Arc::new(OpenAIProvider::new("not-needed").unwrap());

        let runner = assert_ok!(build_runner_with(
            &config,
            provider,
            Arc::new(MockPriceSource::new()),
            Arc::new(MockNewsSource::new()),
            false,
        ));

        let agents = runner.crew().agents();
        assert!(agents.iter().all(|a| a.llm().model == "local-model"));
        assert_eq!(agents[0].tools()[0].name(), "yahoo_finance_price_history");
        assert_eq!(agents[1].tools()[0].name(), "duckduckgo_news_search");
    }
}
