//! The three-agent newsletter crew

use agent_crew::{Crew, CrewAgent, CrewOutput, Llm, Process, Task};
use agent_tools::Tool;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::error::{Result, StockError};

/// Input key holding the ticker symbol
pub const TICKET_INPUT: &str = "ticket";

/// Iteration cap of the manager agent
pub const MANAGER_MAX_ITER: usize = 15;

pub const PRICE_ANALYST_ROLE: &str = "Senior stock price Analyst";
pub const NEWS_ANALYST_ROLE: &str = "Stock News Analyst";
pub const WRITER_ROLE: &str = "Senior Stock Analyst Writer";

pub const GET_STOCK_PRICE_TASK: &str = "get_stock_price";
pub const GET_NEWS_TASK: &str = "get_news";
pub const WRITE_ANALYSES_TASK: &str = "write_analyses";

/// Build the newsletter crew
///
/// `llm` drives every agent and the manager. Role, goal, backstory and task
/// texts reference the ticker as `{{ ticket }}`.
pub fn newsletter_crew(
    llm: Llm,
    price_tool: Arc<dyn Tool>,
    news_tool: Arc<dyn Tool>,
    verbose: bool,
) -> Result<Crew> {
    let price_analyst = CrewAgent::builder(PRICE_ANALYST_ROLE)
        .goal("Find the {{ ticket }} stock price and analyses trends")
        .backstory(
            "You're highly experienced in analyzing the price of an specific stock\n\
             and make predctions about its futuro price.",
        )
        .llm(llm.clone())
        .tool(price_tool)
        .max_iter(5)
        .memory(true)
        .allow_delegation(false)
        .verbose(verbose)
        .build()?;

    let news_analyst = CrewAgent::builder(NEWS_ANALYST_ROLE)
        .goal(
            "Create a short summary of the market news related to the stock {{ ticket }} company. \
             Specify current trend - up, down or sideways with the news context. For each request \
             stock asset,\nspecify a number between 0 and 100, where 0 is extreme fear and 100 is \
             extreme greed.",
        )
        .backstory(
            "You're highly experienced in analyzing the market and news and have tracked assets \
             for more then 10 years.\n\
             You're also master level analyst in the tradicional markets and have a deep \
             understanding of human psychology.\n\
             You undertanding news, theirs tittles and information, but you look at those with a \
             health dose of skepticism.\n\
             You consider also the source of the news articles.",
        )
        .llm(llm.clone())
        .tool(news_tool)
        .max_iter(10)
        .memory(true)
        .allow_delegation(false)
        .verbose(verbose)
        .build()?;

    let writer = CrewAgent::builder(WRITER_ROLE)
        .goal(
            "Analyze the trends price and news and Write an insightfull compelling and \
             informastive 3 paragraph long newsletter based on the stock report and price trend.",
        )
        .backstory(
            "You're widely accepted as the best stock analyst in the market. You undertand \
             complex concepts and create compelling stories and narratives that resonate\n\
             with wider audiences.\n\
             You're understand macro factos and combine multiples theories - eg. cycle theory and \
             fundamentals analyses.\n\
             You're able to hold multiples opnions when analyzing anything.",
        )
        .llm(llm.clone())
        .max_iter(5)
        .memory(true)
        .allow_delegation(true)
        .verbose(verbose)
        .build()?;

    let get_stock_price = Task::builder(GET_STOCK_PRICE_TASK)
        .description(
            "Analyzing the stock {{ ticket }} price history and create a trend analyses of up, \
             down or sideways",
        )
        .expected_output(
            "Specify the current trend price - up, down ir sideways.\n\
             eg. STOCK = 'APPL, price UP'",
        )
        .agent(PRICE_ANALYST_ROLE)
        .build();

    let get_news = Task::builder(GET_NEWS_TASK)
        .description(
            "Take the Stock and aways include BTC to it (if not request).\n\
             Use the search tool to search each one individually.\n\
             Compose the results into a helpfull report",
        )
        .expected_output(
            "A summary of the overall market and one sentence summary for each request asset.\n\
             Include a fear/greed score for each asset based on the news. Use format:\n\
             <STOCK ASSET>\n\
             <SUMMARY BAED ON NEWS>\n\
             <TREND PREDICTION>\n\
             <FEER/GREED SCORE>",
        )
        .agent(NEWS_ANALYST_ROLE)
        .build();

    let write_analyses = Task::builder(WRITE_ANALYSES_TASK)
        .description(
            "Use the stock price trend and the stock news report to create an analyses and write \
             the newsletter about the {{ ticket }} company that is brief and highlights the most \
             important points.\n\
             Focus on the stock price trend, news and fear/greed score. What are near future \
             considerations?\n\
             Include the previous analyses of stock trend and news summary.",
        )
        .expected_output(
            "An eloquent 3 paragraphs newsletter formated as markdown in an easy readable manner. \
             It should contain:\n\
             - 3 bullets execuritve summary\n\
             - Introducion - set the overall picture and spike up the interest\n\
             - Main part provides the meat of the analysis including the news summary and \
             fear/greed scores\n\
             - Summary - key facts and concrete future trend prediction - up, down or sideways",
        )
        .agent(WRITER_ROLE)
        .context([GET_STOCK_PRICE_TASK, GET_NEWS_TASK])
        .build();

    Ok(Crew::builder()
        .agent(price_analyst)
        .agent(news_analyst)
        .agent(writer)
        .task(get_stock_price)
        .task(get_news)
        .task(write_analyses)
        .process(Process::Hierarchical)
        .manager_llm(llm)
        .max_iter(MANAGER_MAX_ITER)
        .verbose(verbose)
        .build()?)
}

/// Runs a research request for one ticker
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResearchRunner: Send + Sync {
    /// Research `ticket` and return the crew output; the newsletter is `final_output`
    async fn research(&self, ticket: &str) -> Result<CrewOutput>;
}

/// [`ResearchRunner`] backed by the newsletter crew
pub struct CrewResearchRunner {
    crew: Arc<Crew>,
}

impl CrewResearchRunner {
    /// Create a runner around a built crew
    pub fn new(crew: Crew) -> Self {
        Self {
            crew: Arc::new(crew),
        }
    }

    /// The underlying crew
    pub fn crew(&self) -> &Crew {
        &self.crew
    }
}

#[async_trait]
impl ResearchRunner for CrewResearchRunner {
    async fn research(&self, ticket: &str) -> Result<CrewOutput> {
        let ticket = ticket.trim();
        if ticket.is_empty() {
            return Err(StockError::InvalidSymbol(ticket.to_string()));
        }

        info!(ticket = %ticket, "Starting research");
        let inputs = HashMap::from([(TICKET_INPUT.to_string(), ticket.to_string())]);
        let output = self.crew.kickoff(&inputs).await?;

        info!(
            ticket = %ticket,
            run_id = %output.run_id,
            tokens = output.token_usage.total(),
            "Research finished"
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_crew::MANAGER_ROLE;
    use agent_crew::delegation::DELEGATE_WORK_TOOL;
    use agent_llm::{
        CompletionRequest, CompletionResponse, LLMError, LLMProvider, Message, StopReason,
        TokenUsage,
    };
    use serde_json::{Value, json};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned replies: `Ok(text)` answers, `Err((tool, input))` calls a tool
    struct SequenceProvider {
        replies: Mutex<VecDeque<std::result::Result<String, (String, Value)>>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl SequenceProvider {
        fn new(replies: Vec<std::result::Result<&str, (&str, Value)>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(
                    replies
                        .into_iter()
                        .map(|r| r.map(str::to_string).map_err(|(n, v)| (n.to_string(), v)))
                        .collect(),
                ),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn prompts(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .filter_map(|r| r.messages.iter().rev().find_map(|m| m.text().map(str::to_string)))
                .collect()
        }
    }

    #[async_trait]
    impl LLMProvider for SequenceProvider {
        async fn complete(&self, request: CompletionRequest) -> agent_llm::Result<CompletionResponse> {
            self.requests.lock().unwrap().push(request);
            let usage = TokenUsage {
                input_tokens: 10,
                output_tokens: 5,
            };

            match self.replies.lock().unwrap().pop_front() {
                Some(Ok(text)) => Ok(CompletionResponse {
                    message: Message::assistant(text),
                    stop_reason: StopReason::EndTurn,
                    usage,
                }),
                Some(Err((name, input))) => Ok(CompletionResponse {
                    message: Message::assistant_tool_calls(vec![("call_1".to_string(), name, input)]),
                    stop_reason: StopReason::ToolUse,
                    usage,
                }),
                None => Err(LLMError::InvalidRequest("script exhausted".to_string())),
            }
        }

        fn name(&self) -> &str {
            "sequence"
        }
    }

    struct StubTool {
        name: &'static str,
        calls: Mutex<Vec<Value>>,
    }

    impl StubTool {
        fn new(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Tool for StubTool {
        async fn execute(&self, params: Value) -> agent_core::Result<Value> {
            self.calls.lock().unwrap().push(params);
            Ok(json!({"trend": "up"}))
        }

        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "stub"
        }

        fn input_schema(&self) -> Value {
            json!({"type": "object"})
        }
    }

    fn crew_with(provider: &Arc<SequenceProvider>, price: Arc<StubTool>) -> Crew {
        newsletter_crew(
            Llm::new(provider.clone(), "gpt-3.5-turbo"),
            price,
            StubTool::new("duckduckgo_news_search"),
            false,
        )
        .unwrap()
    }

    #[test]
    fn test_newsletter_crew_layout() {
        let provider = SequenceProvider::new(Vec::new());
        let crew = crew_with(&provider, StubTool::new("yahoo_finance_price_history"));

        assert_eq!(crew.process(), Process::Hierarchical);

        let roles: Vec<_> = crew.agents().iter().map(CrewAgent::role).collect();
        assert_eq!(roles, vec![PRICE_ANALYST_ROLE, NEWS_ANALYST_ROLE, WRITER_ROLE]);

        let limits: Vec<_> = crew.agents().iter().map(CrewAgent::max_iter).collect();
        assert_eq!(limits, vec![5, 10, 5]);
        assert!(crew.agents().iter().all(CrewAgent::memory));
        assert!(crew.agents()[2].allow_delegation());
        assert_eq!(crew.agents()[0].tools()[0].name(), "yahoo_finance_price_history");
        assert_eq!(crew.agents()[1].tools()[0].name(), "duckduckgo_news_search");
        assert!(crew.agents()[2].tools().is_empty());

        let tasks: Vec<_> = crew.tasks().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(tasks, vec![GET_STOCK_PRICE_TASK, GET_NEWS_TASK, WRITE_ANALYSES_TASK]);
        assert_eq!(
            crew.tasks()[2].context.as_deref(),
            Some(&[GET_STOCK_PRICE_TASK.to_string(), GET_NEWS_TASK.to_string()][..])
        );
        assert!(crew.tasks()[1].description.contains("BTC"));
    }

    #[tokio::test]
    async fn test_research_runs_through_the_manager() {
        let provider = SequenceProvider::new(vec![
            // get_stock_price: manager delegates, analyst uses the price tool
            Err((
                DELEGATE_WORK_TOOL,
                json!({
                    "task": "Analyse the TSLA price history",
                    "context": "Use the Yahoo Finance tool",
                    "coworker": "senior stock price analyst"
                }),
            )),
            Err(("yahoo_finance_price_history", json!({"ticket": "TSLA"}))),
            Ok("STOCK = 'TSLA', price UP"),
            Ok("STOCK = 'TSLA', price UP"),
            // get_news and write_analyses: manager answers directly
            Ok("TSLA\nDeliveries beat\nup\n70"),
            Ok("# TSLA newsletter\n\n- up"),
        ]);
        let price = StubTool::new("yahoo_finance_price_history");
        let runner = CrewResearchRunner::new(crew_with(&provider, price.clone()));

        let output = runner.research(" TSLA ").await.unwrap();

        assert_eq!(output.final_output, "# TSLA newsletter\n\n- up");
        assert_eq!(output.tasks_output.len(), 3);
        assert!(output.tasks_output.iter().all(|t| t.agent == MANAGER_ROLE));
        assert_eq!(output.token_usage.total(), 6 * 15);
        assert_eq!(*price.calls.lock().unwrap(), vec![json!({"ticket": "TSLA"})]);

        let prompts = provider.prompts();
        assert!(prompts[0].contains("Analyzing the stock TSLA price history"));
        assert!(
            prompts[0].contains("The coworker best suited for this task is: Senior stock price Analyst")
        );
        let writer_prompt = &prompts[5];
        assert!(writer_prompt.contains("write the newsletter about the TSLA company"));
        assert!(writer_prompt.contains("STOCK = 'TSLA', price UP"));
        assert!(writer_prompt.contains("Deliveries beat"));
    }

    #[tokio::test]
    async fn test_blank_ticket_never_reaches_the_llm() {
        let provider = SequenceProvider::new(Vec::new());
        let runner = CrewResearchRunner::new(crew_with(
            &provider,
            StubTool::new("yahoo_finance_price_history"),
        ));

        let err = runner.research("   ").await.unwrap_err();
        assert!(matches!(err, StockError::InvalidSymbol(_)));
        assert!(provider.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_llm_failure_is_reported() {
        let provider = SequenceProvider::new(Vec::new());
        let runner = CrewResearchRunner::new(crew_with(
            &provider,
            StubTool::new("yahoo_finance_price_history"),
        ));

        let err = runner.research("AAPL").await.unwrap_err();
        assert!(err.to_string().contains(GET_STOCK_PRICE_TASK));
    }
}
