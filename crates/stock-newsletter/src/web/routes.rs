//! HTTP routes for the research form and its JSON twin

use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use super::markdown;
use super::templates::{Page, Templates};
use crate::crew::ResearchRunner;
use crate::error::{Result, StockError};

/// Message shown when the form is submitted without a ticker
pub const EMPTY_TICKET_MESSAGE: &str = "Please fill the ticket field";

/// Shared state for all handlers
pub struct AppState {
    pub runner: Arc<dyn ResearchRunner>,
    pub templates: Templates,
}

impl AppState {
    /// Create the state with the built-in templates
    pub fn new(runner: Arc<dyn ResearchRunner>) -> Result<Self> {
        let templates = Templates::new()
            .map_err(|e| StockError::ConfigError(format!("invalid template: {e}")))?;
        Ok(Self { runner, templates })
    }

    fn page(&self, status: StatusCode, page: &Page) -> Response {
        match self.templates.render_page(page) {
            Ok(html) => (status, Html(html)).into_response(),
            Err(e) => {
                error!(error = %e, "Failed to render page");
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render page").into_response()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ResearchRequest {
    #[serde(default)]
    ticket: String,
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/research", post(research_form))
        .route("/api/research", post(research_json))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the router on `addr` until Ctrl+C or SIGTERM
pub async fn serve(addr: &str, runner: Arc<dyn ResearchRunner>) -> Result<()> {
    let state = Arc::new(AppState::new(runner)?);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}

async fn index(State(state): State<Arc<AppState>>) -> Response {
    state.page(StatusCode::OK, &Page::default())
}

async fn research_form(
    State(state): State<Arc<AppState>>,
    Form(request): Form<ResearchRequest>,
) -> Response {
    let ticket = request.ticket.trim().to_string();
    if ticket.is_empty() {
        return state.page(
            StatusCode::UNPROCESSABLE_ENTITY,
            &Page {
                error: Some(EMPTY_TICKET_MESSAGE.to_string()),
                ..Page::default()
            },
        );
    }

    match state.runner.research(&ticket).await {
        Ok(output) => {
            let report_html = markdown::to_html(&output.final_output);
            state.page(
                StatusCode::OK,
                &Page {
                    ticket,
                    error: None,
                    report_html: Some(report_html),
                },
            )
        }
        Err(e) => {
            error!(ticket = %ticket, error = %e, "Research failed");
            state.page(
                StatusCode::BAD_GATEWAY,
                &Page {
                    ticket,
                    error: Some(format!("Research failed: {e}")),
                    report_html: None,
                },
            )
        }
    }
}

async fn research_json(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ResearchRequest>,
) -> Response {
    let ticket = request.ticket.trim();
    if ticket.is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": EMPTY_TICKET_MESSAGE })),
        )
            .into_response();
    }

    match state.runner.research(ticket).await {
        Ok(output) => Json(output).into_response(),
        Err(e) => {
            error!(ticket = %ticket, error = %e, "Research failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": format!("Research failed: {e}") })),
            )
                .into_response()
        }
    }
}

async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crew::MockResearchRunner;
    use agent_crew::{CrewError, CrewOutput};
    use agent_llm::TokenUsage;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use tower::ServiceExt;

    fn output(markdown: &str) -> CrewOutput {
        CrewOutput {
            run_id: "run-1".to_string(),
            final_output: markdown.to_string(),
            tasks_output: Vec::new(),
            token_usage: TokenUsage::default(),
        }
    }

    fn app(runner: MockResearchRunner) -> Router {
        router(Arc::new(AppState::new(Arc::new(runner)).unwrap()))
    }

    fn form(body: &str) -> Request<Body> {
        Request::post("/research")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn json_request(body: &str) -> Request<Body> {
        Request::post("/api/research")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_index_renders_form() {
        let response = app(MockResearchRunner::new())
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Enter the stock to research"));
        assert!(body.contains("Run research"));
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(MockResearchRunner::new())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "ok");
    }

    #[tokio::test]
    async fn test_blank_ticket_is_rejected_without_running() {
        let mut runner = MockResearchRunner::new();
        runner.expect_research().never();
        let app = app(runner);

        for body in ["ticket=", "ticket=+++", ""] {
            let response = app.clone().oneshot(form(body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
            assert!(body_text(response).await.contains(EMPTY_TICKET_MESSAGE));
        }
    }

    #[tokio::test]
    async fn test_research_renders_markdown_report() {
        let mut runner = MockResearchRunner::new();
        runner
            .expect_research()
            .withf(|ticket| ticket == "AAPL")
            .times(1)
            .returning(|_| Ok(output("## AAPL\n\n- price **up**")));

        let response = app(runner).oneshot(form("ticket=+AAPL+")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Results of your research:"));
        assert!(body.contains("<h2>AAPL</h2>"));
        assert!(body.contains("<strong>up</strong>"));
    }

    #[tokio::test]
    async fn test_research_failure_is_shown() {
        let mut runner = MockResearchRunner::new();
        runner.expect_research().returning(|_| {
            Err(CrewError::TaskFailed {
                task: "get_stock_price".to_string(),
                message: "rate limited".to_string(),
            }
            .into())
        });

        let response = app(runner).oneshot(form("ticket=AAPL")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_text(response).await;
        assert!(body.contains("Research failed: Task &#x27;get_stock_price&#x27; failed"));
        assert!(!body.contains("Results of your research:"));
    }

    #[tokio::test]
    async fn test_json_api() {
        let mut runner = MockResearchRunner::new();
        runner
            .expect_research()
            .withf(|ticket| ticket == "BTC-USD")
            .returning(|_| Ok(output("# BTC")));
        let app = app(runner);

        let response = app
            .clone()
            .oneshot(json_request(r#"{"ticket": "BTC-USD"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let value: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(value["final_output"], "# BTC");
        assert_eq!(value["run_id"], "run-1");

        let response = app.oneshot(json_request(r#"{"ticket": " "}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let value: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(value["error"], EMPTY_TICKET_MESSAGE);
    }
}
