//! Contract Forge - contract template extraction and comparison server.

mod compare;
mod config;
mod extractor;
mod llm;
mod prompts;
mod render;
mod report;
mod sanitize;
mod store;
mod template;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{Html, Json},
    routing::{get, post},
    Router,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use compare::CompareError;
use config::Settings;
use extractor::{ComparisonReport, ExtractionOutcome, Extractor};
use llm::openrouter::OpenRouterClient;
use render::SubstitutionValueSet;
use store::TemplateStore;
use template::Template;

/// Application state shared across handlers. Comparison jobs are kept
/// in-memory; stored templates live on disk and are read-only once written.
#[derive(Clone)]
struct AppState {
    comparisons: Arc<RwLock<HashMap<String, ComparisonReport>>>,
    store: Arc<TemplateStore>,
    extractor: Arc<Extractor>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "contract_forge=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env();

    // Missing credentials abort here, before any job can start
    let backend = OpenRouterClient::from_env()?;
    info!("OpenRouter client initialized");

    let store = TemplateStore::open(&settings.template_dir)?;
    info!("Template store at {:?}", settings.template_dir);

    let state = AppState {
        comparisons: Arc::new(RwLock::new(HashMap::new())),
        store: Arc::new(store),
        extractor: Arc::new(Extractor::new(Arc::new(backend))),
    };

    let app = Router::new()
        .route("/health", get(health))
        .route("/templates", get(list_templates).post(extract_template))
        .route("/templates/{name}", get(get_template))
        .route("/templates/{name}/generate", post(generate_contract))
        .route("/compare", post(compare_documents))
        .route("/comparisons/{id}/report", get(comparison_report))
        .route("/refine", post(refine_contract))
        .route("/restyle", post(restyle_contract))
        .layer(DefaultBodyLimit::max(100 * 1024 * 1024)) // 100MB
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    info!("Server listening on http://{}", settings.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// List stored template keys.
async fn list_templates(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, (StatusCode, String)> {
    state
        .store
        .list()
        .map(Json)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e)))
}

#[derive(serde::Serialize)]
struct TemplateResponse {
    source: String,
    template: Template,
    warnings: Vec<String>,
}

/// Upload a document, extract its template, and persist it.
async fn extract_template(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<TemplateResponse>, (StatusCode, String)> {
    let mut filename = String::new();
    let mut file_data = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Multipart error: {}", e)))?
    {
        if field.name() == Some("file") {
            filename = field.file_name().unwrap_or("document").to_string();
            file_data = field
                .bytes()
                .await
                .map_err(|e| (StatusCode::BAD_REQUEST, format!("Failed to read file: {}", e)))?
                .to_vec();
            break;
        }
    }

    if file_data.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "No file uploaded".to_string()));
    }

    info!("Received file: {} ({} bytes)", filename, file_data.len());
    let text = document_text(&filename, &file_data)?;

    match state.extractor.extract_template(&filename, &text).await {
        ExtractionOutcome::Parsed(template) => {
            let warnings = template.integrity_warnings();
            for w in &warnings {
                tracing::warn!("{}: {}", filename, w);
            }
            let key = state
                .store
                .save(&filename, &template)
                .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e)))?;
            Ok(Json(TemplateResponse {
                source: key,
                template,
                warnings,
            }))
        }
        ExtractionOutcome::MalformedResponse { diagnostic, .. } => Err((
            StatusCode::BAD_GATEWAY,
            format!("Extraction produced unusable output: {}", diagnostic),
        )),
        ExtractionOutcome::BackendFailure { cause } => Err((
            StatusCode::BAD_GATEWAY,
            format!("Extraction failed: {}", cause),
        )),
    }
}

/// Get a stored template by key.
async fn get_template(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Template>, (StatusCode, String)> {
    match state.store.load(&name) {
        Ok(Some(template)) => Ok(Json(template)),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            format!("No template extracted yet for '{}'", name),
        )),
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e))),
    }
}

#[derive(serde::Deserialize)]
struct GenerateRequest {
    #[serde(default)]
    values: SubstitutionValueSet,
}

#[derive(serde::Serialize)]
struct GenerateResponse {
    contract: String,
    warnings: Vec<String>,
}

/// Render a stored template with user-supplied values.
async fn generate_contract(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, (StatusCode, String)> {
    let template = match state.store.load(&name) {
        Ok(Some(template)) => template,
        Ok(None) => {
            return Err((
                StatusCode::NOT_FOUND,
                format!("No template extracted yet for '{}'", name),
            ))
        }
        Err(e) => return Err((StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e))),
    };

    let rendered = render::render(&template, &request.values);
    Ok(Json(GenerateResponse {
        contract: rendered.text,
        warnings: rendered.warnings,
    }))
}

#[derive(serde::Serialize)]
struct CompareResponse {
    job_id: String,
    labels: Vec<String>,
    document_names: Vec<String>,
    outcome: compare::ComparisonOutcome,
    warnings: Vec<String>,
    report_url: String,
}

/// Upload 2-10 documents and compare them in one job.
async fn compare_documents(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<CompareResponse>, (StatusCode, String)> {
    let mut documents: Vec<(String, String)> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Multipart error: {}", e)))?
    {
        let Some(filename) = field.file_name().map(|f| f.to_string()) else {
            continue;
        };
        let data = field
            .bytes()
            .await
            .map_err(|e| (StatusCode::BAD_REQUEST, format!("Failed to read file: {}", e)))?
            .to_vec();
        // Unreadable files become empty text so the job can enumerate them
        let text = document_text(&filename, &data).unwrap_or_default();
        documents.push((filename, text));
    }

    let report = state
        .extractor
        .compare(&documents)
        .await
        .map_err(|e| (compare_error_status(&e), e.to_string()))?;

    let job_id = uuid::Uuid::new_v4().simple().to_string();
    let response = CompareResponse {
        job_id: job_id.clone(),
        labels: report.labels.iter().map(|l| l.to_string()).collect(),
        document_names: report.document_names.clone(),
        outcome: report.outcome.clone(),
        warnings: report.warnings.clone(),
        report_url: format!("/comparisons/{}/report", job_id),
    };

    state
        .comparisons
        .write()
        .unwrap()
        .insert(job_id.clone(), report);
    info!("Comparison job stored: {}", job_id);

    Ok(Json(response))
}

/// Render a stored comparison job as an HTML report.
async fn comparison_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, StatusCode> {
    let comparisons = state.comparisons.read().unwrap();
    let job = comparisons.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Html(report::render_report(&job.outcome, &job.labels)))
}

#[derive(serde::Deserialize)]
struct RefineRequest {
    contract_text: String,
    instructions: String,
}

#[derive(serde::Serialize)]
struct RefineResponse {
    contract: String,
}

/// Apply a modification request to an already-generated contract.
async fn refine_contract(
    State(state): State<AppState>,
    Json(request): Json<RefineRequest>,
) -> Result<Json<RefineResponse>, (StatusCode, String)> {
    if request.contract_text.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "contract_text must not be empty".to_string(),
        ));
    }
    state
        .extractor
        .refine(&request.contract_text, &request.instructions)
        .await
        .map(|contract| Json(RefineResponse { contract }))
        .map_err(|e| {
            error!("refinement failed: {:#}", e);
            (StatusCode::BAD_GATEWAY, format!("Refinement failed: {:#}", e))
        })
}

fn default_style() -> String {
    "Use generic professional styling".to_string()
}

#[derive(serde::Deserialize)]
struct RestyleRequest {
    contract_text: String,
    #[serde(default = "default_style")]
    style: String,
}

/// Restyle a generated contract as a standalone HTML document.
async fn restyle_contract(
    State(state): State<AppState>,
    Json(request): Json<RestyleRequest>,
) -> Result<Html<String>, (StatusCode, String)> {
    if request.contract_text.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "contract_text must not be empty".to_string(),
        ));
    }
    state
        .extractor
        .restyle(&request.contract_text, &request.style)
        .await
        .map(Html)
        .map_err(|e| {
            error!("restyle failed: {:#}", e);
            (StatusCode::BAD_GATEWAY, format!("Restyle failed: {:#}", e))
        })
}

// ============================================================================
// Helper functions
// ============================================================================

/// Decode an upload into plain text: PDFs via lopdf, anything else as UTF-8.
fn document_text(filename: &str, data: &[u8]) -> Result<String, (StatusCode, String)> {
    let text = if filename.to_lowercase().ends_with(".pdf") {
        extract_pdf_text(data).unwrap_or_else(|e| {
            error!("PDF extraction failed for {}: {}", filename, e);
            String::new()
        })
    } else {
        String::from_utf8_lossy(data).to_string()
    };

    if text.trim().is_empty() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("Could not extract text from '{}'", filename),
        ));
    }
    Ok(text)
}

/// Extract text from a PDF file using lopdf.
fn extract_pdf_text(data: &[u8]) -> anyhow::Result<String> {
    use lopdf::Document;
    use std::io::Cursor;

    let doc = Document::load_from(Cursor::new(data))
        .map_err(|e| anyhow::anyhow!("Failed to load PDF: {}", e))?;

    let mut text = String::new();
    let pages = doc.get_pages();

    for (page_num, _) in pages {
        if let Ok(content) = doc.extract_text(&[page_num]) {
            text.push_str(&content);
            text.push('\n');
        }
    }

    Ok(text)
}

/// Map a comparison failure onto the client/server error split.
fn compare_error_status(err: &CompareError) -> StatusCode {
    match err {
        CompareError::TooFewDocuments(_) | CompareError::TooManyDocuments(_) => {
            StatusCode::BAD_REQUEST
        }
        CompareError::ExtractionFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        CompareError::Backend(_) => StatusCode::BAD_GATEWAY,
    }
}
