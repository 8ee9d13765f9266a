//! HTTP surface: one embedded page, one endpoint to stage an image, one to
//! run the analysis on whatever is staged.

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{Html, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tracing::debug;

use crate::gemini::PlantAnalyzer;
use crate::image::ImagePayload;
use crate::session::{Session, SessionError, Status};

pub struct AppState {
    pub analyzer: Arc<dyn PlantAnalyzer>,
    pub session: Mutex<Session>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/select", post(select_image))
        .route("/analyze", post(analyze))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

type HandlerError = (StatusCode, Json<ErrorBody>);

fn reject(status: StatusCode, message: impl Into<String>) -> HandlerError {
    (
        status,
        Json(ErrorBody {
            message: message.into(),
        }),
    )
}

/// Stage a newly selected image. Always resets the session to idle; any
/// analysis still in flight for the previous image becomes stale.
async fn select_image(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<Status>, HandlerError> {
    let mut bytes = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| reject(StatusCode::BAD_REQUEST, "Invalid upload."))?
    {
        if field.name() == Some("image") {
            bytes = Some(field.bytes().await.map_err(|_| {
                reject(StatusCode::BAD_REQUEST, "Could not read the uploaded file.")
            })?);
            break;
        }
    }

    let bytes = bytes.ok_or_else(|| reject(StatusCode::BAD_REQUEST, "No image uploaded."))?;

    let payload = ImagePayload::from_bytes(&bytes)
        .map_err(|e| reject(StatusCode::BAD_REQUEST, e.user_message()))?;

    debug!(mime_type = %payload.mime_type, size = bytes.len(), "image staged");

    let mut session = state.session.lock().await;
    session.select_image(payload);
    Ok(Json(session.status().clone()))
}

/// Run one analysis against the staged image and report the resulting
/// session status. All analysis errors land in `Failed`, never in the
/// HTTP error channel.
async fn analyze(State(state): State<Arc<AppState>>) -> Result<Json<Status>, HandlerError> {
    run_analysis(&state).await.map(Json).map_err(|e| match e {
        SessionError::NoImageStaged => {
            reject(StatusCode::BAD_REQUEST, "Please select an image first.")
        }
        SessionError::AnalysisInFlight => reject(
            StatusCode::CONFLICT,
            "An analysis is already in progress.",
        ),
    })
}

/// The orchestration core: start, await the provider, record the outcome.
/// The session lock is released while the provider call is in flight so a
/// new selection can land meanwhile; its epoch bump makes this ticket stale
/// and the outcome is then discarded.
async fn run_analysis(state: &AppState) -> Result<Status, SessionError> {
    let (ticket, payload) = state.session.lock().await.start_analysis()?;

    let outcome = state.analyzer.analyze(&payload).await;

    let mut session = state.session.lock().await;
    if !session.finish(ticket, outcome) {
        debug!("analysis finished after a newer selection; result discarded");
    }
    Ok(session.status().clone())
}

async fn index() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

const INDEX_PAGE: &str = r#"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Leaf Doctor</title>
    <style>
        * { margin: 0; padding: 0; box-sizing: border-box; }

        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: #f0f7f1;
            min-height: 100vh;
            color: #1f2d22;
            padding: 24px;
        }

        .container { max-width: 720px; margin: 0 auto; }

        header { text-align: center; margin-bottom: 28px; }
        header h1 { color: #1e5631; font-size: 2em; }
        header p { color: #5c6f61; margin-top: 6px; }

        .card {
            background: white;
            border: 1px solid #dde8df;
            border-radius: 14px;
            box-shadow: 0 6px 24px rgba(30, 86, 49, 0.08);
            padding: 28px;
            margin-bottom: 20px;
        }

        .upload-area {
            border: 3px dashed #7bb389;
            border-radius: 12px;
            padding: 48px 16px;
            text-align: center;
            cursor: pointer;
            background: #f6fbf7;
            transition: border-color 0.2s, background 0.2s;
        }
        .upload-area:hover, .upload-area.dragover {
            border-color: #1e5631;
            background: #ecf6ee;
        }
        .upload-text { color: #1e5631; font-weight: 600; font-size: 1.1em; }
        .upload-hint { color: #8aa090; font-size: 0.9em; margin-top: 6px; }
        input[type="file"] { display: none; }

        .preview-image {
            max-width: 100%;
            max-height: 320px;
            display: block;
            margin: 16px auto 0;
            border-radius: 10px;
        }

        button.analyze {
            display: block;
            width: 100%;
            margin-top: 18px;
            padding: 14px;
            border: none;
            border-radius: 10px;
            background: #1e5631;
            color: white;
            font-size: 1.05em;
            font-weight: 600;
            cursor: pointer;
        }
        button.analyze:disabled { background: #9fb8a6; cursor: not-allowed; }

        .loading { text-align: center; padding: 28px; display: none; }
        .spinner {
            border: 4px solid #e2eee5;
            border-top: 4px solid #1e5631;
            border-radius: 50%;
            width: 44px;
            height: 44px;
            animation: spin 1s linear infinite;
            margin: 0 auto 14px;
        }
        @keyframes spin { to { transform: rotate(360deg); } }

        .banner {
            border-radius: 10px;
            padding: 16px;
            margin-bottom: 20px;
            display: none;
        }
        .banner.error { background: #fdecec; border: 1px solid #f5c2c2; color: #a33a3a; }
        .banner.healthy { background: #eaf7ed; border: 1px solid #bfe3c8; color: #1e5631; }
        .banner.disease-name {
            background: #fdf6e3;
            border: 1px solid #eeddad;
            color: #8a6d1a;
            text-align: center;
            font-size: 1.2em;
            font-weight: 700;
        }

        .result-section { display: none; }
        .result-section h3 { color: #1e5631; margin-bottom: 8px; }
        .result-section ul { margin-left: 20px; }
        .result-section li { margin-bottom: 6px; }
    </style>
</head>
<body>
    <div class="container">
        <header>
            <h1>🌿 Leaf Doctor</h1>
            <p>Upload a photo of a plant leaf and get an AI diagnosis in seconds.</p>
        </header>

        <div class="card">
            <div class="upload-area" id="uploadArea">
                <div class="upload-text">Click or drag a leaf photo here</div>
                <div class="upload-hint">JPG, PNG or WebP</div>
                <input type="file" id="fileInput" accept="image/*">
            </div>
            <img id="previewImage" class="preview-image" alt="" hidden>
            <button class="analyze" id="analyzeButton" disabled>Analyze Plant</button>
        </div>

        <div class="loading" id="loading">
            <div class="spinner"></div>
            <p>Analyzing your plant…</p>
        </div>

        <div class="banner error" id="errorBanner"></div>

        <div class="banner healthy" id="healthyBanner"></div>

        <div class="banner disease-name" id="diseaseBanner"></div>
        <div class="card result-section" id="descriptionCard">
            <h3>Description</h3>
            <p id="descriptionText"></p>
        </div>
        <div class="card result-section" id="treatmentCard">
            <h3>Treatment Suggestions</h3>
            <ul id="treatmentList"></ul>
        </div>
        <div class="card result-section" id="preventionCard">
            <h3>Preventative Care</h3>
            <ul id="preventionList"></ul>
        </div>
    </div>

    <script>
        const uploadArea = document.getElementById('uploadArea');
        const fileInput = document.getElementById('fileInput');
        const previewImage = document.getElementById('previewImage');
        const analyzeButton = document.getElementById('analyzeButton');
        const loading = document.getElementById('loading');
        const errorBanner = document.getElementById('errorBanner');
        const healthyBanner = document.getElementById('healthyBanner');
        const diseaseBanner = document.getElementById('diseaseBanner');

        uploadArea.addEventListener('click', () => fileInput.click());
        uploadArea.addEventListener('dragover', (e) => {
            e.preventDefault();
            uploadArea.classList.add('dragover');
        });
        uploadArea.addEventListener('dragleave', () => uploadArea.classList.remove('dragover'));
        uploadArea.addEventListener('drop', (e) => {
            e.preventDefault();
            uploadArea.classList.remove('dragover');
            const file = e.dataTransfer.files[0];
            if (file && file.type.startsWith('image/')) selectFile(file);
        });
        fileInput.addEventListener('change', (e) => {
            if (e.target.files[0]) selectFile(e.target.files[0]);
        });

        function clearResult() {
            errorBanner.style.display = 'none';
            healthyBanner.style.display = 'none';
            diseaseBanner.style.display = 'none';
            for (const id of ['descriptionCard', 'treatmentCard', 'preventionCard']) {
                document.getElementById(id).style.display = 'none';
            }
        }

        function showError(message) {
            errorBanner.textContent = message;
            errorBanner.style.display = 'block';
        }

        async function selectFile(file) {
            clearResult();

            const reader = new FileReader();
            reader.onload = (e) => {
                previewImage.src = e.target.result;
                previewImage.hidden = false;
            };
            reader.readAsDataURL(file);

            const formData = new FormData();
            formData.append('image', file);
            try {
                const response = await fetch('/select', { method: 'POST', body: formData });
                if (!response.ok) {
                    const body = await response.json();
                    showError(body.message);
                    return;
                }
                analyzeButton.disabled = false;
            } catch (err) {
                showError('Could not upload the image. Please try again.');
            }
        }

        analyzeButton.addEventListener('click', async () => {
            clearResult();
            analyzeButton.disabled = true;
            loading.style.display = 'block';

            try {
                const response = await fetch('/analyze', { method: 'POST' });
                const body = await response.json();
                if (!response.ok) {
                    showError(body.message);
                    return;
                }
                render(body);
            } catch (err) {
                showError('Something went wrong. Please try again.');
            } finally {
                loading.style.display = 'none';
                analyzeButton.disabled = false;
            }
        });

        function render(status) {
            if (status.status === 'failed') {
                showError(status.message);
                return;
            }
            if (status.status !== 'succeeded') return;

            const result = status.result;
            if (result.kind === 'healthy') {
                healthyBanner.textContent = result.message ||
                    'Your plant appears to be healthy and free of common diseases.';
                healthyBanner.style.display = 'block';
            } else if (result.kind === 'diseased') {
                diseaseBanner.textContent = 'Disease Detected: ' + result.diseaseName;
                diseaseBanner.style.display = 'block';
                document.getElementById('descriptionText').textContent = result.description;
                document.getElementById('descriptionCard').style.display = 'block';
                fillList('treatmentCard', 'treatmentList', result.treatmentSuggestions);
                fillList('preventionCard', 'preventionList', result.preventativeCare);
            } else {
                showError('The analysis did not produce a diagnosis. Please try another photo.');
            }
        }

        function fillList(cardId, listId, items) {
            if (!items || items.length === 0) return;
            const list = document.getElementById(listId);
            list.innerHTML = '';
            for (const item of items) {
                const li = document.createElement('li');
                li.textContent = item;
                list.appendChild(li);
            }
            document.getElementById(cardId).style.display = 'block';
        }
    </script>
</body>
</html>
"#;
