use crate::{
    diagnosis::Diagnosis,
    image::Upload,
    utils::error::DetectorError,
    web::{
        extractors::RequestId,
        handlers::{read_upload, run_prediction},
        AppState,
    },
};
use axum::{
    extract::{Multipart, State},
    http::header,
    response::{Html, IntoResponse, Response},
};
use std::fmt::Write;

/// 未上传图片时的提示
pub const UPLOAD_PROMPT: &str = "📤 Please upload a plant leaf image to begin detection.";

/// 一次交互的页面状态
#[derive(Debug)]
pub enum ViewState {
    NoImage,
    Result {
        preview_url: String,
        filename: Option<String>,
        diagnosis: Diagnosis,
    },
    Failed {
        message: String,
    },
}

/// 首页处理器
pub async fn index_handler() -> Html<String> {
    Html(render_page(&ViewState::NoImage))
}

/// 表单上传处理器：没有文件时只渲染提示，不做任何推理
pub async fn upload_page_handler(
    RequestId(request_id): RequestId,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Response {
    let limits = &state.config.server_config;
    let upload = match read_upload(&mut multipart, limits.max_request_size, limits.max_upload_bytes).await {
        Ok(upload) => upload,
        Err(e) => return failed_page(&request_id, e),
    };

    let view = match upload {
        Upload::NoInput => ViewState::NoImage,
        Upload::Image(image) => {
            let preview_url = image.to_data_url();
            let filename = image.filename().map(str::to_string);

            match run_prediction(&state, &request_id, image).await {
                Ok(diagnosis) => ViewState::Result {
                    preview_url,
                    filename,
                    diagnosis,
                },
                Err(e) => return failed_page(&request_id, e),
            }
        }
    };

    Html(render_page(&view)).into_response()
}

fn failed_page(request_id: &str, error: DetectorError) -> Response {
    let status = error.status_code();
    if status.is_server_error() {
        tracing::error!("Page request failed: request_id={}, error={}", request_id, error);
    } else {
        tracing::warn!("Page request rejected: request_id={}, error={}", request_id, error);
    }

    let view = ViewState::Failed {
        message: format!("Could not process image: {}", error),
    };
    (status, Html(render_page(&view))).into_response()
}

/// 样式文件处理器
pub async fn style_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        include_str!("../../templates/style.css"),
    )
}

/// 渲染完整页面
pub fn render_page(view: &ViewState) -> String {
    let mut body = String::new();

    match view {
        ViewState::NoImage => {
            let _ = write!(body, r#"<div class="warning">{}</div>"#, escape_html(UPLOAD_PROMPT));
        }
        ViewState::Result {
            preview_url,
            filename,
            diagnosis,
        } => render_result(&mut body, preview_url, filename.as_deref(), diagnosis),
        ViewState::Failed { message } => {
            let _ = write!(body, r#"<div class="error-box">⚠️ {}</div>"#, escape_html(message));
        }
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Plant Disease Detector 🌱</title>
    <link rel="stylesheet" href="/static/style.css">
</head>
<body>
    <aside class="sidebar">
        <h2>🌿 About Project</h2>
        <h3>📘 Plant Disease Detection</h3>
        <p>Detects common plant leaf diseases using <b>Deep Learning (CNN)</b>.
        Upload an image of a plant leaf and get instant predictions with confidence levels.</p>
        <hr>
        <p><b>🧠 Technology:</b> ONNX Runtime | Rust</p>
        <p><b>🎯 Goal:</b> Early detection of plant diseases for sustainable farming 🌾</p>
    </aside>
    <main class="main">
        <h1>🍃 Smart Plant Disease Detection System</h1>
        <p class="subtitle">Upload a <b>plant leaf image</b> below to detect the disease and get treatment suggestions instantly.</p>

        <form id="uploadForm" method="post" action="/" enctype="multipart/form-data">
            <label class="upload-area" for="fileInput">📤 Upload a leaf image <span class="upload-hint">(jpg, jpeg, png)</span></label>
            <input type="file" id="fileInput" name="file" accept=".jpg,.jpeg,.png,image/jpeg,image/png">
            <button class="btn" type="submit">🔍 Detect Disease</button>
        </form>

        <div class="loading" id="loading">
            <div class="spinner"></div>
            <span>🔍 Analyzing the leaf...</span>
        </div>

        <section id="state">
{body}
        </section>
    </main>
    <footer>© Plant Disease Detection 💚</footer>
    <script>
        document.getElementById('uploadForm').addEventListener('submit', () => {{
            document.getElementById('loading').style.display = 'block';
            document.getElementById('state').style.display = 'none';
        }});
    </script>
</body>
</html>"#
    )
}

fn render_result(out: &mut String, preview_url: &str, filename: Option<&str>, diagnosis: &Diagnosis) {
    let caption = filename.unwrap_or("Uploaded Image");
    let _ = write!(
        out,
        r#"<figure class="preview"><img src="{}" alt="Uploaded leaf"><figcaption>🌿 {}</figcaption></figure>"#,
        escape_html(preview_url),
        escape_html(caption)
    );

    let _ = write!(
        out,
        r#"<div class="result-box">✅ Predicted Disease: <b>{}</b><br>📊 Confidence: <b>{}</b></div>"#,
        escape_html(diagnosis.class_name),
        diagnosis.prediction.confidence_label()
    );

    let _ = write!(
        out,
        r#"<h3>🩺 Disease Information</h3><div class="info-box">{}</div>"#,
        render_emphasis(&escape_html(diagnosis.advisory))
    );

    out.push_str(r#"<h3>📊 Model Confidence Levels</h3><div class="chart">"#);
    for entry in &diagnosis.scores {
        let width = (entry.score * 100.0).clamp(0.0, 100.0);
        let _ = write!(
            out,
            r#"<div class="bar-row"><span class="bar-label">{}</span><div class="bar-track"><div class="bar" style="width: {:.1}%"></div></div><span class="bar-value">{:.4}</span></div>"#,
            escape_html(entry.label),
            width,
            entry.score
        );
    }
    out.push_str("</div>");
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// 把成对的 `*text*` 渲染为斜体
fn render_emphasis(text: &str) -> String {
    let mut parts = text.split('*');
    let mut out = parts.next().unwrap_or_default().to_string();
    let rest: Vec<&str> = parts.collect();

    let mut chunks = rest.chunks_exact(2);
    for pair in &mut chunks {
        let _ = write!(out, "<em>{}</em>{}", pair[0], pair[1]);
    }
    // 没有配对的星号原样保留
    if let [last] = chunks.remainder() {
        out.push('*');
        out.push_str(last);
    }
    out
}
