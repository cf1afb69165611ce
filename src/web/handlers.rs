use crate::{
    diagnosis::{Diagnosis, DiagnosisPipeline},
    image::{Upload, UploadedImage},
    utils::error::DetectorError,
    web::{
        extractors::{RequestId, ValidatedJson},
        AppState,
    },
    Result,
};
use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};

/// JSON请求体（base64模式）
#[derive(Debug, Deserialize)]
pub struct PredictJsonRequest {
    /// Base64编码的图像数据，可带 data URL 前缀
    pub image: String,

    /// 原始文件名，用于校验扩展名
    #[serde(default)]
    pub filename: Option<String>,
}

/// JSON成功响应格式；失败时由 `DetectorError` 渲染错误体
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    pub timestamp: String,
    pub request_id: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T, request_id: String) -> Self {
        Self {
            success: true,
            data,
            timestamp: chrono::Utc::now().to_rfc3339(),
            request_id,
        }
    }
}

/// 读取multipart错误；请求体超过上限时报告为文件过大
fn multipart_error(
    e: MultipartError,
    context: &str,
    request_limit: usize,
    max_bytes: usize,
) -> DetectorError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        DetectorError::FileTooLarge(request_limit, max_bytes)
    } else {
        DetectorError::InvalidInput(format!("{}: {}", context, e))
    }
}

/// 读取multipart表单中的 `file` 字段。
///
/// 表单没有文件字段，或文件内容为空（浏览器未选择文件时的提交）时返回 `Upload::NoInput`。
pub async fn read_upload(
    multipart: &mut Multipart,
    request_limit: usize,
    max_bytes: usize,
) -> Result<Upload> {
    let mut upload = Upload::NoInput;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        multipart_error(e, "Failed to read multipart field", request_limit, max_bytes)
    })? {
        let field_name = field.name().unwrap_or("unknown").to_string();

        if field_name != "file" {
            tracing::debug!("Ignoring unknown field: {}", field_name);
            continue;
        }

        let filename = field
            .file_name()
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        let content_type = field.content_type().map(str::to_string);

        let data = field.bytes().await.map_err(|e| {
            multipart_error(e, "Failed to read file data", request_limit, max_bytes)
        })?;

        if data.is_empty() {
            continue;
        }

        tracing::debug!(
            "Received file: name={:?}, type={:?}, {} bytes",
            filename,
            content_type,
            data.len()
        );

        let image = UploadedImage::new(data, filename.as_deref(), content_type.as_deref(), max_bytes)?;
        upload = Upload::Image(image);
    }

    Ok(upload)
}

pub(crate) async fn run_prediction(
    state: &AppState,
    request_id: &str,
    upload: UploadedImage,
) -> Result<Diagnosis> {
    tracing::info!(
        "Processing prediction: request_id={}, file={:?}, format={:?}, bytes={}",
        request_id,
        upload.filename(),
        upload.kind(),
        upload.size_bytes()
    );

    let diagnosis = DiagnosisPipeline::diagnose(state.model.clone(), upload).await?;

    tracing::info!(
        "Prediction completed: request_id={}, class={}, confidence={:.2}%, time={:.3}s",
        request_id,
        diagnosis.class_name,
        diagnosis.confidence,
        diagnosis.processing_time
    );

    Ok(diagnosis)
}

/// JSON base64上传处理器
pub async fn predict_json_handler(
    RequestId(request_id): RequestId,
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<PredictJsonRequest>,
) -> Result<Json<ApiResponse<Diagnosis>>> {
    let upload = UploadedImage::from_base64(
        &request.image,
        request.filename.as_deref(),
        state.config.server_config.max_upload_bytes,
    )?;

    let diagnosis = run_prediction(&state, &request_id, upload).await?;

    Ok(Json(ApiResponse::success(diagnosis, request_id)))
}

/// Multipart文件上传处理器
pub async fn predict_upload_handler(
    RequestId(request_id): RequestId,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<Diagnosis>>> {
    let limits = &state.config.server_config;
    let upload = read_upload(&mut multipart, limits.max_request_size, limits.max_upload_bytes).await?;

    let image = match upload {
        Upload::Image(image) => image,
        Upload::NoInput => {
            return Err(DetectorError::InvalidInput("No image file provided".to_string()))
        }
    };

    let diagnosis = run_prediction(&state, &request_id, image).await?;

    Ok(Json(ApiResponse::success(diagnosis, request_id)))
}
