use crate::utils::error::DetectorError;
use crate::Result;
use axum::body::Bytes;
use base64::Engine;
use image::{DynamicImage, GenericImageView, ImageFormat};
use serde::Serialize;
use std::path::Path;

/// 允许上传的图片类型（jpg / jpeg / png）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Jpeg,
    Png,
}

impl ImageKind {
    /// 根据文件扩展名判断类型，扩展名不区分大小写
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ImageKind::Jpeg),
            "png" => Some(ImageKind::Png),
            _ => None,
        }
    }

    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let mime = content_type.split(';').next().unwrap_or("").trim();
        match mime.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(ImageKind::Jpeg),
            "image/png" => Some(ImageKind::Png),
            _ => None,
        }
    }

    fn from_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(ImageKind::Jpeg),
            ImageFormat::Png => Some(ImageKind::Png),
            _ => None,
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
        }
    }

    fn image_format(&self) -> ImageFormat {
        match self {
            ImageKind::Jpeg => ImageFormat::Jpeg,
            ImageKind::Png => ImageFormat::Png,
        }
    }
}

/// 一次请求中上传的原始图片，渲染完成后即丢弃
#[derive(Debug, Clone)]
pub struct UploadedImage {
    bytes: Bytes,
    kind: ImageKind,
    filename: Option<String>,
}

impl UploadedImage {
    /// 校验上传内容并确定图片类型。
    ///
    /// 声明的类型（扩展名、Content-Type）与嗅探到的文件头都必须是JPEG或PNG。
    /// 文件头无法识别时沿用声明的类型，交给解码阶段报错。
    pub fn new(
        bytes: impl Into<Bytes>,
        filename: Option<&str>,
        content_type: Option<&str>,
        max_bytes: usize,
    ) -> Result<Self> {
        let bytes = bytes.into();

        if bytes.is_empty() {
            return Err(DetectorError::InvalidInput("Empty file".to_string()));
        }
        if bytes.len() > max_bytes {
            return Err(DetectorError::FileTooLarge(bytes.len(), max_bytes));
        }

        let mut declared = None;

        if let Some(ext) = filename
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
        {
            match ImageKind::from_extension(ext) {
                Some(kind) => declared = Some(kind),
                None => {
                    return Err(DetectorError::UnsupportedFormat(format!(
                        "file extension '.{}', expected jpg, jpeg or png",
                        ext
                    )))
                }
            }
        }

        // 浏览器对未知文件常发送 application/octet-stream，此时只依赖扩展名和文件头
        if let Some(content_type) = content_type.filter(|ct| ct.starts_with("image/")) {
            match ImageKind::from_content_type(content_type) {
                Some(kind) => declared = declared.or(Some(kind)),
                None => return Err(DetectorError::UnsupportedFormat(content_type.to_string())),
            }
        }

        let kind = match image::guess_format(&bytes) {
            Ok(format) => ImageKind::from_format(format).ok_or_else(|| {
                DetectorError::UnsupportedFormat(format!("{:?} image data", format))
            })?,
            Err(_) => declared.ok_or_else(|| {
                DetectorError::UnsupportedFormat("unrecognized image data".to_string())
            })?,
        };

        Ok(Self {
            bytes,
            kind,
            filename: filename.map(str::to_string),
        })
    }

    /// 从base64字符串加载图片，支持 data URL 前缀 (data:image/xxx;base64,)
    pub fn from_base64(data: &str, filename: Option<&str>, max_bytes: usize) -> Result<Self> {
        let (content_type, payload) = match data.strip_prefix("data:") {
            Some(rest) => match rest.split_once(',') {
                Some((header, payload)) => (header.split(';').next(), payload),
                None => (None, rest),
            },
            None => (None, data),
        };

        let payload = payload.trim();
        if payload.is_empty() {
            return Err(DetectorError::InvalidInput("Empty image data".to_string()));
        }

        // 先按解码后大小上限粗略拦截，避免解码超大字符串
        if payload.len() / 4 * 3 > max_bytes.saturating_add(3) {
            return Err(DetectorError::FileTooLarge(payload.len() / 4 * 3, max_bytes));
        }

        let bytes = base64::engine::general_purpose::STANDARD.decode(payload)?;

        Self::new(bytes, filename, content_type, max_bytes)
    }

    pub fn kind(&self) -> ImageKind {
        self.kind
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// 原始文件大小（字节）
    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }

    /// 解码图片
    pub fn decode(&self) -> Result<DynamicImage> {
        let image = image::load_from_memory_with_format(&self.bytes, self.kind.image_format())?;

        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(DetectorError::InvalidInput(format!(
                "Image has zero area: {}x{}",
                width, height
            )));
        }

        Ok(image)
    }

    /// 用于页面预览的 data URL
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.kind.mime(),
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

/// 一次交互的输入：没有上传，或者上传了一张图片
#[derive(Debug, Clone)]
pub enum Upload {
    NoInput,
    Image(UploadedImage),
}
