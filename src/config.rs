use crate::utils::error::DetectorError;
use crate::Result;
use std::path::PathBuf;

/// 默认模型文件路径
pub const DEFAULT_MODEL_PATH: &str = "model/plant_disease_model.onnx";

/// multipart边界和表单字段的额外开销
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    /// 服务器绑定地址
    pub bind_addr: String,

    /// 模型文件路径
    pub model_path: PathBuf,

    /// 开发模式
    pub dev_mode: bool,

    /// ONNX Runtime配置
    pub onnx_config: OnnxConfig,

    /// 服务器配置
    pub server_config: ServerConfig,
}

#[derive(Debug, Clone)]
pub struct OnnxConfig {
    /// CPU线程数
    pub intra_threads: usize,

    /// 优化级别
    pub optimization_level: i32,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// 请求超时时间（秒）
    pub request_timeout: u64,

    /// 最大请求体大小（字节）
    pub max_request_size: usize,

    /// 单张上传图片的最大字节数
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn new(
        bind_addr: String,
        model_path: impl Into<PathBuf>,
        threads: Option<usize>,
        max_upload_mb: usize,
        dev_mode: bool,
    ) -> Result<Self> {
        let cpu_cores = num_cpus::get();

        let onnx_config = OnnxConfig {
            intra_threads: threads.unwrap_or((cpu_cores * 3 / 4).max(1)), // 默认75%的CPU核心
            optimization_level: 3,
        };

        let too_large =
            || DetectorError::Config(format!("Upload limit of {} MB is too large", max_upload_mb));
        let max_upload_bytes = max_upload_mb.checked_mul(1024 * 1024).ok_or_else(too_large)?;
        // base64编码会膨胀约4/3
        let max_request_size = (max_upload_bytes / 3)
            .checked_mul(4)
            .and_then(|size| size.checked_add(MULTIPART_OVERHEAD))
            .ok_or_else(too_large)?;

        let server_config = ServerConfig {
            request_timeout: if dev_mode { 300 } else { 60 },
            max_request_size,
            max_upload_bytes,
        };

        let config = Self {
            bind_addr,
            model_path: model_path.into(),
            dev_mode,
            onnx_config,
            server_config,
        };
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.bind_addr.trim().is_empty() {
            return Err(DetectorError::Config("Bind address cannot be empty".to_string()));
        }
        if self.server_config.max_upload_bytes == 0 {
            return Err(DetectorError::Config(
                "Upload limit must be at least 1 MB".to_string(),
            ));
        }
        if self.onnx_config.intra_threads == 0 {
            return Err(DetectorError::Config(
                "Intra-op thread count must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8501".to_string(),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            dev_mode: false,
            onnx_config: OnnxConfig {
                intra_threads: 1,
                optimization_level: 3,
            },
            server_config: ServerConfig {
                request_timeout: 60,
                max_request_size: 10 * 1024 * 1024 / 3 * 4 + MULTIPART_OVERHEAD,
                max_upload_bytes: 10 * 1024 * 1024,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_derives_limits_from_upload_size() {
        let config = Config::new("127.0.0.1:0".into(), "m.onnx", Some(2), 4, false).unwrap();
        assert_eq!(config.server_config.max_upload_bytes, 4 * 1024 * 1024);
        assert!(config.server_config.max_request_size > config.server_config.max_upload_bytes);
        assert_eq!(config.server_config.request_timeout, 60);
        assert_eq!(config.onnx_config.intra_threads, 2);
    }

    #[test]
    fn oversized_upload_limit_is_a_config_error() {
        for mb in [usize::MAX / 1024, usize::MAX / (1024 * 1024)] {
            let result = Config::new("127.0.0.1:0".into(), "m.onnx", Some(1), mb, false);
            assert!(matches!(result, Err(DetectorError::Config(_))), "{mb} MB");
        }
    }

    #[test]
    fn dev_mode_extends_timeout() {
        let config = Config::new("127.0.0.1:0".into(), "m.onnx", None, 10, true).unwrap();
        assert_eq!(config.server_config.request_timeout, 300);
        assert!(config.onnx_config.intra_threads >= 1);
    }

    #[test]
    fn rejects_zero_upload_limit() {
        let err = Config::new("127.0.0.1:0".into(), "m.onnx", None, 0, false).unwrap_err();
        assert!(matches!(err, DetectorError::Config(_)));
    }

    #[test]
    fn rejects_empty_bind_address() {
        let err = Config::new("  ".into(), "m.onnx", None, 10, false).unwrap_err();
        assert!(matches!(err, DetectorError::Config(_)));
    }
}
