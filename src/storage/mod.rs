pub mod minio;

pub use minio::MinioStorage;

use crate::error::AppResult;

/// 存储抽象接口
#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    /// 上传文件，返回 ETag
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: Option<&str>,
    ) -> AppResult<String>;

    /// 对象的访问地址（路径样式）
    fn object_url(&self, bucket: &str, key: &str) -> String;

    /// 健康检查
    async fn health_check(&self) -> AppResult<bool>;
}

/// 拼接路径样式的对象地址
pub fn path_style_url(base: &str, bucket: &str, key: &str) -> String {
    format!(
        "{}/{}/{}",
        base.trim_end_matches('/'),
        bucket,
        key.trim_start_matches('/')
    )
}
