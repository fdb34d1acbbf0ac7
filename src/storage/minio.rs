use super::{Storage, path_style_url};
use crate::{
    config::MinioConfig,
    error::{AppError, AppResult},
};
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::{
    Client,
    config::Credentials,
    primitives::ByteStream,
    types::{BucketLocationConstraint, CreateBucketConfiguration},
};
use std::sync::Arc;

/// MinIO存储实现
#[derive(Debug, Clone)]
pub struct MinioStorage {
    client: Arc<Client>,
    config: MinioConfig,
}

impl MinioStorage {
    /// 创建新的MinIO存储实例
    pub async fn new(config: MinioConfig) -> AppResult<Self> {
        // 创建自定义凭证
        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,    // session token
            None,    // expiration
            "minio", // provider name
        );

        // 构建S3配置
        let s3_config = aws_sdk_s3::Config::builder()
            .endpoint_url(&config.endpoint)
            .credentials_provider(credentials)
            .region(Region::new("us-east-1")) // MinIO默认区域
            .force_path_style(true) // MinIO需要路径样式
            .behavior_version(BehaviorVersion::latest())
            .build();

        let client = Client::from_conf(s3_config);

        Ok(Self {
            client: Arc::new(client),
            config,
        })
    }

    /// 确保bucket存在
    pub async fn ensure_bucket(&self, bucket: &str) -> AppResult<()> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => {
                tracing::debug!("Bucket '{}' 已存在", bucket);
                Ok(())
            }
            Err(_) => {
                tracing::info!("Bucket '{}' 不存在，正在创建", bucket);
                self.create_bucket(bucket).await
            }
        }
    }

    /// 创建bucket
    async fn create_bucket(&self, bucket: &str) -> AppResult<()> {
        let create_bucket_config = CreateBucketConfiguration::builder()
            .location_constraint(BucketLocationConstraint::UsEast2)
            .build();

        self.client
            .create_bucket()
            .bucket(bucket)
            .create_bucket_configuration(create_bucket_config)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("创建bucket失败: {}", e)))?;

        tracing::info!("成功创建bucket: {}", bucket);
        Ok(())
    }
}

#[async_trait::async_trait]
impl Storage for MinioStorage {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: Option<&str>,
    ) -> AppResult<String> {
        let size = data.len();
        let mut request = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(data));

        if let Some(ct) = content_type {
            request = request.content_type(ct);
        }

        let result = request
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("上传文件失败: {}", e)))?;

        let etag = result.e_tag().unwrap_or("").to_string();
        tracing::info!(
            "成功上传文件到MinIO: {}/{}, 大小: {} 字节, ETag: {}",
            bucket,
            key,
            size,
            etag
        );

        Ok(etag)
    }

    fn object_url(&self, bucket: &str, key: &str) -> String {
        path_style_url(&self.config.endpoint, bucket, key)
    }

    async fn health_check(&self) -> AppResult<bool> {
        match self.client.list_buckets().send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::error!("MinIO健康检查失败: {}", e);
                Ok(false)
            }
        }
    }
}
