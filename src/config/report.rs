use serde::{Deserialize, Serialize};

/// 报告生成配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// 报告文件存放的bucket
    pub bucket: String,
    /// 对象key前缀
    pub key_prefix: String,
    /// 同时运行的生成任务上限
    pub max_concurrent_jobs: u32,
    /// 对外访问地址（为空时使用存储endpoint拼接路径样式URL）
    pub public_base_url: Option<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            bucket: "coursehub-reports".to_string(),
            key_prefix: "reports".to_string(),
            max_concurrent_jobs: 4,
            public_base_url: None,
        }
    }
}

impl ReportConfig {
    /// 验证配置的有效性
    pub fn validate(&self) -> Result<(), String> {
        if self.bucket.is_empty() {
            return Err("报告bucket不能为空".to_string());
        }

        if self.max_concurrent_jobs == 0 || self.max_concurrent_jobs > 64 {
            return Err("报告并发生成数应在1-64之间".to_string());
        }

        if let Some(url) = &self.public_base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("public_base_url 必须以 http:// 或 https:// 开头".to_string());
            }
        }

        Ok(())
    }

    /// 生成报告文件的对象key
    pub fn object_key(&self, report_type: &str, file_stem: &str, extension: &str) -> String {
        let prefix = self.key_prefix.trim_matches('/');
        if prefix.is_empty() {
            format!("{}/{}.{}", report_type, file_stem, extension)
        } else {
            format!("{}/{}/{}.{}", prefix, report_type, file_stem, extension)
        }
    }
}
