//! 编排器构建器：按配置组装曲库链
//!
//! 启动时执行一次：建共享 HTTP 客户端、按开关创建各曲库、检查外部工具。
//! 工具缺失属于配置错误，在这里直接失败，而不是留到每个查询。

use std::path::PathBuf;
use std::sync::Arc;

use reqwest::Client;

use crate::config::AppConfig;
use crate::core::{FallbackOrchestrator, SetupError};
use crate::providers::{
    check_tooling, LicensedCatalog, OpenSearchFallback, PrimaryCatalog, ProviderAdapter,
};

/// 编排器构建器：可追加自定义曲库（测试或扩展用）
pub struct OrchestratorBuilder {
    config: AppConfig,
    extra: Vec<Arc<dyn ProviderAdapter>>,
    work_root: Option<PathBuf>,
}

impl OrchestratorBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            extra: Vec::new(),
            work_root: None,
        }
    }

    /// 覆盖配置中的工作目录根
    pub fn with_work_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.work_root = Some(root.into());
        self
    }

    /// 追加一个曲库；与配置创建的同名曲库冲突时，配置创建的优先
    pub fn with_provider(mut self, provider: Arc<dyn ProviderAdapter>) -> Self {
        self.extra.push(provider);
        self
    }

    /// 共享 HTTP 客户端（连接池在进程内复用，查询之间不共享任何状态）
    pub fn build_http_client(&self) -> Result<Client, SetupError> {
        Client::builder()
            .user_agent(self.config.app.user_agent())
            .connect_timeout(self.config.timeouts.search())
            .build()
            .map_err(|e| SetupError::HttpClient(e.to_string()))
    }

    /// 按配置开关创建曲库链
    pub fn build_providers(&self) -> Result<Vec<Arc<dyn ProviderAdapter>>, SetupError> {
        let cfg = &self.config;
        let mut providers: Vec<Arc<dyn ProviderAdapter>> = Vec::new();
        let needs_http = cfg.providers.primary.enabled || cfg.providers.licensed.enabled;
        let client = if needs_http {
            Some(self.build_http_client()?)
        } else {
            None
        };

        if let Some(client) = &client {
            if cfg.providers.primary.enabled {
                providers.push(Arc::new(PrimaryCatalog::new(
                    client.clone(),
                    &cfg.providers.primary,
                    &cfg.timeouts,
                )));
            }
            if cfg.providers.licensed.enabled {
                if cfg.providers.licensed.license_token.is_none() {
                    tracing::warn!("licensed catalog enabled without license_token; it will always fall through");
                }
                providers.push(Arc::new(LicensedCatalog::new(
                    client.clone(),
                    &cfg.providers.licensed,
                    &cfg.timeouts,
                )));
            }
        }
        if cfg.providers.open_search.enabled {
            let (extractor, converter) = check_tooling(&cfg.providers.open_search)?;
            providers.push(Arc::new(OpenSearchFallback::new(
                &cfg.providers.open_search,
                &cfg.timeouts,
                extractor,
                converter,
            )));
        }
        Ok(providers)
    }

    pub fn build(self) -> Result<FallbackOrchestrator, SetupError> {
        let mut providers = self.build_providers()?;
        providers.extend(self.extra);
        let work_root = self
            .work_root
            .unwrap_or_else(|| self.config.app.work_root());
        let ids: Vec<&str> = providers.iter().map(|p| p.id().as_str()).collect();
        tracing::info!(providers = ?ids, work_root = %work_root.display(), "orchestrator ready");
        FallbackOrchestrator::new(providers, work_root, self.config.timeouts.attempt())
    }
}

/// 便捷函数：加载配置并构建编排器
pub fn create_orchestrator(config_path: Option<PathBuf>) -> Result<FallbackOrchestrator, SetupError> {
    let config = crate::config::load_config(config_path)?;
    OrchestratorBuilder::new(config).build()
}
