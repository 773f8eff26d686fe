use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{AppConfig, ProviderEntry};
use crate::errors::{DroidClawError, DroidClawResult};
use crate::llm::provider::LlmProvider;
use crate::llm::providers::openai_compatible::OpenAiCompatibleProvider;
use crate::llm::types::EndpointConfig;

/// Registry of all configured LLM providers, keyed by their config.toml identifier.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    endpoints: HashMap<String, EndpointConfig>,
    active: String,
}

impl ProviderRegistry {
    pub fn new(active: String) -> Self {
        Self {
            providers: HashMap::new(),
            endpoints: HashMap::new(),
            active,
        }
    }

    pub fn register(&mut self, provider: Arc<dyn LlmProvider>, endpoint: EndpointConfig) {
        let name = provider.name().to_string();
        self.endpoints.insert(name.clone(), endpoint);
        self.providers.insert(name, provider);
    }

    /// The active provider together with the endpoint it was built for.
    pub fn get_active(&self) -> DroidClawResult<(Arc<dyn LlmProvider>, EndpointConfig)> {
        let provider = self.providers.get(&self.active).cloned();
        let endpoint = self.endpoints.get(&self.active).cloned();
        match (provider, endpoint) {
            (Some(p), Some(e)) => Ok((p, e)),
            _ => Err(DroidClawError::Config(format!(
                "Active provider '{}' not found in registry",
                self.active
            ))),
        }
    }

    pub fn set_active(&mut self, name: String) -> DroidClawResult<()> {
        if self.providers.contains_key(&name) {
            self.active = name;
            Ok(())
        } else {
            Err(DroidClawError::Config(format!("Provider '{name}' not registered")))
        }
    }

    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Build a registry from the loaded app config.
    /// API keys are read from environment variables named `DROIDCLAW_<ID>_API_KEY`,
    /// falling back to the key stored in config.toml.
    pub fn from_config(config: &AppConfig) -> DroidClawResult<Self> {
        let mut registry = Self::new(config.llm.active_provider.clone());
        for (id, entry) in &config.llm.providers {
            let env_key = std::env::var(api_key_env_var(id)).ok();
            let endpoint = endpoint_for(entry, env_key);
            if endpoint.api_key.is_empty() {
                tracing::warn!(provider = %id, "no API key configured");
            }
            let provider = OpenAiCompatibleProvider::new(
                id.clone(),
                Duration::from_secs(entry.connect_timeout_secs),
                Duration::from_secs(entry.read_timeout_secs),
            )?;
            registry.register(Arc::new(provider), endpoint);
        }
        tracing::info!(providers = ?registry.list_names(), active = %registry.active, "provider registry ready");
        Ok(registry)
    }
}

pub fn api_key_env_var(provider_id: &str) -> String {
    format!("DROIDCLAW_{}_API_KEY", provider_id.to_uppercase())
}

fn endpoint_for(entry: &ProviderEntry, env_key: Option<String>) -> EndpointConfig {
    EndpointConfig {
        base_url: entry.api_base.clone(),
        api_key: env_key
            .filter(|k| !k.trim().is_empty())
            .or_else(|| entry.api_key.clone())
            .unwrap_or_default(),
        model: entry.model.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(api_key: Option<&str>) -> ProviderEntry {
        ProviderEntry {
            display_name: "Zhipu".into(),
            api_base: "https://open.bigmodel.cn/api/paas/v4/".into(),
            model: "glm-4v-plus".into(),
            api_key: api_key.map(String::from),
            connect_timeout_secs: 60,
            read_timeout_secs: 60,
        }
    }

    #[test]
    fn env_key_wins_over_config_key() {
        let ep = endpoint_for(&entry(Some("from-file")), Some("from-env".into()));
        assert_eq!(ep.api_key, "from-env");
        let ep = endpoint_for(&entry(Some("from-file")), Some("  ".into()));
        assert_eq!(ep.api_key, "from-file");
        let ep = endpoint_for(&entry(None), None);
        assert_eq!(ep.api_key, "");
        assert_eq!(ep.chat_completions_url(), "https://open.bigmodel.cn/api/paas/v4/chat/completions");
    }

    #[test]
    fn env_var_name_is_uppercased() {
        assert_eq!(api_key_env_var("zhipu"), "DROIDCLAW_ZHIPU_API_KEY");
    }

    #[test]
    fn unknown_active_provider_is_a_config_error() {
        let toml = r#"
[llm]
active_provider = "missing"

[llm.providers.zhipu]
display_name = "Zhipu"
api_base = "https://open.bigmodel.cn/api/paas/v4"
model = "glm-4v-plus"
api_key = "k"
"#;
        let cfg: AppConfig = toml::from_str(toml).unwrap();
        let mut registry = ProviderRegistry::from_config(&cfg).unwrap();
        assert!(matches!(registry.get_active(), Err(DroidClawError::Config(_))));
        assert_eq!(registry.list_names(), vec!["zhipu".to_string()]);

        registry.set_active("zhipu".into()).unwrap();
        let (provider, endpoint) = registry.get_active().unwrap();
        assert_eq!(provider.name(), "zhipu");
        assert_eq!(endpoint.model, "glm-4v-plus");
    }
}
