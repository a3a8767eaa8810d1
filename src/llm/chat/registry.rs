use log::{ info, warn };
use std::collections::HashMap;
use std::sync::Arc;

use super::{ new_provider, ChatProvider, ProviderError };
use crate::llm::{ ProviderConfig, ProviderKind };

/// Chat providers that have credentials, keyed by vendor.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderKind, Arc<dyn ChatProvider>>,
    default_kind: Option<ProviderKind>,
}

impl ProviderRegistry {
    /// Builds a provider for every config carrying a credential. The
    /// preferred kind becomes the default when it is configured, otherwise
    /// the first configured kind in `ProviderKind::ALL` order.
    pub fn from_configs(
        configs: Vec<ProviderConfig>,
        preferred: ProviderKind
    ) -> Result<Self, ProviderError> {
        let mut providers = HashMap::new();
        for config in configs {
            if config.api_key.is_none() {
                info!("Chat provider {} not configured (no API key)", config.kind);
                continue;
            }
            let provider = new_provider(&config)?;
            info!("Chat provider {} configured: model={}", config.kind, provider.model());
            providers.insert(config.kind, provider);
        }

        let default_kind = if providers.contains_key(&preferred) {
            Some(preferred)
        } else {
            let fallback = ProviderKind::ALL.into_iter().find(|k| providers.contains_key(k));
            if let Some(kind) = fallback {
                warn!("Preferred chat provider {} has no API key, defaulting to {}", preferred, kind);
            }
            fallback
        };

        Ok(Self { providers, default_kind })
    }

    pub fn insert(&mut self, provider: Arc<dyn ChatProvider>) {
        let kind = provider.kind();
        self.providers.insert(kind, provider);
        if self.default_kind.is_none() {
            self.default_kind = Some(kind);
        }
    }

    pub fn get(&self, kind: ProviderKind) -> Option<Arc<dyn ChatProvider>> {
        self.providers.get(&kind).cloned()
    }

    pub fn default_provider(&self) -> Option<Arc<dyn ChatProvider>> {
        self.default_kind.and_then(|k| self.get(k))
    }

    /// Named lookup with fallback to the default provider when the name is
    /// absent or not recognised. A recognised but unconfigured name yields
    /// `None`.
    pub fn resolve(&self, name: Option<&str>) -> Option<Arc<dyn ChatProvider>> {
        match name.map(str::parse::<ProviderKind>) {
            Some(Ok(kind)) => self.get(kind),
            _ => self.default_provider(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn configured(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL
            .into_iter()
            .filter(|k| self.providers.contains_key(k))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(kind: ProviderKind, key: Option<&str>) -> ProviderConfig {
        ProviderConfig::new(kind, key.map(str::to_string), "sys")
    }

    #[test]
    fn skips_providers_without_keys() {
        let registry = ProviderRegistry::from_configs(
            vec![config(ProviderKind::Gemini, None), config(ProviderKind::Anthropic, Some("sk-ant"))],
            ProviderKind::Gemini
        ).unwrap();

        assert_eq!(registry.configured(), vec![ProviderKind::Anthropic]);
        let default = registry.default_provider().unwrap();
        assert_eq!(default.kind(), ProviderKind::Anthropic);
    }

    #[test]
    fn resolve_prefers_named_then_default() {
        let registry = ProviderRegistry::from_configs(
            vec![config(ProviderKind::Gemini, Some("g")), config(ProviderKind::Together, Some("t"))],
            ProviderKind::Gemini
        ).unwrap();

        assert_eq!(registry.resolve(Some("together")).unwrap().kind(), ProviderKind::Together);
        assert_eq!(registry.resolve(None).unwrap().kind(), ProviderKind::Gemini);
        assert_eq!(registry.resolve(Some("mystery")).unwrap().kind(), ProviderKind::Gemini);
        assert!(registry.resolve(Some("claude")).is_none());
    }

    #[test]
    fn empty_registry_has_no_default() {
        let registry = ProviderRegistry::from_configs(Vec::new(), ProviderKind::Gemini).unwrap();
        assert!(registry.is_empty());
        assert!(registry.default_provider().is_none());
    }
}
