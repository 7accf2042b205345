use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use crate::errors::HarnessError;
use crate::model::{ModelRef, ProviderId};
use crate::provider::ProviderAdapter;
use crate::relay::RelayBuilder;

/// Immutable id-to-adapter map shared by every relay.
pub(crate) struct ProviderRegistry {
    adapters: HashMap<ProviderId, Arc<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
    pub(crate) fn provider(&self, id: &ProviderId) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters.get(id).cloned()
    }
}

/// Starts relays against registered providers. Clones share one registry,
/// so a single harness serves every request of the process.
#[derive(Clone)]
pub struct Harness {
    registry: Arc<ProviderRegistry>,
}

impl Harness {
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder::default()
    }

    /// Starts building a relay against the given model.
    pub fn relay(&self, model: ModelRef) -> RelayBuilder {
        RelayBuilder::new(self.registry.clone(), model)
    }

    /// Checks that `model` names a registered provider and a model, so a
    /// misconfigured process fails at startup rather than on every request.
    pub fn check_model(&self, model: &ModelRef) -> Result<(), HarnessError> {
        if model.model.trim().is_empty() {
            return Err(HarnessError::Validation("model must not be empty".into()));
        }
        match self.registry.provider(&model.provider) {
            Some(_) => Ok(()),
            None => Err(HarnessError::ProviderNotFound {
                provider: model.provider.clone(),
            }),
        }
    }
}

#[derive(Default)]
pub struct HarnessBuilder {
    adapters: Vec<Arc<dyn ProviderAdapter>>,
}

impl HarnessBuilder {
    /// Adds an adapter. Ids must be unique across the harness.
    pub fn register_provider(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.adapters.push(adapter);
        self
    }

    pub fn build(self) -> Result<Harness, HarnessError> {
        let mut adapters = HashMap::with_capacity(self.adapters.len());
        for adapter in self.adapters {
            match adapters.entry(adapter.id()) {
                Entry::Occupied(taken) => {
                    return Err(HarnessError::Config(format!(
                        "provider {} registered twice",
                        taken.key()
                    )));
                }
                Entry::Vacant(slot) => {
                    slot.insert(adapter);
                }
            }
        }
        Ok(Harness {
            registry: Arc::new(ProviderRegistry { adapters }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ProviderError;
    use crate::provider::{ProviderRequest, ProviderStreamHandle};

    struct NamedProvider(&'static str);

    #[async_trait::async_trait]
    impl ProviderAdapter for NamedProvider {
        fn id(&self) -> ProviderId {
            ProviderId::new(self.0)
        }

        async fn start_stream(
            &self,
            _req: ProviderRequest,
        ) -> Result<ProviderStreamHandle, ProviderError> {
            Err(ProviderError::transport(self.0, "not reachable in this test"))
        }
    }

    #[test]
    fn registering_one_id_twice_is_a_config_error() {
        let result = Harness::builder()
            .register_provider(Arc::new(NamedProvider("groq")))
            .register_provider(Arc::new(NamedProvider("openai")))
            .register_provider(Arc::new(NamedProvider("groq")))
            .build();
        assert!(
            matches!(result, Err(HarnessError::Config(message)) if message == "provider groq registered twice")
        );
    }

    #[test]
    fn check_model_requires_a_registered_provider() {
        let harness = Harness::builder()
            .register_provider(Arc::new(NamedProvider("groq")))
            .build()
            .expect("harness");
        assert_eq!(
            harness.check_model(&ModelRef::new("groq", "llama-3.1-8b-instant")),
            Ok(())
        );
        assert_eq!(
            harness.check_model(&ModelRef::new("openai", "gpt-4o-mini")),
            Err(HarnessError::ProviderNotFound {
                provider: ProviderId::new("openai")
            })
        );
        assert!(matches!(
            harness.check_model(&ModelRef::new("groq", " ")),
            Err(HarnessError::Validation(_))
        ));
    }
}
