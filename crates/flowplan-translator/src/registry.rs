//! Transform handler registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use flowplan_model::{AppliedTransform, urn};

use crate::context::TranslationContext;
use crate::error::{TranslateError, TranslateResult};
use crate::translators;

/// Translates one primitive transform into steps.
///
/// Implementations read the transform's payload and inputs, append their
/// steps to the context and register every collection they produce.
pub trait TransformTranslator: Send + Sync {
    /// Translates `node`.
    fn translate(
        &self,
        node: &AppliedTransform,
        ctx: &mut TranslationContext<'_>,
    ) -> TranslateResult<()>;
}

/// Handlers keyed by transform URN.
#[derive(Clone, Default)]
pub struct TranslatorRegistry {
    translators: HashMap<String, Arc<dyn TransformTranslator>>,
}

impl fmt::Debug for TranslatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut urns: Vec<_> = self.translators.keys().collect();
        urns.sort();
        f.debug_struct("TranslatorRegistry")
            .field("urns", &urns)
            .finish()
    }
}

impl TranslatorRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with handlers for every built-in primitive.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(urn::READ, translators::ReadTranslator);
        registry.register(urn::CREATE, translators::CreateTranslator);
        registry.register(urn::PAR_DO, translators::ParDoTranslator);
        registry.register(urn::GROUP_BY_KEY, translators::GroupByKeyTranslator);
        registry.register(urn::ASSIGN_WINDOWS, translators::AssignWindowsTranslator);
        registry.register(urn::FLATTEN, translators::FlattenTranslator);
        registry.register(urn::COMBINE_VALUES, translators::CombineValuesTranslator);
        registry.register(urn::CREATE_VIEW, translators::CreateViewTranslator);
        registry
    }

    /// Registers a handler, replacing any previous handler for `urn`.
    pub fn register(
        &mut self,
        urn: impl Into<String>,
        translator: impl TransformTranslator + 'static,
    ) -> &mut Self {
        self.translators.insert(urn.into(), Arc::new(translator));
        self
    }

    /// Returns the handler for `urn`.
    pub fn get(&self, urn: &str) -> TranslateResult<&dyn TransformTranslator> {
        self.translators
            .get(urn)
            .map(|translator| translator.as_ref())
            .ok_or_else(|| TranslateError::unsupported(format!("no translator for transform '{urn}'")))
    }

    /// Returns whether a handler is registered for `urn`.
    pub fn contains(&self, urn: &str) -> bool {
        self.translators.contains_key(urn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    impl TransformTranslator for Noop {
        fn translate(
            &self,
            _node: &AppliedTransform,
            _ctx: &mut TranslationContext<'_>,
        ) -> TranslateResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_builtins_cover_every_primitive() {
        let registry = TranslatorRegistry::with_builtins();
        for urn in [
            urn::READ,
            urn::CREATE,
            urn::PAR_DO,
            urn::GROUP_BY_KEY,
            urn::ASSIGN_WINDOWS,
            urn::FLATTEN,
            urn::COMBINE_VALUES,
            urn::CREATE_VIEW,
        ] {
            assert!(registry.contains(urn), "missing {urn}");
        }
    }

    #[test]
    fn test_unknown_urn() {
        let mut registry = TranslatorRegistry::with_builtins();
        assert!(matches!(
            registry.get("example:sample:v1"),
            Err(TranslateError::UnsupportedShape(_))
        ));

        registry.register("example:sample:v1", Noop);
        assert!(registry.get("example:sample:v1").is_ok());
    }
}
