use crate::config::types::{JudgeError, Result};
use crate::judge::adapter::LanguageProfile;
use crate::judge::languages::{
    c::CProfile, cpp::CppProfile, java::JavaProfile, javascript::JavaScriptProfile,
    python::PythonProfile,
};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Immutable lookup table from language identifier (or alias) to profile.
#[derive(Clone, Default)]
pub struct LanguageRegistry {
    profiles: Vec<Arc<dyn LanguageProfile>>,
    index: HashMap<String, usize>,
}

impl LanguageRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with every built-in profile
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(PythonProfile);
        registry.register(JavaScriptProfile);
        registry.register(CProfile);
        registry.register(CppProfile);
        registry.register(JavaProfile);
        registry
    }

    /// Process-wide built-in registry, built once on first use
    pub fn global() -> &'static LanguageRegistry {
        static REGISTRY: OnceLock<LanguageRegistry> = OnceLock::new();
        REGISTRY.get_or_init(Self::builtin)
    }

    /// Add a profile. A later registration of an identifier replaces the
    /// earlier mapping.
    pub fn register<P: LanguageProfile + 'static>(&mut self, profile: P) -> &mut Self {
        let slot = self.profiles.len();
        let keys = std::iter::once(profile.language())
            .chain(profile.aliases().iter().copied())
            .map(normalize)
            .collect::<Vec<_>>();
        self.profiles.push(Arc::new(profile));
        for key in keys {
            self.index.insert(key, slot);
        }
        self
    }

    /// Resolve an identifier; unknown identifiers are `UnsupportedLanguage`.
    pub fn resolve(&self, language: &str) -> Result<Arc<dyn LanguageProfile>> {
        self.index
            .get(&normalize(language))
            .map(|&slot| Arc::clone(&self.profiles[slot]))
            .ok_or_else(|| JudgeError::UnsupportedLanguage(language.to_string()))
    }

    pub fn supports(&self, language: &str) -> bool {
        self.index.contains_key(&normalize(language))
    }

    /// Profiles in registration order
    pub fn profiles(&self) -> impl Iterator<Item = &Arc<dyn LanguageProfile>> {
        self.profiles.iter()
    }
}

impl std::fmt::Debug for LanguageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.profiles.iter().map(|p| p.language()))
            .finish()
    }
}

fn normalize(language: &str) -> String {
    language.trim().to_ascii_lowercase()
}
