use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::{
    languages::{
        CHandler, EncodingHandler, GoHandler, HandlerContext, JavaHandler, JavaScriptHandler,
        LanguageHandler, PythonHandler, RustHandler,
    },
    types::{LanguageDescriptor, LanguageInfo},
};

/// Maps language keys to handlers. Built once, then shared read-only.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn LanguageHandler>>,
    /// Keys in registration order
    keys: Vec<String>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in language and its aliases
    pub fn with_builtin(ctx: &HandlerContext) -> Self {
        let mut registry = Self::new();

        let javascript: Arc<dyn LanguageHandler> = Arc::new(JavaScriptHandler::new(ctx.clone()));
        let encoding: Arc<dyn LanguageHandler> = Arc::new(EncodingHandler::new());

        registry.register("python", Arc::new(PythonHandler::new(ctx.clone())));
        registry.register("javascript", javascript.clone());
        registry.register("js", javascript);
        registry.register("c", Arc::new(CHandler::new(ctx.clone())));
        registry.register("java", Arc::new(JavaHandler::new(ctx.clone())));
        registry.register("go", Arc::new(GoHandler::new(ctx.clone())));
        registry.register("rust", Arc::new(RustHandler::new(ctx.clone())));
        registry.register("encoding", encoding.clone());
        registry.register("encode", encoding);

        registry
    }

    /// Keys are stored lowercase; re-registering a key replaces its handler
    pub fn register(&mut self, key: &str, handler: Arc<dyn LanguageHandler>) {
        let key = key.to_lowercase();
        if self.handlers.insert(key.clone(), handler).is_none() {
            self.keys.push(key);
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<dyn LanguageHandler>> {
        self.handlers.get(&key.trim().to_lowercase()).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// One descriptor per display name, sorted by display name
    pub fn list_descriptors(&self) -> Vec<LanguageDescriptor> {
        self.list_languages()
            .into_iter()
            .map(|info| info.descriptor)
            .collect()
    }

    /// Catalog for discovery; each language appears once under the first key
    /// it was registered with.
    pub fn list_languages(&self) -> Vec<LanguageInfo> {
        let mut by_name: BTreeMap<String, LanguageInfo> = BTreeMap::new();
        for key in &self.keys {
            let Some(handler) = self.handlers.get(key) else {
                continue;
            };
            let descriptor = handler.describe();
            by_name
                .entry(descriptor.name.clone())
                .or_insert_with(|| LanguageInfo {
                    key: key.clone(),
                    descriptor,
                });
        }
        by_name.into_values().collect()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("keys", &self.keys)
            .finish()
    }
}
