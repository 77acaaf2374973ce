//! Static model allow-list and per-model parameter capability table.
//!
//! ```rust
//! use qprovider::ModelCatalog;
//!
//! let catalog = ModelCatalog::with_default_models();
//! assert!(catalog.is_allowed("openai:gpt-5-mini"));
//! assert!(!catalog.is_allowed("openai:gpt-3.5-turbo"));
//!
//! // gpt-5 models list temperature as unsupported, so resolution drops it.
//! assert_eq!(catalog.resolve_temperature("openai:gpt-5-mini", Some(0.9)), None);
//! ```

use qcommon::Registry;

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 2048;

pub const TEMPERATURE_PARAM: &str = "temperature";

#[derive(Debug, Clone, PartialEq)]
pub struct ModelSpec {
    pub qualified: String,
    pub temperature_override: Option<f32>,
    pub unsupported_params: Vec<String>,
    pub vision: bool,
}

impl ModelSpec {
    pub fn new(qualified: impl Into<String>) -> Self {
        Self {
            qualified: qualified.into(),
            temperature_override: None,
            unsupported_params: Vec::new(),
            vision: false,
        }
    }

    pub fn with_temperature_override(mut self, temperature: f32) -> Self {
        self.temperature_override = Some(temperature);
        self
    }

    pub fn without_param(mut self, param: impl Into<String>) -> Self {
        self.unsupported_params.push(param.into());
        self
    }

    pub fn with_vision(mut self) -> Self {
        self.vision = true;
        self
    }
}

/// Allow-list of `vendor:model` names with per-model tuning capabilities.
///
/// Parameter resolution order is model-specific override, then the caller's
/// value, then the global default; parameters listed unsupported for a model
/// are dropped entirely.
#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    models: Registry<String, ModelSpec>,
}

impl ModelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_models() -> Self {
        let mut catalog = Self::new();

        catalog.register(
            ModelSpec::new("openai:gpt-5-nano")
                .without_param(TEMPERATURE_PARAM)
                .with_vision(),
        );
        catalog.register(
            ModelSpec::new("openai:gpt-5-mini")
                .without_param(TEMPERATURE_PARAM)
                .with_vision(),
        );
        catalog.register(
            ModelSpec::new("openai:gpt-5")
                .without_param(TEMPERATURE_PARAM)
                .with_vision(),
        );
        catalog.register(
            ModelSpec::new("openrouter:deepseek/deepseek-chat").with_temperature_override(0.7),
        );
        catalog.register(
            ModelSpec::new("openrouter:x-ai/grok-4.1-fast").with_temperature_override(0.7),
        );
        catalog.register(
            ModelSpec::new("openrouter:openai/gpt-4o-mini")
                .with_temperature_override(0.7)
                .with_vision(),
        );
        catalog.register(
            ModelSpec::new("openrouter:mistralai/mistral-large-2512")
                .with_temperature_override(0.6),
        );
        catalog
            .register(ModelSpec::new("groq:llama-3.1-8b-instant").with_temperature_override(0.7));
        catalog.register(
            ModelSpec::new("groq:llama-3.3-70b-versatile").with_temperature_override(0.7),
        );
        catalog.register(
            ModelSpec::new("anthropic:claude-sonnet-4-6")
                .with_temperature_override(0.6)
                .with_vision(),
        );
        catalog.register(
            ModelSpec::new("anthropic:claude-opus-4-6")
                .with_temperature_override(0.6)
                .with_vision(),
        );
        catalog.register(
            ModelSpec::new("anthropic:claude-haiku-4-5")
                .with_temperature_override(0.7)
                .with_vision(),
        );
        catalog.register(
            ModelSpec::new("gemini:models/gemini-2.5-flash-lite")
                .with_temperature_override(0.7)
                .with_vision(),
        );
        catalog.register(
            ModelSpec::new("gemini:models/gemini-2.5-flash")
                .with_temperature_override(0.7)
                .with_vision(),
        );

        catalog
    }

    pub fn register(&mut self, spec: ModelSpec) {
        self.models.insert(spec.qualified.clone(), spec);
    }

    pub fn is_allowed(&self, qualified: &str) -> bool {
        self.models.contains_key(qualified)
    }

    pub fn spec(&self, qualified: &str) -> Option<&ModelSpec> {
        self.models.get(qualified)
    }

    pub fn is_param_unsupported(&self, qualified: &str, param: &str) -> bool {
        self.spec(qualified)
            .map(|spec| spec.unsupported_params.iter().any(|name| name == param))
            .unwrap_or(false)
    }

    /// Resolves the effective temperature, or `None` when the model lists the
    /// parameter as unsupported and it must not reach the vendor at all.
    pub fn resolve_temperature(&self, qualified: &str, requested: Option<f32>) -> Option<f32> {
        if self.is_param_unsupported(qualified, TEMPERATURE_PARAM) {
            return None;
        }

        let overridden = self
            .spec(qualified)
            .and_then(|spec| spec.temperature_override);
        Some(overridden.or(requested).unwrap_or(DEFAULT_TEMPERATURE))
    }

    pub fn supports_vision(&self, qualified: &str) -> bool {
        self.spec(qualified).map(|spec| spec.vision).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
