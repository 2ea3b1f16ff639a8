//! Provider construction from a vendor kind

use crate::{AnthropicProvider, GoogleProvider, OpenAiProvider, Provider, ProviderKind};

/// Build the adapter for a vendor
pub fn create_provider(
    kind: ProviderKind,
    api_key: impl Into<String>,
    api_base: Option<String>,
) -> Box<dyn Provider> {
    match kind {
        ProviderKind::OpenAi => Box::new(OpenAiProvider::new(api_key, api_base)),
        ProviderKind::Anthropic => Box::new(AnthropicProvider::new(api_key, api_base)),
        ProviderKind::Google => Box::new(GoogleProvider::new(api_key, api_base)),
    }
}
