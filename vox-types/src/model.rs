use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// One of the four generative-AI backends the bridge can route to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[strum(serialize = "openai")]
    OpenAi,
    #[strum(serialize = "gemini")]
    Gemini,
    #[strum(serialize = "anthropic")]
    Anthropic,
    #[strum(serialize = "cloudflare")]
    Cloudflare,
}

/// Namespace a model lives in. A registry entry is either one or the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    #[strum(serialize = "chat")]
    Chat,
    #[strum(serialize = "image")]
    Image,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn provider_names_round_trip_through_strum() {
        for provider in Provider::iter() {
            let name = provider.to_string();
            assert_eq!(Provider::from_str(&name).unwrap(), provider);
        }
        assert_eq!(Provider::OpenAi.to_string(), "openai");
    }

    #[test]
    fn provider_serde_matches_display() {
        let json = serde_json::to_string(&Provider::Cloudflare).unwrap();
        assert_eq!(json, "\"cloudflare\"");
    }
}
