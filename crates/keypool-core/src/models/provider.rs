use crate::error::BalanceError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// LLM vendors whose billing endpoints can be queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    DeepSeek,
    OpenAI,
    Volcengine,
    Qwen,
    SiliconFlow,
}

impl Provider {
    pub const ALL: [Provider; 5] = [
        Provider::DeepSeek,
        Provider::OpenAI,
        Provider::Volcengine,
        Provider::Qwen,
        Provider::SiliconFlow,
    ];

    /// Wire tag, as used in requests and stored records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DeepSeek => "deepseek",
            Self::OpenAI => "openai",
            Self::Volcengine => "volcengine",
            Self::Qwen => "qwen",
            Self::SiliconFlow => "siliconflow",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::DeepSeek => "DeepSeek",
            Self::OpenAI => "OpenAI",
            Self::Volcengine => "Volcengine",
            Self::Qwen => "Qwen",
            Self::SiliconFlow => "SiliconFlow",
        }
    }

    /// Currency the provider reports balances in.
    pub fn currency(&self) -> &'static str {
        match self {
            Self::OpenAI => "USD",
            _ => "CNY",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = BalanceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|provider| provider.as_str() == value)
            .ok_or_else(|| BalanceError::UnsupportedProvider(value.to_string()))
    }
}
