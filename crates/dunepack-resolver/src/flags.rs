use std::fmt;

use serde::Serialize;

/// The on/off state of one variant after resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureFlag {
    pub variant: String,
    /// The module behind a module variant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    pub enabled: bool,
}

impl FeatureFlag {
    pub fn state(&self) -> &'static str {
        if self.enabled {
            "ON"
        } else {
            "OFF"
        }
    }
}

impl fmt::Display for FeatureFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "feature {}: {}", self.variant, self.state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        let flag = FeatureFlag {
            variant: "alugrid".into(),
            module: Some("dune-alugrid".into()),
            enabled: true,
        };
        assert_eq!(flag.to_string(), "feature alugrid: ON");
        let off = FeatureFlag {
            enabled: false,
            ..flag
        };
        assert_eq!(off.to_string(), "feature alugrid: OFF");
    }
}
