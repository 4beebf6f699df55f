use std::collections::BTreeMap;

/// Options used when a canvas creates its GPU context.
///
/// `attributes` are handed to the backend verbatim; each backend documents the
/// keys it understands and ignores the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextOptions {
    /// Multisampled rendering. Off by default: pixel-art icons look worse
    /// antialiased.
    pub antialias: bool,

    pub attributes: BTreeMap<String, String>,
}

impl ContextOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_antialias(mut self, antialias: bool) -> Self {
        self.antialias = antialias;
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn antialias_defaults_off() {
        assert!(!ContextOptions::default().antialias);
    }

    #[test]
    fn attributes_pass_through() {
        let opts = ContextOptions::new()
            .with_attribute("power_preference", "low-power")
            .with_attribute("vendor_flag", "1");
        assert_eq!(opts.attribute("power_preference"), Some("low-power"));
        assert_eq!(opts.attribute("vendor_flag"), Some("1"));
        assert_eq!(opts.attribute("missing"), None);
    }
}
