use std::collections::HashMap;

/// Static emotion → display swatch lookup. Unmapped emotions get the
/// configured fallback swatch.
#[derive(Debug, Clone)]
pub struct Palette {
    colors: HashMap<String, String>,
    fallback: String,
}

impl Palette {
    pub fn new(
        entries: impl IntoIterator<Item = (String, String)>,
        fallback: impl Into<String>,
    ) -> Self {
        Self {
            colors: entries
                .into_iter()
                .map(|(emotion, swatch)| (emotion.to_lowercase(), swatch))
                .collect(),
            fallback: fallback.into(),
        }
    }

    pub fn swatch(&self, emotion: &str) -> &str {
        self.colors
            .get(&emotion.to_lowercase())
            .map(String::as_str)
            .unwrap_or(&self.fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn palette() -> Palette {
        Palette::new(
            [("happy".to_string(), "🟡".to_string())],
            "⚪",
        )
    }

    #[test]
    fn known_emotion_gets_its_swatch() {
        assert_eq!(palette().swatch("happy"), "🟡");
        assert_eq!(palette().swatch("HAPPY"), "🟡");
    }

    #[test]
    fn unmapped_emotion_gets_fallback() {
        assert_eq!(palette().swatch("bored"), "⚪");
    }
}
