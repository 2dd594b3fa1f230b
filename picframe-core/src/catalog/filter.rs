//! Case-insensitive file extension allow-list

/// Extensions matched when no configuration overrides them
pub const DEFAULT_EXTENSIONS: &[&str] = &["png", "bmp", "jpg", "jpeg"];

/// Allow-list of file extensions, compared case-insensitively against the
/// final `.ext` suffix of a file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionFilter {
    extensions: Vec<String>,
}

impl ExtensionFilter {
    /// Build a filter from extensions given with or without a leading dot.
    /// Empty entries are dropped.
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        normalized.sort();
        normalized.dedup();

        Self {
            extensions: normalized,
        }
    }

    /// Whether `name` ends in one of the allowed extensions
    pub fn matches(&self, name: &str) -> bool {
        match name.rsplit_once('.') {
            Some((_, ext)) if !ext.is_empty() => self
                .extensions
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(ext)),
            _ => false,
        }
    }

    /// Normalized (lowercase, dotless) extensions
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

impl Default for ExtensionFilter {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSIONS)
    }
}
