use crate::Effect;

/// Reference to the file a completed task produced on the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultArtifact {
    pub output_file: String,
    /// Extra result fields reported by the backend, as (name, display value).
    pub details: Vec<(String, String)>,
}

impl ResultArtifact {
    pub fn new(output_file: impl Into<String>) -> Self {
        Self {
            output_file: output_file.into(),
            details: Vec::new(),
        }
    }

    pub fn with_detail(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.push((name.into(), value.into()));
        self
    }

    /// Final path segment of `output_file`; both `/` and `\` separate segments.
    pub fn display_name(&self) -> &str {
        self.output_file
            .rsplit(|c: char| c == '/' || c == '\\')
            .next()
            .unwrap_or(&self.output_file)
    }
}

/// Holds the artifact of the last completed task run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultStore {
    artifact: Option<ResultArtifact>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<&ResultArtifact> {
        self.artifact.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.artifact.is_none()
    }

    pub fn display_name(&self) -> Option<&str> {
        self.artifact.as_ref().map(ResultArtifact::display_name)
    }

    /// Effect that fetches the artifact from the backend, keyed by its display name.
    pub fn download(&self) -> Option<Effect> {
        let file_name = self.display_name().filter(|name| !name.is_empty())?;
        Some(Effect::Download {
            file_name: file_name.to_string(),
        })
    }

    pub(crate) fn set(&mut self, artifact: ResultArtifact) {
        self.artifact = Some(artifact);
    }

    pub(crate) fn clear(&mut self) {
        self.artifact = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_is_last_segment() {
        assert_eq!(
            ResultArtifact::new("/data/out_123.csv").display_name(),
            "out_123.csv"
        );
        assert_eq!(
            ResultArtifact::new("outputs\\search_laptop.csv").display_name(),
            "search_laptop.csv"
        );
        assert_eq!(ResultArtifact::new("plain.csv").display_name(), "plain.csv");
    }

    #[test]
    fn download_uses_display_name() {
        let mut store = ResultStore::new();
        assert_eq!(store.download(), None);

        store.set(ResultArtifact::new("outputs/shop_42.csv"));
        assert_eq!(
            store.download(),
            Some(Effect::Download {
                file_name: "shop_42.csv".to_string()
            })
        );
    }

    #[test]
    fn trailing_separator_has_nothing_to_download() {
        let mut store = ResultStore::new();
        store.set(ResultArtifact::new("outputs/"));
        assert_eq!(store.display_name(), Some(""));
        assert_eq!(store.download(), None);
    }

    #[test]
    fn clear_forgets_artifact() {
        let mut store = ResultStore::new();
        store.set(ResultArtifact::new("a.csv").with_detail("keyword", "laptop"));
        assert_eq!(store.get().unwrap().details.len(), 1);
        store.clear();
        assert!(store.is_empty());
    }
}
