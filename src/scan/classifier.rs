// file: src/scan/classifier.rs
// description: file type classification by extension and ignored-name rules
// reference: configurable extension-based classification

use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FileType {
    Pdf,
    /// Any other extension, lower-cased, without the dot.
    Other(String),
}

impl FileType {
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        if extension == "pdf" {
            FileType::Pdf
        } else {
            FileType::Other(extension)
        }
    }

    pub fn extension(&self) -> &str {
        match self {
            FileType::Pdf => "pdf",
            FileType::Other(extension) => extension,
        }
    }
}

pub struct FileClassifier {
    extensions: Vec<String>,
}

impl FileClassifier {
    pub fn new(extensions: &[String]) -> Self {
        Self {
            extensions: extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    pub fn classify(&self, path: &Path) -> FileType {
        FileType::from_path(path)
    }

    /// True when the file has one of the configured extensions and is not
    /// an AppleDouble (`._name`) companion file.
    pub fn is_target(&self, path: &Path) -> bool {
        if is_apple_double(path) {
            return false;
        }

        let file_type = self.classify(path);
        self.extensions.iter().any(|e| e == file_type.extension())
    }

    pub fn describe_extensions(&self) -> String {
        self.extensions
            .iter()
            .map(|e| format!(".{}", e))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for FileClassifier {
    fn default() -> Self {
        Self::new(&["pdf".to_string()])
    }
}

/// macOS stores extended attributes of files on non-HFS volumes in `._`
/// companion files; they are never content.
pub fn is_apple_double(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("._"))
}

pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.') && n != "." && n != "..")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_extension() {
        assert_eq!(FileType::from_path(Path::new("a/b/Paper.PDF")), FileType::Pdf);
        assert_eq!(
            FileType::from_path(Path::new("a/b/book.epub")),
            FileType::Other("epub".to_string())
        );
        assert_eq!(
            FileType::from_path(Path::new("a/b/README")),
            FileType::Other(String::new())
        );
    }

    #[test]
    fn test_target_detection_default_pdf_only() {
        let classifier = FileClassifier::default();

        assert!(classifier.is_target(Path::new("storage/ABCD1234/paper.pdf")));
        assert!(!classifier.is_target(Path::new("storage/ABCD1234/._paper.pdf")));
        assert!(!classifier.is_target(Path::new("storage/ABCD1234/paper.epub")));
    }

    #[test]
    fn test_target_detection_with_extra_extensions() {
        let classifier = FileClassifier::new(&[".PDF".to_string(), "epub".to_string()]);

        assert!(classifier.is_target(Path::new("x/book.epub")));
        assert!(classifier.is_target(Path::new("x/paper.pdf")));
        assert_eq!(classifier.describe_extensions(), ".pdf, .epub");
    }

    #[test]
    fn test_hidden_names() {
        assert!(is_hidden(Path::new("storage/.zotero-ft-cache")));
        assert!(!is_hidden(Path::new("storage/ABCD1234")));
        assert!(is_apple_double(Path::new("._x.pdf")));
    }
}
