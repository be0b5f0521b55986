//! Core detector trait for source language identification
//!
//! The workspace tracks every file the source store reports, but only files a
//! registered detector accepts are handed to an extractor.

/// Core trait for source language detectors
///
/// # Example
/// ```
/// use classmap::core::Detector;
/// use classmap::plugins::typescript::TypeScriptDetector;
///
/// let detector = TypeScriptDetector::new();
/// assert!(detector.detect("src/animal.ts", "class Animal {}"));
/// assert!(!detector.detect("README.md", "# Animals"));
/// ```
pub trait Detector: Send + Sync {
    /// Detect if the file should be extracted by this language's extractor
    fn detect(&self, path: &str, input: &str) -> bool {
        self.confidence(path, input) > 0.5
    }

    /// Get the confidence level of the detection (0.0 to 1.0)
    fn confidence(&self, path: &str, input: &str) -> f64;

    /// Get the language name
    fn language(&self) -> &'static str;

    /// File extensions this detector recognizes, without the leading dot
    fn extensions(&self) -> &'static [&'static str];
}
