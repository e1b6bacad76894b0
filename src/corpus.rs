//! Labeled test corpus loading.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One labeled test case. Identity is its position in the corpus; the
/// content itself is not required to be unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub user_question: String,
    pub ground_truth: String,
}

/// On-disk corpus shape: one initial prompt template plus the ordered
/// test cases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestData {
    pub prompt_template: String,
    pub test_cases: Vec<TestCase>,
}

pub fn load(path: &Path) -> Result<TestData> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read test file: {}", path.display()))?;

    let data: TestData = serde_json::from_str(&content)
        .with_context(|| format!("Invalid JSON in test file: {}", path.display()))?;

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_cases.json");
        std::fs::write(
            &path,
            serde_json::json!({
                "prompt_template": "Classify: ${user_question}",
                "test_cases": [
                    { "user_question": "q1", "ground_truth": "A" },
                    { "user_question": "q2", "ground_truth": "B" }
                ]
            })
            .to_string(),
        )
        .unwrap();

        let data = load(&path).unwrap();
        assert_eq!(data.test_cases.len(), 2);
        assert_eq!(data.test_cases[0].ground_truth, "A");
        assert!(data.prompt_template.contains("${user_question}"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load(Path::new("/nonexistent/test_cases.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read test file"));
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "not json").unwrap();

        let err = load(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid JSON in test file"));
    }
}
