//! Cache key construction.
//!
//! Keys hash a length-prefixed encoding of every input component, so
//! `("Fix", "Bug")` and `("Fi", "xBug")` land on different entries.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use sha2::{Digest, Sha256};

pub const TASK_ANALYSIS_PREFIX: &str = "task_analysis";
pub const TASK_SUGGESTIONS_PREFIX: &str = "task_suggestions";

/// URL-safe base64 SHA-256 over the given components.
pub fn fingerprint<S: AsRef<str>>(parts: &[S]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        let bytes = part.as_ref().as_bytes();
        hasher.update((bytes.len() as u64).to_le_bytes());
        hasher.update(bytes);
    }
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Key for a task analysis. `context` is the canonical JSON of the optional
/// caller context, empty when absent.
pub fn task_analysis_key(title: &str, description: &str, context: &str) -> String {
    format!(
        "{}:{}",
        TASK_ANALYSIS_PREFIX,
        fingerprint(&[title, description, context])
    )
}

pub fn task_suggestions_key(user_id: &str, context: &str) -> String {
    format!(
        "{}:{}",
        TASK_SUGGESTIONS_PREFIX,
        fingerprint(&[user_id, context])
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_shift_changes_key() {
        assert_ne!(
            task_analysis_key("Fix", "Bug", ""),
            task_analysis_key("Fi", "xBug", "")
        );
        assert_ne!(
            task_suggestions_key("user-1", "work"),
            task_suggestions_key("user-1w", "ork")
        );
    }

    #[test]
    fn keys_are_stable_and_prefixed() {
        let a = task_analysis_key("Write report", "Quarterly numbers", "");
        let b = task_analysis_key("Write report", "Quarterly numbers", "");
        assert_eq!(a, b);
        assert!(a.starts_with("task_analysis:"));
        // 32 digest bytes -> 43 unpadded base64 chars
        assert_eq!(a.len(), "task_analysis:".len() + 43);
    }

    #[test]
    fn context_participates_in_analysis_key() {
        assert_ne!(
            task_analysis_key("Plan sprint", "", ""),
            task_analysis_key("Plan sprint", "", "{\"team\":\"core\"}")
        );
    }
}
