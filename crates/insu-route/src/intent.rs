use serde::{Deserialize, Serialize};

/// The two kinds of question the assistant handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intent {
    /// Premium comparison answered from the premium database.
    Compare,
    /// Policy-terms question answered from the document collections.
    Policy,
}

impl Intent {
    pub const COMPARE_LABEL: &'static str = "비교설계 질문";
    pub const POLICY_LABEL: &'static str = "보험약관 질문";

    /// Map a classifier label to an intent. Anything that is not the
    /// comparison label is a policy question.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim().trim_matches(|c| c == '"' || c == '\'' || c == '.');
        if label == Self::COMPARE_LABEL || label.replace(' ', "") == Self::COMPARE_LABEL.replace(' ', "") {
            Intent::Compare
        } else {
            Intent::Policy
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Intent::Compare => Self::COMPARE_LABEL,
            Intent::Policy => Self::POLICY_LABEL,
        }
    }
}
