//! Prompt construction for the narrative backend.

use crate::conditions::ScoreVector;
use crate::document::Section;

/// Instructions sent to the backend, derived deterministically from a [`ScoreVector`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt(String);

impl Prompt {
    pub fn build(scores: &ScoreVector) -> Self {
        let probabilities = scores
            .iter()
            .map(|(label, probability)| format!("{label}: {}", probability.two_decimals()))
            .collect::<Vec<_>>()
            .join(", ");

        let text = format!(
            "You are a medical AI assistant generating a detailed chest X-ray analysis report.\n\
             \n\
             Structure the report with:\n\
             \n\
             - **{summary}**: Key conditions with probabilities > 0.5\n\
             - **{findings}**: All conditions with probabilities and interpretations\n\
             - **{recommendations}**: Suggested next steps\n\
             \n\
             Here are the probabilities:\n\
             {probabilities}\n\
             \n\
             Format with Markdown-style headings (e.g., **{summary}**) and bullet points. \
             Under **{findings}**, list each condition on its own line as \
             `- Condition: probability` with the probability as a decimal between 0 and 1.",
            summary = Section::Summary.title(),
            findings = Section::DetailedFindings.title(),
            recommendations = Section::Recommendations.title(),
        );
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Prompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
