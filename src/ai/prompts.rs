//! Fixed prompts sent with every screenshot.

/// System instruction shared by all providers.
pub const SYSTEM_PROMPT: &str = "You are an expert coding interview assistant. \
Provide clear, efficient solutions with detailed explanations.";

/// User instruction that accompanies the screenshot.
pub const USER_PROMPT: &str = "I'm going to share a screenshot of a coding problem. \
Please analyze it and provide:
1. A clear explanation of your thought process
2. An efficient solution with detailed code
3. Time and space complexity analysis
Please format your response in markdown.";

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn user_prompt_asks_for_every_section() {
        assert!(USER_PROMPT.contains("thought process"));
        assert!(USER_PROMPT.contains("solution with detailed code"));
        assert!(USER_PROMPT.contains("Time and space complexity"));
        assert!(USER_PROMPT.contains("markdown"));
    }
}
