//! Normalization of backend message content into one string.

use serde::Deserialize;

use crate::ai::error::SolveError;

/// Message content as returned by the supported backends.
///
/// Anthropic always returns a list of typed blocks. OpenAI returns a string,
/// `null`, or (for some models) a list of typed parts.
#[derive(Deserialize, Debug, Default)]
#[serde(untagged)]
pub(crate) enum MessageContent {
    /// Plain text content.
    Text(String),
    /// Typed content blocks.
    Blocks(Vec<ContentBlock>),
    /// `null` content; also used when the field is absent.
    #[default]
    Empty,
}

/// A typed content block; only text blocks carry an answer.
#[derive(Deserialize, Debug)]
pub(crate) struct ContentBlock {
    #[serde(rename = "type")]
    pub(crate) block_type: String,
    #[serde(default)]
    pub(crate) text: Option<String>,
}

impl MessageContent {
    /// Concatenates all text into one string.
    pub(crate) fn into_text(self) -> String {
        match self {
            MessageContent::Text(text) => text,
            MessageContent::Blocks(blocks) => blocks
                .into_iter()
                .filter(|b| b.block_type == "text")
                .filter_map(|b| b.text)
                .collect::<Vec<_>>()
                .join(""),
            MessageContent::Empty => String::new(),
        }
    }

    /// Returns the text, failing when the backend produced none.
    pub(crate) fn into_solution(self) -> Result<String, SolveError> {
        let text = self.into_text();
        if text.trim().is_empty() {
            return Err(SolveError::EmptyResponse);
        }
        Ok(text)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn parse(json: &str) -> MessageContent {
        serde_json::from_str::<MessageContent>(json).unwrap()
    }

    #[test]
    fn block_list_and_string_normalize_identically() {
        let blocks = parse(r#"[{"type": "text", "text": "X"}]"#);
        let text = parse(r#""X""#);
        assert_eq!(blocks.into_text(), "X");
        assert_eq!(text.into_text(), "X");
    }

    #[test]
    fn non_text_blocks_are_ignored() {
        let content = parse(
            r#"[
                {"type": "thinking", "thinking": "hmm"},
                {"type": "text", "text": "first "},
                {"type": "tool_use", "id": "t1"},
                {"type": "text", "text": "second"}
            ]"#,
        );
        assert_eq!(content.into_text(), "first second");
    }

    #[test]
    fn null_content_is_empty_response() {
        let err = parse("null").into_solution().unwrap_err();
        assert!(matches!(err, SolveError::EmptyResponse));
    }

    #[test]
    fn whitespace_only_is_empty_response() {
        let err = parse(r#""  \n ""#).into_solution().unwrap_err();
        assert!(matches!(err, SolveError::EmptyResponse));
    }

    #[test]
    fn empty_block_list_is_empty_response() {
        assert!(matches!(
            parse("[]").into_solution(),
            Err(SolveError::EmptyResponse)
        ));
    }

    proptest! {
        #[test]
        fn string_and_single_block_agree(text in "\\PC{1,64}") {
            let as_string = MessageContent::Text(text.clone()).into_text();
            let as_block = MessageContent::Blocks(vec![ContentBlock {
                block_type: "text".to_string(),
                text: Some(text.clone()),
            }])
            .into_text();
            prop_assert_eq!(&as_string, &text);
            prop_assert_eq!(as_string, as_block);
        }

        #[test]
        fn split_blocks_rejoin(text in "[a-z ]{0,40}", split in 0usize..40) {
            let split = split.min(text.len());
            let (head, tail) = text.split_at(split);
            let blocks = MessageContent::Blocks(vec![
                ContentBlock { block_type: "text".to_string(), text: Some(head.to_string()) },
                ContentBlock { block_type: "text".to_string(), text: Some(tail.to_string()) },
            ]);
            prop_assert_eq!(blocks.into_text(), text);
        }
    }
}
