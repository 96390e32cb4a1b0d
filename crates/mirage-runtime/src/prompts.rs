//! System prompts for the extraction service.
//!
//! The instruction is fixed: the extractor's contract with the rest of the
//! pipeline is "a JSON list of concrete object nouns", and the payload
//! parser in `mirage-core` only recovers from the known wrapped-object
//! deviation. Loosening this prompt widens the surface the parser has to
//! accept.

/// System instruction for caption object extraction.
///
/// Asks for concrete, physical objects only - no attributes, actions, or
/// abstract nouns - serialized as a bare JSON list of strings.
pub const OBJECT_EXTRACTION_PROMPT: &str = r#"You are an expert noun extractor. Your task is to identify and list all concrete, physical objects mentioned in the user's text. Respond ONLY with a valid JSON list of strings. For example, for the input 'A black cat and a brown dog are sitting on a red couch.', you would output ["cat", "dog", "couch"]."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_demands_json_list_output() {
        assert!(OBJECT_EXTRACTION_PROMPT.contains("JSON list of strings"));
    }
}
