/// Splits a normalized transcript line into dictionary tokens.
pub trait LineTokenizer: Send + Sync {
    fn tokenize(&self, line: &str) -> Vec<String>;
}

/// Whitespace splitting; the tokenizer used for character-level transcripts
/// such as `T H E | C A T |`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTokenizer;

impl LineTokenizer for WhitespaceTokenizer {
    fn tokenize(&self, line: &str) -> Vec<String> {
        line.split_whitespace().map(str::to_string).collect()
    }
}

impl<F> LineTokenizer for F
where
    F: Fn(&str) -> Vec<String> + Send + Sync,
{
    fn tokenize(&self, line: &str) -> Vec<String> {
        self(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_tokenizer_collapses_runs() {
        let tokens = WhitespaceTokenizer.tokenize("  T H  E |\tC ");
        assert_eq!(tokens, ["T", "H", "E", "|", "C"]);
    }

    #[test]
    fn closures_are_tokenizers() {
        let chars = |line: &str| line.chars().map(String::from).collect::<Vec<_>>();
        assert_eq!(chars.tokenize("ab"), ["a", "b"]);
    }
}
