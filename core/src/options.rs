//! Classification of free-form option tokens.

use std::collections::BTreeMap;

/// Operator-supplied option tokens, split once by the presence of `=`:
/// `name=value` is a write request, a bare `name` a read request.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct OptionTokens {
    pub reads: Vec<String>,
    pub writes: BTreeMap<String, String>,
}

impl OptionTokens {
    pub fn classify<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut classified = Self::default();
        for token in tokens {
            let token = token.as_ref();
            match token.split_once('=') {
                Some((name, value)) => {
                    classified.writes.insert(name.to_string(), value.to_string());
                }
                None => classified.reads.push(token.to_string()),
            }
        }
        classified
    }
}
