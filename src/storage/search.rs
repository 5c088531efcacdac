//! Web-search style prompt matching for backends without a text index.
//!
//! Plain words must all appear, `"quoted phrases"` must appear in order,
//! `-word` excludes, and `or` between two terms accepts either.

#[derive(Debug, Clone, PartialEq)]
struct Term {
    words: Vec<String>,
    negated: bool,
}

impl Term {
    fn matches(&self, haystack: &[String]) -> bool {
        let found = haystack
            .windows(self.words.len())
            .any(|window| window == self.words.as_slice());
        found != self.negated
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WebSearch {
    // AND of ORs
    groups: Vec<Vec<Term>>,
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn lex(query: &str) -> Vec<(String, bool, bool)> {
    let mut tokens = Vec::new();
    let mut chars = query.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let mut negated = false;
        if c == '-' {
            chars.next();
            negated = true;
        }

        let mut text = String::new();
        let quoted = chars.peek() == Some(&'"');
        if quoted {
            chars.next();
            for c in chars.by_ref() {
                if c == '"' {
                    break;
                }
                text.push(c);
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                text.push(c);
                chars.next();
            }
        }

        tokens.push((text, negated, quoted));
    }

    tokens
}

impl WebSearch {
    pub fn parse(query: &str) -> Self {
        let mut groups: Vec<Vec<Term>> = Vec::new();
        let mut pending_or = false;

        for (text, negated, quoted) in lex(query) {
            if !negated && !quoted && text.eq_ignore_ascii_case("or") {
                pending_or = !groups.is_empty();
                continue;
            }

            let words = words(&text);
            if words.is_empty() {
                continue;
            }

            let term = Term { words, negated };
            match groups.last_mut() {
                Some(group) if pending_or => group.push(term),
                _ => groups.push(vec![term]),
            }
            pending_or = false;
        }

        WebSearch { groups }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn matches(&self, text: &str) -> bool {
        let haystack = words(text);
        self.groups
            .iter()
            .all(|group| group.iter().any(|term| term.matches(&haystack)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_plain_words_must_match() {
        let search = WebSearch::parse("red cat");
        assert!(search.matches("A red, fluffy cat"));
        assert!(!search.matches("a red dog"));
    }

    #[test]
    fn matching_is_whole_word_and_case_insensitive() {
        let search = WebSearch::parse("CAT");
        assert!(search.matches("cat on a mat"));
        assert!(!search.matches("concatenate"));
    }

    #[test]
    fn phrases_match_in_order() {
        let search = WebSearch::parse("\"red cat\"");
        assert!(search.matches("a red cat sleeping"));
        assert!(!search.matches("a cat, red"));
    }

    #[test]
    fn negation_excludes() {
        let search = WebSearch::parse("cat -dog");
        assert!(search.matches("cat"));
        assert!(!search.matches("cat and dog"));

        let search = WebSearch::parse("cat -\"hot dog\"");
        assert!(search.matches("cat with a dog that is hot"));
        assert!(!search.matches("cat eating a hot dog"));
    }

    #[test]
    fn or_accepts_either_side() {
        let search = WebSearch::parse("sunset beach or mountain");
        assert!(search.matches("sunset on the beach"));
        assert!(search.matches("mountain sunset"));
        assert!(!search.matches("mountain at noon"));
    }

    #[test]
    fn leading_or_and_blank_queries_are_ignored() {
        assert!(WebSearch::parse("  ").is_empty());
        assert!(WebSearch::parse("or").is_empty());
        assert!(WebSearch::parse("").matches("anything"));
    }
}
