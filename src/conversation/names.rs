//! Candidate patient names in free text.
//!
//! Explicit candidates follow an introduction cue ("my name is ...").
//! Implicit candidates are whole messages that look like a bare name.

use super::classify::has_clinical_terms;

const MAX_NAME_TOKENS: usize = 4;

/// Introduction cues as lowercase word sequences, longest first. The flag
/// marks cues that also need a capitalised first name token, so "I am
/// feeling dizzy" is not read as an introduction.
const CUES: &[(&[&str], bool)] = &[
    (&["my", "name", "is"], false),
    (&["name", "is"], false),
    (&["call", "me"], false),
    (&["this", "is"], true),
    (&["i", "am"], true),
    (&["i'm"], true),
    (&["im"], true),
];

/// Words that end a name or rule a message out as a bare name.
const STOPWORDS: &[&str] = &[
    "a", "about", "again", "also", "am", "an", "and", "are", "as", "at", "because", "but", "by",
    "calling", "can", "could", "do", "feeling", "for", "from", "good", "had", "has", "have",
    "having", "hello", "here", "hey", "hi", "how", "i", "i'm", "in", "is", "it", "just", "me",
    "morning", "my", "no", "not", "now", "of", "ok", "okay", "on", "or", "please", "so", "thank",
    "thanks", "the", "there", "to", "today", "was", "we", "what", "when", "where", "who", "why",
    "will", "with", "yes", "you",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameCandidate {
    pub name: String,
    /// Came after an introduction cue rather than being the whole message.
    pub explicit: bool,
}

/// Explicit candidate first; implicit only when `allow_implicit`.
pub fn extract_candidate(text: &str, allow_implicit: bool) -> Option<NameCandidate> {
    if let Some(name) = explicit_name(text) {
        return Some(NameCandidate { name, explicit: true });
    }
    if allow_implicit {
        return implicit_name(text).map(|name| NameCandidate { name, explicit: false });
    }
    None
}

/// Name following the first introduction cue that yields one.
pub fn explicit_name(text: &str) -> Option<String> {
    let tokens: Vec<Token> = text.split_whitespace().map(Token::new).collect();

    for start in 0..tokens.len() {
        for (cue, needs_capital) in CUES {
            if !cue_matches(&tokens, start, cue) {
                continue;
            }
            // A cue ending in punctuation ("this is." / "my name is:") gives no name
            if tokens[start + cue.len() - 1].ends_clause {
                continue;
            }
            if let Some(name) = collect_name(&tokens[start + cue.len()..], *needs_capital) {
                return Some(name);
            }
        }
    }
    None
}

/// The whole message, if it is 1 to 4 alphabetic words with no stopwords
/// and no clinical vocabulary.
pub fn implicit_name(text: &str) -> Option<String> {
    let tokens: Vec<Token> = text.split_whitespace().map(Token::new).collect();
    if tokens.is_empty() || tokens.len() > MAX_NAME_TOKENS {
        return None;
    }
    let name_like = tokens
        .iter()
        .all(|t| t.is_name_word() && !is_stopword(&t.lower));
    if !name_like || has_clinical_terms(text) {
        return None;
    }
    Some(join(&tokens))
}

struct Token {
    /// Token with surrounding punctuation removed.
    core: String,
    lower: String,
    /// Trailing punctuation that closes the phrase (",", ".", "!", ...).
    ends_clause: bool,
}

impl Token {
    fn new(raw: &str) -> Self {
        let core = raw.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'' && c != '-');
        let core = core.trim_matches(|c: char| c == '\'' || c == '-');
        let ends_clause = raw
            .chars()
            .next_back()
            .is_some_and(|c| !c.is_alphanumeric() && c != '\'' && c != '-');
        Self {
            core: core.to_string(),
            lower: core.to_lowercase(),
            ends_clause,
        }
    }

    fn is_name_word(&self) -> bool {
        self.core.chars().next().is_some_and(char::is_alphabetic)
            && self
                .core
                .chars()
                .all(|c| c.is_alphabetic() || c == '\'' || c == '-')
    }

    fn is_capitalised(&self) -> bool {
        self.core.chars().next().is_some_and(char::is_uppercase)
    }
}

fn cue_matches(tokens: &[Token], start: usize, cue: &[&str]) -> bool {
    tokens.len() >= start + cue.len()
        && cue.iter().enumerate().all(|(i, word)| {
            let token = &tokens[start + i];
            // Interior cue words must not be followed by punctuation
            token.lower == *word && (i + 1 == cue.len() || !token.ends_clause)
        })
}

fn collect_name(tokens: &[Token], needs_capital: bool) -> Option<String> {
    let first = tokens.first()?;
    if needs_capital && !first.is_capitalised() {
        return None;
    }

    let mut name = Vec::new();
    for token in tokens.iter().take(MAX_NAME_TOKENS) {
        if !token.is_name_word() || is_stopword(&token.lower) {
            break;
        }
        name.push(token);
        if token.ends_clause {
            break;
        }
    }

    let name = name.iter().map(|t| t.core.as_str()).collect::<Vec<_>>().join(" ");
    // "I'm Diabetic", "this is Lisinopril": a clinical word, not a name
    if name.is_empty() || has_clinical_terms(&name) {
        None
    } else {
        Some(name)
    }
}

fn join(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.core.as_str()).collect::<Vec<_>>().join(" ")
}

fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_after_my_name_is() {
        assert_eq!(explicit_name("Hello, my name is John Smith,").as_deref(), Some("John Smith"));
        assert_eq!(explicit_name("my name is john smith").as_deref(), Some("john smith"));
    }

    #[test]
    fn other_cues() {
        assert_eq!(explicit_name("Hi! I'm Linda Chen and my ankles hurt").as_deref(), Some("Linda Chen"));
        assert_eq!(explicit_name("This is Maria Garcia.").as_deref(), Some("Maria Garcia"));
        assert_eq!(explicit_name("Please call me Robert").as_deref(), Some("Robert"));
        assert_eq!(explicit_name("I am Emily Nowak").as_deref(), Some("Emily Nowak"));
        assert_eq!(explicit_name("Actually, my name is Anne-Marie O'Neil").as_deref(), Some("Anne-Marie O'Neil"));
    }

    #[test]
    fn lowercase_after_capital_cue_is_not_a_name() {
        assert_eq!(explicit_name("I am feeling dizzy"), None);
        assert_eq!(explicit_name("this is really painful"), None);
        assert_eq!(explicit_name("I'm worried about my pills"), None);
    }

    #[test]
    fn name_stops_at_stopword_or_limit() {
        assert_eq!(
            explicit_name("my name is Ana Maria de la Cruz Lopez").as_deref(),
            Some("Ana Maria de la")
        );
        assert_eq!(explicit_name("my name is David and I have a question").as_deref(), Some("David"));
    }

    #[test]
    fn clinical_word_after_cue_is_not_a_name() {
        assert_eq!(explicit_name("I'm Diabetic, so what can I eat?"), None);
        assert_eq!(explicit_name("This is Lisinopril right? does it hurt my kidney"), None);
        assert_eq!(explicit_name("I am Hypertensive"), None);
        assert_eq!(
            explicit_name("I'm Diabetic. My name is Ahmed Hassan").as_deref(),
            Some("Ahmed Hassan")
        );
    }

    #[test]
    fn no_cue_no_explicit_name() {
        assert_eq!(explicit_name("What are the side effects of my medication?"), None);
        assert_eq!(explicit_name("my name is"), None);
    }

    #[test]
    fn implicit_name_accepts_bare_names() {
        assert_eq!(implicit_name("John Smith").as_deref(), Some("John Smith"));
        assert_eq!(implicit_name("  smith. ").as_deref(), Some("smith"));
        assert_eq!(implicit_name("no-such-person-xyz").as_deref(), Some("no-such-person-xyz"));
    }

    #[test]
    fn implicit_name_rejects_sentences_and_clinical_text() {
        assert_eq!(implicit_name("hello"), None);
        assert_eq!(implicit_name("thank you"), None);
        assert_eq!(implicit_name("kidney pain"), None);
        assert_eq!(implicit_name("one two three four five"), None);
        assert_eq!(implicit_name("room 12"), None);
    }

    #[test]
    fn implicit_candidates_only_when_allowed() {
        assert_eq!(
            extract_candidate("Grace Thompson", true),
            Some(NameCandidate { name: "Grace Thompson".into(), explicit: false })
        );
        assert_eq!(extract_candidate("Grace Thompson", false), None);
        assert_eq!(
            extract_candidate("my name is Grace Thompson", false),
            Some(NameCandidate { name: "Grace Thompson".into(), explicit: true })
        );
    }
}
