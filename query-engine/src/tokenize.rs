//! Query tokenization and variant expansion.
//!
//! ASCII identifiers split on underscores, camel-case humps and
//! digit/letter transitions; CJK runs produce bigrams and trigrams (plus
//! the whole run verbatim for 3-4 rune runs). Tokens are lowercased,
//! at least two runes long, de-duplicated and capped at 16.

const MAX_TOKENS: usize = 16;
const MIN_TOKEN_RUNES: usize = 2;

/// Variant weight of the original query.
pub const WEIGHT_ORIGINAL: f32 = 1.0;
/// Variant weight of the tokenized rejoined form.
pub const WEIGHT_TOKENIZED: f32 = 0.85;

/// Splits a query into retrieval tokens.
pub fn tokenize(query: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();

    let mut ascii_word = String::new();
    let mut cjk_run: Vec<char> = Vec::new();

    let flush_ascii = |word: &mut String, tokens: &mut Vec<String>| {
        if !word.is_empty() {
            for part in split_identifier(word) {
                push_token(tokens, part);
            }
            word.clear();
        }
    };
    let flush_cjk = |run: &mut Vec<char>, tokens: &mut Vec<String>| {
        if !run.is_empty() {
            for part in cjk_grams(run) {
                push_token(tokens, part);
            }
            run.clear();
        }
    };

    for ch in query.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            flush_cjk(&mut cjk_run, &mut tokens);
            ascii_word.push(ch);
        } else if is_cjk(ch) {
            flush_ascii(&mut ascii_word, &mut tokens);
            cjk_run.push(ch);
        } else {
            flush_ascii(&mut ascii_word, &mut tokens);
            flush_cjk(&mut cjk_run, &mut tokens);
        }
    }
    flush_ascii(&mut ascii_word, &mut tokens);
    flush_cjk(&mut cjk_run, &mut tokens);

    tokens.truncate(MAX_TOKENS);
    tokens
}

/// Up to two weighted variants: the original query and, when tokenization
/// adds anything, the rejoined token form.
pub fn build_variants(query: &str) -> Vec<(String, f32)> {
    let original = query.trim().to_string();
    let mut variants = vec![(original.clone(), WEIGHT_ORIGINAL)];

    let tokens = tokenize(query);
    if tokens.len() >= 2 {
        let rejoined = tokens.join(" ");
        if rejoined != original.to_lowercase() {
            variants.push((rejoined, WEIGHT_TOKENIZED));
        }
    }
    variants
}

fn push_token(tokens: &mut Vec<String>, token: String) {
    if token.chars().count() < MIN_TOKEN_RUNES {
        return;
    }
    if tokens.len() >= MAX_TOKENS {
        return;
    }
    if !tokens.contains(&token) {
        tokens.push(token);
    }
}

/// `_`-split then camel-case and digit/letter boundaries; ASCII lowercased.
fn split_identifier(word: &str) -> Vec<String> {
    let mut parts = Vec::new();
    for piece in word.split('_') {
        let chars: Vec<char> = piece.chars().collect();
        if chars.is_empty() {
            continue;
        }
        let mut start = 0;
        for i in 1..chars.len() {
            let prev = chars[i - 1];
            let cur = chars[i];
            let hump = cur.is_ascii_uppercase() && prev.is_ascii_lowercase();
            // End of an acronym: `HTTPServer` splits before `Server`.
            let acronym_end = i + 1 < chars.len()
                && cur.is_ascii_uppercase()
                && prev.is_ascii_uppercase()
                && chars[i + 1].is_ascii_lowercase();
            let digit_edge = cur.is_ascii_digit() != prev.is_ascii_digit();
            if hump || acronym_end || digit_edge {
                parts.push(chars[start..i].iter().collect::<String>().to_lowercase());
                start = i;
            }
        }
        parts.push(chars[start..].iter().collect::<String>().to_lowercase());
    }
    parts
}

/// Bigrams and trigrams over a CJK run, plus the verbatim run for short
/// (3-4 rune) runs.
fn cjk_grams(run: &[char]) -> Vec<String> {
    let mut out = Vec::new();
    if run.len() >= 3 && run.len() <= 4 {
        out.push(run.iter().collect());
    }
    for w in run.windows(2) {
        out.push(w.iter().collect());
    }
    if run.len() >= 3 {
        for w in run.windows(3) {
            out.push(w.iter().collect());
        }
    }
    out
}

fn is_cjk(ch: char) -> bool {
    matches!(ch,
        '\u{4E00}'..='\u{9FFF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{3040}'..='\u{30FF}'
        | '\u{AC00}'..='\u{D7AF}'
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_camel_case_and_underscores() {
        assert_eq!(tokenize("ParseConfig"), vec!["parse", "config"]);
        assert_eq!(tokenize("parse_config_file"), vec!["parse", "config", "file"]);
        assert_eq!(tokenize("HTTPServer"), vec!["http", "server"]);
    }

    #[test]
    fn digit_transitions_split() {
        // `v2` splits into sub-minimum pieces and is dropped entirely.
        assert_eq!(tokenize("Config v2"), vec!["config"]);
        assert_eq!(tokenize("utf8Decode"), vec!["utf", "decode"]);
    }

    #[test]
    fn tokens_are_deduped_and_min_two_runes() {
        assert_eq!(tokenize("a parse a parse"), vec!["parse"]);
    }

    #[test]
    fn cap_at_sixteen_tokens() {
        let q = (0..40).map(|i| format!("word{i:02}")).collect::<Vec<_>>().join(" ");
        assert_eq!(tokenize(&q).len(), 16);
    }

    #[test]
    fn cjk_runs_make_bigrams_and_trigrams() {
        let tokens = tokenize("配置加载");
        assert!(tokens.contains(&"配置加载".to_string()), "verbatim 4-rune run");
        assert!(tokens.contains(&"配置".to_string()));
        assert!(tokens.contains(&"置加".to_string()));
        assert!(tokens.contains(&"配置加".to_string()));
    }

    #[test]
    fn mixed_ascii_and_cjk() {
        let tokens = tokenize("如何实现ParseConfig");
        assert!(tokens.contains(&"parse".to_string()));
        assert!(tokens.contains(&"config".to_string()));
        assert!(tokens.contains(&"如何".to_string()));
    }

    #[test]
    fn variants_original_plus_rejoined() {
        let variants = build_variants("ParseConfig");
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[0], ("ParseConfig".to_string(), 1.0));
        assert_eq!(variants[1], ("parse config".to_string(), 0.85));
    }

    #[test]
    fn single_token_query_has_one_variant() {
        let variants = build_variants("config");
        assert_eq!(variants.len(), 1);
    }

    #[test]
    fn already_tokenized_query_has_one_variant() {
        let variants = build_variants("parse config");
        assert_eq!(variants.len(), 1, "rejoined form equals the original");
    }
}
