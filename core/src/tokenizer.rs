use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use unicode_normalization::UnicodeNormalization;
use std::collections::{HashMap, HashSet};

lazy_static! {
    // A term starts with a letter, so bare quantities like "2" or "1/2" never become terms.
    static ref RE: Regex = Regex::new(r"(?u)\p{L}[\p{L}\p{N}_']*").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","can't","cannot","could","couldn't",
            "did","didn't","do","does","doesn't","doing","don't","down","during",
            "each","few","for","from","further",
            "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
            "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
            "let's","me","more","most","mustn't","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
            "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
            "under","until","up","very",
            "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
            "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

/// Tokenize text into index terms using NFKC normalization, lowercase, stopword removal, and stemming.
///
/// Recipe documents and search queries both go through here, so "Tomatoes" in a query
/// and "tomato" in an ingredient line produce the same term.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    let mut tokens = Vec::new();
    for mat in RE.find_iter(&normalized) {
        let token = mat.as_str();
        // single letters are mostly unit abbreviations ("g", "l")
        if token.chars().count() < 2 || is_stopword(token) { continue; }
        tokens.push(STEMMER.stem(token).to_string());
    }
    tokens
}

/// Raw term frequencies for `text`.
pub fn term_counts(text: &str) -> HashMap<String, u32> {
    let mut counts = HashMap::new();
    for term in tokenize(text) {
        *counts.entry(term).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_quantities_and_stopwords() {
        let t = tokenize("2 cups of the flour");
        assert_eq!(t, vec!["cup".to_string(), "flour".to_string()]);
    }

    #[test]
    fn drops_single_letter_units() {
        assert_eq!(tokenize("500 g beef, 1 l stock"), vec!["beef".to_string(), "stock".to_string()]);
    }

    #[test]
    fn counts_repeated_terms() {
        let counts = term_counts("onion onions Onion");
        assert_eq!(counts.get("onion"), Some(&3));
        assert_eq!(counts.len(), 1);
    }
}
