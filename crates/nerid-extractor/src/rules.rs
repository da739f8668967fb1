//! Rule-based token classifier
//!
//! Offline classifier for Indonesian personal data:
//! - Regex patterns: emails, phone numbers, NIK, dates, gender words, titled names
//! - Gazetteer: major Indonesian cities and provinces
//!
//! Used for development, tests and as a fallback backend when no hosted
//! model is reachable. Emits one token per matched entity.

use std::collections::HashSet;

use async_trait::async_trait;
use regex::Regex;

use nerid_core::{CharIndex, ClassifiedToken, NeridError, Result, TokenClassifier};

const MONTHS: &str =
    "januari|februari|maret|april|mei|juni|juli|agustus|september|oktober|november|desember";

/// A compiled rule
struct Rule {
    regex: Regex,
    label: String,
    confidence: f32,
}

/// Rule-based classifier using regex patterns and a gazetteer
pub struct RuleBasedClassifier {
    rules: Vec<Rule>,
}

impl RuleBasedClassifier {
    /// Create a classifier with the default Indonesian rules
    pub fn new() -> Self {
        let mut classifier = Self { rules: Vec::new() };

        classifier.init_patterns();
        classifier.init_gazetteer();
        classifier
    }

    /// Create a classifier without any rules
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Add a custom pattern; capture group 1, when present, is the entity
    pub fn with_pattern(mut self, pattern: &str, label: &str, confidence: f32) -> Result<Self> {
        let regex = Regex::new(pattern)
            .map_err(|e| NeridError::ConfigError(format!("invalid pattern '{pattern}': {e}")))?;
        self.rules.push(Rule {
            regex,
            label: label.to_string(),
            confidence,
        });
        Ok(self)
    }

    /// Number of compiled rules
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    fn init_patterns(&mut self) {
        // Contact details
        self.add_pattern(
            r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}",
            "EMAIL",
            0.95,
        );
        self.add_pattern(
            r"(?:\+62|\b62|\b0)8\d{1,2}[-\s]?\d{3,4}[-\s]?\d{3,5}\b",
            "PHONE",
            0.9,
        );

        // NIK (Nomor Induk Kependudukan)
        self.add_pattern(r"\b\d{16}\b", "SSN", 0.9);

        // Dates and times
        self.add_pattern(r"\b\d{4}-\d{2}-\d{2}\b", "DATE_TIME", 0.95);
        self.add_pattern(r"\b\d{1,2}[-/]\d{1,2}[-/]\d{2,4}\b", "DATE_TIME", 0.9);
        self.add_pattern(
            &format!(r"(?i)\b\d{{1,2}}\s+(?:{MONTHS})\s+\d{{4}}\b"),
            "DATE_TIME",
            0.9,
        );
        self.add_pattern(r"\b\d{1,2}[:.]\d{2}\s*(?:WIB|WITA|WIT)\b", "DATE_TIME", 0.85);

        // Gender
        self.add_pattern(r"(?i)\b(?:laki-laki|perempuan|pria|wanita)\b", "GENDER", 0.85);

        // Names introduced by an honorific
        self.add_pattern(
            r"\b(?:Bapak|Ibu|Pak|Bu|Sdr\.|Sdri\.)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)",
            "PER",
            0.8,
        );
    }

    fn init_gazetteer(&mut self) {
        self.add_term(
            "Jakarta",
            "LOC",
            &["DKI Jakarta", "Jakarta Pusat", "Jakarta Selatan", "Jakarta Barat", "Jakarta Timur", "Jakarta Utara"],
        );
        self.add_term("Yogyakarta", "LOC", &["Jogja", "Yogya", "Jogjakarta", "DIY"]);
        self.add_term("Surabaya", "LOC", &[]);
        self.add_term("Bandung", "LOC", &[]);
        self.add_term("Medan", "LOC", &[]);
        self.add_term("Semarang", "LOC", &[]);
        self.add_term("Makassar", "LOC", &["Ujung Pandang"]);
        self.add_term("Palembang", "LOC", &[]);
        self.add_term("Denpasar", "LOC", &[]);
        self.add_term("Malang", "LOC", &[]);
        self.add_term("Bogor", "LOC", &[]);
        self.add_term("Depok", "LOC", &[]);
        self.add_term("Tangerang", "LOC", &["Tangerang Selatan", "Tangsel"]);
        self.add_term("Bekasi", "LOC", &[]);
        self.add_term("Padang", "LOC", &[]);
        self.add_term("Pekanbaru", "LOC", &[]);
        self.add_term("Balikpapan", "LOC", &[]);
        self.add_term("Manado", "LOC", &[]);
        self.add_term("Pontianak", "LOC", &[]);
        self.add_term("Banjarmasin", "LOC", &[]);

        // Provinces
        self.add_term("Jawa Barat", "LOC", &["Jabar"]);
        self.add_term("Jawa Tengah", "LOC", &["Jateng"]);
        self.add_term("Jawa Timur", "LOC", &["Jatim"]);
        self.add_term("Bali", "LOC", &[]);
        self.add_term("Sumatera Utara", "LOC", &["Sumut"]);
        self.add_term("Sulawesi Selatan", "LOC", &["Sulsel"]);
        self.add_term("Kalimantan Timur", "LOC", &["Kaltim"]);
        self.add_term("Papua", "LOC", &[]);
    }

    /// Add a regex pattern
    fn add_pattern(&mut self, pattern: &str, label: &str, confidence: f32) {
        match Regex::new(pattern) {
            Ok(regex) => self.rules.push(Rule {
                regex,
                label: label.to_string(),
                confidence,
            }),
            Err(e) => tracing::warn!(pattern, error = %e, "Skipping invalid NER pattern"),
        }
    }

    /// Add a gazetteer term and its aliases as one word-bounded rule
    fn add_term(&mut self, term: &str, label: &str, aliases: &[&str]) {
        // Longest first so "Jakarta Selatan" wins over "Jakarta"
        let mut names: Vec<&str> = std::iter::once(term).chain(aliases.iter().copied()).collect();
        names.sort_by_key(|n| std::cmp::Reverse(n.len()));

        let alternation = names
            .iter()
            .map(|n| regex::escape(n))
            .collect::<Vec<_>>()
            .join("|");

        self.add_pattern(&format!(r"(?i)\b(?:{alternation})\b"), label, 0.9);
    }

    /// Run every rule; offsets are converted to character offsets
    fn extract_matches(&self, text: &str) -> Vec<ClassifiedToken> {
        let offsets = CharIndex::new(text);
        let mut tokens = Vec::new();

        for rule in &self.rules {
            for caps in rule.regex.captures_iter(text) {
                let Some(mat) = caps.get(1).or_else(|| caps.get(0)) else {
                    continue;
                };
                if mat.start() == mat.end() {
                    continue;
                }

                tokens.push(
                    ClassifiedToken::new(
                        rule.label.clone(),
                        offsets.char_offset(mat.start()),
                        offsets.char_offset(mat.end()),
                    )
                    .with_score(rule.confidence),
                );
            }
        }

        tokens
    }

    /// Remove overlapping matches, keeping the earliest, then most confident, then longest
    fn deduplicate(&self, mut tokens: Vec<ClassifiedToken>) -> Vec<ClassifiedToken> {
        tokens.sort_by(|a, b| {
            let score = |t: &ClassifiedToken| t.score.unwrap_or(0.0);
            a.start
                .cmp(&b.start)
                .then(score(b).total_cmp(&score(a)))
                .then(b.end.cmp(&a.end))
        });

        let mut result = Vec::new();
        let mut covered: HashSet<usize> = HashSet::new();

        for token in tokens {
            let overlaps = (token.start..token.end).any(|i| covered.contains(&i));

            if !overlaps {
                covered.extend(token.start..token.end);
                result.push(token);
            }
        }

        result.sort_by_key(|t| t.start);
        result
    }
}

impl Default for RuleBasedClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenClassifier for RuleBasedClassifier {
    async fn classify(&self, text: &str) -> Result<Vec<ClassifiedToken>> {
        let matches = self.extract_matches(text);
        Ok(self.deduplicate(matches))
    }

    fn name(&self) -> &str {
        "rules"
    }
}
