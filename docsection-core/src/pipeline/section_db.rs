//! C6 — Section Database & Matcher (spec §4.6).
//!
//! A small persisted name-resolution table: a header string is resolved to
//! a `CanonicalName` by exact match, then normalized/prefix match, then
//! regex pattern, then (if enabled) embedding similarity, falling back to
//! `Unknown`. Matches below `Exact` feed a learning step that grows the
//! variant set so the next parse of a similarly-worded resume resolves
//! without falling through the pipeline. Persistence follows the teacher's
//! `storage.rs` `FileStorage` convention (one JSON file per key) but adds
//! the atomic write-then-rename it lacked. The regex table is grounded in
//! `rules/pattern_detection.rs`'s pattern-promotion rule.

use crate::config::SectionDbConfig;
use crate::types::{CanonicalName, MatchKind, SectionDatabaseEntry};
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Per-pattern confidence (spec §4.6 step 4): 0.75 for the skills pattern,
/// 0.8 for every other pattern rule.
static PATTERNS: Lazy<Vec<(CanonicalName, Regex, f32)>> = Lazy::new(|| {
    let table: &[(CanonicalName, &str, f32)] = &[
        (CanonicalName::Experience, r"(?i)^(work|professional|employment)\s+(experience|history)$", 0.8),
        (CanonicalName::Experience, r"(?i)developer|engineer|analyst|manager.*experience", 0.8),
        (CanonicalName::Education, r"(?i)^education(al)?\s*(background|history)?$", 0.8),
        (CanonicalName::Skills, r"(?i)^(technical\s+)?skills?(\s+(and|&)\s+\w+)?$", 0.75),
        (CanonicalName::Projects, r"(?i)^(personal|academic|key)?\s*projects?$", 0.8),
        (CanonicalName::Certifications, r"(?i)^certifications?(\s+(and|&)\s+licenses?)?$", 0.8),
        (CanonicalName::Summary, r"(?i)^(professional\s+)?summary$|^objective$|^profile$|^about\s*me$", 0.8),
        (CanonicalName::Achievements, r"(?i)^(achievements?|awards?|honou?rs?)$", 0.8),
        (CanonicalName::Publications, r"(?i)^publications?$|^papers?$", 0.8),
        (CanonicalName::Languages, r"(?i)^languages?(\s+spoken)?$", 0.8),
        (CanonicalName::Volunteer, r"(?i)^volunteer(ing)?(\s+experience)?$", 0.8),
        (CanonicalName::Hobbies, r"(?i)^(hobbies|interests)$", 0.8),
        (CanonicalName::References, r"(?i)^references?$", 0.8),
        (CanonicalName::Declarations, r"(?i)^declaration$", 0.8),
        (CanonicalName::Contact, r"(?i)^contact(\s+(info|information|details))?$", 0.8),
    ];
    table
        .iter()
        .map(|(name, pattern, score)| (*name, Regex::new(pattern).expect("built-in pattern compiles"), *score))
        .collect()
});

fn builtin_variants(name: CanonicalName) -> &'static [&'static str] {
    match name {
        CanonicalName::Contact => &["contact", "contact information", "contact details", "personal information"],
        CanonicalName::Summary => &["summary", "professional summary", "objective", "profile", "about me", "career objective"],
        CanonicalName::Skills => &["skills", "technical skills", "core competencies", "skills and abilities"],
        CanonicalName::Experience => &["experience", "work experience", "professional experience", "employment history", "work history"],
        CanonicalName::Projects => &["projects", "personal projects", "academic projects", "key projects"],
        CanonicalName::Education => &["education", "educational background", "academic background"],
        CanonicalName::Certifications => &["certifications", "certifications and licenses", "licenses"],
        CanonicalName::Achievements => &["achievements", "awards", "honors", "honours"],
        CanonicalName::Publications => &["publications", "papers"],
        CanonicalName::Languages => &["languages", "languages spoken"],
        CanonicalName::Volunteer => &["volunteer", "volunteering", "volunteer experience"],
        CanonicalName::Hobbies => &["hobbies", "interests"],
        CanonicalName::References => &["references"],
        CanonicalName::Declarations => &["declaration"],
        CanonicalName::Unknown => &[],
    }
}

pub struct SectionDatabase {
    entries: HashMap<CanonicalName, SectionDatabaseEntry>,
}

impl SectionDatabase {
    pub fn with_builtin_defaults() -> Self {
        let mut entries = HashMap::new();
        for name in CanonicalName::ALL {
            let mut entry = SectionDatabaseEntry::default();
            for variant in builtin_variants(name) {
                entry.variants.insert(variant.to_string());
            }
            entries.insert(name, entry);
        }
        Self { entries }
    }

    /// Load persisted variants from `path` (one JSON file per canonical
    /// name), overlaying them on top of the built-in defaults. Missing
    /// directory is not an error — a fresh install has none yet.
    pub fn load(path: &str) -> Result<Self> {
        let mut db = Self::with_builtin_defaults();
        let dir = Path::new(path);
        if !dir.exists() {
            println!("   📋 section database {path} does not exist yet, starting from built-ins");
            return Ok(db);
        }

        for name in CanonicalName::ALL {
            let file = Self::entry_path(dir, name);
            if !file.exists() {
                continue;
            }
            let contents = fs::read_to_string(&file)
                .with_context(|| format!("reading section db entry {}", file.display()))?;
            let persisted: SectionDatabaseEntry = serde_json::from_str(&contents)
                .with_context(|| format!("parsing section db entry {}", file.display()))?;
            let entry = db.entries.entry(name).or_default();
            entry.variants.extend(persisted.variants);
            entry.usage_count = entry.usage_count.max(persisted.usage_count);
            if persisted.embedding_centroid.is_some() {
                entry.embedding_centroid = persisted.embedding_centroid;
            }
        }

        Ok(db)
    }

    fn entry_path(dir: &Path, name: CanonicalName) -> PathBuf {
        dir.join(format!("{}.json", name.as_str().to_lowercase()))
    }

    /// Flush every entry to `path` using write-to-temp-then-rename so a
    /// crash mid-write never leaves a truncated file behind — the gap in
    /// the teacher's `storage.rs`, which wrote directly to the target path.
    pub fn commit(&self, path: &str) -> Result<()> {
        let dir = Path::new(path);
        fs::create_dir_all(dir).with_context(|| format!("creating section db dir {path}"))?;

        for (name, entry) in &self.entries {
            let final_path = Self::entry_path(dir, *name);
            let tmp_path = final_path.with_extension("json.tmp");
            let serialized =
                serde_json::to_string_pretty(entry).context("serializing section db entry")?;
            fs::write(&tmp_path, serialized)
                .with_context(|| format!("writing {}", tmp_path.display()))?;
            fs::rename(&tmp_path, &final_path)
                .with_context(|| format!("renaming {} into place", tmp_path.display()))?;
        }

        println!("   💾 committed section database to {path}");
        Ok(())
    }

    /// Resolve a header candidate's text to a canonical name. Returns
    /// `(Unknown, Unknown, 0.0)` when nothing matches (spec §4.6 match
    /// pipeline: exact → normalized → pattern → embedding → unknown).
    pub fn match_line(&self, text: &str) -> (CanonicalName, MatchKind, f32) {
        let normalized = Self::normalize(text);
        if normalized.is_empty() {
            return (CanonicalName::Unknown, MatchKind::Unknown, 0.0);
        }

        for name in CanonicalName::ALL {
            if let Some(entry) = self.entries.get(&name) {
                if entry.variants.contains(&normalized) {
                    return (name, MatchKind::Exact, 1.0);
                }
            }
        }

        let trimmed = normalized.trim_end_matches(':').trim().to_string();
        for name in CanonicalName::ALL {
            if let Some(entry) = self.entries.get(&name) {
                if entry.variants.iter().any(|v| v.trim_end_matches(':').trim() == trimmed) {
                    return (name, MatchKind::Normalized, 0.85);
                }
            }
        }

        for (name, pattern, score) in PATTERNS.iter() {
            if pattern.is_match(&trimmed) {
                return (*name, MatchKind::Pattern, *score);
            }
        }

        (CanonicalName::Unknown, MatchKind::Unknown, 0.0)
    }

    /// Spec §4.5 normalization: lowercase, strip everything but letters and
    /// whitespace, then collapse runs of single-letter tokens (the
    /// letter-spaced "E X P E R I E N C E" style heading) into one word.
    /// Idempotent — `normalize(normalize(s)) == normalize(s)`, since the
    /// output has no punctuation, no case, and no single-letter runs left to
    /// collapse.
    fn normalize(text: &str) -> String {
        let lowered = text.trim().to_lowercase();
        let filtered: String = lowered.chars().filter(|c| c.is_alphabetic() || c.is_whitespace()).collect();

        let tokens: Vec<&str> = filtered.split_whitespace().collect();
        let mut words: Vec<String> = Vec::new();
        let mut i = 0;
        while i < tokens.len() {
            if tokens[i].chars().count() == 1 {
                let mut run = String::new();
                while i < tokens.len() && tokens[i].chars().count() == 1 {
                    run.push_str(tokens[i]);
                    i += 1;
                }
                words.push(run);
            } else {
                words.push(tokens[i].to_string());
                i += 1;
            }
        }
        words.join(" ")
    }

    /// Learning step: a line that resolved above the learn threshold via
    /// anything weaker than `Exact` gets its surface form folded into the
    /// matched entry's variant set so future parses resolve it directly
    /// (spec §4.6 learning rule).
    pub fn learn(
        &mut self,
        raw_text: &str,
        canonical_name: CanonicalName,
        match_kind: MatchKind,
        score: f32,
        config: &SectionDbConfig,
    ) {
        if canonical_name == CanonicalName::Unknown {
            return;
        }
        if matches!(match_kind, MatchKind::Exact) {
            return;
        }
        if score < config.learn_score_threshold {
            return;
        }

        let normalized = Self::normalize(raw_text);
        let entry = self.entries.entry(canonical_name).or_default();
        if entry.variants.insert(normalized.clone()) {
            println!("   🧠 learned variant '{normalized}' for {}", canonical_name.as_str());
        }
        entry.usage_count += 1;
    }
}
