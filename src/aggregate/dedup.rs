//! # Deduplication
//!
//! Two-pass duplicate removal over one aggregation cycle's concatenated
//! source output:
//!
//! - **Exact pass**: the first record per normalized company+title key
//!   becomes that key's representative.
//! - **Fuzzy pass**: a record with an unseen key is still folded into an
//!   accepted representative when the normalized companies are equal and
//!   the word-overlap title similarity exceeds the threshold.
//!
//! First seen wins: a duplicate only contributes its location (comma-joined
//! union) unless the `PreferRicher` policy is active, which lets a duplicate
//! carrying strictly more filled metadata replace the representative outright
//! (the merged location and the output position are retained).

use std::collections::{HashMap, HashSet};

use crate::aggregate::types::JobPosting;

/// Legal-entity suffixes ignored when normalizing company names.
pub(crate) const LEGAL_SUFFIXES: [&str; 8] = [
    "inc",
    "llc",
    "corp",
    "ltd",
    "co",
    "corporation",
    "incorporated",
    "limited",
];

/// Word-overlap similarity above which two same-company titles are treated
/// as the same job.
pub const SIMILARITY_THRESHOLD: f64 = 0.85;

/// How fields of a detected duplicate are folded into its representative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergePolicy {
    /// Location union only; every other field keeps its first-seen value.
    #[default]
    FirstSeen,
    /// Location union, and a duplicate with strictly more filled metadata
    /// (salary, logo, description, tags) replaces the representative.
    PreferRicher,
}

#[derive(Debug, Clone)]
pub struct DedupEngine {
    policy: MergePolicy,
    threshold: f64,
}

impl Default for DedupEngine {
    fn default() -> Self {
        Self {
            policy: MergePolicy::FirstSeen,
            threshold: SIMILARITY_THRESHOLD,
        }
    }
}

impl DedupEngine {
    pub fn new(policy: MergePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    #[cfg(test)]
    fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Deduplicate one cycle's records, preserving first-seen order of the
    /// surviving representatives. Idempotent: running the output through
    /// again changes nothing.
    pub fn dedup(&self, jobs: Vec<JobPosting>) -> Vec<JobPosting> {
        let mut kept: Vec<JobPosting> = Vec::with_capacity(jobs.len());
        // Normalized (company, title) per accepted representative, in kept order.
        let mut accepted: Vec<(String, String)> = Vec::new();
        let mut by_key: HashMap<String, usize> = HashMap::new();
        let mut folded = 0usize;

        for job in jobs {
            let company = normalize_company(&job.company);
            let title = normalize_title(&job.title);
            let key = format!("{company}_{title}");

            if let Some(&idx) = by_key.get(&key) {
                self.merge_into(&mut kept[idx], job);
                folded += 1;
                continue;
            }

            let fuzzy_hit = accepted
                .iter()
                .position(|(c, t)| *c == company && title_similarity(t, &title) > self.threshold);
            if let Some(idx) = fuzzy_hit {
                self.merge_into(&mut kept[idx], job);
                folded += 1;
                continue;
            }

            by_key.insert(key, kept.len());
            accepted.push((company, title));
            kept.push(job);
        }

        if folded > 0 {
            tracing::debug!(folded, kept = kept.len(), "dedup folded duplicates");
        }
        kept
    }

    fn merge_into(&self, rep: &mut JobPosting, dup: JobPosting) {
        let location = merged_location(&rep.location, &dup.location);
        if self.policy == MergePolicy::PreferRicher
            && metadata_richness(&dup) > metadata_richness(rep)
        {
            *rep = dup;
        }
        rep.location = location;
    }
}

/// Union of two location strings: the duplicate's location is appended
/// comma-joined unless empty or already contained.
fn merged_location(rep: &str, dup: &str) -> String {
    if dup.is_empty() || rep.contains(dup) {
        rep.to_string()
    } else if rep.is_empty() {
        dup.to_string()
    } else {
        format!("{rep}, {dup}")
    }
}

/// Count of filled metadata fields, the comparison `PreferRicher` uses.
fn metadata_richness(job: &JobPosting) -> usize {
    usize::from(job.salary.is_some())
        + usize::from(job.logo_url.is_some())
        + usize::from(!job.description.is_empty())
        + usize::from(!job.tags.is_empty())
}

/// Lowercase, drop legal-entity suffixes, keep alphanumerics only.
pub fn normalize_company(name: &str) -> String {
    let lowered = name.to_lowercase();
    lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty() && !LEGAL_SUFFIXES.contains(w))
        .collect()
}

/// Lowercase, strip non-alphanumerics (spaces retained), collapse whitespace.
pub fn normalize_title(title: &str) -> String {
    let cleaned: String = title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Exact-pass key: normalized company and title joined with an underscore.
pub fn dedup_key(job: &JobPosting) -> String {
    format!(
        "{}_{}",
        normalize_company(&job.company),
        normalize_title(&job.title)
    )
}

/// Word-overlap similarity of two normalized titles:
/// `2 * |intersection| / (|words a| + |words b|)`.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let wa: HashSet<&str> = a.split_whitespace().collect();
    let wb: HashSet<&str> = b.split_whitespace().collect();
    if wa.is_empty() || wb.is_empty() {
        return 0.0;
    }
    let common = wa.intersection(&wb).count();
    2.0 * common as f64 / (wa.len() + wb.len()) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn job(id: &str, company: &str, title: &str, location: &str) -> JobPosting {
        JobPosting {
            id: id.to_string(),
            title: title.to_string(),
            company: company.to_string(),
            location: location.to_string(),
            salary: None,
            job_type: "Full-time".to_string(),
            description: String::new(),
            tags: vec![],
            logo_url: None,
            apply_url: "https://example.test/apply".to_string(),
            posted_at: Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
            source: "test".to_string(),
            sponsorship: Default::default(),
            active: true,
        }
    }

    #[test]
    fn company_normalization_drops_suffixes_and_punctuation() {
        assert_eq!(normalize_company("Amazon.com Services LLC"), "amazoncomservices");
        assert_eq!(normalize_company("Acme, Inc."), "acme");
        assert_eq!(normalize_company("Globex Corporation"), "globex");
        // Suffix words are dropped wherever a word boundary isolates them.
        assert_eq!(normalize_company("Co-operative Bank"), "operativebank");
    }

    #[test]
    fn title_normalization_keeps_spaces() {
        assert_eq!(normalize_title("Senior Software Engineer II"), "senior software engineer ii");
        assert_eq!(normalize_title("  C++  Engineer!  "), "c engineer");
    }

    #[test]
    fn similarity_is_word_overlap_dice() {
        let a = normalize_title("Senior Software Engineer");
        let b = normalize_title("Senior Software Engineer II");
        let sim = title_similarity(&a, &b);
        assert!((sim - 6.0 / 7.0).abs() < 1e-9);
        assert_eq!(title_similarity("alpha beta", "gamma delta"), 0.0);
        assert_eq!(title_similarity("", "anything"), 0.0);
    }

    #[test]
    fn exact_key_keeps_one_representative() {
        let engine = DedupEngine::default();
        let out = engine.dedup(vec![
            job("a-1", "Acme Inc", "Backend Engineer", "NYC"),
            job("b-1", "Acme, LLC", "Backend   Engineer!", "Berlin"),
            job("a-2", "Other Co", "Backend Engineer", "NYC"),
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].id, "a-1");
        assert_eq!(out[0].location, "NYC, Berlin");
        assert_eq!(out[1].id, "a-2");
    }

    #[test]
    fn fuzzy_pass_merges_near_identical_titles_at_same_company() {
        let engine = DedupEngine::default();
        let out = engine.dedup(vec![
            job("a-1", "AcmeCorp", "Senior Software Engineer", "New York"),
            job("b-1", "acmecorp inc", "Senior Software Engineer II", "Remote"),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "a-1");
        assert_eq!(out[0].title, "Senior Software Engineer");
        assert_eq!(out[0].location, "New York, Remote");
    }

    #[test]
    fn fuzzy_pass_requires_equal_company() {
        let engine = DedupEngine::default();
        let out = engine.dedup(vec![
            job("a-1", "AcmeCorp", "Senior Software Engineer", "NYC"),
            job("b-1", "Initech", "Senior Software Engineer II", "NYC"),
        ]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn location_already_contained_is_not_appended() {
        let engine = DedupEngine::default();
        let out = engine.dedup(vec![
            job("a-1", "Acme", "Engineer", "New York, Remote"),
            job("b-1", "Acme", "Engineer", "Remote"),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].location, "New York, Remote");
    }

    #[test]
    fn empty_duplicate_location_is_ignored() {
        let engine = DedupEngine::default();
        let out = engine.dedup(vec![
            job("a-1", "Acme", "Engineer", ""),
            job("b-1", "Acme", "Engineer", "Berlin"),
            job("c-1", "Acme", "Engineer", ""),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].location, "Berlin");
    }

    #[test]
    fn dedup_is_idempotent() {
        let engine = DedupEngine::default();
        let once = engine.dedup(vec![
            job("a-1", "AcmeCorp", "Senior Software Engineer", "NYC"),
            job("b-1", "AcmeCorp", "Senior Software Engineer II", "Remote"),
            job("c-1", "Initech", "QA Analyst", "Austin"),
        ]);
        let twice = engine.dedup(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn prefer_richer_policy_swaps_in_richer_duplicate() {
        let engine = DedupEngine::new(MergePolicy::PreferRicher);
        let first = job("a-1", "Acme", "Engineer", "NYC");
        let mut second = job("b-1", "Acme", "Engineer", "Remote");
        second.salary = Some("$100k".to_string());
        second.description = "Build things.".to_string();
        second.tags = vec!["rust".to_string()];

        let out = engine.dedup(vec![first, second]);
        assert_eq!(out.len(), 1);
        // Richer duplicate wins wholesale; only the merged location survives.
        assert_eq!(out[0].id, "b-1");
        assert_eq!(out[0].salary.as_deref(), Some("$100k"));
        assert_eq!(out[0].description, "Build things.");
        assert_eq!(out[0].location, "NYC, Remote");
    }

    #[test]
    fn prefer_richer_keeps_representative_on_tie() {
        let engine = DedupEngine::new(MergePolicy::PreferRicher);
        let out = engine.dedup(vec![
            job("a-1", "Acme", "Engineer", "NYC"),
            job("b-1", "Acme", "Engineer", "Remote"),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "a-1");
        assert_eq!(out[0].location, "NYC, Remote");
    }

    #[test]
    fn first_seen_policy_leaves_metadata_alone() {
        let engine = DedupEngine::default();
        let mut second = job("b-1", "Acme", "Engineer", "Remote");
        second.salary = Some("$100k".to_string());
        let out = engine.dedup(vec![job("a-1", "Acme", "Engineer", "NYC"), second]);
        assert_eq!(out.len(), 1);
        assert!(out[0].salary.is_none());
    }

    #[test]
    fn threshold_is_strict_greater_than() {
        // "alpha beta" vs "alpha gamma": 2*1/4 = 0.5; with threshold 0.5 the
        // comparison must not merge.
        let engine = DedupEngine::default().with_threshold(0.5);
        let out = engine.dedup(vec![
            job("a-1", "Acme", "alpha beta", "NYC"),
            job("b-1", "Acme", "alpha gamma", "Remote"),
        ]);
        assert_eq!(out.len(), 2);
    }
}
