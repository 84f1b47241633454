use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::models::{Paper, Talk};
use crate::text::{collapse_ws, person_key};

pub const MAX_TOPIC_SUGGESTIONS: usize = 6;
pub const MAX_PERSON_SUGGESTIONS: usize = 6;
pub const MAX_TITLE_SUGGESTIONS: usize = 4;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Suggestion {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct SuggestionSet {
    pub topics: Vec<Suggestion>,
    pub people: Vec<Suggestion>,
    pub talk_titles: Vec<Suggestion>,
    pub paper_titles: Vec<Suggestion>,
}

#[derive(Debug, Clone)]
struct PoolEntry {
    label: String,
    label_lower: String,
    count: usize,
}

/// Pre-aggregated suggestion pools: topics, people, talk titles, and paper
/// titles. Built once per session from whatever record sets loaded; a missing
/// source simply contributes nothing. Pools are sorted at build time so
/// lookups are a linear scan with an early cutoff.
#[derive(Debug, Clone, Default)]
pub struct SuggestCatalog {
    topics: Vec<PoolEntry>,
    people: Vec<PoolEntry>,
    talk_titles: Vec<PoolEntry>,
    paper_titles: Vec<PoolEntry>,
}

impl SuggestCatalog {
    #[must_use]
    pub fn build(talks: &[Talk], papers: &[Paper], topic_cap: Option<usize>) -> Self {
        let mut topics: HashMap<String, usize> = HashMap::new();
        let mut people: HashMap<String, PersonAggregate> = HashMap::new();
        let mut talk_titles: HashMap<String, usize> = HashMap::new();
        let mut paper_titles: HashMap<String, usize> = HashMap::new();

        for talk in talks {
            for topic in record_topics(talk.tags.iter().map(String::as_str), topic_cap) {
                *topics.entry(topic).or_insert(0) += 1;
            }
            for speaker in &talk.speakers {
                record_person(&mut people, &speaker.name);
            }
            if !talk.title.is_empty() {
                *talk_titles.entry(talk.title.clone()).or_insert(0) += 1;
            }
        }

        for paper in papers {
            let labels = paper
                .tags
                .iter()
                .chain(paper.keywords.iter())
                .map(String::as_str);
            for topic in record_topics(labels, topic_cap) {
                *topics.entry(topic).or_insert(0) += 1;
            }
            for author in &paper.authors {
                record_person(&mut people, &author.name);
            }
            if !paper.title.is_empty() {
                *paper_titles.entry(paper.title.clone()).or_insert(0) += 1;
            }
        }

        Self {
            topics: ranked_pool(topics),
            people: people_pool(people),
            talk_titles: alphabetical_pool(talk_titles),
            paper_titles: alphabetical_pool(paper_titles),
        }
    }

    /// Case-insensitive substring lookup across all four pools. Topics and
    /// people come back by descending count (then label), capped at six;
    /// titles alphabetically, capped at four.
    #[must_use]
    pub fn lookup(&self, query: &str) -> SuggestionSet {
        let needle = query.trim().to_lowercase();
        SuggestionSet {
            topics: filter_pool(&self.topics, &needle, MAX_TOPIC_SUGGESTIONS),
            people: filter_pool(&self.people, &needle, MAX_PERSON_SUGGESTIONS),
            talk_titles: filter_pool(&self.talk_titles, &needle, MAX_TITLE_SUGGESTIONS),
            paper_titles: filter_pool(&self.paper_titles, &needle, MAX_TITLE_SUGGESTIONS),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
            && self.people.is_empty()
            && self.talk_titles.is_empty()
            && self.paper_titles.is_empty()
    }
}

#[derive(Debug, Default)]
struct PersonAggregate {
    total: usize,
    variants: HashMap<String, usize>,
}

fn record_person(people: &mut HashMap<String, PersonAggregate>, raw_name: &str) {
    let display = collapse_ws(raw_name);
    if display.is_empty() {
        return;
    }
    let aggregate = people.entry(person_key(&display)).or_default();
    aggregate.total += 1;
    *aggregate.variants.entry(display).or_insert(0) += 1;
}

/// Topics for one record: tags and keywords merged, de-duplicated
/// case-insensitively with the first-seen casing kept, truncated at `cap`
/// when one is given.
#[must_use]
pub fn record_topics<'a>(
    labels: impl IntoIterator<Item = &'a str>,
    cap: Option<usize>,
) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for label in labels {
        if cap.is_some_and(|cap| out.len() >= cap) {
            break;
        }
        let collapsed = collapse_ws(label);
        if collapsed.is_empty() {
            continue;
        }
        if !seen.insert(collapsed.to_lowercase()) {
            continue;
        }
        out.push(collapsed);
    }
    out
}

fn ranked_pool(counts: HashMap<String, usize>) -> Vec<PoolEntry> {
    let mut pool = counts
        .into_iter()
        .map(|(label, count)| PoolEntry {
            label_lower: label.to_lowercase(),
            label,
            count,
        })
        .collect::<Vec<_>>();
    pool.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    pool
}

fn people_pool(people: HashMap<String, PersonAggregate>) -> Vec<PoolEntry> {
    let mut pool = people
        .into_values()
        .map(|aggregate| {
            let label = preferred_variant(&aggregate.variants);
            PoolEntry {
                label_lower: label.to_lowercase(),
                label,
                count: aggregate.total,
            }
        })
        .collect::<Vec<_>>();
    pool.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    pool
}

fn alphabetical_pool(counts: HashMap<String, usize>) -> Vec<PoolEntry> {
    let mut pool = counts
        .into_iter()
        .map(|(label, count)| PoolEntry {
            label_lower: label.to_lowercase(),
            label,
            count,
        })
        .collect::<Vec<_>>();
    pool.sort_by(|a, b| a.label.cmp(&b.label));
    pool
}

/// Most frequent spelling wins; equal counts fall back to alphabetical order
/// so the pick is stable run to run.
fn preferred_variant(variants: &HashMap<String, usize>) -> String {
    let mut best: Option<(&str, usize)> = None;
    for (label, count) in variants {
        let replace = match best {
            None => true,
            Some((best_label, best_count)) => {
                *count > best_count || (*count == best_count && label.as_str() < best_label)
            }
        };
        if replace {
            best = Some((label.as_str(), *count));
        }
    }
    best.map(|(label, _)| label.to_string()).unwrap_or_default()
}

fn filter_pool(pool: &[PoolEntry], needle: &str, limit: usize) -> Vec<Suggestion> {
    pool.iter()
        .filter(|entry| entry.label_lower.contains(needle))
        .take(limit)
        .map(|entry| Suggestion {
            label: entry.label.clone(),
            count: entry.count,
        })
        .collect()
}
