use std::collections::{BTreeMap, HashSet};

pub const MAX_TAGS_PER_NOTE: usize = 12;
pub const MAX_TAG_CHARS: usize = 48;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PresetTag {
    pub id: &'static str,
    pub label: &'static str,
}

pub const PRESET_TAGS: [PresetTag; 5] = [
    PresetTag { id: "todo", label: "TODO" },
    PresetTag { id: "bug", label: "Bug" },
    PresetTag { id: "info", label: "Info" },
    PresetTag { id: "idea", label: "Idea" },
    PresetTag { id: "question", label: "Question" },
];

/// Collapses whitespace runs, trims and caps the length. Empty means invalid.
pub fn sanitize_tag_value(tag: &str) -> String {
    tag.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(MAX_TAG_CHARS)
        .collect()
}

/// Sanitised, case-insensitively unique, at most [`MAX_TAGS_PER_NOTE`].
pub fn sanitize_tags<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for entry in raw {
        let cleaned = sanitize_tag_value(entry.as_ref());
        if cleaned.is_empty() || !seen.insert(cleaned.to_lowercase()) {
            continue;
        }
        out.push(cleaned);
        if out.len() >= MAX_TAGS_PER_NOTE {
            break;
        }
    }
    out
}

/// Short tags are shouted (`TODO`), longer ones capitalised.
pub fn format_tag_label(tag: &str) -> String {
    if tag.chars().count() <= 3 {
        return tag.to_uppercase();
    }
    let mut chars = tag.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Splits free-form input on `,`, `;` and newlines.
pub fn parse_tag_input(value: &str) -> Vec<String> {
    value
        .split([',', ';', '\n'])
        .map(sanitize_tag_value)
        .filter(|t| !t.is_empty())
        .collect()
}

pub fn contains_tag(tags: &[String], tag: &str) -> bool {
    let key = tag.to_lowercase();
    tags.iter().any(|t| t.to_lowercase() == key)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagEdit {
    Added,
    Removed,
    Duplicate,
    LimitReached,
    Invalid,
}

pub fn add_tag(tags: &mut Vec<String>, tag: &str) -> TagEdit {
    let cleaned = sanitize_tag_value(tag);
    if cleaned.is_empty() {
        return TagEdit::Invalid;
    }
    if contains_tag(tags, &cleaned) {
        return TagEdit::Duplicate;
    }
    if tags.len() >= MAX_TAGS_PER_NOTE {
        return TagEdit::LimitReached;
    }
    tags.push(cleaned);
    TagEdit::Added
}

pub fn remove_tag(tags: &mut Vec<String>, tag: &str) -> TagEdit {
    let key = tag.to_lowercase();
    let before = tags.len();
    tags.retain(|t| t.to_lowercase() != key);
    if tags.len() < before {
        TagEdit::Removed
    } else {
        TagEdit::Invalid
    }
}

pub fn toggle_tag(tags: &mut Vec<String>, tag: &str) -> TagEdit {
    let cleaned = sanitize_tag_value(tag);
    if cleaned.is_empty() {
        return TagEdit::Invalid;
    }
    if contains_tag(tags, &cleaned) {
        remove_tag(tags, &cleaned)
    } else {
        add_tag(tags, &cleaned)
    }
}

/// Adds every tag in `input`. Returns `false` when there was input but none
/// of it could be added, which the editor signals to the user.
pub fn commit_tag_input(tags: &mut Vec<String>, input: &str) -> bool {
    let parsed = parse_tag_input(input);
    let mut added_any = false;
    for entry in &parsed {
        added_any |= add_tag(tags, entry) == TagEdit::Added;
    }
    parsed.is_empty() || added_any
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagStat {
    pub tag: String,
    pub count: usize,
}

/// Usage per tag across notes, most used first, ties by name. Tags that
/// differ only in case are counted together under their first spelling.
pub fn compute_tag_stats<'a, I>(tag_lists: I) -> Vec<TagStat>
where
    I: IntoIterator<Item = &'a [String]>,
{
    let mut counts: BTreeMap<String, (String, usize)> = BTreeMap::new();
    for tags in tag_lists {
        for tag in tags {
            let entry = counts
                .entry(tag.to_lowercase())
                .or_insert_with(|| (tag.clone(), 0));
            entry.1 += 1;
        }
    }
    let mut stats: Vec<TagStat> = counts
        .into_values()
        .map(|(tag, count)| TagStat { tag, count })
        .collect();
    stats.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.tag.to_lowercase().cmp(&b.tag.to_lowercase()))
    });
    stats
}
