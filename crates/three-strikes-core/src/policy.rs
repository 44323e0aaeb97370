use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

/// Decides which disapproved ads are worth removing, based on their policy topics.
///
/// With a non-empty inclusion list the policy is an allow-list: a topic matches when it
/// contains one of the inclusion substrings. Otherwise it is a block-list: a topic matches
/// unless it contains one of the exclusion substrings, so two empty lists flag everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicPolicy {
    included: Vec<String>,
    excluded: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TopicsFile {
    #[serde(default)]
    only_these_substrings: Vec<String>,
    #[serde(default)]
    anything_but_these_substrings: Vec<String>,
}

impl TopicPolicy {
    /// The exclusion list is dropped when an inclusion list is present.
    pub fn new(included: Vec<String>, excluded: Vec<String>) -> Self {
        let included: Vec<String> = included.iter().map(|s| s.to_lowercase()).collect();
        let excluded = if included.is_empty() {
            excluded.iter().map(|s| s.to_lowercase()).collect()
        } else {
            Vec::new()
        };
        Self { included, excluded }
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let file: TopicsFile = serde_json::from_str(text.trim_start_matches('\u{feff}'))?;
        Ok(Self::new(
            file.only_these_substrings,
            file.anything_but_these_substrings,
        ))
    }

    pub fn load(path: &Path) -> Result<Self, crate::Error> {
        let text = fs::read_to_string(path)?;
        let policy = Self::from_json(&text)?;
        info!(
            "Loaded topic policy from {}: included={:?} excluded={:?}",
            path.display(),
            policy.included,
            policy.excluded
        );
        Ok(policy)
    }

    pub fn included(&self) -> &[String] {
        &self.included
    }

    pub fn excluded(&self) -> &[String] {
        &self.excluded
    }

    pub fn is_allow_list(&self) -> bool {
        !self.included.is_empty()
    }

    pub fn is_eligible<S: AsRef<str>>(&self, topics: &[S]) -> bool {
        is_eligible(topics, &self.included, &self.excluded)
    }
}

/// True when any topic matches the inclusion/exclusion policy.
pub fn is_eligible<S, I, E>(topics: &[S], included: &[I], excluded: &[E]) -> bool
where
    S: AsRef<str>,
    I: AsRef<str>,
    E: AsRef<str>,
{
    topics.iter().any(|topic| {
        let topic = topic.as_ref().to_lowercase();
        if !included.is_empty() {
            contains_any(&topic, included)
        } else {
            !contains_any(&topic, excluded)
        }
    })
}

fn contains_any<T: AsRef<str>>(topic: &str, substrings: &[T]) -> bool {
    substrings
        .iter()
        .any(|s| topic.contains(&s.as_ref().to_lowercase()))
}
