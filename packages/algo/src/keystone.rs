//! Keystone Scorer
//!
//! Counts, for every topic in a prerequisite graph, how many topics depend on
//! it directly or transitively. Topics with at least [`KEYSTONE_THRESHOLD`]
//! dependents are keystones and get a scheduling priority boost.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::types::KEYSTONE_THRESHOLD;

const BOOST_PER_DEPENDENT: f64 = 0.025;
const BOOST_DEPENDENT_CAP: usize = 20;

/// topic → prerequisites
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrerequisiteGraph {
    prerequisites: BTreeMap<String, BTreeSet<String>>,
}

impl PrerequisiteGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_topic(&mut self, topic: impl Into<String>) {
        self.prerequisites.entry(topic.into()).or_default();
    }

    /// `topic` requires `prerequisite`
    pub fn add_prerequisite(&mut self, topic: impl Into<String>, prerequisite: impl Into<String>) {
        let prerequisite = prerequisite.into();
        self.prerequisites.entry(prerequisite.clone()).or_default();
        self.prerequisites
            .entry(topic.into())
            .or_default()
            .insert(prerequisite);
    }

    pub fn from_edges<I, T, P>(edges: I) -> Self
    where
        I: IntoIterator<Item = (T, P)>,
        T: Into<String>,
        P: Into<String>,
    {
        let mut graph = Self::new();
        for (topic, prerequisite) in edges {
            graph.add_prerequisite(topic, prerequisite);
        }
        graph
    }

    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.prerequisites.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.prerequisites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prerequisites.is_empty()
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.prerequisites.contains_key(topic)
    }

    /// Direct prerequisites of `topic`
    pub fn prerequisites_of(&self, topic: &str) -> Vec<&str> {
        self.prerequisites
            .get(topic)
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Topics that list `topic` as a direct prerequisite
    pub fn dependents_of(&self, topic: &str) -> Vec<&str> {
        self.prerequisites
            .iter()
            .filter(|(_, prerequisites)| prerequisites.contains(topic))
            .map(|(dependent, _)| dependent.as_str())
            .collect()
    }

    fn direct_dependents(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (topic, prerequisites) in &self.prerequisites {
            dependents.entry(topic.as_str()).or_default();
            for prerequisite in prerequisites {
                dependents
                    .entry(prerequisite.as_str())
                    .or_default()
                    .push(topic.as_str());
            }
        }
        dependents
    }

    /// Transitive dependents of one topic. Cycles are tolerated; a topic is
    /// never counted as its own dependent.
    pub fn dependent_count(&self, topic: &str) -> usize {
        let dependents = self.direct_dependents();
        count_reachable(&dependents, topic)
    }

    pub fn dependent_counts(&self) -> BTreeMap<String, usize> {
        let dependents = self.direct_dependents();
        self.prerequisites
            .keys()
            .map(|topic| (topic.clone(), count_reachable(&dependents, topic)))
            .collect()
    }
}

fn count_reachable(dependents: &BTreeMap<&str, Vec<&str>>, start: &str) -> usize {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = VecDeque::new();
    seen.insert(start);
    queue.push_back(start);
    while let Some(current) = queue.pop_front() {
        if let Some(next) = dependents.get(current) {
            for &dependent in next {
                if seen.insert(dependent) {
                    queue.push_back(dependent);
                }
            }
        }
    }
    seen.len() - 1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeystoneScore {
    pub topic: String,
    pub dependent_count: usize,
    pub is_keystone: bool,
}

impl KeystoneScore {
    pub fn new(topic: impl Into<String>, dependent_count: usize) -> Self {
        Self {
            topic: topic.into(),
            dependent_count,
            is_keystone: dependent_count >= KEYSTONE_THRESHOLD,
        }
    }

    /// Multiplicative scheduling boost, 1.0 for non-keystones
    pub fn priority_boost(&self) -> f64 {
        if !self.is_keystone {
            return 1.0;
        }
        1.0 + self.dependent_count.min(BOOST_DEPENDENT_CAP) as f64 * BOOST_PER_DEPENDENT
    }
}

/// Scores for every topic, most dependents first
pub fn keystone_scores(graph: &PrerequisiteGraph) -> Vec<KeystoneScore> {
    let mut scores: Vec<KeystoneScore> = graph
        .dependent_counts()
        .into_iter()
        .map(|(topic, count)| KeystoneScore::new(topic, count))
        .collect();
    scores.sort_by(|a, b| {
        b.dependent_count
            .cmp(&a.dependent_count)
            .then_with(|| a.topic.cmp(&b.topic))
    });
    scores
}
