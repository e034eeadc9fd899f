//! Topic graph capability
//!
//! [`GraphService`] answers neighbourhood and dependency questions about the
//! topic graph. Callers must tolerate [`GraphError::Unavailable`].

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use mastery_algo::{PrerequisiteGraph, RelatedTopics};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    #[error("graph service unavailable")]
    Unavailable,
    #[error("topic not found in graph: {0}")]
    TopicNotFound(String),
}

pub trait GraphService: Send + Sync {
    fn related_topics(&self, topic_id: &str) -> Result<RelatedTopics, GraphError>;

    /// Transitive dependents of `topic_id`
    fn dependent_count(&self, topic_id: &str) -> Result<usize, GraphError>;

    fn prerequisite_graph(&self) -> Result<PrerequisiteGraph, GraphError>;
}

/// Graph held in memory. Neighbourhoods come from an explicit override when
/// one is registered, otherwise they are derived from the prerequisite edges.
pub struct MemoryGraph {
    prerequisites: RwLock<PrerequisiteGraph>,
    related_overrides: RwLock<BTreeMap<String, RelatedTopics>>,
    available: AtomicBool,
}

impl Default for MemoryGraph {
    fn default() -> Self {
        Self::new(PrerequisiteGraph::new())
    }
}

impl MemoryGraph {
    pub fn new(prerequisites: PrerequisiteGraph) -> Self {
        Self {
            prerequisites: RwLock::new(prerequisites),
            related_overrides: RwLock::new(BTreeMap::new()),
            available: AtomicBool::new(true),
        }
    }

    pub fn with_available(self, available: bool) -> Self {
        self.set_available(available);
        self
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Relaxed);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Relaxed)
    }

    pub fn add_prerequisite(&self, topic: &str, prerequisite: &str) {
        self.prerequisites.write().add_prerequisite(topic, prerequisite);
    }

    pub fn set_related(&self, topic: &str, related: RelatedTopics) {
        self.prerequisites.write().add_topic(topic);
        self.related_overrides.write().insert(topic.to_string(), related);
    }

    fn ensure_available(&self) -> Result<(), GraphError> {
        if self.is_available() {
            Ok(())
        } else {
            Err(GraphError::Unavailable)
        }
    }
}

fn owned(set: BTreeSet<&str>) -> Vec<String> {
    set.into_iter().map(str::to_string).collect()
}

/// Siblings share a parent. Cousins share a grandparent but no parent.
fn derive_related(graph: &PrerequisiteGraph, topic: &str) -> RelatedTopics {
    let parents: BTreeSet<&str> = graph.prerequisites_of(topic).into_iter().collect();
    let children: BTreeSet<&str> = graph.dependents_of(topic).into_iter().collect();

    let mut siblings: BTreeSet<&str> = BTreeSet::new();
    for parent in &parents {
        siblings.extend(graph.dependents_of(parent));
    }
    siblings.remove(topic);

    let mut cousins: BTreeSet<&str> = BTreeSet::new();
    for parent in &parents {
        for grandparent in graph.prerequisites_of(parent) {
            for uncle in graph.dependents_of(grandparent) {
                if parents.contains(uncle) {
                    continue;
                }
                cousins.extend(graph.dependents_of(uncle));
            }
        }
    }
    cousins.retain(|t| *t != topic && !siblings.contains(t) && !parents.contains(t) && !children.contains(t));

    RelatedTopics {
        siblings: owned(siblings),
        cousins: owned(cousins),
        parents: owned(parents),
        children: owned(children),
    }
}

impl GraphService for MemoryGraph {
    fn related_topics(&self, topic_id: &str) -> Result<RelatedTopics, GraphError> {
        self.ensure_available()?;
        if let Some(related) = self.related_overrides.read().get(topic_id) {
            return Ok(related.clone());
        }
        let graph = self.prerequisites.read();
        if !graph.contains(topic_id) {
            return Err(GraphError::TopicNotFound(topic_id.to_string()));
        }
        Ok(derive_related(&graph, topic_id))
    }

    fn dependent_count(&self, topic_id: &str) -> Result<usize, GraphError> {
        self.ensure_available()?;
        let graph = self.prerequisites.read();
        if !graph.contains(topic_id) {
            return Err(GraphError::TopicNotFound(topic_id.to_string()));
        }
        Ok(graph.dependent_count(topic_id))
    }

    fn prerequisite_graph(&self) -> Result<PrerequisiteGraph, GraphError> {
        self.ensure_available()?;
        Ok(self.prerequisites.read().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family() -> MemoryGraph {
        //            root
        //          /      \
        //       left      right
        //      /    \        \
        //    a       b        c
        MemoryGraph::new(PrerequisiteGraph::from_edges([
            ("left", "root"),
            ("right", "root"),
            ("a", "left"),
            ("b", "left"),
            ("c", "right"),
        ]))
    }

    #[test]
    fn test_derived_neighbourhood() {
        let related = family().related_topics("a").unwrap();
        assert_eq!(related.parents, vec!["left"]);
        assert_eq!(related.siblings, vec!["b"]);
        assert_eq!(related.cousins, vec!["c"]);
        assert!(related.children.is_empty());

        let left = family().related_topics("left").unwrap();
        assert_eq!(left.children, vec!["a", "b"]);
        assert_eq!(left.siblings, vec!["right"]);
    }

    #[test]
    fn test_override_wins() {
        let graph = family();
        graph.set_related(
            "a",
            RelatedTopics {
                siblings: vec!["z".into()],
                ..Default::default()
            },
        );
        assert_eq!(graph.related_topics("a").unwrap().siblings, vec!["z"]);
    }

    #[test]
    fn test_unavailable() {
        let graph = family().with_available(false);
        assert_eq!(graph.related_topics("a"), Err(GraphError::Unavailable));
        assert_eq!(graph.dependent_count("root"), Err(GraphError::Unavailable));
        graph.set_available(true);
        assert_eq!(graph.dependent_count("root"), Ok(5));
    }

    #[test]
    fn test_unknown_topic() {
        assert_eq!(
            family().related_topics("nope"),
            Err(GraphError::TopicNotFound("nope".into()))
        );
    }
}
