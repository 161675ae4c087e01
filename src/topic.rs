// Topic tagging of course titles for the video backend.

/// Topic names the video backend has clip libraries for, in match priority.
pub const TOPICS: [&str; 8] = [
    "arrays",
    "graphs",
    "linked_list",
    "queue",
    "stack",
    "trees",
    "random_clips",
    "other_clips",
];

/// Keyword synonyms, checked only after no direct topic name matched.
pub const KEYWORDS: [(&str, &str); 10] = [
    ("array", "arrays"),
    ("graph", "graphs"),
    ("linked list", "linked_list"),
    ("linked-list", "linked_list"),
    ("queues", "queue"),
    ("stacks", "stack"),
    ("tree", "trees"),
    ("programming", "arrays"),
    ("data structure", "arrays"),
    ("algorithm", "arrays"),
];

pub const DEFAULT_TOPIC: &str = "arrays";

pub fn extract_topic(course_title: &str) -> &'static str {
    let title = course_title.to_lowercase();

    if let Some(topic) = TOPICS.iter().copied().find(|t| title.contains(t)) {
        tracing::debug!(course_title, topic, "matched topic name");
        return topic;
    }

    if let Some((keyword, topic)) = KEYWORDS.iter().copied().find(|(k, _)| title.contains(k)) {
        tracing::debug!(course_title, keyword, topic, "mapped keyword to topic");
        return topic;
    }

    tracing::debug!(course_title, "no topic matched, using default");
    DEFAULT_TOPIC
}
