//! Topic subscriptions of a live channel, kept across reconnects.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// Destination name on the socket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Topic(Cow<'static, str>);

impl Topic {
    /// Complaint create/update/delete broadcasts.
    pub const COMPLAINTS: Topic = Topic(Cow::Borrowed("/topic/complaints"));
    /// Per-user notifications.
    pub const NOTIFICATIONS: Topic = Topic(Cow::Borrowed("/topic/notifications"));
    /// Statistics aggregate pushes.
    pub const STATISTICS: Topic = Topic(Cow::Borrowed("/topic/statistics"));

    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// The three topics every socket session subscribes to.
    pub fn defaults() -> [Topic; 3] {
        [Topic::COMPLAINTS, Topic::NOTIFICATIONS, Topic::STATISTICS]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Topic {
    fn from(value: &str) -> Self {
        Topic::new(value)
    }
}

/// Wanted topics and whether each is currently active on the wire.
///
/// Keyed by topic, so a topic can never hold two subscriptions.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionRegistry {
    topics: BTreeMap<Topic, bool>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records interest in a topic. Returns false if it was already wanted.
    pub fn request(&mut self, topic: Topic) -> bool {
        if self.topics.contains_key(&topic) {
            return false;
        }
        self.topics.insert(topic, false);
        true
    }

    /// Drops interest. Returns whether the topic was active on the wire.
    pub fn release(&mut self, topic: &Topic) -> Option<bool> {
        self.topics.remove(topic)
    }

    /// Marks a wanted topic as subscribed on the wire.
    pub fn activate(&mut self, topic: &Topic) -> bool {
        match self.topics.get_mut(topic) {
            Some(active) if !*active => {
                *active = true;
                true
            }
            _ => false,
        }
    }

    /// Connection lost: every subscription becomes inactive, none forgotten.
    pub fn deactivate_all(&mut self) {
        for active in self.topics.values_mut() {
            *active = false;
        }
    }

    /// Wanted topics not yet active, in topic order.
    pub fn pending(&self) -> Vec<Topic> {
        self.topics
            .iter()
            .filter(|(_, active)| !**active)
            .map(|(topic, _)| topic.clone())
            .collect()
    }

    pub fn active(&self) -> Vec<Topic> {
        self.topics
            .iter()
            .filter(|(_, active)| **active)
            .map(|(topic, _)| topic.clone())
            .collect()
    }

    pub fn wanted(&self) -> Vec<Topic> {
        self.topics.keys().cloned().collect()
    }

    pub fn is_active(&self, topic: &Topic) -> bool {
        self.topics.get(topic).copied().unwrap_or(false)
    }
}
