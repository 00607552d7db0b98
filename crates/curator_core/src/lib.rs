pub mod domain;
pub mod ports;

pub use domain::{
    AgentConfig, Bookmark, ContentItem, FeedSource, FetchedItem, Frequency, GeneratedItem,
    InterestRecord, NewContentItem, NewTopic, SettingsUpdate, Topic, TopicCandidate, TopicType,
    TopicUpdate, User, UserSettings,
};
pub use ports::{ContentStore, LlmGateway, PortError, PortResult};
