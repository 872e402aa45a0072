//! Room topics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of a room, used as the topic its dispatch calls are addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomName(String);

impl RoomName {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for RoomName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for RoomName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_name_is_its_topic() {
        let room = RoomName::from("room-1");
        assert_eq!(room.as_ref(), "room-1");
        assert_eq!(room.to_string(), "room-1");
        assert_eq!(serde_json::to_string(&room).unwrap(), "\"room-1\"");
    }
}
