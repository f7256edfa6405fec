//! Plain-text rendering shared by the shipped senders.

use courier_core::metadata::Metadata;
use courier_core::topics::Topic;

/// Metadata key that overrides the default title.
pub const TITLE_KEY: &str = "title";

/// Metadata key that overrides the default body.
pub const BODY_KEY: &str = "body";

/// A rendered notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub title: String,
    pub body: String,
}

/// Render `topic` and `metadata` into a title and body.
///
/// `title` and `body` metadata entries are used verbatim when present.
/// Otherwise the title names the topic and the body lists every remaining
/// metadata entry as `key: value`, one per line, in key order.
pub fn render(topic: Topic, metadata: &Metadata) -> RenderedMessage {
    let title = metadata
        .get(TITLE_KEY)
        .map(Metadata::display_value)
        .unwrap_or_else(|| format!("[Courier] {}", default_title(topic)));

    let body = match metadata.get(BODY_KEY) {
        Some(body) => Metadata::display_value(body),
        None => metadata
            .iter()
            .filter(|(key, _)| key.as_str() != TITLE_KEY)
            .map(|(key, value)| format!("{key}: {}", Metadata::display_value(value)))
            .collect::<Vec<_>>()
            .join("\n"),
    };

    RenderedMessage { title, body }
}

fn default_title(topic: Topic) -> &'static str {
    match topic {
        Topic::Marketing => "News and offers",
        Topic::Newsletter => "Your newsletter",
        Topic::Updates => "Account update",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn defaults_from_topic_and_metadata() {
        let meta = Metadata::from_json(json!({"orderId": 42, "carrier": "DHL"})).unwrap();
        let msg = render(Topic::Updates, &meta);
        assert_eq!(msg.title, "[Courier] Account update");
        assert_eq!(msg.body, "carrier: DHL\norderId: 42");
    }

    #[test]
    fn explicit_title_and_body_win() {
        let meta = Metadata::from_json(json!({
            "title": "Spring sale",
            "body": "20% off today",
            "campaign": "spring"
        }))
        .unwrap();
        let msg = render(Topic::Marketing, &meta);
        assert_eq!(msg.title, "Spring sale");
        assert_eq!(msg.body, "20% off today");
    }

    #[test]
    fn empty_metadata_renders_empty_body() {
        let msg = render(Topic::Newsletter, &Metadata::default());
        assert_eq!(msg.body, "");
    }
}
