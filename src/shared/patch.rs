//! Serde helper for partial-update bodies.
//!
//! A nullable field in a PATCH-style request has three states: absent (leave
//! unchanged), explicit `null` (clear it) and a value (set it). A plain
//! `Option<Option<T>>` collapses `null` into the outer `None`, so clearable
//! fields pair `#[serde(default, deserialize_with = "clearable")]` with the
//! nested option: absent stays `None`, `null` becomes `Some(None)`.

use serde::{Deserialize, Deserializer};

pub fn clearable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Body {
        #[serde(default, deserialize_with = "super::clearable")]
        link: Option<Option<String>>,
    }

    #[test]
    fn absent_null_and_value_are_distinct() {
        let body: Body = serde_json::from_value(json!({})).expect("absent");
        assert_eq!(body.link, None);

        let body: Body = serde_json::from_value(json!({ "link": null })).expect("null");
        assert_eq!(body.link, Some(None));

        let body: Body = serde_json::from_value(json!({ "link": "g1" })).expect("value");
        assert_eq!(body.link, Some(Some("g1".into())));
    }
}
