//! Roadmap normalization.
//!
//! Canonicalizes the two roadmap shapes jobs can carry:
//!
//! - a persisted tree: `{"title": .., "sections": [{"title": ..,
//!   "subtopics": ["..", {"title": ".."}], "position": ..}]}`
//! - a flat map: `{"Section title": ["Subtopic", ..], ..}`
//!
//! Entries with blank titles are dropped with a warning rather than failing
//! the whole roadmap; an input that yields zero sections is an error.

use serde_json::Value;
use tracing::warn;

use super::types::{Roadmap, RoadmapError, RoadmapSection};

/// Normalize a raw roadmap value into an ordered [`Roadmap`].
pub fn normalize(data: &Value) -> Result<Roadmap, RoadmapError> {
    let map = match data {
        Value::Object(map) => map,
        Value::Null => return Err(RoadmapError::invalid_shape("roadmap data is null")),
        other => {
            return Err(RoadmapError::invalid_shape(format!(
                "expected object, got {}",
                type_name(other)
            )))
        }
    };

    let roadmap = if map.contains_key("sections") {
        normalize_tree(map)?
    } else {
        normalize_flat_map(map)?
    };

    if roadmap.sections.is_empty() {
        return Err(RoadmapError::Empty);
    }
    Ok(roadmap)
}

fn normalize_tree(map: &serde_json::Map<String, Value>) -> Result<Roadmap, RoadmapError> {
    let course_title = map
        .get("courseTitle")
        .or_else(|| map.get("title"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from);

    let raw_sections = map
        .get("sections")
        .and_then(Value::as_array)
        .ok_or_else(|| RoadmapError::invalid_shape("\"sections\" is not an array"))?;

    // Persisted trees may carry an explicit position; sort by it when present,
    // otherwise keep array order.
    let mut ordered: Vec<(i64, &Value)> = raw_sections
        .iter()
        .enumerate()
        .map(|(idx, value)| {
            let position = value
                .get("position")
                .or_else(|| value.get("order"))
                .and_then(Value::as_i64)
                .unwrap_or(idx as i64);
            (position, value)
        })
        .collect();
    ordered.sort_by_key(|(position, _)| *position);

    let mut sections = Vec::new();
    for (_, value) in ordered {
        let Some(title) = value.get("title").and_then(Value::as_str) else {
            warn!("Skipping roadmap section without a title");
            continue;
        };
        let title = title.trim();
        if title.is_empty() {
            warn!("Skipping roadmap section with a blank title");
            continue;
        }

        let subtopics = value
            .get("subtopics")
            .and_then(Value::as_array)
            .map(|entries| collect_subtopic_titles(title, entries))
            .unwrap_or_default();

        sections.push(RoadmapSection {
            title: title.to_string(),
            subtopics,
        });
    }

    Ok(Roadmap {
        course_title,
        sections,
    })
}

fn normalize_flat_map(map: &serde_json::Map<String, Value>) -> Result<Roadmap, RoadmapError> {
    let mut sections = Vec::new();
    for (title, value) in map {
        let title = title.trim();
        if title.is_empty() {
            warn!("Skipping roadmap section with a blank title");
            continue;
        }
        let entries = value.as_array().ok_or_else(|| {
            RoadmapError::invalid_shape(format!("section \"{}\" does not map to a list", title))
        })?;
        sections.push(RoadmapSection {
            title: title.to_string(),
            subtopics: collect_subtopic_titles(title, entries),
        });
    }

    Ok(Roadmap {
        course_title: None,
        sections,
    })
}

/// Pull subtopic titles out of a mixed list of strings and `{"title": ..}` objects.
fn collect_subtopic_titles(section_title: &str, entries: &[Value]) -> Vec<String> {
    let mut titles = Vec::with_capacity(entries.len());
    for entry in entries {
        let title = match entry {
            Value::String(s) => Some(s.as_str()),
            Value::Object(obj) => obj.get("title").and_then(Value::as_str),
            _ => None,
        };
        match title.map(str::trim).filter(|t| !t.is_empty()) {
            Some(title) => titles.push(title.to_string()),
            None => warn!(section = section_title, "Skipping subtopic without a title"),
        }
    }
    titles
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_flat_map() {
        let data = json!({
            "Intro": ["What is X", "Why X matters"],
            "Advanced": ["Internals"],
        });
        let roadmap = normalize(&data).unwrap();
        assert_eq!(roadmap.course_title, None);
        assert_eq!(roadmap.sections.len(), 2);
        assert_eq!(roadmap.sections[0].title, "Intro");
        assert_eq!(
            roadmap.sections[0].subtopics,
            vec!["What is X", "Why X matters"]
        );
        assert_eq!(roadmap.sections[1].title, "Advanced");
    }

    #[test]
    fn test_normalize_tree_with_positions() {
        let data = json!({
            "courseTitle": "Databases",
            "sections": [
                {"title": "Indexes", "position": 2, "subtopics": ["B-trees"]},
                {"title": "Storage", "position": 1, "subtopics": [{"title": "Pages"}, "WAL"]},
            ],
        });
        let roadmap = normalize(&data).unwrap();
        assert_eq!(roadmap.course_title.as_deref(), Some("Databases"));
        assert_eq!(roadmap.sections[0].title, "Storage");
        assert_eq!(roadmap.sections[0].subtopics, vec!["Pages", "WAL"]);
        assert_eq!(roadmap.sections[1].title, "Indexes");
    }

    #[test]
    fn test_blank_entries_are_dropped() {
        let data = json!({
            "sections": [
                {"title": "  ", "subtopics": ["lost"]},
                {"title": "Kept", "subtopics": ["", "Real", {"nope": 1}]},
            ],
        });
        let roadmap = normalize(&data).unwrap();
        assert_eq!(roadmap.sections.len(), 1);
        assert_eq!(roadmap.sections[0].subtopics, vec!["Real"]);
    }

    #[test]
    fn test_section_with_no_subtopics_is_kept() {
        let data = json!({"Empty Section": []});
        let roadmap = normalize(&data).unwrap();
        assert_eq!(roadmap.sections.len(), 1);
        assert!(roadmap.sections[0].subtopics.is_empty());
        assert_eq!(roadmap.subtopic_count(), 0);
    }

    #[test]
    fn test_null_and_scalar_inputs_rejected() {
        assert!(matches!(
            normalize(&Value::Null),
            Err(RoadmapError::InvalidShape { .. })
        ));
        assert!(matches!(
            normalize(&json!("nope")),
            Err(RoadmapError::InvalidShape { .. })
        ));
        assert!(matches!(normalize(&json!({})), Err(RoadmapError::Empty)));
    }

    #[test]
    fn test_flat_map_with_non_list_value_rejected() {
        let data = json!({"Intro": "not a list"});
        assert!(matches!(
            normalize(&data),
            Err(RoadmapError::InvalidShape { .. })
        ));
    }
}
