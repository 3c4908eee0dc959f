//! Registry payload shapes and merging.
//!
//! A payload is either `{ "<source>": <body>, ... }` or the same mapping under
//! a top-level `sources` key. Registries are folded in their stored order:
//! when two registries declare the same source name the later one wins, and
//! every such collision is reported.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

use super::RegistryError;

/// The sources of one registry, in the position it holds in the fold.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryLayer {
    pub registry: String,
    pub sources: Map<String, Value>,
}

/// A source body together with the registry that supplied it.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrySource {
    pub registry: String,
    pub body: Value,
}

/// A source name declared by more than one registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCollision {
    pub source: String,
    /// Registry whose entry was shadowed.
    pub shadowed: String,
    /// Registry whose entry is used.
    pub winner: String,
}

/// Result of folding all registry layers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedSources {
    pub sources: BTreeMap<String, RegistrySource>,
    pub collisions: Vec<SourceCollision>,
}

/// Extracts the source mapping from a raw payload.
pub fn sources_from_payload(
    registry: &str,
    payload: &Value,
) -> Result<Map<String, Value>, RegistryError> {
    let malformed = |reason: &str| RegistryError::Malformed {
        registry: registry.to_string(),
        reason: reason.to_string(),
    };

    let top = payload
        .as_object()
        .ok_or_else(|| malformed("expected a JSON object at the top level"))?;

    match top.get("sources") {
        Some(Value::Object(sources)) => Ok(sources.clone()),
        Some(_) => Err(malformed("'sources' must be an object of sources")),
        None => Ok(top.clone()),
    }
}

/// Folds layers left to right; later layers overwrite earlier ones.
pub fn merge_layers(layers: &[RegistryLayer]) -> MergedSources {
    let mut merged = MergedSources::default();

    for layer in layers {
        for (name, body) in &layer.sources {
            let entry = RegistrySource {
                registry: layer.registry.clone(),
                body: body.clone(),
            };
            if let Some(previous) = merged.sources.insert(name.clone(), entry) {
                if previous.registry != layer.registry {
                    warn!(
                        source = %name,
                        shadowed = %previous.registry,
                        winner = %layer.registry,
                        "Source declared by multiple registries"
                    );
                    merged.collisions.push(SourceCollision {
                        source: name.clone(),
                        shadowed: previous.registry,
                        winner: layer.registry.clone(),
                    });
                }
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn layer(registry: &str, payload: Value) -> RegistryLayer {
        RegistryLayer {
            registry: registry.to_string(),
            sources: sources_from_payload(registry, &payload).unwrap(),
        }
    }

    #[test]
    fn test_flat_and_wrapped_payloads() {
        let flat = sources_from_payload("a", &json!({"flux": []})).unwrap();
        assert!(flat.contains_key("flux"));

        let wrapped = sources_from_payload("b", &json!({"version": 2, "sources": {"sdxl": []}}))
            .unwrap();
        assert!(wrapped.contains_key("sdxl"));
        assert!(!wrapped.contains_key("version"));
    }

    #[test]
    fn test_malformed_payloads() {
        assert!(sources_from_payload("a", &json!([1, 2])).is_err());
        assert!(sources_from_payload("a", &json!({"sources": "v1"})).is_err());
    }

    #[test]
    fn test_last_registry_wins_and_collision_is_reported() {
        let layers = vec![
            layer("first", json!({"flux": [{"url": "http://first", "dest": "a"}], "only1": []})),
            layer("second", json!({"flux": [{"url": "http://second", "dest": "a"}]})),
        ];

        let merged = merge_layers(&layers);

        assert_eq!(merged.sources["flux"].registry, "second");
        assert_eq!(merged.sources["only1"].registry, "first");
        assert_eq!(
            merged.collisions,
            vec![SourceCollision {
                source: "flux".into(),
                shadowed: "first".into(),
                winner: "second".into(),
            }]
        );
    }

    #[test]
    fn test_reversed_order_flips_winner() {
        let layers = vec![
            layer("second", json!({"flux": []})),
            layer("first", json!({"flux": {"downloads": []}})),
        ];
        assert_eq!(merge_layers(&layers).sources["flux"].registry, "first");
    }
}
