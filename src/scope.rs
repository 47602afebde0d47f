use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::severity::Severity;

/// Accumulated contextual metadata attached to outgoing error reports.
///
/// A `Scope` holds exactly the most recently set value per field; no
/// history is retained. Snapshots handed to the remote client are
/// independently-owned copies, so nothing downstream can observe a
/// half-updated scope.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Scope {
    pub environment: Option<String>,
    /// Tag keys are normalized (lower-case, separator runs collapsed to
    /// `.`) before insertion.
    pub tags: BTreeMap<String, String>,
    /// Extra keys are normalized by title-casing before insertion.
    pub extra: BTreeMap<String, serde_json::Value>,
    pub user: Option<User>,
    /// Minimum severity of the event being dispatched; written by the
    /// dispatcher once per event, before the snapshot is taken.
    pub level: Option<Severity>,
}

/// Identity of the user a report concerns. Wholesale-replaced on each set,
/// never partially merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct User {
    pub id: Option<String>,
    pub email: Option<String>,
    pub ip_address: Option<String>,
}

/// Raised when [`ContextStore::set_field`] receives a field name outside
/// the recognized set. A bridge bug, so it fails fast instead of being
/// swallowed like delivery problems are.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown context field \"{0}\"")]
pub struct UnknownFieldError(pub String);

/// Mutable owner of the current [`Scope`].
///
/// Shared between the layer thread and the background dispatch task via
/// `Arc`; the internal mutex is held only long enough to mutate or copy,
/// never across I/O.
#[derive(Debug, Default)]
pub struct ContextStore {
    inner: Mutex<Scope>,
}

impl ContextStore {
    pub fn new() -> Self {
        ContextStore::default()
    }

    /// Last-write-wins.
    pub fn set_environment(&self, environment: impl Into<String>) {
        self.inner.lock().unwrap().environment = Some(environment.into());
    }

    /// Merge tags key-by-key into the existing map (never a wholesale
    /// replace); keys are normalized first, and re-setting a key
    /// overwrites.
    pub fn merge_tags<I, K, V>(&self, tags: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut scope = self.inner.lock().unwrap();
        for (key, value) in tags {
            scope
                .tags
                .insert(normalize_tag_key(key.as_ref()), value.into());
        }
    }

    /// Merge extra data key-by-key; same overwrite semantics as tags but
    /// with the title-case key normalizer.
    pub fn merge_extra<I, K>(&self, extra: I)
    where
        I: IntoIterator<Item = (K, serde_json::Value)>,
        K: AsRef<str>,
    {
        let mut scope = self.inner.lock().unwrap();
        for (key, value) in extra {
            scope.extra.insert(normalize_extra_key(key.as_ref()), value);
        }
    }

    /// Replace the whole user record.
    pub fn set_user(&self, user: User) {
        self.inner.lock().unwrap().user = Some(user);
    }

    pub fn set_level(&self, level: Severity) {
        self.inner.lock().unwrap().level = Some(level);
    }

    /// String-keyed adaptor boundary for hosts that address fields by
    /// name. `name ∈ {env, tags, extra, user, level}`; anything else is a
    /// bridge bug and fails with [`UnknownFieldError`].
    ///
    /// Values are coerced leniently per field: `tags`/`extra` expect JSON
    /// objects (non-object entries are stringified for tags), `user`
    /// expects an object with `id`/`email`/`ip_address`, `level` accepts a
    /// level name or platform error code.
    pub fn set_field(
        &self,
        name: &str,
        value: serde_json::Value,
    ) -> Result<(), UnknownFieldError> {
        use serde_json::Value;

        match name {
            "env" => {
                let env = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                self.set_environment(env);
            }
            "tags" => {
                if let Value::Object(map) = value {
                    self.merge_tags(map.into_iter().map(|(k, v)| {
                        let v = match v {
                            Value::String(s) => s,
                            other => other.to_string(),
                        };
                        (k, v)
                    }));
                }
            }
            "extra" => {
                if let Value::Object(map) = value {
                    self.merge_extra(map);
                }
            }
            "user" => {
                let as_str = |v: &Value| match v {
                    Value::String(s) => Some(s.clone()),
                    Value::Null => None,
                    other => Some(other.to_string()),
                };
                if let Value::Object(map) = value {
                    self.set_user(User {
                        id: map.get("id").and_then(as_str),
                        email: map.get("email").and_then(as_str),
                        ip_address: map.get("ip_address").and_then(as_str),
                    });
                }
            }
            "level" => {
                let level = match value {
                    Value::Number(n) => {
                        Severity::from_error_code(n.as_i64().unwrap_or_default())
                    }
                    Value::String(s) => Severity::from_level_name(&s),
                    _ => Severity::Error,
                };
                self.set_level(level);
            }
            other => return Err(UnknownFieldError(other.to_string())),
        }

        Ok(())
    }

    /// Copy the current scope by value. The lock is released before the
    /// copy is handed onward, so the caller may block on network I/O
    /// without starving context writers.
    pub fn snapshot(&self) -> Scope {
        self.inner.lock().unwrap().clone()
    }
}

/// Tag-key normalizer: trimmed, lower-cased, runs of `-`/`_`/whitespace
/// collapsed to a single `.`.
///
/// Deliberately separate from [`normalize_extra_key`]; the two rules
/// genuinely differ.
pub fn normalize_tag_key(key: &str) -> String {
    let trimmed = key.trim();
    let mut out = String::with_capacity(trimmed.len());
    let mut pending = false;
    for ch in trimmed.chars() {
        if ch == '-' || ch == '_' || ch.is_whitespace() {
            pending = true;
        } else {
            if pending {
                out.push('.');
                pending = false;
            }
            out.extend(ch.to_lowercase());
        }
    }
    if pending {
        out.push('.');
    }
    out
}

/// Extra-key normalizer: trimmed, separator runs collapsed to one space,
/// first letter of each word upper-cased.
pub fn normalize_extra_key(key: &str) -> String {
    key.split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
