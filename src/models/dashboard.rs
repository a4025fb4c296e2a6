//! Dashboard schema consumed by the linter.
//!
//! Only the fields rules inspect are modelled; everything else in the
//! Grafana JSON is ignored. Values are read-only for the duration of a lint
//! pass.
//!
//! Grafana has changed a few shapes over time, so decoding is lenient:
//! - `datasource` may be a plain string (`"$datasource"`) or an object
//!   (`{"type": "prometheus", "uid": "$datasource"}`); the uid is kept.
//! - template `query` may be a string or an object carrying a `query` field.
//! - panels may live at the top level, inside collapsed row panels, or under
//!   the legacy `rows[].panels` layout.
//! - an explicit `null` decodes as the field's empty value.

use serde::{Deserialize, Deserializer};
use serde_json::Value as Json;

#[derive(Debug, Default, Clone, Deserialize)]
/// A whole dashboard document.
pub struct Dashboard {
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "null_default")]
    pub templating: Templating,
    #[serde(default, deserialize_with = "null_default")]
    pub panels: Vec<Panel>,
    /// Pre-5.0 layout where panels are grouped under rows.
    #[serde(default, deserialize_with = "null_default")]
    pub rows: Vec<Row>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct Templating {
    #[serde(default, deserialize_with = "null_default")]
    pub list: Vec<Template>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct Row {
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "null_default")]
    pub panels: Vec<Panel>,
}

#[derive(Debug, Default, Clone, Deserialize)]
/// A single visualization and its queries.
pub struct Panel {
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, rename = "type", deserialize_with = "lenient_string")]
    pub kind: String,
    #[serde(default, deserialize_with = "datasource_ref")]
    pub datasource: String,
    #[serde(default, deserialize_with = "indexed_targets")]
    pub targets: Vec<Target>,
    /// Children of a collapsed row panel.
    #[serde(default, deserialize_with = "null_default")]
    pub panels: Vec<Panel>,
}

#[derive(Debug, Default, Clone, Deserialize)]
/// One query of a panel.
pub struct Target {
    #[serde(default, deserialize_with = "lenient_string")]
    pub expr: String,
    #[serde(default, rename = "refId", deserialize_with = "lenient_string")]
    pub ref_id: String,
    /// Zero-based position within the owning panel. Configuration entries
    /// address targets by this index.
    #[serde(skip)]
    pub idx: usize,
}

#[derive(Debug, Default, Clone, Deserialize)]
/// A template variable declared under `templating.list`.
pub struct Template {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, rename = "type", deserialize_with = "lenient_string")]
    pub kind: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub label: String,
    #[serde(default, deserialize_with = "datasource_ref")]
    pub datasource: String,
    #[serde(default, deserialize_with = "null_default")]
    pub multi: bool,
    #[serde(default, rename = "allValue", deserialize_with = "lenient_string")]
    pub all_value: String,
    #[serde(default, deserialize_with = "query_text")]
    pub query: String,
}

impl Dashboard {
    /// Returns the first template variable with the given name.
    pub fn template(&self, name: &str) -> Option<&Template> {
        self.templating.list.iter().find(|t| t.name == name)
    }

    /// Returns the first template variable of type `datasource`.
    pub fn datasource_template(&self) -> Option<&Template> {
        self.templating.list.iter().find(|t| t.kind == "datasource")
    }

    /// All panels in document order: top-level panels, each followed by the
    /// children of a collapsed row, then panels of legacy rows.
    pub fn all_panels(&self) -> Vec<&Panel> {
        let mut out = Vec::new();
        for p in &self.panels {
            out.push(p);
            out.extend(p.panels.iter());
        }
        for row in &self.rows {
            out.extend(row.panels.iter());
        }
        out
    }
}

impl Panel {
    pub fn new(title: &str, kind: &str) -> Self {
        Panel {
            title: title.to_string(),
            kind: kind.to_string(),
            ..Default::default()
        }
    }

    /// Appends a query, assigning it the next positional index.
    pub fn push_target(&mut self, expr: &str) {
        let idx = self.targets.len();
        self.targets.push(Target {
            expr: expr.to_string(),
            idx,
            ..Default::default()
        });
    }
}

fn indexed_targets<'de, D>(de: D) -> Result<Vec<Target>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut targets: Vec<Target> = Option::deserialize(de)?.unwrap_or_default();
    for (idx, t) in targets.iter_mut().enumerate() {
        t.idx = idx;
    }
    Ok(targets)
}

fn null_default<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::deserialize(de)?.unwrap_or_default())
}

fn datasource_ref<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Json::deserialize(de)? {
        Json::String(s) => s,
        Json::Object(obj) => obj
            .get("uid")
            .and_then(Json::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    })
}

fn query_text<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Json::deserialize(de)? {
        Json::String(s) => s,
        Json::Object(obj) => obj
            .get("query")
            .and_then(Json::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    })
}

fn lenient_string<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Json::deserialize(de)? {
        Json::String(s) => s,
        Json::Null => String::new(),
        other => other.to_string(),
    })
}
