// Output formatting for CLI commands: table, JSON, YAML or a Go template.

use anyhow::{Result, anyhow};
use gtmpl::Value;
use gtmpl::{Context, Template};
use gtmpl_value::{FuncError, Value as GtmplValue};
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
    /// Go-style template rendered against the JSON form of the data.
    Template(String),
}

impl OutputFormat {
    /// `table`, `json`, `yaml` (any case), or a template containing `{{`.
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            "yaml" => Ok(Self::Yaml),
            _ if s.contains("{{") => Ok(Self::Template(s.to_string())),
            _ => Err(anyhow!(
                "Unknown format: '{}'. Valid formats: table, json, yaml, or a Go template",
                s
            )),
        }
    }
}

pub fn format_json<T: Serialize>(data: &T) -> Result<String> {
    serde_json::to_string_pretty(data).map_err(|e| anyhow!("JSON serialization failed: {}", e))
}

pub fn format_yaml<T: Serialize>(data: &T) -> Result<String> {
    serde_yaml::to_string(data).map_err(|e| anyhow!("YAML serialization failed: {}", e))
}

/// Parsed Go-style template with a "json" function.
pub struct GtmplWithJson {
    tmpl: Template,
}

impl GtmplWithJson {
    pub fn parse(template_str: &str) -> Result<Self> {
        let json_func: gtmpl::Func = |args: &[Value]| -> std::result::Result<Value, FuncError> {
            let v = args
                .first()
                .ok_or_else(|| FuncError::ExactlyXArgs("json".into(), 1))?;
            let j = value_to_serde_json(v);
            let s = serde_json::to_string(&j).map_err(|e| FuncError::Generic(e.to_string()))?;
            Ok(Value::from(s))
        };
        let mut tmpl = Template::default();
        tmpl.add_func("json", json_func);
        tmpl.parse(template_str)
            .map_err(|e| anyhow!("Template parse error: {}", e))?;
        Ok(Self { tmpl })
    }

    pub fn render(&self, context: impl Into<Value>) -> Result<String> {
        let ctx = Context::from(context);
        self.tmpl
            .render(&ctx)
            .map_err(|e| anyhow!("Template error: {}", e))
    }
}

/// Convert a `serde_json::Value` to `gtmpl::Value` recursively.
pub fn value_from_serde_json(v: &serde_json::Value) -> Value {
    use serde_json::Value as JsonValue;
    match v {
        JsonValue::Object(m) => {
            let map: std::collections::HashMap<String, Value> = m
                .iter()
                .map(|(k, v)| (k.clone(), value_from_serde_json(v)))
                .collect();
            Value::from(map)
        }
        JsonValue::Array(arr) => {
            let vec: Vec<Value> = arr.iter().map(value_from_serde_json).collect();
            Value::from(vec)
        }
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(f) = n.as_f64() {
                Value::from(f)
            } else {
                Value::from(0_i64)
            }
        }
        JsonValue::Bool(b) => Value::from(*b),
        JsonValue::String(s) => Value::from(s.as_str()),
        JsonValue::Null => Value::from(""),
    }
}

fn value_to_serde_json(v: &GtmplValue) -> serde_json::Value {
    use serde_json::Value as JsonValue;
    match v {
        GtmplValue::Object(m) | GtmplValue::Map(m) => {
            let obj: serde_json::Map<String, serde_json::Value> = m
                .iter()
                .map(|(k, val)| (k.clone(), value_to_serde_json(val)))
                .collect();
            JsonValue::Object(obj)
        }
        GtmplValue::Array(arr) => JsonValue::Array(arr.iter().map(value_to_serde_json).collect()),
        GtmplValue::String(s) => JsonValue::String(s.clone()),
        GtmplValue::Bool(b) => JsonValue::Bool(*b),
        GtmplValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                JsonValue::Number(serde_json::Number::from(i))
            } else if let Some(u) = n.as_u64() {
                JsonValue::Number(serde_json::Number::from(u))
            } else if let Some(f) = n.as_f64() {
                JsonValue::Number(
                    serde_json::Number::from_f64(f).unwrap_or(serde_json::Number::from(0)),
                )
            } else {
                JsonValue::Null
            }
        }
        GtmplValue::Nil | GtmplValue::NoValue | GtmplValue::Function(_) => JsonValue::Null,
    }
}

/// Print data in `format` to `writer`.
///
/// `table_printer` is only called for [`OutputFormat::Table`].
pub fn print_output<T, W, F>(
    writer: &mut W,
    data: &T,
    format: &OutputFormat,
    table_printer: F,
) -> Result<()>
where
    T: Serialize,
    W: std::io::Write,
    F: FnOnce(&mut W, &T) -> Result<()>,
{
    match format {
        OutputFormat::Table => table_printer(writer, data),
        OutputFormat::Json => {
            writeln!(writer, "{}", format_json(data)?)?;
            Ok(())
        }
        OutputFormat::Yaml => {
            write!(writer, "{}", format_yaml(data)?)?;
            Ok(())
        }
        OutputFormat::Template(template) => {
            let json = serde_json::to_value(data)?;
            let rendered = GtmplWithJson::parse(template)?.render(value_from_serde_json(&json))?;
            writeln!(writer, "{}", rendered)?;
            Ok(())
        }
    }
}

/// Standard table styling for every listing.
pub fn create_table<T: Tabled>(data: impl IntoIterator<Item = T>) -> Table {
    let mut table = Table::new(data);
    table.with(Style::sharp());
    table
}
