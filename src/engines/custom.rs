/*!
 * Declarative engines defined by JSON.
 *
 * A definition names the engine, its language table, a request template and
 * an expression locating the translation in the response:
 *
 * ```json
 * {
 *   "name": "My Engine",
 *   "languages": {"source": {"English": "en"}, "target": {"French": "fr"}},
 *   "request": {
 *     "url": "https://example.com/translate",
 *     "method": "POST",
 *     "headers": {"Content-Type": "application/json"},
 *     "data": {"source": "<source>", "target": "<target>", "text": "<text>"}
 *   },
 *   "response": "response['translations'][0]['text']"
 * }
 * ```
 *
 * `<source>`, `<target>` and `<text>` are substituted in the URL, headers
 * and body. Responses are parsed as JSON, falling back to XML.
 */

use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use reqwest::Method;
use serde_json::{Map, Value};
use std::str::FromStr;

use crate::app_config::EnginePreferences;
use crate::engines::base::{EngineCore, EngineInfo, EngineKind, LangCodes, Pacing};
use crate::engines::{builtin_names, Engine, TranslationOutput};
use crate::errors::EngineError;

const SOURCE_SLOT: &str = "<source>";
const TARGET_SLOT: &str = "<target>";
const TEXT_SLOT: &str = "<text>";

fn invalid(message: impl Into<String>) -> EngineError {
    EngineError::InvalidEngineData(message.into())
}

/// One step of a response expression
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// `['key']`, `["key"]` or `.key`
    Key(String),
    /// `[3]`, negative values count from the end
    Index(i64),
    /// `[*]`, the rest of the path applied to every item, results concatenated
    Each,
}

/// Path into a parsed response, rooted at `response`
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    steps: Vec<Step>,
}

impl FromStr for Expression {
    type Err = EngineError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        let trimmed = source.trim();
        let rest = trimmed
            .strip_prefix("response")
            .ok_or_else(|| invalid("Response expression must start with 'response'"))?;
        let chars: Vec<char> = rest.chars().collect();
        let mut steps = Vec::new();
        let mut i = 0;
        while i < chars.len() {
            match chars[i] {
                c if c.is_whitespace() => i += 1,
                '.' => {
                    let start = i + 1;
                    let mut end = start;
                    while end < chars.len() && (chars[end].is_alphanumeric() || chars[end] == '_' || chars[end] == '-') {
                        end += 1;
                    }
                    if end == start {
                        return Err(invalid(format!("Missing key after '.' in '{}'", trimmed)));
                    }
                    steps.push(Step::Key(chars[start..end].iter().collect()));
                    i = end;
                }
                '[' => {
                    let close = chars[i..]
                        .iter()
                        .position(|c| *c == ']')
                        .map(|offset| i + offset)
                        .ok_or_else(|| invalid(format!("Unclosed '[' in '{}'", trimmed)))?;
                    let inner: String = chars[i + 1..close].iter().collect();
                    let inner = inner.trim();
                    let step = if inner == "*" {
                        Step::Each
                    } else if let Some(key) = quoted(inner) {
                        Step::Key(key.to_string())
                    } else {
                        let index = inner
                            .parse::<i64>()
                            .map_err(|_| invalid(format!("Invalid subscript '{}' in '{}'", inner, trimmed)))?;
                        Step::Index(index)
                    };
                    steps.push(step);
                    i = close + 1;
                }
                other => {
                    return Err(invalid(format!("Unexpected '{}' in '{}'", other, trimmed)));
                }
            }
        }
        Ok(Self {
            source: trimmed.to_string(),
            steps,
        })
    }
}

fn quoted(inner: &str) -> Option<&str> {
    ['\'', '"'].iter().find_map(|quote| {
        inner
            .strip_prefix(*quote)
            .and_then(|rest| rest.strip_suffix(*quote))
    })
}

impl Expression {
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against a parsed response, producing the translated text
    pub fn evaluate(&self, response: &Value) -> Result<String, EngineError> {
        walk(response, &self.steps).map_err(|message| {
            EngineError::UnexpectedResult(format!("{} (expression: {})", message, self.source))
        })
    }
}

fn walk(value: &Value, steps: &[Step]) -> Result<String, String> {
    let Some((step, rest)) = steps.split_first() else {
        return leaf(value);
    };
    match (step, value) {
        (Step::Key(key), Value::Object(map)) => match map.get(key) {
            Some(child) => walk(child, rest),
            None => Err(format!("Missing key '{}'", key)),
        },
        (Step::Index(index), Value::Array(items)) => {
            let position = if *index < 0 { items.len() as i64 + index } else { *index };
            usize::try_from(position)
                .ok()
                .and_then(|position| items.get(position))
                .ok_or_else(|| format!("Index {} out of range", index))
                .and_then(|child| walk(child, rest))
        }
        (Step::Each, Value::Array(items)) => items.iter().map(|item| walk(item, rest)).collect(),
        (Step::Each, Value::Object(map)) => map.values().map(|item| walk(item, rest)).collect(),
        (step, value) => Err(format!("Cannot apply {:?} to {}", step, kind(value))),
    }
}

fn leaf(value: &Value) -> Result<String, String> {
    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        Value::Array(items) => items.iter().map(leaf).collect(),
        Value::Null => Err("Expression resolved to null".to_string()),
        Value::Object(_) => Err("Expression resolved to an object".to_string()),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Convert an XML document into the value tree seen by expressions
///
/// Elements with only text become strings; other elements become objects
/// keyed by child tag (repeated tags become arrays), attributes as `@name`
/// and mixed text as `#text`. The root element itself is the result.
pub fn xml_to_value(text: &str) -> Result<Value, EngineError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);
    let mut stack: Vec<(String, Map<String, Value>, String)> = Vec::new();
    let mut root = None;
    let xml_error = |e: quick_xml::Error| EngineError::UnexpectedResult(format!("Invalid XML response: {}", e));

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(start) => stack.push(open_element(&start)),
            Event::Empty(start) => {
                let (name, map, text) = open_element(&start);
                attach(&mut stack, &mut root, name, close_element(map, text));
            }
            Event::Text(content) => {
                if let Some((_, _, text)) = stack.last_mut() {
                    text.push_str(&content.unescape().map_err(xml_error)?);
                }
            }
            Event::CData(content) => {
                if let Some((_, _, text)) = stack.last_mut() {
                    text.push_str(&String::from_utf8_lossy(&content.into_inner()));
                }
            }
            Event::End(_) => {
                let (name, map, text) = stack
                    .pop()
                    .ok_or_else(|| EngineError::UnexpectedResult("Unbalanced XML response".to_string()))?;
                attach(&mut stack, &mut root, name, close_element(map, text));
            }
            Event::Eof => break,
            _ => {}
        }
    }
    root.ok_or_else(|| EngineError::UnexpectedResult("Empty XML response".to_string()))
}

fn open_element(start: &BytesStart) -> (String, Map<String, Value>, String) {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut map = Map::new();
    for attribute in start.attributes().flatten() {
        let key = format!("@{}", String::from_utf8_lossy(attribute.key.as_ref()));
        let value = attribute
            .unescape_value()
            .map(|v| v.into_owned())
            .unwrap_or_default();
        map.insert(key, Value::String(value));
    }
    (name, map, String::new())
}

fn close_element(mut map: Map<String, Value>, text: String) -> Value {
    if map.is_empty() {
        return Value::String(text);
    }
    if !text.is_empty() {
        map.insert("#text".to_string(), Value::String(text));
    }
    Value::Object(map)
}

fn attach(stack: &mut [(String, Map<String, Value>, String)], root: &mut Option<Value>, name: String, value: Value) {
    let Some((_, parent, _)) = stack.last_mut() else {
        *root = Some(value);
        return;
    };
    match parent.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            parent.insert(name, value);
        }
    }
}

/// Parse a response body, JSON first, XML second
pub fn parse_body(body: &str) -> Result<Value, EngineError> {
    match serde_json::from_str(body) {
        Ok(value) => Ok(value),
        Err(_) => xml_to_value(body),
    }
}

/// A validated custom engine definition
#[derive(Debug, Clone)]
pub struct CustomEngineData {
    pub name: String,
    pub lang_codes: LangCodes,
    pub url: String,
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    pub response: Expression,
    pub pacing: Pacing,
}

impl CustomEngineData {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }
}

fn language_table(value: &Value) -> Result<Vec<(String, String)>, EngineError> {
    let map = value
        .as_object()
        .filter(|map| !map.is_empty())
        .ok_or_else(|| invalid("Languages must be a non-empty object of name -> code"))?;
    map.iter()
        .map(|(name, code)| match code {
            Value::String(code) => Ok((name.clone(), code.clone())),
            _ => Err(invalid(format!("Language code of '{}' must be a string", name))),
        })
        .collect()
}

/// Validate a JSON definition
pub fn load_engine_data(text: &str) -> Result<CustomEngineData, EngineError> {
    let data: Value =
        serde_json::from_str(text).map_err(|e| invalid(format!("Engine data must be valid JSON: {}", e)))?;
    let data = data.as_object().ok_or_else(|| invalid("Engine data must be a JSON object"))?;

    let name = data
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| invalid("Engine name is required"))?;
    let lowered = name.to_lowercase();
    if builtin_names().iter().any(|builtin| builtin.to_lowercase() == lowered) {
        return Err(invalid(format!("Engine name '{}' is already used", name)));
    }

    let languages = data
        .get("languages")
        .and_then(Value::as_object)
        .ok_or_else(|| invalid("Engine languages are required"))?;
    let lang_codes = match (languages.get("source"), languages.get("target")) {
        (Some(source), Some(target)) => LangCodes::from_pairs(language_table(source)?, language_table(target)?),
        (None, None) => {
            let table = language_table(&Value::Object(languages.clone()))?;
            LangCodes::from_pairs(table.clone(), table)
        }
        _ => return Err(invalid("Source and target languages must be added in pair")),
    };

    let request = data
        .get("request")
        .and_then(Value::as_object)
        .ok_or_else(|| invalid("Engine request is required"))?;
    let url = request
        .get("url")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| invalid("Request URL is required"))?;
    url::Url::parse(&url.replace(SOURCE_SLOT, "x").replace(TARGET_SLOT, "x").replace(TEXT_SLOT, "x"))
        .map_err(|e| invalid(format!("Invalid request URL: {}", e)))?;
    let method = request
        .get("method")
        .and_then(Value::as_str)
        .unwrap_or("POST")
        .to_uppercase();
    let method = Method::from_bytes(method.as_bytes()).map_err(|_| invalid(format!("Invalid method '{}'", method)))?;

    let headers = match request.get("headers") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(key, value)| match value {
                Value::String(value) => Ok((key.clone(), value.clone())),
                other => Ok((key.clone(), other.to_string())),
            })
            .collect::<Result<Vec<_>, EngineError>>()?,
        Some(_) => return Err(invalid("Request headers must be an object")),
    };

    let body = match request.get("data") {
        None | Some(Value::Null) => None,
        Some(body) => Some(body.clone()),
    };
    match &body {
        Some(body) => {
            if !body.to_string().contains(TEXT_SLOT) {
                return Err(invalid("Request data must contain the <text> placeholder"));
            }
            if body.is_string() && !headers.iter().any(|(key, _)| key.eq_ignore_ascii_case("content-type")) {
                return Err(invalid("A Content-Type header is required for string request data"));
            }
        }
        None if !url.contains(TEXT_SLOT) => {
            return Err(invalid("The <text> placeholder must appear in the URL or the data"));
        }
        None => {}
    }

    let response = data
        .get("response")
        .and_then(Value::as_str)
        .filter(|expression| !expression.trim().is_empty())
        .ok_or_else(|| invalid("Response expression is required"))?
        .parse::<Expression>()?;

    let mut pacing = Pacing::default();
    if let Some(limit) = data.get("concurrency_limit").and_then(Value::as_u64) {
        pacing.concurrency_limit = limit as usize;
    }
    if let Some(interval) = data.get("request_interval").and_then(Value::as_f64) {
        pacing.request_interval = std::time::Duration::from_secs_f64(interval.max(0.0));
    }

    Ok(CustomEngineData {
        name: name.to_string(),
        lang_codes,
        url: url.to_string(),
        method,
        headers,
        body,
        response,
        pacing,
    })
}

/// Escape `text` for the place it is substituted into
#[derive(Debug, Clone, Copy, PartialEq)]
enum Encoding {
    Raw,
    Url,
    Json,
}

fn encode(text: &str, encoding: Encoding) -> String {
    match encoding {
        Encoding::Raw => text.to_string(),
        Encoding::Url => url::form_urlencoded::byte_serialize(text.as_bytes()).collect(),
        Encoding::Json => {
            let quoted = Value::String(text.to_string()).to_string();
            quoted[1..quoted.len() - 1].to_string()
        }
    }
}

/// Request pieces after substitution
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

#[derive(Debug)]
pub struct CustomTranslate {
    core: EngineCore,
    data: CustomEngineData,
}

impl CustomTranslate {
    pub fn new(data: CustomEngineData, preferences: &EnginePreferences, proxy_uri: Option<&str>) -> Result<Self, EngineError> {
        let info = EngineInfo::new(&data.name, &data.name.to_lowercase(), EngineKind::Custom)
            .lang_codes(data.lang_codes.clone())
            .endpoint(&data.url)
            .method(data.method.clone())
            .pacing(data.pacing.clone());
        Ok(Self {
            core: EngineCore::new(info, preferences, proxy_uri)?,
            data,
        })
    }

    fn substitute(&self, template: &str, text: &str, encoding: Encoding) -> String {
        template
            .replace(SOURCE_SLOT, &encode(&self.core.source_code(), encoding))
            .replace(TARGET_SLOT, &encode(&self.core.target_code(), encoding))
            .replace(TEXT_SLOT, &encode(text, encoding))
    }

    fn substitute_value(&self, value: &Value, text: &str) -> Value {
        match value {
            Value::String(template) => Value::String(self.substitute(template, text, Encoding::Raw)),
            Value::Array(items) => Value::Array(items.iter().map(|item| self.substitute_value(item, text)).collect()),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, item)| (key.clone(), self.substitute_value(item, text)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Substitute languages and text into the request template
    pub fn prepare(&self, text: &str) -> PreparedRequest {
        let url = self.substitute(&self.core.info.endpoint, text, Encoding::Url);
        let mut headers: Vec<(String, String)> = self
            .data
            .headers
            .iter()
            .map(|(key, value)| (key.clone(), self.substitute(value, text, Encoding::Raw)))
            .collect();
        let content_type = self.data.content_type().unwrap_or_default().to_lowercase();
        let body = self.data.body.as_ref().map(|body| match body {
            Value::String(template) => {
                let encoding = if content_type.contains("json") {
                    Encoding::Json
                } else if content_type.contains("x-www-form-urlencoded") {
                    Encoding::Url
                } else {
                    Encoding::Raw
                };
                self.substitute(template, text, encoding)
            }
            Value::Object(map) if !content_type.contains("json") => {
                if content_type.is_empty() {
                    headers.push((
                        "Content-Type".to_string(),
                        "application/x-www-form-urlencoded".to_string(),
                    ));
                }
                let mut form = url::form_urlencoded::Serializer::new(String::new());
                for (key, value) in map {
                    let value = match self.substitute_value(value, text) {
                        Value::String(value) => value,
                        other => other.to_string(),
                    };
                    form.append_pair(key, &value);
                }
                form.finish()
            }
            other => self.substitute_value(other, text).to_string(),
        });
        PreparedRequest { url, headers, body }
    }

    pub fn data(&self) -> &CustomEngineData {
        &self.data
    }
}

#[async_trait]
impl Engine for CustomTranslate {
    fn core(&self) -> &EngineCore {
        &self.core
    }

    async fn translate(&self, text: &str) -> Result<TranslationOutput, EngineError> {
        let prepared = self.prepare(text);
        let mut request = self.core.client().request(self.data.method.clone(), &prepared.url);
        for (key, value) in &prepared.headers {
            request = request.header(key.as_str(), value.as_str());
        }
        if let Some(body) = prepared.body {
            request = request.body(body);
        }
        let body = self.core.send_text(request).await?;
        let response = parse_body(&body)?;
        Ok(TranslationOutput::Text(self.data.response.evaluate(&response)?))
    }
}
