use crate::core::settings::Mode;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Some backends encode the script array as a JSON string, sometimes twice.
const MAX_DECODE_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScriptLine {
    #[serde(default, alias = "speaker")]
    pub role: String,
    #[serde(default, alias = "content")]
    pub text: String,
}

impl ScriptLine {
    pub fn new(role: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("at least one line must remain")]
    LastLine,
    #[error("line {0} does not exist")]
    OutOfRange(usize),
    #[error("role '{0}' is not used in this script")]
    UnknownRole(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Script {
    lines: Vec<ScriptLine>,
}

impl Script {
    pub fn new(lines: Vec<ScriptLine>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[ScriptLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Distinct roles in order of first appearance.
    pub fn roles(&self) -> Vec<String> {
        let mut roles: Vec<String> = Vec::new();
        for line in &self.lines {
            if !line.role.is_empty() && !roles.contains(&line.role) {
                roles.push(line.role.clone());
            }
        }
        roles
    }

    pub fn set_text(&mut self, index: usize, text: impl Into<String>) -> Result<(), EditError> {
        let line = self.lines.get_mut(index).ok_or(EditError::OutOfRange(index))?;
        line.text = text.into();
        Ok(())
    }

    /// Reassigns a line to one of the roles already present in the script.
    pub fn set_role(&mut self, index: usize, role: &str) -> Result<(), EditError> {
        if index >= self.lines.len() {
            return Err(EditError::OutOfRange(index));
        }
        if !self.roles().iter().any(|r| r == role) {
            return Err(EditError::UnknownRole(role.to_string()));
        }
        self.lines[index].role = role.to_string();
        Ok(())
    }

    /// Inserts an empty line at `index + 1` and returns its position.
    ///
    /// With exactly two roles in play the new line goes to the partner of
    /// line `index`, so dialogue keeps alternating. `fallback_role` is used
    /// only when the script has no roles at all.
    pub fn insert_after(&mut self, index: usize, fallback_role: &str) -> Result<usize, EditError> {
        if !self.lines.is_empty() && index >= self.lines.len() {
            return Err(EditError::OutOfRange(index));
        }
        let roles = self.roles();
        let current = self.lines.get(index).map(|l| l.role.as_str());
        let role = match (roles.as_slice(), current) {
            ([a, b], Some(cur)) if cur == a => b.clone(),
            ([a, b], Some(cur)) if cur == b => a.clone(),
            ([first, ..], _) => first.clone(),
            ([], _) => fallback_role.to_string(),
        };
        let at = if self.lines.is_empty() { 0 } else { index + 1 };
        self.lines.insert(at, ScriptLine::new(role, ""));
        Ok(at)
    }

    /// Removes one line. The last remaining line can never be removed.
    pub fn delete(&mut self, index: usize) -> Result<ScriptLine, EditError> {
        if index >= self.lines.len() {
            return Err(EditError::OutOfRange(index));
        }
        if self.lines.len() == 1 {
            return Err(EditError::LastLine);
        }
        Ok(self.lines.remove(index))
    }

    /// Fills blank roles, e.g. lines returned without a speaker.
    pub fn fill_blank_roles(&mut self, role: &str) {
        for line in self.lines.iter_mut().filter(|l| l.role.trim().is_empty()) {
            line.role = role.to_string();
        }
    }

    /// Human-readable form, entries separated by a blank line. Double mode
    /// prefixes each text with `role：`.
    pub fn render(&self, mode: Mode) -> String {
        render_lines(self.lines.iter(), mode)
    }

    /// Same as [`Script::render`] but without empty lines; this is what the
    /// synthesis endpoint receives.
    pub fn synthesis_text(&self, mode: Mode) -> String {
        render_lines(self.lines.iter().filter(|l| !l.text.trim().is_empty()), mode)
    }
}

fn render_lines<'a>(lines: impl Iterator<Item = &'a ScriptLine>, mode: Mode) -> String {
    match mode {
        Mode::Single => lines.map(|l| l.text.as_str()).collect::<Vec<_>>().join("\n\n"),
        Mode::Double => lines
            .map(|l| format!("{}：{}", l.role, l.text))
            .collect::<Vec<_>>()
            .join("\n\n"),
    }
}

/// Decodes the `podcast_script` field: a JSON array, or a string holding one
/// (possibly encoded more than once). Anything else yields an empty script.
pub fn parse_script_payload(payload: &Value) -> Script {
    let mut current = payload.clone();
    let mut attempts = 0;
    while let Value::String(raw) = &current {
        if attempts == MAX_DECODE_ATTEMPTS {
            break;
        }
        attempts += 1;
        match serde_json::from_str::<Value>(&strip_code_blocks(raw)) {
            Ok(decoded) => current = decoded,
            Err(e) => {
                warn!("Script payload is not valid JSON (attempt {}): {}", attempts, e);
                return Script::default();
            }
        }
    }

    match current {
        Value::Array(items) => Script::new(
            items
                .into_iter()
                .filter_map(|item| match serde_json::from_value::<ScriptLine>(item) {
                    Ok(line) => Some(line),
                    Err(e) => {
                        warn!("Skipping malformed script line: {}", e);
                        None
                    }
                })
                .collect(),
        ),
        other => {
            warn!("Script payload did not decode to an array: {}", other);
            Script::default()
        }
    }
}

pub fn strip_code_blocks(s: &str) -> String {
    let s = s.trim();
    if s.starts_with("```json") {
        s.trim_start_matches("```json").trim_end_matches("```").trim().to_string()
    } else if s.starts_with("```") {
        s.trim_start_matches("```").trim_end_matches("```").trim().to_string()
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dialogue() -> Script {
        Script::new(vec![
            ScriptLine::new("HostA", "Welcome back."),
            ScriptLine::new("HostB", "Glad to be here."),
            ScriptLine::new("HostA", "Let's start."),
        ])
    }

    #[test]
    fn test_strip_code_blocks() {
        assert_eq!(strip_code_blocks("json"), "json");
        assert_eq!(strip_code_blocks("```json\n[]\n```"), "[]");
        assert_eq!(strip_code_blocks("```\n[]\n```"), "[]");
    }

    #[test]
    fn test_parse_array_and_nested_strings() {
        let array = json!([{"role": "HostA", "text": "Hi"}]);
        let once = Value::String(array.to_string());
        let twice = Value::String(once.to_string());
        let thrice = Value::String(twice.to_string());

        for payload in [&array, &once, &twice, &thrice] {
            let script = parse_script_payload(payload);
            assert_eq!(script.lines(), &[ScriptLine::new("HostA", "Hi")]);
        }
    }

    #[test]
    fn test_parse_gives_up_after_three_layers() {
        let array = json!([{"role": "HostA", "text": "Hi"}]);
        let mut payload = Value::String(array.to_string());
        for _ in 0..3 {
            payload = Value::String(payload.to_string());
        }
        assert!(parse_script_payload(&payload).is_empty());
    }

    #[test]
    fn test_parse_non_array_collapses_to_empty() {
        assert!(parse_script_payload(&json!({"role": "x"})).is_empty());
        assert!(parse_script_payload(&json!("not json at all")).is_empty());
        assert!(parse_script_payload(&Value::Null).is_empty());
    }

    #[test]
    fn test_parse_accepts_fenced_and_aliased_lines() {
        let payload = json!("```json\n[{\"speaker\": \"Host\", \"content\": \"Hello\"}, 7]\n```");
        let script = parse_script_payload(&payload);
        assert_eq!(script.lines(), &[ScriptLine::new("Host", "Hello")]);
    }

    #[test]
    fn test_roles_in_first_appearance_order() {
        assert_eq!(dialogue().roles(), vec!["HostA", "HostB"]);
    }

    #[test]
    fn test_delete_refuses_last_line() {
        let mut script = Script::new(vec![ScriptLine::new("Host", "only")]);
        assert_eq!(script.delete(0), Err(EditError::LastLine));
        assert_eq!(script.len(), 1);
    }

    #[test]
    fn test_delete_removes_exactly_one() {
        let mut script = dialogue();
        let removed = script.delete(1).unwrap();
        assert_eq!(removed.text, "Glad to be here.");
        assert_eq!(script.len(), 2);
        assert_eq!(script.delete(5), Err(EditError::OutOfRange(5)));
    }

    #[test]
    fn test_insert_after_uses_partner_role() {
        let mut script = dialogue();
        let at = script.insert_after(0, "Host").unwrap();
        assert_eq!(at, 1);
        assert_eq!(script.len(), 4);
        assert_eq!(script.lines()[1], ScriptLine::new("HostB", ""));

        let at = script.insert_after(2, "Host").unwrap();
        assert_eq!(script.lines()[at].role, "HostA");
    }

    #[test]
    fn test_insert_with_single_role_and_empty_script() {
        let mut script = Script::new(vec![ScriptLine::new("主播", "你好")]);
        script.insert_after(0, "x").unwrap();
        assert_eq!(script.lines()[1].role, "主播");

        let mut empty = Script::default();
        assert_eq!(empty.insert_after(0, "Host"), Ok(0));
        assert_eq!(empty.lines()[0].role, "Host");
    }

    #[test]
    fn test_set_role_only_offers_roles_in_use() {
        let mut script = dialogue();
        script.set_role(0, "HostB").unwrap();
        assert_eq!(script.lines()[0].role, "HostB");
        assert_eq!(
            script.set_role(0, "Guest"),
            Err(EditError::UnknownRole("Guest".to_string()))
        );
    }

    #[test]
    fn test_render_modes() {
        let script = dialogue();
        assert_eq!(
            script.render(Mode::Double),
            "HostA：Welcome back.\n\nHostB：Glad to be here.\n\nHostA：Let's start."
        );
        assert_eq!(
            script.render(Mode::Single),
            "Welcome back.\n\nGlad to be here.\n\nLet's start."
        );
    }

    #[test]
    fn test_synthesis_text_skips_empty_lines_and_reflects_edits() {
        let mut script = dialogue();
        script.insert_after(0, "Host").unwrap();
        script.set_text(2, "Happy to join!").unwrap();

        let text = script.synthesis_text(Mode::Double);
        assert_eq!(
            text,
            "HostA：Welcome back.\n\nHostB：Happy to join!\n\nHostA：Let's start."
        );
    }
}
