//! Script line parsing.
//!
//! A line looks like `Character[action|direction|duration]: dialogue`. The bracket group and
//! each of its fields are optional:
//!
//! ```text
//! Bob: Hello there.
//! Bob[angry]: (shouting) Get out!
//! Bob[happy|left]: Over here.
//! Bob[normal||2.5]: Hmm.
//! ```

use crate::foundation::error::{ToonError, ToonResult};

pub const DEFAULT_ACTION: &str = "normal";
pub const DEFAULT_DIRECTION: &str = "front";

/// One parsed script line.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScriptLine {
    pub character: String,
    pub action: String,
    /// Explicit direction override.
    pub direction: Option<String>,
    /// Raw dialogue, stage directions included.
    pub text: String,
    /// Explicit duration override in seconds.
    pub duration_secs: Option<f64>,
}

impl ScriptLine {
    /// Dialogue with parenthesised stage directions removed.
    pub fn spoken_text(&self) -> String {
        strip_stage_directions(&self.text)
    }

    pub fn direction_or_default(&self) -> &str {
        self.direction.as_deref().unwrap_or(DEFAULT_DIRECTION)
    }
}

/// A script line with its direction and duration resolved.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    pub character: String,
    pub action: String,
    pub direction: String,
    /// Caption/speech text, stage directions already stripped.
    pub dialogue: String,
    pub duration_secs: f64,
}

impl Scene {
    pub fn from_line(line: &ScriptLine, duration_secs: f64) -> Self {
        Self {
            character: line.character.clone(),
            action: line.action.clone(),
            direction: line.direction_or_default().to_string(),
            dialogue: line.spoken_text(),
            duration_secs,
        }
    }
}

pub fn parse_line(raw: &str) -> ToonResult<ScriptLine> {
    let line = raw.trim();
    let Some((head, text)) = line.split_once(':') else {
        return Err(ToonError::parse(raw, "missing ':' between speaker and dialogue"));
    };

    let head = head.trim();
    let (character, tags) = match head.find('[') {
        Some(open) => {
            let Some(inner) = head[open + 1..].strip_suffix(']') else {
                return Err(ToonError::parse(raw, "unterminated '[' tag group"));
            };
            (head[..open].trim(), Some(inner))
        }
        None => (head, None),
    };

    if character.is_empty() {
        return Err(ToonError::parse(raw, "empty character name"));
    }
    check_path_component(raw, "character name", character)?;

    let mut action = DEFAULT_ACTION.to_string();
    let mut direction = None;
    let mut duration_secs = None;
    if let Some(tags) = tags {
        let mut fields = tags.split('|').map(str::trim);
        if let Some(a) = fields.next().filter(|a| !a.is_empty()) {
            check_path_component(raw, "action", a)?;
            action = a.to_string();
        }
        if let Some(d) = fields.next().filter(|d| !d.is_empty()) {
            check_path_component(raw, "direction", d)?;
            direction = Some(d.to_string());
        }
        if let Some(s) = fields.next().filter(|s| !s.is_empty()) {
            let secs = s
                .trim_end_matches('s')
                .parse::<f64>()
                .map_err(|_| ToonError::parse(raw, format!("invalid duration '{s}'")))?;
            if !(secs.is_finite() && secs > 0.0) {
                return Err(ToonError::parse(raw, "duration must be finite and > 0"));
            }
            duration_secs = Some(secs);
        }
        if fields.next().is_some() {
            return Err(ToonError::parse(raw, "too many '|' fields in tag group"));
        }
    }

    Ok(ScriptLine {
        character: character.to_string(),
        action,
        direction,
        text: text.trim().to_string(),
        duration_secs,
    })
}

/// Character, action and direction name asset directories, so each must stay one plain component.
fn check_path_component(raw: &str, what: &str, value: &str) -> ToonResult<()> {
    if value.contains(['/', '\\']) {
        return Err(ToonError::parse(raw, format!("{what} must not contain path separators")));
    }
    if value == "." || value == ".." {
        return Err(ToonError::parse(raw, format!("{what} must not be '{value}'")));
    }
    Ok(())
}

/// Parse a whole script, skipping blank lines and `#` comments.
pub fn parse_script(script: &str) -> ToonResult<Vec<ScriptLine>> {
    script
        .lines()
        .filter(|l| {
            let t = l.trim();
            !t.is_empty() && !t.starts_with('#')
        })
        .map(parse_line)
        .collect()
}

/// Remove `( ... )` performance cues and collapse the remaining whitespace.
pub fn strip_stage_directions(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '(' => depth += 1,
            ')' if depth > 0 => {
                depth -= 1;
                out.push(' ');
            }
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Scene length: explicit override, else the audio's own length, else `default_secs`.
pub fn resolve_scene_duration(
    explicit_secs: Option<f64>,
    audio_secs: Option<f64>,
    default_secs: f64,
) -> f64 {
    explicit_secs
        .filter(|s| s.is_finite() && *s > 0.0)
        .or(audio_secs.filter(|s| s.is_finite() && *s > 0.0))
        .unwrap_or(default_secs)
}

#[cfg(test)]
#[path = "../tests/unit/script.rs"]
mod tests;
