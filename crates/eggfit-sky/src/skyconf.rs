//! SkyMaker configuration files.
//!
//! A configuration is a list of `KEYWORD value  # comment` lines mixed with
//! blank and comment-only lines. Editing keeps every untouched line byte for
//! byte, so a derived file diffs cleanly against its source.

use std::fs;
use std::path::Path;

use crate::SkyError;

/// One `KEYWORD value # comment` line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
    pub comment: Option<String>,
}

impl ConfigEntry {
    fn parse(line: &str) -> Self {
        let (body, comment) = match line.split_once('#') {
            Some((body, comment)) => (body, Some(comment.trim().to_string())),
            None => (line, None),
        };
        let body = body.trim();
        let (key, value) = match body.split_once(char::is_whitespace) {
            Some((key, value)) => (key, value.trim()),
            None => (body, ""),
        };
        Self {
            key: key.to_string(),
            value: value.to_string(),
            comment,
        }
    }

    fn render(&self) -> String {
        let mut out = format!("{:<16} {}", self.key, self.value);
        if let Some(comment) = &self.comment {
            out = format!("{out:<40} # {comment}");
        }
        out
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Line {
    Verbatim(String),
    /// The source text is dropped once the entry is edited.
    Entry {
        entry: ConfigEntry,
        source: Option<String>,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SkyConfig {
    lines: Vec<Line>,
}

impl SkyConfig {
    /// Keyword holding the rendered image path.
    pub const IMAGE_NAME: &'static str = "IMAGE_NAME";

    pub fn parse(text: &str) -> Self {
        let lines = text
            .lines()
            .map(|raw| {
                let trimmed = raw.trim();
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    Line::Verbatim(raw.to_string())
                } else {
                    Line::Entry {
                        entry: ConfigEntry::parse(trimmed),
                        source: Some(raw.to_string()),
                    }
                }
            })
            .collect();
        Self { lines }
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self, SkyError> {
        Ok(Self::parse(&fs::read_to_string(path)?))
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), SkyError> {
        fs::write(path, self.to_text())?;
        Ok(())
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                Line::Verbatim(raw) => out.push_str(raw),
                Line::Entry {
                    source: Some(raw), ..
                } => out.push_str(raw),
                Line::Entry {
                    entry,
                    source: None,
                } => out.push_str(&entry.render()),
            }
            out.push('\n');
        }
        out
    }

    pub fn entries(&self) -> impl Iterator<Item = &ConfigEntry> {
        self.lines.iter().filter_map(|line| match line {
            Line::Entry { entry, .. } => Some(entry),
            Line::Verbatim(_) => None,
        })
    }

    /// Value of the first entry named `key` (case-insensitive).
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries()
            .find(|e| e.key.eq_ignore_ascii_case(key))
            .map(|e| e.value.as_str())
    }

    /// Replace the value of an existing entry, keeping its comment.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> Result<(), SkyError> {
        for line in &mut self.lines {
            if let Line::Entry { entry, source } = line {
                if entry.key.eq_ignore_ascii_case(key) {
                    entry.value = value.into();
                    *source = None;
                    return Ok(());
                }
            }
        }
        Err(SkyError::UnknownKey(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONF: &str = "\
# Default configuration file for SkyMaker
IMAGE_NAME      sky.fits        # Name of the output frame
IMAGE_SIZE      1024            # Width,[height] of the output frame

#---- Noise ----
EXPOSURE_TIME   300.0           # Total exposure time (s)
MAG_LIMITS      17.0,26.0
";

    #[test]
    fn parses_entries_and_comments() {
        let conf = SkyConfig::parse(CONF);
        assert_eq!(conf.entries().count(), 4);
        assert_eq!(conf.get("IMAGE_NAME"), Some("sky.fits"));
        assert_eq!(conf.get("exposure_time"), Some("300.0"));
        assert_eq!(conf.get("MAG_LIMITS"), Some("17.0,26.0"));
        assert_eq!(conf.get("SEED_MOTION"), None);
        let first = conf.entries().next().expect("entry");
        assert_eq!(first.comment.as_deref(), Some("Name of the output frame"));
    }

    #[test]
    fn untouched_text_is_preserved() {
        assert_eq!(SkyConfig::parse(CONF).to_text(), CONF);
    }

    #[test]
    fn set_rewrites_only_the_edited_line() {
        let mut conf = SkyConfig::parse(CONF);
        conf.set("image_name", "sky_bulge.fits").expect("set");
        assert_eq!(conf.get("IMAGE_NAME"), Some("sky_bulge.fits"));

        let text = conf.to_text();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[1].starts_with("IMAGE_NAME       sky_bulge.fits"));
        assert!(lines[1].ends_with("# Name of the output frame"));
        assert_eq!(lines[2], CONF.lines().nth(2).expect("line"));
        assert_eq!(SkyConfig::parse(&text).get("IMAGE_NAME"), Some("sky_bulge.fits"));
    }

    #[test]
    fn unknown_key_is_an_error() {
        let mut conf = SkyConfig::parse(CONF);
        assert!(matches!(
            conf.set("NOPE", "1"),
            Err(SkyError::UnknownKey(key)) if key == "NOPE"
        ));
    }
}
