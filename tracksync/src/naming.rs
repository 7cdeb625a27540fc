//! Naming patterns and metadata-driven destination paths

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use crate::error::{NamingError, Result, SyncError};
use crate::metadata::TrackTags;

/// Pattern used when none is configured
pub const DEFAULT_PATTERN: &str = "%a/%b/%n-%t";

/// Tag field referenced by a pattern placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagField {
    Artist,
    Album,
    Number,
    Title,
    Year,
}

impl TagField {
    fn from_placeholder(c: char) -> Option<Self> {
        match c {
            'a' => Some(Self::Artist),
            'b' => Some(Self::Album),
            'n' => Some(Self::Number),
            't' => Some(Self::Title),
            'y' => Some(Self::Year),
            _ => None,
        }
    }

    fn value(self, tags: &TrackTags) -> Option<&str> {
        match self {
            Self::Artist => tags.artist.as_deref(),
            Self::Album => tags.album.as_deref(),
            Self::Number => tags.number.as_deref(),
            Self::Title => tags.title.as_deref(),
            Self::Year => tags.year.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(TagField),
}

/// Parsed destination template, e.g. `%a/%b/%n-%t`
///
/// Placeholders: `%a` artist, `%b` album, `%n` track number (zero-padded to two
/// digits), `%t` title, `%y` year, `%%` a literal percent sign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingPattern {
    source: String,
    segments: Vec<Segment>,
}

impl NamingPattern {
    pub fn parse(pattern: &str) -> Result<Self> {
        if pattern.trim().is_empty() {
            return Err(SyncError::pattern_error(pattern, "pattern is empty"));
        }
        if Path::new(pattern).is_absolute() {
            return Err(SyncError::pattern_error(pattern, "pattern must be relative"));
        }
        if pattern.split('/').any(|part| part == "." || part == "..") {
            return Err(SyncError::pattern_error(pattern, "pattern must not contain '.' or '..' components"));
        }

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = pattern.chars();

        while let Some(c) = chars.next() {
            if c != '%' {
                literal.push(c);
                continue;
            }
            match chars.next() {
                Some('%') => literal.push('%'),
                Some(p) => {
                    let field = TagField::from_placeholder(p).ok_or_else(|| {
                        SyncError::pattern_error(pattern, format!("unknown placeholder '%{p}'"))
                    })?;
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(field));
                }
                None => {
                    return Err(SyncError::pattern_error(pattern, "dangling '%' at end of pattern"));
                }
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: pattern.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the pattern references `field`
    pub fn uses(&self, field: TagField) -> bool {
        self.segments.contains(&Segment::Field(field))
    }

    /// Substitute tag values; `None` when a referenced field is absent
    fn render(&self, tags: &TrackTags) -> Option<String> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(field) => {
                    let value = sanitize_value(field.value(tags)?);
                    if *field == TagField::Number {
                        out.push_str(&format!("{value:0>2}"));
                    } else {
                        out.push_str(&value);
                    }
                }
            }
        }
        Some(out)
    }
}

impl Default for NamingPattern {
    /// `%a/%b/%n-%t`
    fn default() -> Self {
        Self {
            source: DEFAULT_PATTERN.to_string(),
            segments: vec![
                Segment::Field(TagField::Artist),
                Segment::Literal("/".to_string()),
                Segment::Field(TagField::Album),
                Segment::Literal("/".to_string()),
                Segment::Field(TagField::Number),
                Segment::Literal("-".to_string()),
                Segment::Field(TagField::Title),
            ],
        }
    }
}

impl FromStr for NamingPattern {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for NamingPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Replace `/` with `-` and drop trailing whitespace; empty and all-dot values become `-`
fn sanitize_value(value: &str) -> String {
    let value = value.replace('/', "-").trim_end().to_string();
    if value.chars().all(|c| c == '.') {
        return "-".to_string();
    }
    value
}

/// Every component is a plain name, so joining stays under the root
fn stays_inside(relative: &Path) -> bool {
    relative
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
}

/// Builds relative destination paths from tags, falling back to local roots
#[derive(Debug, Clone)]
pub struct PathBuilder {
    pattern: NamingPattern,
    local_roots: Vec<PathBuf>,
}

impl PathBuilder {
    pub fn new(pattern: NamingPattern, local_roots: Vec<PathBuf>) -> Self {
        Self {
            pattern,
            local_roots,
        }
    }

    /// Relative destination path for `source`
    pub fn build(&self, tags: &TrackTags, source: &Path) -> std::result::Result<PathBuf, NamingError> {
        let relative = self.build_unchecked(tags, source)?;
        if !stays_inside(&relative) {
            return Err(NamingError::OutsideDestination {
                source_path: source.to_path_buf(),
                relative,
            });
        }
        Ok(relative)
    }

    fn build_unchecked(&self, tags: &TrackTags, source: &Path) -> std::result::Result<PathBuf, NamingError> {
        let complete = tags.has_primary_fields()
            && (!self.pattern.uses(TagField::Year) || tags.year.is_some());

        if complete {
            if let Some(rendered) = self.pattern.render(tags) {
                let mut file = rendered;
                if let Some(ext) = source.extension() {
                    file.push('.');
                    file.push_str(&ext.to_string_lossy());
                }
                return Ok(PathBuf::from(file));
            }
        }

        self.mirror_local_path(source)
    }

    /// Source path relative to the longest configured root containing it
    fn mirror_local_path(&self, source: &Path) -> std::result::Result<PathBuf, NamingError> {
        self.local_roots
            .iter()
            .filter(|root| source.starts_with(root))
            .max_by_key(|root| root.components().count())
            .and_then(|root| source.strip_prefix(root).ok())
            .filter(|relative| !relative.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .ok_or_else(|| NamingError::NoLocalRootMatch {
                source_path: source.to_path_buf(),
                roots: self.local_roots.clone(),
            })
    }
}
