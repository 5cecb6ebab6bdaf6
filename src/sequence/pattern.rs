use crate::foundation::error::{SeqError, SeqResult};

/// File-name pattern of an image sequence.
///
/// Accepted forms:
/// - hash padding: `shot01.####.exr` (one `#` per digit)
/// - printf padding: `shot01.%04d.exr` or `shot01.%d.exr`
/// - no placeholder: a single still image used for every frame
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FramePattern {
    prefix: String,
    suffix: String,
    // Minimum digit count; `None` for still images.
    width: Option<usize>,
}

impl FramePattern {
    /// Parse a pattern string. Backslashes are normalized to `/`.
    pub fn parse(pattern: &str) -> SeqResult<Self> {
        let s = pattern.replace('\\', "/");
        if s.is_empty() {
            return Err(SeqError::validation("frame pattern must be non-empty"));
        }

        let hash = find_hash_run(&s)?;
        let printf = find_printf(&s)?;
        let (start, end, width) = match (hash, printf) {
            (Some(_), Some(_)) => {
                return Err(SeqError::validation(
                    "frame pattern must not mix '#' and '%d' placeholders",
                ));
            }
            (Some(run), None) | (None, Some(run)) => run,
            (None, None) => {
                return Ok(Self {
                    prefix: s,
                    suffix: String::new(),
                    width: None,
                });
            }
        };

        let prefix = s[..start].to_owned();
        let suffix = s[end..].to_owned();
        if suffix.contains('/') {
            return Err(SeqError::validation(
                "frame placeholder must be in the file name, not a directory",
            ));
        }
        Ok(Self {
            prefix,
            suffix,
            width: Some(width),
        })
    }

    /// Return `true` when the pattern names one still image.
    pub fn is_still(&self) -> bool {
        self.width.is_none()
    }

    /// Directory part of the pattern, if any.
    pub fn dir(&self) -> Option<&str> {
        // The placeholder never sits in a directory, so the prefix holds the whole directory.
        self.prefix.rfind('/').map(|i| &self.prefix[..i])
    }

    /// File-name pattern with the directory stripped.
    pub fn file_pattern(&self) -> Self {
        let cut = self.dir().map(|d| d.len() + 1).unwrap_or(0);
        Self {
            prefix: self.prefix[cut..].to_owned(),
            suffix: self.suffix.clone(),
            width: self.width,
        }
    }

    /// Expand the pattern for `frame`.
    ///
    /// Numbers wider than the padding are written in full.
    pub fn format(&self, frame: u64) -> String {
        match self.width {
            None => self.prefix.clone(),
            Some(width) => format!("{}{:0width$}{}", self.prefix, frame, self.suffix),
        }
    }

    /// Recover the frame number from a name produced by [`FramePattern::format`].
    pub fn parse_frame(&self, name: &str) -> Option<u64> {
        let width = self.width?;
        let digits = name
            .strip_prefix(self.prefix.as_str())?
            .strip_suffix(self.suffix.as_str())?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        // Over-wide numbers are never zero padded.
        if digits.len() < width || (digits.len() > width && digits.starts_with('0')) {
            return None;
        }
        digits.parse().ok()
    }
}

impl std::fmt::Display for FramePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.width {
            None => f.write_str(&self.prefix),
            Some(width) => write!(f, "{}{}{}", self.prefix, "#".repeat(width), self.suffix),
        }
    }
}

fn find_hash_run(s: &str) -> SeqResult<Option<(usize, usize, usize)>> {
    let Some(start) = s.find('#') else {
        return Ok(None);
    };
    let len = s[start..].bytes().take_while(|&b| b == b'#').count();
    let end = start + len;
    if s[end..].contains('#') {
        return Err(SeqError::validation(
            "frame pattern must contain a single '#' run",
        ));
    }
    Ok(Some((start, end, len)))
}

fn find_printf(s: &str) -> SeqResult<Option<(usize, usize, usize)>> {
    let Some(start) = s.find('%') else {
        return Ok(None);
    };
    let spec = &s[start + 1..];
    let digits = spec.bytes().take_while(u8::is_ascii_digit).count();
    if spec.as_bytes().get(digits) != Some(&b'd') {
        return Err(SeqError::validation(format!(
            "unsupported printf placeholder in frame pattern '{s}'"
        )));
    }
    let width = if digits == 0 {
        1
    } else {
        let flags = &spec[..digits];
        if !flags.starts_with('0') {
            return Err(SeqError::validation(
                "printf frame padding must be zero padded (e.g. %04d)",
            ));
        }
        flags
            .parse::<usize>()
            .map_err(|e| SeqError::validation(format!("invalid printf width: {e}")))?
    };
    if width == 0 {
        return Err(SeqError::validation("printf frame padding must be >= 1"));
    }
    let end = start + 1 + digits + 1;
    if s[end..].contains('%') {
        return Err(SeqError::validation(
            "frame pattern must contain a single '%d' placeholder",
        ));
    }
    Ok(Some((start, end, width)))
}

#[cfg(test)]
#[path = "../../tests/unit/sequence/pattern.rs"]
mod tests;
