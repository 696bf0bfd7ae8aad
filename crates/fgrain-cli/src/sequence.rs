//! Numbered frame sequences.
//!
//! Sequences are written as a filename pattern with a frame placeholder:
//!
//! - `shot.%04d.pfm` - printf style
//! - `shot.####.pfm` - hash style, one `#` per digit

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

/// Inclusive range of frame numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRange {
    start: i32,
    end: i32,
}

impl FrameRange {
    /// Range from `start` to `end` inclusive; the bounds may come in either order.
    pub fn new(start: i32, end: i32) -> Self {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        Self { start, end }
    }

    pub fn start(&self) -> i32 {
        self.start
    }

    pub fn end(&self) -> i32 {
        self.end
    }

    pub fn iter(&self) -> impl Iterator<Item = i32> {
        self.start..=self.end
    }
}

impl fmt::Display for FrameRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// A numbered file sequence.
#[derive(Debug, Clone)]
pub struct Sequence {
    dir: PathBuf,
    prefix: String,
    suffix: String,
    padding: usize,
}

impl Sequence {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>, padding: usize) -> Self {
        Self {
            dir: PathBuf::new(),
            prefix: prefix.into(),
            suffix: suffix.into(),
            padding: padding.max(1),
        }
    }

    /// Whether `path` contains a frame placeholder.
    pub fn is_pattern(path: &str) -> bool {
        file_name(path).is_some_and(|name| find_printf(name).is_some() || name.contains('#'))
    }

    /// Parses a pattern such as `dir/shot.%04d.pfm` or `dir/shot.####.pfm`.
    pub fn from_pattern(pattern: &str) -> Result<Self> {
        let path = Path::new(pattern);
        let name = file_name(pattern).with_context(|| format!("invalid sequence pattern: {pattern}"))?;
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        if let Some((start, end, padding)) = find_printf(name) {
            return Ok(Self::new(&name[..start], &name[end..], padding).with_dir(dir));
        }

        if let Some(hash_start) = name.find('#') {
            let hash_end = name[hash_start..]
                .find(|c| c != '#')
                .map(|i| hash_start + i)
                .unwrap_or(name.len());
            return Ok(Self::new(&name[..hash_start], &name[hash_end..], hash_end - hash_start).with_dir(dir));
        }

        bail!("no frame placeholder in pattern: {pattern}")
    }

    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = dir.into();
        self
    }

    /// Path of frame `frame`.
    pub fn frame_path(&self, frame: i32) -> PathBuf {
        let filename = format!(
            "{}{:0width$}{}",
            self.prefix,
            frame,
            self.suffix,
            width = self.padding
        );
        self.dir.join(filename)
    }

    /// First to last frame number found on disk.
    ///
    /// Frame numbers need at least `padding` digits; longer numbers are
    /// accepted since padding is a minimum width.
    pub fn scan(&self) -> Result<Option<FrameRange>> {
        let dir = if self.dir.as_os_str().is_empty() {
            Path::new(".")
        } else {
            self.dir.as_path()
        };
        let entries = std::fs::read_dir(dir).with_context(|| format!("Failed to list: {}", dir.display()))?;

        let mut range: Option<FrameRange> = None;
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(digits) = name
                .strip_prefix(self.prefix.as_str())
                .and_then(|rest| rest.strip_suffix(self.suffix.as_str()))
            else {
                continue;
            };
            if digits.len() < self.padding || !digits.bytes().all(|b| b.is_ascii_digit()) {
                continue;
            }
            let Ok(frame) = digits.parse::<i32>() else { continue };
            range = Some(match range {
                None => FrameRange::new(frame, frame),
                Some(r) => FrameRange::new(r.start.min(frame), r.end.max(frame)),
            });
        }
        Ok(range)
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pattern = format!("{}%0{}d{}", self.prefix, self.padding, self.suffix);
        if self.dir.as_os_str().is_empty() {
            write!(f, "{pattern}")
        } else {
            write!(f, "{}", self.dir.join(pattern).display())
        }
    }
}

fn file_name(path: &str) -> Option<&str> {
    Path::new(path).file_name().and_then(|s| s.to_str())
}

/// Finds `%d` / `%0Nd`; returns (start, end, padding).
fn find_printf(name: &str) -> Option<(usize, usize, usize)> {
    let start = name.find('%')?;
    let rest = &name[start + 1..];
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if rest.as_bytes().get(digits) != Some(&b'd') {
        return None;
    }
    let padding = rest[..digits].trim_start_matches('0').parse().unwrap_or(1);
    Some((start, start + 1 + digits + 1, padding))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_range() {
        let r = FrameRange::new(1010, 1001);
        assert_eq!(r.start(), 1001);
        assert_eq!(r.to_string(), "1001-1010");
        assert_eq!(FrameRange::new(5, 5).to_string(), "5");
        assert_eq!(r.iter().count(), 10);
    }

    #[test]
    fn test_printf_pattern() {
        let seq = Sequence::from_pattern("plates/shot.%04d.pfm").unwrap();
        assert_eq!(seq.to_string(), "plates/shot.%04d.pfm");
        assert_eq!(seq.frame_path(42), Path::new("plates/shot.0042.pfm"));

        let seq = Sequence::from_pattern("f%d.pfm").unwrap();
        assert_eq!(seq.frame_path(7), Path::new("f7.pfm"));
    }

    #[test]
    fn test_hash_pattern() {
        let seq = Sequence::from_pattern("out.###.pfm").unwrap();
        assert_eq!(seq.frame_path(5), Path::new("out.005.pfm"));
        assert_eq!(seq.to_string(), "out.%03d.pfm");
    }

    #[test]
    fn test_is_pattern() {
        assert!(Sequence::is_pattern("a.%04d.pfm"));
        assert!(Sequence::is_pattern("dir/a.####.pfm"));
        assert!(!Sequence::is_pattern("a.0001.pfm"));
        assert!(!Sequence::is_pattern("100%.pfm"));
        assert!(Sequence::from_pattern("plain.pfm").is_err());
    }

    #[test]
    fn test_scan() {
        let dir = tempfile::tempdir().unwrap();
        for f in [3, 4, 9, 12] {
            std::fs::write(dir.path().join(format!("s.{f:04}.pfm")), b"").unwrap();
        }
        std::fs::write(dir.path().join("s.01.pfm"), b"").unwrap();
        std::fs::write(dir.path().join("other.0001.pfm"), b"").unwrap();

        let pattern = dir.path().join("s.####.pfm");
        let seq = Sequence::from_pattern(pattern.to_str().unwrap()).unwrap();
        assert_eq!(seq.scan().unwrap(), Some(FrameRange::new(3, 12)));

        let empty = Sequence::from_pattern(dir.path().join("none.%02d.pfm").to_str().unwrap()).unwrap();
        assert_eq!(empty.scan().unwrap(), None);
    }
}
