//! Player name policy.
//!
//! A game is hidden from public listings when any of its player names is
//! malformed or contains a banned word. The word list comes from the file
//! named in [`ModerationConfig::banlist_file`].

use std::io;
use std::path::Path;

use crate::config::ModerationConfig;

/// Characters never allowed in a player name.
const FORBIDDEN_CHARS: &[char] = &[',', '<', '>', '%', '&', '\\', '"', '?', '*', '#', '/', ':'];

/// Whether a single name is malformed.
pub fn is_invalid_name(name: &str) -> bool {
    name.chars().any(|c| {
        !c.is_ascii() || c.is_ascii_control() || c.is_whitespace() || FORBIDDEN_CHARS.contains(&c)
    })
}

/// Banned-word list, lowercased.
#[derive(Debug, Clone, Default)]
pub struct NamePolicy {
    banned_words: Vec<String>,
}

impl NamePolicy {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let banned_words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self { banned_words }
    }

    /// Read one word per line. A missing file yields an empty list.
    pub fn load(path: &Path) -> io::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Self::new(content.lines())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(?path, "No banned-word list");
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    pub fn from_config(config: &ModerationConfig) -> io::Result<Self> {
        if config.banlist_file.is_empty() {
            return Ok(Self::default());
        }
        Self::load(Path::new(&config.banlist_file))
    }

    /// Whether any name contains a banned word, ignoring case.
    pub fn any_name_banned<S: AsRef<str>>(&self, names: &[S]) -> bool {
        names.iter().any(|name| {
            let name = name.as_ref().to_lowercase();
            self.banned_words.iter().any(|w| name.contains(w.as_str()))
        })
    }

    /// Whether a game with these players should be hidden.
    pub fn hides<S: AsRef<str>>(&self, names: &[S]) -> bool {
        names.iter().any(|n| is_invalid_name(n.as_ref())) || self.any_name_banned(names)
    }

    pub fn word_count(&self) -> usize {
        self.banned_words.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(!is_invalid_name("Alice"));
        assert!(!is_invalid_name("Bob123"));
    }

    #[test]
    fn test_invalid_names() {
        for name in [
            "Ali,ce", "Ali ce", "<script>", "100%", "Tom&Jerry", "path\\name", "say\"hi\"",
            "who?", "star*", "hash#tag", "path/name", "time:now", "test\x00", "tëst",
        ] {
            assert!(is_invalid_name(name), "{name:?} should be invalid");
        }
    }

    #[test]
    fn test_mixed_valid_invalid() {
        assert!(NamePolicy::default().hides(&["ValidName", "Invalid Name"]));
        assert!(!NamePolicy::default().hides(&["Alice", "Bob123"]));
    }

    #[test]
    fn test_no_banlist_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let policy = NamePolicy::load(&dir.path().join("nonexistent")).expect("load");
        assert_eq!(policy.word_count(), 0);
        assert!(!policy.any_name_banned(&["Player"]));
    }

    #[test]
    fn test_empty_banlist() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("banlist");
        std::fs::write(&path, "").expect("write");
        assert!(!NamePolicy::load(&path).expect("load").any_name_banned(&["Player"]));
    }

    #[test]
    fn test_banned_word_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("banlist");
        std::fs::write(&path, "badword\n").expect("write");
        let policy = NamePolicy::from_config(&ModerationConfig {
            banlist_file: path.display().to_string(),
        })
        .expect("load");
        assert!(policy.any_name_banned(&["xbadwordx"]));
        assert!(!policy.any_name_banned(&["goodplayer"]));
    }

    #[test]
    fn test_banned_word_case_insensitive() {
        let policy = NamePolicy::new(["BADWORD", "  ", ""]);
        assert_eq!(policy.word_count(), 1);
        assert!(policy.any_name_banned(&["badword"]));
        assert!(policy.hides(&["xBadWordx"]));
    }

    #[test]
    fn test_unconfigured_policy_is_empty() {
        let policy = NamePolicy::from_config(&ModerationConfig::default()).expect("load");
        assert_eq!(policy.word_count(), 0);
    }
}
