// SPDX-License-Identifier: PMPL-1.0-or-later
//! Name-based heuristic classification.
//!
//! Design documents carry no semantics, so roles (interactive, heading,
//! decorative, landmark) are inferred from layer names and text content.
//! Misclassification is an accepted limitation. All pattern tables live
//! here so analyzers never embed their own regexes.

use crate::config::PatternConfig;
use crate::error::Result;
use regex::{Regex, RegexBuilder};

/// Structural landmark groups expected on a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Landmark {
    Header,
    Navigation,
    Main,
    Footer,
}

impl Landmark {
    pub const ALL: [Landmark; 4] = [
        Landmark::Header,
        Landmark::Navigation,
        Landmark::Main,
        Landmark::Footer,
    ];

    /// Wording used when reporting the landmark as missing
    pub fn label(&self) -> &'static str {
        match self {
            Landmark::Header => "header",
            Landmark::Navigation => "navigation",
            Landmark::Main => "main content area",
            Landmark::Footer => "footer",
        }
    }
}

/// Compiled pattern tables
#[derive(Debug, Clone)]
pub struct Classifier {
    touch_target: Regex,
    interactive: Regex,
    focus_state: Regex,
    container: Regex,
    heading: Regex,
    heading_level: Regex,
    decorative: Regex,
    status_word: Regex,
    indicator: Regex,
    landmarks: [(Landmark, Regex); 4],
}

fn compile(pattern: &str) -> Result<Regex> {
    Ok(RegexBuilder::new(pattern).case_insensitive(true).build()?)
}

fn matches(re: &Regex, name: Option<&str>) -> bool {
    name.is_some_and(|n| re.is_match(n))
}

impl Classifier {
    pub fn from_config(patterns: &PatternConfig) -> Result<Self> {
        Ok(Self {
            touch_target: compile(&patterns.touch_target)?,
            interactive: compile(&patterns.interactive)?,
            focus_state: compile(&patterns.focus_state)?,
            container: compile(&patterns.container)?,
            heading: compile(&patterns.heading)?,
            heading_level: compile(&patterns.heading_level)?,
            decorative: compile(&patterns.decorative)?,
            status_word: compile(&patterns.status_word)?,
            indicator: compile(&patterns.indicator)?,
            landmarks: [
                (Landmark::Header, compile(&patterns.landmark_header)?),
                (Landmark::Navigation, compile(&patterns.landmark_navigation)?),
                (Landmark::Main, compile(&patterns.landmark_main)?),
                (Landmark::Footer, compile(&patterns.landmark_footer)?),
            ],
        })
    }

    /// Frame names that denote a touch target (button, tab, slider, ...)
    pub fn is_touch_target(&self, name: Option<&str>) -> bool {
        matches(&self.touch_target, name)
    }

    /// Names of any node that should receive keyboard focus
    pub fn is_interactive(&self, name: Option<&str>) -> bool {
        matches(&self.interactive, name)
    }

    pub fn has_focus_state(&self, name: Option<&str>) -> bool {
        matches(&self.focus_state, name)
    }

    pub fn is_container(&self, name: Option<&str>) -> bool {
        matches(&self.container, name)
    }

    pub fn is_heading(&self, name: Option<&str>) -> bool {
        matches(&self.heading, name)
    }

    /// Heading level from a name like "Title / H2"
    pub fn heading_level(&self, name: Option<&str>) -> Option<u32> {
        self.heading_level
            .captures(name?)?
            .get(1)?
            .as_str()
            .parse()
            .ok()
    }

    /// `name` with its heading level replaced by `level`
    pub fn with_heading_level(&self, name: &str, level: u32) -> Option<String> {
        let digit = self.heading_level.captures(name)?.get(1)?;
        Some(format!(
            "{}{}{}",
            &name[..digit.start()],
            level,
            &name[digit.end()..]
        ))
    }

    pub fn is_decorative(&self, name: Option<&str>) -> bool {
        matches(&self.decorative, name)
    }

    pub fn is_status_text(&self, text: Option<&str>) -> bool {
        matches(&self.status_word, text)
    }

    pub fn is_indicator(&self, name: Option<&str>) -> bool {
        matches(&self.indicator, name)
    }

    /// Landmark groups whose pattern matches `name`
    pub fn landmarks<'a>(&'a self, name: &'a str) -> impl Iterator<Item = Landmark> + 'a {
        self.landmarks
            .iter()
            .filter(move |(_, re)| re.is_match(name))
            .map(|(landmark, _)| *landmark)
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::from_config(&PatternConfig::default()).expect("built-in patterns compile")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuditError;

    #[test]
    fn test_touch_targets_case_insensitive() {
        let c = Classifier::default();
        assert!(c.is_touch_target(Some("Primary BUTTON")));
        assert!(c.is_touch_target(Some("nav-tab")));
        assert!(!c.is_touch_target(Some("Hero image")));
        assert!(!c.is_touch_target(None));
    }

    #[test]
    fn test_heading_levels() {
        let c = Classifier::default();
        assert!(c.is_heading(Some("H2 Subtitle")));
        assert!(c.is_heading(Some("section heading")));
        assert_eq!(c.heading_level(Some("Title/h3")), Some(3));
        assert_eq!(c.heading_level(Some("Heading")), None);
        assert_eq!(c.heading_level(Some("h7")), None);
        assert_eq!(
            c.with_heading_level("Section / H4", 3).as_deref(),
            Some("Section / H3")
        );
    }

    #[test]
    fn test_landmarks() {
        let c = Classifier::default();
        let found: Vec<_> = c.landmarks("Main Navigation").collect();
        assert_eq!(found, vec![Landmark::Navigation, Landmark::Main]);
        assert_eq!(c.landmarks("Site Footer").count(), 1);
        assert_eq!(c.landmarks("Card").count(), 0);
    }

    #[test]
    fn test_status_and_indicator() {
        let c = Classifier::default();
        assert!(c.is_status_text(Some("Payment Pending")));
        assert!(c.is_indicator(Some("status dot")));
        assert!(c.is_decorative(Some("Divider")));
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        let patterns = PatternConfig {
            container: "(unclosed".to_string(),
            ..PatternConfig::default()
        };
        assert!(matches!(
            Classifier::from_config(&patterns),
            Err(AuditError::Pattern(_))
        ));
    }
}
