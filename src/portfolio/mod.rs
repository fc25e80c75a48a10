//! Compiled-in portfolio reference data.
//!
//! Everything in this module is immutable for the life of the process. The
//! tables live in [`data`] and are exposed through the accessor functions
//! below so callers never depend on the storage layout.
//!
//! # Example
//!
//! ```rust
//! use portfolio_engine::portfolio::{self, PanelEntry};
//!
//! let hive = portfolio::find_experience("hivepro").unwrap();
//! assert_eq!(hive.company, "Hive Pro");
//! assert_eq!(hive.id(), "hivepro");
//! ```

mod data;

use serde::Serialize;

/// A record that can be listed in a panel and opened as a detail view.
pub trait PanelEntry: Send + Sync + 'static {
    /// Stable identifier used as the panel selection.
    fn id(&self) -> &'static str;

    /// Primary heading shown in the list view.
    fn title(&self) -> &'static str;
}

/// One position in the work-experience timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Experience {
    pub id: &'static str,
    pub company: &'static str,
    pub role: &'static str,
    /// Human-readable range, e.g. `04/2023 - 08/2024`.
    pub period: &'static str,
    pub logo_initials: &'static str,
    pub tech_stack: &'static [&'static str],
    pub achievements: &'static [&'static str],
}

impl PanelEntry for Experience {
    fn id(&self) -> &'static str {
        self.id
    }

    fn title(&self) -> &'static str {
        self.role
    }
}

/// Degree level of an education record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DegreeKind {
    Master,
    Bachelor,
}

/// One entry in the education timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Education {
    pub id: &'static str,
    pub degree: &'static str,
    pub institution: &'static str,
    pub year: &'static str,
    pub details: &'static str,
    pub kind: DegreeKind,
    pub location: &'static str,
    pub badge: &'static str,
    pub courses: &'static [&'static str],
}

impl PanelEntry for Education {
    fn id(&self) -> &'static str {
        self.id
    }

    fn title(&self) -> &'static str {
        self.degree
    }
}

/// External link shown under the profile summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SocialLink {
    pub label: &'static str,
    pub href: &'static str,
    /// Suggested file name when the link is a download.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download: Option<&'static str>,
}

/// Profile summary card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub name: &'static str,
    pub headline: &'static str,
    pub bio: &'static str,
    pub avatar_url: &'static str,
    pub badges: &'static [&'static str],
    pub links: &'static [SocialLink],
}

/// A titled group of skills in the tech-stack card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TechCategory {
    pub title: &'static str,
    pub skills: &'static [&'static str],
}

/// Decorative "know me better" entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FunFact {
    pub text: &'static str,
    pub emoji: &'static str,
}

/// All work experience, most recent first.
#[must_use]
pub fn experiences() -> &'static [Experience] {
    data::EXPERIENCES
}

/// All education records, most recent first.
#[must_use]
pub fn education() -> &'static [Education] {
    data::EDUCATION
}

#[must_use]
pub fn profile() -> &'static Profile {
    &data::PROFILE
}

#[must_use]
pub fn tech_stack() -> &'static [TechCategory] {
    data::TECH_STACK
}

#[must_use]
pub fn fun_facts() -> &'static [FunFact] {
    data::FUN_FACTS
}

/// Look up an experience by id.
#[must_use]
pub fn find_experience(id: &str) -> Option<&'static Experience> {
    find(experiences(), id)
}

/// Look up an education record by id.
#[must_use]
pub fn find_education(id: &str) -> Option<&'static Education> {
    find(education(), id)
}

/// Find an entry in a catalog by id.
#[must_use]
pub fn find<E: PanelEntry>(catalog: &'static [E], id: &str) -> Option<&'static E> {
    catalog.iter().find(|entry| entry.id() == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_hivepro_detail() {
        let exp = find_experience("hivepro").unwrap();
        assert_eq!(exp.company, "Hive Pro");
        assert_eq!(exp.role, "Sr. Software Engineer");
        assert!(exp.tech_stack.contains(&"React"));
        assert!(exp.tech_stack.contains(&"Spring Boot"));
    }

    #[test]
    fn test_ids_are_unique() {
        let exp_ids: HashSet<_> = experiences().iter().map(PanelEntry::id).collect();
        assert_eq!(exp_ids.len(), experiences().len());

        let edu_ids: HashSet<_> = education().iter().map(PanelEntry::id).collect();
        assert_eq!(edu_ids.len(), education().len());
    }

    #[test]
    fn test_catalog_sizes() {
        assert_eq!(experiences().len(), 4);
        assert_eq!(education().len(), 2);
        assert_eq!(tech_stack().len(), 3);
        assert_eq!(fun_facts().len(), 4);
    }


    #[test]
    fn test_unknown_id() {
        assert!(find_experience("nope").is_none());
        assert!(find_education("").is_none());
    }

    #[test]
    fn test_degree_kind_serializes_lowercase() {
        let json = serde_json::to_string(find_education("masters").unwrap()).unwrap();
        assert!(json.contains(r#""kind":"master""#));
    }
}
