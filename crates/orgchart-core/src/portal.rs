//! Project portal catalog: the list/detail data behind the projects browser.
//!
//! Icons are chosen from an explicit [`ProjectCategory`] supplied by the data provider; the
//! display name is never inspected.

use crate::{Error, Result};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;

pub const DEFAULT_DEPARTMENT: &str = "General";
const VISIBLE_TAGS: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectCategory {
    PeopleOps,
    Finance,
    Portal,
    Mobile,
    #[default]
    #[serde(other)]
    General,
}

impl ProjectCategory {
    /// Font Awesome class list for the card icon.
    pub fn icon_class(self) -> &'static str {
        match self {
            Self::PeopleOps => "fa-solid fa-people-group",
            Self::Finance => "fa-solid fa-chart-pie",
            Self::Portal => "fa-solid fa-rocket",
            Self::Mobile => "fa-solid fa-mobile-screen",
            Self::General => "fa-regular fa-folder-open",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    Active,
    Maintenance,
    InDevelopment,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusPalette {
    pub background: &'static str,
    pub text: &'static str,
}

impl StatusTone {
    pub fn from_status(status: Option<&str>) -> Self {
        match status.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("active") => Self::Active,
            Some("maintenance") => Self::Maintenance,
            Some("in development") => Self::InDevelopment,
            _ => Self::Other,
        }
    }

    pub fn palette(self) -> StatusPalette {
        match self {
            Self::Active => StatusPalette {
                background: "#dcfce7",
                text: "#166534",
            },
            Self::Maintenance => StatusPalette {
                background: "#ffedd5",
                text: "#9a3412",
            },
            Self::InDevelopment => StatusPalette {
                background: "#e0f2fe",
                text: "#075985",
            },
            Self::Other => StatusPalette {
                background: "#f1f5f9",
                text: "#475569",
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceAction {
    Open,
    Copy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub icon: Option<String>,
}

impl Resource {
    /// Links and repositories open in a new tab; everything else is copied to the clipboard.
    pub fn action(&self) -> ResourceAction {
        match self.kind.as_str() {
            "link" | "git" => ResourceAction::Open,
            _ => ResourceAction::Copy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub tech_stack: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category: ProjectCategory,
    #[serde(default)]
    pub metadata: IndexMap<String, Value>,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

impl Project {
    pub fn department(&self) -> &str {
        self.metadata
            .get("department")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_DEPARTMENT)
    }

    pub fn status_label(&self) -> &str {
        self.status.as_deref().unwrap_or("Unknown")
    }

    pub fn status_tone(&self) -> StatusTone {
        StatusTone::from_status(self.status.as_deref())
    }

    pub fn tag_summary(&self) -> TagSummary<'_> {
        let shown = &self.tech_stack[..self.tech_stack.len().min(VISIBLE_TAGS)];
        TagSummary {
            shown,
            hidden: self.tech_stack.len() - shown.len(),
        }
    }

    /// Metadata rows for the detail view, with humanized keys.
    pub fn metadata_rows(&self) -> Vec<(String, String)> {
        self.metadata
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (format_metadata_key(k), value)
            })
            .collect()
    }

    fn matches_text(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(needle)
            || self
                .description
                .as_deref()
                .unwrap_or("")
                .to_lowercase()
                .contains(needle)
            || self.tags.iter().any(|t| t.to_lowercase().contains(needle))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagSummary<'a> {
    pub shown: &'a [String],
    pub hidden: usize,
}

impl TagSummary<'_> {
    /// `+N` badge text for the technologies that did not fit.
    pub fn overflow_label(&self) -> Option<String> {
        (self.hidden > 0).then(|| format!("+{}", self.hidden))
    }
}

/// `startDate` → `Start Date`.
pub fn format_metadata_key(key: &str) -> String {
    static UPPER: OnceLock<Regex> = OnceLock::new();
    let re = UPPER.get_or_init(|| Regex::new(r"([A-Z])").expect("valid regex"));
    let spaced = re.replace_all(key, " $1");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectFilter {
    pub department: Option<String>,
    pub technology: Option<String>,
    pub search: String,
}

impl ProjectFilter {
    pub fn matches(&self, project: &Project) -> bool {
        let dept_ok = self
            .department
            .as_deref()
            .is_none_or(|d| project.department() == d);
        let tech_ok = self
            .technology
            .as_deref()
            .is_none_or(|t| project.tech_stack.iter().any(|s| s == t));
        dept_ok && tech_ok && project.matches_text(&self.search.to_lowercase())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectCatalog {
    projects: Vec<Project>,
}

impl ProjectCatalog {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let projects: Vec<Project> =
            serde_json::from_str(text).map_err(|e| Error::load("projects", e))?;
        Ok(Self { projects })
    }

    pub fn from_projects(projects: Vec<Project>) -> Self {
        Self { projects }
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn find(&self, name: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.name == name)
    }

    /// Unique technologies across all projects, sorted, for the technology filter.
    pub fn tech_facets(&self) -> Vec<&str> {
        let mut techs: Vec<&str> = self
            .projects
            .iter()
            .flat_map(|p| p.tech_stack.iter().map(String::as_str))
            .collect();
        techs.sort_unstable();
        techs.dedup();
        techs
    }

    pub fn departments(&self) -> Vec<&str> {
        let mut depts: Vec<&str> = self.projects.iter().map(Project::department).collect();
        depts.sort_unstable();
        depts.dedup();
        depts
    }

    pub fn filter(&self, filter: &ProjectFilter) -> Vec<&Project> {
        self.projects.iter().filter(|p| filter.matches(p)).collect()
    }
}
