//! Filtered, sorted container list

use crate::models::{Container, ContainerStatus};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    #[default]
    Name,
    Cpu,
    Memory,
    Uptime,
}

impl std::str::FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "name" => Ok(SortField::Name),
            "cpu" => Ok(SortField::Cpu),
            "memory" => Ok(SortField::Memory),
            "uptime" => Ok(SortField::Uptime),
            other => Err(format!("unknown sort field: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn reversed(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

impl std::str::FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(format!("unknown sort direction: {}", other)),
        }
    }
}

/// Search, filter and ordering for the container list.
/// `status: None` means all statuses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewQuery {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub status: Option<ContainerStatus>,
    #[serde(default)]
    pub sort: SortField,
    #[serde(default)]
    pub direction: SortDirection,
}

impl ViewQuery {
    fn matches(&self, container: &Container, needle: &str) -> bool {
        let text_match = needle.is_empty()
            || container.name.to_lowercase().contains(needle)
            || container.image.to_lowercase().contains(needle);
        let status_match = self.status.map_or(true, |s| s == container.status);
        text_match && status_match
    }

    fn compare(&self, a: &Container, b: &Container) -> Ordering {
        let ordering = match self.sort {
            SortField::Name => locale_compare(&a.name, &b.name),
            SortField::Cpu => a.cpu.total_cmp(&b.cpu),
            SortField::Memory => a.memory.total_cmp(&b.memory),
            SortField::Uptime => {
                parse_uptime_minutes(&a.uptime).cmp(&parse_uptime_minutes(&b.uptime))
            }
        };
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// Project the fleet through `query`. Stable: equal keys keep fleet order.
pub fn project(containers: &[Container], query: &ViewQuery) -> Vec<Container> {
    let needle = query.search.trim().to_lowercase();
    let mut rows: Vec<Container> = containers
        .iter()
        .filter(|c| query.matches(c, &needle))
        .cloned()
        .collect();
    rows.sort_by(|a, b| query.compare(a, b));
    rows
}

/// Human ordering for names: case-insensitive first, lowercase before
/// uppercase on otherwise equal strings.
pub fn locale_compare(a: &str, b: &str) -> Ordering {
    let folded = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));
    folded.then_with(|| b.cmp(a))
}

/// Minutes represented by an uptime display string.
///
/// Accepts `"N min|hour|day|week|month(s)"`, optionally prefixed with `Up `
/// (and `About `) as the container runtime reports it; `a`/`an` count as one.
/// `"Just now"` and anything unrecognized are 0.
pub fn parse_uptime_minutes(uptime: &str) -> u64 {
    let mut text = uptime.trim();
    if text.eq_ignore_ascii_case("just now") {
        return 0;
    }
    for prefix in ["Up ", "About "] {
        if let Some(rest) = text.strip_prefix(prefix) {
            text = rest.trim_start();
        }
    }

    let mut parts = text.split_whitespace();
    let (Some(amount), Some(unit)) = (parts.next(), parts.next()) else {
        return 0;
    };

    let amount = match amount.to_ascii_lowercase().as_str() {
        "a" | "an" => 1,
        digits => {
            let end = digits
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(digits.len());
            match digits[..end].parse::<u64>() {
                Ok(value) => value,
                Err(_) => return 0,
            }
        }
    };

    let unit = unit.to_ascii_lowercase();
    let per_unit = if unit.starts_with("min") {
        1
    } else if unit.starts_with("hour") {
        60
    } else if unit.starts_with("day") {
        60 * 24
    } else if unit.starts_with("week") {
        60 * 24 * 7
    } else if unit.starts_with("month") {
        60 * 24 * 30
    } else {
        return 0;
    };
    amount.saturating_mul(per_unit)
}
