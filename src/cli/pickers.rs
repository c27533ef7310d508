use std::fmt;

use chrono::{DateTime, Utc};
use inquire::Select;

use crate::types::{Category, PageWithCategory};

pub struct CategoryDisplay {
    pub category: Category,
}

impl fmt::Display for CategoryDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.category.name, &self.category.id)
    }
}

pub struct PageDisplay {
    pub page: PageWithCategory,
}

impl fmt::Display for PageDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let visibility = if self.page.page.is_common {
            "[common]"
        } else {
            "[private]"
        };
        write!(f, "{} {} {}", self.page.page.title, visibility, self.page.page.url)
    }
}

pub fn pick_category(message: &str, categories: Vec<Category>) -> anyhow::Result<Option<Category>> {
    let displays: Vec<CategoryDisplay> = categories
        .into_iter()
        .map(|category| CategoryDisplay { category })
        .collect();

    if displays.is_empty() {
        return Ok(None);
    }

    let selected = Select::new(message, displays)
        .with_page_size(15)
        .with_vim_mode(true)
        .with_help_message("Type to filter, Enter to select, Esc for none")
        .prompt_skippable()?;

    Ok(selected.map(|s| s.category))
}

pub fn pick_page(message: &str, pages: Vec<PageWithCategory>) -> anyhow::Result<Option<PageWithCategory>> {
    let displays: Vec<PageDisplay> = pages.into_iter().map(|page| PageDisplay { page }).collect();

    if displays.is_empty() {
        return Ok(None);
    }

    let selected = Select::new(message, displays)
        .with_page_size(15)
        .with_vim_mode(true)
        .with_help_message("Type to filter, Enter to select")
        .prompt()?;

    Ok(Some(selected.page))
}

pub fn confirm_action(message: &str, yes: bool, non_interactive: bool) -> anyhow::Result<bool> {
    if yes {
        Ok(true)
    } else if non_interactive {
        anyhow::bail!("--yes is required for destructive operations in non-interactive mode");
    } else {
        Ok(inquire::Confirm::new(message)
            .with_default(false)
            .prompt()?)
    }
}

pub fn print_warnings(warnings: &[String]) {
    for warning in warnings {
        eprintln!("warning: {warning}");
    }
}

pub fn format_relative_time(dt: &DateTime<Utc>) -> String {
    let diff = Utc::now().signed_duration_since(*dt);

    if diff.num_seconds() < 0 {
        return "in the future".to_string();
    }
    if diff.num_seconds() < 60 {
        return "just now".to_string();
    }

    let (count, unit) = if diff.num_minutes() < 60 {
        (diff.num_minutes(), "minute")
    } else if diff.num_hours() < 24 {
        (diff.num_hours(), "hour")
    } else if diff.num_days() < 30 {
        (diff.num_days(), "day")
    } else if diff.num_days() < 365 {
        (diff.num_days() / 30, "month")
    } else {
        (diff.num_days() / 365, "year")
    };

    if count == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{count} {unit}s ago")
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn test_format_relative_time() {
        let now = Utc::now();
        assert_eq!(format_relative_time(&(now + Duration::hours(1))), "in the future");
        assert_eq!(format_relative_time(&now), "just now");
        assert_eq!(format_relative_time(&(now - Duration::minutes(1))), "1 minute ago");
        assert_eq!(format_relative_time(&(now - Duration::hours(5))), "5 hours ago");
        assert_eq!(format_relative_time(&(now - Duration::days(400))), "1 year ago");
    }
}
