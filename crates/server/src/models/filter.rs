//! Storefront filter facets.

use serde::{Deserialize, Serialize};

use stride_core::{FilterId, FilterKind};

#[derive(Debug, Clone, Serialize)]
pub struct Filter {
    pub id: FilterId,
    pub name: String,
    pub kind: FilterKind,
    /// Option values in display order.
    pub options: Vec<String>,
    pub position: i32,
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilterInput {
    pub name: String,
    pub kind: FilterKind,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub position: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

const fn default_active() -> bool {
    true
}

impl FilterInput {
    /// Trim the name and options, dropping blank and repeated options.
    ///
    /// # Errors
    ///
    /// Returns a message when the name is blank.
    pub fn normalize(&mut self) -> Result<(), String> {
        self.name = self.name.trim().to_owned();
        if self.name.is_empty() {
            return Err("filter name is required".to_owned());
        }
        let mut options: Vec<String> = Vec::with_capacity(self.options.len());
        for option in &self.options {
            let option = option.trim();
            if !option.is_empty() && !options.iter().any(|o| o == option) {
                options.push(option.to_owned());
            }
        }
        self.options = options;
        Ok(())
    }
}

/// New display order: filter ids from first to last.
#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub ids: Vec<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_dedupes_options() {
        let mut input = FilterInput {
            name: " Size ".to_owned(),
            kind: FilterKind::Size,
            options: vec!["8".into(), " 9".into(), "8".into(), String::new()],
            position: 0,
            is_active: true,
        };
        assert!(input.normalize().is_ok());
        assert_eq!(input.name, "Size");
        assert_eq!(input.options, vec!["8", "9"]);
    }
}
