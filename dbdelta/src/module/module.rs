use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

/// A named, independently versioned unit of schema change.
///
/// Exactly one module of a registry carries the default flag. Single-module
/// deployments use a lone module named [DEFAULT_MODULE_NAME](crate::common::DEFAULT_MODULE_NAME).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Module {
    name: String,
    is_default: bool,
}

impl Module {
    pub fn new(name: &str, is_default: bool) -> Self {
        Module {
            name: name.to_string(),
            is_default,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    /// Names must be non-empty, carry no surrounding whitespace and contain
    /// no path separators.
    pub(crate) fn has_valid_name(&self) -> bool {
        !self.name.is_empty()
            && self.name.trim() == self.name
            && !self.name.contains(['/', '\\'])
            && self.name != "."
            && self.name != ".."
    }
}

impl PartialOrd for Module {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Module {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then(self.is_default.cmp(&other.is_default))
    }
}

impl Display for Module {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_accessors() {
        let module = Module::new("Accounting", true);
        assert_eq!(module.name(), "Accounting");
        assert!(module.is_default());
        assert_eq!(module.to_string(), "Accounting");
    }

    #[test]
    fn test_module_ordering_by_name() {
        let mut modules = vec![
            Module::new("Payroll", false),
            Module::new("Accounting", true),
            Module::new("Inventory", false),
        ];
        modules.sort();
        let names: Vec<&str> = modules.iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["Accounting", "Inventory", "Payroll"]);
    }

    #[test]
    fn test_module_name_validation() {
        assert!(Module::new("Accounting", false).has_valid_name());
        assert!(!Module::new("", false).has_valid_name());
        assert!(!Module::new(" padded", false).has_valid_name());
        assert!(!Module::new("a/b", false).has_valid_name());
        assert!(!Module::new("..", false).has_valid_name());
    }
}
