//! Column filters consulted by the duplicates check.

use std::collections::HashSet;

/// Column name fragments that identify values expected to be unique.
pub const DEFAULT_UNIQUE_PATTERNS: &[&str] = &[
    "cpf",
    "cnpj",
    "codigo",
    "sku",
    "login",
    "username",
    "matricula",
    "ean",
    "isbn",
    "serial",
];

/// Column name fragments that identify values expected to repeat: foreign
/// keys, UUIDs and categorical or descriptive fields.
pub const DEFAULT_DUPLICATE_PATTERNS: &[&str] = &[
    "_id",
    "id_",
    "uuid",
    "status",
    "tipo",
    "type",
    "categoria",
    "category",
    "nome",
    "name",
    "cor",
    "color",
    "descricao",
    "description",
    "cidade",
    "city",
    "estado",
    "state",
    "sexo",
    "gender",
];

/// Decides which columns the single-column duplicates check ignores.
pub trait ColumnSkipPolicy {
    /// Whether duplicate counting should skip this column entirely.
    fn should_skip(&self, column_name: &str) -> bool;
}

/// Checks every column.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverSkip;

impl ColumnSkipPolicy for NeverSkip {
    fn should_skip(&self, _column_name: &str) -> bool {
        false
    }
}

/// Skips columns by name.
///
/// Checked in order: explicit force-unique columns (never skipped), explicit
/// allow-duplicates columns (always skipped), unique patterns (never
/// skipped), duplicate-expected patterns (skipped). Anything else is checked.
/// Matching is case-insensitive; patterns match as substrings.
#[derive(Debug, Clone)]
pub struct NamePatternPolicy {
    unique_patterns: Vec<String>,
    duplicate_patterns: Vec<String>,
    force_unique: HashSet<String>,
    allow_duplicates: HashSet<String>,
}

impl NamePatternPolicy {
    /// Policy with the built-in pattern lists.
    pub fn new() -> Self {
        Self {
            unique_patterns: to_lower(DEFAULT_UNIQUE_PATTERNS),
            duplicate_patterns: to_lower(DEFAULT_DUPLICATE_PATTERNS),
            force_unique: HashSet::new(),
            allow_duplicates: HashSet::new(),
        }
    }

    /// Replace the unique pattern list. An empty list keeps the current one.
    pub fn with_unique_patterns<S: AsRef<str>>(mut self, patterns: &[S]) -> Self {
        if !patterns.is_empty() {
            self.unique_patterns = to_lower(patterns);
        }
        self
    }

    /// Replace the duplicate-expected pattern list. An empty list keeps the
    /// current one.
    pub fn with_duplicate_patterns<S: AsRef<str>>(mut self, patterns: &[S]) -> Self {
        if !patterns.is_empty() {
            self.duplicate_patterns = to_lower(patterns);
        }
        self
    }

    /// Columns that are always checked.
    pub fn force_unique<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.force_unique.extend(to_lower(columns));
        self
    }

    /// Columns that are never checked.
    pub fn allow_duplicates<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.allow_duplicates.extend(to_lower(columns));
        self
    }

    pub fn unique_patterns(&self) -> &[String] {
        &self.unique_patterns
    }

    pub fn duplicate_patterns(&self) -> &[String] {
        &self.duplicate_patterns
    }
}

impl Default for NamePatternPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl ColumnSkipPolicy for NamePatternPolicy {
    fn should_skip(&self, column_name: &str) -> bool {
        let name = column_name.to_lowercase();

        if self.force_unique.contains(&name) {
            return false;
        }
        if self.allow_duplicates.contains(&name) {
            return true;
        }
        if self.unique_patterns.iter().any(|p| name.contains(p.as_str())) {
            return false;
        }
        self.duplicate_patterns.iter().any(|p| name.contains(p.as_str()))
    }
}

fn to_lower<S: AsRef<str>>(items: &[S]) -> Vec<String> {
    items
        .iter()
        .map(|s| s.as_ref().trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_patterns() {
        let policy = NamePatternPolicy::new();

        assert!(!policy.should_skip("id"));
        assert!(!policy.should_skip("cpf"));
        assert!(!policy.should_skip("CNPJ_Empresa"));
        assert!(policy.should_skip("cliente_id"));
        assert!(policy.should_skip("user_uuid"));
        assert!(policy.should_skip("Status"));
        assert!(policy.should_skip("nome_cliente"));
        assert!(!policy.should_skip("amount"));
    }

    #[test]
    fn test_unique_patterns_beat_duplicate_patterns() {
        // "username" contains "name" but is expected to be unique
        assert!(!NamePatternPolicy::new().should_skip("username"));
    }

    #[test]
    fn test_explicit_columns_take_priority() {
        let policy = NamePatternPolicy::new()
            .force_unique(&["Status"])
            .allow_duplicates(&["cpf", "amount"]);

        assert!(!policy.should_skip("status"));
        assert!(policy.should_skip("CPF"));
        assert!(policy.should_skip("amount"));
    }

    #[test]
    fn test_override_replaces_builtin_lists() {
        let policy = NamePatternPolicy::new()
            .with_duplicate_patterns(&["region"])
            .with_unique_patterns(&["ticket"]);

        assert!(!policy.should_skip("status"));
        assert!(policy.should_skip("sales_region"));
        assert_eq!(policy.unique_patterns(), ["ticket".to_string()]);

        let unchanged = NamePatternPolicy::new().with_duplicate_patterns::<&str>(&[]);
        assert!(unchanged.should_skip("status"));
    }

    #[test]
    fn test_never_skip() {
        assert!(!NeverSkip.should_skip("cliente_id"));
    }
}
