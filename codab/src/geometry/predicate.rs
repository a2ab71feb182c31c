//! Attribute predicates and column projections.

use crate::model::Attributes;

/// Attribute predicate used by country exclusion filters.
///
/// Renders to an OGR SQL `WHERE` clause for the external tool, and can be
/// evaluated directly against attributes. Both follow SQL comparison
/// semantics: a null value never satisfies the predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `column <> 'value'`
    NotEqual { column: String, value: String },
    /// `column not in ('a', 'b')`
    NotIn { column: String, values: Vec<String> },
}

impl Predicate {
    pub fn not_equal(column: impl Into<String>, value: impl Into<String>) -> Self {
        Predicate::NotEqual {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn not_in<I, S>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Predicate::NotIn {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn to_sql(&self) -> String {
        match self {
            Predicate::NotEqual { column, value } => {
                format!("{} <> {}", column, quote(value))
            }
            Predicate::NotIn { column, values } => {
                let list: Vec<String> = values.iter().map(|v| quote(v)).collect();
                format!("{} not in ({})", column, list.join(", "))
            }
        }
    }

    pub fn matches(&self, attributes: &Attributes) -> bool {
        match self {
            Predicate::NotEqual { column, value } => {
                matches!(attributes.get(column), Some(Some(v)) if v != value)
            }
            Predicate::NotIn { column, values } => {
                matches!(attributes.get(column), Some(Some(v)) if !values.contains(v))
            }
        }
    }
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// One output column of a projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectColumn {
    /// Copy a column under its own name.
    Column(String),
    /// Copy `from` under the name `to`.
    Alias { from: String, to: String },
    /// Emit a literal value under `alias`.
    Constant { value: String, alias: String },
}

impl SelectColumn {
    pub fn to_sql(&self) -> String {
        match self {
            SelectColumn::Column(name) => name.clone(),
            SelectColumn::Alias { from, to } => format!("{} AS {}", from, to),
            SelectColumn::Constant { value, alias } => format!("{} AS {}", value, alias),
        }
    }

    /// Name of the column in the output layer.
    pub fn output_name(&self) -> &str {
        match self {
            SelectColumn::Column(name) => name,
            SelectColumn::Alias { to, .. } => to,
            SelectColumn::Constant { alias, .. } => alias,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, Option<&str>)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
            .collect()
    }

    #[test]
    fn test_not_equal_sql() {
        let p = Predicate::not_equal("adm1_pcode", "Conflict");
        assert_eq!(p.to_sql(), "adm1_pcode <> 'Conflict'");
    }

    #[test]
    fn test_not_in_sql() {
        let p = Predicate::not_in("adm1_pcode", ["PK1", "PK3"]);
        assert_eq!(p.to_sql(), "adm1_pcode not in ('PK1', 'PK3')");
    }

    #[test]
    fn test_quotes_are_escaped() {
        let p = Predicate::not_equal("adm1_name", "Cote d'Ivoire");
        assert_eq!(p.to_sql(), "adm1_name <> 'Cote d''Ivoire'");
    }

    #[test]
    fn test_matches_follow_sql_null_semantics() {
        let p = Predicate::not_equal("adm1_pcode", "SD19");
        assert!(p.matches(&attrs(&[("adm1_pcode", Some("SD01"))])));
        assert!(!p.matches(&attrs(&[("adm1_pcode", Some("SD19"))])));
        assert!(!p.matches(&attrs(&[("adm1_pcode", None)])));
        assert!(!p.matches(&attrs(&[])));
    }

    #[test]
    fn test_not_in_matches() {
        let p = Predicate::not_in("adm1_pcode", ["PK1", "PK3"]);
        assert!(p.matches(&attrs(&[("adm1_pcode", Some("PK2"))])));
        assert!(!p.matches(&attrs(&[("adm1_pcode", Some("PK3"))])));
    }

    #[test]
    fn test_select_column_sql() {
        assert_eq!(SelectColumn::Column("iso3".into()).to_sql(), "iso3");
        let alias = SelectColumn::Alias {
            from: "adm1_name".into(),
            to: "adm2_name".into(),
        };
        assert_eq!(alias.to_sql(), "adm1_name AS adm2_name");
        assert_eq!(alias.output_name(), "adm2_name");
        let constant = SelectColumn::Constant {
            value: "1".into(),
            alias: "adm_origin".into(),
        };
        assert_eq!(constant.to_sql(), "1 AS adm_origin");
    }
}
