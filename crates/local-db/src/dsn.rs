use std::path::PathBuf;

/// Where the plan table lives, parsed from the `--dsn` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbTarget {
    Memory,
    File(PathBuf),
}

/// Accepts `sqlite://<path>`, `sqlite:<path>`, `:memory:` or a bare path.
/// Other URL schemes are rejected.
pub fn parse_dsn(dsn: &str) -> Result<DbTarget, String> {
    let dsn = dsn.trim();
    if dsn.is_empty() {
        return Err("connection string is empty".to_string());
    }

    let rest = dsn
        .strip_prefix("sqlite://")
        .or_else(|| dsn.strip_prefix("sqlite:"))
        .unwrap_or(dsn);

    if rest == dsn {
        if let Some((scheme, _)) = dsn.split_once("://") {
            return Err(format!("unsupported scheme `{scheme}` (expected sqlite)"));
        }
    }

    match rest {
        "" => Err(format!("no database path in `{dsn}`")),
        ":memory:" => Ok(DbTarget::Memory),
        path => Ok(DbTarget::File(PathBuf::from(path))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dsn_forms() {
        assert_eq!(
            parse_dsn("sqlite:///var/lib/plans.db").unwrap(),
            DbTarget::File(PathBuf::from("/var/lib/plans.db"))
        );
        assert_eq!(
            parse_dsn("sqlite:plans.db").unwrap(),
            DbTarget::File(PathBuf::from("plans.db"))
        );
        assert_eq!(
            parse_dsn("./out/plans.db").unwrap(),
            DbTarget::File(PathBuf::from("./out/plans.db"))
        );
        assert_eq!(parse_dsn(":memory:").unwrap(), DbTarget::Memory);
        assert_eq!(parse_dsn("sqlite::memory:").unwrap(), DbTarget::Memory);
    }

    #[test]
    fn test_parse_dsn_rejects() {
        assert!(parse_dsn("").is_err());
        assert!(parse_dsn("sqlite://").is_err());
        let err = parse_dsn("postgresql://user@host/db").unwrap_err();
        assert!(err.contains("postgresql"));
    }
}
