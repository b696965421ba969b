//! Connection strings: `scheme://host[:port][/database][?key=value&...]`.

use crate::errors::DbError;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const SCHEMES: &[&str] = &["coursebook", "mongodb"];
pub const DEFAULT_DATABASE: &str = "test";
const MAX_DATABASE_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    Disk,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
    pub database: String,
    pub options: BTreeMap<String, String>,
}

impl ConnectionString {
    /// # Errors
    /// Returns `DbError::InvalidConnectionString` describing the first problem found.
    pub fn parse(uri: &str) -> Result<Self, DbError> {
        let bad = |why: &str| DbError::InvalidConnectionString(format!("{uri}: {why}"));
        let (scheme, rest) = uri.trim().split_once("://").ok_or_else(|| bad("missing scheme"))?;
        let scheme = scheme.to_ascii_lowercase();
        if !SCHEMES.contains(&scheme.as_str()) {
            return Err(bad(&format!("unsupported scheme '{scheme}'")));
        }
        let (rest, query) = match rest.split_once('?') {
            Some((r, q)) => (r, Some(q)),
            None => (rest, None),
        };
        let (authority, database) = match rest.split_once('/') {
            Some((a, d)) => (a, d),
            None => (rest, ""),
        };
        if authority.is_empty() {
            return Err(bad("missing host"));
        }
        let (host, port) = match authority.rsplit_once(':') {
            Some((h, p)) => {
                let port = p.parse::<u16>().map_err(|_| bad(&format!("invalid port '{p}'")))?;
                (h, Some(port))
            }
            None => (authority, None),
        };
        if host.is_empty() {
            return Err(bad("missing host"));
        }
        let database = if database.is_empty() { DEFAULT_DATABASE } else { database };
        validate_database_name(database).map_err(|why| bad(&why))?;

        let mut options = BTreeMap::new();
        for pair in query.unwrap_or("").split('&').filter(|p| !p.is_empty()) {
            let (k, v) = pair.split_once('=').ok_or_else(|| bad(&format!("malformed option '{pair}'")))?;
            options.insert(k.to_ascii_lowercase(), v.to_string());
        }

        Ok(Self { scheme, host: host.to_string(), port, database: database.to_string(), options })
    }

    /// # Errors
    /// Returns an error for a `storage` option other than `disk` or `memory`.
    pub fn storage_mode(&self) -> Result<StorageMode, DbError> {
        match self.options.get("storage").map(|s| s.to_ascii_lowercase()).as_deref() {
            None | Some("disk") => Ok(StorageMode::Disk),
            Some("memory") => Ok(StorageMode::Memory),
            Some(other) => {
                Err(DbError::InvalidConnectionString(format!("unknown storage mode '{other}'")))
            }
        }
    }
}

impl FromStr for ConnectionString {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host)?;
        if let Some(p) = self.port {
            write!(f, ":{p}")?;
        }
        write!(f, "/{}", self.database)?;
        for (i, (k, v)) in self.options.iter().enumerate() {
            write!(f, "{}{k}={v}", if i == 0 { '?' } else { '&' })?;
        }
        Ok(())
    }
}

fn validate_database_name(name: &str) -> Result<(), String> {
    if name.len() > MAX_DATABASE_LEN {
        return Err(format!("database name exceeds {MAX_DATABASE_LEN} characters"));
    }
    let ok = name.bytes().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_'));
    if !ok {
        return Err(format!("invalid database name '{name}'"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tutorial_literal() {
        let cs = ConnectionString::parse("mongodb://localhost/playground").unwrap();
        assert_eq!(cs.scheme, "mongodb");
        assert_eq!(cs.host, "localhost");
        assert_eq!(cs.port, None);
        assert_eq!(cs.database, "playground");
        assert_eq!(cs.storage_mode().unwrap(), StorageMode::Disk);
    }

    #[test]
    fn parses_port_and_options() {
        let cs = ConnectionString::parse("coursebook://db.local:27017/shop?storage=memory").unwrap();
        assert_eq!(cs.port, Some(27017));
        assert_eq!(cs.storage_mode().unwrap(), StorageMode::Memory);
        assert_eq!(cs.to_string(), "coursebook://db.local:27017/shop?storage=memory");
    }

    #[test]
    fn database_defaults_to_test() {
        let cs = ConnectionString::parse("mongodb://localhost").unwrap();
        assert_eq!(cs.database, DEFAULT_DATABASE);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(ConnectionString::parse("localhost/playground").is_err());
        assert!(ConnectionString::parse("http://localhost/playground").is_err());
        assert!(ConnectionString::parse("mongodb:///playground").is_err());
        assert!(ConnectionString::parse("mongodb://localhost:99999/x").is_err());
        assert!(ConnectionString::parse("mongodb://localhost/../etc").is_err());
    }
}
