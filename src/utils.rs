use std::error::Error;
use std::fmt;

/// Displays an error followed by its chain of sources.
pub struct ErrorWithCauses<E>(pub E);

impl<E> fmt::Display for ErrorWithCauses<E>
where
    E: Error,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)?;
        let mut cur: &dyn Error = &self.0;
        while let Some(next) = cur.source() {
            cur = next;
            write!(f, ": {}", cur)?;
        }
        Ok(())
    }
}

/// Reads a JSON argument given inline or as `@path`.
pub fn read_json_arg(arg: &str) -> Result<serde_json::Value, crate::CliError> {
    let contents = match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)?,
        None => arg.to_string(),
    };
    Ok(serde_json::from_str(&contents)?)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_error_with_causes() {
        let inner = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err = crate::CliError::Io(inner);
        assert_eq!(ErrorWithCauses(err).to_string(), "i/o error: disk full");
    }

    #[test]
    fn test_read_json_arg() {
        assert_eq!(read_json_arg(r#"{"gpa": 3.8}"#).expect("inline json"), json!({"gpa": 3.8}));

        let path = std::env::temp_dir().join(format!("docwal-arg-{}.json", std::process::id()));
        std::fs::write(&path, "[1, 2]").expect("failed to write file");
        let arg = format!("@{}", path.display());
        assert_eq!(read_json_arg(&arg).expect("json file"), json!([1, 2]));
        std::fs::remove_file(&path).expect("failed to remove file");

        assert!(read_json_arg("{broken").is_err());
        assert!(read_json_arg("@/nonexistent/docwal.json").is_err());
    }
}
