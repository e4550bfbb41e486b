use std::fs;
use std::path::Path;

use sp_types::{DataError, EvalError, QaPair, SpResult};

/// Load the held-out evaluation set: a JSON array of `{question, answer}`
/// objects.  Loaded once per run and treated as a fixed oracle.
pub fn load_eval_set<P: AsRef<Path>>(path: P) -> SpResult<Vec<QaPair>> {
    let path = path.as_ref();
    tracing::info!("Loading evaluation set from: {}", path.display());

    if !path.exists() {
        return Err(DataError::SourceNotFound(path.to_string_lossy().to_string()).into());
    }

    let raw = fs::read_to_string(path)?;
    let items: Vec<QaPair> = serde_json::from_str(&raw).map_err(|e| DataError::ParseError {
        message: format!("Invalid evaluation set {}: {}", path.display(), e),
    })?;

    // An empty set would divide by zero in the pass-ratio computation.
    if items.is_empty() {
        return Err(EvalError::EmptySet.into());
    }

    tracing::info!("Loaded {} evaluation items", items.len());
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn loads_valid_eval_set() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"question": "q1", "answer": "a1"}}, {{"question": "q2", "answer": "a2"}}]"#
        )
        .unwrap();
        file.flush().unwrap();

        let items = load_eval_set(file.path()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].question, "q1");
        assert_eq!(items[1].answer, "a2");
    }

    #[test]
    fn rejects_empty_eval_set() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[]").unwrap();
        file.flush().unwrap();

        let err = load_eval_set(file.path()).unwrap_err();
        assert!(matches!(err, sp_types::SpError::Eval(EvalError::EmptySet)));
    }

    #[test]
    fn rejects_missing_file() {
        let err = load_eval_set("/path/that/does/not/exist.json").unwrap_err();
        assert!(matches!(
            err,
            sp_types::SpError::Data(DataError::SourceNotFound(_))
        ));
    }

    #[test]
    fn rejects_malformed_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        file.flush().unwrap();

        let err = load_eval_set(file.path()).unwrap_err();
        assert!(matches!(
            err,
            sp_types::SpError::Data(DataError::ParseError { .. })
        ));
    }
}
