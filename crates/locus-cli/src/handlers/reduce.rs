//! Handler for `locus reduce`.

use crate::commands::ReduceArgs;
use crate::error::{CliError, CliResult};
use locus::{DomReducer, ReducerOptions};
use std::path::Path;

/// Reduce the markup in `path`
pub fn reduce_file(path: &Path, max_text: Option<usize>) -> CliResult<String> {
    let markup = std::fs::read_to_string(path)
        .map_err(|e| CliError::invalid_argument(format!("cannot read {}: {e}", path.display())))?;
    let options = ReducerOptions {
        max_text_len: max_text,
    };
    Ok(DomReducer::new(options).reduce(&markup))
}

/// Execute the reduce command
pub fn execute_reduce(args: &ReduceArgs) -> CliResult<()> {
    println!("{}", reduce_file(&args.file, args.max_text)?);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_reduce_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(
            &path,
            r#"<html><body><button id="go" onclick="x()">Go</button><script>1</script></body></html>"#,
        )
        .unwrap();
        assert_eq!(
            reduce_file(&path, None).unwrap(),
            r#"<body><button id="go">Go</button></body>"#
        );
    }

    #[test]
    fn test_reduce_file_truncates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(&path, "<p>abcdefghij</p>").unwrap();
        assert_eq!(reduce_file(&path, Some(3)).unwrap(), "<p>abc…</p>");
    }

    #[test]
    fn test_missing_file_is_an_argument_error() {
        let err = reduce_file(Path::new("/definitely/not/here.html"), None).unwrap_err();
        assert!(matches!(err, CliError::InvalidArgument { .. }));
    }
}
