//! Small input helpers shared by the binary and the tests.

use std::fs;
use std::path::Path;

use crate::solver::Error;

/// Reads a whitespace-separated integer token file.
pub fn read_tokens(path: &Path) -> Result<Vec<i32>, Error> {
    let text = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })?;
    text.split_whitespace()
        .map(|token| {
            token.parse().map_err(|_| Error::Parse {
                path: path.display().to_string(),
                token: token.to_owned(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn parses_whitespace_separated_tokens() {
        let path = write_temp("pardiff_tokens_ok.txt", "1 2\n3\t-4  5\n");
        assert_eq!(read_tokens(&path).unwrap(), vec![1, 2, 3, -4, 5]);
    }

    #[test]
    fn empty_file_yields_empty_sequence() {
        let path = write_temp("pardiff_tokens_empty.txt", "");
        assert_eq!(read_tokens(&path).unwrap(), Vec::<i32>::new());
    }

    #[test]
    fn invalid_token_is_reported() {
        let path = write_temp("pardiff_tokens_bad.txt", "1 two 3");
        assert!(matches!(
            read_tokens(&path),
            Err(Error::Parse { token, .. }) if token == "two"
        ));
    }

    #[test]
    fn missing_file_is_reported() {
        let path = Path::new("/nonexistent/pardiff/input.txt");
        assert!(matches!(read_tokens(path), Err(Error::Io { .. })));
    }
}
