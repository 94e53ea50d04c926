//! Statement classification, query rewrites and emulated placeholders

use std::borrow::Cow;
use std::fs;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value as JsonValue;

use crate::error::{Error, ErrorKind, Result};

static MANIP: LazyLock<Regex> = LazyLock::new(|| {
   Regex::new(
      r#"(?i)^\s*"?(INSERT|UPDATE|DELETE|REPLACE|CREATE|DROP|LOAD DATA|SELECT .* INTO .* FROM|COPY|ALTER|GRANT|REVOKE|LOCK|UNLOCK)\s+"#,
   )
   .expect("failed to compile manipulation regex")
});

static BARE_DELETE: LazyLock<Regex> = LazyLock::new(|| {
   Regex::new(r"(?i)^\s*DELETE\s+FROM\s+(\S+)\s*$")
      .expect("failed to compile delete regex")
});

/// Whether `sql` changes data or schema rather than returning rows.
///
/// Only the leading keyword counts; `SELECT ... INTO ... FROM` is the one
/// SELECT form treated as a manipulation.
pub fn is_manip(sql: &str) -> bool {
   MANIP.is_match(sql)
}

/// Turn a bare `DELETE FROM t` into `DELETE FROM t WHERE 1=1` so the backend
/// reports the number of deleted rows.
pub fn rewrite_delete_count(sql: &str) -> Cow<'_, str> {
   BARE_DELETE.replace(sql, "DELETE FROM $1 WHERE 1=1")
}

/// One piece of a placeholder template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
   /// Literal SQL, with escaped placeholder characters already unescaped
   Text(String),
   /// `?`: the parameter is quoted as a literal
   Quoted,
   /// `!`: the parameter is inserted verbatim
   Raw,
   /// `&`: the parameter names a file whose contents are quoted as a literal
   File,
}

impl Token {
   fn is_placeholder(&self) -> bool {
      !matches!(self, Token::Text(_))
   }
}

/// Split a template on unescaped `?`, `!` and `&`.
///
/// `\?`, `\!` and `\&` stand for the literal characters.
pub fn tokenize(template: &str) -> Vec<Token> {
   let mut tokens = Vec::new();
   let mut text = String::new();
   let mut chars = template.chars().peekable();

   while let Some(ch) = chars.next() {
      match ch {
         '\\' if matches!(chars.peek(), Some('?' | '!' | '&')) => {
            if let Some(escaped) = chars.next() {
               text.push(escaped);
            }
         }
         '?' | '!' | '&' => {
            if !text.is_empty() {
               tokens.push(Token::Text(std::mem::take(&mut text)));
            }
            tokens.push(match ch {
               '?' => Token::Quoted,
               '!' => Token::Raw,
               _ => Token::File,
            });
         }
         other => text.push(other),
      }
   }

   if !text.is_empty() {
      tokens.push(Token::Text(text));
   }
   tokens
}

/// Number of placeholders in `template`.
pub fn placeholder_count(template: &str) -> usize {
   tokenize(template).iter().filter(|token| token.is_placeholder()).count()
}

/// Text a `!` placeholder expands to.
pub fn raw_text(value: &JsonValue) -> String {
   match value {
      JsonValue::Null => "NULL".to_string(),
      JsonValue::Bool(flag) => if *flag { "1" } else { "0" }.to_string(),
      JsonValue::String(text) => text.clone(),
      other => other.to_string(),
   }
}

/// Substitute `params` into `template`.
///
/// `quote` renders a `?` parameter as a SQL literal. A template whose
/// placeholder count differs from `params.len()` fails with
/// [`ErrorKind::Mismatch`] before anything is quoted.
pub fn bind<F>(template: &str, params: &[JsonValue], quote: F) -> Result<String>
where
   F: FnMut(&JsonValue) -> Result<String>,
{
   bind_tokens(&tokenize(template), params, quote)
}

/// [`bind`] over an already tokenized template.
///
/// An `&` parameter that names an unreadable file fails with
/// [`ErrorKind::AccessViolation`].
pub fn bind_tokens<F>(tokens: &[Token], params: &[JsonValue], mut quote: F) -> Result<String>
where
   F: FnMut(&JsonValue) -> Result<String>,
{
   let expected = tokens.iter().filter(|token| token.is_placeholder()).count();
   if expected != params.len() {
      return Err(Error::new(ErrorKind::Mismatch).with_userinfo(format!(
         "{expected} placeholders, {} parameters",
         params.len()
      )));
   }

   let mut params = params.iter();
   let mut sql = String::new();
   for token in tokens {
      if let Token::Text(text) = token {
         sql.push_str(text);
         continue;
      }

      let Some(value) = params.next() else {
         break;
      };
      match token {
         Token::Quoted => sql.push_str(&quote(value)?),
         Token::Raw => sql.push_str(&raw_text(value)),
         Token::File => {
            let path = raw_text(value);
            let contents = fs::read_to_string(&path).map_err(|e| {
               Error::new(ErrorKind::AccessViolation)
                  .with_userinfo(format!("could not read {path}: {e}"))
            })?;
            sql.push_str(&quote(&JsonValue::String(contents))?);
         }
         Token::Text(_) => {}
      }
   }

   Ok(sql)
}

#[cfg(test)]
mod tests {
   use super::*;
   use serde_json::json;

   #[test]
   fn test_is_manip() {
      assert!(is_manip("INSERT INTO foo SET bar = 1"));
      assert!(is_manip("  update foo set a = 1"));
      assert!(is_manip("\"DELETE FROM t"));
      assert!(is_manip("LOAD DATA INFILE 'x' INTO TABLE t"));
      assert!(is_manip("SELECT a INTO @x FROM t"));
      assert!(!is_manip("SELECT foo FROM bar"));
      assert!(!is_manip("SHOW TABLES"));
      assert!(!is_manip("INSERT"));
   }

   #[test]
   fn test_rewrite_delete_count() {
      assert_eq!(rewrite_delete_count("DELETE FROM t"), "DELETE FROM t WHERE 1=1");
      assert_eq!(
         rewrite_delete_count("  delete from users  "),
         "DELETE FROM users WHERE 1=1"
      );
      assert_eq!(
         rewrite_delete_count("DELETE FROM t WHERE id = 1"),
         "DELETE FROM t WHERE id = 1"
      );
   }

   #[test]
   fn test_tokenize_handles_escapes() {
      assert_eq!(
         tokenize("a = ? AND b = ! AND c = '\\?'"),
         vec![
            Token::Text("a = ".into()),
            Token::Quoted,
            Token::Text(" AND b = ".into()),
            Token::Raw,
            Token::Text(" AND c = '?'".into()),
         ]
      );
      assert_eq!(placeholder_count("\\!\\?"), 0);
      assert_eq!(placeholder_count("a \\& b = &"), 1);
   }

   #[test]
   fn test_bind_quotes_and_inlines() {
      let sql = bind(
         "SELECT * FROM ! WHERE name = ?",
         &[json!("users"), json!("o'neil")],
         |v| Ok(format!("'{}'", raw_text(v).replace('\'', "''"))),
      )
      .unwrap();

      assert_eq!(sql, "SELECT * FROM users WHERE name = 'o''neil'");
   }

   #[test]
   fn test_bind_reads_file_contents() {
      let dir = tempfile::tempdir().unwrap();
      let path = dir.path().join("blob.txt");
      fs::write(&path, "no\n").unwrap();

      let sql = bind(
         "UPDATE t SET good = ?, bad = &, ugly = !",
         &[json!("yes"), json!(path.to_str().unwrap()), json!("COUNT(dracula)")],
         |v| Ok(format!("'{}'", raw_text(v))),
      )
      .unwrap();
      assert_eq!(sql, "UPDATE t SET good = 'yes', bad = 'no\n', ugly = COUNT(dracula)");
   }

   #[test]
   fn test_bind_unreadable_file() {
      let dir = tempfile::tempdir().unwrap();
      let missing = dir.path().join("missing.txt");

      let err = bind("SELECT &", &[json!(missing.to_str().unwrap())], |v| Ok(raw_text(v)))
         .unwrap_err();
      assert_eq!(err.kind(), ErrorKind::AccessViolation);
   }

   #[test]
   fn test_bind_count_mismatch() {
      let err = bind("SELECT ?", &[json!(1), json!(2)], |v| Ok(raw_text(v))).unwrap_err();
      assert_eq!(err.kind(), ErrorKind::Mismatch);
   }
}
