// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Dotenv parsing for secret sources.
//!
//! Syntax is whatever `dotenvy` accepts (`export` prefixes, quoting, `#`
//! comments). Keys are lower-cased; `.` separates config path segments and
//! `_` is an ordinary character.
//!
//! Values are literal. `$NAME` and `${NAME}` are never expanded, neither from
//! earlier keys nor from the process environment.

use satchel_common_secret::{ResolvedSecrets, SecretString};
use zeroize::Zeroizing;

use crate::error::{SecretsError, SecretsResult};

/// Lower-case and trim a key. Used for dotenv keys and inline map keys alike.
pub fn normalize_key(key: &str) -> String {
	key.trim().to_lowercase()
}

/// Whether a value counts as filled in. Unfilled stubs start with `#`.
pub fn is_value_set(value: &str) -> bool {
	let trimmed = value.trim();
	!trimmed.is_empty() && !trimmed.starts_with('#')
}

/// Values that resolution drops instead of applying.
pub(crate) fn is_skipped(value: &str) -> bool {
	value.is_empty() || value.starts_with('#')
}

/// Parse every entry in `text`, keeping skipped ones.
///
/// Errors name `location` and the entry number only, never line content.
pub fn parse_entries(text: &str, location: &str) -> SecretsResult<Vec<(String, SecretString)>> {
	let mut entries = Vec::new();
	let literal = escape_substitutions(text);

	for item in dotenvy::from_read_iter(literal.as_bytes()) {
		let (key, value) = item.map_err(|e| SecretsError::InvalidDotenv {
			location: location.to_string(),
			reason: describe_error(&e, entries.len() + 1),
		})?;
		entries.push((normalize_key(&key), SecretString::new(value)));
	}

	Ok(entries)
}

/// Parse `text` into resolved secrets, dropping empty and stub values.
pub fn parse_secrets(text: &str, location: &str) -> SecretsResult<ResolvedSecrets> {
	Ok(parse_entries(text, location)?
		.into_iter()
		.filter(|(_, value)| !is_skipped(value.expose()))
		.collect())
}

fn describe_error(error: &dotenvy::Error, entry: usize) -> String {
	match error {
		dotenvy::Error::LineParse(_, _) => format!("malformed entry #{entry}"),
		dotenvy::Error::Io(e) => format!("read failed: {}", e.kind()),
		_ => format!("unparseable entry #{entry}"),
	}
}

/// Where the scanner is relative to dotenvy's quoting rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lex {
	LineStart,
	Bare,
	BareSpace,
	Single,
	Double,
	Comment,
}

/// Backslash-escape every `$` that dotenvy would treat as a substitution.
///
/// Single-quoted text is already literal and is copied as is. Existing
/// escapes are kept. Quotes inside comments do not open a quoted value.
fn escape_substitutions(text: &str) -> Zeroizing<String> {
	let mut out = Zeroizing::new(String::with_capacity(text.len()));
	let mut state = Lex::LineStart;
	let mut chars = text.chars();

	while let Some(c) = chars.next() {
		if c == '$' && state != Lex::Single {
			out.push_str("\\$");
			if matches!(state, Lex::LineStart | Lex::BareSpace) {
				state = Lex::Bare;
			}
			continue;
		}

		out.push(c);
		state = match (state, c) {
			(Lex::Single, '\'') => Lex::Bare,
			(Lex::Single, _) => Lex::Single,
			(Lex::Comment, '\n') => Lex::LineStart,
			(Lex::Comment, _) => Lex::Comment,
			(Lex::Double, '"') => Lex::Bare,
			(Lex::Double, '\\') => {
				out.extend(chars.next());
				Lex::Double
			}
			(Lex::Double, _) => Lex::Double,
			(_, '\n') => Lex::LineStart,
			(Lex::LineStart | Lex::BareSpace, '#') => Lex::Comment,
			(Lex::LineStart, c) if c.is_whitespace() => Lex::LineStart,
			(_, c) if c.is_whitespace() => Lex::BareSpace,
			(_, '\'') => Lex::Single,
			(_, '"') => Lex::Double,
			(_, '\\') => match chars.next() {
				Some('\n') => {
					out.push('\n');
					Lex::LineStart
				}
				Some(next) => {
					out.push(next);
					Lex::Bare
				}
				None => Lex::Bare,
			},
			_ => Lex::Bare,
		};
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	mod keys {
		use super::*;

		#[test]
		fn keys_are_lower_cased_and_keep_underscores() {
			let secrets = parse_secrets("API_KEY=abc\nCredentials.Password=pw\n", "test").unwrap();
			let keys: Vec<&str> = secrets.keys().collect();
			assert_eq!(keys, vec!["api_key", "credentials.password"]);
		}

		#[test]
		fn export_prefix_and_quotes() {
			let text = "export token='single'\nother=\"double quoted\"\n";
			let secrets = parse_secrets(text, "test").unwrap();
			assert_eq!(secrets.get("token").unwrap().expose(), "single");
			assert_eq!(secrets.get("other").unwrap().expose(), "double quoted");
		}

		#[test]
		fn comments_and_blank_lines_are_ignored() {
			let text = "# header\n\nfoo=bar\n   \n# trailing\n";
			let secrets = parse_secrets(text, "test").unwrap();
			assert_eq!(secrets.len(), 1);
		}

		#[test]
		fn later_duplicate_wins() {
			let secrets = parse_secrets("foo=one\nFOO=two\n", "test").unwrap();
			assert_eq!(secrets.get("foo").unwrap().expose(), "two");
		}
	}

	mod values {
		use super::*;

		/// Empty values and unfilled stubs never reach hydration.
		#[test]
		fn empty_and_stub_values_are_skipped() {
			let text = "empty=\nstub=\"# TODO: Set actual value for stub\"\nreal=value\n";
			let secrets = parse_secrets(text, "test").unwrap();
			let keys: Vec<&str> = secrets.keys().collect();
			assert_eq!(keys, vec!["real"]);
		}

		#[test]
		fn parse_entries_keeps_skipped_values() {
			let entries = parse_entries("empty=\nreal=value\n", "test").unwrap();
			assert_eq!(entries.len(), 2);
		}

		#[test]
		fn dollar_signs_are_literal() {
			let text = "password=pa$word\nquoted=\"x$y\"\nhome=${HOME}\nsingle='a$b'\n";
			let secrets = parse_secrets(text, "test").unwrap();
			assert_eq!(secrets.get("password").unwrap().expose(), "pa$word");
			assert_eq!(secrets.get("quoted").unwrap().expose(), "x$y");
			assert_eq!(secrets.get("home").unwrap().expose(), "${HOME}");
			assert_eq!(secrets.get("single").unwrap().expose(), "a$b");
		}

		/// Neither earlier keys nor the server's own environment leak into values.
		#[test]
		fn no_substitution_from_file_or_environment() {
			std::env::set_var("SATCHEL_DOTENV_LITERAL_CHECK", "server-side");
			let text = "first=one\nref=$first\nbraced=\"${SATCHEL_DOTENV_LITERAL_CHECK}\"\nbare=$SATCHEL_DOTENV_LITERAL_CHECK\n";
			let secrets = parse_secrets(text, "test").unwrap();
			assert_eq!(secrets.get("ref").unwrap().expose(), "$first");
			assert_eq!(
				secrets.get("braced").unwrap().expose(),
				"${SATCHEL_DOTENV_LITERAL_CHECK}"
			);
			assert_eq!(
				secrets.get("bare").unwrap().expose(),
				"$SATCHEL_DOTENV_LITERAL_CHECK"
			);
		}

		/// An apostrophe in a comment does not swallow the following lines.
		#[test]
		fn quotes_in_comments_are_ignored() {
			let text = "# don't expand\ntoken=t$k # it's literal\nmulti=\"line $one\nline $two\"\n";
			let secrets = parse_secrets(text, "test").unwrap();
			assert_eq!(secrets.get("token").unwrap().expose(), "t$k");
			assert_eq!(secrets.get("multi").unwrap().expose(), "line $one\nline $two");
		}

		#[test]
		fn is_value_set_rules() {
			assert!(is_value_set("x"));
			assert!(!is_value_set(""));
			assert!(!is_value_set("   "));
			assert!(!is_value_set("# TODO"));
			assert!(!is_value_set("  #later"));
		}
	}

	mod errors {
		use super::*;

		/// The error names the source but never echoes what was on the line.
		#[test]
		fn parse_error_hides_line_content() {
			let err = parse_secrets("good=1\nthis line is not valid s3cr3t-content\n", "/etc/x.env")
				.unwrap_err();
			match &err {
				SecretsError::InvalidDotenv { location, reason } => {
					assert_eq!(location, "/etc/x.env");
					assert!(reason.contains("#2"), "reason was {reason}");
				}
				other => panic!("expected InvalidDotenv, got {other:?}"),
			}
			assert!(!err.to_string().contains("s3cr3t"));
		}
	}
}
