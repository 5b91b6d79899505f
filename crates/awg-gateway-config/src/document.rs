// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Section/entry tokenizer shared by the gateway and client document parsers.

use crate::error::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SectionKind {
	Interface,
	Peer,
}

impl SectionKind {
	pub(crate) fn name(self) -> &'static str {
		match self {
			SectionKind::Interface => "Interface",
			SectionKind::Peer => "Peer",
		}
	}
}

#[derive(Debug, Clone)]
pub(crate) struct Entry {
	pub key: String,
	pub value: String,
	pub line: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct Section {
	pub kind: SectionKind,
	pub line: usize,
	pub entries: Vec<Entry>,
	/// Full-line comments inside the section, `#` stripped and trimmed.
	pub comments: Vec<String>,
}

impl Section {
	/// Last occurrence of `key` (case-insensitive).
	pub(crate) fn last(&self, key: &str) -> Option<&Entry> {
		self
			.entries
			.iter()
			.rev()
			.find(|e| e.key.eq_ignore_ascii_case(key))
	}

	/// Every occurrence of `key`, for keys that may repeat such as `AllowedIPs`.
	pub(crate) fn all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Entry> + 'a {
		self
			.entries
			.iter()
			.filter(move |e| e.key.eq_ignore_ascii_case(key))
	}

	pub(crate) fn require(&self, field: &'static str) -> Result<&Entry, ParseError> {
		self.last(field).ok_or(ParseError::MissingField {
			line: self.line,
			section: self.kind.name(),
			field,
		})
	}
}

pub(crate) fn parse_sections(text: &str) -> Result<Vec<Section>, ParseError> {
	let mut sections: Vec<Section> = Vec::new();

	for (idx, raw) in text.lines().enumerate() {
		let line = idx + 1;
		let trimmed = raw.trim();

		if trimmed.is_empty() {
			continue;
		}

		if let Some(comment) = trimmed.strip_prefix('#') {
			if let Some(section) = sections.last_mut() {
				section.comments.push(comment.trim().to_string());
			}
			continue;
		}

		let content = strip_inline_comment(trimmed);

		if let Some(header) = content.strip_prefix('[') {
			let name = header
				.strip_suffix(']')
				.ok_or(ParseError::Syntax { line })?
				.trim();
			let kind = if name.eq_ignore_ascii_case("interface") {
				SectionKind::Interface
			} else if name.eq_ignore_ascii_case("peer") {
				SectionKind::Peer
			} else {
				return Err(ParseError::UnknownSection {
					line,
					name: name.to_string(),
				});
			};
			sections.push(Section {
				kind,
				line,
				entries: Vec::new(),
				comments: Vec::new(),
			});
			continue;
		}

		let (key, value) = content.split_once('=').ok_or(ParseError::Syntax { line })?;
		let key = key.trim();
		if key.is_empty() {
			return Err(ParseError::Syntax { line });
		}

		let section = sections
			.last_mut()
			.ok_or_else(|| ParseError::EntryOutsideSection {
				line,
				key: key.to_string(),
			})?;
		section.entries.push(Entry {
			key: key.to_string(),
			value: value.trim().to_string(),
			line,
		});
	}

	Ok(sections)
}

fn strip_inline_comment(line: &str) -> &str {
	match line.find('#') {
		Some(pos) => line[..pos].trim_end(),
		None => line,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn splits_sections_and_entries() {
		let text = "[Interface]\nAddress = 10.0.0.1/24\n\n[Peer]\n# Client: bob\nPublicKey = abc=\nAllowedIPs = 10.0.0.2/32 # inline\n";
		let sections = parse_sections(text).unwrap();

		assert_eq!(sections.len(), 2);
		assert_eq!(sections[0].kind, SectionKind::Interface);
		assert_eq!(sections[0].last("address").unwrap().value, "10.0.0.1/24");
		assert_eq!(sections[1].comments, vec!["Client: bob".to_string()]);
		assert_eq!(sections[1].last("PublicKey").unwrap().value, "abc=");
		assert_eq!(sections[1].last("AllowedIPs").unwrap().value, "10.0.0.2/32");
		assert_eq!(sections[1].last("AllowedIPs").unwrap().line, 7);
	}

	#[test]
	fn value_keeps_base64_padding() {
		let sections = parse_sections("[Peer]\nPublicKey = ab==\n").unwrap();
		assert_eq!(sections[0].last("publickey").unwrap().value, "ab==");
	}

	#[test]
	fn entry_before_section_is_rejected() {
		let err = parse_sections("Address = 10.0.0.1/24\n").unwrap_err();
		assert_eq!(
			err,
			ParseError::EntryOutsideSection {
				line: 1,
				key: "Address".to_string()
			}
		);
	}

	#[test]
	fn unknown_section_is_rejected() {
		let err = parse_sections("[Interface]\n[Extra]\n").unwrap_err();
		assert!(matches!(err, ParseError::UnknownSection { line: 2, .. }));
	}

	#[test]
	fn line_without_equals_is_rejected() {
		let err = parse_sections("[Interface]\nnonsense\n").unwrap_err();
		assert_eq!(err, ParseError::Syntax { line: 2 });
	}

	#[test]
	fn repeated_keys_are_all_kept() {
		let sections =
			parse_sections("[Peer]\nAllowedIPs = 10.0.0.2/32\nAllowedIPs = 10.1.0.0/16\n").unwrap();
		let values: Vec<_> = sections[0]
			.all("AllowedIPs")
			.map(|e| e.value.as_str())
			.collect();
		assert_eq!(values, vec!["10.0.0.2/32", "10.1.0.0/16"]);
	}
}
