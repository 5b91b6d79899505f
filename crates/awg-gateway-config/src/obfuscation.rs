// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! AmneziaWG obfuscation parameters.
//!
//! The set is fixed: junk packet count and size bounds (`Jc`, `Jmin`, `Jmax`),
//! message padding (`S1`..`S4`), message type headers (`H1`..`H4`) and the
//! special junk packets (`I1`..`I5`). Clients must carry exactly the values
//! the gateway uses or the handshake fails.

use std::fmt;

use crate::document::Section;
use crate::error::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObfuscationParam {
	Jc,
	Jmin,
	Jmax,
	S1,
	S2,
	S3,
	S4,
	H1,
	H2,
	H3,
	H4,
	I1,
	I2,
	I3,
	I4,
	I5,
}

impl ObfuscationParam {
	pub const COUNT: usize = 16;

	pub const ALL: [ObfuscationParam; Self::COUNT] = [
		ObfuscationParam::Jc,
		ObfuscationParam::Jmin,
		ObfuscationParam::Jmax,
		ObfuscationParam::S1,
		ObfuscationParam::S2,
		ObfuscationParam::S3,
		ObfuscationParam::S4,
		ObfuscationParam::H1,
		ObfuscationParam::H2,
		ObfuscationParam::H3,
		ObfuscationParam::H4,
		ObfuscationParam::I1,
		ObfuscationParam::I2,
		ObfuscationParam::I3,
		ObfuscationParam::I4,
		ObfuscationParam::I5,
	];

	pub fn name(self) -> &'static str {
		match self {
			ObfuscationParam::Jc => "Jc",
			ObfuscationParam::Jmin => "Jmin",
			ObfuscationParam::Jmax => "Jmax",
			ObfuscationParam::S1 => "S1",
			ObfuscationParam::S2 => "S2",
			ObfuscationParam::S3 => "S3",
			ObfuscationParam::S4 => "S4",
			ObfuscationParam::H1 => "H1",
			ObfuscationParam::H2 => "H2",
			ObfuscationParam::H3 => "H3",
			ObfuscationParam::H4 => "H4",
			ObfuscationParam::I1 => "I1",
			ObfuscationParam::I2 => "I2",
			ObfuscationParam::I3 => "I3",
			ObfuscationParam::I4 => "I4",
			ObfuscationParam::I5 => "I5",
		}
	}

	/// Value assumed when the gateway configuration omits the parameter.
	pub fn default_value(self) -> u32 {
		match self {
			ObfuscationParam::Jc => 4,
			ObfuscationParam::Jmin => 50,
			ObfuscationParam::Jmax => 1000,
			ObfuscationParam::H1 => 1,
			ObfuscationParam::H2 => 2,
			ObfuscationParam::H3 => 3,
			ObfuscationParam::H4 => 4,
			_ => 0,
		}
	}

	/// `I1`..`I5` hold special junk packet templates such as
	/// `<b 0xc700000001><r 16>`. They are carried verbatim and only written to
	/// client documents when the gateway sets them.
	pub fn is_special_junk(self) -> bool {
		matches!(
			self,
			ObfuscationParam::I1
				| ObfuscationParam::I2
				| ObfuscationParam::I3
				| ObfuscationParam::I4
				| ObfuscationParam::I5
		)
	}

	pub fn from_name(name: &str) -> Option<Self> {
		Self::ALL
			.into_iter()
			.find(|p| p.name().eq_ignore_ascii_case(name))
	}

	fn index(self) -> usize {
		self as usize
	}
}

impl fmt::Display for ObfuscationParam {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObfuscationValue {
	Number(u32),
	Template(String),
}

impl fmt::Display for ObfuscationValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ObfuscationValue::Number(n) => write!(f, "{n}"),
			ObfuscationValue::Template(t) => f.write_str(t),
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObfuscationParams {
	explicit: [Option<ObfuscationValue>; ObfuscationParam::COUNT],
}

impl ObfuscationParams {
	/// Numeric value of `param`, falling back to its default when unset.
	/// Special junk templates have no numeric value and yield the default.
	pub fn get(&self, param: ObfuscationParam) -> u32 {
		match &self.explicit[param.index()] {
			Some(ObfuscationValue::Number(n)) => *n,
			_ => param.default_value(),
		}
	}

	/// Verbatim template of a special junk parameter, if the gateway sets one.
	pub fn template(&self, param: ObfuscationParam) -> Option<&str> {
		match &self.explicit[param.index()] {
			Some(ObfuscationValue::Template(t)) => Some(t),
			_ => None,
		}
	}

	pub fn set(&mut self, param: ObfuscationParam, value: u32) {
		self.explicit[param.index()] = Some(ObfuscationValue::Number(value));
	}

	pub fn set_template(&mut self, param: ObfuscationParam, template: impl Into<String>) {
		self.explicit[param.index()] = Some(ObfuscationValue::Template(template.into()));
	}

	pub fn is_explicit(&self, param: ObfuscationParam) -> bool {
		self.explicit[param.index()].is_some()
	}

	/// Parameters written into a client document, in canonical order.
	pub fn rendered(&self) -> impl Iterator<Item = (ObfuscationParam, ObfuscationValue)> + '_ {
		ObfuscationParam::ALL.into_iter().filter_map(|p| {
			let value = match &self.explicit[p.index()] {
				Some(value) => value.clone(),
				None if p.is_special_junk() => return None,
				None => ObfuscationValue::Number(p.default_value()),
			};
			Some((p, value))
		})
	}

	pub(crate) fn from_section(section: &Section) -> Result<Self, ParseError> {
		let mut params = Self::default();
		for entry in &section.entries {
			let Some(param) = ObfuscationParam::from_name(&entry.key) else {
				continue;
			};
			if param.is_special_junk() {
				if !entry.value.is_empty() {
					params.set_template(param, entry.value.clone());
				}
				continue;
			}
			let value = entry
				.value
				.parse::<u32>()
				.map_err(|e| ParseError::InvalidValue {
					line: entry.line,
					field: param.name().to_string(),
					reason: format!("{:?} is not an unsigned integer ({e})", entry.value),
				})?;
			params.set(param, value);
		}
		Ok(params)
	}
}
