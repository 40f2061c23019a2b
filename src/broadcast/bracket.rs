// © 2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use diesel_derive_enum::DbEnum;
use std::fmt;

/// A member-count tier. The seven brackets partition the non-negative integers; each one includes its lower bound
/// and excludes its upper bound, except the last, which has no upper bound.
#[derive(Clone, Copy, DbEnum, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[ExistingTypePath = "crate::schema::sql_types::RoleBracket"]
pub enum Bracket {
	#[db_rename = "0-100"]
	UpTo100,
	#[db_rename = "100-300"]
	UpTo300,
	#[db_rename = "300-500"]
	UpTo500,
	#[db_rename = "500-800"]
	UpTo800,
	#[db_rename = "800-1000"]
	UpTo1000,
	#[db_rename = "1000-1500"]
	UpTo1500,
	#[db_rename = "1500+"]
	Over1500,
}

impl Bracket {
	/// Every bracket, smallest first.
	pub const ALL: [Bracket; 7] = [
		Bracket::UpTo100,
		Bracket::UpTo300,
		Bracket::UpTo500,
		Bracket::UpTo800,
		Bracket::UpTo1000,
		Bracket::UpTo1500,
		Bracket::Over1500,
	];

	/// Gets the bracket containing the given member count.
	pub fn classify(member_count: u64) -> Self {
		match member_count {
			0..100 => Self::UpTo100,
			100..300 => Self::UpTo300,
			300..500 => Self::UpTo500,
			500..800 => Self::UpTo800,
			800..1000 => Self::UpTo1000,
			1000..1500 => Self::UpTo1500,
			_ => Self::Over1500,
		}
	}

	pub fn lower_bound(&self) -> u64 {
		match self {
			Self::UpTo100 => 0,
			Self::UpTo300 => 100,
			Self::UpTo500 => 300,
			Self::UpTo800 => 500,
			Self::UpTo1000 => 800,
			Self::UpTo1500 => 1000,
			Self::Over1500 => 1500,
		}
	}

	/// The exclusive upper bound, or `None` for the last bracket.
	pub fn upper_bound(&self) -> Option<u64> {
		match self {
			Self::UpTo100 => Some(100),
			Self::UpTo300 => Some(300),
			Self::UpTo500 => Some(500),
			Self::UpTo800 => Some(800),
			Self::UpTo1000 => Some(1000),
			Self::UpTo1500 => Some(1500),
			Self::Over1500 => None,
		}
	}

	pub fn contains(&self, member_count: u64) -> bool {
		member_count >= self.lower_bound() && self.upper_bound().is_none_or(|upper| member_count < upper)
	}

	/// Like [Self::contains], but a count sitting exactly on the upper bound also matches.
	///
	/// Used only as the fallback when looking up a role for a member count misses the exact bracket.
	pub fn contains_inclusive(&self, member_count: u64) -> bool {
		member_count >= self.lower_bound() && self.upper_bound().is_none_or(|upper| member_count <= upper)
	}

	/// The key used to show this bracket to users (for example, `100-300` or `1500+`).
	pub fn key(&self) -> &'static str {
		match self {
			Self::UpTo100 => "0-100",
			Self::UpTo300 => "100-300",
			Self::UpTo500 => "300-500",
			Self::UpTo800 => "500-800",
			Self::UpTo1000 => "800-1000",
			Self::UpTo1500 => "1000-1500",
			Self::Over1500 => "1500+",
		}
	}

	pub fn from_key(key: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|bracket| bracket.key() == key)
	}
}

impl fmt::Display for Bracket {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.key())
	}
}
