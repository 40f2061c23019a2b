// © 2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use miette::IntoDiagnostic;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use tokio::fs::read_to_string;

pub const DEFAULT_INVITE_DOMAIN: &str = "discord.gg";

/// The on-disk format of the blocked word list.
#[derive(Debug, Deserialize)]
pub struct BlockedWordList {
	pub blocked_words: Vec<String>,
}

pub async fn load_blocked_words(path: impl AsRef<Path>) -> miette::Result<Vec<String>> {
	let contents = read_to_string(path).await.into_diagnostic()?;
	let list: BlockedWordList = serde_json::from_str(&contents).into_diagnostic()?;
	Ok(list.blocked_words)
}

/// Why an ad was refused.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ModerationViolation {
	BlockedWord { matched_term: String },
	Mention,
	DisallowedLink { url: String },
}

impl ModerationViolation {
	pub fn reason(&self) -> &'static str {
		match self {
			Self::BlockedWord { .. } => "blocked word",
			Self::Mention => "mention",
			Self::DisallowedLink { .. } => "disallowed link",
		}
	}

	pub fn matched_term(&self) -> Option<&str> {
		match self {
			Self::BlockedWord { matched_term } => Some(matched_term),
			Self::Mention => None,
			Self::DisallowedLink { url } => Some(url),
		}
	}
}

impl fmt::Display for ModerationViolation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::BlockedWord { matched_term } => write!(f, "Your ad contains a blocked word: \"{}\".", matched_term),
			Self::Mention => write!(f, "Your ad contains pings."),
			Self::DisallowedLink { .. } => write!(f, "Your ad contains invalid links. Only server invite links are allowed."),
		}
	}
}

/// The flattened result of moderating a message.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ModerationVerdict {
	pub blocked: bool,
	pub reason: Option<&'static str>,
	pub matched_term: Option<String>,
}

/// Checks ad text against the blocked word list, then for mentions, then for links away from the invite domain.
#[derive(Debug)]
pub struct ContentModerator {
	blocked_words: Option<Regex>,
	mentions: Regex,
	links: Regex,
	invite_domain: String,
}

impl ContentModerator {
	pub fn new<S: AsRef<str>>(blocked_words: &[S], invite_domain: &str) -> Result<Self, regex::Error> {
		let word_patterns: Vec<String> = blocked_words
			.iter()
			.map(|word| word.as_ref().trim())
			.filter(|word| !word.is_empty())
			.map(spaced_word_pattern)
			.collect();
		let blocked_words = if word_patterns.is_empty() {
			None
		} else {
			Some(
				RegexBuilder::new(&word_patterns.join("|"))
					.case_insensitive(true)
					.build()?,
			)
		};

		let mentions = Regex::new(r"<@!?&?\d+>|@everyone|@here")?;
		let links = RegexBuilder::new(r"https?://([^/\s?#]+)\S*")
			.case_insensitive(true)
			.build()?;

		Ok(Self {
			blocked_words,
			mentions,
			links,
			invite_domain: invite_domain.to_lowercase(),
		})
	}

	/// Returns the first policy the text breaks, if any.
	pub fn moderate(&self, text: &str) -> Option<ModerationViolation> {
		if let Some(blocked_word_match) = self.blocked_words.as_ref().and_then(|regex| regex.find(text)) {
			return Some(ModerationViolation::BlockedWord {
				matched_term: blocked_word_match.as_str().to_string(),
			});
		}

		if self.mentions.is_match(text) {
			return Some(ModerationViolation::Mention);
		}

		for link in self.links.captures_iter(text) {
			let host = link.get(1).map(|host| host.as_str().to_lowercase()).unwrap_or_default();
			if host != self.invite_domain {
				return Some(ModerationViolation::DisallowedLink {
					url: link[0].to_string(),
				});
			}
		}

		None
	}

	pub fn verdict(&self, text: &str) -> ModerationVerdict {
		match self.moderate(text) {
			Some(violation) => ModerationVerdict {
				blocked: true,
				reason: Some(violation.reason()),
				matched_term: violation.matched_term().map(String::from),
			},
			None => ModerationVerdict::default(),
		}
	}
}

/// Builds a pattern matching the word as a whole word, even when any run of non-letters is placed between its letters.
fn spaced_word_pattern(word: &str) -> String {
	let letters: Vec<String> = word.chars().map(|c| regex::escape(&c.to_string())).collect();
	format!(r"\b{}\b", letters.join("[^a-zA-Z]*"))
}
