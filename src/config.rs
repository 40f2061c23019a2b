// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use kdl::{KdlDocument, KdlValue};
use miette::{IntoDiagnostic, Result, bail, miette};
use std::time::Duration;
use tokio::fs::read_to_string;

pub async fn parse_config(config_path: &str) -> Result<ConfigData> {
	let config_file_contents = read_to_string(config_path).await.into_diagnostic()?;
	parse_config_contents(&config_file_contents)
}

pub fn parse_config_contents(config_file_contents: &str) -> Result<ConfigData> {
	let document: KdlDocument = config_file_contents.parse()?;

	let discord = section(&document, "discord")?;
	let discord = DiscordConfig {
		bot_token: required_string(discord, "discord", "bot_token")?,
	};

	let database = section(&document, "database")?;
	let port = match optional_integer(database, "database", "port")? {
		Some(port) => Some(u16::try_from(port).into_diagnostic()?),
		None => None,
	};
	let database = DatabaseConfig {
		host: required_string(database, "database", "host")?,
		port,
		username: required_string(database, "database", "username")?,
		password: required_string(database, "database", "password")?,
		database: required_string(database, "database", "database")?,
	};

	let spree = match document.get("spree").and_then(|node| node.children()) {
		Some(spree) => SpreeConfig {
			blocked_words_file: optional_string(spree, "spree", "blocked_words_file")?,
			invite_domain: optional_string(spree, "spree", "invite_domain")?
				.unwrap_or_else(|| String::from(DEFAULT_INVITE_DOMAIN)),
			ad_prompt_timeout: optional_seconds(spree, "ad_prompt_timeout_seconds")?
				.unwrap_or(DEFAULT_AD_PROMPT_TIMEOUT),
			requester_confirmation_timeout: optional_seconds(spree, "requester_confirmation_timeout_seconds")?
				.unwrap_or(DEFAULT_REQUESTER_CONFIRMATION_TIMEOUT),
			owner_confirmation_timeout: optional_seconds(spree, "owner_confirmation_timeout_seconds")?
				.unwrap_or(DEFAULT_OWNER_CONFIRMATION_TIMEOUT),
			command_cooldown: optional_seconds(spree, "command_cooldown_seconds")?.unwrap_or(DEFAULT_COMMAND_COOLDOWN),
		},
		None => SpreeConfig::default(),
	};

	Ok(ConfigData {
		discord,
		database,
		spree,
	})
}

fn section<'a>(document: &'a KdlDocument, name: &str) -> Result<&'a KdlDocument> {
	document
		.get(name)
		.and_then(|node| node.children())
		.ok_or_else(|| miette!("Missing required config section `{}`", name))
}

fn required_string(section: &KdlDocument, section_name: &str, name: &str) -> Result<String> {
	optional_string(section, section_name, name)?
		.ok_or_else(|| miette!("Missing required config value `{}.{}`", section_name, name))
}

fn optional_string(section: &KdlDocument, section_name: &str, name: &str) -> Result<Option<String>> {
	match section.get_arg(name) {
		Some(KdlValue::String(value)) => Ok(Some(value.clone())),
		Some(_) => bail!("Config value `{}.{}` must be a string", section_name, name),
		None => Ok(None),
	}
}

fn optional_integer(section: &KdlDocument, section_name: &str, name: &str) -> Result<Option<i128>> {
	match section.get_arg(name) {
		Some(KdlValue::Integer(value)) => Ok(Some(*value)),
		Some(_) => bail!("Config value `{}.{}` must be an integer", section_name, name),
		None => Ok(None),
	}
}

fn optional_seconds(section: &KdlDocument, name: &str) -> Result<Option<Duration>> {
	match optional_integer(section, "spree", name)? {
		Some(seconds) if seconds > 0 => Ok(Some(Duration::from_secs(u64::try_from(seconds).into_diagnostic()?))),
		Some(_) => bail!("Config value `spree.{}` must be a positive number of seconds", name),
		None => Ok(None),
	}
}

pub const DEFAULT_INVITE_DOMAIN: &str = crate::broadcast::moderation::DEFAULT_INVITE_DOMAIN;
pub const DEFAULT_AD_PROMPT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_REQUESTER_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_OWNER_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_COMMAND_COOLDOWN: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct ConfigData {
	pub discord: DiscordConfig,
	pub database: DatabaseConfig,
	pub spree: SpreeConfig,
}

#[derive(Clone, Debug)]
pub struct DiscordConfig {
	pub bot_token: String,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
	pub host: String,
	pub port: Option<u16>,
	pub username: String,
	pub password: String,
	pub database: String,
}

/// Settings for the setup and broadcast commands.
#[derive(Clone, Debug)]
pub struct SpreeConfig {
	/// Path to a JSON file of the form `{"blocked_words": [...]}`. Without it, no words are blocked.
	pub blocked_words_file: Option<String>,
	/// The only link host allowed in ads.
	pub invite_domain: String,
	/// How long the requester has to send their ad.
	pub ad_prompt_timeout: Duration,
	/// How long the requester has to confirm their ad.
	pub requester_confirmation_timeout: Duration,
	/// How long each server owner has to approve an ad.
	pub owner_confirmation_timeout: Duration,
	/// How long a user has to wait between uses of the same command.
	pub command_cooldown: Duration,
}

impl Default for SpreeConfig {
	fn default() -> Self {
		Self {
			blocked_words_file: None,
			invite_domain: String::from(DEFAULT_INVITE_DOMAIN),
			ad_prompt_timeout: DEFAULT_AD_PROMPT_TIMEOUT,
			requester_confirmation_timeout: DEFAULT_REQUESTER_CONFIRMATION_TIMEOUT,
			owner_confirmation_timeout: DEFAULT_OWNER_CONFIRMATION_TIMEOUT,
			command_cooldown: DEFAULT_COMMAND_COOLDOWN,
		}
	}
}
