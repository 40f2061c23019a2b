// © 2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::bracket::Bracket;
use super::error::{ConfigurationError, SpreeError};
use super::resolver::{ResolvedRoles, RoleCandidate, resolve_role_ranges};
use async_trait::async_trait;
use std::collections::BTreeMap;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, RoleMarker};

/// The role chosen for one bracket, along with the member count it had when it was chosen.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RoleRange {
	pub role_id: Id<RoleMarker>,
	pub member_count: u64,
}

/// A server's broadcast configuration: the category new ad channels go in and the role pinged for each bracket.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ServerSetup {
	pub guild_id: Id<GuildMarker>,
	pub category_id: Id<ChannelMarker>,
	pub role_ranges: BTreeMap<Bracket, RoleRange>,
}

impl ServerSetup {
	/// Finds the role to ping in this server for an ad coming from a server with `member_count` members.
	///
	/// The exact bracket is tried first. If this server has no role for it, the configured ranges are scanned for
	/// one that contains the count with an inclusive upper bound, so a count sitting on a boundary can still reach
	/// the role of the bracket just below it.
	pub fn role_for_member_count(&self, member_count: u64) -> Option<Id<RoleMarker>> {
		if let Some(range) = self.role_ranges.get(&Bracket::classify(member_count)) {
			return Some(range.role_id);
		}
		self.role_ranges
			.iter()
			.find(|(bracket, _)| bracket.contains_inclusive(member_count))
			.map(|(_, range)| range.role_id)
	}

	pub fn role_ids(&self) -> impl Iterator<Item = Id<RoleMarker>> + '_ {
		self.role_ranges.values().map(|range| range.role_id)
	}
}

/// Whether storing a setup created it or replaced an existing one.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SetupKind {
	New,
	Update,
}

impl SetupKind {
	pub fn label(&self) -> &'static str {
		match self {
			Self::New => "New",
			Self::Update => "Update",
		}
	}
}

/// Storage for server setups, keyed by guild.
#[async_trait]
pub trait SetupStore: Send + Sync {
	async fn find_one(&self, guild_id: Id<GuildMarker>) -> Result<Option<ServerSetup>, SpreeError>;

	async fn find_all(&self) -> Result<Vec<ServerSetup>, SpreeError>;

	/// Inserts the setup, replacing the category and every role range of any setup already stored for the guild.
	async fn upsert(&self, setup: &ServerSetup) -> Result<SetupKind, SpreeError>;
}

/// The result of configuring a server.
#[derive(Debug)]
pub struct ConfiguredSetup {
	pub kind: SetupKind,
	pub setup: ServerSetup,
	pub excluded: Vec<Id<RoleMarker>>,
}

/// Resolves the candidate roles into brackets and stores the server's setup, replacing any earlier one.
pub async fn configure_server(
	store: &dyn SetupStore,
	guild_id: Id<GuildMarker>,
	category_id: Id<ChannelMarker>,
	candidates: &[RoleCandidate],
) -> Result<ConfiguredSetup, SpreeError> {
	if candidates.is_empty() {
		return Err(ConfigurationError::NoValidRoles.into());
	}
	let ResolvedRoles { ranges, excluded } = resolve_role_ranges(candidates);
	let setup = ServerSetup {
		guild_id,
		category_id,
		role_ranges: ranges,
	};
	let kind = store.upsert(&setup).await?;
	tracing::info!(guild = %guild_id, kind = kind.label(), brackets = setup.role_ranges.len(), excluded = excluded.len(), "Stored server setup");
	Ok(ConfiguredSetup { kind, setup, excluded })
}
