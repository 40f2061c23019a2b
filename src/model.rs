// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::broadcast::bracket::Bracket;
use crate::broadcast::setup::{RoleRange, ServerSetup};
use crate::schema::{role_ranges, server_setups};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use twilight_model::id::Id;

/// The database representation of a server's broadcast setup.
#[derive(Insertable, Queryable)]
#[diesel(table_name = server_setups)]
pub struct DbServerSetup {
	/// The ID of the guild that was set up.
	pub guild_id: i64,
	/// The ID of the category in which ad channels are created.
	pub category_id: i64,
	/// When the setup was last stored.
	pub updated_at: DateTime<Utc>,
}

/// The database representation of the role chosen for one bracket of a server's setup
#[derive(Insertable, Queryable)]
#[diesel(table_name = role_ranges)]
pub struct DbRoleRange {
	pub guild_id: i64,
	pub bracket: Bracket,
	pub role_id: i64,
	/// The member count the role had when the setup was stored.
	pub member_count: i64,
}

impl DbServerSetup {
	pub fn from_setup(setup: &ServerSetup, updated_at: DateTime<Utc>) -> Self {
		Self {
			guild_id: database_id_from_discord_id(setup.guild_id.get()),
			category_id: database_id_from_discord_id(setup.category_id.get()),
			updated_at,
		}
	}

	/// Rebuilds the Discord-facing setup from this row and its role ranges.
	///
	/// Returns `None` if any stored ID isn't a valid Discord ID.
	pub fn into_setup(self, ranges: impl IntoIterator<Item = DbRoleRange>) -> Option<ServerSetup> {
		let guild_id = Id::new_checked(discord_id_from_database_id(self.guild_id))?;
		let category_id = Id::new_checked(discord_id_from_database_id(self.category_id))?;
		let mut role_ranges = std::collections::BTreeMap::new();
		for range in ranges {
			let role_id = Id::new_checked(discord_id_from_database_id(range.role_id))?;
			let member_count = u64::try_from(range.member_count).unwrap_or(0);
			role_ranges.insert(range.bracket, RoleRange { role_id, member_count });
		}
		Some(ServerSetup {
			guild_id,
			category_id,
			role_ranges,
		})
	}
}

impl DbRoleRange {
	pub fn from_setup(setup: &ServerSetup) -> Vec<Self> {
		let guild_id = database_id_from_discord_id(setup.guild_id.get());
		setup
			.role_ranges
			.iter()
			.map(|(bracket, range)| Self {
				guild_id,
				bracket: *bracket,
				role_id: database_id_from_discord_id(range.role_id.get()),
				member_count: i64::try_from(range.member_count).unwrap_or(i64::MAX),
			})
			.collect()
	}
}

/// Converts an ID used with Discord (unsigned) to an ID for Postgres use (signed)
pub fn database_id_from_discord_id(discord_id: u64) -> i64 {
	discord_id as i64
}

/// Converts an ID retrieved from the database (signed) to an ID for use with Discord (unsigned)
pub fn discord_id_from_database_id(database_id: i64) -> u64 {
	database_id as u64
}
