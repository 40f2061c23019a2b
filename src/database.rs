// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::broadcast::error::SpreeError;
use crate::broadcast::setup::{ServerSetup, SetupKind, SetupStore};
use crate::config::DatabaseConfig;
use crate::model::{DbRoleRange, DbServerSetup, database_id_from_discord_id};
use crate::schema::{role_ranges, server_setups};
use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use miette::{Diagnostic, IntoDiagnostic};
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use twilight_model::id::Id;
use twilight_model::id::marker::GuildMarker;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

// To get boxed errors (as returned by the migration runner) into miette, we need a wrapper type for them.
#[derive(Debug, Diagnostic)]
pub struct MigrationError(pub Box<dyn Error + Send + Sync>);

impl fmt::Display for MigrationError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(&self.0, f)
	}
}

impl Error for MigrationError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		self.0.source()
	}
}

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

pub fn connect_db(config: &DatabaseConfig) -> miette::Result<DbPool> {
	let url = db_url(config);
	let manager: ConnectionManager<PgConnection> = ConnectionManager::new(url);
	Pool::builder().test_on_check_out(true).build(manager).into_diagnostic()
}

fn db_url(db_config: &DatabaseConfig) -> String {
	match db_config.port {
		Some(port) => format!(
			"postgres://{}:{}@{}:{}/{}",
			db_config.username, db_config.password, db_config.host, port, db_config.database
		),
		None => format!(
			"postgres://{}:{}@{}/{}",
			db_config.username, db_config.password, db_config.host, db_config.database
		),
	}
}

pub fn run_embedded_migrations(db_connection_pool: &DbPool) -> Result<(), MigrationError> {
	let mut db_connection = match db_connection_pool.get() {
		Ok(connection) => connection,
		Err(error) => return Err(MigrationError(Box::new(error))),
	};
	match db_connection.run_pending_migrations(MIGRATIONS) {
		Ok(_) => Ok(()),
		Err(error) => Err(MigrationError(error)),
	}
}

/// Server setups stored in Postgres: one `server_setups` row per guild, plus one `role_ranges` row per bracket.
#[derive(Clone)]
pub struct PgSetupStore {
	db_connection_pool: DbPool,
}

impl PgSetupStore {
	pub fn new(db_connection_pool: DbPool) -> Self {
		Self { db_connection_pool }
	}

	fn connection(&self) -> Result<PooledConnection<ConnectionManager<PgConnection>>, SpreeError> {
		self.db_connection_pool
			.get()
			.map_err(|error| SpreeError::infrastructure("connecting to the database", error))
	}
}

#[async_trait]
impl SetupStore for PgSetupStore {
	async fn find_one(&self, guild_id: Id<GuildMarker>) -> Result<Option<ServerSetup>, SpreeError> {
		let mut db_connection = self.connection()?;
		let db_guild_id = database_id_from_discord_id(guild_id.get());

		let db_setup: Option<DbServerSetup> = server_setups::table
			.find(db_guild_id)
			.first(&mut db_connection)
			.optional()
			.map_err(|error| SpreeError::infrastructure("loading the server setup", error))?;
		let Some(db_setup) = db_setup else {
			return Ok(None);
		};

		let ranges: Vec<DbRoleRange> = role_ranges::table
			.filter(role_ranges::guild_id.eq(db_guild_id))
			.load(&mut db_connection)
			.map_err(|error| SpreeError::infrastructure("loading the server setup", error))?;

		Ok(db_setup.into_setup(ranges))
	}

	async fn find_all(&self) -> Result<Vec<ServerSetup>, SpreeError> {
		let mut db_connection = self.connection()?;

		let db_setups: Vec<DbServerSetup> = server_setups::table
			.load(&mut db_connection)
			.map_err(|error| SpreeError::infrastructure("loading server setups", error))?;
		let all_ranges: Vec<DbRoleRange> = role_ranges::table
			.load(&mut db_connection)
			.map_err(|error| SpreeError::infrastructure("loading server setups", error))?;

		let mut ranges_by_guild: HashMap<i64, Vec<DbRoleRange>> = HashMap::new();
		for range in all_ranges {
			ranges_by_guild.entry(range.guild_id).or_default().push(range);
		}

		let setups = db_setups
			.into_iter()
			.filter_map(|db_setup| {
				let ranges = ranges_by_guild.remove(&db_setup.guild_id).unwrap_or_default();
				db_setup.into_setup(ranges)
			})
			.collect();
		Ok(setups)
	}

	async fn upsert(&self, setup: &ServerSetup) -> Result<SetupKind, SpreeError> {
		let mut db_connection = self.connection()?;
		let db_setup = DbServerSetup::from_setup(setup, Utc::now());
		let db_ranges = DbRoleRange::from_setup(setup);

		let result = db_connection.transaction(|db_connection| {
			let existing: Option<DbServerSetup> = server_setups::table
				.find(db_setup.guild_id)
				.first(db_connection)
				.optional()?;

			diesel::insert_into(server_setups::table)
				.values(&db_setup)
				.on_conflict(server_setups::guild_id)
				.do_update()
				.set((
					server_setups::category_id.eq(db_setup.category_id),
					server_setups::updated_at.eq(db_setup.updated_at),
				))
				.execute(db_connection)?;
			diesel::delete(role_ranges::table.filter(role_ranges::guild_id.eq(db_setup.guild_id)))
				.execute(db_connection)?;
			if !db_ranges.is_empty() {
				diesel::insert_into(role_ranges::table)
					.values(&db_ranges)
					.execute(db_connection)?;
			}

			Ok::<_, diesel::result::Error>(if existing.is_some() {
				SetupKind::Update
			} else {
				SetupKind::New
			})
		});

		result.map_err(|error| SpreeError::infrastructure("saving the server setup", error))
	}
}
