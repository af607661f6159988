//! PostgreSQL rule store for pricing-service.

use crate::models::{
    ChangeLogFilter, ClientDefaultFee, ClientOverrideFee, CreateClientOverride, FeePair,
    GlobalDefaultFee, ListRulesFilter, PackageFeeInput, PackageTypeFee, PricingChangeLogEntry,
    RuleEntityType, UpdateClientOverride, ZoneFeeRule, ZoneRuleInput, GLOBAL_DEFAULT_ID,
};
use crate::pricing::store::check_version;
use crate::pricing::{ChangeAuditor, PackageFeeFilter, RuleStore, RuleWriter, ZoneRuleFilter};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::PricingError;
use async_trait::async_trait;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

const GLOBAL_DEFAULT_COLUMNS: &str = "id, fee_usd, fee_lbp, version, updated_at, updated_by";

const CLIENT_OVERRIDE_COLUMNS: &str = "id, client_id, fee_usd, fee_lbp, is_active, version, \
     created_at, updated_at, created_by, updated_by";

const CLIENT_DEFAULT_COLUMNS: &str = "client_id, fee_usd, fee_lbp, version, \
     created_at, updated_at, created_by, updated_by";

const ZONE_RULE_COLUMNS: &str = "id, governorate_id, city_id, zone_name, client_id, package_type, \
     fee_usd, fee_lbp, is_active, version, created_at, updated_at, created_by, updated_by";

const PACKAGE_FEE_COLUMNS: &str = "id, package_type, client_id, governorate_id, city_id, \
     fee_usd, fee_lbp, is_active, version, created_at, updated_at, created_by, updated_by";

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "pricing-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

/// Append a change-log entry inside the mutation's transaction and bump the
/// store-wide rules revision.
async fn append_change_log(
    tx: &mut Transaction<'_, Postgres>,
    entry: &PricingChangeLogEntry,
) -> Result<(), PricingError> {
    sqlx::query(
        r#"
        INSERT INTO pricing_change_log (id, entity_type, entity_id, action, old_values, new_values, actor, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(entry.id)
    .bind(entry.entity_type.as_str())
    .bind(entry.entity_id)
    .bind(entry.action.as_str())
    .bind(&entry.old_values)
    .bind(&entry.new_values)
    .bind(&entry.actor)
    .bind(entry.created_at)
    .execute(&mut **tx)
    .await?;

    sqlx::query("UPDATE pricing_rules_revision SET revision = revision + 1 WHERE id = 1")
        .execute(&mut **tx)
        .await?;
    Ok(())
}

fn active_override_conflict(err: sqlx::Error, client_id: Uuid) -> PricingError {
    match err {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            PricingError::Conflict(format!("client {} already has an active override", client_id))
        }
        other => other.into(),
    }
}

#[async_trait]
impl RuleStore for Database {
    #[instrument(skip(self))]
    async fn get_global_default(&self) -> Result<GlobalDefaultFee, PricingError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_global_default"])
            .start_timer();

        let global = sqlx::query_as::<_, GlobalDefaultFee>(&format!(
            "SELECT {} FROM global_default_fee WHERE id = $1",
            GLOBAL_DEFAULT_COLUMNS
        ))
        .bind(GLOBAL_DEFAULT_ID)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            PricingError::Internal(anyhow::anyhow!("global default fee row is missing"))
        })?;

        timer.observe_duration();
        Ok(global)
    }

    #[instrument(skip(self))]
    async fn find_client_override(
        &self,
        client_id: Uuid,
    ) -> Result<Option<ClientOverrideFee>, PricingError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_client_override"])
            .start_timer();

        let found = sqlx::query_as::<_, ClientOverrideFee>(&format!(
            r#"
            SELECT {} FROM client_override_fees
            WHERE client_id = $1 AND is_active = TRUE
            ORDER BY updated_at DESC, id ASC
            LIMIT 1
            "#,
            CLIENT_OVERRIDE_COLUMNS
        ))
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await?;

        timer.observe_duration();
        Ok(found)
    }

    #[instrument(skip(self))]
    async fn find_client_default(
        &self,
        client_id: Uuid,
    ) -> Result<Option<ClientDefaultFee>, PricingError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_client_default"])
            .start_timer();

        let found = sqlx::query_as::<_, ClientDefaultFee>(&format!(
            "SELECT {} FROM client_default_fees WHERE client_id = $1",
            CLIENT_DEFAULT_COLUMNS
        ))
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await?;

        timer.observe_duration();
        Ok(found)
    }

    #[instrument(skip(self, filter))]
    async fn list_active_zone_rules(
        &self,
        filter: &ZoneRuleFilter,
    ) -> Result<Vec<ZoneFeeRule>, PricingError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_active_zone_rules"])
            .start_timer();

        let rules = sqlx::query_as::<_, ZoneFeeRule>(&format!(
            r#"
            SELECT {} FROM zone_fee_rules
            WHERE is_active = TRUE
              AND (client_id IS NULL OR client_id = $1)
              AND (governorate_id IS NULL OR governorate_id = $2)
              AND (city_id IS NULL OR city_id = $3)
              AND (zone_name IS NULL OR LOWER(zone_name) = LOWER($4))
              AND (package_type IS NULL OR LOWER(package_type) = LOWER($5))
            "#,
            ZONE_RULE_COLUMNS
        ))
        .bind(filter.client_id)
        .bind(filter.governorate_id)
        .bind(filter.city_id)
        .bind(&filter.zone_name)
        .bind(&filter.package_type)
        .fetch_all(&self.pool)
        .await?;

        timer.observe_duration();
        Ok(rules)
    }

    #[instrument(skip(self, filter), fields(package_type = %filter.package_type))]
    async fn list_active_package_type_fees(
        &self,
        filter: &PackageFeeFilter,
    ) -> Result<Vec<PackageTypeFee>, PricingError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_active_package_type_fees"])
            .start_timer();

        let fees = sqlx::query_as::<_, PackageTypeFee>(&format!(
            r#"
            SELECT {} FROM package_type_fees
            WHERE is_active = TRUE
              AND LOWER(package_type) = LOWER($1)
              AND (client_id IS NULL OR client_id = $2)
              AND (governorate_id IS NULL OR governorate_id = $3)
              AND (city_id IS NULL OR city_id = $4)
            "#,
            PACKAGE_FEE_COLUMNS
        ))
        .bind(&filter.package_type)
        .bind(filter.client_id)
        .bind(filter.governorate_id)
        .bind(filter.city_id)
        .fetch_all(&self.pool)
        .await?;

        timer.observe_duration();
        Ok(fees)
    }

    async fn rules_revision(&self) -> Result<i64, PricingError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["rules_revision"])
            .start_timer();

        let revision: i64 =
            sqlx::query_scalar::<_, i64>("SELECT revision FROM pricing_rules_revision WHERE id = 1")
                .fetch_optional(&self.pool)
                .await?
                .unwrap_or(0);

        timer.observe_duration();
        Ok(revision)
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), PricingError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["health_check"])
            .start_timer();

        sqlx::query("SELECT 1").execute(&self.pool).await?;

        timer.observe_duration();
        Ok(())
    }
}

#[async_trait]
impl RuleWriter for Database {
    // =========================================================================
    // Global Default
    // =========================================================================

    #[instrument(skip(self))]
    async fn update_global_default(
        &self,
        fee: FeePair,
        expected_version: i64,
        actor: &str,
    ) -> Result<GlobalDefaultFee, PricingError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_global_default"])
            .start_timer();

        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, GlobalDefaultFee>(&format!(
            "SELECT {} FROM global_default_fee WHERE id = $1 FOR UPDATE",
            GLOBAL_DEFAULT_COLUMNS
        ))
        .bind(GLOBAL_DEFAULT_ID)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            PricingError::Internal(anyhow::anyhow!("global default fee row is missing"))
        })?;
        check_version(&current, expected_version)?;

        let updated = sqlx::query_as::<_, GlobalDefaultFee>(&format!(
            r#"
            UPDATE global_default_fee
            SET fee_usd = $2, fee_lbp = $3, version = version + 1, updated_at = NOW(), updated_by = $4
            WHERE id = $1
            RETURNING {}
            "#,
            GLOBAL_DEFAULT_COLUMNS
        ))
        .bind(GLOBAL_DEFAULT_ID)
        .bind(fee.usd)
        .bind(fee.lbp)
        .bind(actor.trim())
        .fetch_one(&mut *tx)
        .await?;

        let entry = ChangeAuditor::updated(&current, &updated, actor)?;
        append_change_log(&mut tx, &entry).await?;
        tx.commit().await?;

        timer.observe_duration();
        info!(version = updated.version, fee = %fee, "Global default updated");

        Ok(updated)
    }

    // =========================================================================
    // Client Overrides
    // =========================================================================

    #[instrument(skip(self, input), fields(client_id = %input.client_id))]
    async fn create_client_override(
        &self,
        input: CreateClientOverride,
        actor: &str,
    ) -> Result<ClientOverrideFee, PricingError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_client_override"])
            .start_timer();

        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, ClientOverrideFee>(&format!(
            r#"
            INSERT INTO client_override_fees (id, client_id, fee_usd, fee_lbp, is_active, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING {}
            "#,
            CLIENT_OVERRIDE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(input.client_id)
        .bind(input.fee.usd)
        .bind(input.fee.lbp)
        .bind(input.is_active)
        .bind(actor.trim())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| active_override_conflict(e, input.client_id))?;

        let entry = ChangeAuditor::created(&created, actor)?;
        append_change_log(&mut tx, &entry).await?;
        tx.commit().await?;

        timer.observe_duration();
        info!(override_id = %created.id, "Client override created");

        Ok(created)
    }

    #[instrument(skip(self, input))]
    async fn update_client_override(
        &self,
        id: Uuid,
        input: UpdateClientOverride,
        expected_version: i64,
        actor: &str,
    ) -> Result<ClientOverrideFee, PricingError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_client_override"])
            .start_timer();

        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, ClientOverrideFee>(&format!(
            "SELECT {} FROM client_override_fees WHERE id = $1 FOR UPDATE",
            CLIENT_OVERRIDE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(PricingError::NotFound {
            entity: RuleEntityType::ClientOverride,
            id,
        })?;
        check_version(&current, expected_version)?;

        let updated = sqlx::query_as::<_, ClientOverrideFee>(&format!(
            r#"
            UPDATE client_override_fees
            SET fee_usd = $2, fee_lbp = $3, is_active = $4, version = version + 1,
                updated_at = NOW(), updated_by = $5
            WHERE id = $1
            RETURNING {}
            "#,
            CLIENT_OVERRIDE_COLUMNS
        ))
        .bind(id)
        .bind(input.fee.usd)
        .bind(input.fee.lbp)
        .bind(input.is_active)
        .bind(actor.trim())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| active_override_conflict(e, current.client_id))?;

        let entry = ChangeAuditor::updated(&current, &updated, actor)?;
        append_change_log(&mut tx, &entry).await?;
        tx.commit().await?;

        timer.observe_duration();
        info!(override_id = %id, version = updated.version, "Client override updated");

        Ok(updated)
    }

    #[instrument(skip(self))]
    async fn delete_client_override(
        &self,
        id: Uuid,
        expected_version: i64,
        actor: &str,
    ) -> Result<(), PricingError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_client_override"])
            .start_timer();

        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, ClientOverrideFee>(&format!(
            "SELECT {} FROM client_override_fees WHERE id = $1 FOR UPDATE",
            CLIENT_OVERRIDE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(PricingError::NotFound {
            entity: RuleEntityType::ClientOverride,
            id,
        })?;
        check_version(&current, expected_version)?;

        sqlx::query("DELETE FROM client_override_fees WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let entry = ChangeAuditor::deleted(&current, actor)?;
        append_change_log(&mut tx, &entry).await?;
        tx.commit().await?;

        timer.observe_duration();
        info!(override_id = %id, "Client override deleted");

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_client_override(
        &self,
        id: Uuid,
    ) -> Result<Option<ClientOverrideFee>, PricingError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_client_override"])
            .start_timer();

        let found = sqlx::query_as::<_, ClientOverrideFee>(&format!(
            "SELECT {} FROM client_override_fees WHERE id = $1",
            CLIENT_OVERRIDE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        timer.observe_duration();
        Ok(found)
    }

    #[instrument(skip(self, filter))]
    async fn list_client_overrides(
        &self,
        filter: &ListRulesFilter,
    ) -> Result<Vec<ClientOverrideFee>, PricingError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_client_overrides"])
            .start_timer();

        let overrides = sqlx::query_as::<_, ClientOverrideFee>(&format!(
            r#"
            SELECT {} FROM client_override_fees
            WHERE ($1::uuid IS NULL OR client_id = $1)
              AND ($2 OR is_active = TRUE)
            ORDER BY created_at ASC, id ASC
            "#,
            CLIENT_OVERRIDE_COLUMNS
        ))
        .bind(filter.client_id)
        .bind(filter.include_inactive)
        .fetch_all(&self.pool)
        .await?;

        timer.observe_duration();
        Ok(overrides)
    }

    // =========================================================================
    // Client Defaults
    // =========================================================================

    #[instrument(skip(self))]
    async fn set_client_default(
        &self,
        client_id: Uuid,
        fee: FeePair,
        expected_version: Option<i64>,
        actor: &str,
    ) -> Result<ClientDefaultFee, PricingError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["set_client_default"])
            .start_timer();

        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, ClientDefaultFee>(&format!(
            "SELECT {} FROM client_default_fees WHERE client_id = $1 FOR UPDATE",
            CLIENT_DEFAULT_COLUMNS
        ))
        .bind(client_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (record, entry) = match (existing, expected_version) {
            (None, None) => {
                let created = sqlx::query_as::<_, ClientDefaultFee>(&format!(
                    r#"
                    INSERT INTO client_default_fees (client_id, fee_usd, fee_lbp, created_by, updated_by)
                    VALUES ($1, $2, $3, $4, $4)
                    RETURNING {}
                    "#,
                    CLIENT_DEFAULT_COLUMNS
                ))
                .bind(client_id)
                .bind(fee.usd)
                .bind(fee.lbp)
                .bind(actor.trim())
                .fetch_one(&mut *tx)
                .await?;
                let entry = ChangeAuditor::created(&created, actor)?;
                (created, entry)
            }
            (Some(_), None) => {
                return Err(PricingError::Conflict(format!(
                    "client {} already has a default fee; pass expected_version to update it",
                    client_id
                )));
            }
            (None, Some(_)) => {
                return Err(PricingError::NotFound {
                    entity: RuleEntityType::ClientDefault,
                    id: client_id,
                });
            }
            (Some(current), Some(expected)) => {
                check_version(&current, expected)?;
                let updated = sqlx::query_as::<_, ClientDefaultFee>(&format!(
                    r#"
                    UPDATE client_default_fees
                    SET fee_usd = $2, fee_lbp = $3, version = version + 1,
                        updated_at = NOW(), updated_by = $4
                    WHERE client_id = $1
                    RETURNING {}
                    "#,
                    CLIENT_DEFAULT_COLUMNS
                ))
                .bind(client_id)
                .bind(fee.usd)
                .bind(fee.lbp)
                .bind(actor.trim())
                .fetch_one(&mut *tx)
                .await?;
                let entry = ChangeAuditor::updated(&current, &updated, actor)?;
                (updated, entry)
            }
        };

        append_change_log(&mut tx, &entry).await?;
        tx.commit().await?;

        timer.observe_duration();
        info!(client_id = %client_id, version = record.version, "Client default fee set");

        Ok(record)
    }

    #[instrument(skip(self))]
    async fn delete_client_default(
        &self,
        client_id: Uuid,
        expected_version: i64,
        actor: &str,
    ) -> Result<(), PricingError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_client_default"])
            .start_timer();

        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, ClientDefaultFee>(&format!(
            "SELECT {} FROM client_default_fees WHERE client_id = $1 FOR UPDATE",
            CLIENT_DEFAULT_COLUMNS
        ))
        .bind(client_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(PricingError::NotFound {
            entity: RuleEntityType::ClientDefault,
            id: client_id,
        })?;
        check_version(&current, expected_version)?;

        sqlx::query("DELETE FROM client_default_fees WHERE client_id = $1")
            .bind(client_id)
            .execute(&mut *tx)
            .await?;

        let entry = ChangeAuditor::deleted(&current, actor)?;
        append_change_log(&mut tx, &entry).await?;
        tx.commit().await?;

        timer.observe_duration();
        info!(client_id = %client_id, "Client default fee deleted");

        Ok(())
    }

    // =========================================================================
    // Zone Rules
    // =========================================================================

    #[instrument(skip(self, input))]
    async fn create_zone_rule(
        &self,
        input: ZoneRuleInput,
        actor: &str,
    ) -> Result<ZoneFeeRule, PricingError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_zone_rule"])
            .start_timer();

        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, ZoneFeeRule>(&format!(
            r#"
            INSERT INTO zone_fee_rules (id, governorate_id, city_id, zone_name, client_id, package_type, fee_usd, fee_lbp, is_active, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            RETURNING {}
            "#,
            ZONE_RULE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(input.governorate_id)
        .bind(input.city_id)
        .bind(&input.zone_name)
        .bind(input.client_id)
        .bind(&input.package_type)
        .bind(input.fee.usd)
        .bind(input.fee.lbp)
        .bind(input.is_active)
        .bind(actor.trim())
        .fetch_one(&mut *tx)
        .await?;

        let entry = ChangeAuditor::created(&created, actor)?;
        append_change_log(&mut tx, &entry).await?;
        tx.commit().await?;

        timer.observe_duration();
        info!(rule_id = %created.id, "Zone rule created");

        Ok(created)
    }

    #[instrument(skip(self, input))]
    async fn update_zone_rule(
        &self,
        id: Uuid,
        input: ZoneRuleInput,
        expected_version: i64,
        actor: &str,
    ) -> Result<ZoneFeeRule, PricingError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_zone_rule"])
            .start_timer();

        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, ZoneFeeRule>(&format!(
            "SELECT {} FROM zone_fee_rules WHERE id = $1 FOR UPDATE",
            ZONE_RULE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(PricingError::NotFound {
            entity: RuleEntityType::ZoneRule,
            id,
        })?;
        check_version(&current, expected_version)?;

        let updated = sqlx::query_as::<_, ZoneFeeRule>(&format!(
            r#"
            UPDATE zone_fee_rules
            SET governorate_id = $2, city_id = $3, zone_name = $4, client_id = $5, package_type = $6,
                fee_usd = $7, fee_lbp = $8, is_active = $9, version = version + 1,
                updated_at = NOW(), updated_by = $10
            WHERE id = $1
            RETURNING {}
            "#,
            ZONE_RULE_COLUMNS
        ))
        .bind(id)
        .bind(input.governorate_id)
        .bind(input.city_id)
        .bind(&input.zone_name)
        .bind(input.client_id)
        .bind(&input.package_type)
        .bind(input.fee.usd)
        .bind(input.fee.lbp)
        .bind(input.is_active)
        .bind(actor.trim())
        .fetch_one(&mut *tx)
        .await?;

        let entry = ChangeAuditor::updated(&current, &updated, actor)?;
        append_change_log(&mut tx, &entry).await?;
        tx.commit().await?;

        timer.observe_duration();
        info!(rule_id = %id, version = updated.version, "Zone rule updated");

        Ok(updated)
    }

    #[instrument(skip(self))]
    async fn delete_zone_rule(
        &self,
        id: Uuid,
        expected_version: i64,
        actor: &str,
    ) -> Result<(), PricingError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_zone_rule"])
            .start_timer();

        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, ZoneFeeRule>(&format!(
            "SELECT {} FROM zone_fee_rules WHERE id = $1 FOR UPDATE",
            ZONE_RULE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(PricingError::NotFound {
            entity: RuleEntityType::ZoneRule,
            id,
        })?;
        check_version(&current, expected_version)?;

        sqlx::query("DELETE FROM zone_fee_rules WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let entry = ChangeAuditor::deleted(&current, actor)?;
        append_change_log(&mut tx, &entry).await?;
        tx.commit().await?;

        timer.observe_duration();
        info!(rule_id = %id, "Zone rule deleted");

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_zone_rule(&self, id: Uuid) -> Result<Option<ZoneFeeRule>, PricingError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_zone_rule"])
            .start_timer();

        let found = sqlx::query_as::<_, ZoneFeeRule>(&format!(
            "SELECT {} FROM zone_fee_rules WHERE id = $1",
            ZONE_RULE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        timer.observe_duration();
        Ok(found)
    }

    #[instrument(skip(self, filter))]
    async fn list_zone_rules(
        &self,
        filter: &ListRulesFilter,
    ) -> Result<Vec<ZoneFeeRule>, PricingError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_zone_rules"])
            .start_timer();

        let rules = sqlx::query_as::<_, ZoneFeeRule>(&format!(
            r#"
            SELECT {} FROM zone_fee_rules
            WHERE ($1::uuid IS NULL OR client_id = $1)
              AND ($2 OR is_active = TRUE)
            ORDER BY created_at ASC, id ASC
            "#,
            ZONE_RULE_COLUMNS
        ))
        .bind(filter.client_id)
        .bind(filter.include_inactive)
        .fetch_all(&self.pool)
        .await?;

        timer.observe_duration();
        Ok(rules)
    }

    // =========================================================================
    // Package-Type Fees
    // =========================================================================

    #[instrument(skip(self, input), fields(package_type = %input.package_type))]
    async fn create_package_fee(
        &self,
        input: PackageFeeInput,
        actor: &str,
    ) -> Result<PackageTypeFee, PricingError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_package_fee"])
            .start_timer();

        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, PackageTypeFee>(&format!(
            r#"
            INSERT INTO package_type_fees (id, package_type, client_id, governorate_id, city_id, fee_usd, fee_lbp, is_active, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING {}
            "#,
            PACKAGE_FEE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&input.package_type)
        .bind(input.client_id)
        .bind(input.governorate_id)
        .bind(input.city_id)
        .bind(input.fee.usd)
        .bind(input.fee.lbp)
        .bind(input.is_active)
        .bind(actor.trim())
        .fetch_one(&mut *tx)
        .await?;

        let entry = ChangeAuditor::created(&created, actor)?;
        append_change_log(&mut tx, &entry).await?;
        tx.commit().await?;

        timer.observe_duration();
        info!(fee_id = %created.id, "Package-type fee created");

        Ok(created)
    }

    #[instrument(skip(self, input))]
    async fn update_package_fee(
        &self,
        id: Uuid,
        input: PackageFeeInput,
        expected_version: i64,
        actor: &str,
    ) -> Result<PackageTypeFee, PricingError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_package_fee"])
            .start_timer();

        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, PackageTypeFee>(&format!(
            "SELECT {} FROM package_type_fees WHERE id = $1 FOR UPDATE",
            PACKAGE_FEE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(PricingError::NotFound {
            entity: RuleEntityType::PackageTypeFee,
            id,
        })?;
        check_version(&current, expected_version)?;

        let updated = sqlx::query_as::<_, PackageTypeFee>(&format!(
            r#"
            UPDATE package_type_fees
            SET package_type = $2, client_id = $3, governorate_id = $4, city_id = $5,
                fee_usd = $6, fee_lbp = $7, is_active = $8, version = version + 1,
                updated_at = NOW(), updated_by = $9
            WHERE id = $1
            RETURNING {}
            "#,
            PACKAGE_FEE_COLUMNS
        ))
        .bind(id)
        .bind(&input.package_type)
        .bind(input.client_id)
        .bind(input.governorate_id)
        .bind(input.city_id)
        .bind(input.fee.usd)
        .bind(input.fee.lbp)
        .bind(input.is_active)
        .bind(actor.trim())
        .fetch_one(&mut *tx)
        .await?;

        let entry = ChangeAuditor::updated(&current, &updated, actor)?;
        append_change_log(&mut tx, &entry).await?;
        tx.commit().await?;

        timer.observe_duration();
        info!(fee_id = %id, version = updated.version, "Package-type fee updated");

        Ok(updated)
    }

    #[instrument(skip(self))]
    async fn delete_package_fee(
        &self,
        id: Uuid,
        expected_version: i64,
        actor: &str,
    ) -> Result<(), PricingError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_package_fee"])
            .start_timer();

        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, PackageTypeFee>(&format!(
            "SELECT {} FROM package_type_fees WHERE id = $1 FOR UPDATE",
            PACKAGE_FEE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(PricingError::NotFound {
            entity: RuleEntityType::PackageTypeFee,
            id,
        })?;
        check_version(&current, expected_version)?;

        sqlx::query("DELETE FROM package_type_fees WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let entry = ChangeAuditor::deleted(&current, actor)?;
        append_change_log(&mut tx, &entry).await?;
        tx.commit().await?;

        timer.observe_duration();
        info!(fee_id = %id, "Package-type fee deleted");

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_package_fee(&self, id: Uuid) -> Result<Option<PackageTypeFee>, PricingError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_package_fee"])
            .start_timer();

        let found = sqlx::query_as::<_, PackageTypeFee>(&format!(
            "SELECT {} FROM package_type_fees WHERE id = $1",
            PACKAGE_FEE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        timer.observe_duration();
        Ok(found)
    }

    #[instrument(skip(self, filter))]
    async fn list_package_fees(
        &self,
        filter: &ListRulesFilter,
    ) -> Result<Vec<PackageTypeFee>, PricingError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_package_fees"])
            .start_timer();

        let fees = sqlx::query_as::<_, PackageTypeFee>(&format!(
            r#"
            SELECT {} FROM package_type_fees
            WHERE ($1::uuid IS NULL OR client_id = $1)
              AND ($2 OR is_active = TRUE)
            ORDER BY created_at ASC, id ASC
            "#,
            PACKAGE_FEE_COLUMNS
        ))
        .bind(filter.client_id)
        .bind(filter.include_inactive)
        .fetch_all(&self.pool)
        .await?;

        timer.observe_duration();
        Ok(fees)
    }

    // =========================================================================
    // Change Log
    // =========================================================================

    #[instrument(skip(self, filter))]
    async fn list_change_log(
        &self,
        filter: &ChangeLogFilter,
    ) -> Result<Vec<PricingChangeLogEntry>, PricingError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_change_log"])
            .start_timer();

        let entries = sqlx::query_as::<_, PricingChangeLogEntry>(
            r#"
            SELECT id, entity_type, entity_id, action, old_values, new_values, actor, created_at
            FROM pricing_change_log
            WHERE ($1::varchar IS NULL OR entity_type = $1)
              AND ($2::uuid IS NULL OR entity_id = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3
            "#,
        )
        .bind(filter.entity_type.map(|t| t.as_str()))
        .bind(filter.entity_id)
        .bind(filter.limit)
        .fetch_all(&self.pool)
        .await?;

        timer.observe_duration();
        Ok(entries)
    }
}
