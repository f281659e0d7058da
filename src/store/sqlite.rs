//! SQLite implementation of the store traits (`sqlx`).
//!
//! Decimals are stored as strings, structured payloads (intent, missing
//! reasons, suggestions, headers) as JSON text.

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};

use super::{
    Change, Draft, IngestOutcome, Inquiry, InquiryLink, InventorySource, ItemUpdate, NewInquiry,
    Pending, PipelineItem, PipelineStore, Selection, StoreError,
};
use crate::composer::OutcomeKind;
use crate::gate::{MissingReason, MissingReasons};
use crate::inventory::{AccommodationUnit, PricePeriod, Room, WeekdayPrices};
use crate::pipeline::status::{BusinessStatus, PipelineStatus};
use crate::pipeline::INQUIRY_MISSING;
use crate::types::RawMessage;

/// Schema, applied idempotently on open.
pub const SCHEMA: &str = include_str!("../../migrations/001_schema.sql");

const ITEM_COLUMNS: &str = "i.id, i.raw_message_id, i.inquiry_id, i.status, i.error_reason, \
     i.missing, i.suggestions, i.ai_stopped, i.version, i.received_at";

const INQUIRY_COLUMNS: &str = "id, sender, guest_name, subject, thread_key, external_ref, \
     raw_text, intent, business_status, draft, draft_outcome";

/// SQLite-backed pipeline store and inventory source.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database file and apply the schema.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the file cannot be opened or migrated.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        info!(path = %path.display(), "store opened");
        Ok(store)
    }

    /// Private in-memory database (one connection), schema applied.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on SQLite failure.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        // The database lives only as long as its single connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Apply the schema. Safe to run repeatedly.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on SQLite failure.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    /// Underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Replace the given units (with their rooms and price periods) in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on SQLite failure; nothing is written then.
    pub async fn seed_inventory(&self, units: &[AccommodationUnit]) -> Result<usize, StoreError> {
        let mut tx = self.pool.begin().await?;
        for unit in units {
            replace_unit(&mut tx, unit).await?;
        }
        tx.commit().await?;
        info!(units = units.len(), "inventory seeded");
        Ok(units.len())
    }
}

async fn replace_unit(
    tx: &mut Transaction<'_, Sqlite>,
    unit: &AccommodationUnit,
) -> Result<(), StoreError> {
    sqlx::query(
        "DELETE FROM price_periods WHERE room_id IN (SELECT id FROM rooms WHERE unit_id = ?1)",
    )
    .bind(unit.id)
    .execute(&mut **tx)
    .await?;
    sqlx::query("DELETE FROM rooms WHERE unit_id = ?1")
        .bind(unit.id)
        .execute(&mut **tx)
        .await?;
    sqlx::query("DELETE FROM units WHERE id = ?1")
        .bind(unit.id)
        .execute(&mut **tx)
        .await?;

    sqlx::query(
        "INSERT INTO units (id, name, unit_type, region, location, priority, manual_order, \
         paid, active, listed, beach_distance_m, beach_type, parking, pets_allowed, \
         noise_level, availability_note, link, base_price, amenities) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
    )
    .bind(unit.id)
    .bind(&unit.name)
    .bind(&unit.unit_type)
    .bind(&unit.region)
    .bind(&unit.location)
    .bind(unit.priority)
    .bind(unit.manual_order)
    .bind(unit.paid)
    .bind(unit.active)
    .bind(unit.listed)
    .bind(unit.beach_distance_m.map(i64::from))
    .bind(&unit.beach_type)
    .bind(unit.parking)
    .bind(unit.pets_allowed)
    .bind(&unit.noise_level)
    .bind(&unit.availability_note)
    .bind(&unit.link)
    .bind(unit.base_price.map(|p| p.to_string()))
    .bind(&unit.amenities)
    .execute(&mut **tx)
    .await?;

    for room in &unit.rooms {
        sqlx::query(
            "INSERT INTO rooms (id, unit_id, title, max_adults, max_children, min_stay_nights, amenities) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(room.id)
        .bind(unit.id)
        .bind(&room.title)
        .bind(i64::from(room.max_adults))
        .bind(i64::from(room.max_children))
        .bind(i64::from(room.min_stay_nights))
        .bind(&room.amenities)
        .execute(&mut **tx)
        .await?;

        for period in &room.price_periods {
            let [mon, tue, wed, thu, fri, sat, sun] =
                period.prices.0.map(|p| p.map(|d| d.to_string()));
            sqlx::query(
                "INSERT INTO price_periods (room_id, date_from, date_to, adults, children, \
                 is_default, price_mon, price_tue, price_wed, price_thu, price_fri, price_sat, price_sun) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            )
            .bind(room.id)
            .bind(period.date_from)
            .bind(period.date_to)
            .bind(period.adults.map(i64::from))
            .bind(i64::from(period.children))
            .bind(period.is_default)
            .bind(mon)
            .bind(tue)
            .bind(wed)
            .bind(thu)
            .bind(fri)
            .bind(sat)
            .bind(sun)
            .execute(&mut **tx)
            .await?;
        }
    }
    debug!(unit_id = unit.id, rooms = unit.rooms.len(), "unit replaced");
    Ok(())
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn to_u32(value: i64) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

fn parse_decimal(value: Option<String>) -> Result<Option<Decimal>, StoreError> {
    value
        .map(|s| Decimal::from_str(s.trim()).map_err(|e| StoreError::Corrupt(format!("{s:?}: {e}"))))
        .transpose()
}

fn item_from_row(row: &SqliteRow) -> Result<PipelineItem, StoreError> {
    let status: String = row.try_get("status")?;
    let missing: String = row.try_get("missing")?;
    let suggestions: Option<String> = row.try_get("suggestions")?;
    let received_at: DateTime<Utc> = row.try_get("received_at")?;
    Ok(PipelineItem {
        id: row.try_get("id")?,
        raw_message_id: row.try_get("raw_message_id")?,
        inquiry_id: row.try_get("inquiry_id")?,
        status: status.parse()?,
        error_reason: row.try_get("error_reason")?,
        missing: serde_json::from_str::<MissingReasons>(&missing)?,
        suggestions: suggestions
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?,
        ai_stopped: row.try_get("ai_stopped")?,
        version: row.try_get("version")?,
        received_at,
    })
}

fn inquiry_from_row(row: &SqliteRow) -> Result<Inquiry, StoreError> {
    let intent: Option<String> = row.try_get("intent")?;
    let status: String = row.try_get("business_status")?;
    let draft_body: Option<String> = row.try_get("draft")?;
    let draft_outcome: Option<String> = row.try_get("draft_outcome")?;
    let draft = match (draft_body, draft_outcome) {
        (Some(body), Some(outcome)) => Some(Draft {
            body,
            outcome: outcome.parse::<OutcomeKind>()?,
        }),
        _ => None,
    };
    Ok(Inquiry {
        id: row.try_get("id")?,
        sender: row.try_get("sender")?,
        guest_name: row.try_get("guest_name")?,
        subject: row.try_get("subject")?,
        thread_key: row.try_get("thread_key")?,
        external_ref: row.try_get("external_ref")?,
        raw_text: row.try_get("raw_text")?,
        intent: intent.as_deref().map(serde_json::from_str).transpose()?,
        business_status: status.parse::<BusinessStatus>()?,
        draft,
    })
}

fn unit_from_row(row: &SqliteRow) -> Result<AccommodationUnit, StoreError> {
    let beach: Option<i64> = row.try_get("beach_distance_m")?;
    Ok(AccommodationUnit {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        unit_type: row.try_get("unit_type")?,
        region: row.try_get("region")?,
        location: row.try_get("location")?,
        priority: row.try_get("priority")?,
        manual_order: row.try_get("manual_order")?,
        paid: row.try_get("paid")?,
        active: row.try_get("active")?,
        listed: row.try_get("listed")?,
        beach_distance_m: beach.map(to_u32),
        beach_type: row.try_get("beach_type")?,
        parking: row.try_get("parking")?,
        pets_allowed: row.try_get("pets_allowed")?,
        noise_level: row.try_get("noise_level")?,
        availability_note: row.try_get("availability_note")?,
        link: row.try_get("link")?,
        base_price: parse_decimal(row.try_get("base_price")?)?,
        amenities: row.try_get("amenities")?,
        rooms: Vec::new(),
    })
}

fn period_from_row(row: &SqliteRow) -> Result<PricePeriod, StoreError> {
    let mut prices = [None; 7];
    for (slot, column) in prices.iter_mut().zip([
        "price_mon",
        "price_tue",
        "price_wed",
        "price_thu",
        "price_fri",
        "price_sat",
        "price_sun",
    ]) {
        *slot = parse_decimal(row.try_get(column)?)?;
    }
    let adults: Option<i64> = row.try_get("adults")?;
    let children: i64 = row.try_get("children")?;
    Ok(PricePeriod {
        date_from: row.try_get("date_from")?,
        date_to: row.try_get("date_to")?,
        adults: adults.map(to_u32),
        children: to_u32(children),
        is_default: row.try_get("is_default")?,
        prices: WeekdayPrices(prices),
    })
}

fn selection_sql(selection: &Selection) -> String {
    const OPEN: &str = "q.business_status NOT IN ('replied', 'closed')";
    let placeholders = vec!["?"; selection.statuses.len()].join(", ");
    let out_of_scope = MissingReason::OutOfScope.as_str();
    // `q.id IS NULL` lets an orphaned item through once so its failure is recorded.
    let pending = match selection.pending {
        Pending::Any => String::new(),
        Pending::Suggestable { rebuild } => format!(
            " AND (q.id IS NULL OR (q.intent IS NOT NULL AND {OPEN})){}",
            if rebuild { "" } else { " AND i.suggestions IS NULL" }
        ),
        Pending::Draftable { rebuild } => format!(
            " AND (q.id IS NULL OR {OPEN}) \
             AND NOT EXISTS (SELECT 1 FROM json_each(i.missing) m WHERE m.value = '{out_of_scope}'){}",
            if rebuild { "" } else { " AND q.draft IS NULL" }
        ),
        Pending::UnsentDraft => format!(" AND q.draft IS NOT NULL AND {OPEN}"),
    };
    format!(
        "SELECT {ITEM_COLUMNS} FROM pipeline_items i \
         LEFT JOIN inquiries q ON q.id = i.inquiry_id \
         WHERE i.ai_stopped = 0 AND i.status IN ({placeholders}) \
         AND NOT (i.status = 'error' AND i.error_reason IS ?){pending} \
         ORDER BY i.received_at ASC, i.id ASC LIMIT ?"
    )
}

async fn create_inquiry(
    tx: &mut Transaction<'_, Sqlite>,
    inquiry: &NewInquiry,
    now: DateTime<Utc>,
) -> Result<i64, StoreError> {
    let result = sqlx::query(
        "INSERT INTO inquiries (sender, guest_name, subject, thread_key, external_ref, raw_text, \
         business_status, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'new', ?7, ?7)",
    )
    .bind(&inquiry.sender)
    .bind(&inquiry.guest_name)
    .bind(&inquiry.subject)
    .bind(&inquiry.thread_key)
    .bind(&inquiry.external_ref)
    .bind(&inquiry.raw_text)
    .bind(now)
    .execute(&mut **tx)
    .await?;
    Ok(result.last_insert_rowid())
}

// ---------------------------------------------------------------------------
// Trait implementations
// ---------------------------------------------------------------------------

#[async_trait::async_trait]
impl PipelineStore for SqliteStore {
    async fn ingest(&self, message: &RawMessage) -> Result<IngestOutcome, StoreError> {
        let hash = message.dedupe_hash();
        let headers = serde_json::to_string(&message.headers)?;
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;
        let inserted = sqlx::query(
            "INSERT INTO raw_messages (dedupe_hash, external_id, subject, sender, received_at, headers, body) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) ON CONFLICT (dedupe_hash) DO NOTHING",
        )
        .bind(&hash)
        .bind(&message.external_id)
        .bind(&message.subject)
        .bind(&message.sender)
        .bind(message.received_at)
        .bind(&headers)
        .bind(&message.body)
        .execute(&mut *tx)
        .await?;
        if inserted.rows_affected() == 0 {
            debug!(hash = %hash, "duplicate message ignored");
            return Ok(IngestOutcome::Duplicate);
        }

        let raw_id = inserted.last_insert_rowid();
        let item = sqlx::query(
            "INSERT INTO pipeline_items (raw_message_id, status, received_at, updated_at) \
             VALUES (?1, 'new', ?2, ?3)",
        )
        .bind(raw_id)
        .bind(message.received_at)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        let item_id = item.last_insert_rowid();
        debug!(item_id, raw_message_id = raw_id, "message ingested");
        Ok(IngestOutcome::Inserted { item_id })
    }

    async fn select(&self, selection: &Selection) -> Result<Vec<PipelineItem>, StoreError> {
        if selection.statuses.is_empty() || selection.limit == 0 {
            return Ok(Vec::new());
        }
        let sql = selection_sql(selection);
        let mut query = sqlx::query(&sql);
        for status in &selection.statuses {
            query = query.bind(status.as_str());
        }
        let rows = query
            .bind(INQUIRY_MISSING)
            .bind(i64::from(selection.limit))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(item_from_row).collect()
    }

    async fn item(&self, id: i64) -> Result<Option<PipelineItem>, StoreError> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM pipeline_items i WHERE i.id = ?1");
        sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(item_from_row)
            .transpose()
    }

    async fn raw_message(&self, id: i64) -> Result<RawMessage, StoreError> {
        let row = sqlx::query(
            "SELECT external_id, subject, sender, received_at, headers, body \
             FROM raw_messages WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound {
            entity: "raw_message",
            id,
        })?;
        let headers: String = row.try_get("headers")?;
        Ok(RawMessage {
            external_id: row.try_get("external_id")?,
            subject: row.try_get("subject")?,
            sender: row.try_get("sender")?,
            received_at: row.try_get("received_at")?,
            headers: serde_json::from_str::<BTreeMap<String, String>>(&headers)?,
            body: row.try_get("body")?,
        })
    }

    async fn inquiry(&self, id: i64) -> Result<Option<Inquiry>, StoreError> {
        let sql = format!("SELECT {INQUIRY_COLUMNS} FROM inquiries WHERE id = ?1");
        sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(inquiry_from_row)
            .transpose()
    }

    async fn find_thread(
        &self,
        sender: &str,
        thread_key: &str,
    ) -> Result<Option<Inquiry>, StoreError> {
        let sql = format!(
            "SELECT {INQUIRY_COLUMNS} FROM inquiries \
             WHERE sender = ?1 AND thread_key = ?2 AND business_status != 'closed' \
             ORDER BY id DESC LIMIT 1"
        );
        sqlx::query(&sql)
            .bind(sender)
            .bind(thread_key)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(inquiry_from_row)
            .transpose()
    }

    async fn commit(&self, update: ItemUpdate) -> Result<(), StoreError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT status, version, inquiry_id FROM pipeline_items WHERE id = ?1")
            .bind(update.item_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::NotFound {
                entity: "pipeline_item",
                id: update.item_id,
            })?;
        let version: i64 = row.try_get("version")?;
        if version != update.expected_version {
            return Err(StoreError::Conflict(update.item_id));
        }
        let current: PipelineStatus = row.try_get::<String, _>("status")?.parse()?;
        if !current.can_transition_to(update.status) {
            return Err(StoreError::IllegalTransition {
                machine: "pipeline",
                from: current.to_string(),
                to: update.status.to_string(),
            });
        }

        let mut inquiry_id: Option<i64> = row.try_get("inquiry_id")?;
        match &update.link {
            Some(InquiryLink::Existing(id)) => inquiry_id = Some(*id),
            Some(InquiryLink::Create(new)) => {
                inquiry_id = Some(create_inquiry(&mut tx, new, now).await?);
            }
            None => {}
        }

        if !update.inquiry.is_empty() {
            let id = inquiry_id.ok_or(StoreError::NotFound {
                entity: "inquiry for pipeline_item",
                id: update.item_id,
            })?;
            let status: String =
                sqlx::query_scalar("SELECT business_status FROM inquiries WHERE id = ?1")
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await?
                    .ok_or(StoreError::NotFound {
                        entity: "inquiry",
                        id,
                    })?;
            let current: BusinessStatus = status.parse()?;

            // The caller checked the lock before this transaction; a send may have
            // replied in between.
            let rewrites = !matches!(update.inquiry.intent, Change::Keep)
                || !matches!(update.inquiry.draft, Change::Keep);
            if rewrites && current.is_locked() {
                debug!(
                    item_id = update.item_id,
                    inquiry_id = id,
                    business_status = %current,
                    "inquiry locked since read, update rejected"
                );
                return Err(StoreError::Conflict(update.item_id));
            }

            if let Some(next) = update.inquiry.business_status {
                if !current.can_transition_to(next) {
                    return Err(StoreError::IllegalTransition {
                        machine: "business",
                        from: current.to_string(),
                        to: next.to_string(),
                    });
                }
                sqlx::query("UPDATE inquiries SET business_status = ?1, updated_at = ?2 WHERE id = ?3")
                    .bind(next.as_str())
                    .bind(now)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }

            let intent = match &update.inquiry.intent {
                Change::Keep => None,
                Change::Set(intent) => Some(Some(serde_json::to_string(intent)?)),
                Change::Clear => Some(None),
            };
            if let Some(intent) = intent {
                sqlx::query("UPDATE inquiries SET intent = ?1, updated_at = ?2 WHERE id = ?3")
                    .bind(intent)
                    .bind(now)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }

            let draft = match &update.inquiry.draft {
                Change::Keep => None,
                Change::Set(draft) => Some((Some(draft.body.clone()), Some(draft.outcome.as_str()))),
                Change::Clear => Some((None, None)),
            };
            if let Some((body, outcome)) = draft {
                sqlx::query(
                    "UPDATE inquiries SET draft = ?1, draft_outcome = ?2, updated_at = ?3 WHERE id = ?4",
                )
                .bind(body)
                .bind(outcome)
                .bind(now)
                .bind(id)
                .execute(&mut *tx)
                .await?;
            }
        }

        let error_reason = if update.status == PipelineStatus::Error {
            update.error_reason.as_deref()
        } else {
            None
        };
        let updated = sqlx::query(
            "UPDATE pipeline_items SET status = ?1, error_reason = ?2, inquiry_id = ?3, \
             version = version + 1, updated_at = ?4 WHERE id = ?5 AND version = ?6",
        )
        .bind(update.status.as_str())
        .bind(error_reason)
        .bind(inquiry_id)
        .bind(now)
        .bind(update.item_id)
        .bind(update.expected_version)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(StoreError::Conflict(update.item_id));
        }

        let missing = match &update.missing {
            Change::Keep => None,
            Change::Set(reasons) => Some(serde_json::to_string(reasons)?),
            Change::Clear => Some("[]".to_owned()),
        };
        if let Some(missing) = missing {
            sqlx::query("UPDATE pipeline_items SET missing = ?1 WHERE id = ?2")
                .bind(missing)
                .bind(update.item_id)
                .execute(&mut *tx)
                .await?;
        }

        let suggestions = match &update.suggestions {
            Change::Keep => None,
            Change::Set(payload) => Some(Some(serde_json::to_string(payload)?)),
            Change::Clear => Some(None),
        };
        if let Some(suggestions) = suggestions {
            sqlx::query("UPDATE pipeline_items SET suggestions = ?1 WHERE id = ?2")
                .bind(suggestions)
                .bind(update.item_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn set_ai_stopped(&self, item_id: i64, stopped: bool) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE pipeline_items SET ai_stopped = ?1, version = version + 1, updated_at = ?2 \
             WHERE id = ?3",
        )
        .bind(stopped)
        .bind(Utc::now())
        .bind(item_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "pipeline_item",
                id: item_id,
            });
        }
        info!(item_id, stopped, "ai_stopped flag changed");
        Ok(())
    }
}

#[async_trait::async_trait]
impl InventorySource for SqliteStore {
    async fn units(&self) -> Result<Vec<AccommodationUnit>, StoreError> {
        let mut units: Vec<AccommodationUnit> = sqlx::query("SELECT * FROM units ORDER BY id")
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(unit_from_row)
            .collect::<Result<_, _>>()?;

        let mut periods: BTreeMap<i64, Vec<PricePeriod>> = BTreeMap::new();
        for row in sqlx::query("SELECT * FROM price_periods ORDER BY room_id, id")
            .fetch_all(&self.pool)
            .await?
        {
            let room_id: i64 = row.try_get("room_id")?;
            periods.entry(room_id).or_default().push(period_from_row(&row)?);
        }

        let mut rooms: BTreeMap<i64, Vec<Room>> = BTreeMap::new();
        for row in sqlx::query("SELECT * FROM rooms ORDER BY unit_id, id")
            .fetch_all(&self.pool)
            .await?
        {
            let id: i64 = row.try_get("id")?;
            let unit_id: i64 = row.try_get("unit_id")?;
            let room = Room {
                id,
                title: row.try_get("title")?,
                max_adults: to_u32(row.try_get("max_adults")?),
                max_children: to_u32(row.try_get("max_children")?),
                min_stay_nights: to_u32(row.try_get("min_stay_nights")?),
                amenities: row.try_get("amenities")?,
                price_periods: periods.remove(&id).unwrap_or_default(),
            };
            rooms.entry(unit_id).or_default().push(room);
        }

        for unit in &mut units {
            unit.rooms = rooms.remove(&unit.id).unwrap_or_default();
        }
        Ok(units)
    }
}
