//! Postgres-backed store.
//!
//! Every query filters on `tenant_id`. Units of work are plain database
//! transactions; `lock_*` methods use `SELECT ... FOR UPDATE`.
//!
//! ## Error Mapping
//!
//! | SQLx error | PostgreSQL code | `StoreError` |
//! |------------|-----------------|--------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (other) | any other | `Backend` |
//! | Decode / pool / io | N/A | `Backend` |

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::{Span, instrument};
use uuid::Uuid;

use shopfloor_auth::{PrincipalId, Role, User};
use shopfloor_core::{Page, PageRequest, ProductionOrderId, TenantId};
use shopfloor_inventory::{
    InventoryItemId, InventoryItemSnapshot, InventoryTransaction, TransactionId, TransactionType,
};
use shopfloor_production::{OrderNumber, Priority, ProductionOrderSnapshot, ProductionOrderStatus};
use shopfloor_products::{BomComponent, ProductId, ProductSnapshot, ProductStatus};

use super::{ErpStore, ItemFilter, OrderFilter, StoreError, UnitOfWork};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

#[derive(Debug, Clone)]
pub struct PostgresErpStore {
    pool: PgPool,
}

impl PostgresErpStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a pool to `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Apply embedded migrations.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(format!("migration failed: {e}")))
    }
}

const ORDER_COLUMNS: &str = "id, tenant_id, order_number, product_id, quantity_planned, \
     quantity_produced, start_date, due_date, status, priority, notes, created_at, updated_at, \
     completed_at";

const ITEM_COLUMNS: &str = "id, tenant_id, sku, name, category, current_stock, minimum_stock, \
     unit_cost, created_at, updated_at";

const TRANSACTION_COLUMNS: &str =
    "id, tenant_id, item_id, type, quantity, delta, production_order_id, note, occurred_at";

const PRODUCT_COLUMNS: &str =
    "id, tenant_id, sku, name, status, components, finished_item_id, created_at, updated_at";

const USER_COLUMNS: &str =
    "id, tenant_id, email, display_name, password_hash, roles, active, created_at";

fn uuids<T: Copy + Into<Uuid>>(ids: &[T]) -> Vec<Uuid> {
    ids.iter().map(|id| (*id).into()).collect()
}

fn to_i64(field: &str, value: u64) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::Backend(format!("{field} out of range")))
}

fn total_of(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}

#[async_trait]
impl ErpStore for PostgresErpStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(Box::new(PostgresUnitOfWork { tx }))
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, order_id = %order_id), err)]
    async fn get_order(
        &self,
        tenant_id: TenantId,
        order_id: ProductionOrderId,
    ) -> Result<Option<ProductionOrderSnapshot>, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM production_orders WHERE tenant_id = $1 AND id = $2"
        ))
        .bind(tenant_id.as_uuid())
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_order", e))?;

        row.map(TryInto::try_into).transpose()
    }

    #[instrument(skip(self, filter), fields(tenant_id = %tenant_id, rows = tracing::field::Empty), err)]
    async fn list_orders(
        &self,
        tenant_id: TenantId,
        filter: &OrderFilter,
        page: PageRequest,
    ) -> Result<Page<ProductionOrderSnapshot>, StoreError> {
        let status = filter.status.map(|s| s.as_str());
        let priority = filter.priority.map(|p| p.as_str());
        let product: Option<Uuid> = filter.product_id.map(Into::into);

        const WHERE: &str = "WHERE tenant_id = $1 \
            AND ($2::text IS NULL OR status = $2) \
            AND ($3::text IS NULL OR priority = $3) \
            AND ($4::uuid IS NULL OR product_id = $4)";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM production_orders {WHERE}"))
            .bind(tenant_id.as_uuid())
            .bind(status)
            .bind(priority)
            .bind(product)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_orders", e))?;

        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM production_orders {WHERE} \
             ORDER BY created_at DESC, id DESC LIMIT $5 OFFSET $6"
        ))
        .bind(tenant_id.as_uuid())
        .bind(status)
        .bind(priority)
        .bind(product)
        .bind(i64::from(page.limit()))
        .bind(to_i64("offset", page.offset())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_orders", e))?;

        Span::current().record("rows", rows.len());
        Ok(Page {
            items: rows.into_iter().map(TryInto::try_into).collect::<Result<_, _>>()?,
            total: total_of(total),
            request: page,
        })
    }

    async fn get_item(
        &self,
        tenant_id: TenantId,
        item_id: InventoryItemId,
    ) -> Result<Option<InventoryItemSnapshot>, StoreError> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items WHERE tenant_id = $1 AND id = $2"
        ))
        .bind(tenant_id.as_uuid())
        .bind(item_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_item", e))?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_items(
        &self,
        tenant_id: TenantId,
        item_ids: &[InventoryItemId],
    ) -> Result<Vec<InventoryItemSnapshot>, StoreError> {
        let rows = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items WHERE tenant_id = $1 AND id = ANY($2)"
        ))
        .bind(tenant_id.as_uuid())
        .bind(uuids(item_ids))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_items", e))?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    #[instrument(skip(self, filter), fields(tenant_id = %tenant_id), err)]
    async fn list_items(
        &self,
        tenant_id: TenantId,
        filter: &ItemFilter,
        page: PageRequest,
    ) -> Result<Page<InventoryItemSnapshot>, StoreError> {
        const WHERE: &str = "WHERE tenant_id = $1 \
            AND ($2::text IS NULL OR category = $2) \
            AND (NOT $3 OR current_stock <= minimum_stock) \
            AND ($4::text IS NULL OR sku ILIKE '%' || $4 || '%' OR name ILIKE '%' || $4 || '%')";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM inventory_items {WHERE}"))
            .bind(tenant_id.as_uuid())
            .bind(filter.category.as_deref())
            .bind(filter.low_stock_only)
            .bind(filter.search.as_deref())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_items", e))?;

        let rows = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items {WHERE} ORDER BY sku ASC LIMIT $5 OFFSET $6"
        ))
        .bind(tenant_id.as_uuid())
        .bind(filter.category.as_deref())
        .bind(filter.low_stock_only)
        .bind(filter.search.as_deref())
        .bind(i64::from(page.limit()))
        .bind(to_i64("offset", page.offset())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_items", e))?;

        Ok(Page {
            items: rows.into_iter().map(TryInto::try_into).collect::<Result<_, _>>()?,
            total: total_of(total),
            request: page,
        })
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, item_id = %item_id), err)]
    async fn item_ledger(
        &self,
        tenant_id: TenantId,
        item_id: InventoryItemId,
        page: PageRequest,
    ) -> Result<Page<InventoryTransaction>, StoreError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM inventory_transactions WHERE tenant_id = $1 AND item_id = $2",
        )
        .bind(tenant_id.as_uuid())
        .bind(item_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_ledger", e))?;

        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM inventory_transactions \
             WHERE tenant_id = $1 AND item_id = $2 \
             ORDER BY occurred_at DESC, id DESC LIMIT $3 OFFSET $4"
        ))
        .bind(tenant_id.as_uuid())
        .bind(item_id.as_uuid())
        .bind(i64::from(page.limit()))
        .bind(to_i64("offset", page.offset())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("item_ledger", e))?;

        Ok(Page {
            items: rows.into_iter().map(TryInto::try_into).collect::<Result<_, _>>()?,
            total: total_of(total),
            request: page,
        })
    }

    async fn ledger_balance(
        &self,
        tenant_id: TenantId,
        item_id: InventoryItemId,
    ) -> Result<i64, StoreError> {
        let sum: Option<i64> = sqlx::query_scalar(
            "SELECT SUM(delta)::BIGINT FROM inventory_transactions WHERE tenant_id = $1 AND item_id = $2",
        )
        .bind(tenant_id.as_uuid())
        .bind(item_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("ledger_balance", e))?;

        Ok(sum.unwrap_or(0))
    }

    async fn get_product(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> Result<Option<ProductSnapshot>, StoreError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE tenant_id = $1 AND id = $2"
        ))
        .bind(tenant_id.as_uuid())
        .bind(product_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_product", e))?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_products(
        &self,
        tenant_id: TenantId,
        page: PageRequest,
    ) -> Result<Page<ProductSnapshot>, StoreError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE tenant_id = $1")
            .bind(tenant_id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_products", e))?;

        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE tenant_id = $1 \
             ORDER BY sku ASC LIMIT $2 OFFSET $3"
        ))
        .bind(tenant_id.as_uuid())
        .bind(i64::from(page.limit()))
        .bind(to_i64("offset", page.offset())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_products", e))?;

        Ok(Page {
            items: rows.into_iter().map(TryInto::try_into).collect::<Result<_, _>>()?,
            total: total_of(total),
            request: page,
        })
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_user_by_email", e))?;

        Ok(row.map(Into::into))
    }

    async fn get_user(
        &self,
        tenant_id: TenantId,
        user_id: PrincipalId,
    ) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE tenant_id = $1 AND id = $2"
        ))
        .bind(tenant_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_user", e))?;

        Ok(row.map(Into::into))
    }
}

/// A unit of work backed by one Postgres transaction.
///
/// Dropping the transaction without commit rolls it back.
struct PostgresUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    async fn lock_order(
        &mut self,
        tenant_id: TenantId,
        order_id: ProductionOrderId,
    ) -> Result<Option<ProductionOrderSnapshot>, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM production_orders \
             WHERE tenant_id = $1 AND id = $2 FOR UPDATE"
        ))
        .bind(tenant_id.as_uuid())
        .bind(order_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("lock_order", e))?;

        row.map(TryInto::try_into).transpose()
    }

    async fn insert_order(&mut self, o: &ProductionOrderSnapshot) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO production_orders (
                id, tenant_id, order_number, order_year, order_seq, product_id,
                quantity_planned, quantity_produced, start_date, due_date, status,
                priority, notes, created_at, updated_at, completed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(o.id.as_uuid())
        .bind(o.tenant_id.as_uuid())
        .bind(o.order_number.to_string())
        .bind(o.order_number.year())
        .bind(o.order_number.sequence() as i32)
        .bind(o.product_id.as_uuid())
        .bind(o.quantity_planned)
        .bind(o.quantity_produced)
        .bind(o.start_date)
        .bind(o.due_date)
        .bind(o.status.as_str())
        .bind(o.priority.as_str())
        .bind(o.notes.as_deref())
        .bind(o.created_at)
        .bind(o.updated_at)
        .bind(o.completed_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;

        Ok(())
    }

    async fn update_order(&mut self, o: &ProductionOrderSnapshot) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE production_orders SET
                quantity_produced = $3,
                start_date = $4,
                due_date = $5,
                status = $6,
                priority = $7,
                notes = $8,
                updated_at = $9,
                completed_at = $10
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(o.tenant_id.as_uuid())
        .bind(o.id.as_uuid())
        .bind(o.quantity_produced)
        .bind(o.start_date)
        .bind(o.due_date)
        .bind(o.status.as_str())
        .bind(o.priority.as_str())
        .bind(o.notes.as_deref())
        .bind(o.updated_at)
        .bind(o.completed_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_order", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(o.id.to_string()));
        }
        Ok(())
    }

    async fn last_order_sequence(
        &mut self,
        tenant_id: TenantId,
        year: i32,
    ) -> Result<Option<u32>, StoreError> {
        let last: Option<i32> = sqlx::query_scalar(
            "SELECT MAX(order_seq) FROM production_orders WHERE tenant_id = $1 AND order_year = $2",
        )
        .bind(tenant_id.as_uuid())
        .bind(year)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("last_order_sequence", e))?;

        Ok(last.and_then(|s| u32::try_from(s).ok()))
    }

    async fn order_transactions(
        &mut self,
        tenant_id: TenantId,
        order_id: ProductionOrderId,
    ) -> Result<Vec<InventoryTransaction>, StoreError> {
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM inventory_transactions \
             WHERE tenant_id = $1 AND production_order_id = $2 \
             ORDER BY occurred_at ASC, id ASC"
        ))
        .bind(tenant_id.as_uuid())
        .bind(order_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("order_transactions", e))?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn lock_items(
        &mut self,
        tenant_id: TenantId,
        item_ids: &[InventoryItemId],
    ) -> Result<Vec<InventoryItemSnapshot>, StoreError> {
        // ORDER BY before FOR UPDATE: rows are locked in id order.
        let rows = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items \
             WHERE tenant_id = $1 AND id = ANY($2) ORDER BY id ASC FOR UPDATE"
        ))
        .bind(tenant_id.as_uuid())
        .bind(uuids(item_ids))
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("lock_items", e))?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn insert_item(&mut self, i: &InventoryItemSnapshot) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO inventory_items (
                id, tenant_id, sku, name, category, current_stock, minimum_stock,
                unit_cost, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(i.id.as_uuid())
        .bind(i.tenant_id.as_uuid())
        .bind(&i.sku)
        .bind(&i.name)
        .bind(i.category.as_deref())
        .bind(i.current_stock)
        .bind(i.minimum_stock)
        .bind(to_i64("unit_cost", i.unit_cost)?)
        .bind(i.created_at)
        .bind(i.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_item", e))?;

        Ok(())
    }

    async fn update_item(&mut self, i: &InventoryItemSnapshot) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE inventory_items SET
                name = $3,
                category = $4,
                current_stock = $5,
                minimum_stock = $6,
                unit_cost = $7,
                updated_at = $8
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(i.tenant_id.as_uuid())
        .bind(i.id.as_uuid())
        .bind(&i.name)
        .bind(i.category.as_deref())
        .bind(i.current_stock)
        .bind(i.minimum_stock)
        .bind(to_i64("unit_cost", i.unit_cost)?)
        .bind(i.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_item", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(i.id.to_string()));
        }
        Ok(())
    }

    async fn append_transaction(&mut self, e: &InventoryTransaction) -> Result<(), StoreError> {
        let order_id: Option<Uuid> = e.production_order_id.map(Into::into);
        sqlx::query(
            r#"
            INSERT INTO inventory_transactions (
                id, tenant_id, item_id, type, quantity, delta, production_order_id,
                note, occurred_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(e.id.as_uuid())
        .bind(e.tenant_id.as_uuid())
        .bind(e.item_id.as_uuid())
        .bind(e.kind.as_str())
        .bind(e.quantity)
        .bind(e.delta)
        .bind(order_id)
        .bind(e.note.as_deref())
        .bind(e.occurred_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|err| map_sqlx_error("append_transaction", err))?;

        Ok(())
    }

    async fn lock_product(
        &mut self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> Result<Option<ProductSnapshot>, StoreError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE tenant_id = $1 AND id = $2 FOR UPDATE"
        ))
        .bind(tenant_id.as_uuid())
        .bind(product_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("lock_product", e))?;

        row.map(TryInto::try_into).transpose()
    }

    async fn insert_product(&mut self, p: &ProductSnapshot) -> Result<(), StoreError> {
        let finished: Option<Uuid> = p.finished_item.map(Into::into);
        sqlx::query(
            r#"
            INSERT INTO products (
                id, tenant_id, sku, name, status, components, finished_item_id,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(p.id.as_uuid())
        .bind(p.tenant_id.as_uuid())
        .bind(&p.sku)
        .bind(&p.name)
        .bind(p.status.as_str())
        .bind(Json(&p.components))
        .bind(finished)
        .bind(p.created_at)
        .bind(p.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;

        Ok(())
    }

    async fn update_product(&mut self, p: &ProductSnapshot) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE products SET name = $3, status = $4, updated_at = $5 \
             WHERE tenant_id = $1 AND id = $2",
        )
        .bind(p.tenant_id.as_uuid())
        .bind(p.id.as_uuid())
        .bind(&p.name)
        .bind(p.status.as_str())
        .bind(p.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(p.id.to_string()));
        }
        Ok(())
    }

    async fn insert_user(&mut self, u: &User) -> Result<(), StoreError> {
        let roles: Vec<String> = u.roles.iter().map(|r| r.as_str().to_string()).collect();
        sqlx::query(
            r#"
            INSERT INTO users (
                id, tenant_id, email, display_name, password_hash, roles, active, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(u.id.as_uuid())
        .bind(u.tenant_id.as_uuid())
        .bind(&u.email)
        .bind(&u.display_name)
        .bind(&u.password_hash)
        .bind(roles)
        .bind(u.active)
        .bind(u.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }
}

/// Map SQLx errors to `StoreError`.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    if is_unique_violation(&err) {
        let constraint = match &err {
            sqlx::Error::Database(db) => db.constraint().unwrap_or("unique").to_string(),
            _ => "unique".to_string(),
        };
        return StoreError::Conflict(format!("duplicate value violates {constraint}"));
    }

    match err {
        sqlx::Error::Database(db_err) => StoreError::Backend(format!(
            "database error in {}: {}",
            operation,
            db_err.message()
        )),
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {operation}"))
        }
        other => StoreError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}

/// Check if an error is a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}

fn decode_err(what: &str, e: impl core::fmt::Display) -> StoreError {
    StoreError::Backend(format!("failed to decode {what}: {e}"))
}

// SQLx row types

#[derive(Debug, FromRow)]
struct OrderRow {
    id: Uuid,
    tenant_id: Uuid,
    order_number: String,
    product_id: Uuid,
    quantity_planned: i64,
    quantity_produced: i64,
    start_date: Option<NaiveDate>,
    due_date: NaiveDate,
    status: String,
    priority: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<OrderRow> for ProductionOrderSnapshot {
    type Error = StoreError;

    fn try_from(r: OrderRow) -> Result<Self, Self::Error> {
        Ok(ProductionOrderSnapshot {
            id: ProductionOrderId::from_uuid(r.id),
            tenant_id: TenantId::from_uuid(r.tenant_id),
            order_number: OrderNumber::parse(&r.order_number)
                .map_err(|e| decode_err("order_number", e))?,
            product_id: ProductId::from_uuid(r.product_id),
            quantity_planned: r.quantity_planned,
            quantity_produced: r.quantity_produced,
            start_date: r.start_date,
            due_date: r.due_date,
            status: r
                .status
                .parse::<ProductionOrderStatus>()
                .map_err(|e| decode_err("status", e))?,
            priority: r.priority.parse::<Priority>().map_err(|e| decode_err("priority", e))?,
            notes: r.notes,
            created_at: r.created_at,
            updated_at: r.updated_at,
            completed_at: r.completed_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ItemRow {
    id: Uuid,
    tenant_id: Uuid,
    sku: String,
    name: String,
    category: Option<String>,
    current_stock: i64,
    minimum_stock: i64,
    unit_cost: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ItemRow> for InventoryItemSnapshot {
    type Error = StoreError;

    fn try_from(r: ItemRow) -> Result<Self, Self::Error> {
        Ok(InventoryItemSnapshot {
            id: InventoryItemId::from_uuid(r.id),
            tenant_id: TenantId::from_uuid(r.tenant_id),
            sku: r.sku,
            name: r.name,
            category: r.category,
            current_stock: r.current_stock,
            minimum_stock: r.minimum_stock,
            unit_cost: u64::try_from(r.unit_cost).map_err(|e| decode_err("unit_cost", e))?,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct TransactionRow {
    id: Uuid,
    tenant_id: Uuid,
    item_id: Uuid,
    #[sqlx(rename = "type")]
    kind: String,
    quantity: i64,
    delta: i64,
    production_order_id: Option<Uuid>,
    note: Option<String>,
    occurred_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for InventoryTransaction {
    type Error = StoreError;

    fn try_from(r: TransactionRow) -> Result<Self, Self::Error> {
        Ok(InventoryTransaction {
            id: TransactionId::from_uuid(r.id),
            tenant_id: TenantId::from_uuid(r.tenant_id),
            item_id: InventoryItemId::from_uuid(r.item_id),
            kind: r.kind.parse::<TransactionType>().map_err(|e| decode_err("type", e))?,
            quantity: r.quantity,
            delta: r.delta,
            production_order_id: r.production_order_id.map(ProductionOrderId::from_uuid),
            note: r.note,
            occurred_at: r.occurred_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    tenant_id: Uuid,
    sku: String,
    name: String,
    status: String,
    components: Json<Vec<BomComponent>>,
    finished_item_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for ProductSnapshot {
    type Error = StoreError;

    fn try_from(r: ProductRow) -> Result<Self, Self::Error> {
        Ok(ProductSnapshot {
            id: ProductId::from_uuid(r.id),
            tenant_id: TenantId::from_uuid(r.tenant_id),
            sku: r.sku,
            name: r.name,
            status: r.status.parse::<ProductStatus>().map_err(|e| decode_err("status", e))?,
            components: r.components.0,
            finished_item: r.finished_item_id.map(InventoryItemId::from_uuid),
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    tenant_id: Uuid,
    email: String,
    display_name: String,
    password_hash: String,
    roles: Vec<String>,
    active: bool,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        User {
            id: PrincipalId::from_uuid(r.id),
            tenant_id: TenantId::from_uuid(r.tenant_id),
            email: r.email,
            display_name: r.display_name,
            password_hash: r.password_hash,
            roles: r.roles.into_iter().map(Role::new).collect(),
            active: r.active,
            created_at: r.created_at,
        }
    }
}

