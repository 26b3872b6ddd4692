//! Bootstrap data: the permission catalogue, the default roles and an
//! optional administrator. Every step skips rows that already exist, so
//! seeding twice is harmless.

use anyhow::Context;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::auth::hash_password;

const RESOURCES: [&str; 5] = ["role", "permission", "user", "tags", "post"];
const ACTIONS: [&str; 5] = ["index", "show", "store", "update", "destroy"];

pub const SUPER_ADMIN: &str = "Super Admin";
pub const VERIFIED: &str = "Verified";
pub const INACTIVE: &str = "Inactive";

const VERIFIED_PERMISSIONS: [&str; 4] = ["post-index", "post-show", "tags-index", "tags-show"];

pub struct AdminAccount {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Every permission name the dashboard checks.
pub fn permission_catalogue() -> Vec<String> {
    RESOURCES
        .iter()
        .flat_map(|resource| {
            ACTIONS
                .iter()
                .map(move |action| format!("{resource}-{action}"))
        })
        .chain([
            "sync-permission-index".to_string(),
            "sync-permission-update".to_string(),
        ])
        .collect()
}

#[tracing::instrument(name = "seed_database", skip(db, admin))]
pub async fn run(db: &PgPool, admin: Option<AdminAccount>) -> anyhow::Result<()> {
    let catalogue = permission_catalogue();

    let mut transaction = db.begin().await.context("Failed to start transaction")?;

    for name in &catalogue {
        sqlx::query(
            r#"
            INSERT INTO permissions (id, name) VALUES ($1, $2)
            ON CONFLICT (name) WHERE deleted_at IS NULL DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .execute(&mut *transaction)
        .await
        .with_context(|| format!("Failed to seed permission {name}"))?;
    }

    let super_admin = ensure_role(&mut transaction, SUPER_ADMIN).await?;
    grant(&mut transaction, super_admin, &catalogue).await?;

    let verified = ensure_role(&mut transaction, VERIFIED).await?;
    let verified_permissions = VERIFIED_PERMISSIONS.map(String::from);
    grant(&mut transaction, verified, &verified_permissions).await?;

    ensure_role(&mut transaction, INACTIVE).await?;

    if let Some(admin) = admin {
        ensure_admin(&mut transaction, super_admin, admin).await?;
    }

    transaction
        .commit()
        .await
        .context("Failed to commit transaction")?;

    tracing::info!(permissions = catalogue.len(), "Database seeded");

    Ok(())
}

async fn ensure_role(conn: &mut PgConnection, name: &str) -> anyhow::Result<Uuid> {
    sqlx::query(
        r#"
        INSERT INTO roles (id, name, is_active) VALUES ($1, $2, true)
        ON CONFLICT (name) WHERE deleted_at IS NULL DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .execute(&mut *conn)
    .await
    .with_context(|| format!("Failed to seed role {name}"))?;

    let id = sqlx::query_scalar("SELECT id FROM roles WHERE name = $1 AND deleted_at IS NULL")
        .bind(name)
        .fetch_one(&mut *conn)
        .await
        .with_context(|| format!("Failed to look up role {name}"))?;

    Ok(id)
}

async fn grant(conn: &mut PgConnection, role_id: Uuid, names: &[String]) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO role_has_permissions (role_id, permission_id)
        SELECT $1, id FROM permissions WHERE name = ANY($2) AND deleted_at IS NULL
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(role_id)
    .bind(names)
    .execute(conn)
    .await
    .context("Failed to grant role permissions")?;

    Ok(())
}

async fn ensure_admin(
    conn: &mut PgConnection,
    role_id: Uuid,
    admin: AdminAccount,
) -> anyhow::Result<()> {
    let AdminAccount {
        username,
        email,
        password,
    } = admin;

    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 AND deleted_at IS NULL)",
    )
    .bind(&username)
    .fetch_one(&mut *conn)
    .await
    .context("Failed to look up admin user")?;

    if exists {
        tracing::info!("Admin user {username} already exists");
        return Ok(());
    }

    let hashed_password = hash_password(password).await?;

    sqlx::query(
        r#"
        INSERT INTO users (id, name, username, email, password, role_id, email_verified_at, is_active)
        VALUES ($1, $2, $2, $3, $4, $5, now(), true)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&username)
    .bind(&email)
    .bind(hashed_password)
    .bind(role_id)
    .execute(&mut *conn)
    .await
    .context("Failed to insert admin user")?;

    tracing::info!("Created admin user {username}");

    Ok(())
}
