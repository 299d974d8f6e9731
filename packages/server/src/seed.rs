use chrono::Utc;
use sea_orm::sea_query::{Index, IndexCreateStatement, MysqlQueryBuilder, OnConflict, PostgresQueryBuilder, SqliteQueryBuilder};
use sea_orm::*;
use tracing::{info, warn};

use crate::config::AdminBootstrapConfig;
use crate::content::slug::base_slug;
use crate::entity::{article, category, notification, publication_event, role, role_permission, tag, user};
use crate::utils::hash;

/// Default role-permission mappings seeded on startup.
const DEFAULT_MAPPINGS: &[(&str, &str)] = &[
    // Admin: everything
    ("admin", "article:create"),
    ("admin", "article:edit"),
    ("admin", "article:publish"),
    ("admin", "article:delete"),
    ("admin", "category:manage"),
    ("admin", "tag:manage"),
    ("admin", "media:manage"),
    ("admin", "dashboard:view"),
    // Editor: writes and publishes, cannot delete or restructure categories
    ("editor", "article:create"),
    ("editor", "article:edit"),
    ("editor", "article:publish"),
    ("editor", "tag:manage"),
    ("editor", "media:manage"),
    ("editor", "dashboard:view"),
    // Subscriber: reads and receives notifications only
];

/// (name, description) in display order.
const DEFAULT_CATEGORIES: &[(&str, &str)] = &[
    ("World News", "International news and global events"),
    ("Politics", "Political news and analysis"),
    ("Technology", "Tech news, gadgets, and innovation"),
    ("Business", "Business news and financial markets"),
    ("Sports", "Sports news and coverage"),
    ("Entertainment", "Entertainment news and celebrity gossip"),
    ("Health", "Health and wellness news"),
    ("Science", "Scientific discoveries and research"),
];

const DEFAULT_TAGS: &[&str] = &[
    "Breaking News",
    "Trending",
    "Exclusive",
    "Interview",
    "Opinion",
    "Analysis",
    "Investigation",
    "Climate Change",
    "Economy",
    "Elections",
    "AI & Machine Learning",
    "Cybersecurity",
    "Space Exploration",
];

/// Seed the `role` and `role_permission` tables with defaults.
pub async fn seed_role_permissions(db: &DatabaseConnection) -> Result<(), DbErr> {
    let mut roles_inserted = 0u32;
    for &name in role::BUILTIN {
        let model = role::ActiveModel {
            name: Set(name.to_string()),
        };

        let result = role::Entity::insert(model)
            .on_conflict(OnConflict::column(role::Column::Name).do_nothing().to_owned())
            .exec_without_returning(db)
            .await;

        match result {
            Ok(n) if n > 0 => roles_inserted += 1,
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if roles_inserted > 0 {
        info!("Seeded {} new roles", roles_inserted);
    }

    let mut perms_inserted = 0u32;
    for &(role, permission) in DEFAULT_MAPPINGS {
        let model = role_permission::ActiveModel {
            role: Set(role.to_string()),
            permission: Set(permission.to_string()),
        };

        let result = role_permission::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([role_permission::Column::Role, role_permission::Column::Permission])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match result {
            Ok(n) if n > 0 => perms_inserted += 1,
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if perms_inserted > 0 {
        info!("Seeded {} new role-permission mappings", perms_inserted);
    }

    Ok(())
}

/// Seed starter categories and tags into an empty installation.
///
/// Skipped entirely once any category exists, so deleted defaults stay deleted.
pub async fn seed_taxonomy(db: &DatabaseConnection) -> Result<(), DbErr> {
    if category::Entity::find().count(db).await? > 0 {
        return Ok(());
    }

    let now = Utc::now();
    let categories = DEFAULT_CATEGORIES
        .iter()
        .enumerate()
        .map(|(i, &(name, description))| category::ActiveModel {
            name: Set(name.to_string()),
            slug: Set(base_slug(name, "category")),
            description: Set(Some(description.to_string())),
            display_order: Set(i as i32 + 1),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        });
    category::Entity::insert_many(categories)
        .exec_without_returning(db)
        .await?;

    let tags = DEFAULT_TAGS.iter().map(|&name| tag::ActiveModel {
        name: Set(name.to_string()),
        slug: Set(base_slug(name, "tag")),
        created_at: Set(now),
        ..Default::default()
    });
    tag::Entity::insert_many(tags)
        .on_conflict(OnConflict::column(tag::Column::Slug).do_nothing().to_owned())
        .exec_without_returning(db)
        .await?;

    info!(
        categories = DEFAULT_CATEGORIES.len(),
        tags = DEFAULT_TAGS.len(),
        "Seeded default categories and tags"
    );
    Ok(())
}

/// Create the configured admin account unless a user with that email exists.
pub async fn bootstrap_admin(db: &DatabaseConnection, admin: &AdminBootstrapConfig) -> anyhow::Result<()> {
    let email = admin.email.trim().to_lowercase();
    let exists = user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .count(db)
        .await?
        > 0;
    if exists {
        return Ok(());
    }

    let password = hash::hash_password(&admin.password)
        .map_err(|e| anyhow::anyhow!("Password hash error: {e}"))?;
    user::ActiveModel {
        name: Set(admin.name.clone()),
        email: Set(email.clone()),
        password: Set(password),
        role: Set(role::ADMIN.to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(email = %email, "Created bootstrap admin account");
    Ok(())
}

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync doesn't create composite non-unique indexes,
/// so we create them manually on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    let indexes = [
        // Public listings: WHERE status = ? AND published_at <= ? ORDER BY published_at DESC
        Index::create()
            .if_not_exists()
            .name("idx_article_status_published")
            .table(article::Entity)
            .col(article::Column::Status)
            .col(article::Column::PublishedAt)
            .to_owned(),
        Index::create()
            .if_not_exists()
            .name("idx_article_category")
            .table(article::Entity)
            .col(article::Column::CategoryId)
            .to_owned(),
        // Unread badge: WHERE user_id = ? AND read_at IS NULL
        Index::create()
            .if_not_exists()
            .name("idx_notification_user_read")
            .table(notification::Entity)
            .col(notification::Column::UserId)
            .col(notification::Column::ReadAt)
            .to_owned(),
        // Outbox sweep: WHERE dispatched_at IS NULL AND created_at < ?
        Index::create()
            .if_not_exists()
            .name("idx_publication_event_pending")
            .table(publication_event::Entity)
            .col(publication_event::Column::DispatchedAt)
            .col(publication_event::Column::CreatedAt)
            .to_owned(),
    ];

    let backend = db.get_database_backend();
    for index in &indexes {
        let stmt = render_index(backend, index);
        match db.execute_unprepared(&stmt).await {
            Ok(_) => info!(statement = %stmt, "Ensured index exists"),
            Err(e) => warn!(statement = %stmt, error = %e, "Failed to create index"),
        }
    }

    Ok(())
}

fn render_index(backend: DbBackend, index: &IndexCreateStatement) -> String {
    match backend {
        DbBackend::Sqlite => index.to_string(SqliteQueryBuilder),
        DbBackend::MySql => index.to_string(MysqlQueryBuilder),
        _ => index.to_string(PostgresQueryBuilder),
    }
}
