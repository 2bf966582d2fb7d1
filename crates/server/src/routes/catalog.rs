use std::collections::BTreeSet;

use axum::{extract::State, routing::get, Json, Router};
use sqlx::SqliteConnection;

use crate::{
    db::models::CatalogItem,
    error::{AppError, Result},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/skills", get(list_skills))
        .route("/techstack", get(list_tech_stacks))
}

/// A reference list that profiles and jobs tag themselves with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Catalog {
    Skill,
    TechStack,
}

impl Catalog {
    fn table(self) -> &'static str {
        match self {
            Catalog::Skill => "skills",
            Catalog::TechStack => "tech_stacks",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Catalog::Skill => "skill",
            Catalog::TechStack => "tech stack",
        }
    }
}

/// Many-to-many table between an owner row and a catalog.
#[derive(Debug, Clone, Copy)]
pub struct Link {
    table: &'static str,
    owner_column: &'static str,
    item_column: &'static str,
    pub catalog: Catalog,
}

pub const PROFILE_SKILLS: Link = Link {
    table: "profile_skills",
    owner_column: "profile_id",
    item_column: "skill_id",
    catalog: Catalog::Skill,
};

pub const PROFILE_TECH_STACK: Link = Link {
    table: "profile_tech_stacks",
    owner_column: "profile_id",
    item_column: "tech_stack_id",
    catalog: Catalog::TechStack,
};

pub const JOB_SKILLS: Link = Link {
    table: "job_skills",
    owner_column: "job_id",
    item_column: "skill_id",
    catalog: Catalog::Skill,
};

pub const JOB_TECH_STACK: Link = Link {
    table: "job_tech_stacks",
    owner_column: "job_id",
    item_column: "tech_stack_id",
    catalog: Catalog::TechStack,
};

async fn list_catalog(conn: &mut SqliteConnection, catalog: Catalog) -> Result<Vec<CatalogItem>> {
    let items = sqlx::query_as::<_, CatalogItem>(&format!(
        "SELECT id, name FROM {} ORDER BY id ASC",
        catalog.table()
    ))
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}

async fn list_skills(State(state): State<AppState>) -> Result<Json<Vec<CatalogItem>>> {
    let mut conn = state.db.pool.acquire().await?;
    Ok(Json(list_catalog(&mut conn, Catalog::Skill).await?))
}

async fn list_tech_stacks(State(state): State<AppState>) -> Result<Json<Vec<CatalogItem>>> {
    let mut conn = state.db.pool.acquire().await?;
    Ok(Json(list_catalog(&mut conn, Catalog::TechStack).await?))
}

/// Checks every id exists in the catalog and returns them deduplicated.
pub async fn validate_ids(
    conn: &mut SqliteConnection,
    catalog: Catalog,
    ids: &[i64],
) -> Result<Vec<i64>> {
    let unique: BTreeSet<i64> = ids.iter().copied().collect();

    for id in &unique {
        let exists = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM {} WHERE id = ?",
            catalog.table()
        ))
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;

        if exists == 0 {
            return Err(AppError::Validation(format!(
                "Invalid {} id \"{id}\" - object does not exist.",
                catalog.label()
            )));
        }
    }

    Ok(unique.into_iter().collect())
}

/// Replaces the owner's whole set. Ids must already be validated.
pub async fn replace_links(
    conn: &mut SqliteConnection,
    link: Link,
    owner_id: &str,
    ids: &[i64],
) -> Result<()> {
    sqlx::query(&format!(
        "DELETE FROM {} WHERE {} = ?",
        link.table, link.owner_column
    ))
    .bind(owner_id)
    .execute(&mut *conn)
    .await?;

    for id in ids {
        sqlx::query(&format!(
            "INSERT INTO {} ({}, {}) VALUES (?, ?)",
            link.table, link.owner_column, link.item_column
        ))
        .bind(owner_id)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

pub async fn load_links(conn: &mut SqliteConnection, link: Link, owner_id: &str) -> Result<Vec<i64>> {
    let ids = sqlx::query_scalar::<_, i64>(&format!(
        "SELECT {} FROM {} WHERE {} = ? ORDER BY {} ASC",
        link.item_column, link.table, link.owner_column, link.item_column
    ))
    .bind(owner_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(ids)
}
