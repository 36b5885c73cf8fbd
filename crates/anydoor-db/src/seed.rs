use sqlx::PgPool;

use crate::DbError;

/// Starter trending rows as `(path, category, count)`, used to populate an
/// empty table so the read endpoint has something to show on day one.
pub const DEFAULT_TRENDING: &[(&str, &str, i64)] = &[
    ("ai/chatgpt", "technology", 156),
    ("food/japanese/sushi", "food", 142),
    ("travel/japan/tokyo", "travel", 138),
    ("movies/sci-fi/interstellar", "entertainment", 125),
    ("music/pop/jay-chou", "music", 118),
    ("games/rpg/genshin-impact", "games", 112),
    ("learning/programming/python", "learning", 108),
    ("health/fitness/yoga", "health", 95),
    ("art/painting/van-gogh", "art", 89),
    ("animals/cats/ragdoll", "animals", 87),
    ("science/astronomy/black-holes", "science", 82),
    ("history/ancient/tang-dynasty", "history", 78),
    ("fashion/street/korean", "fashion", 75),
    ("mind/emotions/meditation", "psychology", 71),
    ("nature/scenery/aurora", "nature", 68),
];

/// Insert [`DEFAULT_TRENDING`] if the trending table is empty.
///
/// Returns the number of rows inserted; `0` when the table already had data.
/// All inserts run inside a single transaction.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_default_trending(pool: &PgPool) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM trending_searches")
        .fetch_one(&mut *tx)
        .await?;
    if existing > 0 {
        tx.rollback().await?;
        return Ok(0);
    }

    let mut inserted = 0usize;
    for &(path, category, count) in DEFAULT_TRENDING {
        let result = sqlx::query(
            "INSERT INTO trending_searches (path, category, count) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (path) DO NOTHING",
        )
        .bind(path)
        .bind(category)
        .bind(count)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    tx.commit().await?;
    Ok(inserted)
}
