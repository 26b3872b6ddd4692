use std::future::Future;

use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum SlugError {
    #[error("title produces an empty slug")]
    Empty,

    #[error("slug lookup failed")]
    Query(#[from] sqlx::Error),
}

pub trait SlugIndex {
    /// Whether a live row other than `exclude` already uses `slug`.
    fn slug_exists(
        &self,
        slug: &str,
        exclude: Option<Uuid>,
    ) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;
}

#[must_use]
pub fn slugify(title: &str) -> String {
    deunicode::deunicode(title)
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Append `-1`, `-2`, ... until no live row other than `exclude` holds the slug.
pub async fn generate_slug<I>(
    index: &I,
    raw_title: &str,
    exclude: Option<Uuid>,
) -> Result<String, SlugError>
where
    I: SlugIndex + ?Sized,
{
    let base = slugify(raw_title);
    if base.is_empty() {
        return Err(SlugError::Empty);
    }

    if !index.slug_exists(&base, exclude).await? {
        return Ok(base);
    }

    let mut suffix: u64 = 1;
    loop {
        let candidate = format!("{base}-{suffix}");
        if !index.slug_exists(&candidate, exclude).await? {
            tracing::debug!(slug = %candidate, "Resolved slug collision");
            return Ok(candidate);
        }
        suffix += 1;
    }
}
