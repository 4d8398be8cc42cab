use uuid::Uuid;

/// Row visibility for store queries. `Project` sees the caller's own rows
/// plus public ones; `Insecure` bypasses scoping and is reserved for the
/// periodic loops running under the admin identity.
#[derive(Debug, Clone, Copy)]
pub enum ProjectScope {
  Project(Uuid),
  Insecure,
}

pub fn is_unique_violation(err: &sqlx::Error) -> bool {
  match err {
    sqlx::Error::Database(e) => e.code().as_deref() == Some("23505"),
    _ => false,
  }
}
