//! Database row types. These map directly to SQLite rows and stay
//! independent of the docket-types wire models.

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TodoRow {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub due_date: Option<String>,
    pub completed: bool,
    pub owner_id: String,
    pub created_at: String,
}

/// A todo joined with its owner's public fields. The owner columns are
/// optional because the join is a LEFT JOIN.
#[derive(Debug, Clone)]
pub struct TodoOwnerRow {
    pub todo: TodoRow,
    pub owner_username: Option<String>,
    pub owner_email: Option<String>,
}
