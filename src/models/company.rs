#[derive(sqlx::FromRow, Debug, Clone)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub tax_id: Option<String>,
    pub website: Option<String>,
}

impl Company {
    /// Single contact line shown under the company name in rendered documents.
    pub fn contact_line(&self) -> String {
        let mut parts = Vec::new();
        if let Some(email) = &self.email {
            parts.push(email.clone());
        }
        if let Some(phone) = &self.phone {
            parts.push(phone.clone());
        }
        parts.join(" | ")
    }
}
