#[derive(sqlx::FromRow, Debug, Clone)]
pub struct Service {
    pub id: i64,
    pub company_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub unit_price: f64,
    pub is_active: bool,
}
