/// Stored visual configuration for rendered invoices. The three config
/// groups are JSON text columns; decoding and defaulting happen in
/// `crate::template`.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct InvoiceTemplate {
    pub id: i64,
    pub company_id: i64,
    pub name: String,
    pub is_default: bool,
    pub colors: Option<String>,
    pub fonts: Option<String>,
    pub layout: Option<String>,
}
