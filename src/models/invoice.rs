use chrono::{DateTime, NaiveDate, Utc};

/// Stored invoice lifecycle states. `Overdue` is never written to the
/// database; it is derived at read time from the due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Cancelled,
    Overdue,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Cancelled => "cancelled",
            InvoiceStatus::Overdue => "overdue",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "sent" => InvoiceStatus::Sent,
            "paid" => InvoiceStatus::Paid,
            "cancelled" => InvoiceStatus::Cancelled,
            "overdue" => InvoiceStatus::Overdue,
            _ => InvoiceStatus::Draft,
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct Invoice {
    pub id: i64,
    pub company_id: i64,
    pub client_id: i64,
    pub template_id: Option<i64>,
    pub invoice_number: String,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub currency: String,
    pub subtotal: f64,
    pub discount_percentage: f64,
    pub discount_amount: f64,
    pub tax_percentage: f64,
    pub tax_amount: f64,
    pub total_amount: f64,
    pub notes: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl Invoice {
    pub fn status(&self) -> InvoiceStatus {
        InvoiceStatus::from_str(&self.status)
    }

    /// Status as it should be shown: sent invoices past their due date read
    /// as overdue even though the stored status is unchanged. A draft was
    /// never delivered, so it cannot be late.
    pub fn effective_status(&self, today: NaiveDate) -> InvoiceStatus {
        match self.status() {
            InvoiceStatus::Sent if today > self.due_date => InvoiceStatus::Overdue,
            s => s,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample(status: &str, due: NaiveDate) -> Invoice {
        Invoice {
            id: 1,
            company_id: 1,
            client_id: 1,
            template_id: None,
            invoice_number: "INV-0001".into(),
            title: "Services".into(),
            description: None,
            status: status.into(),
            issue_date: date(2025, 6, 1),
            due_date: due,
            currency: "BRL".into(),
            subtotal: 0.0,
            discount_percentage: 0.0,
            discount_amount: 0.0,
            tax_percentage: 0.0,
            tax_amount: 0.0,
            total_amount: 0.0,
            notes: None,
            sent_at: None,
            paid_at: None,
        }
    }

    #[test]
    fn sent_past_due_reads_as_overdue() {
        let inv = sample("sent", date(2025, 6, 15));
        assert_eq!(inv.effective_status(date(2025, 6, 16)), InvoiceStatus::Overdue);
        assert_eq!(inv.effective_status(date(2025, 6, 15)), InvoiceStatus::Sent);
    }

    #[test]
    fn drafts_never_turn_overdue() {
        let inv = sample("draft", date(2025, 6, 15));
        assert_eq!(inv.effective_status(date(2025, 7, 1)), InvoiceStatus::Draft);
    }

    #[test]
    fn paid_and_cancelled_never_turn_overdue() {
        let paid = sample("paid", date(2025, 6, 15));
        assert_eq!(paid.effective_status(date(2025, 7, 1)), InvoiceStatus::Paid);

        let cancelled = sample("cancelled", date(2025, 6, 15));
        assert_eq!(cancelled.effective_status(date(2025, 7, 1)), InvoiceStatus::Cancelled);
    }
}
