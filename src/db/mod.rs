use std::str::FromStr;

use anyhow::Result;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::config::Config;
use crate::error::DomainError;
use crate::models::{Client, Company, Invoice, InvoiceItem, InvoiceTemplate, Service};
use crate::template::{encode_group, PartialTemplateConfig};
use crate::totals::{self, LineInput};

/// One billable line as supplied by the caller; line totals and invoice
/// totals are computed here, by the calculator, before anything is written.
#[derive(Debug, Clone)]
pub struct ItemInput {
    pub service_id: Option<i64>,
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
}

/// Database connection pool
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new Database instance with a connection pool and run the
    /// embedded migrations.
    pub async fn new(config: &Config) -> Result<Self> {
        Self::connect(config.database_url()).await
    }

    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        // A single connection serializes access; with more, a write committed
        // on one pooled connection is not always visible to a read issued
        // immediately on another.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        sqlx::migrate!().run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // Company operations

    pub async fn create_company(&self, company: &Company) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO companies (name, email, phone, address, tax_id, website)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&company.name)
        .bind(&company.email)
        .bind(&company.phone)
        .bind(&company.address)
        .bind(&company.tax_id)
        .bind(&company.website)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    pub async fn get_company(&self, id: i64) -> Result<Company> {
        let company = sqlx::query_as::<_, Company>(
            "SELECT id, name, email, phone, address, tax_id, website FROM companies WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DomainError::NotFound {
            entity: "company",
            id,
        })?;

        Ok(company)
    }

    pub async fn list_companies(&self) -> Result<Vec<Company>> {
        let companies = sqlx::query_as::<_, Company>(
            "SELECT id, name, email, phone, address, tax_id, website FROM companies ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(companies)
    }

    /// Delete a tenant. Blocked while it still owns clients or invoices,
    /// and always blocked when it is the last company left.
    pub async fn delete_company(&self, id: i64) -> Result<()> {
        self.get_company(id).await?;

        let client_count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM clients WHERE company_id = ?",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        let invoice_count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM invoices WHERE company_id = ?",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        if client_count > 0 || invoice_count > 0 {
            return Err(DomainError::DeletionBlocked {
                entity: "company",
                id,
                reason: format!(
                    "{} client(s) and {} invoice(s) still belong to it",
                    client_count, invoice_count
                ),
            }
            .into());
        }

        let other_companies = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM companies WHERE id != ?",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        if other_companies == 0 {
            return Err(DomainError::DeletionBlocked {
                entity: "company",
                id,
                reason: "it is the only company; create another one first".into(),
            }
            .into());
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM invoice_templates WHERE company_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM services WHERE company_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM companies WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(())
    }

    // Client operations

    pub async fn create_client(&self, client: &Client) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO clients (company_id, name, email, phone, address, tax_id, is_active)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(client.company_id)
        .bind(&client.name)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(&client.address)
        .bind(&client.tax_id)
        .bind(client.is_active)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    pub async fn get_client(&self, id: i64) -> Result<Client> {
        let client = sqlx::query_as::<_, Client>(
            r#"
            SELECT id, company_id, name, email, phone, address, tax_id, is_active
            FROM clients WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DomainError::NotFound {
            entity: "client",
            id,
        })?;

        Ok(client)
    }

    pub async fn list_clients(&self, company_id: i64) -> Result<Vec<Client>> {
        let clients = sqlx::query_as::<_, Client>(
            r#"
            SELECT id, company_id, name, email, phone, address, tax_id, is_active
            FROM clients WHERE company_id = ? ORDER BY name ASC
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(clients)
    }

    /// Delete a client. Blocked while any invoice still references it.
    pub async fn delete_client(&self, id: i64) -> Result<()> {
        self.get_client(id).await?;

        let invoice_count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM invoices WHERE client_id = ?",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        if invoice_count > 0 {
            return Err(DomainError::DeletionBlocked {
                entity: "client",
                id,
                reason: format!("{} invoice(s) still reference it", invoice_count),
            }
            .into());
        }

        sqlx::query("DELETE FROM clients WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // Service catalog operations

    pub async fn create_service(&self, service: &Service) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO services (company_id, name, description, unit_price, is_active)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(service.company_id)
        .bind(&service.name)
        .bind(&service.description)
        .bind(service.unit_price)
        .bind(service.is_active)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    pub async fn list_services(&self, company_id: i64) -> Result<Vec<Service>> {
        let services = sqlx::query_as::<_, Service>(
            r#"
            SELECT id, company_id, name, description, unit_price, is_active
            FROM services WHERE company_id = ? ORDER BY name ASC
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(services)
    }

    // Template operations

    /// Store a template. Config groups are serialized exactly once; the
    /// columns always hold plain JSON text.
    pub async fn create_template(
        &self,
        company_id: i64,
        name: &str,
        config: &PartialTemplateConfig,
    ) -> Result<i64> {
        let colors = config.colors.as_ref().map(encode_group).transpose()?;
        let fonts = config.fonts.as_ref().map(encode_group).transpose()?;
        let layout = config.layout.as_ref().map(encode_group).transpose()?;

        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO invoice_templates (company_id, name, is_default, colors, fonts, layout)
            VALUES (?, ?, 0, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(company_id)
        .bind(name)
        .bind(colors)
        .bind(fonts)
        .bind(layout)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    pub async fn get_template(&self, id: i64) -> Result<InvoiceTemplate> {
        let template = sqlx::query_as::<_, InvoiceTemplate>(
            r#"
            SELECT id, company_id, name, is_default, colors, fonts, layout
            FROM invoice_templates WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DomainError::NotFound {
            entity: "template",
            id,
        })?;

        Ok(template)
    }

    pub async fn list_templates(&self, company_id: i64) -> Result<Vec<InvoiceTemplate>> {
        let templates = sqlx::query_as::<_, InvoiceTemplate>(
            r#"
            SELECT id, company_id, name, is_default, colors, fonts, layout
            FROM invoice_templates WHERE company_id = ? ORDER BY name ASC
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(templates)
    }

    /// Make one template the company default, clearing the previous default
    /// in the same transaction so at most one ever holds the flag.
    pub async fn set_default_template(&self, company_id: i64, template_id: i64) -> Result<()> {
        let template = self.get_template(template_id).await?;
        if template.company_id != company_id {
            return Err(DomainError::NotFound {
                entity: "template",
                id: template_id,
            }
            .into());
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE invoice_templates SET is_default = 0 WHERE company_id = ?")
            .bind(company_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE invoice_templates SET is_default = 1 WHERE id = ?")
            .bind(template_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(())
    }

    /// Template the renderer should use for an invoice: the invoice's own
    /// template if set, else the company default, else none.
    pub async fn template_for_invoice(&self, invoice: &Invoice) -> Result<Option<InvoiceTemplate>> {
        if let Some(template_id) = invoice.template_id {
            return Ok(Some(self.get_template(template_id).await?));
        }

        let default = sqlx::query_as::<_, InvoiceTemplate>(
            r#"
            SELECT id, company_id, name, is_default, colors, fonts, layout
            FROM invoice_templates WHERE company_id = ? AND is_default = 1
            "#,
        )
        .bind(invoice.company_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(default)
    }

    // Invoice operations

    /// Next number in the per-company `INV-NNNN` sequence.
    pub async fn next_invoice_number(&self, company_id: i64) -> Result<String> {
        let last = sqlx::query_scalar::<_, String>(
            r#"
            SELECT invoice_number FROM invoices
            WHERE company_id = ? ORDER BY id DESC LIMIT 1
            "#,
        )
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?;

        let next = match last
            .as_deref()
            .and_then(|n| n.rsplit('-').next())
            .and_then(|n| n.parse::<u32>().ok())
        {
            Some(n) => n + 1,
            None => 1,
        };

        Ok(format!("INV-{:04}", next))
    }

    /// Insert or update an invoice together with its line items. Items are
    /// replaced wholesale; every money field is recomputed from the inputs
    /// by the financial calculator before writing.
    pub async fn save_invoice_with_items(
        &self,
        invoice: &Invoice,
        items: &[ItemInput],
    ) -> Result<i64> {
        let lines: Vec<LineInput> = items
            .iter()
            .map(|i| LineInput {
                quantity: i.quantity,
                unit_price: i.unit_price,
            })
            .collect();
        totals::validate(
            &lines,
            Some(invoice.discount_percentage),
            Some(invoice.tax_percentage),
        )?;
        let totals = totals::calculate(
            &lines,
            Some(invoice.discount_percentage),
            Some(invoice.tax_percentage),
        );

        let mut tx = self.pool.begin().await?;

        let invoice_id = if invoice.id == 0 {
            sqlx::query_scalar::<_, i64>(
                r#"
                INSERT INTO invoices (
                    company_id, client_id, template_id, invoice_number, title, description,
                    status, issue_date, due_date, currency,
                    subtotal, discount_percentage, discount_amount,
                    tax_percentage, tax_amount, total_amount, notes
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                RETURNING id
                "#,
            )
            .bind(invoice.company_id)
            .bind(invoice.client_id)
            .bind(invoice.template_id)
            .bind(&invoice.invoice_number)
            .bind(&invoice.title)
            .bind(&invoice.description)
            .bind(&invoice.status)
            .bind(invoice.issue_date)
            .bind(invoice.due_date)
            .bind(&invoice.currency)
            .bind(totals.subtotal)
            .bind(invoice.discount_percentage)
            .bind(totals.discount_amount)
            .bind(invoice.tax_percentage)
            .bind(totals.tax_amount)
            .bind(totals.total)
            .bind(&invoice.notes)
            .fetch_one(&mut *tx)
            .await?
        } else {
            sqlx::query(
                r#"
                UPDATE invoices SET
                    client_id = ?, template_id = ?, title = ?, description = ?,
                    issue_date = ?, due_date = ?, currency = ?,
                    subtotal = ?, discount_percentage = ?, discount_amount = ?,
                    tax_percentage = ?, tax_amount = ?, total_amount = ?, notes = ?
                WHERE id = ?
                "#,
            )
            .bind(invoice.client_id)
            .bind(invoice.template_id)
            .bind(&invoice.title)
            .bind(&invoice.description)
            .bind(invoice.issue_date)
            .bind(invoice.due_date)
            .bind(&invoice.currency)
            .bind(totals.subtotal)
            .bind(invoice.discount_percentage)
            .bind(totals.discount_amount)
            .bind(invoice.tax_percentage)
            .bind(totals.tax_amount)
            .bind(totals.total)
            .bind(&invoice.notes)
            .bind(invoice.id)
            .execute(&mut *tx)
            .await?;

            sqlx::query("DELETE FROM invoice_items WHERE invoice_id = ?")
                .bind(invoice.id)
                .execute(&mut *tx)
                .await?;

            invoice.id
        };

        for (sort_order, item) in items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO invoice_items (invoice_id, service_id, description, quantity, unit_price, line_total, sort_order)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(invoice_id)
            .bind(item.service_id)
            .bind(&item.description)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(totals::line_total(item.quantity, item.unit_price))
            .bind(sort_order as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(invoice_id)
    }

    pub async fn get_invoice(&self, id: i64) -> Result<Invoice> {
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT id, company_id, client_id, template_id, invoice_number, title, description,
                   status, issue_date, due_date, currency,
                   subtotal, discount_percentage, discount_amount,
                   tax_percentage, tax_amount, total_amount, notes, sent_at, paid_at
            FROM invoices WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DomainError::NotFound {
            entity: "invoice",
            id,
        })?;

        Ok(invoice)
    }

    pub async fn list_invoices(&self, company_id: i64) -> Result<Vec<Invoice>> {
        let invoices = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT id, company_id, client_id, template_id, invoice_number, title, description,
                   status, issue_date, due_date, currency,
                   subtotal, discount_percentage, discount_amount,
                   tax_percentage, tax_amount, total_amount, notes, sent_at, paid_at
            FROM invoices WHERE company_id = ? ORDER BY issue_date DESC, id DESC
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(invoices)
    }

    pub async fn get_items_by_invoice(&self, invoice_id: i64) -> Result<Vec<InvoiceItem>> {
        let items = sqlx::query_as::<_, InvoiceItem>(
            r#"
            SELECT id, invoice_id, service_id, description, quantity, unit_price, line_total, sort_order
            FROM invoice_items WHERE invoice_id = ? ORDER BY sort_order ASC, id ASC
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    pub async fn get_invoice_with_items(&self, id: i64) -> Result<(Invoice, Vec<InvoiceItem>)> {
        let invoice = self.get_invoice(id).await?;
        let items = self.get_items_by_invoice(id).await?;
        Ok((invoice, items))
    }

    /// Stamp a draft invoice as sent after successful delivery. Later sends
    /// of the same invoice leave the status untouched.
    pub async fn mark_sent(&self, id: i64) -> Result<()> {
        sqlx::query(
            "UPDATE invoices SET status = 'sent', sent_at = ? WHERE id = ? AND status = 'draft'",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn mark_paid(&self, id: i64) -> Result<()> {
        self.get_invoice(id).await?;
        sqlx::query("UPDATE invoices SET status = 'paid', paid_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn delete_invoice(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM invoice_items WHERE invoice_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM invoices WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(())
    }

    // Report queries

    /// Paid revenue grouped by issue month (`YYYY-MM`).
    pub async fn revenue_by_month(&self, company_id: i64) -> Result<Vec<(String, f64)>> {
        let rows = sqlx::query_as::<_, (String, f64)>(
            r#"
            SELECT strftime('%Y-%m', issue_date) AS month, SUM(total_amount)
            FROM invoices
            WHERE company_id = ? AND status = 'paid'
            GROUP BY month ORDER BY month ASC
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn invoice_counts_by_status(&self, company_id: i64) -> Result<Vec<(String, i64)>> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT status, COUNT(*) FROM invoices
            WHERE company_id = ? GROUP BY status ORDER BY status ASC
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn top_clients(&self, company_id: i64, limit: i64) -> Result<Vec<(String, f64)>> {
        let rows = sqlx::query_as::<_, (String, f64)>(
            r#"
            SELECT c.name, SUM(i.total_amount) AS billed
            FROM invoices i JOIN clients c ON c.id = i.client_id
            WHERE i.company_id = ?
            GROUP BY c.id ORDER BY billed DESC LIMIT ?
            "#,
        )
        .bind(company_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

/// Initialize the database connection pool
pub async fn init(config: &Config) -> Result<Database> {
    let db = Database::new(config).await?;
    Ok(db)
}
