//! Invoice document rendering.
//!
//! The PDF artifact and the HTML preview are painted from the same
//! [`RenderContext`]: one set of calculator totals, one resolved template
//! config, one conditional-line decision. The two outputs cannot diverge
//! in the values they display.

mod html;
mod pdf;

pub use html::render_html;
pub use pdf::render_pdf;

use chrono::{DateTime, Utc};

use crate::models::{Client, Company, Invoice, InvoiceItem};
use crate::template::TemplateConfig;
use crate::totals::{self, LineInput, Totals};

/// Everything the renderer needs, snapshotted once per render.
pub struct RenderContext<'a> {
    pub invoice: &'a Invoice,
    pub items: &'a [InvoiceItem],
    pub company: &'a Company,
    pub client: Option<&'a Client>,
    pub config: TemplateConfig,
    pub totals: Totals,
    pub generated_at: DateTime<Utc>,
}

impl<'a> RenderContext<'a> {
    pub fn new(
        invoice: &'a Invoice,
        items: &'a [InvoiceItem],
        company: &'a Company,
        client: Option<&'a Client>,
        config: TemplateConfig,
    ) -> Self {
        let inputs: Vec<LineInput> = items.iter().map(LineInput::from).collect();
        let totals = totals::calculate(
            &inputs,
            Some(invoice.discount_percentage),
            Some(invoice.tax_percentage),
        );
        RenderContext {
            invoice,
            items,
            company,
            client,
            config,
            totals,
            generated_at: Utc::now(),
        }
    }

    /// A missing client degrades to a placeholder, never a failed render.
    pub fn client_name(&self) -> &str {
        self.client.map(|c| c.name.as_str()).unwrap_or("(no client on record)")
    }

    pub fn show_discount(&self) -> bool {
        self.totals.discount_amount > 0.0
    }

    pub fn show_tax(&self) -> bool {
        self.totals.tax_amount > 0.0
    }

    /// `invoice-<number-or-id>` stem for artifact filenames.
    pub fn file_stem(&self) -> String {
        if self.invoice.invoice_number.is_empty() {
            format!("invoice-{}", self.invoice.id)
        } else {
            format!("invoice-{}", self.invoice.invoice_number)
        }
    }
}

/// Format a monetary value in the invoice's currency. BRL (the default)
/// uses Brazilian separators; other known currencies get their symbol and
/// anything else falls back to `CODE 1,234.56`.
pub fn format_money(currency: &str, value: f64) -> String {
    match currency {
        "BRL" => format!("R$ {}", group_digits(value, '.', ',')),
        "EUR" => format!("\u{20ac} {}", group_digits(value, '.', ',')),
        "USD" => format!("${}", group_digits(value, ',', '.')),
        other => format!("{} {}", other, group_digits(value, ',', '.')),
    }
}

fn group_digits(value: f64, thousands: char, decimal: char) -> String {
    let negative = value < 0.0;
    let s = format!("{:.2}", value.abs());
    let (int_part, dec_part) = s.split_once('.').unwrap_or((s.as_str(), "00"));

    let mut grouped = String::new();
    let digits: Vec<char> = int_part.chars().collect();
    for (i, ch) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(thousands);
        }
        grouped.push(*ch);
    }

    let sign = if negative { "-" } else { "" };
    format!("{}{}{}{}", sign, grouped, decimal, dec_part)
}

/// Contact block for the from/to columns: name first, then whichever of
/// email, phone, address, and tax id are on record.
pub(crate) fn party_lines(
    name: &str,
    email: Option<&str>,
    phone: Option<&str>,
    address: Option<&str>,
    tax_id: Option<&str>,
) -> Vec<String> {
    let mut lines = vec![name.to_string()];
    lines.extend(email.map(str::to_string));
    lines.extend(phone.map(str::to_string));
    lines.extend(address.map(str::to_string));
    lines.extend(tax_id.map(|t| format!("Tax ID: {}", t)));
    lines
}

/// Greedy word wrap against a fixed character budget. Words longer than
/// the budget are hard-split so a pathological token cannot overflow the
/// column.
pub fn wrap_text(input: &str, max_chars: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in input.split_whitespace() {
        if word.chars().count() > max_chars {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            let mut chunk = String::new();
            for ch in word.chars() {
                if chunk.chars().count() == max_chars {
                    out.push(std::mem::take(&mut chunk));
                }
                chunk.push(ch);
            }
            current = chunk;
            continue;
        }

        if current.is_empty() {
            current.push_str(word);
        } else if current.chars().count() + 1 + word.chars().count() <= max_chars {
            current.push(' ');
            current.push_str(word);
        } else {
            out.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }

    if !current.is_empty() {
        out.push(current);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    pub(super) fn sample_company() -> Company {
        Company {
            id: 1,
            name: "Acme Studio".into(),
            email: Some("hello@acme.example".into()),
            phone: Some("+55 11 99999-0000".into()),
            address: Some("Rua das Flores 100, São Paulo".into()),
            tax_id: Some("12.345.678/0001-00".into()),
            website: None,
        }
    }

    pub(super) fn sample_client() -> Client {
        Client {
            id: 7,
            company_id: 1,
            name: "Vitor Roverso".into(),
            email: Some("vitor@example.com".into()),
            phone: Some("(11) 99999-9172".into()),
            address: Some("Av. Paulista 1000".into()),
            tax_id: None,
            is_active: true,
        }
    }

    pub(super) fn sample_invoice(discount_pct: f64, tax_pct: f64) -> Invoice {
        Invoice {
            id: 42,
            company_id: 1,
            client_id: 7,
            template_id: None,
            invoice_number: "INV-0007".into(),
            title: "Design services".into(),
            description: Some("June engagement".into()),
            status: "draft".into(),
            issue_date: NaiveDate::from_ymd_opt(2025, 6, 13).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2025, 7, 13).unwrap(),
            currency: "BRL".into(),
            subtotal: 0.0,
            discount_percentage: discount_pct,
            discount_amount: 0.0,
            tax_percentage: tax_pct,
            tax_amount: 0.0,
            total_amount: 0.0,
            notes: Some("Payable within 30 days.".into()),
            sent_at: None,
            paid_at: None,
        }
    }

    pub(super) fn sample_items(invoice_id: i64) -> Vec<InvoiceItem> {
        vec![
            InvoiceItem {
                id: 1,
                invoice_id,
                service_id: None,
                description: "Landing page design".into(),
                quantity: 1.0,
                unit_price: 800.0,
                line_total: 800.0,
                sort_order: 0,
            },
            InvoiceItem {
                id: 2,
                invoice_id,
                service_id: None,
                description: "Component library".into(),
                quantity: 2.0,
                unit_price: 800.0,
                line_total: 1600.0,
                sort_order: 1,
            },
        ]
    }

    #[test]
    fn context_totals_come_from_the_calculator() {
        let invoice = sample_invoice(10.0, 5.0);
        let items = sample_items(invoice.id);
        let company = sample_company();
        let client = sample_client();
        let ctx = RenderContext::new(
            &invoice,
            &items,
            &company,
            Some(&client),
            TemplateConfig::default(),
        );
        assert_eq!(ctx.totals.subtotal, 2400.0);
        assert_eq!(ctx.totals.discount_amount, 240.0);
        assert_eq!(ctx.totals.tax_amount, 108.0);
        assert_eq!(ctx.totals.total, 2268.0);
        assert!(ctx.show_discount());
        assert!(ctx.show_tax());
        assert_eq!(ctx.file_stem(), "invoice-INV-0007");
    }

    #[test]
    fn zero_percentages_hide_the_conditional_lines() {
        let invoice = sample_invoice(0.0, 0.0);
        let items = sample_items(invoice.id);
        let company = sample_company();
        let ctx = RenderContext::new(&invoice, &items, &company, None, TemplateConfig::default());
        assert!(!ctx.show_discount());
        assert!(!ctx.show_tax());
        assert_eq!(ctx.client_name(), "(no client on record)");
    }

    #[test]
    fn money_formatting_by_currency() {
        assert_eq!(format_money("BRL", 2400.0), "R$ 2.400,00");
        assert_eq!(format_money("USD", 1234567.89), "$1,234,567.89");
        assert_eq!(format_money("EUR", 0.5), "\u{20ac} 0,50");
        assert_eq!(format_money("GBP", -12.0), "GBP -12.00");
    }

    #[test]
    fn wrap_respects_the_character_budget() {
        let lines = wrap_text("one two three four five six seven", 9);
        assert!(lines.iter().all(|l| l.chars().count() <= 9));
        assert_eq!(lines.join(" "), "one two three four five six seven");
    }

    #[test]
    fn wrap_splits_oversized_words() {
        let lines = wrap_text("abcdefghijklmnop", 5);
        assert!(lines.iter().all(|l| l.chars().count() <= 5));
        assert_eq!(lines.concat(), "abcdefghijklmnop");
    }
}
