use chrono::NaiveDate;
use tempfile::TempDir;

use fatura::db::{Database, ItemInput};
use fatura::models::{Client, Company, Invoice, Service};
use fatura::template::{PartialColorPalette, PartialTemplateConfig, TemplateConfig};

async fn test_db() -> (TempDir, Database) {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite://{}", dir.path().join("test.db").display());
    let db = Database::connect(&url).await.unwrap();
    (dir, db)
}

async fn seed_company(db: &Database, name: &str) -> i64 {
    db.create_company(&Company {
        id: 0,
        name: name.into(),
        email: Some(format!("{}@example.com", name.to_lowercase())),
        phone: None,
        address: None,
        tax_id: None,
        website: None,
    })
    .await
    .unwrap()
}

async fn seed_client(db: &Database, company_id: i64, name: &str) -> i64 {
    db.create_client(&Client {
        id: 0,
        company_id,
        name: name.into(),
        email: Some(format!("{}@client.example", name.to_lowercase())),
        phone: None,
        address: None,
        tax_id: None,
        is_active: true,
    })
    .await
    .unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn draft(company_id: i64, client_id: i64, number: &str, discount: f64, tax: f64) -> Invoice {
    Invoice {
        id: 0,
        company_id,
        client_id,
        template_id: None,
        invoice_number: number.into(),
        title: "Consulting".into(),
        description: None,
        status: "draft".into(),
        issue_date: date(2025, 6, 1),
        due_date: date(2025, 7, 1),
        currency: "BRL".into(),
        subtotal: 0.0,
        discount_percentage: discount,
        discount_amount: 0.0,
        tax_percentage: tax,
        tax_amount: 0.0,
        total_amount: 0.0,
        notes: None,
        sent_at: None,
        paid_at: None,
    }
}

fn item(description: &str, quantity: f64, unit_price: f64) -> ItemInput {
    ItemInput {
        service_id: None,
        description: description.into(),
        quantity,
        unit_price,
    }
}

#[tokio::test]
async fn company_and_client_roundtrip() {
    let (_dir, db) = test_db().await;

    let company_id = seed_company(&db, "Acme").await;
    let client_id = seed_client(&db, company_id, "Globex").await;

    let company = db.get_company(company_id).await.unwrap();
    assert_eq!(company.name, "Acme");

    let clients = db.list_clients(company_id).await.unwrap();
    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0].id, client_id);
    assert!(clients[0].is_active);
}

#[tokio::test]
async fn invoice_numbers_are_sequential_per_company() {
    let (_dir, db) = test_db().await;

    let a = seed_company(&db, "Acme").await;
    let b = seed_company(&db, "Beta").await;
    let client_a = seed_client(&db, a, "ClientA").await;

    assert_eq!(db.next_invoice_number(a).await.unwrap(), "INV-0001");

    db.save_invoice_with_items(&draft(a, client_a, "INV-0001", 0.0, 0.0), &[])
        .await
        .unwrap();
    assert_eq!(db.next_invoice_number(a).await.unwrap(), "INV-0002");

    // The other tenant's sequence is untouched.
    assert_eq!(db.next_invoice_number(b).await.unwrap(), "INV-0001");
}

#[tokio::test]
async fn saved_totals_come_from_the_calculator() {
    let (_dir, db) = test_db().await;

    let company_id = seed_company(&db, "Acme").await;
    let client_id = seed_client(&db, company_id, "Globex").await;

    let id = db
        .save_invoice_with_items(
            &draft(company_id, client_id, "INV-0001", 10.0, 5.0),
            &[item("Design", 3.0, 500.0), item("Development", 2.0, 450.0)],
        )
        .await
        .unwrap();

    let (invoice, items) = db.get_invoice_with_items(id).await.unwrap();
    assert_eq!(invoice.subtotal, 2400.0);
    assert_eq!(invoice.discount_amount, 240.0);
    assert_eq!(invoice.tax_amount, 108.0);
    assert_eq!(invoice.total_amount, 2268.0);

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].line_total, 1500.0);
    assert_eq!(items[1].line_total, 900.0);
    assert_eq!(items[0].sort_order, 0);
}

#[tokio::test]
async fn updating_replaces_items_wholesale() {
    let (_dir, db) = test_db().await;

    let company_id = seed_company(&db, "Acme").await;
    let client_id = seed_client(&db, company_id, "Globex").await;

    let id = db
        .save_invoice_with_items(
            &draft(company_id, client_id, "INV-0001", 0.0, 0.0),
            &[item("Design", 3.0, 500.0), item("Development", 2.0, 450.0)],
        )
        .await
        .unwrap();

    let mut invoice = db.get_invoice(id).await.unwrap();
    invoice.discount_percentage = 0.0;
    invoice.tax_percentage = 0.0;
    db.save_invoice_with_items(&invoice, &[item("Retainer", 1.0, 800.0)])
        .await
        .unwrap();

    let (updated, items) = db.get_invoice_with_items(id).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].description, "Retainer");
    assert_eq!(updated.subtotal, 800.0);
    assert_eq!(updated.total_amount, 800.0);
}

#[tokio::test]
async fn invalid_line_items_are_rejected_before_writing() {
    let (_dir, db) = test_db().await;

    let company_id = seed_company(&db, "Acme").await;
    let client_id = seed_client(&db, company_id, "Globex").await;

    let err = db
        .save_invoice_with_items(
            &draft(company_id, client_id, "INV-0001", 0.0, 0.0),
            &[item("Bad", -1.0, 100.0)],
        )
        .await
        .unwrap_err();
    assert!(err.to_string().contains("quantity"));

    let err = db
        .save_invoice_with_items(
            &draft(company_id, client_id, "INV-0001", 150.0, 0.0),
            &[item("Fine", 1.0, 100.0)],
        )
        .await
        .unwrap_err();
    assert!(err.to_string().contains("discount"));
}

#[tokio::test]
async fn client_deletion_is_blocked_by_invoices() {
    let (_dir, db) = test_db().await;

    let company_id = seed_company(&db, "Acme").await;
    let client_id = seed_client(&db, company_id, "Globex").await;
    db.save_invoice_with_items(&draft(company_id, client_id, "INV-0001", 0.0, 0.0), &[])
        .await
        .unwrap();

    let err = db.delete_client(client_id).await.unwrap_err();
    assert!(err.to_string().contains("invoice"));

    // After the invoice is gone the client can be removed.
    let invoices = db.list_invoices(company_id).await.unwrap();
    db.delete_invoice(invoices[0].id).await.unwrap();
    db.delete_client(client_id).await.unwrap();
    assert!(db.list_clients(company_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn company_deletion_guards() {
    let (_dir, db) = test_db().await;

    let only = seed_company(&db, "Solo").await;
    let err = db.delete_company(only).await.unwrap_err();
    assert!(err.to_string().contains("only company"));

    let second = seed_company(&db, "Beta").await;
    seed_client(&db, second, "Globex").await;
    let err = db.delete_company(second).await.unwrap_err();
    assert!(err.to_string().contains("client"));

    // Now there are two companies and Solo owns nothing.
    db.delete_company(only).await.unwrap();
    assert_eq!(db.list_companies().await.unwrap().len(), 1);
}

#[tokio::test]
async fn at_most_one_default_template() {
    let (_dir, db) = test_db().await;

    let company_id = seed_company(&db, "Acme").await;
    let empty = PartialTemplateConfig::default();
    let first = db.create_template(company_id, "Classic", &empty).await.unwrap();
    let second = db.create_template(company_id, "Modern", &empty).await.unwrap();

    db.set_default_template(company_id, first).await.unwrap();
    db.set_default_template(company_id, second).await.unwrap();

    let templates = db.list_templates(company_id).await.unwrap();
    let defaults: Vec<_> = templates.iter().filter(|t| t.is_default).collect();
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0].id, second);
}

#[tokio::test]
async fn template_resolution_prefers_invoice_then_default() {
    let (_dir, db) = test_db().await;

    let company_id = seed_company(&db, "Acme").await;
    let client_id = seed_client(&db, company_id, "Globex").await;

    let branded = PartialTemplateConfig {
        colors: Some(PartialColorPalette {
            primary: Some("#111111".into()),
            ..Default::default()
        }),
        ..Default::default()
    };
    let default_id = db.create_template(company_id, "Default", &branded).await.unwrap();
    let other_id = db.create_template(company_id, "Other", &PartialTemplateConfig::default()).await.unwrap();
    db.set_default_template(company_id, default_id).await.unwrap();

    let mut invoice = draft(company_id, client_id, "INV-0001", 0.0, 0.0);
    let id = db.save_invoice_with_items(&invoice, &[]).await.unwrap();
    let saved = db.get_invoice(id).await.unwrap();

    let resolved = db.template_for_invoice(&saved).await.unwrap().unwrap();
    assert_eq!(resolved.id, default_id);
    let config = TemplateConfig::from_template(Some(&resolved));
    assert_eq!(config.colors.primary, "#111111");

    invoice.id = id;
    invoice.template_id = Some(other_id);
    db.save_invoice_with_items(&invoice, &[]).await.unwrap();
    let saved = db.get_invoice(id).await.unwrap();
    let resolved = db.template_for_invoice(&saved).await.unwrap().unwrap();
    assert_eq!(resolved.id, other_id);
}

#[tokio::test]
async fn sending_and_paying_stamp_timestamps() {
    let (_dir, db) = test_db().await;

    let company_id = seed_company(&db, "Acme").await;
    let client_id = seed_client(&db, company_id, "Globex").await;
    let id = db
        .save_invoice_with_items(&draft(company_id, client_id, "INV-0001", 0.0, 0.0), &[])
        .await
        .unwrap();

    db.mark_sent(id).await.unwrap();
    let sent = db.get_invoice(id).await.unwrap();
    assert_eq!(sent.status, "sent");
    let first_sent_at = sent.sent_at.unwrap();

    // A resend leaves the original timestamp alone.
    db.mark_sent(id).await.unwrap();
    let resent = db.get_invoice(id).await.unwrap();
    assert_eq!(resent.sent_at.unwrap(), first_sent_at);

    db.mark_paid(id).await.unwrap();
    let paid = db.get_invoice(id).await.unwrap();
    assert_eq!(paid.status, "paid");
    assert!(paid.paid_at.is_some());
}

#[tokio::test]
async fn deleting_an_invoice_removes_its_items() {
    let (_dir, db) = test_db().await;

    let company_id = seed_company(&db, "Acme").await;
    let client_id = seed_client(&db, company_id, "Globex").await;
    let id = db
        .save_invoice_with_items(
            &draft(company_id, client_id, "INV-0001", 0.0, 0.0),
            &[item("Design", 1.0, 100.0)],
        )
        .await
        .unwrap();

    db.delete_invoice(id).await.unwrap();
    assert!(db.get_invoice(id).await.is_err());
    assert!(db.get_items_by_invoice(id).await.unwrap().is_empty());
}

#[tokio::test]
async fn service_catalog_roundtrip() {
    let (_dir, db) = test_db().await;

    let company_id = seed_company(&db, "Acme").await;
    db.create_service(&Service {
        id: 0,
        company_id,
        name: "Consulting hour".into(),
        description: Some("Senior rate".into()),
        unit_price: 150.0,
        is_active: true,
    })
    .await
    .unwrap();

    let services = db.list_services(company_id).await.unwrap();
    assert_eq!(services.len(), 1);
    assert_eq!(services[0].unit_price, 150.0);
}

#[tokio::test]
async fn writes_are_visible_to_the_immediately_following_read() {
    let (_dir, db) = test_db().await;

    let company_id = seed_company(&db, "Acme").await;
    for i in 0..10usize {
        db.create_service(&Service {
            id: 0,
            company_id,
            name: format!("Service {}", i),
            description: None,
            unit_price: 100.0,
            is_active: true,
        })
        .await
        .unwrap();
        // Each insert must be observable on the very next query.
        assert_eq!(db.list_services(company_id).await.unwrap().len(), i + 1);
    }

    let extra = seed_company(&db, "Beta").await;
    db.get_company(extra).await.unwrap();
    db.delete_company(extra).await.unwrap();
}

#[tokio::test]
async fn monthly_revenue_counts_only_paid_invoices() {
    let (_dir, db) = test_db().await;

    let company_id = seed_company(&db, "Acme").await;
    let client_id = seed_client(&db, company_id, "Globex").await;

    let paid = db
        .save_invoice_with_items(
            &draft(company_id, client_id, "INV-0001", 0.0, 0.0),
            &[item("Design", 1.0, 1000.0)],
        )
        .await
        .unwrap();
    db.mark_paid(paid).await.unwrap();

    db.save_invoice_with_items(
        &draft(company_id, client_id, "INV-0002", 0.0, 0.0),
        &[item("Development", 1.0, 500.0)],
    )
    .await
    .unwrap();

    let rows = db.revenue_by_month(company_id).await.unwrap();
    assert_eq!(rows, vec![("2025-06".to_string(), 1000.0)]);

    let counts = db.invoice_counts_by_status(company_id).await.unwrap();
    assert!(counts.contains(&("paid".to_string(), 1)));
    assert!(counts.contains(&("draft".to_string(), 1)));

    let top = db.top_clients(company_id, 5).await.unwrap();
    assert_eq!(top[0].0, "Globex");
    assert_eq!(top[0].1, 1500.0);
}
