use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{Duration, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing::info;

use fatura::config;
use fatura::db::{self, Database, ItemInput};
use fatura::email::Mailer;
use fatura::models::{Client, Company, Invoice, Service};
use fatura::render::{format_money, render_html, render_pdf, RenderContext};
use fatura::template::{PartialTemplateConfig, TemplateConfig};

#[derive(Parser, Debug)]
#[command(name = "fatura", about = "Multi-tenant invoice management")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(subcommand)]
    Company(CompanyCommand),
    #[command(subcommand)]
    Client(ClientCommand),
    #[command(subcommand)]
    Service(ServiceCommand),
    #[command(subcommand)]
    Template(TemplateCommand),
    #[command(subcommand)]
    Invoice(InvoiceCommand),
    #[command(subcommand)]
    Report(ReportCommand),
}

#[derive(Subcommand, Debug)]
enum CompanyCommand {
    /// Register a new company (tenant)
    Add {
        name: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        tax_id: Option<String>,
        #[arg(long)]
        website: Option<String>,
    },
    List,
    /// Delete a company; refused while clients or invoices still belong to it
    Delete { id: i64 },
}

#[derive(Subcommand, Debug)]
enum ClientCommand {
    Add {
        #[arg(long)]
        company: i64,
        name: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        tax_id: Option<String>,
    },
    List {
        #[arg(long)]
        company: i64,
    },
    /// Delete a client; refused while invoices still reference it
    Delete { id: i64 },
}

#[derive(Subcommand, Debug)]
enum ServiceCommand {
    Add {
        #[arg(long)]
        company: i64,
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        price: f64,
    },
    List {
        #[arg(long)]
        company: i64,
    },
}

#[derive(Subcommand, Debug)]
enum TemplateCommand {
    /// Create a template; each group is a JSON object of overrides
    Add {
        #[arg(long)]
        company: i64,
        name: String,
        #[arg(long)]
        colors: Option<String>,
        #[arg(long)]
        fonts: Option<String>,
        #[arg(long)]
        layout: Option<String>,
    },
    List {
        #[arg(long)]
        company: i64,
    },
    SetDefault {
        #[arg(long)]
        company: i64,
        id: i64,
    },
    /// Print the fully resolved configuration a template renders with
    Show { id: i64 },
}

#[derive(Subcommand, Debug)]
enum InvoiceCommand {
    /// Create a draft invoice. Items are `qty:unit_price:description`;
    /// discount and tax are percentages of 0 to 100.
    Create {
        #[arg(long)]
        company: i64,
        #[arg(long)]
        client: i64,
        #[arg(long)]
        template: Option<i64>,
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        issue_date: Option<NaiveDate>,
        #[arg(long)]
        due_date: Option<NaiveDate>,
        #[arg(long, default_value = "BRL")]
        currency: String,
        #[arg(long, default_value_t = 0.0)]
        discount: f64,
        #[arg(long, default_value_t = 0.0)]
        tax: f64,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long = "item")]
        items: Vec<String>,
    },
    List {
        #[arg(long)]
        company: i64,
    },
    Show { id: i64 },
    /// Render the invoice PDF and its HTML preview into the configured
    /// output directory
    Render { id: i64 },
    /// Email the invoice PDF to the client; a draft becomes sent on success
    Send { id: i64 },
    MarkPaid { id: i64 },
    Delete { id: i64 },
}

#[derive(Subcommand, Debug)]
enum ReportCommand {
    /// Invoice counts per status
    Summary {
        #[arg(long)]
        company: i64,
    },
    /// Paid revenue per issue month
    Monthly {
        #[arg(long)]
        company: i64,
    },
    /// Clients ranked by total billed
    TopClients {
        #[arg(long)]
        company: i64,
        #[arg(long, default_value_t = 10)]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fatura=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = config::init()?;
    let db = db::init(&config).await?;

    match cli.command {
        Command::Company(cmd) => run_company(&db, cmd).await,
        Command::Client(cmd) => run_client(&db, cmd).await,
        Command::Service(cmd) => run_service(&db, cmd).await,
        Command::Template(cmd) => run_template(&db, cmd).await,
        Command::Invoice(cmd) => run_invoice(&db, &config, cmd).await,
        Command::Report(cmd) => run_report(&db, cmd).await,
    }
}

async fn run_company(db: &Database, cmd: CompanyCommand) -> Result<()> {
    match cmd {
        CompanyCommand::Add {
            name,
            email,
            phone,
            address,
            tax_id,
            website,
        } => {
            let company = Company {
                id: 0,
                name,
                email,
                phone,
                address,
                tax_id,
                website,
            };
            let id = db.create_company(&company).await?;
            println!("Created company {} ({})", company.name, id);
        }
        CompanyCommand::List => {
            for company in db.list_companies().await? {
                println!("{:>4}  {}", company.id, company.name);
            }
        }
        CompanyCommand::Delete { id } => {
            db.delete_company(id).await?;
            println!("Deleted company {}", id);
        }
    }
    Ok(())
}

async fn run_client(db: &Database, cmd: ClientCommand) -> Result<()> {
    match cmd {
        ClientCommand::Add {
            company,
            name,
            email,
            phone,
            address,
            tax_id,
        } => {
            db.get_company(company).await?;
            let client = Client {
                id: 0,
                company_id: company,
                name,
                email,
                phone,
                address,
                tax_id,
                is_active: true,
            };
            let id = db.create_client(&client).await?;
            println!("Created client {} ({})", client.name, id);
        }
        ClientCommand::List { company } => {
            for client in db.list_clients(company).await? {
                println!(
                    "{:>4}  {}  {}",
                    client.id,
                    client.name,
                    client.email.as_deref().unwrap_or("-")
                );
            }
        }
        ClientCommand::Delete { id } => {
            db.delete_client(id).await?;
            println!("Deleted client {}", id);
        }
    }
    Ok(())
}

async fn run_service(db: &Database, cmd: ServiceCommand) -> Result<()> {
    match cmd {
        ServiceCommand::Add {
            company,
            name,
            description,
            price,
        } => {
            db.get_company(company).await?;
            let service = Service {
                id: 0,
                company_id: company,
                name,
                description,
                unit_price: price,
                is_active: true,
            };
            let id = db.create_service(&service).await?;
            println!("Created service {} ({})", service.name, id);
        }
        ServiceCommand::List { company } => {
            for service in db.list_services(company).await? {
                println!("{:>4}  {}  {:.2}", service.id, service.name, service.unit_price);
            }
        }
    }
    Ok(())
}

async fn run_template(db: &Database, cmd: TemplateCommand) -> Result<()> {
    match cmd {
        TemplateCommand::Add {
            company,
            name,
            colors,
            fonts,
            layout,
        } => {
            db.get_company(company).await?;
            let partial = PartialTemplateConfig {
                colors: colors
                    .as_deref()
                    .map(serde_json::from_str)
                    .transpose()
                    .context("invalid --colors JSON")?,
                fonts: fonts
                    .as_deref()
                    .map(serde_json::from_str)
                    .transpose()
                    .context("invalid --fonts JSON")?,
                layout: layout
                    .as_deref()
                    .map(serde_json::from_str)
                    .transpose()
                    .context("invalid --layout JSON")?,
            };
            let id = db.create_template(company, &name, &partial).await?;
            println!("Created template {} ({})", name, id);
        }
        TemplateCommand::List { company } => {
            for template in db.list_templates(company).await? {
                let marker = if template.is_default { "*" } else { " " };
                println!("{:>4} {} {}", template.id, marker, template.name);
            }
        }
        TemplateCommand::SetDefault { company, id } => {
            db.set_default_template(company, id).await?;
            println!("Template {} is now the default", id);
        }
        TemplateCommand::Show { id } => {
            let template = db.get_template(id).await?;
            let resolved = TemplateConfig::from_template(Some(&template));
            println!("{}", serde_json::to_string_pretty(&resolved)?);
        }
    }
    Ok(())
}

/// Parse one `--item` argument of the form `qty:unit_price:description`.
fn parse_item(raw: &str) -> Result<ItemInput> {
    let mut parts = raw.splitn(3, ':');
    let (qty, price, description) = match (parts.next(), parts.next(), parts.next()) {
        (Some(q), Some(p), Some(d)) if !d.is_empty() => (q, p, d),
        _ => bail!("expected qty:unit_price:description, got {:?}", raw),
    };
    Ok(ItemInput {
        service_id: None,
        description: description.to_string(),
        quantity: qty.parse().with_context(|| format!("invalid quantity {:?}", qty))?,
        unit_price: price.parse().with_context(|| format!("invalid unit price {:?}", price))?,
    })
}

async fn run_invoice(db: &Database, config: &config::Config, cmd: InvoiceCommand) -> Result<()> {
    match cmd {
        InvoiceCommand::Create {
            company,
            client,
            template,
            title,
            description,
            issue_date,
            due_date,
            currency,
            discount,
            tax,
            notes,
            items,
        } => {
            db.get_company(company).await?;
            let client_row = db.get_client(client).await?;
            if client_row.company_id != company {
                bail!("client {} does not belong to company {}", client, company);
            }

            let item_inputs = items
                .iter()
                .map(|raw| parse_item(raw))
                .collect::<Result<Vec<_>>>()?;

            let today = Utc::now().date_naive();
            let issue = issue_date.unwrap_or(today);
            let invoice = Invoice {
                id: 0,
                company_id: company,
                client_id: client,
                template_id: template,
                invoice_number: db.next_invoice_number(company).await?,
                title,
                description,
                status: "draft".into(),
                issue_date: issue,
                due_date: due_date.unwrap_or(issue + Duration::days(30)),
                currency,
                subtotal: 0.0,
                discount_percentage: discount,
                discount_amount: 0.0,
                tax_percentage: tax,
                tax_amount: 0.0,
                total_amount: 0.0,
                notes,
                sent_at: None,
                paid_at: None,
            };

            let id = db.save_invoice_with_items(&invoice, &item_inputs).await?;
            let saved = db.get_invoice(id).await?;
            println!(
                "Created invoice {} ({}) totaling {}",
                saved.invoice_number,
                id,
                format_money(&saved.currency, saved.total_amount)
            );
        }
        InvoiceCommand::List { company } => {
            let today = Utc::now().date_naive();
            for invoice in db.list_invoices(company).await? {
                println!(
                    "{:>4}  {}  {:<9}  {}  {}",
                    invoice.id,
                    invoice.invoice_number,
                    invoice.effective_status(today).as_str(),
                    invoice.due_date,
                    format_money(&invoice.currency, invoice.total_amount)
                );
            }
        }
        InvoiceCommand::Show { id } => {
            let (invoice, items) = db.get_invoice_with_items(id).await?;
            let today = Utc::now().date_naive();
            println!("{}  {}", invoice.invoice_number, invoice.title);
            println!("Status: {}", invoice.effective_status(today).as_str());
            println!("Issued: {}  Due: {}", invoice.issue_date, invoice.due_date);
            for item in &items {
                println!(
                    "  {:<40} {:>8.2} x {:>12} = {}",
                    item.description,
                    item.quantity,
                    format_money(&invoice.currency, item.unit_price),
                    format_money(&invoice.currency, item.line_total)
                );
            }
            println!("Subtotal: {}", format_money(&invoice.currency, invoice.subtotal));
            if invoice.discount_amount > 0.0 {
                println!(
                    "Discount ({}%): -{}",
                    invoice.discount_percentage,
                    format_money(&invoice.currency, invoice.discount_amount)
                );
            }
            if invoice.tax_amount > 0.0 {
                println!(
                    "Tax ({}%): {}",
                    invoice.tax_percentage,
                    format_money(&invoice.currency, invoice.tax_amount)
                );
            }
            println!("Total: {}", format_money(&invoice.currency, invoice.total_amount));
        }
        InvoiceCommand::Render { id } => {
            let (invoice, items) = db.get_invoice_with_items(id).await?;
            let company = db.get_company(invoice.company_id).await?;
            let client = db.get_client(invoice.client_id).await.ok();
            let template = db.template_for_invoice(&invoice).await?;
            let template_config = TemplateConfig::from_template(template.as_ref());

            let ctx = RenderContext::new(&invoice, &items, &company, client.as_ref(), template_config);

            fs::create_dir_all(&config.output_dir)?;
            let pdf = render_pdf(&ctx)?;
            let pdf_path = Path::new(&config.output_dir).join(format!("{}.pdf", ctx.file_stem()));
            fs::write(&pdf_path, pdf)?;
            println!("Wrote {}", pdf_path.display());

            let html_path =
                Path::new(&config.output_dir).join(format!("{}.html", ctx.file_stem()));
            fs::write(&html_path, render_html(&ctx))?;
            println!("Wrote {}", html_path.display());
        }
        InvoiceCommand::Send { id } => {
            let (invoice, items) = db.get_invoice_with_items(id).await?;
            let company = db.get_company(invoice.company_id).await?;
            let client = db.get_client(invoice.client_id).await?;
            let template = db.template_for_invoice(&invoice).await?;
            let template_config = TemplateConfig::from_template(template.as_ref());

            let ctx = RenderContext::new(&invoice, &items, &company, Some(&client), template_config);
            let pdf = render_pdf(&ctx)?;
            let filename = format!("{}.pdf", ctx.file_stem());

            let mailer = Mailer::from_config(config)?;
            mailer.send_invoice(&invoice, &client, &company, pdf, &filename)?;
            db.mark_sent(id).await?;
            println!("Sent invoice {}", invoice.invoice_number);
        }
        InvoiceCommand::MarkPaid { id } => {
            db.mark_paid(id).await?;
            info!(invoice_id = id, "invoice marked paid");
            println!("Invoice {} marked paid", id);
        }
        InvoiceCommand::Delete { id } => {
            db.delete_invoice(id).await?;
            println!("Deleted invoice {}", id);
        }
    }
    Ok(())
}

async fn run_report(db: &Database, cmd: ReportCommand) -> Result<()> {
    match cmd {
        ReportCommand::Summary { company } => {
            for (status, count) in db.invoice_counts_by_status(company).await? {
                println!("{:<10} {}", status, count);
            }
        }
        ReportCommand::Monthly { company } => {
            for (month, revenue) in db.revenue_by_month(company).await? {
                println!("{}  {:.2}", month, revenue);
            }
        }
        ReportCommand::TopClients { company, limit } => {
            for (name, billed) in db.top_clients(company, limit).await? {
                println!("{:<30} {:.2}", name, billed);
            }
        }
    }
    Ok(())
}
