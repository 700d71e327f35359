mod company;
mod client;
mod service;
mod invoice;
mod invoice_item;
mod template;

pub use company::Company;
pub use client::Client;
pub use service::Service;
pub use invoice::{Invoice, InvoiceStatus};
pub use invoice_item::InvoiceItem;
pub use template::InvoiceTemplate;
