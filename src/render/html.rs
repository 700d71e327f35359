//! HTML preview generation.
//!
//! The on-screen counterpart of the PDF artifact. Same context, same
//! totals, same conditional-line logic; styling comes from the identical
//! resolved template config via inline CSS.

use super::{format_money, party_lines, RenderContext};

pub fn render_html(ctx: &RenderContext) -> String {
    let colors = &ctx.config.colors;
    let fonts = &ctx.config.fonts;
    let layout = &ctx.config.layout;
    let currency = &ctx.invoice.currency;

    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!(
        "<title>Invoice {}</title>\n</head>\n",
        escape(&ctx.invoice.invoice_number)
    ));
    html.push_str(&format!(
        "<body style=\"margin:0;background:{};color:{};font-family:'{}',sans-serif;\">\n",
        escape(&colors.background),
        escape(&colors.text),
        escape(&fonts.body)
    ));

    // Header band with the invoice-number badge.
    html.push_str(&format!(
        "<div style=\"background:{};color:#ffffff;min-height:{}px;padding:{}px;\">\n",
        escape(&colors.primary),
        layout.header_height,
        layout.card_padding
    ));
    html.push_str(&format!(
        "<span style=\"float:right;background:{};border-radius:{}px;padding:4px 10px;font-weight:bold;\">{}</span>\n",
        escape(&colors.accent),
        layout.border_radius,
        escape(&ctx.invoice.invoice_number)
    ));
    html.push_str(&format!(
        "<h1 style=\"margin:0;font-family:'{}',sans-serif;\">{}</h1>\n",
        escape(&fonts.heading),
        escape(&ctx.company.name)
    ));
    html.push_str(&format!(
        "<p style=\"margin:4px 0 0 0;\">{}</p>\n</div>\n",
        escape(&ctx.company.contact_line())
    ));

    // From / To columns.
    html.push_str(&format!(
        "<table style=\"width:100%;padding:{}px;\"><tr>\n",
        layout.card_padding
    ));
    let from = party_lines(
        &ctx.company.name,
        ctx.company.email.as_deref(),
        ctx.company.phone.as_deref(),
        ctx.company.address.as_deref(),
        ctx.company.tax_id.as_deref(),
    );
    let to = match ctx.client {
        Some(client) => party_lines(
            &client.name,
            client.email.as_deref(),
            client.phone.as_deref(),
            client.address.as_deref(),
            client.tax_id.as_deref(),
        ),
        None => vec![ctx.client_name().to_string()],
    };
    for (label, lines) in [("From", &from), ("Bill To", &to)] {
        html.push_str("<td style=\"width:50%;vertical-align:top;\">\n");
        html.push_str(&format!(
            "<p style=\"color:{};font-weight:bold;margin-bottom:4px;\">{}</p>\n",
            escape(&colors.text_light),
            label
        ));
        for (i, line) in lines.iter().enumerate() {
            let weight = if i == 0 { "bold" } else { "normal" };
            html.push_str(&format!(
                "<p style=\"margin:2px 0;font-weight:{};\">{}</p>\n",
                weight,
                escape(line)
            ));
        }
        html.push_str("</td>\n");
    }
    html.push_str("</tr></table>\n");

    html.push_str(&format!(
        "<h2 style=\"margin:8px {}px;font-family:'{}',sans-serif;\">{}</h2>\n",
        layout.card_padding,
        escape(&fonts.heading),
        escape(&ctx.invoice.title)
    ));
    html.push_str(&format!(
        "<p style=\"margin:0 {}px 12px;color:{};\">Issued {} &middot; Due {}</p>\n",
        layout.card_padding,
        escape(&colors.text_light),
        ctx.invoice.issue_date.format("%d/%m/%Y"),
        ctx.invoice.due_date.format("%d/%m/%Y")
    ));

    // Items table.
    html.push_str("<table style=\"width:100%;border-collapse:collapse;\">\n<tr>\n");
    let th = format!(
        "background:{};color:#ffffff;text-align:left;padding:6px;",
        escape(&colors.primary)
    );
    for header in ["Description", "Qty", "Unit Price", "Line Total"] {
        html.push_str(&format!("<th style=\"{}\">{}</th>\n", th, header));
    }
    html.push_str("</tr>\n");

    for (idx, item) in ctx.items.iter().enumerate() {
        let row_bg = if idx % 2 == 1 {
            format!("background:{};", escape(&colors.background))
        } else {
            String::new()
        };
        html.push_str(&format!("<tr style=\"{}\">\n", row_bg));
        html.push_str(&format!("<td style=\"padding:6px;\">{}</td>\n", escape(&item.description)));
        html.push_str(&format!("<td style=\"padding:6px;\">{}</td>\n", item.quantity));
        html.push_str(&format!(
            "<td style=\"padding:6px;\">{}</td>\n",
            format_money(currency, item.unit_price)
        ));
        html.push_str(&format!(
            "<td style=\"padding:6px;color:{};font-weight:bold;\">{}</td>\n",
            escape(&colors.accent),
            format_money(currency, item.line_total)
        ));
        html.push_str("</tr>\n");
    }
    html.push_str("</table>\n");

    // Totals panel: subtotal always, discount/tax only when nonzero.
    html.push_str(&format!(
        "<table style=\"margin:12px {}px 0 auto;\">\n",
        layout.card_padding
    ));
    html.push_str(&format!(
        "<tr><td style=\"padding:2px 12px;\">Subtotal</td><td style=\"text-align:right;\">{}</td></tr>\n",
        format_money(currency, ctx.totals.subtotal)
    ));
    if ctx.show_discount() {
        html.push_str(&format!(
            "<tr><td style=\"padding:2px 12px;\">Discount ({}%)</td><td style=\"text-align:right;\">-{}</td></tr>\n",
            ctx.invoice.discount_percentage,
            format_money(currency, ctx.totals.discount_amount)
        ));
    }
    if ctx.show_tax() {
        html.push_str(&format!(
            "<tr><td style=\"padding:2px 12px;\">Tax ({}%)</td><td style=\"text-align:right;\">{}</td></tr>\n",
            ctx.invoice.tax_percentage,
            format_money(currency, ctx.totals.tax_amount)
        ));
    }
    html.push_str(&format!(
        "<tr><td style=\"padding:6px 12px;font-weight:bold;color:{accent};border-top:2px solid {accent};\">Total</td>\
         <td style=\"text-align:right;font-weight:bold;color:{accent};border-top:2px solid {accent};\">{total}</td></tr>\n",
        accent = escape(&colors.accent),
        total = format_money(currency, ctx.totals.total)
    ));
    html.push_str("</table>\n");

    if let Some(notes) = ctx.invoice.notes.as_deref() {
        html.push_str(&format!(
            "<p style=\"margin:12px {}px;color:{};\">{}</p>\n",
            layout.card_padding,
            escape(&colors.text_light),
            escape(notes)
        ));
    }

    // Footer.
    html.push_str(&format!(
        "<div style=\"min-height:{}px;padding:{}px;color:{};\">\n",
        layout.footer_height,
        layout.card_padding,
        escape(&colors.text_light)
    ));
    html.push_str("<p style=\"margin:0;\">Thank you for your business!</p>\n");
    html.push_str(&format!(
        "<p style=\"margin:2px 0 0 0;font-size:11px;\">Generated on {} UTC</p>\n</div>\n",
        ctx.generated_at.format("%d/%m/%Y %H:%M")
    ));
    html.push_str("</body>\n</html>\n");
    html
}

fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
