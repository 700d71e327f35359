//! PDF artifact generation via printpdf.
//!
//! A4 portrait, millimetre coordinates, bottom-left origin. All colors,
//! fonts, and layout metrics come from the resolved template config in the
//! render context.

use anyhow::{Context as _, Result};
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point, Rect,
    Rgb,
};

use super::{format_money, party_lines, wrap_text, RenderContext};

const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const DESC_CHAR_BUDGET: usize = 48;
const LINE_H: f32 = 5.0;
const TABLE_HEADER_H: f32 = 8.0;
const ROW_PAD: f32 = 2.5;

pub fn render_pdf(ctx: &RenderContext) -> Result<Vec<u8>> {
    let margins = &ctx.config.layout.margins;
    let left = margins.left as f32;
    let right = PAGE_W - margins.right as f32;
    let bottom = margins.bottom as f32;
    let header_h = (ctx.config.layout.header_height as f32).clamp(20.0, 80.0);
    let footer_reserve = (ctx.config.layout.footer_height as f32).clamp(10.0, 60.0);

    let primary = color(&ctx.config.colors.primary, "#1F2A44");
    let accent = color(&ctx.config.colors.accent, "#D4AF37");
    let background = color(&ctx.config.colors.background, "#F9F6F1");
    let text_color = color(&ctx.config.colors.text, "#1F2A44");
    let text_light = color(&ctx.config.colors.text_light, "#2F3640");
    let white = Color::Rgb(Rgb::new(1.0, 1.0, 1.0, None));

    let (doc, page1, layer1) = PdfDocument::new(
        format!("Invoice {}", ctx.invoice.invoice_number),
        Mm(PAGE_W),
        Mm(PAGE_H),
        "Layer 1",
    );
    let body_font = doc
        .add_builtin_font(builtin_font(&ctx.config.fonts.body, false))
        .context("embedding body font")?;
    let body_bold = doc
        .add_builtin_font(builtin_font(&ctx.config.fonts.body, true))
        .context("embedding bold body font")?;
    let heading_font = doc
        .add_builtin_font(builtin_font(&ctx.config.fonts.heading, true))
        .context("embedding heading font")?;

    let mut layer = doc.get_page(page1).get_layer(layer1);

    // --- Header band ---
    fill_rect(&layer, &primary, 0.0, PAGE_H, PAGE_W, header_h);
    layer.set_fill_color(white.clone());
    push_line(&layer, &heading_font, &ctx.company.name, 18.0, left, PAGE_H - 14.0);
    push_line(
        &layer,
        &body_font,
        &ctx.company.contact_line(),
        9.0,
        left,
        PAGE_H - 21.0,
    );

    // Invoice-number badge, top right inside the band.
    let badge_text = &ctx.invoice.invoice_number;
    let badge_w = text_width_est(badge_text, 11.0) + 8.0;
    let badge_x = right - badge_w;
    fill_rect(&layer, &accent, badge_x, PAGE_H - 8.0, badge_w, 9.0);
    layer.set_fill_color(white.clone());
    push_line(&layer, &body_bold, badge_text, 11.0, badge_x + 4.0, PAGE_H - 14.5);

    let mut y = PAGE_H - header_h - 10.0;

    // --- From / To columns ---
    let col2_x = left + (right - left) / 2.0;
    layer.set_fill_color(text_light.clone());
    push_line(&layer, &body_bold, "FROM", 8.0, left, y);
    push_line(&layer, &body_bold, "BILL TO", 8.0, col2_x, y);
    y -= 6.0;

    layer.set_fill_color(text_color.clone());
    let from_lines = party_lines(
        &ctx.company.name,
        ctx.company.email.as_deref(),
        ctx.company.phone.as_deref(),
        ctx.company.address.as_deref(),
        ctx.company.tax_id.as_deref(),
    );
    let to_lines = match ctx.client {
        Some(client) => party_lines(
            &client.name,
            client.email.as_deref(),
            client.phone.as_deref(),
            client.address.as_deref(),
            client.tax_id.as_deref(),
        ),
        None => vec![ctx.client_name().to_string()],
    };
    let rows = from_lines.len().max(to_lines.len());
    for i in 0..rows {
        let font = if i == 0 { &body_bold } else { &body_font };
        if let Some(line) = from_lines.get(i) {
            push_line(&layer, font, line, 9.0, left, y - i as f32 * LINE_H);
        }
        if let Some(line) = to_lines.get(i) {
            push_line(&layer, font, line, 9.0, col2_x, y - i as f32 * LINE_H);
        }
    }
    y -= rows as f32 * LINE_H + 4.0;

    // Title and dates.
    push_line(&layer, &heading_font, &ctx.invoice.title, 12.0, left, y);
    layer.set_fill_color(text_light.clone());
    push_line_right(
        &layer,
        &body_font,
        &format!(
            "Issued {}   Due {}",
            ctx.invoice.issue_date.format("%d/%m/%Y"),
            ctx.invoice.due_date.format("%d/%m/%Y")
        ),
        9.0,
        right,
        y,
    );
    y -= 9.0;

    // --- Items table ---
    let qty_right = left + 108.0;
    let price_right = left + 145.0;
    let total_right = right;

    let draw_table_header = |layer: &PdfLayerReference, y_top: f32| -> f32 {
        fill_rect(layer, &primary, left, y_top, right - left, TABLE_HEADER_H);
        layer.set_fill_color(white.clone());
        let text_y = y_top - TABLE_HEADER_H + 2.5;
        push_line(layer, &body_bold, "Description", 9.0, left + 2.0, text_y);
        push_line_right(layer, &body_bold, "Qty", 9.0, qty_right, text_y);
        push_line_right(layer, &body_bold, "Unit Price", 9.0, price_right, text_y);
        push_line_right(layer, &body_bold, "Line Total", 9.0, total_right - 2.0, text_y);
        y_top - TABLE_HEADER_H - 4.0
    };

    y = draw_table_header(&layer, y);

    for (idx, item) in ctx.items.iter().enumerate() {
        let desc_lines = wrap_text(&item.description, DESC_CHAR_BUDGET);
        let desc_rows = desc_lines.len().max(1);
        let row_h = desc_rows as f32 * LINE_H + ROW_PAD;

        if y - row_h < bottom + footer_reserve {
            let (page, l) = doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
            layer = doc.get_page(page).get_layer(l);
            y = draw_table_header(&layer, PAGE_H - margins.top as f32);
        }

        if idx % 2 == 1 {
            fill_rect(&layer, &background, left, y + 3.5, right - left, row_h);
        }

        layer.set_fill_color(text_color.clone());
        for (li, line) in desc_lines.iter().enumerate() {
            push_line(&layer, &body_font, line, 9.0, left + 2.0, y - li as f32 * LINE_H);
        }
        push_line_right(&layer, &body_font, &format!("{}", item.quantity), 9.0, qty_right, y);
        push_line_right(
            &layer,
            &body_font,
            &format_money(&ctx.invoice.currency, item.unit_price),
            9.0,
            price_right,
            y,
        );
        layer.set_fill_color(accent.clone());
        push_line_right(
            &layer,
            &body_bold,
            &format_money(&ctx.invoice.currency, item.line_total),
            9.0,
            total_right - 2.0,
            y,
        );
        y -= row_h;
    }

    layer.set_outline_thickness(0.4);
    draw_rule(&layer, left, right, y + 3.0);
    y -= 4.0;

    // --- Totals panel ---
    let label_x = right - 70.0;
    let mut totals_rows: Vec<(&str, String, bool)> = vec![(
        "Subtotal",
        format_money(&ctx.invoice.currency, ctx.totals.subtotal),
        false,
    )];
    if ctx.show_discount() {
        totals_rows.push((
            "Discount",
            format!(
                "-{}",
                format_money(&ctx.invoice.currency, ctx.totals.discount_amount)
            ),
            false,
        ));
    }
    if ctx.show_tax() {
        totals_rows.push((
            "Tax",
            format_money(&ctx.invoice.currency, ctx.totals.tax_amount),
            false,
        ));
    }
    totals_rows.push((
        "Total",
        format_money(&ctx.invoice.currency, ctx.totals.total),
        true,
    ));

    for (label, value, emphasized) in totals_rows {
        if y < bottom + footer_reserve {
            let (page, l) = doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
            layer = doc.get_page(page).get_layer(l);
            y = PAGE_H - margins.top as f32;
        }
        if emphasized {
            layer.set_outline_thickness(0.6);
            draw_rule(&layer, label_x, right, y + 4.0);
            layer.set_fill_color(accent.clone());
            push_line(&layer, &body_bold, label, 12.0, label_x, y);
            push_line_right(&layer, &body_bold, &value, 12.0, total_right - 2.0, y);
        } else {
            layer.set_fill_color(text_color.clone());
            push_line(&layer, &body_font, label, 9.5, label_x, y);
            push_line_right(&layer, &body_font, &value, 9.5, total_right - 2.0, y);
        }
        y -= 7.0;
    }

    // Notes, if any fit above the footer.
    if let Some(notes) = ctx.invoice.notes.as_deref() {
        y -= 4.0;
        layer.set_fill_color(text_light.clone());
        for line in wrap_text(notes, 95) {
            if y < bottom + footer_reserve {
                break;
            }
            push_line(&layer, &body_font, &line, 8.5, left, y);
            y -= 4.5;
        }
    }

    // --- Footer ---
    layer.set_fill_color(text_light.clone());
    push_line(&layer, &body_font, "Thank you for your business!", 9.0, left, bottom + 6.0);
    push_line(
        &layer,
        &body_font,
        &format!(
            "Generated on {} UTC",
            ctx.generated_at.format("%d/%m/%Y %H:%M")
        ),
        7.0,
        left,
        bottom + 1.5,
    );

    let mut writer = std::io::BufWriter::new(Vec::<u8>::new());
    doc.save(&mut writer).context("serializing PDF document")?;
    Ok(writer
        .into_inner()
        .context("flushing PDF output buffer")?)
}

fn push_line(layer: &PdfLayerReference, font: &IndirectFontRef, text: &str, size: f32, x: f32, y: f32) {
    layer.use_text(text, size, Mm(x), Mm(y), font);
}

// printpdf's built-in fonts expose no metrics; the pragmatic estimate keeps
// numeric columns visually right-aligned.
fn text_width_est(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.18
}

fn push_line_right(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    text: &str,
    size: f32,
    x_right: f32,
    y: f32,
) {
    let x = (x_right - text_width_est(text, size)).max(0.0);
    push_line(layer, font, text, size, x, y);
}

fn draw_rule(layer: &PdfLayerReference, x1: f32, x2: f32, y: f32) {
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(x1), Mm(y)), false),
            (Point::new(Mm(x2), Mm(y)), false),
        ],
        is_closed: false,
    });
}

fn fill_rect(layer: &PdfLayerReference, fill: &Color, x: f32, y_top: f32, w: f32, h: f32) {
    layer.set_fill_color(fill.clone());
    let rect = Rect::new(Mm(x), Mm(y_top - h), Mm(x + w), Mm(y_top)).with_mode(PaintMode::Fill);
    layer.add_rect(rect);
}

fn builtin_font(name: &str, bold: bool) -> BuiltinFont {
    let lower = name.to_ascii_lowercase();
    if lower.contains("courier") || lower.contains("mono") {
        if bold {
            BuiltinFont::CourierBold
        } else {
            BuiltinFont::Courier
        }
    } else if lower.contains("times") || lower.contains("georgia") || lower.contains("serif") {
        if bold {
            BuiltinFont::TimesBold
        } else {
            BuiltinFont::TimesRoman
        }
    } else {
        // Inter and friends have no built-in equivalent; Helvetica is the
        // closest sans face available without embedding.
        if bold {
            BuiltinFont::HelveticaBold
        } else {
            BuiltinFont::Helvetica
        }
    }
}

/// Parse `#RRGGBB` into a printpdf fill color, falling back to the system
/// default for that slot when the stored value is unparseable.
fn color(hex: &str, fallback: &str) -> Color {
    let (r, g, b) = parse_hex(hex)
        .or_else(|| parse_hex(fallback))
        .unwrap_or((0.0, 0.0, 0.0));
    Color::Rgb(Rgb::new(r, g, b, None))
}

fn parse_hex(hex: &str) -> Option<(f32, f32, f32)> {
    let hex = hex.trim().strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0))
}
