//! Plain-text renderings of storefront data.
//!
//! Every view is a pure function returning the text to print, so the
//! formatting rules (prices, line totals, stock labels) are tested without a
//! terminal.

use zodiaco_core::{
    Address, AddressKind, Category, Order, Paginated, Pagination, Product, ProductVariant, Review,
    User,
};
use zodiaco_storefront::{CartState, OrderSummary, PaymentMethod};

// =============================================================================
// Catalog
// =============================================================================

/// One row per product: ID, name and lowest price.
#[must_use]
pub fn product_rows(products: &[Product]) -> String {
    if products.is_empty() {
        return "No se encontraron productos".to_string();
    }
    products
        .iter()
        .map(|product| {
            let price = product
                .min_price()
                .map_or_else(|| "-".to_string(), zodiaco_core::Price::display);
            format!("{:<14} {:<36} {:>12}", product.id, product.name, price)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// A page of products with its pagination footer.
#[must_use]
pub fn product_page(page: &Paginated<Product>) -> String {
    format!(
        "{}\n\n{}",
        product_rows(&page.items),
        pagination(&page.pagination)
    )
}

/// Full product page: description, variants with stock, and rating.
#[must_use]
pub fn product_detail(product: &Product) -> String {
    let mut lines = vec![product.name.clone()];
    if !product.brand.is_empty() {
        lines.push(format!("Marca: {}", product.brand));
    }
    if !product.sku.is_empty() {
        lines.push(format!("SKU: {}", product.sku));
    }
    if let Some(average) = product.average_rating() {
        lines.push(format!(
            "{} {average:.1} ({} reseñas)",
            stars(average_stars(average)),
            product.reviews.len()
        ));
    }

    let description = if product.description.is_empty() {
        &product.short_description
    } else {
        &product.description
    };
    if !description.is_empty() {
        lines.push(String::new());
        lines.push(description.clone());
    }

    lines.push(String::new());
    let variants: Vec<&ProductVariant> = product.active_variants().collect();
    if variants.is_empty() {
        lines.push("Producto no disponible".to_string());
        lines.push("Este producto no tiene variantes disponibles".to_string());
    } else {
        for variant in variants {
            lines.push(variant_row(variant));
        }
    }

    lines.join("\n")
}

fn variant_row(variant: &ProductVariant) -> String {
    let label = variant
        .attribute("size")
        .map_or_else(|| variant.name.clone(), |size| format!("Talla {size}"));

    let mut row = format!(
        "  {:<12} {:<16} {:>12}",
        variant.id,
        label,
        variant.price.display()
    );
    if let (Some(compare), Some(percent)) = (variant.compare_at_price, variant.discount_percent())
    {
        row.push_str(&format!("  antes {} (-{percent}%)", compare.display()));
    }
    row.push_str("  ");
    row.push_str(stock_label(variant));
    row
}

/// Availability text for a variant.
#[must_use]
pub const fn stock_label(variant: &ProductVariant) -> &'static str {
    if !variant.in_stock() {
        "Agotado"
    } else if variant.is_low_stock() {
        "¡Últimas unidades!"
    } else {
        "Disponible"
    }
}

#[must_use]
pub fn categories(categories: &[Category]) -> String {
    if categories.is_empty() {
        return "No hay categorías".to_string();
    }
    categories
        .iter()
        .map(|category| format!("{:<14} {}", category.id, category.name))
        .collect::<Vec<_>>()
        .join("\n")
}

#[must_use]
pub fn reviews(page: &Paginated<Review>) -> String {
    if page.items.is_empty() {
        return "Este producto aún no tiene reseñas".to_string();
    }
    let mut blocks: Vec<String> = page
        .items
        .iter()
        .map(|review| {
            let mut block = format!("{} {}", stars(review.rating), review.title);
            if review.is_verified_purchase {
                block.push_str("  (compra verificada)");
            }
            if !review.comment.is_empty() {
                block.push('\n');
                block.push_str(&review.comment);
            }
            block
        })
        .collect();
    blocks.push(pagination(&page.pagination));
    blocks.join("\n\n")
}

/// Five-star rating bar, e.g. `★★★★☆`.
#[must_use]
pub fn stars(rating: u8) -> String {
    let filled = usize::from(rating.min(5));
    format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // Clamped to 0..=5
fn average_stars(average: f64) -> u8 {
    average.round().clamp(0.0, 5.0) as u8
}

fn pagination(pagination: &Pagination) -> String {
    format!(
        "Página {} de {} ({} resultados)",
        pagination.page,
        pagination.pages.max(1),
        pagination.total
    )
}

// =============================================================================
// Cart and checkout
// =============================================================================

/// Cart lines with their line totals, the cart totals and any sync error.
#[must_use]
pub fn cart(state: &CartState) -> String {
    let mut lines = Vec::new();

    if state.cart.is_empty() {
        lines.push("Tu carrito está vacío".to_string());
        lines.push("Agrega algunos productos para comenzar a comprar".to_string());
    } else {
        for item in state.cart.items() {
            lines.push(format!(
                "{:>3} × {:<32} {:<12} {:>12} {:>12}",
                item.quantity,
                item.product.name,
                item.variant.id,
                item.variant.price.display(),
                item.line_total().display()
            ));
        }
        lines.push(String::new());
        lines.push(format!("Productos: {}", state.cart.total_items()));
        lines.push(format!("Total: {}", state.cart.total_amount().display()));
    }

    if let Some(error) = &state.error {
        lines.push(String::new());
        lines.push(format!("Error: {error}"));
    }

    lines.join("\n")
}

#[must_use]
pub fn order_summary(summary: &OrderSummary) -> String {
    let shipping = if summary.shipping.is_zero() {
        "Gratis".to_string()
    } else {
        summary.shipping.display()
    };
    [
        "Resumen del Pedido".to_string(),
        format!("Subtotal ({} productos): {}", summary.items, summary.subtotal.display()),
        format!("Envío: {shipping}"),
        format!("Total: {}", summary.total.display()),
    ]
    .join("\n")
}

/// Confirmation shown after a successful checkout.
#[must_use]
pub fn order_placed(order: &Order) -> String {
    format!(
        "¡Pedido realizado con éxito!\nPedido {}: {}",
        order_label(order),
        order.total_amount.display()
    )
}

// =============================================================================
// Account
// =============================================================================

#[must_use]
pub fn orders(page: &Paginated<Order>) -> String {
    if page.items.is_empty() {
        return "Aún no tienes pedidos".to_string();
    }
    let rows = page
        .items
        .iter()
        .map(|order| {
            let date = order
                .created_at
                .map(|at| at.date_naive().to_string())
                .unwrap_or_default();
            format!(
                "Pedido {:<16} {:<12} {:<10} {:>12}",
                order_label(order),
                date,
                order.status,
                order.total_amount.display()
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("Historial de Pedidos\n{rows}\n\n{}", pagination(&page.pagination))
}

#[must_use]
pub fn order_detail(order: &Order) -> String {
    let mut lines = vec![format!("Pedido {}", order_label(order))];
    if !order.status.is_empty() {
        lines.push(format!("Estado: {}", order.status));
    }
    if !order.payment_method.is_empty() {
        let method = order
            .payment_method
            .parse::<PaymentMethod>()
            .map_or_else(|_| order.payment_method.clone(), |m| m.label().to_string());
        lines.push(format!("Pago: {method}"));
    }
    if let Some(address) = &order.shipping_address {
        lines.push(format!("Envío a: {}", address.one_line()));
    }

    lines.push(String::new());
    for item in &order.items {
        let name = item
            .product
            .as_ref()
            .map_or_else(|| item.product_id.to_string(), |p| p.name.clone());
        lines.push(format!(
            "{:>3} × {:<32} {:>12} {:>12}",
            item.quantity,
            name,
            item.price.display(),
            item.line_total().display()
        ));
    }

    lines.push(String::new());
    if !order.shipping_amount.is_zero() {
        lines.push(format!("Envío: {}", order.shipping_amount.display()));
    }
    if !order.discount_amount.is_zero() {
        lines.push(format!("Descuento: -{}", order.discount_amount.display()));
    }
    lines.push(format!("Total: {}", order.total_amount.display()));
    lines.join("\n")
}

fn order_label(order: &Order) -> String {
    if order.order_number.is_empty() {
        order.id.to_string()
    } else {
        order.order_number.clone()
    }
}

#[must_use]
pub fn user(user: &User) -> String {
    format!("{} <{}>", user.full_name(), user.email)
}

#[must_use]
pub fn addresses(addresses: &[Address]) -> String {
    if addresses.is_empty() {
        return "No tienes direcciones guardadas".to_string();
    }
    addresses
        .iter()
        .map(|address| {
            let kind = match address.kind {
                AddressKind::Shipping => "envío",
                AddressKind::Billing => "facturación",
            };
            let default = if address.is_default { " (predeterminada)" } else { "" };
            format!(
                "{:<14} [{kind}]{default} {}",
                address.id,
                address.postal.one_line()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
