//! Dashboard view: one page of orders plus statistics over all of them.

use serde::Serialize;

use dar_sellami_core::{Order, OrderStats};

/// What `GET /dashboard` returns.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub title: String,
    pub stats: OrderStats,
    pub orders: Vec<Order>,
    pub page: usize,
    pub total_pages: usize,
}

impl DashboardView {
    /// Build the view for a 1-based `page`. Out-of-range pages clamp to the
    /// nearest valid one; an empty order list has one empty page.
    #[must_use]
    pub fn build(title: &str, orders: Vec<Order>, page: usize, per_page: usize) -> Self {
        let stats = OrderStats::tally(&orders);
        let per_page = per_page.max(1);
        let total_pages = orders.len().div_ceil(per_page).max(1);
        let page = page.clamp(1, total_pages);

        let orders = orders
            .into_iter()
            .skip((page - 1) * per_page)
            .take(per_page)
            .collect();

        Self {
            title: title.to_string(),
            stats,
            orders,
            page,
            total_pages,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use dar_sellami_core::{DeliveryType, OrderId, OrderTotals, Price};

    use super::*;

    fn order(id: i32, delivery_type: DeliveryType, subtotal_cents: i64) -> Order {
        let fee = match delivery_type {
            DeliveryType::Delivery => Price::from_cents(800),
            DeliveryType::Pickup => Price::ZERO,
        };
        Order {
            id: OrderId::new(id),
            first_name: "Amira".to_string(),
            last_name: "Ben Salah".to_string(),
            phone: "98 765 432".to_string(),
            email: Some("amira@example.tn".to_string()),
            delivery_type,
            address: None,
            governorate: None,
            pickup_time: None,
            notes: None,
            items: Vec::new(),
            totals: OrderTotals {
                subtotal: Price::from_cents(subtotal_cents),
                delivery_fee: fee,
                total: Price::from_cents(subtotal_cents) + fee,
            },
            created_at: Utc::now(),
        }
    }

    fn orders(n: i32) -> Vec<Order> {
        (1..=n)
            .map(|id| {
                let kind = if id % 2 == 0 {
                    DeliveryType::Pickup
                } else {
                    DeliveryType::Delivery
                };
                order(id, kind, 1000)
            })
            .collect()
    }

    #[test]
    fn test_stats_cover_every_order() {
        let view = DashboardView::build("Dar Sellami Admin Dashboard", orders(25), 1, 10);
        assert_eq!(view.stats.total_orders, 25);
        assert_eq!(view.stats.delivery_orders, 13);
        assert_eq!(view.stats.pickup_orders, 12);
        // 25 x 10.00 plus 13 delivery fees of 8.00
        assert_eq!(view.stats.total_revenue, Price::from_cents(35_400));
        assert_eq!(view.orders.len(), 10);
        assert_eq!(view.total_pages, 3);
    }

    #[test]
    fn test_last_page_is_partial() {
        let view = DashboardView::build("t", orders(25), 3, 10);
        assert_eq!(view.page, 3);
        let ids: Vec<i32> = view.orders.iter().map(|o| o.id.as_i32()).collect();
        assert_eq!(ids, vec![21, 22, 23, 24, 25]);
    }

    #[test]
    fn test_page_is_clamped() {
        assert_eq!(DashboardView::build("t", orders(5), 0, 10).page, 1);
        assert_eq!(DashboardView::build("t", orders(5), 9, 10).page, 1);
        assert_eq!(DashboardView::build("t", orders(15), 9, 10).page, 2);
    }

    #[test]
    fn test_no_orders_has_one_page() {
        let view = DashboardView::build("t", Vec::new(), 1, 10);
        assert_eq!(view.total_pages, 1);
        assert!(view.orders.is_empty());
        assert_eq!(view.stats, OrderStats::default());
    }
}
