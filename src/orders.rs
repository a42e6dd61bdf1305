use crate::models::{OrderValidationResponse, Ticket, TicketOrder, TicketView};
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum OrderError {
    #[error("order id is required")]
    MissingId,
    #[error("order #{0} not found")]
    NotFound(String),
    #[error("visit date {date} is before today ({today})")]
    PastVisitDate { date: NaiveDate, today: NaiveDate },
    #[error("could not build QR image URL: {0}")]
    QrUrl(String),
}

/// Orders bundled with the portal for the validation page and the demo dashboard.
pub fn demo_orders() -> Vec<TicketOrder> {
    vec![
        order(
            "7867",
            "Ana Carolina Silva",
            (2025, 7, 15),
            &[
                ("A1", "Inteira"),
                ("A2", "Meia Entrada (Estudante)"),
                ("A3", "Inteira"),
            ],
        ),
        order(
            "1234",
            "João Batista Ferreira",
            (2025, 7, 16),
            &[("B1", "Gratuito (Idoso)")],
        ),
        order(
            "5555",
            "Maria Eduarda Santos",
            (2025, 7, 20),
            &[
                ("C1", "Meia Entrada (Professor)"),
                ("C2", "Meia Entrada (Professor)"),
            ],
        ),
        order(
            "9900",
            "Pedro Henrique Costa",
            (2025, 8, 10),
            &[
                ("D1", "Inteira"),
                ("D2", "Inteira"),
                ("D3", "Inteira"),
                ("D4", "Inteira"),
            ],
        ),
    ]
}

fn order(
    id: &str,
    buyer: &str,
    (y, m, d): (i32, u32, u32),
    tickets: &[(&str, &str)],
) -> TicketOrder {
    TicketOrder {
        id: id.to_string(),
        buyer: buyer.to_string(),
        date: NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default(),
        tickets: tickets
            .iter()
            .map(|(ticket_id, name)| Ticket {
                id: ticket_id.to_string(),
                name: name.to_string(),
                qr_code_data: format!("Pedido-{id}-Ingresso-{ticket_id}"),
            })
            .collect(),
    }
}

pub fn find_order<'a>(orders: &'a [TicketOrder], id: &str) -> Result<&'a TicketOrder, OrderError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(OrderError::MissingId);
    }
    orders
        .iter()
        .find(|order| order.id == id)
        .ok_or_else(|| OrderError::NotFound(id.to_string()))
}

/// Visits can be booked for today or any later day.
pub fn validate_visit_date(date: NaiveDate, today: NaiveDate) -> Result<NaiveDate, OrderError> {
    if date < today {
        return Err(OrderError::PastVisitDate { date, today });
    }
    Ok(date)
}

/// QR images are rendered by an external service; only the URL is built here.
pub fn validation_view(
    order: &TicketOrder,
    qr_base_url: &str,
) -> Result<OrderValidationResponse, OrderError> {
    let tickets = order
        .tickets
        .iter()
        .map(|ticket| {
            Ok(TicketView {
                id: ticket.id.clone(),
                name: ticket.name.clone(),
                qr_code_data: ticket.qr_code_data.clone(),
                qr_image_url: qr_image_url(qr_base_url, &ticket.qr_code_data)?,
            })
        })
        .collect::<Result<Vec<_>, OrderError>>()?;

    Ok(OrderValidationResponse {
        order_id: order.id.clone(),
        buyer: order.buyer.clone(),
        date: order.date,
        ticket_count: tickets.len(),
        tickets,
    })
}

fn qr_image_url(base: &str, payload: &str) -> Result<String, OrderError> {
    let query = serde_urlencoded::to_string([("size", "200x200"), ("data", payload)])
        .map_err(|err| OrderError::QrUrl(err.to_string()))?;
    Ok(format!("{base}?{query}"))
}
