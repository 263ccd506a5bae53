//! VSP Server wire formats
//!
//! Outbound requests are `application/x-www-form-urlencoded`. Gateway
//! responses and our notification acknowledgements are CRLF separated
//! `key=value` lines.

use crate::error::{AppError, AppResult};
use crate::payments::sanitize::{sanitize_basket_text, BASKET_DELIMITER};
use crate::payments::types::{Acknowledgement, AcknowledgementStatus, BasketItem, FieldMap};
use rust_decimal::{Decimal, RoundingStrategy};

const LINE_SEPARATOR: &str = "\r\n";

/// Render an amount with exactly two decimal places
pub fn format_money_value(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.2}", rounded)
}

/// Encode basket items as `count:f1:f2:...`, six fields per item
pub fn encode_basket(items: &[BasketItem]) -> String {
    let mut fields = Vec::with_capacity(1 + 6 * items.len());
    fields.push(items.len().to_string());
    for item in items {
        fields.extend(
            item.wire_fields()
                .iter()
                .map(|value| sanitize_basket_text(value.unwrap_or_default())),
        );
    }
    fields.join(BASKET_DELIMITER)
}

/// Percent-encode a field set as a form body
pub fn encode_request(fields: &FieldMap) -> AppResult<String> {
    serde_urlencoded::to_string(fields)
        .map_err(|e| AppError::configuration(format!("Failed to encode request body: {}", e)))
}

/// Decode a gateway response body of `key=value` lines.
///
/// Values may themselves contain `=`; only the first one splits.
pub fn decode_response(body: &str) -> AppResult<FieldMap> {
    let body = body.trim();
    if body.is_empty() {
        return Err(AppError::malformed_response("empty response body"));
    }

    body.split(LINE_SEPARATOR)
        .map(|line| {
            line.split_once('=')
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .ok_or_else(|| {
                    AppError::malformed_response(format!("line without '=': {:?}", line))
                })
        })
        .collect()
}

/// Encode a notification acknowledgement
pub fn encode_acknowledgement(ack: &Acknowledgement) -> String {
    [
        ("Status", ack.status.as_str()),
        ("RedirectURL", ack.redirect_url.as_str()),
        ("StatusDetail", ack.status_detail.as_str()),
    ]
    .iter()
    .map(|(key, value)| format!("{}={}", key, value))
    .collect::<Vec<_>>()
    .join(LINE_SEPARATOR)
}

/// Decode an acknowledgement body; missing `RedirectURL`/`StatusDetail` are empty
pub fn decode_acknowledgement(body: &str) -> AppResult<Acknowledgement> {
    let mut fields = decode_response(body)?;
    let status = fields
        .get("Status")
        .ok_or_else(|| AppError::malformed_response("acknowledgement without Status"))?
        .parse::<AcknowledgementStatus>()
        .map_err(AppError::malformed_response)?;

    Ok(Acknowledgement {
        status,
        redirect_url: fields.remove("RedirectURL").unwrap_or_default(),
        status_detail: fields.remove("StatusDetail").unwrap_or_default(),
    })
}
