//! Tax-id extraction from remote client payloads.
//!
//! The remote system scatters the national tax id across several fields
//! depending on how the order was placed. Extraction is an explicit ordered
//! list of pure strategies; the first hit wins. The ordering matters: the
//! dedicated field is authoritative, the invoice field is second-hand, and
//! the comment scan is a last resort.

use crate::types::remote::RemoteClient;

type Strategy = fn(&RemoteClient) -> Option<String>;

const STRATEGIES: &[Strategy] = &[from_tax_field, from_invoice_field, from_comment];

/// Run the extraction chain; `None` when no strategy produces a value.
pub fn extract(client: &RemoteClient) -> Option<String> {
    STRATEGIES.iter().find_map(|strategy| strategy(client))
}

/// Dedicated tax id field, when non-empty.
fn from_tax_field(client: &RemoteClient) -> Option<String> {
    normalize(client.tax_id.as_deref())
}

/// Tax id entered on the invoice address.
fn from_invoice_field(client: &RemoteClient) -> Option<String> {
    normalize(client.invoice_tax_id.as_deref())
}

/// Scan the free-text comment for a digit run of plausible tax-id length.
fn from_comment(client: &RemoteClient) -> Option<String> {
    let comment = client.comment.as_deref()?;
    longest_digit_run(comment).filter(|run| (8..=12).contains(&run.len()))
}

fn normalize(raw: Option<&str>) -> Option<String> {
    let digits: String =
        raw?.chars().filter(|c| c.is_ascii_digit()).collect();
    if (8..=12).contains(&digits.len()) {
        Some(digits)
    } else {
        None
    }
}

fn longest_digit_run(text: &str) -> Option<String> {
    let mut best: Option<String> = None;
    let mut current = String::new();

    for c in text.chars() {
        if c.is_ascii_digit() {
            current.push(c);
        } else if !current.is_empty() {
            if current.len() > best.as_deref().map_or(0, str::len) {
                best = Some(current.clone());
            }
            current.clear();
        }
    }
    if current.len() > best.as_deref().map_or(0, str::len) {
        best = Some(current);
    }
    best
}
