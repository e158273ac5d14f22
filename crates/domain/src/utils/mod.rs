//! Pure helper utilities over domain data.

pub mod tax_id;
