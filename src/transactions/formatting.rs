use num_format::{Locale, ToFormattedString};

pub const NANOTONS_PER_TON: u64 = 1_000_000_000;

/// Format nanotons as a decimal TON amount with nine fractional digits
/// (e.g. `2450` becomes `"0.000002450"`).
///
/// Presentation only. Balance and fee comparisons stay in nanotons.
pub fn format_ton(nanotons: u64) -> String {
    let whole = nanotons / NANOTONS_PER_TON;
    let fractional = nanotons % NANOTONS_PER_TON;
    format!("{}.{:09}", whole.to_formatted_string(&Locale::en), fractional)
}

/// Format nanotons for display next to the raw value, e.g. `"2450 nanoTON (0.000002450 TON)"`.
pub fn format_nano_and_ton(nanotons: u64) -> String {
    format!("{} nanoTON ({} TON)", nanotons, format_ton(nanotons))
}
